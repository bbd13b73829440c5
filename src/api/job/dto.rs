use serde::{Deserialize, Serialize};

use super::models::Job;

/// Response for a job creation or state change
#[derive(Serialize, Deserialize, Debug)]
pub struct JobResponse {
    pub message: String,
    pub job: Job,
}

impl JobResponse {
    pub fn new(message: impl Into<String>, job: Job) -> Self {
        Self {
            message: message.into(),
            job,
        }
    }
}
