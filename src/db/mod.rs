pub mod connection;
pub mod job_repository;
#[cfg(test)]
pub mod memory;
pub mod migrations;
pub mod models;
pub mod store;
pub mod token_repository;

pub use job_repository::JobRepository;
pub use store::{JobStore, StoreError, TokenStore};
pub use token_repository::TokenRepository;
