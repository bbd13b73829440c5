//! Operator dashboard: session login, job overview and app credential management.

pub mod handlers;
pub mod view;
