//! Core business logic for foodgram-rs.

pub mod services;

pub use services::*;
