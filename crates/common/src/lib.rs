//! Common utilities and shared types for foodgram-rs.
//!
//! This crate provides foundational components used across all foodgram-rs crates:
//!
//! - **Configuration**: Application settings via [`Config`]
//! - **Error handling**: Unified error types via [`AppError`] and [`AppResult`]
//! - **ID Generation**: Access tokens and recipe short codes via [`IdGenerator`]
//! - **Storage**: File storage backends for recipe images and avatars
//!
//! # Example
//!
//! ```no_run
//! use foodgram_common::{Config, IdGenerator, AppResult};
//!
//! fn example() -> AppResult<()> {
//!     let config = Config::load()?;
//!     let id_gen = IdGenerator::new();
//!     let code = id_gen.generate_short_code();
//!     println!("{}/s/{}", config.server.url, code);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod id;
pub mod storage;

pub use config::Config;
pub use error::{AppError, AppResult};
pub use id::{IdGenerator, SHORT_CODE_LENGTH};
pub use storage::{
    DecodedImage, LocalStorage, StorageBackend, StorageConfig, UploadedFile, decode_data_url,
    generate_storage_key,
};
