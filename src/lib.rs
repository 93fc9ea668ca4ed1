//! Lesson Forge - lesson plan and presentation generator library
//!
//! This library provides the service behind the Lesson Forge dashboard:
//! a user submits a prompt, a content provider writes the lesson, and the
//! result is rendered to PDF or PPTX, stored, charged against the user's
//! credit balance and added to their history.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//!
//! - `auth`: Identity service client, sign-in state machine, PKCE, sessions
//! - `credits`: Credit balance type, pricing and purchase bundles
//! - `storage`: SQLite credit ledger and generation history
//! - `providers`: Content provider abstraction (DeepSeek, Gemini, Mock)
//! - `documents`: Lesson text parsing and PDF/PPTX rendering
//! - `files`: Object storage for generated files
//! - `generation`: End-to-end generation service
//! - `views`: Renderer-agnostic view models for the pages
//! - `web`: axum router, pages and JSON API
//! - `config`: Configuration management and validation
//! - `error`: Error types and result aliases
//! - `cli`: Command-line interface definition
//!
//! # Example
//!
//! ```no_run
//! use lesson_forge::Config;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("config/config.yaml", &Default::default())?;
//!     config.validate()?;
//!
//!     lesson_forge::web::start_server(config).await
//! }
//! ```

pub mod auth;
pub mod cli;
pub mod commands;
pub mod config;
pub mod credits;
pub mod documents;
pub mod error;
pub mod files;
pub mod generation;
pub mod providers;
pub mod storage;
pub mod views;
pub mod web;

// Re-export commonly used types
pub use config::Config;
pub use credits::CreditBalance;
pub use error::{ForgeError, Result};
pub use generation::{ContentType, GenerationRequest, GenerationService};
