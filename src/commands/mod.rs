//! Command handlers for the CLI
//!
//! Each subcommand of the `lesson-forge` binary has one handler here:
//!
//! - `serve`    - run the HTTP server
//! - `generate` - forge a document for an account from the terminal
//! - `credits`  - show or grant credit balances
//! - `history`  - list an account's generations

pub mod credits;
pub mod generate;
pub mod history;
pub mod serve;

pub use credits::handle_credits;
pub use generate::run_generate;
pub use history::handle_history;
pub use serve::run_serve;
