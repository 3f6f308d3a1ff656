//! Mode routing
//!
//! - Server mode：无子命令或 `serve`
//! - CLI mode：其余一次性子命令

pub mod cli;
pub mod server;

pub use cli::{CliError, run_cli};
pub use server::{build_app, configure_app, run_server};
