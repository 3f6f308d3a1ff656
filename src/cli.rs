//! Command-line interface definitions using clap

use clap::{Parser, Subcommand};

/// inkpost - personal blog and life-log backend
#[derive(Parser, Debug)]
#[command(name = "inkpost")]
#[command(version)]
#[command(about = "Personal blog, life log and ledger backend", long_about = None)]
pub struct Cli {
    /// Config file path (default: config.toml)
    #[arg(long, short = 'c', global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available commands
#[derive(Subcommand, Debug, PartialEq)]
pub enum Commands {
    /// Start the HTTP server (default)
    Serve,

    /// Run pending database migrations and exit
    Migrate,

    /// Reset a user's password
    ResetPassword {
        /// Username of the account
        username: String,

        /// New password (if not provided, will prompt interactively)
        #[arg(long, conflicts_with = "stdin")]
        password: Option<String>,

        /// Read password from stdin (for scripting)
        #[arg(long)]
        stdin: bool,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigCommands,
    },
}

/// Configuration management commands
#[derive(Subcommand, Debug, PartialEq)]
pub enum ConfigCommands {
    /// Generate example configuration file
    Generate {
        /// Output path (default: config.example.toml)
        output_path: Option<String>,

        /// Force overwrite without confirmation
        #[arg(long)]
        force: bool,
    },
}

impl Cli {
    /// 没有子命令时按 serve 处理
    pub fn command(&self) -> &Commands {
        self.command.as_ref().unwrap_or(&Commands::Serve)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_serve() {
        let cli = Cli::parse_from(["inkpost"]);
        assert_eq!(cli.command(), &Commands::Serve);
        assert!(cli.config.is_none());
    }

    #[test]
    fn test_reset_password_args() {
        let cli = Cli::parse_from([
            "inkpost",
            "-c",
            "/etc/inkpost.toml",
            "reset-password",
            "admin",
            "--password",
            "new-secret-1",
        ]);
        assert_eq!(cli.config.as_deref(), Some("/etc/inkpost.toml"));
        assert_eq!(
            cli.command(),
            &Commands::ResetPassword {
                username: "admin".into(),
                password: Some("new-secret-1".into()),
                stdin: false,
            }
        );
    }

    #[test]
    fn test_password_and_stdin_conflict() {
        let result = Cli::try_parse_from([
            "inkpost",
            "reset-password",
            "admin",
            "--password",
            "x",
            "--stdin",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_config_generate() {
        let cli = Cli::parse_from(["inkpost", "config", "generate", "out.toml", "--force"]);
        assert_eq!(
            cli.command(),
            &Commands::Config {
                action: ConfigCommands::Generate {
                    output_path: Some("out.toml".into()),
                    force: true,
                }
            }
        );
    }
}
