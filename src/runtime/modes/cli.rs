//! CLI mode
//!
//! 一次性命令：执行迁移、重置密码、生成示例配置。

use std::fmt;
use std::io::{self, BufRead, IsTerminal, Write};
use std::path::Path;
use std::sync::Arc;

use colored::Colorize;

use crate::cli::{Commands, ConfigCommands};
use crate::config::AppConfig;
use crate::errors::AppError;
use crate::services::AuthService;
use crate::storage::StorageFactory;

const DEFAULT_SAMPLE_PATH: &str = "config.example.toml";

#[derive(Debug)]
pub enum CliError {
    StorageError(String),
    InputError(String),
    CommandError(String),
}

impl CliError {
    pub fn format_simple(&self) -> String {
        match self {
            CliError::StorageError(msg) => format!("Storage error: {}", msg),
            CliError::InputError(msg) => format!("Input error: {}", msg),
            CliError::CommandError(msg) => format!("Command error: {}", msg),
        }
    }

    pub fn format_colored(&self) -> String {
        match self {
            CliError::StorageError(msg) => {
                format!("{} {}", "Storage error:".red().bold(), msg.white())
            }
            CliError::InputError(msg) => {
                format!("{} {}", "Input error:".yellow().bold(), msg.white())
            }
            CliError::CommandError(msg) => {
                format!("{} {}", "Command error:".red().bold(), msg.white())
            }
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format_simple())
    }
}

impl std::error::Error for CliError {}

impl From<AppError> for CliError {
    fn from(err: AppError) -> Self {
        match err {
            AppError::DatabaseConnection(msg) | AppError::DatabaseOperation(msg) => {
                CliError::StorageError(msg)
            }
            other => CliError::CommandError(other.message().to_string()),
        }
    }
}

/// Run a CLI command（`serve` 由 main 直接处理）
pub async fn run_cli(command: &Commands, config: Arc<AppConfig>) -> Result<(), CliError> {
    match command {
        Commands::Serve => Err(CliError::CommandError(
            "serve is not a one-shot command".into(),
        )),
        Commands::Migrate => run_migrate(&config).await,
        Commands::ResetPassword {
            username,
            password,
            stdin,
        } => run_reset_password(config, username, password.clone(), *stdin).await,
        Commands::Config { action } => match action {
            ConfigCommands::Generate { output_path, force } => {
                config_generate(output_path.as_deref(), *force)
            }
        },
    }
}

async fn run_migrate(config: &AppConfig) -> Result<(), CliError> {
    // 建立连接时即执行全部待执行迁移
    let storage = StorageFactory::create(&config.database).await?;
    println!(
        "{} Migrations applied ({})",
        "✓".green().bold(),
        storage.get_backend_name()
    );
    Ok(())
}

// ============ reset-password ============

/// 依次尝试 stdin、命令行参数、交互式输入
fn read_new_password(password: Option<String>, stdin: bool) -> Result<String, CliError> {
    if stdin {
        let mut line = String::new();
        io::stdin()
            .lock()
            .read_line(&mut line)
            .map_err(|e| CliError::InputError(format!("Failed to read from stdin: {}", e)))?;
        return Ok(line.trim().to_string());
    }
    if let Some(pwd) = password {
        return Ok(pwd);
    }
    prompt_password_with_confirm()
}

fn prompt_password_with_confirm() -> Result<String, CliError> {
    if !io::stdin().is_terminal() {
        return Err(CliError::InputError(
            "No password provided. Use --password or --stdin flag, or run interactively.".into(),
        ));
    }

    let read = |prompt: &str| -> Result<String, CliError> {
        print!("{}", prompt);
        io::stdout()
            .flush()
            .map_err(|e| CliError::InputError(e.to_string()))?;
        rpassword::read_password()
            .map_err(|e| CliError::InputError(format!("Failed to read password: {}", e)))
    };

    let password = read("Enter new password: ")?;
    let confirm = read("Confirm password: ")?;
    if password != confirm {
        return Err(CliError::InputError("Passwords do not match".into()));
    }
    Ok(password)
}

async fn run_reset_password(
    config: Arc<AppConfig>,
    username: &str,
    password: Option<String>,
    stdin: bool,
) -> Result<(), CliError> {
    let new_password = read_new_password(password, stdin)?;
    let storage = StorageFactory::create(&config.database).await?;
    let auth = AuthService::new(storage, config);
    auth.reset_password(username, &new_password).await?;
    println!(
        "{} Password for '{}' reset successfully",
        "✓".green().bold(),
        username
    );
    Ok(())
}

// ============ config generate ============

fn config_generate(output_path: Option<&str>, force: bool) -> Result<(), CliError> {
    let path = output_path.unwrap_or(DEFAULT_SAMPLE_PATH);

    if !force && Path::new(path).exists() {
        print!(
            "{} {} {}",
            "File already exists:".yellow(),
            path.blue(),
            "Overwrite? [y/N] ".yellow()
        );
        io::stdout()
            .flush()
            .map_err(|e| CliError::InputError(e.to_string()))?;

        let mut input = String::new();
        io::stdin()
            .lock()
            .read_line(&mut input)
            .map_err(|e| CliError::InputError(e.to_string()))?;
        if !input.trim().eq_ignore_ascii_case("y") {
            println!("{}", "Aborted.".red());
            return Ok(());
        }
    }

    AppConfig::default().save_to_file(path).map_err(|e| {
        CliError::CommandError(format!("Unable to write configuration file: {}", e))
    })?;
    println!(
        "{} {}",
        "Configuration file generated:".green(),
        path.blue()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_generate_writes_toml() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("sample.toml");
        config_generate(path.to_str(), true).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("[server]"));
        assert!(content.contains("[rate_limit.login]"));
        let parsed: AppConfig = toml::from_str(&content).unwrap();
        assert_eq!(parsed.server.port, AppConfig::default().server.port);
    }

    #[test]
    fn test_password_from_argument() {
        assert_eq!(
            read_new_password(Some("hunter2-long".into()), false).unwrap(),
            "hunter2-long"
        );
    }

    #[test]
    fn test_storage_errors_map_to_storage_variant() {
        let err: CliError = AppError::database_connection("refused").into();
        assert!(matches!(err, CliError::StorageError(_)));
        let err: CliError = AppError::not_found("user not found").into();
        assert_eq!(err.format_simple(), "Command error: user not found");
    }
}
