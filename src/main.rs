use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;

use inkpost::cli::{Cli, Commands};
use inkpost::config::AppConfig;
use inkpost::runtime::modes::{run_cli, run_server};
use inkpost::system::logging::init_logging;
use inkpost::system::panic_handler::{RunMode, install_panic_hook};

#[actix_web::main]
async fn main() -> ExitCode {
    // .env 需要在读取配置之前加载
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let config = Arc::new(AppConfig::load(cli.config.as_deref()));

    match cli.command() {
        Commands::Serve => {
            install_panic_hook(RunMode::Server);

            // guard 必须持有到进程退出，否则缓冲中的日志会丢失
            let _log_guard = match init_logging(&config.logging) {
                Ok(guard) => guard,
                Err(e) => {
                    eprintln!("Failed to initialize logging: {}", e);
                    return ExitCode::FAILURE;
                }
            };

            if let Err(e) = run_server(config).await {
                tracing::error!("Server exited with error: {:#}", e);
                return ExitCode::FAILURE;
            }
            ExitCode::SUCCESS
        }
        command => {
            install_panic_hook(RunMode::Cli);
            match run_cli(command, config).await {
                Ok(()) => ExitCode::SUCCESS,
                Err(e) => {
                    eprintln!("{}", e.format_colored());
                    ExitCode::FAILURE
                }
            }
        }
    }
}
