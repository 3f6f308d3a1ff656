//! Panic hook
//!
//! 崩溃报告追加写入 `crash.log`（可用 `INKPOST_CRASH_LOG` 覆盖路径）。
//! 服务模式下同时走 tracing，CLI 模式只在终端提示一行。

use std::any::Any;
use std::backtrace::Backtrace;
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::panic::{self, PanicHookInfo};

use chrono::{DateTime, Utc};
use colored::Colorize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    Server,
    Cli,
}

const DEFAULT_CRASH_LOG: &str = "crash.log";

fn crash_log_path() -> String {
    std::env::var("INKPOST_CRASH_LOG")
        .ok()
        .filter(|p| !p.is_empty())
        .unwrap_or_else(|| DEFAULT_CRASH_LOG.to_string())
}

fn payload_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "non-string panic payload".to_string())
}

struct CrashReport {
    at: DateTime<Utc>,
    mode: RunMode,
    thread: String,
    message: String,
    location: String,
    backtrace: String,
}

impl CrashReport {
    fn capture(info: &PanicHookInfo<'_>, mode: RunMode) -> Self {
        Self {
            at: Utc::now(),
            mode,
            thread: std::thread::current()
                .name()
                .unwrap_or("<unnamed>")
                .to_string(),
            message: payload_message(info.payload()),
            location: info
                .location()
                .map(|l| format!("{}:{}", l.file(), l.line()))
                .unwrap_or_else(|| "<unknown>".to_string()),
            backtrace: Backtrace::force_capture().to_string(),
        }
    }

    fn write_to(&self, out: &mut impl Write) -> io::Result<()> {
        writeln!(
            out,
            "--- inkpost crash {} ({:?}) ---",
            self.at.to_rfc3339(),
            self.mode
        )?;
        writeln!(out, "thread:   {}", self.thread)?;
        writeln!(out, "message:  {}", self.message)?;
        writeln!(out, "location: {}", self.location)?;
        writeln!(out, "{}", self.backtrace)?;
        writeln!(out)
    }

    fn append_to_file(&self, path: &str) -> io::Result<()> {
        let mut file = OpenOptions::new().create(true).append(true).open(path)?;
        self.write_to(&mut file)
    }
}

pub fn install_panic_hook(mode: RunMode) {
    panic::set_hook(Box::new(move |info| {
        let report = CrashReport::capture(info, mode);
        let path = crash_log_path();
        let saved = report.append_to_file(&path);

        match mode {
            RunMode::Server => {
                tracing::error!(
                    panic.thread = %report.thread,
                    panic.location = %report.location,
                    "panic: {}",
                    report.message
                );
                eprintln!(
                    "{} {} at {}",
                    "panic:".red().bold(),
                    report.message,
                    report.location.yellow()
                );
            }
            RunMode::Cli => eprintln!("inkpost panicked: {}", report.message),
        }

        match saved {
            Ok(()) => eprintln!("crash report appended to {}", path),
            Err(e) => eprintln!("could not write crash report to {}: {}", path, e),
        }
    }));
}
