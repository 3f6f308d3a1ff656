//! 进程级基础设施：日志与 panic 处理

pub mod logging;
pub mod panic_handler;
