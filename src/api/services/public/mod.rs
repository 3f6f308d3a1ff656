//! 前台公开 API（`/api`）

mod comments;
mod content;
mod site;

pub use comments::*;
pub use content::*;
pub use site::*;
