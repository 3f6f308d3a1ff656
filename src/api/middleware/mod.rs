pub mod auth;
pub mod client_info;
pub mod rate_limit;
pub mod recover;
pub mod request_id;
pub mod timeout;
pub mod timing;
pub mod webhook;

pub use auth::{AdminAuth, AuthUser, OptionalAuth};
pub use rate_limit::{FixedWindowLimiter, RateLimit, RateLimiters, refresh_rate_limiter};
pub use recover::CatchPanic;
pub use request_id::{RequestId, RequestIdMiddleware};
pub use timeout::Timeout;
pub use timing::TimingMiddleware;
pub use webhook::BillSignature;
