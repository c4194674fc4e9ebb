//! Control API authentication.

mod middleware;

pub use middleware::ControlAuth;
