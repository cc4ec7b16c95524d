pub mod exit;
pub mod log_assert;
pub mod poll;
pub mod stop_signal;
pub mod time;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
