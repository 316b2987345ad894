//! Logging setup plus module-gated logging macros.
//!
//! Modules that log on hot paths declare a flag and use the macros, which are
//! exported at the crate root:
//! ```ignore
//! const ENABLE_LOGS: bool = true;
//! use crate::{log_info, log_warn};
//!
//! log_info!("camera stream acquired");
//! ```

use std::sync::Once;

static INIT: Once = Once::new();

/// Install `env_logger` once for the process.
///
/// Reads `RUST_LOG`; falls back to `Info` when it is unset. Calling this more
/// than once, or after a host application installed its own logger, is a no-op.
pub fn init_logging() {
    INIT.call_once(|| {
        let mut builder = env_logger::Builder::new();
        builder.filter_level(log::LevelFilter::Info);
        if let Ok(filters) = std::env::var("RUST_LOG") {
            builder.parse_filters(&filters);
        }
        if builder.try_init().is_ok() {
            log::info!("receipt capture logging initialised");
        }
    });
}

/// Forward to a `log` level macro only when the calling module's
/// `ENABLE_LOGS` const is true.
#[doc(hidden)]
#[macro_export]
macro_rules! gated_log {
    ($level:ident, $($arg:tt)*) => {
        if ENABLE_LOGS {
            log::$level!($($arg)*);
        }
    };
}

#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => { $crate::gated_log!(info, $($arg)*) };
}

#[macro_export]
macro_rules! log_warn {
    ($($arg:tt)*) => { $crate::gated_log!(warn, $($arg)*) };
}

#[macro_export]
macro_rules! log_error {
    ($($arg:tt)*) => { $crate::gated_log!(error, $($arg)*) };
}
