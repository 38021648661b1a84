//! Shared building blocks for every `subrank` crate.
//!
//! * [`config`]: the scan configuration value object and its defaults.
//! * [`target`]: parsing of the target [`target::Domain`].
//! * [`models`]: the records flowing through the discovery and scoring pipeline.
//! * [`error`]: the error taxonomy shared by the pipeline stages.
//! * [`cancel`]: cooperative cancellation for long running phases.

pub mod cancel;
pub mod config;
pub mod error;
pub mod models;
pub mod target;

#[doc(hidden)]
pub use tracing as __tracing;

#[macro_export]
macro_rules! info {
    ($($arg:tt)*) => {
        $crate::__tracing::info!($($arg)*)
    };
}

#[macro_export]
macro_rules! success {
    ($($arg:tt)*) => {
        $crate::__tracing::info!(target: "subrank::success", $($arg)*)
    };
}

#[macro_export]
macro_rules! warn {
    ($($arg:tt)*) => {
        $crate::__tracing::warn!($($arg)*)
    };
}

#[macro_export]
macro_rules! error {
    ($($arg:tt)*) => {
        $crate::__tracing::error!($($arg)*)
    };
}
