pub mod classify;
pub mod clipboard;
pub mod config;
pub mod convert;
pub mod debounce;
pub mod error;
pub mod i18n;
pub mod insert;
pub mod logging;
pub mod markdown;
pub mod notify;
pub mod output;
pub mod router;
pub mod target;

/// Application name used for notification titles, data dir and log file.
pub const APP_NAME: &str = "PasteMD";

/// Loopback port the daemon listens on for trigger commands.
pub const CONTROL_PORT: u16 = 7878;
