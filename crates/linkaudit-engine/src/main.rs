//! linkaudit: LLDP wiring audit CLI
//!
//! Exit status: 0 success, 2 partial (some devices failed), 3 fatal
//! (malformed input or no SNMP transport), 130 cancelled, 1 anything else.

use linkaudit_core::{AppContext, exit_code_for_error, requested_log_level, run_with_ctrl_c};

/// Logs an error message to stderr
macro_rules! log_error {
    ($($arg:tt)*) => {
        linkaudit_core::log_error!($($arg)*);
    };
}

const DEFAULT_LOG_LEVEL: &str = "info";

#[tokio::main]
async fn main() {
    let args: Vec<String> = std::env::args().collect();
    let level = requested_log_level(&args).unwrap_or(DEFAULT_LOG_LEVEL);
    if let Err(e) = linkaudit_core::logging::init_logging(level) {
        eprintln!("[WARN] Failed to initialize structured logging: {}", e);
    }

    let context = AppContext::from_env();
    match run_with_ctrl_c(args, &context).await {
        Ok(outcome) => std::process::exit(outcome.exit_code()),
        Err(e) => {
            log_error!("{:#}", e);
            std::process::exit(exit_code_for_error(&e));
        }
    }
}
