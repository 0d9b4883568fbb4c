//! Tracing setup.
//!
//! - GRADEBOOKD_LOG sets the filter ("debug", or directives like "info,gradebookd=debug").
//! - GRADEBOOKD_LOG_FORMAT=json switches to JSON lines.
//!
//! Logs go to stderr. Stdout carries IPC responses only.

use tracing_subscriber::EnvFilter;

pub fn init_tracing() {
    let filter = EnvFilter::try_from_env("GRADEBOOKD_LOG")
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true);

    match std::env::var("GRADEBOOKD_LOG_FORMAT").as_deref() {
        Ok("json") => builder.json().init(),
        _ => builder.init(),
    }
}
