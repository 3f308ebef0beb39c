// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@mitander.dev>

use std::str::FromStr;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

const QUIET_MODULES: &str =
    "h2=warn,hyper=warn,hyper_util=warn,reqwest=warn,alloy_transport_http=info,alloy_rpc_client=info";

/// Bare levels ("debug") get the quiet-module defaults appended; directive
/// strings (with ',' or '=') are used as-is.
pub fn filter_spec(log_level: &str) -> String {
    let normalized = log_level.trim();
    if normalized.is_empty() {
        return format!("info,{QUIET_MODULES}");
    }
    if normalized.contains(',') || normalized.contains('=') {
        normalized.to_string()
    } else {
        format!("{normalized},{QUIET_MODULES}")
    }
}

pub fn setup_logging(log_level: &str, json_format: bool) {
    let spec = filter_spec(log_level);
    let filter = EnvFilter::from_str(&spec).unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = tracing_subscriber::registry().with(filter);

    // Logs go to stderr so command output on stdout stays clean.
    let result = if json_format {
        let json_layer = fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_current_span(false);
        subscriber.with(json_layer).try_init()
    } else {
        let fmt_layer = fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .compact();
        subscriber.with(fmt_layer).try_init()
    };
    if result.is_err() {
        return;
    }

    let base = spec.split(',').next().unwrap_or("info");
    tracing::debug!(
        target: "config",
        base,
        format = if json_format { "json" } else { "compact" },
        "Logging initialized"
    );
}
