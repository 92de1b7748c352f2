// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Sends one telemetry event and waits for it to be delivered.
//!
//! ```text
//! telemetry-send [NAME] [MESSAGE]
//! ```
//!
//! The server and credentials come from `TELEMETRY_BASE_URL`,
//! `TELEMETRY_AUTH_TOKEN` and `TELEMETRY_TAGS`. Nothing is sent when
//! `NSH_NO_TELEMETRY` is set.

#![cfg_attr(not(test), deny(clippy::panic))]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::todo))]
#![cfg_attr(not(test), deny(clippy::unimplemented))]

use std::env;
use std::process::ExitCode;

use tokio::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

use telemetry_reporter::{logger, Reporter, ReporterConfig, TelemetryEvent};

const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);
const DEFAULT_EVENT_NAME: &str = "ping";
const DEFAULT_EVENT_MESSAGE: &str = "telemetry-send";

#[tokio::main]
pub async fn main() -> ExitCode {
    let log_level = env::var("TELEMETRY_LOG_LEVEL")
        .map(|val| val.to_lowercase())
        .unwrap_or("info".to_string());

    let env_filter = format!("h2=off,hyper=off,rustls=off,{log_level}");
    let env_filter = match EnvFilter::try_new(env_filter) {
        Ok(filter) => filter,
        Err(e) => {
            eprintln!("could not parse TELEMETRY_LOG_LEVEL: {e}");
            return ExitCode::FAILURE;
        }
    };

    let subscriber = tracing_subscriber::fmt::Subscriber::builder()
        .with_env_filter(env_filter)
        .event_format(logger::Formatter)
        .finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("setting default subscriber failed: {e}");
        return ExitCode::FAILURE;
    }

    debug!("Logging subsystem enabled");

    let config = match ReporterConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("Error creating telemetry configuration: {e}");
            return ExitCode::FAILURE;
        }
    };

    let mut args = env::args().skip(1);
    let name = args.next().unwrap_or_else(|| DEFAULT_EVENT_NAME.to_string());
    let message = args
        .next()
        .unwrap_or_else(|| DEFAULT_EVENT_MESSAGE.to_string());

    let cancel_token = CancellationToken::new();
    let reporter = Reporter::new(&cancel_token, config);
    info!(
        "Sending telemetry event {name} in session {}",
        reporter.session_id()
    );
    reporter.report_event(TelemetryEvent::info(name, message));

    // Ctrl-C cuts the drain short.
    let deadline = async {
        tokio::select! {
            () = tokio::time::sleep(SHUTDOWN_TIMEOUT) => {}
            _ = tokio::signal::ctrl_c() => {
                debug!("Interrupted, abandoning in-flight telemetry");
            }
        }
    };

    match reporter.shutdown_with(deadline).await {
        Ok(()) => {
            debug!("Telemetry reporter stopped in state {:?}", reporter.state());
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("Telemetry reporter failed during shutdown: {e}");
            ExitCode::FAILURE
        }
    }
}
