// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! # Telemetry Reporter
//!
//! Anonymous, fire-and-forget telemetry for host applications.
//!
//! A [`Reporter`] accepts [`TelemetryEvent`]s from any thread and ships each
//! one to the telemetry service in the background. Reporting never blocks the
//! caller and never turns a delivery failure into an application error:
//!
//! - at most [`MAX_CONCURRENT_REPORTS`] sends are in flight, extra events are
//!   dropped with a warning;
//! - every send is bounded by [`REPORT_DEADLINE`];
//! - [`Reporter::shutdown`] drains in-flight sends within a deadline and
//!   [`Reporter::close`] cancels them.
//!
//! Users opt out by setting `NSH_NO_TELEMETRY`; the host resolves it with
//! [`opt_out_from_env`] or [`ReporterConfig::from_env`] before building the
//! reporter.
//!
//! ```rust,ignore
//! use std::time::Duration;
//! use telemetry_reporter::{Reporter, ReporterConfig, TelemetryEvent};
//! use tokio_util::sync::CancellationToken;
//!
//! let reporter = Reporter::new(&CancellationToken::new(), ReporterConfig::from_env()?);
//! reporter.report_event(TelemetryEvent::info("startup", "host started"));
//! reporter.shutdown(Duration::from_secs(5)).await?;
//! ```

#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::todo))]
#![cfg_attr(not(test), deny(clippy::unimplemented))]
#![deny(unreachable_pub)]

pub mod config;
pub mod embedded_roots;
pub mod error;
pub mod http;
pub mod logger;
pub mod reporter;
pub mod rpc;
pub mod session;

mod task_group;

pub use config::{opt_out_from_env, ReporterConfig, OPT_OUT_ENV_VAR};
pub use error::ReporterError;
pub use reporter::{Reporter, ReporterState, MAX_CONCURRENT_REPORTS, REPORT_DEADLINE};
pub use rpc::{Code, ConnectClient, Request, TelemetryClient, TransportError};
pub use telemetry_proto::{Kind, StackFrame, TelemetryEvent};
