// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

/// Errors surfaced by the telemetry reporter.
///
/// Delivery failures never show up here; they are logged and dropped by the
/// background task that hit them.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ReporterError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Report task failed: {0}")]
    TaskFailed(String),
}
