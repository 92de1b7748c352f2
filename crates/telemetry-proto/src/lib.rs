// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Protobuf models for the `telemetry.v1alpha1` report service.
//!
//! The messages mirror `proto/telemetry/v1alpha1/telemetry.proto` and are kept
//! in sync by hand so the workspace builds without `protoc`. The service has a
//! single unary procedure, `Report`, which takes a [`TelemetryEvent`] and
//! answers with `google.protobuf.Empty` (`()` in prost).

use std::collections::HashMap;

pub use prost::Message;
pub use prost_types::Timestamp;

/// Fully-qualified protobuf service name.
pub const TELEMETRY_SERVICE: &str = "telemetry.v1alpha1.Telemetry";

/// HTTP path of the `Report` procedure, relative to the server base URL.
pub const REPORT_PROCEDURE: &str = "/telemetry.v1alpha1.Telemetry/Report";

/// Severity of a reported event.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum Kind {
    Unspecified = 0,
    Info = 1,
    Warning = 2,
    Error = 3,
}

impl Kind {
    /// Name of the enum value as it appears in the `.proto` definition.
    pub fn as_str_name(&self) -> &'static str {
        match self {
            Kind::Unspecified => "KIND_UNSPECIFIED",
            Kind::Info => "KIND_INFO",
            Kind::Warning => "KIND_WARNING",
            Kind::Error => "KIND_ERROR",
        }
    }

    /// Parses a `.proto` enum value name.
    pub fn from_str_name(value: &str) -> Option<Self> {
        match value {
            "KIND_UNSPECIFIED" => Some(Self::Unspecified),
            "KIND_INFO" => Some(Self::Info),
            "KIND_WARNING" => Some(Self::Warning),
            "KIND_ERROR" => Some(Self::Error),
            _ => None,
        }
    }
}

/// A single frame of an error stack trace.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct StackFrame {
    #[prost(string, tag = "1")]
    pub file: String,
    #[prost(string, tag = "2")]
    pub function: String,
    #[prost(int32, tag = "3")]
    pub line: i32,
    #[prost(int32, tag = "4")]
    pub column: i32,
}

/// A telemetry event as sent to the `Report` procedure.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct TelemetryEvent {
    /// Correlates events sent by one reporter instance.
    #[prost(string, tag = "1")]
    pub session_id: String,
    /// When the event was sent.
    #[prost(message, optional, tag = "2")]
    pub timestamp: Option<Timestamp>,
    #[prost(enumeration = "Kind", tag = "3")]
    pub kind: i32,
    #[prost(string, tag = "4")]
    pub name: String,
    #[prost(string, tag = "5")]
    pub message: String,
    #[prost(map = "string, string", tag = "6")]
    pub values: HashMap<String, String>,
    /// Only populated for [`Kind::Error`] events.
    #[prost(message, repeated, tag = "7")]
    pub stack_trace: Vec<StackFrame>,
    #[prost(string, repeated, tag = "8")]
    pub tags: Vec<String>,
}

impl TelemetryEvent {
    /// Builds an event of the given kind with a name and message.
    pub fn new(kind: Kind, name: impl Into<String>, message: impl Into<String>) -> Self {
        let mut event = Self {
            name: name.into(),
            message: message.into(),
            ..Default::default()
        };
        event.set_kind(kind);
        event
    }

    pub fn info(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(Kind::Info, name, message)
    }

    pub fn warning(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(Kind::Warning, name, message)
    }

    pub fn error(
        name: impl Into<String>,
        message: impl Into<String>,
        stack_trace: Vec<StackFrame>,
    ) -> Self {
        let mut event = Self::new(Kind::Error, name, message);
        event.stack_trace = stack_trace;
        event
    }

    /// Attaches a key/value pair of context.
    #[must_use]
    pub fn with_value(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }

    /// Appends a tag.
    #[must_use]
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }
}
