// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Client side of the `telemetry.v1alpha1.Telemetry/Report` procedure.
//!
//! [`ConnectClient`] speaks the Connect unary protocol with binary protobuf
//! payloads: the event is POSTed as `application/proto` and a `200 OK` with an
//! encoded `google.protobuf.Empty` acknowledges it. Any other status carries a
//! JSON error body (`{"code": ..., "message": ...}`), or, when an intermediary
//! answered instead of the server, no usable body at all, in which case the
//! code is derived from the HTTP status.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use prost::Message;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use reqwest::StatusCode;
use serde::Deserialize;
use telemetry_proto::{TelemetryEvent, REPORT_PROCEDURE};
use thiserror::Error;
use tracing::debug;

const PROTO_CONTENT_TYPE: &str = "application/proto";
const PROTOCOL_VERSION_HEADER: HeaderName = HeaderName::from_static("connect-protocol-version");
const TIMEOUT_HEADER: HeaderName = HeaderName::from_static("connect-timeout-ms");

/// Connect error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Code {
    Canceled,
    Unknown,
    InvalidArgument,
    DeadlineExceeded,
    NotFound,
    AlreadyExists,
    PermissionDenied,
    ResourceExhausted,
    FailedPrecondition,
    Aborted,
    OutOfRange,
    Unimplemented,
    Internal,
    Unavailable,
    DataLoss,
    Unauthenticated,
}

impl Code {
    pub fn as_str(&self) -> &'static str {
        match self {
            Code::Canceled => "canceled",
            Code::Unknown => "unknown",
            Code::InvalidArgument => "invalid_argument",
            Code::DeadlineExceeded => "deadline_exceeded",
            Code::NotFound => "not_found",
            Code::AlreadyExists => "already_exists",
            Code::PermissionDenied => "permission_denied",
            Code::ResourceExhausted => "resource_exhausted",
            Code::FailedPrecondition => "failed_precondition",
            Code::Aborted => "aborted",
            Code::OutOfRange => "out_of_range",
            Code::Unimplemented => "unimplemented",
            Code::Internal => "internal",
            Code::Unavailable => "unavailable",
            Code::DataLoss => "data_loss",
            Code::Unauthenticated => "unauthenticated",
        }
    }

    pub fn from_str_name(value: &str) -> Option<Self> {
        let code = match value {
            "canceled" => Code::Canceled,
            "unknown" => Code::Unknown,
            "invalid_argument" => Code::InvalidArgument,
            "deadline_exceeded" => Code::DeadlineExceeded,
            "not_found" => Code::NotFound,
            "already_exists" => Code::AlreadyExists,
            "permission_denied" => Code::PermissionDenied,
            "resource_exhausted" => Code::ResourceExhausted,
            "failed_precondition" => Code::FailedPrecondition,
            "aborted" => Code::Aborted,
            "out_of_range" => Code::OutOfRange,
            "unimplemented" => Code::Unimplemented,
            "internal" => Code::Internal,
            "unavailable" => Code::Unavailable,
            "data_loss" => Code::DataLoss,
            "unauthenticated" => Code::Unauthenticated,
            _ => return None,
        };
        Some(code)
    }

    /// Code implied by an HTTP status when the response carries no Connect error body.
    pub fn from_http_status(status: StatusCode) -> Self {
        match status.as_u16() {
            400 => Code::Internal,
            401 => Code::Unauthenticated,
            403 => Code::PermissionDenied,
            404 => Code::Unimplemented,
            429 | 502 | 503 | 504 => Code::Unavailable,
            _ => Code::Unknown,
        }
    }
}

impl fmt::Display for Code {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a single report could not be delivered.
#[derive(Debug, Error)]
pub enum TransportError {
    /// DNS, TLS, socket or timeout failure below the RPC layer.
    #[error("transport error: {0}")]
    Request(#[from] reqwest::Error),
    /// The server answered with an error.
    #[error("rpc error: {code}: {message}")]
    Rpc { code: Code, message: String },
    /// The acknowledgement could not be decoded.
    #[error("failed to decode acknowledgement: {0}")]
    Decode(#[from] prost::DecodeError),
    /// The reporter aborted the send.
    #[error("report cancelled")]
    Cancelled,
    /// The per-report deadline elapsed.
    #[error("report deadline exceeded")]
    DeadlineExceeded,
}

/// A request message together with its request-scoped metadata.
#[derive(Debug, Clone)]
pub struct Request<T> {
    pub message: T,
    pub headers: HeaderMap,
    /// Remaining time budget, propagated to the server in the
    /// `Connect-Timeout-Ms` header. It never extends the HTTP client's own
    /// timeout.
    pub timeout: Option<Duration>,
}

impl<T> Request<T> {
    pub fn new(message: T) -> Self {
        Self {
            message,
            headers: HeaderMap::new(),
            timeout: None,
        }
    }
}

/// Transport able to deliver telemetry events.
///
/// Implementations are shared by every in-flight report and must be safe for
/// concurrent use.
#[async_trait]
pub trait TelemetryClient: Send + Sync {
    /// Delivers one event and waits for the server acknowledgement.
    async fn report(&self, request: Request<TelemetryEvent>) -> Result<(), TransportError>;
}

/// Connect protocol client for the telemetry service.
#[derive(Debug, Clone)]
pub struct ConnectClient {
    client: reqwest::Client,
    report_url: String,
}

impl ConnectClient {
    pub fn new(client: reqwest::Client, base_url: &str) -> Self {
        let report_url = format!("{}{}", base_url.trim_end_matches('/'), REPORT_PROCEDURE);
        Self { client, report_url }
    }

    pub fn report_url(&self) -> &str {
        &self.report_url
    }
}

#[async_trait]
impl TelemetryClient for ConnectClient {
    async fn report(&self, request: Request<TelemetryEvent>) -> Result<(), TransportError> {
        let Request {
            message,
            mut headers,
            timeout,
        } = request;

        headers.insert(CONTENT_TYPE, HeaderValue::from_static(PROTO_CONTENT_TYPE));
        headers.insert(PROTOCOL_VERSION_HEADER, HeaderValue::from_static("1"));
        if let Some(timeout) = timeout {
            headers.insert(TIMEOUT_HEADER, HeaderValue::from(timeout_millis(timeout)));
        }

        debug!(
            url = %self.report_url,
            headers = ?redact_headers(&headers),
            "telemetry RPC request"
        );

        // The remaining budget only travels in the header; the client's own
        // timeout keeps applying to the request.
        let response = self
            .client
            .post(&self.report_url)
            .headers(headers)
            .body(message.encode_to_vec())
            .send()
            .await?;
        let status = response.status();
        let body = response.bytes().await?;

        debug!(
            url = %self.report_url,
            status = %status,
            body_len = body.len(),
            "telemetry RPC response"
        );

        if status != StatusCode::OK {
            return Err(error_from_response(status, &body));
        }

        <()>::decode(body)?;
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    code: String,
    #[serde(default)]
    message: String,
}

/// Maps a non-200 response onto a Connect error.
fn error_from_response(status: StatusCode, body: &[u8]) -> TransportError {
    match serde_json::from_slice::<ErrorBody>(body) {
        Ok(error) => TransportError::Rpc {
            code: Code::from_str_name(&error.code).unwrap_or(Code::Unknown),
            message: error.message,
        },
        Err(_) => TransportError::Rpc {
            code: Code::from_http_status(status),
            message: format!("HTTP status {status}"),
        },
    }
}

/// Connect caps the timeout header at ten digits.
fn timeout_millis(timeout: Duration) -> u64 {
    const MAX_TIMEOUT_MS: u64 = 9_999_999_999;
    u64::try_from(timeout.as_millis())
        .unwrap_or(MAX_TIMEOUT_MS)
        .min(MAX_TIMEOUT_MS)
}

/// Returns a redacted view of request headers suitable for debug logging.
fn redact_headers(headers: &HeaderMap) -> Vec<(String, String)> {
    headers
        .iter()
        .map(|(name, value)| {
            let display = if name == reqwest::header::AUTHORIZATION || value.is_sensitive() {
                "<redacted>".to_string()
            } else {
                value
                    .to_str()
                    .map(|s| s.to_string())
                    .unwrap_or_else(|_| "<non-utf8>".to_string())
            };
            (name.as_str().to_string(), display)
        })
        .collect()
}
