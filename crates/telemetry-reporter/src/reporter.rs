// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! The report submission engine.
//!
//! A [`Reporter`] turns every accepted event into one background send. Sends
//! run on the runtime the reporter was created on, at most
//! [`MAX_CONCURRENT_REPORTS`] at a time, and each one is bounded by
//! [`REPORT_DEADLINE`]. Submitting never blocks the caller and never fails:
//! events are dropped when reporting is disabled, when the reporter is
//! shutting down, or when every send slot is taken.

use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::{Duration, SystemTime};

use reqwest::header::{HeaderValue, AUTHORIZATION};
use telemetry_proto::{TelemetryEvent, Timestamp};
use tokio::runtime::Handle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::ReporterConfig;
use crate::error::ReporterError;
use crate::http::build_default_client;
use crate::rpc::{ConnectClient, Request, TelemetryClient, TransportError};
use crate::session::{generate_id, SESSION_ID_LEN};
use crate::task_group::TaskGroup;

/// Maximum number of reports being sent at the same time.
pub const MAX_CONCURRENT_REPORTS: usize = 16;

/// Time budget of a single report, measured from the moment it is dispatched.
pub const REPORT_DEADLINE: Duration = Duration::from_secs(30);

const WEB_TAG: &str = "web";
const BACKEND_TAG: &str = "backend";

/// Lifecycle of a [`Reporter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReporterState {
    /// Accepting events.
    Active,
    /// Shutdown started; new events are dropped while in-flight sends finish.
    ShuttingDown,
    /// Every in-flight send finished on its own.
    Drained,
    /// In-flight sends were cancelled.
    Aborted,
}

/// Asynchronous, fire-and-forget telemetry reporter.
///
/// A host creates one reporter for the whole process, calls
/// [`Reporter::report_event`] from anywhere, and ends it with either
/// [`Reporter::shutdown`] or [`Reporter::close`]. A reporter cannot be
/// restarted.
pub struct Reporter {
    client: Arc<dyn TelemetryClient>,
    authorization: Option<HeaderValue>,
    session_id: String,
    tags: Vec<String>,
    enabled: bool,
    default_backend_tag: bool,
    shutting_down: AtomicBool,
    outcome: OnceLock<ReporterState>,
    tasks: TaskGroup,
}

impl Reporter {
    /// Creates a reporter that sends events over the Connect protocol to
    /// `config.base_url`.
    ///
    /// Background sends are cancelled when `parent` is.
    ///
    /// # Panics
    ///
    /// Panics when called outside of a Tokio runtime, or when no HTTP client
    /// was supplied and the embedded root certificates cannot be turned into
    /// one.
    pub fn new(parent: &CancellationToken, mut config: ReporterConfig) -> Self {
        let http_client = match config.http_client.take() {
            Some(client) => client,
            None => match build_default_client() {
                Ok(client) => client,
                Err(e) => panic!("Failed to build telemetry HTTP client: {e}"),
            },
        };
        let client = Arc::new(ConnectClient::new(http_client, &config.base_url));
        Self::with_client(parent, config, client)
    }

    /// Creates a reporter that delivers events through `client`.
    ///
    /// `config.base_url` and `config.http_client` are not used.
    ///
    /// # Panics
    ///
    /// Panics when called outside of a Tokio runtime.
    pub fn with_client(
        parent: &CancellationToken,
        config: ReporterConfig,
        client: Arc<dyn TelemetryClient>,
    ) -> Self {
        if !config.enabled {
            info!("Telemetry reporting is disabled");
        }

        let authorization = bearer_authorization(&config.auth_token);
        let session_id = generate_id(SESSION_ID_LEN);
        debug!("Telemetry session {session_id} started");

        Self {
            client,
            authorization,
            session_id,
            tags: config.tags,
            enabled: config.enabled,
            default_backend_tag: config.default_backend_tag,
            shutting_down: AtomicBool::new(false),
            outcome: OnceLock::new(),
            tasks: TaskGroup::new(Handle::current(), parent, MAX_CONCURRENT_REPORTS),
        }
    }

    /// Submits `event` for delivery in the background.
    ///
    /// The event's timestamp is replaced with the current time, an empty
    /// session id is filled with [`Reporter::session_id`], and the configured
    /// tags are appended after the caller's own.
    pub fn report_event(&self, mut event: TelemetryEvent) {
        if !self.enabled {
            debug!("Telemetry disabled, dropping event {}", event.name);
            return;
        }

        event.timestamp = Some(Timestamp::from(SystemTime::now()));
        if event.session_id.is_empty() {
            event.session_id.clone_from(&self.session_id);
        }
        event.tags.extend(self.tags.iter().cloned());
        if self.default_backend_tag && !event.tags.iter().any(|tag| tag == WEB_TAG) {
            event.tags.push(BACKEND_TAG.to_string());
        }

        if self.shutting_down.load(Ordering::Acquire) {
            debug!("Telemetry shutting down, dropping event {}", event.name);
            return;
        }

        // A submission that passed the check above just before shutdown set
        // the flag can still spawn after the drain finished. That send runs
        // unobserved; the race is accepted.
        let name = event.name.clone();
        let client = Arc::clone(&self.client);
        let authorization = self.authorization.clone();
        let dispatched = self
            .tasks
            .try_spawn(move |token| send_report(client, authorization, event, token));
        if !dispatched {
            warn!("Too many in-flight telemetry reports, dropping event {name}");
        }
    }

    /// Stops accepting events and waits up to `timeout` for in-flight sends
    /// before cancelling them.
    pub async fn shutdown(&self, timeout: Duration) -> Result<(), ReporterError> {
        self.shutdown_with(tokio::time::sleep(timeout)).await
    }

    /// Stops accepting events and waits for in-flight sends until `deadline`
    /// completes, then cancels whatever is left.
    ///
    /// Cancelled sends are not an error. The only error is a send that
    /// panicked.
    pub async fn shutdown_with<F>(&self, deadline: F) -> Result<(), ReporterError>
    where
        F: Future<Output = ()>,
    {
        self.shutting_down.store(true, Ordering::Release);
        debug!(
            "Telemetry shutdown requested with {} reports in flight",
            self.tasks.len()
        );

        tokio::select! {
            result = self.tasks.wait() => {
                self.finish(ReporterState::Drained);
                result
            }
            () = deadline => {
                debug!("Telemetry shutdown deadline reached, cancelling in-flight reports");
                self.close().await
            }
        }
    }

    /// Cancels every in-flight send and waits for them to unwind.
    pub async fn close(&self) -> Result<(), ReporterError> {
        self.shutting_down.store(true, Ordering::Release);
        self.tasks.cancel();
        let result = self.tasks.wait().await;
        self.finish(ReporterState::Aborted);
        result
    }

    /// Identifier stamped on events that do not carry their own.
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn state(&self) -> ReporterState {
        if let Some(state) = self.outcome.get() {
            return *state;
        }
        if self.shutting_down.load(Ordering::Acquire) {
            ReporterState::ShuttingDown
        } else {
            ReporterState::Active
        }
    }

    /// Number of sends that have not finished yet.
    pub fn in_flight(&self) -> usize {
        self.tasks.len()
    }

    fn finish(&self, state: ReporterState) {
        // The first terminal state sticks.
        let _ = self.outcome.set(state);
    }
}

impl fmt::Debug for Reporter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reporter")
            .field("session_id", &self.session_id)
            .field("tags", &self.tags)
            .field("enabled", &self.enabled)
            .field("state", &self.state())
            .field("in_flight", &self.in_flight())
            .finish_non_exhaustive()
    }
}

fn bearer_authorization(token: &str) -> Option<HeaderValue> {
    if token.is_empty() {
        return None;
    }
    match HeaderValue::from_str(&format!("Bearer {token}")) {
        Ok(mut value) => {
            value.set_sensitive(true);
            Some(value)
        }
        Err(e) => {
            warn!("Telemetry auth token is not a valid header value, sending reports without it: {e}");
            None
        }
    }
}

async fn send_report(
    client: Arc<dyn TelemetryClient>,
    authorization: Option<HeaderValue>,
    event: TelemetryEvent,
    token: CancellationToken,
) {
    let name = event.name.clone();
    let mut request = Request::new(event);
    request.timeout = Some(REPORT_DEADLINE);
    if let Some(value) = authorization {
        request.headers.insert(AUTHORIZATION, value);
    }

    let result = tokio::select! {
        () = token.cancelled() => Err(TransportError::Cancelled),
        outcome = tokio::time::timeout(REPORT_DEADLINE, client.report(request)) => {
            match outcome {
                Ok(result) => result,
                Err(_) => Err(TransportError::DeadlineExceeded),
            }
        }
    };

    match result {
        Ok(()) => debug!("Telemetry event {name} reported"),
        Err(e) => debug!("Failed to report telemetry event {name}: {e}"),
    }
}
