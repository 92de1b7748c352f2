// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use core::time::Duration;
use std::error::Error;

use telemetry_fips::reqwest_adapter::create_reqwest_client_builder;

use crate::embedded_roots;

/// Request timeout of the client built when the host does not supply one.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Builds the default telemetry HTTP client.
///
/// The client only trusts the embedded root certificates and gives up on any
/// request after [`DEFAULT_REQUEST_TIMEOUT`].
pub fn build_default_client() -> Result<reqwest::Client, Box<dyn Error>> {
    let roots = embedded_roots::load()?;
    let client = create_reqwest_client_builder(&roots.certs)?
        .timeout(DEFAULT_REQUEST_TIMEOUT)
        .build()?;
    Ok(client)
}
