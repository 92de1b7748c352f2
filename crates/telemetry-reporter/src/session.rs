// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use rand::distributions::Alphanumeric;
use rand::rngs::OsRng;
use rand::Rng;

/// Length of the session identifier assigned to each reporter.
pub const SESSION_ID_LEN: usize = 16;

/// Generates a random identifier of `len` characters drawn uniformly from
/// `[A-Za-z0-9]` using the operating system's secure random source.
pub fn generate_id(len: usize) -> String {
    OsRng
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}
