// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Embedded trust anchors for the telemetry endpoint.
//!
//! Reports are only sent over connections that chain up to Let's Encrypt,
//! i.e. ISRG Root X1 (RSA) and ISRG Root X2 (ECDSA). The host's trust store is
//! never consulted.

use std::io::BufReader;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EmbeddedRootError {
    #[error("embedded roots parse error: {0}")]
    Parse(#[from] std::io::Error),
    #[error("embedded roots contain no certificates")]
    Empty,
}

/// DER-encoded root certificates.
#[derive(Debug, Clone)]
pub struct RootBundle {
    pub certs: Vec<Vec<u8>>,
}

const ROOTS_PEM: &[u8] = include_bytes!("embedded_roots/data/roots.pem");

/// Parses the embedded PEM bundle.
pub fn load() -> Result<RootBundle, EmbeddedRootError> {
    parse_pem(ROOTS_PEM)
}

/// Parses every certificate found in a PEM bundle.
fn parse_pem(pem: &[u8]) -> Result<RootBundle, EmbeddedRootError> {
    let mut reader = BufReader::new(pem);
    let certs = rustls_pemfile::certs(&mut reader)
        .map(|cert| cert.map(|der| der.as_ref().to_vec()))
        .collect::<Result<Vec<_>, _>>()?;

    if certs.is_empty() {
        return Err(EmbeddedRootError::Empty);
    }

    Ok(RootBundle { certs })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedded_bundle_has_both_isrg_roots() {
        let bundle = load().expect("embedded roots parse");
        assert_eq!(bundle.certs.len(), 2);
        assert!(bundle.certs.iter().all(|der| !der.is_empty()));
    }

    #[test]
    fn empty_bundle_is_rejected() {
        let err = parse_pem(b"").expect_err("no certificates");
        assert!(matches!(err, EmbeddedRootError::Empty));

        let err = parse_pem(b"just some text\n").expect_err("no certificates");
        assert!(matches!(err, EmbeddedRootError::Empty));
    }
}
