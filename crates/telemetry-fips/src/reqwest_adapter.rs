// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use reqwest::ClientBuilder;
use std::error::Error;
use tracing::debug;

/// Creates a reqwest client builder that only trusts the given DER-encoded root certificates.
/// The platform and webpki trust stores are never consulted.
#[cfg(not(feature = "fips"))]
pub fn create_reqwest_client_builder<C: AsRef<[u8]>>(
    trust_anchors: &[C],
) -> Result<ClientBuilder, Box<dyn Error>> {
    let mut builder = reqwest::Client::builder()
        .use_rustls_tls()
        .tls_built_in_root_certs(false);

    let mut valid_count = 0;
    for der in trust_anchors {
        match reqwest::Certificate::from_der(der.as_ref()) {
            Ok(cert) => {
                builder = builder.add_root_certificate(cert);
                valid_count += 1;
            }
            Err(err) => {
                debug!("Failed to parse trust anchor: {:?}", err);
            }
        }
    }
    if valid_count == 0 {
        return Err("No valid trust anchors provided".into());
    }

    Ok(builder)
}

/// Creates a reqwest client builder with FIPS-compliant TLS configuration.
/// Only the given DER-encoded root certificates are trusted.
#[cfg(feature = "fips")]
pub fn create_reqwest_client_builder<C: AsRef<[u8]>>(
    trust_anchors: &[C],
) -> Result<ClientBuilder, Box<dyn Error>> {
    use rustls::pki_types::CertificateDer;

    // The provider is expected to be installed by the host, e.g. with
    // rustls::crypto::default_fips_provider().install_default()
    let provider =
        rustls::crypto::CryptoProvider::get_default().ok_or("No crypto provider configured")?;

    if !provider.fips() {
        return Err("Crypto provider is not FIPS-compliant".into());
    }

    let mut root_cert_store = rustls::RootCertStore::empty();
    let mut valid_count = 0;
    for der in trust_anchors {
        match root_cert_store.add(CertificateDer::from(der.as_ref().to_vec())) {
            Ok(()) => valid_count += 1,
            Err(err) => {
                debug!("Failed to parse trust anchor: {:?}", err);
            }
        }
    }
    if valid_count == 0 {
        return Err("No valid trust anchors provided".into());
    }

    let versions = rustls::ALL_VERSIONS.to_vec();
    let config_builder = rustls::ClientConfig::builder_with_provider(provider.clone())
        .with_protocol_versions(&versions)
        .map_err(|_| "Failed to set protocol versions")?;

    let config = config_builder
        .with_root_certificates(root_cert_store)
        .with_no_client_auth();

    if !config.fips() {
        return Err("The final TLS configuration is not FIPS-compliant".into());
    }
    debug!("Client builder is configured with FIPS.");

    Ok(reqwest::Client::builder().use_preconfigured_tls(config))
}
