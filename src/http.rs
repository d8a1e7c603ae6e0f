//! HTTP client helper with native-tls support.
//!
//! Used by the Kroki diagram engine. Native-tls is configured explicitly
//! because ureq otherwise expects the rustls provider, which is not compiled in.

use std::time::Duration;

use ureq::Agent;
use ureq::tls::{RootCerts, TlsConfig, TlsProvider};

/// Create a new HTTP agent configured with native-tls and a global timeout.
///
/// The system's built-in root certificates are used via `PlatformVerifier`.
pub fn agent(timeout: Duration) -> Agent {
    let tls_config = TlsConfig::builder()
        .provider(TlsProvider::NativeTls)
        .root_certs(RootCerts::PlatformVerifier)
        .build();

    Agent::config_builder()
        .tls_config(tls_config)
        .timeout_global(Some(timeout))
        .http_status_as_error(true)
        .build()
        .into()
}
