//! TLS configuration and certificate loading.

use std::path::Path;

use axum_server::tls_rustls::RustlsConfig;

use crate::config::TlsConfig;

/// Load rustls configuration from the PEM files named in `tls`.
///
/// Missing files are reported up front with the offending path instead of
/// surfacing as an opaque parse failure.
pub async fn load_tls_config(tls: &TlsConfig) -> Result<RustlsConfig, std::io::Error> {
    let cert_path = Path::new(&tls.cert_path);
    let key_path = Path::new(&tls.key_path);

    for (what, path) in [("Certificate", cert_path), ("Private key", key_path)] {
        if !path.exists() {
            return Err(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("{what} file not found: {path:?}"),
            ));
        }
    }

    RustlsConfig::from_pem_file(cert_path, key_path).await
}
