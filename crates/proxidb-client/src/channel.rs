//! gRPC channel construction from a [`ClientConfig`].

use tonic::transport::{Certificate, Channel, ClientTlsConfig, Endpoint, Identity};

use crate::config::ClientConfig;
use crate::error::{ClientError, Result};

/// Build the channel for a client instance.
///
/// Plaintext endpoints are used unless a root CA is configured; a client
/// certificate chain plus private key upgrades the TLS configuration to
/// mutual TLS. With several seeds and no load balancer in front, requests are
/// balanced across all of them. The channel connects lazily, so no network
/// I/O happens here.
pub(crate) async fn build_channel(config: &ClientConfig) -> Result<Channel> {
    if config.seeds.is_empty() {
        return Err(ClientError::Configuration(
            "at least one seed is required".to_string(),
        ));
    }

    let tls_config = match &config.root_ca_path {
        Some(ca_cert_path) => {
            let ca_cert = tokio::fs::read(ca_cert_path).await.map_err(|e| {
                ClientError::Configuration(format!("Failed to read CA certificate: {}", e))
            })?;

            let mut tls_config =
                ClientTlsConfig::new().ca_certificate(Certificate::from_pem(ca_cert));

            if let Some(name) = &config.ssl_target_name_override {
                tls_config = tls_config.domain_name(name.clone());
            }

            match (&config.cert_chain_path, &config.private_key_path) {
                (Some(cert_path), Some(key_path)) => {
                    let cert = tokio::fs::read(cert_path).await.map_err(|e| {
                        ClientError::Configuration(format!(
                            "Failed to read client certificate chain: {}",
                            e
                        ))
                    })?;
                    let key = tokio::fs::read(key_path).await.map_err(|e| {
                        ClientError::Configuration(format!(
                            "Failed to read client private key: {}",
                            e
                        ))
                    })?;
                    tls_config = tls_config.identity(Identity::from_pem(cert, key));
                }
                (None, None) => {}
                _ => {
                    return Err(ClientError::Configuration(
                        "client certificate chain and private key must be set together"
                            .to_string(),
                    ))
                }
            }

            Some(tls_config)
        }
        None => None,
    };

    let scheme = if tls_config.is_some() { "https" } else { "http" };
    let mut endpoints = Vec::with_capacity(config.seeds.len());
    for seed in &config.seeds {
        let endpoint = Endpoint::from_shared(format!("{}://{}", scheme, seed))
            .map_err(|e| ClientError::Configuration(format!("Invalid seed '{}': {}", seed, e)))?;
        let endpoint = match &tls_config {
            Some(tls) => endpoint.tls_config(tls.clone()).map_err(|e| {
                ClientError::Configuration(format!("TLS configuration error: {}", e))
            })?,
            None => endpoint,
        };
        endpoints.push(endpoint);
    }

    let channel = if config.is_loadbalancer || endpoints.len() == 1 {
        log::debug!(
            "connecting to {} ({}, load balancer: {})",
            config.seeds[0],
            scheme,
            config.is_loadbalancer
        );
        endpoints.swap_remove(0).connect_lazy()
    } else {
        log::debug!(
            "balancing across {} seeds ({})",
            endpoints.len(),
            scheme
        );
        Channel::balance_list(endpoints.into_iter())
    };

    Ok(channel)
}
