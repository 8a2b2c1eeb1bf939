//! Connection validation
//!
//! Runs an adapter's connection test and applies the adapter's transport
//! policy before accepting its verdict. Expected failures (bad credentials,
//! unreachable host, policy violation) come back as a failed
//! [`ConnectionResult`]; only a config missing a required field is an `Err`.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::ProviderConfig;
use crate::error::{Error, ErrorKind, Result};
use crate::traits::{ProviderAdapter, TransportPolicy};

/// Outcome of a connection test
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionResult {
    pub success: bool,
    pub message: String,
    /// Failure class, `None` on success
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<ErrorKind>,
}

impl ConnectionResult {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            failure: None,
        }
    }

    pub fn failed(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            failure: Some(kind),
        }
    }
}

/// Validates provider connections
#[derive(Debug, Clone, Copy, Default)]
pub struct ConnectionValidator;

impl ConnectionValidator {
    pub fn new() -> Self {
        Self
    }

    /// Test `adapter`'s connection with `config`
    ///
    /// # Returns
    ///
    /// - `Ok(ConnectionResult)`: the verdict, success or classified failure
    /// - `Err(Error::Config)`: a field the adapter requires is blank; the
    ///   adapter is not contacted
    pub async fn validate(
        &self,
        adapter: &dyn ProviderAdapter,
        config: &ProviderConfig,
    ) -> Result<ConnectionResult> {
        let missing = config.missing_fields(adapter.required_fields());
        if !missing.is_empty() {
            let names: Vec<String> = missing.iter().map(ToString::to_string).collect();
            return Err(Error::config(format!(
                "{} config is missing required field(s): {}",
                adapter.provider_id(),
                names.join(", ")
            )));
        }

        debug!(
            "Testing connection to {} ({}) at {}",
            adapter.provider_id(),
            adapter.kind(),
            config.endpoint
        );

        let message = match adapter.test_connection(config).await {
            Ok(message) => message,
            Err(e) => {
                debug!("Connection test for {} failed: {}", adapter.provider_id(), e);
                return Ok(ConnectionResult::failed(e.kind(), e.detail()));
            }
        };

        if let Err(violation) = check_transport(&adapter.transport_policy(), config) {
            debug!(
                "Connection to {} rejected by transport policy: {}",
                adapter.provider_id(),
                violation
            );
            return Ok(ConnectionResult::failed(violation.kind(), violation.detail()));
        }

        Ok(ConnectionResult::ok(message))
    }
}

/// Check `config` against `policy`
fn check_transport(policy: &TransportPolicy, config: &ProviderConfig) -> Result<()> {
    let secure = config.secure();

    if policy.require_tls && !secure {
        return Err(Error::transport_policy(
            "Secure transport (TLS) is required for this provider",
        ));
    }

    let (expected, mode) = if secure {
        (policy.tls_port, "TLS")
    } else {
        (policy.plain_port, "plain-text")
    };

    if let Some(expected) = expected {
        match config.effective_port() {
            Some(port) if port != expected => {
                return Err(Error::transport_policy(format!(
                    "Port {} is inconsistent with {} mode (expected {})",
                    port, mode, expected
                )));
            }
            _ => {}
        }
    }

    Ok(())
}
