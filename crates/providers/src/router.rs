//! Provider construction from configuration.

use crate::openai_compat::OpenAiCompatProvider;
use crate::resilient::{ResilientProvider, RetryPolicy};
use promptwright_core::error::ProviderError;
use promptwright_core::provider::Provider;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Build the completion provider described by `config`.
///
/// The OpenAI-compatible client is wrapped in a [`ResilientProvider`] carrying
/// the configured timeout and retry policy. Fails with `NotConfigured` when
/// no API key is available.
pub fn build_from_config(
    config: &promptwright_config::AppConfig,
) -> Result<Arc<dyn Provider>, ProviderError> {
    let api_key = config
        .api_key
        .clone()
        .filter(|k| !k.is_empty())
        .ok_or_else(|| {
            ProviderError::NotConfigured(
                "No API key found (set OPENAI_API_KEY or api_key in config.toml)".into(),
            )
        })?;

    let policy = RetryPolicy::from_config(&config.provider);

    // The HTTP-level timeout sits slightly above the per-attempt timeout so the
    // resilient wrapper is the one that reports it.
    let http_timeout = policy.attempt_timeout + Duration::from_secs(1);
    let client = OpenAiCompatProvider::new(
        &config.provider.name,
        &config.provider.base_url,
        api_key,
        http_timeout,
    )?;

    info!(
        provider = %config.provider.name,
        base_url = %config.provider.base_url,
        model = %config.default_model,
        max_retries = policy.max_retries,
        timeout_secs = policy.attempt_timeout.as_secs(),
        "Provider configured"
    );

    Ok(Arc::new(ResilientProvider::new(Arc::new(client), policy)))
}
