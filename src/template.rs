//! Template resolver.
//!
//! Obtains the binary bytes of an institution's PDF form template. Resolution
//! order: the request's explicit `template_url` override, else the
//! per-institution default from [`TemplateConfig`], else the request fails
//! with `TemplateUnavailable` before any network I/O.
//!
//! Downloaded bytes live in an `Arc` shared between the fill operation and a
//! checksum-validated cache; dropping the last reference releases them on
//! every exit path, success or failure. A circuit breaker fails fast when the
//! template host is repeatedly down.

use crate::cache_validator::CachedTemplate;
use crate::circuit_breaker::{create_download_circuit_breaker, DownloadCircuitBreaker};
use crate::config::TemplateConfig;
use crate::errors::AppError;
use failsafe::CircuitBreaker;
use moka::future::Cache;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// Template cache TTL. Templates change rarely; an hour bounds staleness
/// while still absorbing bursts of fill requests for the same form.
const CACHE_TTL: Duration = Duration::from_secs(3600);
const CACHE_CAPACITY: u64 = 64;

/// Resolves institution keys to template bytes.
pub struct TemplateResolver {
    client: reqwest::Client,
    defaults: HashMap<String, String>,
    cache: Cache<String, CachedTemplate>,
    breaker: DownloadCircuitBreaker,
}

impl TemplateResolver {
    /// Creates a resolver from an explicit configuration.
    ///
    /// # Arguments
    ///
    /// * `config` - Per-institution default template URLs and download timeout.
    pub fn new(config: TemplateConfig) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .timeout(config.download_timeout)
            .build()
            .map_err(|e| {
                AppError::Internal(format!("Failed to create template HTTP client: {}", e))
            })?;

        let cache = Cache::builder()
            .time_to_live(CACHE_TTL)
            .max_capacity(CACHE_CAPACITY)
            .build();

        Ok(Self {
            client,
            defaults: config.defaults,
            cache,
            breaker: create_download_circuit_breaker(),
        })
    }

    /// Resolves the template for one fill request.
    ///
    /// # Arguments
    ///
    /// * `institution_key` - Registry key of the requested institution.
    /// * `override_url` - Optional per-request source, wins over the default.
    pub async fn resolve(
        &self,
        institution_key: &str,
        override_url: Option<&str>,
    ) -> Result<Arc<Vec<u8>>, AppError> {
        let url = override_url
            .map(str::to_string)
            .or_else(|| self.defaults.get(institution_key).cloned())
            .ok_or_else(|| {
                AppError::TemplateUnavailable(format!(
                    "No template configured for '{}'. Provide template_url",
                    institution_key
                ))
            })?;

        if let Some(entry) = self.cache.get(&url).await {
            match entry.validated_bytes() {
                Some(bytes) => {
                    tracing::debug!("Template cache hit for {}", url);
                    return Ok(bytes);
                }
                None => {
                    // Corrupted entry, drop it and download fresh
                    self.cache.invalidate(&url).await;
                }
            }
        }

        let bytes = self.download(&url).await?;

        let entry = CachedTemplate::new(Arc::clone(&bytes));
        tracing::debug!(
            "Template downloaded: {} ({} bytes, sha256 {})",
            url,
            bytes.len(),
            entry.checksum
        );
        self.cache.insert(url, entry).await;

        Ok(bytes)
    }

    /// Downloads through the circuit breaker so a dead template host fails
    /// fast instead of eating the full timeout on every request.
    async fn download(&self, url: &str) -> Result<Arc<Vec<u8>>, AppError> {
        if !self.breaker.is_call_permitted() {
            tracing::warn!("Template host circuit open, failing fast for {}", url);
            return Err(AppError::TemplateUnavailable(
                "Template host unavailable (circuit open), retry later".to_string(),
            ));
        }

        let outcome = self.fetch(url).await;
        match self.breaker.call(|| outcome) {
            Ok(bytes) => Ok(bytes),
            Err(failsafe::Error::Inner(e)) => Err(e),
            Err(failsafe::Error::Rejected) => Err(AppError::TemplateUnavailable(
                "Template host unavailable (circuit open), retry later".to_string(),
            )),
        }
    }

    async fn fetch(&self, url: &str) -> Result<Arc<Vec<u8>>, AppError> {
        let parsed = Url::parse(url).map_err(|e| {
            AppError::TemplateUnavailable(format!("Invalid template URL '{}': {}", url, e))
        })?;

        tracing::info!("Downloading template from {}...", parsed);

        let response = self.client.get(parsed).send().await.map_err(|e| {
            AppError::TemplateUnavailable(format!("Template download failed: {}", e))
        })?;

        if !response.status().is_success() {
            let status = response.status();
            return Err(AppError::TemplateUnavailable(format!(
                "Template host returned status {} for {}",
                status, url
            )));
        }

        let bytes = response.bytes().await.map_err(|e| {
            AppError::TemplateUnavailable(format!("Failed to read template body: {}", e))
        })?;

        if bytes.is_empty() {
            return Err(AppError::TemplateUnavailable(format!(
                "Template host returned an empty body for {}",
                url
            )));
        }

        Ok(Arc::new(bytes.to_vec()))
    }
}
