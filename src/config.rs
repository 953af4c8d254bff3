use serde::Deserialize;
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

/// Environment variable per institution key holding its default template URL.
/// A missing variable only fails requests for that institution that carry no
/// `template_url` override.
const TEMPLATE_ENV_VARS: &[(&str, &str)] = &[
    ("morgan_morgan_natural", "TEMPLATE_MORGAN_NATURAL"),
    ("morgan_morgan_juridica", "TEMPLATE_MORGAN_JURIDICA"),
    ("mmg_bank", "TEMPLATE_MMG_BANK"),
    ("seguros_generico", "TEMPLATE_SEGUROS"),
];

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub port: u16,
    pub output_dir: PathBuf,
    pub download_timeout_secs: u64,
    pub template_defaults: HashMap<String, String>,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let port = std::env::var("PORT")
            .unwrap_or_else(|_| "8000".to_string())
            .parse()
            .map_err(|_| anyhow::anyhow!("PORT must be a valid number between 1-65535"))?;

        let output_dir = std::env::var("OUTPUT_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| std::env::temp_dir());

        let download_timeout_secs = std::env::var("DOWNLOAD_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".to_string())
            .parse()
            .map_err(|_| anyhow::anyhow!("DOWNLOAD_TIMEOUT_SECS must be a positive number"))?;
        if download_timeout_secs == 0 {
            anyhow::bail!("DOWNLOAD_TIMEOUT_SECS must be greater than zero");
        }

        let mut template_defaults = HashMap::new();
        for (institution, var) in TEMPLATE_ENV_VARS {
            match std::env::var(var) {
                Ok(url) if !url.trim().is_empty() => {
                    let parsed = url::Url::parse(url.trim()).map_err(|e| {
                        anyhow::anyhow!("{} is not a valid URL ({}): {}", var, url, e)
                    })?;
                    if parsed.scheme() != "http" && parsed.scheme() != "https" {
                        anyhow::bail!("{} must start with http:// or https://", var);
                    }
                    template_defaults.insert((*institution).to_string(), url.trim().to_string());
                }
                _ => {
                    tracing::debug!("No default template configured for {}", institution);
                }
            }
        }

        let config = Self {
            port,
            output_dir,
            download_timeout_secs,
            template_defaults,
        };

        // Log successful configuration load (without noisy URL dumps)
        tracing::info!("Configuration loaded successfully");
        tracing::debug!("Server Port: {}", config.port);
        tracing::debug!("Output directory: {}", config.output_dir.display());
        tracing::debug!("Download timeout: {}s", config.download_timeout_secs);
        tracing::info!(
            "Default templates configured for {} of {} institutions",
            config.template_defaults.len(),
            TEMPLATE_ENV_VARS.len()
        );

        Ok(config)
    }

    /// Explicit configuration handed to the template resolver, so resolution
    /// does not read ambient process state.
    pub fn template_config(&self) -> TemplateConfig {
        TemplateConfig {
            defaults: self.template_defaults.clone(),
            download_timeout: Duration::from_secs(self.download_timeout_secs),
        }
    }
}

/// Template resolution settings, decoupled from the environment so tests can
/// construct resolvers directly.
#[derive(Debug, Clone)]
pub struct TemplateConfig {
    /// Institution key -> default template URL.
    pub defaults: HashMap<String, String>,
    /// Per-download timeout.
    pub download_timeout: Duration,
}
