//! Runtime configuration.
//!
//! Values come from JSON: on wasm32 the `localStorage` key
//! `floorplan.config`, natively the file named by `FLOORPLAN_CONFIG`.
//! Every field has a default, so a partial document only overrides what it names.

use anyhow::Context as _;
use serde::Deserialize;
use web_time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub upload: UploadConfig,
}

/// Timing and file limits for the upload widget.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct UploadConfig {
    /// Percentage points added per progress tick.
    pub progress_increment: u8,
    /// Period between progress ticks.
    pub progress_interval_ms: u64,
    /// Pause between reaching 100% and handing the image off.
    pub redirect_delay_ms: u64,
    /// Files larger than this are refused before encoding.
    pub max_file_size_bytes: u64,
    /// Extensions offered by the file picker.
    pub accepted_extensions: Vec<String>,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            progress_increment: 15,
            progress_interval_ms: 100,
            redirect_delay_ms: 600,
            max_file_size_bytes: 50 * 1024 * 1024,
            accepted_extensions: vec!["jpg".into(), "jpeg".into(), "png".into()],
        }
    }
}

impl UploadConfig {
    pub fn progress_interval(&self) -> Duration {
        Duration::from_millis(self.progress_interval_ms)
    }

    pub fn redirect_delay(&self) -> Duration {
        Duration::from_millis(self.redirect_delay_ms)
    }

    /// Size limit rendered for the drop-zone hint, e.g. "50MB".
    pub fn max_file_size_label(&self) -> String {
        format!("{}MB", self.max_file_size_bytes / (1024 * 1024))
    }
}

impl AppConfig {
    pub fn from_json(text: &str) -> anyhow::Result<Self> {
        let mut config: Self = serde_json::from_str(text).context("invalid config JSON")?;
        // A zero step would never finish the progress bar.
        if config.upload.progress_increment == 0 {
            log::warn!("progress_increment of 0 replaced with 1");
            config.upload.progress_increment = 1;
        }
        Ok(config)
    }

    /// Loads the configuration, falling back to defaults on any problem.
    pub fn load() -> Self {
        match Self::try_load() {
            Ok(Some(config)) => {
                log::info!("Loaded configuration: {config:?}");
                config
            }
            Ok(None) => Self::default(),
            Err(err) => {
                log::warn!("Ignoring configuration: {err:#}");
                Self::default()
            }
        }
    }

    #[cfg(target_arch = "wasm32")]
    fn try_load() -> anyhow::Result<Option<Self>> {
        const LS_KEY: &str = "floorplan.config";
        let storage = web_sys::window()
            .context("no window")?
            .local_storage()
            .map_err(|e| anyhow::anyhow!("localStorage unavailable: {e:?}"))?
            .context("no localStorage")?;
        let text = storage
            .get_item(LS_KEY)
            .map_err(|e| anyhow::anyhow!("reading {LS_KEY}: {e:?}"))?;
        text.map(|t| Self::from_json(&t)).transpose()
    }

    #[cfg(not(target_arch = "wasm32"))]
    fn try_load() -> anyhow::Result<Option<Self>> {
        let Some(path) = std::env::var_os("FLOORPLAN_CONFIG") else {
            return Ok(None);
        };
        let text = std::fs::read_to_string(&path)
            .with_context(|| format!("reading {}", std::path::Path::new(&path).display()))?;
        Self::from_json(&text).map(Some)
    }
}
