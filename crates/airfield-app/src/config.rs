use std::{fs, path::Path};

use airfield_core::status::ClassifierOptions;
use anyhow::{Context, Result, bail};
use serde::Deserialize;

const CONFIG_FILE: &str = "config.toml";

/// Tracker configuration loaded from `<data dir>/config.toml`.
#[derive(Debug, Clone, Deserialize, Default, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct TrackerConfig {
    /// Remote sync behaviour.
    #[serde(default)]
    pub sync: SyncConfig,
    /// Smart-status tunables.
    #[serde(default)]
    pub status: StatusConfig,
    /// Report layout.
    #[serde(default)]
    pub report: ReportConfig,
    /// Site identity printed on reports.
    #[serde(default)]
    pub site: SiteConfig,
}

impl TrackerConfig {
    /// Load configuration from a data directory. A missing file yields defaults.
    ///
    /// # Errors
    /// Returns an error when the file cannot be read, parsed, or validated.
    pub fn load(data_dir: impl AsRef<Path>) -> Result<Self> {
        let config_path = data_dir.as_ref().join(CONFIG_FILE);
        if !config_path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(&config_path)
            .with_context(|| format!("failed to read {}", config_path.display()))?;
        Self::from_toml(&contents).with_context(|| format!("failed to parse {}", config_path.display()))
    }

    /// Parse and validate configuration text.
    ///
    /// # Errors
    /// Returns an error for malformed TOML or invalid values.
    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: Self = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.sync.cooldown_ms == 0 {
            bail!("sync.cooldown_ms must be greater than zero");
        }
        if self.status.upcoming_days < 0 {
            bail!("status.upcoming_days must not be negative");
        }
        if self.report.lines_per_page == 0 {
            bail!("report.lines_per_page must be greater than zero");
        }
        if self.report.description_width < 4 {
            bail!("report.description_width must be at least 4");
        }
        Ok(())
    }

    /// Cool-down applied after every save.
    #[must_use]
    pub fn cooldown(&self) -> time::Duration {
        time::Duration::milliseconds(i64::try_from(self.sync.cooldown_ms).unwrap_or(i64::MAX))
    }

    /// Options for the smart-status classifier.
    #[must_use]
    pub const fn classifier_options(&self) -> ClassifierOptions {
        ClassifierOptions {
            upcoming_days: self.status.upcoming_days,
        }
    }
}

/// `[sync]` block.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct SyncConfig {
    /// Milliseconds during which remote echoes of a local save are ignored.
    #[serde(default = "default_cooldown_ms")]
    pub cooldown_ms: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            cooldown_ms: default_cooldown_ms(),
        }
    }
}

/// `[status]` block.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct StatusConfig {
    /// Horizon in days for the "due soon" status.
    #[serde(default = "default_upcoming_days")]
    pub upcoming_days: i64,
}

impl Default for StatusConfig {
    fn default() -> Self {
        Self {
            upcoming_days: default_upcoming_days(),
        }
    }
}

/// `[report]` block.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ReportConfig {
    /// Thumbnails rendered per task.
    #[serde(default = "default_max_thumbnails")]
    pub max_thumbnails: usize,
    /// Descriptions longer than this are truncated.
    #[serde(default = "default_description_width")]
    pub description_width: usize,
    /// Lines per rendered page.
    #[serde(default = "default_lines_per_page")]
    pub lines_per_page: usize,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            max_thumbnails: default_max_thumbnails(),
            description_width: default_description_width(),
            lines_per_page: default_lines_per_page(),
        }
    }
}

/// `[site]` block.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct SiteConfig {
    /// Heading printed at the top of every report.
    #[serde(default = "default_site_name")]
    pub name: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            name: default_site_name(),
        }
    }
}

const fn default_cooldown_ms() -> u64 {
    1000
}

const fn default_upcoming_days() -> i64 {
    3
}

const fn default_max_thumbnails() -> usize {
    3
}

const fn default_description_width() -> usize {
    55
}

const fn default_lines_per_page() -> usize {
    60
}

fn default_site_name() -> String {
    "AGL MCT AIRFIELD".into()
}
