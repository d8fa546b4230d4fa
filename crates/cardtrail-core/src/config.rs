use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::clock::MICROS_PER_SEC;

/// Tunables for the history engine, read from `.cardtrail/config.toml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryConfig {
    /// Longest permitted run of consecutive delta entries (K).
    #[serde(default = "default_checkpoint_interval")]
    pub checkpoint_interval: usize,
    #[serde(default)]
    pub compaction: CompactionConfig,
    #[serde(default)]
    pub promotion: PromotionConfig,
    #[serde(default)]
    pub retention: RetentionConfig,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            checkpoint_interval: default_checkpoint_interval(),
            compaction: CompactionConfig::default(),
            promotion: PromotionConfig::default(),
            retention: RetentionConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompactionConfig {
    /// Automatic compaction never runs on shorter sequences.
    #[serde(default = "default_min_entries")]
    pub min_entries: usize,
    /// Growth since the previous run required before running again.
    #[serde(default = "default_stride")]
    pub stride: usize,
}

impl Default for CompactionConfig {
    fn default() -> Self {
        Self {
            min_entries: default_min_entries(),
            stride: default_stride(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromotionConfig {
    #[serde(default = "default_large_edit_score")]
    pub large_edit_score: usize,
    #[serde(default = "default_large_edit_cards")]
    pub large_edit_cards: usize,
    #[serde(default = "default_session_gap_secs")]
    pub session_gap_secs: i64,
}

impl Default for PromotionConfig {
    fn default() -> Self {
        Self {
            large_edit_score: default_large_edit_score(),
            large_edit_cards: default_large_edit_cards(),
            session_gap_secs: default_session_gap_secs(),
        }
    }
}

impl PromotionConfig {
    #[must_use]
    pub const fn session_gap_us(&self) -> i64 {
        self.session_gap_secs.saturating_mul(MICROS_PER_SEC)
    }
}

/// Bucket widths for each retention tier. Tier boundaries are fixed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetentionConfig {
    #[serde(default = "default_hour_bucket_secs")]
    pub hour_bucket_secs: i64,
    #[serde(default = "default_day_bucket_secs")]
    pub day_bucket_secs: i64,
    #[serde(default = "default_week_bucket_secs")]
    pub week_bucket_secs: i64,
    #[serde(default = "default_month_bucket_secs")]
    pub month_bucket_secs: i64,
    #[serde(default = "default_archive_bucket_secs")]
    pub archive_bucket_secs: i64,
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            hour_bucket_secs: default_hour_bucket_secs(),
            day_bucket_secs: default_day_bucket_secs(),
            week_bucket_secs: default_week_bucket_secs(),
            month_bucket_secs: default_month_bucket_secs(),
            archive_bucket_secs: default_archive_bucket_secs(),
        }
    }
}

impl HistoryConfig {
    /// Reject settings the engine cannot honor.
    ///
    /// # Errors
    ///
    /// Fails when the checkpoint interval or any bucket width is zero or negative.
    pub fn validate(&self) -> Result<()> {
        if self.checkpoint_interval == 0 {
            bail!("checkpoint_interval must be at least 1");
        }
        let r = &self.retention;
        for (name, secs) in [
            ("hour_bucket_secs", r.hour_bucket_secs),
            ("day_bucket_secs", r.day_bucket_secs),
            ("week_bucket_secs", r.week_bucket_secs),
            ("month_bucket_secs", r.month_bucket_secs),
            ("archive_bucket_secs", r.archive_bucket_secs),
        ] {
            if secs <= 0 {
                bail!("retention.{name} must be positive (got {secs})");
            }
        }
        Ok(())
    }
}

/// Load the project config, falling back to defaults when absent.
///
/// # Errors
///
/// Fails when the file exists but cannot be read, parsed or validated.
pub fn load_history_config(project_root: &Path) -> Result<HistoryConfig> {
    let path = project_root.join(".cardtrail/config.toml");
    if !path.exists() {
        return Ok(HistoryConfig::default());
    }

    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    let config = toml::from_str::<HistoryConfig>(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))?;
    config
        .validate()
        .with_context(|| format!("Invalid settings in {}", path.display()))?;
    Ok(config)
}

const fn default_checkpoint_interval() -> usize {
    30
}

const fn default_min_entries() -> usize {
    180
}

const fn default_stride() -> usize {
    12
}

const fn default_large_edit_score() -> usize {
    1200
}

const fn default_large_edit_cards() -> usize {
    8
}

const fn default_session_gap_secs() -> i64 {
    15 * 60
}

const fn default_hour_bucket_secs() -> i64 {
    60
}

const fn default_day_bucket_secs() -> i64 {
    10 * 60
}

const fn default_week_bucket_secs() -> i64 {
    60 * 60
}

const fn default_month_bucket_secs() -> i64 {
    24 * 60 * 60
}

const fn default_archive_bucket_secs() -> i64 {
    7 * 24 * 60 * 60
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_config(content: &str) -> tempfile::TempDir {
        let dir = tempfile::tempdir().expect("temp dir");
        std::fs::create_dir_all(dir.path().join(".cardtrail")).expect("create config dir");
        std::fs::write(dir.path().join(".cardtrail/config.toml"), content).expect("write config");
        dir
    }

    #[test]
    fn missing_config_uses_defaults() {
        let dir = tempfile::tempdir().expect("temp dir");
        let cfg = load_history_config(dir.path()).expect("load should succeed");
        assert_eq!(cfg, HistoryConfig::default());
        assert_eq!(cfg.checkpoint_interval, 30);
        assert_eq!(cfg.compaction.min_entries, 180);
        assert_eq!(cfg.compaction.stride, 12);
        assert_eq!(cfg.promotion.large_edit_score, 1200);
        assert_eq!(cfg.promotion.large_edit_cards, 8);
        assert_eq!(cfg.promotion.session_gap_us(), 15 * 60 * 1_000_000);
        assert_eq!(cfg.retention.archive_bucket_secs, 604_800);
    }

    #[test]
    fn partial_config_keeps_other_defaults() {
        let dir = write_config(
            r"
checkpoint_interval = 10

[compaction]
stride = 4
",
        );
        let cfg = load_history_config(dir.path()).expect("load should succeed");
        assert_eq!(cfg.checkpoint_interval, 10);
        assert_eq!(cfg.compaction.stride, 4);
        assert_eq!(cfg.compaction.min_entries, 180);
        assert_eq!(cfg.retention.hour_bucket_secs, 60);
    }

    #[test]
    fn zero_checkpoint_interval_is_rejected() {
        let dir = write_config("checkpoint_interval = 0\n");
        let err = load_history_config(dir.path()).expect_err("must reject");
        assert!(format!("{err:#}").contains("checkpoint_interval"));
    }

    #[test]
    fn malformed_config_reports_path() {
        let dir = write_config("checkpoint_interval = [\n");
        let err = load_history_config(dir.path()).expect_err("must fail");
        assert!(err.to_string().contains("config.toml"));
    }
}
