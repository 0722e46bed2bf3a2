use std::str::FromStr;

use serde::{Serialize, Deserialize};

use crate::error::{DdnetError, Result};
use crate::optim::scheduler::SchedulerConfig;
use crate::snapshot::schedule::SnapScale;

/// Which held-out generalization probe runs during training.
///
/// - `Full`    — hold out one item and one context, probe both
/// - `Item`    — hold out one item
/// - `Context` — hold out one context (`"ctx"` is accepted too)
/// - `Domain`  — hold out the whole last domain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HoldoutMode {
    None,
    Full,
    Item,
    #[serde(alias = "ctx")]
    Context,
    Domain,
}

impl HoldoutMode {
    pub fn is_active(self) -> bool {
        self != HoldoutMode::None
    }

    pub fn holds_out_item(self) -> bool {
        matches!(self, HoldoutMode::Full | HoldoutMode::Item)
    }

    pub fn holds_out_context(self) -> bool {
        matches!(self, HoldoutMode::Full | HoldoutMode::Context)
    }
}

impl FromStr for HoldoutMode {
    type Err = DdnetError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "none" => Ok(HoldoutMode::None),
            "full" => Ok(HoldoutMode::Full),
            "item" => Ok(HoldoutMode::Item),
            "context" | "ctx" => Ok(HoldoutMode::Context),
            "domain" => Ok(HoldoutMode::Domain),
            _ => Err(DdnetError::UnknownHoldoutMode(s.to_string())),
        }
    }
}

/// Hyperparameters of one `do_training` run.
///
/// # Fields
/// - `batch_size`       — examples per mini-batch; `<= 0` trains each epoch
///                        as a single batch
/// - `report_freq`      — a report row is written every this many epochs
/// - `snap_freq`        — snapshot spacing (see `snap_freq_scale`)
/// - `reports_per_test` — generalization probes run on every n-th report
/// - `test_thresh`      — mean weighted accuracy the probes train up to
/// - `test_max_epochs`  — probe cutoff
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainConfig {
    pub lr: f64,
    pub momentum: f64,
    pub num_epochs: usize,
    pub batch_size: i64,
    pub report_freq: usize,
    pub snap_freq: usize,
    pub snap_freq_scale: SnapScale,
    pub scheduler: Option<SchedulerConfig>,
    pub holdout_testing: HoldoutMode,
    pub reports_per_test: usize,
    pub test_thresh: f64,
    pub test_max_epochs: usize,
    pub do_combo_testing: bool,
    pub param_snapshots: bool,
}

impl Default for TrainConfig {
    fn default() -> Self {
        TrainConfig {
            lr: 0.01,
            momentum: 0.0,
            num_epochs: 3000,
            batch_size: 16,
            report_freq: 50,
            snap_freq: 50,
            snap_freq_scale: SnapScale::Lin,
            scheduler: None,
            holdout_testing: HoldoutMode::None,
            reports_per_test: 1,
            test_thresh: 0.99,
            test_max_epochs: 2000,
            do_combo_testing: false,
            param_snapshots: false,
        }
    }
}

impl TrainConfig {
    /// Creates a config with the given core schedule and defaults elsewhere.
    pub fn new(lr: f64, num_epochs: usize, batch_size: i64, report_freq: usize) -> Self {
        TrainConfig {
            lr,
            num_epochs,
            batch_size,
            report_freq,
            ..TrainConfig::default()
        }
    }

    #[must_use]
    pub fn with_holdout(mut self, mode: HoldoutMode) -> Self {
        self.holdout_testing = mode;
        self
    }

    #[must_use]
    pub fn with_combo_testing(mut self, enabled: bool) -> Self {
        self.do_combo_testing = enabled;
        self
    }

    #[must_use]
    pub fn with_snapshots(mut self, snap_freq: usize, scale: SnapScale) -> Self {
        self.snap_freq = snap_freq;
        self.snap_freq_scale = scale;
        self
    }

    #[must_use]
    pub fn with_probe(mut self, reports_per_test: usize, test_thresh: f64, test_max_epochs: usize) -> Self {
        self.reports_per_test = reports_per_test;
        self.test_thresh = test_thresh;
        self.test_max_epochs = test_max_epochs;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.holdout_testing.is_active() && self.do_combo_testing {
            return Err(DdnetError::HoldoutAndCombo);
        }
        if self.num_epochs == 0 {
            return Err(DdnetError::InvalidConfig("num_epochs must be positive".into()));
        }
        if self.report_freq == 0 || self.snap_freq == 0 || self.reports_per_test == 0 {
            return Err(DdnetError::InvalidConfig(
                "report_freq, snap_freq and reports_per_test must be positive".into(),
            ));
        }
        if !(self.lr.is_finite() && self.lr > 0.0) {
            return Err(DdnetError::InvalidConfig("lr must be finite and > 0".into()));
        }
        Ok(())
    }

    /// Number of report rows: epochs 0, report_freq, 2·report_freq, ...
    pub fn n_reports(&self) -> usize {
        (self.num_epochs - 1) / self.report_freq + 1
    }

    /// Number of generalization probe rows.
    pub fn n_tests(&self) -> usize {
        (self.n_reports() - 1) / self.reports_per_test + 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn holdout_mode_names() {
        assert_eq!("CTX".parse::<HoldoutMode>().unwrap(), HoldoutMode::Context);
        assert_eq!("full".parse::<HoldoutMode>().unwrap(), HoldoutMode::Full);
        assert!("everything".parse::<HoldoutMode>().is_err());
        let mode: HoldoutMode = serde_json::from_str("\"ctx\"").unwrap();
        assert_eq!(mode, HoldoutMode::Context);
        assert!(HoldoutMode::Full.holds_out_item() && HoldoutMode::Full.holds_out_context());
        assert!(!HoldoutMode::Domain.holds_out_item());
    }

    #[test]
    fn holdout_and_combo_are_exclusive() {
        let cfg = TrainConfig::default()
            .with_holdout(HoldoutMode::Domain)
            .with_combo_testing(true);
        assert!(matches!(cfg.validate(), Err(DdnetError::HoldoutAndCombo)));
    }

    #[test]
    fn report_counts() {
        let cfg = TrainConfig::new(0.1, 10, -1, 5);
        assert_eq!(cfg.n_reports(), 2);
        let cfg = TrainConfig::new(0.1, 11, -1, 5).with_probe(2, 0.9, 10);
        assert_eq!(cfg.n_reports(), 3);
        assert_eq!(cfg.n_tests(), 2);
    }
}
