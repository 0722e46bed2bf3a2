use std::fmt;

use serde::{Serialize, Deserialize};

/// Which held-out set a generalization probe targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProbeKind {
    Item,
    Context,
    Domain,
}

impl fmt::Display for ProbeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProbeKind::Item => write!(f, "item"),
            ProbeKind::Context => write!(f, "context"),
            ProbeKind::Domain => write!(f, "domain"),
        }
    }
}

/// Time series written during `do_training`, allocated once at full length.
///
/// `loss`, `accuracy`, `weighted_acc` and the `test_*` series have one slot
/// per report epoch; the `etg_*` series have one slot per probe round,
/// holding `Generalization::epochs` (a value equal to `test_max_epochs`
/// means the threshold was never reached).
/// Series for tests that are not running are `None`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Reports {
    /// Epoch of each report slot.
    pub epochs: Vec<usize>,
    pub loss: Vec<f64>,
    pub accuracy: Vec<f64>,
    pub weighted_acc: Vec<f64>,

    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub etg_item: Option<Vec<usize>>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub etg_context: Option<Vec<usize>>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub etg_domain: Option<Vec<usize>>,

    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub test_accuracy: Option<Vec<f64>>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub test_weighted_acc: Option<Vec<f64>>,
}

impl Reports {
    /// Zero-filled reports for `n_report` report epochs spaced `report_freq`
    /// apart and `n_etg` probe rounds of each kind in `probes`.
    pub fn allocate(
        n_report: usize,
        report_freq: usize,
        n_etg: usize,
        probes: &[ProbeKind],
        combo_testing: bool,
    ) -> Reports {
        let etg = |kind| probes.contains(&kind).then(|| vec![0; n_etg]);
        let test = || combo_testing.then(|| vec![0.0; n_report]);
        Reports {
            epochs: (0..n_report).map(|k| k * report_freq).collect(),
            loss: vec![0.0; n_report],
            accuracy: vec![0.0; n_report],
            weighted_acc: vec![0.0; n_report],
            etg_item: etg(ProbeKind::Item),
            etg_context: etg(ProbeKind::Context),
            etg_domain: etg(ProbeKind::Domain),
            test_accuracy: test(),
            test_weighted_acc: test(),
        }
    }

    pub fn etg_mut(&mut self, kind: ProbeKind) -> Option<&mut Vec<usize>> {
        match kind {
            ProbeKind::Item => self.etg_item.as_mut(),
            ProbeKind::Context => self.etg_context.as_mut(),
            ProbeKind::Domain => self.etg_domain.as_mut(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocation_matches_active_tests() {
        let reports = Reports::allocate(4, 5, 2, &[ProbeKind::Context], false);
        assert_eq!(reports.epochs, vec![0, 5, 10, 15]);
        assert_eq!(reports.loss.len(), 4);
        assert!(reports.etg_item.is_none());
        assert_eq!(reports.etg_context, Some(vec![0, 0]));
        assert!(reports.test_accuracy.is_none());

        let json = serde_json::to_string(&reports).unwrap();
        assert!(json.contains("etg_context"));
        assert!(!json.contains("etg_item"));
    }
}
