use serde::{Serialize, Deserialize};

/// Result of one `train_epoch` pass.
///
/// Accuracy vectors are indexed by example index over the whole training
/// set. Examples that were not part of the epoch's order hold `None`, which
/// is distinct from a measured accuracy of zero.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EpochStats {
    /// Summed BCE loss over every example trained this epoch.
    pub total_loss: f64,
    /// Fraction of outputs within tolerance, per example.
    pub acc_each: Vec<Option<f64>>,
    /// Class-balanced accuracy, per example.
    pub wacc_each: Vec<Option<f64>>,
}

impl EpochStats {
    pub fn new(n_inputs: usize) -> EpochStats {
        EpochStats {
            total_loss: 0.0,
            acc_each: vec![None; n_inputs],
            wacc_each: vec![None; n_inputs],
        }
    }

    pub fn n_trained(&self) -> usize {
        self.wacc_each.iter().filter(|w| w.is_some()).count()
    }

    pub fn mean_loss(&self, n_trained: usize) -> f64 {
        self.total_loss / n_trained.max(1) as f64
    }

    /// Sum of measured plain accuracies divided by `n_trained`.
    pub fn mean_acc(&self, n_trained: usize) -> f64 {
        sum_present(&self.acc_each) / n_trained.max(1) as f64
    }

    pub fn mean_wacc(&self, n_trained: usize) -> f64 {
        sum_present(&self.wacc_each) / n_trained.max(1) as f64
    }

    /// Mean weighted accuracy over the measured examples among `targets`;
    /// 0 when none of them was measured.
    pub fn mean_wacc_over(&self, targets: &[usize]) -> f64 {
        let measured: Vec<f64> = targets.iter().filter_map(|&i| self.wacc_each[i]).collect();
        if measured.is_empty() {
            0.0
        } else {
            measured.iter().sum::<f64>() / measured.len() as f64
        }
    }
}

fn sum_present(values: &[Option<f64>]) -> f64 {
    values.iter().flatten().sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_slots_are_ignored_by_sums() {
        let mut stats = EpochStats::new(4);
        stats.total_loss = 6.0;
        stats.acc_each = vec![Some(1.0), None, Some(0.5), None];
        stats.wacc_each = vec![Some(0.8), None, Some(0.4), None];

        assert_eq!(stats.n_trained(), 2);
        assert_eq!(stats.mean_loss(2), 3.0);
        assert_eq!(stats.mean_acc(2), 0.75);
        assert!((stats.mean_wacc_over(&[0, 1, 2]) - 0.6).abs() < 1e-12);
        assert_eq!(stats.mean_wacc_over(&[1, 3]), 0.0);
    }
}
