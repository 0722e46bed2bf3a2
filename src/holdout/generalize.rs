use std::fmt;

use serde::{Serialize, Deserialize};
use tracing::debug;

use crate::data::sampling::choose_k;
use crate::error::Result;
use crate::network::network::DisjointDomainNet;
use crate::optim::sgd::Sgd;

/// Outcome of one generalization probe.
///
/// `epochs` is the 0-based index of the epoch that reached the threshold, or
/// `max_epochs` when none did. A success therefore always stores less than
/// `max_epochs`, and displays as the 1-based count `= epochs + 1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Generalization {
    pub epochs: usize,
    pub reached: bool,
    pub max_epochs: usize,
}

impl fmt::Display for Generalization {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = if self.reached {
            format!("= {}", self.epochs + 1)
        } else {
            format!("> {}", self.max_epochs)
        };
        f.pad(&text)
    }
}

impl DisjointDomainNet {
    /// Counts how many epochs on `included_inds` it takes for the mean
    /// weighted accuracy over `targets` to reach `thresh`, then puts the
    /// network and the optimizer back exactly as they were.
    ///
    /// Each epoch trains on a fresh shuffle of `included_inds`.
    pub fn generalize_test(
        &mut self,
        batch_size: i64,
        optimizer: &mut Sgd,
        included_inds: &[usize],
        targets: &[usize],
        max_epochs: usize,
        thresh: f64,
    ) -> Result<Generalization> {
        let net_saved = self.state();
        let optim_saved = optimizer.state();

        let mut reached_at = None;
        for epoch in 0..max_epochs {
            let order = choose_k(&mut self.rng, included_inds, included_inds.len());
            let stats = self.train_epoch(&order, batch_size, optimizer);
            if stats.mean_wacc_over(targets) >= thresh {
                reached_at = Some(epoch);
                break;
            }
        }

        self.load_state(&net_saved)?;
        optimizer.load_state(&optim_saved);
        self.zero_grad();

        let result = Generalization {
            epochs: reached_at.unwrap_or(max_epochs),
            reached: reached_at.is_some(),
            max_epochs,
        };
        debug!(targets = targets.len(), "generalization probe: {result}");
        Ok(result)
    }
}
