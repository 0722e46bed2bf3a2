use crate::loss::bce::BceLoss;
use crate::metrics::accuracy::{plain_acc, weighted_acc};
use crate::network::network::DisjointDomainNet;
use crate::optim::sgd::Sgd;
use crate::train::epoch_stats::EpochStats;

// ---------------------------------------------------------------------------
// One pass of mini-batch SGD
// ---------------------------------------------------------------------------

impl DisjointDomainNet {
    /// Trains once over the examples in `order`, in that order.
    ///
    /// `order` is split into contiguous chunks of `batch_size`; a
    /// `batch_size <= 0` trains the whole order as one batch. Each chunk runs
    /// zero_grad → forward → summed BCE → backward → step.
    ///
    /// Accuracies in the returned stats are measured on each batch's outputs
    /// before that batch's update.
    pub fn train_epoch(&mut self, order: &[usize], batch_size: i64, optimizer: &mut Sgd) -> EpochStats {
        let mut stats = EpochStats::new(self.n_inputs);
        if order.is_empty() {
            return stats;
        }

        for batch in order.chunks(chunk_len(batch_size, order.len())) {
            optimizer.zero_grad(self);

            let x_item = self.x_item.select_rows(batch);
            let x_context = self.x_context.select_rows(batch);
            let targets = self.y.select_rows(batch);

            let cache = self.forward_cached(&x_item, &x_context);
            stats.total_loss += BceLoss::loss_sum(&cache.output, &targets);
            self.backward(&cache, &targets);
            optimizer.step(self);

            let acc = plain_acc(&cache.output, &targets);
            let wacc = weighted_acc(&cache.output, &targets, self.attrs_set_per_item);
            for (k, &ind) in batch.iter().enumerate() {
                stats.acc_each[ind] = Some(acc[k]);
                stats.wacc_each[ind] = Some(wacc[k]);
            }
        }

        stats
    }

    /// Plain and weighted accuracy of the current network on the given
    /// examples, averaged over every output. No parameters change.
    pub fn evaluate(&self, inds: &[usize]) -> (f64, f64) {
        if inds.is_empty() {
            return (0.0, 0.0);
        }
        let outputs = self.forward(&self.x_item.select_rows(inds), &self.x_context.select_rows(inds));
        let targets = self.y.select_rows(inds);

        let n = inds.len() as f64;
        let acc = plain_acc(&outputs, &targets).iter().sum::<f64>() / n;
        let wacc = weighted_acc(&outputs, &targets, self.attrs_set_per_item).iter().sum::<f64>() / n;
        (acc, wacc)
    }
}

/// Examples per chunk for a requested `batch_size`.
fn chunk_len(batch_size: i64, n: usize) -> usize {
    if batch_size <= 0 {
        n
    } else {
        usize::try_from(batch_size).map_or(n, |b| b.min(n))
    }
}
