use std::collections::BTreeMap;

use serde::{Serialize, Deserialize};

use crate::error::Result;
use crate::math::matrix::Matrix;
use crate::network::network::DisjointDomainNet;
use crate::snapshot::schedule::{calc_snap_epochs, SnapScale};

/// `(n_snaps × n_entities × dim)` array of activations. `None` marks an
/// entry that was never recorded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotTensor {
    pub n_snaps: usize,
    pub n_entities: usize,
    pub dim: usize,
    pub data: Vec<Option<f64>>,
}

impl SnapshotTensor {
    pub fn unset(n_snaps: usize, n_entities: usize, dim: usize) -> SnapshotTensor {
        SnapshotTensor {
            n_snaps,
            n_entities,
            dim,
            data: vec![None; n_snaps * n_entities * dim],
        }
    }

    fn offset(&self, k: usize, entity: usize) -> usize {
        assert!(k < self.n_snaps && entity < self.n_entities, "snapshot index out of range");
        (k * self.n_entities + entity) * self.dim
    }

    /// Values of one entity in snapshot `k`.
    pub fn get(&self, k: usize, entity: usize) -> &[Option<f64>] {
        let start = self.offset(k, entity);
        &self.data[start..start + self.dim]
    }

    pub fn is_set(&self, k: usize, entity: usize) -> bool {
        self.get(k, entity).iter().all(Option::is_some)
    }

    pub fn set_row(&mut self, k: usize, entity: usize, values: &[f64]) {
        assert_eq!(values.len(), self.dim);
        let start = self.offset(k, entity);
        for (slot, &v) in self.data[start..start + self.dim].iter_mut().zip(values) {
            *slot = Some(v);
        }
    }

    /// Writes row `r` of `values` into entity `entities[r]` of snapshot `k`.
    fn scatter(&mut self, k: usize, entities: &[usize], values: &Matrix) {
        for (r, &entity) in entities.iter().enumerate() {
            self.set_row(k, entity, values.row(r));
        }
    }
}

/// Representation and hidden-layer snapshots over one training run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshots {
    pub epochs: Vec<usize>,
    /// Width of the largest snapshot epoch, for aligned log lines.
    pub epoch_digits: usize,
    /// Present only when the item representation layer exists.
    pub item: Option<SnapshotTensor>,
    pub context: Option<SnapshotTensor>,
    pub item_hidden: SnapshotTensor,
    pub context_hidden: SnapshotTensor,
}

impl Snapshots {
    pub fn n_snaps(&self) -> usize {
        self.epochs.len()
    }

    /// Index of `epoch` in the schedule, if a snapshot is due then.
    pub fn index_of(&self, epoch: usize) -> Option<usize> {
        self.epochs.binary_search(&epoch).ok()
    }

    /// Fills snapshot `k` for the items and contexts still being trained on.
    /// Rows of every other entity keep their previous contents.
    pub fn record(
        &mut self,
        k: usize,
        net: &DisjointDomainNet,
        train_item_inds: &[usize],
        train_ctx_inds: &[usize],
    ) -> Result<()> {
        let train_items = net.items.select_rows(train_item_inds);
        let train_contexts = net.contexts.select_rows(train_ctx_inds);

        if let Some(item) = self.item.as_mut() {
            item.scatter(k, train_item_inds, &net.calc_item_repr(&train_items)?);
        }
        if let Some(context) = self.context.as_mut() {
            context.scatter(k, train_ctx_inds, &net.calc_context_repr(&train_contexts)?);
        }
        self.item_hidden
            .scatter(k, train_item_inds, &net.calc_hidden(Some(&train_items), None));
        self.context_hidden
            .scatter(k, train_ctx_inds, &net.calc_hidden(None, Some(&train_contexts)));
        Ok(())
    }
}

/// Copies of every trainable parameter, one per snapshot epoch, keyed by
/// parameter name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParamSnapshots {
    pub params: BTreeMap<String, Vec<Matrix>>,
}

impl ParamSnapshots {
    /// Zero-filled slots for `n_snaps` copies of the network's parameters.
    pub fn prepare(net: &DisjointDomainNet, n_snaps: usize) -> ParamSnapshots {
        let params = net
            .named_parameters()
            .into_iter()
            .map(|(name, p)| (name.to_string(), vec![Matrix::zeros(p.rows, p.cols); n_snaps]))
            .collect();
        ParamSnapshots { params }
    }

    pub fn record(&mut self, k: usize, net: &DisjointDomainNet) {
        for (name, p) in net.named_parameters() {
            if let Some(slot) = self.params.get_mut(name).and_then(|series| series.get_mut(k)) {
                slot.clone_from(p);
            }
        }
    }
}

impl DisjointDomainNet {
    /// Computes the snapshot schedule and allocates unset tensors for every
    /// kind of snapshot this network can take.
    pub fn prepare_snapshots(&self, freq: usize, scale: SnapScale, num_epochs: usize) -> Snapshots {
        let epochs = calc_snap_epochs(freq, scale, num_epochs);
        let epoch_digits = epochs.last().map_or(1, |e| e.to_string().len());
        let n = epochs.len();

        Snapshots {
            item: self
                .has_item_repr()
                .then(|| SnapshotTensor::unset(n, self.n_items, self.item_repr_size)),
            context: self
                .has_ctx_repr()
                .then(|| SnapshotTensor::unset(n, self.n_contexts, self.ctx_repr_size)),
            item_hidden: SnapshotTensor::unset(n, self.n_items, self.hidden_size),
            context_hidden: SnapshotTensor::unset(n, self.n_contexts, self.hidden_size),
            epochs,
            epoch_digits,
        }
    }
}
