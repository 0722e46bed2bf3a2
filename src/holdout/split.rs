use serde::{Serialize, Deserialize};
use tracing::info;

use crate::data::sampling::{choose_k_inds, setdiff};
use crate::error::{DdnetError, Result};
use crate::math::matrix::Matrix;
use crate::network::network::DisjointDomainNet;

/// Partition for item and/or context holdout.
///
/// All index vectors are sorted. `test_x_item_inds` is empty unless item
/// holdout is on, and likewise for contexts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HoldoutSplit {
    pub held_out_item: Option<usize>,
    pub held_out_context: Option<usize>,
    pub train_item_inds: Vec<usize>,
    pub train_ctx_inds: Vec<usize>,
    pub train_x_inds: Vec<usize>,
    pub test_x_item_inds: Vec<usize>,
    pub test_x_ctx_inds: Vec<usize>,
}

impl HoldoutSplit {
    /// Examples the item probe trains on: the training set plus the
    /// held-out item's examples.
    pub fn included_inds_item(&self) -> Vec<usize> {
        sorted_union(&self.train_x_inds, &self.test_x_item_inds)
    }

    pub fn included_inds_ctx(&self) -> Vec<usize> {
        sorted_union(&self.train_x_inds, &self.test_x_ctx_inds)
    }
}

/// Partition holding out the last domain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainHoldout {
    pub domain: usize,
    pub train_item_inds: Vec<usize>,
    pub train_ctx_inds: Vec<usize>,
    pub train_x_inds: Vec<usize>,
    pub test_x_inds: Vec<usize>,
}

/// Partition holding out one item/context combination per domain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComboHoldout {
    /// `(item index, context index)` per domain, in domain order.
    pub held_out: Vec<(usize, usize)>,
    pub train_x_inds: Vec<usize>,
    /// Example index of each held-out combo, in domain order.
    pub test_x_inds: Vec<usize>,
}

// ---------------------------------------------------------------------------
// Selection strategies
// ---------------------------------------------------------------------------

impl DisjointDomainNet {
    /// Picks an item from one random domain and a context from another
    /// (the same domain only when there is just one) and withholds every
    /// example involving whichever of them is switched on.
    pub fn prepare_holdout(&mut self, holdout_item: bool, holdout_context: bool) -> HoldoutSplit {
        let domains = choose_k_inds(&mut self.rng, self.n_domains, self.n_domains.min(2));
        let item_domain = domains[0];
        let ctx_domain = domains.get(1).copied().unwrap_or(item_domain);

        let ho_item = item_domain * self.items_per_domain
            + choose_k_inds(&mut self.rng, self.items_per_domain, 1)[0];
        let ho_ctx = ctx_domain * self.ctx_per_domain
            + choose_k_inds(&mut self.rng, self.ctx_per_domain, 1)[0];

        let (train_item_inds, test_x_item_inds) = if holdout_item {
            info!("Holding out item: {}", self.item_names[ho_item]);
            (
                setdiff(self.n_items, &[ho_item]),
                matching_rows(&self.x_item, self.items.row(ho_item)),
            )
        } else {
            ((0..self.n_items).collect(), Vec::new())
        };

        let (train_ctx_inds, test_x_ctx_inds) = if holdout_context {
            info!("Holding out context: {}", self.context_names[ho_ctx]);
            (
                setdiff(self.n_contexts, &[ho_ctx]),
                matching_rows(&self.x_context, self.contexts.row(ho_ctx)),
            )
        } else {
            ((0..self.n_contexts).collect(), Vec::new())
        };

        let held_out = sorted_union(&test_x_item_inds, &test_x_ctx_inds);
        HoldoutSplit {
            held_out_item: holdout_item.then_some(ho_item),
            held_out_context: holdout_context.then_some(ho_ctx),
            train_item_inds,
            train_ctx_inds,
            train_x_inds: setdiff(self.n_inputs, &held_out),
            test_x_item_inds,
            test_x_ctx_inds,
        }
    }

    /// Withholds the last domain: its items, its contexts, and every example
    /// that uses either.
    pub fn prepare_domain_holdout(&self) -> Result<DomainHoldout> {
        if self.n_domains < 2 {
            return Err(DdnetError::InvalidConfig(
                "domain holdout needs at least 2 domains".into(),
            ));
        }
        let domain = self.n_domains - 1;
        info!("Holding out domain {}", crate::data::layout::domain_name(domain));

        let first_item = domain * self.items_per_domain;
        let first_ctx = domain * self.ctx_per_domain;

        let (test_x_inds, train_x_inds): (Vec<usize>, Vec<usize>) = (0..self.n_inputs).partition(|&r| {
            self.example_item(r) >= first_item || self.example_context(r) >= first_ctx
        });

        Ok(DomainHoldout {
            domain,
            train_item_inds: (0..first_item).collect(),
            train_ctx_inds: (0..first_ctx).collect(),
            train_x_inds,
            test_x_inds,
        })
    }

    /// Withholds one item/context pair inside each domain, using a distinct
    /// within-domain item index and context index for every domain.
    pub fn prepare_combo_testing(&mut self) -> Result<ComboHoldout> {
        let n = self.n_domains;
        if n > self.items_per_domain.min(self.ctx_per_domain) {
            return Err(DdnetError::InvalidConfig(format!(
                "combo testing needs n_domains ({n}) <= items and contexts per domain"
            )));
        }

        let item_offsets = choose_k_inds(&mut self.rng, self.items_per_domain, n);
        let ctx_offsets = choose_k_inds(&mut self.rng, self.ctx_per_domain, n);
        let held_out: Vec<(usize, usize)> = (0..n)
            .map(|d| {
                (
                    d * self.items_per_domain + item_offsets[d],
                    d * self.ctx_per_domain + ctx_offsets[d],
                )
            })
            .collect();

        let names: Vec<String> = held_out
            .iter()
            .map(|&(i, c)| format!("{}/{}", self.item_names[i], self.context_names[c]))
            .collect();
        info!("Holding out: {}", names.join(", "));

        let mut test_x_inds = Vec::with_capacity(n);
        for (domain, &(item, ctx)) in held_out.iter().enumerate() {
            let item_rows = matching_rows(&self.x_item, self.items.row(item));
            let ctx_rows = matching_rows(&self.x_context, self.contexts.row(ctx));
            let matches: Vec<usize> = item_rows.into_iter().filter(|r| ctx_rows.contains(r)).collect();
            if matches.len() != 1 {
                return Err(DdnetError::ComboMismatch { domain, matches: matches.len() });
            }
            test_x_inds.push(matches[0]);
        }

        Ok(ComboHoldout {
            train_x_inds: setdiff(self.n_inputs, &test_x_inds),
            test_x_inds,
            held_out,
        })
    }

    /// Item index of example `r`.
    pub fn example_item(&self, r: usize) -> usize {
        r / self.n_contexts
    }

    /// Context index of example `r`.
    pub fn example_context(&self, r: usize) -> usize {
        r % self.n_contexts
    }
}

fn matching_rows(inputs: &Matrix, row: &[f64]) -> Vec<usize> {
    (0..inputs.rows).filter(|&r| inputs.row(r) == row).collect()
}

fn sorted_union(a: &[usize], b: &[usize]) -> Vec<usize> {
    let mut all: Vec<usize> = a.iter().chain(b).copied().collect();
    all.sort_unstable();
    all.dedup();
    all
}
