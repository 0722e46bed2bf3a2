use std::collections::BTreeSet;

use rand::rngs::StdRng;
use rand::seq::{index, SliceRandom};
use rand::SeedableRng;

use crate::data::provider::{DataProvider, IoMats};
use crate::error::{DdnetError, Result};
use crate::math::matrix::Matrix;

/// Every domain holds this many items.
pub const ITEMS_PER_DOMAIN: usize = 8;

/// Salt mixed into every attribute draw.
const ATTR_SEED_SALT: u64 = 0x5eed_a77e;

/// Letter name of a domain: A, B, C, ... then D26, D27, ...
pub fn domain_name(domain: usize) -> String {
    if domain < 26 {
        char::from(b'A' + domain as u8).to_string()
    } else {
        format!("D{domain}")
    }
}

/// Parses a cluster layout such as `"4-2-2"` into cluster sizes covering one
/// domain's items.
pub fn parse_cluster_info(layout: &str) -> Result<Vec<usize>> {
    let err = |reason: String| DdnetError::ClusterLayout {
        layout: layout.to_string(),
        reason,
    };

    let sizes = layout
        .split('-')
        .map(|part| part.trim().parse::<usize>())
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| err(e.to_string()))?;

    if sizes.iter().any(|&s| s == 0) {
        return Err(err("cluster sizes must be positive".into()));
    }
    let total: usize = sizes.iter().sum();
    if total != ITEMS_PER_DOMAIN {
        return Err(err(format!("sizes sum to {total}, expected {ITEMS_PER_DOMAIN}")));
    }
    Ok(sizes)
}

/// Default stimulus generator.
///
/// Items and contexts are one-hot codes. The attributes of an example lie in
/// the block owned by its context: half of them are shared across the item's
/// cluster, the rest are specific to the item. Each example sets exactly
/// `attrs_set_per_item` attributes.
#[derive(Debug, Clone)]
pub struct DomainLayout {
    ctx_per_domain: usize,
    attrs_per_context: usize,
    attrs_set_per_item: usize,
    n_domains: usize,
    /// Cluster sizes for each domain.
    clusters: Vec<Vec<usize>>,
    repeat_attrs_over_domains: bool,
}

impl DomainLayout {
    pub fn new(
        ctx_per_domain: usize,
        attrs_per_context: usize,
        attrs_set_per_item: usize,
        n_domains: usize,
        cluster_info: &str,
        last_domain_cluster_info: Option<&str>,
        repeat_attrs_over_domains: bool,
    ) -> Result<DomainLayout> {
        if n_domains == 0 || ctx_per_domain == 0 {
            return Err(DdnetError::InvalidConfig(
                "need at least one domain and one context per domain".into(),
            ));
        }
        if attrs_set_per_item == 0 || attrs_set_per_item > attrs_per_context {
            return Err(DdnetError::InvalidConfig(format!(
                "attrs_set_per_item ({attrs_set_per_item}) must be in 1..={attrs_per_context} (attrs_per_context)"
            )));
        }
        if attrs_set_per_item >= attrs_per_context * ctx_per_domain * n_domains {
            return Err(DdnetError::InvalidConfig(
                "every attribute would be set; weighted accuracy needs unset attributes".into(),
            ));
        }

        let base = parse_cluster_info(cluster_info)?;
        let last = match last_domain_cluster_info {
            Some(info) => parse_cluster_info(info)?,
            None => base.clone(),
        };
        let clusters = (0..n_domains)
            .map(|d| if d + 1 == n_domains { last.clone() } else { base.clone() })
            .collect();

        Ok(DomainLayout {
            ctx_per_domain,
            attrs_per_context,
            attrs_set_per_item,
            n_domains,
            clusters,
            repeat_attrs_over_domains,
        })
    }

    /// Index of the first item of the cluster that `item` belongs to, within
    /// its domain.
    fn cluster_head(&self, item: usize) -> usize {
        let domain = item / ITEMS_PER_DOMAIN;
        let local = item % ITEMS_PER_DOMAIN;
        let mut start = 0;
        for &size in &self.clusters[domain] {
            if local < start + size {
                break;
            }
            start += size;
        }
        start
    }

    /// Key under which an entity's random draws are made. With repeated
    /// attributes, entities at the same position of different domains draw
    /// identically.
    fn key(&self, index: usize, per_domain: usize) -> u64 {
        if self.repeat_attrs_over_domains {
            (index % per_domain) as u64
        } else {
            index as u64
        }
    }

    fn rng_for(&self, context: usize, stream: u64, entity: u64) -> StdRng {
        let ctx = self.key(context, self.ctx_per_domain);
        let seed = ATTR_SEED_SALT
            ^ ctx.wrapping_mul(0x9e37_79b9_7f4a_7c15)
            ^ stream.wrapping_mul(0xc2b2_ae3d_27d4_eb4f)
            ^ entity.wrapping_mul(0x1656_67b1_9e37_79f9);
        StdRng::seed_from_u64(seed)
    }

    /// Block-relative attribute positions set for (item, context): the
    /// cluster's shared draw plus an item-specific draw from the rest.
    fn example_positions(&self, item: usize, context: usize) -> BTreeSet<usize> {
        let apc = self.attrs_per_context;
        let shared = self.attrs_set_per_item / 2;
        let specific = self.attrs_set_per_item - shared;

        let head = item - item % ITEMS_PER_DOMAIN + self.cluster_head(item);
        let cluster = self.key(head, ITEMS_PER_DOMAIN);

        let mut rng = self.rng_for(context, 0, cluster);
        let mut positions: BTreeSet<usize> = index::sample(&mut rng, apc, shared).into_iter().collect();

        let mut rest: Vec<usize> = (0..apc).filter(|p| !positions.contains(p)).collect();
        let mut rng = self.rng_for(context, 1, self.key(item, ITEMS_PER_DOMAIN));
        rest.shuffle(&mut rng);
        positions.extend(rest.into_iter().take(specific));
        positions
    }
}

impl DataProvider for DomainLayout {
    fn n_domains(&self) -> usize {
        self.n_domains
    }

    fn items_per_domain(&self) -> usize {
        ITEMS_PER_DOMAIN
    }

    fn ctx_per_domain(&self) -> usize {
        self.ctx_per_domain
    }

    fn attrs_per_context(&self) -> usize {
        self.attrs_per_context
    }

    fn attrs_set_per_item(&self) -> usize {
        self.attrs_set_per_item
    }

    fn io_mats(&self) -> IoMats {
        let n_items = self.n_items();
        let n_contexts = self.n_contexts();
        let n_attributes = self.n_attributes();
        let n_inputs = n_items * n_contexts;

        let mut x_item = Matrix::zeros(n_inputs, n_items);
        let mut x_context = Matrix::zeros(n_inputs, n_contexts);
        let mut y = Matrix::zeros(n_inputs, n_attributes);

        for item in 0..n_items {
            for context in 0..n_contexts {
                let row = item * n_contexts + context;
                x_item.data[row][item] = 1.0;
                x_context.data[row][context] = 1.0;

                let block_start = context * self.attrs_per_context;
                for pos in self.example_positions(item, context) {
                    y.data[row][block_start + pos] = 1.0;
                }
            }
        }

        IoMats { x_item, x_context, y }
    }

    fn items(&self) -> (Matrix, Vec<String>) {
        let names = (0..self.n_items())
            .map(|i| format!("{}{}", domain_name(i / ITEMS_PER_DOMAIN), i % ITEMS_PER_DOMAIN + 1))
            .collect();
        (Matrix::identity(self.n_items()), names)
    }

    fn contexts(&self) -> (Matrix, Vec<String>) {
        let names = (0..self.n_contexts())
            .map(|c| format!("{}:c{}", domain_name(c / self.ctx_per_domain), c % self.ctx_per_domain + 1))
            .collect();
        (Matrix::identity(self.n_contexts()), names)
    }
}
