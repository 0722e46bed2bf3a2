use std::str::FromStr;

use serde::{Serialize, Deserialize};

use crate::error::{DdnetError, Result};
use crate::metrics::DEFAULT_SET_ATTRS;

/// How trainable parameters are perturbed away from zero at construction.
///
/// - `Normal`  — N(0, scale²)
/// - `Uniform` — U(−scale, scale)
/// - `Default` — Xavier-normal weights and zero biases; ignores the scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InitType {
    Normal,
    Uniform,
    Default,
}

impl FromStr for InitType {
    type Err = DdnetError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "normal" => Ok(InitType::Normal),
            "uniform" => Ok(InitType::Uniform),
            "default" => Ok(InitType::Default),
            _ => Err(DdnetError::UnknownInitType(s.to_string())),
        }
    }
}

/// Architecture and stimulus description of a `DisjointDomainNet`.
///
/// Every field has a default, so a JSON file only needs to name what it
/// changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetConfig {
    pub ctx_per_domain: usize,
    pub attrs_per_context: usize,
    pub n_domains: usize,
    pub attrs_set_per_item: usize,
    pub item_repr_units: usize,
    pub ctx_repr_units: usize,
    pub hidden_units: usize,
    /// Seed for initialization, shuffling, and holdout choice; `None` draws
    /// from OS entropy.
    pub rng_seed: Option<u64>,
    /// Item and context representations share one layer and are summed.
    pub merged_repr: bool,
    pub use_item_repr: bool,
    pub use_ctx_repr: bool,
    /// Item cluster sizes within a domain, e.g. `"4-2-2"`.
    pub cluster_info: String,
    pub last_domain_cluster_info: Option<String>,
    pub param_init_type: InitType,
    pub param_init_scale: f64,
    /// Replace every bias with the constant `fixed_bias`.
    pub fix_biases: bool,
    pub fixed_bias: f64,
    pub repeat_attrs_over_domains: bool,
}

impl Default for NetConfig {
    fn default() -> Self {
        NetConfig {
            ctx_per_domain: 4,
            attrs_per_context: 50,
            n_domains: 4,
            attrs_set_per_item: DEFAULT_SET_ATTRS,
            item_repr_units: 16,
            ctx_repr_units: 16,
            hidden_units: 32,
            rng_seed: None,
            merged_repr: false,
            use_item_repr: true,
            use_ctx_repr: true,
            cluster_info: "4-2-2".to_string(),
            last_domain_cluster_info: None,
            param_init_type: InitType::Normal,
            param_init_scale: 0.01,
            fix_biases: false,
            fixed_bias: -2.0,
            repeat_attrs_over_domains: false,
        }
    }
}

impl NetConfig {
    #[must_use]
    pub fn with_domains(mut self, n_domains: usize, ctx_per_domain: usize) -> Self {
        self.n_domains = n_domains;
        self.ctx_per_domain = ctx_per_domain;
        self
    }

    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng_seed = Some(seed);
        self
    }

    #[must_use]
    pub fn with_repr_units(mut self, item: usize, ctx: usize) -> Self {
        self.item_repr_units = item;
        self.ctx_repr_units = ctx;
        self
    }

    #[must_use]
    pub fn with_hidden_units(mut self, hidden: usize) -> Self {
        self.hidden_units = hidden;
        self
    }

    #[must_use]
    pub fn with_init(mut self, init: InitType, scale: f64) -> Self {
        self.param_init_type = init;
        self.param_init_scale = scale;
        self
    }

    /// Checks the combinations that cannot describe a network.
    pub fn validate(&self) -> Result<()> {
        if self.merged_repr && !(self.use_item_repr && self.use_ctx_repr) {
            return Err(DdnetError::MergeWithoutRepr);
        }
        if self.hidden_units == 0 {
            return Err(DdnetError::InvalidConfig("hidden_units must be positive".into()));
        }
        if (self.use_item_repr && self.item_repr_units == 0)
            || (self.use_ctx_repr && self.ctx_repr_units == 0)
        {
            return Err(DdnetError::InvalidConfig(
                "enabled representation layers need at least one unit".into(),
            ));
        }
        if !(self.param_init_scale.is_finite() && self.param_init_scale >= 0.0) {
            return Err(DdnetError::InvalidConfig(
                "param_init_scale must be finite and non-negative".into(),
            ));
        }
        Ok(())
    }

    /// Serializes the config to a pretty-printed JSON file.
    pub fn save_json(&self, path: &str) -> Result<()> {
        let file = std::fs::File::create(path)?;
        let writer = std::io::BufWriter::new(file);
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }

    /// Deserializes a `NetConfig` from a JSON file.
    pub fn load_json(path: &str) -> Result<NetConfig> {
        let file = std::fs::File::open(path)?;
        let reader = std::io::BufReader::new(file);
        Ok(serde_json::from_reader(reader)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_type_parses_case_insensitively() {
        assert_eq!("Normal".parse::<InitType>().unwrap(), InitType::Normal);
        assert_eq!("uniform".parse::<InitType>().unwrap(), InitType::Uniform);
        assert!(matches!(
            "kaiming".parse::<InitType>(),
            Err(DdnetError::UnknownInitType(s)) if s == "kaiming"
        ));
    }

    #[test]
    fn merging_requires_both_representation_layers() {
        let mut cfg = NetConfig { merged_repr: true, ..NetConfig::default() };
        assert!(cfg.validate().is_ok());
        cfg.use_ctx_repr = false;
        assert!(matches!(cfg.validate(), Err(DdnetError::MergeWithoutRepr)));
    }

    #[test]
    fn partial_json_fills_in_defaults() {
        let cfg: NetConfig = serde_json::from_str(r#"{"n_domains": 2, "param_init_type": "uniform"}"#).unwrap();
        assert_eq!(cfg.n_domains, 2);
        assert_eq!(cfg.param_init_type, InitType::Uniform);
        assert_eq!(cfg.hidden_units, 32);
        assert_eq!(cfg.cluster_info, "4-2-2");
    }
}
