use std::collections::BTreeMap;

use serde::{Serialize, Deserialize};

use crate::math::matrix::Matrix;

/// Names every parameter tensor the network can own. Which of them exist
/// depends on the configuration: skipped layers and fixed biases own none.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ParamId {
    ItemToRepWeight,
    ItemRepBias,
    CtxToRepWeight,
    CtxRepBias,
    RepToHiddenWeight,
    HiddenBias,
    HiddenToAttrWeight,
    AttrBias,
}

impl ParamId {
    pub const ALL: [ParamId; 8] = [
        ParamId::ItemToRepWeight,
        ParamId::ItemRepBias,
        ParamId::CtxToRepWeight,
        ParamId::CtxRepBias,
        ParamId::RepToHiddenWeight,
        ParamId::HiddenBias,
        ParamId::HiddenToAttrWeight,
        ParamId::AttrBias,
    ];

    pub fn is_bias(self) -> bool {
        matches!(
            self,
            ParamId::ItemRepBias | ParamId::CtxRepBias | ParamId::HiddenBias | ParamId::AttrBias
        )
    }

    pub fn name(self) -> &'static str {
        match self {
            ParamId::ItemToRepWeight => "item_to_rep.weight",
            ParamId::ItemRepBias => "item_rep_bias",
            ParamId::CtxToRepWeight => "ctx_to_rep.weight",
            ParamId::CtxRepBias => "ctx_rep_bias",
            ParamId::RepToHiddenWeight => "rep_to_hidden.weight",
            ParamId::HiddenBias => "hidden_bias",
            ParamId::HiddenToAttrWeight => "hidden_to_attr.weight",
            ParamId::AttrBias => "attr_bias",
        }
    }
}

/// One matrix per trainable parameter. Used both for accumulated gradients
/// and for frozen copies of the parameter values.
pub type ParamMap = BTreeMap<ParamId, Matrix>;

/// Immutable copy of every trainable parameter, taken with
/// `DisjointDomainNet::state` and written back with `load_state`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkState {
    pub params: ParamMap,
}

impl NetworkState {
    pub fn get(&self, id: ParamId) -> Option<&Matrix> {
        self.params.get(&id)
    }

    /// Serializes the state to a pretty-printed JSON file.
    pub fn save_json(&self, path: &str) -> crate::error::Result<()> {
        let file = std::fs::File::create(path)?;
        let writer = std::io::BufWriter::new(file);
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }

    /// Deserializes a state previously written by `save_json`.
    pub fn load_json(path: &str) -> crate::error::Result<NetworkState> {
        let file = std::fs::File::open(path)?;
        let reader = std::io::BufReader::new(file);
        Ok(serde_json::from_reader(reader)?)
    }
}
