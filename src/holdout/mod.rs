pub mod generalize;
pub mod split;

pub use generalize::Generalization;
pub use split::{ComboHoldout, DomainHoldout, HoldoutSplit};
