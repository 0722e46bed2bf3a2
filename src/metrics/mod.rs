pub mod accuracy;

pub use accuracy::{b_outputs_correct, plain_acc, weighted_acc, DEFAULT_SET_ATTRS};
