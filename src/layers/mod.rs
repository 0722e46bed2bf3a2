pub mod dense;

pub use dense::{Bias, Layer, Projection};
