use crate::math::matrix::Matrix;

/// The three parallel training matrices: row `r` of each describes the same
/// (item, context) -> attributes example.
#[derive(Debug, Clone)]
pub struct IoMats {
    pub x_item: Matrix,
    pub x_context: Matrix,
    pub y: Matrix,
}

impl IoMats {
    pub fn n_inputs(&self) -> usize {
        self.y.rows
    }
}

/// Source of stimuli for a `DisjointDomainNet`.
///
/// Implementations must cover every item/context combination exactly once,
/// in a fixed order, and return the same data on every call.
pub trait DataProvider {
    fn n_domains(&self) -> usize;

    fn items_per_domain(&self) -> usize;

    fn ctx_per_domain(&self) -> usize;

    fn attrs_per_context(&self) -> usize;

    /// Number of attributes set in every target vector.
    fn attrs_set_per_item(&self) -> usize;

    fn io_mats(&self) -> IoMats;

    /// One row per item, with the matching display names.
    fn items(&self) -> (Matrix, Vec<String>);

    /// One row per context, with the matching display names.
    fn contexts(&self) -> (Matrix, Vec<String>);

    fn n_items(&self) -> usize {
        self.items_per_domain() * self.n_domains()
    }

    fn n_contexts(&self) -> usize {
        self.ctx_per_domain() * self.n_domains()
    }

    fn n_attributes(&self) -> usize {
        self.attrs_per_context() * self.n_contexts()
    }
}
