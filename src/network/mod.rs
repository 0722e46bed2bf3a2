pub mod network;
pub mod params;
pub mod spec;

pub use network::{DisjointDomainNet, ForwardCache};
pub use params::{NetworkState, ParamId, ParamMap};
pub use spec::{InitType, NetConfig};
