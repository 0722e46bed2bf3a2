pub mod math;
pub mod activation;
pub mod error;
pub mod data;
pub mod layers;
pub mod network;
pub mod loss;
pub mod metrics;
pub mod optim;
pub mod holdout;
pub mod snapshot;
pub mod train;
pub mod config;

// Convenience re-exports
pub use math::matrix::Matrix;
pub use error::{DdnetError, Result};
pub use data::{DataProvider, DomainLayout};
pub use network::{DisjointDomainNet, NetConfig, NetworkState};
pub use optim::{Sgd, SgdState};
pub use holdout::Generalization;
pub use snapshot::{SnapScale, Snapshots};
pub use train::{HoldoutMode, TrainConfig, TrainingRun};
pub use config::RunConfig;
