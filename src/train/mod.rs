pub mod trainer;
pub mod epoch_stats;
pub mod train_config;
pub mod loop_fn;
pub mod report;

pub use trainer::TrainingRun;
pub use epoch_stats::EpochStats;
pub use train_config::{HoldoutMode, TrainConfig};
pub use report::{ProbeKind, Reports};
