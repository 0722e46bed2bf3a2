pub mod scheduler;
pub mod sgd;

pub use scheduler::{ExponentialLr, LrScheduler, SchedulerConfig, StepLr};
pub use sgd::{Sgd, SgdState};
