pub mod recorder;
pub mod schedule;

pub use recorder::{ParamSnapshots, SnapshotTensor, Snapshots};
pub use schedule::{calc_snap_epochs, SnapScale};
