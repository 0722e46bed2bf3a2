use std::str::FromStr;

use serde::{Serialize, Deserialize};

use crate::error::{DdnetError, Result};

/// Spacing of snapshot epochs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SnapScale {
    #[serde(alias = "linear")]
    Lin,
    Log,
}

impl FromStr for SnapScale {
    type Err = DdnetError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "lin" | "linear" => Ok(SnapScale::Lin),
            "log" => Ok(SnapScale::Log),
            _ => Err(DdnetError::UnknownSnapScale(s.to_string())),
        }
    }
}

/// Epochs at which snapshots are recorded, ascending and without repeats.
///
/// - `Lin`: every `freq` epochs starting at 0.
/// - `Log`: `ceil(num_epochs / freq)` points spaced geometrically over
///   `[1, num_epochs]`, rounded, deduplicated, then shifted down by one so
///   that the first snapshot is epoch 0.
pub fn calc_snap_epochs(freq: usize, scale: SnapScale, num_epochs: usize) -> Vec<usize> {
    let freq = freq.max(1);
    if num_epochs == 0 {
        return Vec::new();
    }
    match scale {
        SnapScale::Lin => (0..num_epochs).step_by(freq).collect(),
        SnapScale::Log => {
            let n_points = num_epochs.div_ceil(freq);
            let last = num_epochs as f64;
            let mut epochs: Vec<usize> = (0..n_points)
                .map(|k| {
                    let t = if n_points == 1 { 0.0 } else { k as f64 / (n_points - 1) as f64 };
                    last.powf(t).round() as usize - 1
                })
                .collect();
            epochs.dedup();
            epochs
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn linear_schedule() {
        assert_eq!(calc_snap_epochs(5, SnapScale::Lin, 20), vec![0, 5, 10, 15]);
        assert_eq!(calc_snap_epochs(5, SnapScale::Lin, 21), vec![0, 5, 10, 15, 20]);
        assert_eq!(calc_snap_epochs(50, SnapScale::Lin, 10), vec![0]);
    }

    #[test]
    fn log_schedule_starts_at_zero_and_ends_at_last_epoch() {
        let epochs = calc_snap_epochs(10, SnapScale::Log, 1000);
        assert_eq!(epochs[0], 0);
        assert_eq!(*epochs.last().unwrap(), 999);
        assert!(epochs.len() <= 100);
        assert!(epochs.windows(2).all(|w| w[0] < w[1]));
        // Early snapshots are denser than late ones.
        assert!(epochs[1] - epochs[0] <= epochs[epochs.len() - 1] - epochs[epochs.len() - 2]);
    }

    #[test]
    fn scale_names() {
        assert_eq!("LOG".parse::<SnapScale>().unwrap(), SnapScale::Log);
        assert_eq!("linear".parse::<SnapScale>().unwrap(), SnapScale::Lin);
        assert!(matches!("cubic".parse::<SnapScale>(), Err(DdnetError::UnknownSnapScale(_))));
    }
}
