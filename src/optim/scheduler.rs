use serde::{Serialize, Deserialize};

use crate::optim::sgd::Sgd;

/// Adjusts an optimizer's learning rate once per epoch.
pub trait LrScheduler {
    fn step(&mut self, optimizer: &mut Sgd);
}

/// Multiplies the learning rate by `gamma` every `step_size` epochs.
#[derive(Debug, Clone)]
pub struct StepLr {
    pub step_size: usize,
    pub gamma: f64,
    epoch: usize,
}

impl StepLr {
    pub fn new(step_size: usize, gamma: f64) -> StepLr {
        StepLr { step_size: step_size.max(1), gamma, epoch: 0 }
    }
}

impl LrScheduler for StepLr {
    fn step(&mut self, optimizer: &mut Sgd) {
        self.epoch += 1;
        if self.epoch % self.step_size == 0 {
            optimizer.learning_rate *= self.gamma;
        }
    }
}

/// Multiplies the learning rate by `gamma` every epoch.
#[derive(Debug, Clone)]
pub struct ExponentialLr {
    pub gamma: f64,
}

impl LrScheduler for ExponentialLr {
    fn step(&mut self, optimizer: &mut Sgd) {
        optimizer.learning_rate *= self.gamma;
    }
}

/// Serializable choice of scheduler for `TrainConfig`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SchedulerConfig {
    Step { step_size: usize, gamma: f64 },
    Exponential { gamma: f64 },
}

impl SchedulerConfig {
    pub fn build(&self) -> Box<dyn LrScheduler> {
        match *self {
            SchedulerConfig::Step { step_size, gamma } => Box::new(StepLr::new(step_size, gamma)),
            SchedulerConfig::Exponential { gamma } => Box::new(ExponentialLr { gamma }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_lr_decays_on_schedule() {
        let mut opt = Sgd::new(1.0);
        let mut sched = StepLr::new(2, 0.5);
        sched.step(&mut opt);
        assert_eq!(opt.learning_rate, 1.0);
        sched.step(&mut opt);
        assert_eq!(opt.learning_rate, 0.5);
        sched.step(&mut opt);
        sched.step(&mut opt);
        assert_eq!(opt.learning_rate, 0.25);
    }

    #[test]
    fn config_parses_tagged_json() {
        let cfg: SchedulerConfig = serde_json::from_str(r#"{"type": "exponential", "gamma": 0.9}"#).unwrap();
        assert_eq!(cfg, SchedulerConfig::Exponential { gamma: 0.9 });
        let mut opt = Sgd::new(1.0);
        cfg.build().step(&mut opt);
        assert!((opt.learning_rate - 0.9).abs() < 1e-12);
    }
}
