use serde::{Serialize, Deserialize};

use crate::math::matrix::Matrix;
use crate::network::network::DisjointDomainNet;
use crate::network::params::ParamMap;

/// Everything an `Sgd` needs to resume exactly where it was.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SgdState {
    pub learning_rate: f64,
    pub momentum: f64,
    pub velocity: ParamMap,
}

/// Stochastic gradient descent, with optional heavy-ball momentum:
///   v ← μ·v + g,  p ← p − lr·v
/// With μ = 0 this is the plain update p ← p − lr·g.
pub struct Sgd {
    pub learning_rate: f64,
    pub momentum: f64,
    velocity: ParamMap,
}

impl Sgd {
    pub fn new(learning_rate: f64) -> Sgd {
        Sgd::with_momentum(learning_rate, 0.0)
    }

    pub fn with_momentum(learning_rate: f64, momentum: f64) -> Sgd {
        Sgd { learning_rate, momentum, velocity: ParamMap::new() }
    }

    /// Clears the network's accumulated gradients.
    pub fn zero_grad(&self, net: &mut DisjointDomainNet) {
        net.zero_grad();
    }

    /// Applies one update to every trainable parameter from its accumulated
    /// gradient.
    pub fn step(&mut self, net: &mut DisjointDomainNet) {
        let lr = self.learning_rate;
        let momentum = self.momentum;
        for (id, param, grad) in net.params_and_grads_mut() {
            if momentum == 0.0 {
                param.add_scaled(-lr, grad);
                continue;
            }
            let velocity = self.velocity
                .entry(id)
                .or_insert_with(|| Matrix::zeros(grad.rows, grad.cols));
            *velocity = velocity.map(|v| v * momentum);
            velocity.add_scaled(1.0, grad);
            param.add_scaled(-lr, velocity);
        }
    }

    pub fn state(&self) -> SgdState {
        SgdState {
            learning_rate: self.learning_rate,
            momentum: self.momentum,
            velocity: self.velocity.clone(),
        }
    }

    pub fn load_state(&mut self, state: &SgdState) {
        self.learning_rate = state.learning_rate;
        self.momentum = state.momentum;
        self.velocity.clone_from(&state.velocity);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::params::ParamId;
    use crate::network::spec::NetConfig;

    fn net() -> DisjointDomainNet {
        let cfg = NetConfig { attrs_per_context: 30, ..NetConfig::default() }
            .with_domains(2, 2)
            .with_seed(1)
            .with_hidden_units(6);
        DisjointDomainNet::new(cfg).unwrap()
    }

    fn accumulate_batch(net: &mut DisjointDomainNet) {
        let rows = [1, 2, 3];
        let cache = net.forward_cached(&net.x_item.select_rows(&rows), &net.x_context.select_rows(&rows));
        let y = net.y.select_rows(&rows);
        net.backward(&cache, &y);
    }

    #[test]
    fn plain_step_moves_against_gradient() {
        let mut net = net();
        let mut opt = Sgd::new(0.5);
        opt.zero_grad(&mut net);
        accumulate_batch(&mut net);

        let before = net.param(ParamId::AttrBias).unwrap().clone();
        let grad = net.grad(ParamId::AttrBias).unwrap().clone();
        opt.step(&mut net);
        let after = net.param(ParamId::AttrBias).unwrap();

        for ((b, g), a) in before.iter().zip(grad.iter()).zip(after.iter()) {
            assert!((a - (b - 0.5 * g)).abs() < 1e-12);
        }
    }

    #[test]
    fn zero_grad_clears_accumulation() {
        let mut net = net();
        let opt = Sgd::new(0.1);
        accumulate_batch(&mut net);
        assert!(net.grad(ParamId::HiddenToAttrWeight).unwrap().iter().any(|g| g != 0.0));
        opt.zero_grad(&mut net);
        assert!(net.grad(ParamId::HiddenToAttrWeight).unwrap().iter().all(|g| g == 0.0));
    }

    #[test]
    fn restored_state_replays_momentum_identically() {
        let mut net = net();
        let mut opt = Sgd::with_momentum(0.1, 0.9);
        accumulate_batch(&mut net);
        opt.step(&mut net);

        let net_saved = net.state();
        let opt_saved = opt.state();

        opt.step(&mut net);
        let first = net.state();

        net.load_state(&net_saved).unwrap();
        opt.load_state(&opt_saved);
        opt.step(&mut net);
        assert_eq!(net.state(), first);
    }
}
