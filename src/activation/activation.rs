use std::f64::consts::E;

use crate::math::matrix::Matrix;

/// Logistic function. Every layer of the network squashes with it.
pub fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + E.powf(-x))
}

/// Derivative of the sigmoid expressed through its output `a = σ(z)`:
/// σ'(z) = a · (1 − a). Backprop keeps activations, not pre-activations.
pub fn sigmoid_derivative_from_output(a: f64) -> f64 {
    a * (1.0 - a)
}

/// Element-wise sigmoid of a whole batch.
pub fn sigmoid_matrix(z: &Matrix) -> Matrix {
    z.map(sigmoid)
}

/// δ_pre = δ_post ⊙ σ'(z), with σ(z) given as `activation`.
pub fn sigmoid_backward(delta: &Matrix, activation: &Matrix) -> Matrix {
    delta.hadamard(&activation.map(sigmoid_derivative_from_output))
}
