use serde::{Serialize, Deserialize};

use crate::math::matrix::Matrix;

/// Bias row of a layer: either learned, or a constant that the optimizer
/// never sees.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Bias {
    Trainable(Matrix),
    Fixed(Matrix),
}

impl Bias {
    pub fn trainable(size: usize) -> Bias {
        Bias::Trainable(Matrix::zeros(1, size))
    }

    pub fn fixed(size: usize, value: f64) -> Bias {
        Bias::Fixed(Matrix::filled(1, size, value))
    }

    /// The 1 × size row added to every pre-activation.
    pub fn values(&self) -> &Matrix {
        match self {
            Bias::Trainable(m) | Bias::Fixed(m) => m,
        }
    }

    pub fn trainable_mut(&mut self) -> Option<&mut Matrix> {
        match self {
            Bias::Trainable(m) => Some(m),
            Bias::Fixed(_) => None,
        }
    }

    pub fn is_trainable(&self) -> bool {
        matches!(self, Bias::Trainable(_))
    }
}

/// Linear map without activation: z = x · W + b.
///
/// Weights are stored input_size × size so a batch (one example per row)
/// multiplies from the left.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Layer{
    pub size: usize,
    pub weights: Matrix,
    pub bias: Bias,
}

impl Layer {
    /// Zero-initialized layer; the network perturbs the parameters afterwards.
    pub fn new(input_size: usize, size: usize, bias: Bias) -> Layer {
        assert_eq!(bias.values().cols, size, "bias width must match layer size");
        Layer {
            size,
            weights: Matrix::zeros(input_size, size),
            bias,
        }
    }

    pub fn input_size(&self) -> usize {
        self.weights.rows
    }

    pub fn pre_activation(&self, input: &Matrix) -> Matrix {
        (input * &self.weights).add_row(self.bias.values())
    }

    /// Computes parameter gradients. Returns (weights_grad, biases_grad); the
    /// bias gradient is `None` when the bias is fixed.
    /// `delta` is ∂L/∂z for this layer (error in pre-activation space),
    /// summed over the batch by the matrix products.
    pub fn compute_gradients(&self, delta: &Matrix, inputs: &Matrix) -> (Matrix, Option<Matrix>) {
        let weights_grad = &inputs.transpose() * delta;
        let biases_grad = self.bias.is_trainable().then(|| delta.sum_rows());
        (weights_grad, biases_grad)
    }

    /// Propagates ∂L/∂z back to ∂L/∂input.
    pub fn backpropagate(&self, delta: &Matrix) -> Matrix {
        delta * &self.weights.transpose()
    }
}

/// Representation stage for one input stream: a learned linear map, or a
/// passthrough that forwards the raw one-hot code unchanged.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Projection {
    Linear(Layer),
    Identity { width: usize },
}

impl Projection {
    pub fn layer(&self) -> Option<&Layer> {
        match self {
            Projection::Linear(layer) => Some(layer),
            Projection::Identity { .. } => None,
        }
    }

    pub fn layer_mut(&mut self) -> Option<&mut Layer> {
        match self {
            Projection::Linear(layer) => Some(layer),
            Projection::Identity { .. } => None,
        }
    }

    pub fn pre_activation(&self, input: &Matrix) -> Matrix {
        match self {
            Projection::Linear(layer) => layer.pre_activation(input),
            Projection::Identity { .. } => input.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_layer(bias: Bias) -> Layer {
        let mut layer = Layer::new(2, 2, bias);
        layer.weights = Matrix::from_data(vec![vec![1.0, -1.0], vec![0.5, 2.0]]);
        layer
    }

    #[test]
    fn pre_activation_adds_bias_to_each_row() {
        let layer = small_layer(Bias::fixed(2, -2.0));
        let x = Matrix::from_data(vec![vec![1.0, 0.0], vec![0.0, 1.0]]);
        let z = layer.pre_activation(&x);
        assert_eq!(z.data, vec![vec![-1.0, -3.0], vec![-1.5, 0.0]]);
    }

    #[test]
    fn fixed_bias_has_no_gradient() {
        let x = Matrix::from_data(vec![vec![1.0, 2.0]]);
        let delta = Matrix::from_data(vec![vec![0.5, -0.5]]);

        let (w_grad, b_grad) = small_layer(Bias::fixed(2, 0.0)).compute_gradients(&delta, &x);
        assert_eq!(w_grad.data, vec![vec![0.5, -0.5], vec![1.0, -1.0]]);
        assert!(b_grad.is_none());

        let (_, b_grad) = small_layer(Bias::trainable(2)).compute_gradients(&delta, &x);
        assert_eq!(b_grad.map(|b| b.data), Some(vec![vec![0.5, -0.5]]));
    }

    #[test]
    fn identity_projection_passes_input_through() {
        let proj = Projection::Identity { width: 3 };
        let x = Matrix::identity(3);
        assert_eq!(proj.pre_activation(&x), x);
        assert!(proj.layer().is_none());
    }
}
