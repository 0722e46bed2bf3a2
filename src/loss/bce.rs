use crate::math::matrix::Matrix;

/// Binary cross-entropy with sum reduction, for sigmoid outputs.
pub struct BceLoss;

/// Lower bound applied to each log term, so saturated outputs give a large
/// but finite loss.
const LOG_FLOOR: f64 = -100.0;

impl BceLoss {
    /// Scalar BCE summed over every example and output:
    ///   -Σ (y·log(p) + (1-y)·log(1-p)), log terms clamped at `LOG_FLOOR`.
    pub fn loss_sum(predicted: &Matrix, expected: &Matrix) -> f64 {
        assert_eq!(predicted.shape(), expected.shape());
        predicted.iter().zip(expected.iter())
            .map(|(p, y)| {
                let log_p = p.ln().max(LOG_FLOOR);
                let log_1mp = (1.0 - p).ln().max(LOG_FLOOR);
                -(y * log_p + (1.0 - y) * log_1mp)
            })
            .sum()
    }

    /// Gradient of `loss_sum` w.r.t. the pre-sigmoid logits of the output
    /// layer. Sigmoid and BCE composed simplify to `predicted - expected`,
    /// so the output layer's own activation derivative must not be applied
    /// again.
    pub fn logit_delta(predicted: &Matrix, expected: &Matrix) -> Matrix {
        predicted.clone() - expected.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loss_is_sum_not_mean() {
        let p = Matrix::from_data(vec![vec![0.5, 0.5], vec![0.5, 0.5]]);
        let y = Matrix::from_data(vec![vec![1.0, 0.0], vec![0.0, 1.0]]);
        let expected = 4.0 * std::f64::consts::LN_2;
        assert!((BceLoss::loss_sum(&p, &y) - expected).abs() < 1e-12);
    }

    #[test]
    fn saturated_prediction_stays_finite() {
        let p = Matrix::from_data(vec![vec![0.0, 1.0]]);
        let y = Matrix::from_data(vec![vec![1.0, 0.0]]);
        let loss = BceLoss::loss_sum(&p, &y);
        assert!(loss.is_finite());
        assert!((loss - 200.0).abs() < 1e-9);
    }
}
