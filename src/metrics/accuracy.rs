use crate::math::matrix::Matrix;

/// An output counts as correct when it lies this close to its target.
pub const CORRECT_TOLERANCE: f64 = 0.1;

/// Number of attributes assumed set in every target vector.
pub const DEFAULT_SET_ATTRS: usize = 25;

/// Element-wise correctness: 1.0 where |output − target| < 0.1, else 0.0.
pub fn b_outputs_correct(outputs: &Matrix, targets: &Matrix) -> Matrix {
    assert_eq!(outputs.shape(), targets.shape());
    Matrix {
        rows: outputs.rows,
        cols: outputs.cols,
        data: outputs.data.iter().zip(&targets.data)
            .map(|(out, tgt)| {
                out.iter().zip(tgt)
                    .map(|(o, t)| if (o - t).abs() < CORRECT_TOLERANCE { 1.0 } else { 0.0 })
                    .collect()
            })
            .collect(),
    }
}

/// Mean of `b_outputs_correct` for each example.
pub fn plain_acc(outputs: &Matrix, targets: &Matrix) -> Vec<f64> {
    let cols = outputs.cols.max(1) as f64;
    b_outputs_correct(outputs, targets)
        .data
        .iter()
        .map(|row| row.iter().sum::<f64>() / cols)
        .collect()
}

/// Per-example accuracy corrected for the sparse targets.
///
/// The `set_attrs` attributes that should be on share half of the weight and
/// the remaining ones share the other half, so a network that outputs all
/// zeros scores 0.5 rather than ~0.9.
pub fn weighted_acc(outputs: &Matrix, targets: &Matrix, set_attrs: usize) -> Vec<f64> {
    let total_attrs = targets.cols;
    let unset_attrs = total_attrs.saturating_sub(set_attrs);

    let set_weight = if set_attrs > 0 { 0.5 / set_attrs as f64 } else { 0.0 };
    let unset_weight = if unset_attrs > 0 { 0.5 / unset_attrs as f64 } else { 0.0 };

    let correct = b_outputs_correct(outputs, targets);
    correct.data.iter().zip(&targets.data)
        .map(|(c_row, t_row)| {
            c_row.iter().zip(t_row)
                .map(|(c, &t)| if t != 0.0 { set_weight * c } else { unset_weight * c })
                .sum()
        })
        .collect()
}
