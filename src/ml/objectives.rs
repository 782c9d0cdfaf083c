// ============================================================
// Layer 5 — Objectives
// ============================================================
// NLL over log-probabilities:  L = -mean_b log p(y_b | x_b)
// Classification error:        fraction of argmax != target

use burn::prelude::*;

/// Mean negative log-likelihood — shape: [1]
pub fn nll_loss<B: Backend>(log_probs: Tensor<B, 2>, targets: Tensor<B, 1, Int>) -> Tensor<B, 1> {
    let [b, _] = log_probs.dims();
    assert_eq!(targets.dims()[0], b, "predictions and targets disagree on batch size");
    log_probs.gather(1, targets.reshape([b, 1])).mean().neg()
}

/// Error rate in [0, 1].
pub fn classification_error<B: Backend>(log_probs: Tensor<B, 2>, targets: Tensor<B, 1, Int>) -> f64 {
    let [b, _] = log_probs.dims();
    assert_eq!(targets.dims()[0], b, "predictions and targets disagree on batch size");
    if b == 0 {
        return 0.0;
    }
    // argmax(1) returns [B, 1]
    let pred = log_probs.argmax(1).flatten::<1>(0, 1);
    let correct: i64 = pred.equal(targets).int().sum().into_scalar().elem::<i64>();
    1.0 - correct as f64 / b as f64
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use burn::tensor::activation::log_softmax;

    type TestBackend = burn::backend::NdArray<f32>;

    fn log_probs(rows: [[f32; 3]; 2]) -> Tensor<TestBackend, 2> {
        log_softmax(Tensor::from_floats(rows, &Default::default()), 1)
    }

    fn targets(t: [i32; 2]) -> Tensor<TestBackend, 1, Int> {
        Tensor::from_ints(t, &Default::default())
    }

    #[test]
    fn test_nll_of_uniform_is_ln_classes() {
        let loss = nll_loss(log_probs([[0.0; 3], [0.0; 3]]), targets([0, 2]));
        assert_relative_eq!(loss.into_scalar().elem::<f64>(), 3f64.ln(), epsilon = 1e-5);
    }

    #[test]
    fn test_nll_is_small_for_confident_correct() {
        let lp   = log_probs([[20.0, 0.0, 0.0], [0.0, 0.0, 20.0]]);
        let loss = nll_loss(lp, targets([0, 2])).into_scalar().elem::<f64>();
        assert!(loss >= 0.0 && loss < 1e-6);
    }

    #[test]
    fn test_error_rate_bounds() {
        let lp = log_probs([[5.0, 0.0, 0.0], [5.0, 0.0, 0.0]]);
        assert_relative_eq!(classification_error(lp.clone(), targets([0, 0])), 0.0);
        assert_relative_eq!(classification_error(lp.clone(), targets([0, 1])), 0.5);
        assert_relative_eq!(classification_error(lp, targets([2, 1])), 1.0);
    }

    #[test]
    #[should_panic(expected = "disagree on batch size")]
    fn test_batch_size_mismatch_panics() {
        let t = Tensor::<TestBackend, 1, Int>::from_ints([0, 1, 2], &Default::default());
        nll_loss(log_probs([[0.0; 3], [0.0; 3]]), t);
    }
}
