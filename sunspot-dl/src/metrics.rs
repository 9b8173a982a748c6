//! Pixel-level binary classification metrics pooled over a whole dataset.

use crate::common::*;

/// Confusion counts accumulated over all pixels seen so far.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PixelMetrics {
    pub true_positive: u64,
    pub false_positive: u64,
    pub false_negative: u64,
}

impl PixelMetrics {
    /// Adds the counts of a binary prediction against a binary target of equal shape.
    pub fn f_update(&mut self, prediction: &Tensor, target: &Tensor) -> Result<()> {
        ensure!(
            prediction.size() == target.size(),
            "prediction shape {:?} does not match target shape {:?}",
            prediction.size(),
            target.size()
        );

        let (tp, fp, fn_) = tch::no_grad(|| -> Result<_> {
            let prediction = prediction.f_ne(0.0)?;
            let target = target.f_ne(0.0)?;
            let tp = prediction.f_logical_and(&target)?.f_sum(Kind::Int64)?;
            let fp = prediction
                .f_logical_and(&target.f_logical_not()?)?
                .f_sum(Kind::Int64)?;
            let fn_ = prediction
                .f_logical_not()?
                .f_logical_and(&target)?
                .f_sum(Kind::Int64)?;
            Ok((i64::from(&tp), i64::from(&fp), i64::from(&fn_)))
        })?;

        self.true_positive += tp as u64;
        self.false_positive += fp as u64;
        self.false_negative += fn_ as u64;
        Ok(())
    }

    pub fn output(&self) -> PixelMetricsOutput {
        let Self {
            true_positive: tp,
            false_positive: fp,
            false_negative: fn_,
        } = *self;

        let ratio = |num: u64, den: u64| {
            if den == 0 {
                0.0
            } else {
                num as f64 / den as f64
            }
        };

        PixelMetricsOutput {
            precision: ratio(tp, tp + fp),
            recall: ratio(tp, tp + fn_),
            f1: ratio(2 * tp, 2 * tp + fp + fn_),
            jaccard: ratio(tp, tp + fp + fn_),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PixelMetricsOutput {
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub jaccard: f64,
}

impl PixelMetricsOutput {
    pub fn to_map(&self) -> IndexMap<&'static str, f64> {
        IndexMap::from([
            ("precision", self.precision),
            ("recall", self.recall),
            ("f1", self.f1),
            ("jaccard", self.jaccard),
        ])
    }
}

impl Display for PixelMetricsOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = self
            .to_map()
            .into_iter()
            .map(|(name, value)| format!("{}: {:.4}", name, value))
            .join(", ");
        f.write_str(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn random_mask(seed: i64) -> Tensor {
        tch::manual_seed(seed);
        Tensor::rand(&[4, 1, 8, 8], (Kind::Float, Device::Cpu)).binarize(0.5)
    }

    #[test]
    fn identical_predictions_score_one() -> Result<()> {
        let target = random_mask(1);
        let mut metrics = PixelMetrics::default();
        metrics.f_update(&target, &target)?;
        let output = metrics.output();

        for (_, value) in output.to_map() {
            assert_abs_diff_eq!(value, 1.0);
        }
        Ok(())
    }

    #[test]
    fn disjoint_predictions_score_zero() -> Result<()> {
        let target = random_mask(2);
        let prediction = target.ones_like() - &target;
        let mut metrics = PixelMetrics::default();
        metrics.f_update(&prediction, &target)?;

        for (_, value) in metrics.output().to_map() {
            assert_abs_diff_eq!(value, 0.0);
        }
        Ok(())
    }

    #[test]
    fn counts_are_pooled_across_updates() -> Result<()> {
        let mut metrics = PixelMetrics::default();
        let prediction = Tensor::of_slice(&[1.0f32, 1.0, 0.0, 0.0]);
        let target = Tensor::of_slice(&[1.0f32, 0.0, 1.0, 0.0]);
        metrics.f_update(&prediction, &target)?;
        metrics.f_update(&target, &target)?;

        assert_eq!(
            metrics,
            PixelMetrics {
                true_positive: 3,
                false_positive: 1,
                false_negative: 1,
            }
        );

        let output = metrics.output();
        assert_abs_diff_eq!(output.precision, 0.75);
        assert_abs_diff_eq!(output.recall, 0.75);
        assert_abs_diff_eq!(output.f1, 0.75);
        assert_abs_diff_eq!(output.jaccard, 0.6);
        Ok(())
    }

    #[test]
    fn empty_counts_score_zero() {
        let output = PixelMetrics::default().output();
        assert_eq!(
            output.to_map().keys().copied().collect::<Vec<_>>(),
            vec!["precision", "recall", "f1", "jaccard"]
        );
        assert!(output.to_map().values().all(|&value| value == 0.0));
    }

    #[test]
    fn shape_mismatch_is_rejected() {
        let mut metrics = PixelMetrics::default();
        let lhs = Tensor::zeros(&[1, 1, 4, 4], (Kind::Float, Device::Cpu));
        let rhs = Tensor::zeros(&[1, 1, 4, 5], (Kind::Float, Device::Cpu));
        assert!(metrics.f_update(&lhs, &rhs).is_err());
    }
}
