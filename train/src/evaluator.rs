//! Pixel-level evaluation over a held-out set.

use crate::{common::*, config::EvaluationConfig, utils::try_load_checkpoint};
use std::collections::HashSet;

#[derive(Debug, Clone)]
pub struct Evaluator {
    threshold: f64,
    batch_size: usize,
    num_diagnostics: usize,
    seed: u64,
    device: Device,
}

impl Evaluator {
    pub fn new(config: &EvaluationConfig, device: Device) -> Self {
        let EvaluationConfig {
            threshold,
            batch_size,
            num_diagnostics,
            seed,
            ..
        } = *config;

        Self {
            threshold: threshold.to_f64(),
            batch_size: batch_size.get(),
            num_diagnostics,
            seed,
            device,
        }
    }

    /// Loads `checkpoint` into `vs` and evaluates.
    ///
    /// A failed load is logged and the evaluation proceeds with the parameters
    /// currently held by `vs`.
    pub fn load_and_evaluate<M, D, S>(
        &self,
        vs: &mut nn::VarStore,
        checkpoint: &Path,
        model: &M,
        test_set: &D,
        sink: &mut S,
    ) -> Result<PixelMetricsOutput>
    where
        M: ModuleT,
        D: RandomAccessDataset,
        S: DiagnosticSink + ?Sized,
    {
        if !try_load_checkpoint(vs, checkpoint).is_loaded() {
            warn!("evaluate in degraded mode with the current parameters");
        }
        self.evaluate(model, test_set, sink)
    }

    pub fn evaluate<M, D, S>(
        &self,
        model: &M,
        test_set: &D,
        sink: &mut S,
    ) -> Result<PixelMetricsOutput>
    where
        M: ModuleT,
        D: RandomAccessDataset,
        S: DiagnosticSink + ?Sized,
    {
        let num_samples = test_set.num_samples();
        ensure!(num_samples > 0, "the test set is empty");

        let rendered: HashSet<usize> = {
            let mut rng = StdRng::seed_from_u64(self.seed);
            (0..num_samples)
                .choose_multiple(&mut rng, self.num_diagnostics)
                .into_iter()
                .collect()
        };

        let mut metrics = PixelMetrics::default();

        tch::no_grad(|| -> Result<()> {
            for batch in Minibatches::sequential(test_set, self.batch_size)? {
                let Minibatch {
                    indexes,
                    images,
                    masks,
                } = batch?.to_device(self.device);

                let probabilities = model.forward_t(&images, false).f_sigmoid()?;
                let predictions = probabilities.f_binarize(self.threshold)?;
                metrics.f_update(&predictions, &masks)?;

                for (position, &index) in indexes.iter().enumerate() {
                    if !rendered.contains(&index) {
                        continue;
                    }
                    let position = position as i64;
                    let result = sink.render_sample(
                        index,
                        &images.get(position),
                        &masks.get(position),
                        &predictions.get(position),
                    );
                    if let Err(err) = result {
                        warn!("failed to render sample {}: {:#}", index, err);
                    }
                }
            }
            Ok(())
        })?;

        let output = metrics.output();
        info!(
            "evaluated {} samples\t{}",
            num_samples,
            output
                .to_map()
                .iter()
                .map(|(name, value)| format!("{}: {:.4}", name, value))
                .join("\t")
        );
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sunspot_dl::dataset::MemoryDataset;

    /// Outputs the mask channel scaled into confident logits.
    #[derive(Debug)]
    struct Oracle {
        invert: bool,
    }

    impl nn::ModuleT for Oracle {
        fn forward_t(&self, xs: &Tensor, _train: bool) -> Tensor {
            let mask = xs.narrow(1, 0, 1);
            let mask = if self.invert {
                mask.ones_like() - &mask
            } else {
                mask
            };
            (mask - 0.5) * 20.0
        }
    }

    fn dataset() -> Result<MemoryDataset> {
        tch::manual_seed(11);
        MemoryDataset::new((0..5).map(|_| {
            let mask = Tensor::rand(&[1, 8, 8], (Kind::Float, Device::Cpu)).binarize(0.5);
            let image = mask.repeat(&[3, 1, 1]);
            (image, mask)
        }))
    }

    fn evaluator(num_diagnostics: usize) -> Evaluator {
        Evaluator::new(
            &EvaluationConfig {
                num_diagnostics,
                batch_size: NonZeroUsize::new(2).unwrap(),
                ..Default::default()
            },
            Device::Cpu,
        )
    }

    #[derive(Debug, Default)]
    struct RecordingSink {
        indexes: Vec<usize>,
    }

    impl DiagnosticSink for RecordingSink {
        fn render_sample(&mut self, index: usize, _: &Tensor, _: &Tensor, _: &Tensor) -> Result<()> {
            self.indexes.push(index);
            Ok(())
        }

        fn render_detection(&mut self, _: &str, _: &Tensor, _: &Tensor, _: &Tensor) -> Result<()> {
            Ok(())
        }
    }

    #[test]
    fn perfect_predictions_score_one() -> Result<()> {
        let output = evaluator(0).evaluate(&Oracle { invert: false }, &dataset()?, &mut NullSink)?;
        assert_abs_diff_eq!(output.precision, 1.0);
        assert_abs_diff_eq!(output.recall, 1.0);
        assert_abs_diff_eq!(output.f1, 1.0);
        assert_abs_diff_eq!(output.jaccard, 1.0);
        Ok(())
    }

    #[test]
    fn disjoint_predictions_score_zero() -> Result<()> {
        let output = evaluator(0).evaluate(&Oracle { invert: true }, &dataset()?, &mut NullSink)?;
        assert_abs_diff_eq!(output.precision, 0.0);
        assert_abs_diff_eq!(output.recall, 0.0);
        assert_abs_diff_eq!(output.f1, 0.0);
        assert_abs_diff_eq!(output.jaccard, 0.0);
        Ok(())
    }

    #[test]
    fn renders_requested_number_of_samples() -> Result<()> {
        let mut sink = RecordingSink::default();
        evaluator(3).evaluate(&Oracle { invert: false }, &dataset()?, &mut sink)?;
        assert_eq!(sink.indexes.len(), 3);
        assert!(sink.indexes.iter().all(|&index| index < 5));
        Ok(())
    }

    #[test]
    fn missing_checkpoint_degrades_gracefully() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let mut vs = nn::VarStore::new(Device::Cpu);
        let output = evaluator(0).load_and_evaluate(
            &mut vs,
            &dir.path().join("missing.ot"),
            &Oracle { invert: false },
            &dataset()?,
            &mut NullSink,
        )?;
        assert_abs_diff_eq!(output.f1, 1.0);
        Ok(())
    }
}
