//! Gradient-accumulated training with plateau decay and best-checkpoint persistence.

use crate::{
    common::*,
    config::{CheckpointConfig, LearningRateSchedule, TrainingConfig},
    utils::{plot_loss_curve, save_checkpoint, save_with_fallback, try_load_checkpoint, LrScheduler},
};

const ADAM_BETA1: f64 = 0.9;
const ADAM_BETA2: f64 = 0.999;

/// The losses of one finished epoch.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EpochLoss {
    pub epoch: usize,
    pub train_loss: f64,
    pub val_loss: f64,
}

#[derive(Debug, Clone)]
pub struct TrainingOutput {
    /// The last successfully saved checkpoint.
    pub checkpoint: Option<PathBuf>,
    pub curve: Vec<EpochLoss>,
}

/// Runs one training epoch and returns the mean unscaled minibatch loss.
///
/// Each minibatch loss is divided by `accumulation_steps` before
/// backpropagation. `apply_update` is called after every `accumulation_steps`
/// minibatches and after the last one. Gradients must be zero on entry.
pub fn train_epoch<M, D, F>(
    model: &M,
    loss_fn: &BceWithLogitsLoss,
    batches: Minibatches<'_, D>,
    accumulation_steps: usize,
    device: Device,
    mut apply_update: F,
) -> Result<f64>
where
    M: ModuleT,
    D: RandomAccessDataset,
    F: FnMut(),
{
    ensure!(
        accumulation_steps > 0,
        "accumulation_steps must be positive"
    );
    let num_batches = batches.num_batches();
    ensure!(num_batches > 0, "the training set is empty");

    let mut total_loss = 0.0;

    for (step, batch) in batches.enumerate() {
        let Minibatch { images, masks, .. } = batch?.to_device(device);

        let logits = model.forward_t(&images, true);
        let loss = loss_fn.f_forward(&logits, &masks)?;
        (&loss / accumulation_steps as f64).backward();
        total_loss += f64::from(&loss);

        let is_last = step + 1 == num_batches;
        if (step + 1) % accumulation_steps == 0 || is_last {
            apply_update();
        }
    }

    Ok(total_loss / num_batches as f64)
}

/// Computes the mean minibatch loss in evaluation mode without gradient tracking.
pub fn validate_epoch<M, D>(
    model: &M,
    loss_fn: &BceWithLogitsLoss,
    batches: Minibatches<'_, D>,
    device: Device,
) -> Result<f64>
where
    M: ModuleT,
    D: RandomAccessDataset,
{
    let num_batches = batches.num_batches();
    ensure!(num_batches > 0, "the validation set is empty");

    tch::no_grad(|| -> Result<_> {
        let mut total_loss = 0.0;
        for batch in batches {
            let Minibatch { images, masks, .. } = batch?.to_device(device);
            let logits = model.forward_t(&images, false);
            total_loss += f64::from(&loss_fn.f_forward(&logits, &masks)?);
        }
        Ok(total_loss / num_batches as f64)
    })
}

#[derive(Debug, Clone)]
pub struct Trainer {
    epochs: usize,
    batch_size: usize,
    accumulation_steps: usize,
    lr_schedule: LearningRateSchedule,
    weight_decay: f64,
    device: Device,
    seed: u64,
    load_checkpoint: Option<PathBuf>,
    checkpoint: CheckpointConfig,
}

impl Trainer {
    pub fn new(training: &TrainingConfig, checkpoint: &CheckpointConfig) -> Result<Self> {
        let TrainingConfig {
            epochs,
            batch_size,
            accumulation_steps,
            ref lr_schedule,
            weight_decay,
            device,
            seed,
            ref load_checkpoint,
        } = *training;
        ensure!(weight_decay >= 0.0, "weight_decay must be non-negative");

        // validate early
        LrScheduler::new(lr_schedule)?;

        Ok(Self {
            epochs,
            batch_size: batch_size.get(),
            accumulation_steps: accumulation_steps.get(),
            lr_schedule: lr_schedule.clone(),
            weight_decay: weight_decay.raw(),
            device,
            seed,
            load_checkpoint: load_checkpoint.clone(),
            checkpoint: checkpoint.clone(),
        })
    }

    pub fn device(&self) -> Device {
        self.device
    }

    /// Trains the parameters in `vs` through `model` and returns the curve and
    /// the last saved checkpoint.
    pub fn train<M, T, V>(
        &self,
        vs: &mut nn::VarStore,
        model: &M,
        train_set: &T,
        val_set: &V,
    ) -> Result<TrainingOutput>
    where
        M: ModuleT,
        T: RandomAccessDataset,
        V: RandomAccessDataset,
    {
        ensure!(train_set.num_samples() > 0, "the training set is empty");
        ensure!(val_set.num_samples() > 0, "the validation set is empty");

        if let Some(path) = &self.load_checkpoint {
            try_load_checkpoint(vs, path);
        }
        let vs: &nn::VarStore = vs;

        let primary_dir = self.checkpoint.primary_dir();
        let fallback_dir = self.checkpoint.fallback_dir();
        let loss_fn = BceWithLogitsLossInit::default(Reduction::Mean).build(&vs.root() / "loss");
        let mut lr_scheduler = LrScheduler::new(&self.lr_schedule)?;
        let mut optimizer = nn::Adam {
            beta1: ADAM_BETA1,
            beta2: ADAM_BETA2,
            wd: self.weight_decay,
        }
        .build(vs, lr_scheduler.lr())?;
        let mut rng = StdRng::seed_from_u64(self.seed);

        let mut best_val_loss = f64::INFINITY;
        let mut checkpoint = None;
        let mut curve = Vec::with_capacity(self.epochs);
        let since = Instant::now();

        info!(
            "start training for {} epochs on {} samples, validate on {} samples",
            self.epochs,
            train_set.num_samples(),
            val_set.num_samples()
        );

        for epoch in 1..=self.epochs {
            let lr = lr_scheduler.lr();

            optimizer.zero_grad();
            let train_loss = train_epoch(
                model,
                &loss_fn,
                Minibatches::shuffled(train_set, self.batch_size, &mut rng)?,
                self.accumulation_steps,
                self.device,
                || {
                    optimizer.step();
                    optimizer.zero_grad();
                },
            )?;
            let val_loss = validate_epoch(
                model,
                &loss_fn,
                Minibatches::sequential(val_set, self.batch_size)?,
                self.device,
            )?;

            curve.push(EpochLoss {
                epoch,
                train_loss,
                val_loss,
            });
            info!(
                "epoch: {}/{}\ttrain loss: {:.5}\tval loss: {:.5}\tlr: {:e}\telapsed: {:.1}s",
                epoch,
                self.epochs,
                train_loss,
                val_loss,
                lr,
                since.elapsed().as_secs_f64()
            );

            let next_lr = lr_scheduler.step(val_loss);
            optimizer.set_lr(next_lr);

            if val_loss < best_val_loss {
                best_val_loss = val_loss;
                let outcome =
                    save_checkpoint(vs, &primary_dir, &fallback_dir, &self.checkpoint.file_name);
                outcome.log("checkpoint");
                if let Some(path) = outcome.path() {
                    checkpoint = Some(path.to_owned());
                }
            }
        }

        if curve.is_empty() {
            warn!("no epoch was run, skip plotting the loss curve");
        } else {
            let outcome = save_with_fallback(
                &primary_dir,
                &fallback_dir,
                &self.checkpoint.plot_file_name,
                |path| plot_loss_curve(path, &curve),
            );
            outcome.log("loss curve");
        }

        info!(
            "finish training at {} with best validation loss {:.5}",
            Local::now().format("%Y-%m-%d %H:%M:%S"),
            best_val_loss
        );

        Ok(TrainingOutput { checkpoint, curve })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sunspot_dl::dataset::MemoryDataset;

    /// A batch-norm free model so that the loss decomposes over samples.
    fn pixel_model(vs: &nn::VarStore) -> nn::Conv2D {
        nn::conv2d(vs.root() / "pixel", 3, 1, 1, Default::default())
    }

    fn synthetic_dataset(seed: i64, len: usize) -> Result<MemoryDataset> {
        tch::manual_seed(seed);
        MemoryDataset::new((0..len).map(|_| {
            let image = Tensor::rand(&[3, 6, 6], (Kind::Float, Device::Cpu));
            let mask = image.mean_dim(&[0], true, Kind::Float).binarize(0.5);
            (image, mask)
        }))
    }

    fn run_one_epoch(
        vs: &nn::VarStore,
        model: &nn::Conv2D,
        dataset: &MemoryDataset,
        batch_size: usize,
        accumulation_steps: usize,
    ) -> Result<f64> {
        let loss_fn = BceWithLogitsLossInit::default(Reduction::Mean).build(&vs.root() / "loss");
        let mut optimizer = nn::Sgd::default().build(vs, 0.5)?;
        optimizer.zero_grad();
        let loss = train_epoch(
            model,
            &loss_fn,
            Minibatches::sequential(dataset, batch_size)?,
            accumulation_steps,
            Device::Cpu,
            || {
                optimizer.step();
                optimizer.zero_grad();
            },
        )?;
        Ok(loss)
    }

    #[test]
    fn gradient_accumulation_matches_full_batch() -> Result<()> {
        let dataset = synthetic_dataset(3, 4)?;

        let full_vs = nn::VarStore::new(Device::Cpu);
        let full_model = pixel_model(&full_vs);
        let mut split_vs = nn::VarStore::new(Device::Cpu);
        let split_model = pixel_model(&split_vs);
        split_vs.copy(&full_vs)?;

        let full_loss = run_one_epoch(&full_vs, &full_model, &dataset, 4, 1)?;
        let split_loss = run_one_epoch(&split_vs, &split_model, &dataset, 2, 2)?;
        assert_abs_diff_eq!(full_loss, split_loss, epsilon = 1e-5);

        let full = full_vs.variables();
        let split = split_vs.variables();
        for (name, full_var) in &full {
            let diff = f64::from((full_var - &split[name]).abs().max());
            assert!(diff < 1e-5, "{} differs by {}", name, diff);
        }
        Ok(())
    }

    #[test]
    fn updates_happen_every_n_minibatches_and_at_epoch_end() -> Result<()> {
        let dataset = synthetic_dataset(5, 5)?;
        let vs = nn::VarStore::new(Device::Cpu);
        let model = pixel_model(&vs);
        let loss_fn = BceWithLogitsLossInit::default(Reduction::Mean).build(&vs.root() / "loss");

        let mut num_updates = 0;
        train_epoch(
            &model,
            &loss_fn,
            Minibatches::sequential(&dataset, 1)?,
            2,
            Device::Cpu,
            || num_updates += 1,
        )?;
        assert_eq!(num_updates, 3);
        Ok(())
    }

    #[test]
    fn validation_does_not_touch_gradients() -> Result<()> {
        let dataset = synthetic_dataset(7, 3)?;
        let vs = nn::VarStore::new(Device::Cpu);
        let model = pixel_model(&vs);
        let loss_fn = BceWithLogitsLossInit::default(Reduction::Mean).build(&vs.root() / "loss");

        let loss = validate_epoch(
            &model,
            &loss_fn,
            Minibatches::sequential(&dataset, 2)?,
            Device::Cpu,
        )?;
        assert!(loss.is_finite() && loss > 0.0);
        for var in vs.trainable_variables() {
            assert!(!var.grad().defined());
        }
        Ok(())
    }
}
