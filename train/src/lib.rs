//! The training program of the sunspot segmentation model.

pub mod common;
pub mod config;
pub mod evaluator;
pub mod trainer;
pub mod utils;

use crate::{
    common::*,
    config::Config,
    evaluator::Evaluator,
    trainer::{Trainer, TrainingOutput},
};

/// The training, validation and test sample providers.
#[derive(Debug, Clone)]
pub struct Datasets {
    pub train: SampleProvider,
    pub validation: SampleProvider,
    pub test: SampleProvider,
}

impl Datasets {
    /// Scans `train/` and `test/` under the dataset root and holds out the
    /// validation set from `train/`.
    pub fn load(config: &Config) -> Result<Self> {
        let preprocessor = Preprocessor::new(&config.preprocess)?;
        let labeler = PseudoLabeler::new(&config.pseudo_label)?;
        let provider =
            |manifest| SampleProvider::new(manifest, preprocessor.clone(), labeler.clone());

        let dataset = &config.dataset;
        let (train, validation) = Manifest::scan(dataset.train_dir())?
            .split(dataset.validation_ratio, dataset.split_seed);
        let test = Manifest::scan(dataset.test_dir())?;
        info!(
            "loaded {} training, {} validation and {} test images",
            train.len(),
            validation.len(),
            test.len()
        );

        Ok(Self {
            train: provider(train),
            validation: provider(validation),
            test: provider(test),
        })
    }
}

fn diagnostic_sink(config: &Config) -> Result<Box<dyn DiagnosticSink>> {
    let sink: Box<dyn DiagnosticSink> = match &config.evaluation.diagnostics_dir {
        Some(dir) => Box::new(DirectorySink::new(dir)?),
        None => Box::new(NullSink),
    };
    Ok(sink)
}

/// The entry of training program. Trains, then evaluates the best checkpoint on the test set.
pub fn start(config: &Config) -> Result<PixelMetricsOutput> {
    let datasets = Datasets::load(config)?;
    let trainer = Trainer::new(&config.training, &config.checkpoint)?;

    let mut vs = nn::VarStore::new(trainer.device());
    let model = config.model.clone().build(&vs.root())?;

    let TrainingOutput { checkpoint, .. } =
        trainer.train(&mut vs, &model, &datasets.train, &datasets.validation)?;
    let checkpoint = checkpoint.unwrap_or_else(|| {
        warn!("no checkpoint was saved during training");
        config.checkpoint.checkpoint_file()
    });

    let evaluator = Evaluator::new(&config.evaluation, trainer.device());
    let mut sink = diagnostic_sink(config)?;
    evaluator.load_and_evaluate(&mut vs, &checkpoint, &model, &datasets.test, &mut *sink)
}

/// Evaluates the configured checkpoint on the test set without training.
pub fn evaluate_only(config: &Config) -> Result<PixelMetricsOutput> {
    let datasets = Datasets::load(config)?;
    let device = config.training.device;

    let mut vs = nn::VarStore::new(device);
    let model = config.model.clone().build(&vs.root())?;

    let checkpoint = config.checkpoint.checkpoint_file();
    let evaluator = Evaluator::new(&config.evaluation, device);
    let mut sink = diagnostic_sink(config)?;
    evaluator.load_and_evaluate(&mut vs, &checkpoint, &model, &datasets.test, &mut *sink)
}
