//! Training program configuration format.

use crate::common::*;

pub use checkpoint::*;
pub use dataset::*;
pub use evaluation::*;
pub use training::*;

pub static CONFIG_VERSION: Lazy<VersionReq> = Lazy::new(|| VersionReq::parse("^0.1").unwrap());

/// The main training configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(deserialize_with = "deserialize_version")]
    pub version: Version,
    pub dataset: DatasetConfig,
    #[serde(default)]
    pub preprocess: PreprocessConfig,
    #[serde(default)]
    pub pseudo_label: PseudoLabelConfig,
    #[serde(default)]
    pub model: UNetInit,
    pub training: TrainingConfig,
    #[serde(default)]
    pub checkpoint: CheckpointConfig,
    #[serde(default)]
    pub evaluation: EvaluationConfig,
}

impl Config {
    pub fn open<P>(path: P) -> Result<Self>
    where
        P: AsRef<Path>,
    {
        let text = fs::read_to_string(path)?;
        let config = json5::from_str(&text)?;
        Ok(config)
    }
}

mod dataset {
    use super::*;

    /// The dataset root holding `train/` and `test/` image directories.
    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct DatasetConfig {
        pub dir: PathBuf,
        /// The fraction of `train/` held out for validation.
        #[serde(default = "default_validation_ratio")]
        pub validation_ratio: Ratio,
        #[serde(default)]
        pub split_seed: u64,
    }

    impl DatasetConfig {
        pub fn train_dir(&self) -> PathBuf {
            self.dir.join("train")
        }

        pub fn test_dir(&self) -> PathBuf {
            self.dir.join("test")
        }
    }

    fn default_validation_ratio() -> Ratio {
        Ratio::try_from(0.2).unwrap()
    }
}

mod training {
    use super::*;

    /// Training options.
    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct TrainingConfig {
        pub epochs: usize,
        pub batch_size: NonZeroUsize,
        /// The number of minibatches whose gradients are summed before each optimizer step.
        #[serde(default = "default_accumulation_steps")]
        pub accumulation_steps: NonZeroUsize,
        pub lr_schedule: LearningRateSchedule,
        #[serde(default = "default_weight_decay")]
        pub weight_decay: R64,
        #[serde(with = "tch_serde::serde_device", default = "default_device")]
        pub device: Device,
        #[serde(default)]
        pub seed: u64,
        /// Optional checkpoint file loaded before training.
        #[serde(default)]
        pub load_checkpoint: Option<PathBuf>,
    }

    /// Learning rate scheduling strategies.
    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    #[serde(tag = "type")]
    pub enum LearningRateSchedule {
        /// Use constant learning rate.
        Constant { lr: R64 },
        /// Reduce the learning rate when the validation loss stops improving.
        Plateau {
            lr: R64,
            #[serde(default = "default_plateau_factor")]
            factor: R64,
            #[serde(default = "default_plateau_patience")]
            patience: usize,
            /// Relative improvement required to reset the patience counter.
            #[serde(default = "default_plateau_threshold")]
            threshold: R64,
            #[serde(default = "default_min_lr")]
            min_lr: R64,
        },
    }

    fn default_accumulation_steps() -> NonZeroUsize {
        NonZeroUsize::new(1).unwrap()
    }

    fn default_weight_decay() -> R64 {
        r64(1e-5)
    }

    fn default_device() -> Device {
        Device::Cpu
    }

    fn default_plateau_factor() -> R64 {
        r64(0.5)
    }

    fn default_plateau_patience() -> usize {
        3
    }

    fn default_plateau_threshold() -> R64 {
        r64(1e-4)
    }

    fn default_min_lr() -> R64 {
        r64(0.0)
    }
}

mod checkpoint {
    use super::*;

    /// Where the checkpoint and the loss curve are written.
    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct CheckpointConfig {
        /// Defaults to `$HOME/saved_models`.
        #[serde(default)]
        pub dir: Option<PathBuf>,
        /// Used when writing into `dir` fails. Defaults to the working directory.
        #[serde(default)]
        pub fallback_dir: Option<PathBuf>,
        #[serde(default = "default_checkpoint_file_name")]
        pub file_name: String,
        #[serde(default = "default_plot_file_name")]
        pub plot_file_name: String,
    }

    impl Default for CheckpointConfig {
        fn default() -> Self {
            Self {
                dir: None,
                fallback_dir: None,
                file_name: default_checkpoint_file_name(),
                plot_file_name: default_plot_file_name(),
            }
        }
    }

    impl CheckpointConfig {
        pub fn primary_dir(&self) -> PathBuf {
            match &self.dir {
                Some(dir) => dir.clone(),
                None => env::var_os("HOME")
                    .map(PathBuf::from)
                    .unwrap_or_default()
                    .join("saved_models"),
            }
        }

        pub fn fallback_dir(&self) -> PathBuf {
            match &self.fallback_dir {
                Some(dir) => dir.clone(),
                None => env::current_dir().unwrap_or_default(),
            }
        }

        pub fn checkpoint_file(&self) -> PathBuf {
            self.primary_dir().join(&self.file_name)
        }
    }

    fn default_checkpoint_file_name() -> String {
        "unet_sunspot.ot".into()
    }

    fn default_plot_file_name() -> String {
        "loss_curve.png".into()
    }
}

mod evaluation {
    use super::*;

    /// Test set evaluation options.
    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct EvaluationConfig {
        /// Pixels with probability above the threshold are foreground.
        #[serde(default = "default_threshold")]
        pub threshold: Ratio,
        #[serde(default = "default_batch_size")]
        pub batch_size: NonZeroUsize,
        /// The number of randomly drawn samples rendered for inspection.
        #[serde(default = "default_num_diagnostics")]
        pub num_diagnostics: usize,
        /// Diagnostics are disabled when unset.
        #[serde(default)]
        pub diagnostics_dir: Option<PathBuf>,
        #[serde(default)]
        pub seed: u64,
    }

    impl Default for EvaluationConfig {
        fn default() -> Self {
            Self {
                threshold: default_threshold(),
                batch_size: default_batch_size(),
                num_diagnostics: default_num_diagnostics(),
                diagnostics_dir: None,
                seed: 0,
            }
        }
    }

    fn default_threshold() -> Ratio {
        Ratio::try_from(0.5).unwrap()
    }

    fn default_batch_size() -> NonZeroUsize {
        NonZeroUsize::new(4).unwrap()
    }

    fn default_num_diagnostics() -> usize {
        3
    }
}

pub fn deserialize_version<'de, D>(deserializer: D) -> Result<Version, D::Error>
where
    D: Deserializer<'de>,
{
    let text = String::deserialize(deserializer)?;
    let version = Version::parse(&text).map_err(|err| {
        D::Error::custom(format!(
            "failed to parse version number '{}': {:?}",
            text, err
        ))
    })?;

    if !CONFIG_VERSION.matches(&version) {
        return Err(D::Error::custom(format!(
            "incompatible version: get '{}', but it is incompatible with requirement '{}'",
            version, &*CONFIG_VERSION,
        )));
    }

    Ok(version)
}
