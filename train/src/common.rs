//! Common imports from external crates.

pub use anyhow::{bail, ensure, format_err, Context, Error, Result};
pub use approx::{abs_diff_eq, assert_abs_diff_eq};
pub use chrono::Local;
pub use itertools::Itertools;
pub use log::{debug, info, warn};
pub use noisy_float::prelude::*;
pub use once_cell::sync::Lazy;
pub use rand::{rngs::StdRng, seq::IteratorRandom, Rng, SeedableRng};
pub use semver::{Version, VersionReq};
pub use serde::{de::Error as DeserializeError, Deserialize, Deserializer, Serialize};
pub use std::{
    borrow::Borrow,
    env,
    fmt::{self, Debug, Display},
    fs,
    num::NonZeroUsize,
    path::{Path, PathBuf},
    time::{Duration, Instant},
};
pub use sunspot_dl::{
    dataset::{Manifest, Minibatch, Minibatches, RandomAccessDataset, SampleProvider},
    diagnostic::{DiagnosticSink, DirectorySink, NullSink},
    label::{PseudoLabelConfig, PseudoLabeler},
    metrics::{PixelMetrics, PixelMetricsOutput},
    model::{UNet, UNetInit},
    preprocess::{PreprocessConfig, Preprocessor},
};
pub use tch::{
    nn::{self, ModuleT, OptimizerConfig as _},
    Device, Kind, Reduction, Tensor,
};
pub use tch_goodies::{Ratio, TensorExt as _};
pub use tch_modules::{BceWithLogitsLoss, BceWithLogitsLossInit};
