pub use anyhow::{ensure, format_err, Context, Error, Result};
pub use log::{info, warn};
pub use noisy_float::prelude::*;
pub use once_cell::sync::Lazy;
pub use semver::{Version, VersionReq};
pub use serde::{de::Error as DeserializeError, Deserialize, Deserializer, Serialize};
pub use std::{
    fmt::{self, Display},
    fs,
    path::{Path, PathBuf},
};
pub use sunspot_dl::{
    diagnostic::{DiagnosticSink, DirectorySink, NullSink},
    model::{UNet, UNetInit},
    preprocess::{image_to_tensor, PreprocessConfig, Preprocessor},
};
pub use tch::{
    nn::{self, ModuleT},
    Device, Tensor,
};
pub use tch_goodies::{Ratio, TensorExt as _};
