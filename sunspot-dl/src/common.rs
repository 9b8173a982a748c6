pub use anyhow::{bail, ensure, format_err, Context as _, Error, Result};
pub use approx::{abs_diff_eq, assert_abs_diff_eq};
pub use indexmap::IndexMap;
pub use itertools::Itertools as _;
pub use log::{debug, info, warn};
pub use noisy_float::prelude::*;
pub use opencv::{
    core::{self as cv_core, Mat, Point, Scalar, Size, Vec3b},
    imgcodecs, imgproc,
    prelude::*,
};
pub use rand::{rngs::StdRng, seq::SliceRandom as _, Rng as _, SeedableRng as _};
pub use serde::{Deserialize, Serialize};
pub use std::{
    borrow::Borrow,
    fmt::{self, Debug, Display},
    fs,
    path::{Path, PathBuf},
};
pub use tch::{
    nn::{self, Module as _, ModuleT as _},
    Device, Kind, Tensor,
};
pub use tch_goodies::{MatExt as _, Ratio, TensorExt as _, TensorToMat as _};
