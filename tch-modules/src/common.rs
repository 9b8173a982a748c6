pub use anyhow::{bail, ensure, format_err, Error, Result};
pub use log::debug;
pub use std::borrow::Borrow;
pub use tch::{
    nn::{self, ModuleT as _},
    Device, Kind, Reduction, Tensor,
};
pub use tch_act::{Activation, TensorActivationExt as _};
pub use tch_goodies::TensorExt as _;
