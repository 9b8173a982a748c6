pub use anyhow::{bail, ensure, format_err, Error, Result};
pub use approx::AbsDiffEq;
pub use noisy_float::prelude::*;
pub use serde::{de::Error as _, Deserialize, Deserializer, Serialize, Serializer};
pub use std::{
    convert::TryFrom,
    fmt::{self, Display, Formatter},
};
pub use tch::{Device, Kind, Tensor};
