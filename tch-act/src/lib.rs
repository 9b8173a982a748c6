//! Activation functions applied by layer modules.

#[cfg(feature = "tch")]
pub use impls::*;
#[cfg(feature = "tch")]
mod impls;

#[cfg(feature = "tch")]
pub use r#trait::*;
#[cfg(feature = "tch")]
mod r#trait;

/// The nonlinearity following a convolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Activation {
    Linear,
    Relu,
    /// Leaky rectifier with negative slope 0.01.
    LeakyRelu,
    Elu,
    Logistic,
}

impl Default for Activation {
    fn default() -> Self {
        Self::Relu
    }
}
