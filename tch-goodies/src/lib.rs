mod common;
#[cfg(feature = "opencv")]
pub mod mat;
pub mod ratio;
pub mod tensor;

#[cfg(feature = "opencv")]
pub use mat::*;
pub use ratio::*;
pub use tensor::*;
