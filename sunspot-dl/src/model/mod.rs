//! Segmentation network definitions.

mod unet;

pub use unet::*;
