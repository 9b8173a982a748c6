//! Reusable network layers built on top of [tch].

mod common;

pub mod bce_with_logits_loss;
pub mod concat_2d;
pub mod conv_bn_2d;
pub mod double_conv_2d;
pub mod up_conv_2d;

pub use bce_with_logits_loss::*;
pub use concat_2d::*;
pub use conv_bn_2d::*;
pub use double_conv_2d::*;
pub use up_conv_2d::*;
