//! Dataset enumeration, sample synthesis and minibatching.

mod batch;
mod manifest;
mod memory;
mod provider;

pub use batch::*;
pub use manifest::*;
pub use memory::*;
pub use provider::*;

use crate::common::*;

/// An (image, mask) pair.
///
/// The image is a `[3, H, W]` float tensor in `[0, 1]` and the mask a
/// `[1, H, W]` float tensor in {0, 1}.
#[derive(Debug)]
pub struct Sample {
    pub index: usize,
    pub image: Tensor,
    pub mask: Tensor,
}

impl Sample {
    pub fn shallow_clone(&self) -> Self {
        Self {
            index: self.index,
            image: self.image.shallow_clone(),
            mask: self.mask.shallow_clone(),
        }
    }
}

/// The dataset that can be random accessed.
pub trait RandomAccessDataset
where
    Self: Debug,
{
    /// Get number of samples in the dataset.
    fn num_samples(&self) -> usize;

    /// Get the nth sample in the dataset.
    fn nth(&self, index: usize) -> Result<Sample>;
}
