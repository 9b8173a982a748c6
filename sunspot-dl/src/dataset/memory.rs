use super::{RandomAccessDataset, Sample};
use crate::common::*;

/// Samples held in memory.
#[derive(Debug)]
pub struct MemoryDataset {
    samples: Vec<Sample>,
}

impl MemoryDataset {
    /// Builds a dataset from `(image, mask)` pairs, indexed in order.
    pub fn new<I>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (Tensor, Tensor)>,
    {
        let samples: Vec<_> = pairs
            .into_iter()
            .enumerate()
            .map(|(index, (image, mask))| -> Result<_> {
                let (_, image_h, image_w) = image.size3()?;
                let (mask_c, mask_h, mask_w) = mask.size3()?;
                ensure!(
                    mask_c == 1 && (image_h, image_w) == (mask_h, mask_w),
                    "mask shape {:?} does not align with image shape {:?}",
                    mask.size(),
                    image.size()
                );
                Ok(Sample { index, image, mask })
            })
            .try_collect()?;
        Ok(Self { samples })
    }
}

impl RandomAccessDataset for MemoryDataset {
    fn num_samples(&self) -> usize {
        self.samples.len()
    }

    fn nth(&self, index: usize) -> Result<Sample> {
        let sample = self
            .samples
            .get(index)
            .ok_or_else(|| format_err!("index {} is out of range", index))?;
        Ok(sample.shallow_clone())
    }
}
