use super::RandomAccessDataset;
use crate::common::*;

/// Samples stacked along a leading batch dimension.
#[derive(Debug)]
pub struct Minibatch {
    pub indexes: Vec<usize>,
    /// `[B, 3, H, W]` float images.
    pub images: Tensor,
    /// `[B, 1, H, W]` float masks in {0, 1}.
    pub masks: Tensor,
}

impl Minibatch {
    pub fn to_device(&self, device: Device) -> Self {
        Self {
            indexes: self.indexes.clone(),
            images: self.images.to_device(device),
            masks: self.masks.to_device(device),
        }
    }
}

/// Iterates over a dataset in minibatches. The final minibatch may be smaller.
#[derive(Debug)]
pub struct Minibatches<'a, D>
where
    D: RandomAccessDataset,
{
    dataset: &'a D,
    order: Vec<usize>,
    batch_size: usize,
    cursor: usize,
}

impl<'a, D> Minibatches<'a, D>
where
    D: RandomAccessDataset,
{
    /// Visits the samples in index order.
    pub fn sequential(dataset: &'a D, batch_size: usize) -> Result<Self> {
        ensure!(batch_size > 0, "batch_size must be positive");
        Ok(Self {
            dataset,
            order: (0..dataset.num_samples()).collect(),
            batch_size,
            cursor: 0,
        })
    }

    /// Visits the samples in an order drawn from `rng`.
    pub fn shuffled(dataset: &'a D, batch_size: usize, rng: &mut StdRng) -> Result<Self> {
        let mut batches = Self::sequential(dataset, batch_size)?;
        batches.order.shuffle(rng);
        Ok(batches)
    }

    pub fn num_batches(&self) -> usize {
        (self.order.len() + self.batch_size - 1) / self.batch_size
    }

    fn load(&self, indexes: &[usize]) -> Result<Minibatch> {
        let samples: Vec<_> = indexes
            .iter()
            .map(|&index| self.dataset.nth(index))
            .try_collect()?;
        let images: Vec<_> = samples.iter().map(|sample| &sample.image).collect();
        let masks: Vec<_> = samples.iter().map(|sample| &sample.mask).collect();

        Ok(Minibatch {
            indexes: indexes.to_vec(),
            images: Tensor::f_stack(&images, 0)?,
            masks: Tensor::f_stack(&masks, 0)?,
        })
    }
}

impl<'a, D> Iterator for Minibatches<'a, D>
where
    D: RandomAccessDataset,
{
    type Item = Result<Minibatch>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.cursor >= self.order.len() {
            return None;
        }
        let end = (self.cursor + self.batch_size).min(self.order.len());
        let indexes = self.order[self.cursor..end].to_vec();
        self.cursor = end;
        Some(self.load(&indexes))
    }
}
