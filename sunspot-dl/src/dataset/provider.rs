use super::{Manifest, RandomAccessDataset, Sample};
use crate::{
    common::*,
    label::PseudoLabeler,
    preprocess::{image_to_tensor, mask_to_tensor, Preprocessor},
};

/// Synthesizes (image, pseudo-label) samples from the files of a manifest.
///
/// Every access decodes and preprocesses the file again, so `get(i)` is a pure
/// function of the file content and the configuration.
#[derive(Debug, Clone)]
pub struct SampleProvider {
    manifest: Manifest,
    preprocessor: Preprocessor,
    labeler: PseudoLabeler,
}

impl SampleProvider {
    pub fn new(manifest: Manifest, preprocessor: Preprocessor, labeler: PseudoLabeler) -> Self {
        Self {
            manifest,
            preprocessor,
            labeler,
        }
    }

    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    pub fn len(&self) -> usize {
        self.manifest.len()
    }

    pub fn is_empty(&self) -> bool {
        self.manifest.is_empty()
    }

    pub fn get(&self, index: usize) -> Result<Sample> {
        let path = self.manifest.get(index).ok_or_else(|| {
            format_err!(
                "index {} is out of range for {} samples",
                index,
                self.manifest.len()
            )
        })?;

        let image = self.preprocessor.load_and_process(path)?;
        let mask = self
            .labeler
            .label(&image)
            .with_context(|| format!("failed to label {}", path.display()))?;

        Ok(Sample {
            index,
            image: image_to_tensor(&image)?,
            mask: mask_to_tensor(&mask)?,
        })
    }
}

impl RandomAccessDataset for SampleProvider {
    fn num_samples(&self) -> usize {
        self.len()
    }

    fn nth(&self, index: usize) -> Result<Sample> {
        self.get(index)
    }
}
