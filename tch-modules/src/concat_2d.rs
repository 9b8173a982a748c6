use crate::common::*;

/// Joins a skip connection with an upsampled feature map along the channel axis.
///
/// The upsampled map is bilinearly resampled to the skip connection's
/// spatial size when the two disagree, which happens for odd input sizes.
#[derive(Debug, Clone, Copy, Default)]
pub struct Concat2D {
    _private: [u8; 0],
}

impl Concat2D {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn f_forward(&self, skip: &Tensor, upsampled: &Tensor) -> Result<Tensor> {
        let (skip_b, _skip_c, skip_h, skip_w) = skip.size4()?;
        let (up_b, _up_c, up_h, up_w) = upsampled.size4()?;
        ensure!(
            skip_b == up_b,
            "batch sizes mismatch: {} != {}",
            skip_b,
            up_b
        );

        let upsampled = if (skip_h, skip_w) != (up_h, up_w) {
            debug!(
                "resample feature map from {}x{} to {}x{}",
                up_h, up_w, skip_h, skip_w
            );
            upsampled.f_upsample_bilinear2d(&[skip_h, skip_w], false, None, None)?
        } else {
            upsampled.shallow_clone()
        };

        Ok(Tensor::f_cat(&[skip, &upsampled], 1)?)
    }

    pub fn forward(&self, skip: &Tensor, upsampled: &Tensor) -> Tensor {
        self.f_forward(skip, upsampled).unwrap()
    }
}
