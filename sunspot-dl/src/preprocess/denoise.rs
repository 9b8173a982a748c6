use crate::common::*;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DenoiseConfig {
    #[serde(default = "default_kernel_size")]
    pub kernel_size: usize,
}

impl Default for DenoiseConfig {
    fn default() -> Self {
        Self {
            kernel_size: default_kernel_size(),
        }
    }
}

fn default_kernel_size() -> usize {
    3
}

/// Isotropic Gaussian smoothing with the sigma derived from the kernel size.
#[derive(Debug, Clone)]
pub struct NoiseSuppressor {
    kernel_size: i32,
}

impl NoiseSuppressor {
    pub fn new(config: &DenoiseConfig) -> Result<Self> {
        let DenoiseConfig { kernel_size } = *config;
        ensure!(
            kernel_size > 0 && kernel_size % 2 == 1,
            "kernel_size must be odd and positive, but get {}",
            kernel_size
        );
        Ok(Self {
            kernel_size: kernel_size as i32,
        })
    }

    pub fn suppress(&self, image: &Mat) -> Result<Mat> {
        let mut output = Mat::default();
        imgproc::gaussian_blur(
            image,
            &mut output,
            Size::new(self.kernel_size, self.kernel_size),
            0.0,
            0.0,
            cv_core::BORDER_DEFAULT,
        )?;
        Ok(output)
    }
}
