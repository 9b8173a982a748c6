//! Deterministic image preprocessing applied at training and inference time.

mod contrast;
mod denoise;
mod radiometric;

pub use contrast::*;
pub use denoise::*;
pub use radiometric::*;

use crate::common::*;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreprocessConfig {
    /// Images are resized to `image_size`×`image_size` before any other step.
    #[serde(default = "default_image_size")]
    pub image_size: usize,
    #[serde(default)]
    pub limb_darkening: LimbDarkeningConfig,
    #[serde(default)]
    pub contrast: ContrastConfig,
    #[serde(default)]
    pub denoise: DenoiseConfig,
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self {
            image_size: default_image_size(),
            limb_darkening: Default::default(),
            contrast: Default::default(),
            denoise: Default::default(),
        }
    }
}

fn default_image_size() -> usize {
    224
}

/// Composes resizing, limb-darkening correction, contrast enhancement and
/// noise suppression.
#[derive(Debug, Clone)]
pub struct Preprocessor {
    image_size: i32,
    corrector: RadiometricCorrector,
    enhancer: ContrastEnhancer,
    suppressor: NoiseSuppressor,
}

impl Preprocessor {
    pub fn new(config: &PreprocessConfig) -> Result<Self> {
        let PreprocessConfig {
            image_size,
            ref limb_darkening,
            ref contrast,
            ref denoise,
        } = *config;
        ensure!(image_size > 0, "image_size must be positive");

        Ok(Self {
            image_size: image_size as i32,
            corrector: RadiometricCorrector::new(limb_darkening)?,
            enhancer: ContrastEnhancer::new(contrast)?,
            suppressor: NoiseSuppressor::new(denoise)?,
        })
    }

    pub fn image_size(&self) -> usize {
        self.image_size as usize
    }

    /// Decodes an image file, resizes it and converts it to RGB order.
    pub fn load<P>(&self, path: P) -> Result<Mat>
    where
        P: AsRef<Path>,
    {
        let path = path.as_ref();
        let path_str = path
            .to_str()
            .ok_or_else(|| format_err!("non-UTF-8 path {}", path.display()))?;
        let bgr = imgcodecs::imread(path_str, imgcodecs::IMREAD_COLOR)
            .with_context(|| format!("failed to read image file {}", path.display()))?;
        ensure!(
            !bgr.empty()?,
            "failed to decode image file {}",
            path.display()
        );

        let mut resized = Mat::default();
        imgproc::resize(
            &bgr,
            &mut resized,
            Size::new(self.image_size, self.image_size),
            0.0,
            0.0,
            imgproc::INTER_LINEAR,
        )?;

        let mut rgb = Mat::default();
        imgproc::cvt_color(&resized, &mut rgb, imgproc::COLOR_BGR2RGB, 0)?;
        Ok(rgb)
    }

    /// Runs the correction, enhancement and smoothing steps on an RGB image.
    pub fn process(&self, rgb: &Mat) -> Result<Mat> {
        let corrected = self.corrector.correct(rgb)?;
        let enhanced = self.enhancer.enhance(&corrected)?;
        self.suppressor.suppress(&enhanced)
    }

    pub fn load_and_process<P>(&self, path: P) -> Result<Mat>
    where
        P: AsRef<Path>,
    {
        let rgb = self.load(path)?;
        self.process(&rgb)
    }
}

/// Converts an 8-bit RGB image into a `[3, H, W]` float tensor in `[0, 1]`.
pub fn image_to_tensor(image: &Mat) -> Result<Tensor> {
    ensure!(
        image.typ()? == cv_core::CV_8UC3,
        "expect an 8-bit three-channel image"
    );
    let tensor = image.f_to_tensor()?.f_to_kind(Kind::Float)? / 255.0;
    Ok(tensor)
}

/// Converts an 8-bit {0, 255} mask into a `[1, H, W]` float tensor in {0, 1}.
pub fn mask_to_tensor(mask: &Mat) -> Result<Tensor> {
    ensure!(
        mask.typ()? == cv_core::CV_8UC1,
        "expect an 8-bit single-channel mask"
    );
    mask.f_to_tensor()?.f_binarize(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn corrupt_file_error_mentions_path() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("corrupt.png");
        fs::write(&path, b"definitely not a png")?;

        let preprocessor = Preprocessor::new(&Default::default())?;
        let err = preprocessor.load_and_process(&path).unwrap_err();
        assert!(format!("{:#}", err).contains("corrupt.png"));
        Ok(())
    }

    #[test]
    fn loaded_image_is_resized_rgb() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("red.png");

        // OpenCV writes BGR, so blue in storage order is red after loading
        let bgr = Mat::new_rows_cols_with_default(
            40,
            60,
            cv_core::CV_8UC3,
            Scalar::new(0.0, 0.0, 255.0, 0.0),
        )?;
        imgcodecs::imwrite(
            path.to_str().unwrap(),
            &bgr,
            &cv_core::Vector::<i32>::new(),
        )?;

        let preprocessor = Preprocessor::new(&PreprocessConfig {
            image_size: 32,
            ..Default::default()
        })?;
        let rgb = preprocessor.load(&path)?;
        assert_eq!((rgb.rows(), rgb.cols()), (32, 32));
        assert_eq!(*rgb.at_2d::<Vec3b>(10, 10)?, Vec3b::from([255, 0, 0]));

        let processed = preprocessor.process(&rgb)?;
        assert_eq!(processed.typ()?, cv_core::CV_8UC3);
        assert_eq!((processed.rows(), processed.cols()), (32, 32));

        let tensor = image_to_tensor(&processed)?;
        assert_eq!(tensor.size(), vec![3, 32, 32]);
        assert_eq!(tensor.kind(), Kind::Float);
        assert!(f64::from(tensor.max()) <= 1.0);
        assert!(f64::from(tensor.min()) >= 0.0);
        Ok(())
    }
}
