use crate::common::*;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContrastConfig {
    #[serde(default = "default_clip_limit")]
    pub clip_limit: R64,
    #[serde(default = "default_tile_grid_size")]
    pub tile_grid_size: usize,
}

impl Default for ContrastConfig {
    fn default() -> Self {
        Self {
            clip_limit: default_clip_limit(),
            tile_grid_size: default_tile_grid_size(),
        }
    }
}

fn default_clip_limit() -> R64 {
    r64(2.0)
}

fn default_tile_grid_size() -> usize {
    8
}

/// Converts an 8-bit RGB image into the 8-bit CIE L*a*b* color space.
pub fn rgb_to_lab(image: &Mat) -> Result<Mat> {
    let mut lab = Mat::default();
    imgproc::cvt_color(image, &mut lab, imgproc::COLOR_RGB2Lab, 0)?;
    Ok(lab)
}

/// Converts an 8-bit CIE L*a*b* image back to RGB.
pub fn lab_to_rgb(image: &Mat) -> Result<Mat> {
    let mut rgb = Mat::default();
    imgproc::cvt_color(image, &mut rgb, imgproc::COLOR_Lab2RGB, 0)?;
    Ok(rgb)
}

/// Adaptive histogram equalization on the luminance channel only.
#[derive(Debug, Clone)]
pub struct ContrastEnhancer {
    clip_limit: f64,
    tile_grid_size: i32,
}

impl ContrastEnhancer {
    pub fn new(config: &ContrastConfig) -> Result<Self> {
        let ContrastConfig {
            clip_limit,
            tile_grid_size,
        } = *config;
        ensure!(clip_limit > 0.0, "clip_limit must be positive");
        ensure!(tile_grid_size > 0, "tile_grid_size must be positive");

        Ok(Self {
            clip_limit: clip_limit.raw(),
            tile_grid_size: tile_grid_size as i32,
        })
    }

    /// Equalizes the L channel of a L*a*b* image and leaves a* and b* untouched.
    pub fn equalize_luminance(&self, lab: &Mat) -> Result<Mat> {
        ensure!(
            lab.typ()? == cv_core::CV_8UC3,
            "expect an 8-bit three-channel image"
        );

        let mut luminance = Mat::default();
        cv_core::extract_channel(lab, &mut luminance, 0)?;

        let mut clahe = imgproc::create_clahe(
            self.clip_limit,
            Size::new(self.tile_grid_size, self.tile_grid_size),
        )?;
        let mut equalized = Mat::default();
        clahe.apply(&luminance, &mut equalized)?;

        let mut output = lab.try_clone()?;
        cv_core::insert_channel(&equalized, &mut output, 0)?;
        Ok(output)
    }

    pub fn enhance(&self, image: &Mat) -> Result<Mat> {
        let lab = rgb_to_lab(image)?;
        let lab = self.equalize_luminance(&lab)?;
        lab_to_rgb(&lab)
    }
}
