//! Pseudo-label generation from preprocessed images.
//!
//! Sunspots are darker than the surrounding photosphere. The generator
//! inverts the grayscale image so that they become bright, stretches it to
//! the full intensity range, binarizes it with Otsu's method and keeps the
//! connected components that survive a morphological opening and a minimum
//! area filter.

use crate::common::*;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PseudoLabelConfig {
    #[serde(default = "default_kernel_size")]
    pub kernel_size: usize,
    #[serde(default = "default_iterations")]
    pub iterations: usize,
    #[serde(default = "default_min_area")]
    pub min_area: usize,
}

impl Default for PseudoLabelConfig {
    fn default() -> Self {
        Self {
            kernel_size: default_kernel_size(),
            iterations: default_iterations(),
            min_area: default_min_area(),
        }
    }
}

fn default_kernel_size() -> usize {
    3
}

fn default_iterations() -> usize {
    1
}

fn default_min_area() -> usize {
    20
}

#[derive(Debug, Clone)]
pub struct PseudoLabeler {
    kernel_size: i32,
    iterations: i32,
    min_area: i32,
}

impl PseudoLabeler {
    pub fn new(config: &PseudoLabelConfig) -> Result<Self> {
        let PseudoLabelConfig {
            kernel_size,
            iterations,
            min_area,
        } = *config;
        ensure!(kernel_size > 0, "kernel_size must be positive");

        Ok(Self {
            kernel_size: kernel_size as i32,
            iterations: iterations as i32,
            min_area: min_area as i32,
        })
    }

    /// Produces a `CV_8UC1` mask with foreground 255 and background 0.
    ///
    /// The input is an 8-bit RGB or grayscale image. An image without
    /// separable foreground yields an all-background mask.
    pub fn label(&self, image: &Mat) -> Result<Mat> {
        ensure!(!image.empty()?, "cannot label an empty image");
        ensure!(
            image.depth()? == cv_core::CV_8U,
            "expect an 8-bit image"
        );

        let gray = match image.channels()? {
            1 => image.try_clone()?,
            3 => {
                let mut gray = Mat::default();
                imgproc::cvt_color(image, &mut gray, imgproc::COLOR_RGB2GRAY, 0)?;
                gray
            }
            channels => bail!("unsupported number of channels {}", channels),
        };

        let mut inverted = Mat::default();
        cv_core::bitwise_not(&gray, &mut inverted, &Mat::default())?;

        let mut normalized = Mat::default();
        cv_core::normalize(
            &inverted,
            &mut normalized,
            0.0,
            255.0,
            cv_core::NORM_MINMAX,
            -1,
            &Mat::default(),
        )?;

        // Otsu keeps the first level with maximal between-class variance;
        // foreground is strictly above it
        let mut binary = Mat::default();
        imgproc::threshold(
            &normalized,
            &mut binary,
            0.0,
            255.0,
            imgproc::THRESH_BINARY | imgproc::THRESH_OTSU,
        )?;

        let opened = self.open(&binary)?;
        self.filter_components(&opened)
    }

    fn open(&self, binary: &Mat) -> Result<Mat> {
        if self.iterations == 0 {
            return Ok(binary.try_clone()?);
        }

        let anchor = Point::new(-1, -1);
        let kernel = imgproc::get_structuring_element(
            imgproc::MORPH_RECT,
            Size::new(self.kernel_size, self.kernel_size),
            anchor,
        )?;
        let mut opened = Mat::default();
        imgproc::morphology_ex(
            binary,
            &mut opened,
            imgproc::MORPH_OPEN,
            &kernel,
            anchor,
            self.iterations,
            cv_core::BORDER_CONSTANT,
            imgproc::morphology_default_border_value()?,
        )?;
        Ok(opened)
    }

    fn filter_components(&self, binary: &Mat) -> Result<Mat> {
        let mut labels = Mat::default();
        let mut stats = Mat::default();
        let mut centroids = Mat::default();
        let num_labels = imgproc::connected_components_with_stats(
            binary,
            &mut labels,
            &mut stats,
            &mut centroids,
            8,
            cv_core::CV_32S,
        )?;

        // label 0 is the background
        let keep: Vec<bool> = (0..num_labels)
            .map(|label| -> Result<_> {
                if label == 0 {
                    return Ok(false);
                }
                let area = *stats.at_2d::<i32>(label, imgproc::CC_STAT_AREA)?;
                Ok(area >= self.min_area)
            })
            .try_collect()?;
        debug!(
            "keep {} of {} components",
            keep.iter().filter(|&&kept| kept).count(),
            num_labels - 1
        );

        let mut mask = Mat::new_rows_cols_with_default(
            binary.rows(),
            binary.cols(),
            cv_core::CV_8UC1,
            Scalar::all(0.0),
        )?;
        for row in 0..binary.rows() {
            for col in 0..binary.cols() {
                let label = *labels.at_2d::<i32>(row, col)?;
                if keep[label as usize] {
                    *mask.at_2d_mut::<u8>(row, col)? = 255;
                }
            }
        }

        Ok(mask)
    }
}
