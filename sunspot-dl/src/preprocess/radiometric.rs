//! Limb-darkening correction for centered solar disk images.

use crate::common::*;

/// The smallest denominator of the correction factor. The three-term model
/// reaches zero exactly at the limb.
const MIN_DENOMINATOR: f64 = 1e-3;

/// Coefficients of the three-term limb-darkening model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LimbDarkeningConfig {
    #[serde(default = "default_a")]
    pub a: R64,
    #[serde(default = "default_b")]
    pub b: R64,
    #[serde(default = "default_c")]
    pub c: R64,
}

impl Default for LimbDarkeningConfig {
    fn default() -> Self {
        Self {
            a: default_a(),
            b: default_b(),
            c: default_c(),
        }
    }
}

fn default_a() -> R64 {
    r64(0.3)
}

fn default_b() -> R64 {
    r64(0.5)
}

fn default_c() -> R64 {
    r64(0.2)
}

/// The geometric model of the solar disk within an image.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DiskGeometry {
    pub center_x: f64,
    pub center_y: f64,
    pub radius: f64,
}

impl DiskGeometry {
    /// Assumes the disk is centered and inscribed in a `width`×`height` image.
    pub fn inscribed(height: i32, width: i32) -> Self {
        let width = width as f64;
        let height = height as f64;
        Self {
            center_x: width / 2.0,
            center_y: height / 2.0,
            radius: width.min(height) / 2.0,
        }
    }

    /// The distance from the pixel at (`row`, `col`) to the disk center.
    pub fn distance(&self, row: i32, col: i32) -> f64 {
        let dx = col as f64 - self.center_x;
        let dy = row as f64 - self.center_y;
        dx.hypot(dy)
    }

    pub fn contains(&self, row: i32, col: i32) -> bool {
        self.distance(row, col) <= self.radius
    }
}

/// Removes the intensity falloff towards the limb of the solar disk.
#[derive(Debug, Clone)]
pub struct RadiometricCorrector {
    a: f64,
    b: f64,
    c: f64,
}

impl RadiometricCorrector {
    pub fn new(config: &LimbDarkeningConfig) -> Result<Self> {
        let LimbDarkeningConfig { a, b, c } = *config;
        ensure!(
            a >= 0.0 && b >= 0.0 && c >= 0.0,
            "limb-darkening coefficients must be non-negative, but get a={}, b={}, c={}",
            a,
            b,
            c
        );

        Ok(Self {
            a: a.raw(),
            b: b.raw(),
            c: c.raw(),
        })
    }

    /// The multiplicative gain at normalized radial distance `d`.
    pub fn factor(&self, d: f64) -> f64 {
        let Self { a, b, c } = *self;
        let d = d.clamp(0.0, 1.0);
        let t = 1.0 - (1.0 - d * d).sqrt();
        let denominator = 1.0 - a * t - b * t.powi(2) - c * t.powi(3);
        1.0 / denominator.max(MIN_DENOMINATOR)
    }

    /// Corrects an 8-bit three-channel image. Pixels outside the disk are copied as is.
    pub fn correct(&self, image: &Mat) -> Result<Mat> {
        ensure!(!image.empty()?, "cannot correct an empty image");
        ensure!(
            image.typ()? == cv_core::CV_8UC3,
            "expect an 8-bit three-channel image"
        );

        let rows = image.rows();
        let cols = image.cols();
        let geometry = DiskGeometry::inscribed(rows, cols);
        let mut output = image.try_clone()?;

        for row in 0..rows {
            for col in 0..cols {
                let distance = geometry.distance(row, col);
                if distance > geometry.radius {
                    continue;
                }

                let factor = self.factor(distance / geometry.radius);
                let pixel = output.at_2d_mut::<Vec3b>(row, col)?;
                for channel in 0..3 {
                    let value = (pixel[channel] as f64 * factor).clamp(0.0, 255.0);
                    pixel[channel] = value.round() as u8;
                }
            }
        }

        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gradient_image(rows: i32, cols: i32) -> Result<Mat> {
        let mut image =
            Mat::new_rows_cols_with_default(rows, cols, cv_core::CV_8UC3, Scalar::all(0.0))?;
        for row in 0..rows {
            for col in 0..cols {
                let value = ((row * 7 + col * 3) % 200 + 20) as u8;
                *image.at_2d_mut::<Vec3b>(row, col)? = Vec3b::from([value, value / 2, value / 3]);
            }
        }
        Ok(image)
    }

    #[test]
    fn pixels_outside_disk_are_unchanged() -> Result<()> {
        let corrector = RadiometricCorrector::new(&Default::default())?;

        for &(rows, cols) in &[(32, 32), (24, 40), (41, 17)] {
            let input = gradient_image(rows, cols)?;
            let output = corrector.correct(&input)?;
            assert_eq!(output.typ()?, input.typ()?);
            assert_eq!((output.rows(), output.cols()), (rows, cols));

            let geometry = DiskGeometry::inscribed(rows, cols);
            let mut outside = 0;
            for row in 0..rows {
                for col in 0..cols {
                    if !geometry.contains(row, col) {
                        outside += 1;
                        assert_eq!(
                            output.at_2d::<Vec3b>(row, col)?,
                            input.at_2d::<Vec3b>(row, col)?
                        );
                    }
                }
            }
            assert!(outside > 0);
        }
        Ok(())
    }

    #[test]
    fn center_is_unchanged_and_limb_is_brightened() -> Result<()> {
        let corrector = RadiometricCorrector::new(&Default::default())?;
        assert_abs_diff_eq!(corrector.factor(0.0), 1.0);
        assert!(corrector.factor(0.9) > corrector.factor(0.5));
        assert!(corrector.factor(1.0).is_finite());

        let input = Mat::new_rows_cols_with_default(
            32,
            32,
            cv_core::CV_8UC3,
            Scalar::all(100.0),
        )?;
        let output = corrector.correct(&input)?;
        assert_eq!(output.at_2d::<Vec3b>(16, 16)?[0], 100);
        assert!(output.at_2d::<Vec3b>(16, 2)?[0] > 100);
        Ok(())
    }

    #[test]
    fn saturated_values_are_clipped() -> Result<()> {
        let corrector = RadiometricCorrector::new(&Default::default())?;
        let input = Mat::new_rows_cols_with_default(
            16,
            16,
            cv_core::CV_8UC3,
            Scalar::all(250.0),
        )?;
        let output = corrector.correct(&input)?;
        assert_eq!(output.at_2d::<Vec3b>(8, 0)?[1], 255);
        Ok(())
    }

    #[test]
    fn invalid_inputs_are_rejected() -> Result<()> {
        let config = LimbDarkeningConfig {
            a: r64(-0.1),
            ..Default::default()
        };
        assert!(RadiometricCorrector::new(&config).is_err());

        let corrector = RadiometricCorrector::new(&Default::default())?;
        assert!(corrector.correct(&Mat::default()).is_err());

        let gray =
            Mat::new_rows_cols_with_default(8, 8, cv_core::CV_8UC1, Scalar::all(0.0))?;
        assert!(corrector.correct(&gray).is_err());
        Ok(())
    }
}
