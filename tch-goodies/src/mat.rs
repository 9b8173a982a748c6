//! Conversions between OpenCV matrices and image tensors.

use crate::{common::*, tensor::TensorExt};
use opencv::{
    core::{self, Mat, Scalar},
    prelude::*,
};

pub trait MatExt {
    /// Converts an 8-bit `H×W×C` matrix into a `[C, H, W]` uint8 tensor.
    fn f_to_tensor(&self) -> Result<Tensor>;
}

pub trait TensorToMat {
    /// Converts a `[C, H, W]` or `[H, W]` image tensor into an 8-bit matrix.
    ///
    /// Float tensors are expected in `[0, 1]` and are rescaled to `[0, 255]`.
    fn f_to_mat(&self) -> Result<Mat>;
}

impl MatExt for Mat {
    fn f_to_tensor(&self) -> Result<Tensor> {
        ensure!(!self.empty()?, "cannot convert an empty matrix");
        ensure!(
            self.depth()? == core::CV_8U,
            "only 8-bit matrices are supported"
        );

        let rows = self.rows() as i64;
        let cols = self.cols() as i64;
        let channels = self.channels()? as i64;

        let owned;
        let mat = if self.is_continuous()? {
            self
        } else {
            owned = self.try_clone()?;
            &owned
        };

        let tensor = Tensor::of_slice(mat.data_bytes()?)
            .view([rows, cols, channels])
            .permute(&[2, 0, 1])
            .contiguous();
        Ok(tensor)
    }
}

impl TensorToMat for Tensor {
    fn f_to_mat(&self) -> Result<Mat> {
        let image = self.f_to_image_u8()?.to_device(Device::Cpu);
        let (channels, height, width) = match *image.size().as_slice() {
            [h, w] => (1, h, w),
            [c, h, w] => (c, h, w),
            _ => bail!("invalid shape: expect two or three dimensions"),
        };
        let typ = match channels {
            1 => core::CV_8UC1,
            3 => core::CV_8UC3,
            _ => bail!("unsupported number of channels {}", channels),
        };

        let bytes: Vec<u8> = Vec::from(
            &image
                .view([channels, height, width])
                .permute(&[1, 2, 0])
                .contiguous(),
        );
        let mut mat =
            Mat::new_rows_cols_with_default(height as i32, width as i32, typ, Scalar::all(0.0))?;
        mat.data_bytes_mut()?.copy_from_slice(&bytes);
        Ok(mat)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use opencv::core::Vec3b;

    #[test]
    fn mat_tensor_layout() -> Result<()> {
        let mut mat = Mat::new_rows_cols_with_default(2, 3, core::CV_8UC3, Scalar::all(0.0))?;
        *mat.at_2d_mut::<Vec3b>(1, 2)? = Vec3b::from([10, 20, 30]);

        let tensor = mat.f_to_tensor()?;
        assert_eq!(tensor.size(), vec![3, 2, 3]);
        assert_eq!(i64::from(&tensor.get(0).get(1).get(2)), 10);
        assert_eq!(i64::from(&tensor.get(1).get(1).get(2)), 20);
        assert_eq!(i64::from(&tensor.get(2).get(1).get(2)), 30);

        let recovered = tensor.f_to_mat()?;
        assert_eq!(*recovered.at_2d::<Vec3b>(1, 2)?, Vec3b::from([10, 20, 30]));
        assert_eq!(*recovered.at_2d::<Vec3b>(0, 0)?, Vec3b::from([0, 0, 0]));
        Ok(())
    }

    #[test]
    fn float_mask_to_mat() -> Result<()> {
        let mask = Tensor::of_slice(&[0.0f32, 1.0, 1.0, 0.0]).view([1, 2, 2]);
        let mat = mask.f_to_mat()?;
        assert_eq!(mat.typ()?, core::CV_8UC1);
        assert_eq!(*mat.at_2d::<u8>(0, 1)?, 255);
        assert_eq!(*mat.at_2d::<u8>(1, 1)?, 0);
        Ok(())
    }
}
