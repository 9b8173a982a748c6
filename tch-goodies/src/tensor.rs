use crate::common::*;

pub trait TensorExt {
    fn is_empty(&self) -> bool;

    /// Maps values strictly greater than `threshold` to 1.0 and others to 0.0.
    fn f_binarize(&self, threshold: f64) -> Result<Tensor>;

    fn binarize(&self, threshold: f64) -> Tensor {
        self.f_binarize(threshold).unwrap()
    }

    /// The fraction of non-zero elements.
    fn f_foreground_ratio(&self) -> Result<f64>;

    fn foreground_ratio(&self) -> f64 {
        self.f_foreground_ratio().unwrap()
    }

    /// Converts a float image in `[0, 1]` to an 8-bit image in `[0, 255]`.
    fn f_to_image_u8(&self) -> Result<Tensor>;

    fn to_image_u8(&self) -> Tensor {
        self.f_to_image_u8().unwrap()
    }
}

impl TensorExt for Tensor {
    fn is_empty(&self) -> bool {
        self.numel() == 0
    }

    fn f_binarize(&self, threshold: f64) -> Result<Tensor> {
        let output = tch::no_grad(|| -> Result<_> {
            Ok(self.f_gt(threshold)?.f_to_kind(Kind::Float)?)
        })?;
        Ok(output)
    }

    fn f_foreground_ratio(&self) -> Result<f64> {
        ensure!(!self.is_empty(), "cannot compute the ratio of an empty tensor");
        let count = tch::no_grad(|| -> Result<_> { Ok(self.f_ne(0.0)?.f_sum(Kind::Int64)?) })?;
        Ok(i64::from(&count) as f64 / self.numel() as f64)
    }

    fn f_to_image_u8(&self) -> Result<Tensor> {
        match self.kind() {
            Kind::Uint8 => Ok(self.shallow_clone()),
            Kind::Float | Kind::Double => {
                let image = tch::no_grad(|| -> Result<_> {
                    let scaled = self.f_clamp(0.0, 1.0)? * 255.0;
                    Ok(scaled.f_round()?.f_to_kind(Kind::Uint8)?)
                })?;
                Ok(image)
            }
            kind => bail!("unsupported data kind {:?}", kind),
        }
    }
}
