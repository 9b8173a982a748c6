use crate::common::*;

/// Learned upsampling by a transposed convolution.
#[derive(Debug, Clone)]
pub struct UpConv2DInit {
    pub in_c: usize,
    pub out_c: usize,
    pub k: usize,
    pub s: usize,
    pub bias: bool,
}

impl UpConv2DInit {
    /// Doubles the spatial resolution with a 2×2 kernel at stride 2.
    pub fn new(in_c: usize, out_c: usize) -> Self {
        Self {
            in_c,
            out_c,
            k: 2,
            s: 2,
            bias: true,
        }
    }

    pub fn build<'p, P>(self, path: P) -> UpConv2D
    where
        P: Borrow<nn::Path<'p>>,
    {
        let path = path.borrow();
        let Self {
            in_c,
            out_c,
            k,
            s,
            bias,
        } = self;

        let deconv = nn::conv_transpose2d(
            path / "deconv",
            in_c as i64,
            out_c as i64,
            k as i64,
            nn::ConvTransposeConfig {
                stride: s as i64,
                bias,
                ..Default::default()
            },
        );

        UpConv2D { deconv }
    }
}

#[derive(Debug)]
pub struct UpConv2D {
    deconv: nn::ConvTranspose2D,
}

impl nn::Module for UpConv2D {
    fn forward(&self, xs: &Tensor) -> Tensor {
        xs.apply(&self.deconv)
    }
}
