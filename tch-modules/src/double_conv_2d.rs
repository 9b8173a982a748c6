use crate::{common::*, conv_bn_2d::{ConvBn2D, ConvBn2DInit}};

/// Two stacked 3×3 [ConvBn2D] blocks with same-size padding.
#[derive(Debug, Clone)]
pub struct DoubleConv2DInit {
    pub in_c: usize,
    pub out_c: usize,
    pub activation: Activation,
}

impl DoubleConv2DInit {
    pub fn new(in_c: usize, out_c: usize) -> Self {
        Self {
            in_c,
            out_c,
            activation: Activation::Relu,
        }
    }

    pub fn build<'p, P>(self, path: P) -> DoubleConv2D
    where
        P: Borrow<nn::Path<'p>>,
    {
        let path = path.borrow();
        let Self {
            in_c,
            out_c,
            activation,
        } = self;

        let first = ConvBn2DInit {
            activation,
            ..ConvBn2DInit::new(in_c, out_c, 3)
        }
        .build(path / "0");
        let second = ConvBn2DInit {
            activation,
            ..ConvBn2DInit::new(out_c, out_c, 3)
        }
        .build(path / "1");

        DoubleConv2D { first, second }
    }
}

#[derive(Debug)]
pub struct DoubleConv2D {
    first: ConvBn2D,
    second: ConvBn2D,
}

impl nn::ModuleT for DoubleConv2D {
    fn forward_t(&self, xs: &Tensor, train: bool) -> Tensor {
        let xs = self.first.forward_t(xs, train);
        self.second.forward_t(&xs, train)
    }
}
