use crate::common::*;

#[derive(Debug, Clone)]
pub struct ConvBn2DInit {
    pub in_c: usize,
    pub out_c: usize,
    pub k: usize,
    pub s: usize,
    pub p: usize,
    pub d: usize,
    pub g: usize,
    pub bias: bool,
    pub activation: Activation,
    pub batch_norm: Option<nn::BatchNormConfig>,
}

impl ConvBn2DInit {
    pub fn new(in_c: usize, out_c: usize, k: usize) -> Self {
        Self {
            in_c,
            out_c,
            k,
            s: 1,
            p: k / 2,
            d: 1,
            g: 1,
            bias: false,
            activation: Activation::Relu,
            batch_norm: Some(Default::default()),
        }
    }

    pub fn build<'p, P>(self, path: P) -> ConvBn2D
    where
        P: Borrow<nn::Path<'p>>,
    {
        let path = path.borrow();

        let Self {
            in_c,
            out_c,
            k,
            s,
            p,
            d,
            g,
            bias,
            activation,
            batch_norm,
        } = self;

        let conv = nn::conv2d(
            path / "conv",
            in_c as i64,
            out_c as i64,
            k as i64,
            nn::ConvConfig {
                stride: s as i64,
                padding: p as i64,
                dilation: d as i64,
                groups: g as i64,
                bias,
                ..Default::default()
            },
        );
        let bn = batch_norm.map(|config| nn::batch_norm2d(path / "bn", out_c as i64, config));

        ConvBn2D {
            conv,
            bn,
            activation,
        }
    }
}

/// Convolution followed by optional batch normalization and an activation.
#[derive(Debug)]
pub struct ConvBn2D {
    conv: nn::Conv2D,
    bn: Option<nn::BatchNorm>,
    activation: Activation,
}

impl nn::ModuleT for ConvBn2D {
    fn forward_t(&self, xs: &Tensor, train: bool) -> Tensor {
        let Self {
            ref conv,
            ref bn,
            activation,
        } = *self;

        let xs = xs.apply(conv);
        let xs = match bn {
            Some(bn) => xs.apply_t(bn, train),
            None => xs,
        };
        xs.activation(activation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conv_bn_preserves_spatial_size() {
        let vs = nn::VarStore::new(Device::Cpu);
        let conv = ConvBn2DInit::new(3, 8, 3).build(&vs.root() / "conv_bn");

        let input = Tensor::rand(&[2, 3, 17, 9], (Kind::Float, Device::Cpu));
        let output = conv.forward_t(&input, true);
        assert_eq!(output.size(), vec![2, 8, 17, 9]);
        assert!(f64::from(output.min()) >= 0.0);
    }
}
