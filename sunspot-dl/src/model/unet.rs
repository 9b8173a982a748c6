use crate::common::*;
use tch_act::Activation;
use tch_modules::{Concat2D, DoubleConv2D, DoubleConv2DInit, UpConv2D, UpConv2DInit};

/// The configuration and builder of [UNet].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UNetInit {
    #[serde(default = "default_input_channels")]
    pub input_channels: usize,
    #[serde(default = "default_output_channels")]
    pub output_channels: usize,
    /// Encoder widths from the shallowest stage. The length sets the depth.
    #[serde(default = "default_features")]
    pub features: Vec<usize>,
    #[serde(default)]
    pub activation: Activation,
}

impl Default for UNetInit {
    fn default() -> Self {
        Self {
            input_channels: default_input_channels(),
            output_channels: default_output_channels(),
            features: default_features(),
            activation: Activation::default(),
        }
    }
}

fn default_input_channels() -> usize {
    3
}

fn default_output_channels() -> usize {
    1
}

fn default_features() -> Vec<usize> {
    vec![64, 128]
}

impl UNetInit {
    pub fn build<'p, P>(self, path: P) -> Result<UNet>
    where
        P: Borrow<nn::Path<'p>>,
    {
        let path = path.borrow();
        let Self {
            input_channels,
            output_channels,
            features,
            activation,
        } = self;

        ensure!(!features.is_empty(), "the feature list must not be empty");
        ensure!(input_channels > 0, "input_channels must be positive");
        ensure!(output_channels > 0, "output_channels must be positive");
        ensure!(
            features.iter().all(|&width| width > 0),
            "every feature width must be positive, but get {:?}",
            features
        );

        let downs: Vec<_> = features
            .iter()
            .scan(input_channels, |in_c, &out_c| {
                let block = (*in_c, out_c);
                *in_c = out_c;
                Some(block)
            })
            .enumerate()
            .map(|(index, (in_c, out_c))| {
                DoubleConv2DInit {
                    activation,
                    ..DoubleConv2DInit::new(in_c, out_c)
                }
                .build(path / format!("down_{}", index))
            })
            .collect();

        let last_width = *features.last().unwrap();
        let bottleneck = DoubleConv2DInit {
            activation,
            ..DoubleConv2DInit::new(last_width, last_width * 2)
        }
        .build(path / "bottleneck");

        // the decoder runs from the deepest stage to the shallowest
        let ups: Vec<_> = features
            .iter()
            .enumerate()
            .rev()
            .map(|(index, &width)| {
                // receives the bottleneck output or the next deeper decoder stage
                let in_c = features.get(index + 1).copied().unwrap_or(last_width * 2);
                let up = UpConv2DInit::new(in_c, width).build(path / format!("up_{}", index));
                let conv = DoubleConv2DInit {
                    activation,
                    ..DoubleConv2DInit::new(width * 2, width)
                }
                .build(path / format!("up_conv_{}", index));
                (up, conv)
            })
            .collect();

        let head = nn::conv2d(
            path / "head",
            features[0] as i64,
            output_channels as i64,
            1,
            Default::default(),
        );

        debug!(
            "build U-Net with features {:?}, {} input and {} output channels",
            features, input_channels, output_channels
        );

        Ok(UNet {
            downs,
            bottleneck,
            ups,
            head,
            concat: Concat2D::new(),
        })
    }
}

/// Encoder-decoder with skip connections producing per-pixel logits.
#[derive(Debug)]
pub struct UNet {
    downs: Vec<DoubleConv2D>,
    bottleneck: DoubleConv2D,
    ups: Vec<(UpConv2D, DoubleConv2D)>,
    head: nn::Conv2D,
    concat: Concat2D,
}

impl UNet {
    pub fn f_forward_t(&self, input: &Tensor, train: bool) -> Result<Tensor> {
        let (_, _, height, width) = input.size4()?;

        let mut skips = Vec::with_capacity(self.downs.len());
        let mut xs = input.shallow_clone();
        for down in &self.downs {
            xs = down.forward_t(&xs, train);
            xs = {
                let pooled = xs.f_max_pool2d(&[2, 2], &[2, 2], &[0, 0], &[1, 1], false)?;
                skips.push(xs);
                pooled
            };
        }

        xs = self.bottleneck.forward_t(&xs, train);

        for ((up, conv), skip) in self.ups.iter().zip(skips.iter().rev()) {
            let upsampled = up.forward(&xs);
            let joined = self.concat.f_forward(skip, &upsampled)?;
            xs = conv.forward_t(&joined, train);
        }

        let logits = xs.apply(&self.head);
        debug_assert_eq!(logits.size()[2..], [height, width]);
        Ok(logits)
    }
}

impl nn::ModuleT for UNet {
    fn forward_t(&self, input: &Tensor, train: bool) -> Tensor {
        self.f_forward_t(input, train).unwrap()
    }
}
