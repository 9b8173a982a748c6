//! Sunspot detection on individual solar images.

mod common;
pub mod config;

use crate::{
    common::*,
    config::{Config, DetectionConfig},
};

/// The image-level decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Verdict {
    Detected,
    NotDetected,
}

impl Verdict {
    /// Classifies a foreground fraction. A fraction exactly at the threshold is not a detection.
    pub fn classify(foreground_ratio: f64, detection_threshold: Ratio) -> Self {
        if foreground_ratio > detection_threshold.to_f64() {
            Self::Detected
        } else {
            Self::NotDetected
        }
    }
}

impl Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Detected => write!(f, "Sunspot Detected"),
            Self::NotDetected => write!(f, "No Sunspot Detected"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub verdict: Verdict,
    /// The fraction of pixels predicted as sunspot.
    pub foreground_ratio: f64,
}

/// Runs a segmentation model on single images and aggregates the mask into a verdict.
#[derive(Debug)]
pub struct Inferencer<M>
where
    M: ModuleT,
{
    preprocessor: Preprocessor,
    model: M,
    pixel_threshold: f64,
    detection_threshold: Ratio,
    device: Device,
}

impl Inferencer<UNet> {
    /// Builds the network and loads the trained parameters.
    pub fn load(config: &Config) -> Result<Self> {
        let Config {
            preprocess,
            model,
            checkpoint_file,
            detection,
            device,
            ..
        } = config;

        let mut vs = nn::VarStore::new(*device);
        let model = model.clone().build(&vs.root())?;
        vs.load(checkpoint_file).with_context(|| {
            format!(
                "failed to load checkpoint file '{}'",
                checkpoint_file.display()
            )
        })?;
        vs.freeze();
        info!("loaded model from {}", checkpoint_file.display());

        Ok(Self::new(
            Preprocessor::new(preprocess)?,
            model,
            detection,
            *device,
        ))
    }
}

impl<M> Inferencer<M>
where
    M: ModuleT,
{
    pub fn new(
        preprocessor: Preprocessor,
        model: M,
        detection: &DetectionConfig,
        device: Device,
    ) -> Self {
        Self {
            preprocessor,
            model,
            pixel_threshold: detection.pixel_threshold.to_f64(),
            detection_threshold: detection.detection_threshold,
            device,
        }
    }

    /// Loads, preprocesses and classifies an image file.
    pub fn detect_file<P, S>(&self, path: P, sink: &mut S) -> Result<Detection>
    where
        P: AsRef<Path>,
        S: DiagnosticSink + ?Sized,
    {
        let path = path.as_ref();
        let image = image_to_tensor(&self.preprocessor.load_and_process(path)?)?;

        let (probabilities, mask) = self.segment(&image)?;
        let foreground_ratio = mask.f_foreground_ratio()?;
        let verdict = Verdict::classify(foreground_ratio, self.detection_threshold);
        info!(
            "{}: foreground ratio {:.4}, {}",
            path.display(),
            foreground_ratio,
            verdict
        );

        let name = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| "image".into());
        if let Err(err) = sink.render_detection(&name, &image, &mask, &probabilities) {
            warn!("failed to render diagnostics for {}: {:#}", path.display(), err);
        }

        Ok(Detection {
            verdict,
            foreground_ratio,
        })
    }

    /// Returns the `[1, H, W]` probability map and binary mask of a `[3, H, W]` image.
    pub fn segment(&self, image: &Tensor) -> Result<(Tensor, Tensor)> {
        tch::no_grad(|| -> Result<_> {
            let input = image.f_unsqueeze(0)?.f_to_device(self.device)?;
            let probabilities = self
                .model
                .forward_t(&input, false)
                .f_sigmoid()?
                .f_squeeze_dim(0)?
                .f_to_device(Device::Cpu)?;
            let mask = probabilities.f_binarize(self.pixel_threshold)?;
            Ok((probabilities, mask))
        })
    }
}

/// Classifies every image and prints one verdict line per image.
pub fn start(config: &Config, images: &[PathBuf]) -> Result<Vec<Detection>> {
    let inferencer = Inferencer::load(config)?;
    let mut sink: Box<dyn DiagnosticSink> = match &config.diagnostics.dir {
        Some(dir) => Box::new(DirectorySink::new(dir)?),
        None => Box::new(NullSink),
    };

    images
        .iter()
        .map(|path| {
            let detection = inferencer.detect_file(path, &mut *sink)?;
            println!("{}\t{}", path.display(), detection.verdict);
            Ok(detection)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    /// Emits confident logits for the first `count` pixels regardless of the input.
    #[derive(Debug)]
    struct FixedMask {
        count: i64,
    }

    impl nn::ModuleT for FixedMask {
        fn forward_t(&self, xs: &Tensor, _train: bool) -> Tensor {
            let (b, _, h, w) = xs.size4().unwrap();
            let logits = Tensor::full(&[h * w], -10.0, (tch::Kind::Float, xs.device()));
            let _ = logits.narrow(0, 0, self.count).fill_(10.0);
            logits.view([1, 1, h, w]).repeat(&[b, 1, 1, 1])
        }
    }

    fn inferencer(count: i64) -> Inferencer<FixedMask> {
        Inferencer::new(
            Preprocessor::new(&PreprocessConfig::default()).unwrap(),
            FixedMask { count },
            &DetectionConfig::default(),
            Device::Cpu,
        )
    }

    #[test]
    fn verdict_text() {
        assert_eq!(Verdict::Detected.to_string(), "Sunspot Detected");
        assert_eq!(Verdict::NotDetected.to_string(), "No Sunspot Detected");
    }

    #[test]
    fn classify_is_strict_at_threshold() -> Result<()> {
        let threshold = Ratio::try_from(0.15)?;
        assert_eq!(Verdict::classify(0.15, threshold), Verdict::NotDetected);
        assert_eq!(Verdict::classify(0.1501, threshold), Verdict::Detected);
        assert_eq!(Verdict::classify(0.0, threshold), Verdict::NotDetected);
        assert_eq!(Verdict::classify(1.0, threshold), Verdict::Detected);
        Ok(())
    }

    #[test]
    fn mask_at_boundary_is_not_detected() -> Result<()> {
        let image = Tensor::zeros(&[3, 20, 20], (tch::Kind::Float, Device::Cpu));

        // 60 of 400 pixels is exactly 0.15
        let (probabilities, mask) = inferencer(60).segment(&image)?;
        assert_eq!(probabilities.size(), vec![1, 20, 20]);
        let ratio = mask.f_foreground_ratio()?;
        assert_abs_diff_eq!(ratio, 0.15);
        assert_eq!(
            Verdict::classify(ratio, DetectionConfig::default().detection_threshold),
            Verdict::NotDetected
        );

        let (_, mask) = inferencer(61).segment(&image)?;
        assert_eq!(
            Verdict::classify(
                mask.f_foreground_ratio()?,
                DetectionConfig::default().detection_threshold
            ),
            Verdict::Detected
        );
        Ok(())
    }
}
