use crate::common::*;

pub use detection::*;
pub use diagnostics::*;

pub static CONFIG_VERSION: Lazy<VersionReq> = Lazy::new(|| VersionReq::parse("^0.1").unwrap());

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(deserialize_with = "deserialize_version")]
    pub version: Version,
    /// Must agree with the preprocessing used in training.
    #[serde(default)]
    pub preprocess: PreprocessConfig,
    #[serde(default)]
    pub model: UNetInit,
    pub checkpoint_file: PathBuf,
    #[serde(default)]
    pub detection: DetectionConfig,
    #[serde(default)]
    pub diagnostics: DiagnosticsConfig,
    /// The device where the model runs on.
    #[serde(with = "tch_serde::serde_device", default = "default_device")]
    pub device: Device,
}

impl Config {
    pub fn open<P>(path: P) -> Result<Self>
    where
        P: AsRef<Path>,
    {
        let text = fs::read_to_string(path)?;
        let config = json5::from_str(&text)?;
        Ok(config)
    }
}

mod detection {
    use super::*;

    /// The per-pixel and per-image decision rules.
    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct DetectionConfig {
        /// Pixels with probability above this value are foreground.
        #[serde(default = "default_pixel_threshold")]
        pub pixel_threshold: Ratio,
        /// Images whose foreground fraction is above this value contain sunspots.
        #[serde(default = "default_detection_threshold")]
        pub detection_threshold: Ratio,
    }

    impl Default for DetectionConfig {
        fn default() -> Self {
            Self {
                pixel_threshold: default_pixel_threshold(),
                detection_threshold: default_detection_threshold(),
            }
        }
    }

    fn default_pixel_threshold() -> Ratio {
        Ratio::try_from(0.5).unwrap()
    }

    fn default_detection_threshold() -> Ratio {
        Ratio::try_from(0.15).unwrap()
    }
}

mod diagnostics {
    use super::*;

    #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
    pub struct DiagnosticsConfig {
        /// Figures are not rendered when unset.
        #[serde(default)]
        pub dir: Option<PathBuf>,
    }
}

fn default_device() -> Device {
    Device::Cpu
}

pub fn deserialize_version<'de, D>(deserializer: D) -> Result<Version, D::Error>
where
    D: Deserializer<'de>,
{
    let text = String::deserialize(deserializer)?;
    let version = Version::parse(&text).map_err(|err| {
        D::Error::custom(format!(
            "failed to parse version number '{}': {:?}",
            text, err
        ))
    })?;

    if !CONFIG_VERSION.matches(&version) {
        return Err(D::Error::custom(format!(
            "incompatible version: get '{}', but it is incompatible with requirement '{}'",
            version, &*CONFIG_VERSION,
        )));
    }

    Ok(version)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detection_defaults() -> Result<()> {
        let config: Config = json5::from_str(
            r#"{
                version: "0.1.3",
                checkpoint_file: "unet_sunspot.ot",
            }"#,
        )?;
        assert_eq!(config.detection.pixel_threshold, 0.5);
        assert_eq!(config.detection.detection_threshold, 0.15);
        assert_eq!(config.diagnostics.dir, None);
        assert_eq!(config.preprocess, PreprocessConfig::default());
        assert_eq!(config.device, Device::Cpu);
        Ok(())
    }

    #[test]
    fn out_of_range_threshold_is_rejected() {
        let result = json5::from_str::<Config>(
            r#"{
                version: "0.1.0",
                checkpoint_file: "unet_sunspot.ot",
                detection: { detection_threshold: 1.5 },
            }"#,
        );
        assert!(result.is_err());
    }
}
