use anyhow::Result;
use detect::{config::Config, Inferencer, Verdict};
use opencv::{
    core::{self, Mat, Scalar},
    imgcodecs,
    prelude::*,
};
use std::{fs, path::Path};
use sunspot_dl::diagnostic::{DirectorySink, NullSink};
use tch::{nn, Device};

fn write_image(path: &Path) -> Result<()> {
    let image = Mat::new_rows_cols_with_default(40, 40, core::CV_8UC3, Scalar::all(180.0))?;
    imgcodecs::imwrite(path.to_str().unwrap(), &image, &core::Vector::new())?;
    Ok(())
}

fn config(dir: &Path) -> Result<Config> {
    let value = serde_json::json!({
        "version": "0.1.0",
        "preprocess": { "image_size": 32 },
        "model": { "features": [2, 4] },
        "checkpoint_file": dir.join("unet.ot"),
        "diagnostics": { "dir": dir.join("diagnostics") },
    });
    Ok(serde_json::from_value(value)?)
}

fn save_checkpoint(config: &Config) -> Result<()> {
    tch::manual_seed(5);
    let vs = nn::VarStore::new(Device::Cpu);
    let _model = config.model.clone().build(&vs.root())?;
    vs.save(&config.checkpoint_file)?;
    Ok(())
}

#[test]
fn detect_image_file() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let config = config(dir.path())?;
    save_checkpoint(&config)?;
    let image_file = dir.path().join("disk.png");
    write_image(&image_file)?;

    let inferencer = Inferencer::load(&config)?;
    let mut sink = DirectorySink::new(dir.path().join("diagnostics"))?;
    let detection = inferencer.detect_file(&image_file, &mut sink)?;

    assert!((0.0..=1.0).contains(&detection.foreground_ratio));
    let expected = if detection.foreground_ratio > 0.15 {
        Verdict::Detected
    } else {
        Verdict::NotDetected
    };
    assert_eq!(detection.verdict, expected);
    assert!(dir.path().join("diagnostics/disk_detection.png").is_file());

    // repeated runs agree
    assert_eq!(inferencer.detect_file(&image_file, &mut sink)?, detection);
    Ok(())
}

#[test]
fn missing_checkpoint_is_an_error() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let config = config(dir.path())?;
    assert!(Inferencer::load(&config).is_err());
    Ok(())
}

#[test]
fn corrupt_image_is_an_error() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let config = config(dir.path())?;
    save_checkpoint(&config)?;
    let image_file = dir.path().join("corrupt.jpg");
    fs::write(&image_file, b"not an image")?;

    let inferencer = Inferencer::load(&config)?;
    let err = inferencer
        .detect_file(&image_file, &mut NullSink)
        .unwrap_err();
    assert!(format!("{:#}", err).contains("corrupt.jpg"));
    Ok(())
}

#[test]
fn start_classifies_every_image() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let config = config(dir.path())?;
    save_checkpoint(&config)?;
    let images: Vec<_> = (0..2)
        .map(|index| -> Result<_> {
            let path = dir.path().join(format!("{}.png", index));
            write_image(&path)?;
            Ok(path)
        })
        .collect::<Result<_>>()?;

    let detections = detect::start(&config, &images)?;
    assert_eq!(detections.len(), 2);
    assert_eq!(detections[0], detections[1]);
    Ok(())
}
