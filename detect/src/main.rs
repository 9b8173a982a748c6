use anyhow::{ensure, Context, Result};
use detect::config::Config;
use std::{env, path::PathBuf};
use structopt::StructOpt;

#[derive(Debug, Clone, StructOpt)]
/// Detect sunspots in solar images
struct Args {
    #[structopt(long, default_value = "detect.json5")]
    /// configuration file
    pub config_file: PathBuf,
    /// input image files
    pub images: Vec<PathBuf>,
}

pub fn main() -> Result<()> {
    if env::var_os("RUST_LOG").is_none() {
        env::set_var("RUST_LOG", "info");
    }
    pretty_env_logger::init();

    // parse arguments
    let Args {
        config_file,
        images,
    } = Args::from_args();
    ensure!(!images.is_empty(), "no input image is given");
    let config = Config::open(&config_file)
        .with_context(|| format!("failed to load config file '{}'", config_file.display()))?;

    detect::start(&config, &images)?;

    Ok(())
}
