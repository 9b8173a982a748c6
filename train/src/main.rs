use anyhow::{Context, Result};
use std::{env, path::PathBuf};
use structopt::StructOpt;
use train::config::Config;

#[derive(Debug, Clone, StructOpt)]
/// Train the sunspot segmentation model
struct Args {
    #[structopt(long, default_value = "train.json5")]
    /// configuration file
    pub config_file: PathBuf,
    #[structopt(long)]
    /// skip training and evaluate the saved checkpoint
    pub evaluate_only: bool,
}

pub fn main() -> Result<()> {
    if env::var_os("RUST_LOG").is_none() {
        env::set_var("RUST_LOG", "info");
    }
    pretty_env_logger::init();

    // parse arguments
    let Args {
        config_file,
        evaluate_only,
    } = Args::from_args();
    let config = Config::open(&config_file)
        .with_context(|| format!("failed to load config file '{}'", config_file.display()))?;

    // start training program
    let metrics = if evaluate_only {
        train::evaluate_only(&config)?
    } else {
        train::start(&config)?
    };

    println!("{}", serde_json::to_string_pretty(&metrics)?);

    Ok(())
}
