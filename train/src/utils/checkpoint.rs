use crate::common::*;

/// The result of persisting an artifact with a fallback location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    /// Written to the primary location.
    Saved { path: PathBuf },
    /// The primary location failed and the fallback was used.
    Degraded { path: PathBuf, reason: String },
    /// Both locations failed.
    Failed { reason: String },
}

impl SaveOutcome {
    /// The path of the written file, if any.
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::Saved { path } | Self::Degraded { path, .. } => Some(path),
            Self::Failed { .. } => None,
        }
    }

    pub fn log(&self, what: &str) {
        match self {
            Self::Saved { path } => info!("{} saved to {}", what, path.display()),
            Self::Degraded { path, reason } => warn!(
                "{} saved to fallback location {} ({})",
                what,
                path.display(),
                reason
            ),
            Self::Failed { reason } => warn!("failed to save {}: {}", what, reason),
        }
    }
}

/// The outcome of loading a checkpoint before evaluation or resumption.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    Loaded { path: PathBuf },
    /// The parameters are left as they were.
    Failed { path: PathBuf, reason: String },
}

impl LoadOutcome {
    pub fn is_loaded(&self) -> bool {
        matches!(self, Self::Loaded { .. })
    }
}

/// Writes `file_name` into `primary_dir` with `write`, retrying in `fallback_dir` on failure.
pub fn save_with_fallback<F>(
    primary_dir: &Path,
    fallback_dir: &Path,
    file_name: &str,
    mut write: F,
) -> SaveOutcome
where
    F: FnMut(&Path) -> Result<()>,
{
    let mut try_write = |dir: &Path| -> Result<PathBuf> {
        fs::create_dir_all(dir)
            .with_context(|| format!("failed to create directory {}", dir.display()))?;
        let path = dir.join(file_name);
        write(&path).with_context(|| format!("failed to write {}", path.display()))?;
        Ok(path)
    };

    let primary_err = match try_write(primary_dir) {
        Ok(path) => return SaveOutcome::Saved { path },
        Err(err) => format!("{:#}", err),
    };
    warn!("{}, retry in {}", primary_err, fallback_dir.display());

    match try_write(fallback_dir) {
        Ok(path) => SaveOutcome::Degraded {
            path,
            reason: primary_err,
        },
        Err(err) => SaveOutcome::Failed {
            reason: format!("{}; {:#}", primary_err, err),
        },
    }
}

/// Save parameters to a checkpoint file.
pub fn save_checkpoint(
    vs: &nn::VarStore,
    primary_dir: &Path,
    fallback_dir: &Path,
    file_name: &str,
) -> SaveOutcome {
    save_with_fallback(primary_dir, fallback_dir, file_name, |path| {
        vs.save(path)?;
        Ok(())
    })
}

/// Load parameters from a checkpoint file, keeping the current ones on failure.
pub fn try_load_checkpoint(vs: &mut nn::VarStore, path: &Path) -> LoadOutcome {
    let result = if path.is_file() {
        vs.load(path).map_err(|err| format!("{}", err))
    } else {
        Err(format!("{} is not a file", path.display()))
    };

    match result {
        Ok(()) => {
            info!("load checkpoint file {}", path.display());
            LoadOutcome::Loaded {
                path: path.to_owned(),
            }
        }
        Err(reason) => {
            warn!(
                "failed to load checkpoint {}, continue with current parameters: {}",
                path.display(),
                reason
            );
            LoadOutcome::Failed {
                path: path.to_owned(),
                reason,
            }
        }
    }
}
