use crate::common::*;

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg"];

/// Whether the path carries an image extension, compared case-insensitively.
pub fn is_image_file<P>(path: P) -> bool
where
    P: AsRef<Path>,
{
    path.as_ref()
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            IMAGE_EXTENSIONS
                .iter()
                .any(|expect| ext.eq_ignore_ascii_case(expect))
        })
        .unwrap_or(false)
}

/// An ordered list of validated image file paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Manifest {
    paths: Vec<PathBuf>,
}

impl Manifest {
    /// Lists the image files directly inside `dir`, sorted by path.
    pub fn scan<P>(dir: P) -> Result<Self>
    where
        P: AsRef<Path>,
    {
        let dir = dir.as_ref();
        let mut paths: Vec<PathBuf> = fs::read_dir(dir)
            .with_context(|| format!("failed to list directory {}", dir.display()))?
            .map(|entry| -> Result<_> {
                // follows symlinks
                let path = entry?.path();
                Ok((path.is_file() && is_image_file(&path)).then(|| path))
            })
            .filter_map(|path| path.transpose())
            .try_collect()?;
        paths.sort();

        debug!("found {} images in {}", paths.len(), dir.display());
        Ok(Self { paths })
    }

    /// Builds a manifest from explicit paths. Each path must be an existing image file.
    pub fn from_paths<I, P>(paths: I) -> Result<Self>
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        let paths: Vec<PathBuf> = paths
            .into_iter()
            .map(|path| -> Result<_> {
                let path = path.into();
                ensure!(
                    is_image_file(&path),
                    "{} is not a png or jpeg file",
                    path.display()
                );
                ensure!(path.is_file(), "{} is not a file", path.display());
                Ok(path)
            })
            .try_collect()?;
        Ok(Self { paths })
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Path> {
        self.paths.get(index).map(|path| path.as_path())
    }

    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    /// Randomly partitions the manifest into `(kept, held_out)`.
    ///
    /// The held-out part receives `ratio` of the paths, rounded, but at least one
    /// and at most `len - 1` when there are two or more paths and the ratio is
    /// positive. Both parts keep the original order.
    pub fn split(self, ratio: Ratio, seed: u64) -> (Self, Self) {
        let len = self.paths.len();
        let mut num_held = (len as f64 * ratio.to_f64()).round() as usize;
        if len >= 2 && ratio.to_f64() > 0.0 {
            num_held = num_held.clamp(1, len - 1);
        }

        let mut indexes: Vec<usize> = (0..len).collect();
        let mut rng = StdRng::seed_from_u64(seed);
        indexes.shuffle(&mut rng);
        let mut held: Vec<bool> = vec![false; len];
        indexes[..num_held].iter().for_each(|&index| held[index] = true);

        let (held_out, kept): (Vec<_>, Vec<_>) = self
            .paths
            .into_iter()
            .zip(held)
            .partition(|(_, held)| *held);
        let strip = |pairs: Vec<(PathBuf, bool)>| Self {
            paths: pairs.into_iter().map(|(path, _)| path).collect(),
        };

        (strip(kept), strip(held_out))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn touch(dir: &Path, names: &[&str]) -> Result<()> {
        for name in names {
            fs::write(dir.join(name), b"")?;
        }
        Ok(())
    }

    #[test]
    fn scan_filters_by_extension() -> Result<()> {
        let dir = tempfile::tempdir()?;
        touch(
            dir.path(),
            &["c.png", "a.JPG", "b.jpeg", "d.PNG", "e.Jpeg", "notes.txt", "noext"],
        )?;
        fs::create_dir(dir.path().join("nested.png"))?;
        fs::create_dir(dir.path().join("sub"))?;
        touch(&dir.path().join("sub"), &["inner.png"])?;

        let manifest = Manifest::scan(dir.path())?;
        let names: Vec<_> = manifest
            .paths()
            .iter()
            .map(|path| path.file_name().unwrap().to_str().unwrap().to_string())
            .collect();
        assert_eq!(names, vec!["a.JPG", "b.jpeg", "c.png", "d.PNG", "e.Jpeg"]);

        assert_eq!(Manifest::scan(dir.path())?, manifest);
        Ok(())
    }

    #[cfg(unix)]
    #[test]
    fn scan_follows_symlinks() -> Result<()> {
        let storage = tempfile::tempdir()?;
        let dir = tempfile::tempdir()?;
        touch(storage.path(), &["target.png"])?;
        std::os::unix::fs::symlink(storage.path().join("target.png"), dir.path().join("link.png"))?;
        std::os::unix::fs::symlink(storage.path().join("missing.png"), dir.path().join("dangling.png"))?;
        std::os::unix::fs::symlink(storage.path(), dir.path().join("dir.png"))?;

        let manifest = Manifest::scan(dir.path())?;
        assert_eq!(manifest.paths(), &[dir.path().join("link.png")]);
        Ok(())
    }

    #[test]
    fn from_paths_validates() -> Result<()> {
        let dir = tempfile::tempdir()?;
        touch(dir.path(), &["a.png", "b.txt"])?;

        assert_eq!(Manifest::from_paths(vec![dir.path().join("a.png")])?.len(), 1);
        assert!(Manifest::from_paths(vec![dir.path().join("b.txt")]).is_err());
        assert!(Manifest::from_paths(vec![dir.path().join("missing.png")]).is_err());
        Ok(())
    }

    #[test]
    fn split_is_disjoint_and_complete() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let names: Vec<_> = (0..10).map(|index| format!("{:02}.png", index)).collect();
        touch(
            dir.path(),
            &names.iter().map(|name| name.as_str()).collect::<Vec<_>>(),
        )?;
        let manifest = Manifest::scan(dir.path())?;

        let (kept, held) = manifest.clone().split(Ratio::try_from(0.2)?, 42);
        assert_eq!(kept.len(), 8);
        assert_eq!(held.len(), 2);

        let mut union: Vec<_> = kept.paths().iter().chain(held.paths()).cloned().collect();
        union.sort();
        assert_eq!(union, manifest.paths());

        let (kept2, held2) = manifest.clone().split(Ratio::try_from(0.2)?, 42);
        assert_eq!((kept2, held2), (kept, held));

        let (kept, held) = manifest.split(Ratio::try_from(0.01)?, 0);
        assert_eq!((kept.len(), held.len()), (9, 1));
        Ok(())
    }
}
