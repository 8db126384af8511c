use crate::error::{Error, Result};
use crate::index::types::{IndexMeta, INDEX_VERSION, META_FILE};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// An index directory on disk.
///
/// The directory is an explicit resource: it is created empty for a build,
/// opened only once sealed (`meta.json` written last), and deleted by the
/// caller when no longer wanted or when a build aborted.
#[derive(Debug, Clone)]
pub struct IndexDir {
    path: PathBuf,
}

impl IndexDir {
    /// Create a fresh directory for a build.
    ///
    /// Fails if the directory already holds anything, sealed or not; a
    /// leftover partial build must be deleted first.
    pub fn create(path: &Path) -> Result<Self> {
        if path.exists() {
            let mut entries = fs::read_dir(path)?;
            if entries.next().is_some() {
                return Err(Error::build(format!(
                    "{} is not empty; delete it before building",
                    path.display()
                )));
            }
        } else {
            fs::create_dir_all(path)?;
        }

        Ok(Self {
            path: path.to_path_buf(),
        })
    }

    /// Open an existing, sealed index directory
    pub fn open(path: &Path) -> Result<Self> {
        if !path.is_dir() {
            return Err(Error::corrupt(path, "index directory does not exist"));
        }
        let dir = Self {
            path: path.to_path_buf(),
        };
        if !dir.is_sealed() {
            return Err(Error::corrupt(path, "no meta.json; the build never completed"));
        }
        Ok(dir)
    }

    /// Whether a sealed index lives at `path`
    pub fn exists(path: &Path) -> bool {
        path.join(META_FILE).is_file()
    }

    pub fn is_sealed(&self) -> bool {
        Self::exists(&self.path)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Path of a file inside the index
    pub fn file(&self, name: &str) -> PathBuf {
        self.path.join(name)
    }

    /// Remove the directory and everything in it
    pub fn delete(self) -> Result<()> {
        remove(&self.path)
    }

    pub fn read_meta(&self) -> Result<IndexMeta> {
        let meta_path = self.file(META_FILE);
        let file = File::open(&meta_path)?;
        let meta: IndexMeta = serde_json::from_reader(file)
            .map_err(|e| Error::corrupt(&self.path, format!("unreadable meta.json: {e}")))?;

        if meta.version != INDEX_VERSION {
            return Err(Error::corrupt(
                &self.path,
                format!(
                    "unsupported index version {} (expected {})",
                    meta.version, INDEX_VERSION
                ),
            ));
        }
        Ok(meta)
    }

    /// Write meta.json; this is the step that seals the index
    pub(crate) fn write_meta(&self, meta: &IndexMeta) -> Result<()> {
        let tmp_path = self.file("meta.json.tmp");
        let mut file = BufWriter::new(File::create(&tmp_path)?);
        serde_json::to_writer_pretty(&mut file, meta)?;
        file.flush()?;
        file.get_ref().sync_all()?;
        fs::rename(&tmp_path, self.file(META_FILE))?;
        Ok(())
    }
}

/// Remove an index directory by path; a missing directory is not an error
pub fn remove(path: &Path) -> Result<()> {
    if path.exists() {
        fs::remove_dir_all(path)?;
        tracing::info!("Removed index at {}", path.display());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_refuses_non_empty_dir() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(tmp.path().join("leftover.bin"), b"x").unwrap();
        assert!(matches!(
            IndexDir::create(tmp.path()),
            Err(Error::BuildAborted { .. })
        ));
    }

    #[test]
    fn test_unsealed_dir_cannot_be_opened() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("idx");
        let dir = IndexDir::create(&path).unwrap();
        assert!(!dir.is_sealed());
        assert!(matches!(
            IndexDir::open(&path),
            Err(Error::IndexCorrupt { .. })
        ));
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_failed_meta_write_does_not_seal() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("idx");
        let dir = IndexDir::create(&path).unwrap();
        // Every write to /dev/full fails with ENOSPC
        std::os::unix::fs::symlink("/dev/full", dir.file("meta.json.tmp")).unwrap();

        assert!(matches!(
            dir.write_meta(&IndexMeta::default()),
            Err(Error::Io(_))
        ));
        assert!(!dir.is_sealed());
    }

    #[test]
    fn test_meta_seals_and_delete_removes() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("idx");
        let dir = IndexDir::create(&path).unwrap();
        dir.write_meta(&IndexMeta::default()).unwrap();

        let opened = IndexDir::open(&path).unwrap();
        assert_eq!(opened.read_meta().unwrap().version, INDEX_VERSION);

        opened.delete().unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn test_wrong_version_is_corrupt() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = IndexDir::create(tmp.path()).unwrap();
        let meta = IndexMeta {
            version: INDEX_VERSION + 1,
            ..Default::default()
        };
        dir.write_meta(&meta).unwrap();
        assert!(matches!(
            dir.read_meta(),
            Err(Error::IndexCorrupt { .. })
        ));
    }
}
