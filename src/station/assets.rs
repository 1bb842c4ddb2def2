//! Song asset lookup

use std::path::PathBuf;

use crate::error::StationError;

/// Maps song identifiers to files named `bird{id}.{extension}`
#[derive(Debug, Clone)]
pub struct AssetLocator {
    dir: PathBuf,
    extension: String,
}

impl AssetLocator {
    pub fn new(dir: impl Into<PathBuf>, extension: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            extension: extension.into(),
        }
    }

    /// Path a song would live at, whether or not it exists
    pub fn path_for(&self, song_id: i32) -> PathBuf {
        self.dir.join(format!("bird{}.{}", song_id, self.extension))
    }

    /// Resolve a song to an existing file
    pub fn resolve(&self, song_id: i32) -> Result<PathBuf, StationError> {
        let path = self.path_for(song_id);
        if path.is_file() {
            Ok(path)
        } else {
            Err(StationError::AssetNotFound(path))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use tempfile::tempdir;

    #[test]
    fn test_path_layout() {
        let locator = AssetLocator::new("audios", "wav");
        assert_eq!(locator.path_for(7), Path::new("audios").join("bird7.wav"));
        assert_eq!(locator.path_for(-1), Path::new("audios").join("bird-1.wav"));
    }

    #[test]
    fn test_resolve_existing() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("bird3.wav"), b"").unwrap();

        let locator = AssetLocator::new(dir.path(), "wav");
        assert_eq!(locator.resolve(3).unwrap(), dir.path().join("bird3.wav"));
    }

    #[test]
    fn test_resolve_missing() {
        let dir = tempdir().unwrap();
        let locator = AssetLocator::new(dir.path(), "wav");

        match locator.resolve(9) {
            Err(StationError::AssetNotFound(path)) => assert!(path.ends_with("bird9.wav")),
            other => panic!("expected AssetNotFound, got {:?}", other),
        }
    }

    #[test]
    fn test_directory_is_not_an_asset() {
        let dir = tempdir().unwrap();
        std::fs::create_dir(dir.path().join("bird4.wav")).unwrap();

        let locator = AssetLocator::new(dir.path(), "wav");
        assert!(locator.resolve(4).is_err());
    }
}
