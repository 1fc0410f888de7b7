use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use super::ObjectStore;
use crate::error::{Error, Result};

/// Object store backed by a directory mirroring the bucket layout
pub struct LocalStore {
    root: PathBuf,
}

impl LocalStore {
    pub fn new(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl ObjectStore for LocalStore {
    fn get_object(&self, path: &str) -> Result<Vec<u8>> {
        let full_path = self.root.join(path);
        std::fs::read(&full_path).map_err(|source| match source.kind() {
            ErrorKind::NotFound => Error::ObjectNotFound(path.to_string()),
            _ => Error::Io {
                path: full_path,
                source,
            },
        })
    }

    fn store_name(&self) -> &'static str {
        "local"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_get_object() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("blob"), [1u8, 2, 3]).unwrap();

        let store = LocalStore::new(dir.path());
        assert_eq!(store.get_object("blob").unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn test_missing_object() {
        let dir = tempdir().unwrap();
        let store = LocalStore::new(dir.path());

        match store.get_object("images/small/nope.jpg") {
            Err(Error::ObjectNotFound(path)) => assert_eq!(path, "images/small/nope.jpg"),
            other => panic!("expected ObjectNotFound, got {:?}", other),
        }
    }

    #[test]
    fn test_directory_is_io_error() {
        let dir = tempdir().unwrap();
        std::fs::create_dir(dir.path().join("images")).unwrap();

        let store = LocalStore::new(dir.path());
        assert!(store.get_object("images").is_err());
    }
}
