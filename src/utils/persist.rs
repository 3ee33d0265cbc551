//! JSON documents on disk, replaced atomically.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::io::{self, Write};
use std::path::Path;

use tempfile::NamedTempFile;

/// Read a JSON document, returning `None` if the file does not exist
pub fn read_json<T: DeserializeOwned>(path: &Path) -> io::Result<Option<T>> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e),
    };
    let value = serde_json::from_slice(&bytes)?;
    Ok(Some(value))
}

/// Write a JSON document by writing a sibling temp file and renaming it over
/// `path`, so readers see either the old or the new document
pub fn write_json_atomic<T: Serialize + ?Sized>(path: &Path, value: &T) -> io::Result<()> {
    let parent = match path.parent().filter(|p| !p.as_os_str().is_empty()) {
        Some(parent) => parent,
        None => Path::new("."),
    };
    fs::create_dir_all(parent)?;

    let data = serde_json::to_vec_pretty(value)?;
    let mut tmp = NamedTempFile::new_in(parent)?;
    tmp.write_all(&data)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_round_trip_and_missing() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("doc.json");

        let missing: Option<Vec<String>> = read_json(&path).unwrap();
        assert!(missing.is_none());

        write_json_atomic(&path, &vec!["1", "2"]).unwrap();
        write_json_atomic(&path, &vec!["3"]).unwrap();
        let read: Option<Vec<String>> = read_json(&path).unwrap();
        assert_eq!(read, Some(vec!["3".to_string()]));

        let leftovers = fs::read_dir(path.parent().unwrap()).unwrap().count();
        assert_eq!(leftovers, 1);
    }

    #[test]
    fn test_corrupt_document_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("doc.json");
        fs::write(&path, "not json").unwrap();

        let result: io::Result<Option<Vec<String>>> = read_json(&path);
        assert_eq!(result.unwrap_err().kind(), io::ErrorKind::InvalidData);
    }
}
