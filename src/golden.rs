//! Golden-file comparison for tests.
//!
//! A test renders its result, and [`assert_json`] compares it against a file
//! saved earlier under `testdata/`. Paths without a `testdata` segment get
//! one prepended, relative to the crate root (the working directory of
//! `cargo test`).
//!
//! # Workflow
//! 1. Write the test with [`assert_json`]; it fails because no golden file
//!    exists yet.
//! 2. Re-run just that test with `UPDATE_GOLDEN=1` to write the file.
//! 3. Review the file and commit it.
//! 4. When output changes on purpose, repeat step 2 and review the diff.

use std::fmt::Debug;
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

/// Environment variable that switches comparisons into update mode.
pub const UPDATE_ENV: &str = "UPDATE_GOLDEN";

const TESTDATA: &str = "testdata";

#[derive(Debug, Error)]
pub enum GoldenError {
    #[error("unable to load golden file {}: {source}", path.display())]
    Load { path: PathBuf, source: io::Error },

    #[error("unable to write golden file {}: {source}", path.display())]
    Save { path: PathBuf, source: io::Error },

    #[error("{name}: golden file {} is not valid for this type: {source}", path.display())]
    Decode {
        name: String,
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("{name}: unable to encode actual value: {source}")]
    Encode {
        name: String,
        source: serde_json::Error,
    },

    #[error("{name}: actual differs from {}\n expected: {expected}\n   actual: {actual}", path.display())]
    Mismatch {
        name: String,
        path: PathBuf,
        expected: String,
        actual: String,
    },
}

/// Whether `UPDATE_GOLDEN` asks for golden files to be rewritten.
pub fn update_requested() -> bool {
    std::env::var(UPDATE_ENV)
        .map(|v| matches!(v.as_str(), "1" | "true" | "TRUE" | "yes"))
        .unwrap_or(false)
}

/// `path` itself if it already sits below a `testdata` directory, otherwise
/// `testdata/<path>`.
pub fn golden_path(path: impl AsRef<Path>) -> PathBuf {
    let path = path.as_ref();
    let in_testdata = path
        .components()
        .any(|c| matches!(c, Component::Normal(s) if s == TESTDATA));
    if in_testdata {
        path.to_path_buf()
    } else {
        Path::new(TESTDATA).join(path)
    }
}

/// Golden-file store, in compare or update mode.
#[derive(Debug, Clone, Copy)]
pub struct Golden {
    update: bool,
}

impl Golden {
    /// Mode taken from `UPDATE_GOLDEN`.
    pub fn from_env() -> Self {
        Self {
            update: update_requested(),
        }
    }

    /// Explicit mode; `true` rewrites files before comparing.
    pub fn updating(update: bool) -> Self {
        Self { update }
    }

    pub fn is_updating(&self) -> bool {
        self.update
    }

    pub fn load(&self, path: impl AsRef<Path>) -> Result<Vec<u8>, GoldenError> {
        let path = golden_path(path);
        fs::read(&path).map_err(|source| GoldenError::Load { path, source })
    }

    /// Write `contents`, creating the parent directory if needed.
    pub fn save(&self, path: impl AsRef<Path>, contents: &[u8]) -> Result<(), GoldenError> {
        let path = golden_path(path);
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir).map_err(|source| GoldenError::Save {
                path: path.clone(),
                source,
            })?;
        }
        fs::write(&path, contents).map_err(|source| GoldenError::Save { path, source })
    }

    /// Compare `actual` with the value stored as JSON at `path`.
    ///
    /// The stored file is decoded back into `T` before comparing, so
    /// formatting differences in the file do not matter. In update mode the
    /// file is first rewritten as pretty-printed JSON of `actual`.
    pub fn compare_json<T>(&self, name: &str, path: impl AsRef<Path>, actual: &T) -> Result<(), GoldenError>
    where
        T: Serialize + DeserializeOwned + PartialEq + Debug,
    {
        let path = golden_path(path);
        if self.update {
            let encoded = serde_json::to_vec_pretty(actual).map_err(|source| GoldenError::Encode {
                name: name.to_string(),
                source,
            })?;
            self.save(&path, &encoded)?;
        }

        let bytes = self.load(&path)?;
        let expected: T = serde_json::from_slice(&bytes).map_err(|source| GoldenError::Decode {
            name: name.to_string(),
            path: path.clone(),
            source,
        })?;

        if &expected != actual {
            return Err(GoldenError::Mismatch {
                name: name.to_string(),
                path,
                expected: format!("{expected:?}"),
                actual: format!("{actual:?}"),
            });
        }
        Ok(())
    }

    /// Compare raw bytes with the file at `path`.
    pub fn compare_bytes(&self, name: &str, path: impl AsRef<Path>, actual: &[u8]) -> Result<(), GoldenError> {
        let path = golden_path(path);
        if self.update {
            self.save(&path, actual)?;
        }

        let expected = self.load(&path)?;
        if expected != actual {
            return Err(GoldenError::Mismatch {
                name: name.to_string(),
                path,
                expected: String::from_utf8_lossy(&expected).into_owned(),
                actual: String::from_utf8_lossy(actual).into_owned(),
            });
        }
        Ok(())
    }
}

/// Test assertion over [`Golden::compare_json`] in the mode set by the
/// environment. Panics with the difference on mismatch.
#[track_caller]
pub fn assert_json<T>(name: &str, path: impl AsRef<Path>, actual: &T)
where
    T: Serialize + DeserializeOwned + PartialEq + Debug,
{
    if let Err(e) = Golden::from_env().compare_json(name, path, actual) {
        panic!("golden mismatch: {e}\nre-run with {UPDATE_ENV}=1 if the change is intended");
    }
}

/// Byte-for-byte variant of [`assert_json`].
#[track_caller]
pub fn assert_bytes(name: &str, path: impl AsRef<Path>, actual: &[u8]) {
    if let Err(e) = Golden::from_env().compare_bytes(name, path, actual) {
        panic!("golden mismatch: {e}\nre-run with {UPDATE_ENV}=1 if the change is intended");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Simple {
        int: i64,
        float: f64,
        string: String,
    }

    fn simple() -> Simple {
        Simple {
            int: 1,
            float: std::f64::consts::PI,
            string: "Foo".to_string(),
        }
    }

    fn scratch() -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let testdata = dir.path().join(TESTDATA);
        (dir, testdata)
    }

    #[test]
    fn paths_are_kept_under_testdata() {
        assert_eq!(golden_path("a.json"), PathBuf::from("testdata/a.json"));
        assert_eq!(golden_path("sub/a.json"), PathBuf::from("testdata/sub/a.json"));
        assert_eq!(golden_path("testdata/a.json"), PathBuf::from("testdata/a.json"));
        assert_eq!(
            golden_path("../other/testdata/a.json"),
            PathBuf::from("../other/testdata/a.json")
        );
        // A file merely named like the directory does not count.
        assert_eq!(golden_path("testdata.json"), PathBuf::from("testdata/testdata.json"));
    }

    #[test]
    fn update_writes_pretty_json_then_compares() {
        let (_dir, testdata) = scratch();
        let path = testdata.join("nested/simple.json");

        Golden::updating(true)
            .compare_json("simple", &path, &simple())
            .unwrap();

        let written = String::from_utf8(fs::read(&path).unwrap()).unwrap();
        assert!(written.contains("\n  \"int\": 1"));
        assert!(written.contains("\"string\": \"Foo\""));

        Golden::updating(false)
            .compare_json("simple", &path, &simple())
            .unwrap();
    }

    #[test]
    fn formatting_of_stored_json_is_irrelevant() {
        let (_dir, testdata) = scratch();
        let path = testdata.join("compact.json");
        let store = Golden::updating(false);
        store
            .save(&path, br#"{"string":"Foo","int":1,"float":3.141592653589793}"#)
            .unwrap();

        store.compare_json("compact", &path, &simple()).unwrap();
    }

    #[test]
    fn mismatch_names_the_test_and_both_values() {
        let (_dir, testdata) = scratch();
        let path = testdata.join("int.json");
        let store = Golden::updating(false);
        store.save(&path, b"1").unwrap();

        let err = store.compare_json("int", &path, &2).unwrap_err();
        assert!(matches!(err, GoldenError::Mismatch { .. }));
        let text = err.to_string();
        assert!(text.starts_with("int: actual differs"));
        assert!(text.contains("expected: 1"));
        assert!(text.contains("actual: 2"));
    }

    #[test]
    fn missing_file_fails_to_load() {
        let (_dir, testdata) = scratch();
        let err = Golden::updating(false)
            .compare_json("absent", testdata.join("absent.json"), &1)
            .unwrap_err();
        assert!(matches!(err, GoldenError::Load { source, .. } if source.kind() == io::ErrorKind::NotFound));
    }

    #[test]
    fn stored_value_of_wrong_shape_is_a_decode_error() {
        let (_dir, testdata) = scratch();
        let path = testdata.join("string.json");
        let store = Golden::updating(false);
        store.save(&path, br#""foo""#).unwrap();

        let err = store.compare_json("string", &path, &simple()).unwrap_err();
        assert!(matches!(err, GoldenError::Decode { .. }));
    }

    #[test]
    fn bytes_compare_exactly() {
        let (_dir, testdata) = scratch();
        let path = testdata.join("raw.txt");

        Golden::updating(true)
            .compare_bytes("raw", &path, b"line one\n")
            .unwrap();
        let err = Golden::updating(false)
            .compare_bytes("raw", &path, b"line one")
            .unwrap_err();
        assert!(matches!(err, GoldenError::Mismatch { .. }));
    }
}
