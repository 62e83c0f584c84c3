use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use rand::rngs::OsRng;
use rand::RngCore;
use tracing::{debug, warn};

use crate::error::{AppError, AppResult};
use crate::models::ValidatedUpload;
use crate::services::scratch::ScratchSpace;

/// Bytes of OS randomness behind each staged filename (32 hex characters).
pub const TOKEN_BYTES: usize = 16;

/// Writes validated uploads into scratch space under random names.
#[derive(Debug, Clone)]
pub struct Stager {
    scratch: ScratchSpace,
    max_bytes: usize,
}

impl Stager {
    pub fn new(scratch: ScratchSpace, max_bytes: usize) -> Self {
        Self { scratch, max_bytes }
    }

    pub fn max_bytes(&self) -> usize {
        self.max_bytes
    }

    pub fn scratch(&self) -> &ScratchSpace {
        &self.scratch
    }

    /// Persists `content` and returns the guard owning the new file.
    ///
    /// The client's filename contributes only its validated extension; the
    /// stem is a fresh random token, so nothing the client sends can steer
    /// the path outside scratch space or onto another request's file.
    pub fn stage(&self, content: &[u8], upload: &ValidatedUpload) -> AppResult<StagedFile> {
        if content.len() > self.max_bytes {
            return Err(AppError::PayloadTooLarge {
                limit_mb: self.max_bytes / (1024 * 1024),
            });
        }

        let file_name = format!("{}{}", random_token(), upload.extension);
        let path = self.scratch.path_for(&file_name);

        let file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .map_err(|e| stage_error("create", e))?;

        // From here on the guard owns the file, so a failed write still
        // removes what was created.
        let staged = persist(file, StagedFile::new(path), content)?;

        debug!(
            staged_name = %staged.file_name(),
            original_name = %upload.sanitized_name,
            bytes = content.len(),
            "Upload staged"
        );

        Ok(staged)
    }
}

fn random_token() -> String {
    let mut token = [0u8; TOKEN_BYTES];
    OsRng.fill_bytes(&mut token);
    hex::encode(token)
}

/// Writes `content` through `writer`, closing the handle before the guard
/// is dropped so a failed write never deletes a file that is still open.
fn persist<W: Write>(mut writer: W, staged: StagedFile, content: &[u8]) -> AppResult<StagedFile> {
    let written = writer.write_all(content).and_then(|_| writer.flush());
    drop(writer);

    match written {
        Ok(()) => Ok(staged),
        Err(e) => {
            drop(staged);
            Err(stage_error("write", e))
        }
    }
}

fn stage_error(action: &str, err: io::Error) -> AppError {
    AppError::internal(format!("failed to {} staged upload: {}", action, err))
}

/// A staged upload on disk. Removed exactly once: by [`StagedFile::release`]
/// or, failing that, on drop.
#[derive(Debug)]
pub struct StagedFile {
    path: PathBuf,
    released: bool,
}

impl StagedFile {
    fn new(path: PathBuf) -> Self {
        Self { path, released: false }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// Deletes the staged file. A file that is already gone counts as
    /// removed; any other failure is logged and does not affect the caller.
    pub fn release(mut self) {
        self.remove();
    }

    fn remove(&mut self) {
        if self.released {
            return;
        }
        self.released = true;

        match fs::remove_file(&self.path) {
            Ok(()) => debug!(staged_name = %self.file_name(), "Staged file removed"),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(staged_name = %self.file_name(), "Staged file already absent")
            }
            Err(e) => warn!(
                staged_name = %self.file_name(),
                error = %e,
                "Failed to remove staged file"
            ),
        }
    }
}

impl Drop for StagedFile {
    fn drop(&mut self) {
        self.remove();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn validated(name: &str) -> ValidatedUpload {
        ValidatedUpload {
            original_name: name.to_string(),
            sanitized_name: name.to_string(),
            extension: ".pdf".to_string(),
        }
    }

    fn stager(dir: &Path, max_bytes: usize) -> Stager {
        Stager::new(ScratchSpace::initialize(dir).unwrap(), max_bytes)
    }

    #[test]
    fn staged_name_is_random_hex_plus_extension() {
        let tmp = tempfile::tempdir().unwrap();
        let stager = stager(tmp.path(), 1024);

        let staged = stager.stage(b"%PDF-1.4", &validated("resume.pdf")).unwrap();
        let name = staged.file_name();

        assert_eq!(name.len(), TOKEN_BYTES * 2 + ".pdf".len());
        assert!(name.ends_with(".pdf"));
        assert!(name[..TOKEN_BYTES * 2].chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
        assert_eq!(staged.path().parent(), Some(stager.scratch().root()));
        assert_eq!(fs::read(staged.path()).unwrap(), b"%PDF-1.4");
    }

    #[test]
    fn names_never_repeat() {
        let tmp = tempfile::tempdir().unwrap();
        let stager = stager(tmp.path(), 1024);

        let first = stager.stage(b"a", &validated("same.pdf")).unwrap();
        let second = stager.stage(b"b", &validated("same.pdf")).unwrap();
        assert_ne!(first.file_name(), second.file_name());
        assert_eq!(stager.scratch().staged_count(), 2);
    }

    #[test]
    fn oversized_payload_writes_nothing() {
        let tmp = tempfile::tempdir().unwrap();
        let stager = stager(tmp.path(), 8);

        let result = stager.stage(&[0u8; 9], &validated("big.pdf"));
        assert!(matches!(result, Err(AppError::PayloadTooLarge { .. })));
        assert_eq!(stager.scratch().staged_count(), 0);
    }

    #[test]
    fn drop_and_release_both_clean_up() {
        let tmp = tempfile::tempdir().unwrap();
        let stager = stager(tmp.path(), 1024);

        let staged = stager.stage(b"x", &validated("a.pdf")).unwrap();
        let path = staged.path().to_path_buf();
        drop(staged);
        assert!(!path.exists());

        let staged = stager.stage(b"y", &validated("b.pdf")).unwrap();
        let path = staged.path().to_path_buf();
        staged.release();
        assert!(!path.exists());
        assert_eq!(stager.scratch().staged_count(), 0);
    }

    struct FullDisk;

    impl Write for FullDisk {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::Other, "no space left on device"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn failed_write_removes_created_file() {
        let tmp = tempfile::tempdir().unwrap();
        let stager = stager(tmp.path(), 1024);
        let path = stager.scratch().path_for("0123456789abcdef0123456789abcdef.pdf");
        fs::File::create(&path).unwrap();

        let result = persist(FullDisk, StagedFile::new(path.clone()), b"%PDF-1.4");

        match result {
            Err(AppError::Internal { message }) => assert!(message.contains("failed to write staged upload")),
            other => panic!("expected Internal, got {:?}", other),
        }
        assert!(!path.exists());
        assert_eq!(stager.scratch().staged_count(), 0);
    }

    #[test]
    fn staged_file_is_closed_when_returned() {
        let tmp = tempfile::tempdir().unwrap();
        let stager = stager(tmp.path(), 1024);

        let staged = stager.stage(b"%PDF-1.4", &validated("cv.pdf")).unwrap();
        // No handle is left open, so the file can be reopened for reading.
        let reopened = fs::OpenOptions::new().read(true).open(staged.path()).unwrap();
        drop(reopened);
        staged.release();
        assert_eq!(stager.scratch().staged_count(), 0);
    }

    #[test]
    fn release_tolerates_missing_file() {
        let tmp = tempfile::tempdir().unwrap();
        let stager = stager(tmp.path(), 1024);

        let staged = stager.stage(b"x", &validated("a.pdf")).unwrap();
        fs::remove_file(staged.path()).unwrap();
        staged.release();
    }
}
