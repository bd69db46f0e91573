//! Input validation: check that a user-supplied path is a readable PDF.
//!
//! pdfium reports every open failure through one opaque error, so the cheap
//! checks happen here first: the file must exist, be readable, and start
//! with the `%PDF` magic bytes. Callers then get `FileNotFound`,
//! `PermissionDenied` or `NotAPdf` instead of a generic parse failure.

use crate::error::FaceExtractError;
use std::fs::File;
use std::io::{ErrorKind, Read};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Validate a local file path, returning it unchanged on success.
pub fn resolve_local(path: &Path) -> Result<PathBuf, FaceExtractError> {
    let path = path.to_path_buf();

    if !path.exists() {
        return Err(FaceExtractError::FileNotFound { path });
    }

    match File::open(&path) {
        Ok(mut f) => {
            let mut magic = [0u8; 4];
            if f.read_exact(&mut magic).is_ok() && &magic != b"%PDF" {
                return Err(FaceExtractError::NotAPdf { path, magic });
            }
        }
        Err(e) if e.kind() == ErrorKind::PermissionDenied => {
            return Err(FaceExtractError::PermissionDenied { path });
        }
        Err(_) => {
            return Err(FaceExtractError::FileNotFound { path });
        }
    }

    debug!("Resolved local PDF: {}", path.display());
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn missing_file_is_not_found() {
        let err = resolve_local(Path::new("/definitely/not/a/real/file.pdf")).unwrap_err();
        assert!(matches!(err, FaceExtractError::FileNotFound { .. }));
    }

    #[test]
    fn wrong_magic_is_not_a_pdf() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(b"\x89PNG\r\n").unwrap();
        let err = resolve_local(f.path()).unwrap_err();
        match err {
            FaceExtractError::NotAPdf { magic, .. } => assert_eq!(&magic, b"\x89PNG"),
            other => panic!("expected NotAPdf, got {other:?}"),
        }
    }

    #[test]
    fn pdf_magic_is_accepted() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(b"%PDF-1.7\n%\xe2\xe3\xcf\xd3\n").unwrap();
        let resolved = resolve_local(f.path()).unwrap();
        assert_eq!(resolved, f.path());
    }
}
