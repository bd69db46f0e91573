//! PDFium library binding.
//!
//! `pdfium-render` loads the PDFium shared library at runtime. Resolution
//! order (first match wins):
//!
//! 1. `PDFIUM_LIB_PATH` — a library file, or a directory containing the
//!    platform library (`libpdfium.so`, `libpdfium.dylib`, `pdfium.dll`).
//! 2. The current working directory.
//! 3. `./lib/`.
//! 4. The system library search path.

use crate::error::FaceExtractError;
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Environment variable naming an existing PDFium library.
pub const PDFIUM_LIB_PATH_ENV: &str = "PDFIUM_LIB_PATH";

/// Bind to a PDFium library following the resolution order above.
pub fn bind_pdfium() -> Result<Pdfium, FaceExtractError> {
    let from_env = std::env::var(PDFIUM_LIB_PATH_ENV)
        .ok()
        .filter(|v| !v.is_empty())
        .and_then(|v| env_library(&v));
    if let Some(lib) = from_env {
        return bind_pdfium_from_path(&lib);
    }

    let bindings = Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
        .or_else(|_| {
            Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./lib/"))
        })
        .or_else(|_| Pdfium::bind_to_system_library())
        .map_err(|e| FaceExtractError::PdfiumBindingFailed(e.to_string()))?;

    debug!("Bound to PDFium");
    Ok(Pdfium::new(bindings))
}

/// Bind to a PDFium library at an explicit `path`.
pub fn bind_pdfium_from_path(path: &Path) -> Result<Pdfium, FaceExtractError> {
    debug!("Binding PDFium from {}", path.display());
    Pdfium::bind_to_library(path)
        .map(Pdfium::new)
        .map_err(|e| {
            FaceExtractError::PdfiumBindingFailed(format!("'{}': {}", path.display(), e))
        })
}

/// Resolve a `PDFIUM_LIB_PATH` value, warning when it names nothing.
fn env_library(value: &str) -> Option<PathBuf> {
    let lib = library_file(Path::new(value));
    if lib.exists() {
        return Some(lib);
    }
    warn!(
        "{} points to missing '{}'; falling back to the default search",
        PDFIUM_LIB_PATH_ENV,
        lib.display()
    );
    None
}

/// Turn a directory into the platform library path inside it.
fn library_file(path: &Path) -> PathBuf {
    if path.is_dir() {
        Pdfium::pdfium_platform_library_name_at_path(path)
    } else {
        path.to_path_buf()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn library_file_keeps_file_paths() {
        let p = Path::new("/opt/pdfium/lib/libpdfium.so");
        assert_eq!(library_file(p), p.to_path_buf());
    }

    #[test]
    fn library_file_expands_directories() {
        let dir = tempfile::tempdir().unwrap();
        let lib = library_file(dir.path());
        assert!(lib.starts_with(dir.path()));
        assert!(lib.to_string_lossy().contains("pdfium"));
    }

    /// Collects formatted log output for assertions.
    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl std::io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn env_library_accepts_existing_file() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let value = file.path().to_string_lossy().into_owned();
        assert_eq!(env_library(&value), Some(file.path().to_path_buf()));
    }

    #[test]
    fn env_library_warns_on_missing_path() {
        let captured = Captured::default();
        let writer = captured.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .finish();

        let resolved = tracing::subscriber::with_default(subscriber, || {
            env_library("/no/such/dir/libpdfium.so")
        });

        assert!(resolved.is_none());
        let logs = String::from_utf8(captured.0.lock().unwrap().clone()).unwrap();
        assert!(logs.contains("WARN"), "{logs}");
        assert!(logs.contains(PDFIUM_LIB_PATH_ENV), "{logs}");
    }
}
