//! Input resolution: turn a user-supplied path or URL into an on-disk PDF.
//!
//! pdfium only opens file-system paths, so URL inputs are fetched into a
//! temporary directory first. The [`ResolvedInput`] keeps the `TempDir`
//! handle alive for the lifetime of the run; dropping it removes the
//! download, including on panic. Both branches verify the `%PDF` magic
//! before handing the path onward — a statement portal that answers an
//! expired link with an HTML error page should fail here with a clear
//! message, not deep inside pdfium.

use crate::error::ExtractError;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::{debug, info};

/// A statement PDF with a local path, however it arrived.
#[derive(Debug)]
pub enum ResolvedInput {
    Local(PathBuf),
    /// Fetched from a URL; the temp directory is removed on drop.
    Downloaded { path: PathBuf, _temp_dir: TempDir },
}

impl ResolvedInput {
    pub fn path(&self) -> &Path {
        match self {
            ResolvedInput::Local(p) => p,
            ResolvedInput::Downloaded { path, .. } => path,
        }
    }
}

/// Whether the input string should be treated as a URL rather than a path.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Resolve `input` to a validated local PDF path, downloading if needed.
pub async fn resolve_input(input: &str, timeout_secs: u64) -> Result<ResolvedInput, ExtractError> {
    if input.trim().is_empty() {
        return Err(ExtractError::InvalidInput {
            input: input.to_string(),
        });
    }
    if is_url(input) {
        fetch_url(input, timeout_secs).await
    } else {
        resolve_local(input)
    }
}

fn resolve_local(path_str: &str) -> Result<ResolvedInput, ExtractError> {
    let path = PathBuf::from(path_str);

    if !path.exists() {
        return Err(ExtractError::FileNotFound { path });
    }

    let magic = match read_magic(&path) {
        Ok(m) => m,
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(ExtractError::PermissionDenied { path });
        }
        Err(_) => return Err(ExtractError::FileNotFound { path }),
    };
    check_magic(magic, &path)?;

    debug!("Using local statement PDF {}", path.display());
    Ok(ResolvedInput::Local(path))
}

async fn fetch_url(url: &str, timeout_secs: u64) -> Result<ResolvedInput, ExtractError> {
    info!("Fetching statement from {}", url);

    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| download_failed(url, e.to_string()))?;

    let response = client.get(url).send().await.map_err(|e| {
        if e.is_timeout() {
            ExtractError::DownloadTimeout {
                url: url.to_string(),
                secs: timeout_secs,
            }
        } else {
            download_failed(url, e.to_string())
        }
    })?;

    if !response.status().is_success() {
        return Err(download_failed(url, format!("HTTP {}", response.status())));
    }

    let body = response
        .bytes()
        .await
        .map_err(|e| download_failed(url, e.to_string()))?;

    let temp_dir = TempDir::new().map_err(|e| ExtractError::Internal(e.to_string()))?;
    let pdf_path = temp_dir.path().join("statement.pdf");

    if body.len() >= 4 {
        let mut magic = [0u8; 4];
        magic.copy_from_slice(&body[..4]);
        check_magic(magic, &pdf_path)?;
    }

    tokio::fs::write(&pdf_path, &body)
        .await
        .map_err(|e| ExtractError::Internal(format!("writing download: {e}")))?;

    info!("Fetched {} bytes to {}", body.len(), pdf_path.display());

    Ok(ResolvedInput::Downloaded {
        path: pdf_path,
        _temp_dir: temp_dir,
    })
}

fn read_magic(path: &Path) -> std::io::Result<[u8; 4]> {
    use std::io::Read;
    let mut f = std::fs::File::open(path)?;
    let mut magic = [0u8; 4];
    // A file shorter than 4 bytes cannot be a PDF either; report its
    // actual leading bytes.
    let n = f.read(&mut magic)?;
    magic[n..].fill(0);
    Ok(magic)
}

fn check_magic(magic: [u8; 4], path: &Path) -> Result<(), ExtractError> {
    if &magic == b"%PDF" {
        Ok(())
    } else {
        Err(ExtractError::NotAPdf {
            path: path.to_path_buf(),
            magic,
        })
    }
}

fn download_failed(url: &str, reason: String) -> ExtractError {
    ExtractError::DownloadFailed {
        url: url.to_string(),
        reason,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn url_detection() {
        assert!(is_url("https://bank.example/statement.pdf"));
        assert!(is_url("http://bank.example/statement.pdf"));
        assert!(!is_url("statement.pdf"));
        assert!(!is_url("/data/statement.pdf"));
        assert!(!is_url("ftp://bank.example/statement.pdf"));
    }

    #[tokio::test]
    async fn empty_input_is_rejected() {
        let err = resolve_input("   ", 120).await.unwrap_err();
        assert!(matches!(err, ExtractError::InvalidInput { .. }));
    }

    #[test]
    fn missing_file_is_fatal() {
        let err = resolve_local("/definitely/not/here.pdf").unwrap_err();
        assert!(matches!(err, ExtractError::FileNotFound { .. }));
    }

    #[test]
    fn html_masquerading_as_pdf_is_rejected() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(b"<!DOCTYPE html><html>session expired</html>")
            .unwrap();
        let err = resolve_local(f.path().to_str().unwrap()).unwrap_err();
        assert!(matches!(err, ExtractError::NotAPdf { .. }));
    }

    #[test]
    fn pdf_magic_is_accepted() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(b"%PDF-1.7 ...").unwrap();
        let resolved = resolve_local(f.path().to_str().unwrap()).unwrap();
        assert_eq!(resolved.path(), f.path());
    }

    #[test]
    fn short_file_is_not_a_pdf() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(b"%P").unwrap();
        let err = resolve_local(f.path().to_str().unwrap()).unwrap_err();
        assert!(matches!(err, ExtractError::NotAPdf { .. }));
    }
}
