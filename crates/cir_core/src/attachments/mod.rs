use std::collections::HashSet;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::AppError;

/// Binary store for report attachments.
pub trait BlobStore {
    /// Store `bytes` under the relative `key` and return a URL that fetches them.
    fn put(&self, key: &str, bytes: &[u8]) -> Result<String, AppError>;
}

/// Filesystem-backed blob store. Blobs live under `root/<key>` and are served at
/// `<public_base_url>/files/<key>`, each key segment percent-encoded.
#[derive(Debug, Clone)]
pub struct FsBlobStore {
    root: PathBuf,
    public_base_url: String,
}

impl FsBlobStore {
    pub fn open(root: PathBuf, public_base_url: &str) -> Self {
        Self {
            root,
            public_base_url: public_base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn root(&self) -> &Path {
        self.root.as_path()
    }

    fn url_prefix(&self) -> String {
        format!("{}/files/", self.public_base_url)
    }

    fn url_for(&self, key: &str) -> String {
        let encoded: Vec<_> = key.split('/').map(urlencoding::encode).collect();
        format!("{}{}", self.url_prefix(), encoded.join("/"))
    }

    /// Read back a blob from a URL previously returned by [`BlobStore::put`].
    pub fn read(&self, url: &str) -> Result<Vec<u8>, AppError> {
        let encoded = url.strip_prefix(&self.url_prefix()).ok_or_else(|| {
            AppError::new("UPLOAD_NOT_FOUND", "URL does not belong to this blob store")
                .with_details(format!("url={url}"))
        })?;

        let mut path = self.root.clone();
        for seg in encoded.split('/') {
            let seg = urlencoding::decode(seg).map_err(|e| {
                AppError::new("UPLOAD_NOT_FOUND", "Invalid blob key")
                    .with_details(format!("url={url}; err={e}"))
            })?;
            if seg.is_empty() || seg == "." || seg == ".." || seg.contains(['/', '\\']) {
                return Err(AppError::new("UPLOAD_NOT_FOUND", "Invalid blob key")
                    .with_details(format!("url={url}")));
            }
            path.push(&*seg);
        }

        fs::read(&path).map_err(|e| {
            AppError::new("UPLOAD_NOT_FOUND", "Failed to read attachment")
                .with_details(format!("path={}; err={}", path.display(), e))
        })
    }
}

impl BlobStore for FsBlobStore {
    fn put(&self, key: &str, bytes: &[u8]) -> Result<String, AppError> {
        let path = self.root.join(key);
        let Some(dir) = path.parent() else {
            return Err(AppError::new("UPLOAD_FAILED", "Attachment path has no parent")
                .with_details(format!("key={key}")));
        };
        fs::create_dir_all(dir).map_err(|e| {
            AppError::new("UPLOAD_FAILED", "Failed to create attachment directory")
                .with_details(format!("path={}; err={}", dir.display(), e))
        })?;

        // The temp file is removed on drop, so a failed write or persist leaves nothing behind.
        let mut tmp = tempfile::Builder::new()
            .prefix(".upload-")
            .tempfile_in(dir)
            .map_err(|e| {
                AppError::new("UPLOAD_FAILED", "Failed to create attachment")
                    .with_details(format!("dir={}; err={}", dir.display(), e))
                    .with_retryable(true)
            })?;
        tmp.write_all(bytes).map_err(|e| {
            AppError::new("UPLOAD_FAILED", "Failed to write attachment")
                .with_details(format!("path={}; err={}", tmp.path().display(), e))
                .with_retryable(true)
        })?;
        tmp.persist(&path).map_err(|e| {
            AppError::new("UPLOAD_FAILED", "Failed to finalize attachment")
                .with_details(format!("path={}; err={}", path.display(), e.error))
        })?;

        Ok(self.url_for(key))
    }
}

/// Reduce a client-supplied filename to its last path component.
pub fn sanitize_filename(original: &str) -> Option<String> {
    let last = original
        .rsplit(|c: char| c == '/' || c == '\\')
        .next()
        .unwrap_or_default();
    let name: String = last.chars().filter(|c| !c.is_control()).collect();
    let name = name.trim();
    if name.is_empty() || name == "." || name == ".." {
        return None;
    }
    Some(name.to_string())
}

/// Sanitize `original` and make it unique among the names already in `taken`.
///
/// A repeated name gets a numeric prefix (`2-scan.pdf`, `3-scan.pdf`, ...). A name that
/// does not sanitize is returned unchanged so the upload can reject it.
pub fn claim_filename(original: &str, taken: &mut HashSet<String>) -> String {
    let Some(name) = sanitize_filename(original) else {
        return original.to_string();
    };
    let mut candidate = name.clone();
    let mut n = 2;
    while taken.contains(&candidate) {
        candidate = format!("{n}-{name}");
        n += 1;
    }
    taken.insert(candidate.clone());
    candidate
}

pub fn attachment_key(incident_id: i64, filename: &str) -> String {
    format!("incidents/{incident_id}/{filename}")
}

/// Store one attachment for an incident at `incidents/{incident_id}/{filename}`.
pub fn upload_attachment(
    blobs: &dyn BlobStore,
    incident_id: i64,
    original_filename: &str,
    bytes: &[u8],
) -> Result<String, AppError> {
    let filename = sanitize_filename(original_filename).ok_or_else(|| {
        AppError::new("UPLOAD_INVALID_NAME", "Attachment filename is empty")
            .with_details(format!("filename={original_filename:?}"))
    })?;
    let url = blobs.put(&attachment_key(incident_id, &filename), bytes)?;
    tracing::debug!(incident_id, filename = %filename, size = bytes.len(), "stored attachment");
    Ok(url)
}
