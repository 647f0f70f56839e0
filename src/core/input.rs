//! Upload input abstraction.
//!
//! An [`UploadCandidate`] pairs a readable byte source with the metadata
//! the client reported about it. The validator only ever reads the source;
//! it never writes, renames or deletes it.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures::io::{AsyncRead, AsyncReadExt};

use crate::core::error::UploadError;
use crate::core::types::UploadContext;

/// Where the bytes of an upload live.
pub enum UploadSource {
    /// A file already materialized on disk (e.g. a multipart temp file).
    Path(PathBuf),

    /// In-memory bytes.
    Bytes(Vec<u8>),

    /// An async stream of bytes. Reading it consumes it.
    Stream(Arc<tokio::sync::Mutex<Box<dyn AsyncRead + Send + Unpin>>>),
}

impl std::fmt::Debug for UploadSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Path(path) => f.debug_tuple("Path").field(path).finish(),
            Self::Bytes(data) => f
                .debug_struct("Bytes")
                .field("data_len", &data.len())
                .finish(),
            Self::Stream(_) => f.debug_struct("Stream").finish_non_exhaustive(),
        }
    }
}

impl UploadSource {
    /// Reads at most `limit` bytes from the source.
    ///
    /// Callers pass one byte more than they are willing to accept so that
    /// oversized uploads are detected without buffering them whole.
    pub async fn read_bounded(&self, limit: u64) -> Result<Vec<u8>, UploadError> {
        match self {
            Self::Path(path) => read_path(path, limit).await,
            Self::Bytes(data) => {
                let end = usize::try_from(limit).unwrap_or(usize::MAX).min(data.len());
                Ok(data[..end].to_vec())
            }
            Self::Stream(reader) => {
                let mut guard = reader.lock().await;
                let mut buf = Vec::new();
                (&mut *guard).take(limit).read_to_end(&mut buf).await?;
                Ok(buf)
            }
        }
    }
}

async fn read_path(path: &Path, limit: u64) -> Result<Vec<u8>, UploadError> {
    use tokio::io::AsyncReadExt as _;

    let file = tokio::fs::File::open(path).await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            UploadError::FileNotFound {
                path: path.display().to_string(),
            }
        } else {
            UploadError::Io(e)
        }
    })?;

    let mut buf = Vec::new();
    file.take(limit).read_to_end(&mut buf).await?;
    Ok(buf)
}

/// A file submitted for validation, with client-reported metadata.
///
/// Only the byte content is trusted for type decisions. The filename is
/// used for the extension policy, the declared size for an early size
/// rejection, and everything else only for logging.
///
/// # Examples
///
/// ```rust
/// use uploadgate::core::UploadCandidate;
///
/// let candidate = UploadCandidate::from_bytes(b"%PDF-1.7".to_vec())
///     .with_category("document")
///     .with_filename("contract.pdf")
///     .with_declared_mime("application/pdf");
/// assert_eq!(candidate.category(), "document");
/// ```
#[derive(Debug)]
pub struct UploadCandidate {
    source: UploadSource,
    category: String,
    client_filename: String,
    declared_size: Option<u64>,
    declared_mime: Option<String>,
    context: UploadContext,
}

impl UploadCandidate {
    /// Creates a candidate from any source.
    pub fn new(source: UploadSource) -> Self {
        Self {
            source,
            category: String::new(),
            client_filename: String::new(),
            declared_size: None,
            declared_mime: None,
            context: UploadContext::default(),
        }
    }

    /// Creates a candidate backed by a file path.
    ///
    /// The client filename defaults to the path's file name.
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let filename = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
            .to_string();
        Self::new(UploadSource::Path(path)).with_filename(filename)
    }

    /// Creates a candidate from in-memory bytes.
    pub fn from_bytes(data: impl Into<Vec<u8>>) -> Self {
        Self::new(UploadSource::Bytes(data.into()))
    }

    /// Creates a candidate from an async reader.
    pub fn from_stream(reader: impl AsyncRead + Send + Unpin + 'static) -> Self {
        Self::new(UploadSource::Stream(Arc::new(tokio::sync::Mutex::new(
            Box::new(reader),
        ))))
    }

    /// Sets the declared category (e.g. "image", "document").
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    /// Sets the client-supplied filename.
    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.client_filename = filename.into();
        self
    }

    /// Sets the client-declared size in bytes.
    pub fn with_declared_size(mut self, size: u64) -> Self {
        self.declared_size = Some(size);
        self
    }

    /// Sets the client-declared content type.
    pub fn with_declared_mime(mut self, mime: impl Into<String>) -> Self {
        self.declared_mime = Some(mime.into());
        self
    }

    /// Sets the request context used in audit events.
    pub fn with_context(mut self, context: UploadContext) -> Self {
        self.context = context;
        self
    }

    /// Returns the byte source.
    pub fn source(&self) -> &UploadSource {
        &self.source
    }

    /// Returns the declared category.
    pub fn category(&self) -> &str {
        &self.category
    }

    /// Returns the client-supplied filename.
    pub fn client_filename(&self) -> &str {
        &self.client_filename
    }

    /// Returns the client-declared size, if any.
    pub fn declared_size(&self) -> Option<u64> {
        self.declared_size
    }

    /// Returns the client-declared content type, if any.
    pub fn declared_mime(&self) -> Option<&str> {
        self.declared_mime.as_deref()
    }

    /// Returns the request context.
    pub fn context(&self) -> &UploadContext {
        &self.context
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[tokio::test]
    async fn test_read_bytes_bounded() {
        let source = UploadSource::Bytes(vec![1, 2, 3, 4, 5]);
        assert_eq!(source.read_bounded(3).await.unwrap(), vec![1, 2, 3]);
        assert_eq!(source.read_bounded(100).await.unwrap(), vec![1, 2, 3, 4, 5]);
    }

    #[tokio::test]
    async fn test_read_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"on disk").unwrap();

        let candidate = UploadCandidate::from_path(file.path());
        let data = candidate.source().read_bounded(1024).await.unwrap();
        assert_eq!(data, b"on disk");
        assert!(file.path().exists());
    }

    #[tokio::test]
    async fn test_read_missing_path() {
        let source = UploadSource::Path(PathBuf::from("/definitely/not/here.png"));
        let err = source.read_bounded(16).await.unwrap_err();
        assert!(matches!(err, UploadError::FileNotFound { .. }));
    }

    #[tokio::test]
    async fn test_read_stream_bounded() {
        let reader = futures::io::Cursor::new(vec![7u8; 64]);
        let candidate = UploadCandidate::from_stream(reader);
        let data = candidate.source().read_bounded(10).await.unwrap();
        assert_eq!(data.len(), 10);
    }

    #[test]
    fn test_candidate_metadata() {
        let candidate = UploadCandidate::from_path("/tmp/uploads/photo.JPG")
            .with_category("image")
            .with_declared_size(2048)
            .with_declared_mime("image/jpeg");

        assert_eq!(candidate.client_filename(), "photo.JPG");
        assert_eq!(candidate.category(), "image");
        assert_eq!(candidate.declared_size(), Some(2048));
        assert_eq!(candidate.declared_mime(), Some("image/jpeg"));
    }
}
