//! Where a job's input media comes from.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use url::Url;
use validator::{Validate, ValidationError as FieldError};

use crate::error::ValidationError;

/// A file already uploaded into the upload area.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema, Validate)]
pub struct UploadedFile {
    /// Stored file name inside the upload directory
    #[validate(length(min = 1, max = 255), custom(function = "validate_file_name"))]
    pub filename: String,

    /// Name the client uploaded the file under
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(length(max = 512))]
    pub original_name: Option<String>,
}

/// A remote video page to fetch before processing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema, Validate)]
pub struct RemoteSource {
    #[validate(url, custom(function = "validate_remote_url"))]
    pub url: String,
}

/// Input reference for a job; immutable after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SourceRef {
    Upload(UploadedFile),
    Remote(RemoteSource),
}

impl SourceRef {
    pub fn upload(filename: impl Into<String>, original_name: Option<String>) -> Self {
        SourceRef::Upload(UploadedFile {
            filename: filename.into(),
            original_name,
        })
    }

    pub fn remote(url: impl Into<String>) -> Self {
        SourceRef::Remote(RemoteSource { url: url.into() })
    }

    /// Human-facing name used for downloads.
    pub fn display_name(&self) -> &str {
        match self {
            SourceRef::Upload(file) => file.original_name.as_deref().unwrap_or(&file.filename),
            SourceRef::Remote(remote) => &remote.url,
        }
    }

    /// Validate the payload once at the boundary.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let result = match self {
            SourceRef::Upload(file) => file.validate(),
            SourceRef::Remote(remote) => remote.validate(),
        };
        result.map_err(|e| ValidationError::invalid_source(e.to_string()))
    }
}

fn validate_file_name(value: &str) -> Result<(), FieldError> {
    let trimmed = value.trim();
    if trimmed.is_empty()
        || trimmed == "."
        || trimmed.contains("..")
        || trimmed.contains('/')
        || trimmed.contains('\\')
        || trimmed.contains('\0')
    {
        return Err(FieldError::new("file_name")
            .with_message("file name must be a plain name inside the upload area".into()));
    }
    Ok(())
}

/// Hosts remote sources may be fetched from.
const SUPPORTED_HOSTS: &[&str] = &["youtube.com", "www.youtube.com", "m.youtube.com", "youtu.be"];

fn validate_remote_url(value: &str) -> Result<(), FieldError> {
    let parsed = Url::parse(value).map_err(|_| FieldError::new("url"))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(FieldError::new("url_scheme").with_message("only http(s) URLs are supported".into()));
    }
    let host = parsed.host_str().unwrap_or_default().to_ascii_lowercase();
    if host.is_empty() {
        return Err(FieldError::new("url_host").with_message("URL has no host".into()));
    }
    if !SUPPORTED_HOSTS.contains(&host.as_str()) {
        return Err(FieldError::new("url_host")
            .with_message("only YouTube URLs are supported".into()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upload_validation() {
        assert!(SourceRef::upload("abc123", Some("clip.mp4".into())).validate().is_ok());
        assert!(SourceRef::upload("", None).validate().is_err());
        assert!(SourceRef::upload("../etc/passwd", None).validate().is_err());
        assert!(SourceRef::upload("nested/file.mp4", None).validate().is_err());
    }

    #[test]
    fn test_remote_validation() {
        assert!(SourceRef::remote("https://www.youtube.com/watch?v=abc").validate().is_ok());
        assert!(SourceRef::remote("ftp://example.com/video").validate().is_err());
        assert!(SourceRef::remote("not a url").validate().is_err());
        assert!(SourceRef::remote("https://youtu.be/abc").validate().is_ok());
        assert!(SourceRef::remote("https://M.YouTube.com/watch?v=abc").validate().is_ok());
        assert!(SourceRef::remote("https://example.com/v").validate().is_err());
        assert!(SourceRef::remote("https://youtube.com.evil.net/watch").validate().is_err());
    }

    #[test]
    fn test_source_serde_tagging() {
        let source = SourceRef::upload("f1", None);
        let json = serde_json::to_value(&source).unwrap();
        assert_eq!(json["kind"], "upload");
        assert_eq!(json["filename"], "f1");

        let back: SourceRef = serde_json::from_value(json).unwrap();
        assert_eq!(back, source);
        assert_eq!(back.display_name(), "f1");
    }
}
