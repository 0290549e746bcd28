//! Content blocks shared by tool results and resource reads.

use std::path::PathBuf;

use base64::{engine::general_purpose::STANDARD as BASE64_STANDARD, Engine as _};
use serde::Serialize;

/// A content block in a tool call result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Content {
    /// Plain text.
    Text {
        /// The text content.
        text: String,
    },
    /// An image, as a base64 data URL.
    Image {
        /// `data:{mime};base64,...`
        data: String,
        /// MIME type of the image.
        #[serde(rename = "mimeType")]
        mime_type: String,
    },
    /// An audio clip, as a base64 data URL.
    Audio {
        /// `data:{mime};base64,...`
        data: String,
        /// MIME type of the clip.
        #[serde(rename = "mimeType")]
        mime_type: String,
    },
    /// A link to a resource the client may read.
    ResourceLink {
        /// Resource URI.
        uri: String,
        /// Display name.
        name: String,
        /// Optional description.
        #[serde(skip_serializing_if = "Option::is_none")]
        description: Option<String>,
        /// Optional MIME type.
        #[serde(rename = "mimeType", skip_serializing_if = "Option::is_none")]
        mime_type: Option<String>,
    },
}

impl Content {
    /// Creates a text block.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    /// Creates an image or audio block, chosen by MIME prefix.
    #[must_use]
    pub fn media(bytes: &[u8], mime_type: &str) -> Self {
        let data = data_url(mime_type, bytes);
        let mime_type = mime_type.to_string();
        if mime_type.starts_with("audio/") {
            Self::Audio { data, mime_type }
        } else {
            Self::Image { data, mime_type }
        }
    }
}

impl From<ResourceLink> for Content {
    fn from(link: ResourceLink) -> Self {
        Self::ResourceLink {
            uri: link.uri,
            name: link.name,
            description: link.description,
            mime_type: link.mime_type,
        }
    }
}

/// Encodes bytes as a `data:` URL.
#[must_use]
pub fn data_url(mime_type: &str, bytes: &[u8]) -> String {
    format!("data:{mime_type};base64,{}", BASE64_STANDARD.encode(bytes))
}

/// Where binary content comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlobSource {
    /// Bytes already in memory.
    Bytes(Vec<u8>),
    /// A file read when the result is assembled.
    File(PathBuf),
}

impl BlobSource {
    /// Produces the bytes, reading the file if needed.
    ///
    /// # Errors
    ///
    /// Returns the I/O error if a file source cannot be read.
    pub async fn resolve(self) -> std::io::Result<Vec<u8>> {
        match self {
            Self::Bytes(bytes) => Ok(bytes),
            Self::File(path) => tokio::fs::read(&path).await,
        }
    }
}

impl From<Vec<u8>> for BlobSource {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Bytes(bytes)
    }
}

impl From<&[u8]> for BlobSource {
    fn from(bytes: &[u8]) -> Self {
        Self::Bytes(bytes.to_vec())
    }
}

impl From<PathBuf> for BlobSource {
    fn from(path: PathBuf) -> Self {
        Self::File(path)
    }
}

/// Binary output of a tool, with its MIME type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Blob {
    /// The payload.
    pub source: BlobSource,
    /// MIME type; `audio/*` becomes an audio block, anything else an image.
    pub mime_type: String,
}

impl Blob {
    /// Creates a blob.
    #[must_use]
    pub fn new(source: impl Into<BlobSource>, mime_type: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            mime_type: mime_type.into(),
        }
    }

    /// Resolves the payload into a content block.
    ///
    /// # Errors
    ///
    /// Returns the I/O error if a file source cannot be read.
    pub async fn into_content(self) -> std::io::Result<Content> {
        let bytes = self.source.resolve().await?;
        Ok(Content::media(&bytes, &self.mime_type))
    }
}

/// A pointer to a resource, returned from a tool instead of its contents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceLink {
    /// Resource URI.
    pub uri: String,
    /// Display name.
    pub name: String,
    /// Optional description.
    pub description: Option<String>,
    /// Optional MIME type.
    pub mime_type: Option<String>,
}

impl ResourceLink {
    /// Creates a link with just a URI and name.
    #[must_use]
    pub fn new(uri: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            name: name.into(),
            description: None,
            mime_type: None,
        }
    }

    /// Sets the description.
    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Sets the MIME type.
    #[must_use]
    pub fn mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn text_block_serialises() {
        let json = serde_json::to_value(Content::text("hi")).unwrap();
        assert_eq!(json, json!({"type": "text", "text": "hi"}));
    }

    #[test]
    fn media_kind_follows_mime_prefix() {
        assert!(matches!(
            Content::media(b"x", "audio/wav"),
            Content::Audio { .. }
        ));
        assert!(matches!(
            Content::media(b"x", "image/png"),
            Content::Image { .. }
        ));
    }

    #[test]
    fn media_data_is_a_data_url() {
        let json = serde_json::to_value(Content::media(b"hello", "image/png")).unwrap();
        assert_eq!(json["type"], "image");
        assert_eq!(json["mimeType"], "image/png");
        assert_eq!(json["data"], "data:image/png;base64,aGVsbG8=");
    }

    #[test]
    fn resource_link_serialises() {
        let link = ResourceLink::new("file:///a.txt", "a").mime_type("text/plain");
        let json = serde_json::to_value(Content::from(link)).unwrap();
        assert_eq!(
            json,
            json!({
                "type": "resource_link",
                "uri": "file:///a.txt",
                "name": "a",
                "mimeType": "text/plain"
            })
        );
    }

    #[tokio::test]
    async fn file_blob_is_read_on_resolve() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("beep.wav");
        std::fs::write(&path, b"RIFF").unwrap();

        let content = Blob::new(path, "audio/wav").into_content().await.unwrap();
        let Content::Audio { data, .. } = content else {
            panic!("expected audio block");
        };
        assert_eq!(data, "data:audio/wav;base64,UklGRg==");
    }

    #[tokio::test]
    async fn missing_file_blob_fails() {
        let blob = Blob::new(PathBuf::from("/definitely/not/here.png"), "image/png");
        assert!(blob.into_content().await.is_err());
    }
}
