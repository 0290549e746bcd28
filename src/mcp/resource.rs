//! Readable resources.
//!
//! A resource is addressed by URI. A URI containing `{placeholder}` segments
//! makes the resource a template: it is listed by `resources/templates/list`
//! instead of `resources/list`, and reads of any URI matching the pattern
//! reach its handler with the extracted values in
//! [`ResourceContext::params`].

use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;
use indexmap::IndexMap;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::mcp::content::{data_url, BlobSource};
use crate::mcp::error::{BoxError, McpError, McpResult};
use crate::mcp::template::UriTemplate;

/// Async read handler.
pub type ResourceHandler =
    Arc<dyn Fn(ResourceContext) -> BoxFuture<'static, Result<ResourceOutput, BoxError>> + Send + Sync>;

/// What a read handler receives.
#[derive(Debug, Clone)]
pub struct ResourceContext {
    /// The URI being read.
    pub uri: String,
    /// Caller session.
    pub session_id: String,
    /// Placeholder values when the resource is a template.
    pub params: IndexMap<String, String>,
}

/// What a read handler returns.
#[derive(Debug, Clone, PartialEq)]
pub enum ResourceOutput {
    /// Text, tagged with the resource's MIME type.
    Text(String),
    /// Binary payload; requires the resource to declare a MIME type.
    Binary(BlobSource),
    /// Arbitrary JSON. Only a JSON string is readable; anything else is
    /// reported as not found.
    Json(Value),
}

impl From<String> for ResourceOutput {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<&str> for ResourceOutput {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<Vec<u8>> for ResourceOutput {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Binary(BlobSource::Bytes(bytes))
    }
}

/// One entry of a `resources/read` result.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ResourceContents {
    /// Text contents.
    Text {
        /// Source URI.
        uri: String,
        /// MIME type, if declared.
        #[serde(rename = "mimeType", skip_serializing_if = "Option::is_none")]
        mime_type: Option<String>,
        /// The text.
        text: String,
        /// Resource metadata.
        #[serde(rename = "_meta", skip_serializing_if = "Map::is_empty")]
        meta: Map<String, Value>,
    },
    /// Binary contents as a base64 data URL.
    Blob {
        /// Source URI.
        uri: String,
        /// MIME type.
        #[serde(rename = "mimeType")]
        mime_type: String,
        /// `data:{mime};base64,...`
        blob: String,
        /// Resource metadata.
        #[serde(rename = "_meta", skip_serializing_if = "Map::is_empty")]
        meta: Map<String, Value>,
    },
}

/// Result of `resources/read`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReadResourceResult {
    /// The contents read.
    pub contents: Vec<ResourceContents>,
}

/// `resources/list` entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceInfo {
    /// Concrete URI.
    pub uri: String,
    /// Registry name.
    pub name: String,
    /// Description.
    pub description: String,
    /// MIME type, if declared.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    /// Resource metadata.
    #[serde(rename = "_meta", skip_serializing_if = "Map::is_empty")]
    pub meta: Map<String, Value>,
}

/// `resources/templates/list` entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceTemplateInfo {
    /// URI template.
    pub uri_template: String,
    /// Registry name.
    pub name: String,
    /// Description.
    pub description: String,
    /// MIME type, if declared.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    /// Resource metadata.
    #[serde(rename = "_meta", skip_serializing_if = "Map::is_empty")]
    pub meta: Map<String, Value>,
}

/// A resource's protocol description.
#[derive(Debug, Clone, PartialEq)]
pub enum ResourceDescriptor {
    /// Listed by `resources/list`.
    Concrete(ResourceInfo),
    /// Listed by `resources/templates/list`.
    Template(ResourceTemplateInfo),
}

/// A readable resource.
#[derive(Clone)]
pub struct Resource {
    uri: String,
    description: String,
    mime_type: Option<String>,
    metadata: Map<String, Value>,
    template: Option<UriTemplate>,
    handler: Option<ResourceHandler>,
}

impl std::fmt::Debug for Resource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resource")
            .field("uri", &self.uri)
            .field("description", &self.description)
            .field("mime_type", &self.mime_type)
            .field("has_handler", &self.handler.is_some())
            .finish_non_exhaustive()
    }
}

impl Resource {
    /// Starts building a resource at `uri`.
    #[must_use]
    pub fn builder(uri: impl Into<String>, description: impl Into<String>) -> ResourceBuilder {
        let uri = uri.into();
        ResourceBuilder {
            resource: Self {
                template: UriTemplate::parse(&uri),
                uri,
                description: description.into(),
                mime_type: None,
                metadata: Map::new(),
                handler: None,
            },
        }
    }

    /// The declared URI (literal or template).
    #[must_use]
    pub fn uri(&self) -> &str {
        &self.uri
    }

    /// The description.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// The declared MIME type.
    #[must_use]
    pub fn mime_type(&self) -> Option<&str> {
        self.mime_type.as_deref()
    }

    /// Opaque metadata.
    #[must_use]
    pub const fn metadata(&self) -> &Map<String, Value> {
        &self.metadata
    }

    /// The parsed template, for templated resources.
    #[must_use]
    pub const fn template(&self) -> Option<&UriTemplate> {
        self.template.as_ref()
    }

    /// Returns `true` for templated resources.
    #[must_use]
    pub const fn is_template(&self) -> bool {
        self.template.is_some()
    }

    /// Builds the protocol description under registry name `name`.
    #[must_use]
    pub fn describe(&self, name: &str) -> ResourceDescriptor {
        if self.is_template() {
            ResourceDescriptor::Template(ResourceTemplateInfo {
                uri_template: self.uri.clone(),
                name: name.to_string(),
                description: self.description.clone(),
                mime_type: self.mime_type.clone(),
                meta: self.metadata.clone(),
            })
        } else {
            ResourceDescriptor::Concrete(ResourceInfo {
                uri: self.uri.clone(),
                name: name.to_string(),
                description: self.description.clone(),
                mime_type: self.mime_type.clone(),
                meta: self.metadata.clone(),
            })
        }
    }

    /// Reads the resource at `uri`.
    ///
    /// # Errors
    ///
    /// - `ResourceNotFound` if there is no handler or it returned a value
    ///   that is neither text nor binary
    /// - `InternalError` for binary output without a declared MIME type,
    ///   unreadable files, or handler failures
    /// - any protocol error the handler returned itself
    pub async fn read(&self, uri: &str, session_id: &str) -> McpResult<ReadResourceResult> {
        let Some(handler) = &self.handler else {
            return Err(McpError::resource_not_found(uri));
        };

        let ctx = ResourceContext {
            uri: uri.to_string(),
            session_id: session_id.to_string(),
            params: self
                .template
                .as_ref()
                .and_then(|t| t.matches(uri))
                .unwrap_or_default(),
        };

        let output = handler(ctx).await.map_err(McpError::from_handler)?;

        let contents = match output {
            ResourceOutput::Text(text) | ResourceOutput::Json(Value::String(text)) => {
                ResourceContents::Text {
                    uri: uri.to_string(),
                    mime_type: self.mime_type.clone(),
                    text,
                    meta: self.metadata.clone(),
                }
            }
            ResourceOutput::Binary(source) => {
                let Some(mime_type) = self.mime_type.clone() else {
                    tracing::error!(uri, "Binary resource content without a MIME type");
                    return Err(McpError::internal(
                        "Binary resource content requires a declared MIME type",
                    ));
                };
                let bytes = source.resolve().await.map_err(|e| {
                    McpError::internal(format!("Failed to read resource content: {e}"))
                })?;
                ResourceContents::Blob {
                    uri: uri.to_string(),
                    blob: data_url(&mime_type, &bytes),
                    mime_type,
                    meta: self.metadata.clone(),
                }
            }
            ResourceOutput::Json(_) => return Err(McpError::resource_not_found(uri)),
        };

        Ok(ReadResourceResult {
            contents: vec![contents],
        })
    }
}

/// Builder for [`Resource`].
pub struct ResourceBuilder {
    resource: Resource,
}

impl ResourceBuilder {
    /// Declares the MIME type of the content.
    #[must_use]
    pub fn mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.resource.mime_type = Some(mime_type.into());
        self
    }

    /// Adds one metadata entry.
    #[must_use]
    pub fn meta(mut self, key: impl Into<String>, value: Value) -> Self {
        self.resource.metadata.insert(key.into(), value);
        self
    }

    /// Merges a metadata map; later keys win.
    #[must_use]
    pub fn metadata(mut self, metadata: Map<String, Value>) -> Self {
        self.resource.metadata.extend(metadata);
        self
    }

    /// Sets the read handler.
    #[must_use]
    pub fn handler<F, Fut>(mut self, handler: F) -> Self
    where
        F: Fn(ResourceContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<ResourceOutput, BoxError>> + Send + 'static,
    {
        let handler: ResourceHandler = Arc::new(
            move |ctx: ResourceContext| -> BoxFuture<'static, Result<ResourceOutput, BoxError>> {
                Box::pin(handler(ctx))
            },
        );
        self.resource.handler = Some(handler);
        self
    }

    /// Finishes the resource.
    #[must_use]
    pub fn build(self) -> Resource {
        self.resource
    }
}
