//! Tools: named operations the client can invoke.
//!
//! # Result shaping
//!
//! Handlers return a [`ToolOutput`], which becomes a [`CallToolResult`]:
//!
//! | Output           | Result                                              |
//! |------------------|-----------------------------------------------------|
//! | `Text`           | one text block                                      |
//! | `Error`          | one text block, `isError: true`                     |
//! | `Blob`           | one image/audio block with a base64 data URL        |
//! | `ResourceLink`   | one `resource_link` block                           |
//! | `Json`           | stringified text block, plus `structuredContent`    |
//! |                  | when an output schema is declared                   |
//!
//! A handler that fails or panics produces an `isError` result, never a
//! protocol error. Linked widget metadata lands in `_meta` on every path.

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::future::BoxFuture;
use futures::FutureExt as _;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::mcp::content::{Blob, BlobSource, Content, ResourceLink};
use crate::mcp::context::RequestContext;
use crate::mcp::error::{BoxError, McpResult};
use crate::mcp::schema::{describe_json, validate_input, InputSchema, SchemaError};
use crate::mcp::widget::Widget;

/// Async tool handler.
pub type ToolHandler =
    Arc<dyn Fn(ToolContext) -> BoxFuture<'static, Result<ToolOutput, BoxError>> + Send + Sync>;

#[allow(clippy::trivially_copy_pass_by_ref)] // serde's skip_serializing_if requires a predicate fn(&T) -> bool, so we must take &bool here
const fn is_false(b: &bool) -> bool {
    !*b
}

/// What a tool handler receives.
#[derive(Debug, Clone)]
pub struct ToolContext {
    /// Validated arguments.
    pub input: Value,
    /// Transport details of the request.
    pub event: RequestContext,
    /// Caller session.
    pub session_id: String,
}

impl ToolContext {
    /// Deserialises the arguments into `T`.
    ///
    /// # Errors
    ///
    /// Returns the serde error if the arguments do not fit `T`.
    pub fn input_as<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_value(self.input.clone())
    }

    /// Shorthand for [`ToolOutput::error`].
    #[must_use]
    #[allow(clippy::unused_self)]
    pub fn error(&self, message: impl Into<String>) -> ToolOutput {
        ToolOutput::error(message)
    }

    /// Shorthand for [`ToolOutput::blob`].
    #[must_use]
    #[allow(clippy::unused_self)]
    pub fn blob(&self, source: impl Into<BlobSource>, mime_type: impl Into<String>) -> ToolOutput {
        ToolOutput::blob(source, mime_type)
    }

    /// Shorthand for [`ToolOutput::resource`].
    #[must_use]
    #[allow(clippy::unused_self)]
    pub fn resource(&self, link: ResourceLink) -> ToolOutput {
        ToolOutput::resource(link)
    }
}

/// What a tool handler returns.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolOutput {
    /// Plain text.
    Text(String),
    /// A failure the tool wants reported to the model.
    Error(String),
    /// Binary media.
    Blob(Blob),
    /// A pointer to a resource.
    ResourceLink(ResourceLink),
    /// Any JSON value.
    Json(Value),
}

impl ToolOutput {
    /// Plain text output.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }

    /// Reports a tool-level failure.
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error(message.into())
    }

    /// Binary output; `audio/*` MIME types become audio blocks, the rest images.
    #[must_use]
    pub fn blob(source: impl Into<BlobSource>, mime_type: impl Into<String>) -> Self {
        Self::Blob(Blob::new(source, mime_type))
    }

    /// Links to a resource.
    #[must_use]
    pub fn resource(link: ResourceLink) -> Self {
        Self::ResourceLink(link)
    }

    /// Serialises `value` as JSON output.
    ///
    /// # Errors
    ///
    /// Returns the serde error if `value` cannot be represented as JSON.
    pub fn json<T: Serialize>(value: &T) -> Result<Self, serde_json::Error> {
        serde_json::to_value(value).map(Self::Json)
    }
}

impl From<String> for ToolOutput {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<&str> for ToolOutput {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<Value> for ToolOutput {
    fn from(value: Value) -> Self {
        Self::Json(value)
    }
}

/// Result of a tool call.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CallToolResult {
    /// Content returned by the tool.
    pub content: Vec<Content>,
    /// Raw JSON output, when the tool declares an output schema.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub structured_content: Option<Value>,
    /// Whether the tool call resulted in an error.
    #[serde(skip_serializing_if = "is_false")]
    pub is_error: bool,
    /// Tool and widget metadata.
    #[serde(rename = "_meta", skip_serializing_if = "Map::is_empty")]
    pub meta: Map<String, Value>,
}

impl CallToolResult {
    /// Creates a successful text result.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: vec![Content::text(text)],
            ..Self::default()
        }
    }

    /// Creates an error text result.
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            content: vec![Content::text(message)],
            is_error: true,
            ..Self::default()
        }
    }
}

/// Behavioural hints for clients.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolAnnotations {
    /// Display title.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// The tool does not modify anything.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub read_only_hint: Option<bool>,
    /// The tool may destroy data.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destructive_hint: Option<bool>,
    /// Repeating the call has no further effect.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub idempotent_hint: Option<bool>,
    /// The tool talks to the outside world.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub open_world_hint: Option<bool>,
}

/// A tool definition for tools/list response.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDescriptor {
    /// Unique tool name.
    pub name: String,
    /// Display title.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Human-readable description.
    pub description: String,
    /// JSON Schema for the tool's input parameters.
    pub input_schema: Value,
    /// JSON Schema for structured output.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_schema: Option<Value>,
    /// Behavioural hints.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub annotations: Option<ToolAnnotations>,
    /// Tool and widget metadata.
    #[serde(rename = "_meta", skip_serializing_if = "Map::is_empty")]
    pub meta: Map<String, Value>,
}

/// A callable tool.
#[derive(Clone)]
pub struct Tool {
    description: String,
    title: Option<String>,
    annotations: Option<ToolAnnotations>,
    input_schema: Option<Arc<dyn InputSchema>>,
    output_schema: Option<Arc<dyn InputSchema>>,
    metadata: Map<String, Value>,
    widget: Option<Arc<Widget>>,
    handler: Option<ToolHandler>,
}

impl std::fmt::Debug for Tool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tool")
            .field("description", &self.description)
            .field("title", &self.title)
            .field("widget", &self.widget.as_ref().map(|w| w.id().to_string()))
            .field("has_handler", &self.handler.is_some())
            .finish_non_exhaustive()
    }
}

impl Tool {
    /// Starts building a tool.
    #[must_use]
    pub fn builder(description: impl Into<String>) -> ToolBuilder {
        ToolBuilder {
            tool: Self {
                description: description.into(),
                title: None,
                annotations: None,
                input_schema: None,
                output_schema: None,
                metadata: Map::new(),
                widget: None,
                handler: None,
            },
        }
    }

    /// The description.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// The linked widget, if any.
    #[must_use]
    pub const fn widget(&self) -> Option<&Arc<Widget>> {
        self.widget.as_ref()
    }

    /// Own metadata followed by the widget's tool metadata; widget keys win.
    #[must_use]
    pub fn metadata(&self) -> Map<String, Value> {
        let mut meta = self.metadata.clone();
        if let Some(widget) = &self.widget {
            meta.extend(widget.tool_metadata());
        }
        meta
    }

    /// Builds the protocol description under registry name `name`.
    ///
    /// # Errors
    ///
    /// Returns a [`SchemaError`] if either schema cannot be described.
    pub fn describe(&self, name: &str) -> Result<ToolDescriptor, SchemaError> {
        Ok(ToolDescriptor {
            name: name.to_string(),
            title: self.title.clone(),
            description: self.description.clone(),
            input_schema: describe_json(self.input_schema.as_ref())?,
            output_schema: self
                .output_schema
                .as_ref()
                .map(|s| s.describe().map(|d| d.to_json()))
                .transpose()?,
            annotations: self.annotations.clone(),
            meta: self.metadata(),
        })
    }

    /// Validates `input` and runs the handler.
    ///
    /// # Errors
    ///
    /// Only input validation fails at the protocol level (`InvalidParams`,
    /// or the schema adapter's own error). Handler failures are reported
    /// inside the returned result.
    pub async fn call(
        &self,
        input: Value,
        event: RequestContext,
        session_id: &str,
    ) -> McpResult<CallToolResult> {
        let input = validate_input(self.input_schema.as_ref(), input)?;

        let mut result = match &self.handler {
            None => CallToolResult::default(),
            Some(handler) => {
                let ctx = ToolContext {
                    input,
                    event,
                    session_id: session_id.to_string(),
                };
                // The handler may panic before it returns a future.
                match AssertUnwindSafe(async move { handler(ctx).await })
                    .catch_unwind()
                    .await
                {
                    Ok(Ok(output)) => self.shape(output).await,
                    Ok(Err(e)) => {
                        tracing::warn!(error = %e, "Tool handler failed");
                        CallToolResult::error(e.to_string())
                    }
                    Err(panic) => {
                        let message = panic_message(panic.as_ref());
                        tracing::error!(panic = %message, "Tool handler panicked");
                        CallToolResult::error(format!("Internal error: {message}"))
                    }
                }
            }
        };

        result.meta = self.metadata();
        Ok(result)
    }

    /// Turns handler output into the result envelope.
    async fn shape(&self, output: ToolOutput) -> CallToolResult {
        match output {
            ToolOutput::Text(text) | ToolOutput::Json(Value::String(text)) => {
                CallToolResult::text(text)
            }
            ToolOutput::Error(message) => CallToolResult::error(message),
            ToolOutput::Blob(blob) => match blob.into_content().await {
                Ok(content) => CallToolResult {
                    content: vec![content],
                    ..CallToolResult::default()
                },
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to read tool blob");
                    CallToolResult::error(format!("Failed to read binary result: {e}"))
                }
            },
            ToolOutput::ResourceLink(link) => CallToolResult {
                content: vec![link.into()],
                ..CallToolResult::default()
            },
            ToolOutput::Json(value) => CallToolResult {
                content: vec![Content::text(value.to_string())],
                structured_content: self.output_schema.is_some().then_some(value),
                ..CallToolResult::default()
            },
        }
    }
}

/// Best-effort text of a panic payload.
fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "tool handler panicked".to_string())
}

/// Builder for [`Tool`].
pub struct ToolBuilder {
    tool: Tool,
}

impl ToolBuilder {
    /// Sets the display title.
    #[must_use]
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.tool.title = Some(title.into());
        self
    }

    /// Sets behavioural hints.
    #[must_use]
    pub fn annotations(mut self, annotations: ToolAnnotations) -> Self {
        self.tool.annotations = Some(annotations);
        self
    }

    /// Sets the input schema.
    #[must_use]
    pub fn input_schema(mut self, schema: impl InputSchema + 'static) -> Self {
        self.tool.input_schema = Some(Arc::new(schema));
        self
    }

    /// Sets the output schema; JSON output is then also returned as
    /// structured content.
    #[must_use]
    pub fn output_schema(mut self, schema: impl InputSchema + 'static) -> Self {
        self.tool.output_schema = Some(Arc::new(schema));
        self
    }

    /// Adds one metadata entry.
    #[must_use]
    pub fn meta(mut self, key: impl Into<String>, value: Value) -> Self {
        self.tool.metadata.insert(key.into(), value);
        self
    }

    /// Merges a metadata map; later keys win.
    #[must_use]
    pub fn metadata(mut self, metadata: Map<String, Value>) -> Self {
        self.tool.metadata.extend(metadata);
        self
    }

    /// Links a widget.
    #[must_use]
    pub fn widget(mut self, widget: Arc<Widget>) -> Self {
        self.tool.widget = Some(widget);
        self
    }

    /// Sets the handler.
    #[must_use]
    pub fn handler<F, Fut>(mut self, handler: F) -> Self
    where
        F: Fn(ToolContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<ToolOutput, BoxError>> + Send + 'static,
    {
        let handler: ToolHandler = Arc::new(
            move |ctx: ToolContext| -> BoxFuture<'static, Result<ToolOutput, BoxError>> {
                Box::pin(handler(ctx))
            },
        );
        self.tool.handler = Some(handler);
        self
    }

    /// Finishes the tool.
    #[must_use]
    pub fn build(self) -> Tool {
        self.tool
    }
}
