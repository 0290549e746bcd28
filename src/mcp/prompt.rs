//! Prompt templates.

use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::mcp::error::{BoxError, McpError, McpResult};
use crate::mcp::schema::{validate_input, InputSchema, SchemaError};

/// Async prompt handler.
pub type PromptHandler =
    Arc<dyn Fn(PromptContext) -> BoxFuture<'static, Result<PromptOutput, BoxError>> + Send + Sync>;

/// What a prompt handler receives.
#[derive(Debug, Clone)]
pub struct PromptContext {
    /// Validated arguments.
    pub input: Value,
    /// Caller session.
    pub session_id: String,
}

/// Speaker of a prompt message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The end user.
    User,
    /// The model.
    Assistant,
}

/// One message produced by a prompt handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptMessage {
    /// Speaker; `None` means assistant.
    pub role: Option<Role>,
    /// Message text.
    pub text: String,
}

impl PromptMessage {
    /// A message with the default role.
    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            role: None,
            text: text.into(),
        }
    }

    /// A user message.
    #[must_use]
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Some(Role::User),
            text: text.into(),
        }
    }

    /// An assistant message.
    #[must_use]
    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: Some(Role::Assistant),
            text: text.into(),
        }
    }
}

/// What a prompt handler returns.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PromptOutput {
    /// Optional description of this rendering.
    pub description: Option<String>,
    /// The messages.
    pub messages: Vec<PromptMessage>,
}

impl PromptOutput {
    /// Output made of `messages`.
    #[must_use]
    pub fn messages(messages: impl IntoIterator<Item = PromptMessage>) -> Self {
        Self {
            description: None,
            messages: messages.into_iter().collect(),
        }
    }

    /// Sets the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Text body of a rendered message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum PromptContent {
    /// Plain text.
    Text {
        /// The text.
        text: String,
    },
}

/// Rendered message in a `prompts/get` result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderedMessage {
    /// Speaker.
    pub role: Role,
    /// Body.
    pub content: PromptContent,
}

/// Result of `prompts/get`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GetPromptResult {
    /// Optional description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Rendered messages.
    pub messages: Vec<RenderedMessage>,
}

/// An argument advertised by `prompts/list`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PromptArgument {
    /// Argument name.
    pub name: String,
    /// Optional description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Whether it must be supplied.
    pub required: bool,
}

/// `prompts/list` entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PromptDescriptor {
    /// Registry name.
    pub name: String,
    /// Description.
    pub description: String,
    /// Arguments derived from the schema.
    pub arguments: Vec<PromptArgument>,
    /// Prompt metadata.
    #[serde(rename = "_meta", skip_serializing_if = "Map::is_empty")]
    pub meta: Map<String, Value>,
}

/// A prompt template.
#[derive(Clone)]
pub struct Prompt {
    description: String,
    schema: Option<Arc<dyn InputSchema>>,
    metadata: Map<String, Value>,
    handler: Option<PromptHandler>,
}

impl std::fmt::Debug for Prompt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Prompt")
            .field("description", &self.description)
            .field("has_handler", &self.handler.is_some())
            .finish_non_exhaustive()
    }
}

impl Prompt {
    /// Starts building a prompt.
    #[must_use]
    pub fn builder(description: impl Into<String>) -> PromptBuilder {
        PromptBuilder {
            prompt: Self {
                description: description.into(),
                schema: None,
                metadata: Map::new(),
                handler: None,
            },
        }
    }

    /// The description.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Builds the protocol description under registry name `name`.
    ///
    /// # Errors
    ///
    /// Returns a [`SchemaError`] if the schema cannot be described.
    pub fn describe(&self, name: &str) -> Result<PromptDescriptor, SchemaError> {
        let arguments = match &self.schema {
            None => Vec::new(),
            Some(schema) => {
                let description = schema.describe()?;
                description
                    .properties
                    .iter()
                    .map(|(arg, property)| PromptArgument {
                        name: arg.clone(),
                        description: property.description.clone(),
                        required: description.is_required(arg),
                    })
                    .collect()
            }
        };

        Ok(PromptDescriptor {
            name: name.to_string(),
            description: self.description.clone(),
            arguments,
            meta: self.metadata.clone(),
        })
    }

    /// Validates `input` and renders the prompt.
    ///
    /// # Errors
    ///
    /// `InvalidParams` for bad arguments, the handler's own protocol error,
    /// or `InternalError` for any other handler failure.
    pub async fn get(&self, input: Value, session_id: &str) -> McpResult<GetPromptResult> {
        let input = validate_input(self.schema.as_ref(), input)?;

        let Some(handler) = &self.handler else {
            return Ok(GetPromptResult::default());
        };

        let output = handler(PromptContext {
            input,
            session_id: session_id.to_string(),
        })
        .await
        .map_err(McpError::from_handler)?;

        Ok(GetPromptResult {
            description: output.description,
            messages: output
                .messages
                .into_iter()
                .map(|m| RenderedMessage {
                    role: m.role.unwrap_or(Role::Assistant),
                    content: PromptContent::Text { text: m.text },
                })
                .collect(),
        })
    }
}

/// Builder for [`Prompt`].
pub struct PromptBuilder {
    prompt: Prompt,
}

impl PromptBuilder {
    /// Sets the argument schema.
    #[must_use]
    pub fn schema(mut self, schema: impl InputSchema + 'static) -> Self {
        self.prompt.schema = Some(Arc::new(schema));
        self
    }

    /// Adds one metadata entry.
    #[must_use]
    pub fn meta(mut self, key: impl Into<String>, value: Value) -> Self {
        self.prompt.metadata.insert(key.into(), value);
        self
    }

    /// Merges a metadata map; later keys win.
    #[must_use]
    pub fn metadata(mut self, metadata: Map<String, Value>) -> Self {
        self.prompt.metadata.extend(metadata);
        self
    }

    /// Sets the handler.
    #[must_use]
    pub fn handler<F, Fut>(mut self, handler: F) -> Self
    where
        F: Fn(PromptContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<PromptOutput, BoxError>> + Send + 'static,
    {
        let handler: PromptHandler = Arc::new(
            move |ctx: PromptContext| -> BoxFuture<'static, Result<PromptOutput, BoxError>> {
                Box::pin(handler(ctx))
            },
        );
        self.prompt.handler = Some(handler);
        self
    }

    /// Finishes the prompt.
    #[must_use]
    pub fn build(self) -> Prompt {
        self.prompt
    }
}
