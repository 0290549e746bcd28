//! The sample application served by the `widget-mcp` binary.
//!
//! It registers one of each capability kind:
//!
//! - `greet`: a tool whose results render in the `greeting` widget
//! - `status`: a JSON status resource
//! - `notes`: a templated resource at `notes://{topic}`
//! - `summarize`: a prompt asking the model for a summary

use std::sync::Arc;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::config::ServerConfig;
use crate::error::ConfigError;
use crate::mcp::error::BoxError;
use crate::mcp::prompt::{Prompt, PromptContext, PromptMessage, PromptOutput};
use crate::mcp::resource::{Resource, ResourceContext, ResourceOutput};
use crate::mcp::schema::{ObjectSchema, PropertyType, TypedSchema};
use crate::mcp::server::McpServer;
use crate::mcp::tool::{Tool, ToolAnnotations, ToolContext, ToolOutput};
use crate::mcp::widget::{Widget, WidgetOptions};

/// Arguments of the `greet` tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct GreetArgs {
    /// Who to greet.
    pub name: String,
    /// Optional greeting word, "Hello" by default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub salutation: Option<String>,
}

/// The widget showing greeting cards.
#[must_use]
pub fn greeting_widget() -> Arc<Widget> {
    Arc::new(Widget::new(
        "greeting",
        WidgetOptions {
            name: "Greeting card".to_string(),
            description: "Shows a greeting card for a person".to_string(),
            invoking: "Writing greeting...".to_string(),
            invoked: "Greeting ready".to_string(),
            prefers_border: true,
        },
    ))
}

fn greet_tool() -> Tool {
    Tool::builder("Greets someone by name")
        .title("Greet")
        .annotations(ToolAnnotations {
            read_only_hint: Some(true),
            open_world_hint: Some(false),
            ..ToolAnnotations::default()
        })
        .input_schema(TypedSchema::<GreetArgs>::new())
        .widget(greeting_widget())
        .handler(|ctx: ToolContext| async move {
            let args: GreetArgs = ctx.input_as()?;
            let salutation = args.salutation.as_deref().unwrap_or("Hello");
            Ok::<_, BoxError>(ToolOutput::text(format!("{salutation} {}", args.name)))
        })
        .build()
}

fn status_resource(info: ServerConfig) -> Resource {
    Resource::builder("status://server", "Server name, version and widget origin")
        .mime_type("application/json")
        .handler(move |_ctx: ResourceContext| {
            let body = json!({
                "name": info.name,
                "version": info.version,
                "domain": info.domain,
            })
            .to_string();
            async move { Ok(ResourceOutput::Text(body)) }
        })
        .build()
}

fn notes_resource() -> Resource {
    Resource::builder("notes://{topic}", "Short notes on a topic")
        .mime_type("text/plain")
        .handler(|ctx: ResourceContext| async move {
            let topic = ctx.params.get("topic").cloned().unwrap_or_default();
            Ok(ResourceOutput::Text(format!(
                "Notes on {topic}: nothing written yet."
            )))
        })
        .build()
}

fn summarize_prompt() -> Prompt {
    Prompt::builder("Asks for a short summary of a text")
        .schema(
            ObjectSchema::new()
                .required("text", PropertyType::String, "Text to summarise")
                .optional("sentences", PropertyType::Integer, "Maximum sentences"),
        )
        .handler(|ctx: PromptContext| async move {
            let text = ctx.input["text"].as_str().unwrap_or_default();
            let limit = ctx.input["sentences"].as_i64().unwrap_or(3);
            Ok(PromptOutput::messages([PromptMessage::user(format!(
                "Summarise the following in at most {limit} sentences:\n\n{text}"
            ))]))
        })
        .build()
}

/// Builds the sample server for `config`.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidCapability`] if a schema cannot be
/// described.
pub fn build_server(config: &ServerConfig) -> Result<McpServer, ConfigError> {
    McpServer::builder(&config.name, &config.version)
        .domain(&config.domain)
        .tool("greet", greet_tool())
        .resource("status", status_resource(config.clone()))
        .resource("notes", notes_resource())
        .prompt("summarize", summarize_prompt())
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mcp::context::RequestContext;

    fn server() -> McpServer {
        build_server(&ServerConfig::default()).unwrap()
    }

    #[test]
    fn registers_every_capability_kind() {
        let server = server();
        assert!(server.has_tools());
        assert!(server.has_prompts());
        assert!(server.widget("greeting").is_some());
        assert_eq!(server.template_infos().len(), 1);
    }

    #[test]
    fn greet_schema_comes_from_the_struct() {
        let server = server();
        let tool = &server.tool_descriptors()[0];
        assert_eq!(tool.input_schema["properties"]["name"]["type"], "string");
        assert_eq!(tool.input_schema["required"], json!(["name"]));
    }

    #[tokio::test]
    async fn greet_uses_custom_salutation() {
        let server = server();
        let result = server
            .tool("greet")
            .unwrap()
            .call(
                json!({"name": "Ada", "salutation": "Welcome"}),
                RequestContext::new(),
                "s",
            )
            .await
            .unwrap();
        assert_eq!(
            serde_json::to_value(&result.content).unwrap(),
            json!([{"type": "text", "text": "Welcome Ada"}])
        );
        assert_eq!(result.meta["openai/outputTemplate"], "widget://greeting.js");
    }

    #[tokio::test]
    async fn notes_template_receives_topic() {
        let server = server();
        let resource = server.find_resource("notes://rust").unwrap();
        let result = resource.read("notes://rust", "s").await.unwrap();
        let json = serde_json::to_value(result).unwrap();
        assert_eq!(json["contents"][0]["text"], "Notes on rust: nothing written yet.");
    }
}
