//! Integration tests for MCP protocol handling.
//!
//! These tests drive the dispatcher with raw JSON-RPC messages and check the
//! serialised replies, covering routing, capability gating, widgets, and
//! error shaping.

use std::path::PathBuf;
use std::sync::Arc;

use serde_json::{json, Value};
use widget_mcp::mcp::content::ResourceLink;
use widget_mcp::mcp::protocol::{parse_message, ErrorCode, IncomingMessage, RequestId};
use widget_mcp::mcp::schema::{SchemaDescription, SchemaError, ValidationError};
use widget_mcp::mcp::resource::ResourceOutput;
use widget_mcp::mcp::{
    BoxError, Dispatcher, InputSchema, McpError, McpServer, ObjectSchema, Prompt, PromptMessage, PromptOutput,
    PropertyType, RequestContext, Resource, Tool, ToolOutput, Widget, WidgetOptions,
};

// =============================================================================
// Helpers
// =============================================================================

async fn send(dispatcher: &Dispatcher, raw: Value) -> Option<Value> {
    let message = parse_message(&raw.to_string()).expect("test messages are well formed");
    dispatcher
        .handle_message(message, RequestContext::new(), "test-session")
        .await
        .map(|reply| serde_json::to_value(reply).unwrap())
}

async fn request(dispatcher: &Dispatcher, method: &str, params: Value) -> Value {
    send(
        dispatcher,
        json!({"jsonrpc": "2.0", "id": 7, "method": method, "params": params}),
    )
    .await
    .expect("requests always get a reply")
}

fn greeting_widget() -> Arc<Widget> {
    Arc::new(Widget::new(
        "greeting",
        WidgetOptions {
            name: "Greeting".into(),
            description: "Shows a greeting".into(),
            invoking: "Greeting...".into(),
            invoked: "Greeted".into(),
            prefers_border: false,
        },
    ))
}

fn greet_tool() -> Tool {
    Tool::builder("Greets someone")
        .input_schema(ObjectSchema::new().required("name", PropertyType::String, "Who"))
        .handler(|ctx| async move {
            let name = ctx.input["name"].as_str().unwrap_or_default().to_string();
            Ok(ToolOutput::text(format!("Hello {name}")))
        })
        .build()
}

fn dispatcher(server: McpServer) -> Dispatcher {
    Dispatcher::new(server)
}

// =============================================================================
// Protocol Parsing Tests
// =============================================================================

#[test]
fn test_parse_initialize_request() {
    let json = r#"{
        "jsonrpc": "2.0",
        "id": 1,
        "method": "initialize",
        "params": {
            "protocolVersion": "2025-06-18",
            "capabilities": {},
            "clientInfo": {
                "name": "test-client",
                "version": "1.0.0"
            }
        }
    }"#;

    let result = parse_message(json);
    assert!(result.is_ok());

    if let IncomingMessage::Request(req) = result.unwrap() {
        assert_eq!(req.method, "initialize");
        assert_eq!(req.id, RequestId::Number(1));
    } else {
        panic!("Expected Request");
    }
}

#[test]
fn test_parse_notification() {
    let json = r#"{
        "jsonrpc": "2.0",
        "method": "notifications/initialized"
    }"#;

    let result = parse_message(json);
    assert!(result.is_ok());

    if let IncomingMessage::Notification(notif) = result.unwrap() {
        assert_eq!(notif.method, "notifications/initialized");
    } else {
        panic!("Expected Notification");
    }
}

#[test]
fn test_parse_invalid_json() {
    let result = parse_message("not valid json");
    assert_eq!(result.unwrap_err().error.code, -32700);
}

#[test]
fn test_parse_missing_jsonrpc_version() {
    let json = r#"{
        "id": 1,
        "method": "test"
    }"#;

    let result = parse_message(json);
    assert_eq!(result.unwrap_err().error.code, -32600);
}

// =============================================================================
// Lifecycle and Routing
// =============================================================================

#[tokio::test]
async fn test_initialize_reports_only_populated_capabilities() {
    let d = dispatcher(
        McpServer::builder("greeter", "1.2.3")
            .tool("greet", greet_tool())
            .build()
            .unwrap(),
    );

    let reply = request(&d, "initialize", json!({"protocolVersion": "2025-03-26"})).await;
    assert_eq!(reply["id"], 7);
    assert_eq!(reply["result"]["protocolVersion"], "2025-03-26");
    assert_eq!(reply["result"]["capabilities"], json!({"tools": {}}));
    assert_eq!(
        reply["result"]["serverInfo"],
        json!({"name": "greeter", "version": "1.2.3"})
    );
}

#[tokio::test]
async fn test_initialize_falls_back_to_latest_version() {
    let d = dispatcher(McpServer::builder("s", "1").build().unwrap());
    let reply = request(&d, "initialize", json!({"protocolVersion": "1999-01-01"})).await;
    assert_eq!(reply["result"]["protocolVersion"], "2025-06-18");
    assert_eq!(reply["result"]["capabilities"], json!({}));
}

#[tokio::test]
async fn test_ping_returns_empty_object() {
    let d = dispatcher(McpServer::builder("s", "1").build().unwrap());
    let reply = request(&d, "ping", Value::Null).await;
    assert_eq!(reply, json!({"jsonrpc": "2.0", "id": 7, "result": {}}));
}

#[tokio::test]
async fn test_unknown_method_is_method_not_found_with_echoed_id() {
    let d = dispatcher(McpServer::builder("s", "1").build().unwrap());
    let reply = request(&d, "foo/bar", json!({})).await;
    assert_eq!(reply["error"]["code"], -32601);
    assert_eq!(reply["id"], 7);
    assert!(reply.get("result").is_none());
}

#[tokio::test]
async fn test_empty_registries_are_gated() {
    let d = dispatcher(McpServer::builder("s", "1").build().unwrap());
    for method in ["tools/list", "resources/list", "resources/templates/list", "prompts/list"] {
        let reply = request(&d, method, json!({})).await;
        assert_eq!(reply["error"]["code"], -32601, "{method} should be gated");
    }
}

#[tokio::test]
async fn test_notifications_get_no_reply() {
    let d = dispatcher(McpServer::builder("s", "1").build().unwrap());
    let reply = send(
        &d,
        json!({"jsonrpc": "2.0", "method": "notifications/initialized"}),
    )
    .await;
    assert!(reply.is_none());
}

#[tokio::test]
async fn test_string_ids_are_echoed() {
    let d = dispatcher(McpServer::builder("s", "1").build().unwrap());
    let reply = send(&d, json!({"jsonrpc": "2.0", "id": "abc", "method": "ping"}))
        .await
        .unwrap();
    assert_eq!(reply["id"], "abc");
}

// =============================================================================
// Tools
// =============================================================================

#[tokio::test]
async fn test_greet_end_to_end() {
    let d = dispatcher(
        McpServer::builder("s", "1")
            .tool("greet", greet_tool())
            .build()
            .unwrap(),
    );

    let reply = request(
        &d,
        "tools/call",
        json!({"name": "greet", "arguments": {"name": "Ada"}}),
    )
    .await;
    assert_eq!(
        reply["result"],
        json!({"content": [{"type": "text", "text": "Hello Ada"}]})
    );
}

#[tokio::test]
async fn test_tool_without_schema_accepts_any_object() {
    let d = dispatcher(
        McpServer::builder("s", "1")
            .tool(
                "echo",
                Tool::builder("Echoes")
                    .handler(|ctx| async move { Ok(ToolOutput::Json(ctx.input)) })
                    .build(),
            )
            .build()
            .unwrap(),
    );

    for arguments in [json!({}), json!({"x": 1, "y": [true]}), json!({"nested": {"a": null}})] {
        let reply = request(&d, "tools/call", json!({"name": "echo", "arguments": arguments})).await;
        assert!(reply.get("error").is_none());
        let text = reply["result"]["content"][0]["text"].as_str().unwrap();
        assert_eq!(serde_json::from_str::<Value>(text).unwrap(), arguments);
    }
}

#[tokio::test]
async fn test_schema_violation_is_invalid_params() {
    let d = dispatcher(
        McpServer::builder("s", "1")
            .tool("greet", greet_tool())
            .build()
            .unwrap(),
    );

    for arguments in [json!({}), json!({"name": 42})] {
        let reply = request(&d, "tools/call", json!({"name": "greet", "arguments": arguments})).await;
        assert_eq!(reply["error"]["code"], -32602);
        assert_eq!(reply["id"], 7);
    }
}

/// Rejects every call with its own protocol error.
struct OfflineCalendar;

impl InputSchema for OfflineCalendar {
    fn validate(&self, _input: &Value) -> Result<Value, ValidationError> {
        Err(McpError::with_message(ErrorCode::ResourceNotFound, "Calendar is offline").into())
    }

    fn describe(&self) -> Result<SchemaDescription, SchemaError> {
        ObjectSchema::new().describe()
    }
}

#[tokio::test]
async fn test_validator_protocol_error_passes_through() {
    let d = dispatcher(
        McpServer::builder("s", "1")
            .tool(
                "book",
                Tool::builder("Books a slot")
                    .input_schema(OfflineCalendar)
                    .handler(|_ctx| async { Ok(ToolOutput::text("booked")) })
                    .build(),
            )
            .build()
            .unwrap(),
    );

    let reply = request(&d, "tools/call", json!({"name": "book", "arguments": {}})).await;
    assert_eq!(reply["error"]["code"], -32002);
    assert_eq!(reply["error"]["message"], "Calendar is offline");
    assert_eq!(reply["id"], 7);
}

#[tokio::test]
async fn test_non_object_arguments_are_invalid_params() {
    let d = dispatcher(
        McpServer::builder("s", "1")
            .tool(
                "echo",
                Tool::builder("Echoes")
                    .handler(|ctx| async move { Ok(ToolOutput::Json(ctx.input)) })
                    .build(),
            )
            .build()
            .unwrap(),
    );

    for arguments in [json!(5), json!("text"), json!([1, 2])] {
        let reply = request(&d, "tools/call", json!({"name": "echo", "arguments": arguments})).await;
        assert_eq!(reply["error"]["code"], -32602);
    }
}

#[tokio::test]
async fn test_unknown_tool_is_method_not_found() {
    let d = dispatcher(
        McpServer::builder("s", "1")
            .tool("greet", greet_tool())
            .build()
            .unwrap(),
    );
    let reply = request(&d, "tools/call", json!({"name": "wave"})).await;
    assert_eq!(reply["error"]["code"], -32601);
}

#[tokio::test]
async fn test_descriptor_always_has_object_input_schema() {
    let d = dispatcher(
        McpServer::builder("s", "1")
            .tool("bare", Tool::builder("No schema").build())
            .build()
            .unwrap(),
    );
    let reply = request(&d, "tools/list", json!({})).await;
    assert_eq!(reply["result"]["tools"][0]["inputSchema"]["type"], "object");
    assert_eq!(reply["result"]["tools"][0]["name"], "bare");
}

#[tokio::test]
async fn test_widget_metadata_on_descriptor_and_every_result() {
    let d = dispatcher(
        McpServer::builder("s", "1")
            .domain("https://app.example.com")
            .tool(
                "greet",
                Tool::builder("Greets")
                    .meta("openai/outputTemplate", json!("ignored"))
                    .meta("custom", json!(1))
                    .widget(greeting_widget())
                    .handler(|_ctx| async { Ok(ToolOutput::text("hi")) })
                    .build(),
            )
            .build()
            .unwrap(),
    );

    let list = request(&d, "tools/list", json!({})).await;
    let meta = &list["result"]["tools"][0]["_meta"];
    assert_eq!(meta["openai/outputTemplate"], "widget://greeting.js");
    assert_eq!(meta["custom"], 1);

    for _ in 0..2 {
        let call = request(&d, "tools/call", json!({"name": "greet"})).await;
        assert_eq!(
            call["result"]["_meta"]["openai/outputTemplate"],
            "widget://greeting.js"
        );
        assert_eq!(call["result"]["_meta"]["openai/resultCanProduceWidget"], true);
    }
}

#[tokio::test]
async fn test_tool_handler_failure_is_error_result() {
    let d = dispatcher(
        McpServer::builder("s", "1")
            .tool(
                "flaky",
                Tool::builder("Fails")
                    .handler(|_ctx| async { Err(BoxError::from(McpError::invalid_params("bad date"))) })
                    .build(),
            )
            .build()
            .unwrap(),
    );

    let reply = request(&d, "tools/call", json!({"name": "flaky"})).await;
    assert!(reply.get("error").is_none());
    assert_eq!(reply["result"]["isError"], true);
    assert_eq!(reply["result"]["content"][0]["text"], "bad date");
}

#[tokio::test]
async fn test_tool_can_link_resources() {
    let d = dispatcher(
        McpServer::builder("s", "1")
            .tool(
                "find",
                Tool::builder("Finds a note")
                    .handler(|_ctx| async {
                        Ok(ToolOutput::resource(
                            ResourceLink::new("notes://7", "Note 7").mime_type("text/plain"),
                        ))
                    })
                    .build(),
            )
            .build()
            .unwrap(),
    );

    let reply = request(&d, "tools/call", json!({"name": "find"})).await;
    assert_eq!(
        reply["result"]["content"][0],
        json!({"type": "resource_link", "uri": "notes://7", "name": "Note 7", "mimeType": "text/plain"})
    );
}

// =============================================================================
// Resources and Widgets
// =============================================================================

#[tokio::test]
async fn test_widget_uri_round_trip() {
    let d = dispatcher(
        McpServer::builder("s", "1")
            .domain("https://app.example.com")
            .widget(greeting_widget())
            .build()
            .unwrap(),
    );

    let list = request(&d, "resources/list", json!({})).await;
    assert_eq!(list["result"]["resources"][0]["uri"], "widget://greeting.js");
    assert_eq!(
        list["result"]["resources"][0]["_meta"]["openai/widgetDescription"],
        "Shows a greeting"
    );

    let read = request(&d, "resources/read", json!({"uri": "widget://greeting.js"})).await;
    let contents = &read["result"]["contents"][0];
    assert_eq!(contents["mimeType"], "text/html+skybridge");
    assert_eq!(contents["uri"], "widget://greeting.js");
    assert!(contents["text"]
        .as_str()
        .unwrap()
        .contains("https://app.example.com/widgets/greeting.js"));
}

#[tokio::test]
async fn test_widget_lookup_is_exact() {
    let d = dispatcher(
        McpServer::builder("s", "1")
            .widget(greeting_widget())
            .build()
            .unwrap(),
    );

    for uri in ["widget://greet.js", "widget://greetings.js", "widget://"] {
        let reply = request(&d, "resources/read", json!({"uri": uri})).await;
        assert_eq!(reply["error"]["code"], -32002, "{uri} should not resolve");
    }
}

#[tokio::test]
async fn test_template_resources_match_structurally() {
    let d = dispatcher(
        McpServer::builder("s", "1")
            .resource(
                "user",
                Resource::builder("users://{id}", "A user")
                    .handler(|ctx| async move { Ok(ResourceOutput::Text(format!("user {}", ctx.params["id"]))) })
                    .build(),
            )
            .resource(
                "post",
                Resource::builder("users://{id}/posts/{post}", "A post")
                    .handler(|ctx| async move {
                        Ok(ResourceOutput::Text(format!(
                            "post {} by {}",
                            ctx.params["post"], ctx.params["id"]
                        )))
                    })
                    .build(),
            )
            .build()
            .unwrap(),
    );

    let templates = request(&d, "resources/templates/list", json!({})).await;
    assert_eq!(templates["result"]["resourceTemplates"].as_array().unwrap().len(), 2);

    let post = request(&d, "resources/read", json!({"uri": "users://ada/posts/3"})).await;
    assert_eq!(post["result"]["contents"][0]["text"], "post 3 by ada");

    let user = request(&d, "resources/read", json!({"uri": "users://ada"})).await;
    assert_eq!(user["result"]["contents"][0]["text"], "user ada");

    let missing = request(&d, "resources/read", json!({"uri": "groups://x"})).await;
    assert_eq!(missing["error"]["code"], -32002);
}

#[tokio::test]
async fn test_non_text_resource_value_is_not_found() {
    let d = dispatcher(
        McpServer::builder("s", "1")
            .resource(
                "count",
                Resource::builder("stats://count", "A number")
                    .handler(|_ctx| async { Ok(ResourceOutput::Json(json!(42))) })
                    .build(),
            )
            .build()
            .unwrap(),
    );
    let reply = request(&d, "resources/read", json!({"uri": "stats://count"})).await;
    assert_eq!(reply["error"]["code"], -32002);
}

#[tokio::test]
async fn test_binary_resource_needs_mime_type() {
    let d = dispatcher(
        McpServer::builder("s", "1")
            .resource(
                "raw",
                Resource::builder("files://raw", "Raw bytes")
                    .handler(|_ctx| async { Ok(ResourceOutput::from(vec![1_u8, 2, 3])) })
                    .build(),
            )
            .resource(
                "png",
                Resource::builder("files://png", "Image")
                    .mime_type("image/png")
                    .handler(|_ctx| async { Ok(ResourceOutput::from(vec![1_u8, 2, 3])) })
                    .build(),
            )
            .build()
            .unwrap(),
    );

    let raw = request(&d, "resources/read", json!({"uri": "files://raw"})).await;
    assert_eq!(raw["error"]["code"], -32603);

    let png = request(&d, "resources/read", json!({"uri": "files://png"})).await;
    assert_eq!(png["result"]["contents"][0]["blob"], "data:image/png;base64,AQID");
}

#[tokio::test]
async fn test_file_backed_resource_is_read() {
    let dir = tempfile::tempdir().unwrap();
    let path: PathBuf = dir.path().join("logo.png");
    std::fs::write(&path, [0xFF_u8, 0x00]).unwrap();

    let d = dispatcher(
        McpServer::builder("s", "1")
            .resource(
                "logo",
                Resource::builder("files://logo", "Logo")
                    .mime_type("image/png")
                    .handler(move |_ctx| {
                        let path = path.clone();
                        async move { Ok(ResourceOutput::Binary(path.into())) }
                    })
                    .build(),
            )
            .build()
            .unwrap(),
    );

    let reply = request(&d, "resources/read", json!({"uri": "files://logo"})).await;
    assert_eq!(reply["result"]["contents"][0]["blob"], "data:image/png;base64,/wA=");
}

// =============================================================================
// Prompts
// =============================================================================

#[tokio::test]
async fn test_prompt_list_and_get() {
    let d = dispatcher(
        McpServer::builder("s", "1")
            .prompt(
                "summarize",
                Prompt::builder("Summarises text")
                    .schema(ObjectSchema::new().required("text", PropertyType::String, "Input"))
                    .handler(|ctx| async move {
                        let text = ctx.input["text"].as_str().unwrap_or_default().to_string();
                        Ok(PromptOutput::messages([PromptMessage::user(format!(
                            "Summarise: {text}"
                        ))]))
                    })
                    .build(),
            )
            .build()
            .unwrap(),
    );

    let list = request(&d, "prompts/list", json!({})).await;
    assert_eq!(
        list["result"]["prompts"][0]["arguments"],
        json!([{"name": "text", "description": "Input", "required": true}])
    );

    let get = request(
        &d,
        "prompts/get",
        json!({"name": "summarize", "arguments": {"text": "long story"}}),
    )
    .await;
    assert_eq!(
        get["result"]["messages"],
        json!([{"role": "user", "content": {"type": "text", "text": "Summarise: long story"}}])
    );

    let invalid = request(&d, "prompts/get", json!({"name": "summarize", "arguments": {}})).await;
    assert_eq!(invalid["error"]["code"], -32602);

    let unknown = request(&d, "prompts/get", json!({"name": "other"})).await;
    assert_eq!(unknown["error"]["code"], -32601);
}

#[tokio::test]
async fn test_prompt_handler_protocol_error_passes_through() {
    let d = dispatcher(
        McpServer::builder("s", "1")
            .prompt(
                "strict",
                Prompt::builder("Rejects everything")
                    .handler(|_ctx| async { Err(BoxError::from(McpError::invalid_params("no topic"))) })
                    .build(),
            )
            .build()
            .unwrap(),
    );

    let reply = request(&d, "prompts/get", json!({"name": "strict"})).await;
    assert_eq!(reply["error"]["code"], -32602);
    assert_eq!(reply["error"]["message"], "no topic");
}
