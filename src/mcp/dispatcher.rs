//! Request routing.
//!
//! The [`Dispatcher`] owns an immutable [`McpServer`] and a method tree
//! derived from it. Method names are resolved one `/`-separated segment at
//! a time; methods belonging to an empty registry are never inserted, so
//! calling them yields `MethodNotFound` exactly like an unknown method.

use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::mcp::context::RequestContext;
use crate::mcp::error::{McpError, McpResult};
use crate::mcp::protocol::{
    negotiate_version, ErrorCode, IncomingMessage, JsonRpcError, JsonRpcNotification,
    JsonRpcReply, JsonRpcRequest, JsonRpcResponse,
};
use crate::mcp::server::{McpServer, ServerInfo};
use crate::mcp::widget::{widget_id_from_uri, WIDGET_SCHEME};

/// A routable protocol method.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    /// `initialize`
    Initialize,
    /// `ping`
    Ping,
    /// `tools/list`
    ToolsList,
    /// `tools/call`
    ToolsCall,
    /// `resources/list`
    ResourcesList,
    /// `resources/templates/list`
    ResourceTemplatesList,
    /// `resources/read`
    ResourcesRead,
    /// `prompts/list`
    PromptsList,
    /// `prompts/get`
    PromptsGet,
}

#[derive(Debug)]
enum Node {
    Leaf(Method),
    Branch(IndexMap<&'static str, Node>),
}

/// Segment tree of the methods a server answers.
#[derive(Debug, Default)]
pub struct MethodTable {
    root: IndexMap<&'static str, Node>,
}

impl MethodTable {
    /// Builds the table for `server`, leaving out methods of empty registries.
    #[must_use]
    pub fn for_server(server: &McpServer) -> Self {
        let mut table = Self::default();
        table.insert("initialize", Method::Initialize);
        table.insert("ping", Method::Ping);

        if server.has_tools() {
            table.insert("tools/list", Method::ToolsList);
            table.insert("tools/call", Method::ToolsCall);
        }
        if server.has_resources() {
            table.insert("resources/list", Method::ResourcesList);
            table.insert("resources/templates/list", Method::ResourceTemplatesList);
            table.insert("resources/read", Method::ResourcesRead);
        }
        if server.has_prompts() {
            table.insert("prompts/list", Method::PromptsList);
            table.insert("prompts/get", Method::PromptsGet);
        }
        table
    }

    fn insert(&mut self, path: &'static str, method: Method) {
        let segments: Vec<&'static str> = path.split('/').collect();
        let Some((last, parents)) = segments.split_last() else {
            return;
        };

        let mut level = &mut self.root;
        for segment in parents {
            let node = level
                .entry(*segment)
                .or_insert_with(|| Node::Branch(IndexMap::new()));
            if let Node::Leaf(_) = node {
                *node = Node::Branch(IndexMap::new());
            }
            let Node::Branch(children) = node else {
                return;
            };
            level = children;
        }
        level.insert(*last, Node::Leaf(method));
    }

    /// Resolves a method name.
    ///
    /// Returns `None` if a segment is unknown, segments remain after a
    /// leaf, or the name stops at a branch.
    #[must_use]
    pub fn resolve(&self, name: &str) -> Option<Method> {
        let mut level = &self.root;
        let mut segments = name.split('/').peekable();

        while let Some(segment) = segments.next() {
            let is_last = segments.peek().is_none();
            match (level.get(segment)?, is_last) {
                (Node::Leaf(method), true) => return Some(*method),
                (Node::Branch(children), false) => level = children,
                _ => return None,
            }
        }
        None
    }
}

/// Capability flags advertised by `initialize`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ServerCapabilities {
    /// Present when tools are registered.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<ListCapabilities>,
    /// Present when resources or widgets are registered.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resources: Option<ListCapabilities>,
    /// Present when prompts are registered.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompts: Option<ListCapabilities>,
}

impl ServerCapabilities {
    /// Flags for the registries `server` actually has.
    #[must_use]
    pub fn for_server(server: &McpServer) -> Self {
        Self {
            tools: server.has_tools().then(ListCapabilities::default),
            resources: server.has_resources().then(ListCapabilities::default),
            prompts: server.has_prompts().then(ListCapabilities::default),
        }
    }
}

/// Per-capability flags. Registries never change, so this is always `{}`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ListCapabilities {
    /// Whether the list can change during the session.
    #[serde(rename = "listChanged", skip_serializing_if = "is_false")]
    pub list_changed: bool,
}

#[allow(clippy::trivially_copy_pass_by_ref)]
const fn is_false(b: &bool) -> bool {
    !*b
}

/// Client information received during initialisation.
#[derive(Debug, Clone, Deserialize)]
pub struct ClientInfo {
    /// Client name.
    pub name: String,
    /// Client version.
    #[serde(default)]
    pub version: Option<String>,
}

/// Parameters for the initialize request.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeParams {
    /// Protocol version requested by client.
    #[serde(default)]
    pub protocol_version: Option<String>,
    /// Client capabilities.
    #[serde(default)]
    pub capabilities: Value,
    /// Client information.
    #[serde(default)]
    pub client_info: Option<ClientInfo>,
}

/// Result of `initialize`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeResult {
    /// Negotiated protocol version.
    pub protocol_version: &'static str,
    /// Supported capability families.
    pub capabilities: ServerCapabilities,
    /// Server identity.
    pub server_info: ServerInfo,
}

/// Parameters naming a capability plus its arguments.
#[derive(Debug, Clone, Deserialize)]
struct CallParams {
    name: String,
    #[serde(default)]
    arguments: Value,
}

#[derive(Debug, Clone, Deserialize)]
struct ReadParams {
    uri: String,
}

/// Routes JSON-RPC messages to the capabilities of one server.
#[derive(Debug)]
pub struct Dispatcher {
    server: McpServer,
    methods: MethodTable,
}

impl Dispatcher {
    /// Creates a dispatcher for `server`.
    #[must_use]
    pub fn new(server: McpServer) -> Self {
        let methods = MethodTable::for_server(&server);
        Self {
            server,
            methods,
        }
    }

    /// The served capabilities.
    #[must_use]
    pub fn server(&self) -> &McpServer {
        &self.server
    }

    /// Handles one parsed message. Notifications produce no reply.
    pub async fn handle_message(
        &self,
        message: IncomingMessage,
        event: RequestContext,
        session_id: &str,
    ) -> Option<JsonRpcReply> {
        match message {
            IncomingMessage::Request(request) => {
                Some(self.handle_request(request, event, session_id).await)
            }
            IncomingMessage::Notification(ref notification) => {
                Self::handle_notification(notification, session_id);
                None
            }
        }
    }

    /// Handles a request, always producing a reply that echoes its id.
    pub async fn handle_request(
        &self,
        request: JsonRpcRequest,
        event: RequestContext,
        session_id: &str,
    ) -> JsonRpcReply {
        let JsonRpcRequest {
            id, method, params, ..
        } = request;

        match self.dispatch(&method, params, event, session_id).await {
            Ok(result) => JsonRpcResponse::success(id, result).into(),
            Err(error) => {
                if error.code == ErrorCode::InternalError {
                    tracing::error!(%method, %id, error = %error, "Request failed");
                } else {
                    tracing::debug!(%method, %id, error = %error, "Request rejected");
                }
                JsonRpcError::from_mcp(Some(id), error).into()
            }
        }
    }

    fn handle_notification(notification: &JsonRpcNotification, session_id: &str) {
        tracing::debug!(
            method = %notification.method,
            session = %session_id,
            "Notification received"
        );
    }

    /// Resolves `method` and runs it.
    ///
    /// # Errors
    ///
    /// `MethodNotFound` for unroutable methods or unknown tools and prompts,
    /// `InvalidParams` for malformed parameters, plus whatever the target
    /// capability reports.
    pub async fn dispatch(
        &self,
        method: &str,
        params: Option<Value>,
        event: RequestContext,
        session_id: &str,
    ) -> McpResult<Value> {
        let Some(resolved) = self.methods.resolve(method) else {
            return Err(McpError::method_not_found(method));
        };
        tracing::debug!(method, session = %session_id, "Dispatching request");

        match resolved {
            Method::Initialize => self.initialize(params),
            Method::Ping => Ok(json!({})),
            Method::ToolsList => Ok(json!({ "tools": self.server.tool_descriptors() })),
            Method::ToolsCall => self.call_tool(params, event, session_id).await,
            Method::ResourcesList => {
                Ok(json!({ "resources": self.server.resource_infos() }))
            }
            Method::ResourceTemplatesList => {
                Ok(json!({ "resourceTemplates": self.server.template_infos() }))
            }
            Method::ResourcesRead => self.read_resource(params, session_id).await,
            Method::PromptsList => Ok(json!({ "prompts": self.server.prompt_descriptors() })),
            Method::PromptsGet => self.get_prompt(params, session_id).await,
        }
    }

    fn initialize(&self, params: Option<Value>) -> McpResult<Value> {
        let params: InitializeParams = match params {
            Some(params) => parse_params(params, "initialize")?,
            None => InitializeParams::default(),
        };

        let version = negotiate_version(params.protocol_version.as_deref());
        if let Some(client) = &params.client_info {
            tracing::info!(
                client = %client.name,
                client_version = client.version.as_deref().unwrap_or("unknown"),
                protocol = version,
                "Client initialised"
            );
        }

        to_result(&InitializeResult {
            protocol_version: version,
            capabilities: ServerCapabilities::for_server(&self.server),
            server_info: self.server.info().clone(),
        })
    }

    async fn call_tool(
        &self,
        params: Option<Value>,
        event: RequestContext,
        session_id: &str,
    ) -> McpResult<Value> {
        let params: CallParams = require_params(params, "tool call")?;
        let Some(tool) = self.server.tool(&params.name) else {
            return Err(McpError::with_message(
                ErrorCode::MethodNotFound,
                format!("Unknown tool: {}", params.name),
            ));
        };

        tracing::debug!(tool = %params.name, "Calling tool");
        let result = tool.call(params.arguments, event, session_id).await?;
        to_result(&result)
    }

    async fn read_resource(&self, params: Option<Value>, session_id: &str) -> McpResult<Value> {
        let ReadParams { uri } = require_params(params, "resource read")?;

        let resource = if uri.starts_with(WIDGET_SCHEME) {
            widget_id_from_uri(&uri).and_then(|id| self.server.widget_resource(id))
        } else {
            self.server.find_resource(&uri)
        };
        let Some(resource) = resource else {
            return Err(McpError::resource_not_found(&uri));
        };

        let result = resource.read(&uri, session_id).await?;
        to_result(&result)
    }

    async fn get_prompt(&self, params: Option<Value>, session_id: &str) -> McpResult<Value> {
        let params: CallParams = require_params(params, "prompt")?;
        let Some(prompt) = self.server.prompt(&params.name) else {
            return Err(McpError::with_message(
                ErrorCode::MethodNotFound,
                format!("Unknown prompt: {}", params.name),
            ));
        };

        let result = prompt.get(params.arguments, session_id).await?;
        to_result(&result)
    }
}

fn require_params<T: DeserializeOwned>(params: Option<Value>, what: &str) -> McpResult<T> {
    let params = params.ok_or_else(|| McpError::invalid_params(format!("Missing {what} params")))?;
    parse_params(params, what)
}

fn parse_params<T: DeserializeOwned>(params: Value, what: &str) -> McpResult<T> {
    serde_json::from_value(params)
        .map_err(|e| McpError::invalid_params(format!("Invalid {what} params: {e}")))
}

fn to_result<T: Serialize>(value: &T) -> McpResult<Value> {
    serde_json::to_value(value).map_err(|e| {
        tracing::error!(error = %e, "Failed to serialise result");
        McpError::internal("Internal error: failed to serialise result")
    })
}
