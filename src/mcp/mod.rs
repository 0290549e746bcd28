//! Model Context Protocol (MCP) server implementation.
//!
//! Applications describe their capabilities (tools, prompts, resources and
//! UI widgets) with builders, freeze them into an [`McpServer`], and hand
//! that to a [`Dispatcher`] which answers JSON-RPC 2.0 requests over HTTP
//! or stdio.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                          MCP Server                          │
//! │                                                              │
//! │   ┌─────────────┐    ┌─────────────┐    ┌─────────────────┐  │
//! │   │  Transport  │───▶│ Dispatcher  │───▶│  Capabilities   │  │
//! │   │(http/stdio) │    │(method tree)│    │ tools, prompts, │  │
//! │   └─────────────┘    └─────────────┘    │ resources,      │  │
//! │          │                  │           │ widgets         │  │
//! │          ▼                  ▼           └─────────────────┘  │
//! │   ┌─────────────────────────────────────────────────┐        │
//! │   │              JSON-RPC Messages                  │        │
//! │   └─────────────────────────────────────────────────┘        │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Protocol Version
//!
//! This implementation targets MCP protocol version 2025-06-18 and accepts
//! the earlier revisions listed in [`protocol::SUPPORTED_PROTOCOL_VERSIONS`].

pub mod content;
pub mod context;
pub mod dispatcher;
pub mod error;
pub mod http;
pub mod prompt;
pub mod protocol;
pub mod resource;
pub mod schema;
pub mod server;
pub mod template;
pub mod tool;
pub mod transport;
pub mod widget;

pub use context::RequestContext;
pub use dispatcher::Dispatcher;
pub use error::{BoxError, McpError, McpResult};
pub use prompt::{Prompt, PromptMessage, PromptOutput};
pub use protocol::{JsonRpcError, JsonRpcRequest, JsonRpcResponse, MCP_PROTOCOL_VERSION};
pub use resource::{Resource, ResourceOutput};
pub use schema::{InputSchema, ObjectSchema, PropertyType, TypedSchema};
pub use server::McpServer;
pub use tool::{Tool, ToolOutput};
pub use transport::StdioTransport;
pub use widget::{Widget, WidgetOptions};
