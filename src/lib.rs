//! widget-mcp: MCP server framework for tools, prompts, resources and UI widgets
//!
//! Applications register capabilities with builders and serve them over
//! JSON-RPC 2.0. Tools can be linked to widgets: UI bundles built
//! elsewhere, exposed to the host as `widget://{id}.js` resources and
//! referenced from the tool's result metadata.
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use widget_mcp::mcp::{Dispatcher, McpServer, Tool, ToolOutput, Widget, WidgetOptions};
//!
//! # fn main() -> Result<(), widget_mcp::error::ConfigError> {
//! let widget = Arc::new(Widget::new("greeting", WidgetOptions::default()));
//! let server = McpServer::builder("greeter", "1.0.0")
//!     .domain("https://app.example.com")
//!     .tool(
//!         "greet",
//!         Tool::builder("Greets someone")
//!             .widget(widget)
//!             .handler(|_ctx| async { Ok(ToolOutput::text("Hello")) })
//!             .build(),
//!     )
//!     .build()?;
//! let _dispatcher = Dispatcher::new(server);
//! # Ok(())
//! # }
//! ```
//!
//! # Modules
//!
//! - [`config`] — Configuration loading and validation
//! - [`error`] — Error types
//! - [`mcp`] — MCP protocol implementation
//! - [`demo`] — The sample application served by the binary

pub mod config;
pub mod demo;
pub mod error;
pub mod mcp;
