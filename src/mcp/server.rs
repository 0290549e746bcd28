//! Server definition: identity plus the capability registries.
//!
//! An [`McpServer`] is built once from a [`ServerBuilder`] and never changes
//! afterwards. Building describes every capability up front, so a schema
//! that cannot be advertised is reported at startup rather than on the
//! first `tools/list`.

use std::sync::Arc;

use indexmap::IndexMap;
use serde::Serialize;

use crate::error::ConfigError;
use crate::mcp::prompt::{Prompt, PromptDescriptor};
use crate::mcp::resource::{Resource, ResourceDescriptor, ResourceInfo, ResourceTemplateInfo};
use crate::mcp::tool::{Tool, ToolDescriptor};
use crate::mcp::widget::Widget;

/// Server information for initialisation response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServerInfo {
    /// Server name.
    pub name: String,
    /// Server version.
    pub version: String,
}

impl Default for ServerInfo {
    fn default() -> Self {
        Self {
            name: env!("CARGO_PKG_NAME").to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Collects capabilities before freezing them into an [`McpServer`].
#[derive(Debug, Default)]
pub struct ServerBuilder {
    info: ServerInfo,
    domain: String,
    tools: IndexMap<String, Tool>,
    prompts: IndexMap<String, Prompt>,
    resources: IndexMap<String, Resource>,
    widgets: IndexMap<String, Arc<Widget>>,
}

impl ServerBuilder {
    /// Starts a server called `name` at `version`.
    #[must_use]
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            info: ServerInfo {
                name: name.into(),
                version: version.into(),
            },
            ..Self::default()
        }
    }

    /// Sets the public origin that serves widget bundles.
    #[must_use]
    pub fn domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = domain.into();
        self
    }

    /// Registers a tool. Its linked widget, if any, is registered too.
    #[must_use]
    pub fn tool(mut self, name: impl Into<String>, tool: Tool) -> Self {
        if let Some(widget) = tool.widget() {
            self.widgets
                .entry(widget.id().to_string())
                .or_insert_with(|| Arc::clone(widget));
        }
        let name = name.into();
        if self.tools.insert(name.clone(), tool).is_some() {
            tracing::warn!(tool = %name, "Tool registered twice, keeping the last one");
        }
        self
    }

    /// Registers a prompt.
    #[must_use]
    pub fn prompt(mut self, name: impl Into<String>, prompt: Prompt) -> Self {
        let name = name.into();
        if self.prompts.insert(name.clone(), prompt).is_some() {
            tracing::warn!(prompt = %name, "Prompt registered twice, keeping the last one");
        }
        self
    }

    /// Registers a resource.
    #[must_use]
    pub fn resource(mut self, name: impl Into<String>, resource: Resource) -> Self {
        let name = name.into();
        if self.resources.insert(name.clone(), resource).is_some() {
            tracing::warn!(resource = %name, "Resource registered twice, keeping the last one");
        }
        self
    }

    /// Registers a widget under its id.
    #[must_use]
    pub fn widget(mut self, widget: Arc<Widget>) -> Self {
        self.widgets.insert(widget.id().to_string(), widget);
        self
    }

    /// Freezes the registries.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidCapability`] if a tool or prompt schema
    /// cannot be described.
    pub fn build(self) -> Result<McpServer, ConfigError> {
        let tool_descriptors = self
            .tools
            .iter()
            .map(|(name, tool)| {
                tool.describe(name)
                    .map_err(|source| ConfigError::InvalidCapability {
                        kind: "tool",
                        name: name.clone(),
                        source,
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let prompt_descriptors = self
            .prompts
            .iter()
            .map(|(name, prompt)| {
                prompt
                    .describe(name)
                    .map_err(|source| ConfigError::InvalidCapability {
                        kind: "prompt",
                        name: name.clone(),
                        source,
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let widget_resources: IndexMap<String, Resource> = self
            .widgets
            .iter()
            .map(|(id, widget)| (id.clone(), widget.to_resource(&self.domain)))
            .collect();

        let mut resource_infos = Vec::new();
        let mut template_infos = Vec::new();
        for (name, resource) in &self.resources {
            match resource.describe(name) {
                ResourceDescriptor::Concrete(info) => resource_infos.push(info),
                ResourceDescriptor::Template(info) => template_infos.push(info),
            }
        }
        for (id, resource) in &widget_resources {
            let name = self.widgets.get(id).map_or(id.as_str(), |w| w.display_name());
            if let ResourceDescriptor::Concrete(info) = resource.describe(name) {
                resource_infos.push(info);
            }
        }

        tracing::debug!(
            tools = self.tools.len(),
            prompts = self.prompts.len(),
            resources = self.resources.len(),
            widgets = self.widgets.len(),
            "Capability registries built"
        );

        Ok(McpServer {
            info: self.info,
            domain: self.domain,
            tools: self.tools,
            prompts: self.prompts,
            resources: self.resources,
            widgets: self.widgets,
            widget_resources,
            tool_descriptors,
            prompt_descriptors,
            resource_infos,
            template_infos,
        })
    }
}

/// An immutable set of capabilities and their precomputed descriptors.
#[derive(Debug)]
pub struct McpServer {
    info: ServerInfo,
    domain: String,
    tools: IndexMap<String, Tool>,
    prompts: IndexMap<String, Prompt>,
    resources: IndexMap<String, Resource>,
    widgets: IndexMap<String, Arc<Widget>>,
    widget_resources: IndexMap<String, Resource>,
    tool_descriptors: Vec<ToolDescriptor>,
    prompt_descriptors: Vec<PromptDescriptor>,
    resource_infos: Vec<ResourceInfo>,
    template_infos: Vec<ResourceTemplateInfo>,
}

impl McpServer {
    /// Starts a [`ServerBuilder`].
    #[must_use]
    pub fn builder(name: impl Into<String>, version: impl Into<String>) -> ServerBuilder {
        ServerBuilder::new(name, version)
    }

    /// Name and version.
    #[must_use]
    pub const fn info(&self) -> &ServerInfo {
        &self.info
    }

    /// Origin serving widget bundles.
    #[must_use]
    pub fn domain(&self) -> &str {
        &self.domain
    }

    /// Looks up a tool.
    #[must_use]
    pub fn tool(&self, name: &str) -> Option<&Tool> {
        self.tools.get(name)
    }

    /// Looks up a prompt.
    #[must_use]
    pub fn prompt(&self, name: &str) -> Option<&Prompt> {
        self.prompts.get(name)
    }

    /// Looks up a resource by registry name.
    #[must_use]
    pub fn resource(&self, name: &str) -> Option<&Resource> {
        self.resources.get(name)
    }

    /// Looks up a widget by id.
    #[must_use]
    pub fn widget(&self, id: &str) -> Option<&Arc<Widget>> {
        self.widgets.get(id)
    }

    /// The resource serving widget `id`.
    #[must_use]
    pub fn widget_resource(&self, id: &str) -> Option<&Resource> {
        self.widget_resources.get(id)
    }

    /// `true` if any tool is registered.
    #[must_use]
    pub fn has_tools(&self) -> bool {
        !self.tools.is_empty()
    }

    /// `true` if any prompt is registered.
    #[must_use]
    pub fn has_prompts(&self) -> bool {
        !self.prompts.is_empty()
    }

    /// `true` if any resource or widget is registered.
    #[must_use]
    pub fn has_resources(&self) -> bool {
        !self.resources.is_empty() || !self.widgets.is_empty()
    }

    /// `tools/list` payload.
    #[must_use]
    pub fn tool_descriptors(&self) -> &[ToolDescriptor] {
        &self.tool_descriptors
    }

    /// `prompts/list` payload.
    #[must_use]
    pub fn prompt_descriptors(&self) -> &[PromptDescriptor] {
        &self.prompt_descriptors
    }

    /// `resources/list` payload: concrete resources, then widgets.
    #[must_use]
    pub fn resource_infos(&self) -> &[ResourceInfo] {
        &self.resource_infos
    }

    /// `resources/templates/list` payload.
    #[must_use]
    pub fn template_infos(&self) -> &[ResourceTemplateInfo] {
        &self.template_infos
    }

    /// Finds the resource answering `uri`.
    ///
    /// An exact URI match wins. Otherwise the templates whose pattern
    /// matches `uri` are considered and the most specific one (most literal
    /// characters) is chosen, the earliest registered on ties.
    #[must_use]
    pub fn find_resource(&self, uri: &str) -> Option<&Resource> {
        if let Some(resource) = self
            .resources
            .values()
            .find(|r| !r.is_template() && r.uri() == uri)
        {
            return Some(resource);
        }

        self.resources
            .values()
            .filter_map(|r| {
                let template = r.template()?;
                template.matches(uri).map(|_| (template.specificity(), r))
            })
            .fold(None, |best: Option<(usize, &Resource)>, (score, r)| match best {
                Some((best_score, _)) if best_score >= score => best,
                _ => Some((score, r)),
            })
            .map(|(_, r)| r)
    }
}
