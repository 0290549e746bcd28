//! UI widgets.
//!
//! A widget links a tool to a UI bundle built elsewhere. It shows up in two
//! places:
//!
//! - as a resource at `widget://{id}.js` whose contents are a small HTML
//!   document that loads `{domain}/widgets/{id}.js`
//! - as metadata on every tool that references it, pointing the host at
//!   that resource
//!
//! The tool metadata is the only link between a tool result and a bundle.

use serde_json::{json, Map, Value};

use crate::mcp::resource::{Resource, ResourceOutput};

/// URI scheme of widget resources.
pub const WIDGET_SCHEME: &str = "widget://";

/// MIME type hosts expect for widget documents.
pub const WIDGET_MIME_TYPE: &str = "text/html+skybridge";

/// Display options for a widget.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WidgetOptions {
    /// Human-readable name.
    pub name: String,
    /// What the widget shows.
    pub description: String,
    /// Status text while the linked tool runs.
    pub invoking: String,
    /// Status text once the linked tool finished.
    pub invoked: String,
    /// Whether the host should draw a border around the widget.
    pub prefers_border: bool,
}

/// A UI widget backed by an externally built bundle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Widget {
    id: String,
    options: WidgetOptions,
}

impl Widget {
    /// Creates a widget for the bundle identified by `id`.
    #[must_use]
    pub fn new(id: impl Into<String>, options: WidgetOptions) -> Self {
        Self {
            id: id.into(),
            options,
        }
    }

    /// The bundle identifier.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Name shown in resource listings: the configured name, or the id
    /// when none was given.
    #[must_use]
    pub fn display_name(&self) -> &str {
        if self.options.name.is_empty() {
            &self.id
        } else {
            &self.options.name
        }
    }

    /// Display options.
    #[must_use]
    pub const fn options(&self) -> &WidgetOptions {
        &self.options
    }

    /// `widget://{id}.js`
    #[must_use]
    pub fn uri(&self) -> String {
        format!("{WIDGET_SCHEME}{}.js", self.id)
    }

    /// Metadata merged into linked tools' descriptors and call results.
    #[must_use]
    pub fn tool_metadata(&self) -> Map<String, Value> {
        let mut meta = Map::new();
        meta.insert("openai/outputTemplate".into(), json!(self.uri()));
        meta.insert(
            "openai/toolInvocation/invoking".into(),
            json!(self.options.invoking),
        );
        meta.insert(
            "openai/toolInvocation/invoked".into(),
            json!(self.options.invoked),
        );
        meta.insert("openai/resultCanProduceWidget".into(), json!(true));
        meta
    }

    /// Metadata attached to the widget's own resource.
    #[must_use]
    pub fn resource_metadata(&self) -> Map<String, Value> {
        let mut meta = Map::new();
        meta.insert(
            "openai/widgetDescription".into(),
            json!(self.options.description),
        );
        meta.insert(
            "openai/widgetPrefersBorder".into(),
            json!(self.options.prefers_border),
        );
        meta
    }

    /// Where the compiled bundle is served.
    #[must_use]
    pub fn bundle_url(&self, domain: &str) -> String {
        format!("{}/widgets/{}.js", domain.trim_end_matches('/'), self.id)
    }

    /// Renders the HTML document that boots the bundle.
    ///
    /// The script tag carries `nonce` for the host's content security
    /// policy and the bundle URL carries `version` to defeat caches.
    /// Calling `window.__widgetReload()` loads the bundle again.
    #[must_use]
    pub fn render_document(&self, domain: &str, nonce: &str, version: i64) -> String {
        let src = script_literal(&self.bundle_url(domain));
        let nonce_literal = script_literal(nonce);
        let nonce_attr = nonce.replace('"', "&quot;");

        format!(
            r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
</head>
<body>
<div id="root"></div>
<script nonce="{nonce_attr}">
(function () {{
  var src = {src};
  var version = "{version}";
  function load() {{
    var previous = document.getElementById("widget-bundle");
    if (previous) {{
      previous.remove();
    }}
    var script = document.createElement("script");
    script.id = "widget-bundle";
    script.type = "module";
    script.nonce = {nonce_literal};
    script.src = src + "?v=" + version;
    document.body.appendChild(script);
  }}
  window.__widgetReload = function () {{
    version = String(Date.now());
    load();
  }};
  load();
}})();
</script>
</body>
</html>
"#
        )
    }

    /// Converts the widget into its resource, serving documents that load
    /// the bundle from `domain`.
    #[must_use]
    pub fn to_resource(&self, domain: &str) -> Resource {
        let widget = self.clone();
        let domain = domain.to_string();

        Resource::builder(self.uri(), self.options.description.clone())
            .mime_type(WIDGET_MIME_TYPE)
            .metadata(self.resource_metadata())
            .handler(move |_ctx| {
                let nonce = uuid::Uuid::new_v4().simple().to_string();
                let version = chrono::Utc::now().timestamp_millis();
                let document = widget.render_document(&domain, &nonce, version);
                async move { Ok(ResourceOutput::Text(document)) }
            })
            .build()
    }
}

/// A JS string literal that is also safe inside an inline `<script>`.
fn script_literal(text: &str) -> String {
    Value::String(text.to_string())
        .to_string()
        .replace('<', "\\u003c")
}

/// Extracts the widget id from a `widget://{id}.js` URI.
///
/// Returns `None` for other schemes or an empty id.
#[must_use]
pub fn widget_id_from_uri(uri: &str) -> Option<&str> {
    let token = uri.strip_prefix(WIDGET_SCHEME)?;
    let id = token.strip_suffix(".js").unwrap_or(token);
    (!id.is_empty()).then_some(id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mcp::resource::{ResourceContents, ResourceDescriptor};

    fn greeting() -> Widget {
        Widget::new(
            "greeting",
            WidgetOptions {
                name: "Greeting".into(),
                description: "Shows a greeting card".into(),
                invoking: "Writing card...".into(),
                invoked: "Card ready".into(),
                prefers_border: true,
            },
        )
    }

    #[test]
    fn uri_shape() {
        assert_eq!(greeting().uri(), "widget://greeting.js");
    }

    #[test]
    fn tool_metadata_points_at_widget_resource() {
        let meta = greeting().tool_metadata();
        assert_eq!(meta["openai/outputTemplate"], "widget://greeting.js");
        assert_eq!(meta["openai/toolInvocation/invoking"], "Writing card...");
        assert_eq!(meta["openai/toolInvocation/invoked"], "Card ready");
        assert_eq!(meta["openai/resultCanProduceWidget"], true);
    }

    #[test]
    fn id_extraction() {
        assert_eq!(widget_id_from_uri("widget://greeting.js"), Some("greeting"));
        assert_eq!(widget_id_from_uri("widget://greeting"), Some("greeting"));
        assert_eq!(widget_id_from_uri("widget://.js"), None);
        assert_eq!(widget_id_from_uri("file://greeting.js"), None);
    }

    #[test]
    fn document_loads_bundle_with_nonce_and_version() {
        let html = greeting().render_document("https://app.example.com/", "abc123", 42);
        assert!(html.contains(r#"var src = "https://app.example.com/widgets/greeting.js";"#));
        assert!(html.contains(r#"<script nonce="abc123">"#));
        assert!(html.contains(r#"var version = "42";"#));
        assert!(html.contains("window.__widgetReload"));
    }

    #[test]
    fn document_cannot_be_closed_from_a_literal() {
        let widget = Widget::new("x</script><script>alert(1)//", WidgetOptions::default());
        let html = widget.render_document("https://app.example.com", "n", 1);
        assert_eq!(html.matches("</script>").count(), 1);
        assert!(html.contains("x\\u003c/script>\\u003cscript>alert(1)//.js"));
    }

    #[test]
    fn resource_descriptor_carries_widget_metadata() {
        let ResourceDescriptor::Concrete(info) =
            greeting().to_resource("https://x.dev").describe("greeting")
        else {
            panic!("widget resource must be concrete");
        };
        assert_eq!(info.uri, "widget://greeting.js");
        assert_eq!(info.mime_type.as_deref(), Some(WIDGET_MIME_TYPE));
        assert_eq!(info.meta["openai/widgetPrefersBorder"], true);
    }

    #[test]
    fn display_name_falls_back_to_id() {
        assert_eq!(greeting().display_name(), "Greeting");
        let bare = Widget::new("plain", WidgetOptions::default());
        assert_eq!(bare.display_name(), "plain");
    }

    #[tokio::test]
    async fn resource_read_returns_fresh_nonce_each_time() {
        let resource = greeting().to_resource("https://x.dev");
        let first = resource.read("widget://greeting.js", "s").await.unwrap();
        let second = resource.read("widget://greeting.js", "s").await.unwrap();

        let (ResourceContents::Text { text: a, mime_type, .. }, ResourceContents::Text { text: b, .. }) =
            (&first.contents[0], &second.contents[0])
        else {
            panic!("widget documents are text");
        };
        assert_eq!(mime_type.as_deref(), Some(WIDGET_MIME_TYPE));
        assert!(a.contains("https://x.dev/widgets/greeting.js"));
        assert_ne!(a, b);
    }
}
