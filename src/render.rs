//! HTML rendering for the bundled [`Dom`].
//!
//! Serialises live subtrees to markup, optionally emitting each keyed
//! node's key as an attribute for debugging list reconciliation.

use crate::attr::Attrs;
use crate::host::Host;
use crate::id::NodeId;
use crate::node::{Dom, NodeKind};
use crate::parse::is_void_element;

// =============================================================================
// RenderConfig
// =============================================================================

/// Default attribute name for list keys.
pub const DEFAULT_KEY_ATTR: &str = "data-stencil-key";

/// Configuration for HTML rendering.
#[derive(Debug, Clone)]
pub struct RenderConfig {
    /// Whether to emit the key of keyed nodes as an attribute.
    pub emit_keys: bool,
    /// Attribute name for keys (default: "data-stencil-key").
    pub key_attr_name: String,
}

impl RenderConfig {
    /// Development config (emit keys).
    pub const DEV: Self = Self {
        emit_keys: true,
        key_attr_name: String::new(), // Will use DEFAULT_KEY_ATTR
    };

    /// Production config (no keys).
    pub const PROD: Self = Self {
        emit_keys: false,
        key_attr_name: String::new(),
    };

    /// Create a new config.
    pub fn new(emit_keys: bool) -> Self {
        Self { emit_keys, key_attr_name: DEFAULT_KEY_ATTR.to_string() }
    }

    /// Set custom attribute name for keys.
    pub fn with_key_attr(mut self, attr_name: impl Into<String>) -> Self {
        self.key_attr_name = attr_name.into();
        self
    }

    /// Get the attribute name for keys.
    pub fn key_attr(&self) -> &str {
        if self.key_attr_name.is_empty() {
            DEFAULT_KEY_ATTR
        } else {
            &self.key_attr_name
        }
    }
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self::PROD
    }
}

// =============================================================================
// Rendering
// =============================================================================

/// Render a node and its subtree. Stale handles render as nothing.
pub fn render_node(dom: &Dom, id: NodeId, config: &RenderConfig) -> String {
    let mut output = String::new();
    write_node(dom, id, config, &mut output);
    output
}

/// Render the children of a node, e.g. the whole document.
pub fn render_children(dom: &Dom, id: NodeId, config: &RenderConfig) -> String {
    let mut output = String::new();
    for child in dom.children(id) {
        write_node(dom, child, config, &mut output);
    }
    output
}

fn write_node(dom: &Dom, id: NodeId, config: &RenderConfig, output: &mut String) {
    match dom.kind(id) {
        None => {}
        Some(NodeKind::Fragment) => {
            for child in dom.children(id) {
                write_node(dom, child, config, output);
            }
        }
        Some(NodeKind::Text(text)) => {
            let raw = dom
                .parent(id)
                .and_then(|p| dom.tag_name(p))
                .is_some_and(|tag| matches!(tag, "script" | "style"));
            if raw {
                output.push_str(text);
            } else {
                output.push_str(&escape_html(text));
            }
        }
        Some(NodeKind::Comment(content)) => {
            output.push_str("<!--");
            output.push_str(content);
            output.push_str("-->");
        }
        Some(NodeKind::Element { tag, attrs }) => {
            output.push('<');
            output.push_str(tag);
            write_attrs(attrs, output);

            if config.emit_keys {
                if let Some(key) = dom.key_of(id) {
                    output.push(' ');
                    output.push_str(config.key_attr());
                    output.push_str("=\"");
                    output.push_str(&escape_attr(key));
                    output.push('"');
                }
            }

            // Void elements
            if is_void_element(tag) {
                output.push_str(" />");
                return;
            }

            output.push('>');
            for child in dom.children(id) {
                write_node(dom, child, config, output);
            }
            output.push_str("</");
            output.push_str(tag);
            output.push('>');
        }
    }
}

fn write_attrs(attrs: &Attrs, output: &mut String) {
    for (name, value) in attrs.iter() {
        output.push(' ');
        output.push_str(name);
        if value.is_empty() {
            continue;
        }
        output.push_str("=\"");
        output.push_str(&escape_attr(value));
        output.push('"');
    }
}

/// Escape HTML special characters.
fn escape_html(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => result.push_str("&amp;"),
            '<' => result.push_str("&lt;"),
            '>' => result.push_str("&gt;"),
            _ => result.push(c),
        }
    }
    result
}

/// Escape attribute value special characters.
fn escape_attr(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => result.push_str("&amp;"),
            '"' => result.push_str("&quot;"),
            '<' => result.push_str("&lt;"),
            '>' => result.push_str("&gt;"),
            _ => result.push(c),
        }
    }
    result
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commit::LiveInstance;
    use crate::marker::Markers;
    use crate::registry::Registry;
    use crate::value::{template, KeyedList};

    fn rendered(t: &crate::value::TemplateResult, config: &RenderConfig) -> String {
        let mut dom = Dom::new();
        let registry = Registry::new();
        let mut instance = LiveInstance::render(&mut dom, &registry, t).unwrap();
        let root = dom.document();
        instance.mount(&mut dom, root).unwrap();
        render_children(&dom, root, config)
    }

    #[test]
    fn test_render_committed_markup() {
        let t = template(
            ["<a href=\"", "\" class=\"x ", "\" onclick=", ">", "<br></a>"],
            vec!["/home".into(), "".into(), crate::value::Handler::new("go", |_| {}).into(), "1 < 2".into()],
        );
        let html = rendered(&t, &RenderConfig::PROD);
        let placeholder = Markers::get().placeholder();
        assert_eq!(html, format!("<a href=\"/home\" class=\"x\">{placeholder}1 &lt; 2<br /></a>"));
        assert!(!html.contains(Markers::get().attr()));
    }

    #[test]
    fn test_boolean_attribute_and_escaping() {
        let t = template(["<input disabled=", " title=\"", "\">"], vec![true.into(), "\"q\"".into()]);
        let html = rendered(&t, &RenderConfig::PROD);
        assert_eq!(html, "<input disabled title=\"&quot;q&quot;\" />");
    }

    #[test]
    fn test_emit_keys() {
        let list = KeyedList::new(["a"], |k| *k, |k| template(["<li>", "</li>"], vec![k.into()]));
        let t = template(["<ul>", "</ul>"], vec![list.into()]);

        let html = rendered(&t, &RenderConfig::DEV);
        assert!(html.contains("<li data-stencil-key=\"a\">"));

        let html = rendered(&t, &RenderConfig::new(true).with_key_attr("data-k"));
        assert!(html.contains("<li data-k=\"a\">"));
        assert!(!rendered(&t, &RenderConfig::PROD).contains("data-"));
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(escape_html("<script>"), "&lt;script&gt;");
        assert_eq!(escape_html("a & b"), "a &amp; b");
    }

    #[test]
    fn test_stale_handle_renders_nothing() {
        let mut dom = Dom::new();
        let p = dom.create_element("p");
        dom.remove(p).unwrap();
        assert_eq!(render_node(&dom, p, &RenderConfig::default()), "");
    }
}
