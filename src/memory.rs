//! Memory extraction: where every dynamic position lives in a template tree.
//!
//! A [`Memory`] is the typed, path-addressed record of one slot. Memories are
//! extracted once per skeleton by a pre-order walk and shared read-only by
//! every instance, so `memories[i]` always pairs with `values[i]`.
//!
//! # Attribute templates
//!
//! An attribute value with markers is split into sub-parts (by `;` for
//! `style`, by whitespace otherwise). Each marker occurrence becomes one
//! Memory pointing at the shared [`AttrTemplate`] of its attribute, so an
//! attribute like `class="btn ${size} ${variant}"` yields two Memories that
//! splice into the same template.

use std::sync::Arc;

use compact_str::CompactString;
use smallvec::SmallVec;

use crate::marker::Markers;
use crate::node::{Fragment, Node};

/// Child-index route from the template root; `path[0]` indexes the
/// fragment's top-level children.
pub type Path = SmallVec<[u32; 8]>;

/// What kind of position a Memory addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MemoryKind {
    /// A child position anchored by a placeholder comment (or a raw-text node)
    Node,
    /// A slot inside an attribute value
    Attribute,
    /// An `on*` attribute bound to a handler
    Event,
}

/// One dynamic position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Memory {
    pub kind: MemoryKind,
    /// Route to the element (attribute/event) or node (node positions)
    pub path: Path,
    /// Index of this marker among those in the same comment, or among the
    /// slots of the same attribute
    pub occurrence: u32,
    /// Node position inside a raw-text element; only text can go here
    pub text_only: bool,
    /// Attribute details for attribute and event memories
    pub attribute: Option<AttributeSite>,
}

impl Memory {
    pub fn attribute_name(&self) -> Option<&str> {
        self.attribute.as_ref().map(|a| a.name.as_str())
    }

    pub fn is_event(&self) -> bool {
        self.kind == MemoryKind::Event
    }

    pub fn targets_component(&self) -> bool {
        self.attribute.as_ref().is_some_and(|a| a.targets_component)
    }
}

/// Attribute details of an attribute or event memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeSite {
    /// Attribute name as written (lowercase)
    pub name: CompactString,
    /// Template shared by every memory of this attribute
    pub template: Arc<AttrTemplate>,
    /// Sub-part this slot lives in
    pub part: u32,
    /// Owning element's tag contains `-`
    pub targets_component: bool,
}

// =============================================================================
// AttrTemplate
// =============================================================================

/// One sub-part of an attribute value.
///
/// `statics` has one more entry than the part has slots: rendering
/// interleaves them with slot values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttrPart {
    pub statics: SmallVec<[CompactString; 2]>,
}

impl AttrPart {
    pub fn slot_count(&self) -> usize {
        self.statics.len() - 1
    }

    pub fn is_dynamic(&self) -> bool {
        self.statics.len() > 1
    }
}

/// Decomposed attribute value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttrTemplate {
    pub parts: Vec<AttrPart>,
    /// `;` for `style`, a space otherwise
    pub separator: char,
}

impl AttrTemplate {
    /// Split a marker-annotated value into parts.
    pub fn parse(name: &str, value: &str) -> Self {
        let marker = Markers::get().attr();
        let separator = if name == "style" { ';' } else { ' ' };

        let raw_parts: Vec<&str> = if separator == ';' {
            value.split(';').map(str::trim).filter(|p| !p.is_empty()).collect()
        } else {
            value.split_whitespace().collect()
        };

        let parts = raw_parts
            .into_iter()
            .map(|part| AttrPart { statics: part.split(marker).map(CompactString::from).collect() })
            .collect();

        Self { parts, separator }
    }

    /// Total slots across all parts.
    pub fn slot_count(&self) -> usize {
        self.parts.iter().map(AttrPart::slot_count).sum()
    }

    /// The whole value is exactly one marker.
    pub fn is_single_marker(&self) -> bool {
        matches!(self.parts.as_slice(), [part] if part.statics.len() == 2 && part.statics.iter().all(|s| s.is_empty()))
    }

    /// Splice slot values into the template.
    ///
    /// `values` are indexed by slot order across parts. A dynamic part whose
    /// slots are all empty is dropped.
    pub fn render(&self, values: &[CompactString]) -> String {
        let mut out = String::new();
        let mut slot = 0;
        for part in &self.parts {
            let slots = &values[slot.min(values.len())..(slot + part.slot_count()).min(values.len())];
            slot += part.slot_count();
            if part.is_dynamic() && slots.iter().all(|v| v.is_empty()) {
                continue;
            }
            if !out.is_empty() {
                out.push(self.separator);
            }
            for (i, static_text) in part.statics.iter().enumerate() {
                out.push_str(static_text);
                if let Some(v) = slots.get(i).filter(|_| i < part.slot_count()) {
                    out.push_str(v);
                }
            }
        }
        out
    }
}

// =============================================================================
// Extraction
// =============================================================================

/// Extract memories from a template tree in pre-order.
pub fn extract(fragment: &Fragment) -> Vec<Memory> {
    let mut out = Vec::new();
    let mut path = Path::new();
    walk(&fragment.children, &mut path, &mut out);
    out
}

fn walk(nodes: &[Node], path: &mut Path, out: &mut Vec<Memory>) {
    let markers = Markers::get();

    for (i, node) in nodes.iter().enumerate() {
        path.push(i as u32);
        match node {
            Node::Element(elem) => {
                for (name, value) in &elem.attrs {
                    if markers.count_attr(value) == 0 {
                        continue;
                    }
                    let template = Arc::new(AttrTemplate::parse(name, value));
                    let kind = if name.starts_with("on") { MemoryKind::Event } else { MemoryKind::Attribute };
                    let mut occurrence = 0;
                    for (part_index, part) in template.parts.iter().enumerate() {
                        for _ in 0..part.slot_count() {
                            out.push(Memory {
                                kind,
                                path: path.clone(),
                                occurrence,
                                text_only: false,
                                attribute: Some(AttributeSite {
                                    name: name.clone(),
                                    template: Arc::clone(&template),
                                    part: part_index as u32,
                                    targets_component: elem.is_component(),
                                }),
                            });
                            occurrence += 1;
                        }
                    }
                }
                walk(&elem.children, path, out);
            }
            Node::Comment(content) => {
                for occurrence in 0..markers.count_node(content) as u32 {
                    out.push(Memory { kind: MemoryKind::Node, path: path.clone(), occurrence, text_only: false, attribute: None });
                }
            }
            Node::Text(text) => {
                if text.content == markers.placeholder() {
                    out.push(Memory { kind: MemoryKind::Node, path: path.clone(), occurrence: 0, text_only: true, attribute: None });
                }
            }
        }
        path.pop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::{compile, CompileOptions};
    use crate::parse::parse;

    fn memories_of(fragments: &[&str]) -> Vec<Memory> {
        let compiled = compile(fragments, &CompileOptions::default()).unwrap();
        extract(&parse(&compiled.markup))
    }

    #[test]
    fn test_class_slot_is_attribute_memory() {
        let mems = memories_of(&["<div class=\"", "\"></div>"]);
        assert_eq!(mems.len(), 1);
        assert_eq!(mems[0].kind, MemoryKind::Attribute);
        assert_eq!(mems[0].attribute_name(), Some("class"));
        assert_eq!(mems[0].path.as_slice(), &[0]);
    }

    #[test]
    fn test_text_slot_is_node_memory() {
        let mems = memories_of(&["<p>", "</p>"]);
        assert_eq!(mems.len(), 1);
        assert_eq!(mems[0].kind, MemoryKind::Node);
        assert_eq!(mems[0].path.as_slice(), &[0, 0]);
        assert!(!mems[0].text_only);
    }

    #[test]
    fn test_preorder_matches_slot_order() {
        let mems = memories_of(&["<a href=\"", "\" onclick=", ">", "</a><b>", "</b>"]);
        let kinds: Vec<_> = mems.iter().map(|m| m.kind).collect();
        assert_eq!(kinds, [MemoryKind::Attribute, MemoryKind::Event, MemoryKind::Node, MemoryKind::Node]);
        assert!(mems[1].is_event());
        assert_eq!(mems[3].path.as_slice(), &[1, 0]);
    }

    #[test]
    fn test_multi_slot_attribute_shares_template() {
        let mems = memories_of(&["<i class=\"btn ", " x-", "\" style=\"color: ", "; margin: 0\"></i>"]);
        assert_eq!(mems.len(), 3);
        let class = mems[0].attribute.as_ref().unwrap();
        assert!(Arc::ptr_eq(&class.template, &mems[1].attribute.as_ref().unwrap().template));
        assert_eq!(class.template.parts.len(), 3);
        assert_eq!((mems[0].occurrence, mems[1].occurrence), (0, 1));
        assert_eq!(mems[1].attribute.as_ref().unwrap().part, 2);

        let style = &mems[2].attribute.as_ref().unwrap().template;
        assert_eq!(style.separator, ';');
        assert_eq!(style.parts.len(), 2);
    }

    #[test]
    fn test_component_target_and_raw_text() {
        let mems = memories_of(&["<user-card name=", "></user-card><textarea>", "</textarea>"]);
        assert!(mems[0].targets_component());
        assert!(mems[1].text_only);
        assert_eq!(mems[1].path.as_slice(), &[1, 0]);
    }

    #[test]
    fn test_comment_occurrences_merge() {
        let mems = memories_of(&["<!--", "", "-->"]);
        assert_eq!(mems.len(), 2);
        assert_eq!(mems[0].path, mems[1].path);
        assert_eq!((mems[0].occurrence, mems[1].occurrence), (0, 1));
    }

    #[test]
    fn test_independent_clones_extract_identically() {
        let compiled = compile(&["<ul class=\"", "\">", "<li>", "</li></ul>"], &CompileOptions::default()).unwrap();
        let tree = parse(&compiled.markup);
        let a = extract(&tree.clone());
        let b = extract(&tree.clone());
        let shape = |m: &[Memory]| m.iter().map(|m| (m.kind, m.path.clone())).collect::<Vec<_>>();
        assert_eq!(shape(&a), shape(&b));
    }

    #[test]
    fn test_attr_template_render() {
        let m = Markers::get().attr();
        let t = AttrTemplate::parse("class", &format!("btn {m} x-{m}"));
        assert_eq!(t.slot_count(), 2);
        assert!(!t.is_single_marker());
        assert_eq!(t.render(&["big".into(), "red".into()]), "btn big x-red");
        // Empty dynamic parts are dropped
        assert_eq!(t.render(&["".into(), "red".into()]), "btn x-red");
        assert_eq!(t.render(&["".into(), "".into()]), "btn");

        let single = AttrTemplate::parse("disabled", m);
        assert!(single.is_single_marker());

        let style = AttrTemplate::parse("style", &format!("color: {m}; margin: 0"));
        assert_eq!(style.render(&["red".into()]), "color: red;margin: 0");
    }
}
