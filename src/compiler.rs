//! Fragment sequence → marker-annotated markup.
//!
//! The compiler only marks *positions*. It tracks just enough markup context
//! (text, inside a tag, inside an attribute value, comment, raw text) to decide
//! which marker flavor a slot gets:
//!
//! | Context at slot            | Emitted                              |
//! |----------------------------|--------------------------------------|
//! | attribute value (quoted)   | attribute token                      |
//! | attribute value (unquoted) | attribute token                      |
//! | directly after `name=`     | `"` + attribute token + `"`          |
//! | text                       | `<!--node token-->`                  |
//! | raw text (`textarea` …)    | `<!--node token-->` (kept as text)   |
//! | comment                    | bare node token (merged placeholder) |
//! | tag, not in a value        | compile error                        |
//!
//! Output is a pure function of the fragments and options, so identical
//! sequences always produce byte-identical markup.

use compact_str::CompactString;

use crate::error::{StencilError, StencilResult};
use crate::marker::Markers;

/// Elements whose content is not parsed as markup.
pub(crate) const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style", "textarea", "title"];

// =============================================================================
// Options
// =============================================================================

/// Options controlling compilation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompileOptions {
    /// Collapse each fragment's leading and trailing whitespace run to a
    /// single space.
    pub normalize_whitespace: bool,
}

impl CompileOptions {
    /// Keep fragments byte-for-byte.
    pub const VERBATIM: Self = Self { normalize_whitespace: false };
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self { normalize_whitespace: true }
    }
}

// =============================================================================
// Output
// =============================================================================

/// Marker flavor assigned to one slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SlotKind {
    /// Inside an attribute value
    Attribute,
    /// A child position
    Node,
    /// Sole content of a raw-text element
    RawText,
    /// Inside a comment
    Comment,
}

/// Result of compiling a fragment sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledMarkup {
    /// Marker-annotated markup
    pub markup: String,
    /// One entry per slot, in emission order
    pub slots: Vec<SlotKind>,
}

// =============================================================================
// Compile
// =============================================================================

/// Compile a fragment sequence into marker-annotated markup.
pub fn compile<S: AsRef<str>>(fragments: &[S], options: &CompileOptions) -> StencilResult<CompiledMarkup> {
    let Some((last, head)) = fragments.split_last() else {
        return Err(StencilError::compile("empty fragment sequence"));
    };

    let markers = Markers::get();
    let mut markup = String::with_capacity(fragments.iter().map(|f| f.as_ref().len() + 32).sum());
    let mut slots = Vec::with_capacity(head.len());
    let mut scanner = Scanner::new();

    for (i, fragment) in head.iter().enumerate() {
        let fragment = fragment.as_ref();
        reject_marker_collision(fragment, i)?;

        let fragment = if options.normalize_whitespace {
            normalize_edges(fragment)
        } else {
            std::borrow::Cow::Borrowed(fragment)
        };

        markup.push_str(&fragment);
        scanner.feed(&fragment);

        let (kind, emitted): (SlotKind, std::borrow::Cow<'_, str>) = match scanner.context {
            Context::Quoted(_) | Context::Unquoted => (SlotKind::Attribute, markers.attr().into()),
            Context::BeforeValue => (SlotKind::Attribute, format!("\"{}\"", markers.attr()).into()),
            Context::Text => (SlotKind::Node, markers.placeholder().into()),
            Context::RawText => (SlotKind::RawText, markers.placeholder().into()),
            Context::Comment => (SlotKind::Comment, markers.node().into()),
            Context::TagName | Context::InTag | Context::AttrName | Context::AfterAttrName => {
                return Err(StencilError::compile(format!(
                    "slot {i} sits inside a tag but not inside an attribute value; \
                     write `name=\"${{value}}\"` instead"
                )));
            }
            Context::EndTag | Context::Declaration => {
                return Err(StencilError::compile(format!(
                    "slot {i} sits inside an end tag or declaration"
                )));
            }
        };

        markup.push_str(&emitted);
        scanner.feed(&emitted);
        slots.push(kind);
    }

    let last = last.as_ref();
    reject_marker_collision(last, head.len())?;
    markup.push_str(last);

    tracing::trace!(slots = slots.len(), bytes = markup.len(), "compiled fragment sequence");
    Ok(CompiledMarkup { markup, slots })
}

fn reject_marker_collision(fragment: &str, index: usize) -> StencilResult<()> {
    if Markers::get().contains_any(fragment) {
        return Err(StencilError::compile(format!(
            "fragment {index} already contains a marker token"
        )));
    }
    Ok(())
}

/// Collapse the leading and trailing whitespace runs to one space each.
fn normalize_edges(fragment: &str) -> std::borrow::Cow<'_, str> {
    let trimmed_start = fragment.trim_start();
    let lead = trimmed_start.len() != fragment.len();
    let core = trimmed_start.trim_end();
    let trail = core.len() != trimmed_start.len();

    if core.is_empty() {
        return if fragment.is_empty() || fragment == " " {
            fragment.into()
        } else {
            " ".into()
        };
    }

    let unchanged = (!lead || fragment.starts_with(' ') && !fragment[1..].starts_with(char::is_whitespace))
        && (!trail || fragment.ends_with(' ') && !fragment[..fragment.len() - 1].ends_with(char::is_whitespace));
    if unchanged {
        return fragment.into();
    }

    let mut out = String::with_capacity(core.len() + 2);
    if lead {
        out.push(' ');
    }
    out.push_str(core);
    if trail {
        out.push(' ');
    }
    out.into()
}

// =============================================================================
// Context scanner
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Context {
    Text,
    TagName,
    InTag,
    AttrName,
    AfterAttrName,
    BeforeValue,
    Quoted(char),
    Unquoted,
    Comment,
    RawText,
    EndTag,
    Declaration,
}

/// Incremental markup context tracker.
#[derive(Debug)]
struct Scanner {
    context: Context,
    tag: CompactString,
}

impl Scanner {
    fn new() -> Self {
        Self { context: Context::Text, tag: CompactString::default() }
    }

    fn feed(&mut self, s: &str) {
        let mut chars = s.char_indices();
        while let Some((i, c)) = chars.next() {
            let rest = &s[i + c.len_utf8()..];
            let skip = self.step(c, rest);
            for _ in 0..skip {
                chars.next();
            }
        }
    }

    /// Advance by one char; returns how many following chars were consumed.
    fn step(&mut self, c: char, rest: &str) -> usize {
        match self.context {
            Context::Text => {
                if c == '<' {
                    if rest.starts_with("!--") {
                        self.context = Context::Comment;
                        return 3;
                    } else if rest.starts_with('/') {
                        self.context = Context::EndTag;
                    } else if rest.starts_with(['!', '?']) {
                        self.context = Context::Declaration;
                    } else if rest.starts_with(|n: char| n.is_ascii_alphabetic()) {
                        self.context = Context::TagName;
                        self.tag.clear();
                    }
                }
            }
            Context::TagName => match c {
                '>' => self.close_tag(),
                '/' => self.context = Context::InTag,
                c if c.is_whitespace() => self.context = Context::InTag,
                c => self.tag.push(c.to_ascii_lowercase()),
            },
            Context::InTag => match c {
                '>' => self.close_tag(),
                '/' => {}
                c if c.is_whitespace() => {}
                _ => self.context = Context::AttrName,
            },
            Context::AttrName => match c {
                '=' => self.context = Context::BeforeValue,
                '>' => self.close_tag(),
                '/' => self.context = Context::InTag,
                c if c.is_whitespace() => self.context = Context::AfterAttrName,
                _ => {}
            },
            Context::AfterAttrName => match c {
                '=' => self.context = Context::BeforeValue,
                '>' => self.close_tag(),
                c if c.is_whitespace() => {}
                _ => self.context = Context::AttrName,
            },
            Context::BeforeValue => match c {
                '"' | '\'' => self.context = Context::Quoted(c),
                '>' => self.close_tag(),
                c if c.is_whitespace() => {}
                _ => self.context = Context::Unquoted,
            },
            Context::Quoted(q) => {
                if c == q {
                    self.context = Context::InTag;
                }
            }
            Context::Unquoted => match c {
                '>' => self.close_tag(),
                c if c.is_whitespace() => self.context = Context::InTag,
                _ => {}
            },
            Context::Comment => {
                if c == '-' && rest.starts_with("->") {
                    self.context = Context::Text;
                    return 2;
                }
            }
            Context::RawText => {
                if c == '<' && closes_raw_text(rest, &self.tag) {
                    self.context = Context::EndTag;
                }
            }
            Context::EndTag | Context::Declaration => {
                if c == '>' {
                    self.context = Context::Text;
                }
            }
        }
        0
    }

    fn close_tag(&mut self) {
        self.context = if RAW_TEXT_ELEMENTS.contains(&self.tag.as_str()) {
            Context::RawText
        } else {
            Context::Text
        };
    }
}

/// Whether `rest` (the text after a `<`) starts with `/tag`.
pub(crate) fn closes_raw_text(rest: &str, tag: &str) -> bool {
    rest.strip_prefix('/')
        .and_then(|r| r.get(..tag.len()))
        .is_some_and(|name| name.eq_ignore_ascii_case(tag))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn compile_default(fragments: &[&str]) -> CompiledMarkup {
        compile(fragments, &CompileOptions::default()).unwrap()
    }

    #[test]
    fn test_compile_is_deterministic() {
        let fragments = ["<ul class=\"", "\">", "</ul>"];
        assert_eq!(compile_default(&fragments), compile_default(&fragments));
    }

    #[test]
    fn test_attribute_slot_after_open_quote() {
        let m = Markers::get();
        let out = compile_default(&["<div class=\"", "\"></div>"]);
        assert_eq!(out.slots, vec![SlotKind::Attribute]);
        assert_eq!(out.markup, format!("<div class=\"{}\"></div>", m.attr()));
    }

    #[test]
    fn test_attribute_slot_mid_value_across_fragments() {
        let out = compile_default(&["<div class=\"a ", " b ", "\"></div>"]);
        assert_eq!(out.slots, vec![SlotKind::Attribute, SlotKind::Attribute]);
    }

    #[test]
    fn test_unquoted_assignment_gets_quoted() {
        let m = Markers::get();
        let out = compile_default(&["<a href=", ">x</a>"]);
        assert_eq!(out.markup, format!("<a href=\"{}\">x</a>", m.attr()));
    }

    #[test]
    fn test_text_slot_is_node_marker() {
        let m = Markers::get();
        let out = compile_default(&["<p>", "</p>"]);
        assert_eq!(out.slots, vec![SlotKind::Node]);
        assert_eq!(out.markup, format!("<p>{}</p>", m.placeholder()));
    }

    #[test]
    fn test_attribute_closed_then_text() {
        let out = compile_default(&["<p class=\"x\">", "</p>"]);
        assert_eq!(out.slots, vec![SlotKind::Node]);
    }

    #[test]
    fn test_raw_text_and_comment_slots() {
        let out = compile_default(&["<textarea>", "</textarea><!--", "", "-->"]);
        assert_eq!(out.slots, vec![SlotKind::RawText, SlotKind::Comment, SlotKind::Comment]);
    }

    #[test]
    fn test_slot_in_tag_is_compile_error() {
        let err = compile(&["<div ", "></div>"], &CompileOptions::default()).unwrap_err();
        assert!(matches!(err, StencilError::Compile(_)));
    }

    #[test]
    fn test_empty_sequence_is_compile_error() {
        let empty: [&str; 0] = [];
        assert!(compile(&empty, &CompileOptions::default()).is_err());
    }

    #[test]
    fn test_marker_collision_rejected() {
        let m = Markers::get();
        let evil = format!("<p>{}", m.placeholder());
        assert!(compile(&[evil.as_str(), "</p>"], &CompileOptions::default()).is_err());
    }

    #[test]
    fn test_whitespace_edges_collapsed() {
        assert_eq!(normalize_edges("\n    <p>\n  "), " <p> ");
        assert_eq!(normalize_edges("<p>"), "<p>");
        assert_eq!(normalize_edges(" <p> "), " <p> ");
        assert_eq!(normalize_edges("\n\n"), " ");
        assert_eq!(normalize_edges(""), "");
    }

    #[test]
    fn test_final_fragment_kept_verbatim() {
        let out = compile_default(&["<p>", "</p>\n\n"]);
        assert!(out.markup.ends_with("</p>\n\n"));
    }

    #[test]
    fn test_verbatim_option() {
        let m = Markers::get();
        let out = compile(&["\n<p>", "</p>"], &CompileOptions::VERBATIM).unwrap();
        assert_eq!(out.markup, format!("\n<p>{}</p>", m.placeholder()));
    }
}
