//! Marker-annotated markup → template tree.
//!
//! A small, lenient HTML tokenizer feeding a stack-based tree builder:
//!
//! - void elements and `/>` close immediately
//! - `script`/`style` content is kept verbatim, `textarea`/`title` content is
//!   entity-decoded but never parsed as markup
//! - end tags pop back to the nearest matching open element; stray end tags
//!   are ignored, and anything still open at the end is closed
//! - doctypes and processing instructions are skipped
//!
//! Attributes keep their source order. Memory extraction depends on it.

use std::borrow::Cow;

use crate::attr::AttrsExt;
use crate::compiler::{closes_raw_text, RAW_TEXT_ELEMENTS};
use crate::node::{Children, Element, Fragment, Node, Text};

/// HTML void elements that cannot have children.
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

pub(crate) fn is_void_element(name: &str) -> bool {
    VOID_ELEMENTS.contains(&name)
}

/// Parse markup into a template fragment.
pub fn parse(markup: &str) -> Fragment {
    let mut builder = TreeBuilder::default();
    let mut pos = 0;

    while pos < markup.len() {
        let rest = &markup[pos..];

        pos += if let Some(body) = rest.strip_prefix("<!--") {
            match body.find("-->") {
                Some(end) => {
                    builder.push(Node::Comment(body[..end].into()));
                    4 + end + 3
                }
                None => {
                    builder.push(Node::Comment(body.into()));
                    rest.len()
                }
            }
        } else if let Some(body) = rest.strip_prefix("</") {
            let close = body.find('>');
            builder.close(body[..close.unwrap_or(body.len())].trim());
            close.map_or(rest.len(), |i| 2 + i + 1)
        } else if rest.starts_with("<!") || rest.starts_with("<?") {
            rest.find('>').map_or(rest.len(), |i| i + 1)
        } else if rest.starts_with('<') && rest[1..].starts_with(|c: char| c.is_ascii_alphabetic()) {
            let (elem, self_closing, consumed) = parse_start_tag(rest);
            if self_closing || is_void_element(&elem.tag) {
                builder.push(elem.into());
                consumed
            } else if RAW_TEXT_ELEMENTS.contains(&elem.tag.as_str()) {
                consumed + builder.raw_text(elem, &rest[consumed..])
            } else {
                builder.open(elem);
                consumed
            }
        } else {
            let end = rest
                .char_indices()
                .skip(1)
                .find(|&(_, c)| c == '<')
                .map_or(rest.len(), |(i, _)| i);
            builder.push_text(&decode_entities(&rest[..end]));
            end
        };
    }

    builder.finish()
}

// =============================================================================
// Tree builder
// =============================================================================

#[derive(Default)]
struct TreeBuilder {
    stack: Vec<Element>,
    roots: Children,
}

impl TreeBuilder {
    fn children(&mut self) -> &mut Children {
        match self.stack.last_mut() {
            Some(parent) => &mut parent.children,
            None => &mut self.roots,
        }
    }

    fn push(&mut self, node: Node) {
        self.children().push(node);
    }

    /// Append text, merging with a directly preceding text node.
    fn push_text(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        let children = self.children();
        if let Some(Node::Text(existing)) = children.last_mut() {
            existing.content.push_str(text);
        } else {
            children.push(Node::Text(Text::new(text)));
        }
    }

    fn open(&mut self, elem: Element) {
        self.stack.push(elem);
    }

    fn close(&mut self, name: &str) {
        let Some(idx) = self.stack.iter().rposition(|e| e.tag.eq_ignore_ascii_case(name)) else {
            tracing::trace!(tag = name, "ignoring stray end tag");
            return;
        };
        while self.stack.len() > idx {
            if let Some(elem) = self.stack.pop() {
                self.push(elem.into());
            }
        }
    }

    /// Attach a raw-text element; returns bytes consumed after its start tag.
    fn raw_text(&mut self, mut elem: Element, after: &str) -> usize {
        let end = after
            .match_indices('<')
            .map(|(i, _)| i)
            .find(|&i| closes_raw_text(&after[i + 1..], &elem.tag));

        let (content, consumed) = match end {
            Some(i) => (&after[..i], after[i..].find('>').map_or(after.len(), |g| i + g + 1)),
            None => (after, after.len()),
        };

        if !content.is_empty() {
            let content = match elem.tag.as_str() {
                "textarea" | "title" => decode_entities(content),
                _ => Cow::Borrowed(content),
            };
            elem.children.push(Node::Text(Text::new(&*content)));
        }

        self.push(elem.into());
        consumed
    }

    fn finish(mut self) -> Fragment {
        while let Some(elem) = self.stack.pop() {
            self.push(elem.into());
        }
        Fragment { children: self.roots }
    }
}

// =============================================================================
// Tokenizer pieces
// =============================================================================

/// Parse `<tag attr=...>`; returns the element, whether it was self-closed,
/// and the bytes consumed.
fn parse_start_tag(rest: &str) -> (Element, bool, usize) {
    let bytes = rest.as_bytes();
    let name_end = find_from(rest, 1, |c| c.is_whitespace() || c == '/' || c == '>');
    let mut elem = Element::new(rest[1..name_end].to_ascii_lowercase());
    let mut i = name_end;
    let mut self_closing = false;

    loop {
        while i < bytes.len() && bytes[i].is_ascii_whitespace() {
            i += 1;
        }
        match bytes.get(i) {
            None => break,
            Some(b'>') => {
                i += 1;
                break;
            }
            Some(b'/') => {
                i += 1;
                if bytes.get(i) == Some(&b'>') {
                    self_closing = true;
                    i += 1;
                    break;
                }
                continue;
            }
            Some(_) => {}
        }

        let mut name_end = find_from(rest, i, |c| c.is_whitespace() || matches!(c, '=' | '>' | '/'));
        if name_end == i {
            name_end += rest[i..].chars().next().map_or(1, char::len_utf8);
        }
        let name = rest[i..name_end].to_ascii_lowercase();
        i = name_end;

        let mut j = i;
        while j < bytes.len() && bytes[j].is_ascii_whitespace() {
            j += 1;
        }

        let value = if bytes.get(j) == Some(&b'=') {
            j += 1;
            while j < bytes.len() && bytes[j].is_ascii_whitespace() {
                j += 1;
            }
            match bytes.get(j) {
                Some(&q @ (b'"' | b'\'')) => {
                    let start = j + 1;
                    let end = find_from(rest, start, |c| c == q as char);
                    i = (end + 1).min(rest.len());
                    &rest[start..end]
                }
                _ => {
                    let end = find_from(rest, j, |c| c.is_whitespace() || c == '>');
                    i = end;
                    &rest[j..end]
                }
            }
        } else {
            ""
        };

        // First occurrence wins, as in browsers
        if !elem.attrs.has_attr(&name) {
            elem.attrs.push((name.into(), decode_entities(value).into()));
        }
    }

    (elem, self_closing, i)
}

/// Byte index of the first char at or after `from` matching `pred`, or the
/// end of `s`.
fn find_from(s: &str, from: usize, pred: impl Fn(char) -> bool) -> usize {
    s[from..].find(pred).map_or(s.len(), |i| i + from)
}

/// Decode the common named and all numeric character references.
pub(crate) fn decode_entities(s: &str) -> Cow<'_, str> {
    if !s.contains('&') {
        return Cow::Borrowed(s);
    }

    let mut out = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let after = &rest[amp + 1..];
        let decoded = after
            .find(';')
            .filter(|&semi| semi <= 10)
            .and_then(|semi| decode_entity(&after[..semi]).map(|c| (c, semi)));
        match decoded {
            Some((c, semi)) => {
                out.push(c);
                rest = &after[semi + 1..];
            }
            None => {
                out.push('&');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    Cow::Owned(out)
}

fn decode_entity(name: &str) -> Option<char> {
    match name {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        "nbsp" => Some('\u{a0}'),
        _ => {
            let num = name.strip_prefix('#')?;
            let code = match num.strip_prefix(['x', 'X']) {
                Some(hex) => u32::from_str_radix(hex, 16).ok()?,
                None => num.parse().ok()?,
            };
            char::from_u32(code)
        }
    }
}
