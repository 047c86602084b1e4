//! Lenient HTML fragment codec built on `quick-xml`
//!
//! Page content comes from imports and edit sessions, so the reader accepts
//! unbalanced end tags, unquoted or valueless attributes, and the common HTML
//! named entities. Comments, doctypes and processing instructions are dropped.

use std::borrow::Cow;

use quick_xml::escape::escape;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use super::node::{Element, Node};
use crate::error::MarkupError;

/// Elements that never take children
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

pub fn is_void(tag: &str) -> bool {
    VOID_ELEMENTS.contains(&tag)
}

/// Parse an HTML fragment into a list of sibling nodes
pub fn parse_fragment(html: &str) -> Result<Vec<Node>, MarkupError> {
    let mut reader = Reader::from_str(html);
    reader.trim_text(false);
    reader.check_end_names(false);

    let mut top: Vec<Node> = Vec::new();
    let mut open: Vec<Element> = Vec::new();

    loop {
        let event = reader.read_event().map_err(|e| MarkupError::Parse {
            position: reader.buffer_position(),
            message: e.to_string(),
        })?;

        match event {
            Event::Start(start) => {
                let el = element_from(&start);
                if is_void(&el.tag) {
                    push_node(&mut open, &mut top, Node::Element(el));
                } else {
                    open.push(el);
                }
            }
            Event::Empty(start) => {
                push_node(&mut open, &mut top, Node::Element(element_from(&start)));
            }
            Event::End(end) => {
                let name = String::from_utf8_lossy(end.name().as_ref()).to_ascii_lowercase();
                // Stray end tags are ignored; a matching one closes everything above it.
                if let Some(depth) = open.iter().rposition(|el| el.tag == name) {
                    while open.len() > depth {
                        close_innermost(&mut open, &mut top);
                    }
                }
            }
            Event::Text(text) => {
                let decoded = match text.unescape_with(html_entity) {
                    Ok(decoded) => decoded.into_owned(),
                    Err(_) => decode_lenient(&String::from_utf8_lossy(&text)),
                };
                push_text(&mut open, &mut top, decoded);
            }
            Event::CData(data) => {
                let raw = data.into_inner();
                push_text(&mut open, &mut top, String::from_utf8_lossy(&raw).into_owned());
            }
            Event::Eof => break,
            _ => {}
        }
    }

    while !open.is_empty() {
        close_innermost(&mut open, &mut top);
    }

    let mut holder = Element::new("#fragment");
    holder.children = top;
    holder.normalize();
    Ok(holder.children)
}

fn element_from(start: &BytesStart<'_>) -> Element {
    let tag = String::from_utf8_lossy(start.name().as_ref()).to_ascii_lowercase();
    let mut el = Element::new(tag);
    for attr in start.html_attributes().with_checks(false).flatten() {
        let name = String::from_utf8_lossy(attr.key.as_ref()).to_ascii_lowercase();
        let value = match attr.unescape_value() {
            Ok(value) => value.into_owned(),
            Err(_) => String::from_utf8_lossy(&attr.value).into_owned(),
        };
        el.set_attr(name, value);
    }
    el
}

fn push_node(open: &mut [Element], top: &mut Vec<Node>, node: Node) {
    match open.last_mut() {
        Some(parent) => parent.append_child(node),
        None => top.push(node),
    }
}

fn push_text(open: &mut [Element], top: &mut Vec<Node>, text: String) {
    if !text.is_empty() {
        push_node(open, top, Node::Text(text));
    }
}

fn close_innermost(open: &mut Vec<Element>, top: &mut Vec<Node>) {
    if let Some(el) = open.pop() {
        push_node(open, top, Node::Element(el));
    }
}

fn html_entity(name: &str) -> Option<&'static str> {
    Some(match name {
        "amp" => "&",
        "lt" => "<",
        "gt" => ">",
        "quot" => "\"",
        "apos" => "'",
        "nbsp" => "\u{a0}",
        "shy" => "\u{ad}",
        "ndash" => "\u{2013}",
        "mdash" => "\u{2014}",
        "lsquo" => "\u{2018}",
        "rsquo" => "\u{2019}",
        "ldquo" => "\u{201c}",
        "rdquo" => "\u{201d}",
        "hellip" => "\u{2026}",
        "copy" => "\u{a9}",
        "reg" => "\u{ae}",
        "trade" => "\u{2122}",
        "middot" => "\u{b7}",
        "bull" => "\u{2022}",
        _ => return None,
    })
}

/// Entity decoding that keeps unknown references as written
fn decode_lenient(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let tail = &rest[amp..];
        let decoded = tail.find(';').and_then(|semi| {
            let name = &tail[1..semi];
            let resolved = match name.strip_prefix('#') {
                Some(num) => {
                    let code = match num.strip_prefix(['x', 'X']) {
                        Some(hex) => u32::from_str_radix(hex, 16).ok(),
                        None => num.parse().ok(),
                    };
                    code.and_then(char::from_u32).map(String::from)
                }
                None => html_entity(name).map(String::from),
            };
            resolved.map(|text| (text, semi + 1))
        });
        match decoded {
            Some((text, consumed)) => {
                out.push_str(&text);
                rest = &tail[consumed..];
            }
            None => {
                out.push('&');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

/// Serialize sibling nodes back to markup
pub fn serialize_fragment(nodes: &[Node]) -> String {
    let mut out = String::new();
    for node in nodes {
        write_node(node, &mut out);
    }
    out
}

fn write_node(node: &Node, out: &mut String) {
    match node {
        Node::Text(text) => out.push_str(&escape_text(text)),
        Node::Element(el) => {
            out.push('<');
            out.push_str(&el.tag);
            for (name, value) in &el.attrs {
                out.push(' ');
                out.push_str(name);
                out.push_str("=\"");
                out.push_str(&escape(value.as_str()));
                out.push('"');
            }
            if is_void(&el.tag) && el.children.is_empty() {
                out.push_str("/>");
                return;
            }
            out.push('>');
            for child in &el.children {
                write_node(child, out);
            }
            out.push_str("</");
            out.push_str(&el.tag);
            out.push('>');
        }
    }
}

fn escape_text(text: &str) -> Cow<'_, str> {
    if text.contains(['&', '<', '>']) {
        Cow::Owned(
            text.replace('&', "&amp;")
                .replace('<', "&lt;")
                .replace('>', "&gt;"),
        )
    } else {
        Cow::Borrowed(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_paragraphs() {
        let nodes = parse_fragment("<p>Hello <em>there</em></p><p>again</p>").unwrap();
        assert_eq!(nodes.len(), 2);
        assert_eq!(nodes[0].as_element().unwrap().tag, "p");
        assert_eq!(nodes[0].children().len(), 2);
        assert_eq!(nodes[0].text_content(), "Hello there");
    }

    #[test]
    fn test_void_and_unclosed_elements() {
        let nodes = parse_fragment("<p>one<br>two<p>three").unwrap();
        // The unclosed first <p> swallows the second one; no content is lost.
        assert_eq!(nodes.len(), 1);
        let p = &nodes[0];
        assert_eq!(p.children()[1].as_element().unwrap().tag, "br");
        assert!(p.children()[1].children().is_empty());
        assert_eq!(p.text_content(), "onetwothree");
    }

    #[test]
    fn test_stray_end_tag_is_ignored() {
        let nodes = parse_fragment("<p>text</span></p>").unwrap();
        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes[0].text_content(), "text");
    }

    #[test]
    fn test_entities() {
        let nodes = parse_fragment("<p>fish &amp; chips&nbsp;&mdash; &unknown;</p>").unwrap();
        assert_eq!(nodes[0].text_content(), "fish & chips\u{a0}\u{2014} &unknown;");

        assert_eq!(decode_lenient("&#65;&#x42;&bogus"), "AB&bogus");
    }

    #[test]
    fn test_attributes_survive_round_trip() {
        let html = r#"<p class="intro"><span class="highlight yellow" data-annotation-id="17" title="a &quot;quote&quot;">x &lt; y</span></p>"#;
        let nodes = parse_fragment(html).unwrap();
        let span = nodes[0].children()[0].as_element().unwrap();
        assert_eq!(span.attr("title"), Some("a \"quote\""));
        assert_eq!(span.children[0].as_text(), Some("x < y"));
        assert_eq!(serialize_fragment(&nodes), html);
    }

    #[test]
    fn test_serialize_void() {
        let nodes = parse_fragment("<p>a<br/>b</p>").unwrap();
        assert_eq!(serialize_fragment(&nodes), "<p>a<br/>b</p>");
    }
}
