//! Flat display text for a container.
//!
//! A terminal has no live DOM selection, so the front-end selects over the
//! laid-out text and maps flat offsets back to tree boundaries here.

use std::str::FromStr;

use crate::address::Address;
use crate::dom::{Boundary, Container, Node, TreeRange};
use crate::engine::MarkerConfig;
use crate::model::HighlightColor;

/// Elements that start on a new line
const BLOCK_ELEMENTS: &[&str] = &[
    "address", "article", "aside", "blockquote", "div", "dl", "dd", "dt", "figure", "footer",
    "h1", "h2", "h3", "h4", "h5", "h6", "header", "hr", "li", "main", "nav", "ol", "p", "pre",
    "section", "table", "tr", "ul",
];

pub fn is_block(tag: &str) -> bool {
    BLOCK_ELEMENTS.contains(&tag)
}

/// Marker enclosing a segment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentMarker {
    pub id: String,
    pub color: HighlightColor,
}

/// One text node in the flat text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub flat_start: usize,
    /// Length in chars, equal to the text node's length
    pub len: usize,
    pub address: Address,
    pub marker: Option<SegmentMarker>,
}

impl Segment {
    pub fn flat_end(&self) -> usize {
        self.flat_start + self.len
    }
}

#[derive(Debug, Clone, Default)]
pub struct TextLayout {
    text: String,
    chars: usize,
    segments: Vec<Segment>,
}

impl TextLayout {
    pub fn build(container: &Container, config: &MarkerConfig) -> Self {
        let mut layout = Self::default();
        layout.walk(container.root(), &Address::root(), None, config);
        layout
    }

    fn walk(&mut self, node: &Node, address: &Address, marker: Option<&SegmentMarker>, config: &MarkerConfig) {
        let has_blocks = node
            .children()
            .iter()
            .any(|c| c.as_element().map(|el| is_block(&el.tag)).unwrap_or(false));

        for (index, child) in node.children().iter().enumerate() {
            let child_address = address.child(index);
            match child {
                Node::Text(text) => {
                    if has_blocks && text.trim().is_empty() {
                        continue;
                    }
                    self.push_segment(text, child_address, marker.cloned());
                }
                Node::Element(el) if el.tag == "br" => self.push_char('\n'),
                Node::Element(el) => {
                    let block = is_block(&el.tag);
                    if block {
                        self.line_break();
                    }
                    let own_marker = config.marker_id(child).map(|id| SegmentMarker {
                        id: id.to_string(),
                        color: el
                            .classes()
                            .find_map(|c| HighlightColor::from_str(c).ok())
                            .unwrap_or_default(),
                    });
                    self.walk(child, &child_address, own_marker.as_ref().or(marker), config);
                    if block {
                        self.line_break();
                    }
                }
            }
        }
    }

    fn push_segment(&mut self, text: &str, address: Address, marker: Option<SegmentMarker>) {
        let flat_start = self.chars;
        let mut len = 0;
        for c in text.chars() {
            // One display char per text char keeps offsets aligned
            self.text.push(if c.is_whitespace() { ' ' } else { c });
            len += 1;
        }
        self.chars += len;
        self.segments.push(Segment {
            flat_start,
            len,
            address,
            marker,
        });
    }

    fn push_char(&mut self, c: char) {
        self.text.push(c);
        self.chars += 1;
    }

    fn line_break(&mut self) {
        if !self.text.is_empty() && !self.text.ends_with('\n') {
            self.push_char('\n');
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Length of the flat text in chars
    pub fn len(&self) -> usize {
        self.chars
    }

    pub fn is_empty(&self) -> bool {
        self.chars == 0
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Boundary just before the char at `flat`; positions between segments
    /// snap forward to the next text node
    pub fn boundary_at(&self, flat: usize) -> Option<Boundary> {
        let seg = self.segments.iter().find(|s| flat < s.flat_end())?;
        let offset = flat.saturating_sub(seg.flat_start);
        Some(Boundary::new(seg.address.clone(), offset))
    }

    /// Boundary just after the char at `flat - 1`; positions between
    /// segments snap back to the previous text node
    pub fn end_boundary_at(&self, flat: usize) -> Option<Boundary> {
        let seg = self.segments.iter().rev().find(|s| s.flat_start < flat)?;
        let offset = (flat - seg.flat_start).min(seg.len);
        Some(Boundary::new(seg.address.clone(), offset))
    }

    /// Range covering the flat chars `[a, b)` in either order
    pub fn range_between(&self, a: usize, b: usize) -> Option<TreeRange> {
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        if lo == hi {
            return None;
        }
        let range = TreeRange::new(self.boundary_at(lo)?, self.end_boundary_at(hi)?);
        (!range.is_collapsed() && range.clone().ordered() == range).then_some(range)
    }

    /// Flat offset of a boundary inside a text node
    pub fn flat_offset(&self, boundary: &Boundary) -> Option<usize> {
        let seg = self.segments.iter().find(|s| s.address == boundary.address)?;
        Some(seg.flat_start + boundary.offset.min(seg.len))
    }

    /// Marker around the char at `flat`
    pub fn marker_at(&self, flat: usize) -> Option<&SegmentMarker> {
        self.segments
            .iter()
            .find(|s| s.flat_start <= flat && flat < s.flat_end())
            .and_then(|s| s.marker.as_ref())
    }

    /// Flat extent `[start, end)` of the marker tagged `id`
    pub fn marker_span(&self, id: &str) -> Option<(usize, usize)> {
        let mut tagged = self
            .segments
            .iter()
            .filter(|s| s.marker.as_ref().map(|m| m.id == id).unwrap_or(false));
        let first = tagged.next()?;
        let last = tagged.last().unwrap_or(first);
        Some((first.flat_start, last.flat_end()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layout(html: &str) -> (Container, TextLayout) {
        let container = Container::from_html(html).unwrap();
        let layout = TextLayout::build(&container, &MarkerConfig::default());
        (container, layout)
    }

    #[test]
    fn test_blocks_break_lines() {
        let (_, layout) = layout("<h1>Title</h1>\n  <p>one <b>two</b></p><p>three<br/>four</p>");
        assert_eq!(layout.text(), "Title\none two\nthree\nfour\n");
        assert_eq!(layout.segments().len(), 5);
        // The whitespace between the blocks is child 1 but lays out nothing
        assert_eq!(layout.segments()[2].address, Address::new(vec![2, 1, 0]));
    }

    #[test]
    fn test_boundaries_map_to_text_nodes() {
        let (_, layout) = layout("<p>alpha</p><p>beta</p>");
        // "alpha\nbeta\n": offset 5 is the newline, 6 starts "beta"
        assert_eq!(layout.boundary_at(2), Some(Boundary::new(Address::new(vec![0, 0]), 2)));
        assert_eq!(layout.boundary_at(5), Some(Boundary::new(Address::new(vec![1, 0]), 0)));
        assert_eq!(layout.end_boundary_at(6), Some(Boundary::new(Address::new(vec![0, 0]), 5)));
        assert_eq!(layout.boundary_at(11), None);
    }

    #[test]
    fn test_range_between() {
        let (mut container, layout) = layout("<p>This is the first sample page.</p>");
        let range = layout.range_between(24, 12).unwrap();
        assert_eq!(range.start, Boundary::new(Address::new(vec![0, 0]), 12));
        assert_eq!(range.end, Boundary::new(Address::new(vec![0, 0]), 24));
        assert!(layout.range_between(3, 3).is_none());

        crate::dom::surround(&mut container, &range, Node::element("mark")).unwrap();
        assert_eq!(container.root().children()[0].children()[1].text_content(), "first sample");
    }

    #[test]
    fn test_marker_segments() {
        let (_, layout) = layout(
            r#"<p>a <span class="highlight green" data-annotation-id="9">b <i>c</i></span> d</p>"#,
        );
        assert_eq!(layout.text(), "a b c d\n");
        assert_eq!(layout.marker_at(0), None);
        let marker = layout.marker_at(4).unwrap();
        assert_eq!(marker.id, "9");
        assert_eq!(marker.color, HighlightColor::Green);
        assert_eq!(layout.marker_span("9"), Some((2, 5)));
        assert_eq!(layout.flat_offset(&Boundary::new(Address::new(vec![0, 2]), 1)), Some(6));
    }
}
