//! Highlight marker elements: construction, lookup and removal

use std::cmp::Ordering;

use crate::address::Address;
use crate::dom::{compare_boundaries, Boundary, Container, Element, Node, TreeRange};
use crate::model::Annotation;

/// Shape of the inline element that renders one annotation
#[derive(Debug, Clone)]
pub struct MarkerConfig {
    /// Element tag for markers
    pub tag: String,
    /// Class shared by every marker; the color class is added next to it
    pub class: String,
    /// Attribute holding the annotation id
    pub id_attribute: String,
    /// Attribute holding the comment shown on hover
    pub label_attribute: String,
}

impl Default for MarkerConfig {
    fn default() -> Self {
        Self {
            tag: "span".to_string(),
            class: "highlight".to_string(),
            id_attribute: "data-annotation-id".to_string(),
            label_attribute: "title".to_string(),
        }
    }
}

impl MarkerConfig {
    /// An empty marker element for `annotation`
    pub fn build(&self, annotation: &Annotation) -> Node {
        let mut el = Element::new(self.tag.clone())
            .with_attr("class", format!("{} {}", self.class, annotation.color.as_str()))
            .with_attr(self.id_attribute.clone(), annotation.id.clone());
        if !annotation.comment.is_empty() {
            el.set_attr(self.label_attribute.clone(), annotation.comment.clone());
        }
        Node::Element(el)
    }

    pub fn is_marker(&self, node: &Node) -> bool {
        node.as_element().map(|el| el.has_class(&self.class)).unwrap_or(false)
    }

    /// Annotation id carried by a marker node
    pub fn marker_id<'a>(&self, node: &'a Node) -> Option<&'a str> {
        if !self.is_marker(node) {
            return None;
        }
        node.as_element()?.attr(&self.id_attribute)
    }

    /// Set or clear the hover label
    pub fn apply_label(&self, el: &mut Element, comment: &str) {
        if comment.is_empty() {
            el.remove_attr(&self.label_attribute);
        } else {
            el.set_attr(self.label_attribute.clone(), comment);
        }
    }
}

/// Every marker in document order, with its id (empty when the attribute is missing)
pub fn find_markers(container: &Container, config: &MarkerConfig) -> Vec<(Address, String)> {
    let mut found = Vec::new();
    collect_markers(container.root(), &Address::root(), config, &mut found);
    found
}

fn collect_markers(node: &Node, address: &Address, config: &MarkerConfig, found: &mut Vec<(Address, String)>) {
    for (index, child) in node.children().iter().enumerate() {
        let child_address = address.child(index);
        if config.is_marker(child) {
            let id = config.marker_id(child).unwrap_or_default().to_string();
            found.push((child_address.clone(), id));
        }
        collect_markers(child, &child_address, config, found);
    }
}

/// Address of the first marker tagged with `id`
pub fn find_marker(container: &Container, config: &MarkerConfig, id: &str) -> Option<Address> {
    find_markers(container, config)
        .into_iter()
        .find(|(_, marker_id)| marker_id == id)
        .map(|(address, _)| address)
}

pub fn marker_ids(container: &Container, config: &MarkerConfig) -> Vec<String> {
    find_markers(container, config)
        .into_iter()
        .map(|(_, id)| id)
        .collect()
}

/// Id of the innermost marker at or above `address`
pub fn ancestor_marker(container: &Container, config: &MarkerConfig, address: &Address) -> Option<String> {
    let mut current = Some(address.clone());
    while let Some(addr) = current {
        if let Some(node) = container.node(&addr) {
            if config.is_marker(node) {
                return Some(config.marker_id(node).unwrap_or_default().to_string());
            }
        }
        current = addr.parent();
    }
    None
}

/// Id of the marker enclosing a position, if any
pub fn annotation_at(container: &Container, config: &MarkerConfig, boundary: &Boundary) -> Option<String> {
    ancestor_marker(container, config, &boundary.address)
}

/// Id of a marker that shares any content with `range`.
///
/// A marker spans the boundaries just before and just after its element;
/// ranges that only touch it from outside do not overlap.
pub fn overlapping_marker(container: &Container, config: &MarkerConfig, range: &TreeRange) -> Option<String> {
    find_markers(container, config)
        .into_iter()
        .find(|(address, _)| {
            let (parent, index) = match (address.parent(), address.last()) {
                (Some(parent), Some(index)) => (parent, index),
                _ => return false,
            };
            let marker_start = Boundary::new(parent.clone(), index);
            let marker_end = Boundary::new(parent, index + 1);
            compare_boundaries(&range.start, &marker_end) == Ordering::Less
                && compare_boundaries(&marker_start, &range.end) == Ordering::Less
        })
        .map(|(_, id)| id)
}

/// Replace the marker at `address` with its children, then merge adjacent
/// text in its parent. Returns false if no marker is there.
pub fn unwrap_marker(container: &mut Container, config: &MarkerConfig, address: &Address) -> bool {
    let (parent_address, index) = match (address.parent(), address.last()) {
        (Some(parent), Some(index)) => (parent, index),
        _ => return false,
    };
    let Some(parent) = container.element_mut(&parent_address) else {
        return false;
    };
    if !parent.children.get(index).map(|n| config.is_marker(n)).unwrap_or(false) {
        return false;
    }
    let Some(Node::Element(marker)) = parent.remove_child(index) else {
        return false;
    };
    for (offset, child) in marker.children.into_iter().enumerate() {
        parent.insert_child(index + offset, child);
    }
    parent.normalize();
    true
}

/// Unwrap every marker in the container; returns how many were removed
pub fn strip_markers(container: &mut Container, config: &MarkerConfig) -> usize {
    let mut removed = 0;
    while let Some((address, _)) = find_markers(container, config).into_iter().next() {
        if !unwrap_marker(container, config, &address) {
            break;
        }
        removed += 1;
    }
    container.normalize();
    removed
}

/// Apply `f` to every marker tagged with `id`; returns how many were visited
pub fn for_each_marker(
    container: &mut Container,
    config: &MarkerConfig,
    id: &str,
    mut f: impl FnMut(&mut Element),
) -> usize {
    let addresses: Vec<Address> = find_markers(container, config)
        .into_iter()
        .filter(|(_, marker_id)| marker_id == id)
        .map(|(address, _)| address)
        .collect();
    let mut visited = 0;
    for address in addresses {
        if let Some(el) = container.element_mut(&address) {
            f(el);
            visited += 1;
        }
    }
    visited
}

#[cfg(test)]
mod tests {
    use super::*;

    fn highlighted() -> Container {
        Container::from_html(
            r#"<p>This is <span class="highlight yellow" data-annotation-id="1">the first</span> page.</p><p>Second <span class="highlight blue" data-annotation-id="2"><b>bold</b></span></p>"#,
        )
        .unwrap()
    }

    #[test]
    fn test_find_markers_in_document_order() {
        let container = highlighted();
        let config = MarkerConfig::default();
        assert_eq!(marker_ids(&container, &config), ["1", "2"]);
        assert_eq!(find_marker(&container, &config, "2"), Some(Address::new(vec![1, 1])));
        assert_eq!(find_marker(&container, &config, "3"), None);
    }

    #[test]
    fn test_ancestor_marker() {
        let container = highlighted();
        let config = MarkerConfig::default();
        let inside = Address::new(vec![1, 1, 0, 0]);
        assert_eq!(ancestor_marker(&container, &config, &inside).as_deref(), Some("2"));
        assert_eq!(ancestor_marker(&container, &config, &Address::new(vec![0, 0])), None);
    }

    #[test]
    fn test_overlap_excludes_touching_ranges() {
        let container = highlighted();
        let config = MarkerConfig::default();
        // "This is " ends exactly where marker 1 starts
        let touching = TreeRange::new(
            Boundary::new(Address::new(vec![0, 0]), 0),
            Boundary::new(Address::new(vec![0, 0]), 8),
        );
        assert_eq!(overlapping_marker(&container, &config, &touching), None);

        let crossing = TreeRange::new(
            Boundary::new(Address::new(vec![0, 0]), 5),
            Boundary::new(Address::new(vec![0, 1, 0]), 3),
        );
        assert_eq!(overlapping_marker(&container, &config, &crossing).as_deref(), Some("1"));

        let containing = TreeRange::new(
            Boundary::new(Address::new(vec![1, 0]), 0),
            Boundary::new(Address::new(vec![1]), 2),
        );
        assert_eq!(overlapping_marker(&container, &config, &containing).as_deref(), Some("2"));
    }

    #[test]
    fn test_strip_markers_restores_plain_markup() {
        let mut container = highlighted();
        let config = MarkerConfig::default();
        assert_eq!(strip_markers(&mut container, &config), 2);
        assert_eq!(container.inner_html(), "<p>This is the first page.</p><p>Second <b>bold</b></p>");
        assert_eq!(container.root().children()[0].children().len(), 1);
    }

    #[test]
    fn test_build_marker_with_label() {
        let config = MarkerConfig::default();
        let mut ann = Annotation::new("7".to_string(), crate::model::HighlightColor::Green, &TreeRange::new(Boundary::default(), Boundary::default()));
        ann.comment = "note".to_string();
        let marker = config.build(&ann);
        let el = marker.as_element().unwrap();
        assert_eq!(el.attr("class"), Some("highlight green"));
        assert_eq!(el.attr("data-annotation-id"), Some("7"));
        assert_eq!(el.attr("title"), Some("note"));
    }
}
