//! Boundary points and range surgery.
//!
//! Boundaries are (address, offset) pairs with DOM range semantics: the
//! offset counts chars inside a text node and children inside an element.
//! Mutating operations split text nodes and partially selected elements so
//! the selected content becomes a run of whole children of the range's
//! common ancestor. Splits never leave empty nodes behind, so a normalized
//! tree stays normalized.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use super::node::{byte_index, Element, Node};
use super::Container;
use crate::address::{compute_address, Address};
use crate::error::RangeError;

/// A position in the tree: before the `offset`th char or child of a node
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Boundary {
    pub address: Address,
    pub offset: usize,
}

impl Boundary {
    pub fn new(address: Address, offset: usize) -> Self {
        Self { address, offset }
    }
}

/// A selection between two boundaries
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeRange {
    pub start: Boundary,
    pub end: Boundary,
}

impl TreeRange {
    pub fn new(start: Boundary, end: Boundary) -> Self {
        Self { start, end }
    }

    /// Build a range from nodes borrowed from `container`
    pub fn from_nodes(
        container: &Container,
        start: &Node,
        start_offset: usize,
        end: &Node,
        end_offset: usize,
    ) -> Option<Self> {
        let start_address = compute_address(start, container.root())?;
        let end_address = compute_address(end, container.root())?;
        Some(Self::new(
            Boundary::new(start_address, start_offset),
            Boundary::new(end_address, end_offset),
        ))
    }

    /// Swap the endpoints if the range was selected backwards
    pub fn ordered(self) -> Self {
        if compare_boundaries(&self.start, &self.end) == Ordering::Greater {
            Self::new(self.end, self.start)
        } else {
            self
        }
    }

    pub fn is_collapsed(&self) -> bool {
        compare_boundaries(&self.start, &self.end) == Ordering::Equal
    }

    /// Deepest node containing both endpoints
    pub fn common_ancestor(&self) -> Address {
        self.start.address.common_prefix(&self.end.address)
    }
}

/// Document-order comparison of two boundary points
pub fn compare_boundaries(a: &Boundary, b: &Boundary) -> Ordering {
    if a.address == b.address {
        return a.offset.cmp(&b.offset);
    }
    if a.address.is_prefix_of(&b.address) {
        let child = b.address.indices()[a.address.len()];
        return if a.offset <= child {
            Ordering::Less
        } else {
            Ordering::Greater
        };
    }
    if b.address.is_prefix_of(&a.address) {
        return compare_boundaries(b, a).reverse();
    }
    let depth = a.address.common_prefix(&b.address).len();
    a.address.indices()[depth].cmp(&b.address.indices()[depth])
}

/// Check that a boundary resolves and its offset fits the node
pub fn validate(container: &Container, boundary: &Boundary) -> Result<(), RangeError> {
    match container.node(&boundary.address) {
        Some(node) if boundary.offset <= node.len() => Ok(()),
        _ => Err(invalid(boundary)),
    }
}

fn invalid(boundary: &Boundary) -> RangeError {
    RangeError::InvalidBoundary {
        address: boundary.address.clone(),
        offset: boundary.offset,
    }
}

/// Remove the selected content and return it as a detached fragment.
///
/// The tree is left untouched if the range is invalid.
pub fn extract_contents(container: &mut Container, range: &TreeRange) -> Result<Vec<Node>, RangeError> {
    let snapshot = container.clone();
    match extract(container, range) {
        Ok((fragment, _)) => Ok(fragment),
        Err(e) => {
            container.restore(snapshot);
            Err(e)
        }
    }
}

/// Insert `node` at `boundary`, splitting a text node if the boundary falls inside one.
///
/// Returns the address of the inserted node.
pub fn insert_at(container: &mut Container, boundary: &Boundary, node: Node) -> Result<Address, RangeError> {
    validate(container, boundary)?;
    let mut scratch = boundary.clone();
    let at = to_element_boundary(container, boundary, &mut scratch)?;
    let parent = container
        .element_mut(&at.address)
        .ok_or_else(|| RangeError::NotAnElement(at.address.clone()))?;
    parent.insert_child(at.offset, node);
    Ok(at.address.child(at.offset))
}

/// Wrap the selected content in `wrapper`: extract it, insert the wrapper at
/// the range start, then move the fragment inside the wrapper.
///
/// Returns the wrapper's address. On any failure the tree is restored to its
/// state before the call.
pub fn surround(container: &mut Container, range: &TreeRange, wrapper: Node) -> Result<Address, RangeError> {
    let snapshot = container.clone();
    match try_surround(container, range, wrapper) {
        Ok(address) => Ok(address),
        Err(e) => {
            container.restore(snapshot);
            Err(e)
        }
    }
}

fn try_surround(container: &mut Container, range: &TreeRange, mut wrapper: Node) -> Result<Address, RangeError> {
    let (fragment, at) = extract(container, range)?;
    match wrapper.children_mut() {
        Some(children) => children.extend(fragment),
        None => return Err(RangeError::NotAnElement(at.address.clone())),
    }
    let parent = container
        .element_mut(&at.address)
        .ok_or_else(|| RangeError::NotAnElement(at.address.clone()))?;
    parent.insert_child(at.offset, wrapper);
    Ok(at.address.child(at.offset))
}

/// Extract the range; returns the fragment and the collapsed position it came from
fn extract(container: &mut Container, range: &TreeRange) -> Result<(Vec<Node>, Boundary), RangeError> {
    validate(container, &range.start)?;
    validate(container, &range.end)?;
    match compare_boundaries(&range.start, &range.end) {
        Ordering::Greater => return Err(RangeError::Reversed),
        Ordering::Equal => return Err(RangeError::Empty),
        Ordering::Less => {}
    }

    // End first: splits there sit after the start and cannot move it.
    let mut start = range.start.clone();
    let mut end = to_element_boundary(container, &range.end, &mut start)?;
    start = to_element_boundary(container, &start.clone(), &mut end)?;

    let level = start.address.common_prefix(&end.address);
    end = lift(container, end, level.len(), &mut start)?;
    start = lift(container, start, level.len(), &mut end)?;

    if start.offset >= end.offset {
        return Err(RangeError::Empty);
    }
    let children = container
        .node_mut(&level)
        .and_then(Node::children_mut)
        .ok_or_else(|| RangeError::NotAnElement(level.clone()))?;
    if end.offset > children.len() {
        return Err(invalid(&end));
    }
    let fragment: Vec<Node> = children.drain(start.offset..end.offset).collect();
    Ok((fragment, Boundary::new(level, start.offset)))
}

/// Turn a text-node boundary into an element-child boundary, splitting the
/// text node when the offset is strictly inside it. `other` is adjusted for
/// the inserted node.
fn to_element_boundary(
    container: &mut Container,
    boundary: &Boundary,
    other: &mut Boundary,
) -> Result<Boundary, RangeError> {
    let node = container.node(&boundary.address).ok_or_else(|| invalid(boundary))?;
    if !node.is_text() {
        return Ok(boundary.clone());
    }
    let (parent, index) = match (boundary.address.parent(), boundary.address.last()) {
        (Some(parent), Some(index)) => (parent, index),
        _ => return Err(invalid(boundary)),
    };
    let len = node.len();
    if boundary.offset == 0 {
        return Ok(Boundary::new(parent, index));
    }
    if boundary.offset >= len {
        return Ok(Boundary::new(parent, index + 1));
    }

    let children = container
        .node_mut(&parent)
        .and_then(Node::children_mut)
        .ok_or_else(|| RangeError::NotAnElement(parent.clone()))?;
    let tail = match children.get_mut(index) {
        Some(Node::Text(text)) => {
            let at = byte_index(text, boundary.offset);
            text.split_off(at)
        }
        _ => return Err(invalid(boundary)),
    };
    children.insert(index + 1, Node::Text(tail));
    shift_for_insert(other, &parent, index + 1);
    Ok(Boundary::new(parent, index + 1))
}

/// Raise an element boundary to `level`, splitting partially selected
/// elements on the way. Boundaries at the very start or end of an element
/// move to the parent without splitting.
fn lift(
    container: &mut Container,
    mut boundary: Boundary,
    level: usize,
    other: &mut Boundary,
) -> Result<Boundary, RangeError> {
    while boundary.address.len() > level {
        let (parent, index) = match (boundary.address.parent(), boundary.address.last()) {
            (Some(parent), Some(index)) => (parent, index),
            _ => return Err(invalid(&boundary)),
        };
        let len = container
            .node(&boundary.address)
            .map(Node::len)
            .ok_or_else(|| invalid(&boundary))?;

        if boundary.offset == 0 {
            boundary = Boundary::new(parent, index);
            continue;
        }
        if boundary.offset < len {
            let children = container
                .node_mut(&parent)
                .and_then(Node::children_mut)
                .ok_or_else(|| RangeError::NotAnElement(parent.clone()))?;
            let right = match children.get_mut(index) {
                Some(Node::Element(el)) => Element {
                    tag: el.tag.clone(),
                    attrs: el.attrs.clone(),
                    children: el.children.split_off(boundary.offset),
                },
                _ => return Err(RangeError::NotAnElement(boundary.address.clone())),
            };
            let right = Node::Element(right);
            children.insert(index + 1, right);
            shift_for_insert(other, &parent, index + 1);
        }
        boundary = Boundary::new(parent, index + 1);
    }
    Ok(boundary)
}

/// Keep `boundary` pointing at the same position after a node was inserted
/// as child `index` of `parent`.
fn shift_for_insert(boundary: &mut Boundary, parent: &Address, index: usize) {
    if boundary.address == *parent {
        if boundary.offset >= index {
            boundary.offset += 1;
        }
        return;
    }
    if parent.is_prefix_of(&boundary.address) {
        let depth = parent.len();
        let step = &mut boundary.address.indices_mut()[depth];
        if *step >= index {
            *step += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text_boundary(path: &[usize], offset: usize) -> Boundary {
        Boundary::new(Address::new(path.to_vec()), offset)
    }

    #[test]
    fn test_compare_same_node() {
        let a = text_boundary(&[0, 0], 2);
        let b = text_boundary(&[0, 0], 5);
        assert_eq!(compare_boundaries(&a, &b), Ordering::Less);
        assert_eq!(compare_boundaries(&b, &a), Ordering::Greater);
        assert_eq!(compare_boundaries(&a, &a), Ordering::Equal);
    }

    #[test]
    fn test_compare_ancestor_and_descendant() {
        // Before child 1 of the paragraph vs inside child 1
        let before = text_boundary(&[0], 1);
        let inside = text_boundary(&[0, 1, 0], 0);
        let after = text_boundary(&[0], 2);
        assert_eq!(compare_boundaries(&before, &inside), Ordering::Less);
        assert_eq!(compare_boundaries(&after, &inside), Ordering::Greater);
        assert_eq!(compare_boundaries(&inside, &after), Ordering::Less);
    }

    #[test]
    fn test_compare_siblings() {
        let a = text_boundary(&[0, 3], 9);
        let b = text_boundary(&[1, 0], 0);
        assert_eq!(compare_boundaries(&a, &b), Ordering::Less);
    }

    #[test]
    fn test_surround_within_text_node() {
        let mut container = Container::from_html("<p>This is the first sample page.</p>").unwrap();
        let range = TreeRange::new(text_boundary(&[0, 0], 12), text_boundary(&[0, 0], 24));
        let address = surround(&mut container, &range, Node::element("mark")).unwrap();
        assert_eq!(address, Address::new(vec![0, 1]));
        assert_eq!(
            container.inner_html(),
            "<p>This is the <mark>first sample</mark> page.</p>"
        );
    }

    #[test]
    fn test_surround_whole_text_node_keeps_siblings() {
        let mut container = Container::from_html("<p>one <b>two</b> three</p>").unwrap();
        let range = TreeRange::new(text_boundary(&[0, 1, 0], 0), text_boundary(&[0, 1, 0], 3));
        surround(&mut container, &range, Node::element("mark")).unwrap();
        assert_eq!(container.inner_html(), "<p>one <b><mark>two</mark></b> three</p>");
    }

    #[test]
    fn test_surround_across_elements() {
        let mut container = Container::from_html("<p>one <b>two</b> three</p>").unwrap();
        let range = TreeRange::new(text_boundary(&[0, 0], 2), text_boundary(&[0, 2], 4));
        surround(&mut container, &range, Node::element("mark")).unwrap();
        assert_eq!(
            container.inner_html(),
            "<p>on<mark>e <b>two</b> thr</mark>ee</p>"
        );
    }

    #[test]
    fn test_surround_splits_partial_element() {
        let mut container = Container::from_html("<p>one <b>two</b> three</p>").unwrap();
        let range = TreeRange::new(text_boundary(&[0, 1, 0], 1), text_boundary(&[0, 2], 3));
        surround(&mut container, &range, Node::element("mark")).unwrap();
        assert_eq!(
            container.inner_html(),
            "<p>one <b>t</b><mark><b>wo</b> th</mark>ree</p>"
        );
        assert_eq!(container.text_content(), "one two three");
    }

    #[test]
    fn test_surround_across_paragraphs() {
        let mut container = Container::from_html("<p>alpha beta</p><p>gamma delta</p>").unwrap();
        let range = TreeRange::new(text_boundary(&[0, 0], 6), text_boundary(&[1, 0], 5));
        surround(&mut container, &range, Node::element("mark")).unwrap();
        assert_eq!(
            container.inner_html(),
            "<p>alpha </p><mark><p>beta</p><p>gamma</p></mark><p> delta</p>"
        );
    }

    #[test]
    fn test_failed_surround_leaves_tree_untouched() {
        let mut container = Container::from_html("<p>alpha beta</p>").unwrap();
        let before = container.clone();
        let range = TreeRange::new(text_boundary(&[0, 0], 2), text_boundary(&[0, 0], 40));
        let err = surround(&mut container, &range, Node::element("mark")).unwrap_err();
        assert!(matches!(err, RangeError::InvalidBoundary { .. }));
        assert_eq!(container, before);

        let reversed = TreeRange::new(text_boundary(&[0, 0], 6), text_boundary(&[0, 0], 2));
        assert_eq!(surround(&mut container, &reversed, Node::element("mark")), Err(RangeError::Reversed));
        assert_eq!(container, before);

        // A text wrapper cannot hold the fragment
        let range = TreeRange::new(text_boundary(&[0, 0], 0), text_boundary(&[0, 0], 5));
        assert!(surround(&mut container, &range, Node::text("x")).is_err());
        assert_eq!(container, before);
    }

    #[test]
    fn test_extract_contents_returns_fragment() {
        let mut container = Container::from_html("<p>hello world</p>").unwrap();
        let range = TreeRange::new(text_boundary(&[0, 0], 0), text_boundary(&[0, 0], 6));
        let fragment = extract_contents(&mut container, &range).unwrap();
        assert_eq!(fragment, vec![Node::text("hello ")]);
        assert_eq!(container.inner_html(), "<p>world</p>");
    }

    #[test]
    fn test_insert_at_splits_text() {
        let mut container = Container::from_html("<p>helloworld</p>").unwrap();
        let address = insert_at(&mut container, &text_boundary(&[0, 0], 5), Node::element("br")).unwrap();
        assert_eq!(address, Address::new(vec![0, 1]));
        assert_eq!(container.inner_html(), "<p>hello<br/>world</p>");
    }

    #[test]
    fn test_from_nodes_and_ordering() {
        let container = Container::from_html("<p>abc</p><p>def</p>").unwrap();
        let first = &container.root().children()[0].children()[0];
        let second = &container.root().children()[1].children()[0];
        let range = TreeRange::from_nodes(&container, second, 1, first, 1).unwrap().ordered();
        assert_eq!(range.start, text_boundary(&[0, 0], 1));
        assert_eq!(range.common_ancestor(), Address::root());
        assert!(!range.is_collapsed());
    }
}
