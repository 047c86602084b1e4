//! Owned content tree, markup codec and range surgery

pub mod markup;
pub mod node;
pub mod range;

pub use markup::{parse_fragment, serialize_fragment};
pub use node::{Element, Node};
pub use range::{compare_boundaries, extract_contents, insert_at, surround, Boundary, TreeRange};

use crate::address::{compute_address, resolve_address, resolve_address_mut, Address};
use crate::error::MarkupError;

/// Root under which every annotation address is relative.
///
/// The root is always an element; its children are the page content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Container {
    root: Node,
}

impl Container {
    pub fn new() -> Self {
        Self {
            root: Node::element("div"),
        }
    }

    pub fn from_html(html: &str) -> Result<Self, MarkupError> {
        let mut container = Self::new();
        container.set_html(html)?;
        Ok(container)
    }

    /// Replace the whole content; the old content is kept if `html` fails to parse
    pub fn set_html(&mut self, html: &str) -> Result<(), MarkupError> {
        let children = parse_fragment(html)?;
        if let Some(root) = self.root.as_element_mut() {
            root.children = children;
        }
        Ok(())
    }

    pub fn inner_html(&self) -> String {
        serialize_fragment(self.root.children())
    }

    pub fn root(&self) -> &Node {
        &self.root
    }

    pub fn node(&self, address: &Address) -> Option<&Node> {
        resolve_address(address, &self.root)
    }

    pub fn node_mut(&mut self, address: &Address) -> Option<&mut Node> {
        resolve_address_mut(address, &mut self.root)
    }

    pub fn element_mut(&mut self, address: &Address) -> Option<&mut Element> {
        self.node_mut(address).and_then(Node::as_element_mut)
    }

    /// Address of a node borrowed from this container
    pub fn address_of(&self, node: &Node) -> Option<Address> {
        compute_address(node, &self.root)
    }

    pub fn text_content(&self) -> String {
        self.root.text_content()
    }

    pub fn normalize(&mut self) {
        if let Some(root) = self.root.as_element_mut() {
            root.normalize();
        }
    }

    /// Put back a snapshot taken with `clone()`
    pub(crate) fn restore(&mut self, snapshot: Container) {
        self.root = snapshot.root;
    }
}

impl Default for Container {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_markup() {
        let html = "<p>This is the first sample page.</p><p>Lorem <em>ipsum</em></p>";
        let container = Container::from_html(html).unwrap();
        assert_eq!(container.inner_html(), html);
        assert_eq!(container.text_content(), "This is the first sample page.Lorem ipsum");
    }

    #[test]
    fn test_set_html_replaces_content() {
        let mut container = Container::from_html("<p>old</p>").unwrap();
        container.set_html("<h1>new</h1><p>body</p>").unwrap();
        assert_eq!(container.root().children().len(), 2);
        assert_eq!(container.text_content(), "newbody");
    }

    #[test]
    fn test_address_of_nested_node() {
        let container = Container::from_html("<p>a</p><ul><li>b</li><li>c</li></ul>").unwrap();
        let item = &container.root().children()[1].children()[1];
        let address = container.address_of(item).unwrap();
        assert_eq!(address, Address::new(vec![1, 1]));
        assert!(std::ptr::eq(container.node(&address).unwrap(), item));
    }
}
