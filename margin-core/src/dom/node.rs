/// A node of the content tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Element(Element),
    Text(String),
}

/// An element with ordered attributes and owned children
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    pub tag: String,
    pub attrs: Vec<(String, String)>,
    pub children: Vec<Node>,
}

/// Number of chars in `text`; text offsets are counted in chars
pub fn char_len(text: &str) -> usize {
    text.chars().count()
}

/// Byte index of the `offset`th char, clamped to the end of `text`
pub fn byte_index(text: &str, offset: usize) -> usize {
    text.char_indices()
        .nth(offset)
        .map(|(i, _)| i)
        .unwrap_or(text.len())
}

impl Node {
    pub fn text(content: impl Into<String>) -> Self {
        Node::Text(content.into())
    }

    pub fn element(tag: impl Into<String>) -> Self {
        Node::Element(Element::new(tag))
    }

    pub fn is_text(&self) -> bool {
        matches!(self, Node::Text(_))
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Node::Text(text) => Some(text),
            Node::Element(_) => None,
        }
    }

    pub fn as_element(&self) -> Option<&Element> {
        match self {
            Node::Element(el) => Some(el),
            Node::Text(_) => None,
        }
    }

    pub fn as_element_mut(&mut self) -> Option<&mut Element> {
        match self {
            Node::Element(el) => Some(el),
            Node::Text(_) => None,
        }
    }

    /// Children in document order; text nodes have none
    pub fn children(&self) -> &[Node] {
        match self {
            Node::Element(el) => &el.children,
            Node::Text(_) => &[],
        }
    }

    pub fn children_mut(&mut self) -> Option<&mut Vec<Node>> {
        self.as_element_mut().map(|el| &mut el.children)
    }

    /// Boundary length: chars for text, child count for elements
    pub fn len(&self) -> usize {
        match self {
            Node::Text(text) => char_len(text),
            Node::Element(el) => el.children.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn text_content(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        match self {
            Node::Text(text) => out.push_str(text),
            Node::Element(el) => {
                for child in &el.children {
                    child.collect_text(out);
                }
            }
        }
    }
}

impl Element {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            attrs: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_attr(name, value);
        self
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn set_attr(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.attrs.iter_mut().find(|(key, _)| *key == name) {
            Some(slot) => slot.1 = value,
            None => self.attrs.push((name, value)),
        }
    }

    pub fn remove_attr(&mut self, name: &str) -> Option<String> {
        let pos = self.attrs.iter().position(|(key, _)| key == name)?;
        Some(self.attrs.remove(pos).1)
    }

    pub fn classes(&self) -> impl Iterator<Item = &str> {
        self.attr("class").unwrap_or("").split_whitespace()
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.classes().any(|c| c == class)
    }

    pub fn add_class(&mut self, class: &str) {
        if self.has_class(class) {
            return;
        }
        let joined = match self.attr("class") {
            Some(existing) if !existing.trim().is_empty() => format!("{} {}", existing.trim(), class),
            _ => class.to_string(),
        };
        self.set_attr("class", joined);
    }

    pub fn remove_class(&mut self, class: &str) {
        let remaining: Vec<&str> = self.classes().filter(|c| *c != class).collect();
        let joined = remaining.join(" ");
        self.set_attr("class", joined);
    }

    /// Position of `child` among this element's children, by identity
    pub fn child_index(&self, child: &Node) -> Option<usize> {
        self.children.iter().position(|c| std::ptr::eq(c, child))
    }

    /// Insert `node` before the child at `index`; indices past the end append
    pub fn insert_child(&mut self, index: usize, node: Node) {
        let index = index.min(self.children.len());
        self.children.insert(index, node);
    }

    pub fn append_child(&mut self, node: Node) {
        self.children.push(node);
    }

    pub fn remove_child(&mut self, index: usize) -> Option<Node> {
        if index < self.children.len() {
            Some(self.children.remove(index))
        } else {
            None
        }
    }

    /// Merge adjacent text children and drop empty ones, recursively
    pub fn normalize(&mut self) {
        let mut merged: Vec<Node> = Vec::with_capacity(self.children.len());
        for child in self.children.drain(..) {
            match child {
                Node::Text(text) if text.is_empty() => {}
                Node::Text(text) => match merged.last_mut() {
                    Some(Node::Text(prev)) => prev.push_str(&text),
                    _ => merged.push(Node::Text(text)),
                },
                Node::Element(mut el) => {
                    el.normalize();
                    merged.push(Node::Element(el));
                }
            }
        }
        self.children = merged;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_merges_and_drops() {
        let mut el = Element::new("p");
        el.append_child(Node::text("a"));
        el.append_child(Node::text(""));
        el.append_child(Node::text("b"));
        let mut inner = Element::new("b");
        inner.append_child(Node::text("c"));
        inner.append_child(Node::text("d"));
        el.append_child(Node::Element(inner));
        el.append_child(Node::text("e"));

        el.normalize();

        assert_eq!(el.children.len(), 3);
        assert_eq!(el.children[0].as_text(), Some("ab"));
        assert_eq!(el.children[1].children().len(), 1);
        assert_eq!(el.children[1].text_content(), "cd");
    }

    #[test]
    fn test_class_list() {
        let mut el = Element::new("span").with_attr("class", "highlight yellow");
        assert!(el.has_class("yellow"));
        el.remove_class("yellow");
        el.add_class("blue");
        assert_eq!(el.attr("class"), Some("highlight blue"));
        el.add_class("blue");
        assert_eq!(el.attr("class"), Some("highlight blue"));
    }

    #[test]
    fn test_child_index_by_identity() {
        let mut el = Element::new("p");
        el.append_child(Node::text("same"));
        el.append_child(Node::text("same"));
        let second = &el.children[1];
        assert_eq!(el.child_index(second), Some(1));
        assert_eq!(el.child_index(&Node::text("same")), None);
    }

    #[test]
    fn test_len_counts_chars() {
        assert_eq!(Node::text("héllo").len(), 5);
        assert_eq!(byte_index("héllo", 2), 3);
        assert_eq!(byte_index("héllo", 9), 6);
    }
}
