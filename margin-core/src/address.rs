use std::fmt;

use serde::{Deserialize, Serialize};

use crate::dom::Node;

/// Root-relative child-index path locating a node inside a container.
///
/// The empty address denotes the container itself; the last index is the
/// position of the addressed node among its parent's children.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Address(Vec<usize>);

impl Address {
    pub fn root() -> Self {
        Self(Vec::new())
    }

    pub fn new(indices: Vec<usize>) -> Self {
        Self(indices)
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    pub fn indices(&self) -> &[usize] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Address of the `index`th child of this node
    pub fn child(&self, index: usize) -> Self {
        let mut indices = self.0.clone();
        indices.push(index);
        Self(indices)
    }

    pub fn parent(&self) -> Option<Self> {
        let (_, rest) = self.0.split_last()?;
        Some(Self(rest.to_vec()))
    }

    /// Index of the addressed node within its parent
    pub fn last(&self) -> Option<usize> {
        self.0.last().copied()
    }

    /// True if `self` equals `other` or lies on the path from the root to it
    pub fn is_prefix_of(&self, other: &Address) -> bool {
        other.0.starts_with(&self.0)
    }

    /// Longest shared path of two addresses
    pub fn common_prefix(&self, other: &Address) -> Self {
        let shared = self
            .0
            .iter()
            .zip(other.0.iter())
            .take_while(|(a, b)| a == b)
            .count();
        Self(self.0[..shared].to_vec())
    }

    pub(crate) fn indices_mut(&mut self) -> &mut Vec<usize> {
        &mut self.0
    }
}

impl From<Vec<usize>> for Address {
    fn from(indices: Vec<usize>) -> Self {
        Self(indices)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str("/");
        }
        for index in &self.0 {
            write!(f, "/{}", index)?;
        }
        Ok(())
    }
}

/// Compute the path from `container` to `node`.
///
/// Nodes are identified by reference, so `node` must be borrowed from the
/// tree under `container`. Returns `None` when `node` is not reachable
/// (a detached node or a node from another tree).
pub fn compute_address(node: &Node, container: &Node) -> Option<Address> {
    if std::ptr::eq(node, container) {
        return Some(Address::root());
    }
    let mut path = Vec::new();
    if find_path(container, node, &mut path) {
        Some(Address(path))
    } else {
        None
    }
}

fn find_path(current: &Node, target: &Node, path: &mut Vec<usize>) -> bool {
    for (index, child) in current.children().iter().enumerate() {
        path.push(index);
        if std::ptr::eq(child, target) || find_path(child, target, path) {
            return true;
        }
        path.pop();
    }
    false
}

/// Descend from `container` through each index of `address` in turn.
///
/// Returns `None` as soon as an index is out of range, which happens when the
/// tree was restructured after the address was captured.
pub fn resolve_address<'a>(address: &Address, container: &'a Node) -> Option<&'a Node> {
    address
        .indices()
        .iter()
        .try_fold(container, |node, &index| node.children().get(index))
}

/// Mutable counterpart of [`resolve_address`]
pub fn resolve_address_mut<'a>(address: &Address, container: &'a mut Node) -> Option<&'a mut Node> {
    let mut node = container;
    for &index in address.indices() {
        node = node.children_mut()?.get_mut(index)?;
    }
    Some(node)
}
