use crate::data::item::Item;

/// Child of a group: either a leaf or a nested group.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// A typed leaf.
    Item(Item),
    /// A nested group.
    Group(Group),
}

impl Node {
    /// Name of the leaf or group.
    pub fn name(&self) -> &str {
        match self {
            Node::Item(item) => item.name(),
            Node::Group(group) => group.name(),
        }
    }

    /// The leaf, if this is one.
    pub fn as_item(&self) -> Option<&Item> {
        match self {
            Node::Item(item) => Some(item),
            Node::Group(_) => None,
        }
    }

    /// The group, if this is one.
    pub fn as_group(&self) -> Option<&Group> {
        match self {
            Node::Group(group) => Some(group),
            Node::Item(_) => None,
        }
    }
}

/// Named namespace owning items and subgroups in insertion order.
///
/// Items and subgroups share one namespace inside a group.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Group {
    name: String,
    children: Vec<Node>,
}

impl Group {
    /// Empty group. The root group of a pool has an empty name.
    pub fn new(name: impl Into<String>) -> Self {
        Group {
            name: name.into(),
            children: Vec::new(),
        }
    }

    /// Group name; empty for the root.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// All children, items and groups interleaved in insertion order.
    pub fn children(&self) -> &[Node] {
        &self.children
    }

    /// Direct leaves only.
    pub fn items(&self) -> impl Iterator<Item = &Item> {
        self.children.iter().filter_map(Node::as_item)
    }

    /// Direct subgroups only.
    pub fn subgroups(&self) -> impl Iterator<Item = &Group> {
        self.children.iter().filter_map(Node::as_group)
    }

    /// No children at all.
    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    /// Direct child by name.
    pub fn child(&self, name: &str) -> Option<&Node> {
        self.children.iter().find(|c| c.name() == name)
    }

    pub(crate) fn child_mut(&mut self, name: &str) -> Option<&mut Node> {
        self.children.iter_mut().find(|c| c.name() == name)
    }

    /// Append a child. Callers check for name collisions first.
    pub(crate) fn push(&mut self, node: Node) {
        debug_assert!(self.child(node.name()).is_none());
        self.children.push(node);
    }

    pub(crate) fn into_children(self) -> Vec<Node> {
        self.children
    }

    /// Look up a node by path segments relative to this group.
    pub fn find<S: AsRef<str>>(&self, segments: &[S]) -> Option<&Node> {
        let (first, rest) = segments.split_first()?;
        let node = self.child(first.as_ref())?;
        if rest.is_empty() {
            return Some(node);
        }
        match node {
            Node::Group(group) => group.find(rest),
            Node::Item(_) => None,
        }
    }

    pub(crate) fn find_mut<S: AsRef<str>>(&mut self, segments: &[S]) -> Option<&mut Node> {
        let (first, rest) = segments.split_first()?;
        let node = self.child_mut(first.as_ref())?;
        if rest.is_empty() {
            return Some(node);
        }
        match node {
            Node::Group(group) => group.find_mut(rest),
            Node::Item(_) => None,
        }
    }

    /// Look up a nested group; an empty path is this group.
    pub fn group<S: AsRef<str>>(&self, segments: &[S]) -> Option<&Group> {
        if segments.is_empty() {
            return Some(self);
        }
        self.find(segments).and_then(Node::as_group)
    }

    pub(crate) fn item_mut<S: AsRef<str>>(&mut self, segments: &[S]) -> Option<&mut Item> {
        match self.find_mut(segments)? {
            Node::Item(item) => Some(item),
            Node::Group(_) => None,
        }
    }

    /// Number of leaves in this subtree.
    pub fn leaf_count(&self) -> usize {
        self.children
            .iter()
            .map(|c| match c {
                Node::Item(_) => 1,
                Node::Group(g) => g.leaf_count(),
            })
            .sum()
    }
}
