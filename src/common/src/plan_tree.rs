use std::fmt;

/// NodeIndex is used to identify nodes in a PlanTree arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeIndex(usize);

impl fmt::Display for NodeIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone)]
struct PlanNode<T> {
    data: T,
    parent: Option<NodeIndex>,
    children: Vec<NodeIndex>,
}

/// Arena-indexed tree shared by every plan representation.
///
/// Nodes own an ordered child list and keep a non-owning parent
/// back-reference. Invariant: a node appears in its parent's child list iff
/// its back-reference targets that parent. All attachment goes through
/// `set_parent`/`replace_child`, which detach before they attach, so the
/// invariant holds after every mutation. Detached nodes stay in the arena
/// unreachable from any root; traversals never visit them.
///
/// Cloning the whole tree is an index-stable deep copy that shares no nodes
/// with the original.
#[derive(Debug, Clone)]
pub struct PlanTree<T> {
    nodes: Vec<PlanNode<T>>,
}

impl<T> Default for PlanTree<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> PlanTree<T> {
    /// Creates an empty tree.
    pub fn new() -> Self {
        Self { nodes: Vec::new() }
    }

    /// Adds an unattached node and returns its index.
    ///
    /// # Arguments
    ///
    /// * `data` - Payload of the new node.
    pub fn add_node(&mut self, data: T) -> NodeIndex {
        let index = NodeIndex(self.nodes.len());
        self.nodes.push(PlanNode {
            data,
            parent: None,
            children: Vec::new(),
        });
        index
    }

    /// Returns the total number of nodes in the arena, detached ones included.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Returns the number of attached parent/child links.
    pub fn edge_count(&self) -> usize {
        self.nodes.iter().filter(|n| n.parent.is_some()).count()
    }

    /// Returns the payload of a node.
    ///
    /// # Arguments
    ///
    /// * `index` - Index of the node to get the payload of.
    pub fn node_data(&self, index: NodeIndex) -> Option<&T> {
        self.nodes.get(index.0).map(|n| &n.data)
    }

    /// Returns a mutable reference to the payload of a node.
    pub fn node_data_mut(&mut self, index: NodeIndex) -> Option<&mut T> {
        self.nodes.get_mut(index.0).map(|n| &mut n.data)
    }

    /// Returns the parent of a node, if attached.
    pub fn parent(&self, index: NodeIndex) -> Option<NodeIndex> {
        self.nodes[index.0].parent
    }

    /// Returns the ordered children of a node.
    pub fn children(&self, index: NodeIndex) -> &[NodeIndex] {
        &self.nodes[index.0].children
    }

    /// Reassigns a node's parent: detaches from the current parent (no-op if
    /// unattached), then appends to the new parent's child list.
    ///
    /// # Arguments
    ///
    /// * `node` - Node to move.
    /// * `new_parent` - Parent to attach under, or None to leave detached.
    pub fn set_parent(&mut self, node: NodeIndex, new_parent: Option<NodeIndex>) {
        if let Some(old) = self.nodes[node.0].parent {
            let siblings = &mut self.nodes[old.0].children;
            if let Some(pos) = siblings.iter().position(|c| *c == node) {
                siblings.remove(pos);
            }
        }
        self.nodes[node.0].parent = new_parent;
        if let Some(parent) = new_parent {
            self.nodes[parent.0].children.push(node);
        }
    }

    /// Detaches a node from its parent. No-op for unattached nodes.
    pub fn detach(&mut self, node: NodeIndex) {
        self.set_parent(node, None);
    }

    /// Replaces `old_child` with `new_child` at the same position under
    /// `parent`. `old_child` ends up detached; `new_child` is detached from
    /// wherever it hung before taking the slot.
    ///
    /// # Panics
    ///
    /// Panics if `old_child` is not a child of `parent`.
    pub fn replace_child(&mut self, parent: NodeIndex, old_child: NodeIndex, new_child: NodeIndex) {
        self.detach(new_child);
        let pos = self.nodes[parent.0]
            .children
            .iter()
            .position(|c| *c == old_child)
            .expect("replace_child: old child not attached to parent");
        self.nodes[parent.0].children[pos] = new_child;
        self.nodes[old_child.0].parent = None;
        self.nodes[new_child.0].parent = Some(parent);
    }

    /// Pre-order traversal from `root`, as a snapshot vector. Mutations made
    /// while walking the result do not disturb the snapshot.
    pub fn preorder(&self, root: NodeIndex) -> Vec<NodeIndex> {
        let mut out = Vec::new();
        self.preorder_into(root, &mut out);
        out
    }

    fn preorder_into(&self, node: NodeIndex, out: &mut Vec<NodeIndex>) {
        out.push(node);
        for c in &self.nodes[node.0].children {
            self.preorder_into(*c, out);
        }
    }
}

impl<T: Clone> PlanTree<T> {
    /// Deep, independent copy of the subtree under `root`. The copy shares no
    /// nodes with the original; its root is unattached.
    pub fn clone_subtree(&mut self, root: NodeIndex) -> NodeIndex {
        let data = self.nodes[root.0].data.clone();
        let copy = self.add_node(data);
        for child in self.children(root).to_vec() {
            let child_copy = self.clone_subtree(child);
            self.set_parent(child_copy, Some(copy));
        }
        copy
    }

    /// Copies every ancestor from `node`'s parent up to the root, sibling
    /// subtrees included, omitting `node` itself from the copied parent's
    /// children. Returns the cloned parent, or None if `node` was the root.
    ///
    /// The clone shares nothing with the originals; walking `parent` from the
    /// returned index reaches the cloned root.
    pub fn clone_ancestry_excluding(&mut self, node: NodeIndex) -> Option<NodeIndex> {
        let parent = self.parent(node)?;
        let mut lower_orig = node;
        let mut lower_clone: Option<NodeIndex> = None;
        let mut current = Some(parent);
        let mut cloned_parent = None;
        while let Some(ancestor) = current {
            let data = self.nodes[ancestor.0].data.clone();
            let ancestor_clone = self.add_node(data);
            for child in self.children(ancestor).to_vec() {
                if child == lower_orig {
                    // the excluded node is omitted; higher rungs splice in
                    // the clone built one step below
                    if let Some(lc) = lower_clone {
                        self.set_parent(lc, Some(ancestor_clone));
                    }
                } else {
                    let sub = self.clone_subtree(child);
                    self.set_parent(sub, Some(ancestor_clone));
                }
            }
            if cloned_parent.is_none() {
                cloned_parent = Some(ancestor_clone);
            }
            lower_orig = ancestor;
            lower_clone = Some(ancestor_clone);
            current = self.parent(ancestor);
        }
        cloned_parent
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn chain(tree: &mut PlanTree<&'static str>, labels: &[&'static str]) -> Vec<NodeIndex> {
        let mut out = Vec::new();
        for label in labels {
            let n = tree.add_node(*label);
            if let Some(prev) = out.last() {
                tree.set_parent(n, Some(*prev));
            }
            out.push(n);
        }
        out
    }

    #[test]
    fn test_attach_detach_invariant() {
        let mut tree = PlanTree::new();
        let parent = tree.add_node("parent");
        let child = tree.add_node("child");
        tree.set_parent(child, Some(parent));
        assert_eq!(tree.parent(child), Some(parent));
        assert_eq!(tree.children(parent), &[child]);

        let other = tree.add_node("other");
        tree.set_parent(child, Some(other));
        assert!(tree.children(parent).is_empty());
        assert_eq!(tree.children(other), &[child]);
        assert_eq!(tree.parent(child), Some(other));
    }

    #[test]
    fn test_detach_unattached_is_noop() {
        let mut tree: PlanTree<&str> = PlanTree::new();
        let lone = tree.add_node("lone");
        tree.detach(lone);
        assert_eq!(tree.parent(lone), None);
        assert_eq!(tree.edge_count(), 0);
    }

    #[test]
    fn test_replace_child_keeps_position() {
        let mut tree = PlanTree::new();
        let parent = tree.add_node("parent");
        let a = tree.add_node("a");
        let b = tree.add_node("b");
        tree.set_parent(a, Some(parent));
        tree.set_parent(b, Some(parent));
        let c = tree.add_node("c");
        tree.replace_child(parent, a, c);
        assert_eq!(tree.children(parent), &[c, b]);
        assert_eq!(tree.parent(a), None);
        assert_eq!(tree.parent(c), Some(parent));
    }

    #[test]
    fn test_clone_subtree_is_independent() {
        let mut tree = PlanTree::new();
        let nodes = chain(&mut tree, &["root", "mid", "leaf"]);
        let copy = tree.clone_subtree(nodes[1]);
        assert_eq!(tree.parent(copy), None);
        assert_eq!(tree.children(copy).len(), 1);
        let copy_leaf = tree.children(copy)[0];
        *tree.node_data_mut(copy_leaf).unwrap() = "changed";
        assert_eq!(tree.node_data(nodes[2]), Some(&"leaf"));
    }

    #[test]
    fn test_clone_ancestry_of_root_is_none() {
        let mut tree = PlanTree::new();
        let root = tree.add_node("root");
        assert_eq!(tree.clone_ancestry_excluding(root), None);
    }

    #[test]
    fn test_clone_ancestry_excluding() {
        let mut tree = PlanTree::new();
        let root = tree.add_node("root");
        let mid = tree.add_node("mid");
        let target = tree.add_node("target");
        let sibling = tree.add_node("sibling");
        tree.set_parent(mid, Some(root));
        tree.set_parent(target, Some(mid));
        tree.set_parent(sibling, Some(mid));

        let cloned_mid = tree.clone_ancestry_excluding(target).unwrap();
        assert_eq!(tree.node_data(cloned_mid), Some(&"mid"));
        // target is omitted; the sibling subtree is copied
        assert_eq!(tree.children(cloned_mid).len(), 1);
        let cloned_sibling = tree.children(cloned_mid)[0];
        assert_ne!(cloned_sibling, sibling);
        assert_eq!(tree.node_data(cloned_sibling), Some(&"sibling"));
        // the cloned chain reaches a cloned root, distinct from the original
        let cloned_root = tree.parent(cloned_mid).unwrap();
        assert_ne!(cloned_root, root);
        assert_eq!(tree.node_data(cloned_root), Some(&"root"));
        assert_eq!(tree.parent(cloned_root), None);
        // original tree untouched
        assert_eq!(tree.children(mid), &[target, sibling]);
    }

    #[test]
    fn test_preorder() {
        let mut tree = PlanTree::new();
        let root = tree.add_node("root");
        let l = tree.add_node("l");
        let r = tree.add_node("r");
        let ll = tree.add_node("ll");
        tree.set_parent(l, Some(root));
        tree.set_parent(r, Some(root));
        tree.set_parent(ll, Some(l));
        assert_eq!(tree.preorder(root), vec![root, l, ll, r]);
    }

    #[test]
    fn test_whole_tree_clone_shares_nothing() {
        let mut tree = PlanTree::new();
        let nodes = chain(&mut tree, &["root", "leaf"]);
        let mut copy = tree.clone();
        *copy.node_data_mut(nodes[1]).unwrap() = "changed";
        assert_eq!(tree.node_data(nodes[1]), Some(&"leaf"));
    }
}
