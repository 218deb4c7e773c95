use crate::plan_tree::{NodeIndex, PlanTree};
use crate::MiniRelError;
pub use logical_op::*;
use serde_json::{json, Value};
use std::collections::{BTreeSet, HashMap};
mod logical_op;
use std::default::Default;
use std::fmt;

/// OpIndex is used to identify nodes in the LogicalPlan.
pub type OpIndex = NodeIndex;

/// Tree where nodes represent logical operations and edges represent the flow
/// of data from child to parent.
#[derive(Debug, Clone)]
pub struct LogicalPlan {
    /// Arena holding the operators.
    tree: PlanTree<LogicalOp>,
    /// The root represents the final output operation.
    root: Option<OpIndex>,
}

impl Default for LogicalPlan {
    fn default() -> Self {
        Self::new()
    }
}

impl LogicalPlan {
    /// Creates an empty logical plan.
    pub fn new() -> Self {
        Self {
            tree: PlanTree::new(),
            root: None,
        }
    }

    /// Adds a node with an associated LogicalOp to the logical plan and returns the index of the added node.
    ///
    /// The first node added becomes the root until edges say otherwise.
    ///
    /// # Arguments
    ///
    /// * `operator` - Operator to add to the logical plan.
    pub fn add_node(&mut self, operator: LogicalOp) -> OpIndex {
        let index = self.tree.add_node(operator);
        if self.root.is_none() {
            self.root = Some(index)
        }
        index
    }

    /// Adds an edge from source to target.
    ///
    /// In the logical plan representation data flows from target to source:
    /// the target becomes a child of the source. If the target was the root,
    /// the source takes its place.
    ///
    /// # Arguments
    ///
    /// * `source` - Data consumer.
    /// * `target` - Data producer.
    pub fn add_edge(&mut self, source: OpIndex, target: OpIndex) {
        if let Some(index) = self.root {
            if index == target {
                self.root = Some(source);
            }
        }
        self.tree.set_parent(target, Some(source));
    }

    /// Returns an iterator over the children of `from`, in order.
    ///
    /// # Arguments
    ///
    /// * `from` - Node to get the edges of.
    pub fn edges<'a>(&'a self, from: OpIndex) -> impl Iterator<Item = OpIndex> + 'a {
        self.tree.children(from).iter().copied()
    }

    /// Gets the index of the root node, if such a node is present.
    ///
    /// The root node represents the final output operation in the logical plan.
    pub fn root(&self) -> Option<OpIndex> {
        self.root
    }

    /// Replaces the root index.
    ///
    /// # Arguments
    ///
    /// * `root` - Node to declare as the final output operation.
    pub fn set_root(&mut self, root: Option<OpIndex>) {
        self.root = root;
    }

    /// Returns the LogicalOp associated with a node.
    ///
    /// # Arguments
    ///
    /// * `index` - Index of the node to get the logical operation of.
    pub fn get_operator(&self, index: OpIndex) -> Option<&LogicalOp> {
        self.tree.node_data(index)
    }

    /// Returns a mutable reference to the LogicalOp associated with a node.
    pub fn get_operator_mut(&mut self, index: OpIndex) -> Option<&mut LogicalOp> {
        self.tree.node_data_mut(index)
    }

    /// Returns the parent of a node, if attached.
    pub fn parent(&self, index: OpIndex) -> Option<OpIndex> {
        self.tree.parent(index)
    }

    /// Returns the ordered children of a node.
    pub fn children(&self, index: OpIndex) -> &[OpIndex] {
        self.tree.children(index)
    }

    /// Reassigns a node's parent (detach-then-attach).
    pub fn set_parent(&mut self, node: OpIndex, new_parent: Option<OpIndex>) {
        self.tree.set_parent(node, new_parent);
    }

    /// Detaches a node from its parent. No-op for unattached nodes.
    pub fn detach(&mut self, node: OpIndex) {
        self.tree.detach(node);
    }

    /// Replaces the whole subtree rooted at `old` with the one rooted at
    /// `new`, preserving `old`'s slot (or the root, if `old` was the root).
    ///
    /// # Arguments
    ///
    /// * `old` - Subtree to displace; ends up detached.
    /// * `new` - Replacement subtree root.
    pub fn replace_subtree(&mut self, old: OpIndex, new: OpIndex) {
        match self.tree.parent(old) {
            Some(parent) => self.tree.replace_child(parent, old, new),
            None => {
                self.tree.detach(new);
                if self.root == Some(old) {
                    self.root = Some(new);
                }
            }
        }
    }

    /// Removes a single-child node, letting the child take its place.
    ///
    /// # Arguments
    ///
    /// * `node` - Node to splice out.
    ///
    /// # Panics
    ///
    /// Panics if the node does not have exactly one child.
    pub fn splice_out(&mut self, node: OpIndex) {
        let children = self.tree.children(node).to_vec();
        assert_eq!(children.len(), 1, "splice_out requires exactly one child");
        let child = children[0];
        self.replace_subtree(node, child);
    }

    /// Inserts a new node between `node` and its parent (or above the root),
    /// adopting `node` as its only child. Returns the new node.
    ///
    /// # Arguments
    ///
    /// * `node` - Node to wrap.
    /// * `operator` - Operator for the inserted node.
    pub fn insert_above(&mut self, node: OpIndex, operator: LogicalOp) -> OpIndex {
        let inserted = self.tree.add_node(operator);
        self.replace_subtree(node, inserted);
        self.tree.set_parent(node, Some(inserted));
        inserted
    }

    /// Returns the set of relation names reachable under a node's leaves.
    ///
    /// # Arguments
    ///
    /// * `index` - Node to collect the namespaces of.
    pub fn collect_namespaces(&self, index: OpIndex) -> BTreeSet<String> {
        let mut out = BTreeSet::new();
        for node in self.tree.preorder(index) {
            if let Some(LogicalOp::Relation(r)) = self.tree.node_data(node) {
                out.insert(r.name.clone());
            }
        }
        out
    }

    /// Pre-order snapshot of the attached plan, root first. Empty when the
    /// plan has no root.
    pub fn preorder(&self) -> Vec<OpIndex> {
        match self.root {
            Some(root) => self.tree.preorder(root),
            None => Vec::new(),
        }
    }

    /// Pre-order snapshot of the subtree under `index`.
    pub fn preorder_from(&self, index: OpIndex) -> Vec<OpIndex> {
        self.tree.preorder(index)
    }

    /// Returns the number of nodes reachable from the root.
    pub fn node_count(&self) -> usize {
        self.preorder().len()
    }

    /// Serializes the logical plan as json.
    pub fn to_json(&self) -> serde_json::Value {
        let mut node_map = HashMap::new();
        let mut edge_map: HashMap<String, Vec<String>> = HashMap::new();
        for index in self.preorder() {
            node_map.insert(index.to_string(), self.tree.node_data(index).unwrap());
            let children: Vec<String> = self.tree.children(index).iter().map(|c| c.to_string()).collect();
            if !children.is_empty() {
                edge_map.insert(index.to_string(), children);
            }
        }
        json!({"nodes": node_map,
               "edges": edge_map,
               "root": self.root.map(|i| i.to_string())})
    }

    fn map_json_err<T>(result: serde_json::Result<T>, err: MiniRelError) -> Result<T, MiniRelError> {
        match result {
            Ok(res) => Ok(res),
            _ => Err(err),
        }
    }

    /// De-serializes a json representation of the logical plan created in to_json.
    pub fn from_json(json: &str) -> Result<Self, MiniRelError> {
        let malformed_err =
            MiniRelError::MiniRelError(String::from("Malformatted logical plan json"));
        let v: Value =
            LogicalPlan::map_json_err(serde_json::from_str(json), malformed_err.clone())?;
        let nodes: HashMap<String, LogicalOp> = LogicalPlan::map_json_err(
            serde_json::from_value(v["nodes"].clone()),
            malformed_err.clone(),
        )?;
        let edges: HashMap<String, Vec<String>> = LogicalPlan::map_json_err(
            serde_json::from_value(v["edges"].clone()),
            malformed_err.clone(),
        )?;
        let root: Option<String> = LogicalPlan::map_json_err(
            serde_json::from_value(v["root"].clone()),
            malformed_err.clone(),
        )?;
        let mut graph_map = HashMap::new();
        let mut plan = LogicalPlan::new();
        for (i, val) in nodes.iter() {
            let node = plan.tree.add_node(val.clone());
            graph_map.insert(i, node);
        }

        if let Some(i) = root {
            let root_node = graph_map.get(&i).ok_or_else(|| malformed_err.clone())?;
            plan.root = Some(*root_node);
        }

        for (source, targets) in edges.iter() {
            let source_node = graph_map.get(source).ok_or_else(|| malformed_err.clone())?;
            for target in targets {
                let target_node = graph_map
                    .get(&target.to_string())
                    .ok_or_else(|| malformed_err.clone())?;
                plan.tree.set_parent(*target_node, Some(*source_node));
            }
        }
        Ok(plan)
    }

    /// Indented rendering of the plan, one operator per line.
    pub fn pretty(&self) -> String {
        fn aux(plan: &LogicalPlan, node: OpIndex, level: usize, out: &mut String) {
            out.push_str(&"  ".repeat(level));
            out.push_str(&plan.get_operator(node).unwrap().to_string());
            out.push('\n');
            for child in plan.children(node).to_vec() {
                aux(plan, child, level + 1, out);
            }
        }
        let mut out = String::new();
        if let Some(root) = self.root {
            aux(self, root, 0, &mut out);
        }
        out
    }
}

impl fmt::Display for LogicalPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_json())
    }
}
