use crate::*;
use petgraph::graph::DiGraph;
use petgraph::graph::NodeIndex;
use pgm_core::Probability;
use pgm_core::Result;
use pgm_core::Utility;
use pgm_network::*;
use std::cell::Cell;
use std::cell::OnceCell;
use std::sync::Arc;

/// Payload of a tree node: the network node it unrolls.
#[derive(Debug)]
pub(crate) struct NodeData {
    pub(crate) node: Arc<ProbNode>,
    pub(crate) utility: OnceCell<Utility>,
    pub(crate) scenario: OnceCell<Probability>,
}

/// Payload of a branch: the finding it adds (none at the root) and the
/// findings forced on the way by single-state restrictions.
#[derive(Debug)]
pub(crate) struct BranchData {
    pub(crate) label: Option<Finding>,
    pub(crate) forced: Vec<Finding>,
    pub(crate) utility: OnceCell<Utility>,
    pub(crate) scenario: OnceCell<Probability>,
}

#[derive(Debug)]
pub(crate) enum Vertex {
    Node(NodeData),
    Branch(BranchData),
}

/// Unrolled decision process of a network.
///
/// Elements live in a petgraph arena; edges point from parent to child and
/// children keep their insertion order. The root is always the unlabeled
/// branch at index 0.
///
/// The tree owns the network its branches are scored against (for IDs the
/// working copy carrying the super-value node, for DANs the network the
/// build started from).
///
/// # Traversal
///
/// - `root()` — The root [`TreeBranch`]
/// - `at(index)` — [`Element`] handle at a given index
/// - `nodes()` — Every [`TreeNode`] in index order
#[derive(Debug)]
pub struct DecisionTree {
    graph: DiGraph<Vertex, ()>,
    net: ProbNet,
    lookups: Cell<usize>,
}

impl DecisionTree {
    pub(crate) fn new(net: ProbNet) -> Self {
        let mut graph = DiGraph::default();
        graph.add_node(Vertex::Branch(BranchData {
            label: None,
            forced: Vec::new(),
            utility: OnceCell::new(),
            scenario: OnceCell::new(),
        }));
        Self {
            graph,
            net,
            lookups: Cell::new(0),
        }
    }
    pub(crate) fn root_index(&self) -> NodeIndex {
        NodeIndex::new(0)
    }
    /// Appends a node under `parent`, a branch or (inside utility subtrees) a node.
    pub(crate) fn add_node(&mut self, parent: NodeIndex, node: Arc<ProbNode>) -> NodeIndex {
        let child = self.graph.add_node(Vertex::Node(NodeData {
            node,
            utility: OnceCell::new(),
            scenario: OnceCell::new(),
        }));
        self.graph.add_edge(parent, child, ());
        child
    }
    pub(crate) fn add_branch(
        &mut self,
        parent: NodeIndex,
        label: Finding,
        forced: Vec<Finding>,
    ) -> NodeIndex {
        let child = self.graph.add_node(Vertex::Branch(BranchData {
            label: Some(label),
            forced,
            utility: OnceCell::new(),
            scenario: OnceCell::new(),
        }));
        self.graph.add_edge(parent, child, ());
        child
    }
    pub(crate) fn vertex(&self, index: NodeIndex) -> &Vertex {
        &self.graph[index]
    }
    pub(crate) fn children_of(&self, index: NodeIndex) -> Vec<NodeIndex> {
        let mut children = self
            .graph
            .neighbors_directed(index, petgraph::Outgoing)
            .collect::<Vec<_>>();
        children.reverse();
        children
    }
    pub(crate) fn parent_of(&self, index: NodeIndex) -> Option<NodeIndex> {
        self.graph
            .neighbors_directed(index, petgraph::Incoming)
            .next()
    }
    /// Counts one potential evaluation.
    pub(crate) fn lookup(&self) {
        self.lookups.set(self.lookups.get() + 1);
    }

    /// Number of elements (nodes and branches).
    pub fn n(&self) -> usize {
        self.graph.node_count()
    }
    /// Potential evaluations performed so far by utility and scenario
    /// probability computations on this tree.
    pub fn lookups(&self) -> usize {
        self.lookups.get()
    }
    pub fn net(&self) -> &ProbNet {
        &self.net
    }
    pub fn root(&self) -> TreeBranch<'_> {
        TreeBranch::from(self.root_index(), self)
    }
    pub fn at(&self, index: NodeIndex) -> Element<'_> {
        match self.vertex(index) {
            Vertex::Node(_) => Element::Node(TreeNode::from(index, self)),
            Vertex::Branch(_) => Element::Branch(TreeBranch::from(index, self)),
        }
    }
    pub fn nodes(&self) -> impl Iterator<Item = TreeNode<'_>> {
        self.graph
            .node_indices()
            .filter(|i| matches!(self.vertex(*i), Vertex::Node(_)))
            .map(|i| TreeNode::from(i, self))
    }
    /// Expected utility of the whole tree.
    pub fn utility(&self) -> Result<Utility> {
        self.root().utility()
    }

    /// display the tree one element per line
    fn show(&self, f: &mut std::fmt::Formatter, x: NodeIndex, prefix: &str) -> std::fmt::Result {
        let children = self.children_of(x);
        let n = children.len();
        for (i, child) in children.into_iter().enumerate() {
            let last = i == n - 1;
            let gaps = if last { "    " } else { "│   " };
            let stem = if last { "└" } else { "├" };
            match self.at(child) {
                Element::Node(node) => {
                    writeln!(f, "{}{}──{}", prefix, stem, node.prob_node())?;
                    self.show(f, child, &format!("{}{}", prefix, gaps))?;
                }
                Element::Branch(branch) => match branch.child() {
                    Some(node) => {
                        writeln!(f, "{}{}──{} → {}", prefix, stem, branch, node.prob_node())?;
                        self.show(f, node.index(), &format!("{}{}", prefix, gaps))?;
                    }
                    None => writeln!(f, "{}{}──{}", prefix, stem, branch)?,
                },
            }
        }
        Ok(())
    }
}

impl std::fmt::Display for DecisionTree {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self.root().child() {
            Some(node) => {
                writeln!(f, "ROOT → {}", node.prob_node())?;
                self.show(f, node.index(), "")
            }
            None => writeln!(f, "ROOT"),
        }
    }
}

/// Returns the cached value, computing and caching it on first use.
/// A failed computation leaves the cell empty.
pub(crate) fn memo<F>(cell: &OnceCell<f64>, compute: F) -> Result<f64>
where
    F: FnOnce() -> Result<f64>,
{
    match cell.get() {
        Some(x) => Ok(*x),
        None => compute().map(|x| *cell.get_or_init(|| x)),
    }
}
