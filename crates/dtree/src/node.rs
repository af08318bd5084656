use crate::*;
use petgraph::graph::NodeIndex;
use pgm_core::Error;
use pgm_core::Probability;
use pgm_core::Result;
use pgm_core::Utility;
use pgm_network::*;
use std::sync::Arc;

/// Handle to a tree node unrolling one network node.
///
/// Its children are the branches leaving it, one per state of its variable,
/// or inside a utility subtree the utility nodes it aggregates.
///
/// # Evaluation
///
/// - DECISION: utility is the max over branches, scenario probability is the
///   first branch's
/// - CHANCE: utility and scenario probability are sums over branches
/// - UTILITY: sum or product of the child utilities, or the table value at
///   the findings gathered on the way down
#[derive(Debug, Clone, Copy)]
pub struct TreeNode<'tree> {
    index: NodeIndex,
    tree: &'tree DecisionTree,
}

impl<'tree> TreeNode<'tree> {
    pub(crate) fn from(index: NodeIndex, tree: &'tree DecisionTree) -> Self {
        Self { index, tree }
    }
    fn data(&self) -> &'tree crate::tree::NodeData {
        match self.tree.vertex(self.index) {
            crate::tree::Vertex::Node(data) => data,
            crate::tree::Vertex::Branch(_) => unreachable!("node handle on a branch"),
        }
    }
    pub fn index(&self) -> NodeIndex {
        self.index
    }
    pub fn prob_node(&self) -> &'tree Arc<ProbNode> {
        &self.data().node
    }
    pub fn node_type(&self) -> NodeType {
        self.prob_node().node_type()
    }
    pub fn variable(&self) -> &'tree Variable {
        self.prob_node().variable()
    }
    pub fn name(&self) -> &'tree str {
        self.prob_node().name()
    }
    pub fn parent(&self) -> Option<Element<'tree>> {
        self.tree.parent_of(self.index).map(|i| self.tree.at(i))
    }
    pub fn children(&self) -> Vec<Element<'tree>> {
        self.tree
            .children_of(self.index)
            .into_iter()
            .map(|i| self.tree.at(i))
            .collect()
    }
    pub fn branches(&self) -> Vec<TreeBranch<'tree>> {
        self.children()
            .into_iter()
            .filter_map(|e| match e {
                Element::Branch(b) => Some(b),
                Element::Node(_) => None,
            })
            .collect()
    }

    pub fn utility(&self) -> Result<Utility> {
        crate::tree::memo(&self.data().utility, || {
            let children = self.children();
            match self.node_type() {
                NodeType::Decision => children
                    .iter()
                    .try_fold(f64::NEG_INFINITY, |max, c| -> Result<Utility> {
                        Ok(max.max(c.utility()?))
                    }),
                NodeType::Chance => children.iter().map(Element::utility).sum(),
                NodeType::Utility => match self.prob_node().potential() {
                    Some(Potential::Sum(_)) => children.iter().map(Element::utility).sum(),
                    Some(Potential::Product(_)) => children.iter().map(Element::utility).product(),
                    Some(Potential::Table(table)) => {
                        self.tree.lookup();
                        table.value(&self.branch_states())
                    }
                    None => Err(Error::MissingPotential(self.name().to_string())),
                },
            }
        })
    }

    pub fn scenario_probability(&self) -> Result<Probability> {
        crate::tree::memo(&self.data().scenario, || match self.node_type() {
            NodeType::Chance => self
                .children()
                .iter()
                .map(Element::scenario_probability)
                .sum(),
            NodeType::Decision => self
                .children()
                .first()
                .map(Element::scenario_probability)
                .unwrap_or(Ok(0.)),
            NodeType::Utility => Ok(0.),
        })
    }

    /// Findings accumulated from the root down to this node.
    pub fn branch_states(&self) -> EvidenceCase {
        self.parent()
            .map(|p| p.branch_states())
            .unwrap_or_default()
    }

    /// True if `branch` is a child of this decision whose utility is at least
    /// that of every sibling. Ties are all best.
    pub fn is_best_decision(&self, branch: &TreeBranch<'_>) -> Result<bool> {
        match self.node_type() {
            NodeType::Decision => {
                let utility = branch.utility()?;
                self.children()
                    .iter()
                    .try_fold(true, |best, c| -> Result<bool> {
                        Ok(best && utility >= c.utility()?)
                    })
            }
            _ => Ok(false),
        }
    }
    /// Every branch for which [`TreeNode::is_best_decision`] holds.
    pub fn best_decisions(&self) -> Result<Vec<TreeBranch<'tree>>> {
        let mut best = Vec::new();
        for branch in self.branches() {
            if self.is_best_decision(&branch)? {
                best.push(branch);
            }
        }
        Ok(best)
    }
}

impl std::fmt::Display for TreeNode<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.prob_node())
    }
}
