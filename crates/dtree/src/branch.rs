use crate::*;
use petgraph::graph::NodeIndex;
use pgm_core::Error;
use pgm_core::Probability;
use pgm_core::Result;
use pgm_core::Utility;
use pgm_network::*;

/// Handle to a branch: one state of its parent node's variable, leading to
/// at most one child node.
#[derive(Debug, Clone, Copy)]
pub struct TreeBranch<'tree> {
    index: NodeIndex,
    tree: &'tree DecisionTree,
}

impl<'tree> TreeBranch<'tree> {
    pub(crate) fn from(index: NodeIndex, tree: &'tree DecisionTree) -> Self {
        Self { index, tree }
    }
    fn data(&self) -> &'tree crate::tree::BranchData {
        match self.tree.vertex(self.index) {
            crate::tree::Vertex::Branch(data) => data,
            crate::tree::Vertex::Node(_) => unreachable!("branch handle on a node"),
        }
    }
    pub fn index(&self) -> NodeIndex {
        self.index
    }
    /// The finding this branch stands for. None at the root.
    pub fn label(&self) -> Option<&'tree Finding> {
        self.data().label.as_ref()
    }
    pub fn variable(&self) -> Option<&'tree Variable> {
        self.label().map(Finding::variable)
    }
    pub fn state(&self) -> Option<&'tree State> {
        self.label().map(Finding::state)
    }
    /// Findings implied by this branch through single-state restrictions.
    pub fn forced(&self) -> &'tree [Finding] {
        &self.data().forced
    }
    pub fn parent(&self) -> Option<TreeNode<'tree>> {
        self.tree
            .parent_of(self.index)
            .map(|i| TreeNode::from(i, self.tree))
    }
    pub fn child(&self) -> Option<TreeNode<'tree>> {
        self.tree
            .children_of(self.index)
            .first()
            .map(|i| TreeNode::from(*i, self.tree))
    }

    /// Child utility, weighted by the branch probability under chance nodes.
    pub fn utility(&self) -> Result<Utility> {
        crate::tree::memo(&self.data().utility, || {
            let utility = match self.child() {
                Some(child) => child.utility()?,
                None => 0.,
            };
            match self.parent().map(|p| p.node_type()) {
                Some(NodeType::Chance) => Ok(utility * self.branch_probability()?),
                _ => Ok(utility),
            }
        })
    }

    /// Scenario probability relative to the parent node's. Zero when the
    /// parent's scenario is impossible; one at the root.
    pub fn branch_probability(&self) -> Result<Probability> {
        match self.parent() {
            None => Ok(1.),
            Some(parent) => {
                let p = parent.scenario_probability()?;
                match p == 0. {
                    true => Ok(0.),
                    false => Ok(self.scenario_probability()? / p),
                }
            }
        }
    }

    /// Joint probability of the path. Resolved at the branch leading into the
    /// utility subtree and passed up unchanged everywhere else.
    pub fn scenario_probability(&self) -> Result<Probability> {
        crate::tree::memo(&self.data().scenario, || match self.child() {
            Some(child) if child.node_type() != NodeType::Utility => child.scenario_probability(),
            _ => self.path_probability(),
        })
    }
    fn path_probability(&self) -> Result<Probability> {
        let ref evidence = self.branch_states();
        let net = self.tree.net();
        evidence
            .findings()
            .iter()
            .filter_map(|f| net.node(f.variable().name()).ok())
            .filter(|node| node.node_type() == NodeType::Chance)
            .try_fold(1., |p, node| -> Result<Probability> {
                let potential = node
                    .potential()
                    .ok_or_else(|| Error::MissingPotential(node.name().to_string()))?;
                self.tree.lookup();
                Ok(p * potential.probability(evidence)?)
            })
    }

    /// Parent findings plus this branch's own and the ones it forces.
    pub fn branch_states(&self) -> EvidenceCase {
        let mut evidence = self
            .parent()
            .map(|p| p.branch_states())
            .unwrap_or_default();
        self.label()
            .into_iter()
            .chain(self.forced())
            .cloned()
            .for_each(|f| evidence.change(f));
        evidence
    }
}

impl std::fmt::Display for TreeBranch<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.label() {
            Some(label) => write!(f, "{}", label)?,
            None => write!(f, "ROOT")?,
        }
        if !self.forced().is_empty() {
            let forced = self
                .forced()
                .iter()
                .map(|x| x.to_string())
                .collect::<Vec<_>>();
            write!(f, " [{}]", forced.join(", "))?;
        }
        Ok(())
    }
}
