use crate::*;
use petgraph::graph::NodeIndex;
use pgm_core::Probability;
use pgm_core::Result;
use pgm_core::Utility;
use pgm_network::EvidenceCase;

/// Either kind of tree element.
#[derive(Debug, Clone, Copy)]
pub enum Element<'tree> {
    Node(TreeNode<'tree>),
    Branch(TreeBranch<'tree>),
}

impl<'tree> Element<'tree> {
    pub fn index(&self) -> NodeIndex {
        match self {
            Self::Node(n) => n.index(),
            Self::Branch(b) => b.index(),
        }
    }
    pub fn utility(&self) -> Result<Utility> {
        match self {
            Self::Node(n) => n.utility(),
            Self::Branch(b) => b.utility(),
        }
    }
    pub fn scenario_probability(&self) -> Result<Probability> {
        match self {
            Self::Node(n) => n.scenario_probability(),
            Self::Branch(b) => b.scenario_probability(),
        }
    }
    pub fn branch_states(&self) -> EvidenceCase {
        match self {
            Self::Node(n) => n.branch_states(),
            Self::Branch(b) => b.branch_states(),
        }
    }
    pub fn children(&self) -> Vec<Element<'tree>> {
        match self {
            Self::Node(n) => n.children(),
            Self::Branch(b) => b.child().map(Element::Node).into_iter().collect(),
        }
    }
    pub fn node(&self) -> Option<TreeNode<'tree>> {
        match self {
            Self::Node(n) => Some(*n),
            Self::Branch(_) => None,
        }
    }
    pub fn branch(&self) -> Option<TreeBranch<'tree>> {
        match self {
            Self::Branch(b) => Some(*b),
            Self::Node(_) => None,
        }
    }
}

impl std::fmt::Display for Element<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Node(n) => write!(f, "{}", n),
            Self::Branch(b) => write!(f, "{}", b),
        }
    }
}
