//! Unrolls influence diagrams and decision analysis networks into trees.
//!
//! Influence diagrams have a total order over decisions, so their tree is
//! grown iteratively from a todo stack following the network's partial
//! order. Decision analysis networks are expanded recursively: each call
//! picks the next variable by category and forks the network it works on.

use crate::*;
use petgraph::graph::NodeIndex;
use pgm_core::Error;
use pgm_core::Result;
use pgm_network::*;
use std::sync::Arc;
use std::time::Instant;

/// Pending work of the influence diagram build.
enum Todo {
    /// A node waiting for one branch per state of the variable at this
    /// position of the order.
    Node(NodeIndex, usize),
    /// A branch waiting for the node of the variable after this position.
    Branch(NodeIndex, Option<usize>),
}

/// Builds a [`DecisionTree`] from an influence diagram or a decision
/// analysis network.
///
/// ```ignore
/// let tree = DecisionTreeBuilder::new(&net).build()?;
/// let eu = tree.utility()?;
/// ```
///
/// Any structural problem (missing node, cyclic decisions, no utility node,
/// deadline) aborts the build and is returned to the caller.
pub struct DecisionTreeBuilder<'net> {
    pub(crate) net: &'net ProbNet,
    pub(crate) deadline: Option<Instant>,
}

impl<'net> DecisionTreeBuilder<'net> {
    pub fn new(net: &'net ProbNet) -> Self {
        Self {
            net,
            deadline: None,
        }
    }
    /// Abort with [`Error::DeadlineExceeded`] once `deadline` has passed.
    pub fn deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }
    pub fn build(self) -> Result<DecisionTree> {
        log::debug!("building decision tree for {} network", self.net.kind());
        let tree = match self.net.kind() {
            NetworkType::InfluenceDiagram => self.influence_diagram(),
            NetworkType::DecisionAnalysisNetwork => self.analysis_network(),
            kind => Err(Error::NotEvaluable(kind.to_string())),
        };
        match tree {
            Ok(tree) => {
                log::debug!("decision tree with {} elements", tree.n());
                Ok(tree)
            }
            Err(e) => {
                log::warn!("decision tree build failed: {}", e);
                Err(e)
            }
        }
    }

    fn influence_diagram(&self) -> Result<DecisionTree> {
        let mut net = self.net.clone();
        let sv = Self::super_value(&mut net)?;
        let order = net
            .partial_order()?
            .into_iter()
            .flatten()
            .collect::<Vec<Variable>>();
        let mut tree = DecisionTree::new(net.clone());
        let mut todo = vec![Todo::Branch(tree.root_index(), None)];
        let mut leaves = Vec::new();
        while let Some(next) = todo.pop() {
            pgm_core::check(self.deadline)?;
            match next {
                Todo::Node(index, position) => {
                    let ref variable = order[position];
                    for state in 0..variable.n() {
                        let label = Finding::new(variable.clone(), state)?;
                        let branch = tree.add_branch(index, label, Vec::new());
                        todo.push(Todo::Branch(branch, Some(position)));
                    }
                }
                Todo::Branch(index, position) => {
                    let position = position.map_or(0, |p| p + 1);
                    match order.get(position) {
                        Some(variable) => {
                            let node = net.node(variable.name())?.clone();
                            let child = tree.add_node(index, node);
                            todo.push(Todo::Node(child, position));
                        }
                        None => leaves.push(index),
                    }
                }
            }
        }
        for leaf in leaves {
            Self::utility_subtree(&mut tree, &net, leaf, &sv)?;
        }
        Ok(tree)
    }

    fn analysis_network(&self) -> Result<DecisionTree> {
        let mut tree = DecisionTree::new(self.net.clone());
        let root = tree.root_index();
        self.expand(&mut tree, root, self.net)?;
        Ok(tree)
    }

    /// Grows the subtree hanging from `parent` for what is left of the
    /// network, in priority order: always-observed chance variables, decisions
    /// without decision ancestors, parentless chance variables, and finally
    /// the utility subtree.
    fn expand(&self, tree: &mut DecisionTree, parent: NodeIndex, net: &ProbNet) -> Result<()> {
        pgm_core::check(self.deadline)?;
        if let Some(observed) = net.nodes().into_iter().find(|n| n.is_always_observed()) {
            return self.branch_on(tree, parent, net, observed);
        }
        let decisions = Self::parentless_decisions(net)?;
        match decisions.as_slice() {
            [] => {}
            [decision] => return self.branch_on(tree, parent, net, decision),
            decisions => return self.order_decisions(tree, parent, net, decisions),
        }
        let exogenous = net
            .nodes_of(NodeType::Chance)
            .into_iter()
            .find(|n| net.parents(n.name()).map(|p| p.is_empty()).unwrap_or(false));
        if let Some(chance) = exogenous {
            let mut without = net.clone();
            without.remove_node(chance.name())?;
            let node = tree.add_node(parent, chance.clone());
            for state in chance.variable().states() {
                let branch = tree.add_branch(node, self.label(chance.variable(), state)?, Vec::new());
                self.expand(tree, branch, &without)?;
            }
            return Ok(());
        }
        let mut leaf = net.clone();
        let sv = Self::super_value(&mut leaf)?;
        Self::utility_subtree(tree, &leaf, parent, &sv).map(|_| ())
    }

    /// Branches on every state of `node`, propagating restrictions and
    /// revelations of the chosen state into the rest of the network.
    fn branch_on(
        &self,
        tree: &mut DecisionTree,
        parent: NodeIndex,
        net: &ProbNet,
        node: &Arc<ProbNode>,
    ) -> Result<()> {
        let mut without = net.clone();
        without.remove_node(node.name())?;
        let index = tree.add_node(parent, node.clone());
        for state in node.variable().states() {
            let (restricted, forced) = self.restrict(net, without.clone(), node.name(), state)?;
            let branch = tree.add_branch(index, self.label(node.variable(), state)?, forced);
            self.expand(tree, branch, &restricted)?;
        }
        Ok(())
    }

    /// Several decisions are eligible at once: a metadecision picks which
    /// one is taken first.
    fn order_decisions(
        &self,
        tree: &mut DecisionTree,
        parent: NodeIndex,
        net: &ProbNet,
        decisions: &[Arc<ProbNode>],
    ) -> Result<()> {
        let names = decisions.iter().map(|d| d.name()).collect::<Vec<_>>();
        let od = Variable::new(pgm_core::ORDER_DECISION_NODE, &names);
        let meta = tree.add_node(parent, Arc::new(ProbNode::new(od.clone(), NodeType::Decision)));
        log::debug!("metadecision over {:?}", names);
        for (i, decision) in decisions.iter().enumerate() {
            let branch = tree.add_branch(meta, Finding::new(od.clone(), i)?, Vec::new());
            self.branch_on(tree, branch, net, decision)?;
        }
        Ok(())
    }

    /// Decisions with no decision among their ancestors.
    fn parentless_decisions(net: &ProbNet) -> Result<Vec<Arc<ProbNode>>> {
        let mut decisions = Vec::new();
        for decision in net.nodes_of(NodeType::Decision) {
            let ancestors = net.ancestors(&[decision.name()])?;
            if !ancestors
                .iter()
                .any(|a| a.node_type() == NodeType::Decision && a.name() != decision.name())
            {
                decisions.push(decision.clone());
            }
        }
        Ok(decisions)
    }

    /// Branch label in terms of the network the build started from.
    pub(crate) fn label(&self, variable: &Variable, state: &State) -> Result<Finding> {
        Finding::named(self.net.variable(variable.name())?.clone(), state.name())
    }
}
