use crate::*;
use petgraph::Direction;
use petgraph::stable_graph::NodeIndex;
use petgraph::stable_graph::StableDiGraph;
use pgm_core::Error;
use pgm_core::Result;
use std::collections::HashMap;
use std::sync::Arc;

/// A probabilistic network: typed nodes joined by directed links.
///
/// Node payloads sit behind `Arc` and are copied on write, so `clone()` is the
/// cheap deep copy the tree builder relies on when it forks the network at
/// every decision or observation. Nodes and links are reported in insertion
/// order.
///
/// # Queries
///
/// - `node(name)` — Lookup by variable name, failing with `NodeNotFound`
/// - `nodes()` / `nodes_of(kind)` — Nodes in insertion order
/// - `parents(name)` / `children(name)` / `outgoing(name)` — Graph neighborhood
/// - `partial_order()` / `sort_topologically(vars)` — See the `order` module
#[derive(Debug, Clone)]
pub struct ProbNet {
    kind: NetworkType,
    graph: StableDiGraph<Arc<ProbNode>, Link>,
    index: HashMap<String, NodeIndex>,
    order: Vec<NodeIndex>,
    properties: HashMap<String, String>,
}

impl ProbNet {
    pub fn new(kind: NetworkType) -> Self {
        Self {
            kind,
            graph: StableDiGraph::default(),
            index: HashMap::new(),
            order: Vec::new(),
            properties: HashMap::new(),
        }
    }
    pub fn kind(&self) -> NetworkType {
        self.kind
    }
    /// Number of nodes.
    pub fn n(&self) -> usize {
        self.order.len()
    }
    pub(crate) fn graph(&self) -> &StableDiGraph<Arc<ProbNode>, Link> {
        &self.graph
    }
    pub(crate) fn at(&self, name: &str) -> Result<NodeIndex> {
        self.index
            .get(name)
            .copied()
            .ok_or_else(|| Error::NodeNotFound(name.to_string()))
    }
    fn payload(&mut self, name: &str) -> Result<&mut ProbNode> {
        let index = self.at(name)?;
        Ok(Arc::make_mut(&mut self.graph[index]))
    }

    // ------------------------------------------------------------------
    // construction
    // ------------------------------------------------------------------

    pub fn add_node(&mut self, variable: Variable, kind: NodeType) -> Result<()> {
        if self.index.contains_key(variable.name()) {
            return Err(Error::WrongGraphStructure(format!(
                "duplicate node {}",
                variable
            )));
        }
        let name = variable.name().to_string();
        let index = self.graph.add_node(Arc::new(ProbNode::new(variable, kind)));
        self.index.insert(name, index);
        self.order.push(index);
        Ok(())
    }
    pub fn add_potential<P>(&mut self, name: &str, potential: P) -> Result<()>
    where
        P: Into<Potential>,
    {
        self.payload(name)?.add_potential(potential.into());
        Ok(())
    }
    pub fn add_link(&mut self, from: &str, into: &str) -> Result<()> {
        let (a, b) = (self.at(from)?, self.at(into)?);
        if self.graph.find_edge(a, b).is_none() {
            self.graph.add_edge(a, b, Link::new());
        }
        Ok(())
    }
    fn link_mut(&mut self, from: &str, into: &str) -> Result<&mut Link> {
        let (a, b) = (self.at(from)?, self.at(into)?);
        let edge = self
            .graph
            .find_edge(a, b)
            .ok_or_else(|| Error::WrongGraphStructure(format!("no link {} -> {}", from, into)))?;
        Ok(&mut self.graph[edge])
    }
    pub fn set_restriction(&mut self, from: &str, into: &str, restriction: TablePotential) -> Result<()> {
        self.link_mut(from, into)?.set_restriction(restriction);
        Ok(())
    }
    pub fn set_revealing(&mut self, from: &str, into: &str, states: &[&str]) -> Result<()> {
        self.link_mut(from, into)?.set_revealing(states);
        Ok(())
    }
    pub fn set_always_observed(&mut self, name: &str, observed: bool) -> Result<()> {
        self.payload(name)?.set_always_observed(observed);
        Ok(())
    }
    /// Swaps the node's variable, keeping its potentials and links.
    pub fn set_variable(&mut self, variable: Variable) -> Result<()> {
        self.payload(variable.name())?.set_variable(variable);
        Ok(())
    }
    /// Removes a node together with every link touching it.
    pub fn remove_node(&mut self, name: &str) -> Result<()> {
        let index = self.at(name)?;
        self.graph.remove_node(index);
        self.index.remove(name);
        self.order.retain(|i| *i != index);
        Ok(())
    }
    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }
    pub fn set_property(&mut self, key: &str, value: &str) {
        self.properties.insert(key.to_string(), value.to_string());
    }

    // ------------------------------------------------------------------
    // queries
    // ------------------------------------------------------------------

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }
    pub fn node(&self, name: &str) -> Result<&Arc<ProbNode>> {
        Ok(&self.graph[self.at(name)?])
    }
    pub fn variable(&self, name: &str) -> Result<&Variable> {
        Ok(self.node(name)?.variable())
    }
    pub fn nodes(&self) -> Vec<&Arc<ProbNode>> {
        self.order.iter().map(|i| &self.graph[*i]).collect()
    }
    pub fn nodes_of(&self, kind: NodeType) -> Vec<&Arc<ProbNode>> {
        self.nodes()
            .into_iter()
            .filter(|n| n.node_type() == kind)
            .collect()
    }
    pub fn variables(&self) -> Vec<Variable> {
        self.nodes().into_iter().map(|n| n.variable().clone()).collect()
    }
    pub fn variables_of(&self, kind: NodeType) -> Vec<Variable> {
        self.nodes_of(kind)
            .into_iter()
            .map(|n| n.variable().clone())
            .collect()
    }
    fn neighbors(&self, name: &str, direction: Direction) -> Result<Vec<&Arc<ProbNode>>> {
        let mut neighbors = self
            .graph
            .neighbors_directed(self.at(name)?, direction)
            .map(|i| &self.graph[i])
            .collect::<Vec<_>>();
        neighbors.reverse();
        Ok(neighbors)
    }
    pub fn parents(&self, name: &str) -> Result<Vec<&Arc<ProbNode>>> {
        self.neighbors(name, Direction::Incoming)
    }
    pub fn children(&self, name: &str) -> Result<Vec<&Arc<ProbNode>>> {
        self.neighbors(name, Direction::Outgoing)
    }
    /// Links leaving `name`, with their destination nodes.
    pub fn outgoing(&self, name: &str) -> Result<Vec<(&Arc<ProbNode>, &Link)>> {
        use petgraph::visit::EdgeRef;
        let mut links = self
            .graph
            .edges_directed(self.at(name)?, Direction::Outgoing)
            .map(|e| (&self.graph[e.target()], e.weight()))
            .collect::<Vec<_>>();
        links.reverse();
        Ok(links)
    }
    pub fn links(&self) -> Vec<&Link> {
        self.graph.edge_weights().collect()
    }
    /// Every node reachable upstream of `names`, the nodes themselves included.
    pub fn ancestors(&self, names: &[&str]) -> Result<Vec<&Arc<ProbNode>>> {
        let mut stack = names.iter().map(|n| self.at(n)).collect::<Result<Vec<_>>>()?;
        let mut seen = std::collections::HashSet::new();
        while let Some(index) = stack.pop() {
            if seen.insert(index) {
                stack.extend(self.graph.neighbors_directed(index, Direction::Incoming));
            }
        }
        Ok(self
            .order
            .iter()
            .filter(|i| seen.contains(*i))
            .map(|i| &self.graph[*i])
            .collect())
    }
}
