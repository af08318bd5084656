use crate::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeType {
    Chance,
    Decision,
    Utility,
}

impl std::fmt::Display for NodeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Chance => write!(f, "CHANCE"),
            Self::Decision => write!(f, "DECISION"),
            Self::Utility => write!(f, "UTILITY"),
        }
    }
}

/// Payload of a network node: its variable, its type and its potentials.
#[derive(Debug, Clone, PartialEq)]
pub struct ProbNode {
    variable: Variable,
    kind: NodeType,
    potentials: Vec<Potential>,
    always_observed: bool,
}

impl ProbNode {
    pub fn new(variable: Variable, kind: NodeType) -> Self {
        Self {
            variable,
            kind,
            potentials: Vec::new(),
            always_observed: false,
        }
    }
    pub fn name(&self) -> &str {
        self.variable.name()
    }
    pub fn variable(&self) -> &Variable {
        &self.variable
    }
    pub fn node_type(&self) -> NodeType {
        self.kind
    }
    pub fn potentials(&self) -> &[Potential] {
        &self.potentials
    }
    pub fn potential(&self) -> Option<&Potential> {
        self.potentials.first()
    }
    pub fn is_always_observed(&self) -> bool {
        self.always_observed
    }
    pub(crate) fn set_variable(&mut self, variable: Variable) {
        self.variable = variable;
    }
    pub(crate) fn set_always_observed(&mut self, observed: bool) {
        self.always_observed = observed;
    }
    pub(crate) fn add_potential(&mut self, potential: Potential) {
        self.potentials.push(potential);
    }
}

impl std::fmt::Display for ProbNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.kind, self.variable)
    }
}
