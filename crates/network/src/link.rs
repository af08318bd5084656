use crate::*;

/// Directed arc between two network nodes.
///
/// A link may restrict which destination states are compatible with each
/// source state, and may reveal its destination when the source takes one of
/// the `revealing` states.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Link {
    restriction: Option<TablePotential>,
    revealing: Vec<String>,
}

impl Link {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn restriction(&self) -> Option<&TablePotential> {
        self.restriction.as_ref()
    }
    pub fn set_restriction(&mut self, restriction: TablePotential) {
        self.restriction = Some(restriction);
    }
    pub fn reveals(&self, state: &State) -> bool {
        self.revealing.iter().any(|s| s == state.name())
    }
    pub fn set_revealing(&mut self, states: &[&str]) {
        self.revealing = states.iter().map(|s| s.to_string()).collect();
    }
}
