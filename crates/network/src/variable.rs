use pgm_core::Error;
use pgm_core::Result;
use std::cmp::Ordering;
use std::hash::Hash;
use std::hash::Hasher;

/// Half-open numeric interval `[min, max)` covered by a discretized state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Interval {
    pub min: f64,
    pub max: f64,
}

impl Interval {
    pub fn contains(&self, x: f64) -> bool {
        self.min <= x && x < self.max
    }
}

/// A named state of a discrete variable.
#[derive(Debug, Clone, PartialEq)]
pub struct State {
    name: String,
    interval: Option<Interval>,
}

impl State {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            interval: None,
        }
    }
    pub fn interval(name: &str, min: f64, max: f64) -> Self {
        Self {
            name: name.to_string(),
            interval: Some(Interval { min, max }),
        }
    }
    pub fn name(&self) -> &str {
        &self.name
    }
    pub fn bounds(&self) -> Option<&Interval> {
        self.interval.as_ref()
    }
}

impl std::fmt::Display for State {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum VariableType {
    #[default]
    FiniteStates,
    Discretized,
    Numeric,
}

/// A discrete random quantity with an ordered list of states.
///
/// Variables are identified by name within a network: equality, ordering and
/// hashing only look at the name. Two variables sharing a name but holding
/// different states (the result of restriction propagation) are the same
/// variable seen through different state sets.
#[derive(Debug, Clone)]
pub struct Variable {
    name: String,
    states: Vec<State>,
    kind: VariableType,
}

impl Variable {
    pub fn new(name: &str, states: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            states: states.iter().map(|s| State::new(s)).collect(),
            kind: VariableType::FiniteStates,
        }
    }
    /// A discretized numeric variable whose states cover consecutive intervals.
    pub fn discretized(name: &str, cuts: &[f64]) -> Self {
        Self {
            name: name.to_string(),
            states: cuts
                .windows(2)
                .map(|w| State::interval(&format!("[{}, {})", w[0], w[1]), w[0], w[1]))
                .collect(),
            kind: VariableType::Discretized,
        }
    }
    pub fn with_states(name: &str, states: Vec<State>, kind: VariableType) -> Self {
        Self {
            name: name.to_string(),
            states,
            kind,
        }
    }
    /// A variable with no states, used for utility nodes.
    pub fn utility(name: &str) -> Self {
        Self {
            name: name.to_string(),
            states: Vec::new(),
            kind: VariableType::Numeric,
        }
    }
    pub fn name(&self) -> &str {
        &self.name
    }
    pub fn states(&self) -> &[State] {
        &self.states
    }
    pub fn state(&self, index: usize) -> Option<&State> {
        self.states.get(index)
    }
    pub fn n(&self) -> usize {
        self.states.len()
    }
    pub fn kind(&self) -> VariableType {
        self.kind
    }
    pub fn index_of(&self, state: &str) -> Result<usize> {
        self.states
            .iter()
            .position(|s| s.name() == state)
            .ok_or_else(|| Error::InvalidState {
                variable: self.name.clone(),
                state: state.to_string(),
            })
    }
    /// Same name and type, keeping only `survivors` (in their original order).
    pub fn restrict(&self, survivors: &[State]) -> Self {
        Self {
            name: self.name.clone(),
            states: self
                .states
                .iter()
                .filter(|s| survivors.iter().any(|x| x.name() == s.name()))
                .cloned()
                .collect(),
            kind: self.kind,
        }
    }
}

impl PartialEq for Variable {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}
impl Eq for Variable {}

impl Ord for Variable {
    fn cmp(&self, other: &Self) -> Ordering {
        self.name.cmp(&other.name)
    }
}
impl PartialOrd for Variable {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Hash for Variable {
    fn hash<H>(&self, state: &mut H)
    where
        H: Hasher,
    {
        self.name.hash(state);
    }
}

impl std::fmt::Display for Variable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)
    }
}
