use crate::*;
use pgm_core::Error;
use pgm_core::Result;
use std::collections::HashMap;

/// Anything that can tell which state a variable is in.
///
/// Implemented by [`EvidenceCase`] (findings accumulated along a tree path)
/// and by the sampler's `HashMap<String, usize>` configuration (state index
/// per variable name, rebuilt every trial).
pub trait Assignment {
    fn state(&self, variable: &Variable) -> Option<usize>;
}

impl Assignment for HashMap<String, usize> {
    fn state(&self, variable: &Variable) -> Option<usize> {
        self.get(variable.name()).copied()
    }
}

/// An observed (or branched-on) state of a variable.
#[derive(Debug, Clone, PartialEq)]
pub struct Finding {
    variable: Variable,
    state: usize,
}

impl Finding {
    pub fn new(variable: Variable, state: usize) -> Result<Self> {
        match state < variable.n() {
            true => Ok(Self { variable, state }),
            false => Err(Error::InvalidState {
                variable: variable.name().to_string(),
                state: state.to_string(),
            }),
        }
    }
    /// Finding by state name.
    pub fn named(variable: Variable, state: &str) -> Result<Self> {
        let state = variable.index_of(state)?;
        Ok(Self { variable, state })
    }
    pub fn variable(&self) -> &Variable {
        &self.variable
    }
    pub fn state_index(&self) -> usize {
        self.state
    }
    pub fn state(&self) -> &State {
        &self.variable.states()[self.state]
    }
}

impl std::fmt::Display for Finding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}={}", self.variable, self.state())
    }
}

/// Ordered collection of findings, at most one per variable.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EvidenceCase {
    findings: Vec<Finding>,
}

impl EvidenceCase {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn findings(&self) -> &[Finding] {
        &self.findings
    }
    pub fn variables(&self) -> Vec<Variable> {
        self.findings.iter().map(|f| f.variable().clone()).collect()
    }
    pub fn len(&self) -> usize {
        self.findings.len()
    }
    pub fn is_empty(&self) -> bool {
        self.findings.is_empty()
    }
    pub fn get(&self, name: &str) -> Option<&Finding> {
        self.findings.iter().find(|f| f.variable().name() == name)
    }
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }
    /// True if any of `variables` has a finding.
    pub fn exists_any(&self, variables: &[Variable]) -> bool {
        variables.iter().any(|v| self.contains(v.name()))
    }
    /// Adds a finding. Re-adding the same state is a no-op; a different
    /// state for an observed variable is incompatible evidence.
    pub fn add(&mut self, finding: Finding) -> Result<()> {
        match self.get(finding.variable().name()) {
            None => Ok(self.findings.push(finding)),
            Some(f) if f.state_index() == finding.state_index() => Ok(()),
            Some(f) => Err(Error::IncompatibleEvidence(format!(
                "{} conflicts with {}",
                finding, f
            ))),
        }
    }
    /// Adds a finding or replaces the one already set for its variable.
    pub fn change(&mut self, finding: Finding) {
        match self
            .findings
            .iter_mut()
            .find(|f| f.variable() == finding.variable())
        {
            Some(f) => *f = finding,
            None => self.findings.push(finding),
        }
    }
    /// Merges `other` into self. On conflict, `overwrite` decides who wins.
    pub fn fuse(&mut self, other: &EvidenceCase, overwrite: bool) {
        for finding in other.findings() {
            match self.contains(finding.variable().name()) {
                true if overwrite => self.change(finding.clone()),
                true => {}
                false => self.findings.push(finding.clone()),
            }
        }
    }
    /// State index per variable name.
    pub fn configuration(&self) -> HashMap<String, usize> {
        self.findings
            .iter()
            .map(|f| (f.variable().name().to_string(), f.state_index()))
            .collect()
    }
}

impl Assignment for EvidenceCase {
    fn state(&self, variable: &Variable) -> Option<usize> {
        self.get(variable.name()).map(Finding::state_index)
    }
}

impl FromIterator<Finding> for EvidenceCase {
    fn from_iter<I: IntoIterator<Item = Finding>>(iter: I) -> Self {
        let mut evidence = Self::new();
        iter.into_iter().for_each(|f| evidence.change(f));
        evidence
    }
}

impl std::fmt::Display for EvidenceCase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let findings = self
            .findings
            .iter()
            .map(|x| x.to_string())
            .collect::<Vec<_>>();
        write!(f, "{{{}}}", findings.join(", "))
    }
}
