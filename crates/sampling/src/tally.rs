use pgm_core::Error;
use pgm_core::Result;
use pgm_core::Utility;
use pgm_core::Weight;
use pgm_network::*;
use std::collections::HashMap;

/// Accumulates weighted trials of one batch.
///
/// Batches start from an empty tally and are merged in batch order, so the
/// floating point sums do not depend on how batches were scheduled.
pub(crate) trait Tally: Send + Sized {
    fn record(
        &mut self,
        states: &HashMap<String, usize>,
        utilities: &HashMap<String, Utility>,
        weight: Weight,
    ) -> Result<()>;
    fn merge(&mut self, other: Self);
}

/// A tally plus the totals every query reports.
#[derive(Debug)]
pub(crate) struct Batch<T> {
    tally: T,
    weight: Weight,
    positive: usize,
}

impl<T> From<T> for Batch<T> {
    fn from(tally: T) -> Self {
        Self {
            tally,
            weight: 0.,
            positive: 0,
        }
    }
}

impl<T: Tally> Batch<T> {
    pub(crate) fn record(
        &mut self,
        states: &HashMap<String, usize>,
        utilities: &HashMap<String, Utility>,
        weight: Weight,
    ) -> Result<()> {
        self.tally.record(states, utilities, weight)?;
        self.weight += weight;
        if weight > 0. {
            self.positive += 1;
        }
        Ok(())
    }
    pub(crate) fn merge(&mut self, other: Self) {
        self.tally.merge(other.tally);
        self.weight += other.weight;
        self.positive += other.positive;
    }
    pub(crate) fn weight(&self) -> Weight {
        self.weight
    }
    pub(crate) fn positive(&self) -> usize {
        self.positive
    }
    pub(crate) fn tally(&self) -> &T {
        &self.tally
    }
    pub(crate) fn into_tally(self) -> T {
        self.tally
    }
}

/// An all-zero table means no trial was compatible with the evidence.
fn normalize(table: &mut TablePotential) -> Result<()> {
    table.set_role(PotentialRole::JointProbability);
    table.normalize().map_err(|e| match e {
        Error::NormalizeNullVector(over) => Error::IncompatibleEvidence(over),
        e => e,
    })
}

fn add(into: &mut TablePotential, from: &TablePotential) {
    into.values_mut()
        .iter_mut()
        .zip(from.values())
        .for_each(|(x, y)| *x += y);
}

#[derive(Debug, Clone, PartialEq)]
enum Bucket {
    /// Weight per state.
    States(Vec<Weight>),
    /// Sum of utility times weight.
    Utility(Utility),
}

/// One bucket per variable of interest.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Marginals {
    buckets: Vec<(Variable, Bucket)>,
}

impl Marginals {
    /// Utility nodes get a single weighted sum, everything else a weight
    /// per state.
    pub(crate) fn new(net: &ProbNet, interest: &[Variable]) -> Result<Self> {
        let mut buckets = Vec::new();
        for variable in interest {
            let bucket = match net.node(variable.name())?.node_type() {
                NodeType::Utility => Bucket::Utility(0.),
                _ => Bucket::States(vec![0.; variable.n()]),
            };
            buckets.push((variable.clone(), bucket));
        }
        Ok(Self { buckets })
    }

    /// Normalized marginals, and expected utilities over `total` weight.
    pub(crate) fn finish(self, total: Weight) -> Result<HashMap<Variable, TablePotential>> {
        let mut estimates = HashMap::new();
        for (variable, bucket) in self.buckets {
            let table = match bucket {
                Bucket::States(weights) => {
                    let mut table = TablePotential::with_values(
                        vec![variable.clone()],
                        PotentialRole::JointProbability,
                        weights,
                    )?;
                    normalize(&mut table)?;
                    table
                }
                Bucket::Utility(_) if total <= 0. => {
                    return Err(Error::IncompatibleEvidence(format!(
                        "no weight left to estimate {}",
                        variable
                    )));
                }
                Bucket::Utility(sum) => {
                    TablePotential::utility(vec![], variable.clone(), vec![sum / total])?
                }
            };
            estimates.insert(variable, table);
        }
        Ok(estimates)
    }
}

impl Tally for Marginals {
    fn record(
        &mut self,
        states: &HashMap<String, usize>,
        utilities: &HashMap<String, Utility>,
        weight: Weight,
    ) -> Result<()> {
        for (variable, bucket) in self.buckets.iter_mut() {
            let name = variable.name();
            let missing = || Error::MissingFinding(name.to_string());
            match bucket {
                Bucket::States(weights) => {
                    let state = states.get(name).ok_or_else(missing)?;
                    let slot = weights.get_mut(*state).ok_or_else(|| Error::InvalidState {
                        variable: name.to_string(),
                        state: state.to_string(),
                    })?;
                    *slot += weight;
                }
                Bucket::Utility(sum) => *sum += utilities.get(name).ok_or_else(missing)? * weight,
            }
        }
        Ok(())
    }
    fn merge(&mut self, other: Self) {
        for ((_, mine), (_, theirs)) in self.buckets.iter_mut().zip(other.buckets) {
            match (mine, theirs) {
                (Bucket::States(x), Bucket::States(y)) => {
                    x.iter_mut().zip(y).for_each(|(x, y)| *x += y);
                }
                (Bucket::Utility(x), Bucket::Utility(y)) => *x += y,
                _ => {}
            }
        }
    }
}

/// Weight per joint configuration of a set of variables.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Joint {
    table: TablePotential,
}

impl Joint {
    pub(crate) fn new(variables: Vec<Variable>) -> Self {
        Self {
            table: TablePotential::zeros(variables, PotentialRole::JointProbability),
        }
    }
    pub(crate) fn finish(mut self) -> Result<TablePotential> {
        normalize(&mut self.table)?;
        Ok(self.table)
    }
}

impl Tally for Joint {
    fn record(
        &mut self,
        states: &HashMap<String, usize>,
        _: &HashMap<String, Utility>,
        weight: Weight,
    ) -> Result<()> {
        let index = self.table.index(states)?;
        self.table.values_mut()[index] += weight;
        Ok(())
    }
    fn merge(&mut self, other: Self) {
        add(&mut self.table, &other.table);
    }
}

/// Weight per configuration of each sampled family (a variable together
/// with its parents), keyed by the family's child variable.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Families {
    tables: Vec<(Variable, TablePotential)>,
}

impl Families {
    pub(crate) fn new(sampled: &[Potential]) -> Self {
        Self {
            tables: sampled
                .iter()
                .filter(|p| !p.is_utility())
                .filter_map(|p| {
                    let head = p.head()?.clone();
                    let table = TablePotential::zeros(
                        p.variables().to_vec(),
                        PotentialRole::JointProbability,
                    );
                    Some((head, table))
                })
                .collect(),
        }
    }

    /// Normalized families. Observed families are not sampled: their joint
    /// is their potential times the indicators of the observed states.
    pub(crate) fn finish(
        self,
        observed: &[Potential],
        evidence: &HashMap<String, usize>,
    ) -> Result<HashMap<Variable, TablePotential>> {
        let mut families = self.tables.into_iter().collect::<HashMap<_, _>>();
        for potential in observed {
            let (Some(table), Some(head)) = (potential.table(), potential.head()) else {
                continue;
            };
            let mut indicators = Vec::new();
            for variable in table.variables() {
                if let Some(state) = evidence.get(variable.name()) {
                    indicators.push(TablePotential::indicator(&Finding::new(
                        variable.clone(),
                        *state,
                    )?));
                }
            }
            let factors = std::iter::once(table)
                .chain(indicators.iter())
                .collect::<Vec<_>>();
            families.insert(head.clone(), TablePotential::multiply(&factors)?);
        }
        for table in families.values_mut() {
            normalize(table)?;
        }
        Ok(families)
    }
}

impl Tally for Families {
    fn record(
        &mut self,
        states: &HashMap<String, usize>,
        _: &HashMap<String, Utility>,
        weight: Weight,
    ) -> Result<()> {
        for (_, table) in self.tables.iter_mut() {
            let index = table.index(states)?;
            table.values_mut()[index] += weight;
        }
        Ok(())
    }
    fn merge(&mut self, other: Self) {
        for ((_, mine), (_, theirs)) in self.tables.iter_mut().zip(other.tables.iter()) {
            add(mine, theirs);
        }
    }
}
