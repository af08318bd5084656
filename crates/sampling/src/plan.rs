use crate::tally::Batch;
use crate::tally::Tally;
use pgm_core::Error;
use pgm_core::Result;
use pgm_core::UNOBSERVED_UTILITY_PENALTY;
use pgm_core::Utility;
use pgm_core::Weight;
use pgm_network::*;
use rand::SeedableRng;
use rand::rngs::SmallRng;
use std::collections::HashMap;
use std::time::Instant;

/// Everything a query needs to draw weighted trials, prepared once and
/// shared read-only by every batch.
///
/// - `evidence` — clamped state per observed variable
/// - `sampled` — potentials of the unobserved variables, ancestrally ordered
/// - `weighting` — potentials of the observed variables
/// - `restrictions` — link restriction tables, all of which weigh every trial
#[derive(Debug)]
pub(crate) struct Plan {
    evidence: HashMap<String, usize>,
    sampled: Vec<Potential>,
    weighting: Vec<Potential>,
    restrictions: Vec<TablePotential>,
}

impl Plan {
    /// `penalize` divides unobserved utility tables by the network's
    /// penalty property, when it has one.
    pub(crate) fn new(
        net: &ProbNet,
        evidence: &EvidenceCase,
        interest: &[Variable],
        penalize: bool,
    ) -> Result<Self> {
        let variables = Self::variables(net, evidence, interest)?;
        let mut sampled = Vec::new();
        for variable in variables.iter() {
            sampled.extend(net.node(variable.name())?.potentials().iter().cloned());
        }
        if penalize {
            if let Some(penalty) = Self::penalty(net)? {
                sampled
                    .iter_mut()
                    .filter(|p| p.is_utility() && !evidence.exists_any(p.variables()))
                    .filter_map(|p| match p {
                        Potential::Table(table) => Some(table),
                        _ => None,
                    })
                    .for_each(|table| table.values_mut().iter_mut().for_each(|x| *x /= penalty));
            }
        }
        let mut weighting = Vec::new();
        for finding in evidence.findings() {
            weighting.extend(
                net.node(finding.variable().name())?
                    .potentials()
                    .iter()
                    .filter(|p| !p.is_utility())
                    .cloned(),
            );
        }
        let restrictions = net
            .links()
            .into_iter()
            .filter_map(Link::restriction)
            .cloned()
            .collect::<Vec<_>>();
        log::debug!(
            "sampling {} variables, weighting by {} evidence potentials and {} restrictions",
            variables.len(),
            weighting.len(),
            restrictions.len()
        );
        Ok(Self {
            evidence: evidence.configuration(),
            sampled,
            weighting,
            restrictions,
        })
    }

    /// Unobserved variables upstream of the query, the evidence and the
    /// restricted links, in topological order.
    fn variables(
        net: &ProbNet,
        evidence: &EvidenceCase,
        interest: &[Variable],
    ) -> Result<Vec<Variable>> {
        let names = interest
            .iter()
            .map(|v| v.name().to_string())
            .chain(evidence.findings().iter().map(|f| f.variable().name().to_string()))
            .chain(
                net.links()
                    .into_iter()
                    .filter_map(Link::restriction)
                    .flat_map(|r| r.variables().iter().map(|v| v.name().to_string())),
            )
            .collect::<Vec<_>>();
        let names = names.iter().map(String::as_str).collect::<Vec<_>>();
        let unobserved = net
            .ancestors(&names)?
            .into_iter()
            .filter(|n| !evidence.contains(n.name()))
            .map(|n| n.variable().clone())
            .collect::<Vec<_>>();
        net.sort_topologically(&unobserved)
    }

    fn penalty(net: &ProbNet) -> Result<Option<f64>> {
        match net.property(UNOBSERVED_UTILITY_PENALTY) {
            None => Ok(None),
            Some(value) => value
                .trim()
                .parse::<i32>()
                .map(|penalty| Some(penalty as f64))
                .map_err(|e| {
                    Error::WrongGraphStructure(format!(
                        "{} property {}: {}",
                        UNOBSERVED_UTILITY_PENALTY, value, e
                    ))
                }),
        }
    }

    /// Potentials of the unobserved variables, in sampling order.
    pub(crate) fn sampled(&self) -> &[Potential] {
        &self.sampled
    }
    /// Potentials of the observed variables.
    pub(crate) fn weighting(&self) -> &[Potential] {
        &self.weighting
    }
    pub(crate) fn evidence(&self) -> &HashMap<String, usize> {
        &self.evidence
    }

    /// Draws one trial into `states` and `utilities` and returns its weight.
    ///
    /// An evidence potential over a single variable weighs the trial only
    /// when it is zero.
    fn trial(
        &self,
        rng: &mut SmallRng,
        states: &mut HashMap<String, usize>,
        utilities: &mut HashMap<String, Utility>,
    ) -> Result<Weight> {
        for potential in self.sampled.iter() {
            match potential.is_utility() {
                true => {
                    let utility = potential.utility(&*states, &*utilities)?;
                    if let Some(variable) = potential.utility_variable() {
                        utilities.insert(variable.name().to_string(), utility);
                    }
                }
                false => {
                    let state = potential.sample(rng, &*states)?;
                    if let Some(variable) = potential.head() {
                        states.insert(variable.name().to_string(), state);
                    }
                }
            }
        }
        let mut weight = 1.;
        for potential in self.weighting.iter() {
            let p = potential.probability(&*states)?;
            if potential.variables().len() > 1 || p == 0. {
                weight *= p;
            }
        }
        for restriction in self.restrictions.iter() {
            weight *= restriction.probability(&*states)?;
        }
        Ok(weight)
    }

    /// Runs `trials` trials of batch `b`, seeded with `seed + b`.
    pub(crate) fn batch<T>(
        &self,
        seed: u64,
        b: usize,
        trials: usize,
        tally: T,
        deadline: Option<Instant>,
    ) -> Result<Batch<T>>
    where
        T: Tally,
    {
        pgm_core::check(deadline)?;
        let ref mut rng = SmallRng::seed_from_u64(seed.wrapping_add(b as u64));
        let mut states = self.evidence.clone();
        let mut utilities = HashMap::new();
        let mut batch = Batch::from(tally);
        for _ in 0..trials {
            let weight = self.trial(rng, &mut states, &mut utilities)?;
            batch.record(&states, &utilities, weight)?;
        }
        log::trace!("batch {} done with weight {:.3}", b, batch.weight());
        Ok(batch)
    }
}
