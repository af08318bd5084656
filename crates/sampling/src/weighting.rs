use crate::plan::Plan;
use crate::tally::*;
use pgm_core::Config;
use pgm_core::Error;
use pgm_core::Result;
use pgm_core::SAMPLE_BATCH_SIZE;
use pgm_core::TUNING_DECISION_STATE;
use pgm_core::Weight;
use pgm_network::*;
use std::collections::HashMap;
use std::time::Instant;

/// Likelihood weighting over a Bayesian or tuning network.
///
/// Evidence comes in two layers: pre-resolution evidence (known before any
/// decision is made) and post-resolution evidence. Queries fuse them, with
/// post-resolution findings taking precedence. In tuning networks every
/// decision without a finding is fixed to its second state.
///
/// # Queries
///
/// - `probs_and_utilities(vars)` — Posterior marginals, and expected
///   utilities for utility variables
/// - `joint_probability(vars)` — Posterior joint over the given variables
/// - `family_joint_probabilities()` — Posterior joint of every family
///
/// Each query resets [`LikelihoodWeighting::accumulated_weight`] and
/// [`LikelihoodWeighting::positive_sample_ratio`].
#[derive(Debug, Clone)]
pub struct LikelihoodWeighting<'net> {
    net: &'net ProbNet,
    pre: EvidenceCase,
    post: EvidenceCase,
    sample_size: usize,
    seed: u64,
    deadline: Option<Instant>,
    accumulated: Weight,
    positive: usize,
}

impl<'net> LikelihoodWeighting<'net> {
    pub fn new(net: &'net ProbNet) -> Result<Self> {
        Self::from_config(net, &Config::default())
    }
    /// Sample size, seed and deadline taken from `config`.
    pub fn from_config(net: &'net ProbNet, config: &Config) -> Result<Self> {
        match net.kind() {
            NetworkType::BayesianNetwork | NetworkType::TuningNetwork => Ok(Self {
                net,
                pre: EvidenceCase::new(),
                post: EvidenceCase::new(),
                sample_size: config.sample_size,
                seed: config.sample_seed,
                deadline: config.deadline(),
                accumulated: 0.,
                positive: 0,
            }),
            kind => Err(Error::NotEvaluable(kind.to_string())),
        }
    }

    pub fn pre_resolution_evidence(&self) -> &EvidenceCase {
        &self.pre
    }
    pub fn set_pre_resolution_evidence(&mut self, evidence: EvidenceCase) {
        self.pre = evidence;
    }
    pub fn post_resolution_evidence(&self) -> &EvidenceCase {
        &self.post
    }
    pub fn set_post_resolution_evidence(&mut self, evidence: EvidenceCase) {
        self.post = evidence;
    }
    pub fn sample_size(&self) -> usize {
        self.sample_size
    }
    pub fn set_sample_size(&mut self, sample_size: usize) {
        self.sample_size = sample_size;
    }
    pub fn set_seed(&mut self, seed: u64) {
        self.seed = seed;
    }
    pub fn set_deadline(&mut self, deadline: Instant) {
        self.deadline = Some(deadline);
    }
    /// Sum of the trial weights of the last query.
    pub fn accumulated_weight(&self) -> Weight {
        self.accumulated
    }
    /// Fraction of the last query's trials with positive weight.
    pub fn positive_sample_ratio(&self) -> f64 {
        match self.sample_size {
            0 => 0.,
            n => self.positive as f64 / n as f64,
        }
    }

    /// Posterior of each variable of `interest`. Utility variables map to a
    /// single-valued table holding their expected utility.
    pub fn probs_and_utilities(
        &mut self,
        interest: &[Variable],
    ) -> Result<HashMap<Variable, TablePotential>> {
        let ref evidence = self.evidence()?;
        let ref plan = Plan::new(self.net, evidence, interest, true)?;
        let ref empty = Marginals::new(self.net, interest)?;
        let marginals = self.run(plan, || empty.clone())?;
        marginals.finish(self.accumulated)
    }
    /// [`LikelihoodWeighting::probs_and_utilities`] of every variable.
    pub fn all_probs_and_utilities(&mut self) -> Result<HashMap<Variable, TablePotential>> {
        let ref variables = self.net.variables();
        self.probs_and_utilities(variables)
    }

    /// Posterior joint distribution of `variables`, the first one varying
    /// fastest.
    pub fn joint_probability(&mut self, variables: &[Variable]) -> Result<TablePotential> {
        let ref evidence = self.evidence()?;
        let ref chance = self.net.variables_of(NodeType::Chance);
        let ref plan = Plan::new(self.net, evidence, chance, false)?;
        self.run(plan, || Joint::new(variables.to_vec()))?.finish()
    }

    /// Posterior joint of every chance variable with its parents, keyed by
    /// the variable.
    pub fn family_joint_probabilities(&mut self) -> Result<HashMap<Variable, TablePotential>> {
        let ref evidence = self.evidence()?;
        let ref chance = self.net.variables_of(NodeType::Chance);
        let ref plan = Plan::new(self.net, evidence, chance, false)?;
        let ref empty = Families::new(plan.sampled());
        self.run(plan, || empty.clone())?
            .finish(plan.weighting(), plan.evidence())
    }

    /// Pre-resolution evidence overwritten by post-resolution evidence, plus
    /// the default decisions of tuning networks.
    fn evidence(&self) -> Result<EvidenceCase> {
        let mut evidence = self.pre.clone();
        evidence.fuse(&self.post, true);
        if self.net.kind() == NetworkType::TuningNetwork {
            for decision in self.net.variables_of(NodeType::Decision) {
                if evidence.contains(decision.name()) {
                    continue;
                }
                match Finding::new(decision, TUNING_DECISION_STATE) {
                    Ok(finding) => evidence.add(finding)?,
                    Err(e) => log::warn!("no default decision: {}", e),
                }
            }
        }
        log::debug!("sampling under evidence {}", evidence);
        Ok(evidence)
    }

    fn batches(&self) -> usize {
        self.sample_size.div_ceil(SAMPLE_BATCH_SIZE)
    }
    fn trials(&self, b: usize) -> usize {
        SAMPLE_BATCH_SIZE.min(self.sample_size - b * SAMPLE_BATCH_SIZE)
    }

    /// Draws every batch and records the totals of the query.
    fn run<T, F>(&mut self, plan: &Plan, fresh: F) -> Result<T>
    where
        T: Tally,
        F: Fn() -> T + Sync,
    {
        self.accumulated = 0.;
        self.positive = 0;
        let mut total = crate::tally::Batch::from(fresh());
        for batch in self.batch(plan, &fresh)? {
            total.merge(batch);
        }
        self.accumulated = total.weight();
        self.positive = total.positive();
        log::debug!(
            "{} trials, accumulated weight {:.3}, {} positive",
            self.sample_size,
            self.accumulated,
            self.positive
        );
        Ok(total.into_tally())
    }

    #[cfg(feature = "parallel")]
    fn batch<T, F>(&self, plan: &Plan, fresh: &F) -> Result<Vec<crate::tally::Batch<T>>>
    where
        T: Tally,
        F: Fn() -> T + Sync,
    {
        use rayon::iter::IntoParallelIterator;
        use rayon::iter::ParallelIterator;
        (0..self.batches())
            .into_par_iter()
            .map(|b| plan.batch(self.seed, b, self.trials(b), fresh(), self.deadline))
            .collect()
    }
    #[cfg(not(feature = "parallel"))]
    fn batch<T, F>(&self, plan: &Plan, fresh: &F) -> Result<Vec<crate::tally::Batch<T>>>
    where
        T: Tally,
        F: Fn() -> T + Sync,
    {
        (0..self.batches())
            .map(|b| plan.batch(self.seed, b, self.trials(b), fresh(), self.deadline))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pgm_core::UNOBSERVED_UTILITY_PENALTY;

    const TOLERANCE: f64 = 0.02;

    fn a() -> Variable {
        Variable::new("A", &["a0", "a1"])
    }
    fn b() -> Variable {
        Variable::new("B", &["b0", "b1"])
    }

    /// A ~ (0.2, 0.8) and B | A with P(b0 | a0) = 0.9, P(b0 | a1) = 0.3.
    fn two_nodes(kind: NetworkType) -> ProbNet {
        let mut net = ProbNet::new(kind);
        net.add_node(a(), NodeType::Chance).unwrap();
        net.add_node(b(), NodeType::Chance).unwrap();
        net.add_link("A", "B").unwrap();
        net.add_potential(
            "A",
            TablePotential::with_values(vec![a()], PotentialRole::ConditionalProbability, vec![0.2, 0.8])
                .unwrap(),
        )
        .unwrap();
        net.add_potential(
            "B",
            TablePotential::with_values(
                vec![b(), a()],
                PotentialRole::ConditionalProbability,
                vec![0.9, 0.1, 0.3, 0.7],
            )
            .unwrap(),
        )
        .unwrap();
        net
    }

    fn observe(variable: Variable, state: usize) -> EvidenceCase {
        [Finding::new(variable, state).unwrap()].into_iter().collect()
    }

    fn near(estimate: &TablePotential, expected: &[f64], tolerance: f64) {
        assert_eq!(estimate.values().len(), expected.len());
        for (x, y) in estimate.values().iter().zip(expected) {
            assert!((x - y).abs() < tolerance, "{:?} ≠ {:?}", estimate.values(), expected);
        }
    }

    macro_rules! converges {
        ($seed:literal) => {
            paste::paste! {
                #[test]
                fn [<marginals_converge_with_seed_ $seed>]() {
                    let ref net = two_nodes(NetworkType::BayesianNetwork);
                    let mut lw = LikelihoodWeighting::new(net).unwrap();
                    lw.set_seed($seed);
                    let estimates = lw.probs_and_utilities(&[a(), b()]).unwrap();
                    near(&estimates[&a()], &[0.2, 0.8], TOLERANCE);
                    near(&estimates[&b()], &[0.42, 0.58], TOLERANCE);
                    assert_eq!(lw.accumulated_weight(), lw.sample_size() as f64);
                    assert_eq!(lw.positive_sample_ratio(), 1.);
                }
                #[test]
                fn [<posterior_converges_with_seed_ $seed>]() {
                    let ref net = two_nodes(NetworkType::BayesianNetwork);
                    let mut lw = LikelihoodWeighting::new(net).unwrap();
                    lw.set_seed($seed);
                    lw.set_post_resolution_evidence(observe(b(), 0));
                    let estimates = lw.probs_and_utilities(&[a()]).unwrap();
                    near(&estimates[&a()], &[0.18 / 0.42, 0.24 / 0.42], TOLERANCE);
                }
            }
        };
    }

    converges!(1);
    converges!(2);
    converges!(3);
    converges!(42);

    #[test]
    fn same_seed_same_estimate() {
        let ref net = two_nodes(NetworkType::BayesianNetwork);
        let mut lw = LikelihoodWeighting::new(net).unwrap();
        lw.set_sample_size(3000);
        let x = lw.probs_and_utilities(&[b()]).unwrap();
        let y = lw.probs_and_utilities(&[b()]).unwrap();
        assert_eq!(x, y);
        assert_eq!(lw.accumulated_weight(), 3000.);
    }

    #[test]
    fn parentless_evidence_leaves_weights_alone() {
        let ref net = two_nodes(NetworkType::BayesianNetwork);
        let mut lw = LikelihoodWeighting::new(net).unwrap();
        lw.set_post_resolution_evidence(observe(a(), 1));
        let estimates = lw.probs_and_utilities(&[b()]).unwrap();
        near(&estimates[&b()], &[0.3, 0.7], TOLERANCE);
        // P(A = a1) = 0.8 is not a factor of any trial
        assert_eq!(lw.accumulated_weight(), lw.sample_size() as f64);
    }

    #[test]
    fn impossible_parentless_evidence_zeroes_weights() {
        let mut net = two_nodes(NetworkType::BayesianNetwork);
        net.remove_node("A").unwrap();
        net.add_node(a(), NodeType::Chance).unwrap();
        net.add_potential(
            "A",
            TablePotential::with_values(vec![a()], PotentialRole::ConditionalProbability, vec![0., 1.])
                .unwrap(),
        )
        .unwrap();
        let mut lw = LikelihoodWeighting::new(&net).unwrap();
        lw.set_post_resolution_evidence(observe(a(), 0));
        assert!(matches!(
            lw.probs_and_utilities(&[a()]),
            Err(Error::IncompatibleEvidence(_))
        ));
        assert_eq!(lw.accumulated_weight(), 0.);
    }

    #[test]
    fn restrictions_can_rule_out_the_evidence() {
        let mut net = two_nodes(NetworkType::BayesianNetwork);
        net.set_restriction("A", "B", TablePotential::restriction(&a(), &b(), &[(0, 0), (1, 0)]))
            .unwrap();
        let mut lw = LikelihoodWeighting::new(&net).unwrap();
        lw.set_sample_size(2000);
        lw.set_post_resolution_evidence(observe(b(), 1));
        assert!(matches!(
            lw.probs_and_utilities(&[a()]),
            Err(Error::IncompatibleEvidence(_))
        ));
        assert_eq!(lw.positive_sample_ratio(), 0.);
    }

    #[test]
    fn post_resolution_evidence_wins() {
        let ref net = two_nodes(NetworkType::BayesianNetwork);
        let mut lw = LikelihoodWeighting::new(net).unwrap();
        lw.set_post_resolution_evidence(observe(a(), 0));
        lw.set_pre_resolution_evidence(observe(a(), 1));
        let estimates = lw.probs_and_utilities(&[a()]).unwrap();
        assert_eq!(estimates[&a()].values(), &[1., 0.]);
    }

    #[test]
    fn evidence_outside_the_domain_is_an_error() {
        let ref net = two_nodes(NetworkType::BayesianNetwork);
        let wide = Variable::new("A", &["a0", "a1", "a2"]);
        let mut lw = LikelihoodWeighting::new(net).unwrap();
        lw.set_post_resolution_evidence(observe(wide, 2));
        assert!(matches!(
            lw.probs_and_utilities(&[b()]),
            Err(Error::InvalidState { .. })
        ));
    }

    #[test]
    fn tuning_networks_fix_open_decisions() {
        let d = Variable::new("D", &["d0", "d1"]);
        let x = Variable::new("X", &["x0", "x1"]);
        let mut net = ProbNet::new(NetworkType::TuningNetwork);
        net.add_node(d.clone(), NodeType::Decision).unwrap();
        net.add_node(x.clone(), NodeType::Chance).unwrap();
        net.add_link("D", "X").unwrap();
        net.add_potential(
            "X",
            TablePotential::with_values(
                vec![x.clone(), d.clone()],
                PotentialRole::ConditionalProbability,
                vec![1., 0., 0.25, 0.75],
            )
            .unwrap(),
        )
        .unwrap();
        let mut lw = LikelihoodWeighting::new(&net).unwrap();
        let estimates = lw.probs_and_utilities(&[x.clone(), d.clone()]).unwrap();
        near(&estimates[&x], &[0.25, 0.75], TOLERANCE);
        assert_eq!(estimates[&d].values(), &[0., 1.]);
        lw.set_post_resolution_evidence(observe(d.clone(), 0));
        let estimates = lw.probs_and_utilities(&[x.clone()]).unwrap();
        assert_eq!(estimates[&x].values(), &[1., 0.]);
    }

    fn with_utility() -> ProbNet {
        let mut net = two_nodes(NetworkType::BayesianNetwork);
        net.add_node(Variable::utility("U"), NodeType::Utility).unwrap();
        net.add_link("A", "U").unwrap();
        net.add_potential(
            "U",
            TablePotential::utility(vec![a()], Variable::utility("U"), vec![10., 20.]).unwrap(),
        )
        .unwrap();
        net
    }

    #[test]
    fn expected_utility() {
        let ref net = with_utility();
        let mut lw = LikelihoodWeighting::new(net).unwrap();
        let estimates = lw.all_probs_and_utilities().unwrap();
        near(&estimates[&Variable::utility("U")], &[18.], 0.2);
        assert_eq!(estimates.len(), 3);
    }

    #[test]
    fn unobserved_utilities_are_penalized() {
        let mut net = with_utility();
        net.set_property(UNOBSERVED_UTILITY_PENALTY, "2");
        let u = Variable::utility("U");
        let mut lw = LikelihoodWeighting::new(&net).unwrap();
        let estimates = lw.probs_and_utilities(&[u.clone()]).unwrap();
        near(&estimates[&u], &[9.], 0.1);
        lw.set_post_resolution_evidence(observe(a(), 1));
        let estimates = lw.probs_and_utilities(&[u.clone()]).unwrap();
        assert_eq!(estimates[&u].values(), &[20.]);
        net.set_property(UNOBSERVED_UTILITY_PENALTY, "half");
        let mut lw = LikelihoodWeighting::new(&net).unwrap();
        assert!(lw.probs_and_utilities(&[u]).is_err());
    }

    #[test]
    fn joint_probability_converges() {
        let ref net = two_nodes(NetworkType::BayesianNetwork);
        let mut lw = LikelihoodWeighting::new(net).unwrap();
        let joint = lw.joint_probability(&[a(), b()]).unwrap();
        near(&joint, &[0.18, 0.24, 0.02, 0.56], TOLERANCE);
        let joint = lw.joint_probability(&[b(), a()]).unwrap();
        near(&joint, &[0.18, 0.02, 0.24, 0.56], TOLERANCE);
    }

    #[test]
    fn family_joints_with_evidence() {
        let ref net = two_nodes(NetworkType::BayesianNetwork);
        let mut lw = LikelihoodWeighting::new(net).unwrap();
        lw.set_post_resolution_evidence(observe(b(), 0));
        let families = lw.family_joint_probabilities().unwrap();
        assert_eq!(families.len(), 2);
        near(&families[&a()], &[0.18 / 0.42, 0.24 / 0.42], TOLERANCE);
        let observed = &families[&b()];
        assert_eq!(observed.variables(), &[b(), a()]);
        near(observed, &[0.75, 0., 0.25, 0.], 1e-12);
        assert_eq!(observed.role(), PotentialRole::JointProbability);
    }

    #[test]
    fn family_joints_without_evidence() {
        let ref net = two_nodes(NetworkType::BayesianNetwork);
        let mut lw = LikelihoodWeighting::new(net).unwrap();
        let families = lw.family_joint_probabilities().unwrap();
        near(&families[&b()], &[0.18, 0.02, 0.24, 0.56], TOLERANCE);
    }

    #[test]
    fn uneven_last_batch() {
        let ref net = two_nodes(NetworkType::BayesianNetwork);
        let mut lw = LikelihoodWeighting::new(net).unwrap();
        lw.set_sample_size(SAMPLE_BATCH_SIZE * 2 + 7);
        lw.probs_and_utilities(&[b()]).unwrap();
        assert_eq!(lw.accumulated_weight(), (SAMPLE_BATCH_SIZE * 2 + 7) as f64);
    }

    #[test]
    fn configured_from_environment_values() {
        let ref net = two_nodes(NetworkType::BayesianNetwork);
        let config = Config::from_lookup(|key| match key {
            "PGM_SAMPLE_SIZE" => Some("500".to_string()),
            "PGM_SAMPLE_SEED" => Some("9".to_string()),
            _ => None,
        })
        .unwrap();
        let mut lw = LikelihoodWeighting::from_config(net, &config).unwrap();
        assert_eq!(lw.sample_size(), 500);
        lw.probs_and_utilities(&[a()]).unwrap();
        assert_eq!(lw.accumulated_weight(), 500.);
    }

    #[test]
    fn deadline_stops_sampling() {
        let ref net = two_nodes(NetworkType::BayesianNetwork);
        let mut lw = LikelihoodWeighting::new(net).unwrap();
        lw.set_deadline(Instant::now() - std::time::Duration::from_secs(1));
        assert!(matches!(
            lw.probs_and_utilities(&[a()]),
            Err(Error::DeadlineExceeded)
        ));
    }

    #[test]
    fn decision_networks_are_not_evaluable() {
        let id = ProbNet::new(NetworkType::InfluenceDiagram);
        assert!(matches!(
            LikelihoodWeighting::new(&id),
            Err(Error::NotEvaluable(_))
        ));
        let dan = ProbNet::new(NetworkType::DecisionAnalysisNetwork);
        assert!(LikelihoodWeighting::new(&dan).is_err());
    }
}
