use crate::*;
use pgm_core::Error;
use pgm_core::Probability;
use pgm_core::Result;
use rand::Rng;
use std::collections::HashMap;

/// Dense table over a list of discrete variables.
///
/// Values are laid out with the first variable varying fastest, so the
/// entry of configuration `(s0, s1, ..)` lives at `Σ si * stride[i]` with
/// `stride[0] = 1` and `stride[i] = stride[i-1] * n(i-1)`.
///
/// Conditional probability tables put the conditioned variable first and its
/// parents after it. Utility tables range over the utility node's parents and
/// name the utility node in `utility`. Link restrictions range over
/// `(source, destination)` and hold 1 where the combination is allowed.
#[derive(Debug, Clone, PartialEq)]
pub struct TablePotential {
    variables: Vec<Variable>,
    role: PotentialRole,
    values: Vec<f64>,
    strides: Vec<usize>,
    utility: Option<Variable>,
}

impl TablePotential {
    /// All-zero table.
    pub fn zeros(variables: Vec<Variable>, role: PotentialRole) -> Self {
        let strides = Self::strides(&variables);
        let size = variables.iter().map(Variable::n).product::<usize>();
        Self {
            variables,
            role,
            values: vec![0.; size],
            strides,
            utility: None,
        }
    }
    /// Every column of the first variable gets a uniform distribution.
    pub fn uniform(variables: Vec<Variable>, role: PotentialRole) -> Self {
        let mut table = Self::zeros(variables, role);
        let n = table.variables.first().map(Variable::n).unwrap_or(1).max(1);
        table.values.iter_mut().for_each(|x| *x = 1. / n as f64);
        table
    }
    pub fn with_values(
        variables: Vec<Variable>,
        role: PotentialRole,
        values: Vec<f64>,
    ) -> Result<Self> {
        let mut table = Self::zeros(variables, role);
        match table.values.len() == values.len() {
            true => {
                table.values = values;
                Ok(table)
            }
            false => Err(Error::TableSize {
                variables: table.names(),
                expected: table.values.len(),
                actual: values.len(),
            }),
        }
    }
    /// Utility table of `utility` over its parents.
    pub fn utility(parents: Vec<Variable>, utility: Variable, values: Vec<f64>) -> Result<Self> {
        let mut table = Self::with_values(parents, PotentialRole::Utility, values)?;
        table.utility = Some(utility);
        Ok(table)
    }
    /// Link restriction over `(source, destination)` from the allowed pairs.
    pub fn restriction(source: &Variable, destination: &Variable, allowed: &[(usize, usize)]) -> Self {
        let mut table = Self::zeros(
            vec![source.clone(), destination.clone()],
            PotentialRole::LinkRestriction,
        );
        allowed
            .iter()
            .filter(|(s, d)| *s < source.n() && *d < destination.n())
            .for_each(|(s, d)| table.values[s + d * source.n()] = 1.);
        table
    }
    /// One-hot table over the finding's variable.
    pub fn indicator(finding: &Finding) -> Self {
        let mut table = Self::zeros(
            vec![finding.variable().clone()],
            PotentialRole::JointProbability,
        );
        table.values[finding.state_index()] = 1.;
        table
    }

    fn strides(variables: &[Variable]) -> Vec<usize> {
        variables
            .iter()
            .scan(1, |stride, v| {
                let this = *stride;
                *stride *= v.n();
                Some(this)
            })
            .collect()
    }
    fn names(&self) -> String {
        self.variables
            .iter()
            .map(|v| v.name().to_string())
            .collect::<Vec<_>>()
            .join(", ")
    }

    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }
    pub fn role(&self) -> PotentialRole {
        self.role
    }
    pub fn set_role(&mut self, role: PotentialRole) {
        self.role = role;
    }
    pub fn values(&self) -> &[f64] {
        &self.values
    }
    pub fn values_mut(&mut self) -> &mut [f64] {
        &mut self.values
    }
    pub fn strides_of(&self) -> &[usize] {
        &self.strides
    }
    pub fn utility_variable(&self) -> Option<&Variable> {
        self.utility.as_ref()
    }

    /// Position of the configuration given by `assignment`.
    pub fn index<A>(&self, assignment: &A) -> Result<usize>
    where
        A: Assignment,
    {
        self.variables
            .iter()
            .zip(self.strides.iter())
            .try_fold(0, |index, (variable, stride)| {
                Ok(index + Self::state_of(assignment, variable)? * stride)
            })
    }
    /// State of `variable` in `assignment`, checked against its domain.
    fn state_of<A>(assignment: &A, variable: &Variable) -> Result<usize>
    where
        A: Assignment,
    {
        let state = assignment
            .state(variable)
            .ok_or_else(|| Error::MissingFinding(variable.name().to_string()))?;
        match state < variable.n() {
            true => Ok(state),
            false => Err(Error::InvalidState {
                variable: variable.name().to_string(),
                state: state.to_string(),
            }),
        }
    }
    pub fn probability<A>(&self, assignment: &A) -> Result<Probability>
    where
        A: Assignment,
    {
        Ok(self.values[self.index(assignment)?])
    }
    /// Same lookup as [`TablePotential::probability`], read as a utility.
    pub fn value<A>(&self, assignment: &A) -> Result<f64>
    where
        A: Assignment,
    {
        self.probability(assignment)
    }

    /// Draws a state of the first variable given its parents' states in
    /// `assignment`, inverting the cumulative distribution of that column.
    /// The last state absorbs any mass missing from an unnormalized column.
    pub fn sample<R, A>(&self, rng: &mut R, assignment: &A) -> Result<usize>
    where
        R: Rng,
        A: Assignment,
    {
        let ref head = self
            .variables
            .first()
            .ok_or_else(|| Error::MissingPotential(self.names()))?;
        let offset = self
            .variables
            .iter()
            .zip(self.strides.iter())
            .skip(1)
            .try_fold(0, |index, (variable, stride)| {
                Ok(index + Self::state_of(assignment, variable)? * stride)
            })?;
        if head.n() == 0 {
            return Err(Error::InvalidState {
                variable: head.name().to_string(),
                state: "any".to_string(),
            });
        }
        let r = rng.random::<f64>();
        let mut state = 0;
        let mut cumulative = self.values[offset];
        while r > cumulative && state + 1 < head.n() {
            state += 1;
            cumulative += self.values[offset + state];
        }
        Ok(state)
    }

    /// Scales the whole table to sum to one.
    pub fn normalize(&mut self) -> Result<()> {
        let sum = self.values.iter().sum::<f64>();
        match sum > 0. {
            true => Ok(self.values.iter_mut().for_each(|x| *x /= sum)),
            false => Err(Error::NormalizeNullVector(self.names())),
        }
    }

    /// Pointwise product over the union of the factors' variables, in order
    /// of first appearance.
    pub fn multiply(factors: &[&TablePotential]) -> Result<TablePotential> {
        let mut variables = Vec::<Variable>::new();
        for factor in factors {
            for variable in factor.variables() {
                if !variables.contains(variable) {
                    variables.push(variable.clone());
                }
            }
        }
        let mut product = Self::zeros(variables, PotentialRole::JointProbability);
        let mut configuration = HashMap::<String, usize>::new();
        for index in 0..product.values.len() {
            for (variable, stride) in product.variables.iter().zip(product.strides.iter()) {
                configuration.insert(variable.name().to_string(), (index / stride) % variable.n());
            }
            product.values[index] = factors
                .iter()
                .map(|f| f.probability(&configuration))
                .product::<Result<f64>>()?;
        }
        Ok(product)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    fn a() -> Variable {
        Variable::new("A", &["a0", "a1"])
    }
    fn b() -> Variable {
        Variable::new("B", &["b0", "b1", "b2"])
    }
    fn at(pairs: &[(&str, usize)]) -> HashMap<String, usize> {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn first_variable_varies_fastest() {
        let table = TablePotential::with_values(
            vec![a(), b()],
            PotentialRole::ConditionalProbability,
            vec![0.1, 0.9, 0.2, 0.8, 0.3, 0.7],
        )
        .unwrap();
        assert_eq!(table.strides_of(), &[1, 2]);
        assert_eq!(table.probability(&at(&[("A", 1), ("B", 2)])).unwrap(), 0.7);
        assert_eq!(table.probability(&at(&[("A", 0), ("B", 1)])).unwrap(), 0.2);
        assert!(matches!(
            table.probability(&at(&[("A", 0)])),
            Err(Error::MissingFinding(_))
        ));
    }

    #[test]
    fn wrong_size_rejected() {
        let table = TablePotential::with_values(vec![a()], PotentialRole::JointProbability, vec![1.]);
        assert!(matches!(table, Err(Error::TableSize { expected: 2, actual: 1, .. })));
    }

    #[test]
    fn sampling_follows_column() {
        let table = TablePotential::with_values(
            vec![a(), b()],
            PotentialRole::ConditionalProbability,
            vec![1., 0., 0., 1., 0.5, 0.5],
        )
        .unwrap();
        let ref mut rng = SmallRng::seed_from_u64(0);
        for _ in 0..100 {
            assert_eq!(table.sample(rng, &at(&[("B", 0)])).unwrap(), 0);
            assert_eq!(table.sample(rng, &at(&[("B", 1)])).unwrap(), 1);
        }
        let ones = (0..10_000)
            .map(|_| table.sample(rng, &at(&[("B", 2)])).unwrap())
            .sum::<usize>();
        assert!((ones as f64 / 10_000. - 0.5).abs() < 0.02);
    }

    #[test]
    fn sampling_rejects_parent_states_out_of_domain() {
        let table = TablePotential::uniform(vec![a(), b()], PotentialRole::ConditionalProbability);
        let ref mut rng = SmallRng::seed_from_u64(0);
        assert!(matches!(
            table.sample(rng, &at(&[("B", 3)])),
            Err(Error::InvalidState { .. })
        ));
        let empty = TablePotential::zeros(vec![Variable::new("E", &[])], PotentialRole::ConditionalProbability);
        assert!(matches!(
            empty.sample(rng, &at(&[])),
            Err(Error::InvalidState { .. })
        ));
    }

    #[test]
    fn sampling_never_overflows_column() {
        let table = TablePotential::with_values(
            vec![b()],
            PotentialRole::ConditionalProbability,
            vec![0., 0., 0.],
        )
        .unwrap();
        let ref mut rng = SmallRng::seed_from_u64(1);
        assert_eq!(table.sample(rng, &HashMap::new()).unwrap(), 2);
    }

    #[test]
    fn normalize_and_null_vector() {
        let mut table =
            TablePotential::with_values(vec![a()], PotentialRole::JointProbability, vec![1., 3.])
                .unwrap();
        table.normalize().unwrap();
        assert_eq!(table.values(), &[0.25, 0.75]);
        let mut empty = TablePotential::zeros(vec![a()], PotentialRole::JointProbability);
        assert!(matches!(empty.normalize(), Err(Error::NormalizeNullVector(_))));
    }

    #[test]
    fn restriction_marks_allowed_pairs() {
        let table = TablePotential::restriction(&a(), &b(), &[(0, 0), (1, 2)]);
        assert_eq!(table.role(), PotentialRole::LinkRestriction);
        assert_eq!(table.probability(&at(&[("A", 0), ("B", 0)])).unwrap(), 1.);
        assert_eq!(table.probability(&at(&[("A", 1), ("B", 0)])).unwrap(), 0.);
        assert_eq!(table.probability(&at(&[("A", 1), ("B", 2)])).unwrap(), 1.);
    }

    #[test]
    fn multiply_with_indicator() {
        let table = TablePotential::with_values(
            vec![a(), b()],
            PotentialRole::ConditionalProbability,
            vec![0.1, 0.9, 0.2, 0.8, 0.3, 0.7],
        )
        .unwrap();
        let observed = TablePotential::indicator(&Finding::new(b(), 1).unwrap());
        let product = TablePotential::multiply(&[&table, &observed]).unwrap();
        assert_eq!(product.variables(), &[a(), b()]);
        assert_eq!(product.values(), &[0., 0., 0.2, 0.8, 0., 0.]);
    }
}
