use crate::*;
use pgm_core::Error;
use pgm_core::Probability;
use pgm_core::Result;
use pgm_core::Utility;
use rand::Rng;
use std::collections::HashMap;

/// What the numbers of a potential mean.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PotentialRole {
    ConditionalProbability,
    JointProbability,
    Utility,
    LinkRestriction,
}

/// Utility of a node as the sum of its parent utilities.
#[derive(Debug, Clone, PartialEq)]
pub struct SumPotential {
    variables: Vec<Variable>,
    utility: Variable,
}

impl SumPotential {
    pub fn new(variables: Vec<Variable>, utility: Variable) -> Self {
        Self { variables, utility }
    }
}

/// Utility of a node as the product of its parent utilities.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductPotential {
    variables: Vec<Variable>,
    utility: Variable,
}

impl ProductPotential {
    pub fn new(variables: Vec<Variable>, utility: Variable) -> Self {
        Self { variables, utility }
    }
}

/// The potential family attached to network nodes.
#[derive(Debug, Clone, PartialEq)]
pub enum Potential {
    Table(TablePotential),
    Sum(SumPotential),
    Product(ProductPotential),
}

impl From<TablePotential> for Potential {
    fn from(table: TablePotential) -> Self {
        Self::Table(table)
    }
}
impl From<SumPotential> for Potential {
    fn from(sum: SumPotential) -> Self {
        Self::Sum(sum)
    }
}
impl From<ProductPotential> for Potential {
    fn from(product: ProductPotential) -> Self {
        Self::Product(product)
    }
}

impl Potential {
    pub fn variables(&self) -> &[Variable] {
        match self {
            Self::Table(t) => t.variables(),
            Self::Sum(s) => &s.variables,
            Self::Product(p) => &p.variables,
        }
    }
    pub fn role(&self) -> PotentialRole {
        match self {
            Self::Table(t) => t.role(),
            Self::Sum(_) | Self::Product(_) => PotentialRole::Utility,
        }
    }
    pub fn is_utility(&self) -> bool {
        self.role() == PotentialRole::Utility
    }
    pub fn utility_variable(&self) -> Option<&Variable> {
        match self {
            Self::Table(t) => t.utility_variable(),
            Self::Sum(s) => Some(&s.utility),
            Self::Product(p) => Some(&p.utility),
        }
    }
    pub fn table(&self) -> Option<&TablePotential> {
        match self {
            Self::Table(t) => Some(t),
            _ => None,
        }
    }
    /// Variable this potential samples or scores.
    pub fn head(&self) -> Option<&Variable> {
        match self.role() {
            PotentialRole::Utility => self.utility_variable(),
            _ => self.variables().first(),
        }
    }

    pub fn probability<A>(&self, assignment: &A) -> Result<Probability>
    where
        A: Assignment,
    {
        match self {
            Self::Table(t) => t.probability(assignment),
            Self::Sum(s) => Err(Error::WrongGraphStructure(format!(
                "sum potential of {} has no probability",
                s.utility
            ))),
            Self::Product(p) => Err(Error::WrongGraphStructure(format!(
                "product potential of {} has no probability",
                p.utility
            ))),
        }
    }

    /// Utility given the sampled states and the utilities already computed
    /// for upstream utility nodes.
    pub fn utility<A>(&self, assignment: &A, utilities: &HashMap<String, Utility>) -> Result<Utility>
    where
        A: Assignment,
    {
        let parent = |v: &Variable| {
            utilities
                .get(v.name())
                .copied()
                .ok_or_else(|| Error::MissingFinding(v.name().to_string()))
        };
        match self {
            Self::Table(t) => t.value(assignment),
            Self::Sum(s) => s.variables.iter().map(parent).sum(),
            Self::Product(p) => p.variables.iter().map(parent).product(),
        }
    }

    pub fn sample<R, A>(&self, rng: &mut R, assignment: &A) -> Result<usize>
    where
        R: Rng,
        A: Assignment,
    {
        match self {
            Self::Table(t) => t.sample(rng, assignment),
            _ => Err(Error::WrongGraphStructure(format!(
                "cannot sample utility combination of {}",
                self.utility_variable().map(Variable::name).unwrap_or_default()
            ))),
        }
    }
}
