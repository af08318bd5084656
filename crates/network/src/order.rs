use crate::*;
use pgm_core::Error;
use pgm_core::Result;

impl ProbNet {
    /// Groups of decision and chance variables in the order an agent meets
    /// them: the chance variables observed before each decision, then the
    /// decision itself, then everything never observed.
    ///
    /// Decisions are found by peeling childless nodes off a scratch copy
    /// until no decision is left; the last decision peeled is the first one
    /// taken.
    pub fn partial_order(&self) -> Result<Vec<Vec<Variable>>> {
        let mut scratch = self.clone();
        let mut decisions = Vec::<Variable>::new();
        let mut remaining = self.nodes_of(NodeType::Decision).len();
        loop {
            let mut removed = 0;
            for variable in scratch.variables() {
                if scratch.children(variable.name())?.is_empty() {
                    if scratch.node(variable.name())?.node_type() == NodeType::Decision {
                        decisions.push(variable.clone());
                        remaining -= 1;
                    }
                    scratch.remove_node(variable.name())?;
                    removed += 1;
                }
            }
            if remaining == 0 {
                break;
            }
            if removed == 0 {
                return Err(Error::WrongGraphStructure(format!(
                    "{} decisions sit on a cycle",
                    remaining
                )));
            }
        }
        let mut chance = self.variables_of(NodeType::Chance);
        let mut order = Vec::new();
        while let Some(decision) = decisions.pop() {
            let observed = self
                .parents(decision.name())?
                .into_iter()
                .filter(|p| p.node_type() == NodeType::Chance)
                .filter_map(|p| {
                    chance
                        .iter()
                        .position(|c| c == p.variable())
                        .map(|i| chance.remove(i))
                })
                .collect::<Vec<_>>();
            if !observed.is_empty() {
                order.push(observed);
            }
            order.push(vec![decision]);
        }
        if !chance.is_empty() {
            order.push(chance);
        }
        log::trace!("partial order {:?}", order);
        Ok(order)
    }

    /// Filters a topological order of the whole network down to `variables`.
    pub fn sort_topologically(&self, variables: &[Variable]) -> Result<Vec<Variable>> {
        let sorted = petgraph::algo::toposort(self.graph(), None).map_err(|cycle| {
            Error::WrongGraphStructure(format!(
                "cycle through {}",
                self.graph()[cycle.node_id()].name()
            ))
        })?;
        Ok(sorted
            .into_iter()
            .map(|i| self.graph()[i].variable())
            .filter(|v| variables.contains(v))
            .cloned()
            .collect())
    }
}
