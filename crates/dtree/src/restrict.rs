use crate::*;
use petgraph::graph::NodeIndex;
use pgm_core::Error;
use pgm_core::Result;
use pgm_core::SUPER_VALUE_NODE;
use pgm_network::*;

impl DecisionTreeBuilder<'_> {
    /// Propagates `source = state` along the links leaving `source` in
    /// `from` into `net`, the copy that no longer holds `source`.
    ///
    /// Revealing links make their chance destination always observed.
    /// Restricting links shrink their destination to the states still
    /// compatible with `state`: none left prunes the destination and
    /// everything below it, exactly one left fixes it as a finding and
    /// keeps propagating from there, some left narrows its variable.
    ///
    /// Returns the restricted network and the findings fixed on the way.
    pub(crate) fn restrict(
        &self,
        from: &ProbNet,
        mut net: ProbNet,
        source: &str,
        state: &State,
    ) -> Result<(ProbNet, Vec<Finding>)> {
        let mut forced = Vec::new();
        for (destination, link) in from.outgoing(source)? {
            let name = destination.name();
            if !net.contains(name) {
                log::debug!("{} already gone while restricting {}", name, source);
                continue;
            }
            if destination.node_type() == NodeType::Chance && link.reveals(state) {
                log::trace!("{}={} reveals {}", source, state, name);
                net.set_always_observed(name, true)?;
            }
            let Some(restriction) = link.restriction() else {
                continue;
            };
            let ref current = net.variable(name)?.clone();
            let survivors = Self::survivors(restriction, state, current)?;
            match survivors.len() {
                0 => {
                    log::trace!("{}={} rules out {}", source, state, name);
                    Self::prune(&mut net, name)?;
                }
                1 => {
                    let ref survivor = survivors[0];
                    log::trace!("{}={} forces {}={}", source, state, name, survivor);
                    forced.push(Finding::named(
                        self.net.variable(name)?.clone(),
                        survivor.name(),
                    )?);
                    let mut without = net.clone();
                    without.remove_node(name)?;
                    let (next, more) = self.restrict(&net, without, name, survivor)?;
                    net = next;
                    forced.extend(more);
                }
                n if n < current.n() => net.set_variable(current.restrict(&survivors))?,
                _ => {}
            }
        }
        Ok((net, forced))
    }

    /// States of `destination` the restriction allows next to `state`.
    /// States are matched by name against the restriction's own variables.
    fn survivors(
        restriction: &TablePotential,
        state: &State,
        destination: &Variable,
    ) -> Result<Vec<State>> {
        let [source, target] = restriction.variables() else {
            return Err(Error::WrongGraphStructure(format!(
                "restriction over {} variables",
                restriction.variables().len()
            )));
        };
        let mut survivors = Vec::new();
        for candidate in destination.states() {
            let configuration = [
                (source.name().to_string(), source.index_of(state.name())?),
                (target.name().to_string(), target.index_of(candidate.name())?),
            ]
            .into_iter()
            .collect::<std::collections::HashMap<_, _>>();
            if restriction.probability(&configuration)? > 0. {
                survivors.push(candidate.clone());
            }
        }
        Ok(survivors)
    }

    /// Removes `name` and every node below it.
    fn prune(net: &mut ProbNet, name: &str) -> Result<()> {
        let mut todo = vec![name.to_string()];
        while let Some(name) = todo.pop() {
            if !net.contains(&name) {
                continue;
            }
            todo.extend(net.children(&name)?.into_iter().map(|c| c.name().to_string()));
            net.remove_node(&name)?;
        }
        Ok(())
    }

    /// Name of the single utility node that aggregates all others, adding
    /// a summing one when several utility nodes have no children.
    pub(crate) fn super_value(net: &mut ProbNet) -> Result<String> {
        let leaves = net
            .nodes_of(NodeType::Utility)
            .into_iter()
            .filter(|u| net.children(u.name()).map(|c| c.is_empty()).unwrap_or(false))
            .map(|u| u.variable().clone())
            .collect::<Vec<_>>();
        match leaves.as_slice() {
            [] => Err(Error::WrongGraphStructure("no utility node".to_string())),
            [leaf] => Ok(leaf.name().to_string()),
            leaves => {
                log::debug!("summing {} utility nodes into {}", leaves.len(), SUPER_VALUE_NODE);
                let sv = Variable::utility(SUPER_VALUE_NODE);
                net.add_node(sv.clone(), NodeType::Utility)?;
                net.add_potential(SUPER_VALUE_NODE, SumPotential::new(leaves.to_vec(), sv))?;
                for leaf in leaves {
                    net.add_link(leaf.name(), SUPER_VALUE_NODE)?;
                }
                Ok(SUPER_VALUE_NODE.to_string())
            }
        }
    }

    /// Hangs the utility node `sv` under `parent`, each utility node
    /// followed by the utility nodes it aggregates.
    pub(crate) fn utility_subtree(
        tree: &mut DecisionTree,
        net: &ProbNet,
        parent: NodeIndex,
        sv: &str,
    ) -> Result<NodeIndex> {
        let root = tree.add_node(parent, net.node(sv)?.clone());
        let mut todo = vec![(root, sv.to_string())];
        while let Some((index, name)) = todo.pop() {
            for utility in net
                .parents(&name)?
                .into_iter()
                .filter(|p| p.node_type() == NodeType::Utility)
            {
                let child = tree.add_node(index, utility.clone());
                todo.push((child, utility.name().to_string()));
            }
        }
        Ok(root)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pgm_core::ORDER_DECISION_NODE;

    const TOLERANCE: f64 = 1e-9;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < TOLERANCE
    }

    /// Deciding D to test or skip a test R that pays off through U1.
    /// Testing costs 10 through U2.
    fn test_decision(r: Variable, cpt: Vec<f64>, allowed: &[(usize, usize)]) -> ProbNet {
        let d = Variable::new("D", &["test", "skip"]);
        let mut dan = ProbNet::new(NetworkType::DecisionAnalysisNetwork);
        dan.add_node(d.clone(), NodeType::Decision).unwrap();
        dan.add_node(r.clone(), NodeType::Chance).unwrap();
        dan.add_node(Variable::utility("U1"), NodeType::Utility).unwrap();
        dan.add_node(Variable::utility("U2"), NodeType::Utility).unwrap();
        dan.add_link("D", "R").unwrap();
        dan.add_link("R", "U1").unwrap();
        dan.add_link("D", "U2").unwrap();
        dan.set_restriction("D", "R", TablePotential::restriction(&d, &r, allowed))
            .unwrap();
        dan.add_potential(
            "R",
            TablePotential::with_values(vec![r.clone(), d.clone()], PotentialRole::ConditionalProbability, cpt)
                .unwrap(),
        )
        .unwrap();
        let mut payoff = vec![0.; r.n()];
        payoff[0] = 100.;
        dan.add_potential("U1", TablePotential::utility(vec![r], Variable::utility("U1"), payoff).unwrap())
            .unwrap();
        dan.add_potential(
            "U2",
            TablePotential::utility(vec![d], Variable::utility("U2"), vec![-10., 0.]).unwrap(),
        )
        .unwrap();
        dan
    }

    fn binary_result() -> Variable {
        Variable::new("R", &["pos", "neg"])
    }

    #[test]
    fn ruled_out_chance_is_pruned() {
        let ref dan = test_decision(binary_result(), vec![0.4, 0.6, 0., 1.], &[(0, 0), (0, 1)]);
        let tree = DecisionTreeBuilder::new(dan).build().unwrap();
        let d = tree.root().child().unwrap();
        assert_eq!(d.name(), "D");
        let branches = d.branches();
        let (test, skip) = (branches[0], branches[1]);
        let r = test.child().unwrap();
        assert_eq!(r.name(), "R");
        assert_eq!(r.branches().len(), 2);
        assert!(close(test.utility().unwrap(), 30.));
        let leaf = skip.child().unwrap();
        assert_eq!(leaf.name(), "U2");
        assert!(leaf.children().is_empty());
        assert!(close(skip.utility().unwrap(), 0.));
        assert!(close(d.utility().unwrap(), 30.));
        let best = d.best_decisions().unwrap();
        assert_eq!(best.len(), 1);
        assert_eq!(best[0].state().unwrap().name(), "test");
        assert!(close(tree.utility().unwrap(), 30.));
    }

    #[test]
    fn single_survivor_becomes_a_finding() {
        let ref dan = test_decision(
            binary_result(),
            vec![0.4, 0.6, 0., 1.],
            &[(0, 0), (0, 1), (1, 1)],
        );
        let tree = DecisionTreeBuilder::new(dan).build().unwrap();
        let d = tree.root().child().unwrap();
        let skip = d.branches()[1];
        assert_eq!(skip.forced().len(), 1);
        assert_eq!(skip.forced()[0].to_string(), "R=neg");
        assert!(skip.branch_states().contains("R"));
        let sv = skip.child().unwrap();
        assert_eq!(sv.name(), SUPER_VALUE_NODE);
        assert!(tree.nodes().filter(|n| n.name() == "R").count() == 1);
        assert!(close(skip.utility().unwrap(), 0.));
        assert!(close(skip.scenario_probability().unwrap(), 1.));
        assert!(tree.to_string().contains("D=skip [R=neg]"));
    }

    #[test]
    fn partial_restriction_narrows_branches() {
        let r = Variable::new("R", &["pos", "neg", "unk"]);
        let ref dan = test_decision(
            r,
            vec![0.5, 0.3, 0.2, 0., 0.7, 0.3],
            &[(0, 0), (0, 1), (0, 2), (1, 1), (1, 2)],
        );
        let tree = DecisionTreeBuilder::new(dan).build().unwrap();
        let d = tree.root().child().unwrap();
        let skip = d.branches()[1];
        let r = skip.child().unwrap();
        assert_eq!(r.name(), "R");
        let labels = r
            .branches()
            .iter()
            .map(|b| (b.state().unwrap().name().to_string(), b.label().unwrap().state_index()))
            .collect::<Vec<_>>();
        assert_eq!(labels, vec![("neg".to_string(), 1), ("unk".to_string(), 2)]);
        assert_eq!(r.branches()[0].variable().unwrap().n(), 3);
        assert!(close(r.scenario_probability().unwrap(), 1.));
        // skip pays nothing for the test and never sees pos
        assert!(close(skip.utility().unwrap(), 0.));
        // test: 0.5 * 100 - 10
        assert!(close(d.branches()[0].utility().unwrap(), 40.));
    }

    #[test]
    fn forced_findings_cascade_through_restrictions() {
        let d = Variable::new("D", &["test", "skip"]);
        let r = binary_result();
        let s = Variable::new("S", &["s0", "s1"]);
        let mut dan = ProbNet::new(NetworkType::DecisionAnalysisNetwork);
        dan.add_node(d.clone(), NodeType::Decision).unwrap();
        dan.add_node(r.clone(), NodeType::Chance).unwrap();
        dan.add_node(s.clone(), NodeType::Chance).unwrap();
        dan.add_node(Variable::utility("U1"), NodeType::Utility).unwrap();
        dan.add_node(Variable::utility("U2"), NodeType::Utility).unwrap();
        dan.add_link("D", "R").unwrap();
        dan.add_link("R", "S").unwrap();
        dan.add_link("S", "U1").unwrap();
        dan.add_link("D", "U2").unwrap();
        dan.set_restriction("D", "R", TablePotential::restriction(&d, &r, &[(0, 0), (0, 1), (1, 1)]))
            .unwrap();
        dan.set_restriction("R", "S", TablePotential::restriction(&r, &s, &[(0, 0), (0, 1), (1, 1)]))
            .unwrap();
        dan.add_potential(
            "R",
            TablePotential::with_values(
                vec![r.clone(), d.clone()],
                PotentialRole::ConditionalProbability,
                vec![0.4, 0.6, 0., 1.],
            )
            .unwrap(),
        )
        .unwrap();
        dan.add_potential(
            "S",
            TablePotential::with_values(
                vec![s.clone(), r],
                PotentialRole::ConditionalProbability,
                vec![0.5, 0.5, 0., 1.],
            )
            .unwrap(),
        )
        .unwrap();
        dan.add_potential("U1", TablePotential::utility(vec![s], Variable::utility("U1"), vec![0., 50.]).unwrap())
            .unwrap();
        dan.add_potential(
            "U2",
            TablePotential::utility(vec![d], Variable::utility("U2"), vec![-10., 0.]).unwrap(),
        )
        .unwrap();
        let tree = DecisionTreeBuilder::new(&dan).build().unwrap();
        let d = tree.root().child().unwrap();
        let (test, skip) = (d.branches()[0], d.branches()[1]);
        let forced = skip.forced().iter().map(Finding::to_string).collect::<Vec<_>>();
        assert_eq!(forced, vec!["R=neg", "S=s1"]);
        let sv = skip.child().unwrap();
        assert_eq!(sv.name(), SUPER_VALUE_NODE);
        let below = sv
            .children()
            .iter()
            .map(|c| c.node().unwrap().name().to_string())
            .collect::<Vec<_>>();
        assert_eq!(below, vec!["U1", "U2"]);
        assert!(close(skip.utility().unwrap(), 50.));
        assert_eq!(test.child().unwrap().name(), "R");
        // test: 0.4 * (0.5 * 0 + 0.5 * 50) + 0.6 * 50 - 10
        assert!(close(test.utility().unwrap(), 30.));
        assert_eq!(d.best_decisions().unwrap()[0].state().unwrap().name(), "skip");
    }

    #[test]
    fn revealed_variables_are_branched_first() {
        let d1 = Variable::new("D1", &["test", "skip"]);
        let x = Variable::new("X", &["x0", "x1"]);
        let d2 = Variable::new("D2", &["act", "wait"]);
        let mut dan = ProbNet::new(NetworkType::DecisionAnalysisNetwork);
        dan.add_node(d1.clone(), NodeType::Decision).unwrap();
        dan.add_node(x.clone(), NodeType::Chance).unwrap();
        dan.add_node(d2.clone(), NodeType::Decision).unwrap();
        dan.add_node(Variable::utility("U"), NodeType::Utility).unwrap();
        dan.add_link("D1", "X").unwrap();
        dan.add_link("D1", "D2").unwrap();
        dan.add_link("X", "U").unwrap();
        dan.add_link("D2", "U").unwrap();
        dan.set_revealing("D1", "X", &["test"]).unwrap();
        dan.add_potential(
            "X",
            TablePotential::with_values(vec![x.clone()], PotentialRole::ConditionalProbability, vec![0.5, 0.5])
                .unwrap(),
        )
        .unwrap();
        dan.add_potential(
            "U",
            TablePotential::utility(vec![x, d2], Variable::utility("U"), vec![10., 0., 0., 10.]).unwrap(),
        )
        .unwrap();
        let tree = DecisionTreeBuilder::new(&dan).build().unwrap();
        let d1 = tree.root().child().unwrap();
        assert_eq!(d1.name(), "D1");
        let branches = d1.branches();
        let (test, skip) = (branches[0], branches[1]);
        assert_eq!(test.child().unwrap().name(), "X");
        assert_eq!(skip.child().unwrap().name(), "D2");
        assert!(close(test.utility().unwrap(), 10.));
        assert!(close(skip.utility().unwrap(), 5.));
        assert!(!dan.node("X").unwrap().is_always_observed());
    }

    #[test]
    fn independent_decisions_get_a_metadecision() {
        let d1 = Variable::new("D1", &["a", "b"]);
        let d2 = Variable::new("D2", &["c", "d"]);
        let mut dan = ProbNet::new(NetworkType::DecisionAnalysisNetwork);
        dan.add_node(d1.clone(), NodeType::Decision).unwrap();
        dan.add_node(d2.clone(), NodeType::Decision).unwrap();
        dan.add_node(Variable::utility("U"), NodeType::Utility).unwrap();
        dan.add_link("D1", "U").unwrap();
        dan.add_link("D2", "U").unwrap();
        dan.add_potential(
            "U",
            TablePotential::utility(vec![d1, d2], Variable::utility("U"), vec![1., 2., 3., 4.]).unwrap(),
        )
        .unwrap();
        let tree = DecisionTreeBuilder::new(&dan).build().unwrap();
        let od = tree.root().child().unwrap();
        assert_eq!(od.name(), ORDER_DECISION_NODE);
        assert_eq!(od.node_type(), NodeType::Decision);
        let names = od
            .branches()
            .iter()
            .map(|b| b.child().unwrap().name())
            .collect::<Vec<_>>();
        assert_eq!(names, vec!["D1", "D2"]);
        let second = od.branches()[0].child().unwrap().branches()[0].child().unwrap();
        assert_eq!(second.name(), "D2");
        assert!(close(tree.utility().unwrap(), 4.));
        assert!(close(od.scenario_probability().unwrap(), 1.));
    }

    #[test]
    fn chained_restrictions_prune_descendants() {
        let a = Variable::new("A", &["go", "stop"]);
        let b = Variable::new("B", &["b0", "b1"]);
        let c = Variable::new("C", &["c0", "c1"]);
        let mut net = ProbNet::new(NetworkType::DecisionAnalysisNetwork);
        net.add_node(a.clone(), NodeType::Decision).unwrap();
        net.add_node(b.clone(), NodeType::Chance).unwrap();
        net.add_node(c.clone(), NodeType::Chance).unwrap();
        net.add_link("A", "B").unwrap();
        net.add_link("B", "C").unwrap();
        net.add_link("A", "C").unwrap();
        net.set_restriction("A", "B", TablePotential::restriction(&a, &b, &[(0, 0), (0, 1)]))
            .unwrap();
        let builder = DecisionTreeBuilder::new(&net);
        let mut without = net.clone();
        without.remove_node("A").unwrap();
        let (restricted, forced) = builder
            .restrict(&net, without, "A", &a.states()[1])
            .unwrap();
        assert!(forced.is_empty());
        assert!(!restricted.contains("B"));
        assert!(!restricted.contains("C"));
        assert_eq!(restricted.n(), 0);
    }
}
