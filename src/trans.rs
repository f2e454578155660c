//! Transition systems and the reductions that produce them from a predicate graph.
//!
//! A transition system is composed of
//!
//! - the *state variables*, step-0 canonical variables,
//! - an *initial* predicate over the state variables,
//! - a *step* predicate over the state variables and their step-1 renaming,
//! - a *query* predicate over the state variables, unsatisfiable along every run iff the system
//!   is safe.
//!
//! Three reductions build systems out of a graph: a single predicate with one self-loop maps
//! directly; a general linear graph goes through a program-counter product; independent
//! single-loop components joined only by query hyperedges go through an interleaving product.
//! Edge labels are cleaned with trivial quantifier elimination over their edge-local auxiliaries
//! on the way in.

crate::prelude!();

use graph::{Graph, NodeId, ENTRY, EXIT};
use term::{TermRef, Terms, Typ};

/// Base name of the program-counter variable introduced by the linear product.
pub const PC: &str = "!pc";

/// A transition system.
#[derive(Debug, Clone)]
pub struct Sys {
    /// State variables, at step 0.
    vars: Vec<TermRef>,
    /// Initial predicate, over the state variables.
    init: TermRef,
    /// Step predicate, over the state variables and their step-1 renaming.
    step: TermRef,
    /// Query predicate, over the state variables.
    query: TermRef,
}
impl Sys {
    /// Constructor.
    pub fn new(vars: Vec<TermRef>, init: TermRef, step: TermRef, query: TermRef) -> Self {
        Self {
            vars,
            init,
            step,
            query,
        }
    }

    /// State variable accessor.
    pub fn vars(&self) -> &[TermRef] {
        &self.vars
    }
    /// Initial predicate accessor.
    pub fn init(&self) -> TermRef {
        self.init
    }
    /// Step predicate accessor.
    pub fn step(&self) -> TermRef {
        self.step
    }
    /// Query predicate accessor.
    pub fn query(&self) -> TermRef {
        self.query
    }

    /// Pretty, multi-line string representation of the system.
    pub fn to_ml_string(&self, terms: &Terms) -> String {
        let mut s = String::from("vars:");
        for var in &self.vars {
            s.push(' ');
            s.push_str(terms.var_id(*var));
        }
        s.push_str("\ninit:\n    ");
        s.push_str(&terms.display(self.init).to_string());
        s.push_str("\nstep:\n    ");
        s.push_str(&terms.display(self.step).to_string());
        s.push_str("\nquery:\n    ");
        s.push_str(&terms.display(self.query).to_string());
        s
    }
}

/// Eliminates the edge-local auxiliaries of a label: every variable outside `keep`.
fn clean_label(terms: &mut Terms, label: TermRef, keep: &Set<TermRef>) -> Res<TermRef> {
    let aux: Vec<TermRef> = terms
        .vars_of(label)
        .into_iter()
        .filter(|v| !keep.contains(v))
        .collect();
    qe::eliminate_vars(terms, &aux, label)
}

/// Disjoins labels after simplification.
fn disjoin(terms: &mut Terms, labels: Vec<TermRef>) -> Res<TermRef> {
    let simple = arith::simplify_disjunction(terms, &labels);
    terms.or(simple)
}

/// Reduces a graph made of one predicate with entry edges, exactly one linear self-loop and exit
/// edges. `None` when the graph has another shape.
pub fn of_single_loop(terms: &mut Terms, graph: &Graph) -> Res<Option<Sys>> {
    let preds: Vec<(NodeId, term::FunRef)> = graph.pred_nodes().collect();
    if preds.len() != 1 {
        return Ok(None);
    }
    let (p_node, p) = preds[0];

    let mut entries = vec![];
    let mut loops = vec![];
    let mut exits = vec![];
    for (_, edge) in graph.edges() {
        if edge.sources == [ENTRY] && edge.target == p_node {
            entries.push(edge.label)
        } else if edge.sources == [p_node] && edge.target == p_node {
            loops.push(edge.label)
        } else if edge.sources == [p_node] && edge.target == EXIT {
            exits.push(edge.label)
        } else {
            return Ok(None);
        }
    }
    if entries.is_empty() || exits.is_empty() || loops.len() != 1 {
        return Ok(None);
    }

    let state = graph.canon().state_vars(terms, p);
    let next = graph.canon().next_vars(terms, p);
    let state_set: Set<TermRef> = state.iter().copied().collect();
    let next_set: Set<TermRef> = next.iter().copied().collect();
    let both: Set<TermRef> = state_set.union(&next_set).copied().collect();

    let mut init_disjs = vec![];
    for label in entries {
        let cleaned = clean_label(terms, label, &next_set)?;
        init_disjs.push(unroll::shift(terms, cleaned, -1))
    }
    let init = disjoin(terms, init_disjs)?;

    let step = clean_label(terms, loops[0], &both)?;

    let mut query_disjs = vec![];
    for label in exits {
        query_disjs.push(clean_label(terms, label, &state_set)?)
    }
    let query = disjoin(terms, query_disjs)?;

    Ok(Some(Sys::new(state, init, step, query)))
}

/// Reduces a general linear graph to a single loop by product construction.
///
/// A fresh program-counter variable tracks the active predicate; every edge becomes a case of the
/// step (or init, or query) disjunction, guarded by the counter. Also returns the map from
/// counter values back to predicate nodes, used to project counterexamples. `None` when the graph
/// is not linear, has no predicate, or has a direct entry-to-exit edge.
pub fn of_linear(terms: &mut Terms, graph: &Graph) -> Res<Option<(Sys, Map<i64, NodeId>)>> {
    let preds: Vec<(NodeId, term::FunRef)> = graph.pred_nodes().collect();
    if preds.is_empty() {
        return Ok(None);
    }
    for (_, edge) in graph.edges() {
        if edge.sources.len() != 1 || (edge.sources == [ENTRY] && edge.target == EXIT) {
            return Ok(None);
        }
    }

    let pc0 = terms.var(format!("{}{}0", PC, unroll::STEP_SEP), Typ::Int);
    let pc1 = terms.var(format!("{}{}1", PC, unroll::STEP_SEP), Typ::Int);
    let mut index: Map<NodeId, i64> = Map::new();
    let mut pc_nodes: Map<i64, NodeId> = Map::new();
    for (pos, (node, _)) in preds.iter().enumerate() {
        let idx = pos as i64 + 1;
        index.insert(*node, idx);
        pc_nodes.insert(idx, *node);
    }
    let state_of = |graph: &Graph, terms: &Terms, node: NodeId| -> Set<TermRef> {
        match graph.node(node) {
            graph::Node::Pred(fun) => graph.canon().state_vars(terms, fun).into_iter().collect(),
            graph::Node::Entry | graph::Node::Exit => Set::new(),
        }
    };
    let next_of = |graph: &Graph, terms: &Terms, node: NodeId| -> Set<TermRef> {
        match graph.node(node) {
            graph::Node::Pred(fun) => graph.canon().next_vars(terms, fun).into_iter().collect(),
            graph::Node::Entry | graph::Node::Exit => Set::new(),
        }
    };

    let mut init_disjs = vec![];
    let mut step_disjs = vec![];
    let mut query_disjs = vec![];
    let edges: Vec<graph::Edge> = graph.edges().map(|(_, e)| e.clone()).collect();
    for edge in edges {
        let src = edge.sources[0];
        if src == ENTRY {
            let keep = next_of(graph, terms, edge.target);
            let cleaned = clean_label(terms, edge.label, &keep)?;
            let shifted = unroll::shift(terms, cleaned, -1);
            let at = terms.int(index[&edge.target]);
            let guard = terms.eq(pc0, at)?;
            init_disjs.push(terms.and(vec![guard, shifted])?)
        } else if edge.target == EXIT {
            let keep = state_of(graph, terms, src);
            let cleaned = clean_label(terms, edge.label, &keep)?;
            let at = terms.int(index[&src]);
            let guard = terms.eq(pc0, at)?;
            query_disjs.push(terms.and(vec![guard, cleaned])?)
        } else {
            let keep: Set<TermRef> = state_of(graph, terms, src)
                .union(&next_of(graph, terms, edge.target))
                .copied()
                .collect();
            let cleaned = clean_label(terms, edge.label, &keep)?;
            let from = terms.int(index[&src]);
            let to = terms.int(index[&edge.target]);
            let guard_from = terms.eq(pc0, from)?;
            let guard_to = terms.eq(pc1, to)?;
            step_disjs.push(terms.and(vec![guard_from, guard_to, cleaned])?)
        }
    }

    let init = disjoin(terms, init_disjs)?;
    let step = disjoin(terms, step_disjs)?;
    let query = disjoin(terms, query_disjs)?;

    let mut vars = vec![pc0];
    for (_, fun) in &preds {
        vars.extend(graph.canon().state_vars(terms, *fun))
    }

    Ok(Some((Sys::new(vars, init, step, query), pc_nodes)))
}

/// Reduces independent single-loop components joined only by query hyperedges.
///
/// Requires every non-query edge to be an entry edge or a self-loop, and every query to touch
/// pairwise-distinct predicates. The components share no variables, so the interleaving product
/// (one component steps, the others are framed) reaches exactly the cross product of the
/// component-wise reachable states. `None` when the graph has another shape.
pub fn of_components(terms: &mut Terms, graph: &Graph) -> Res<Option<Sys>> {
    let mut entries: Map<NodeId, Vec<TermRef>> = Map::new();
    let mut loops: Map<NodeId, Vec<TermRef>> = Map::new();
    let mut queries = vec![];
    for (_, edge) in graph.edges() {
        if edge.target == EXIT {
            if edge.sources.contains(&ENTRY) {
                return Ok(None);
            }
            queries.push(edge.clone())
        } else if edge.sources == [ENTRY] {
            entries.entry(edge.target).or_default().push(edge.label)
        } else if edge.sources == [edge.target] {
            loops.entry(edge.target).or_default().push(edge.label)
        } else {
            // A cross edge or a hyperedge into a predicate: components are not independent.
            return Ok(None);
        }
    }

    for query in &queries {
        let mut seen = Set::new();
        for src in &query.sources {
            if !seen.insert(*src) {
                return Ok(None);
            }
        }
    }

    // Queries over a component without facts can never fire.
    queries.retain(|q| q.sources.iter().all(|src| entries.contains_key(src)));
    if queries.is_empty() {
        return Ok(None);
    }
    let mut used: Vec<NodeId> = vec![];
    for query in &queries {
        for src in &query.sources {
            if !used.contains(src) {
                used.push(*src)
            }
        }
    }
    used.sort();

    let fun_of_node = |graph: &Graph, node: NodeId| match graph.node(node) {
        graph::Node::Pred(fun) => fun,
        graph::Node::Entry | graph::Node::Exit => {
            panic!("query source is not a predicate node")
        }
    };

    let mut init_conjs = vec![];
    let mut comp_steps: Map<NodeId, TermRef> = Map::new();
    for node in &used {
        let fun = fun_of_node(graph, *node);
        let state: Set<TermRef> = graph.canon().state_vars(terms, fun).into_iter().collect();
        let next: Set<TermRef> = graph.canon().next_vars(terms, fun).into_iter().collect();
        let both: Set<TermRef> = state.union(&next).copied().collect();

        let mut init_disjs = vec![];
        for label in entries.get(node).expect("filtered on entries").clone() {
            let cleaned = clean_label(terms, label, &next)?;
            init_disjs.push(unroll::shift(terms, cleaned, -1))
        }
        init_conjs.push(disjoin(terms, init_disjs)?);

        let mut step_disjs = vec![];
        for label in loops.get(node).cloned().unwrap_or_default() {
            step_disjs.push(clean_label(terms, label, &both)?)
        }
        if !step_disjs.is_empty() {
            comp_steps.insert(*node, disjoin(terms, step_disjs)?);
        }
    }
    let init = terms.and(init_conjs)?;

    let mut step_disjs = vec![];
    for node in &used {
        let comp_step = match comp_steps.get(node) {
            Some(step) => *step,
            None => continue,
        };
        // The active component steps, every other one is framed.
        let mut conjs = vec![comp_step];
        for other in &used {
            if other == node {
                continue;
            }
            let fun = fun_of_node(graph, *other);
            for var in graph.canon().state_vars(terms, fun) {
                let nxt = unroll::shift_var(terms, var, 1);
                conjs.push(terms.eq(nxt, var)?)
            }
        }
        step_disjs.push(terms.and(conjs)?)
    }
    let step = disjoin(terms, step_disjs)?;

    let mut query_disjs = vec![];
    for query in &queries {
        let mut keep = Set::new();
        for src in &query.sources {
            let fun = fun_of_node(graph, *src);
            keep.extend(graph.canon().state_vars(terms, fun))
        }
        query_disjs.push(clean_label(terms, query.label, &keep)?)
    }
    let query = disjoin(terms, query_disjs)?;

    let mut vars = vec![];
    for node in &used {
        let fun = fun_of_node(graph, *node);
        vars.extend(graph.canon().state_vars(terms, fun))
    }

    Ok(Some(Sys::new(vars, init, step, query)))
}

#[cfg(test)]
mod test {
    use crate::build;
    use crate::term::{Terms, Typ};

    /// The counter system: `Inv(0)`, `Inv(x) /\ x' = x + 1 => Inv(x')`,
    /// `Inv(x) /\ x < 0 => false`.
    fn counter_graph(terms: &mut Terms) -> crate::graph::Graph {
        let inv = terms.declare_fun("Inv", vec![Typ::Int], Typ::Bool).unwrap();
        let x = terms.var("x", Typ::Int);
        let xp = terms.var("xp", Typ::Int);
        let zero = terms.int(0);
        let mut system = crate::chc::System::new();
        system.add_predicate(inv);
        let inv_x = terms.fun_app(inv, vec![x]).unwrap();
        let inv_xp = terms.fun_app(inv, vec![xp]).unwrap();
        let fact = terms.eq(x, zero).unwrap();
        system.add_clause(terms, inv_x, fact, vec![]).unwrap();
        let step = build!(terms, (= (xp: int) (+ (x: int) 1)));
        system.add_clause(terms, inv_xp, step, vec![inv_x]).unwrap();
        let bad = build!(terms, (< (x: int) 0));
        let fls = terms.fls();
        system.add_clause(terms, fls, bad, vec![inv_x]).unwrap();
        let normal = crate::chc::normalize(terms, &system).unwrap();
        crate::graph::build(terms, normal).unwrap()
    }

    #[test]
    fn single_loop_reduction() {
        let mut terms = Terms::new();
        let graph = counter_graph(&mut terms);
        let sys = super::of_single_loop(&mut terms, &graph)
            .unwrap()
            .expect("the counter system is a single loop");

        assert_eq!(sys.vars().len(), 1);
        assert_eq!(terms.var_id(sys.vars()[0]), "Inv!0##0");
        assert_eq!(terms.display(sys.init()).to_string(), "(= Inv!0##0 0)");
        assert_eq!(
            terms.display(sys.step()).to_string(),
            "(= Inv!0##1 (+ Inv!0##0 1))"
        );
        assert_eq!(terms.display(sys.query()).to_string(), "(< Inv!0##0 0)");
    }

    #[test]
    fn two_predicates_are_not_a_single_loop() {
        let mut terms = Terms::new();
        let p = terms.declare_fun("P", vec![Typ::Int], Typ::Bool).unwrap();
        let q = terms.declare_fun("Q", vec![Typ::Int], Typ::Bool).unwrap();
        let x = terms.var("x", Typ::Int);
        let zero = terms.int(0);
        let mut system = crate::chc::System::new();
        system.add_predicate(p);
        system.add_predicate(q);
        let p_x = terms.fun_app(p, vec![x]).unwrap();
        let q_x = terms.fun_app(q, vec![x]).unwrap();
        let fact = terms.eq(x, zero).unwrap();
        let tru = terms.tru();
        let fls = terms.fls();
        system.add_clause(&terms, p_x, fact, vec![]).unwrap();
        system.add_clause(&terms, q_x, tru, vec![p_x]).unwrap();
        system.add_clause(&terms, fls, tru, vec![q_x]).unwrap();
        let normal = crate::chc::normalize(&mut terms, &system).unwrap();
        let graph = crate::graph::build(&terms, normal).unwrap();

        assert!(super::of_single_loop(&mut terms, &graph).unwrap().is_none());
        let (sys, pc_nodes) = super::of_linear(&mut terms, &graph)
            .unwrap()
            .expect("a linear chain reduces through the counter product");
        assert_eq!(pc_nodes.len(), 2);
        // The counter plus one state variable per predicate.
        assert_eq!(sys.vars().len(), 3);
        assert_eq!(terms.var_id(sys.vars()[0]), "!pc##0");
    }

    #[test]
    fn loop_free_graphs_reduce_with_a_false_step() {
        let mut terms = Terms::new();
        let inv = terms.declare_fun("Inv", vec![Typ::Int], Typ::Bool).unwrap();
        let x = terms.var("x", Typ::Int);
        let zero = terms.int(0);
        let mut system = crate::chc::System::new();
        system.add_predicate(inv);
        let inv_zero = terms.fun_app(inv, vec![zero]).unwrap();
        let inv_x = terms.fun_app(inv, vec![x]).unwrap();
        let tru = terms.tru();
        let fls = terms.fls();
        system.add_clause(&terms, inv_zero, tru, vec![]).unwrap();
        system.add_clause(&terms, fls, tru, vec![inv_x]).unwrap();
        let normal = crate::chc::normalize(&mut terms, &system).unwrap();
        let graph = crate::graph::build(&terms, normal).unwrap();

        // No self-loop: not a single-loop system, but the product handles it.
        assert!(super::of_single_loop(&mut terms, &graph).unwrap().is_none());
        let (sys, _) = super::of_linear(&mut terms, &graph).unwrap().unwrap();
        assert_eq!(sys.step(), terms.fls());
    }

    #[test]
    fn independent_components_reduce() {
        let mut terms = Terms::new();
        let graph = independent_graph(&mut terms);
        assert!(super::of_single_loop(&mut terms, &graph).unwrap().is_none());
        assert!(super::of_linear(&mut terms, &graph).unwrap().is_none());
        let sys = super::of_components(&mut terms, &graph)
            .unwrap()
            .expect("independent counters reduce through the interleaving product");
        assert_eq!(sys.vars().len(), 2);
        // Both components are initialized together.
        assert_eq!(
            terms.display(sys.init()).to_string(),
            "(and (= Invx!0##0 0) (= Invy!0##0 0))"
        );
    }

    /// Two independent counters and a joint query.
    fn independent_graph(terms: &mut Terms) -> crate::graph::Graph {
        let invx = terms
            .declare_fun("Invx", vec![Typ::Int], Typ::Bool)
            .unwrap();
        let invy = terms
            .declare_fun("Invy", vec![Typ::Int], Typ::Bool)
            .unwrap();
        let x = terms.var("x", Typ::Int);
        let xp = terms.var("xp", Typ::Int);
        let y = terms.var("y", Typ::Int);
        let yp = terms.var("yp", Typ::Int);
        let zero = terms.int(0);
        let mut system = crate::chc::System::new();
        system.add_predicate(invx);
        system.add_predicate(invy);
        let invx_x = terms.fun_app(invx, vec![x]).unwrap();
        let invx_xp = terms.fun_app(invx, vec![xp]).unwrap();
        let invy_y = terms.fun_app(invy, vec![y]).unwrap();
        let invy_yp = terms.fun_app(invy, vec![yp]).unwrap();
        let x_zero = terms.eq(x, zero).unwrap();
        let y_zero = terms.eq(y, zero).unwrap();
        system.add_clause(terms, invx_x, x_zero, vec![]).unwrap();
        let x_step = build!(terms, (= (xp: int) (+ (x: int) 1)));
        system
            .add_clause(terms, invx_xp, x_step, vec![invx_x])
            .unwrap();
        system.add_clause(terms, invy_y, y_zero, vec![]).unwrap();
        let y_step = build!(terms, (= (yp: int) (+ (y: int) 1)));
        system
            .add_clause(terms, invy_yp, y_step, vec![invy_y])
            .unwrap();
        let bad = build!(terms, (< (+ (x: int) (y: int)) 0));
        let fls = terms.fls();
        system
            .add_clause(terms, fls, bad, vec![invx_x, invy_y])
            .unwrap();
        let normal = crate::chc::normalize(terms, &system).unwrap();
        crate::graph::build(terms, normal).unwrap()
    }
}
