//! The directed (hyper)graph of a normalized CHC system.
//!
//! Nodes are the predicate symbols plus the distinguished `Entry` (source of facts) and `Exit`
//! (target of queries). Every clause becomes one edge; clauses with several body predicates
//! become hyperedges. Edge labels are expressed over the canonical state variables of the sources
//! and the canonical next-state variables of the target, plus edge-unique auxiliaries.

crate::prelude!();

use chc::{Canon, Normal};
use term::{FunRef, TermRef, Terms};

/// A node handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

/// The entry node, source of all facts.
pub const ENTRY: NodeId = NodeId(0);
/// The exit node, target of all queries.
pub const EXIT: NodeId = NodeId(1);

/// An edge handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EdgeId(u32);

/// A node: entry, exit, or a predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Node {
    /// Source of facts.
    Entry,
    /// Target of queries.
    Exit,
    /// A predicate symbol.
    Pred(FunRef),
}

/// An edge: a normalized clause.
#[derive(Debug, Clone)]
pub struct Edge {
    /// Source nodes; `[ENTRY]` for facts, several nodes for hyperedges.
    pub sources: Vec<NodeId>,
    /// Target node; `EXIT` for queries.
    pub target: NodeId,
    /// Label: the clause constraint over canonical and edge-local variables.
    pub label: TermRef,
}
impl Edge {
    /// True if the edge has at most one predicate source.
    pub fn is_linear(&self) -> bool {
        self.sources.iter().filter(|n| **n != ENTRY).count() <= 1
    }
}

/// The predicate graph of a normalized system.
#[derive(Debug, Clone)]
pub struct Graph {
    canon: Canon,
    nodes: Vec<Node>,
    edges: Vec<Edge>,
    node_ids: Map<FunRef, NodeId>,
}

/// Builds the graph of a normalized system.
///
/// Facts become edges from [`ENTRY`], queries edges into [`EXIT`]. Parallel clauses yield
/// parallel edges, they are never merged.
pub fn build(terms: &Terms, normal: Normal) -> Res<Graph> {
    let Normal { system, canon } = normal;

    let mut nodes = vec![Node::Entry, Node::Exit];
    let mut node_ids = Map::new();
    for pred in system.predicates() {
        let id = NodeId(nodes.len() as u32);
        nodes.push(Node::Pred(*pred));
        node_ids.insert(*pred, id);
    }

    let mut edges = vec![];
    for clause in system.clauses() {
        let sources = if clause.is_fact() {
            vec![ENTRY]
        } else {
            clause
                .body
                .iter()
                .map(|app| {
                    let fun = terms.fun_of(*app).ok_or_else(|| {
                        crate::prelude::invalid_input(format!(
                            "normalized body element `{}` is not a predicate application",
                            terms.display(*app)
                        ))
                    })?;
                    Ok(node_ids[&fun])
                })
                .collect::<Res<Vec<_>>>()?
        };
        let target = if clause.is_query(terms) {
            EXIT
        } else {
            let fun = terms.fun_of(clause.head).ok_or_else(|| {
                crate::prelude::invalid_input(format!(
                    "normalized head `{}` is not a predicate application",
                    terms.display(clause.head)
                ))
            })?;
            node_ids[&fun]
        };
        edges.push(Edge {
            sources,
            target,
            label: clause.constraint,
        })
    }

    Ok(Graph {
        canon,
        nodes,
        edges,
        node_ids,
    })
}

impl Graph {
    /// The canonical predicate representation.
    pub fn canon(&self) -> &Canon {
        &self.canon
    }

    /// The node behind a handle.
    pub fn node(&self, id: NodeId) -> Node {
        self.nodes[id.0 as usize]
    }

    /// Human-readable name of a node.
    pub fn node_name(&self, id: NodeId, terms: &Terms) -> String {
        match self.node(id) {
            Node::Entry => "entry".into(),
            Node::Exit => "exit".into(),
            Node::Pred(fun) => terms.fun_name(fun).into(),
        }
    }

    /// The node of a predicate, if the predicate is in the graph.
    pub fn node_of(&self, pred: FunRef) -> Option<NodeId> {
        self.node_ids.get(&pred).copied()
    }

    /// All predicate nodes, in declaration order.
    pub fn pred_nodes(&self) -> impl Iterator<Item = (NodeId, FunRef)> + '_ {
        self.nodes
            .iter()
            .enumerate()
            .filter_map(|(idx, node)| match node {
                Node::Pred(fun) => Some((NodeId(idx as u32), *fun)),
                Node::Entry | Node::Exit => None,
            })
    }

    /// All edges with their handles.
    pub fn edges(&self) -> impl Iterator<Item = (EdgeId, &Edge)> + '_ {
        self.edges
            .iter()
            .enumerate()
            .map(|(idx, edge)| (EdgeId(idx as u32), edge))
    }

    /// The edge behind a handle.
    pub fn edge(&self, id: EdgeId) -> &Edge {
        &self.edges[id.0 as usize]
    }

    /// Edges targeting a node.
    pub fn in_edges(&self, node: NodeId) -> impl Iterator<Item = &Edge> + '_ {
        self.edges.iter().filter(move |e| e.target == node)
    }
    /// Edges with a node among their sources.
    pub fn out_edges(&self, node: NodeId) -> impl Iterator<Item = &Edge> + '_ {
        self.edges.iter().filter(move |e| e.sources.contains(&node))
    }

    /// True if every edge is linear.
    pub fn is_linear(&self) -> bool {
        self.edges.iter().all(Edge::is_linear)
    }

    /// Hyper-reachability from [`ENTRY`]: a hyperedge fires once all of its sources are reached.
    ///
    /// Over-approximates derivability (labels are ignored), so an unreached [`EXIT`] proves
    /// safety.
    pub fn reaches_exit(&self) -> bool {
        let mut reached: Set<NodeId> = Set::new();
        reached.insert(ENTRY);
        let mut changed = true;
        while changed {
            changed = false;
            for edge in &self.edges {
                if edge.sources.iter().all(|s| reached.contains(s))
                    && reached.insert(edge.target)
                {
                    changed = true
                }
            }
        }
        reached.contains(&EXIT)
    }

    /// True if no fact can flow into a query: the system is safe by reachability alone.
    pub fn is_trivial(&self) -> bool {
        !self.reaches_exit()
    }
}

#[cfg(test)]
mod test {
    use crate::term::{Terms, Typ};

    fn two_pred_graph(terms: &mut Terms, with_query: bool) -> super::Graph {
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
        system.add_clause(terms, p_x, fact, vec![]).unwrap();
        let tru = terms.tru();
        system.add_clause(terms, q_x, tru, vec![p_x]).unwrap();
        if with_query {
            let fls = terms.fls();
            system.add_clause(terms, fls, tru, vec![q_x]).unwrap();
        }

        let normal = crate::chc::normalize(terms, &system).unwrap();
        super::build(terms, normal).unwrap()
    }

    #[test]
    fn facts_and_queries_use_entry_and_exit() {
        let mut terms = Terms::new();
        let graph = two_pred_graph(&mut terms, true);
        let edges: Vec<_> = graph.edges().map(|(_, e)| e.clone()).collect();
        assert_eq!(edges.len(), 3);
        assert_eq!(edges[0].sources, vec![super::ENTRY]);
        assert_eq!(edges[2].target, super::EXIT);
        assert!(graph.is_linear());
    }

    #[test]
    fn reachability_sees_the_query() {
        let mut terms = Terms::new();
        let graph = two_pred_graph(&mut terms, true);
        assert!(graph.reaches_exit());
        assert!(!graph.is_trivial());
    }

    #[test]
    fn no_query_means_trivially_safe() {
        let mut terms = Terms::new();
        let graph = two_pred_graph(&mut terms, false);
        assert!(!graph.reaches_exit());
        assert!(graph.is_trivial());
    }

    #[test]
    fn hyperedges_need_all_sources() {
        let mut terms = Terms::new();
        let p = terms.declare_fun("P", vec![], Typ::Bool).unwrap();
        let q = terms.declare_fun("Q", vec![], Typ::Bool).unwrap();
        let mut system = crate::chc::System::new();
        system.add_predicate(p);
        system.add_predicate(q);
        let p_app = terms.fun_app(p, vec![]).unwrap();
        let q_app = terms.fun_app(q, vec![]).unwrap();
        let tru = terms.tru();
        let fls = terms.fls();
        // P is derivable, Q is not; the query needs both.
        system.add_clause(&terms, p_app, tru, vec![]).unwrap();
        system
            .add_clause(&terms, fls, tru, vec![p_app, q_app])
            .unwrap();
        let normal = crate::chc::normalize(&mut terms, &system).unwrap();
        let graph = super::build(&terms, normal).unwrap();
        assert!(graph.is_trivial());
    }
}
