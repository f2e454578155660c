//! Verdicts, witnesses and counterexample traces.

crate::prelude!();

use graph::NodeId;
use term::{Cst, TermRef, Terms};

/// The answer of an engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Answer {
    /// An interpretation of every predicate satisfying all clauses exists.
    Safe,
    /// A derivation of `false` exists.
    Unsafe,
    /// The engine cannot conclude.
    Unknown,
}
impl fmt::Display for Answer {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        match self {
            // SMT-LIB convention: an unsafe system has a satisfiable refutation.
            Self::Safe => write!(fmt, "unsat"),
            Self::Unsafe => write!(fmt, "sat"),
            Self::Unknown => write!(fmt, "unknown"),
        }
    }
}

/// What backs up a verdict.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Witness {
    /// Nothing, for unknown verdicts.
    None,
    /// A formula, for safe verdicts (`false` when the initial states are empty).
    Formula(TermRef),
    /// An unrolling depth at which the query is satisfiable.
    Depth(usize),
    /// A counterexample path through the predicate graph, entry to exit.
    Path(Vec<NodeId>),
}

/// A counterexample trace: values of the stepped variables, per step and base name.
#[derive(Debug, Clone, Default)]
pub struct Trace {
    /// Step to (base name to value).
    pub steps: Map<i64, Map<String, Cst>>,
}
impl Trace {
    /// Constructor.
    pub fn new() -> Self {
        Self::default()
    }

    /// True if the trace holds no assignment.
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Inserts a value for a variable base name at some step.
    pub fn insert(&mut self, step: i64, base: impl Into<String>, cst: Cst) {
        self.steps.entry(step).or_default().insert(base.into(), cst);
    }

    /// The value of a variable base name at some step.
    pub fn value(&self, step: i64, base: &str) -> Option<&Cst> {
        self.steps.get(&step).and_then(|vals| vals.get(base))
    }
}

/// The outcome of solving a system.
#[derive(Debug, Clone)]
pub struct Verdict {
    /// The answer.
    pub answer: Answer,
    /// Its witness.
    pub witness: Witness,
    /// A counterexample trace, for unsafe verdicts when the backend produced a model.
    pub trace: Option<Trace>,
    /// True if the verdict results from cooperative cancellation.
    pub cancelled: bool,
}
impl Verdict {
    /// A safe verdict backed by a formula.
    pub fn safe(witness: TermRef) -> Self {
        Self {
            answer: Answer::Safe,
            witness: Witness::Formula(witness),
            trace: None,
            cancelled: false,
        }
    }

    /// An unknown verdict.
    pub fn unknown(cancelled: bool) -> Self {
        Self {
            answer: Answer::Unknown,
            witness: Witness::None,
            trace: None,
            cancelled,
        }
    }

    /// Pretty multi-line rendering of the verdict.
    pub fn to_ml_string(&self, terms: &Terms, graph: &graph::Graph) -> String {
        let mut s = self.answer.to_string();
        match &self.witness {
            Witness::None => (),
            Witness::Formula(fla) => {
                s.push_str("\n; safety witness: ");
                s.push_str(&terms.display(*fla).to_string())
            }
            Witness::Depth(depth) => s.push_str(&format!("\n; falsified at depth {}", depth)),
            Witness::Path(nodes) => {
                s.push_str("\n; counterexample path:");
                for node in nodes {
                    s.push(' ');
                    s.push_str(&graph.node_name(*node, terms))
                }
            }
        }
        s
    }
}
