//! The bounded model checking engine.
//!
//! Works on a predicate [`graph::Graph`]: trivially safe graphs are answered immediately, every
//! other graph goes through a [transition-system reduction][crate::trans] and an incremental SMT
//! unrolling. The engine asserts the initial predicate, then alternates pushing the query at the
//! current depth, checking, and asserting the next step of the transition. Only a satisfiable
//! query produces UNSAFE and only an unsatisfiable initial check produces SAFE, so verdicts stay
//! sound whatever the backend answers elsewhere.

crate::prelude!();

use std::path::PathBuf;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use num::ToPrimitive;
use rsmt2::SmtConf;

use graph::{Graph, NodeId, ENTRY, EXIT};
use result::{Trace, Verdict, Witness};
use term::{Cst, TermRef, Terms};
use trans::Sys;

pub mod trace;


/// A cooperative cancellation flag, cloneable and thread-safe.
///
/// The engine polls it before every SMT check and between unroll iterations; when set, solving
/// returns an unknown verdict flagged as cancelled. Timeouts are implemented by setting the flag
/// from outside, the engine owns no clock.
#[derive(Debug, Clone, Default)]
pub struct Cancel(Arc<AtomicBool>);
impl Cancel {
    /// Constructor, initially unset.
    pub fn new() -> Self {
        Self::default()
    }
    /// Sets the flag.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst)
    }
    /// True if the flag is set.
    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Engine options.
#[derive(Debug, Clone, Default)]
pub struct Options {
    /// Maximal number of unrollings, `None` for unbounded.
    pub max_unrollings: Option<usize>,
    /// Verbosity: `0` is silent, `1` reports verdicts, `2` reports every unrolling.
    pub verbosity: usize,
    /// Cooperative cancellation flag.
    pub cancel: Option<Cancel>,
    /// Mirrors the SMT dialogue to a file when set.
    pub tee: Option<PathBuf>,
}

/// Outcome of solving one transition system.
struct SysVerdict {
    /// `Left`: safe, with a witness formula. `Right`: unsafe, with the depth and the model
    /// trace. `None`: no conclusion.
    outcome: Option<Either<TermRef, (usize, Trace)>>,
    /// True if the run was cancelled.
    cancelled: bool,
}
impl SysVerdict {
    fn unknown(cancelled: bool) -> Self {
        Self {
            outcome: None,
            cancelled,
        }
    }
}

/// The bounded model checker.
pub struct Bmc {
    /// SMT solver configuration, one session is spawned per system.
    conf: SmtConf,
    /// Engine options.
    opts: Options,
}
impl Bmc {
    /// Constructor.
    pub fn new(conf: SmtConf, opts: Options) -> Self {
        Self { conf, opts }
    }

    /// Solves a predicate graph.
    ///
    /// Trivially safe graphs are answered without touching the backend. Otherwise the graph is
    /// reduced to a transition system (directly, through the linear product, or through the
    /// independent-components product) and unrolled; a graph that fits no reduction yields an
    /// unknown verdict.
    pub fn solve(&self, terms: &mut Terms, graph: &Graph) -> Res<Verdict> {
        if graph.is_trivial() {
            if self.opts.verbosity > 0 {
                println!("; bmc: no path from any fact to any query")
            }
            return Ok(Verdict::safe(terms.fls()));
        }

        if let Some(sys) = trans::of_single_loop(terms, graph)? {
            let res = self.solve_sys(terms, &sys)?;
            return Ok(translate_single_loop(terms, graph, res));
        }
        if let Some((sys, pc_nodes)) = trans::of_linear(terms, graph)? {
            let res = self.solve_sys(terms, &sys)?;
            return Ok(translate_linear(terms, res, &pc_nodes));
        }
        if let Some(sys) = trans::of_components(terms, graph)? {
            let res = self.solve_sys(terms, &sys)?;
            return Ok(translate_depth(terms, res));
        }

        Ok(Verdict::unknown(false))
    }

    /// True if the caller asked for cancellation.
    fn cancelled(&self) -> bool {
        self.opts.cancel.as_ref().map_or(false, Cancel::is_set)
    }

    /// Unrolls one transition system against the SMT backend.
    fn solve_sys(&self, terms: &mut Terms, sys: &Sys) -> Res<SysVerdict> {
        let mut solver = self
            .conf
            .clone()
            .spawn(trace::Parser)
            .chain_err(|| "while spawning the SMT solver")?;
        if let Some(path) = &self.opts.tee {
            solver.path_tee(path)?
        }
        let mut declared: Set<TermRef> = Set::new();

        solver.comment("initial states")?;
        declare_vars(&mut solver, terms, sys.init(), &mut declared)?;
        solver
            .assert(&terms.smt2(sys.init()))
            .chain_err(|| "while asserting the initial predicate")?;
        if self.cancelled() {
            solver.kill()?;
            return Ok(SysVerdict::unknown(true));
        }
        if let Some(false) = solver.check_sat_or_unk()? {
            // Empty initial states: safe, whatever the queries are.
            solver.kill()?;
            return Ok(SysVerdict {
                outcome: Some(Either::Left(terms.fls())),
                cancelled: false,
            });
        }

        let mut depth: Unroll = 0;
        loop {
            if let Some(max) = self.opts.max_unrollings {
                if depth >= max {
                    if self.opts.verbosity > 0 {
                        println!("; bmc: bound of {} unrolling(s) reached", max)
                    }
                    solver.kill()?;
                    return Ok(SysVerdict::unknown(false));
                }
            }
            if self.cancelled() {
                solver.kill()?;
                return Ok(SysVerdict::unknown(true));
            }

            let query = unroll::shift(terms, sys.query(), depth as i64);
            declare_vars(&mut solver, terms, query, &mut declared)?;
            solver.comment(&format!("query at depth {}", depth))?;
            solver.push(1)?;
            solver
                .assert(&terms.smt2(query))
                .chain_err(|| format!("while asserting the query at depth {}", depth))?;
            if let Some(true) = solver.check_sat_or_unk()? {
                if self.opts.verbosity > 0 {
                    println!("; bmc: falsification found at depth {}", depth)
                }
                // Read the model while the solver still holds it.
                let trace = match solver.get_model() {
                    Ok(model) => trace::trace_of_model(model),
                    Err(_) => Trace::new(),
                };
                solver.kill()?;
                return Ok(SysVerdict {
                    outcome: Some(Either::Right((depth, trace))),
                    cancelled: false,
                });
            }
            solver.pop(1)?;
            if self.opts.verbosity > 1 {
                println!("; bmc: no falsification at depth {}", depth)
            }

            let step = unroll::shift(terms, sys.step(), depth as i64);
            declare_vars(&mut solver, terms, step, &mut declared)?;
            solver.comment(&format!("step from {} to {}", depth, depth + 1))?;
            solver
                .assert(&terms.smt2(step))
                .chain_err(|| format!("while asserting the step at depth {}", depth))?;

            depth += 1
        }
    }
}

/// Declares the not-yet-declared variables of a formula.
///
/// Declarations happen outside of any push scope so that they survive the query pops.
fn declare_vars(
    solver: &mut trace::Solver,
    terms: &Terms,
    fla: TermRef,
    declared: &mut Set<TermRef>,
) -> Res<()> {
    for var in terms.vars_of(fla) {
        if declared.insert(var) {
            let typ = terms.typ_of(var);
            solver
                .declare_const(&terms.smt2_var(var), &terms.smt2_typ(typ))
                .chain_err(|| format!("while declaring variable `{}`", terms.var_id(var)))?
        }
    }
    Ok(())
}

/// Back-translation for the single-loop case: the depth becomes the unique entry-loop-exit path.
fn translate_single_loop(terms: &Terms, graph: &Graph, res: SysVerdict) -> Verdict {
    match res.outcome {
        None => Verdict::unknown(res.cancelled),
        Some(Either::Left(witness)) => Verdict::safe(witness),
        Some(Either::Right((depth, trace))) => {
            let (p_node, _) = graph
                .pred_nodes()
                .next()
                .expect("single-loop graphs have one predicate");
            let mut nodes = vec![ENTRY];
            nodes.extend(std::iter::repeat(p_node).take(depth + 1));
            nodes.push(EXIT);
            unsafe_verdict(terms, Witness::Path(nodes), trace)
        }
    }
}

/// Back-translation for the linear product: the counter trace is projected back to predicate
/// nodes; without a model the raw depth is reported.
fn translate_linear(terms: &Terms, res: SysVerdict, pc_nodes: &Map<i64, NodeId>) -> Verdict {
    match res.outcome {
        None => Verdict::unknown(res.cancelled),
        Some(Either::Left(witness)) => Verdict::safe(witness),
        Some(Either::Right((depth, trace))) => {
            let witness = match pc_path(&trace, depth, pc_nodes) {
                Some(nodes) => Witness::Path(nodes),
                None => Witness::Depth(depth),
            };
            unsafe_verdict(terms, witness, trace)
        }
    }
}

/// Back-translation for the independent-components product: no single path exists in the original
/// graph, the depth is the witness.
fn translate_depth(terms: &Terms, res: SysVerdict) -> Verdict {
    match res.outcome {
        None => Verdict::unknown(res.cancelled),
        Some(Either::Left(witness)) => Verdict::safe(witness),
        Some(Either::Right((depth, trace))) => {
            unsafe_verdict(terms, Witness::Depth(depth), trace)
        }
    }
}

fn unsafe_verdict(_terms: &Terms, witness: Witness, trace: Trace) -> Verdict {
    Verdict {
        answer: result::Answer::Unsafe,
        witness,
        trace: if trace.is_empty() { None } else { Some(trace) },
        cancelled: false,
    }
}

/// Projects the program-counter assignments of a trace onto predicate nodes.
fn pc_path(trace: &Trace, depth: usize, pc_nodes: &Map<i64, NodeId>) -> Option<Vec<NodeId>> {
    let mut nodes = vec![ENTRY];
    for step in 0..=depth as i64 {
        let at = match trace.value(step, trans::PC)? {
            Cst::I(i) => i.to_i64()?,
            _ => return None,
        };
        nodes.push(*pc_nodes.get(&at)?)
    }
    nodes.push(EXIT);
    Some(nodes)
}
