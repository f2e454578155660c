//! A verification core for constrained Horn clauses (CHC).
//!
//! A CHC system encodes safety-verification obligations as implications over uninterpreted
//! relational predicates and a first-order background theory (linear real/integer arithmetic and
//! boolean equality). This crate decides whether such a system is *safe* (every predicate has an
//! interpretation satisfying all clauses), *unsafe* (a derivation of `false` exists), or gives up
//! with *unknown*.
//!
//! The pipeline, leaves first:
//!
//! - [`term`]: hash-consed terms owned by a [`term::Terms`] arena;
//! - [`rewrite`]: a memoizing bottom-up rewriter, substitution, negation normal form;
//! - [`unroll`]: variable stepping, the `v##k` renaming that unrolls formulas through time;
//! - [`juncts`], [`arith`], [`qe`]: top-level junct extraction, linear-arithmetic utilities and
//!   trivial quantifier elimination over top-level equalities;
//! - [`chc`]: clause systems and their normalization to canonical predicate applications;
//! - [`graph`]: the directed (hyper)graph of a normalized system;
//! - [`trans`]: transition systems and the reductions that produce them from a graph;
//! - [`bmc`]: the bounded model checking engine, an [`rsmt2`] client;
//! - [`result`]: verdicts, witnesses and counterexample traces.
//!
//! Solving a system built in memory:
//!
//! ```rust,no_run
//! use horncheck::{bmc, chc, graph, term::{Op, Terms, Typ}};
//!
//! # fn main() -> horncheck::prelude::Res<()> {
//! let mut terms = Terms::new();
//! let inv = terms.declare_fun("Inv", vec![Typ::Int], Typ::Bool)?;
//! let x = terms.var("x", Typ::Int);
//! let zero = terms.int(0);
//!
//! let mut system = chc::System::new();
//! system.add_predicate(inv);
//! // x = 0 => Inv(x)
//! let head = terms.fun_app(inv, vec![x])?;
//! let fact = terms.eq(x, zero)?;
//! system.add_clause(&terms, head, fact, vec![])?;
//! // Inv(x) /\ x < 0 => false
//! let bad = terms.app(Op::Lt, vec![x, zero])?;
//! let inv_x = terms.fun_app(inv, vec![x])?;
//! let fls = terms.fls();
//! system.add_clause(&terms, fls, bad, vec![inv_x])?;
//!
//! let normal = chc::normalize(&mut terms, &system)?;
//! let graph = graph::build(&terms, normal)?;
//! let verdict = bmc::Bmc::new(rsmt2::SmtConf::default_z3(), bmc::Options::default())
//!     .solve(&mut terms, &graph)?;
//! println!("{}", verdict.answer);
//! # Ok(())
//! # }
//! ```

#![forbid(missing_docs)]

pub extern crate rsmt2;

mod macros;

pub mod prelude;

pub mod arith;
pub mod bmc;
pub mod chc;
pub mod graph;
pub mod juncts;
pub mod qe;
pub mod result;
pub mod rewrite;
pub mod term;
pub mod trans;
pub mod unroll;
