//! Tests over rewriting, substitution and NNF.

crate::prelude!();

use crate::build;
use rewrite::{Rewrite, Subst};
use term::{Op, TermRef, Terms};

/// Counts how many times the engine calls `rewrite`.
struct Counting {
    calls: usize,
}
impl Rewrite for Counting {
    fn rewrite(&mut self, _terms: &mut Terms, t: TermRef) -> TermRef {
        self.calls += 1;
        t
    }
}

#[test]
fn each_distinct_subterm_is_visited_once() {
    let mut terms = Terms::new();
    // `(+ x 1)` is shared between both sides.
    let fla = build!(terms, (< (* (+ (x: int) 1) 2) (* (+ (x: int) 1) 3)));
    let mut cfg = Counting { calls: 0 };
    let out = rewrite::rewrite(&mut terms, &mut cfg, fla);
    assert_eq!(out, fla);
    // Distinct subterms: fla, both products, the shared sum, x, 1, 2, 3.
    assert_eq!(cfg.calls, 8);
}

#[test]
fn substitution_replaces_variables() {
    let mut terms = Terms::new();
    let fla = build!(terms, (and (>= (x: int) 0) (= (y: int) (x: int))));
    let x = build!(terms, (x: int));
    let image = build!(terms, (+ (z: int) 1));
    let out = rewrite::subst_var(&mut terms, fla, x, image).unwrap();
    assert_eq!(
        terms.display(out).to_string(),
        "(and (>= (+ z 1) 0) (= y (+ z 1)))"
    );
}

#[test]
fn substitution_is_simultaneous() {
    let mut terms = Terms::new();
    let x = build!(terms, (x: int));
    let y = build!(terms, (y: int));
    let fla = build!(terms, (= (x: int) (y: int)));
    // x -> y, y -> x: a swap, not a chase.
    let mut map = Map::new();
    map.insert(x, y);
    map.insert(y, x);
    let mut subst = Subst::new(&terms, map).unwrap();
    let out = subst.apply(&mut terms, fla);
    assert_eq!(terms.display(out).to_string(), "(= y x)");
}

#[test]
fn substitution_is_idempotent_when_acyclic() {
    let mut terms = Terms::new();
    let x = build!(terms, (x: int));
    let image = build!(terms, (+ (y: int) 1));
    let fla = build!(terms, (>= (* (x: int) 2) (x: int)));
    let once = rewrite::subst_var(&mut terms, fla, x, image).unwrap();
    let twice = rewrite::subst_var(&mut terms, once, x, image).unwrap();
    assert_eq!(once, twice);
}

#[test]
fn substitution_keys_must_be_variables() {
    let mut terms = Terms::new();
    let three = terms.int(3);
    let x = build!(terms, (x: int));
    let mut map = Map::new();
    map.insert(three, x);
    assert!(Subst::new(&terms, map).is_err());
}

#[test]
fn nnf_pushes_negations_to_atoms() {
    let mut terms = Terms::new();
    let fla = build!(terms, (not (and (a: bool) (or (b: bool) (not (c: bool))))));
    let nnf = rewrite::to_nnf(&mut terms, fla);
    assert_eq!(
        terms.display(nnf).to_string(),
        "(or (not a) (and (not b) c))"
    );
    assert_no_inner_negation(&terms, nnf);
}

#[test]
fn nnf_expands_implications() {
    let mut terms = Terms::new();
    let fla = build!(terms, (=> (a: bool) (b: bool)));
    let nnf = rewrite::to_nnf(&mut terms, fla);
    assert_eq!(terms.display(nnf).to_string(), "(or (not a) b)");

    let negated = build!(terms, (not (=> (a: bool) (b: bool))));
    let nnf = rewrite::to_nnf(&mut terms, negated);
    assert_eq!(terms.display(nnf).to_string(), "(and a (not b))");
}

#[test]
fn nnf_expands_boolean_ite() {
    let mut terms = Terms::new();
    let fla = build!(terms, (ite (c: bool) (t: bool) (e: bool)));
    let nnf = rewrite::to_nnf(&mut terms, fla);
    assert_eq!(
        terms.display(nnf).to_string(),
        "(or (and c t) (and (not c) e))"
    );
}

#[test]
fn nnf_keeps_arithmetic_ite_inside_atoms() {
    let mut terms = Terms::new();
    let fla = build!(terms, (not (< (ite (c: bool) 1 2) (x: int))));
    let nnf = rewrite::to_nnf(&mut terms, fla);
    assert_eq!(terms.display(nnf).to_string(), "(not (< (ite c 1 2) x))");
}

#[test]
fn nnf_expands_negated_boolean_equality() {
    let mut terms = Terms::new();
    let fla = build!(terms, (not (= (a: bool) (b: bool))));
    let nnf = rewrite::to_nnf(&mut terms, fla);
    assert_eq!(
        terms.display(nnf).to_string(),
        "(or (and a (not b)) (and (not a) b))"
    );
}

#[test]
fn nnf_is_idempotent() {
    let mut terms = Terms::new();
    let fla = build!(
        terms,
        (not (and (=> (a: bool) (b: bool)) (or (c: bool) (not (= (n: int) 0)))))
    );
    let once = rewrite::to_nnf(&mut terms, fla);
    let twice = rewrite::to_nnf(&mut terms, once);
    assert_eq!(once, twice);
    assert_no_inner_negation(&terms, once);
}

/// Checks that negations only sit directly on atoms.
fn assert_no_inner_negation(terms: &Terms, fla: TermRef) {
    let mut stack = vec![fla];
    while let Some(t) = stack.pop() {
        match terms.op_of(t) {
            Some(Op::Not) => {
                let atom = terms.args_of(t)[0];
                assert!(
                    terms.op_of(atom).map_or(true, |op| {
                        !matches!(op, Op::And | Op::Or | Op::Not | Op::Implies)
                    }),
                    "negation over a connective in `{}`",
                    terms.display(fla)
                );
            }
            _ => stack.extend(terms.args_of(t)),
        }
    }
}
