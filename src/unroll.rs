//! Variable stepping: the `v##k` renaming that unrolls formulas through time.
//!
//! A variable is *stepped* when its identifier carries a `##k` suffix for an integer `k`. Step 0
//! is the current state, step 1 the next state. Shifting a formula by `k` moves every variable `k`
//! steps forward (or backward when `k` is negative) and leaves everything else untouched. The
//! suffix encoding is deliberate: it survives any SMT layer that only understands symbol names.

crate::prelude!();

use rewrite::Rewrite;
use term::{TermRef, Terms};

/// The separator between a variable's base name and its step index.
pub const STEP_SEP: &str = "##";

/// True if a variable carries a step suffix.
///
/// # Panics
///
/// Panics if `var` is not a variable.
pub fn is_stepped(terms: &Terms, var: TermRef) -> bool {
    terms.var_id(var).rfind(STEP_SEP).is_some()
}

/// The step of a stepped variable.
///
/// # Panics
///
/// Panics if `var` is not a variable or is not stepped.
pub fn step_of(terms: &Terms, var: TermRef) -> i64 {
    let id = terms.var_id(var);
    let pos = id
        .rfind(STEP_SEP)
        .unwrap_or_else(|| panic!("variable `{}` has no step suffix", id));
    id[pos + STEP_SEP.len()..]
        .parse::<i64>()
        .unwrap_or_else(|e| panic!("illegal step suffix on variable `{}`: {}", id, e))
}

/// The base name of a stepped variable, without its step suffix.
///
/// # Panics
///
/// Panics if `var` is not a variable or is not stepped.
pub fn base_of(terms: &Terms, var: TermRef) -> &str {
    let id = terms.var_id(var);
    let pos = id
        .rfind(STEP_SEP)
        .unwrap_or_else(|| panic!("variable `{}` has no step suffix", id));
    &id[..pos]
}

/// The step-0 rendition of an un-stepped variable.
///
/// # Panics
///
/// Panics if `var` is not a variable or is already stepped.
pub fn at_step_zero(terms: &mut Terms, var: TermRef) -> TermRef {
    assert!(
        !is_stepped(terms, var),
        "variable `{}` is already stepped",
        terms.var_id(var)
    );
    let typ = terms.typ_of(var);
    let id = format!("{}{}0", terms.var_id(var), STEP_SEP);
    terms.var(id, typ)
}

/// Sends a stepped variable `steps` steps into the future (or the past, when negative).
///
/// # Panics
///
/// Panics if `var` is not a variable or is not stepped.
pub fn shift_var(terms: &mut Terms, var: TermRef, steps: i64) -> TermRef {
    if steps == 0 {
        return var;
    }
    let step = step_of(terms, var);
    let typ = terms.typ_of(var);
    let id = format!("{}{}{}", base_of(terms, var), STEP_SEP, step + steps);
    terms.var(id, typ)
}

/// Shifts every variable of a formula by `steps`. Identity for `steps == 0`.
///
/// Every variable of the formula must be stepped; non-variable terms are preserved.
pub fn shift(terms: &mut Terms, fla: TermRef, steps: i64) -> TermRef {
    if steps == 0 {
        return fla;
    }
    let mut cfg = ShiftCfg { steps };
    rewrite::rewrite(terms, &mut cfg, fla)
}

/// Rewriter configuration behind [`shift`].
struct ShiftCfg {
    steps: i64,
}
impl Rewrite for ShiftCfg {
    fn rewrite(&mut self, terms: &mut Terms, t: TermRef) -> TermRef {
        if terms.is_var(t) {
            shift_var(terms, t, self.steps)
        } else {
            t
        }
    }
}

#[cfg(test)]
mod test {
    use crate::term::{Terms, Typ};

    #[test]
    fn stepping() {
        let mut terms = Terms::new();
        let x = terms.var("x", Typ::Int);
        assert!(!super::is_stepped(&terms, x));

        let x0 = super::at_step_zero(&mut terms, x);
        assert!(super::is_stepped(&terms, x0));
        assert_eq!(terms.var_id(x0), "x##0");
        assert_eq!(super::step_of(&terms, x0), 0);
        assert_eq!(super::base_of(&terms, x0), "x");

        let x3 = super::shift_var(&mut terms, x0, 3);
        assert_eq!(terms.var_id(x3), "x##3");
        let back = super::shift_var(&mut terms, x3, -3);
        assert_eq!(back, x0);
    }

    #[test]
    fn shift_composes() {
        let mut terms = Terms::new();
        let x = terms.var("x", Typ::Int);
        let x0 = super::at_step_zero(&mut terms, x);

        let once = super::shift_var(&mut terms, x0, 2);
        let twice = super::shift_var(&mut terms, once, 3);
        let direct = super::shift_var(&mut terms, x0, 5);
        assert_eq!(twice, direct);

        assert_eq!(super::shift_var(&mut terms, x0, 0), x0);
    }

    #[test]
    fn shift_negative_steps() {
        let mut terms = Terms::new();
        let x = terms.var("x", Typ::Int);
        let x0 = super::at_step_zero(&mut terms, x);
        let past = super::shift_var(&mut terms, x0, -1);
        assert_eq!(terms.var_id(past), "x##-1");
        assert_eq!(super::step_of(&terms, past), -1);
    }

    #[test]
    fn shift_formula() {
        let mut terms = Terms::new();
        let x = terms.var("x", Typ::Int);
        let x0 = super::at_step_zero(&mut terms, x);
        let x1 = super::shift_var(&mut terms, x0, 1);
        let one = terms.int(1);
        let sum = terms.app(crate::term::Op::Add, vec![x0, one]).unwrap();
        // x##1 = x##0 + 1
        let fla = terms.eq(x1, sum).unwrap();

        let shifted = super::shift(&mut terms, fla, 2);
        assert_eq!(terms.display(shifted).to_string(), "(= x##3 (+ x##2 1))");

        // Shifting commutes with construction.
        let x2 = super::shift_var(&mut terms, x0, 2);
        let x3 = super::shift_var(&mut terms, x0, 3);
        let sum2 = terms.app(crate::term::Op::Add, vec![x2, one]).unwrap();
        let direct = terms.eq(x3, sum2).unwrap();
        assert_eq!(shifted, direct);
    }

    #[test]
    fn shift_preserves_constants() {
        let mut terms = Terms::new();
        let tru = terms.tru();
        assert_eq!(super::shift(&mut terms, tru, 4), tru);
    }

    #[test]
    #[should_panic(expected = "already stepped")]
    fn step_zero_rejects_stepped() {
        let mut terms = Terms::new();
        let x = terms.var("x##0", Typ::Int);
        super::at_step_zero(&mut terms, x);
    }
}
