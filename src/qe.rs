//! Trivial quantifier elimination over top-level equalities.
//!
//! Eliminates existential variables one at a time: a top-level equality that defines the variable
//! (directly, or after isolating it in a linear equality) becomes a substitution. The eliminator
//! is sound but incomplete; giving up returns the formula unchanged and is *not* an error.

crate::prelude!();

use term::{TermRef, Terms};

/// Outcome of a single-variable elimination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Elim {
    /// The variable was substituted away.
    Eliminated(TermRef),
    /// No usable definition was found; the formula is returned as-is.
    Unchanged(TermRef),
}
impl Elim {
    /// The resulting formula, however the elimination went.
    pub fn fla(self) -> TermRef {
        match self {
            Self::Eliminated(fla) | Self::Unchanged(fla) => fla,
        }
    }
}

/// Eliminates a list of existential variables, one at a time.
///
/// Equivalent to the input under existential closure over `vars`; variables the heuristics cannot
/// reach simply remain.
pub fn eliminate_vars(terms: &mut Terms, vars: &[TermRef], fla: TermRef) -> Res<TermRef> {
    let mut current = fla;
    for var in vars {
        current = eliminate_var(terms, *var, current)?.fla();
    }
    Ok(current)
}

/// Eliminates one existential variable from a formula.
///
/// Heuristics, in order:
///
/// 1. a top-level equality `var = T` (or `T = var`) with `var` not in `T` is a definition:
///    substitute `T` for `var`;
/// 2. otherwise, the first top-level equality containing `var` is solved for `var` when linear
///    arithmetic can isolate it, and the solution is substituted;
/// 3. otherwise the formula is returned [`Elim::Unchanged`].
///
/// A non-variable input is an [`ErrorKind::InvalidInput`] error.
pub fn eliminate_var(terms: &mut Terms, var: TermRef, fla: TermRef) -> Res<Elim> {
    if !terms.is_var(var) {
        bail!(ErrorKind::InvalidInput(format!(
            "cannot eliminate `{}`: not a variable",
            terms.display(var)
        )))
    }

    let equalities = juncts::top_level_juncts(terms, fla, juncts::Kind::Conj, |terms, t| {
        terms.is_eq(t)
    });

    // A direct definition: one side is the variable itself.
    for eq in &equalities {
        let args = terms.args_of(*eq);
        if args.len() != 2 {
            continue;
        }
        let (lhs, rhs) = (args[0], args[1]);
        let image = if lhs == var {
            rhs
        } else if rhs == var {
            lhs
        } else {
            continue;
        };
        if terms.contains_var(image, var) {
            // A self-referential definition would not eliminate anything.
            continue;
        }
        let res = rewrite::subst_var(terms, fla, var, image)?;
        return Ok(Elim::Eliminated(res));
    }

    // The first equality mentioning the variable, solved for it.
    for eq in &equalities {
        let args = terms.args_of(*eq);
        if args.len() != 2 || !terms.contains_var(*eq, var) {
            continue;
        }
        let (lhs, rhs) = (args[0], args[1]);
        // `lhs = rhs` is `lhs - rhs = 0`.
        let zero_term = match terms.app(term::Op::Sub, vec![lhs, rhs]) {
            Ok(t) => t,
            Err(_) => continue,
        };
        if let Some(image) = arith::express_zero_term_for(terms, zero_term, var) {
            if !terms.contains_var(image, var) {
                let res = rewrite::subst_var(terms, fla, var, image)?;
                return Ok(Elim::Eliminated(res));
            }
        }
    }

    Ok(Elim::Unchanged(fla))
}
