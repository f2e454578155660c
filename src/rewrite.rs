//! Bottom-up term rewriting, substitution and negation normal form.

crate::prelude!();

use term::{Op, Term, TermRef, Terms, Typ};

#[cfg(test)]
mod test;

/// A rewriter configuration.
///
/// The engine visits every distinct subterm of the root at most once, rebuilds parents whose
/// children changed, and applies [`Self::rewrite`] exactly once per visited term. Rewrites must
/// preserve the type of their input; a type-breaking rewrite is a programming error.
pub trait Rewrite {
    /// Whether the engine should descend into the children of `t`. Defaults to `true`.
    fn descend(&mut self, terms: &Terms, t: TermRef) -> bool {
        let _ = (terms, t);
        true
    }

    /// Rewrites one term. Called on leaves directly, and on composite terms after their children
    /// have been rebuilt. Returning the input leaves the term unchanged.
    fn rewrite(&mut self, terms: &mut Terms, t: TermRef) -> TermRef;
}

/// Rewrites `root` bottom-up under a configuration.
///
/// Memoization is keyed on the input handle and scoped to this invocation: sharing in the input
/// DAG is preserved and no subterm is rewritten twice.
pub fn rewrite<C: Rewrite>(terms: &mut Terms, cfg: &mut C, root: TermRef) -> TermRef {
    let mut memo: Map<TermRef, TermRef> = Map::new();
    let mut stack = vec![(root, false)];

    while let Some((t, entered)) = stack.pop() {
        if memo.contains_key(&t) {
            continue;
        }
        if !entered {
            if terms.arity(t) == 0 || !cfg.descend(terms, t) {
                let img = cfg.rewrite(terms, t);
                memo.insert(t, img);
                continue;
            }
            stack.push((t, true));
            for arg in terms.args_of(t) {
                stack.push((*arg, false))
            }
        } else {
            let args: Vec<TermRef> = terms.args_of(t).to_vec();
            let new_args: Vec<TermRef> = args.iter().map(|a| memo[a]).collect();
            let rebuilt = if new_args == args {
                t
            } else if let Some(op) = terms.op_of(t) {
                terms
                    .app(op, new_args)
                    .expect("rewriting must preserve types")
            } else if let Some(fun) = terms.fun_of(t) {
                terms
                    .fun_app(fun, new_args)
                    .expect("rewriting must preserve types")
            } else {
                t
            };
            let img = cfg.rewrite(terms, rebuilt);
            memo.insert(t, img);
        }
    }

    memo[&root]
}

/// A substitution: a rewriter configuration backed by a variable-to-term map.
///
/// A single application is simultaneous; entries are not chased transitively. A map hit
/// short-circuits the descent into the children of the matched variable.
pub struct Subst {
    map: Map<TermRef, TermRef>,
}
impl Subst {
    /// Constructor. Keys must be variables, anything else is [`ErrorKind::InvalidInput`].
    pub fn new(terms: &Terms, map: Map<TermRef, TermRef>) -> Res<Self> {
        for key in map.keys() {
            if !terms.is_var(*key) {
                bail!(ErrorKind::InvalidInput(format!(
                    "substitution key `{}` is not a variable",
                    terms.display(*key)
                )))
            }
        }
        Ok(Self { map })
    }

    /// Applies the substitution to a term.
    pub fn apply(&mut self, terms: &mut Terms, t: TermRef) -> TermRef {
        rewrite(terms, self, t)
    }
}
impl Rewrite for Subst {
    fn descend(&mut self, _terms: &Terms, t: TermRef) -> bool {
        !self.map.contains_key(&t)
    }
    fn rewrite(&mut self, _terms: &mut Terms, t: TermRef) -> TermRef {
        self.map.get(&t).copied().unwrap_or(t)
    }
}

/// Substitutes one variable in a term.
pub fn subst_var(terms: &mut Terms, t: TermRef, var: TermRef, image: TermRef) -> Res<TermRef> {
    let mut map = Map::new();
    map.insert(var, image);
    let mut subst = Subst::new(terms, map)?;
    Ok(subst.apply(terms, t))
}

/// Puts a boolean formula in negation normal form.
///
/// Negations are pushed down to atoms; implications are expanded; `ite` with boolean branches and
/// negated boolean equalities are expanded into their `and`/`or` forms.
///
/// # Panics
///
/// Panics if `fla` is not boolean; feeding a non-formula here is a programming error.
pub fn to_nnf(terms: &mut Terms, fla: TermRef) -> TermRef {
    assert!(
        terms.has_typ_bool(fla),
        "cannot convert non-boolean term `{}` to NNF",
        terms.display(fla)
    );
    let mut memo: Map<(TermRef, bool), TermRef> = Map::new();
    nnf(terms, fla, true, &mut memo)
}

fn nnf(
    terms: &mut Terms,
    t: TermRef,
    positive: bool,
    memo: &mut Map<(TermRef, bool), TermRef>,
) -> TermRef {
    if let Some(res) = memo.get(&(t, positive)) {
        return *res;
    }
    let res = match terms.node(t).clone() {
        Term::App { op: Op::Not, args } => nnf(terms, args[0], !positive, memo),
        Term::App { op: Op::And, args } => {
            let args: Vec<_> = args
                .into_iter()
                .map(|a| nnf(terms, a, positive, memo))
                .collect();
            let op = if positive { Op::And } else { Op::Or };
            terms.app(op, args).expect("nnf preserves well-typedness")
        }
        Term::App { op: Op::Or, args } => {
            let args: Vec<_> = args
                .into_iter()
                .map(|a| nnf(terms, a, positive, memo))
                .collect();
            let op = if positive { Op::Or } else { Op::And };
            terms.app(op, args).expect("nnf preserves well-typedness")
        }
        Term::App {
            op: Op::Implies,
            args,
        } => {
            // `a => b => c` is `a => (b => c)` in SMT-LIB: only the last argument is positive.
            let last = *args.last().expect("implications have arguments");
            let mut disjs: Vec<_> = args[..args.len() - 1]
                .iter()
                .map(|a| nnf(terms, *a, !positive, memo))
                .collect();
            disjs.push(nnf(terms, last, positive, memo));
            let op = if positive { Op::Or } else { Op::And };
            terms.app(op, disjs).expect("nnf preserves well-typedness")
        }
        Term::App { op: Op::Ite, args } if terms.has_typ_bool(args[1]) => {
            let (cnd, thn, els) = (args[0], args[1], args[2]);
            // Under negation this yields (c and not t) or (not c and not e): the branches carry
            // the polarity, the condition split stays positive/negative.
            let pos_cnd = nnf(terms, cnd, true, memo);
            let neg_cnd = nnf(terms, cnd, false, memo);
            let thn = nnf(terms, thn, positive, memo);
            let els = nnf(terms, els, positive, memo);
            let lft = terms
                .and(vec![pos_cnd, thn])
                .expect("nnf preserves well-typedness");
            let rgt = terms
                .and(vec![neg_cnd, els])
                .expect("nnf preserves well-typedness");
            terms
                .or(vec![lft, rgt])
                .expect("nnf preserves well-typedness")
        }
        Term::App { op: Op::Eq, args }
            if !positive && args.iter().all(|a| terms.has_typ_bool(*a)) && args.len() == 2 =>
        {
            // not (a = b) over bools: (a and not b) or (not a and b).
            let (a, b) = (args[0], args[1]);
            let (pa, na) = (nnf(terms, a, true, memo), nnf(terms, a, false, memo));
            let (pb, nb) = (nnf(terms, b, true, memo), nnf(terms, b, false, memo));
            let lft = terms
                .and(vec![pa, nb])
                .expect("nnf preserves well-typedness");
            let rgt = terms
                .and(vec![na, pb])
                .expect("nnf preserves well-typedness");
            terms
                .or(vec![lft, rgt])
                .expect("nnf preserves well-typedness")
        }
        _ => {
            // Atom: constants, variables, predicate applications, theory atoms.
            if positive {
                t
            } else if terms.typ_of(t) == Typ::Bool {
                terms.not(t).expect("negating a boolean atom")
            } else {
                panic!(
                    "cannot negate non-boolean term `{}` during NNF",
                    terms.display(t)
                )
            }
        }
    };
    memo.insert((t, positive), res);
    res
}
