//! Linear-arithmetic term utilities.
//!
//! Decomposes arithmetic terms into linear forms (a constant plus coefficient-scaled variables),
//! isolates a variable inside a linear term, and simplifies junct lists with duplicate and bound
//! subsumption. All reasoning happens on structured numeric values, never on printed forms.

crate::prelude!();

use term::{Op, TermRef, Terms, Typ};

/// A linear form: `cst + Σ coeff·var`. Coefficients are nonzero; variables appear in discovery
/// order.
#[derive(Debug, Clone)]
pub struct Linear {
    /// Constant offset.
    pub cst: Rat,
    /// Variables and their (nonzero) coefficients.
    pub coeffs: Vec<(TermRef, Rat)>,
}
impl Linear {
    fn cst(cst: Rat) -> Self {
        Self {
            cst,
            coeffs: vec![],
        }
    }
    fn var(var: TermRef) -> Self {
        Self {
            cst: Rat::zero(),
            coeffs: vec![(var, Rat::one())],
        }
    }

    fn add_scaled(&mut self, other: Linear, scale: &Rat) {
        self.cst += &other.cst * scale;
        for (var, coeff) in other.coeffs {
            let scaled = &coeff * scale;
            if let Some(entry) = self.coeffs.iter_mut().find(|(v, _)| *v == var) {
                entry.1 += scaled;
            } else {
                self.coeffs.push((var, scaled));
            }
        }
        self.coeffs.retain(|(_, c)| !c.is_zero());
    }

    fn scaled(mut self, scale: &Rat) -> Self {
        self.cst *= scale;
        for entry in &mut self.coeffs {
            entry.1 *= scale;
        }
        self.coeffs.retain(|(_, c)| !c.is_zero());
        self
    }

    /// Coefficient of a variable, zero when absent.
    pub fn coeff_of(&self, var: TermRef) -> Rat {
        self.coeffs
            .iter()
            .find(|(v, _)| *v == var)
            .map(|(_, c)| c.clone())
            .unwrap_or_else(Rat::zero)
    }
}

/// Decomposes a term into a linear form. `None` when the term is not linear arithmetic.
pub fn linear_of(terms: &Terms, t: TermRef) -> Option<Linear> {
    use crate::term::{Cst, Term};
    match terms.node(t) {
        Term::Cst(Cst::I(i)) => Some(Linear::cst(Rat::from(i.clone()))),
        Term::Cst(Cst::R(r)) => Some(Linear::cst(r.clone())),
        Term::Cst(Cst::B(_)) => None,
        Term::Var { typ, .. } if typ.is_arith() => Some(Linear::var(t)),
        Term::Var { .. } => None,
        Term::App { op: Op::Add, args } => {
            let mut acc = Linear::cst(Rat::zero());
            for arg in args {
                acc.add_scaled(linear_of(terms, *arg)?, &Rat::one());
            }
            Some(acc)
        }
        Term::App { op: Op::Sub, args } => {
            if args.len() == 1 {
                return Some(linear_of(terms, args[0])?.scaled(&-Rat::one()));
            }
            let mut acc = linear_of(terms, args[0])?;
            for arg in &args[1..] {
                acc.add_scaled(linear_of(terms, *arg)?, &-Rat::one());
            }
            Some(acc)
        }
        Term::App { op: Op::Mul, args } => {
            let mut scale = Rat::one();
            let mut shape: Option<Linear> = None;
            for arg in args {
                let lin = linear_of(terms, *arg)?;
                if lin.coeffs.is_empty() {
                    scale *= lin.cst;
                } else if shape.is_none() {
                    shape = Some(lin);
                } else {
                    // More than one non-constant factor: not linear.
                    return None;
                }
            }
            match shape {
                Some(lin) => Some(lin.scaled(&scale)),
                None => Some(Linear::cst(scale)),
            }
        }
        Term::App { op: Op::Div, args } => {
            let den = linear_of(terms, args[1])?;
            if !den.coeffs.is_empty() || den.cst.is_zero() {
                return None;
            }
            let num = linear_of(terms, args[0])?;
            Some(num.scaled(&den.cst.recip()))
        }
        Term::App { .. } | Term::Fun { .. } => None,
    }
}

/// Given a linear term `t` containing `var` with nonzero coefficient, returns `s` such that
/// `var = s` is equivalent to `t = 0`.
///
/// Over integers the isolation is refused (`None`) unless the pivot coefficient divides the rest
/// of the form, since an inexact division would change the solution set.
pub fn express_zero_term_for(terms: &mut Terms, t: TermRef, var: TermRef) -> Option<TermRef> {
    let lin = linear_of(terms, t)?;
    let pivot = lin.coeff_of(var);
    if pivot.is_zero() {
        return None;
    }

    let typ = terms.typ_of(var);
    let rest: Vec<(TermRef, Rat)> = lin
        .coeffs
        .iter()
        .filter(|(v, _)| *v != var)
        .map(|(v, c)| (*v, -(c / &pivot)))
        .collect();
    let offset = -(&lin.cst / &pivot);

    if typ == Typ::Int {
        let exact = offset.is_integer() && rest.iter().all(|(_, c)| c.is_integer());
        if !exact {
            return None;
        }
    }

    let mut parts = vec![];
    for (v, coeff) in rest {
        let part = if coeff.is_one() {
            v
        } else if (-&coeff).is_one() {
            terms.app(Op::Sub, vec![v]).expect("negation of a variable")
        } else {
            let c = num_term(terms, &coeff, typ);
            terms.app(Op::Mul, vec![c, v]).expect("scaled variable")
        };
        parts.push(part);
    }
    if !offset.is_zero() || parts.is_empty() {
        parts.push(num_term(terms, &offset, typ));
    }
    match parts.len() {
        1 => Some(parts.pop().expect("len 1")),
        _ => Some(terms.app(Op::Add, parts).expect("sum of scaled variables")),
    }
}

/// Builds the constant term for a rational at the given arithmetic type.
fn num_term(terms: &mut Terms, val: &Rat, typ: Typ) -> TermRef {
    if typ == Typ::Int {
        debug_assert!(val.is_integer());
        terms.int(val.to_integer())
    } else {
        terms.rat(val.clone())
    }
}

/// True if `var` occurs syntactically in `term`.
pub fn term_contains_var(terms: &Terms, term: TermRef, var: TermRef) -> bool {
    terms.contains_var(term, var)
}

/// True if `var` occurs syntactically in `atom`.
pub fn atom_contains_var(terms: &Terms, atom: TermRef, var: TermRef) -> bool {
    terms.contains_var(atom, var)
}

/// Direction of a variable-vs-constant bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Dir {
    Upper,
    Lower,
}

/// A `term (<|<=|>|>=) constant` atom, normalized so the constant sits on the right.
#[derive(Debug, Clone)]
struct Bound {
    lhs: TermRef,
    dir: Dir,
    val: Rat,
    strict: bool,
}

fn rat_of_cst(terms: &Terms, t: TermRef) -> Option<Rat> {
    use crate::term::{Cst, Term};
    match terms.node(t) {
        Term::Cst(Cst::I(i)) => Some(Rat::from(i.clone())),
        Term::Cst(Cst::R(r)) => Some(r.clone()),
        _ => None,
    }
}

fn bound_of(terms: &Terms, t: TermRef) -> Option<Bound> {
    let op = terms.op_of(t)?;
    if !op.is_arith_relation() {
        return None;
    }
    let args = terms.args_of(t);
    if args.len() != 2 {
        return None;
    }
    let (lhs, rhs) = (args[0], args[1]);
    let (lhs, op, val) = match (rat_of_cst(terms, lhs), rat_of_cst(terms, rhs)) {
        (None, Some(val)) => (lhs, op, val),
        (Some(val), None) => {
            // Flip `c <= t` into `t >= c`.
            let flipped = match op {
                Op::Le => Op::Ge,
                Op::Lt => Op::Gt,
                Op::Ge => Op::Le,
                Op::Gt => Op::Lt,
                _ => return None,
            };
            (rhs, flipped, val)
        }
        _ => return None,
    };
    let (dir, strict) = match op {
        Op::Le => (Dir::Upper, false),
        Op::Lt => (Dir::Upper, true),
        Op::Ge => (Dir::Lower, false),
        Op::Gt => (Dir::Lower, true),
        _ => return None,
    };
    Some(Bound {
        lhs,
        dir,
        val,
        strict,
    })
}

/// True if bound `a` entails bound `b` (same term, same direction).
fn entails(a: &Bound, b: &Bound) -> bool {
    debug_assert!(a.lhs == b.lhs && a.dir == b.dir);
    match a.dir {
        Dir::Upper => a.val < b.val || (a.val == b.val && (a.strict || !b.strict)),
        Dir::Lower => a.val > b.val || (a.val == b.val && (a.strict || !b.strict)),
    }
}

/// Simplifies a list of conjuncts.
///
/// Drops duplicates and `true`, collapses to `[false]` on a `false` or a complementary pair, and
/// keeps only the strongest bound per (term, direction).
pub fn simplify_conjunction(terms: &mut Terms, conjs: &[TermRef]) -> Vec<TermRef> {
    simplify_juncts(terms, conjs, juncts::Kind::Conj)
}

/// Simplifies a list of disjuncts.
///
/// Drops duplicates and `false`, collapses to `[true]` on a `true` or a complementary pair, and
/// keeps only the weakest bound per (term, direction).
pub fn simplify_disjunction(terms: &mut Terms, disjs: &[TermRef]) -> Vec<TermRef> {
    simplify_juncts(terms, disjs, juncts::Kind::Disj)
}

fn simplify_juncts(terms: &mut Terms, input: &[TermRef], kind: juncts::Kind) -> Vec<TermRef> {
    let (absorbing, neutral) = match kind {
        juncts::Kind::Conj => (terms.fls(), terms.tru()),
        juncts::Kind::Disj => (terms.tru(), terms.fls()),
    };

    // Signed views to catch `t` against `not t`.
    let mut pos: Set<TermRef> = Set::new();
    let mut neg: Set<TermRef> = Set::new();
    // Best bound per (term, direction); in a disjunction the roles flip, the *weakest* wins.
    let mut best: Map<(TermRef, Dir), Bound> = Map::new();
    let mut seen: Set<TermRef> = Set::new();
    let mut kept: Vec<TermRef> = vec![];

    for junct in input {
        let junct = *junct;
        if junct == absorbing {
            return vec![absorbing];
        }
        if junct == neutral || !seen.insert(junct) {
            continue;
        }
        let (base, sign) = if terms.is_not(junct) {
            (terms.args_of(junct)[0], false)
        } else {
            (junct, true)
        };
        let clash = if sign {
            pos.insert(base);
            neg.contains(&base)
        } else {
            neg.insert(base);
            pos.contains(&base)
        };
        if clash {
            return vec![absorbing];
        }
        if let Some(bound) = bound_of(terms, junct) {
            let key = (bound.lhs, bound.dir);
            let wins = match best.get(&key) {
                None => true,
                Some(prev) => match kind {
                    juncts::Kind::Conj => entails(&bound, prev),
                    juncts::Kind::Disj => entails(prev, &bound),
                },
            };
            if wins {
                best.insert(key, bound);
            }
        }
        kept.push(junct);
    }

    // Second pass: emit non-bound juncts as-is and each bound class once, at its first position.
    let mut emitted: Set<(TermRef, Dir)> = Set::new();
    let mut res = vec![];
    for junct in kept {
        match bound_of(terms, junct) {
            None => res.push(junct),
            Some(bound) => {
                let key = (bound.lhs, bound.dir);
                if emitted.insert(key) {
                    let winner = &best[&key];
                    let op = match (winner.dir, winner.strict) {
                        (Dir::Upper, false) => Op::Le,
                        (Dir::Upper, true) => Op::Lt,
                        (Dir::Lower, false) => Op::Ge,
                        (Dir::Lower, true) => Op::Gt,
                    };
                    let typ = terms.typ_of(winner.lhs);
                    let val = num_term(terms, &winner.val.clone(), typ);
                    let atom = terms
                        .app(op, vec![winner.lhs, val])
                        .expect("bound over arithmetic term");
                    res.push(atom);
                }
            }
        }
    }
    res
}

/// Simplifies a conjunction formula: extracts its top-level conjuncts, simplifies, rebuilds.
pub fn conjunction_simplified(terms: &mut Terms, fla: TermRef) -> TermRef {
    let conjs = juncts::conjuncts_of(terms, fla);
    let simple = simplify_conjunction(terms, &conjs);
    terms.and(simple).expect("conjunction of boolean juncts")
}

/// Simplifies a disjunction formula: extracts its top-level disjuncts, simplifies, rebuilds.
pub fn disjunction_simplified(terms: &mut Terms, fla: TermRef) -> TermRef {
    let disjs = juncts::disjuncts_of(terms, fla);
    let simple = simplify_disjunction(terms, &disjs);
    terms.or(simple).expect("disjunction of boolean juncts")
}

#[cfg(test)]
mod test {
    use crate::build;
    use crate::term::{Terms, Typ};

    #[test]
    fn linear_decomposition() {
        let mut terms = Terms::new();
        // 2*x + (y - 3) + 1
        let t = build!(terms, (+ (* 2 (x: int)) (- (y: int) 3) 1));
        let lin = super::linear_of(&terms, t).unwrap();
        let x = terms.var("x", Typ::Int);
        let y = terms.var("y", Typ::Int);
        assert_eq!(lin.coeff_of(x), crate::prelude::Rat::from(num::BigInt::from(2)));
        assert_eq!(lin.coeff_of(y), crate::prelude::Rat::from(num::BigInt::from(1)));
        assert_eq!(lin.cst, crate::prelude::Rat::from(num::BigInt::from(-2)));
    }

    #[test]
    fn nonlinear_is_rejected() {
        let mut terms = Terms::new();
        let t = build!(terms, (* (x: int) (y: int)));
        assert!(super::linear_of(&terms, t).is_none());
    }

    #[test]
    fn express_zero_isolates_the_variable() {
        let mut terms = Terms::new();
        // x - y - 1 = 0 solved for x: y + 1.
        let t = build!(terms, (- (x: int) (y: int) 1));
        let x = terms.var("x", Typ::Int);
        let s = super::express_zero_term_for(&mut terms, t, x).unwrap();
        assert_eq!(terms.display(s).to_string(), "(+ y 1)");
        assert!(!terms.contains_var(s, x));
    }

    #[test]
    fn express_zero_refuses_inexact_integer_division() {
        let mut terms = Terms::new();
        // 2*x + y = 0 cannot be solved for x over the integers.
        let t = build!(terms, (+ (* 2 (x: int)) (y: int)));
        let x = terms.var("x", Typ::Int);
        assert!(super::express_zero_term_for(&mut terms, t, x).is_none());
        // It can over the rationals.
        let t = build!(terms, (+ (* 2 (x: rat)) (y: rat)));
        let x = terms.var("x", Typ::Rat);
        let s = super::express_zero_term_for(&mut terms, t, x).unwrap();
        assert!(!terms.contains_var(s, x));
    }

    #[test]
    fn express_zero_missing_variable() {
        let mut terms = Terms::new();
        let t = build!(terms, (+ (y: int) 1));
        let x = terms.var("x", Typ::Int);
        assert!(super::express_zero_term_for(&mut terms, t, x).is_none());
    }

    #[test]
    fn conjunction_keeps_strongest_bound() {
        let mut terms = Terms::new();
        let weak = build!(terms, (<= (x: int) 10));
        let strong = build!(terms, (<= (x: int) 5));
        let other = build!(terms, (>= (x: int) 0));
        let simple = super::simplify_conjunction(&mut terms, &[weak, strong, other]);
        assert_eq!(simple, vec![strong, other]);
    }

    #[test]
    fn disjunction_keeps_weakest_bound() {
        let mut terms = Terms::new();
        let weak = build!(terms, (<= (x: int) 10));
        let strong = build!(terms, (<= (x: int) 5));
        let simple = super::simplify_disjunction(&mut terms, &[strong, weak]);
        assert_eq!(simple, vec![weak]);
    }

    #[test]
    fn complementary_conjuncts_collapse() {
        let mut terms = Terms::new();
        let a = build!(terms, (a: bool));
        let na = build!(terms, (not (a: bool)));
        let fls = terms.fls();
        assert_eq!(super::simplify_conjunction(&mut terms, &[a, na]), vec![fls]);
        let tru = terms.tru();
        assert_eq!(super::simplify_disjunction(&mut terms, &[a, na]), vec![tru]);
    }

    #[test]
    fn units_and_duplicates_drop() {
        let mut terms = Terms::new();
        let a = build!(terms, (a: bool));
        let tru = terms.tru();
        assert_eq!(
            super::simplify_conjunction(&mut terms, &[tru, a, a]),
            vec![a]
        );
    }
}
