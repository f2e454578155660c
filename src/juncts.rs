//! Top-level junct extraction.
//!
//! Splits a formula into its top-level conjuncts or disjuncts, looking through negations: a
//! negated disjunction contributes negated conjuncts, and dually. Extraction works on a worklist
//! of signed terms, deduplicated on the (term, sign) pair, and emits leaves in discovery order.

crate::prelude!();

use term::{TermRef, Terms};

/// The junction to extract.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    /// Split on `and` (and negated `or`).
    Conj,
    /// Split on `or` (and negated `and`).
    Disj,
}

/// Strips stacked negations off a term, returning the bare term and its sign.
fn purify(terms: &Terms, mut t: TermRef, mut sign: bool) -> (TermRef, bool) {
    while terms.is_not(t) {
        t = terms.args_of(t)[0];
        sign = !sign;
    }
    (t, sign)
}

/// The top-level juncts of `root` of the requested kind, restricted by a filter.
///
/// For [`Kind::Conj`]: positive `and` nodes expand into their children, negative `or` nodes
/// expand with flipped signs, everything else is a leaf. Roles swap for [`Kind::Disj`]. A leaf
/// with a negative sign is emitted as its negation. Only leaves accepted by `filter` make it into
/// the result.
pub fn top_level_juncts(
    terms: &mut Terms,
    root: TermRef,
    kind: Kind,
    filter: impl Fn(&Terms, TermRef) -> bool,
) -> Vec<TermRef> {
    let expands = |terms: &Terms, t: TermRef, sign: bool| match kind {
        Kind::Conj => (terms.is_and(t) && sign) || (terms.is_or(t) && !sign),
        Kind::Disj => (terms.is_or(t) && sign) || (terms.is_and(t) && !sign),
    };

    let mut res = vec![];
    let mut seen: Set<(TermRef, bool)> = Set::new();
    let mut stack = vec![purify(terms, root, true)];

    while let Some((t, sign)) = stack.pop() {
        if !seen.insert((t, sign)) {
            continue;
        }
        if expands(terms, t, sign) {
            // Reversed so the leftmost child is processed first.
            for child in terms.args_of(t).to_vec().into_iter().rev() {
                stack.push(purify(terms, child, sign))
            }
        } else {
            let leaf = if sign {
                t
            } else {
                terms.not(t).expect("negating a boolean junct")
            };
            if filter(terms, leaf) {
                res.push(leaf)
            }
        }
    }

    res
}

/// Top-level conjuncts of `root`, unfiltered.
pub fn conjuncts_of(terms: &mut Terms, root: TermRef) -> Vec<TermRef> {
    top_level_juncts(terms, root, Kind::Conj, |_, _| true)
}

/// Top-level disjuncts of `root`, unfiltered.
pub fn disjuncts_of(terms: &mut Terms, root: TermRef) -> Vec<TermRef> {
    top_level_juncts(terms, root, Kind::Disj, |_, _| true)
}

#[cfg(test)]
mod test {
    use super::Kind;
    use crate::build;
    use crate::term::Terms;

    #[test]
    fn conjuncts_flatten_nested_ands() {
        let mut terms = Terms::new();
        let fla = build!(
            terms,
            (and (a: bool) (and (b: bool) (>= (n: int) 0)) (c: bool))
        );
        let juncts = super::conjuncts_of(&mut terms, fla);
        let strs: Vec<_> = juncts
            .iter()
            .map(|t| terms.display(*t).to_string())
            .collect();
        assert_eq!(strs, vec!["a", "b", "(>= n 0)", "c"]);
    }

    #[test]
    fn negated_or_expands_into_conjuncts() {
        let mut terms = Terms::new();
        let fla = build!(terms, (not (or (a: bool) (not (b: bool)))));
        let juncts = super::conjuncts_of(&mut terms, fla);
        let strs: Vec<_> = juncts
            .iter()
            .map(|t| terms.display(*t).to_string())
            .collect();
        assert_eq!(strs, vec!["(not a)", "b"]);
    }

    #[test]
    fn positive_or_is_a_conjunct_leaf() {
        let mut terms = Terms::new();
        let fla = build!(terms, (and (a: bool) (or (b: bool) (c: bool))));
        let juncts = super::conjuncts_of(&mut terms, fla);
        let strs: Vec<_> = juncts
            .iter()
            .map(|t| terms.display(*t).to_string())
            .collect();
        assert_eq!(strs, vec!["a", "(or b c)"]);
    }

    #[test]
    fn disjuncts_swap_roles() {
        let mut terms = Terms::new();
        let fla = build!(terms, (not (and (a: bool) (b: bool))));
        let juncts = super::disjuncts_of(&mut terms, fla);
        let strs: Vec<_> = juncts
            .iter()
            .map(|t| terms.display(*t).to_string())
            .collect();
        assert_eq!(strs, vec!["(not a)", "(not b)"]);
    }

    #[test]
    fn duplicate_juncts_collapse() {
        let mut terms = Terms::new();
        // `a` reappears inside the nested conjunction; the (term, sign) dedup drops the repeat.
        let a = build!(terms, (a: bool));
        let b = build!(terms, (b: bool));
        let fla = build!(terms, (and (a: bool) (and (a: bool) (b: bool))));
        let juncts = super::conjuncts_of(&mut terms, fla);
        assert_eq!(juncts, vec![a, b]);
    }

    #[test]
    fn filter_restricts_output() {
        let mut terms = Terms::new();
        let fla = build!(terms, (and (a: bool) (= (n: int) 0) (b: bool)));
        let eqs = super::top_level_juncts(&mut terms, fla, Kind::Conj, |terms, t| terms.is_eq(t));
        assert_eq!(eqs.len(), 1);
        assert_eq!(terms.display(eqs[0]).to_string(), "(= n 0)");
    }
}
