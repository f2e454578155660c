//! Constrained Horn clause systems and their normalization.
//!
//! A clause is `body => head` where the head is *UP-or-constant* (an uninterpreted predicate
//! application or a boolean constant) and the body is a background-theory constraint plus a list
//! of predicate applications. Normalization rewrites every clause over the *canonical*
//! applications of its predicates: body applications at step 0, the head application at step 1,
//! with binding equalities joining the original argument terms to the canonical variables.

crate::prelude!();

use term::{FunRef, TermRef, Terms, Typ};

/// A Horn clause.
///
/// Semantics: for all free variables, `constraint /\ body` implies `head`.
#[derive(Debug, Clone)]
pub struct Clause {
    /// Head: a predicate application, or `false` for queries.
    pub head: TermRef,
    /// Background-theory constraint of the body.
    pub constraint: TermRef,
    /// Predicate applications of the body.
    pub body: Vec<TermRef>,
}
impl Clause {
    /// True if the body holds at most one predicate application.
    pub fn is_linear(&self) -> bool {
        self.body.len() <= 1
    }
    /// True if the body holds no predicate application.
    pub fn is_fact(&self) -> bool {
        self.body.is_empty()
    }
    /// True if the head is `false`.
    pub fn is_query(&self, terms: &Terms) -> bool {
        self.head == terms.fls()
    }
}

/// A CHC system: declared predicates and clauses over them.
#[derive(Debug, Clone, Default)]
pub struct System {
    /// Uninterpreted predicates of the system.
    preds: Vec<FunRef>,
    /// The clauses.
    clauses: Vec<Clause>,
}
impl System {
    /// Constructor.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an uninterpreted predicate.
    pub fn add_predicate(&mut self, pred: FunRef) {
        if !self.preds.contains(&pred) {
            self.preds.push(pred)
        }
    }

    /// The registered predicates.
    pub fn predicates(&self) -> &[FunRef] {
        &self.preds
    }
    /// The clauses.
    pub fn clauses(&self) -> &[Clause] {
        &self.clauses
    }

    /// Adds a clause.
    ///
    /// The head must be UP-or-constant over a registered predicate, the constraint must be
    /// boolean, and every body element must be an application of a registered predicate.
    /// Violations are [`ErrorKind::InvalidInput`] errors.
    pub fn add_clause(
        &mut self,
        terms: &Terms,
        head: TermRef,
        constraint: TermRef,
        body: Vec<TermRef>,
    ) -> Res<()> {
        if !terms.is_up_or_constant(head) {
            bail!(ErrorKind::InvalidInput(format!(
                "clause head `{}` is neither a predicate application nor a boolean constant",
                terms.display(head)
            )))
        }
        if let Some(fun) = terms.fun_of(head) {
            self.check_registered(terms, fun)?
        }
        if !terms.has_typ_bool(constraint) {
            bail!(ErrorKind::InvalidInput(format!(
                "clause constraint `{}` is not boolean",
                terms.display(constraint)
            )))
        }
        for app in &body {
            match terms.fun_of(*app) {
                Some(fun) => self.check_registered(terms, fun)?,
                None => bail!(ErrorKind::InvalidInput(format!(
                    "clause body element `{}` is not a predicate application",
                    terms.display(*app)
                ))),
            }
        }
        self.clauses.push(Clause {
            head,
            constraint,
            body,
        });
        Ok(())
    }

    fn check_registered(&self, terms: &Terms, fun: FunRef) -> Res<()> {
        if !self.preds.contains(&fun) {
            bail!(ErrorKind::InvalidInput(format!(
                "predicate `{}` is not registered in the system",
                terms.fun_name(fun)
            )))
        }
        if terms.fun(fun).ret != Typ::Bool {
            bail!(ErrorKind::InvalidInput(format!(
                "predicate `{}` does not have a boolean result sort",
                terms.fun_name(fun)
            )))
        }
        Ok(())
    }

    /// Pretty, multi-line string representation of the system.
    pub fn to_ml_string(&self, terms: &Terms) -> String {
        let mut s = String::new();
        s.push_str("predicates:");
        for pred in &self.preds {
            s.push_str("\n    ");
            s.push_str(terms.fun_name(*pred));
        }
        s.push_str("\nclauses:");
        for clause in &self.clauses {
            s.push_str("\n    ");
            for (idx, app) in clause.body.iter().enumerate() {
                if idx > 0 {
                    s.push_str(" /\\ ");
                }
                s.push_str(&terms.display(*app).to_string());
            }
            if !clause.body.is_empty() {
                s.push_str(" /\\ ");
            }
            s.push_str(&terms.display(clause.constraint).to_string());
            s.push_str(" => ");
            s.push_str(&terms.display(clause.head).to_string());
        }
        s
    }
}

/// Canonical predicate representation.
///
/// For each predicate `p` of arity `n`, the state application `p(p!0##0, …)` and the next-state
/// application `p(p!0##1, …)`. Read-only once built.
#[derive(Debug, Clone)]
pub struct Canon {
    state: Map<FunRef, TermRef>,
    next: Map<FunRef, TermRef>,
}
impl Canon {
    /// Builds the canonical applications for a set of predicates.
    pub fn build(terms: &mut Terms, preds: &[FunRef]) -> Res<Self> {
        let mut state = Map::new();
        let mut next = Map::new();
        for pred in preds {
            let sig = terms.fun(*pred).clone();
            let mut state_args = Vec::with_capacity(sig.arity());
            for (idx, typ) in sig.args.iter().enumerate() {
                let var = terms.var(format!("{}!{}", sig.name, idx), *typ);
                state_args.push(unroll::at_step_zero(terms, var));
            }
            let state_app = terms.fun_app(*pred, state_args)?;
            let next_app = unroll::shift(terms, state_app, 1);
            state.insert(*pred, state_app);
            next.insert(*pred, next_app);
        }
        Ok(Self { state, next })
    }

    /// The canonical state (step 0) application of a predicate.
    ///
    /// # Panics
    ///
    /// Panics when the predicate is unknown to the table.
    pub fn state_app(&self, pred: FunRef) -> TermRef {
        self.state[&pred]
    }
    /// The canonical next-state (step 1) application of a predicate.
    ///
    /// # Panics
    ///
    /// Panics when the predicate is unknown to the table.
    pub fn next_app(&self, pred: FunRef) -> TermRef {
        self.next[&pred]
    }

    /// The canonical state variables of a predicate, in argument order.
    pub fn state_vars(&self, terms: &Terms, pred: FunRef) -> Vec<TermRef> {
        terms.args_of(self.state_app(pred)).to_vec()
    }
    /// The canonical next-state variables of a predicate, in argument order.
    pub fn next_vars(&self, terms: &Terms, pred: FunRef) -> Vec<TermRef> {
        terms.args_of(self.next_app(pred)).to_vec()
    }
}

/// A normalized system: canonical clauses plus the canonical representation table.
#[derive(Debug, Clone)]
pub struct Normal {
    /// The system, every clause in canonical form.
    pub system: System,
    /// Canonical applications per predicate.
    pub canon: Canon,
}

/// Normalizes a system.
///
/// Every clause is rewritten over clause-unique variables, its body applications are replaced by
/// canonical state applications, its head by the canonical next-state application, and the
/// constraint is extended with the equalities binding original argument terms to canonical
/// variables. Clauses with head `true` are dropped. A predicate symbol occurring twice in one
/// body is rejected ([`ErrorKind::InvalidInput`]).
pub fn normalize(terms: &mut Terms, system: &System) -> Res<Normal> {
    let canon = Canon::build(terms, system.predicates())?;
    let mut out = System::new();
    for pred in system.predicates() {
        out.add_predicate(*pred)
    }

    for (idx, clause) in system.clauses().iter().enumerate() {
        if clause.head == terms.tru() {
            // A `true` head makes the clause vacuous.
            continue;
        }

        let mut body_funs = Set::new();
        for app in &clause.body {
            let fun = terms.fun_of(*app).expect("validated on insertion");
            if !body_funs.insert(fun) {
                bail!(ErrorKind::InvalidInput(format!(
                    "predicate `{}` occurs twice in one clause body",
                    terms.fun_name(fun)
                )))
            }
        }

        // Rename the clause's original variables to clause-unique step-0 auxiliaries.
        let mut originals = terms.vars_of(clause.constraint);
        for part in clause.body.iter().chain(Some(&clause.head)) {
            for var in terms.vars_of(*part) {
                if !originals.contains(&var) {
                    originals.push(var)
                }
            }
        }
        let mut map = Map::new();
        for var in originals {
            let typ = terms.typ_of(var);
            let id = format!("{}!{}{}0", terms.var_id(var), idx, unroll::STEP_SEP);
            let fresh = terms.var(id, typ);
            map.insert(var, fresh);
        }
        let mut subst = rewrite::Subst::new(terms, map)?;

        let mut conjs = vec![subst.apply(terms, clause.constraint)];

        let mut body = Vec::with_capacity(clause.body.len());
        for app in &clause.body {
            let fun = terms.fun_of(*app).expect("validated on insertion");
            let args = terms.args_of(*app).to_vec();
            for (canon_var, arg) in canon.state_vars(terms, fun).into_iter().zip(args) {
                let arg = subst.apply(terms, arg);
                conjs.push(terms.eq(canon_var, arg)?)
            }
            body.push(canon.state_app(fun))
        }

        let head = if clause.is_query(terms) {
            terms.fls()
        } else {
            let fun = terms.fun_of(clause.head).expect("head is UP or false here");
            let args = terms.args_of(clause.head).to_vec();
            for (canon_var, arg) in canon.next_vars(terms, fun).into_iter().zip(args) {
                let arg = subst.apply(terms, arg);
                conjs.push(terms.eq(canon_var, arg)?)
            }
            canon.next_app(fun)
        };

        let constraint = terms.and(conjs)?;
        out.add_clause(terms, head, constraint, body)?;
    }

    Ok(Normal { system: out, canon })
}

#[cfg(test)]
mod test {
    use crate::build;
    use crate::term::{Terms, Typ};

    fn counter_system(terms: &mut Terms) -> (crate::chc::System, crate::term::FunRef) {
        let inv = terms
            .declare_fun("Inv", vec![Typ::Int], Typ::Bool)
            .unwrap();
        let x = terms.var("x", Typ::Int);
        let xp = terms.var("xp", Typ::Int);
        let zero = terms.int(0);
        let mut system = super::System::new();
        system.add_predicate(inv);

        // x = 0 => Inv(x)
        let head = terms.fun_app(inv, vec![x]).unwrap();
        let fact = terms.eq(x, zero).unwrap();
        system.add_clause(terms, head, fact, vec![]).unwrap();

        // Inv(x) /\ xp = x + 1 => Inv(xp)
        let head = terms.fun_app(inv, vec![xp]).unwrap();
        let step = build!(terms, (= (xp: int) (+ (x: int) 1)));
        let inv_x = terms.fun_app(inv, vec![x]).unwrap();
        system.add_clause(terms, head, step, vec![inv_x]).unwrap();

        // Inv(x) /\ x < 0 => false
        let bad = build!(terms, (< (x: int) 0));
        let inv_x = terms.fun_app(inv, vec![x]).unwrap();
        let fls = terms.fls();
        system.add_clause(terms, fls, bad, vec![inv_x]).unwrap();

        (system, inv)
    }

    #[test]
    fn canonical_applications() {
        let mut terms = Terms::new();
        let (system, inv) = counter_system(&mut terms);
        let normal = super::normalize(&mut terms, &system).unwrap();
        assert_eq!(
            terms.display(normal.canon.state_app(inv)).to_string(),
            "(Inv Inv!0##0)"
        );
        assert_eq!(
            terms.display(normal.canon.next_app(inv)).to_string(),
            "(Inv Inv!0##1)"
        );
    }

    #[test]
    fn normalized_clause_shapes() {
        let mut terms = Terms::new();
        let (system, inv) = counter_system(&mut terms);
        let normal = super::normalize(&mut terms, &system).unwrap();
        let clauses = normal.system.clauses();
        assert_eq!(clauses.len(), 3);

        // Heads are the canonical next-state application or `false`.
        assert_eq!(clauses[0].head, normal.canon.next_app(inv));
        assert_eq!(clauses[1].head, normal.canon.next_app(inv));
        assert!(clauses[2].is_query(&terms));
        // Bodies are canonical state applications.
        assert!(clauses[0].is_fact());
        assert_eq!(clauses[1].body, vec![normal.canon.state_app(inv)]);

        // Every predicate argument is a distinct variable after normalization.
        for clause in clauses {
            for app in clause.body.iter().chain(Some(&clause.head)) {
                let args = terms.args_of(*app);
                for (i, a) in args.iter().enumerate() {
                    assert!(terms.is_var(*a));
                    for b in &args[i + 1..] {
                        assert_ne!(a, b);
                    }
                }
            }
        }
    }

    #[test]
    fn auxiliaries_are_clause_unique() {
        let mut terms = Terms::new();
        let (system, _) = counter_system(&mut terms);
        let normal = super::normalize(&mut terms, &system).unwrap();
        let clauses = normal.system.clauses();

        let canon_or_aux = |terms: &Terms, t| {
            let vars = terms.vars_of(t);
            vars.into_iter()
                .filter(|v| !terms.var_id(*v).starts_with("Inv!"))
                .map(|v| terms.var_id(v).to_string())
                .collect::<Vec<_>>()
        };
        let aux1 = canon_or_aux(&terms, clauses[1].constraint);
        let aux2 = canon_or_aux(&terms, clauses[2].constraint);
        assert!(!aux1.is_empty() && !aux2.is_empty());
        for a in &aux1 {
            assert!(!aux2.contains(a))
        }
    }

    #[test]
    fn true_heads_drop() {
        let mut terms = Terms::new();
        let mut system = super::System::new();
        let tru = terms.tru();
        let a = build!(terms, (a: bool));
        system.add_clause(&terms, tru, a, vec![]).unwrap();
        let normal = super::normalize(&mut terms, &system).unwrap();
        assert!(normal.system.clauses().is_empty());
    }

    #[test]
    fn duplicate_body_predicate_is_rejected() {
        let mut terms = Terms::new();
        let p = terms.declare_fun("P", vec![Typ::Int], Typ::Bool).unwrap();
        let x = terms.var("x", Typ::Int);
        let y = terms.var("y", Typ::Int);
        let mut system = super::System::new();
        system.add_predicate(p);
        let p_x = terms.fun_app(p, vec![x]).unwrap();
        let p_y = terms.fun_app(p, vec![y]).unwrap();
        let fls = terms.fls();
        let tru = terms.tru();
        system.add_clause(&terms, fls, tru, vec![p_x, p_y]).unwrap();
        assert!(super::normalize(&mut terms, &system).is_err());
    }

    #[test]
    fn rejects_non_horn_heads() {
        let mut terms = Terms::new();
        let mut system = super::System::new();
        let bad_head = build!(terms, (and (a: bool) (b: bool)));
        let tru = terms.tru();
        assert!(system.add_clause(&terms, bad_head, tru, vec![]).is_err());
    }
}
