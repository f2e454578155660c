//! Hash-consed terms and the arena that owns them.
//!
//! All sorts, uninterpreted function symbols and terms live in a [`Terms`] arena. Handles
//! ([`TermRef`], [`FunRef`], [`SortRef`]) are small `Copy` indices; two structurally equal terms
//! always share one handle, so handle equality is structural equality and hashing a handle is
//! O(1). The arena is append-only: handles stay valid for its whole lifetime.

crate::prelude!();

use std::collections::HashMap;

use rsmt2::print::{Expr2Smt, Sort2Smt, Sym2Smt};


/// A sort handle, pointing into a [`Terms`] arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SortRef(u32);

/// An uninterpreted-function handle, pointing into a [`Terms`] arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FunRef(u32);

/// A term handle, pointing into a [`Terms`] arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TermRef(u32);

/// A type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Typ {
    /// Bool type.
    Bool,
    /// Integer type.
    Int,
    /// Rational type.
    Rat,
    /// A user-declared uninterpreted sort.
    Decl(SortRef),
}
impl Typ {
    /// Creates a bool type.
    pub fn bool() -> Self {
        Self::Bool
    }
    /// Creates an integer type.
    pub fn int() -> Self {
        Self::Int
    }
    /// Creates a rational type.
    pub fn rat() -> Self {
        Self::Rat
    }

    /// True if the type is an arithmetic one.
    pub fn is_arith(self) -> bool {
        match self {
            Self::Bool | Self::Decl(_) => false,
            Self::Int | Self::Rat => true,
        }
    }
}

/// Constants.
///
/// Currently only booleans, integers and rationals are supported. Rationals are canonical: lowest
/// terms, positive denominator.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Cst {
    /// Bool constant.
    B(bool),
    /// Integer constant.
    I(Int),
    /// Rational constant.
    R(Rat),
}
impl Cst {
    /// Creates a boolean constant.
    pub fn bool(b: bool) -> Self {
        Cst::B(b)
    }
    /// Creates an integer constant.
    pub fn int<I: Into<Int>>(i: I) -> Self {
        Cst::I(i.into())
    }
    /// Creates a rational constant.
    pub fn rat<R: Into<Rat>>(r: R) -> Self {
        Cst::R(r.into())
    }

    /// Type of the constant.
    pub fn typ(&self) -> Typ {
        match self {
            Self::B(_) => Typ::Bool,
            Self::I(_) => Typ::Int,
            Self::R(_) => Typ::Rat,
        }
    }
}
impl fmt::Display for Cst {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::B(b) => b.fmt(fmt),
            Self::I(i) => {
                if i.sign() == Sign::Minus {
                    write!(fmt, "(- {})", -i)
                } else {
                    i.fmt(fmt)
                }
            }
            Self::R(r) => {
                let (num, den) = (r.numer(), r.denom());
                if num.sign() == Sign::Minus {
                    write!(fmt, "(- (/ {} {}))", -num, den)
                } else {
                    write!(fmt, "(/ {} {})", num, den)
                }
            }
        }
    }
}
impl From<bool> for Cst {
    fn from(b: bool) -> Self {
        Self::B(b)
    }
}
impl From<Int> for Cst {
    fn from(i: Int) -> Self {
        Self::I(i)
    }
}
impl From<Rat> for Cst {
    fn from(r: Rat) -> Self {
        Self::R(r)
    }
}
impl From<(i64, i64)> for Cst {
    fn from((num, den): (i64, i64)) -> Self {
        Self::R(Rat::new(num.into(), den.into()))
    }
}

/// Operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Op {
    /// If-then-else.
    Ite,
    /// Implication.
    Implies,
    /// Addition.
    Add,
    /// Subtraction, or negation when unary.
    Sub,
    /// Multiplication.
    Mul,
    /// Division.
    Div,
    /// Integer division.
    IDiv,
    /// Integer modulo.
    Mod,
    /// Greater or equal.
    Ge,
    /// Less or equal.
    Le,
    /// Greater than.
    Gt,
    /// Less than.
    Lt,
    /// Equality.
    Eq,
    /// Negation.
    Not,
    /// Conjunction.
    And,
    /// Disjunction.
    Or,
}
impl Op {
    /// SMT-LIB string representation.
    pub fn smt_str(self) -> &'static str {
        match self {
            Self::Ite => "ite",
            Self::Implies => "=>",
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::IDiv => "div",
            Self::Mod => "mod",
            Self::Ge => ">=",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Lt => "<",
            Self::Eq => "=",
            Self::Not => "not",
            Self::And => "and",
            Self::Or => "or",
        }
    }

    /// True if `self` is an arithmetic relation.
    pub fn is_arith_relation(self) -> bool {
        matches!(self, Self::Ge | Self::Le | Self::Gt | Self::Lt)
    }

    /// Minimal arity of `self`.
    pub fn min_arity(self) -> usize {
        match self {
            Self::Not | Self::Add | Self::Sub => 1,
            Self::Mod
            | Self::Mul
            | Self::Div
            | Self::IDiv
            | Self::And
            | Self::Or
            | Self::Implies
            | Self::Eq
            | Self::Le
            | Self::Lt
            | Self::Ge
            | Self::Gt => 2,
            Self::Ite => 3,
        }
    }

    /// Maximal arity for `self`, `None` if infinite.
    pub fn max_arity(self) -> Option<usize> {
        match self {
            Self::Not => Some(1),
            Self::Add
            | Self::Sub
            | Self::Mul
            | Self::And
            | Self::Or
            | Self::Implies
            | Self::Eq
            | Self::Le
            | Self::Lt
            | Self::Ge
            | Self::Gt => None,
            Self::Mod | Self::Div | Self::IDiv => Some(2),
            Self::Ite => Some(3),
        }
    }

    /// Type-checks an operator application over term handles.
    ///
    /// Reports arity and sort mismatches as [`ErrorKind::InvalidInput`].
    pub fn result_typ(self, terms: &Terms, args: &[TermRef]) -> Res<Typ> {
        if args.len() < self.min_arity() {
            bail!(ErrorKind::InvalidInput(format!(
                "`{}` expects at least {} argument(s)",
                self,
                self.min_arity(),
            )))
        }
        if let Some(max) = self.max_arity() {
            if args.len() > max {
                bail!(ErrorKind::InvalidInput(format!(
                    "`{}` expects at most {} argument(s)",
                    self, max
                )))
            }
        }

        let typ = match self {
            Self::Ite => {
                let typ = terms.typ_of(args[0]);
                if typ != Typ::Bool {
                    bail!(ErrorKind::InvalidInput(format!(
                        "expected first argument of type `bool`, got `{}`",
                        typ
                    )))
                }

                let thn_typ = terms.typ_of(args[1]);
                let els_typ = terms.typ_of(args[2]);

                if thn_typ != els_typ {
                    bail!(ErrorKind::InvalidInput(format!(
                        "`{}`'s second and third arguments should have the same type, \
                         got `{}` and `{}`",
                        self, thn_typ, els_typ,
                    )))
                }

                thn_typ
            }
            Self::Implies | Self::And | Self::Or | Self::Not => {
                if args.iter().any(|t| terms.typ_of(*t) != Typ::Bool) {
                    bail!(ErrorKind::InvalidInput(format!(
                        "`{}`'s arguments must all be boolean expressions",
                        self
                    )))
                }
                Typ::Bool
            }

            Self::Add
            | Self::Sub
            | Self::Mul
            | Self::Div
            | Self::IDiv
            | Self::Mod
            | Self::Le
            | Self::Ge
            | Self::Lt
            | Self::Gt => {
                let mut typs = args.iter().map(|t| terms.typ_of(*t));
                let first = typs.next().expect("at least one argument");
                if !first.is_arith() {
                    bail!(ErrorKind::InvalidInput(format!(
                        "`{}`'s arguments must have an arithmetic type, unexpected type `{}`",
                        self, first,
                    )))
                }
                for typ in typs {
                    if typ != first {
                        bail!(ErrorKind::InvalidInput(format!(
                            "`{}`'s arguments must all have the same type, found `{}` and `{}`",
                            self, first, typ,
                        )))
                    }
                }
                if (self == Self::IDiv || self == Self::Mod) && first != Typ::Int {
                    bail!(ErrorKind::InvalidInput(format!(
                        "`{}` can only be applied to integer arguments, found `{}`",
                        self, first,
                    )))
                }

                if self == Self::Div {
                    Typ::Rat
                } else if self == Self::Mod {
                    Typ::Int
                } else if self.is_arith_relation() {
                    Typ::Bool
                } else {
                    first
                }
            }

            Self::Eq => {
                let mut typs = args.iter().map(|t| terms.typ_of(*t));
                let first = typs.next().expect("at least one argument");
                for typ in typs {
                    if typ != first {
                        bail!(ErrorKind::InvalidInput(format!(
                            "`{}`'s arguments must all have the same type, found `{}` and `{}`",
                            self, first, typ,
                        )))
                    }
                }
                Typ::Bool
            }
        };

        Ok(typ)
    }
}

/// An uninterpreted function symbol: a name bound to argument sorts and a result sort.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fun {
    /// Symbol name.
    pub name: String,
    /// Argument sorts.
    pub args: Vec<Typ>,
    /// Result sort.
    pub ret: Typ,
}
impl Fun {
    /// Number of arguments.
    pub fn arity(&self) -> usize {
        self.args.len()
    }
}

/// A term node.
///
/// Nodes reference their children by handle; the [`Terms`] arena guarantees one node per
/// structure.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Term {
    /// A constant.
    Cst(Cst),
    /// A typed variable.
    Var {
        /// Variable identifier.
        id: String,
        /// Type of the variable.
        typ: Typ,
    },
    /// An interpreted operator application.
    App {
        /// The operator.
        op: Op,
        /// The arguments.
        args: Vec<TermRef>,
    },
    /// An uninterpreted function (predicate) application.
    Fun {
        /// The function symbol.
        fun: FunRef,
        /// The arguments.
        args: Vec<TermRef>,
    },
}

/// The term arena.
///
/// Owns sorts, function symbols and hash-consed term nodes. All term construction goes through
/// the arena so that structurally equal terms share one handle.
#[derive(Debug)]
pub struct Terms {
    /// Declared uninterpreted sort names.
    sorts: Vec<String>,
    /// Sort interning table.
    sort_ids: HashMap<String, SortRef>,
    /// Declared function symbols.
    funs: Vec<Fun>,
    /// Function interning table, keyed by name.
    fun_ids: HashMap<String, FunRef>,
    /// Term nodes, indexed by handle.
    nodes: Vec<Term>,
    /// Term interning table.
    node_ids: HashMap<Term, TermRef>,
    /// Handle of the `true` constant.
    tru: TermRef,
    /// Handle of the `false` constant.
    fls: TermRef,
}

impl Default for Terms {
    fn default() -> Self {
        Self::new()
    }
}

impl Terms {
    /// Constructor. `true` and `false` are interned eagerly.
    pub fn new() -> Self {
        let mut terms = Self {
            sorts: vec![],
            sort_ids: HashMap::new(),
            funs: vec![],
            fun_ids: HashMap::new(),
            nodes: vec![],
            node_ids: HashMap::new(),
            tru: TermRef(0),
            fls: TermRef(0),
        };
        terms.tru = terms.intern(Term::Cst(Cst::B(true)));
        terms.fls = terms.intern(Term::Cst(Cst::B(false)));
        terms
    }

    /// Number of distinct terms in the arena.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }
    /// True if the arena holds no terms. Never true in practice, `true`/`false` are always there.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    fn intern(&mut self, node: Term) -> TermRef {
        if let Some(tref) = self.node_ids.get(&node) {
            return *tref;
        }
        let tref = TermRef(self.nodes.len() as u32);
        self.nodes.push(node.clone());
        self.node_ids.insert(node, tref);
        tref
    }

    /// The node behind a handle.
    pub fn node(&self, t: TermRef) -> &Term {
        &self.nodes[t.0 as usize]
    }

    /// Declares an uninterpreted sort, or retrieves it if the name is known.
    pub fn declare_sort(&mut self, name: impl Into<String>) -> SortRef {
        let name = name.into();
        if let Some(sref) = self.sort_ids.get(&name) {
            return *sref;
        }
        let sref = SortRef(self.sorts.len() as u32);
        self.sorts.push(name.clone());
        self.sort_ids.insert(name, sref);
        sref
    }

    /// Name of a declared sort.
    pub fn sort_name(&self, s: SortRef) -> &str {
        &self.sorts[s.0 as usize]
    }

    /// All declared sorts.
    pub fn sorts(&self) -> impl Iterator<Item = SortRef> + '_ {
        (0..self.sorts.len()).map(|i| SortRef(i as u32))
    }

    /// Declares an uninterpreted function symbol.
    ///
    /// Redeclaring a name with the same signature returns the existing handle; a different
    /// signature is an [`ErrorKind::InvalidInput`] error.
    pub fn declare_fun(
        &mut self,
        name: impl Into<String>,
        args: Vec<Typ>,
        ret: Typ,
    ) -> Res<FunRef> {
        let name = name.into();
        if let Some(fref) = self.fun_ids.get(&name) {
            let known = &self.funs[fref.0 as usize];
            if known.args == args && known.ret == ret {
                return Ok(*fref);
            }
            bail!(ErrorKind::InvalidInput(format!(
                "symbol `{}` redeclared with a different signature",
                name
            )))
        }
        let fref = FunRef(self.funs.len() as u32);
        self.funs.push(Fun {
            name: name.clone(),
            args,
            ret,
        });
        self.fun_ids.insert(name, fref);
        Ok(fref)
    }

    /// The declaration behind a function handle.
    pub fn fun(&self, f: FunRef) -> &Fun {
        &self.funs[f.0 as usize]
    }
    /// Name of a function symbol.
    pub fn fun_name(&self, f: FunRef) -> &str {
        &self.fun(f).name
    }

    /// The `true` constant.
    pub fn tru(&self) -> TermRef {
        self.tru
    }
    /// The `false` constant.
    pub fn fls(&self) -> TermRef {
        self.fls
    }

    /// Interns a constant.
    pub fn cst(&mut self, cst: impl Into<Cst>) -> TermRef {
        self.intern(Term::Cst(cst.into()))
    }
    /// Interns an integer constant.
    pub fn int(&mut self, i: impl Into<Int>) -> TermRef {
        self.cst(Cst::I(i.into()))
    }
    /// Interns a rational constant.
    pub fn rat(&mut self, r: impl Into<Rat>) -> TermRef {
        self.cst(Cst::R(r.into()))
    }

    /// Creates a variable, or retrieves the existing one with the same name and type.
    pub fn var(&mut self, id: impl Into<String>, typ: Typ) -> TermRef {
        self.intern(Term::Var {
            id: id.into(),
            typ,
        })
    }

    /// Creates an operator application.
    ///
    /// The application is sort-checked and lightly canonicalized: boolean units and constant
    /// operands fold, double negation cancels, degenerate `and`/`or`/`ite` collapse.
    pub fn app(&mut self, op: Op, args: Vec<TermRef>) -> Res<TermRef> {
        op.result_typ(self, &args)?;
        Ok(self.simplified_app(op, args))
    }

    /// Creates an uninterpreted function application. Checks the signature.
    pub fn fun_app(&mut self, fun: FunRef, args: Vec<TermRef>) -> Res<TermRef> {
        let sig = self.fun(fun);
        if sig.arity() != args.len() {
            bail!(ErrorKind::InvalidInput(format!(
                "`{}` expects {} argument(s), got {}",
                sig.name,
                sig.arity(),
                args.len()
            )))
        }
        let expected: Vec<Typ> = sig.args.clone();
        for (idx, (arg, exp)) in args.iter().zip(expected).enumerate() {
            let got = self.typ_of(*arg);
            if got != exp {
                bail!(ErrorKind::InvalidInput(format!(
                    "argument {} of `{}` has type `{}`, expected `{}`",
                    idx,
                    self.fun_name(fun),
                    got,
                    exp
                )))
            }
        }
        Ok(self.intern(Term::Fun { fun, args }))
    }

    /// Negation. Sugar for [`Self::app`] with [`Op::Not`].
    pub fn not(&mut self, t: TermRef) -> Res<TermRef> {
        self.app(Op::Not, vec![t])
    }
    /// Conjunction. Sugar for [`Self::app`] with [`Op::And`]; the empty conjunction is `true`.
    pub fn and(&mut self, mut conjs: Vec<TermRef>) -> Res<TermRef> {
        match conjs.len() {
            0 => Ok(self.tru),
            1 => Ok(conjs.pop().expect("len 1")),
            _ => self.app(Op::And, conjs),
        }
    }
    /// Disjunction. Sugar for [`Self::app`] with [`Op::Or`]; the empty disjunction is `false`.
    pub fn or(&mut self, mut disjs: Vec<TermRef>) -> Res<TermRef> {
        match disjs.len() {
            0 => Ok(self.fls),
            1 => Ok(disjs.pop().expect("len 1")),
            _ => self.app(Op::Or, disjs),
        }
    }
    /// Binary equality. Sugar for [`Self::app`] with [`Op::Eq`].
    pub fn eq(&mut self, lhs: TermRef, rhs: TermRef) -> Res<TermRef> {
        self.app(Op::Eq, vec![lhs, rhs])
    }

    /// Simplifies the application of `op` to `args`, **non-recursively**, and interns the result.
    fn simplified_app(&mut self, op: Op, args: Vec<TermRef>) -> TermRef {
        let (tru, fls) = (self.tru, self.fls);
        match op {
            Op::And => {
                if args.iter().any(|a| *a == fls) {
                    return fls;
                }
                let mut seen = Set::new();
                let args: Vec<_> = args
                    .into_iter()
                    .filter(|a| *a != tru && seen.insert(*a))
                    .collect();
                match args.len() {
                    0 => tru,
                    1 => args[0],
                    _ => self.intern(Term::App { op, args }),
                }
            }
            Op::Or => {
                if args.iter().any(|a| *a == tru) {
                    return tru;
                }
                let mut seen = Set::new();
                let args: Vec<_> = args
                    .into_iter()
                    .filter(|a| *a != fls && seen.insert(*a))
                    .collect();
                match args.len() {
                    0 => fls,
                    1 => args[0],
                    _ => self.intern(Term::App { op, args }),
                }
            }
            Op::Not => {
                let arg = args[0];
                if arg == tru {
                    fls
                } else if arg == fls {
                    tru
                } else if let Term::App {
                    op: Op::Not,
                    args: inner,
                } = self.node(arg)
                {
                    inner[0]
                } else {
                    self.intern(Term::App { op, args })
                }
            }
            Op::Ite => {
                let (cnd, thn, els) = (args[0], args[1], args[2]);
                if cnd == tru {
                    thn
                } else if cnd == fls {
                    els
                } else if thn == els {
                    thn
                } else {
                    self.intern(Term::App { op, args })
                }
            }
            Op::Eq => {
                if args.windows(2).all(|w| w[0] == w[1]) {
                    return tru;
                }
                // Two distinct constants among the arguments refute the equality; distinct
                // handles are distinct constants thanks to hash-consing.
                let mut first_cst: Option<TermRef> = None;
                for arg in &args {
                    if self.is_cst(*arg) {
                        match first_cst {
                            None => first_cst = Some(*arg),
                            Some(known) if known != *arg => return fls,
                            Some(_) => (),
                        }
                    }
                }
                self.intern(Term::App { op, args })
            }
            Op::Add | Op::Sub | Op::Mul | Op::Div | Op::Ge | Op::Le | Op::Gt | Op::Lt => {
                if let Some(folded) = self.fold_arith(op, &args) {
                    return folded;
                }
                self.intern(Term::App { op, args })
            }
            Op::Implies | Op::IDiv | Op::Mod => self.intern(Term::App { op, args }),
        }
    }

    /// Folds an arithmetic application when every argument is a constant.
    fn fold_arith(&mut self, op: Op, args: &[TermRef]) -> Option<TermRef> {
        let mut csts = Vec::with_capacity(args.len());
        for arg in args {
            match self.node(*arg) {
                Term::Cst(Cst::I(i)) => csts.push(Either::Left(i.clone())),
                Term::Cst(Cst::R(r)) => csts.push(Either::Right(r.clone())),
                _ => return None,
            }
        }
        // Same-type arguments, checked upstream.
        let folded: Cst = match op {
            Op::Add | Op::Sub | Op::Mul | Op::Div => {
                let mut rats = csts.iter().map(|c| match c {
                    Either::Left(i) => Rat::from(i.clone()),
                    Either::Right(r) => r.clone(),
                });
                let first = rats.next()?;
                let acc = match op {
                    Op::Add => rats.fold(first, |acc, r| acc + r),
                    Op::Mul => rats.fold(first, |acc, r| acc * r),
                    Op::Sub => {
                        if csts.len() == 1 {
                            -first
                        } else {
                            rats.fold(first, |acc, r| acc - r)
                        }
                    }
                    Op::Div => {
                        let mut acc = first;
                        for r in rats {
                            if r.is_zero() {
                                return None;
                            }
                            acc = acc / r;
                        }
                        acc
                    }
                    _ => unreachable!(),
                };
                let ints = csts.iter().all(|c| c.is_left());
                if ints && op != Op::Div {
                    Cst::I(acc.to_integer())
                } else {
                    Cst::R(acc)
                }
            }
            Op::Ge | Op::Le | Op::Gt | Op::Lt => {
                let rats: Vec<Rat> = csts
                    .iter()
                    .map(|c| match c {
                        Either::Left(i) => Rat::from(i.clone()),
                        Either::Right(r) => r.clone(),
                    })
                    .collect();
                let holds = rats.windows(2).all(|w| match op {
                    Op::Ge => w[0] >= w[1],
                    Op::Le => w[0] <= w[1],
                    Op::Gt => w[0] > w[1],
                    Op::Lt => w[0] < w[1],
                    _ => unreachable!(),
                });
                Cst::B(holds)
            }
            _ => return None,
        };
        Some(self.cst(folded))
    }

    /// Type of a term.
    pub fn typ_of(&self, t: TermRef) -> Typ {
        match self.node(t) {
            Term::Cst(cst) => cst.typ(),
            Term::Var { typ, .. } => *typ,
            Term::App { op, args } => match op.result_typ(self, args) {
                Ok(typ) => typ,
                Err(e) => panic!("illegal operator application `{}`: {}", self.display(t), e),
            },
            Term::Fun { fun, .. } => self.fun(*fun).ret,
        }
    }

    /// True if the term has sort bool.
    pub fn has_typ_bool(&self, t: TermRef) -> bool {
        self.typ_of(t) == Typ::Bool
    }

    /// True if `t` is a variable.
    pub fn is_var(&self, t: TermRef) -> bool {
        matches!(self.node(t), Term::Var { .. })
    }
    /// True if `t` is a constant.
    pub fn is_cst(&self, t: TermRef) -> bool {
        matches!(self.node(t), Term::Cst(_))
    }
    /// True if `t` is a conjunction.
    pub fn is_and(&self, t: TermRef) -> bool {
        matches!(self.node(t), Term::App { op: Op::And, .. })
    }
    /// True if `t` is a disjunction.
    pub fn is_or(&self, t: TermRef) -> bool {
        matches!(self.node(t), Term::App { op: Op::Or, .. })
    }
    /// True if `t` is a negation.
    pub fn is_not(&self, t: TermRef) -> bool {
        matches!(self.node(t), Term::App { op: Op::Not, .. })
    }
    /// True if `t` is an equality.
    pub fn is_eq(&self, t: TermRef) -> bool {
        matches!(self.node(t), Term::App { op: Op::Eq, .. })
    }
    /// True if `t` is an if-then-else.
    pub fn is_ite(&self, t: TermRef) -> bool {
        matches!(self.node(t), Term::App { op: Op::Ite, .. })
    }
    /// True if `t` is an uninterpreted function (predicate) application.
    pub fn is_fun_app(&self, t: TermRef) -> bool {
        matches!(self.node(t), Term::Fun { .. })
    }
    /// True if `t` is an uninterpreted application or a boolean constant.
    pub fn is_up_or_constant(&self, t: TermRef) -> bool {
        self.is_fun_app(t) || t == self.tru || t == self.fls
    }

    /// Children of a term, the empty slice for leaves.
    pub fn args_of(&self, t: TermRef) -> &[TermRef] {
        match self.node(t) {
            Term::Cst(_) | Term::Var { .. } => &[],
            Term::App { args, .. } | Term::Fun { args, .. } => args,
        }
    }
    /// Number of children of a term.
    pub fn arity(&self, t: TermRef) -> usize {
        self.args_of(t).len()
    }
    /// The operator of an application, if any.
    pub fn op_of(&self, t: TermRef) -> Option<Op> {
        match self.node(t) {
            Term::App { op, .. } => Some(*op),
            _ => None,
        }
    }
    /// The function symbol of an uninterpreted application, if any.
    pub fn fun_of(&self, t: TermRef) -> Option<FunRef> {
        match self.node(t) {
            Term::Fun { fun, .. } => Some(*fun),
            _ => None,
        }
    }

    /// Identifier of a variable.
    ///
    /// # Panics
    ///
    /// Panics if `t` is not a variable; callers check [`Self::is_var`] first.
    pub fn var_id(&self, t: TermRef) -> &str {
        match self.node(t) {
            Term::Var { id, .. } => id,
            _ => panic!("`{}` is not a variable", self.display(t)),
        }
    }

    /// All variables of a term, deduplicated, in depth-first discovery order.
    pub fn vars_of(&self, t: TermRef) -> Vec<TermRef> {
        let mut vars = vec![];
        let mut seen = Set::new();
        let mut stack = vec![t];
        while let Some(t) = stack.pop() {
            if !seen.insert(t) {
                continue;
            }
            if self.is_var(t) {
                vars.push(t)
            } else {
                // Reversed so that the leftmost child is popped first.
                stack.extend(self.args_of(t).iter().rev())
            }
        }
        vars
    }

    /// True if `var` occurs in `t`.
    pub fn contains_var(&self, t: TermRef, var: TermRef) -> bool {
        let mut seen = Set::new();
        let mut stack = vec![t];
        while let Some(t) = stack.pop() {
            if !seen.insert(t) {
                continue;
            }
            if t == var {
                return true;
            }
            stack.extend(self.args_of(t))
        }
        false
    }

    /// Display wrapper for a term, an S-expression.
    pub fn display(&self, t: TermRef) -> TermDisp {
        TermDisp { terms: self, t }
    }

    /// SMT-LIB wrapper for a term, for the [`rsmt2`] boundary.
    ///
    /// Variable symbols are pipe-quoted since stepped names carry `#` characters.
    pub fn smt2(&self, t: TermRef) -> Smt2 {
        Smt2 { terms: self, t }
    }

    /// SMT-LIB wrapper for a variable symbol.
    ///
    /// # Panics
    ///
    /// Panics if `t` is not a variable.
    pub fn smt2_var(&self, t: TermRef) -> Smt2Var {
        debug_assert!(self.is_var(t));
        Smt2Var { terms: self, t }
    }

    /// SMT-LIB wrapper for a sort.
    pub fn smt2_typ(&self, typ: Typ) -> Smt2Typ {
        Smt2Typ { terms: self, typ }
    }

    /// SMT-LIB serialization with `let`-bindings for shared subterms.
    ///
    /// A first pass counts references over the DAG; composite terms referenced more than once are
    /// bound (innermost first) and printed once.
    pub fn smt2_with_lets(&self, t: TermRef) -> String {
        let mut counts: Map<TermRef, usize> = Map::new();
        let mut post = vec![];
        let mut stack = vec![(t, false)];
        while let Some((cur, entered)) = stack.pop() {
            if entered {
                post.push(cur);
                continue;
            }
            *counts.entry(cur).or_insert(0) += 1;
            if counts[&cur] > 1 {
                continue;
            }
            stack.push((cur, true));
            for arg in self.args_of(cur) {
                stack.push((*arg, false))
            }
        }

        // Children appear before their parents in `post`.
        let mut names: Map<TermRef, String> = Map::new();
        let mut bindings = vec![];
        for (idx, shared) in post
            .iter()
            .filter(|t| counts[t] > 1 && self.arity(**t) > 0)
            .enumerate()
        {
            let def = self.smt2_string(*shared, &names);
            let name = format!("?def{}", idx);
            names.insert(*shared, name.clone());
            bindings.push((name, def));
        }

        let body = self.smt2_string(t, &names);
        let mut res = String::new();
        for (name, def) in &bindings {
            res.push_str(&format!("(let (({} {})) ", name, def));
        }
        res.push_str(&body);
        for _ in &bindings {
            res.push(')');
        }
        res
    }

    /// SMT-LIB string of a term where the terms in `names` print as their binder.
    fn smt2_string(&self, t: TermRef, names: &Map<TermRef, String>) -> String {
        if let Some(name) = names.get(&t) {
            return name.clone();
        }
        match self.node(t) {
            Term::Cst(cst) => cst.to_string(),
            Term::Var { id, .. } => format!("|{}|", id),
            Term::App { op, args } => {
                let mut s = format!("({}", op.smt_str());
                for arg in args {
                    s.push(' ');
                    s.push_str(&self.smt2_string(*arg, names));
                }
                s.push(')');
                s
            }
            Term::Fun { fun, args } => {
                if args.is_empty() {
                    self.fun_name(*fun).to_string()
                } else {
                    let mut s = format!("({}", self.fun_name(*fun));
                    for arg in args {
                        s.push(' ');
                        s.push_str(&self.smt2_string(*arg, names));
                    }
                    s.push(')');
                    s
                }
            }
        }
    }
}

/// Display wrapper around a term handle.
pub struct TermDisp<'a> {
    terms: &'a Terms,
    t: TermRef,
}
impl fmt::Display for TermDisp<'_> {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        match self.terms.node(self.t) {
            Term::Cst(cst) => cst.fmt(fmt),
            Term::Var { id, .. } => id.fmt(fmt),
            Term::App { op, args } => {
                write!(fmt, "({}", op)?;
                for arg in args {
                    write!(fmt, " {}", self.terms.display(*arg))?
                }
                write!(fmt, ")")
            }
            Term::Fun { fun, args } => {
                if args.is_empty() {
                    write!(fmt, "{}", self.terms.fun_name(*fun))
                } else {
                    write!(fmt, "({}", self.terms.fun_name(*fun))?;
                    for arg in args {
                        write!(fmt, " {}", self.terms.display(*arg))?
                    }
                    write!(fmt, ")")
                }
            }
        }
    }
}

impl fmt::Display for Typ {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Bool => write!(fmt, "bool"),
            Self::Int => write!(fmt, "int"),
            Self::Rat => write!(fmt, "rat"),
            Self::Decl(s) => write!(fmt, "sort#{}", s.0),
        }
    }
}

impl fmt::Display for Op {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        write!(fmt, "{}", self.smt_str())
    }
}

/// SMT-LIB printer for a term.
pub struct Smt2<'a> {
    terms: &'a Terms,
    t: TermRef,
}
impl Expr2Smt<()> for Smt2<'_> {
    fn expr_to_smt2<W: Write>(&self, w: &mut W, _: ()) -> SmtRes<()> {
        write_smt2(self.terms, self.t, w)
    }
}

fn write_smt2<W: Write>(terms: &Terms, t: TermRef, w: &mut W) -> SmtRes<()> {
    match terms.node(t) {
        Term::Cst(cst) => write!(w, "{}", cst)?,
        Term::Var { id, .. } => write!(w, "|{}|", id)?,
        Term::App { op, args } => {
            write!(w, "({}", op.smt_str())?;
            for arg in args {
                write!(w, " ")?;
                write_smt2(terms, *arg, w)?
            }
            write!(w, ")")?
        }
        Term::Fun { fun, args } => {
            if args.is_empty() {
                write!(w, "{}", terms.fun_name(*fun))?
            } else {
                write!(w, "({}", terms.fun_name(*fun))?;
                for arg in args {
                    write!(w, " ")?;
                    write_smt2(terms, *arg, w)?
                }
                write!(w, ")")?
            }
        }
    }
    Ok(())
}

/// SMT-LIB printer for a variable symbol (pipe-quoted).
pub struct Smt2Var<'a> {
    terms: &'a Terms,
    t: TermRef,
}
impl Sym2Smt<()> for Smt2Var<'_> {
    fn sym_to_smt2<W: Write>(&self, w: &mut W, _: ()) -> SmtRes<()> {
        write!(w, "|{}|", self.terms.var_id(self.t))?;
        Ok(())
    }
}

/// SMT-LIB printer for a sort.
pub struct Smt2Typ<'a> {
    terms: &'a Terms,
    typ: Typ,
}
impl Sort2Smt for Smt2Typ<'_> {
    fn sort_to_smt2<W: Write>(&self, w: &mut W) -> SmtRes<()> {
        match self.typ {
            Typ::Bool => write!(w, "Bool")?,
            Typ::Int => write!(w, "Int")?,
            Typ::Rat => write!(w, "Real")?,
            Typ::Decl(s) => write!(w, "{}", self.terms.sort_name(s))?,
        }
        Ok(())
    }
}
