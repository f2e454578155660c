//! Model extraction for the engine.
//!
//! Equips the [`rsmt2`] solver with parsers for the stepped symbols this crate emits
//! (`|base##k|`) and for constant model values, and turns solver models into
//! [counterexample traces][crate::result::Trace].

crate::prelude!();

use result::Trace;
use term::{Cst, Typ};

/// An identifier from a model: base name, and step when the symbol is stepped.
pub type Ident = (String, Option<i64>);

/// SMT-LIB parser for stepped identifiers, types and constant values.
#[derive(Debug, Clone, Copy)]
pub struct Parser;

/// Type alias for rsmt2's solver equipped with our parser.
pub type Solver = rsmt2::Solver<Parser>;

impl<'a> rsmt2::parse::IdentParser<Ident, Typ, &'a str> for Parser {
    fn parse_ident(self, input: &'a str) -> SmtRes<Ident> {
        let input = input.trim();
        let input = input
            .strip_prefix('|')
            .and_then(|s| s.strip_suffix('|'))
            .unwrap_or(input);
        if let Some(pos) = input.rfind(unroll::STEP_SEP) {
            if let Ok(step) = input[pos + unroll::STEP_SEP.len()..].parse::<i64>() {
                return Ok((input[..pos].into(), Some(step)));
            }
        }
        Ok((input.into(), None))
    }
    fn parse_type(self, input: &'a str) -> SmtRes<Typ> {
        match input {
            "Bool" => Ok(Typ::Bool),
            "Int" => Ok(Typ::Int),
            "Real" => Ok(Typ::Rat),
            _ => bail!("unexpected type string `{}`", input),
        }
    }
}
impl<'a> rsmt2::parse::ModelParser<Ident, Typ, Cst, &'a str> for Parser {
    fn parse_value(
        self,
        input: &'a str,
        _: &Ident,
        _: &[(Ident, Typ)],
        _: &Typ,
    ) -> SmtRes<Cst> {
        match parse_cst(input) {
            Some(cst) => Ok(cst),
            None => bail!("unexpected value string `{}`", input),
        }
    }
}

/// Builds a trace out of a model: one entry per stepped nullary symbol.
pub fn trace_of_model(model: Vec<(Ident, Vec<(Ident, Typ)>, Typ, Cst)>) -> Trace {
    let mut trace = Trace::new();
    for ((base, step), args, _typ, cst) in model {
        if !args.is_empty() {
            continue;
        }
        if let Some(step) = step {
            trace.insert(step, base, cst)
        }
    }
    trace
}

/// Parses a constant value s-expression: booleans, integers, decimals, negation and division.
pub fn parse_cst(input: &str) -> Option<Cst> {
    let cleaned = input.replace('(', " ( ").replace(')', " ) ");
    let tokens: Vec<&str> = cleaned.split_whitespace().collect();
    let (cst, used) = parse_tokens(&tokens)?;
    if used == tokens.len() {
        Some(cst)
    } else {
        None
    }
}

fn parse_tokens(tokens: &[&str]) -> Option<(Cst, usize)> {
    match *tokens.first()? {
        "(" => {
            let op = *tokens.get(1)?;
            let mut pos = 2;
            let mut args = vec![];
            while *tokens.get(pos)? != ")" {
                let (arg, used) = parse_tokens(&tokens[pos..])?;
                args.push(arg);
                pos += used;
            }
            pos += 1;
            let cst = match (op, args.len()) {
                ("-", 1) => match args.pop()? {
                    Cst::I(i) => Cst::I(-i),
                    Cst::R(r) => Cst::R(-r),
                    Cst::B(_) => return None,
                },
                ("/", 2) => {
                    let den = rat_of(args.pop()?)?;
                    let num = rat_of(args.pop()?)?;
                    if den.is_zero() {
                        return None;
                    }
                    Cst::R(num / den)
                }
                _ => return None,
            };
            Some((cst, pos))
        }
        atom => Some((parse_atom(atom)?, 1)),
    }
}

fn rat_of(cst: Cst) -> Option<Rat> {
    match cst {
        Cst::I(i) => Some(Rat::from(i)),
        Cst::R(r) => Some(r),
        Cst::B(_) => None,
    }
}

fn parse_atom(atom: &str) -> Option<Cst> {
    match atom {
        "true" => return Some(Cst::B(true)),
        "false" => return Some(Cst::B(false)),
        _ => (),
    }
    if let Some((int_part, frac_part)) = atom.split_once('.') {
        // Decimal notation, e.g. `1.5` or `3.0`.
        let digits: String = format!("{}{}", int_part, frac_part);
        let num = digits.parse::<Int>().ok()?;
        let den = Int::from(10u8).pow(frac_part.len() as u32);
        return Some(Cst::R(Rat::new(num, den)));
    }
    atom.parse::<Int>().ok().map(Cst::I)
}
