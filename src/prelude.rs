//! Common imports throughout this project.

pub use std::{
    collections::{BTreeMap as Map, BTreeSet as Set},
    fmt,
    io::Write,
    ops::{Deref, DerefMut},
};

pub use either::Either;
pub use error_chain::bail;
pub use num::{bigint::Sign, BigInt as Int, BigRational as Rat, One, Zero};
pub use rsmt2::SmtRes;

pub use crate::{arith, bmc, chc, graph, juncts, qe, result, rewrite, term, trans, unroll};

/// Step index.
///
/// In the context of an unrolled system, this is the index of the *current step*. If this index is
/// `7` for instance, then state variable `v` in the current step will be `v##7` and will be `v##8`
/// in the next step.
pub type Unroll = usize;

error_chain::error_chain! {
    types {
        Error, ErrorKind, ResExt, Res;
    }

    links {
        Smt(rsmt2::errors::Error, rsmt2::errors::ErrorKind)
        /// An error from the `rsmt2` crate.
        ;
    }

    foreign_links {
        Io(std::io::Error)
        /// I/O error.
        ;
    }

    errors {
        /// Ill-formed input: a sort mismatch, a non-variable where a variable is required, or a
        /// clause that is not in Horn shape.
        InvalidInput(msg: String) {
            description("invalid input")
            display("invalid input: {}", msg)
        }
    }
}

/// Convenience constructor for [`ErrorKind::InvalidInput`] errors.
pub fn invalid_input(msg: impl Into<String>) -> Error {
    ErrorKind::InvalidInput(msg.into()).into()
}
