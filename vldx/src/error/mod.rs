//! Error types

mod form;
mod verification;

pub use form::*;
pub use verification::*;
