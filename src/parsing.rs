//! Front end of the Nexsys language: text rewrites, then statement compilation.
/// comments, `[from->to]` unit conversions and `#constants`
pub mod preprocess;
/// a single compiled equation and its unknowns
pub mod equation;
/// guesses, domains, equations and `if / else / end` blocks
pub mod statements;

pub use statements::{Program, compile};
