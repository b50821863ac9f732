// Copyright (c)  by Gleb E. Zaslavkiy
//MIT License
#![allow(non_camel_case_types)]
#![allow(non_snake_case)]
//! # Nexsys
//! A small language for systems of equations and the numeric engine that solves them.
//!
//! ```
//! let text = "\"demo\"\na = 4\nb = a + 5\nx + y = b\nx - y = a";
//! let (solution, report) = nexsys::solve(text).unwrap();
//! println!("{}", solution);
//! assert!((solution["x"] - 6.5).abs() < 1e-9);
//! assert!(report.is_complete());
//! ```
pub mod Utils;
pub mod config;
pub mod errors;
pub mod numerical;
pub mod parsing;
pub mod symbolic;
pub mod units;

pub use Utils::report::{Solution, SolveReport};
pub use config::SolverConfig;
pub use errors::NexsysError;
pub use numerical::solver::Nexsys;
pub use parsing::{Program, compile};

/// Documentation of [`solve`], available at runtime through [`solve_doc`].
pub const SOLVE_DOC: &str = r#"solve(text) -> (solution, report)

Solves a system of equations written in the Nexsys language.

One statement per line:
    x + y = b                  equation; the residual is lhs - rhs
    guess 2.5 for x            initial value of an unknown (default 1.0)
    keep x on [0, 10]          domain the value of x is clamped to
    if a < b:                  conditional equation; comparators are
        y = a                  ==, !=, <, <=, >, >=. Each branch holds one
    else:                      equation (a bare expression means `= 0`) or
        y = b                  one nested if-block
    end
    "any text in quotes"       comment
    [ft->m]  [psi->kPa]        unit conversion factor (a^2, a^3, a-b and a/b units work too)
    #g  #pi  #R                named constant
    y = if(x > 0, x, -x)       inline conditional

Functions: exp ln log log10 sqrt abs sin cos tan tg cot ctg asin arcsin acos arccos
atan arctan arctg pow, with `^` for powers.

Returns the solution (value of every variable, printable as a table) and a report:
the procedure followed, unsolved equations, fully known equations that do not hold,
variables accepted without convergence, the iteration count and the elapsed time.
Malformed text is a parse error naming the line; a singular system, a vanishing
derivative or running out of iterations is a solve-time error."#;

pub fn solve_doc() -> &'static str {
    SOLVE_DOC
}

/// Solves `text` with the default [`SolverConfig`]. See [`SOLVE_DOC`].
pub fn solve(text: &str) -> Result<(Solution, SolveReport), NexsysError> {
    solve_with_config(text, &SolverConfig::default())
}

pub fn solve_with_config(
    text: &str,
    config: &SolverConfig,
) -> Result<(Solution, SolveReport), NexsysError> {
    Nexsys::new(text, config)?.solve()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_solve_returns_pair() {
        let (solution, report) = solve("x = 2\ny = x^2").unwrap();
        assert_eq!(solution.len(), 2);
        assert!(!solution.to_string().is_empty());
        assert_eq!(report.log.len(), 2);
    }

    #[test]
    fn test_solve_doc() {
        assert!(!solve_doc().is_empty());
        assert!(solve_doc().starts_with("solve(text)"));
    }

    #[test]
    fn test_solve_with_config() {
        let config = SolverConfig::default().with_loglevel("off").with_tolerance(1e-12);
        let (solution, _) = solve_with_config("keep x on [0, 3]\nx^2 = 2", &config).unwrap();
        assert!((solution["x"] - 2f64.sqrt()).abs() < 1e-10);
    }

    #[test]
    fn test_parse_error() {
        let err = solve("x = 1\ny == 2").unwrap_err();
        assert!(err.is_parse_error());
    }
}
