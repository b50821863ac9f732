//! Statement compiler: turns preprocessed system text into a [`Program`].
//!
//! One statement per line:
//! ```text
//!  guess <number> for <var>
//!  keep <var> on [<lo>, <hi>]
//!  <lhs> = <rhs>
//!  if <lhs> <cmp> <rhs>:
//!      <equation or nested if-block>
//!  else:
//!      <equation or nested if-block>
//!  end
//! ```
//! Inside a conditional branch a bare expression `a` means `a = 0`.
use crate::errors::NexsysError;
use crate::parsing::equation::Equation;
use crate::parsing::preprocess::preprocess;
use crate::symbolic::symbolic_engine::{Comparator, Expr};
use itertools::Itertools;
use log::debug;
use regex::Regex;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::LazyLock;
use strum::IntoEnumIterator;

static GUESS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?i:guess)\s+(.+?)\s+(?i:for)\s+([A-Za-z_][A-Za-z0-9_]*)$")
        .expect("valid guess regex")
});
static KEEP: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?i:keep)\s+([A-Za-z_][A-Za-z0-9_]*)\s+(?i:on)\s+\[([^,\]]+),([^\]]+)\]$")
        .expect("valid keep regex")
});
static IF_HEADER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^if\s+(.+):$").expect("valid if regex"));
static ELSE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^else\s*:$").expect("valid else regex"));
static OPERATOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[<>=!]+").expect("valid operator regex"));

/// Compiled system: equations in source order, initial guesses and domains.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Program {
    pub equations: Vec<Equation>,
    pub guesses: BTreeMap<String, f64>,
    pub domains: BTreeMap<String, [f64; 2]>,
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "equations:")?;
        for eq in &self.equations {
            writeln!(f, "  {}", eq)?;
        }
        if !self.guesses.is_empty() {
            writeln!(f, "guesses:")?;
            for (var, value) in &self.guesses {
                writeln!(f, "  {} = {}", var, value)?;
            }
        }
        if !self.domains.is_empty() {
            writeln!(f, "domains:")?;
            for (var, [lo, hi]) in &self.domains {
                writeln!(f, "  {} in [{}, {}]", var, lo, hi)?;
            }
        }
        Ok(())
    }
}

impl Program {
    /// Every variable referenced by any equation, sorted.
    pub fn variables(&self) -> Vec<String> {
        self.equations
            .iter()
            .flat_map(|eq| eq.vars.iter().cloned())
            .sorted()
            .dedup()
            .collect()
    }
}

type Line<'a> = (usize, &'a str);

fn is_else(stmt: &str) -> bool {
    ELSE.is_match(stmt)
}

fn is_end(stmt: &str) -> bool {
    stmt == "end"
}

/// Evaluates a bound or guess value, which may be any expression of constants.
fn constant_value(text: &str, line: usize, what: &str) -> Result<f64, NexsysError> {
    let expr = Expr::parse_expression(text).map_err(|e| e.at_line(line))?;
    expr.eval(&HashMap::new()).map_err(|_| NexsysError::Parse {
        line,
        message: format!("{} `{}` is not a number", what, text.trim()),
    })
}

/// Byte offsets of assignment `=` signs, skipping `==`, `<=`, `>=`, `!=`.
fn assignment_positions(stmt: &str) -> Vec<usize> {
    let bytes = stmt.as_bytes();
    (0..bytes.len())
        .filter(|&i| bytes[i] == b'=')
        .filter(|&i| {
            let prev = if i > 0 { bytes[i - 1] } else { b' ' };
            let next = bytes.get(i + 1).copied().unwrap_or(b' ');
            !matches!(prev, b'<' | b'>' | b'=' | b'!') && next != b'='
        })
        .collect()
}

/// `lhs = rhs` becomes `lhs - rhs`; a lone expression is its own residual when `bare_allowed`.
fn compile_equation(stmt: &str, line: usize, bare_allowed: bool) -> Result<Expr, NexsysError> {
    let positions = assignment_positions(stmt);
    let parse = |s: &str| Expr::parse_expression(s).map_err(|e| e.at_line(line));
    match positions.as_slice() {
        [] if bare_allowed => parse(stmt),
        [] => Err(NexsysError::Parse {
            line,
            message: format!("unrecognised statement `{}`", stmt),
        }),
        [at] => {
            let lhs = parse(&stmt[..*at])?;
            let rhs = parse(&stmt[*at + 1..])?;
            if rhs.is_zero() {
                Ok(lhs)
            } else {
                Ok(lhs - rhs)
            }
        }
        _ => Err(NexsysError::Parse {
            line,
            message: format!("more than one `=` in `{}`", stmt),
        }),
    }
}

/// Checks every comparison operator of a conditional header before parsing it.
fn validate_operators(cond: &str, line: usize) -> Result<(), NexsysError> {
    let valid: Vec<String> = Comparator::iter().map(|c| c.to_string()).collect();
    let mut found_any = false;
    for op in OPERATOR.find_iter(cond) {
        if !valid.iter().any(|v| v == op.as_str()) {
            return Err(NexsysError::Comparator {
                line,
                found: op.as_str().to_string(),
            });
        }
        found_any = true;
    }
    if !found_any {
        return Err(NexsysError::Conditional {
            line,
            message: format!("no comparison operator in `{}`", cond.trim()),
        });
    }
    Ok(())
}

fn skip_blank(lines: &[Line], mut i: usize) -> usize {
    while i < lines.len() && lines[i].1.is_empty() {
        i += 1;
    }
    i
}

fn unterminated(line: usize) -> NexsysError {
    NexsysError::Conditional {
        line,
        message: "block is not terminated by `else:` / `end`".to_string(),
    }
}

/// One branch of a conditional: a single equation or a nested block.
/// Returns the residual and the index of the `else:`/`end` line closing the branch.
fn compile_branch(lines: &[Line], start: usize, block_line: usize) -> Result<(Expr, usize), NexsysError> {
    let i = skip_blank(lines, start);
    let (line, stmt) = *lines.get(i).ok_or_else(|| unterminated(block_line))?;
    if is_else(stmt) || is_end(stmt) {
        return Err(NexsysError::Conditional {
            line,
            message: "empty branch".to_string(),
        });
    }
    let (residual, next) = if IF_HEADER.is_match(stmt) {
        compile_conditional(lines, i)?
    } else {
        (compile_equation(stmt, line, true)?, i + 1)
    };
    let next = skip_blank(lines, next);
    let (close_line, close) = *lines.get(next).ok_or_else(|| unterminated(block_line))?;
    if !(is_else(close) || is_end(close)) {
        return Err(NexsysError::Conditional {
            line: close_line,
            message: "a branch holds exactly one equation".to_string(),
        });
    }
    Ok((residual, next))
}

/// Compiles the block whose header is at `start`; returns the residual and the index after `end`.
fn compile_conditional(lines: &[Line], start: usize) -> Result<(Expr, usize), NexsysError> {
    let (line, header) = lines[start];
    let cond_text = IF_HEADER
        .captures(header)
        .map(|c| c[1].to_string())
        .ok_or_else(|| NexsysError::Conditional {
            line,
            message: format!("malformed header `{}`", header),
        })?;
    validate_operators(&cond_text, line)?;
    let cond = Expr::parse_condition(&cond_text).map_err(|e| e.at_line(line))?;

    let (then, at_else) = compile_branch(lines, start + 1, line)?;
    if !is_else(lines[at_else].1) {
        return Err(NexsysError::Conditional {
            line: lines[at_else].0,
            message: "expected `else:`".to_string(),
        });
    }
    let (otherwise, at_end) = compile_branch(lines, at_else + 1, line)?;
    if !is_end(lines[at_end].1) {
        return Err(NexsysError::Conditional {
            line: lines[at_end].0,
            message: "expected `end`".to_string(),
        });
    }
    Ok((
        Expr::If(Box::new(cond), then.boxed(), otherwise.boxed()),
        at_end + 1,
    ))
}

/// Compiles preprocessed text.
pub fn compile_statements(text: &str) -> Result<Program, NexsysError> {
    let lines: Vec<Line> = text
        .lines()
        .enumerate()
        .map(|(i, l)| (i + 1, l.trim()))
        .collect();
    let mut program = Program::default();
    let mut i = 0;
    while i < lines.len() {
        let (line, stmt) = lines[i];
        if stmt.is_empty() {
            i += 1;
            continue;
        }
        if let Some(caps) = GUESS.captures(stmt) {
            let value = constant_value(&caps[1], line, "guess")?;
            program.guesses.insert(caps[2].to_string(), value);
        } else if let Some(caps) = KEEP.captures(stmt) {
            let var = caps[1].to_string();
            let lo = constant_value(&caps[2], line, "lower bound")?;
            let hi = constant_value(&caps[3], line, "upper bound")?;
            if lo >= hi {
                return Err(NexsysError::Domain { var, lo, hi });
            }
            program.domains.insert(var, [lo, hi]);
        } else if IF_HEADER.is_match(stmt) {
            let (residual, next) = compile_conditional(&lines, i)?;
            let block: Vec<&str> = lines[i..next].iter().map(|(_, l)| *l).collect();
            program
                .equations
                .push(Equation::new(&block.join("\n"), line, residual));
            i = next;
            continue;
        } else if is_else(stmt) || is_end(stmt) {
            return Err(NexsysError::Conditional {
                line,
                message: format!("`{}` without a matching `if`", stmt),
            });
        } else {
            let residual = compile_equation(stmt, line, false)?;
            program.equations.push(Equation::new(stmt, line, residual));
        }
        i += 1;
    }
    debug!(
        "compiled {} equations, {} guesses, {} domains",
        program.equations.len(),
        program.guesses.len(),
        program.domains.len()
    );
    Ok(program)
}

/// Preprocesses and compiles raw Nexsys text.
///
/// # Examples
/// ```
/// use nexsys::parsing::compile;
/// let program = compile("guess 2 for x\nx^2 = 4 \"a comment\"").unwrap();
/// assert_eq!(program.equations.len(), 1);
/// assert_eq!(program.guesses["x"], 2.0);
/// ```
pub fn compile(text: &str) -> Result<Program, NexsysError> {
    compile_statements(&preprocess(text)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn residual_at(program: &Program, idx: usize, vars: &[&str], values: &[f64]) -> f64 {
        program.equations[idx].residual.lambdify(vars).unwrap()(values)
    }

    #[test]
    fn test_equations_guesses_domains() {
        let text = "a = 4\n\nguess -2.5 for x\nkeep x on [-10, 0]\nx^2 = a - 3";
        let program = compile(text).unwrap();
        assert_eq!(program.equations.len(), 2);
        assert_eq!(program.equations[1].line, 5);
        assert_eq!(program.guesses["x"], -2.5);
        assert_eq!(program.domains["x"], [-10.0, 0.0]);
        assert_eq!(program.variables(), vec!["a", "x"]);
        assert_eq!(residual_at(&program, 1, &["a", "x"], &[4.0, 1.0]), 0.0);
    }

    #[test]
    fn test_domain_with_constant_bounds() {
        let program = compile("keep t on [0, 2*#pi]\nsin(t) = 1").unwrap();
        assert_eq!(program.domains["t"][1], 2.0 * std::f64::consts::PI);
    }

    #[test]
    fn test_fractional_guesses_and_bounds() {
        let program = compile("guess 0.5 for v\nguess 2 * #pi for t\nkeep v on [0.25, 1.5]\nv = 0.75").unwrap();
        assert_eq!(program.guesses["v"], 0.5);
        assert_eq!(program.guesses["t"], 2.0 * std::f64::consts::PI);
        assert_eq!(program.domains["v"], [0.25, 1.5]);
        assert_eq!(residual_at(&program, 0, &["v"], &[0.75]), 0.0);
    }

    #[test]
    fn test_unknown_function_in_condition() {
        let text = "if foo(a) < b:\n    a = 1\nelse:\n    b = 1\nend";
        assert_eq!(
            compile(text),
            Err(NexsysError::UnknownFunction { line: 1, name: "foo".to_string() })
        );
    }

    #[test]
    fn test_empty_domain() {
        assert!(matches!(
            compile("keep x on [1, 1]"),
            Err(NexsysError::Domain { .. })
        ));
    }

    #[test]
    fn test_conditional_block() {
        let text = "if a < b:\n    a - b = 1\nelse:\n    b - a = 1\nend\nb = 3";
        let program = compile(text).unwrap();
        assert_eq!(program.equations.len(), 2);
        assert!(matches!(program.equations[0].residual, Expr::If(..)));
        assert_eq!(program.equations[0].line, 1);
        assert_eq!(program.equations[1].line, 6);
        // a < b branch: a - b - 1
        assert_eq!(residual_at(&program, 0, &["a", "b"], &[1.0, 3.0]), -3.0);
        // else branch: b - a - 1
        assert_eq!(residual_at(&program, 0, &["a", "b"], &[5.0, 3.0]), -3.0);
    }

    #[test]
    fn test_nested_conditional() {
        let text = "if a < b:\n    b - a = 1\nelse:\n    if a == b:\n        b = 1\n    else:\n        a - b\n    end\nend";
        let program = compile(text).unwrap();
        assert_eq!(program.equations.len(), 1);
        let vars = ["a", "b"];
        assert_eq!(residual_at(&program, 0, &vars, &[0.0, 2.0]), 1.0);
        assert_eq!(residual_at(&program, 0, &vars, &[2.0, 2.0]), 1.0);
        assert_eq!(residual_at(&program, 0, &vars, &[5.0, 2.0]), 3.0);
    }

    #[test]
    fn test_invalid_comparator() {
        let text = "if a =< b:\n    a = 1\nelse:\n    b = 1\nend";
        assert_eq!(
            compile(text),
            Err(NexsysError::Comparator { line: 1, found: "=<".to_string() })
        );
        let text = "if a => b:\n    a = 1\nelse:\n    b = 1\nend";
        assert!(matches!(compile(text), Err(NexsysError::Comparator { .. })));
        let text = "if a b:\n    a = 1\nelse:\n    b = 1\nend";
        assert!(matches!(compile(text), Err(NexsysError::Conditional { .. })));
    }

    #[test]
    fn test_malformed_blocks() {
        let missing_end = "if a < b:\n    a = 1\nelse:\n    b = 1";
        assert!(matches!(compile(missing_end), Err(NexsysError::Conditional { line: 1, .. })));
        let two_equations = "if a < b:\n    a = 1\n    b = 2\nelse:\n    b = 1\nend";
        assert!(matches!(
            compile(two_equations),
            Err(NexsysError::Conditional { line: 3, .. })
        ));
        assert!(matches!(compile("end"), Err(NexsysError::Conditional { .. })));
    }

    #[test]
    fn test_parse_errors_carry_line() {
        assert_eq!(
            compile("x = 1\nthis is not an equation").unwrap_err(),
            NexsysError::Parse {
                line: 2,
                message: "unrecognised statement `this is not an equation`".to_string()
            }
        );
        assert!(matches!(
            compile("a = 1\n\ny = foo(a)"),
            Err(NexsysError::UnknownFunction { line: 3, .. })
        ));
        assert!(matches!(compile("x = y = 2"), Err(NexsysError::Parse { line: 1, .. })));
    }

    #[test]
    fn test_inline_conditional_equation() {
        let program = compile("y = if(x >= 0, x, -x)").unwrap();
        assert_eq!(residual_at(&program, 0, &["x", "y"], &[-2.0, 2.0]), 0.0);
    }

    #[test]
    fn test_program_display() {
        let program = compile("guess 1 for x\nkeep x on [0, 5]\nx = 2").unwrap();
        let printed = program.to_string();
        assert!(printed.contains("[line 3] x = 2"));
        assert!(printed.contains("x in [0, 5]"));
    }
}
