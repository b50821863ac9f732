use crate::symbolic::symbolic_engine::Expr;
use std::collections::HashMap;
use std::fmt;

/// One compiled equation of a system: `residual == 0` at a solution.
#[derive(Debug, Clone, PartialEq)]
pub struct Equation {
    /// source text after preprocessing (several lines for a conditional block)
    pub text: String,
    /// 1-based line the statement starts on
    pub line: usize,
    pub residual: Expr,
    /// sorted, de-duplicated variables referenced by the residual
    pub vars: Vec<String>,
}

impl Equation {
    pub fn new(text: &str, line: usize, residual: Expr) -> Equation {
        let vars = residual.all_arguments_are_variables();
        Equation {
            text: text.trim().to_string(),
            line,
            residual,
            vars,
        }
    }

    /// Variables of the equation without a value in `known`.
    pub fn unknowns(&self, known: &HashMap<String, f64>) -> Vec<String> {
        self.vars
            .iter()
            .filter(|v| !known.contains_key(*v))
            .cloned()
            .collect()
    }

    pub fn n_unknowns(&self, known: &HashMap<String, f64>) -> usize {
        self.vars.iter().filter(|v| !known.contains_key(*v)).count()
    }

    /// Residual with every known value substituted and constants folded.
    pub fn substituted(&self, known: &HashMap<String, f64>) -> Expr {
        self.residual.set_variable_from_map(known).simplify_numbers()
    }

    /// Text on a single line, for logs and reports.
    pub fn one_line(&self) -> String {
        self.text.split_whitespace().collect::<Vec<_>>().join(" ")
    }
}

impl fmt::Display for Equation {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "[line {}] {} => {} = 0", self.line, self.one_line(), self.residual)
    }
}
