//! # Symbolic Engine Module
//!
//! Core expression tree for Nexsys equations. Every equation of a system is stored as a
//! residual `Expr` (`lhs - rhs`), which the numeric engine substitutes, differentiates
//! and turns into plain Rust closures.
//!
//! ## Main Structures and Methods
//!
//! ### `Expr` Enum
//! - **Variables**: `Var(String)`
//! - **Constants**: `Const(f64)`
//! - **Operations**: `Add`, `Sub`, `Mul`, `Div`, `Pow`
//! - **Functions**: `Exp`, `Ln`, `sin`, `cos`, `tg`, `ctg`, `arcsin`, `arccos`, `arctg`, `Abs`
//! - **Conditionals**: `If(Condition, then, otherwise)` produced by `if ... else ... end` blocks
//!
//! ### Key Methods
//! - `set_variable_from_map()` - substitute known values
//! - `all_arguments_are_variables()` - sorted list of referenced variables
//! - `eval()` - one-shot evaluation against a map of values
//! - `lambdify()` - convert to a closure over an ordered slice of values
//!
//! Trigonometric functions keep the mathematical notation (tg, ctg) for variant names.

#![allow(non_camel_case_types)]

use crate::errors::NexsysError;
use std::collections::HashMap;
use std::fmt;
use strum_macros::{Display, EnumIter, EnumString};

/// Comparison operators allowed in the header of a conditional.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, EnumIter)]
pub enum Comparator {
    #[strum(serialize = "==")]
    Eq,
    #[strum(serialize = "<=")]
    Le,
    #[strum(serialize = ">=")]
    Ge,
    #[strum(serialize = "<")]
    Lt,
    #[strum(serialize = ">")]
    Gt,
    #[strum(serialize = "!=")]
    Ne,
}

impl Comparator {
    pub fn holds(&self, lhs: f64, rhs: f64) -> bool {
        match self {
            Comparator::Eq => lhs == rhs,
            Comparator::Le => lhs <= rhs,
            Comparator::Ge => lhs >= rhs,
            Comparator::Lt => lhs < rhs,
            Comparator::Gt => lhs > rhs,
            Comparator::Ne => lhs != rhs,
        }
    }
}

/// `lhs <op> rhs`, the test of a conditional expression
#[derive(Clone, Debug, PartialEq)]
pub struct Condition {
    pub lhs: Expr,
    pub op: Comparator,
    pub rhs: Expr,
}

/// Symbolic expression tree.
#[derive(Clone, Debug, PartialEq)]
pub enum Expr {
    /// Symbolic variable with a name (e.g., "x", "flow_in")
    Var(String),
    /// Numerical constant value
    Const(f64),
    Add(Box<Expr>, Box<Expr>),
    Sub(Box<Expr>, Box<Expr>),
    Mul(Box<Expr>, Box<Expr>),
    Div(Box<Expr>, Box<Expr>),
    /// base ^ exponent
    Pow(Box<Expr>, Box<Expr>),
    Exp(Box<Expr>),
    /// Natural logarithm
    Ln(Box<Expr>),
    sin(Box<Expr>),
    cos(Box<Expr>),
    /// Tangent, mathematical notation
    tg(Box<Expr>),
    /// Cotangent, mathematical notation
    ctg(Box<Expr>),
    arcsin(Box<Expr>),
    arccos(Box<Expr>),
    /// Arctangent, mathematical notation
    arctg(Box<Expr>),
    Abs(Box<Expr>),
    /// `then` where the condition holds, `otherwise` elsewhere
    If(Box<Condition>, Box<Expr>, Box<Expr>),
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Expr::Var(name) => write!(f, "{}", name),
            Expr::Const(val) => write!(f, "{}", val),
            Expr::Add(lhs, rhs) => write!(f, "({} + {})", lhs, rhs),
            Expr::Sub(lhs, rhs) => write!(f, "({} - {})", lhs, rhs),
            Expr::Mul(lhs, rhs) => write!(f, "({} * {})", lhs, rhs),
            Expr::Div(lhs, rhs) => write!(f, "({} / {})", lhs, rhs),
            Expr::Pow(base, exp) => write!(f, "({} ^ {})", base, exp),
            Expr::Exp(expr) => write!(f, "exp({})", expr),
            Expr::Ln(expr) => write!(f, "ln({})", expr),
            Expr::sin(expr) => write!(f, "sin({})", expr),
            Expr::cos(expr) => write!(f, "cos({})", expr),
            Expr::tg(expr) => write!(f, "tg({})", expr),
            Expr::ctg(expr) => write!(f, "ctg({})", expr),
            Expr::arcsin(expr) => write!(f, "arcsin({})", expr),
            Expr::arccos(expr) => write!(f, "arccos({})", expr),
            Expr::arctg(expr) => write!(f, "arctg({})", expr),
            Expr::Abs(expr) => write!(f, "abs({})", expr),
            Expr::If(cond, then, otherwise) => write!(
                f,
                "if({} {} {}, {}, {})",
                cond.lhs, cond.op, cond.rhs, then, otherwise
            ),
        }
    }
}

impl std::ops::Add for Expr {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Expr::Add(self.boxed(), rhs.boxed())
    }
}

impl std::ops::Sub for Expr {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Expr::Sub(self.boxed(), rhs.boxed())
    }
}

impl std::ops::Mul for Expr {
    type Output = Self;

    fn mul(self, rhs: Self) -> Self::Output {
        Expr::Mul(self.boxed(), rhs.boxed())
    }
}

impl std::ops::Div for Expr {
    type Output = Self;

    fn div(self, rhs: Self) -> Self::Output {
        Expr::Div(self.boxed(), rhs.boxed())
    }
}

impl std::ops::Neg for Expr {
    type Output = Self;

    fn neg(self) -> Self::Output {
        Expr::Mul(Box::new(Expr::Const(-1.0)), self.boxed())
    }
}

impl Expr {
    pub fn boxed(self) -> Box<Self> {
        Box::new(self)
    }

    pub fn var(name: &str) -> Expr {
        Expr::Var(name.to_string())
    }

    pub fn pow(self, rhs: Expr) -> Expr {
        Expr::Pow(self.boxed(), rhs.boxed())
    }

    pub fn is_zero(&self) -> bool {
        matches!(self, Expr::Const(val) if *val == 0.0)
    }

    /// Rebuilds the node with `f` applied to every direct child.
    pub(crate) fn map_children<F>(&self, mut f: F) -> Expr
    where
        F: FnMut(&Expr) -> Expr,
    {
        match self {
            Expr::Var(_) | Expr::Const(_) => self.clone(),
            Expr::Add(lhs, rhs) => Expr::Add(Box::new(f(lhs)), Box::new(f(rhs))),
            Expr::Sub(lhs, rhs) => Expr::Sub(Box::new(f(lhs)), Box::new(f(rhs))),
            Expr::Mul(lhs, rhs) => Expr::Mul(Box::new(f(lhs)), Box::new(f(rhs))),
            Expr::Div(lhs, rhs) => Expr::Div(Box::new(f(lhs)), Box::new(f(rhs))),
            Expr::Pow(base, exp) => Expr::Pow(Box::new(f(base)), Box::new(f(exp))),
            Expr::Exp(expr) => Expr::Exp(Box::new(f(expr))),
            Expr::Ln(expr) => Expr::Ln(Box::new(f(expr))),
            Expr::sin(expr) => Expr::sin(Box::new(f(expr))),
            Expr::cos(expr) => Expr::cos(Box::new(f(expr))),
            Expr::tg(expr) => Expr::tg(Box::new(f(expr))),
            Expr::ctg(expr) => Expr::ctg(Box::new(f(expr))),
            Expr::arcsin(expr) => Expr::arcsin(Box::new(f(expr))),
            Expr::arccos(expr) => Expr::arccos(Box::new(f(expr))),
            Expr::arctg(expr) => Expr::arctg(Box::new(f(expr))),
            Expr::Abs(expr) => Expr::Abs(Box::new(f(expr))),
            Expr::If(cond, then, otherwise) => {
                let cond = Condition {
                    lhs: f(&cond.lhs),
                    op: cond.op,
                    rhs: f(&cond.rhs),
                };
                Expr::If(Box::new(cond), Box::new(f(then)), Box::new(f(otherwise)))
            }
        }
    }

    /// Direct children of the node, condition operands included.
    fn children(&self) -> Vec<&Expr> {
        match self {
            Expr::Var(_) | Expr::Const(_) => vec![],
            Expr::Add(lhs, rhs)
            | Expr::Sub(lhs, rhs)
            | Expr::Mul(lhs, rhs)
            | Expr::Div(lhs, rhs)
            | Expr::Pow(lhs, rhs) => vec![lhs.as_ref(), rhs.as_ref()],
            Expr::Exp(expr)
            | Expr::Ln(expr)
            | Expr::sin(expr)
            | Expr::cos(expr)
            | Expr::tg(expr)
            | Expr::ctg(expr)
            | Expr::arcsin(expr)
            | Expr::arccos(expr)
            | Expr::arctg(expr)
            | Expr::Abs(expr) => vec![expr.as_ref()],
            Expr::If(cond, then, otherwise) => {
                vec![&cond.lhs, &cond.rhs, then.as_ref(), otherwise.as_ref()]
            }
        }
    }

    /// Substitutes every variable present in `var_map` with its value.
    /// Variables missing from the map are left symbolic.
    pub fn set_variable_from_map(&self, var_map: &HashMap<String, f64>) -> Expr {
        match self {
            Expr::Var(name) => match var_map.get(name) {
                Some(value) => Expr::Const(*value),
                None => self.clone(),
            },
            _ => self.map_children(|child| child.set_variable_from_map(var_map)),
        }
    }

    pub fn contains_variable(&self, var_name: &str) -> bool {
        match self {
            Expr::Var(name) => name == var_name,
            _ => self.children().iter().any(|c| c.contains_variable(var_name)),
        }
    }

    /// Sorted, de-duplicated names of every variable in the expression.
    pub fn all_arguments_are_variables(&self) -> Vec<String> {
        let mut vars = Vec::new();
        self.collect_variables(&mut vars);
        vars.sort();
        vars.dedup();
        vars
    }

    fn collect_variables(&self, vars: &mut Vec<String>) {
        match self {
            Expr::Var(name) => vars.push(name.clone()),
            _ => {
                for child in self.children() {
                    child.collect_variables(vars);
                }
            }
        }
    }

    /// Evaluates the expression against a map of values.
    pub fn eval(&self, values: &HashMap<String, f64>) -> Result<f64, NexsysError> {
        let vars = self.all_arguments_are_variables();
        let mut args = Vec::with_capacity(vars.len());
        for v in &vars {
            match values.get(v) {
                Some(x) => args.push(*x),
                None => {
                    return Err(NexsysError::Evaluation(format!(
                        "variable `{}` has no value in `{}`",
                        v, self
                    )));
                }
            }
        }
        let names: Vec<&str> = vars.iter().map(|s| s.as_str()).collect();
        let f = self.lambdify(&names)?;
        Ok(f(&args))
    }

    /// Converts the expression into a closure taking values in the order of `vars`.
    /// Fails if the expression references a variable outside `vars`.
    pub fn lambdify(&self, vars: &[&str]) -> Result<Box<dyn Fn(&[f64]) -> f64>, NexsysError> {
        let f: Box<dyn Fn(&[f64]) -> f64> = match self {
            Expr::Var(name) => {
                let index = vars.iter().position(|&x| x == name).ok_or_else(|| {
                    NexsysError::Evaluation(format!("variable `{}` is not an argument", name))
                })?;
                Box::new(move |x: &[f64]| x[index])
            }
            Expr::Const(val) => {
                let val = *val;
                Box::new(move |_: &[f64]| val)
            }
            Expr::Add(lhs, rhs) => {
                let (l, r) = (lhs.lambdify(vars)?, rhs.lambdify(vars)?);
                Box::new(move |x: &[f64]| l(x) + r(x))
            }
            Expr::Sub(lhs, rhs) => {
                let (l, r) = (lhs.lambdify(vars)?, rhs.lambdify(vars)?);
                Box::new(move |x: &[f64]| l(x) - r(x))
            }
            Expr::Mul(lhs, rhs) => {
                let (l, r) = (lhs.lambdify(vars)?, rhs.lambdify(vars)?);
                Box::new(move |x: &[f64]| l(x) * r(x))
            }
            Expr::Div(lhs, rhs) => {
                let (l, r) = (lhs.lambdify(vars)?, rhs.lambdify(vars)?);
                Box::new(move |x: &[f64]| l(x) / r(x))
            }
            Expr::Pow(base, exp) => {
                let b = base.lambdify(vars)?;
                // integer exponents stay defined for negative bases
                match exp.as_ref() {
                    Expr::Const(n) if n.fract() == 0.0 && n.abs() < i32::MAX as f64 => {
                        let n = *n as i32;
                        Box::new(move |x: &[f64]| b(x).powi(n))
                    }
                    _ => {
                        let e = exp.lambdify(vars)?;
                        Box::new(move |x: &[f64]| b(x).powf(e(x)))
                    }
                }
            }
            Expr::Exp(expr) => {
                let g = expr.lambdify(vars)?;
                Box::new(move |x: &[f64]| g(x).exp())
            }
            Expr::Ln(expr) => {
                let g = expr.lambdify(vars)?;
                Box::new(move |x: &[f64]| g(x).ln())
            }
            Expr::sin(expr) => {
                let g = expr.lambdify(vars)?;
                Box::new(move |x: &[f64]| g(x).sin())
            }
            Expr::cos(expr) => {
                let g = expr.lambdify(vars)?;
                Box::new(move |x: &[f64]| g(x).cos())
            }
            Expr::tg(expr) => {
                let g = expr.lambdify(vars)?;
                Box::new(move |x: &[f64]| g(x).tan())
            }
            Expr::ctg(expr) => {
                let g = expr.lambdify(vars)?;
                Box::new(move |x: &[f64]| 1.0 / g(x).tan())
            }
            Expr::arcsin(expr) => {
                let g = expr.lambdify(vars)?;
                Box::new(move |x: &[f64]| g(x).asin())
            }
            Expr::arccos(expr) => {
                let g = expr.lambdify(vars)?;
                Box::new(move |x: &[f64]| g(x).acos())
            }
            Expr::arctg(expr) => {
                let g = expr.lambdify(vars)?;
                Box::new(move |x: &[f64]| g(x).atan())
            }
            Expr::Abs(expr) => {
                let g = expr.lambdify(vars)?;
                Box::new(move |x: &[f64]| g(x).abs())
            }
            Expr::If(cond, then, otherwise) => {
                let l = cond.lhs.lambdify(vars)?;
                let r = cond.rhs.lambdify(vars)?;
                let op = cond.op;
                let t = then.lambdify(vars)?;
                let o = otherwise.lambdify(vars)?;
                Box::new(move |x: &[f64]| if op.holds(l(x), r(x)) { t(x) } else { o(x) })
            }
        };
        Ok(f)
    }

    /// Folds constant sub-trees and drops trivial identities (x + 0, x * 1, x * 0, x ^ 1).
    pub fn simplify_numbers(&self) -> Expr {
        let folded = self.map_children(|child| child.simplify_numbers());
        let simplified = match &folded {
            Expr::Add(lhs, rhs) => match (lhs.as_ref(), rhs.as_ref()) {
                (Expr::Const(a), Expr::Const(b)) => Some(Expr::Const(a + b)),
                (e, z) | (z, e) if z.is_zero() => Some(e.clone()),
                _ => None,
            },
            Expr::Sub(lhs, rhs) => match (lhs.as_ref(), rhs.as_ref()) {
                (Expr::Const(a), Expr::Const(b)) => Some(Expr::Const(a - b)),
                (e, z) if z.is_zero() => Some(e.clone()),
                _ => None,
            },
            Expr::Mul(lhs, rhs) => match (lhs.as_ref(), rhs.as_ref()) {
                (Expr::Const(a), Expr::Const(b)) => Some(Expr::Const(a * b)),
                (_, z) | (z, _) if z.is_zero() => Some(Expr::Const(0.0)),
                (e, Expr::Const(one)) | (Expr::Const(one), e) if *one == 1.0 => Some(e.clone()),
                _ => None,
            },
            Expr::Div(lhs, rhs) => match (lhs.as_ref(), rhs.as_ref()) {
                (Expr::Const(a), Expr::Const(b)) if *b != 0.0 => Some(Expr::Const(a / b)),
                (e, Expr::Const(one)) if *one == 1.0 => Some(e.clone()),
                _ => None,
            },
            Expr::Pow(base, exp) => match (base.as_ref(), exp.as_ref()) {
                (_, Expr::Const(zero)) if *zero == 0.0 => Some(Expr::Const(1.0)),
                (e, Expr::Const(one)) if *one == 1.0 => Some(e.clone()),
                _ => None,
            },
            Expr::If(cond, then, otherwise) => match (&cond.lhs, &cond.rhs) {
                (Expr::Const(a), Expr::Const(b)) if cond.op.holds(*a, *b) => {
                    Some(then.as_ref().clone())
                }
                (Expr::Const(_), Expr::Const(_)) => Some(otherwise.as_ref().clone()),
                _ => None,
            },
            Expr::Var(_) | Expr::Const(_) => None,
            // any other function of a constant
            other if other.all_arguments_are_variables().is_empty() => other
                .lambdify(&[])
                .ok()
                .map(|f| f(&[]))
                .filter(|val| val.is_finite())
                .map(Expr::Const),
            _ => None,
        };
        simplified.unwrap_or(folded)
    }
}
