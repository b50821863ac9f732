//! Error taxonomy for compiling and solving Nexsys systems.
//!
//! Parse-time errors carry the 1-based source line they were found on, solve-time
//! errors name the equation or variables the engine was working on.
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum NexsysError {
    /// Malformed statement or expression
    Parse { line: usize, message: String },
    /// A call to a function the expression language does not know
    UnknownFunction { line: usize, name: String },
    /// `=<`, `=>`, a lone `=` or any other unknown comparison operator
    Comparator { line: usize, found: String },
    /// Malformed `if / else / end` block
    Conditional { line: usize, message: String },
    /// `#name` with no entry in the constants table
    UnknownConstant(String),
    /// `[from->to]` could not be resolved to a single factor
    UnitConversion { from: String, to: String },
    /// `keep x on [lo, hi]` with an empty interval
    Domain { var: String, lo: f64, hi: f64 },
    /// Residual evaluated to NaN or infinity
    Evaluation(String),
    /// Scalar Newton hit a zero (or non-finite) derivative and had no domain to search
    ZeroDerivative { var: String, equation: String },
    /// The Jacobian of a block could not be factorised
    SingularJacobian { vars: Vec<String> },
    /// The iteration limit was reached and non-convergent results are not allowed
    NonConvergence { vars: Vec<String>, residual: f64 },
    /// Invalid solver configuration
    Config(String),
    /// Embedded unit or constant data failed to load
    Data(String),
    Io(String),
}

impl fmt::Display for NexsysError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            NexsysError::Parse { line, message } => {
                write!(f, "line {}: {}", line, message)
            }
            NexsysError::UnknownFunction { line, name } => {
                write!(f, "line {}: unknown function `{}`", line, name)
            }
            NexsysError::Comparator { line, found } => write!(
                f,
                "line {}: invalid comparison operator `{}`. valid operators are: <, >, <=, >=, ==, !=",
                line, found
            ),
            NexsysError::Conditional { line, message } => {
                write!(f, "line {}: conditional statement failed to compile: {}", line, message)
            }
            NexsysError::UnknownConstant(name) => write!(f, "unknown constant `#{}`", name),
            NexsysError::UnitConversion { from, to } => {
                write!(f, "failed to identify conversion factor [{}->{}]", from, to)
            }
            NexsysError::Domain { var, lo, hi } => {
                write!(f, "empty domain [{}, {}] for variable `{}`", lo, hi, var)
            }
            NexsysError::Evaluation(msg) => write!(f, "evaluation failed: {}", msg),
            NexsysError::ZeroDerivative { var, equation } => write!(
                f,
                "newton-raphson solver tried to divide by zero while solving `{}` for `{}`",
                equation, var
            ),
            NexsysError::SingularJacobian { vars } => write!(
                f,
                "jacobian is singular for variables [{}]",
                vars.join(", ")
            ),
            NexsysError::NonConvergence { vars, residual } => write!(
                f,
                "solver did not converge for [{}] (residual {:e}). consider allowing non-convergent solutions, or try to remove discontinuities from your system",
                vars.join(", "),
                residual
            ),
            NexsysError::Config(msg) => write!(f, "invalid configuration: {}", msg),
            NexsysError::Data(msg) => write!(f, "embedded data failed to load: {}", msg),
            NexsysError::Io(msg) => write!(f, "i/o error: {}", msg),
        }
    }
}

impl std::error::Error for NexsysError {}

impl From<std::io::Error> for NexsysError {
    fn from(err: std::io::Error) -> Self {
        NexsysError::Io(err.to_string())
    }
}

impl From<toml::de::Error> for NexsysError {
    fn from(err: toml::de::Error) -> Self {
        NexsysError::Config(err.to_string())
    }
}

impl NexsysError {
    /// true for errors raised before any numeric work started
    pub fn is_parse_error(&self) -> bool {
        matches!(
            self,
            NexsysError::Parse { .. }
                | NexsysError::UnknownFunction { .. }
                | NexsysError::Comparator { .. }
                | NexsysError::Conditional { .. }
                | NexsysError::UnknownConstant(_)
                | NexsysError::UnitConversion { .. }
                | NexsysError::Domain { .. }
        )
    }

    /// Attaches a source line to errors produced without one (expression parser works line-free).
    pub(crate) fn at_line(self, line: usize) -> NexsysError {
        match self {
            NexsysError::Parse { message, .. } => NexsysError::Parse { line, message },
            NexsysError::UnknownFunction { name, .. } => NexsysError::UnknownFunction { line, name },
            NexsysError::Comparator { found, .. } => NexsysError::Comparator { line, found },
            NexsysError::Conditional { message, .. } => NexsysError::Conditional { line, message },
            other => other,
        }
    }
}
