//! Root finders for equations left with a single unknown.
//!
//! Newton-Raphson runs first, stepping through the variable's domain. When it stalls on a
//! zero derivative (or does not converge) and the variable has a domain, a golden-section
//! search of `|f|` over the domain is done and its minimum polished with Newton again.
use crate::numerical::variable::Variable;
use log::debug;
use std::fmt;

/// Failure of a scalar method, before the caller attaches variable and equation names.
#[derive(Debug, Clone, PartialEq)]
pub enum RootFindingError {
    DerivativeZero { x: f64 },
    NonFinite { x: f64 },
}

impl fmt::Display for RootFindingError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            RootFindingError::DerivativeZero { x } => write!(f, "derivative is zero at x = {}", x),
            RootFindingError::NonFinite { x } => {
                write!(f, "function is not finite at x = {}", x)
            }
        }
    }
}

impl std::error::Error for RootFindingError {}

#[derive(Debug, Clone, PartialEq)]
pub struct RootFindingResult {
    pub root: f64,
    pub function_value: f64,
    pub iterations: usize,
    pub converged: bool,
    pub method: String,
}

#[derive(Debug, Clone)]
pub struct ScalarRootFinder {
    pub tolerance: f64,
    pub max_iterations: usize,
}

impl ScalarRootFinder {
    pub fn new(tolerance: f64, max_iterations: usize) -> Self {
        Self {
            tolerance,
            max_iterations,
        }
    }

    /// Newton-Raphson with analytical derivative `df`; every step is clamped into the domain of `x`.
    pub fn newton_raphson<F, D>(
        &self,
        f: &F,
        df: &D,
        mut x: Variable,
    ) -> Result<RootFindingResult, RootFindingError>
    where
        F: Fn(f64) -> f64,
        D: Fn(f64) -> f64,
    {
        let mut iterations = 0;
        while iterations < self.max_iterations {
            let xi = x.as_f64();
            let fx = f(xi);
            if !fx.is_finite() {
                return Err(RootFindingError::NonFinite { x: xi });
            }
            if fx.abs() < self.tolerance {
                return Ok(RootFindingResult {
                    root: xi,
                    function_value: fx,
                    iterations,
                    converged: true,
                    method: "newton_raphson".to_string(),
                });
            }
            let fpx = df(xi);
            if fpx == 0.0 || !fpx.is_finite() {
                return Err(RootFindingError::DerivativeZero { x: xi });
            }
            x.step(-fx / fpx);
            iterations += 1;
        }
        let root = x.as_f64();
        let function_value = f(root);
        Ok(RootFindingResult {
            root,
            function_value,
            iterations,
            converged: function_value.abs() < self.tolerance,
            method: "newton_raphson".to_string(),
        })
    }

    /// Minimises `|f|` over `[lo, hi]` by golden-section search.
    pub fn golden_search<F>(&self, f: &F, domain: [f64; 2]) -> RootFindingResult
    where
        F: Fn(f64) -> f64,
    {
        let gr = (5_f64.sqrt() + 1.0) / 2.0;
        // NaN compares as the worst point
        let g = |x: f64| {
            let v = f(x).abs();
            if v.is_nan() { f64::INFINITY } else { v }
        };
        let [mut a, mut d] = domain;
        let mut b = d - (d - a) / gr;
        let mut c = a + (d - a) / gr;
        let mut iterations = 0;
        while (d - a).abs() > self.tolerance && iterations < self.max_iterations.max(200) {
            if g(b) < g(c) {
                d = c;
            } else {
                a = b;
            }
            b = d - (d - a) / gr;
            c = a + (d - a) / gr;
            iterations += 1;
        }
        let root = (a + d) / 2.0;
        let function_value = f(root);
        RootFindingResult {
            root,
            function_value,
            iterations,
            converged: function_value.abs() < self.tolerance,
            method: "golden_search".to_string(),
        }
    }

    /// Newton first, then golden-section search plus Newton polish when a domain is known.
    pub fn solve<F, D>(&self, f: &F, df: &D, start: Variable) -> Result<RootFindingResult, RootFindingError>
    where
        F: Fn(f64) -> f64,
        D: Fn(f64) -> f64,
    {
        let newton = self.newton_raphson(f, df, start);
        if let Ok(result) = &newton {
            if result.converged {
                return newton;
            }
        }
        let Some(domain) = start.get_domain() else {
            return newton;
        };
        match &newton {
            Ok(r) => debug!("newton stopped at {} (|f| = {:e}), searching the domain", r.root, r.function_value.abs()),
            Err(e) => debug!("newton failed: {}, searching the domain", e),
        }
        let golden = self.golden_search(f, domain);
        let spent = golden.iterations + newton.as_ref().map(|r| r.iterations).unwrap_or(0);
        let best = match self.newton_raphson(f, df, Variable::new(golden.root, Some(domain))) {
            Ok(polished) if polished.function_value.abs() <= golden.function_value.abs() => polished,
            _ => golden,
        };
        Ok(RootFindingResult {
            iterations: best.iterations + spent,
            ..best
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn finder() -> ScalarRootFinder {
        ScalarRootFinder::new(1e-10, 100)
    }

    #[test]
    fn test_newton_square_root() {
        let f = |x: f64| x * x - 2.0;
        let df = |x: f64| 2.0 * x;
        let r = finder().newton_raphson(&f, &df, Variable::new(1.0, None)).unwrap();
        assert!(r.converged);
        assert_relative_eq!(r.root, 2f64.sqrt(), epsilon = 1e-9);
    }

    #[test]
    fn test_newton_respects_domain() {
        let f = |x: f64| x * x - 1.0;
        let df = |x: f64| 2.0 * x;
        let r = finder()
            .newton_raphson(&f, &df, Variable::new(-5.0, Some([-10.0, 0.0])))
            .unwrap();
        assert_relative_eq!(r.root, -1.0, epsilon = 1e-9);
    }

    #[test]
    fn test_zero_derivative() {
        let f = |x: f64| x * x + 1.0;
        let df = |x: f64| 2.0 * x;
        let err = finder().newton_raphson(&f, &df, Variable::new(0.0, None)).unwrap_err();
        assert_eq!(err, RootFindingError::DerivativeZero { x: 0.0 });
    }

    #[test]
    fn test_golden_fallback_with_domain() {
        // zero derivative at the start, root at x = 3 inside the domain
        let f = |x: f64| (x - 3.0) * x;
        let df = |x: f64| 2.0 * x - 3.0;
        let start = Variable::new(1.5, Some([1.0, 10.0]));
        let r = finder().solve(&f, &df, start).unwrap();
        assert!(r.converged);
        assert_relative_eq!(r.root, 3.0, epsilon = 1e-8);

        let f = |x: f64| x * x - 4.0;
        let df = |_: f64| 0.0;
        let r = finder().solve(&f, &df, Variable::new(1.0, Some([0.0, 5.0]))).unwrap();
        assert_relative_eq!(r.root, 2.0, epsilon = 1e-8);
    }

    #[test]
    fn test_non_finite() {
        let f = |x: f64| x.ln();
        let df = |x: f64| 1.0 / x;
        let r = finder().newton_raphson(&f, &df, Variable::new(-1.0, None));
        assert!(matches!(r, Err(RootFindingError::NonFinite { .. })));
    }
}
