//! Numeric side of Nexsys: values with domains, root finders and the solving engine.
/// `f64` with an optional domain
pub mod variable;
/// Newton-Raphson and golden-section search for one unknown
pub mod scalar_solvers;
/// multivariate Newton-Raphson for square blocks
///
/// ```
/// use nexsys::numerical::NR::{NR, LinearSysMethod};
/// use nexsys::symbolic::symbolic_engine::Expr;
/// let eqs = Expr::parse_vector_expression(vec!["x + y - 3", "x - y - 1"]).unwrap();
/// let mut NR_instanse = NR::new();
/// NR_instanse.set_equation_system(eqs, None, vec![0.0, 0.0], 1e-10, 50).unwrap();
/// NR_instanse.set_solver_params(Some(LinearSysMethod::Lu), Some(1.0)).unwrap();
/// let x = NR_instanse.solve().unwrap().unwrap();
/// assert!((x[0] - 2.0).abs() < 1e-10 && (x[1] - 1.0).abs() < 1e-10);
/// ```
pub mod NR;
/// search for properly constrained blocks of equations
pub mod block_mgr;
/// the `Nexsys` engine
pub mod solver;
#[cfg(test)]
mod solver_tests;
