//! Multivariate Newton-Raphson for a square block of residuals.
//!
//!  Example#1
//! ```
//! use nexsys::numerical::NR::NR;
//! use nexsys::symbolic::symbolic_engine::Expr;
//! use nalgebra::DVector;
//!
//! let vec_of_expr = Expr::parse_vector_expression(vec!["x^2+y^2-10", "x-y-4"]).unwrap();
//! let values = vec!["x".to_string(), "y".to_string()];
//! let mut NR_instanse = NR::new();
//! NR_instanse
//!     .set_equation_system(vec_of_expr, Some(values), vec![1.0, 1.0], 1e-10, 100)
//!     .unwrap();
//! NR_instanse.eq_generate().unwrap();
//! NR_instanse.main_loop().unwrap();
//! let solution = NR_instanse.get_result().unwrap();
//! // roots are (3, -1) and (1, -3); Newton from (1, 1) lands on the first
//! assert!((solution - DVector::from(vec![3.0, -1.0])).amax() < 1e-8);
//! ```
use crate::errors::NexsysError;
use crate::symbolic::symbolic_engine::Expr;
use crate::symbolic::symbolic_functions::Jacobian;
use log::{debug, info, warn};
use nalgebra::{DMatrix, DVector};
use std::collections::HashMap;
use std::time::Instant;
use strum_macros::{Display, EnumIter, EnumString};
use tabled::{builder::Builder, settings::Style};

/// How `J * delta = F` is solved on every iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, EnumIter)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum LinearSysMethod {
    Lu,
    Inv,
}

pub struct NR {
    pub jacobian: Jacobian, // symbolic jacobian and lambdified residuals
    pub eq_system: Vec<Expr>, // residuals of the block
    pub values: Vec<String>,  // unknowns
    pub initial_guess: Vec<f64>,
    pub domains: Vec<Option<[f64; 2]>>, // one entry per unknown
    pub tolerance: f64,
    pub max_iterations: usize,
    pub damping_factor: f64,
    pub linear_sys_method: LinearSysMethod,

    pub i: usize,                // iteration counter
    pub jac: DMatrix<f64>,       // last evaluated jacobian
    pub fun_vector: DVector<f64>, // last evaluated residuals
    pub result: Option<DVector<f64>>, // last iterate
    pub residual_norm: f64,       // max |F| at the last iterate
    calc_statistics: HashMap<String, usize>,
}

impl NR {
    pub fn new() -> NR {
        NR {
            jacobian: Jacobian::new(),
            eq_system: Vec::new(),
            values: Vec::new(),
            initial_guess: Vec::new(),
            domains: Vec::new(),
            tolerance: 1e-10,
            max_iterations: 300,
            damping_factor: 1.0,
            linear_sys_method: LinearSysMethod::Lu,
            i: 0,
            jac: DMatrix::zeros(0, 0),
            fun_vector: DVector::zeros(0),
            result: None,
            residual_norm: f64::INFINITY,
            calc_statistics: HashMap::new(),
        }
    }
    ////////////////////////////SETTERS///////////////////////////////////////////////////////////////////
    /// Basic method to set the equation system. Without explicit `unknowns` every variable of
    /// the residuals is an unknown.
    pub fn set_equation_system(
        &mut self,
        eq_system: Vec<Expr>,
        unknowns: Option<Vec<String>>,
        initial_guess: Vec<f64>,
        tolerance: f64,
        max_iterations: usize,
    ) -> Result<(), NexsysError> {
        let values = match unknowns {
            Some(values) => values,
            None => {
                let mut args: Vec<String> = eq_system
                    .iter()
                    .flat_map(|x| x.all_arguments_are_variables())
                    .collect();
                args.sort();
                args.dedup();
                args
            }
        };
        if values.is_empty() {
            return Err(NexsysError::Config("no unknowns in the equation system".to_string()));
        }
        if values.len() != eq_system.len() {
            return Err(NexsysError::Config(format!(
                "{} equations for {} unknowns",
                eq_system.len(),
                values.len()
            )));
        }
        if initial_guess.len() != values.len() {
            return Err(NexsysError::Config(
                "initial guess and vector of unknowns should have the same length".to_string(),
            ));
        }
        if !(tolerance > 0.0) || max_iterations == 0 {
            return Err(NexsysError::Config(
                "tolerance and max_iterations should be positive".to_string(),
            ));
        }
        self.domains = vec![None; values.len()];
        self.eq_system = eq_system;
        self.values = values;
        self.initial_guess = initial_guess;
        self.tolerance = tolerance;
        self.max_iterations = max_iterations;
        Ok(())
    }

    pub fn set_solver_params(
        &mut self,
        linear_sys_method: Option<LinearSysMethod>,
        damping_factor: Option<f64>,
    ) -> Result<(), NexsysError> {
        if let Some(method) = linear_sys_method {
            self.linear_sys_method = method;
        }
        if let Some(damping_factor) = damping_factor {
            if !(damping_factor > 0.0 && damping_factor <= 1.0) {
                return Err(NexsysError::Config(format!(
                    "damping factor should be in (0, 1], found {}",
                    damping_factor
                )));
            }
            self.damping_factor = damping_factor;
        }
        Ok(())
    }

    /// Domains in the order of the unknowns.
    pub fn set_domains(&mut self, domains: Vec<Option<[f64; 2]>>) -> Result<(), NexsysError> {
        if domains.len() != self.values.len() {
            return Err(NexsysError::Config(
                "one domain entry per unknown is expected".to_string(),
            ));
        }
        for (var, domain) in self.values.iter().zip(&domains) {
            if let Some([lo, hi]) = *domain {
                if !(lo < hi) {
                    return Err(NexsysError::Domain { var: var.clone(), lo, hi });
                }
            }
        }
        self.domains = domains;
        Ok(())
    }

    /// Symbolic jacobian of the block, then closures for residuals and jacobian.
    pub fn eq_generate(&mut self) -> Result<(), NexsysError> {
        let mut Jacobian_instance = Jacobian::new();
        let args: Vec<&str> = self.values.iter().map(|x| x.as_str()).collect();
        Jacobian_instance.set_vector_of_functions(self.eq_system.clone());
        Jacobian_instance.set_variables(args);
        Jacobian_instance.calc_jacobian();
        debug!("symbolic jacobian: {:?}", Jacobian_instance.readable_jacobian());
        Jacobian_instance.lambdify_jacobian_and_functions()?;
        self.jacobian = Jacobian_instance;
        Ok(())
    }

    fn clamp_to_domains(&self, mut x: DVector<f64>) -> DVector<f64> {
        for (xi, domain) in x.iter_mut().zip(&self.domains) {
            if let Some([lo, hi]) = *domain {
                *xi = xi.clamp(lo, hi);
            }
        }
        x
    }

    fn evaluate_residuals(&mut self, x: &DVector<f64>) -> Result<f64, NexsysError> {
        let f = self
            .jacobian
            .evaluate_funvector_lambdified_DVector(x.as_slice());
        if f.iter().any(|v| !v.is_finite()) {
            return Err(NexsysError::Evaluation(format!(
                "residuals of [{}] are not finite at {:?}",
                self.values.join(", "),
                x.as_slice()
            )));
        }
        let norm = f.amax();
        self.fun_vector = f;
        Ok(norm)
    }
    /////////////////////////////////////////////////////////////////////////////////////////////
    //                ITERATIONS
    /////////////////////////////////////////////////////////////////////////////////////////////
    /// One Newton-Raphson step from `x`, using the residuals evaluated at `x`.
    pub fn iteration(&mut self, x: &DVector<f64>) -> Result<DVector<f64>, NexsysError> {
        let new_j = self.jacobian.evaluate_func_jacobian_DMatrix(x.as_slice());
        let delta = Self::solve_linear_system(self.linear_sys_method, &new_j, &self.fun_vector)
            .ok_or_else(|| NexsysError::SingularJacobian {
                vars: self.values.clone(),
            })?;
        self.jac = new_j;
        if delta.iter().any(|d| !d.is_finite()) {
            return Err(NexsysError::SingularJacobian {
                vars: self.values.clone(),
            });
        }
        let new_x = x - self.damping_factor * delta;
        Ok(self.clamp_to_domains(new_x))
    }

    /// Iterates until `max|F(x)| < tolerance`. Returns `Some(x)` when converged, `None` when
    /// the iteration limit was reached; the last iterate is always kept in `self.result`.
    pub fn main_loop(&mut self) -> Result<Option<DVector<f64>>, NexsysError> {
        let mut x = self.clamp_to_domains(DVector::from_vec(self.initial_guess.clone()));
        self.result = Some(x.clone());
        self.i = 0;
        let mut norm = self.evaluate_residuals(&x)?;
        while norm >= self.tolerance {
            if self.i >= self.max_iterations {
                self.residual_norm = norm;
                warn!(
                    "maximum number of iterations reached for [{}], residual = {:e}",
                    self.values.join(", "),
                    norm
                );
                return Ok(None);
            }
            let new_x = self.iteration(&x)?;
            let new_norm = self.evaluate_residuals(&new_x)?;
            if new_norm > norm && self.i > 0 {
                debug!("residual is increasing: {:e} -> {:e}", norm, new_norm);
            }
            x = new_x;
            norm = new_norm;
            self.i += 1;
            self.result = Some(x.clone());
            debug!("iteration = {}, residual = {:e}", self.i, norm);
        }
        self.residual_norm = norm;
        Ok(Some(x))
    }
    ////////////////////////////////////////////////////////////////////////////////////////////////////////////////////
    //                                       main functions to start the solver and caclulate statistics
    ////////////////////////////////////////////////////////////////////////////////////////////////////////////////////
    pub fn solve(&mut self) -> Result<Option<DVector<f64>>, NexsysError> {
        let begin = Instant::now();
        self.eq_generate()?;
        let res = self.main_loop()?;
        let elapsed = begin.elapsed();
        self.calc_statistics
            .insert("time elapsed, ms".to_string(), elapsed.as_millis() as usize);
        self.calc_statistics();
        Ok(res)
    }

    pub fn get_result(&self) -> Option<DVector<f64>> {
        self.result.clone()
    }

    fn calc_statistics(&self) {
        let mut stats = self.calc_statistics.clone();
        let jac_shape = self.jac.shape();
        stats.insert(
            "number of jacobian elements".to_string(),
            jac_shape.0 * jac_shape.1,
        );
        stats.insert("length of unknowns vector".to_string(), self.values.len());
        stats.insert("number of iterations".to_string(), self.i);
        let mut table = Builder::from(stats).build();
        table.with(Style::modern_rounded());
        info!("\n \n CALC STATISTICS \n \n {}", table.to_string());
    }
    //////////////////////////////////////////////////////////////////////////////////////////////
    ///                 LINEAR SYSTEM SOLVERS
    //////////////////////////////////////////////////////////////////////////////////////////////
    pub fn solve_linear_system(
        method: LinearSysMethod,
        A: &DMatrix<f64>,
        b: &DVector<f64>,
    ) -> Option<DVector<f64>> {
        match method {
            LinearSysMethod::Lu => A.clone().lu().solve(b),
            LinearSysMethod::Inv => A.clone().try_inverse().map(|A_inv| A_inv * b),
        }
    }
}

impl Default for NR {
    fn default() -> Self {
        Self::new()
    }
}
