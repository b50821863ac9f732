//! Access point to the Nexsys engine.
//!
//! The engine repeats, until nothing changes:
//! 1) drop equations without unknowns (checking their residual against the tolerance)
//! 2) solve the first equation with a single unknown (Newton-Raphson, golden-section fallback)
//! 3) otherwise solve the smallest square block found with multivariate Newton-Raphson
//!
//! Example#
//! ```
//! use nexsys::numerical::solver::Nexsys;
//! use nexsys::config::SolverConfig;
//! let text = "a = 4\nb = a + 5\nx + y = b\nx - y = a";
//! let config = SolverConfig::default().with_loglevel("off");
//! let (solution, report) = Nexsys::new(text, &config).unwrap().solve().unwrap();
//! assert!((solution["x"] - 6.5).abs() < 1e-9);
//! assert!((solution["y"] - 2.5).abs() < 1e-9);
//! assert!(report.is_complete());
//! ```
use crate::Utils::logger::init_logger;
use crate::Utils::report::{Solution, SolveReport};
use crate::config::SolverConfig;
use crate::errors::NexsysError;
use crate::numerical::NR::NR;
use crate::numerical::block_mgr::BlockMgr;
use crate::numerical::scalar_solvers::{RootFindingError, ScalarRootFinder};
use crate::numerical::variable::Variable;
use crate::parsing::equation::Equation;
use crate::parsing::{Program, compile};
use itertools::Itertools;
use log::{debug, info, warn};
use std::collections::HashMap;
use std::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq)]
enum Progress {
    Solved,
    NoneSolved,
}

#[derive(Debug)]
pub struct Nexsys {
    equations: Vec<Equation>,
    guesses: HashMap<String, f64>,
    domains: HashMap<String, [f64; 2]>,
    solution: HashMap<String, f64>,
    config: SolverConfig,
    report: SolveReport,
}

impl Nexsys {
    /// Compiles `text` into a solver ready to run with `config`.
    pub fn new(text: &str, config: &SolverConfig) -> Result<Nexsys, NexsysError> {
        config.validate()?;
        let program = compile(text)?;
        Ok(Self::from_program(program, config))
    }

    pub fn from_program(program: Program, config: &SolverConfig) -> Nexsys {
        Nexsys {
            equations: program.equations,
            guesses: program.guesses.into_iter().collect(),
            domains: program.domains.into_iter().collect(),
            solution: HashMap::new(),
            config: config.clone(),
            report: SolveReport::default(),
        }
    }

    /// Sets the value of a variable before solving, making it a known.
    pub fn edit(&mut self, var: &str, value: f64) {
        self.solution.insert(var.to_string(), value);
    }

    pub fn mass_add_edits(&mut self, values: HashMap<String, f64>) {
        self.solution.extend(values);
    }

    pub fn guess(&mut self, var: &str, value: f64) {
        self.guesses.insert(var.to_string(), value);
    }

    pub fn mass_add_guess(&mut self, guesses: HashMap<String, f64>) {
        self.guesses.extend(guesses);
    }

    pub fn domain(&mut self, var: &str, domain: [f64; 2]) -> Result<(), NexsysError> {
        Variable::with_domain(var, domain[0], Some(domain))?;
        self.domains.insert(var.to_string(), domain);
        Ok(())
    }

    pub fn mass_add_domains(&mut self, domains: HashMap<String, [f64; 2]>) -> Result<(), NexsysError> {
        for (var, domain) in domains {
            self.domain(&var, domain)?;
        }
        Ok(())
    }

    pub fn equations(&self) -> &[Equation] {
        &self.equations
    }

    fn start_value(&self, var: &str) -> Variable {
        let value = self
            .guesses
            .get(var)
            .copied()
            .unwrap_or(self.config.default_guess);
        Variable::new(value, self.domains.get(var).copied())
    }

    /// Removes fully known equations, recording the ones that do not hold.
    fn check_known(&mut self) -> Result<(), NexsysError> {
        let (done, pending): (Vec<Equation>, Vec<Equation>) = std::mem::take(&mut self.equations)
            .into_iter()
            .partition(|eq| eq.n_unknowns(&self.solution) == 0);
        self.equations = pending;
        for eq in done {
            let residual = eq.residual.eval(&self.solution)?;
            if !residual.is_finite() || residual.abs() > self.config.tolerance {
                warn!(
                    "equation on line {} does not hold: `{}` (residual {:e})",
                    eq.line,
                    eq.one_line(),
                    residual
                );
                self.report.inconsistent.push(format!(
                    "[line {}] {} (residual {:e})",
                    eq.line,
                    eq.one_line(),
                    residual
                ));
            } else {
                debug!("equation on line {} is satisfied", eq.line);
            }
        }
        Ok(())
    }

    /// Solves the first equation left with exactly one unknown.
    fn light_work(&mut self) -> Result<Progress, NexsysError> {
        let Some(idx) = self
            .equations
            .iter()
            .position(|eq| eq.n_unknowns(&self.solution) == 1)
        else {
            return Ok(Progress::NoneSolved);
        };
        let eq = self.equations.remove(idx);
        let target = eq.unknowns(&self.solution).remove(0);
        let expr = eq.substituted(&self.solution);
        let derivative = expr.diff(&target).simplify_numbers();
        let f = expr.lambdify(&[target.as_str()])?;
        let df = derivative.lambdify(&[target.as_str()])?;

        let finder = ScalarRootFinder::new(self.config.tolerance, self.config.max_iterations);
        let start = self.start_value(&target);
        debug!("solving `{}` for {} from {}", eq.one_line(), target, start.as_f64());
        let result = finder
            .solve(&|x: f64| f(&[x]), &|x: f64| df(&[x]), start)
            .map_err(|e| match e {
                RootFindingError::DerivativeZero { .. } => NexsysError::ZeroDerivative {
                    var: target.clone(),
                    equation: eq.one_line(),
                },
                RootFindingError::NonFinite { x } => NexsysError::Evaluation(format!(
                    "`{}` is not finite at {} = {}",
                    eq.one_line(),
                    target,
                    x
                )),
            })?;
        self.report.iterations += result.iterations;
        if result.converged {
            self.report
                .log
                .push(format!("solved `{}` for {}", eq.one_line(), target));
        } else if self.config.allow_nonconvergence {
            warn!("accepting non-converged value of {}", target);
            self.report
                .log
                .push(format!("timeout while solving `{}` for {}", eq.one_line(), target));
            self.report.nonconverged.push(target.clone());
        } else {
            return Err(NexsysError::NonConvergence {
                vars: vec![target],
                residual: result.function_value.abs(),
            });
        }
        info!("{} = {}", target, result.root);
        self.solution.insert(target, result.root);
        Ok(Progress::Solved)
    }

    /// Finds a square block of equations and solves it simultaneously.
    fn heavy_work(&mut self) -> Result<Progress, NexsysError> {
        let block = {
            let mut blks = BlockMgr::new(&self.solution);
            for (i, eq) in self.equations.iter().enumerate() {
                blks.add_item(i, eq);
            }
            blks.constrained()
        };
        let Some(block) = block else {
            return Ok(Progress::NoneSolved);
        };
        let residuals = block
            .equations
            .iter()
            .map(|&i| self.equations[i].substituted(&self.solution))
            .collect();
        let starts: Vec<Variable> = block.unknowns.iter().map(|v| self.start_value(v)).collect();
        let texts = block
            .equations
            .iter()
            .map(|&i| format!("`{}`", self.equations[i].one_line()))
            .join(", ");
        debug!("solving block {} for [{}]", texts, block.unknowns.join(", "));

        let mut NR_instanse = NR::new();
        NR_instanse.set_equation_system(
            residuals,
            Some(block.unknowns.clone()),
            starts.iter().map(|v| v.as_f64()).collect(),
            self.config.tolerance,
            self.config.max_iterations,
        )?;
        NR_instanse.set_solver_params(
            Some(self.config.linear_sys_method),
            Some(self.config.damping_factor),
        )?;
        NR_instanse.set_domains(starts.iter().map(|v| v.get_domain()).collect())?;
        let res = NR_instanse.solve()?;
        self.report.iterations += NR_instanse.i;

        let values = match res {
            Some(x) => {
                self.report.log.push(format!(
                    "solved system {} for variables [{}]",
                    texts,
                    block.unknowns.join(", ")
                ));
                x
            }
            None if self.config.allow_nonconvergence => {
                warn!("accepting non-converged values of [{}]", block.unknowns.join(", "));
                self.report.log.push(format!(
                    "timeout solving system {} for variables [{}]",
                    texts,
                    block.unknowns.join(", ")
                ));
                self.report.nonconverged.extend(block.unknowns.iter().cloned());
                NR_instanse.get_result().unwrap_or_else(|| {
                    nalgebra::DVector::from_iterator(starts.len(), starts.iter().map(|v| v.as_f64()))
                })
            }
            None => {
                return Err(NexsysError::NonConvergence {
                    vars: block.unknowns,
                    residual: NR_instanse.residual_norm,
                });
            }
        };
        for (var, value) in block.unknowns.iter().zip(values.iter()) {
            info!("{} = {}", var, value);
            self.solution.insert(var.clone(), *value);
        }
        let mut solved = block.equations;
        solved.sort_unstable_by(|a, b| b.cmp(a));
        for i in solved {
            self.equations.remove(i);
        }
        Ok(Progress::Solved)
    }

    fn solver(mut self) -> Result<(Solution, SolveReport), NexsysError> {
        let begin = Instant::now();
        info!("solving a system of {} equations", self.equations.len());
        loop {
            self.check_known()?;
            if self.light_work()? == Progress::Solved {
                continue;
            }
            if self.heavy_work()? == Progress::Solved {
                continue;
            }
            break;
        }
        for eq in &self.equations {
            warn!("equation on line {} was left unsolved: `{}`", eq.line, eq.one_line());
            self.report
                .unsolved
                .push(format!("[line {}] {}", eq.line, eq.one_line()));
        }
        self.report.elapsed = begin.elapsed();
        info!("\n{}", self.report);
        let solution = self.solution.into_iter().collect::<Solution>();
        Ok((solution, self.report))
    }

    /// Solves the system, consuming the solver. The logger is set up first according to
    /// the configuration.
    pub fn solve(self) -> Result<(Solution, SolveReport), NexsysError> {
        if init_logger(&self.config.loglevel, self.config.log_to_file)? {
            info!("logger initialised with level {}", self.config.loglevel);
        }
        self.solver()
    }
}
