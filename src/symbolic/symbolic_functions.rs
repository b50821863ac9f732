#![allow(non_camel_case_types)]

use crate::errors::NexsysError;
use crate::symbolic::symbolic_engine::Expr;
use nalgebra::{DMatrix, DVector};
///
/// calculate symbolic jacobian of a block of residuals and evaluate it
/// Example#
/// ```
/// use nexsys::symbolic::symbolic_functions::Jacobian;
/// use nexsys::symbolic::symbolic_engine::Expr;
/// let residuals = Expr::parse_vector_expression(vec!["2*x^3 + y", "x - y"]).unwrap();
/// let mut jacobian_instance = Jacobian::new();
/// jacobian_instance.set_vector_of_functions(residuals);
/// jacobian_instance.set_variables(vec!["x", "y"]);
/// jacobian_instance.calc_jacobian();
/// jacobian_instance.lambdify_jacobian_and_functions().unwrap();
/// let j = jacobian_instance.evaluate_func_jacobian_DMatrix(&[1.0, 2.0]);
/// assert_eq!(j[(0, 0)], 6.0);
/// assert_eq!(j[(1, 1)], -1.0);
/// ```
pub struct Jacobian {
    pub vector_of_functions: Vec<Expr>, // residuals F(x)
    pub variable_string: Vec<String>,   // unknowns in column order
    pub symbolic_jacobian: Vec<Vec<Expr>>,
    lambdified_functions: Vec<Box<dyn Fn(&[f64]) -> f64>>,
    lambdified_jacobian: Vec<Vec<Box<dyn Fn(&[f64]) -> f64>>>,
}

impl Jacobian {
    pub fn new() -> Self {
        Jacobian {
            vector_of_functions: Vec::new(),
            variable_string: Vec::new(),
            symbolic_jacobian: Vec::new(),
            lambdified_functions: Vec::new(),
            lambdified_jacobian: Vec::new(),
        }
    }

    pub fn set_vector_of_functions(&mut self, value: Vec<Expr>) {
        self.vector_of_functions = value;
    }

    pub fn set_variables(&mut self, varvec: Vec<&str>) {
        self.variable_string = varvec.iter().map(|s| s.to_string()).collect();
    }

    /// symbolic dF_i/dx_j, simplified
    pub fn calc_jacobian(&mut self) {
        let vars: Vec<&str> = self.variable_string.iter().map(|s| s.as_str()).collect();
        self.symbolic_jacobian = self
            .vector_of_functions
            .iter()
            .map(|f| f.diff_multi_args(&vars))
            .collect();
    }

    /// human readable form of the symbolic jacobian, row by row
    pub fn readable_jacobian(&self) -> Vec<Vec<String>> {
        self.symbolic_jacobian
            .iter()
            .map(|row| row.iter().map(|e| e.to_string()).collect())
            .collect()
    }

    /// Turns residuals and jacobian elements into closures over the unknowns.
    pub fn lambdify_jacobian_and_functions(&mut self) -> Result<(), NexsysError> {
        let vars: Vec<&str> = self.variable_string.iter().map(|s| s.as_str()).collect();
        self.lambdified_functions = self
            .vector_of_functions
            .iter()
            .map(|f| f.lambdify(&vars))
            .collect::<Result<_, _>>()?;
        let mut rows = Vec::with_capacity(self.symbolic_jacobian.len());
        for row in &self.symbolic_jacobian {
            let lambdified_row = row
                .iter()
                .map(|e| e.lambdify(&vars))
                .collect::<Result<Vec<_>, _>>()?;
            rows.push(lambdified_row);
        }
        self.lambdified_jacobian = rows;
        Ok(())
    }

    pub fn evaluate_func_jacobian_DMatrix(&self, x: &[f64]) -> DMatrix<f64> {
        let n_rows = self.lambdified_jacobian.len();
        let n_cols = self.variable_string.len();
        DMatrix::from_fn(n_rows, n_cols, |i, j| (self.lambdified_jacobian[i][j])(x))
    }

    pub fn evaluate_funvector_lambdified_DVector(&self, x: &[f64]) -> DVector<f64> {
        DVector::from_iterator(
            self.lambdified_functions.len(),
            self.lambdified_functions.iter().map(|f| f(x)),
        )
    }
}

impl Default for Jacobian {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_jacobian_of_linear_system() {
        let residuals = Expr::parse_vector_expression(vec![
            "2*x + 5*y + 2*z + 38",
            "3*x - 2*y + 4*z - 17",
            "-6*x + y - 7*z + 12",
        ])
        .unwrap();
        let mut jac = Jacobian::new();
        jac.set_vector_of_functions(residuals);
        jac.set_variables(vec!["x", "y", "z"]);
        jac.calc_jacobian();
        jac.lambdify_jacobian_and_functions().unwrap();
        let j = jac.evaluate_func_jacobian_DMatrix(&[0.0, 0.0, 0.0]);
        let expected = DMatrix::from_row_slice(3, 3, &[2.0, 5.0, 2.0, 3.0, -2.0, 4.0, -6.0, 1.0, -7.0]);
        assert_eq!(j, expected);
        let f = jac.evaluate_funvector_lambdified_DVector(&[0.0, 0.0, 0.0]);
        assert_eq!(f, DVector::from_vec(vec![38.0, -17.0, 12.0]));
        assert_eq!(jac.readable_jacobian()[0][0], "2");
    }

    #[test]
    fn test_lambdify_rejects_foreign_variables() {
        let mut jac = Jacobian::new();
        jac.set_vector_of_functions(vec![Expr::parse_expression("x + a").unwrap()]);
        jac.set_variables(vec!["x"]);
        jac.calc_jacobian();
        assert!(jac.lambdify_jacobian_and_functions().is_err());
    }
}
