use crate::symbolic::symbolic_engine::{Condition, Expr};

impl Expr {
    /// Analytical derivative with respect to `var`.
    ///
    /// Differentiation rules:
    /// - sum, product and quotient rules
    /// - general power rule: d(u^v) = v*u^(v-1)*u' + u^v*ln(u)*v' (the second term is
    ///   dropped when the exponent does not depend on `var`)
    /// - chain rule for every elementary function
    /// - conditionals differentiate branch-wise, the condition is kept as is
    ///
    /// # Examples
    /// ```rust, ignore
    /// let f = Expr::var("x").pow(Expr::Const(2.0)); // x^2
    /// let df_dx = f.diff("x"); // 2*x^1*1
    /// ```
    pub fn diff(&self, var: &str) -> Expr {
        match self {
            Expr::Var(name) => {
                if name == var {
                    Expr::Const(1.0)
                } else {
                    Expr::Const(0.0)
                }
            }
            Expr::Const(_) => Expr::Const(0.0),
            Expr::Add(lhs, rhs) => Expr::Add(Box::new(lhs.diff(var)), Box::new(rhs.diff(var))),
            Expr::Sub(lhs, rhs) => Expr::Sub(Box::new(lhs.diff(var)), Box::new(rhs.diff(var))),
            Expr::Mul(lhs, rhs) => Expr::Add(
                Box::new(Expr::Mul(Box::new(lhs.diff(var)), rhs.clone())),
                Box::new(Expr::Mul(lhs.clone(), Box::new(rhs.diff(var)))),
            ),
            Expr::Div(lhs, rhs) => Expr::Div(
                Box::new(Expr::Sub(
                    Box::new(Expr::Mul(Box::new(lhs.diff(var)), rhs.clone())),
                    Box::new(Expr::Mul(Box::new(rhs.diff(var)), lhs.clone())),
                )),
                Box::new(Expr::Mul(rhs.clone(), rhs.clone())),
            ),
            Expr::Pow(base, exp) => {
                let power_term = Expr::Mul(
                    Box::new(Expr::Mul(
                        exp.clone(),
                        Box::new(Expr::Pow(
                            base.clone(),
                            Box::new(Expr::Sub(exp.clone(), Box::new(Expr::Const(1.0)))),
                        )),
                    )),
                    Box::new(base.diff(var)),
                );
                if !exp.contains_variable(var) {
                    power_term
                } else {
                    let exp_term = Expr::Mul(
                        Box::new(Expr::Mul(
                            Box::new(self.clone()),
                            Box::new(Expr::Ln(base.clone())),
                        )),
                        Box::new(exp.diff(var)),
                    );
                    Expr::Add(Box::new(power_term), Box::new(exp_term))
                }
            }
            Expr::Exp(expr) => {
                Expr::Mul(Box::new(Expr::Exp(expr.clone())), Box::new(expr.diff(var)))
            }
            Expr::Ln(expr) => Expr::Div(Box::new(expr.diff(var)), expr.clone()),
            Expr::sin(expr) => {
                Expr::Mul(Box::new(Expr::cos(expr.clone())), Box::new(expr.diff(var)))
            }
            Expr::cos(expr) => Expr::Mul(
                Box::new(Expr::Mul(
                    Box::new(Expr::Const(-1.0)),
                    Box::new(Expr::sin(expr.clone())),
                )),
                Box::new(expr.diff(var)),
            ),
            Expr::tg(expr) => Expr::Mul(
                Box::new(Expr::Div(
                    Box::new(Expr::Const(1.0)),
                    Box::new(Expr::Pow(
                        Box::new(Expr::cos(expr.clone())),
                        Box::new(Expr::Const(2.0)),
                    )),
                )),
                Box::new(expr.diff(var)),
            ),
            Expr::ctg(expr) => Expr::Mul(
                Box::new(Expr::Div(
                    Box::new(Expr::Const(-1.0)),
                    Box::new(Expr::Pow(
                        Box::new(Expr::sin(expr.clone())),
                        Box::new(Expr::Const(2.0)),
                    )),
                )),
                Box::new(expr.diff(var)),
            ),
            Expr::arcsin(expr) => Expr::Div(
                Box::new(expr.diff(var)),
                Box::new(Expr::Pow(
                    Box::new(Expr::Sub(
                        Box::new(Expr::Const(1.0)),
                        Box::new(Expr::Pow(expr.clone(), Box::new(Expr::Const(2.0)))),
                    )),
                    Box::new(Expr::Const(0.5)),
                )),
            ),
            Expr::arccos(expr) => Expr::Div(
                Box::new(Expr::Mul(
                    Box::new(Expr::Const(-1.0)),
                    Box::new(expr.diff(var)),
                )),
                Box::new(Expr::Pow(
                    Box::new(Expr::Sub(
                        Box::new(Expr::Const(1.0)),
                        Box::new(Expr::Pow(expr.clone(), Box::new(Expr::Const(2.0)))),
                    )),
                    Box::new(Expr::Const(0.5)),
                )),
            ),
            Expr::arctg(expr) => Expr::Div(
                Box::new(expr.diff(var)),
                Box::new(Expr::Add(
                    Box::new(Expr::Const(1.0)),
                    Box::new(Expr::Pow(expr.clone(), Box::new(Expr::Const(2.0)))),
                )),
            ),
            // d|u| = u/|u| * u'
            Expr::Abs(expr) => Expr::Mul(
                Box::new(Expr::Div(expr.clone(), Box::new(Expr::Abs(expr.clone())))),
                Box::new(expr.diff(var)),
            ),
            Expr::If(cond, then, otherwise) => Expr::If(
                Box::new(Condition {
                    lhs: cond.lhs.clone(),
                    op: cond.op,
                    rhs: cond.rhs.clone(),
                }),
                Box::new(then.diff(var)),
                Box::new(otherwise.diff(var)),
            ),
        }
    } // end of diff

    /// Vector of partial derivatives w.r.t. each of `all_vars`, simplified.
    pub fn diff_multi_args(&self, all_vars: &[&str]) -> Vec<Expr> {
        all_vars
            .iter()
            .map(|var| self.diff(var).simplify_numbers())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use crate::symbolic::symbolic_engine::Expr;
    use approx::assert_relative_eq;

    fn central_difference(e: &Expr, var: &str, at: f64) -> f64 {
        let f = e.lambdify(&[var]).unwrap();
        let h = 1e-6;
        (f(&[at + h]) - f(&[at - h])) / (2.0 * h)
    }

    #[test]
    fn test_diff_matches_finite_difference() {
        let cases = [
            "x^3 - 2*x",
            "sin(x)*exp(x)",
            "ln(x)/x",
            "tan(x) + cot(x)",
            "asin(x/2) + acos(x/3) + atan(x)",
            "x^x",
            "2^x",
            "sqrt(x^2 + 1)",
            "abs(x - 5)",
        ];
        for case in cases {
            let e = Expr::parse_expression(case).unwrap();
            let analytic = e.diff("x").lambdify(&["x"]).unwrap()(&[0.7]);
            let numeric = central_difference(&e, "x", 0.7);
            assert_relative_eq!(analytic, numeric, epsilon = 1e-5);
        }
    }

    #[test]
    fn test_diff_of_other_variable_is_zero() {
        let e = Expr::parse_expression("y^2 + 3").unwrap();
        assert_eq!(e.diff("x").simplify_numbers(), Expr::Const(0.0));
    }

    #[test]
    fn test_diff_conditional_branchwise() {
        let e = Expr::parse_expression("if(x < 0, -x, x^2)").unwrap();
        let d = e.diff("x").lambdify(&["x"]).unwrap();
        assert_relative_eq!(d(&[-3.0]), -1.0);
        assert_relative_eq!(d(&[3.0]), 6.0);
    }

    #[test]
    fn test_diff_multi_args() {
        let e = Expr::parse_expression("x*y + y").unwrap();
        let grad = e.diff_multi_args(&["x", "y"]);
        let values = [2.0, 5.0];
        let dx = grad[0].lambdify(&["x", "y"]).unwrap()(&values);
        let dy = grad[1].lambdify(&["x", "y"]).unwrap()(&values);
        assert_eq!((dx, dy), (5.0, 3.0));
    }
}
