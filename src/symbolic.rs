#![allow(non_camel_case_types)]
#![allow(non_snake_case)]
/// a module turns a String expression into a symbolic expression
///
///# Example
/// ```
/// use nexsys::symbolic::symbolic_engine::Expr;
/// let input = "x^2.3 * log(x + y + y^2.6)";
/// let parsed_expression = Expr::parse_expression(input).unwrap();
/// println!(" parsed_expression {}", parsed_expression);
/// let parsed_function = parsed_expression.lambdify(&["x", "y"]).unwrap();
/// println!("{}, Rust function: {}  \n", input, parsed_function(&[1.0, 2.0]));
/// ```
/// ________________________________________________________________________________________________________________________________
pub mod parse_expr;
///____________________________________________________________________________________________________________________________
/// # Symbolic engine
/// 1) expression tree with conditionals
/// 2) substitution of known values and folding of constants
/// 3) turns a symbolic expression into a Rust closure
/// 4) analytical derivatives
///# Example#
/// ```
/// use nexsys::symbolic::symbolic_engine::Expr;
/// let parsed_expression = Expr::parse_expression("exp(x) + ln(y)").unwrap();
/// // vec of all arguments
/// let all = parsed_expression.all_arguments_are_variables();
/// assert_eq!(all, vec!["x", "y"]);
/// // differentiate with respect to x and y
/// let df_dx = parsed_expression.diff("x");
/// let df_dy = parsed_expression.diff("y");
/// println!("df_dx = {}, df_dy = {}", df_dx, df_dy);
/// let function_of_x_and_y = parsed_expression.lambdify(&["x", "y"]).unwrap();
/// assert_eq!(function_of_x_and_y(&[0.0, 1.0]), 1.0);
/// ```
/// ________________________________________________________________________________________________________________________________________________
pub mod symbolic_engine;
pub mod symbolic_engine_derivatives;
///________________________________________________________________________________________________________________________________________________
/// symbolic jacobian of a block of residuals, evaluated into nalgebra matrices
pub mod symbolic_functions;
