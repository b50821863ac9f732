//! Turns a string expression into a symbolic `Expr`.
//!
//! Grammar (lowest to highest precedence):
//! ```text
//!  expr    := term (('+' | '-') term)*
//!  term    := unary (('*' | '/') unary)*
//!  unary   := ('-' | '+') unary | power
//!  power   := primary ('^' unary)?          right associative, -x^2 = -(x^2)
//!  primary := number | call | identifier | '(' expr ')'
//!  call    := name '(' expr (',' expr)* ')' | 'if' '(' expr cmp expr ',' expr ',' expr ')'
//! ```
//! `pi` and `e` are constants; `log` is the natural logarithm like `ln`.
use crate::errors::NexsysError;
use crate::symbolic::symbolic_engine::{Comparator, Condition, Expr};
use nom::{
    IResult, Parser,
    branch::alt,
    bytes::complete::tag,
    character::complete::{alpha1, alphanumeric1, char, multispace0, one_of},
    combinator::{all_consuming, map_res, not, opt, recognize},
    error::Error as NomError,
    multi::{many0, separated_list1},
    number::complete::recognize_float,
    sequence::{delimited, pair, preceded},
};
use regex::Regex;
use std::str::FromStr;
use std::sync::LazyLock;

/// Names callable as functions, `if` included.
pub const KNOWN_FUNCTIONS: [&str; 21] = [
    "exp", "ln", "log", "log10", "sqrt", "abs", "sin", "cos", "tan", "tg", "cot", "ctg", "asin",
    "arcsin", "acos", "arccos", "atan", "arctan", "arctg", "if", "pow",
];

static CALL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([A-Za-z_][A-Za-z0-9_]*)\s*\(").expect("valid regex"));

fn ws<'a, O, F>(inner: F) -> impl Parser<&'a str, Output = O, Error = NomError<&'a str>>
where
    F: Parser<&'a str, Output = O, Error = NomError<&'a str>>,
{
    delimited(multispace0, inner, multispace0)
}

/// Identifier: letter or underscore followed by letters, digits, underscores
pub fn parse_identifier(input: &str) -> IResult<&str, &str> {
    recognize(pair(
        alt((alpha1, tag("_"))),
        many0(alt((alphanumeric1, tag("_")))),
    ))
    .parse(input)
}

/// Unsigned decimal number with optional fraction and exponent: `12`, `1.5`, `.5`, `2e-3`.
/// Signs belong to the unary operator.
pub fn parse_number(input: &str) -> IResult<&str, f64> {
    map_res(
        preceded(not(one_of("+-")), recognize_float),
        f64::from_str,
    )
    .parse(input)
}

fn parse_comparator(input: &str) -> IResult<&str, Comparator> {
    map_res(
        alt((tag("=="), tag("<="), tag(">="), tag("!="), tag("<"), tag(">"))),
        Comparator::from_str,
    )
    .parse(input)
}

/// `lhs <cmp> rhs`
pub fn parse_condition(input: &str) -> IResult<&str, Condition> {
    let (input, lhs) = parse_expr(input)?;
    let (input, op) = ws(parse_comparator).parse(input)?;
    let (input, rhs) = parse_expr(input)?;
    Ok((input, Condition { lhs, op, rhs }))
}

fn build_call(name: &str, mut args: Vec<Expr>) -> Result<Expr, String> {
    if name == "pow" {
        if args.len() != 2 {
            return Err(format!("pow expects 2 arguments, found {}", args.len()));
        }
        let exp = args.pop().unwrap_or(Expr::Const(1.0));
        let base = args.pop().unwrap_or(Expr::Const(1.0));
        return Ok(base.pow(exp));
    }
    if args.len() != 1 {
        return Err(format!("{} expects 1 argument, found {}", name, args.len()));
    }
    let arg = args.remove(0).boxed();
    let expr = match name {
        "exp" => Expr::Exp(arg),
        "ln" | "log" => Expr::Ln(arg),
        "log10" => Expr::Div(Expr::Ln(arg).boxed(), Expr::Ln(Expr::Const(10.0).boxed()).boxed()),
        "sqrt" => Expr::Pow(arg, Expr::Const(0.5).boxed()),
        "abs" => Expr::Abs(arg),
        "sin" => Expr::sin(arg),
        "cos" => Expr::cos(arg),
        "tan" | "tg" => Expr::tg(arg),
        "cot" | "ctg" => Expr::ctg(arg),
        "asin" | "arcsin" => Expr::arcsin(arg),
        "acos" | "arccos" => Expr::arccos(arg),
        "atan" | "arctan" | "arctg" => Expr::arctg(arg),
        other => return Err(format!("unknown function {}", other)),
    };
    Ok(expr)
}

fn parse_if_call(input: &str) -> IResult<&str, Expr> {
    let (input, _) = ws(char('(')).parse(input)?;
    let (input, cond) = parse_condition(input)?;
    let (input, _) = ws(char(',')).parse(input)?;
    let (input, then) = parse_expr(input)?;
    let (input, _) = ws(char(',')).parse(input)?;
    let (input, otherwise) = parse_expr(input)?;
    let (input, _) = ws(char(')')).parse(input)?;
    Ok((input, Expr::If(Box::new(cond), then.boxed(), otherwise.boxed())))
}

fn parse_call_or_name(input: &str) -> IResult<&str, Expr> {
    let (rest, name) = parse_identifier(input)?;
    if name == "if" {
        return parse_if_call(rest);
    }
    let (after_paren, paren) = opt(ws(char('('))).parse(rest)?;
    if paren.is_none() {
        let expr = match name {
            "pi" => Expr::Const(std::f64::consts::PI),
            "e" => Expr::Const(std::f64::consts::E),
            _ => Expr::Var(name.to_string()),
        };
        return Ok((rest, expr));
    }
    let (after_args, args) = separated_list1(ws(char(',')), parse_expr).parse(after_paren)?;
    let (remaining, _) = ws(char(')')).parse(after_args)?;
    match build_call(name, args) {
        Ok(expr) => Ok((remaining, expr)),
        Err(_) => Err(nom::Err::Failure(NomError::new(
            input,
            nom::error::ErrorKind::Verify,
        ))),
    }
}

fn parse_constant(input: &str) -> IResult<&str, Expr> {
    let (input, value) = parse_number(input)?;
    Ok((input, Expr::Const(value)))
}

fn parse_primary(input: &str) -> IResult<&str, Expr> {
    ws(alt((
        parse_constant,
        parse_call_or_name,
        delimited(char('('), parse_expr, char(')')),
    )))
    .parse(input)
}

fn parse_power(input: &str) -> IResult<&str, Expr> {
    let (input, base) = parse_primary(input)?;
    let (input, exponent) = opt(preceded(ws(char('^')), parse_unary)).parse(input)?;
    match exponent {
        Some(exp) => Ok((input, base.pow(exp))),
        None => Ok((input, base)),
    }
}

fn parse_unary(input: &str) -> IResult<&str, Expr> {
    let (rest, sign) = opt(ws(one_of("+-"))).parse(input)?;
    match sign {
        Some('-') => {
            let (rest, operand) = parse_unary(rest)?;
            let negated = match operand {
                Expr::Const(c) => Expr::Const(-c),
                other => -other,
            };
            Ok((rest, negated))
        }
        Some(_) => parse_unary(rest),
        None => parse_power(input),
    }
}

fn parse_term(input: &str) -> IResult<&str, Expr> {
    let (input, first) = parse_unary(input)?;
    let (input, rest) = many0(pair(ws(one_of("*/")), parse_unary)).parse(input)?;
    let expr = rest.into_iter().fold(first, |acc, (op, rhs)| match op {
        '*' => acc * rhs,
        _ => acc / rhs,
    });
    Ok((input, expr))
}

/// Sum of terms; the entry point of the recursive grammar.
pub fn parse_expr(input: &str) -> IResult<&str, Expr> {
    let (input, first) = parse_term(input)?;
    let (input, rest) = many0(pair(ws(one_of("+-")), parse_term)).parse(input)?;
    let expr = rest.into_iter().fold(first, |acc, (op, rhs)| match op {
        '+' => acc + rhs,
        _ => acc - rhs,
    });
    Ok((input, expr))
}

/// Finds the first call to a function outside `KNOWN_FUNCTIONS`.
fn unknown_function(input: &str) -> Option<String> {
    CALL.captures_iter(input)
        .map(|c| c[1].to_string())
        .find(|name| !KNOWN_FUNCTIONS.contains(&name.as_str()))
}

fn describe_failure(input: &str, err: nom::Err<NomError<&str>>) -> NexsysError {
    let near = match err {
        nom::Err::Error(e) | nom::Err::Failure(e) => e.input.trim().to_string(),
        nom::Err::Incomplete(_) => String::new(),
    };
    let message = if near.is_empty() {
        format!("incomplete expression `{}`", input.trim())
    } else {
        format!("could not parse expression `{}` near `{}`", input.trim(), near)
    };
    NexsysError::Parse { line: 0, message }
}

impl Expr {
    /// Parses a whole string into an expression.
    ///
    /// # Examples
    /// ```
    /// use nexsys::symbolic::symbolic_engine::Expr;
    /// let e = Expr::parse_expression("x^2 + 2*x + 1").unwrap();
    /// assert_eq!(e.lambdify(&["x"]).unwrap()(&[1.0]), 4.0);
    /// ```
    pub fn parse_expression(input: &str) -> Result<Expr, NexsysError> {
        if let Some(name) = unknown_function(input) {
            return Err(NexsysError::UnknownFunction { line: 0, name });
        }
        match all_consuming(ws(parse_expr)).parse(input) {
            Ok((_, expr)) => Ok(expr),
            Err(err) => Err(describe_failure(input, err)),
        }
    }

    /// Parses the condition part of a conditional header, e.g. `a + 1 <= b`.
    pub fn parse_condition(input: &str) -> Result<Condition, NexsysError> {
        if let Some(name) = unknown_function(input) {
            return Err(NexsysError::UnknownFunction { line: 0, name });
        }
        match all_consuming(ws(parse_condition)).parse(input) {
            Ok((_, cond)) => Ok(cond),
            Err(err) => Err(describe_failure(input, err)),
        }
    }

    /// Parses several strings, stopping at the first failure.
    pub fn parse_vector_expression(input: Vec<&str>) -> Result<Vec<Expr>, NexsysError> {
        input.into_iter().map(Expr::parse_expression).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn at(input: &str, vars: &[&str], values: &[f64]) -> f64 {
        Expr::parse_expression(input).unwrap().lambdify(vars).unwrap()(values)
    }

    #[test]
    fn test_parse_number() {
        assert_eq!(parse_number("12 ").unwrap(), (" ", 12.0));
        assert_eq!(parse_number("1.5e3*x").unwrap(), ("*x", 1500.0));
        assert_eq!(parse_number(".25").unwrap(), ("", 0.25));
        assert_eq!(parse_number("2.5").unwrap(), ("", 2.5));
        assert_eq!(parse_number("0.1").unwrap(), ("", 0.1));
        assert_eq!(parse_number("3.").unwrap(), ("", 3.0));
        assert_eq!(parse_number("2e-3)").unwrap(), (")", 0.002));
        assert!(parse_number("x1").is_err());
        assert!(parse_number("-2").is_err());
    }

    #[test]
    fn test_parse_identifier() {
        assert_eq!(parse_identifier("flow_in2 + 1").unwrap(), (" + 1", "flow_in2"));
        assert_eq!(parse_identifier("_tmp").unwrap(), ("", "_tmp"));
    }

    #[test]
    fn test_decimal_literals_keep_their_fraction() {
        assert_eq!(Expr::parse_expression("1.5").unwrap(), Expr::Const(1.5));
        assert_eq!(Expr::parse_expression("-2.5").unwrap(), Expr::Const(-2.5));
        assert_eq!(
            Expr::parse_expression("x + 0.5").unwrap(),
            Expr::Add(Expr::var("x").boxed(), Expr::Const(0.5).boxed())
        );
        assert_eq!(at("1e8 + 0.1", &[], &[]), 1e8 + 0.1);
        assert_eq!(at("x*.5", &["x"], &[3.0]), 1.5);
    }

    #[test]
    fn test_precedence() {
        assert_eq!(at("1 + 2 * 3", &[], &[]), 7.0);
        assert_eq!(at("(1 + 2) * 3", &[], &[]), 9.0);
        assert_eq!(at("2 ^ 3 ^ 2", &[], &[]), 512.0);
        assert_eq!(at("-x^2", &["x"], &[3.0]), -9.0);
        assert_eq!(at("2^-1", &[], &[]), 0.5);
        assert_eq!(at("8 / 4 / 2", &[], &[]), 1.0);
        assert_eq!(at("10 - 4 - 3", &[], &[]), 3.0);
        assert_eq!(at("- -2", &[], &[]), 2.0);
    }

    #[test]
    fn test_functions_and_constants() {
        assert_relative_eq!(at("sin(pi/2) + cos(0)", &[], &[]), 2.0);
        assert_relative_eq!(at("ln(e)", &[], &[]), 1.0);
        assert_relative_eq!(at("log10(1000)", &[], &[]), 3.0);
        assert_relative_eq!(at("sqrt(16) + abs(-2)", &[], &[]), 6.0);
        assert_relative_eq!(at("pow(2, 10)", &[], &[]), 1024.0);
        assert_relative_eq!(at("atan(1)*4", &[], &[]), std::f64::consts::PI);
    }

    #[test]
    fn test_inline_conditional() {
        let e = Expr::parse_expression("if(a <= b, b - a, a - b)").unwrap();
        let f = e.lambdify(&["a", "b"]).unwrap();
        assert_eq!(f(&[1.0, 4.0]), 3.0);
        assert_eq!(f(&[4.0, 1.0]), 3.0);
    }

    #[test]
    fn test_errors() {
        assert_eq!(
            Expr::parse_expression("foo(x) + 1"),
            Err(NexsysError::UnknownFunction { line: 0, name: "foo".to_string() })
        );
        assert!(Expr::parse_expression("x +").is_err());
        assert!(Expr::parse_expression("(x + 1").is_err());
        assert!(Expr::parse_expression("x y").is_err());
        assert!(Expr::parse_expression("sin(x, y)").is_err());
        assert!(Expr::parse_expression("").is_err());
    }

    #[test]
    fn test_condition() {
        let c = Expr::parse_condition("a + 1 >= 2*b").unwrap();
        assert_eq!(c.op, Comparator::Ge);
        assert_eq!(c.rhs.all_arguments_are_variables(), vec!["b"]);
        assert_eq!(
            Expr::parse_condition("foo(a) < b").unwrap_err(),
            NexsysError::UnknownFunction { line: 0, name: "foo".to_string() }
        );
    }
}
