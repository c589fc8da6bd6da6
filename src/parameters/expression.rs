//! Expression parsing and evaluation for parameter constraints
//!
//! Expressions tie one parameter to others, in the style of lmfit-py. A typical
//! use is fixing an isotopologue ratio, e.g. `N_1_0 = N_0_0 / 70`.
//!
//! Grammar (lowest to highest precedence):
//!
//! ```text
//! expr    := term (('+' | '-') term)*
//! term    := unary (('*' | '/') unary)*
//! unary   := '-' unary | power
//! power   := primary ('^' unary)?
//! primary := number | identifier '(' args ')' | identifier | '(' expr ')'
//! ```

use nom::{
    branch::alt,
    bytes::complete::tag,
    character::complete::{alpha1, alphanumeric1, char, multispace0},
    combinator::recognize,
    multi::many0,
    number::complete::double,
    sequence::{delimited, pair},
    IResult, Parser,
};
use std::collections::HashMap;
use thiserror::Error;

type ParseError<'a> = nom::error::Error<&'a str>;

/// Error that can occur during expression parsing or evaluation
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExpressionError {
    #[error("Failed to parse expression: {message}")]
    ParseError { message: String },

    #[error("Undefined variable: {name}")]
    UndefinedVariable { name: String },

    #[error("Division by zero")]
    DivisionByZero,

    #[error("Invalid operation: {message}")]
    InvalidOperation { message: String },

    #[error("Undefined function: {name}")]
    UndefinedFunction { name: String },
}

type ExprResult<T> = Result<T, ExpressionError>;

/// Expression AST node
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    Number(f64),
    Variable(String),
    Neg(Box<Expression>),
    Binary(BinaryOp, Box<Expression>, Box<Expression>),
    Function(String, Vec<Expression>),
}

/// Binary operations
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Pow,
}

/// Context for expression evaluation, providing variable values
pub trait EvaluationContext {
    /// Get the value of a variable
    fn get_variable(&self, name: &str) -> ExprResult<f64>;
}

impl EvaluationContext for HashMap<String, f64> {
    fn get_variable(&self, name: &str) -> ExprResult<f64> {
        self.get(name)
            .copied()
            .ok_or_else(|| ExpressionError::UndefinedVariable {
                name: name.to_string(),
            })
    }
}

impl Expression {
    /// Parse an expression from a string
    ///
    /// # Examples
    ///
    /// ```
    /// use std::collections::HashMap;
    /// use astrovoigt_rs::parameters::expression::Expression;
    ///
    /// let expr = Expression::parse("N_0_0 / 70").unwrap();
    /// let mut vars = HashMap::new();
    /// vars.insert("N_0_0".to_string(), 1.4e13);
    /// assert_eq!(expr.evaluate(&vars).unwrap(), 2e11);
    /// ```
    pub fn parse(input: &str) -> ExprResult<Self> {
        match expr_parser(input.trim()) {
            Ok((remainder, expr)) if remainder.trim().is_empty() => Ok(expr),
            Ok((remainder, _)) => Err(ExpressionError::ParseError {
                message: format!("Unexpected trailing characters: '{}'", remainder),
            }),
            Err(e) => Err(ExpressionError::ParseError {
                message: format!("{:?}", e),
            }),
        }
    }

    /// Evaluate the expression with the given context
    pub fn evaluate<C: EvaluationContext + ?Sized>(&self, context: &C) -> ExprResult<f64> {
        match self {
            Self::Number(n) => Ok(*n),
            Self::Variable(name) => context.get_variable(name),
            Self::Neg(expr) => Ok(-expr.evaluate(context)?),
            Self::Binary(op, left, right) => {
                let lhs = left.evaluate(context)?;
                let rhs = right.evaluate(context)?;

                match op {
                    BinaryOp::Add => Ok(lhs + rhs),
                    BinaryOp::Sub => Ok(lhs - rhs),
                    BinaryOp::Mul => Ok(lhs * rhs),
                    BinaryOp::Div if rhs == 0.0 => Err(ExpressionError::DivisionByZero),
                    BinaryOp::Div => Ok(lhs / rhs),
                    BinaryOp::Pow => Ok(lhs.powf(rhs)),
                }
            }
            Self::Function(name, args) => {
                let values = args
                    .iter()
                    .map(|arg| arg.evaluate(context))
                    .collect::<ExprResult<Vec<f64>>>()?;
                call_function(name, &values)
            }
        }
    }

    /// All variable names used in the expression, sorted and deduplicated
    pub fn variables(&self) -> Vec<String> {
        let mut vars = Vec::new();
        self.collect_variables(&mut vars);
        vars.sort();
        vars.dedup();
        vars
    }

    fn collect_variables(&self, vars: &mut Vec<String>) {
        match self {
            Self::Number(_) => {}
            Self::Variable(name) => vars.push(name.clone()),
            Self::Neg(expr) => expr.collect_variables(vars),
            Self::Binary(_, left, right) => {
                left.collect_variables(vars);
                right.collect_variables(vars);
            }
            Self::Function(_, args) => args.iter().for_each(|arg| arg.collect_variables(vars)),
        }
    }
}

fn call_function(name: &str, args: &[f64]) -> ExprResult<f64> {
    let one_arg = |f: fn(f64) -> f64| match args {
        [x] => Ok(f(*x)),
        _ => Err(ExpressionError::InvalidOperation {
            message: format!("{}() requires 1 argument, got {}", name, args.len()),
        }),
    };

    match name {
        "sin" => one_arg(f64::sin),
        "cos" => one_arg(f64::cos),
        "tan" => one_arg(f64::tan),
        "exp" => one_arg(f64::exp),
        "log" | "ln" => one_arg(f64::ln),
        "log10" => one_arg(f64::log10),
        "sqrt" => one_arg(f64::sqrt),
        "abs" => one_arg(f64::abs),
        "max" | "min" if args.len() < 2 => Err(ExpressionError::InvalidOperation {
            message: format!("{}() requires at least 2 arguments, got {}", name, args.len()),
        }),
        "max" => Ok(args.iter().fold(f64::NEG_INFINITY, |a, &b| a.max(b))),
        "min" => Ok(args.iter().fold(f64::INFINITY, |a, &b| a.min(b))),
        _ => Err(ExpressionError::UndefinedFunction {
            name: name.to_string(),
        }),
    }
}

// Parser functions using nom

fn ws_char<'a>(c: char) -> impl Parser<&'a str, Output = char, Error = ParseError<'a>> {
    delimited(
        multispace0::<&str, ParseError<'_>>,
        char::<&str, ParseError<'_>>(c),
        multispace0::<&str, ParseError<'_>>,
    )
}

/// Parse an identifier (variable or function name)
fn identifier(input: &str) -> IResult<&str, String> {
    let mut parser = recognize(pair(
        alt((alpha1, tag("_"))),
        many0(alt((alphanumeric1, tag("_")))),
    ));

    let (input, matched) = parser.parse(input)?;
    Ok((input, matched.to_string()))
}

/// Numbers must start with a digit or '.', so names such as `inf_0` stay identifiers.
fn number(input: &str) -> IResult<&str, Expression> {
    match input.chars().next() {
        Some(c) if c.is_ascii_digit() || c == '.' => {
            let (input, value) = double::<&str, ParseError<'_>>(input)?;
            Ok((input, Expression::Number(value)))
        }
        _ => Err(nom::Err::Error(nom::error::Error::new(
            input,
            nom::error::ErrorKind::Float,
        ))),
    }
}

fn args_list(input: &str) -> IResult<&str, Vec<Expression>> {
    let (mut input, first) = expr_parser(input)?;
    let mut args = vec![first];

    loop {
        match ws_char(',').parse(input) {
            Ok((rest, _)) => {
                let (rest, arg) = expr_parser(rest)?;
                args.push(arg);
                input = rest;
            }
            Err(nom::Err::Error(_)) => return Ok((input, args)),
            Err(e) => return Err(e),
        }
    }
}

fn identifier_or_call(input: &str) -> IResult<&str, Expression> {
    let (input, name) = identifier(input)?;
    match ws_char('(').parse(input) {
        Ok((rest, _)) => {
            let (rest, args) = args_list(rest)?;
            let (rest, _) = ws_char(')').parse(rest)?;
            Ok((rest, Expression::Function(name, args)))
        }
        Err(nom::Err::Error(_)) => Ok((input, Expression::Variable(name))),
        Err(e) => Err(e),
    }
}

fn parenthesized(input: &str) -> IResult<&str, Expression> {
    let (input, _) = ws_char('(').parse(input)?;
    let (input, expr) = expr_parser(input)?;
    let (input, _) = ws_char(')').parse(input)?;
    Ok((input, expr))
}

fn primary(input: &str) -> IResult<&str, Expression> {
    let (input, _) = multispace0::<&str, ParseError<'_>>(input)?;
    let (input, expr) = alt((number, identifier_or_call, parenthesized)).parse(input)?;
    let (input, _) = multispace0::<&str, ParseError<'_>>(input)?;
    Ok((input, expr))
}

fn power(input: &str) -> IResult<&str, Expression> {
    let (input, base) = primary(input)?;
    match ws_char('^').parse(input) {
        Ok((rest, _)) => {
            let (rest, exponent) = unary(rest)?;
            Ok((
                rest,
                Expression::Binary(BinaryOp::Pow, Box::new(base), Box::new(exponent)),
            ))
        }
        Err(nom::Err::Error(_)) => Ok((input, base)),
        Err(e) => Err(e),
    }
}

fn unary(input: &str) -> IResult<&str, Expression> {
    match ws_char('-').parse(input) {
        Ok((rest, _)) => {
            let (rest, operand) = unary(rest)?;
            Ok((rest, Expression::Neg(Box::new(operand))))
        }
        Err(nom::Err::Error(_)) => power(input),
        Err(e) => Err(e),
    }
}

/// Left-associative chain of `operand (op operand)*`
fn left_chain<'a>(
    input: &'a str,
    operand: fn(&'a str) -> IResult<&'a str, Expression>,
    ops: [(char, BinaryOp); 2],
) -> IResult<&'a str, Expression> {
    let (mut input, mut acc) = operand(input)?;

    loop {
        let op = match alt((ws_char(ops[0].0), ws_char(ops[1].0))).parse(input) {
            Ok((rest, c)) => {
                input = rest;
                if c == ops[0].0 {
                    ops[0].1
                } else {
                    ops[1].1
                }
            }
            Err(nom::Err::Error(_)) => return Ok((input, acc)),
            Err(e) => return Err(e),
        };

        let (rest, rhs) = operand(input)?;
        acc = Expression::Binary(op, Box::new(acc), Box::new(rhs));
        input = rest;
    }
}

fn term(input: &str) -> IResult<&str, Expression> {
    left_chain(input, unary, [('*', BinaryOp::Mul), ('/', BinaryOp::Div)])
}

fn expr_parser(input: &str) -> IResult<&str, Expression> {
    left_chain(input, term, [('+', BinaryOp::Add), ('-', BinaryOp::Sub)])
}
