//! Evaluates Lisp expression trees against a fixed registry of builtin
//! procedures. Lambdas are applied by substituting the argument values into
//! a fresh copy of their body.

use std::collections::HashMap;
use std::fmt::Display;

use lazy_static::lazy_static;
use log::{debug, trace};

use crate::expression_tree::{substitute_symbols, Atom, ExprNode};
use crate::numeric::Number;
use crate::source_generation::generate;

/// Maximum evaluation depth. Self-applying lambdas recurse forever, so they
/// have to be stopped before the host stack runs out.
pub const MAX_EVAL_DEPTH: usize = 256;

/// Represents the result of evaluating an expression.
#[derive(Debug, PartialEq, Clone)]
pub enum Value {
    Number(Number),
    Text(String),
    Closure {
        params: Vec<String>,
        body: Box<ExprNode>,
    },
}

impl Value {
    // Turns the value back into an expression so it can be substituted into
    // a lambda body.
    fn into_expr_node(self) -> ExprNode {
        match self {
            Value::Number(number) => ExprNode::Atom(Atom::Integer(number)),
            Value::Text(text) => ExprNode::Atom(Atom::String(text)),
            Value::Closure { params, body } => ExprNode::Lambda { params, body },
        }
    }
}

/// The textual form of a value, as used by `print` and `loop`.
impl Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Number(number) => {
                return write!(f, "{}", number);
            }
            Value::Text(text) => {
                return write!(f, "{}", text);
            }
            Value::Closure { params, body } => {
                let lambda_node = ExprNode::Lambda {
                    params: params.clone(),
                    body: body.clone(),
                };
                return write!(f, "{}", generate(&lambda_node));
            }
        }
    }
}

/// Number of arguments a procedure accepts.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Arity {
    Exactly(usize),
    AtLeast(usize),
    Any,
}

impl Arity {
    fn accepts(&self, arg_count: usize) -> bool {
        match self {
            Arity::Exactly(expected) => arg_count == *expected,
            Arity::AtLeast(minimum) => arg_count >= *minimum,
            Arity::Any => true,
        }
    }
}

impl Display for Arity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Arity::Exactly(expected) => write!(f, "{}", expected),
            Arity::AtLeast(minimum) => write!(f, "at least {}", minimum),
            Arity::Any => write!(f, "any number of"),
        }
    }
}

/// Represents an evaluation error.
#[derive(Debug, PartialEq, Eq)]
pub enum EvalError {
    UnknownOperator {
        name: String,
    },
    ArityMismatch {
        operator: String,
        expected: Arity,
        got: usize,
    },
    TypeMismatch {
        operator: String,
    },
    DivisionByZero {
        operator: String,
    },
    RecursionLimitExceeded {
        limit: usize,
    },
}

/// Display trait implementation for EvalError.
impl Display for EvalError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownOperator { name } => {
                return write!(f, "Unknown operator {:?}.", name);
            }

            Self::ArityMismatch {
                operator,
                expected,
                got,
            } => {
                return write!(
                    f,
                    "Operator {:?} expected {} arguments but got {}.",
                    operator, expected, got
                );
            }

            Self::TypeMismatch { operator } => {
                return write!(
                    f,
                    "Operator {:?} was applied to a value of the wrong type.",
                    operator
                );
            }

            Self::DivisionByZero { operator } => {
                return write!(f, "Operator {:?} divided by zero.", operator);
            }

            Self::RecursionLimitExceeded { limit } => {
                return write!(f, "Evaluation depth limit exceeded (max: {}).", limit);
            }
        }
    }
}

impl std::error::Error for EvalError {}

// How a builtin is applied.
#[derive(Clone, Copy)]
enum OpKind {
    // Receives its arguments already evaluated.
    Function(fn(&[Value]) -> Result<Value, EvalError>),
    // Receives its argument expressions unevaluated, plus the current depth.
    SpecialForm(fn(&[ExprNode], usize) -> Result<Value, EvalError>),
}

// Definition of a builtin procedure.
struct BuiltinOp {
    name: &'static str,
    arity: Arity,
    op_kind: OpKind,
}

impl BuiltinOp {
    fn check_arity(&self, arg_count: usize) -> Result<(), EvalError> {
        if self.arity.accepts(arg_count) {
            return Ok(());
        }

        return Err(EvalError::ArityMismatch {
            operator: String::from(self.name),
            expected: self.arity,
            got: arg_count,
        });
    }
}

// Registry of builtin procedures, indexed by name.
lazy_static! {
    static ref builtin_ops: HashMap<&'static str, BuiltinOp> = vec![
        BuiltinOp {
            name: "+",
            arity: Arity::AtLeast(1),
            op_kind: OpKind::Function(builtin_add),
        },
        BuiltinOp {
            name: "-",
            arity: Arity::AtLeast(1),
            op_kind: OpKind::Function(builtin_sub),
        },
        BuiltinOp {
            name: "*",
            arity: Arity::AtLeast(1),
            op_kind: OpKind::Function(builtin_mul),
        },
        BuiltinOp {
            name: "/",
            arity: Arity::AtLeast(1),
            op_kind: OpKind::Function(builtin_div),
        },
        BuiltinOp {
            name: "%",
            arity: Arity::AtLeast(1),
            op_kind: OpKind::Function(builtin_rem),
        },
        BuiltinOp {
            name: "abs",
            arity: Arity::Exactly(1),
            op_kind: OpKind::Function(builtin_abs),
        },
        BuiltinOp {
            name: "expt",
            arity: Arity::AtLeast(2),
            op_kind: OpKind::Function(builtin_expt),
        },
        BuiltinOp {
            name: "print",
            arity: Arity::Any,
            op_kind: OpKind::Function(builtin_print),
        },
        BuiltinOp {
            name: "loop",
            arity: Arity::Exactly(2),
            op_kind: OpKind::SpecialForm(special_form_loop),
        },
    ]
    .into_iter()
    .map(|builtin_op| (builtin_op.name, builtin_op))
    .collect();
}

fn expect_number(operator: &str, value: &Value) -> Result<Number, EvalError> {
    match value {
        Value::Number(number) => Ok(*number),
        _ => Err(EvalError::TypeMismatch {
            operator: String::from(operator),
        }),
    }
}

// Left fold over numeric arguments, seeded with the first one. `step`
// returns None on division by zero.
fn fold_numbers(
    operator: &str,
    args: &[Value],
    step: fn(Number, Number) -> Option<Number>,
) -> Result<Value, EvalError> {
    let Some((first, rest)) = args.split_first() else {
        return Err(EvalError::ArityMismatch {
            operator: String::from(operator),
            expected: Arity::AtLeast(1),
            got: 0,
        });
    };

    let mut accumulator = expect_number(operator, first)?;

    for arg in rest {
        let number = expect_number(operator, arg)?;
        accumulator = step(accumulator, number).ok_or_else(|| EvalError::DivisionByZero {
            operator: String::from(operator),
        })?;
    }

    Ok(Value::Number(accumulator))
}

fn builtin_add(args: &[Value]) -> Result<Value, EvalError> {
    fold_numbers("+", args, |lhs, rhs| Some(lhs.add(rhs)))
}

fn builtin_sub(args: &[Value]) -> Result<Value, EvalError> {
    fold_numbers("-", args, |lhs, rhs| Some(lhs.sub(rhs)))
}

fn builtin_mul(args: &[Value]) -> Result<Value, EvalError> {
    fold_numbers("*", args, |lhs, rhs| Some(lhs.mul(rhs)))
}

fn builtin_div(args: &[Value]) -> Result<Value, EvalError> {
    fold_numbers("/", args, Number::checked_div)
}

fn builtin_rem(args: &[Value]) -> Result<Value, EvalError> {
    fold_numbers("%", args, Number::checked_rem)
}

fn builtin_expt(args: &[Value]) -> Result<Value, EvalError> {
    fold_numbers("expt", args, |base, exponent| Some(base.pow(exponent)))
}

fn builtin_abs(args: &[Value]) -> Result<Value, EvalError> {
    let number = match args {
        [value] => expect_number("abs", value)?,
        _ => {
            return Err(EvalError::ArityMismatch {
                operator: String::from("abs"),
                expected: Arity::Exactly(1),
                got: args.len(),
            })
        }
    };

    Ok(Value::Number(number.abs()))
}

// Joins the textual forms of the arguments with commas.
fn builtin_print(args: &[Value]) -> Result<Value, EvalError> {
    let parts: Vec<String> = args.iter().map(|arg| arg.to_string()).collect();
    Ok(Value::Text(parts.join(",")))
}

// `(loop times body)`: evaluates body `times` times and concatenates the
// textual form of every result. Numeric results are not summed.
fn special_form_loop(args: &[ExprNode], depth: usize) -> Result<Value, EvalError> {
    let [times_expr, body_expr] = args else {
        return Err(EvalError::ArityMismatch {
            operator: String::from("loop"),
            expected: Arity::Exactly(2),
            got: args.len(),
        });
    };

    let times = match eval_expr(times_expr, depth + 1)? {
        Value::Number(number) => number.as_count(),
        _ => None,
    }
    .ok_or_else(|| EvalError::TypeMismatch {
        operator: String::from("loop"),
    })?;

    trace!("loop: evaluating {} {} times", body_expr, times);

    let mut out = String::new();

    for _ in 0..times {
        let body_value = eval_expr(body_expr, depth + 1)?;
        out.push_str(body_value.to_string().as_str());
    }

    Ok(Value::Text(out))
}

fn eval_args(args: &[ExprNode], depth: usize) -> Result<Vec<Value>, EvalError> {
    args.iter().map(|arg| eval_expr(arg, depth + 1)).collect()
}

// Applies a closure by substituting the arguments into a copy of its body.
fn apply_closure(
    params: Vec<String>,
    body: ExprNode,
    args: Vec<Value>,
    depth: usize,
) -> Result<Value, EvalError> {
    if params.len() != args.len() {
        return Err(EvalError::ArityMismatch {
            operator: String::from("lambda"),
            expected: Arity::Exactly(params.len()),
            got: args.len(),
        });
    }

    let bindings: HashMap<&str, ExprNode> = params
        .iter()
        .map(|param| param.as_str())
        .zip(args.into_iter().map(Value::into_expr_node))
        .collect();

    let mut fresh_body = body;
    substitute_symbols(&mut fresh_body, &bindings);

    trace!("Applying lambda ({}), substituted body: {}", params.join(" "), fresh_body);

    eval_expr(&fresh_body, depth + 1)
}

// Evaluates a call form. Symbol operators are looked up in the builtin
// registry, as is text naming a builtin that was passed in as an argument;
// any other operator must evaluate to a closure.
fn eval_procedure(func: &ExprNode, args: &[ExprNode], depth: usize) -> Result<Value, EvalError> {
    let builtin_name = match func {
        ExprNode::Atom(Atom::Symbol(operator_name)) => Some(operator_name),
        ExprNode::Atom(Atom::String(text)) if builtin_ops.contains_key(text.as_str()) => Some(text),
        _ => None,
    };

    if let Some(operator_name) = builtin_name {
        let Some(builtin_op) = builtin_ops.get(operator_name.as_str()) else {
            eval_args(args, depth)?;
            return Err(EvalError::UnknownOperator {
                name: operator_name.clone(),
            });
        };

        match builtin_op.op_kind {
            OpKind::SpecialForm(special_form) => {
                builtin_op.check_arity(args.len())?;
                return special_form(args, depth);
            }
            OpKind::Function(function) => {
                let evaluated_args = eval_args(args, depth)?;
                builtin_op.check_arity(evaluated_args.len())?;
                return function(&evaluated_args);
            }
        }
    }

    let evaluated_args = eval_args(args, depth)?;
    let callee = eval_expr(func, depth + 1)?;

    match callee {
        Value::Closure { params, body } => apply_closure(params, *body, evaluated_args, depth),
        Value::Text(text) => Err(EvalError::TypeMismatch { operator: text }),
        Value::Number(_) => Err(EvalError::TypeMismatch {
            operator: generate(func),
        }),
    }
}

fn eval_expr(expr_node: &ExprNode, depth: usize) -> Result<Value, EvalError> {
    if depth >= MAX_EVAL_DEPTH {
        return Err(EvalError::RecursionLimitExceeded {
            limit: MAX_EVAL_DEPTH,
        });
    }

    match expr_node {
        ExprNode::Atom(Atom::Integer(number)) => Ok(Value::Number(*number)),
        ExprNode::Atom(Atom::String(text)) => Ok(Value::Text(text.clone())),
        ExprNode::Atom(Atom::Symbol(symbol_name)) => Ok(Value::Text(symbol_name.clone())),
        ExprNode::Quote { literal_text } => Ok(Value::Text(literal_text.clone())),
        ExprNode::Lambda { params, body } => Ok(Value::Closure {
            params: params.clone(),
            body: body.clone(),
        }),
        ExprNode::Procedure { func, args } => eval_procedure(func, args, depth),
    }
}

/// Evaluates an expression tree. The tree is not modified, so the same tree
/// can be evaluated any number of times.
pub fn evaluate(expr_tree: &ExprNode) -> Result<Value, EvalError> {
    let result = eval_expr(expr_tree, 0)?;
    debug!("Evaluated {} to {:?}", expr_tree, result);
    Ok(result)
}
