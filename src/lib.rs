//! This crate contains a small Lisp front end: a lexer, a recursive descent
//! parser, a generator that turns the expression tree back into source text,
//! and a tree-walking evaluator over a fixed set of builtin procedures.
//!
//! Each stage is usable on its own:
//!
//! ```
//! let tokens = lisp_front_end::tokenize("(+ 12 18)").expect("Unable to lex.");
//! let tree = lisp_front_end::parse(tokens).expect("Unable to parse.");
//! assert_eq!(lisp_front_end::generate(&tree), "(+ 12 18)");
//! assert_eq!(
//!     lisp_front_end::evaluate(&tree).expect("Unable to evaluate.").to_string(),
//!     "30"
//! );
//! ```

pub mod end_to_end;
pub mod expression_tree;
pub mod lexical_analysis;
pub mod numeric;
pub mod program_execution;
pub mod recursive_descent_parsing;
pub mod source_generation;

pub use end_to_end::RunError;
pub use expression_tree::{Atom, ExprNode};
pub use lexical_analysis::{run_lexical_analysis as tokenize, LexError, Token, TokenClass};
pub use numeric::Number;
pub use program_execution::{evaluate, EvalError, Value};
pub use recursive_descent_parsing::{parse_recursive_descent as parse, ParseError};
pub use source_generation::generate;

/// Lexes, parses and evaluates a source string in one call.
pub fn evaluate_source(source: &str) -> Result<Value, RunError> {
    let tokens = tokenize(source)?;
    let expr_tree = parse(tokens)?;
    return Ok(evaluate(&expr_tree)?);
}
