//! Code to configure the front end and run it on a source string up to a
//! chosen stage.

use clap::{Parser, ValueEnum};
use log::info;

use crate::lexical_analysis::{run_lexical_analysis, LexError, Token};
use crate::program_execution::{evaluate, EvalError};
use crate::recursive_descent_parsing::{parse_recursive_descent, ParseError};
use crate::source_generation::generate;

/// The stage whose output is reported.
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stage {
    /// The token sequence, one token per line.
    Tokens,
    /// The debug form of the expression tree.
    Tree,
    /// Source text regenerated from the expression tree.
    Generate,
    /// The value the expression evaluates to.
    Evaluate,
}

/// Config for the front end. Instantiate via `InterpreterConfig::parse()`.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct InterpreterConfig {
    /// The Lisp source text to run on.
    #[arg(short, long)]
    pub source: String,

    /// Which stage's output to print.
    #[arg(long, value_enum, default_value_t = Stage::Evaluate)]
    pub stage: Stage,

    /// Log each stage at debug level.
    #[arg(short, long)]
    pub verbose: bool,
}

/// Errors that may be thrown when running the front end.
#[derive(Debug, PartialEq, Eq)]
pub enum RunError {
    Lex(LexError),
    Parse(ParseError),
    Eval(EvalError),
}

/// Display trait implementation for RunError.
impl std::fmt::Display for RunError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Lex(lex_error) => {
                return write!(f, "Lex error: {}", lex_error);
            }

            Self::Parse(parse_error) => {
                return write!(f, "Parse error: {}", parse_error);
            }

            Self::Eval(eval_error) => {
                return write!(f, "Evaluation error: {}", eval_error);
            }
        }
    }
}

impl std::error::Error for RunError {}

/// Type conversions for errors.
impl From<LexError> for RunError {
    fn from(value: LexError) -> Self {
        return Self::Lex(value);
    }
}

impl From<ParseError> for RunError {
    fn from(value: ParseError) -> Self {
        return Self::Parse(value);
    }
}

impl From<EvalError> for RunError {
    fn from(value: EvalError) -> Self {
        return Self::Eval(value);
    }
}

// Converts a token sequence to one `Class(value)` line per token.
fn tokens_to_string(tokens: &[Token]) -> String {
    let lines: Vec<String> = tokens
        .iter()
        .map(|token| format!("{:?}({})", token.token_class, token.value_text()))
        .collect();

    return lines.join("\n");
}

/// Run the front end on `source` and report the output of `stage`.
pub fn run_stage(source: &str, stage: Stage) -> Result<String, RunError> {
    let tokens = run_lexical_analysis(source)?;

    if stage == Stage::Tokens {
        return Ok(tokens_to_string(&tokens));
    }

    let expr_tree = parse_recursive_descent(tokens)?;

    match stage {
        Stage::Tokens | Stage::Tree => {
            return Ok(format!("{:?}", expr_tree));
        }
        Stage::Generate => {
            return Ok(generate(&expr_tree));
        }
        Stage::Evaluate => {
            return Ok(evaluate(&expr_tree)?.to_string());
        }
    }
}

/// Run the front end given an interpreter config.
pub fn run_interpreter(config: &InterpreterConfig) -> Result<String, RunError> {
    info!("Running stage {:?} on {:?}", config.stage, config.source);
    return run_stage(config.source.as_str(), config.stage);
}
