//! Recursive descent parser that builds a Lisp expression tree from a vector
//! of tokens.

use std::collections::VecDeque;
use std::fmt::Display;

use log::{debug, trace};

use crate::expression_tree::{Atom, ExprNode};
use crate::lexical_analysis::{Token, TokenClass, TokenValue};

/// Maximum nesting of parenthesized forms. Parsing recurses once per level,
/// so deeper input is rejected before it can exhaust the host stack.
pub const MAX_PARSE_DEPTH: usize = 256;

/// Represents a parsing error.
#[derive(Debug, PartialEq, Eq)]
pub enum ParseError {
    /// `found` is None when the input ended where a token was expected.
    UnexpectedToken {
        expected: TokenClass,
        found: Option<TokenClass>,
        token_idx: usize,
    },
    UnbalancedParentheses,
    DuplicateParameter {
        param_name: String,
        token_idx: usize,
    },
    NestingTooDeep {
        limit: usize,
    },
}

/// Display trait implementation for ParseError.
impl Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnexpectedToken {
                expected,
                found: Some(found),
                token_idx,
            } => {
                return write!(
                    f,
                    "Unexpected token at index {}. Expected: {:?}, found: {:?}.",
                    token_idx, expected, found
                );
            }

            Self::UnexpectedToken {
                expected,
                found: None,
                token_idx,
            } => {
                return write!(
                    f,
                    "Unexpected end of input at index {}. Expected: {:?}.",
                    token_idx, expected
                );
            }

            Self::UnbalancedParentheses => {
                return write!(f, "Unbalanced parentheses (missing closing paren).");
            }

            Self::DuplicateParameter {
                param_name,
                token_idx,
            } => {
                return write!(
                    f,
                    "Duplicate lambda parameter {:?} at index {}.",
                    param_name, token_idx
                );
            }

            Self::NestingTooDeep { limit } => {
                return write!(f, "Expression too deeply nested (max depth: {}).", limit);
            }
        }
    }
}

impl std::error::Error for ParseError {}

/// Parser state: the tokens not yet consumed, drained from the front.
pub struct Parser {
    tokens: VecDeque<Token>,
    consumed_count: usize,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Parser {
        Parser {
            tokens: VecDeque::from(tokens),
            consumed_count: 0,
        }
    }

    /// Parses one expression from the front of the token sequence. Tokens
    /// after a complete expression are left in place.
    pub fn parse(&mut self) -> Result<ExprNode, ParseError> {
        self.try_expr_rule(0)
    }

    /// The tokens that have not been consumed yet.
    pub fn remaining_tokens(&self) -> &VecDeque<Token> {
        &self.tokens
    }

    // Looks at the class of the token `offset` places ahead.
    fn peek_class(&self, offset: usize) -> Result<TokenClass, ParseError> {
        return self.peek_token(offset).map(|token| token.token_class);
    }

    fn peek_token(&self, offset: usize) -> Result<&Token, ParseError> {
        return self
            .tokens
            .get(offset)
            .ok_or(ParseError::UnbalancedParentheses);
    }

    // Removes the next token whatever its class.
    fn pop_token(&mut self) -> Result<Token, ParseError> {
        let token = self
            .tokens
            .pop_front()
            .ok_or(ParseError::UnbalancedParentheses)?;
        self.consumed_count += 1;
        return Ok(token);
    }

    // Removes the next token, which must be of the expected class.
    fn consume(&mut self, expected: TokenClass) -> Result<Token, ParseError> {
        let token_idx = self.consumed_count;
        let found = self.tokens.front().map(|token| token.token_class);

        match found {
            None if expected == TokenClass::CloseParen => {
                return Err(ParseError::UnbalancedParentheses);
            }
            None => {
                return Err(ParseError::UnexpectedToken {
                    expected,
                    found: None,
                    token_idx,
                });
            }
            Some(found_class) if found_class != expected => {
                return Err(ParseError::UnexpectedToken {
                    expected,
                    found: Some(found_class),
                    token_idx,
                });
            }
            Some(_) => {
                return self.pop_token();
            }
        }
    }

    // Checks whether the token `offset` places ahead is the given symbol.
    fn peek_is_symbol(&self, offset: usize, symbol_name: &str) -> Result<bool, ParseError> {
        let token = self.peek_token(offset)?;

        return Ok(token.token_class == TokenClass::Symbol
            && token.token_value == TokenValue::Text(String::from(symbol_name)));
    }

    /// Tries to parse according to the production `e -> list | atom`.
    /// `depth` counts the parenthesized forms enclosing this expression.
    fn try_expr_rule(&mut self, depth: usize) -> Result<ExprNode, ParseError> {
        if self.peek_class(0)? == TokenClass::OpenParen {
            return self.try_list_rule(depth);
        }

        return self.try_atom_rule();
    }

    /// Tries to parse a parenthesized form, dispatching on the symbol that
    /// follows the open paren.
    fn try_list_rule(&mut self, depth: usize) -> Result<ExprNode, ParseError> {
        if depth >= MAX_PARSE_DEPTH {
            return Err(ParseError::NestingTooDeep {
                limit: MAX_PARSE_DEPTH,
            });
        }

        if self.peek_is_symbol(1, "lambda")? {
            trace!("Parsing lambda form at index {}", self.consumed_count);
            return self.try_lambda_rule(depth);
        }

        if self.peek_is_symbol(1, "quote")? {
            trace!("Parsing quote form at index {}", self.consumed_count);
            return self.try_quote_rule();
        }

        return self.try_procedure_rule(depth);
    }

    /// Tries to parse an integer, string or symbol.
    fn try_atom_rule(&mut self) -> Result<ExprNode, ParseError> {
        let token = match self.peek_class(0)? {
            TokenClass::Integer | TokenClass::String => self.pop_token()?,
            _ => self.consume(TokenClass::Symbol)?,
        };

        let atom = match (token.token_class, token.token_value) {
            (TokenClass::Integer, TokenValue::Number(number)) => Atom::Integer(number),
            (TokenClass::String, TokenValue::Text(text)) => Atom::String(text),
            (_, TokenValue::Text(text)) => Atom::Symbol(text),
            (_, TokenValue::Number(number)) => Atom::Integer(number),
        };

        return Ok(ExprNode::Atom(atom));
    }

    /// Tries to parse an expression that looks like `(lambda (p1 p2 ...) e)`.
    fn try_lambda_rule(&mut self, depth: usize) -> Result<ExprNode, ParseError> {
        self.consume(TokenClass::OpenParen)?;
        self.consume(TokenClass::Symbol)?;
        self.consume(TokenClass::OpenParen)?;

        let mut params: Vec<String> = Vec::new();

        while self.peek_class(0)? != TokenClass::CloseParen {
            let token_idx = self.consumed_count;
            let param_name = self.consume(TokenClass::Symbol)?.value_text();

            if params.contains(&param_name) {
                return Err(ParseError::DuplicateParameter {
                    param_name,
                    token_idx,
                });
            }

            params.push(param_name);
        }

        self.consume(TokenClass::CloseParen)?;

        let body = self.try_expr_rule(depth + 1)?;

        self.consume(TokenClass::CloseParen)?;

        return Ok(ExprNode::Lambda {
            params,
            body: Box::new(body),
        });
    }

    /// Tries to parse an expression that looks like `(quote ...)`. The quoted
    /// tokens are kept as text: joined with single spaces, then the first
    /// `"( "` and the first `" )"` are tightened.
    fn try_quote_rule(&mut self) -> Result<ExprNode, ParseError> {
        self.consume(TokenClass::OpenParen)?;
        self.consume(TokenClass::Symbol)?;

        let mut quoted: Vec<String> = Vec::new();
        let mut depth: usize = 0;

        loop {
            match self.peek_class(0)? {
                TokenClass::CloseParen if depth == 0 => break,
                TokenClass::OpenParen => depth += 1,
                TokenClass::CloseParen => depth -= 1,
                _ => {}
            }

            quoted.push(self.pop_token()?.value_text());
        }

        self.consume(TokenClass::CloseParen)?;

        let literal_text = quoted
            .join(" ")
            .replacen("( ", "(", 1)
            .replacen(" )", ")", 1);

        return Ok(ExprNode::Quote { literal_text });
    }

    /// Tries to parse a call form `(op e1 e2 ...)` where `op` is a symbol or a
    /// nested parenthesized expression.
    fn try_procedure_rule(&mut self, depth: usize) -> Result<ExprNode, ParseError> {
        self.consume(TokenClass::OpenParen)?;

        let func = if self.peek_class(0)? == TokenClass::OpenParen {
            self.try_list_rule(depth + 1)?
        } else {
            ExprNode::Atom(Atom::Symbol(
                self.consume(TokenClass::Symbol)?.value_text(),
            ))
        };

        let mut args = Vec::new();

        while self.peek_class(0)? != TokenClass::CloseParen {
            args.push(self.try_expr_rule(depth + 1)?);
        }

        self.consume(TokenClass::CloseParen)?;

        return Ok(ExprNode::Procedure {
            func: Box::new(func),
            args,
        });
    }
}

/// Uses recursive descent to parse one expression from the given tokens
/// (see the `expression_tree` module). Tokens after the first complete
/// expression are ignored.
pub fn parse_recursive_descent(tokens: Vec<Token>) -> Result<ExprNode, ParseError> {
    let mut parser = Parser::new(tokens);
    let expr_tree = parser.parse()?;

    debug!(
        "Parsed expression tree with {} trailing tokens: {:?}",
        parser.remaining_tokens().len(),
        expr_tree
    );

    return Ok(expr_tree);
}

#[cfg(test)]
mod tests {
    use crate::lexical_analysis::run_lexical_analysis;

    use super::*;

    // Lexes and parses a program string.
    fn parse_str(program_str: &str) -> Result<ExprNode, ParseError> {
        let program_tokens =
            run_lexical_analysis(program_str).expect("Unable to lex program string.");
        return parse_recursive_descent(program_tokens);
    }

    // Test if we can parse a simple procedure call.
    #[test]
    fn test_simple_procedure() {
        let expected_output = ExprNode::Procedure {
            func: Box::new(ExprNode::symbol("+")),
            args: vec![ExprNode::integer(12), ExprNode::integer(18)],
        };

        let generated_output =
            parse_str("(+ 12 18)").expect("parse_recursive_descent returned unexpected parse error");

        assert_eq!(generated_output, expected_output);
    }

    // Test if we can parse a bare atom of each kind.
    #[test]
    fn test_atoms() {
        assert_eq!(parse_str("42"), Ok(ExprNode::integer(42)));
        assert_eq!(parse_str(r#""hello""#), Ok(ExprNode::string("hello")));
        assert_eq!(parse_str("abs"), Ok(ExprNode::symbol("abs")));
    }

    // Test if we can parse an immediately applied lambda.
    #[test]
    fn test_immediately_applied_lambda() {
        let expected_output = ExprNode::Procedure {
            func: Box::new(ExprNode::Lambda {
                params: vec![String::from("x"), String::from("y")],
                body: Box::new(ExprNode::Procedure {
                    func: Box::new(ExprNode::symbol("%")),
                    args: vec![ExprNode::symbol("x"), ExprNode::symbol("y")],
                }),
            }),
            args: vec![ExprNode::integer(5), ExprNode::integer(35)],
        };

        let generated_output = parse_str("((lambda (x y) (% x y)) 5 35)")
            .expect("parse_recursive_descent returned unexpected parse error");

        assert_eq!(generated_output, expected_output);
    }

    // Test if quoted tokens are collected whole, including nested lists.
    #[test]
    fn test_quote() {
        let expected_output = ExprNode::Procedure {
            func: Box::new(ExprNode::symbol("list")),
            args: vec![
                ExprNode::Quote {
                    literal_text: String::from("+"),
                },
                ExprNode::Quote {
                    literal_text: String::from("(1 2 3)"),
                },
            ],
        };

        let generated_output = parse_str("(list (quote +) (quote (1 2 3)))")
            .expect("parse_recursive_descent returned unexpected parse error");

        assert_eq!(generated_output, expected_output);
    }

    // Test that quote normalization runs once per pattern only.
    #[test]
    fn test_quote_single_normalization_pass() {
        assert_eq!(
            parse_str("(quote (a (b c)))"),
            Ok(ExprNode::Quote {
                literal_text: String::from("(a ( b c) )"),
            })
        );
    }

    // Test that a missing closing paren is reported as unbalanced.
    #[test]
    fn test_missing_close_paren() {
        assert_eq!(parse_str("(+ 1 2"), Err(ParseError::UnbalancedParentheses));
        assert_eq!(
            parse_str("(lambda (x) x"),
            Err(ParseError::UnbalancedParentheses)
        );
        assert_eq!(parse_str("(quote (a b)"), Err(ParseError::UnbalancedParentheses));
    }

    // Test that a non-symbol lambda parameter is rejected with its index.
    #[test]
    fn test_bad_lambda_parameter() {
        assert_eq!(
            parse_str("(lambda (x 1) x)"),
            Err(ParseError::UnexpectedToken {
                expected: TokenClass::Symbol,
                found: Some(TokenClass::Integer),
                token_idx: 4,
            })
        );
    }

    // Test that a repeated lambda parameter is rejected.
    #[test]
    fn test_duplicate_lambda_parameter() {
        assert_eq!(
            parse_str("(lambda (x x) x)"),
            Err(ParseError::DuplicateParameter {
                param_name: String::from("x"),
                token_idx: 4,
            })
        );
    }

    // Test that an operator must be a symbol or a parenthesized expression.
    #[test]
    fn test_integer_operator() {
        assert_eq!(
            parse_str("(1 2)"),
            Err(ParseError::UnexpectedToken {
                expected: TokenClass::Symbol,
                found: Some(TokenClass::Integer),
                token_idx: 1,
            })
        );
    }

    // Builds `levels` nested calls of the form `(+ 1 (+ 1 ... 1))`.
    fn nested_calls(levels: usize) -> String {
        return format!("{}1{}", "(+ 1 ".repeat(levels), ")".repeat(levels));
    }

    // Test that nesting is accepted up to the limit and rejected past it.
    #[test]
    fn test_nesting_limit() {
        assert!(parse_str(nested_calls(MAX_PARSE_DEPTH).as_str()).is_ok());
        assert_eq!(
            parse_str(nested_calls(MAX_PARSE_DEPTH + 1).as_str()),
            Err(ParseError::NestingTooDeep {
                limit: MAX_PARSE_DEPTH
            })
        );
    }

    // Test that lambda bodies and nested operators count towards the limit.
    #[test]
    fn test_nesting_limit_through_lambdas_and_operators() {
        let deep_lambda = format!(
            "{}x{}",
            "(lambda (x) ".repeat(MAX_PARSE_DEPTH + 1),
            ")".repeat(MAX_PARSE_DEPTH + 1)
        );
        let deep_operator = format!(
            "{}f{}",
            "(".repeat(MAX_PARSE_DEPTH + 1),
            ")".repeat(MAX_PARSE_DEPTH + 1)
        );

        for program_str in [deep_lambda, deep_operator] {
            assert_eq!(
                parse_str(program_str.as_str()),
                Err(ParseError::NestingTooDeep {
                    limit: MAX_PARSE_DEPTH
                })
            );
        }
    }

    // Test that tokens after a complete expression are left unconsumed.
    #[test]
    fn test_trailing_tokens() {
        let program_tokens =
            run_lexical_analysis("(+ 1 2) 3 4").expect("Unable to lex program string.");
        let mut parser = Parser::new(program_tokens);

        parser
            .parse()
            .expect("Parser::parse returned unexpected parse error");

        assert_eq!(parser.remaining_tokens().len(), 2);
    }
}
