//! Lexical analysis: turns Lisp source text into a vector of tokens.

use std::fmt::Display;

use lazy_static::lazy_static;
use log::{debug, trace};
use regex::{Captures, Regex};

use crate::numeric::Number;

/// The different classes of tokens that compose the language.
#[derive(PartialEq, Eq, Debug, Clone, Copy)]
pub enum TokenClass {
    OpenParen,
    CloseParen,
    Integer,
    String,
    Symbol,
}

/// The value carried by a token. Integer-class tokens are parsed into
/// numbers; every other class keeps its text (strings without the quotes).
#[derive(PartialEq, Debug, Clone)]
pub enum TokenValue {
    Text(String),
    Number(Number),
}

/// Represents a single token of the language.
#[derive(PartialEq, Debug, Clone)]
pub struct Token {
    pub token_class: TokenClass,
    pub token_value: TokenValue,
    /// Byte offset of the first character of the token in the source.
    pub position: usize,
}

impl Token {
    /// Returns the textual form of the token's value.
    pub fn value_text(&self) -> String {
        match &self.token_value {
            TokenValue::Text(text) => {
                return text.clone();
            }
            TokenValue::Number(number) => {
                return number.to_string();
            }
        }
    }
}

/// Represents a lexing error.
#[derive(Debug, PartialEq, Eq)]
pub enum LexError {
    UnrecognizedCharacter { position: usize, character: char },
}

/// Display trait implementation for LexError.
impl Display for LexError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnrecognizedCharacter {
                position,
                character,
            } => {
                return write!(
                    f,
                    "Unrecognized character {:?} at position {}.",
                    character, position
                );
            }
        }
    }
}

impl std::error::Error for LexError {}

// Represents how to recognize a token class.
#[derive(Debug)]
struct TokenRule {
    token_class: TokenClass,
    regex: Regex,
}

// Token rules in priority order. Every regex is anchored at the start of the
// remaining input; the first capture group, when present, is the token's
// value.
lazy_static! {
    static ref token_rules: Vec<TokenRule> = vec![
        TokenRule {
            token_class: TokenClass::OpenParen,
            regex: Regex::new(r"^\(").expect("Unable to compile OpenParen rule regex."),
        },
        TokenRule {
            token_class: TokenClass::CloseParen,
            regex: Regex::new(r"^\)").expect("Unable to compile CloseParen rule regex."),
        },
        TokenRule {
            token_class: TokenClass::Integer,
            regex: Regex::new(r"^-?[0-9]+(?:\.[0-9]+)?")
                .expect("Unable to compile Integer rule regex."),
        },
        TokenRule {
            token_class: TokenClass::String,
            regex: Regex::new(r#"^"([^"]*)""#).expect("Unable to compile String rule regex."),
        },
        TokenRule {
            token_class: TokenClass::Symbol,
            regex: Regex::new(r"^[a-zA-Z0-9+=!^%*/-]+")
                .expect("Unable to compile Symbol rule regex."),
        },
    ];
}

// Finds the first rule, in priority order, that matches a non-empty prefix of
// the input string.
fn get_first_matching_rule(input_str: &str) -> Option<(&'static TokenRule, Captures<'_>)> {
    for token_rule in token_rules.iter() {
        match token_rule
            .regex
            .captures(input_str)
            .filter(|captures| captures.get(0).map_or(0, |match_obj| match_obj.len()) > 0)
        {
            None => continue,
            Some(captures) => {
                return Some((token_rule, captures));
            }
        }
    }

    None
}

// Builds a token of the given class from the matched value text.
fn make_token(token_class: TokenClass, value_text: &str, position: usize) -> Token {
    let token_value = match token_class {
        TokenClass::Integer => match Number::from_literal(value_text) {
            Some(number) => TokenValue::Number(number),
            None => TokenValue::Text(String::from(value_text)),
        },
        _ => TokenValue::Text(String::from(value_text)),
    };

    Token {
        token_class,
        token_value,
        position,
    }
}

/// Given a string of Lisp source, returns the vector of tokens that compose
/// it. Runs of ASCII spaces between tokens are skipped; any other character
/// that starts no token (tabs and newlines included) is an error.
pub fn run_lexical_analysis(program_str: &str) -> Result<Vec<Token>, LexError> {
    let mut curr_idx: usize = 0;
    let mut out = Vec::new();

    while curr_idx < program_str.len() {
        let remaining_str = &program_str[curr_idx..];

        if remaining_str.starts_with(' ') {
            curr_idx += 1;
            continue;
        }

        let Some((token_rule, captures)) = get_first_matching_rule(remaining_str) else {
            return Err(LexError::UnrecognizedCharacter {
                position: curr_idx,
                character: remaining_str.chars().next().unwrap_or_default(),
            });
        };

        let match_len = captures.get(0).map_or(0, |match_obj| match_obj.len());
        let value_text = captures
            .get(1)
            .or_else(|| captures.get(0))
            .map_or("", |match_obj| match_obj.as_str());

        trace!(
            "Matched {:?} token {:?} at position {}",
            token_rule.token_class,
            value_text,
            curr_idx
        );

        out.push(make_token(token_rule.token_class, value_text, curr_idx));
        curr_idx += match_len;
    }

    debug!("Lexical analysis produced {} tokens", out.len());

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    // Gets the rule for a specific token class.
    fn get_rule_for_token_class(token_class: TokenClass) -> Option<&'static TokenRule> {
        token_rules
            .iter()
            .find(|token_rule| token_rule.token_class == token_class)
    }

    // Shorthand for building the expected tokens in tests.
    fn text_token(token_class: TokenClass, text: &str, position: usize) -> Token {
        Token {
            token_class,
            token_value: TokenValue::Text(String::from(text)),
            position,
        }
    }

    // Test if get_rule_for_token_class returns the right rule.
    #[test]
    fn test_get_rule_for_token_class() {
        token_rules.iter().for_each(|token_rule| {
            let retrieved_rule = get_rule_for_token_class(token_rule.token_class)
                .expect("Unable to get rule for token class.");

            assert!(std::ptr::eq(retrieved_rule, token_rule));
        });
    }

    // Test if get_first_matching_rule respects the rule priority order.
    #[test]
    fn test_first_matching_rule() {
        // Test cases formatted as (input_str, expected_token_class, expected_match_len).
        let string_and_class_vec = vec![
            ("(+ 1 2)", TokenClass::OpenParen, 1),
            ("12abc", TokenClass::Integer, 2),
            ("-5 3", TokenClass::Integer, 2),
            ("- 5 3", TokenClass::Symbol, 1),
            ("2.75)", TokenClass::Integer, 4),
            (r#""hi there" x"#, TokenClass::String, 10),
            ("expt 2", TokenClass::Symbol, 4),
        ];

        string_and_class_vec
            .iter()
            .for_each(|&(input_str, expected_class, expected_len)| {
                let (retrieved_rule, captures) = get_first_matching_rule(input_str)
                    .expect("Expected a rule to match.");
                assert_eq!(retrieved_rule.token_class, expected_class);
                assert_eq!(
                    captures.get(0).expect("Expected a whole match.").len(),
                    expected_len
                );
            });
    }

    // Test if run_lexical_analysis returns the desired token stream.
    #[test]
    fn test_run_lexical_analysis_simple() {
        let produced_tokens =
            run_lexical_analysis("(+ 12 18)").expect("Unable to lex program string.");

        let expected_tokens = vec![
            text_token(TokenClass::OpenParen, "(", 0),
            text_token(TokenClass::Symbol, "+", 1),
            Token {
                token_class: TokenClass::Integer,
                token_value: TokenValue::Number(Number::Integer(12)),
                position: 3,
            },
            Token {
                token_class: TokenClass::Integer,
                token_value: TokenValue::Number(Number::Integer(18)),
                position: 6,
            },
            text_token(TokenClass::CloseParen, ")", 8),
        ];

        assert_eq!(produced_tokens, expected_tokens);
    }

    // Test that string tokens drop their quotes and keep inner spaces.
    #[test]
    fn test_string_token_value() {
        let produced_tokens = run_lexical_analysis(r#"(print "a b")"#)
            .expect("Unable to lex program string.");

        assert_eq!(produced_tokens.len(), 4);
        assert_eq!(produced_tokens[2], text_token(TokenClass::String, "a b", 7));
    }

    // Test that runs of spaces are skipped wherever they occur.
    #[test]
    fn test_repeated_spaces() {
        let produced_tokens =
            run_lexical_analysis("   ( abs   -3 )  ").expect("Unable to lex program string.");

        let produced_classes: Vec<TokenClass> = produced_tokens
            .iter()
            .map(|token| token.token_class)
            .collect();

        assert_eq!(
            produced_classes,
            vec![
                TokenClass::OpenParen,
                TokenClass::Symbol,
                TokenClass::Integer,
                TokenClass::CloseParen
            ]
        );
    }

    // Test that a tab is not treated as whitespace.
    #[test]
    fn test_tab_is_unrecognized() {
        assert_eq!(
            run_lexical_analysis("(+\t1 2)"),
            Err(LexError::UnrecognizedCharacter {
                position: 2,
                character: '\t'
            })
        );
    }

    // Test that an unterminated string fails at its opening quote.
    #[test]
    fn test_unterminated_string() {
        assert_eq!(
            run_lexical_analysis(r#"(print "oops)"#),
            Err(LexError::UnrecognizedCharacter {
                position: 7,
                character: '"'
            })
        );
    }
}
