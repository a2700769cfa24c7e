//! Data structures to represent Lisp expressions, and the substitution used
//! to apply lambdas.
use std::collections::{HashMap, HashSet};

use crate::numeric::Number;

/// Represents a leaf expression.
#[derive(Debug, PartialEq, Clone)]
pub enum Atom {
    Integer(Number),
    String(String),
    Symbol(String),
}

/// Represents a Lisp expression.
#[derive(Debug, PartialEq, Clone)]
pub enum ExprNode {
    Atom(Atom),
    /// A call form `(func arg1 arg2 ...)`. The operator is either a symbol
    /// or a nested expression.
    Procedure {
        func: Box<ExprNode>,
        args: Vec<ExprNode>,
    },
    /// `(lambda (p1 p2 ...) body)`. Parameter names are unique.
    Lambda {
        params: Vec<String>,
        body: Box<ExprNode>,
    },
    /// `(quote ...)`, kept as normalized source text rather than a tree.
    Quote { literal_text: String },
}

impl ExprNode {
    pub fn symbol(name: &str) -> ExprNode {
        ExprNode::Atom(Atom::Symbol(String::from(name)))
    }

    pub fn integer(value: i64) -> ExprNode {
        ExprNode::Atom(Atom::Integer(Number::Integer(value)))
    }

    pub fn string(text: &str) -> ExprNode {
        ExprNode::Atom(Atom::String(String::from(text)))
    }
}

// Adds every symbol occurring in expr_node to the set, bound or not.
fn collect_all_symbols<'a>(expr_node: &'a ExprNode, symbols: &mut HashSet<&'a str>) {
    match expr_node {
        ExprNode::Atom(Atom::Symbol(symbol_name)) => {
            symbols.insert(symbol_name.as_str());
        }
        ExprNode::Atom(_) | ExprNode::Quote { .. } => {}
        ExprNode::Procedure { func, args } => {
            collect_all_symbols(func, symbols);
            args.iter().for_each(|arg| collect_all_symbols(arg, symbols));
        }
        ExprNode::Lambda { params, body } => {
            symbols.extend(params.iter().map(|param| param.as_str()));
            collect_all_symbols(body, symbols);
        }
    }
}

// Adds the symbols of expr_node that no enclosing lambda inside it binds.
fn collect_free_symbols<'a>(
    expr_node: &'a ExprNode,
    bound: &mut Vec<&'a str>,
    symbols: &mut HashSet<&'a str>,
) {
    match expr_node {
        ExprNode::Atom(Atom::Symbol(symbol_name)) => {
            if !bound.contains(&symbol_name.as_str()) {
                symbols.insert(symbol_name.as_str());
            }
        }
        ExprNode::Atom(_) | ExprNode::Quote { .. } => {}
        ExprNode::Procedure { func, args } => {
            collect_free_symbols(func, bound, symbols);
            args.iter().for_each(|arg| collect_free_symbols(arg, bound, symbols));
        }
        ExprNode::Lambda { params, body } => {
            let bound_len = bound.len();
            bound.extend(params.iter().map(|param| param.as_str()));
            collect_free_symbols(body, bound, symbols);
            bound.truncate(bound_len);
        }
    }
}

/// Returns the symbols that occur free in an expression.
pub fn free_symbols(expr_node: &ExprNode) -> HashSet<&str> {
    let mut symbols = HashSet::new();
    collect_free_symbols(expr_node, &mut Vec::new(), &mut symbols);
    return symbols;
}

/// Renames every free occurrence of `old_name` in `expr_node` to `new_name`.
pub fn rename_symbol(old_name: &str, new_name: &str, expr_node: &mut ExprNode) {
    match expr_node {
        ExprNode::Atom(Atom::Symbol(symbol_name)) => {
            if symbol_name.as_str() == old_name {
                *symbol_name = String::from(new_name);
            }
        }
        ExprNode::Atom(_) | ExprNode::Quote { .. } => {}
        ExprNode::Procedure { func, args } => {
            rename_symbol(old_name, new_name, func);
            args.iter_mut().for_each(|arg| rename_symbol(old_name, new_name, arg));
        }
        ExprNode::Lambda { params, body } => {
            if !params.iter().any(|param| param.as_str() == old_name) {
                rename_symbol(old_name, new_name, body);
            }
        }
    }
}

// Renames the lambda parameter `param_idx` to a name that occurs neither in
// the lambda nor in `names_to_avoid`.
fn rename_captured_param(
    params: &mut [String],
    param_idx: usize,
    body: &mut ExprNode,
    names_to_avoid: &HashSet<&str>,
) {
    let old_name = params[param_idx].clone();

    let fresh_name = {
        let mut lambda_symbols: HashSet<&str> = params.iter().map(|param| param.as_str()).collect();
        collect_all_symbols(body, &mut lambda_symbols);

        let mut suffix: usize = 1;
        let mut candidate = format!("{}-{}", old_name, suffix);

        while lambda_symbols.contains(candidate.as_str())
            || names_to_avoid.contains(candidate.as_str())
        {
            suffix += 1;
            candidate = format!("{}-{}", old_name, suffix);
        }

        candidate
    };

    rename_symbol(old_name.as_str(), fresh_name.as_str(), body);
    params[param_idx] = fresh_name;
}

/// Replaces every free occurrence of the symbols in `bindings` inside
/// `expr_body` with the bound expression. All bindings are substituted at
/// once, so a replacement is never itself rewritten by a later binding.
/// Quotes are left untouched and a nested lambda that rebinds a name hides
/// it from its body. A nested lambda whose parameter occurs free in a
/// replacement has that parameter renamed first.
pub fn substitute_symbols(expr_body: &mut ExprNode, bindings: &HashMap<&str, ExprNode>) {
    let replacement_free_symbols: HashSet<&str> = bindings
        .values()
        .flat_map(|replacement| free_symbols(replacement))
        .collect();

    substitute_symbols_helper(expr_body, bindings, &replacement_free_symbols);
}

fn substitute_symbols_helper(
    expr_body: &mut ExprNode,
    bindings: &HashMap<&str, ExprNode>,
    replacement_free_symbols: &HashSet<&str>,
) {
    if bindings.is_empty() {
        return;
    }

    match expr_body {
        // Substitute into symbol.
        ExprNode::Atom(Atom::Symbol(symbol_name)) => {
            if let Some(replacement) = bindings.get(symbol_name.as_str()) {
                *expr_body = replacement.clone();
            }
        }

        ExprNode::Atom(_) | ExprNode::Quote { .. } => {}

        // Substitute into the operator and every argument.
        ExprNode::Procedure { func, args } => {
            substitute_symbols_helper(&mut **func, bindings, replacement_free_symbols);

            for arg in args.iter_mut() {
                substitute_symbols_helper(arg, bindings, replacement_free_symbols);
            }
        }

        // Substitute into the body, minus the names this lambda shadows.
        ExprNode::Lambda { params, body } => {
            let visible_bindings: HashMap<&str, ExprNode> = bindings
                .iter()
                .filter(|(name, _)| !params.iter().any(|param| param.as_str() == **name))
                .map(|(name, replacement)| (*name, replacement.clone()))
                .collect();

            if visible_bindings.is_empty() {
                return;
            }

            // A parameter that is free in a replacement would capture it.
            if params
                .iter()
                .any(|param| replacement_free_symbols.contains(param.as_str()))
            {
                let names_to_avoid: HashSet<&str> = replacement_free_symbols
                    .iter()
                    .copied()
                    .chain(visible_bindings.keys().copied())
                    .collect();

                for param_idx in 0..params.len() {
                    if replacement_free_symbols.contains(params[param_idx].as_str()) {
                        rename_captured_param(params, param_idx, body, &names_to_avoid);
                    }
                }
            }

            substitute_symbols_helper(&mut **body, &visible_bindings, replacement_free_symbols);
        }
    };
}
