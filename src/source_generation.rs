//! Serializes an expression tree back into Lisp source text.

use crate::expression_tree::{Atom, ExprNode};

// Helper function to append the source text of an ExprNode.
fn generate_helper(expr_node: &ExprNode, string_so_far: &mut String) {
    match expr_node {
        ExprNode::Atom(Atom::Integer(number)) => {
            string_so_far.push_str(number.to_string().as_str());
        }
        ExprNode::Atom(Atom::String(text)) => {
            string_so_far.push('"');
            string_so_far.push_str(text.as_str());
            string_so_far.push('"');
        }
        ExprNode::Atom(Atom::Symbol(symbol_name)) => {
            string_so_far.push_str(symbol_name.as_str());
        }
        ExprNode::Procedure { func, args } => {
            string_so_far.push('(');
            generate_helper(func, string_so_far);

            for arg in args {
                string_so_far.push(' ');
                generate_helper(arg, string_so_far);
            }

            string_so_far.push(')');
        }
        ExprNode::Lambda { params, body } => {
            string_so_far.push_str(format!("(lambda ({}) ", params.join(" ")).as_str());
            generate_helper(body, string_so_far);
            string_so_far.push(')');
        }
        ExprNode::Quote { literal_text } => {
            string_so_far.push_str(format!("(quote {})", literal_text).as_str());
        }
    };
}

/// Converts an expression tree to Lisp source text. For input without
/// redundant whitespace this reproduces the text the tree was parsed from.
pub fn generate(expr_node: &ExprNode) -> String {
    let mut out_string = String::new();
    generate_helper(expr_node, &mut out_string);
    return out_string;
}

// Display trait implementation for ExprNode using the generate function.
impl std::fmt::Display for ExprNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        return write!(f, "{}", generate(self).as_str());
    }
}
