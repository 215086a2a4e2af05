//! Tree-builder stage: folds the flat token stream into nested clauses.
//!
//! `(` opens a compound clause, `)` closes it, `,` starts a sibling clause
//! at the current nesting level. A reduction pass collapses groups that
//! merely wrap a single inner group, so doubled parentheses read the same
//! as single ones.

use crate::error::{Result, SchemaError};

use super::tokenizer::Token;

/// One node of a clause: a bare token or a parenthesized group of sibling
/// clauses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    /// A single token.
    Word(Token),
    /// A parenthesized, comma-separated clause list.
    Group(Vec<Clause>),
}

/// A comma-delimited run of nodes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Clause {
    /// Nodes in source order.
    pub nodes: Vec<Node>,
}

impl Clause {
    /// The clause's first node as a token, when it is one.
    #[must_use]
    pub fn leading_word(&self) -> Option<&Token> {
        match self.nodes.first() {
            Some(Node::Word(token)) => Some(token),
            _ => None,
        }
    }

    /// The token at the given node position, when it is one.
    #[must_use]
    pub fn word_at(&self, index: usize) -> Option<&Token> {
        match self.nodes.get(index) {
            Some(Node::Word(token)) => Some(token),
            _ => None,
        }
    }

    /// The group at the given node position, when it is one.
    #[must_use]
    pub fn group_at(&self, index: usize) -> Option<&[Clause]> {
        match self.nodes.get(index) {
            Some(Node::Group(clauses)) => Some(clauses),
            _ => None,
        }
    }

    /// Renders the clause back to SQL text, reversing keyword gluing by
    /// construction (glued tokens already carry their space).
    #[must_use]
    pub fn render(&self) -> String {
        self.render_range(0)
    }

    /// Renders the clause from the given node onward.
    #[must_use]
    pub fn render_range(&self, from: usize) -> String {
        self.nodes[from.min(self.nodes.len())..]
            .iter()
            .map(Node::render)
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn reduce(mut self) -> Self {
        self.nodes = self.nodes.into_iter().map(Node::reduce).collect();
        self
    }
}

impl Node {
    /// Renders the node back to SQL text.
    #[must_use]
    pub fn render(&self) -> String {
        match self {
            Node::Word(token) if token.quoted => format!("\"{}\"", token.text),
            Node::Word(token) => token.text.clone(),
            Node::Group(clauses) => {
                let inner = clauses
                    .iter()
                    .map(Clause::render)
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("({inner})")
            }
        }
    }

    fn reduce(self) -> Self {
        match self {
            Node::Group(clauses) => {
                let clauses: Vec<Clause> = clauses.into_iter().map(Clause::reduce).collect();
                // A group holding exactly one clause that is itself just a
                // group is a redundant wrapper.
                if clauses.len() == 1 && clauses[0].nodes.len() == 1 {
                    if let Node::Group(inner) = &clauses[0].nodes[0] {
                        return Node::Group(inner.clone());
                    }
                }
                Node::Group(clauses)
            }
            word => word,
        }
    }
}

/// Appends a node to the innermost open clause.
fn push_node(stack: &mut [Vec<Clause>], node: Node) {
    if let Some(current) = stack.last_mut() {
        if current.is_empty() {
            current.push(Clause::default());
        }
        if let Some(clause) = current.last_mut() {
            clause.nodes.push(node);
        }
    }
}

/// Builds the clause list for a token stream.
pub fn build_clauses(tokens: &[Token], sql: &str) -> Result<Vec<Clause>> {
    // Each stack level is a sibling clause list; the innermost open group is
    // on top.
    let mut stack: Vec<Vec<Clause>> = vec![vec![Clause::default()]];

    for token in tokens {
        match token.text.as_str() {
            "(" if !token.quoted => stack.push(vec![Clause::default()]),
            ")" if !token.quoted => {
                let mut closed = stack
                    .pop()
                    .filter(|_| !stack.is_empty())
                    .ok_or_else(|| SchemaError::parse(sql, "unbalanced ')'"))?;
                // `(a, b,)` style trailing commas leave an empty clause.
                if closed.last().is_some_and(|c| c.nodes.is_empty()) && closed.len() > 1 {
                    closed.pop();
                }
                push_node(&mut stack, Node::Group(closed));
            }
            "," if !token.quoted => {
                if let Some(current) = stack.last_mut() {
                    current.push(Clause::default());
                }
            }
            _ => push_node(&mut stack, Node::Word(token.clone())),
        }
    }

    if stack.len() != 1 {
        return Err(SchemaError::parse(sql, "unbalanced '('"));
    }
    let clauses = stack.pop().unwrap_or_default();
    Ok(clauses.into_iter().map(Clause::reduce).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::tokenizer::tokenize;

    fn parse(sql: &str) -> Vec<Clause> {
        build_clauses(&tokenize(sql).unwrap(), sql).unwrap()
    }

    #[test]
    fn test_nested_groups() {
        let clauses = parse("CREATE TABLE t (a integer, b text)");
        assert_eq!(clauses.len(), 1);
        let body = clauses[0].group_at(3).unwrap();
        assert_eq!(body.len(), 2);
        assert_eq!(body[0].leading_word().unwrap().text, "a");
        assert_eq!(body[1].leading_word().unwrap().text, "b");
    }

    #[test]
    fn test_commas_split_siblings_per_level() {
        let clauses = parse("f(a, g(b, c)), d");
        assert_eq!(clauses.len(), 2);
        let args = clauses[0].group_at(1).unwrap();
        assert_eq!(args.len(), 2);
        let inner = args[1].group_at(1).unwrap();
        assert_eq!(inner.len(), 2);
    }

    #[test]
    fn test_redundant_wrapper_collapses() {
        let single = parse("CHECK (price > 0)");
        let doubled = parse("CHECK ((price > 0))");
        assert_eq!(single, doubled);
    }

    #[test]
    fn test_render_round_trips() {
        let clauses = parse("CHECK (price > 0 AND qty <= 10)");
        assert_eq!(clauses[0].render(), "CHECK (price > 0 AND qty <= 10)");
    }

    #[test]
    fn test_render_requotes_identifiers() {
        let clauses = parse("\"my col\" integer");
        assert_eq!(clauses[0].render(), "\"my col\" integer");
    }

    #[test]
    fn test_unbalanced_parens_error() {
        let tokens = tokenize("CREATE TABLE t (a integer").unwrap();
        assert!(build_clauses(&tokens, "").is_err());
        let tokens = tokenize("a integer)").unwrap();
        assert!(build_clauses(&tokens, "").is_err());
    }
}
