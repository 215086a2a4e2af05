//! Tokenizer stage: comment stripping, quote-aware splitting, and
//! multi-word keyword gluing.

use crate::error::{Result, SchemaError};

/// Adjacent word pairs glued into one token so later stages can treat them
/// as single keywords.
const GLUED_KEYWORDS: &[(&str, &str)] = &[
    ("PRIMARY", "KEY"),
    ("FOREIGN", "KEY"),
    ("NOT", "NULL"),
    ("ON", "DELETE"),
    ("ON", "UPDATE"),
    ("NO", "ACTION"),
    ("SET", "NULL"),
    ("SET", "DEFAULT"),
];

/// One lexical token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    /// Token text. Quoted identifiers carry the bare name; string literals
    /// keep their surrounding single quotes.
    pub text: String,
    /// Whether the token was a quoted identifier.
    pub quoted: bool,
}

impl Token {
    pub(crate) fn word(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            quoted: false,
        }
    }

    pub(crate) fn quoted(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            quoted: true,
        }
    }

    /// Case-insensitive keyword comparison; never matches quoted tokens.
    #[must_use]
    pub fn is_keyword(&self, keyword: &str) -> bool {
        !self.quoted && self.text.eq_ignore_ascii_case(keyword)
    }

    /// Returns whether the token is one of the given keywords.
    #[must_use]
    pub fn is_any_keyword(&self, keywords: &[&str]) -> bool {
        keywords.iter().any(|k| self.is_keyword(k))
    }
}

/// Removes `--` line comments and `/* */` block comments, leaving quoted
/// regions untouched.
pub fn strip_comments(sql: &str) -> String {
    let mut out = String::with_capacity(sql.len());
    let mut chars = sql.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '-' if chars.peek() == Some(&'-') => {
                for c in chars.by_ref() {
                    if c == '\n' {
                        out.push('\n');
                        break;
                    }
                }
            }
            '/' if chars.peek() == Some(&'*') => {
                chars.next();
                let mut prev = ' ';
                for c in chars.by_ref() {
                    if prev == '*' && c == '/' {
                        break;
                    }
                    prev = c;
                }
                // Keep statements separated where the comment sat.
                out.push(' ');
            }
            '\'' | '"' | '`' => {
                out.push(c);
                for inner in chars.by_ref() {
                    out.push(inner);
                    if inner == c {
                        break;
                    }
                }
            }
            '[' => {
                out.push(c);
                for inner in chars.by_ref() {
                    out.push(inner);
                    if inner == ']' {
                        break;
                    }
                }
            }
            _ => out.push(c),
        }
    }
    out
}

/// Splits DDL text into a flat token stream.
///
/// Whitespace, `(`, `)` and `,` delimit tokens; double quotes, backticks and
/// brackets delimit identifiers; single quotes delimit string literals. The
/// final pass glues known multi-word keywords into single tokens.
pub fn tokenize(sql: &str) -> Result<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut word = String::new();
    let mut chars = sql.chars().peekable();

    let flush = |word: &mut String, tokens: &mut Vec<Token>| {
        if !word.is_empty() {
            tokens.push(Token::word(std::mem::take(word)));
        }
    };

    while let Some(c) = chars.next() {
        match c {
            c if c.is_whitespace() => flush(&mut word, &mut tokens),
            '(' | ')' | ',' => {
                flush(&mut word, &mut tokens);
                tokens.push(Token::word(c.to_string()));
            }
            '"' | '`' | '[' => {
                flush(&mut word, &mut tokens);
                let close = if c == '[' { ']' } else { c };
                let mut ident = String::new();
                let mut closed = false;
                for inner in chars.by_ref() {
                    if inner == close {
                        closed = true;
                        break;
                    }
                    ident.push(inner);
                }
                if !closed {
                    return Err(SchemaError::parse(sql, "unterminated quoted identifier"));
                }
                tokens.push(Token::quoted(ident));
            }
            '\'' => {
                flush(&mut word, &mut tokens);
                let mut literal = String::from('\'');
                let mut closed = false;
                while let Some(inner) = chars.next() {
                    literal.push(inner);
                    if inner == '\'' {
                        // '' escapes a quote inside the literal.
                        if chars.peek() == Some(&'\'') {
                            literal.push('\'');
                            chars.next();
                        } else {
                            closed = true;
                            break;
                        }
                    }
                }
                if !closed {
                    return Err(SchemaError::parse(sql, "unterminated string literal"));
                }
                tokens.push(Token::word(literal));
            }
            _ => word.push(c),
        }
    }
    flush(&mut word, &mut tokens);

    Ok(glue_keywords(tokens))
}

/// Merges adjacent unquoted tokens forming a known multi-word keyword.
fn glue_keywords(tokens: Vec<Token>) -> Vec<Token> {
    let mut out: Vec<Token> = Vec::with_capacity(tokens.len());
    for token in tokens {
        if let Some(last) = out.last_mut() {
            let glues = GLUED_KEYWORDS
                .iter()
                .any(|(first, second)| last.is_keyword(first) && token.is_keyword(second));
            if glues {
                last.text.push(' ');
                last.text.push_str(&token.text);
                continue;
            }
        }
        out.push(token);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(tokens: &[Token]) -> Vec<&str> {
        tokens.iter().map(|t| t.text.as_str()).collect()
    }

    #[test]
    fn test_strip_line_and_block_comments() {
        let sql = "CREATE TABLE t ( -- trailing\n  a integer /* block */, b text\n)";
        let stripped = strip_comments(sql);
        assert!(!stripped.contains("trailing"));
        assert!(!stripped.contains("block"));
        assert!(stripped.contains("a integer"));
    }

    #[test]
    fn test_comments_inside_literals_survive() {
        let stripped = strip_comments("DEFAULT '--not a comment'");
        assert!(stripped.contains("--not a comment"));
    }

    #[test]
    fn test_tokenize_splits_structural_chars() {
        let tokens = tokenize("a integer,b text(5)").unwrap();
        assert_eq!(
            texts(&tokens),
            vec!["a", "integer", ",", "b", "text", "(", "5", ")"]
        );
    }

    #[test]
    fn test_quoted_identifiers() {
        let tokens = tokenize("\"my col\" `tick` [bracket]").unwrap();
        assert_eq!(texts(&tokens), vec!["my col", "tick", "bracket"]);
        assert!(tokens.iter().all(|t| t.quoted));
    }

    #[test]
    fn test_string_literal_keeps_quotes() {
        let tokens = tokenize("DEFAULT 'it''s'").unwrap();
        assert_eq!(texts(&tokens), vec!["DEFAULT", "'it''s'"]);
        assert!(!tokens[1].quoted);
    }

    #[test]
    fn test_multi_word_keywords_are_glued() {
        let tokens = tokenize("x integer not null primary key").unwrap();
        assert_eq!(
            texts(&tokens),
            vec!["x", "integer", "not null", "primary key"]
        );
        assert!(tokens[2].is_keyword("NOT NULL"));
        assert!(tokens[3].is_keyword("PRIMARY KEY"));
    }

    #[test]
    fn test_quoted_tokens_never_glue() {
        let tokens = tokenize("\"not\" null").unwrap();
        assert_eq!(tokens.len(), 2);
    }

    #[test]
    fn test_unterminated_quote_errors() {
        assert!(tokenize("\"oops").is_err());
        assert!(tokenize("'oops").is_err());
    }
}
