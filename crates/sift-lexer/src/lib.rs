//! Sift Lexer - Tokenization using logos
//!
//! Never fails: unterminated literals and stray characters become error
//! tokens that keep their span, and the parser reports them.

mod token;

pub use token::*;

use logos::Logos;
use sift_ast::Span;

/// Tokenize a query string into a vector of tokens ending with `Eof`
pub fn tokenize(source: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut lexer = TokenKind::lexer(source);

    while let Some(result) = lexer.next() {
        let span = Span::new(lexer.span().start, lexer.span().end);
        let kind = match result {
            Ok(kind) => kind,
            Err(_) => TokenKind::Error,
        };
        tokens.push(Token { kind, span });
    }

    // Add EOF token
    let end = source.len();
    tokens.push(Token {
        kind: TokenKind::Eof,
        span: Span::new(end, end),
    });

    tokens
}

/// A token with its span
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

impl Token {
    pub fn text<'a>(&self, source: &'a str) -> &'a str {
        self.span.slice(source)
    }
}

/// Decode the body of a quoted string token, without its quotes
pub fn unescape(raw: &str) -> String {
    let mut result = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            result.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => result.push('\n'),
            Some('t') => result.push('\t'),
            Some('r') => result.push('\r'),
            Some(other) => result.push(other),
            None => result.push('\\'),
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        tokenize(source).into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn test_basic_tokens() {
        assert_eq!(
            kinds("WHERE kevin = true"),
            vec![
                TokenKind::Where,
                TokenKind::Ident,
                TokenKind::Eq,
                TokenKind::True,
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn test_keywords_are_case_insensitive() {
        assert_eq!(
            kinds("select Where gRoUp by"),
            vec![
                TokenKind::Select,
                TokenKind::Where,
                TokenKind::Group,
                TokenKind::By,
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn test_property_forms() {
        let source = "[Property1] Property2 arbitrary.json.property fake:property $ order_id";
        assert_eq!(
            kinds(source),
            vec![
                TokenKind::Bracketed,
                TokenKind::Ident,
                TokenKind::Path,
                TokenKind::Path,
                TokenKind::Dollar,
                TokenKind::Ident,
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn test_spans_reproduce_source() {
        let source = "SELECT [Property1], MIN( [Property4] ) AS \"Alias\"";
        let texts: Vec<&str> = tokenize(source)
            .iter()
            .map(|t| t.text(source))
            .collect();
        assert_eq!(
            texts,
            vec!["SELECT", "[Property1]", ",", "MIN", "(", "[Property4]", ")", "AS", "\"Alias\"", ""]
        );
        let tokens = tokenize(source);
        assert_eq!(tokens[1].span, Span::new(7, 18));
    }

    #[test]
    fn test_numbers() {
        assert_eq!(
            kinds("-20 2.5 1e3 7"),
            vec![
                TokenKind::Int,
                TokenKind::Float,
                TokenKind::Float,
                TokenKind::Int,
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn test_operators_and_connectors() {
        assert_eq!(
            kinds("!= <= >= < > && || , NOT IN"),
            vec![
                TokenKind::Ne,
                TokenKind::Le,
                TokenKind::Ge,
                TokenKind::Lt,
                TokenKind::Gt,
                TokenKind::AndAnd,
                TokenKind::OrOr,
                TokenKind::Comma,
                TokenKind::Not,
                TokenKind::In,
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn test_error_tokens_keep_scanning() {
        let tokens = tokenize("a = \"open");
        assert_eq!(tokens[2].kind, TokenKind::UnterminatedString);
        assert_eq!(tokens[2].span, Span::new(4, 9));

        let tokens = tokenize("a # b");
        assert_eq!(tokens[1].kind, TokenKind::Error);
        assert_eq!(tokens[2].kind, TokenKind::Ident);

        let tokens = tokenize("[open");
        assert_eq!(tokens[0].kind, TokenKind::UnterminatedBracket);
    }

    #[test]
    fn test_unescape() {
        assert_eq!(unescape(r#"say \"hi\""#), "say \"hi\"");
        assert_eq!(unescape(r"a\\b"), "a\\b");
        assert_eq!(unescape(r"tab\there"), "tab\there");
    }
}
