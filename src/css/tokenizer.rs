//! logos-based selector tokenizer.
//!
//! Selectors only need four token kinds; whitespace is skipped by the lexer
//! but remains significant, so every token carries its byte span and the
//! parser uses span adjacency to tell `.a.b` (one compound) from `.a .b`
//! (a descendant chain).

use logos::Logos;

/// Selector token produced by the lexer.
#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq)]
#[logos(skip r"[ \t\n\r\f]+")]
pub enum Token {
    /// Identifier: widget type names, class names, ids.
    #[regex(r"[a-zA-Z_][a-zA-Z0-9_-]*")]
    Ident,

    /// `.` introducing a class term.
    #[token(".")]
    Dot,

    /// `#` introducing an id term.
    #[token("#")]
    Hash,

    /// `,` separating selector alternatives.
    #[token(",")]
    Comma,
}

/// A token with its source text and byte span.
#[derive(Debug, Clone)]
pub struct SpannedToken {
    pub token: Token,
    pub text: String,
    pub start: usize,
    pub end: usize,
}

/// Tokenize a selector string. Unlexable characters are skipped.
pub fn tokenize(input: &str) -> Vec<SpannedToken> {
    Token::lexer(input)
        .spanned()
        .filter_map(|(result, span)| {
            result.ok().map(|token| SpannedToken {
                token,
                text: input[span.clone()].to_string(),
                start: span.start,
                end: span.end,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(input: &str) -> Vec<Token> {
        tokenize(input).into_iter().map(|t| t.token).collect()
    }

    #[test]
    fn test_compound_selector_tokens() {
        assert_eq!(
            kinds("Button.primary"),
            vec![Token::Ident, Token::Dot, Token::Ident]
        );
    }

    #[test]
    fn test_id_selector_tokens() {
        assert_eq!(kinds("#sidebar"), vec![Token::Hash, Token::Ident]);
    }

    #[test]
    fn test_alternatives() {
        assert_eq!(
            kinds("#foo, .bar"),
            vec![
                Token::Hash,
                Token::Ident,
                Token::Comma,
                Token::Dot,
                Token::Ident
            ]
        );
    }

    #[test]
    fn test_spans_expose_whitespace_gaps() {
        let tokens = tokenize(".a .b");
        // ".a" ends at 2, ".b" starts at 3: the gap marks a descendant step.
        assert_eq!(tokens[1].end, 2);
        assert_eq!(tokens[2].start, 3);
    }

    #[test]
    fn test_adjacent_spans_have_no_gap() {
        let tokens = tokenize(".a.b");
        assert_eq!(tokens[1].end, tokens[2].start);
    }

    #[test]
    fn test_idents_keep_text() {
        let tokens = tokenize("Panel my-class _private");
        let texts: Vec<_> = tokens.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, vec!["Panel", "my-class", "_private"]);
    }

    #[test]
    fn test_unlexable_characters_skipped() {
        assert_eq!(kinds("a > b"), vec![Token::Ident, Token::Ident]);
    }

    #[test]
    fn test_empty_input() {
        assert!(tokenize("").is_empty());
        assert!(tokenize("   \t\n").is_empty());
    }
}
