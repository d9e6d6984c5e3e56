//! Lexer for the condition/statement language.
//!
//! Tokenizes a condition or callback string into a flat token stream. Any
//! unrecognized character surfaces as `TokenKind::Error`; the parser turns
//! that into a `ParseError` with the offending slice.

use logos::Logos;

/// All token kinds in the condition/statement language.
#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[logos(skip r"[ \t\r\n]+")]
pub enum TokenKind {
    /// `(`
    #[token("(")]
    LParen,

    /// `)`
    #[token(")")]
    RParen,

    /// `;`
    #[token(";")]
    Semicolon,

    /// `+`
    #[token("+")]
    Plus,

    /// `-`
    #[token("-")]
    Minus,

    /// `*`
    #[token("*")]
    Star,

    /// `/`
    #[token("/")]
    Slash,

    /// `%`
    #[token("%")]
    Percent,

    /// `!`
    #[token("!")]
    Bang,

    /// `&&`
    #[token("&&")]
    AmpAmp,

    /// `||`
    #[token("||")]
    PipePipe,

    /// `==`
    #[token("==")]
    EqEq,

    /// `!=`
    #[token("!=")]
    BangEq,

    /// `<`
    #[token("<")]
    Lt,

    /// `<=`
    #[token("<=")]
    Le,

    /// `>`
    #[token(">")]
    Gt,

    /// `>=`
    #[token(">=")]
    Ge,

    /// `=`
    #[token("=")]
    Assign,

    /// `+=`
    #[token("+=")]
    PlusAssign,

    /// `-=`
    #[token("-=")]
    MinusAssign,

    /// `*=`
    #[token("*=")]
    StarAssign,

    /// `/=`
    #[token("/=")]
    SlashAssign,

    /// `true`
    #[token("true")]
    True,

    /// `false`
    #[token("false")]
    False,

    /// `null`
    #[token("null")]
    Null,

    /// `return`
    #[token("return")]
    Return,

    /// `pass`
    #[token("pass")]
    Pass,

    /// Integer literal.
    #[regex(r"[0-9]+")]
    IntLiteral,

    /// Float literal.
    #[regex(r"[0-9]+\.[0-9]+")]
    FloatLiteral,

    /// Double-quoted string literal (no escapes).
    #[regex(r#""[^"\n]*""#)]
    StrLiteral,

    /// String literal missing its closing quote.
    #[regex(r#""[^"\n]*"#)]
    UnterminatedStr,

    /// Identifier.
    #[regex(r"[A-Za-z_][A-Za-z0-9_]*")]
    Ident,

    /// Unrecognized input.
    Error,
}

/// A token with its byte span in the source string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token {
    /// The kind of token.
    pub kind: TokenKind,
    /// Byte range in the source text.
    pub span: (usize, usize),
}

/// Tokenize a source string.
///
/// Never fails; lexical errors are represented in the stream.
#[must_use]
pub fn tokenize(source: &str) -> Vec<Token> {
    let mut lexer = TokenKind::lexer(source);
    let mut tokens = Vec::new();
    while let Some(kind) = lexer.next() {
        let span = lexer.span();
        tokens.push(Token {
            kind: kind.unwrap_or(TokenKind::Error),
            span: (span.start, span.end),
        });
    }
    tokens
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        tokenize(source).into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn lexes_condition() {
        assert_eq!(
            kinds("x == 0"),
            vec![TokenKind::Ident, TokenKind::EqEq, TokenKind::IntLiteral]
        );
    }

    #[test]
    fn lexes_augmented_assignment() {
        assert_eq!(
            kinds("x += 1"),
            vec![
                TokenKind::Ident,
                TokenKind::PlusAssign,
                TokenKind::IntLiteral
            ]
        );
    }

    #[test]
    fn unterminated_string_is_its_own_kind() {
        assert_eq!(kinds("\"abc"), vec![TokenKind::UnterminatedStr]);
    }

    #[test]
    fn unknown_characters_become_error_tokens() {
        assert!(kinds("x @ 1").contains(&TokenKind::Error));
    }
}
