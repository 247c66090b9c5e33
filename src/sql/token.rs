//! Output tokens.
//!
//! Statements are first lowered to a flat token list and then rendered in a
//! single pass, which is the only place identifiers get delimited.

use super::dialect::Dialect;

/// Reserved words the assembler emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keyword {
    Select,
    Distinct,
    From,
    Where,
    GroupBy,
    InnerJoin,
    On,
    As,
    And,
}

impl Keyword {
    pub fn as_str(self) -> &'static str {
        match self {
            Keyword::Select => "SELECT",
            Keyword::Distinct => "DISTINCT",
            Keyword::From => "FROM",
            Keyword::Where => "WHERE",
            Keyword::GroupBy => "GROUP BY",
            Keyword::InnerJoin => "INNER JOIN",
            Keyword::On => "ON",
            Keyword::As => "AS",
            Keyword::And => "AND",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Keyword(Keyword),
    /// Schema, table, column or alias name; delimited on output.
    Ident(String),
    /// Aggregate function name.
    Call(&'static str),
    /// One of `, . ( ) =`.
    Punct(char),
    Space,
    /// Line break followed by `depth` levels of two-space indentation.
    Line(usize),
    /// Text copied to the output unchanged.
    ///
    /// Only filter text that [`crate::filter::parse_filter`] accepted ends
    /// up here.
    Verbatim(String),
}

impl Token {
    fn write(&self, out: &mut String, dialect: Dialect) {
        match self {
            Token::Keyword(kw) => out.push_str(kw.as_str()),
            Token::Ident(name) => dialect.write_identifier(out, name),
            Token::Call(name) => out.push_str(name),
            Token::Punct(c) => out.push(*c),
            Token::Space => out.push(' '),
            Token::Line(depth) => {
                out.push('\n');
                for _ in 0..*depth {
                    out.push_str("  ");
                }
            }
            Token::Verbatim(text) => out.push_str(text),
        }
    }
}

/// A flat list of tokens with builder helpers.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TokenStream {
    tokens: Vec<Token>,
}

impl TokenStream {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, token: Token) -> &mut Self {
        self.tokens.push(token);
        self
    }

    pub fn keyword(&mut self, kw: Keyword) -> &mut Self {
        self.push(Token::Keyword(kw))
    }

    pub fn ident(&mut self, name: &str) -> &mut Self {
        self.push(Token::Ident(name.to_string()))
    }

    pub fn punct(&mut self, c: char) -> &mut Self {
        self.push(Token::Punct(c))
    }

    pub fn space(&mut self) -> &mut Self {
        self.push(Token::Space)
    }

    pub fn line(&mut self, depth: usize) -> &mut Self {
        self.push(Token::Line(depth))
    }

    /// ` KEYWORD ` with a space on each side.
    pub fn padded(&mut self, kw: Keyword) -> &mut Self {
        self.space().keyword(kw).space()
    }

    /// ` AS alias`.
    pub fn alias(&mut self, alias: &str) -> &mut Self {
        self.space().keyword(Keyword::As).space().ident(alias)
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    /// Render every token for `dialect`.
    pub fn render(&self, dialect: Dialect) -> String {
        let mut out = String::with_capacity(self.tokens.len() * 8);
        for token in &self.tokens {
            token.write(&mut out, dialect);
        }
        out
    }
}

impl Extend<Token> for TokenStream {
    fn extend<I: IntoIterator<Item = Token>>(&mut self, iter: I) {
        self.tokens.extend(iter);
    }
}
