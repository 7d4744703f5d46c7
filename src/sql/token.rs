//! Token types produced by the [`super::lexer::Lexer`].

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Keyword {
    And,
    As,
    Asc,
    Begin,
    By,
    Cast,
    Checkpoint,
    Collate,
    Commit,
    Create,
    Deallocate,
    Desc,
    Drop,
    End,
    Execute,
    Exists,
    False,
    Force,
    From,
    If,
    Insert,
    Into,
    Is,
    Limit,
    Not,
    Null,
    Or,
    Order,
    Prepare,
    Rollback,
    Select,
    Table,
    Transaction,
    True,
    Values,
    Where,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Parameter {
    /// `$n`, 1-based.
    Positional(u32),
    /// `?`
    Anonymous,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Token<'a> {
    Keyword(Keyword),
    Ident(&'a str),
    QuotedIdent(&'a str),
    String(&'a str),
    Integer(&'a str),
    Float(&'a str),
    Parameter(Parameter),

    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Concat,
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    LParen,
    RParen,
    Comma,
    Semicolon,
    DoubleColon,

    Eof,
    Error(&'static str),
}
