use sitepack_graph::Span;

/// Token kinds for the typed dialect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind {
    // Keywords
    Import,
    Export,
    Default,
    From,
    As,
    Type,
    Interface,
    Declare,
    Enum,
    Namespace,
    Module,
    Const,
    Let,
    Var,
    Function,
    Class,
    Extends,
    Implements,
    Abstract,
    Public,
    Private,
    Protected,
    Readonly,
    Override,
    Static,
    Async,
    Await,
    Satisfies,
    Keyof,
    Infer,
    Is,
    New,
    Return,
    Case,
    Delete,
    Typeof,
    Instanceof,
    In,
    Of,
    Void,
    If,
    Else,
    For,
    While,
    Do,
    Switch,
    Break,
    Continue,
    Try,
    Catch,
    Finally,
    Throw,
    This,
    Super,
    Yield,
    Null,
    Undefined,
    True,
    False,

    // Literals
    NumberLiteral,
    StringLiteral,
    TemplateLiteral,
    RegexLiteral,

    // Identifier
    Identifier,

    // Operators
    Plus,              // +
    PlusPlus,          // ++
    PlusEq,            // +=
    Minus,             // -
    MinusMinus,        // --
    MinusEq,           // -=
    Star,              // *
    StarStar,          // **
    StarEq,            // *=
    Slash,             // /
    SlashEq,           // /=
    Percent,           // %
    PercentEq,         // %=
    Eq,                // =
    EqEq,              // ==
    EqEqEq,            // ===
    BangEq,            // !=
    BangEqEq,          // !==
    Bang,              // !
    Lt,                // <
    LtEq,              // <=
    LtLt,              // <<
    Gt,                // >
    GtEq,              // >=
    GtGt,              // >>
    GtGtGt,            // >>>
    Amp,               // &
    AmpAmp,            // &&
    AmpEq,             // &=
    AmpAmpEq,          // &&=
    Pipe,              // |
    PipePipe,          // ||
    PipeEq,            // |=
    PipePipeEq,        // ||=
    Caret,             // ^
    CaretEq,           // ^=
    Tilde,             // ~
    Question,          // ?
    QuestionDot,       // ?.
    QuestionQuestion,  // ??
    QuestionQuestionEq,// ??=
    Arrow,             // =>

    // Delimiters
    LParen,            // (
    RParen,            // )
    LBrace,            // {
    RBrace,            // }
    LBracket,          // [
    RBracket,          // ]
    Semicolon,         // ;
    Colon,             // :
    Comma,             // ,
    Dot,               // .
    DotDotDot,         // ...
    At,                // @

    // Special
    Error,
    Eof,
}

impl TokenKind {
    /// Keyword lookup for an identifier-shaped word.
    pub fn from_keyword(word: &str) -> Option<TokenKind> {
        let kind = match word {
            "import" => TokenKind::Import,
            "export" => TokenKind::Export,
            "default" => TokenKind::Default,
            "from" => TokenKind::From,
            "as" => TokenKind::As,
            "type" => TokenKind::Type,
            "interface" => TokenKind::Interface,
            "declare" => TokenKind::Declare,
            "enum" => TokenKind::Enum,
            "namespace" => TokenKind::Namespace,
            "module" => TokenKind::Module,
            "const" => TokenKind::Const,
            "let" => TokenKind::Let,
            "var" => TokenKind::Var,
            "function" => TokenKind::Function,
            "class" => TokenKind::Class,
            "extends" => TokenKind::Extends,
            "implements" => TokenKind::Implements,
            "abstract" => TokenKind::Abstract,
            "public" => TokenKind::Public,
            "private" => TokenKind::Private,
            "protected" => TokenKind::Protected,
            "readonly" => TokenKind::Readonly,
            "override" => TokenKind::Override,
            "static" => TokenKind::Static,
            "async" => TokenKind::Async,
            "await" => TokenKind::Await,
            "satisfies" => TokenKind::Satisfies,
            "keyof" => TokenKind::Keyof,
            "infer" => TokenKind::Infer,
            "is" => TokenKind::Is,
            "new" => TokenKind::New,
            "return" => TokenKind::Return,
            "case" => TokenKind::Case,
            "delete" => TokenKind::Delete,
            "typeof" => TokenKind::Typeof,
            "instanceof" => TokenKind::Instanceof,
            "in" => TokenKind::In,
            "of" => TokenKind::Of,
            "void" => TokenKind::Void,
            "if" => TokenKind::If,
            "else" => TokenKind::Else,
            "for" => TokenKind::For,
            "while" => TokenKind::While,
            "do" => TokenKind::Do,
            "switch" => TokenKind::Switch,
            "break" => TokenKind::Break,
            "continue" => TokenKind::Continue,
            "try" => TokenKind::Try,
            "catch" => TokenKind::Catch,
            "finally" => TokenKind::Finally,
            "throw" => TokenKind::Throw,
            "this" => TokenKind::This,
            "super" => TokenKind::Super,
            "yield" => TokenKind::Yield,
            "null" => TokenKind::Null,
            "undefined" => TokenKind::Undefined,
            "true" => TokenKind::True,
            "false" => TokenKind::False,
            _ => return None,
        };
        Some(kind)
    }

    /// Contextual keywords double as plain identifiers in binding position
    /// (`import type from "x"` binds a default named `type`).
    pub fn is_identifier_like(&self) -> bool {
        matches!(
            self,
            TokenKind::Identifier
                | TokenKind::From
                | TokenKind::As
                | TokenKind::Type
                | TokenKind::Of
                | TokenKind::Is
                | TokenKind::Namespace
                | TokenKind::Module
                | TokenKind::Declare
                | TokenKind::Abstract
                | TokenKind::Readonly
                | TokenKind::Satisfies
                | TokenKind::Keyof
                | TokenKind::Infer
                | TokenKind::Async
                | TokenKind::Undefined
        )
    }

    /// True for tokens after which a `/` starts a regular expression
    /// rather than a division.
    pub fn regex_can_follow(last: Option<&TokenKind>) -> bool {
        let Some(kind) = last else {
            return true;
        };
        !matches!(
            kind,
            TokenKind::Identifier
                | TokenKind::NumberLiteral
                | TokenKind::StringLiteral
                | TokenKind::TemplateLiteral
                | TokenKind::RegexLiteral
                | TokenKind::RParen
                | TokenKind::RBracket
                | TokenKind::RBrace
                | TokenKind::This
                | TokenKind::Super
                | TokenKind::Null
                | TokenKind::Undefined
                | TokenKind::True
                | TokenKind::False
                | TokenKind::PlusPlus
                | TokenKind::MinusMinus
        )
    }
}

/// A token with its source span. `value` holds the identifier text, the
/// unescaped literal contents, or an error message for `Error` tokens.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
    pub value: String,
}

impl Token {
    pub fn new(kind: TokenKind, span: Span, value: String) -> Self {
        Self { kind, span, value }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyword_lookup() {
        assert_eq!(TokenKind::from_keyword("import"), Some(TokenKind::Import));
        assert_eq!(TokenKind::from_keyword("satisfies"), Some(TokenKind::Satisfies));
        assert_eq!(TokenKind::from_keyword("window"), None);
    }

    #[test]
    fn test_regex_position() {
        assert!(TokenKind::regex_can_follow(None));
        assert!(TokenKind::regex_can_follow(Some(&TokenKind::Eq)));
        assert!(TokenKind::regex_can_follow(Some(&TokenKind::LParen)));
        assert!(!TokenKind::regex_can_follow(Some(&TokenKind::Identifier)));
        assert!(!TokenKind::regex_can_follow(Some(&TokenKind::RParen)));
    }
}
