use crate::token::{Token, TokenKind};
use sitepack_graph::Span;

/// The lexer/tokenizer for the typed dialect.
pub struct Lexer<'a> {
    source: &'a str,
    chars: std::str::CharIndices<'a>,
    current_pos: usize,
    current_char: Option<char>,
    file_id: usize,
    last_kind: Option<TokenKind>,
}

impl<'a> Lexer<'a> {
    /// Creates a new lexer from source code.
    pub fn new(source: &'a str) -> Self {
        Self::with_file_id(source, 0)
    }

    /// Creates a new lexer with a specific file ID.
    pub fn with_file_id(source: &'a str, file_id: usize) -> Self {
        let mut chars = source.char_indices();
        let current_char = chars.next().map(|(_, c)| c);
        Self {
            source,
            chars,
            current_pos: 0,
            current_char,
            file_id,
            last_kind: None,
        }
    }

    /// Tokenizes the entire source code and returns all tokens.
    pub fn tokenize(&mut self) -> Vec<Token> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token();
            let is_eof = token.kind == TokenKind::Eof;
            tokens.push(token);
            if is_eof {
                break;
            }
        }
        tokens
    }

    /// Gets the next token from the source.
    pub fn next_token(&mut self) -> Token {
        if let Some(error_token) = self.skip_whitespace_and_comments() {
            return error_token;
        }

        let start = self.current_pos;

        let token = match self.current_char {
            None => self.make(TokenKind::Eof, start, String::new()),
            Some(ch) => match ch {
                '"' | '\'' => self.read_string_literal(ch),
                '`' => self.read_template_literal(),
                '0'..='9' => self.read_number(),
                'a'..='z' | 'A'..='Z' | '_' | '$' => self.read_identifier_or_keyword(),

                '+' => self.read_plus(),
                '-' => self.read_minus(),
                '*' => self.read_star(),
                '/' => self.read_slash_or_regex(),
                '%' => self.read_simple_eq(TokenKind::Percent, TokenKind::PercentEq),
                '=' => self.read_eq(),
                '!' => self.read_bang(),
                '<' => self.read_lt(),
                '>' => self.read_gt(),
                '&' => self.read_amp(),
                '|' => self.read_pipe(),
                '^' => self.read_simple_eq(TokenKind::Caret, TokenKind::CaretEq),
                '~' => self.single(TokenKind::Tilde, "~"),
                '?' => self.read_question(),
                '.' => self.read_dot(),

                '(' => self.single(TokenKind::LParen, "("),
                ')' => self.single(TokenKind::RParen, ")"),
                '{' => self.single(TokenKind::LBrace, "{"),
                '}' => self.single(TokenKind::RBrace, "}"),
                '[' => self.single(TokenKind::LBracket, "["),
                ']' => self.single(TokenKind::RBracket, "]"),
                ';' => self.single(TokenKind::Semicolon, ";"),
                ':' => self.single(TokenKind::Colon, ":"),
                ',' => self.single(TokenKind::Comma, ","),
                '@' => self.single(TokenKind::At, "@"),

                _ if ch.is_alphabetic() => self.read_identifier_or_keyword(),

                _ => {
                    self.advance();
                    self.make(
                        TokenKind::Error,
                        start,
                        format!("Unexpected character: {}", ch),
                    )
                }
            },
        };

        if token.kind != TokenKind::Eof && token.kind != TokenKind::Error {
            self.last_kind = Some(token.kind.clone());
        }
        token
    }

    // Helper methods

    fn make(&self, kind: TokenKind, start: usize, value: impl Into<String>) -> Token {
        Token::new(
            kind,
            Span::new(start, self.current_pos, self.file_id),
            value.into(),
        )
    }

    fn single(&mut self, kind: TokenKind, text: &str) -> Token {
        let start = self.current_pos;
        self.advance();
        self.make(kind, start, text)
    }

    fn advance(&mut self) {
        if let Some((pos, ch)) = self.chars.next() {
            self.current_pos = pos;
            self.current_char = Some(ch);
        } else {
            self.current_pos = self.source.len();
            self.current_char = None;
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.clone().next().map(|(_, c)| c)
    }

    fn peek_nth(&self, n: usize) -> Option<char> {
        self.chars.clone().nth(n).map(|(_, c)| c)
    }

    fn eat_if(&mut self, ch: char) -> bool {
        if self.current_char == Some(ch) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn skip_whitespace_and_comments(&mut self) -> Option<Token> {
        loop {
            match self.current_char {
                Some(ch) if ch.is_whitespace() => {
                    self.advance();
                }
                Some('/') => {
                    if self.peek() == Some('/') {
                        self.skip_single_line_comment();
                    } else if self.peek() == Some('*') {
                        let start = self.current_pos;
                        if !self.skip_multi_line_comment() {
                            return Some(self.make(
                                TokenKind::Error,
                                start,
                                "Unterminated multi-line comment",
                            ));
                        }
                    } else {
                        break;
                    }
                }
                _ => break,
            }
        }
        None
    }

    fn skip_single_line_comment(&mut self) {
        // Skip //
        self.advance();
        self.advance();

        while let Some(ch) = self.current_char {
            if ch == '\n' {
                self.advance();
                break;
            }
            self.advance();
        }
    }

    fn skip_multi_line_comment(&mut self) -> bool {
        // Skip /*
        self.advance();
        self.advance();

        while let Some(ch) = self.current_char {
            if ch == '*' && self.peek() == Some('/') {
                self.advance(); // *
                self.advance(); // /
                return true;
            }
            self.advance();
        }
        false // Unterminated
    }

    fn read_string_literal(&mut self, quote: char) -> Token {
        let start = self.current_pos;
        self.advance(); // Skip opening quote

        let mut value = String::new();

        while let Some(ch) = self.current_char {
            if ch == quote {
                self.advance(); // Skip closing quote
                return self.make(TokenKind::StringLiteral, start, value);
            } else if ch == '\\' {
                self.advance();
                if let Some(escaped) = self.current_char {
                    let unescaped = match escaped {
                        'n' => '\n',
                        'r' => '\r',
                        't' => '\t',
                        '\\' => '\\',
                        '\'' => '\'',
                        '"' => '"',
                        '0' => '\0',
                        _ => escaped,
                    };
                    value.push(unescaped);
                    self.advance();
                }
            } else if ch == '\n' {
                return self.make(TokenKind::Error, start, "Unterminated string literal");
            } else {
                value.push(ch);
                self.advance();
            }
        }

        self.make(TokenKind::Error, start, "Unterminated string literal")
    }

    /// Reads a whole template literal as one token. `${}` interpolations
    /// are tracked so a closing brace inside them does not end the scan.
    fn read_template_literal(&mut self) -> Token {
        let start = self.current_pos;
        self.advance(); // Skip opening backtick

        let mut value = String::new();
        let mut interp_depth: usize = 0;

        while let Some(ch) = self.current_char {
            match ch {
                '`' if interp_depth == 0 => {
                    self.advance();
                    return self.make(TokenKind::TemplateLiteral, start, value);
                }
                '\\' if interp_depth == 0 => {
                    self.advance();
                    if let Some(escaped) = self.current_char {
                        value.push(escaped);
                        self.advance();
                    }
                }
                '$' if interp_depth == 0 && self.peek() == Some('{') => {
                    interp_depth = 1;
                    value.push('$');
                    self.advance();
                    value.push('{');
                    self.advance();
                }
                '{' if interp_depth > 0 => {
                    interp_depth += 1;
                    value.push(ch);
                    self.advance();
                }
                '}' if interp_depth > 0 => {
                    interp_depth -= 1;
                    value.push(ch);
                    self.advance();
                }
                _ => {
                    value.push(ch);
                    self.advance();
                }
            }
        }

        self.make(TokenKind::Error, start, "Unterminated template literal")
    }

    fn read_number(&mut self) -> Token {
        let start = self.current_pos;

        if self.current_char == Some('0') {
            if let Some('x' | 'X' | 'o' | 'O' | 'b' | 'B') = self.peek() {
                self.advance();
                self.advance();
                while let Some(ch) = self.current_char {
                    if ch.is_ascii_alphanumeric() || ch == '_' {
                        self.advance();
                    } else {
                        break;
                    }
                }
                let text = &self.source[start..self.current_pos];
                return self.make(TokenKind::NumberLiteral, start, text);
            }
        }

        while let Some(ch) = self.current_char {
            if ch.is_ascii_digit() || ch == '_' {
                self.advance();
            } else {
                break;
            }
        }

        // Decimal part
        if self.current_char == Some('.') && self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.advance();
            while let Some(ch) = self.current_char {
                if ch.is_ascii_digit() || ch == '_' {
                    self.advance();
                } else {
                    break;
                }
            }
        }

        // Exponent
        if matches!(self.current_char, Some('e') | Some('E')) {
            self.advance();
            if matches!(self.current_char, Some('+') | Some('-')) {
                self.advance();
            }
            while let Some(ch) = self.current_char {
                if ch.is_ascii_digit() || ch == '_' {
                    self.advance();
                } else {
                    break;
                }
            }
        }

        // BigInt suffix
        if self.current_char == Some('n') {
            self.advance();
        }

        let text = &self.source[start..self.current_pos];
        self.make(TokenKind::NumberLiteral, start, text)
    }

    fn read_identifier_or_keyword(&mut self) -> Token {
        let start = self.current_pos;

        while let Some(ch) = self.current_char {
            if ch.is_alphanumeric() || ch == '_' || ch == '$' {
                self.advance();
            } else {
                break;
            }
        }

        let text = &self.source[start..self.current_pos];
        match TokenKind::from_keyword(text) {
            Some(kind) => self.make(kind, start, text),
            None => self.make(TokenKind::Identifier, start, text),
        }
    }

    fn read_plus(&mut self) -> Token {
        let start = self.current_pos;
        self.advance();
        if self.eat_if('+') {
            self.make(TokenKind::PlusPlus, start, "++")
        } else if self.eat_if('=') {
            self.make(TokenKind::PlusEq, start, "+=")
        } else {
            self.make(TokenKind::Plus, start, "+")
        }
    }

    fn read_minus(&mut self) -> Token {
        let start = self.current_pos;
        self.advance();
        if self.eat_if('-') {
            self.make(TokenKind::MinusMinus, start, "--")
        } else if self.eat_if('=') {
            self.make(TokenKind::MinusEq, start, "-=")
        } else {
            self.make(TokenKind::Minus, start, "-")
        }
    }

    fn read_star(&mut self) -> Token {
        let start = self.current_pos;
        self.advance();
        if self.eat_if('*') {
            self.make(TokenKind::StarStar, start, "**")
        } else if self.eat_if('=') {
            self.make(TokenKind::StarEq, start, "*=")
        } else {
            self.make(TokenKind::Star, start, "*")
        }
    }

    /// A `/` starts a regular expression when the previous significant
    /// token cannot end an expression, a division otherwise.
    fn read_slash_or_regex(&mut self) -> Token {
        if TokenKind::regex_can_follow(self.last_kind.as_ref()) {
            return self.read_regex();
        }

        let start = self.current_pos;
        self.advance();
        if self.eat_if('=') {
            self.make(TokenKind::SlashEq, start, "/=")
        } else {
            self.make(TokenKind::Slash, start, "/")
        }
    }

    fn read_regex(&mut self) -> Token {
        let start = self.current_pos;
        self.advance(); // Skip opening /

        let mut in_class = false;
        loop {
            match self.current_char {
                None | Some('\n') => {
                    return self.make(
                        TokenKind::Error,
                        start,
                        "Unterminated regular expression",
                    );
                }
                Some('\\') => {
                    self.advance();
                    self.advance();
                }
                Some('[') => {
                    in_class = true;
                    self.advance();
                }
                Some(']') => {
                    in_class = false;
                    self.advance();
                }
                Some('/') if !in_class => {
                    self.advance();
                    break;
                }
                Some(_) => self.advance(),
            }
        }

        // Flags
        while let Some(ch) = self.current_char {
            if ch.is_ascii_alphabetic() {
                self.advance();
            } else {
                break;
            }
        }

        let text = &self.source[start..self.current_pos];
        self.make(TokenKind::RegexLiteral, start, text)
    }

    fn read_simple_eq(&mut self, plain: TokenKind, with_eq: TokenKind) -> Token {
        let start = self.current_pos;
        self.advance();
        let kind = if self.eat_if('=') { with_eq } else { plain };
        let text = &self.source[start..self.current_pos];
        self.make(kind, start, text)
    }

    fn read_eq(&mut self) -> Token {
        let start = self.current_pos;
        self.advance();
        if self.eat_if('=') {
            if self.eat_if('=') {
                self.make(TokenKind::EqEqEq, start, "===")
            } else {
                self.make(TokenKind::EqEq, start, "==")
            }
        } else if self.eat_if('>') {
            self.make(TokenKind::Arrow, start, "=>")
        } else {
            self.make(TokenKind::Eq, start, "=")
        }
    }

    fn read_bang(&mut self) -> Token {
        let start = self.current_pos;
        self.advance();
        if self.eat_if('=') {
            if self.eat_if('=') {
                self.make(TokenKind::BangEqEq, start, "!==")
            } else {
                self.make(TokenKind::BangEq, start, "!=")
            }
        } else {
            self.make(TokenKind::Bang, start, "!")
        }
    }

    fn read_lt(&mut self) -> Token {
        let start = self.current_pos;
        self.advance();
        if self.eat_if('=') {
            self.make(TokenKind::LtEq, start, "<=")
        } else if self.eat_if('<') {
            self.make(TokenKind::LtLt, start, "<<")
        } else {
            self.make(TokenKind::Lt, start, "<")
        }
    }

    fn read_gt(&mut self) -> Token {
        let start = self.current_pos;
        self.advance();
        if self.eat_if('=') {
            self.make(TokenKind::GtEq, start, ">=")
        } else if self.eat_if('>') {
            if self.eat_if('>') {
                self.make(TokenKind::GtGtGt, start, ">>>")
            } else {
                self.make(TokenKind::GtGt, start, ">>")
            }
        } else {
            self.make(TokenKind::Gt, start, ">")
        }
    }

    fn read_amp(&mut self) -> Token {
        let start = self.current_pos;
        self.advance();
        if self.eat_if('&') {
            if self.eat_if('=') {
                self.make(TokenKind::AmpAmpEq, start, "&&=")
            } else {
                self.make(TokenKind::AmpAmp, start, "&&")
            }
        } else if self.eat_if('=') {
            self.make(TokenKind::AmpEq, start, "&=")
        } else {
            self.make(TokenKind::Amp, start, "&")
        }
    }

    fn read_pipe(&mut self) -> Token {
        let start = self.current_pos;
        self.advance();
        if self.eat_if('|') {
            if self.eat_if('=') {
                self.make(TokenKind::PipePipeEq, start, "||=")
            } else {
                self.make(TokenKind::PipePipe, start, "||")
            }
        } else if self.eat_if('=') {
            self.make(TokenKind::PipeEq, start, "|=")
        } else {
            self.make(TokenKind::Pipe, start, "|")
        }
    }

    fn read_question(&mut self) -> Token {
        let start = self.current_pos;
        self.advance();
        if self.current_char == Some('.') && !self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.advance();
            self.make(TokenKind::QuestionDot, start, "?.")
        } else if self.eat_if('?') {
            if self.eat_if('=') {
                self.make(TokenKind::QuestionQuestionEq, start, "??=")
            } else {
                self.make(TokenKind::QuestionQuestion, start, "??")
            }
        } else {
            self.make(TokenKind::Question, start, "?")
        }
    }

    fn read_dot(&mut self) -> Token {
        let start = self.current_pos;
        if self.peek() == Some('.') && self.peek_nth(1) == Some('.') {
            self.advance();
            self.advance();
            self.advance();
            return self.make(TokenKind::DotDotDot, start, "...");
        }
        self.advance();
        self.make(TokenKind::Dot, start, ".")
    }
}
