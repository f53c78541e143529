//! Token-level type erasure.
//!
//! The stripper walks the token stream once, recording byte ranges that
//! hold type-only syntax. Those ranges are then overwritten with spaces
//! (newlines kept), so the output has the same length and line structure
//! as the input. Bracket frames track whether a `{` opened a block, an
//! object literal, or a class body; the three contexts that decide what
//! a `:` or a modifier keyword means.

use std::path::Path;

use sitepack_graph::{LineIndex, Span};
use sitepack_lexer::{Lexer, Token, TokenKind};

use crate::error::TranspileError;

/// Strip type syntax from `source`, returning plain runtime code of the
/// same byte length and line structure.
pub fn strip_types(source: &str, path: &Path) -> Result<String, TranspileError> {
    let tokens = Lexer::new(source).tokenize();
    let index = LineIndex::new(source);

    if let Some(bad) = tokens.iter().find(|t| t.kind == TokenKind::Error) {
        return Err(located(path, &index, bad.span, bad.value.clone()));
    }

    let mut stripper = Stripper {
        tokens: &tokens,
        path,
        index: &index,
        blanks: Vec::new(),
        frames: vec![Frame::new(FrameKind::Root)],
        i: 0,
        prev: None,
        prev_ctor: false,
        class_heading: None,
    };
    stripper.run()?;

    Ok(blank_ranges(source, &stripper.blanks))
}

fn located(path: &Path, index: &LineIndex, span: Span, message: String) -> TranspileError {
    let (line, column) = index.line_col(span.start);
    TranspileError {
        path: path.to_path_buf(),
        line,
        column,
        span,
        message,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FrameKind {
    Root,
    Block,
    Object,
    ClassBody,
    Paren,
    Bracket,
}

#[derive(Debug)]
struct Frame {
    kind: FrameKind,
    ternary: usize,
    pending_case: bool,
    ctor_params: bool,
}

impl Frame {
    fn new(kind: FrameKind) -> Self {
        Self {
            kind,
            ternary: 0,
            pending_case: false,
            ctor_params: false,
        }
    }
}

struct Stripper<'a> {
    tokens: &'a [Token],
    path: &'a Path,
    index: &'a LineIndex,
    blanks: Vec<(usize, usize)>,
    frames: Vec<Frame>,
    i: usize,
    prev: Option<TokenKind>,
    prev_ctor: bool,
    class_heading: Option<usize>,
}

impl<'a> Stripper<'a> {
    fn run(&mut self) -> Result<(), TranspileError> {
        while self.kind(self.i) != &TokenKind::Eof {
            self.step()?;
        }

        if self.frames.len() > 1 {
            let span = self.tokens[self.tokens.len() - 1].span;
            return Err(self.err(span, "Unexpected end of file"));
        }
        Ok(())
    }

    fn step(&mut self) -> Result<(), TranspileError> {
        let i = self.i;
        let kind = self.kind(i).clone();
        let was_ctor = self.prev_ctor;
        self.prev_ctor = false;

        match kind {
            TokenKind::Import => return self.handle_import(),
            TokenKind::Export => return self.handle_export(),

            TokenKind::Interface if self.is_interface_decl() => return self.erase_interface(),
            TokenKind::Type if self.is_type_alias() => return self.erase_through_statement(),
            TokenKind::Declare => {
                if self.frame().kind == FrameKind::ClassBody {
                    // `declare` class member: drop the modifier, the field
                    // itself erases to a bare name.
                    self.blank_token(i);
                    self.advance(TokenKind::Declare);
                    return Ok(());
                }
                if self.is_declare_statement() {
                    return self.erase_declare();
                }
            }

            TokenKind::Enum
                if self.prev != Some(TokenKind::Dot) && self.peek(1) != &TokenKind::Colon =>
            {
                let span = self.tokens[i].span;
                return Err(self.err(
                    span,
                    "enum declarations have runtime semantics that type stripping cannot preserve",
                ));
            }
            TokenKind::Namespace | TokenKind::Module if self.is_namespace_decl() => {
                let span = self.tokens[i].span;
                return Err(self.err(
                    span,
                    "namespace declarations have runtime semantics that type stripping cannot preserve",
                ));
            }

            TokenKind::Class if self.prev != Some(TokenKind::Dot) => {
                self.class_heading = Some(self.frames.len());
                self.advance(TokenKind::Class);
                return Ok(());
            }
            TokenKind::Function => return self.handle_function(),

            TokenKind::Lt => {
                if self.class_heading == Some(self.frames.len()) {
                    if let Some(end) = self.scan_angles(i) {
                        self.blank_tokens(i, end);
                        self.i = end;
                        return Ok(());
                    }
                }
            }
            TokenKind::Implements if self.class_heading == Some(self.frames.len()) => {
                return self.erase_implements();
            }

            TokenKind::Abstract => {
                if self.peek(1) == &TokenKind::Class {
                    self.blank_token(i);
                    self.advance(TokenKind::Abstract);
                    return Ok(());
                }
                if self.frame().kind == FrameKind::ClassBody {
                    return self.erase_abstract_member();
                }
            }

            TokenKind::Public
            | TokenKind::Private
            | TokenKind::Protected
            | TokenKind::Readonly
            | TokenKind::Override => {
                if self.frame().kind == FrameKind::Paren && self.frame().ctor_params {
                    let span = self.tokens[i].span;
                    return Err(self.err(
                        span,
                        "constructor parameter properties have runtime semantics that type stripping cannot preserve",
                    ));
                }
                if self.frame().kind == FrameKind::ClassBody {
                    self.blank_token(i);
                    self.advance(kind);
                    return Ok(());
                }
            }

            TokenKind::Question => {
                // `a?: T` / optional parameter markers erase; anything
                // else is a conditional expression.
                if matches!(
                    self.peek(1),
                    TokenKind::Colon | TokenKind::Comma | TokenKind::RParen
                ) {
                    self.blank_token(i);
                } else {
                    self.frame_mut().ternary += 1;
                }
                self.advance(TokenKind::Question);
                return Ok(());
            }

            TokenKind::Bang => {
                // Postfix non-null assertion erases; prefix negation stays.
                if matches!(
                    self.prev,
                    Some(
                        TokenKind::Identifier
                            | TokenKind::RParen
                            | TokenKind::RBracket
                            | TokenKind::This
                            | TokenKind::StringLiteral
                            | TokenKind::NumberLiteral
                            | TokenKind::TemplateLiteral
                    )
                ) {
                    self.blank_token(i);
                }
                self.advance(TokenKind::Bang);
                return Ok(());
            }

            TokenKind::Colon => return self.handle_colon(),

            TokenKind::As | TokenKind::Satisfies => {
                if matches!(
                    self.prev,
                    Some(
                        TokenKind::Identifier
                            | TokenKind::RParen
                            | TokenKind::RBracket
                            | TokenKind::RBrace
                            | TokenKind::This
                            | TokenKind::StringLiteral
                            | TokenKind::NumberLiteral
                            | TokenKind::TemplateLiteral
                            | TokenKind::RegexLiteral
                            | TokenKind::True
                            | TokenKind::False
                            | TokenKind::Null
                            | TokenKind::Undefined
                    )
                ) {
                    let end = self.scan_type_expression(i + 1);
                    self.blank_tokens(i, end.max(i + 1));
                    self.i = end.max(i + 1);
                    return Ok(());
                }
            }

            TokenKind::Case if self.prev != Some(TokenKind::Dot) => {
                self.frame_mut().pending_case = true;
                self.advance(TokenKind::Case);
                return Ok(());
            }

            // `this` parameter: `function f(this: Foo, a)`: the whole
            // pseudo-parameter erases, trailing comma included.
            TokenKind::This
                if self.frame().kind == FrameKind::Paren
                    && self.prev == Some(TokenKind::LParen)
                    && self.peek(1) == &TokenKind::Colon =>
            {
                let mut end = self.scan_type_expression(i + 2).max(i + 2);
                if self.kind(end) == &TokenKind::Comma {
                    end += 1;
                }
                self.blank_tokens(i, end);
                self.i = end;
                return Ok(());
            }

            TokenKind::Identifier => {
                let in_class_body = self.frame().kind == FrameKind::ClassBody;
                if in_class_body && self.tokens[i].value == "constructor" {
                    self.prev_ctor = true;
                }
                // Type arguments: method type parameters `m<T>(...)` at a
                // member heading, and `f<T>(x)` / `new Map<K, V>()` call
                // sites when the bracketed run reads as types.
                if self.peek(1) == &TokenKind::Lt {
                    if let Some(end) = self.scan_angles(i + 1) {
                        if self.kind(end) == &TokenKind::LParen
                            && (in_class_body || self.angles_look_like_types(i + 2, end - 1))
                        {
                            self.blank_tokens(i + 1, end);
                            self.i = end;
                            self.prev = Some(TokenKind::Identifier);
                            return Ok(());
                        }
                    }
                }
            }

            TokenKind::LParen => {
                let mut frame = Frame::new(FrameKind::Paren);
                frame.ctor_params = was_ctor;
                self.frames.push(frame);
                self.advance(TokenKind::LParen);
                return Ok(());
            }
            TokenKind::RParen => {
                return self.pop_frame(FrameKind::Paren, ")");
            }
            TokenKind::LBracket => {
                self.frames.push(Frame::new(FrameKind::Bracket));
                self.advance(TokenKind::LBracket);
                return Ok(());
            }
            TokenKind::RBracket => {
                return self.pop_frame(FrameKind::Bracket, "]");
            }
            TokenKind::LBrace => {
                let frame_kind = if self.class_heading == Some(self.frames.len()) {
                    self.class_heading = None;
                    FrameKind::ClassBody
                } else if brace_is_object(self.prev.as_ref()) {
                    FrameKind::Object
                } else {
                    FrameKind::Block
                };
                self.frames.push(Frame::new(frame_kind));
                self.advance(TokenKind::LBrace);
                return Ok(());
            }
            TokenKind::RBrace => {
                let top = self.frames.last().map(|f| f.kind);
                match top {
                    Some(FrameKind::Block | FrameKind::Object | FrameKind::ClassBody) => {
                        self.frames.pop();
                        self.advance(TokenKind::RBrace);
                        return Ok(());
                    }
                    _ => {
                        let span = self.tokens[i].span;
                        return Err(self.err(span, "Unexpected '}'"));
                    }
                }
            }

            _ => {}
        }

        self.advance(kind);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Construct handlers
    // ------------------------------------------------------------------

    fn handle_import(&mut self) -> Result<(), TranspileError> {
        let start = self.i;

        // `import.meta` and `import(...)` pass through untouched.
        if matches!(self.peek(1), TokenKind::Dot | TokenKind::LParen) {
            self.advance(TokenKind::Import);
            return Ok(());
        }

        // `import "side-effect";`
        if self.peek(1) == &TokenKind::StringLiteral {
            let mut j = start + 2;
            if self.kind(j) == &TokenKind::Semicolon {
                j += 1;
            }
            self.i = j;
            self.prev = Some(TokenKind::Semicolon);
            return Ok(());
        }

        let type_only = self.import_is_type_only(start);
        let end = self.walk_import_clause(start + 1, !type_only);

        if type_only {
            self.blank_tokens(start, end);
        }
        self.i = end;
        self.prev = Some(TokenKind::Semicolon);
        Ok(())
    }

    fn handle_export(&mut self) -> Result<(), TranspileError> {
        let start = self.i;

        match self.peek(1) {
            // `export default`: keywords pass through; the expression is
            // handled by the main walk.
            TokenKind::Default => {
                self.i = start + 2;
                self.prev = Some(TokenKind::Default);
                Ok(())
            }

            // `export type {...}` is fully type-only.
            TokenKind::Type if self.peek(2) == &TokenKind::LBrace => {
                let end = self.walk_export_clause(start + 2, false);
                self.blank_tokens(start, end);
                self.i = end;
                self.prev = Some(TokenKind::Semicolon);
                Ok(())
            }

            // `export type X = ...` / `export interface` / `export declare`:
            // drop the keyword, the construct's own rule erases the rest.
            TokenKind::Type | TokenKind::Interface | TokenKind::Declare => {
                self.blank_token(start);
                self.i = start + 1;
                Ok(())
            }

            // `export { ... } [from "..."]`
            TokenKind::LBrace => {
                let end = self.walk_export_clause(start + 1, true);
                self.i = end;
                self.prev = Some(TokenKind::Semicolon);
                Ok(())
            }

            // `export * [as ns] from "..."`
            TokenKind::Star => {
                let mut j = start + 2;
                if self.kind(j) == &TokenKind::As {
                    j += 2;
                }
                if self.kind(j) == &TokenKind::From {
                    j += 1;
                    if self.kind(j) == &TokenKind::StringLiteral {
                        j += 1;
                    }
                    if self.kind(j) == &TokenKind::Semicolon {
                        j += 1;
                    }
                }
                self.i = j;
                self.prev = Some(TokenKind::Semicolon);
                Ok(())
            }

            // `export <decl>`: the declaration is handled normally.
            _ => {
                self.advance(TokenKind::Export);
                Ok(())
            }
        }
    }

    /// `import type ...` marker detection; `import type from "x"` binds a
    /// default named `type` and is not a marker.
    fn import_is_type_only(&self, start: usize) -> bool {
        if self.peek_at(start, 1) != &TokenKind::Type {
            return false;
        }
        match self.peek_at(start, 2) {
            TokenKind::LBrace | TokenKind::Star => true,
            TokenKind::From => self.peek_at(start, 3) != &TokenKind::StringLiteral,
            k => k.is_identifier_like(),
        }
    }

    /// Walk an import clause from just after `import` to the end of the
    /// statement, optionally blanking inline `type X` specifiers.
    fn walk_import_clause(&mut self, mut j: usize, blank_inline_types: bool) -> usize {
        let mut in_braces = false;
        loop {
            match self.kind(j) {
                TokenKind::LBrace => {
                    in_braces = true;
                    j += 1;
                }
                TokenKind::RBrace => {
                    in_braces = false;
                    j += 1;
                }
                TokenKind::Type if in_braces && self.peek_at(j, 1).is_identifier_like() => {
                    // `{ type Props, render }`: erase through the comma.
                    let mut k = j + 1;
                    if self.kind(k + 1) == &TokenKind::As {
                        k += 2;
                    }
                    if self.kind(k + 1) == &TokenKind::Comma {
                        k += 1;
                    }
                    if blank_inline_types {
                        self.blank_tokens(j, k + 1);
                    }
                    j = k + 1;
                }
                TokenKind::From => {
                    j += 1;
                    if self.kind(j) == &TokenKind::StringLiteral {
                        j += 1;
                    }
                    if self.kind(j) == &TokenKind::Semicolon {
                        j += 1;
                    }
                    return j;
                }
                TokenKind::Semicolon => return j + 1,
                TokenKind::Eof => return j,
                _ => j += 1,
            }
        }
    }

    /// Walk `{...} [from "..."] [;]` from the token after `export`.
    fn walk_export_clause(&mut self, mut j: usize, blank_inline_types: bool) -> usize {
        if self.kind(j) == &TokenKind::LBrace {
            j = self.walk_import_clause(j, blank_inline_types);
            return j;
        }
        j
    }

    fn handle_colon(&mut self) -> Result<(), TranspileError> {
        let i = self.i;

        if self.frame().ternary > 0 {
            self.frame_mut().ternary -= 1;
            self.advance(TokenKind::Colon);
            return Ok(());
        }
        if self.frame().pending_case || self.prev == Some(TokenKind::Default) {
            self.frame_mut().pending_case = false;
            self.advance(TokenKind::Colon);
            return Ok(());
        }
        // Object property colon, except a `)` before it, which means a
        // method return annotation.
        if self.frame().kind == FrameKind::Object && self.prev != Some(TokenKind::RParen) {
            self.advance(TokenKind::Colon);
            return Ok(());
        }

        let end = self.scan_type_expression(i + 1).max(i + 1);
        self.blank_tokens(i, end);
        self.i = end;
        Ok(())
    }

    fn handle_function(&mut self) -> Result<(), TranspileError> {
        let i = self.i;
        let mut j = i + 1;
        if self.kind(j) == &TokenKind::Star {
            j += 1;
        }
        if self.kind(j).is_identifier_like() {
            j += 1;
        }
        if self.kind(j) == &TokenKind::Lt {
            if let Some(end) = self.scan_angles(j) {
                self.blank_tokens(j, end);
                self.i = end;
                self.prev = Some(TokenKind::Identifier);
                return Ok(());
            }
        }
        self.advance(TokenKind::Function);
        Ok(())
    }

    fn is_interface_decl(&self) -> bool {
        self.prev != Some(TokenKind::Dot)
            && self.prev != Some(TokenKind::QuestionDot)
            && self.peek(1).is_identifier_like()
    }

    fn is_type_alias(&self) -> bool {
        self.prev != Some(TokenKind::Dot)
            && self.peek(1).is_identifier_like()
            && matches!(self.peek(2), TokenKind::Eq | TokenKind::Lt)
    }

    fn is_declare_statement(&self) -> bool {
        self.prev != Some(TokenKind::Dot)
            && matches!(
                self.peek(1),
                TokenKind::Const
                    | TokenKind::Let
                    | TokenKind::Var
                    | TokenKind::Function
                    | TokenKind::Class
                    | TokenKind::Enum
                    | TokenKind::Namespace
                    | TokenKind::Module
                    | TokenKind::Async
                    | TokenKind::Abstract
                    | TokenKind::Interface
                    | TokenKind::Type
                    | TokenKind::Identifier
            )
    }

    fn is_namespace_decl(&self) -> bool {
        self.prev != Some(TokenKind::Dot)
            && (self.peek(1).is_identifier_like() || self.peek(1) == &TokenKind::StringLiteral)
            && matches!(self.peek(2), TokenKind::LBrace | TokenKind::Dot)
    }

    /// Erase `interface X [<...>] [extends ...] { ... }` wholesale.
    fn erase_interface(&mut self) -> Result<(), TranspileError> {
        let start = self.i;
        let mut angle = 0isize;
        let mut j = start + 1;

        loop {
            match self.kind(j) {
                TokenKind::Lt => angle += 1,
                TokenKind::LtLt => angle += 2,
                TokenKind::Gt => angle -= 1,
                TokenKind::GtGt => angle -= 2,
                TokenKind::GtGtGt => angle -= 3,
                TokenKind::LBrace if angle <= 0 => break,
                TokenKind::Eof => {
                    let span = self.tokens[j].span;
                    return Err(self.err(span, "Unexpected end of file in interface declaration"));
                }
                _ => {}
            }
            j += 1;
        }

        let end = self.skip_balanced_braces(j)?;
        self.blank_tokens(start, end);
        self.i = end;
        Ok(())
    }

    /// Erase a `type X = ...;` alias through its terminating semicolon.
    fn erase_through_statement(&mut self) -> Result<(), TranspileError> {
        let start = self.i;
        let mut j = start + 1;
        let mut paren = 0usize;
        let mut bracket = 0usize;
        let mut brace = 0usize;
        let mut angle = 0isize;

        loop {
            let depth0 = paren == 0 && bracket == 0 && brace == 0 && angle <= 0;
            match self.kind(j) {
                TokenKind::LParen => paren += 1,
                TokenKind::RParen => paren = paren.saturating_sub(1),
                TokenKind::LBracket => bracket += 1,
                TokenKind::RBracket => bracket = bracket.saturating_sub(1),
                TokenKind::LBrace => brace += 1,
                TokenKind::RBrace => brace = brace.saturating_sub(1),
                TokenKind::Lt => angle += 1,
                TokenKind::LtLt => angle += 2,
                TokenKind::Gt => angle -= 1,
                TokenKind::GtGt => angle -= 2,
                TokenKind::GtGtGt => angle -= 3,
                TokenKind::Semicolon if depth0 => {
                    j += 1;
                    break;
                }
                // `type T = import("./x").Foo` stays inside the alias;
                // a bare `import` means the next statement started.
                TokenKind::Import if depth0 && self.kind(j + 1) == &TokenKind::LParen => {}
                TokenKind::Export
                | TokenKind::Import
                | TokenKind::Const
                | TokenKind::Let
                | TokenKind::Var
                | TokenKind::Function
                | TokenKind::Class
                | TokenKind::Interface
                | TokenKind::Return
                | TokenKind::If
                | TokenKind::For
                | TokenKind::While
                    if depth0 && j > start + 2 =>
                {
                    break;
                }
                TokenKind::Eof => break,
                _ => {}
            }
            j += 1;
        }

        self.blank_tokens(start, j);
        self.i = j;
        Ok(())
    }

    /// Erase a `declare ...` statement: through `;`, or through the
    /// balanced block for `declare module`/`declare global` forms.
    fn erase_declare(&mut self) -> Result<(), TranspileError> {
        let start = self.i;
        let mut j = start + 1;
        let mut paren = 0usize;
        let mut bracket = 0usize;

        loop {
            match self.kind(j) {
                TokenKind::LParen => paren += 1,
                TokenKind::RParen => paren = paren.saturating_sub(1),
                TokenKind::LBracket => bracket += 1,
                TokenKind::RBracket => bracket = bracket.saturating_sub(1),
                TokenKind::LBrace if paren == 0 && bracket == 0 => {
                    j = self.skip_balanced_braces(j)?;
                    break;
                }
                TokenKind::Semicolon if paren == 0 && bracket == 0 => {
                    j += 1;
                    break;
                }
                TokenKind::Eof => break,
                _ => {}
            }
            j += 1;
        }

        self.blank_tokens(start, j);
        self.i = j;
        Ok(())
    }

    /// Erase `implements A, B<C>` up to the class body brace.
    fn erase_implements(&mut self) -> Result<(), TranspileError> {
        let start = self.i;
        let mut angle = 0isize;
        let mut j = start + 1;

        loop {
            match self.kind(j) {
                TokenKind::Lt => angle += 1,
                TokenKind::LtLt => angle += 2,
                TokenKind::Gt => angle -= 1,
                TokenKind::GtGt => angle -= 2,
                TokenKind::GtGtGt => angle -= 3,
                TokenKind::LBrace if angle <= 0 => break,
                TokenKind::Eof => break,
                _ => {}
            }
            j += 1;
        }

        self.blank_tokens(start, j);
        self.i = j;
        Ok(())
    }

    /// Erase an `abstract` class member through its semicolon.
    fn erase_abstract_member(&mut self) -> Result<(), TranspileError> {
        let start = self.i;
        let mut j = start + 1;
        let mut paren = 0usize;
        let mut bracket = 0usize;
        let mut angle = 0isize;

        loop {
            match self.kind(j) {
                TokenKind::LParen => paren += 1,
                TokenKind::RParen => paren = paren.saturating_sub(1),
                TokenKind::LBracket => bracket += 1,
                TokenKind::RBracket => bracket = bracket.saturating_sub(1),
                TokenKind::Lt => angle += 1,
                TokenKind::Gt => angle -= 1,
                TokenKind::Semicolon if paren == 0 && bracket == 0 && angle <= 0 => {
                    j += 1;
                    break;
                }
                TokenKind::RBrace if paren == 0 && bracket == 0 => break,
                TokenKind::Eof => break,
                _ => {}
            }
            j += 1;
        }

        self.blank_tokens(start, j);
        self.i = j;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Scanners
    // ------------------------------------------------------------------

    /// Scan a type expression starting at `start`, returning the index of
    /// the first token that is not part of it. Balances all brackets;
    /// at the top level it stops where an annotation must end (`=`, `,`,
    /// `;`, closers, a function body `{`, or an arrow that is not part of
    /// a function type).
    fn scan_type_expression(&self, start: usize) -> usize {
        let mut paren = 0usize;
        let mut bracket = 0usize;
        let mut brace = 0usize;
        let mut angle = 0isize;
        let mut cond = 0usize;
        let mut expecting = true;
        let mut prev_rparen = false;
        let mut j = start;

        loop {
            let depth0 = paren == 0 && bracket == 0 && brace == 0 && angle <= 0;
            let t = self.kind(j);

            match t {
                TokenKind::Eof => return j,

                TokenKind::LParen => {
                    paren += 1;
                    expecting = true;
                }
                TokenKind::RParen => {
                    if paren == 0 {
                        return j;
                    }
                    paren -= 1;
                    expecting = false;
                }
                TokenKind::LBracket => {
                    bracket += 1;
                    expecting = true;
                }
                TokenKind::RBracket => {
                    if bracket == 0 {
                        return j;
                    }
                    bracket -= 1;
                    expecting = false;
                }
                TokenKind::LBrace => {
                    // An object type is only legal where an operand is
                    // expected; otherwise this brace opens a body.
                    if depth0 && !expecting {
                        return j;
                    }
                    brace += 1;
                    expecting = true;
                }
                TokenKind::RBrace => {
                    if brace == 0 {
                        return j;
                    }
                    brace -= 1;
                    expecting = false;
                }
                TokenKind::Lt => {
                    angle += 1;
                    expecting = true;
                }
                TokenKind::LtLt => {
                    angle += 2;
                    expecting = true;
                }
                TokenKind::Gt => {
                    if angle <= 0 {
                        return j;
                    }
                    angle -= 1;
                    expecting = false;
                }
                TokenKind::GtGt => {
                    if angle <= 0 {
                        return j;
                    }
                    angle -= 2;
                    expecting = false;
                }
                TokenKind::GtGtGt => {
                    if angle <= 0 {
                        return j;
                    }
                    angle -= 3;
                    expecting = false;
                }

                TokenKind::Comma | TokenKind::Semicolon | TokenKind::Eq => {
                    if depth0 {
                        return j;
                    }
                    expecting = true;
                }
                TokenKind::Arrow => {
                    // `(a: b) => c` is a function type; an arrow after a
                    // plain type name belongs to the enclosing arrow
                    // function (`(): T => body`).
                    if depth0 && !prev_rparen {
                        return j;
                    }
                    expecting = true;
                }
                TokenKind::Question => {
                    if depth0 {
                        cond += 1;
                    }
                    expecting = true;
                }
                TokenKind::Colon => {
                    if depth0 {
                        if cond == 0 {
                            return j;
                        }
                        cond -= 1;
                    }
                    expecting = true;
                }

                TokenKind::Pipe
                | TokenKind::Amp
                | TokenKind::Dot
                | TokenKind::DotDotDot
                | TokenKind::Extends
                | TokenKind::Keyof
                | TokenKind::Typeof
                | TokenKind::Infer
                | TokenKind::Readonly
                | TokenKind::New
                | TokenKind::Is
                | TokenKind::In
                | TokenKind::Minus => {
                    expecting = true;
                }

                TokenKind::Identifier
                | TokenKind::StringLiteral
                | TokenKind::NumberLiteral
                | TokenKind::TemplateLiteral
                | TokenKind::Null
                | TokenKind::Undefined
                | TokenKind::True
                | TokenKind::False
                | TokenKind::Void
                | TokenKind::This
                | TokenKind::Const => {
                    if depth0 && !expecting {
                        return j;
                    }
                    expecting = false;
                }

                k if k.is_identifier_like() => {
                    if depth0 && !expecting {
                        return j;
                    }
                    expecting = false;
                }

                _ => {
                    if depth0 {
                        return j;
                    }
                }
            }

            prev_rparen = t == &TokenKind::RParen;
            j += 1;
        }
    }

    /// Balance a `<...>` group starting at a `Lt`, returning the index
    /// just past the matching closer. `None` when the stream ends first
    /// or the group cannot be a type parameter list.
    fn scan_angles(&self, start: usize) -> Option<usize> {
        let mut angle = 0isize;
        let mut paren = 0usize;
        let mut brace = 0usize;
        let mut bracket = 0usize;
        let mut j = start;

        loop {
            match self.kind(j) {
                TokenKind::Lt => angle += 1,
                TokenKind::LtLt => angle += 2,
                TokenKind::Gt => angle -= 1,
                TokenKind::GtGt => angle -= 2,
                TokenKind::GtGtGt => angle -= 3,
                TokenKind::LParen => paren += 1,
                TokenKind::RParen => {
                    if paren == 0 {
                        return None;
                    }
                    paren -= 1;
                }
                TokenKind::LBrace => brace += 1,
                TokenKind::RBrace => {
                    if brace == 0 {
                        return None;
                    }
                    brace -= 1;
                }
                TokenKind::LBracket => bracket += 1,
                TokenKind::RBracket => {
                    if bracket == 0 {
                        return None;
                    }
                    bracket -= 1;
                }
                TokenKind::Semicolon | TokenKind::Eof => return None,
                _ => {}
            }
            j += 1;
            if angle <= 0 {
                return Some(j);
            }
        }
    }

    /// Whether tokens `[from, to)` could form a type-argument list rather
    /// than chained comparisons. Expression-only operators disqualify the
    /// run; `a < b > (c)` with a lone identifier inside stays ambiguous
    /// and is treated as type arguments, matching what erasure-only
    /// transpilers do.
    fn angles_look_like_types(&self, from: usize, to: usize) -> bool {
        self.tokens[from..to].iter().all(|t| {
            matches!(
                t.kind,
                TokenKind::Identifier
                    | TokenKind::StringLiteral
                    | TokenKind::NumberLiteral
                    | TokenKind::TemplateLiteral
                    | TokenKind::Dot
                    | TokenKind::Comma
                    | TokenKind::Lt
                    | TokenKind::LtLt
                    | TokenKind::Gt
                    | TokenKind::GtGt
                    | TokenKind::GtGtGt
                    | TokenKind::LBracket
                    | TokenKind::RBracket
                    | TokenKind::LBrace
                    | TokenKind::RBrace
                    | TokenKind::LParen
                    | TokenKind::RParen
                    | TokenKind::Colon
                    | TokenKind::Question
                    | TokenKind::Pipe
                    | TokenKind::Amp
                    | TokenKind::Arrow
                    | TokenKind::DotDotDot
                    | TokenKind::Minus
                    | TokenKind::Eq
                    | TokenKind::Keyof
                    | TokenKind::Typeof
                    | TokenKind::Infer
                    | TokenKind::Extends
                    | TokenKind::Readonly
                    | TokenKind::New
                    | TokenKind::Null
                    | TokenKind::Undefined
                    | TokenKind::True
                    | TokenKind::False
                    | TokenKind::Void
                    | TokenKind::This
                    | TokenKind::In
                    | TokenKind::Is
                    | TokenKind::Const
            ) || t.kind.is_identifier_like()
        })
    }

    /// Skip a balanced `{ ... }` group starting at its `{`, returning the
    /// index just past the matching `}`.
    fn skip_balanced_braces(&self, start: usize) -> Result<usize, TranspileError> {
        let mut depth = 0usize;
        let mut j = start;

        loop {
            match self.kind(j) {
                TokenKind::LBrace => depth += 1,
                TokenKind::RBrace => {
                    depth -= 1;
                    if depth == 0 {
                        return Ok(j + 1);
                    }
                }
                TokenKind::Eof => {
                    let span = self.tokens[j].span;
                    return Err(self.err(span, "Unexpected end of file"));
                }
                _ => {}
            }
            j += 1;
        }
    }

    // ------------------------------------------------------------------
    // Small helpers
    // ------------------------------------------------------------------

    fn kind(&self, i: usize) -> &TokenKind {
        &self.tokens[i.min(self.tokens.len() - 1)].kind
    }

    fn peek(&self, n: usize) -> &TokenKind {
        self.kind(self.i + n)
    }

    fn peek_at(&self, base: usize, n: usize) -> &TokenKind {
        self.kind(base + n)
    }

    fn frame(&self) -> &Frame {
        self.frames.last().expect("frame stack has a root")
    }

    fn frame_mut(&mut self) -> &mut Frame {
        self.frames.last_mut().expect("frame stack has a root")
    }

    fn advance(&mut self, kind: TokenKind) {
        self.prev = Some(kind);
        self.i += 1;
    }

    fn pop_frame(&mut self, expected: FrameKind, close: &str) -> Result<(), TranspileError> {
        if self.frames.last().map(|f| f.kind) == Some(expected) {
            self.frames.pop();
            self.advance(if expected == FrameKind::Paren {
                TokenKind::RParen
            } else {
                TokenKind::RBracket
            });
            Ok(())
        } else {
            let span = self.tokens[self.i].span;
            Err(self.err(span, format!("Unexpected '{}'", close)))
        }
    }

    fn blank_token(&mut self, i: usize) {
        let span = self.tokens[i].span;
        self.blanks.push((span.start, span.end));
    }

    /// Blank the byte range covered by tokens `[from, to)`.
    fn blank_tokens(&mut self, from: usize, to: usize) {
        if to <= from {
            return;
        }
        let start = self.tokens[from].span.start;
        let end = self.tokens[to - 1].span.end;
        self.blanks.push((start, end));
    }

    fn err(&self, span: Span, message: impl Into<String>) -> TranspileError {
        located(self.path, self.index, span, message.into())
    }
}

/// Does a `{` after this token open an object literal (or binding
/// pattern) rather than a block?
fn brace_is_object(prev: Option<&TokenKind>) -> bool {
    matches!(
        prev,
        Some(
            TokenKind::Eq
                | TokenKind::LParen
                | TokenKind::LBracket
                | TokenKind::Comma
                | TokenKind::Colon
                | TokenKind::Return
                | TokenKind::Throw
                | TokenKind::Const
                | TokenKind::Let
                | TokenKind::Var
                | TokenKind::Default
                | TokenKind::Case
                | TokenKind::Question
                | TokenKind::DotDotDot
                | TokenKind::Await
                | TokenKind::Yield
                | TokenKind::In
                | TokenKind::Of
                | TokenKind::Typeof
                | TokenKind::Instanceof
                | TokenKind::New
                | TokenKind::Plus
                | TokenKind::Minus
                | TokenKind::Star
                | TokenKind::Slash
                | TokenKind::Percent
                | TokenKind::EqEq
                | TokenKind::EqEqEq
                | TokenKind::BangEq
                | TokenKind::BangEqEq
                | TokenKind::AmpAmp
                | TokenKind::PipePipe
                | TokenKind::QuestionQuestion
                | TokenKind::Amp
                | TokenKind::Pipe
                | TokenKind::Caret
                | TokenKind::Bang
                | TokenKind::Tilde
                | TokenKind::PlusEq
                | TokenKind::MinusEq
                | TokenKind::StarEq
                | TokenKind::SlashEq
                | TokenKind::PercentEq
                | TokenKind::AmpEq
                | TokenKind::PipeEq
                | TokenKind::CaretEq
                | TokenKind::AmpAmpEq
                | TokenKind::PipePipeEq
                | TokenKind::QuestionQuestionEq
        )
    )
}

/// Overwrite the collected ranges with spaces, preserving newlines so
/// every surviving byte keeps its line and column.
fn blank_ranges(source: &str, ranges: &[(usize, usize)]) -> String {
    let mut bytes = source.as_bytes().to_vec();
    let len = bytes.len();
    for &(start, end) in ranges {
        for b in &mut bytes[start..end.min(len)] {
            if *b != b'\n' && *b != b'\r' {
                *b = b' ';
            }
        }
    }
    String::from_utf8_lossy(&bytes).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn strip(source: &str) -> String {
        strip_types(source, Path::new("test.ts")).unwrap()
    }

    fn strip_err(source: &str) -> TranspileError {
        strip_types(source, Path::new("test.ts")).unwrap_err()
    }

    #[test]
    fn test_plain_js_is_unchanged() {
        let source = "const a = { b: 1, c: x ? y : z };\nfunction f(d) { return d / 2; }\n";
        assert_eq!(strip(source), source);
    }

    #[test]
    fn test_variable_annotation() {
        assert_eq!(strip("let count: number = 0;"), "let count         = 0;");
    }

    #[test]
    fn test_parameter_and_return_annotations() {
        assert_eq!(
            strip("function add(a: number, b: number): number { return a + b; }"),
            "function add(a        , b        )         { return a + b; }"
        );
    }

    #[test]
    fn test_optional_parameter() {
        assert_eq!(strip("function f(a?: string) {}"), "function f(a         ) {}");
    }

    #[test]
    fn test_interface_is_erased() {
        let source = "interface Point {\n  x: number;\n  y: number;\n}\nconst p = { x: 1, y: 2 };";
        let expected = "                 \n            \n            \n \nconst p = { x: 1, y: 2 };";
        assert_eq!(strip(source), expected);
    }

    #[test]
    fn test_type_alias_is_erased() {
        assert_eq!(
            strip("type Pair = [number, number];\nlet p = [1, 2];"),
            "                             \nlet p = [1, 2];"
        );
    }

    #[test]
    fn test_as_and_satisfies_are_erased() {
        assert_eq!(strip("const n = value as number;"), "const n = value          ;");
        assert_eq!(strip("const c = cfg satisfies Config;"), "const c = cfg                 ;");
        assert_eq!(strip("const t = [1, 2] as const;"), "const t = [1, 2]         ;");
    }

    #[test]
    fn test_non_null_assertion_is_erased() {
        assert_eq!(strip("const el = query()!;"), "const el = query() ;");
        // Prefix negation stays.
        assert_eq!(strip("const no = !flag;"), "const no = !flag;");
    }

    #[test]
    fn test_function_generics_are_erased() {
        assert_eq!(
            strip("function id<T>(value: T): T { return value; }"),
            "function id   (value   )    { return value; }"
        );
    }

    #[test]
    fn test_call_site_type_arguments_are_erased() {
        assert_eq!(
            strip("const m = new Map<string, number>();"),
            "const m = new Map                ();"
        );
        assert_eq!(strip("const r = parse<Config>(raw);"), "const r = parse        (raw);");
    }

    #[test]
    fn test_class_heading_and_members() {
        let source = "class Store<T> extends Base<T> implements Readable {\n  private items: T[] = [];\n  readonly limit = 10;\n}";
        let stripped = strip(source);
        assert!(!stripped.contains("<T>"));
        assert!(!stripped.contains("implements"));
        assert!(!stripped.contains("private"));
        assert!(!stripped.contains("readonly"));
        assert!(!stripped.contains(": T[]"));
        assert!(stripped.contains("items"));
        assert!(stripped.contains("limit = 10;"));
        assert!(stripped.contains("extends Base"));
    }

    #[test]
    fn test_abstract_member_is_erased() {
        let source = "abstract class Shape {\n  abstract area(): number;\n  describe() { return this.area(); }\n}";
        let stripped = strip(source);
        assert!(!stripped.contains("abstract"));
        assert!(!stripped.contains("area(): number;"));
        assert!(stripped.contains("describe() { return this.area(); }"));
    }

    #[test]
    fn test_this_parameter_is_erased() {
        assert_eq!(
            strip("function tag(this: Element, name) { return name; }"),
            "function tag(               name) { return name; }"
        );
    }

    #[test]
    fn test_import_type_is_erased() {
        assert_eq!(
            strip("import type { Options } from './options';\nconst o = 1;"),
            "                                         \nconst o = 1;"
        );
    }

    #[test]
    fn test_inline_type_specifier_is_erased() {
        let stripped = strip("import { type Props, render } from './view';");
        assert!(!stripped.contains("Props"));
        assert!(stripped.contains("render"));
        assert!(stripped.contains("from './view'"));
    }

    #[test]
    fn test_value_import_is_untouched() {
        let source = "import app, { render as r } from './app';";
        assert_eq!(strip(source), source);
    }

    #[test]
    fn test_declare_statement_is_erased() {
        assert_eq!(
            strip("declare const VERSION: string;\nconst v = 1;"),
            "                              \nconst v = 1;"
        );
    }

    #[test]
    fn test_object_literal_colons_survive() {
        let source = "const style = { color: 'red', size: 12 };";
        assert_eq!(strip(source), source);
    }

    #[test]
    fn test_ternary_colons_survive() {
        let source = "const v = ok ? left : right;";
        assert_eq!(strip(source), source);
        let nested = "const w = a ? b : c ? d : e;";
        assert_eq!(strip(nested), nested);
    }

    #[test]
    fn test_case_labels_survive() {
        let source = "switch (k) {\n  case 1:\n    break;\n  default:\n    break;\n}";
        assert_eq!(strip(source), source);
    }

    #[test]
    fn test_object_method_return_annotation_is_erased() {
        assert_eq!(
            strip("const api = { get(): number { return 1; } };"),
            "const api = { get()         { return 1; } };"
        );
    }

    #[test]
    fn test_enum_is_rejected() {
        let err = strip_err("const a = 1;\nenum Direction { Up, Down }");
        assert_eq!(err.line, 2);
        assert_eq!(err.column, 1);
        assert!(err.message.contains("enum"));
    }

    #[test]
    fn test_namespace_is_rejected() {
        let err = strip_err("namespace Util { export const x = 1; }");
        assert!(err.message.contains("namespace"));
    }

    #[test]
    fn test_parameter_property_is_rejected() {
        let err = strip_err("class Box {\n  constructor(private width: number) {}\n}");
        assert_eq!(err.line, 2);
        assert!(err.message.contains("parameter properties"));
    }

    #[test]
    fn test_module_exports_is_not_a_namespace() {
        let source = "module.exports = { a: 1 };";
        assert_eq!(strip(source), source);
    }

    #[test]
    fn test_syntax_error_has_location() {
        let err = strip_err("const a = 1;\nconst b = 'open\n");
        assert_eq!(err.line, 2);
        assert_eq!(err.column, 11);
        assert!(err.message.contains("Unterminated string"));
    }

    #[test]
    fn test_unbalanced_braces_are_rejected() {
        assert!(strip_types("function f() {", Path::new("t.ts")).is_err());
        assert!(strip_types("}", Path::new("t.ts")).is_err());
    }

    #[test]
    fn test_output_is_deterministic() {
        let source = "interface I { a: number }\nexport const f = (x: number): number => x!;\n";
        let first = strip(source);
        let second = strip(source);
        assert_eq!(first, second);
    }

    #[test]
    fn test_line_structure_is_preserved() {
        let source = "interface I {\n  a: number;\n}\nconst k: number = 1;\n";
        let stripped = strip(source);
        assert_eq!(stripped.len(), source.len());
        let lines: Vec<usize> = source
            .char_indices()
            .filter(|(_, c)| *c == '\n')
            .map(|(i, _)| i)
            .collect();
        let stripped_lines: Vec<usize> = stripped
            .char_indices()
            .filter(|(_, c)| *c == '\n')
            .map(|(i, _)| i)
            .collect();
        assert_eq!(lines, stripped_lines);
    }

    #[test]
    fn test_generic_constraints_and_defaults() {
        let stripped = strip("function pick<T extends object, K = keyof T>(obj: T, key: K) { return obj[key]; }");
        assert!(!stripped.contains("extends"));
        assert!(!stripped.contains("keyof"));
        assert!(stripped.contains("(obj   , key   )"));
    }

    #[test]
    fn test_function_type_annotation() {
        assert_eq!(
            strip("let cb: (e: Event) => void = handler;"),
            "let cb                     = handler;"
        );
    }

    #[test]
    fn test_arrow_return_annotation() {
        assert_eq!(
            strip("const dbl = (n: number): number => n * 2;"),
            "const dbl = (n        )         => n * 2;"
        );
    }

    #[test]
    fn test_conditional_type_in_alias() {
        let stripped = strip("type R = A extends B ? C : D;\nconst x = 1;");
        assert!(stripped.contains("const x = 1;"));
        assert!(!stripped.contains("extends"));
    }

    #[test]
    fn test_definite_assignment_is_erased() {
        assert_eq!(strip("let ready!: boolean;"), "let ready          ;");
    }
}
