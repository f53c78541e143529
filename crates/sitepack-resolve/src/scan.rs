//! Import/export extraction from a module's token stream.
//!
//! A full parse is unnecessary here: `import` and `export` are reserved
//! words, so a linear scan that understands clause shapes finds every
//! static import, re-export, and literal dynamic `import()` without
//! building an AST. Comments and string contents never reach this level,
//! the lexer already discarded them.

use sitepack_graph::{
    ExportKind, ExportRef, ImportClause, ImportRef, NamedBinding, Span, SpecifierRef,
};
use sitepack_lexer::{Token, TokenKind};

/// Extract import and export references from a tokenized module, in
/// source order.
pub fn scan_module(tokens: &[Token]) -> (Vec<ImportRef>, Vec<ExportRef>) {
    let mut cursor = Cursor::new(tokens);
    let mut imports = Vec::new();
    let mut exports = Vec::new();

    while !cursor.at(&TokenKind::Eof) {
        match cursor.kind() {
            TokenKind::Import => parse_import(&mut cursor, &mut imports),
            TokenKind::Export => parse_export(&mut cursor, &mut exports),
            _ => {
                cursor.bump();
            }
        }
    }

    (imports, exports)
}

struct Cursor<'a> {
    tokens: &'a [Token],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(tokens: &'a [Token]) -> Self {
        Self { tokens, pos: 0 }
    }

    fn current(&self) -> &Token {
        // The lexer always terminates the stream with Eof.
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn kind(&self) -> &TokenKind {
        &self.current().kind
    }

    fn peek_kind(&self, n: usize) -> &TokenKind {
        let idx = (self.pos + n).min(self.tokens.len() - 1);
        &self.tokens[idx].kind
    }

    fn at(&self, kind: &TokenKind) -> bool {
        self.kind() == kind
    }

    fn bump(&mut self) -> &Token {
        let token = &self.tokens[self.pos.min(self.tokens.len() - 1)];
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        token
    }
}

/// A token usable as a name inside an import/export clause. Contextual
/// keywords and `default` qualify; `import { default as d }` is legal.
fn clause_name(token: &Token) -> Option<String> {
    if token.kind.is_identifier_like()
        || token.kind == TokenKind::Default
        || token.kind == TokenKind::StringLiteral
    {
        Some(token.value.clone())
    } else {
        None
    }
}

fn parse_import(cursor: &mut Cursor, imports: &mut Vec<ImportRef>) {
    let start = cursor.current().span;
    cursor.bump(); // import

    // `import.meta`: not an import reference.
    if cursor.at(&TokenKind::Dot) {
        return;
    }

    // `import("...")`: dynamic import with a literal specifier.
    if cursor.at(&TokenKind::LParen) {
        if cursor.peek_kind(1) == &TokenKind::StringLiteral
            && cursor.peek_kind(2) == &TokenKind::RParen
        {
            cursor.bump(); // (
            let lit = cursor.bump().clone();
            let close = cursor.bump().span; // )
            imports.push(ImportRef {
                span: start.merge(&close),
                specifier: lit.value,
                specifier_span: lit.span,
                clause: ImportClause::default(),
                dynamic: true,
                type_only: false,
                resolved: None,
            });
        }
        return;
    }

    // `import "side-effect";`
    if cursor.at(&TokenKind::StringLiteral) {
        let lit = cursor.bump().clone();
        let end = maybe_semicolon(cursor).unwrap_or(lit.span);
        imports.push(ImportRef {
            span: start.merge(&end),
            specifier: lit.value,
            specifier_span: lit.span,
            clause: ImportClause::default(),
            dynamic: false,
            type_only: false,
            resolved: None,
        });
        return;
    }

    // `import type ...`: but `import type from "x"` binds a default
    // named `type`, so `type` followed by `from "..."` is not a marker.
    let mut type_only = false;
    if cursor.at(&TokenKind::Type) {
        let next = cursor.peek_kind(1);
        let marker = match next {
            TokenKind::LBrace | TokenKind::Star => true,
            TokenKind::From => cursor.peek_kind(2) != &TokenKind::StringLiteral,
            k => k.is_identifier_like(),
        };
        if marker {
            type_only = true;
            cursor.bump();
        }
    }

    let mut clause = ImportClause::default();

    // Default binding
    if let Some(name) = clause_name(cursor.current()) {
        if cursor.kind() != &TokenKind::StringLiteral {
            clause.default = Some(name);
            cursor.bump();
            if cursor.at(&TokenKind::Comma) {
                cursor.bump();
            }
        }
    }

    // Namespace or named bindings
    if cursor.at(&TokenKind::Star) {
        cursor.bump();
        if !cursor.at(&TokenKind::As) {
            return;
        }
        cursor.bump();
        match clause_name(cursor.current()) {
            Some(name) => {
                clause.namespace = Some(name);
                cursor.bump();
            }
            None => return,
        }
    } else if cursor.at(&TokenKind::LBrace) {
        cursor.bump();
        match parse_named_bindings(cursor) {
            Some(bindings) => clause.named = bindings,
            None => return,
        }
    }

    if !cursor.at(&TokenKind::From) {
        return;
    }
    cursor.bump();

    if !cursor.at(&TokenKind::StringLiteral) {
        return;
    }
    let lit = cursor.bump().clone();
    let end = maybe_semicolon(cursor).unwrap_or(lit.span);

    imports.push(ImportRef {
        span: start.merge(&end),
        specifier: lit.value,
        specifier_span: lit.span,
        clause,
        dynamic: false,
        type_only,
        resolved: None,
    });
}

fn parse_export(cursor: &mut Cursor, exports: &mut Vec<ExportRef>) {
    let start = cursor.current().span;
    cursor.bump(); // export

    match cursor.kind() {
        // `export default <expr>`: only the keywords are recorded; the
        // expression stays untouched for the linker.
        TokenKind::Default => {
            let keyword_span = start.merge(&cursor.bump().span);
            exports.push(ExportRef {
                span: keyword_span,
                kind: ExportKind::Default { keyword_span },
            });
        }

        // `export { ... }` / `export type { ... }`, optionally `from`.
        TokenKind::LBrace | TokenKind::Type => {
            let type_only = cursor.at(&TokenKind::Type);
            if type_only {
                if cursor.peek_kind(1) != &TokenKind::LBrace {
                    // `export type X = ...`: erased by the stripper.
                    return;
                }
                cursor.bump();
            }
            cursor.bump(); // {
            let Some(bindings) = parse_named_bindings(cursor) else {
                return;
            };

            let mut from = None;
            let mut end = cursor.tokens[cursor.pos.saturating_sub(1)].span;
            if cursor.at(&TokenKind::From) {
                cursor.bump();
                if !cursor.at(&TokenKind::StringLiteral) {
                    return;
                }
                let lit = cursor.bump().clone();
                end = lit.span;
                from = Some(SpecifierRef {
                    specifier: lit.value,
                    span: lit.span,
                    resolved: None,
                });
            }
            if let Some(semi) = maybe_semicolon(cursor) {
                end = semi;
            }

            exports.push(ExportRef {
                span: start.merge(&end),
                kind: ExportKind::Named {
                    bindings,
                    from,
                    type_only,
                },
            });
        }

        // `export * from "..."` / `export * as ns from "..."`.
        TokenKind::Star => {
            cursor.bump();
            let mut namespace = None;
            if cursor.at(&TokenKind::As) {
                cursor.bump();
                match clause_name(cursor.current()) {
                    Some(name) => {
                        namespace = Some(name);
                        cursor.bump();
                    }
                    None => return,
                }
            }
            if !cursor.at(&TokenKind::From) {
                return;
            }
            cursor.bump();
            if !cursor.at(&TokenKind::StringLiteral) {
                return;
            }
            let lit = cursor.bump().clone();
            let end = maybe_semicolon(cursor).unwrap_or(lit.span);

            exports.push(ExportRef {
                span: start.merge(&end),
                kind: ExportKind::Star {
                    namespace,
                    from: SpecifierRef {
                        specifier: lit.value,
                        span: lit.span,
                        resolved: None,
                    },
                },
            });
        }

        // `export const/let/var/function/class ...`: record the declared
        // names but leave the declaration itself to the main scan so that
        // dynamic imports inside initializers are still discovered.
        TokenKind::Const | TokenKind::Let | TokenKind::Var => {
            cursor.bump();
            let names = lookahead_declarator_names(cursor);
            exports.push(ExportRef {
                span: start,
                kind: ExportKind::Decl {
                    keyword_span: start,
                    names,
                },
            });
        }
        TokenKind::Function | TokenKind::Class => {
            let names = lookahead_decl_name(cursor);
            exports.push(ExportRef {
                span: start,
                kind: ExportKind::Decl {
                    keyword_span: start,
                    names,
                },
            });
        }
        TokenKind::Async if cursor.peek_kind(1) == &TokenKind::Function => {
            cursor.bump();
            let names = lookahead_decl_name(cursor);
            exports.push(ExportRef {
                span: start,
                kind: ExportKind::Decl {
                    keyword_span: start,
                    names,
                },
            });
        }
        TokenKind::Abstract if cursor.peek_kind(1) == &TokenKind::Class => {
            cursor.bump();
            let names = lookahead_decl_name(cursor);
            exports.push(ExportRef {
                span: start,
                kind: ExportKind::Decl {
                    keyword_span: start,
                    names,
                },
            });
        }

        // `export interface/type/declare/enum/namespace ...`: type-only
        // or rejected later; nothing to record for linking.
        _ => {}
    }
}

/// Parse `{ a, b as c, type D }` binding lists; the cursor sits just past
/// the opening brace. Returns `None` on malformed input.
fn parse_named_bindings(cursor: &mut Cursor) -> Option<Vec<NamedBinding>> {
    let mut bindings = Vec::new();

    loop {
        if cursor.at(&TokenKind::RBrace) {
            cursor.bump();
            return Some(bindings);
        }

        let mut type_only = false;
        if cursor.at(&TokenKind::Type) {
            let next = cursor.peek_kind(1);
            if next != &TokenKind::Comma && next != &TokenKind::RBrace && next != &TokenKind::As {
                type_only = true;
                cursor.bump();
            }
        }

        let name = clause_name(cursor.current())?;
        cursor.bump();

        let mut alias = None;
        if cursor.at(&TokenKind::As) {
            cursor.bump();
            alias = Some(clause_name(cursor.current())?);
            cursor.bump();
        }

        bindings.push(NamedBinding {
            name,
            alias,
            type_only,
        });

        match cursor.kind() {
            TokenKind::Comma => {
                cursor.bump();
            }
            TokenKind::RBrace => {}
            _ => return None,
        }
    }
}

/// Names declared by `function f` / `class C`; lookahead only, the cursor
/// is not moved past the declaration.
fn lookahead_decl_name(cursor: &Cursor) -> Vec<String> {
    // cursor sits on `function` or `class`
    let mut idx = 1;
    if cursor.peek_kind(1) == &TokenKind::Star {
        idx = 2; // generator
    }
    match cursor.peek_kind(idx) {
        k if k.is_identifier_like() => {
            vec![cursor.tokens[(cursor.pos + idx).min(cursor.tokens.len() - 1)]
                .value
                .clone()]
        }
        _ => Vec::new(),
    }
}

/// Names bound by a `const/let/var` declarator list. The cursor sits on
/// the first declarator; only a lookahead clone walks the initializers so
/// the main scan still sees everything inside them.
fn lookahead_declarator_names(cursor: &Cursor) -> Vec<String> {
    let mut names = Vec::new();
    let mut pos = cursor.pos;
    let tokens = cursor.tokens;
    let at = |p: usize| &tokens[p.min(tokens.len() - 1)];

    loop {
        let token = at(pos);
        match &token.kind {
            TokenKind::LBrace | TokenKind::LBracket => {
                // Destructuring pattern: collect bound names, which are
                // identifiers followed by `,`, a closer, or `=`.
                let open = token.kind.clone();
                let close = if open == TokenKind::LBrace {
                    TokenKind::RBrace
                } else {
                    TokenKind::RBracket
                };
                let mut depth = 0usize;
                loop {
                    let t = at(pos);
                    match &t.kind {
                        k if *k == open => depth += 1,
                        k if *k == close => {
                            depth -= 1;
                            if depth == 0 {
                                pos += 1;
                                break;
                            }
                        }
                        TokenKind::Eof => return names,
                        k if k.is_identifier_like() => {
                            if matches!(
                                at(pos + 1).kind,
                                TokenKind::Comma
                                    | TokenKind::RBrace
                                    | TokenKind::RBracket
                                    | TokenKind::Eq
                            ) {
                                names.push(t.value.clone());
                            }
                        }
                        _ => {}
                    }
                    pos += 1;
                }
            }
            k if k.is_identifier_like() => {
                names.push(token.value.clone());
                pos += 1;
            }
            _ => return names,
        }

        // Skip the annotation/initializer up to a top-level `,` or the end
        // of the statement.
        let mut depth = 0usize;
        loop {
            let t = at(pos);
            match &t.kind {
                TokenKind::LParen | TokenKind::LBrace | TokenKind::LBracket => {
                    depth += 1;
                    pos += 1;
                }
                TokenKind::RParen | TokenKind::RBrace | TokenKind::RBracket => {
                    if depth == 0 {
                        return names;
                    }
                    depth -= 1;
                    pos += 1;
                }
                TokenKind::Comma if depth == 0 => {
                    pos += 1;
                    break; // next declarator
                }
                TokenKind::Semicolon | TokenKind::Eof if depth == 0 => return names,
                TokenKind::Export
                | TokenKind::Const
                | TokenKind::Let
                | TokenKind::Var
                | TokenKind::Function
                | TokenKind::Class
                | TokenKind::If
                | TokenKind::For
                | TokenKind::While
                | TokenKind::Return
                    if depth == 0 =>
                {
                    // Missing semicolon; the next statement started.
                    return names;
                }
                TokenKind::Eof => return names,
                _ => pos += 1,
            }
        }
    }
}

fn maybe_semicolon(cursor: &mut Cursor) -> Option<Span> {
    if cursor.at(&TokenKind::Semicolon) {
        Some(cursor.bump().span)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sitepack_lexer::Lexer;

    fn scan(source: &str) -> (Vec<ImportRef>, Vec<ExportRef>) {
        let tokens = Lexer::new(source).tokenize();
        scan_module(&tokens)
    }

    #[test]
    fn test_default_and_named_import() {
        let (imports, _) = scan("import app, { render, h as createEl } from './app';");
        assert_eq!(imports.len(), 1);

        let import = &imports[0];
        assert_eq!(import.specifier, "./app");
        assert_eq!(import.clause.default.as_deref(), Some("app"));
        assert_eq!(import.clause.named.len(), 2);
        assert_eq!(import.clause.named[0], NamedBinding::new("render"));
        assert_eq!(
            import.clause.named[1],
            NamedBinding::with_alias("h", "createEl")
        );
        assert!(!import.type_only);
        assert!(!import.dynamic);
    }

    #[test]
    fn test_namespace_import() {
        let (imports, _) = scan("import * as utils from './utils';");
        assert_eq!(imports[0].clause.namespace.as_deref(), Some("utils"));
    }

    #[test]
    fn test_side_effect_import() {
        let (imports, _) = scan("import './register';");
        assert_eq!(imports.len(), 1);
        assert!(imports[0].clause.is_empty());
        assert_eq!(imports[0].specifier, "./register");
    }

    #[test]
    fn test_dynamic_import() {
        let (imports, _) = scan("const page = await import('./page');");
        assert_eq!(imports.len(), 1);
        assert!(imports[0].dynamic);
        assert_eq!(imports[0].specifier, "./page");
    }

    #[test]
    fn test_dynamic_import_with_expression_is_ignored() {
        let (imports, _) = scan("import(base + '/page');");
        assert!(imports.is_empty());
    }

    #[test]
    fn test_import_meta_is_not_an_import() {
        let (imports, _) = scan("const url = new URL('./a.png', import.meta.url);");
        assert!(imports.is_empty());
    }

    #[test]
    fn test_type_only_import() {
        let (imports, _) = scan("import type { Config } from './config';");
        assert_eq!(imports.len(), 1);
        assert!(imports[0].type_only);
    }

    #[test]
    fn test_default_import_named_type() {
        // `type` here is a plain default binding, not a marker
        let (imports, _) = scan("import type from './type-util';");
        assert_eq!(imports.len(), 1);
        assert!(!imports[0].type_only);
        assert_eq!(imports[0].clause.default.as_deref(), Some("type"));
    }

    #[test]
    fn test_inline_type_specifier() {
        let (imports, _) = scan("import { type Props, render } from './view';");
        let named = &imports[0].clause.named;
        assert_eq!(named.len(), 2);
        assert!(named[0].type_only);
        assert_eq!(named[0].name, "Props");
        assert!(!named[1].type_only);
    }

    #[test]
    fn test_export_decl_names() {
        let (_, exports) = scan("export const width = 4, height = 8;");
        match &exports[0].kind {
            ExportKind::Decl { names, .. } => {
                assert_eq!(names, &vec!["width".to_string(), "height".to_string()]);
            }
            other => panic!("Expected Decl, got {:?}", other),
        }
    }

    #[test]
    fn test_export_function_and_class() {
        let (_, exports) = scan("export function draw() {}\nexport class Painter {}");
        let names: Vec<_> = exports
            .iter()
            .filter_map(|e| match &e.kind {
                ExportKind::Decl { names, .. } => Some(names.clone()),
                _ => None,
            })
            .flatten()
            .collect();
        assert_eq!(names, vec!["draw", "Painter"]);
    }

    #[test]
    fn test_export_default() {
        let source = "export default class App {}";
        let (_, exports) = scan(source);
        match &exports[0].kind {
            ExportKind::Default { keyword_span } => {
                assert_eq!(&source[keyword_span.start..keyword_span.end], "export default");
            }
            other => panic!("Expected Default, got {:?}", other),
        }
    }

    #[test]
    fn test_export_named_with_alias() {
        let (_, exports) = scan("export { internal as api };");
        match &exports[0].kind {
            ExportKind::Named { bindings, from, .. } => {
                assert!(from.is_none());
                assert_eq!(bindings[0], NamedBinding::with_alias("internal", "api"));
            }
            other => panic!("Expected Named, got {:?}", other),
        }
    }

    #[test]
    fn test_reexport_and_star() {
        let (_, exports) = scan("export { helper } from './helpers';\nexport * from './more';");
        assert_eq!(exports.len(), 2);
        match &exports[0].kind {
            ExportKind::Named { from: Some(s), .. } => assert_eq!(s.specifier, "./helpers"),
            other => panic!("Expected Named with from, got {:?}", other),
        }
        match &exports[1].kind {
            ExportKind::Star { from, namespace } => {
                assert_eq!(from.specifier, "./more");
                assert!(namespace.is_none());
            }
            other => panic!("Expected Star, got {:?}", other),
        }
    }

    #[test]
    fn test_dynamic_import_inside_exported_initializer() {
        let (imports, exports) = scan("export const lazy = () => import('./lazy');");
        assert_eq!(imports.len(), 1);
        assert!(imports[0].dynamic);
        assert_eq!(imports[0].specifier, "./lazy");
        match &exports[0].kind {
            ExportKind::Decl { names, .. } => assert_eq!(names, &vec!["lazy".to_string()]),
            other => panic!("Expected Decl, got {:?}", other),
        }
    }

    #[test]
    fn test_export_type_clause_is_type_only() {
        let (_, exports) = scan("export type { Options } from './options';");
        match &exports[0].kind {
            ExportKind::Named { type_only, .. } => assert!(type_only),
            other => panic!("Expected Named, got {:?}", other),
        }
    }
}
