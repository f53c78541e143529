//! # sitepack-lexer
//!
//! Tokenizer for the typed JavaScript dialect sitepack consumes. Produces
//! spanned tokens for the import scanner, the asset locator, and the type
//! stripper; lexical errors surface as `Error` tokens carrying a message.

mod lexer;
mod token;

pub use lexer::Lexer;
pub use token::{Token, TokenKind};
