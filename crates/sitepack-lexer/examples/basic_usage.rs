use sitepack_lexer::{Lexer, TokenKind};

fn main() {
    // Example 1: Import statements
    println!("=== Example 1: Imports ===");
    let source1 = r#"
        import { html, css } from 'lit';
        import './register-elements';
    "#;

    let mut lexer1 = Lexer::new(source1);
    let tokens1 = lexer1.tokenize();

    for token in &tokens1 {
        if token.kind != TokenKind::Eof {
            println!("{:?} at {} = '{}'", token.kind, token.span, token.value);
        }
    }

    // Example 2: Asset reference
    println!("\n=== Example 2: Asset Reference ===");
    let source2 = "const logo = new URL('./logo.svg', import.meta.url);";

    let mut lexer2 = Lexer::new(source2);
    let tokens2 = lexer2.tokenize();

    for token in &tokens2 {
        if token.kind != TokenKind::Eof {
            println!("{:?} = '{}'", token.kind, token.value);
        }
    }

    // Example 3: Type annotations
    println!("\n=== Example 3: Type Annotations ===");
    let source3 = "type Result<T> = T | null; interface User { name: string; }";

    let mut lexer3 = Lexer::new(source3);
    let tokens3 = lexer3.tokenize();

    for token in &tokens3 {
        if token.kind != TokenKind::Eof {
            println!("{:?} = '{}'", token.kind, token.value);
        }
    }

    // Example 4: Regex vs division
    println!("\n=== Example 4: Regex vs Division ===");
    let source4 = "const re = /\\d+/g; const half = total / 2;";

    let mut lexer4 = Lexer::new(source4);
    let tokens4 = lexer4.tokenize();

    for token in &tokens4 {
        if token.kind != TokenKind::Eof {
            println!("{:?} = '{}'", token.kind, token.value);
        }
    }

    // Example 5: Template literal with interpolation
    println!("\n=== Example 5: Template Literal ===");
    let source5 = r#"`Hello, ${user.name}! You have ${count} messages.`"#;

    let mut lexer5 = Lexer::new(source5);
    let tokens5 = lexer5.tokenize();

    for token in &tokens5 {
        if token.kind != TokenKind::Eof {
            println!("{:?} = '{}'", token.kind, token.value);
        }
    }

    // Example 6: Comments are skipped
    println!("\n=== Example 6: Comments (should be skipped) ===");
    let source6 = r#"
        // import './not-a-real-module';
        let x = 5; /* new URL('./fake.png', import.meta.url) */
    "#;

    let mut lexer6 = Lexer::new(source6);
    let tokens6 = lexer6.tokenize();

    for token in &tokens6 {
        if token.kind != TokenKind::Eof {
            println!("{:?} = '{}'", token.kind, token.value);
        }
    }
}
