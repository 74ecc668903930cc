//! Main parser coordinator
//!
//! This module provides the [`Parser`] struct and core parsing infrastructure,
//! including error types, helper methods, and the main parse entry point.
//!
//! # Parser Architecture
//!
//! The Parser uses a recursive descent approach with the following organization:
//! - This module: Parser struct, helper methods, and coordination
//! - `declarations`: top-level items, functions, parameters, local declarations
//! - `statements`: Parsing statements (if, while, for, etc.)
//! - `expressions`: Parsing expressions with precedence climbing
//!
//! Parser methods are split across multiple files using `impl Parser` blocks,
//! allowing each module to extend the Parser with related functionality while
//! maintaining access to the shared parser state.
//!
//! Every node records the inclusive range of token indices it was built from,
//! so later passes can address the original text precisely.

use crate::parser::cst::*;
use crate::parser::lexer::{LexError, Lexer, Token};
use rustc_hash::FxHashSet;
use thiserror::Error;

/// Parser error type
#[derive(Debug, Clone, Error)]
#[error("Parse error at line {}, column {}: {message}", .location.line, .location.column)]
pub struct ParseError {
    pub message: String,
    pub location: SourceLocation,
}

impl From<LexError> for ParseError {
    fn from(err: LexError) -> Self {
        ParseError {
            message: err.message,
            location: err.location,
        }
    }
}

/// Recursive descent parser for the accepted C subset
pub struct Parser {
    pub(crate) tokens: Vec<Token>,
    pub(crate) position: usize,
    /// Names introduced by `typedef`, used to tell casts from parenthesized expressions
    pub(crate) typedef_names: FxHashSet<String>,
}

impl Parser {
    pub fn new(source: &str) -> Result<Self, ParseError> {
        let mut lexer = Lexer::new(source);
        let tokens = lexer.tokenize()?;
        Ok(Self {
            tokens,
            position: 0,
            typedef_names: FxHashSet::default(),
        })
    }

    /// Parse the entire translation unit
    pub fn parse_program(mut self) -> Result<Program, ParseError> {
        let mut nodes = Vec::new();

        while !self.is_at_end() {
            nodes.push(self.parse_top_level_declaration()?);
        }

        Ok(Program {
            nodes,
            tokens: self.tokens,
        })
    }

    // ===== Helper methods =====

    pub(crate) fn match_token(&mut self, token: &Token) -> bool {
        if self.check(token) {
            self.advance();
            true
        } else {
            false
        }
    }

    pub(crate) fn check(&self, token: &Token) -> bool {
        std::mem::discriminant(self.peek()) == std::mem::discriminant(token)
    }

    pub(crate) fn check_ahead(&self, n: usize, token: &Token) -> bool {
        self.peek_ahead(n)
            .map(|t| std::mem::discriminant(t) == std::mem::discriminant(token))
            .unwrap_or(false)
    }

    pub(crate) fn advance(&mut self) -> &Token {
        if !self.is_at_end() {
            self.position += 1;
        }
        self.previous()
    }

    pub(crate) fn is_at_end(&self) -> bool {
        matches!(self.peek(), Token::Eof(_))
    }

    pub(crate) fn peek(&self) -> &Token {
        &self.tokens[self.position]
    }

    pub(crate) fn peek_ahead(&self, n: usize) -> Option<&Token> {
        self.tokens.get(self.position + n)
    }

    pub(crate) fn previous(&self) -> &Token {
        &self.tokens[self.position.saturating_sub(1)]
    }

    pub(crate) fn current_location(&self) -> SourceLocation {
        self.peek().location()
    }

    /// Range from `start` to the last consumed token
    pub(crate) fn range_from(&self, start: TokenIndex) -> TokenRange {
        TokenRange::new(start, self.position.saturating_sub(1).max(start))
    }

    pub(crate) fn error(&self, message: impl Into<String>) -> ParseError {
        ParseError {
            message: message.into(),
            location: self.current_location(),
        }
    }

    pub(crate) fn expect_token(&mut self, token: &Token, message: &str) -> Result<TokenIndex, ParseError> {
        if self.check(token) {
            self.advance();
            Ok(self.position - 1)
        } else {
            Err(self.error(format!("{}, found {}", message, self.peek())))
        }
    }

    pub(crate) fn expect_identifier(&mut self) -> Result<(String, TokenIndex), ParseError> {
        if let Token::Ident(name, _) = self.peek() {
            let name = name.clone();
            self.advance();
            Ok((name, self.position - 1))
        } else {
            Err(self.error(format!("Expected identifier, found {}", self.peek())))
        }
    }

    /// Consume a balanced `open ... close` group starting at the current token
    pub(crate) fn skip_balanced(&mut self) -> Result<(), ParseError> {
        let start = self.current_location();
        let mut depth = 0usize;
        loop {
            match self.peek() {
                Token::LParen(_) | Token::LBrace(_) | Token::LBracket(_) => depth += 1,
                Token::RParen(_) | Token::RBrace(_) | Token::RBracket(_) => {
                    depth = depth.saturating_sub(1);
                }
                Token::Eof(_) => {
                    return Err(ParseError {
                        message: "Unbalanced brackets".to_string(),
                        location: start,
                    })
                }
                _ => {}
            }
            self.advance();
            if depth == 0 {
                return Ok(());
            }
        }
    }
}

/// Parse C source text into a [`Program`]
pub fn parse(source: &str) -> Result<Program, ParseError> {
    Parser::new(source)?.parse_program()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_function() {
        let program = parse("int main() { return 0; }").unwrap();

        assert_eq!(program.nodes.len(), 1);
        match &program.nodes[0] {
            ParseNode::FunctionDef {
                name, params, body, ..
            } => {
                assert_eq!(name, "main");
                assert_eq!(params.len(), 0);
                assert_eq!(body.len(), 1);
            }
            _ => panic!("Expected function definition"),
        }
    }

    #[test]
    fn test_parse_struct_and_prototype_are_opaque() {
        let source = "struct Point { int x; int y; };\nint f(int);\ntypedef struct { int a; } cfg_t;";
        let program = parse(source).unwrap();

        assert_eq!(program.nodes.len(), 3);
        assert!(program
            .nodes
            .iter()
            .all(|node| matches!(node, ParseNode::Opaque { .. })));
    }

    #[test]
    fn test_node_ranges_cover_source_text() {
        let source = "void f(int a) { a = (a + 1) * 2; }";
        let program = parse(source).unwrap();

        let ParseNode::FunctionDef { body, .. } = &program.nodes[0] else {
            panic!("Expected function definition");
        };
        let range = program.byte_range(body[0].tokens());
        assert_eq!(&source[range], "a = (a + 1) * 2;");
    }

    #[test]
    fn test_syntax_error_reports_location() {
        let err = parse("void f() {\n  int x = ;\n}").unwrap_err();
        assert_eq!(err.location.line, 2);
    }
}
