//! Declaration parsing implementation
//!
//! This module handles parsing of declarations:
//!
//! - Top-level items: function definitions are parsed in full; prototypes,
//!   typedefs, struct definitions and globals are kept as opaque token ranges
//! - Parameter lists, including K&R-style untyped names: `void f(h)`
//! - Local declarations with multiple declarators: `uint8_t *p = buf, n;`
//! - Type names used in casts and `sizeof`
//!
//! # Grammar
//!
//! ```text
//! declaration ::= specifiers declarator ("," declarator)* ";"
//! declarator  ::= "*"* identifier ("[" ... "]")* ("=" initializer)?
//! initializer ::= assignment_expr | "{" ... "}"
//! ```

use crate::parser::cst::*;
use crate::parser::lexer::Token;
use crate::parser::parse::{ParseError, Parser};

/// Result of scanning declaration specifiers
pub(crate) struct Specifiers {
    pub tokens: TokenRange,
    pub is_static: bool,
    pub is_typedef: bool,
}

impl Parser {
    /// Parse a top-level item
    ///
    /// The item is scanned at bracket depth zero first: a `{` directly after a
    /// `)` means a function definition, anything that reaches `;` first is
    /// passed through as an opaque range.
    pub(crate) fn parse_top_level_declaration(&mut self) -> Result<ParseNode, ParseError> {
        let start = self.position;
        let mut index = start;
        let mut depth = 0usize;

        loop {
            match &self.tokens[index] {
                Token::LParen(_) | Token::LBracket(_) => depth += 1,
                Token::RParen(_) | Token::RBracket(_) => depth = depth.saturating_sub(1),
                Token::LBrace(_) if depth == 0 => {
                    if index > start && matches!(self.tokens[index - 1], Token::RParen(_)) {
                        return self.parse_function_definition(start, index - 1);
                    }
                    // Aggregate body: skip it and keep scanning for ';'
                    self.position = index;
                    self.skip_balanced()?;
                    index = self.position;
                    continue;
                }
                Token::Semicolon(_) if depth == 0 => {
                    if matches!(self.tokens[start], Token::Typedef(_)) {
                        self.record_typedef_name(start, index);
                    }
                    self.position = index + 1;
                    return Ok(ParseNode::Opaque {
                        tokens: TokenRange::new(start, index),
                    });
                }
                Token::Eof(_) => {
                    self.position = index;
                    return Err(self.error("Unexpected end of file in declaration"));
                }
                _ => {}
            }
            index += 1;
        }
    }

    /// Remember the name a typedef introduces
    ///
    /// Function pointer typedefs name the type inside `(* name)`; everything
    /// else names it with the last identifier at depth zero.
    fn record_typedef_name(&mut self, start: TokenIndex, end: TokenIndex) {
        let mut depth = 0usize;
        let mut last = None;
        for index in start..end {
            match &self.tokens[index] {
                Token::LParen(_) | Token::LBracket(_) | Token::LBrace(_) => depth += 1,
                Token::RParen(_) | Token::RBracket(_) | Token::RBrace(_) => {
                    depth = depth.saturating_sub(1)
                }
                Token::Ident(name, _) => {
                    let after_pointer_paren = index >= 2
                        && matches!(self.tokens[index - 1], Token::Star(_))
                        && matches!(self.tokens[index - 2], Token::LParen(_));
                    if after_pointer_paren {
                        last = Some(name.clone());
                        break;
                    }
                    if depth == 0 {
                        last = Some(name.clone());
                    }
                }
                _ => {}
            }
        }
        if let Some(name) = last {
            self.typedef_names.insert(name);
        }
    }

    /// Parse function definition: specifiers name(params) { body }
    fn parse_function_definition(
        &mut self,
        start: TokenIndex,
        rparen: TokenIndex,
    ) -> Result<ParseNode, ParseError> {
        let lparen = self.matching_open_paren(rparen)?;
        if lparen == 0 || lparen <= start {
            self.position = rparen;
            return Err(self.error("Expected function name before '('"));
        }
        let name_token = lparen - 1;
        let name = match &self.tokens[name_token] {
            Token::Ident(name, _) => name.clone(),
            other => {
                self.position = name_token;
                return Err(self.error(format!("Expected function name, found {}", other)));
            }
        };

        self.position = lparen;
        self.expect_token(&Token::LParen(self.current_location()), "Expected '(' after function name")?;
        let params = self.parse_parameter_list()?;
        self.expect_token(&Token::RParen(self.current_location()), "Expected ')' after parameters")?;
        let param_list = TokenRange::new(lparen, self.position - 1);

        let body_start =
            self.expect_token(&Token::LBrace(self.current_location()), "Expected '{' before function body")?;
        let body = self.parse_block_statements()?;
        self.expect_token(&Token::RBrace(self.current_location()), "Expected '}' after function body")?;

        Ok(ParseNode::FunctionDef {
            name,
            name_token,
            params,
            param_list,
            body,
            body_tokens: self.range_from(body_start),
            tokens: self.range_from(start),
        })
    }

    fn matching_open_paren(&self, rparen: TokenIndex) -> Result<TokenIndex, ParseError> {
        let mut depth = 0usize;
        let mut index = rparen;
        loop {
            match self.tokens[index] {
                Token::RParen(_) => depth += 1,
                Token::LParen(_) => {
                    depth -= 1;
                    if depth == 0 {
                        return Ok(index);
                    }
                }
                _ => {}
            }
            if index == 0 {
                return Err(ParseError {
                    message: "Unbalanced ')'".to_string(),
                    location: self.tokens[rparen].location(),
                });
            }
            index -= 1;
        }
    }

    /// Parse parameter list: (type name, type name, ...) or (name, name, ...)
    ///
    /// A parameter's name is the last identifier at depth zero, which covers
    /// typedef'd types (`waiting_for* wf`) and untyped K&R names (`h`).
    fn parse_parameter_list(&mut self) -> Result<Vec<Param>, ParseError> {
        let mut params = Vec::new();

        if self.check(&Token::RParen(self.current_location())) {
            return Ok(params);
        }

        // Special case: (void) means no parameters in C
        if self.check(&Token::Void(self.current_location()))
            && self.check_ahead(1, &Token::RParen(self.current_location()))
        {
            self.advance();
            return Ok(params);
        }

        loop {
            let start = self.position;
            let mut depth = 0usize;
            let mut name = None;

            loop {
                match self.peek() {
                    Token::Comma(_) | Token::RParen(_) if depth == 0 => break,
                    Token::LParen(_) | Token::LBracket(_) => depth += 1,
                    Token::RParen(_) | Token::RBracket(_) => depth = depth.saturating_sub(1),
                    Token::Ident(ident, _) if depth == 0 => name = Some((ident.clone(), self.position)),
                    Token::Eof(_) => return Err(self.error("Unexpected end of file in parameter list")),
                    _ => {}
                }
                self.advance();
            }

            if start == self.position {
                return Err(self.error(format!("Expected parameter, found {}", self.peek())));
            }

            if !matches!(self.tokens[start], Token::Ellipsis(_)) {
                params.push(Param {
                    name: name.as_ref().map(|(name, _)| name.clone()),
                    name_token: name.map(|(_, index)| index),
                    tokens: self.range_from(start),
                });
            }

            if !self.match_token(&Token::Comma(self.current_location())) {
                break;
            }
        }

        Ok(params)
    }

    /// Whether the current statement starts with a declaration
    pub(crate) fn is_declaration_start(&self) -> bool {
        let token = self.peek();
        if token.is_type_keyword() {
            return true;
        }

        let Token::Ident(name, _) = token else {
            return false;
        };

        match self.peek_ahead(1) {
            Some(Token::Ident(..)) => true,
            Some(Token::Star(_)) => {
                let mut n = 1;
                while matches!(self.peek_ahead(n), Some(Token::Star(_))) {
                    n += 1;
                }
                let declarator_follows = matches!(self.peek_ahead(n), Some(Token::Ident(..)))
                    && matches!(
                        self.peek_ahead(n + 1),
                        Some(Token::Eq(_))
                            | Some(Token::Semicolon(_))
                            | Some(Token::Comma(_))
                            | Some(Token::LBracket(_))
                    );
                declarator_follows || self.typedef_names.contains(name)
            }
            _ => false,
        }
    }

    /// Parse a local declaration, including its terminating ';'
    pub(crate) fn parse_declaration(&mut self) -> Result<ParseNode, ParseError> {
        let start = self.position;
        let specifiers = self.parse_specifiers()?;

        if specifiers.is_typedef {
            return Err(ParseError {
                message: "Local typedefs are not supported".to_string(),
                location: self.tokens[start].location(),
            });
        }

        let mut declarators = Vec::new();
        if !self.check(&Token::Semicolon(self.current_location())) {
            loop {
                declarators.push(self.parse_declarator()?);
                if !self.match_token(&Token::Comma(self.current_location())) {
                    break;
                }
            }
        }

        self.expect_token(
            &Token::Semicolon(self.current_location()),
            "Expected ';' after variable declaration",
        )?;

        Ok(ParseNode::Declaration {
            specifiers: specifiers.tokens,
            is_static: specifiers.is_static,
            declarators,
            tokens: self.range_from(start),
        })
    }

    /// Parse storage class, qualifiers and type specifiers
    ///
    /// At most one identifier is taken as a typedef name, and only before any
    /// builtin type keyword, so `unsigned x` and `uint8_t x` both stop at `x`.
    pub(crate) fn parse_specifiers(&mut self) -> Result<Specifiers, ParseError> {
        let start = self.position;
        let mut is_static = false;
        let mut is_typedef = false;
        let mut seen_type = false;

        loop {
            match self.peek() {
                Token::Static(_) => {
                    is_static = true;
                    self.advance();
                }
                Token::Typedef(_) => {
                    is_typedef = true;
                    self.advance();
                }
                Token::Const(_) | Token::Volatile(_) | Token::Extern(_) | Token::Register(_) => {
                    self.advance();
                }
                Token::Struct(_) | Token::Union(_) | Token::Enum(_) => {
                    self.advance();
                    if matches!(self.peek(), Token::Ident(..)) {
                        self.advance();
                    }
                    if self.check(&Token::LBrace(self.current_location())) {
                        self.skip_balanced()?;
                    }
                    seen_type = true;
                }
                Token::Int(_)
                | Token::Char(_)
                | Token::Void(_)
                | Token::Short(_)
                | Token::Long(_)
                | Token::Signed(_)
                | Token::Unsigned(_)
                | Token::Float(_)
                | Token::Double(_) => {
                    seen_type = true;
                    self.advance();
                }
                Token::Ident(..) if !seen_type => {
                    seen_type = true;
                    self.advance();
                }
                _ => break,
            }
        }

        if self.position == start {
            return Err(self.error(format!("Expected type, found {}", self.peek())));
        }

        Ok(Specifiers {
            tokens: self.range_from(start),
            is_static,
            is_typedef,
        })
    }

    /// Parse one declarator with its optional initializer
    fn parse_declarator(&mut self) -> Result<Declarator, ParseError> {
        let start = self.position;

        while self.match_token(&Token::Star(self.current_location())) {
            while self.match_token(&Token::Const(self.current_location()))
                || self.match_token(&Token::Volatile(self.current_location()))
            {}
        }

        let (name, name_token) = self.expect_identifier()?;

        while self.check(&Token::LBracket(self.current_location())) {
            self.skip_balanced()?;
        }

        let tokens = self.range_from(start);

        let init = if self.match_token(&Token::Eq(self.current_location())) {
            if self.check(&Token::LBrace(self.current_location())) {
                let init_start = self.position;
                self.skip_balanced()?;
                Some(Box::new(ParseNode::InitList {
                    tokens: self.range_from(init_start),
                }))
            } else {
                Some(Box::new(self.parse_assignment()?))
            }
        } else {
            None
        };

        Ok(Declarator {
            name,
            name_token,
            tokens,
            init,
        })
    }

    /// Whether the tokens after an opening '(' at offset `n` form a type name
    pub(crate) fn is_type_name_at(&self, n: usize) -> bool {
        let Some(token) = self.peek_ahead(n) else {
            return false;
        };
        if token.is_type_keyword() {
            return true;
        }
        let Token::Ident(name, _) = token else {
            return false;
        };

        let mut m = n + 1;
        let mut stars = 0;
        while matches!(self.peek_ahead(m), Some(Token::Star(_))) {
            m += 1;
            stars += 1;
        }
        let closes = matches!(self.peek_ahead(m), Some(Token::RParen(_)));
        let known_type = self.typedef_names.contains(name) || name.ends_with("_t");

        closes && (stars > 0 || known_type)
    }

    /// Parse a type name: specifiers followed by pointer stars
    pub(crate) fn parse_type_name(&mut self) -> Result<TokenRange, ParseError> {
        let start = self.position;
        self.parse_specifiers()?;
        while self.match_token(&Token::Star(self.current_location())) {
            while self.match_token(&Token::Const(self.current_location())) {}
        }
        Ok(self.range_from(start))
    }
}

#[cfg(test)]
mod tests {
    use crate::parser::cst::ParseNode;
    use crate::parser::parse::parse;

    fn body_of(source: &str) -> Vec<ParseNode> {
        let program = parse(source).unwrap();
        for node in program.nodes {
            if let ParseNode::FunctionDef { body, .. } = node {
                return body;
            }
        }
        panic!("no function in source");
    }

    #[test]
    fn test_typedef_names_in_parameters() {
        let source = "uint8_t h(const void* cfg, waiting_for* wf, uint8_t first) { return 0; }";
        let program = parse(source).unwrap();
        let ParseNode::FunctionDef { params, .. } = &program.nodes[0] else {
            panic!("Expected function definition");
        };
        let names: Vec<_> = params.iter().map(|p| p.name.clone().unwrap()).collect();
        assert_eq!(names, vec!["cfg", "wf", "first"]);
    }

    #[test]
    fn test_untyped_parameter() {
        let program = parse("void f(h) { }").unwrap();
        let ParseNode::FunctionDef { params, .. } = &program.nodes[0] else {
            panic!("Expected function definition");
        };
        assert_eq!(params.len(), 1);
        assert_eq!(params[0].name.as_deref(), Some("h"));
    }

    #[test]
    fn test_multiple_declarators() {
        let body = body_of("void f() { uint16_t *p = 0, n, buf[4] = {1, 2}; }");
        let ParseNode::Declaration { declarators, .. } = &body[0] else {
            panic!("Expected declaration");
        };
        assert_eq!(declarators.len(), 3);
        assert_eq!(declarators[0].name, "p");
        assert!(declarators[1].init.is_none());
        assert!(matches!(
            declarators[2].init.as_deref(),
            Some(ParseNode::InitList { .. })
        ));
    }

    #[test]
    fn test_static_local() {
        let body = body_of("void f() { static int count; }");
        assert!(matches!(body[0], ParseNode::Declaration { is_static: true, .. }));
    }

    #[test]
    fn test_typedef_enables_cast() {
        let body = body_of("typedef struct { int a; } cfg;\nvoid f(void* p) { x = (cfg)p; }");
        let ParseNode::ExpressionStatement { expr, .. } = &body[0] else {
            panic!("Expected expression statement");
        };
        let ParseNode::Assignment { rhs, .. } = expr.as_ref() else {
            panic!("Expected assignment");
        };
        assert!(matches!(rhs.as_ref(), ParseNode::Cast { .. }));
    }
}
