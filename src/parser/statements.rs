//! Statement parsing implementation
//!
//! This module handles parsing of all C statement types:
//!
//! - Local declarations: `uint16_t x = 42;`
//! - Control flow: `if`, `while`, `for`, `do-while`, `switch`
//! - Jump statements: `return`, `break`, `continue`, `goto`
//! - Compound statements: `{ ... }` and labels
//! - Expression statements: function calls, assignments
//!
//! # Grammar
//!
//! ```text
//! statement ::= declaration | if_stmt | while_stmt | for_stmt
//!             | do_while_stmt | switch_stmt | return_stmt
//!             | break_stmt | continue_stmt | goto_stmt | label
//!             | block | expr_stmt | ";"
//! ```
//!
//! All parsing methods are implemented as `pub(crate)` methods on the [`Parser`] struct.

use crate::parser::cst::*;
use crate::parser::lexer::Token;
use crate::parser::parse::{ParseError, Parser};

impl Parser {
    /// Parse block statements (inside braces, excluding the braces themselves)
    pub(crate) fn parse_block_statements(&mut self) -> Result<Vec<ParseNode>, ParseError> {
        let mut statements = Vec::new();

        while !self.check(&Token::RBrace(self.current_location())) && !self.is_at_end() {
            statements.push(self.parse_statement()?);
        }

        Ok(statements)
    }

    /// Parse a statement
    pub(crate) fn parse_statement(&mut self) -> Result<ParseNode, ParseError> {
        let start = self.position;
        let loc = self.current_location();

        // Check for keywords first
        if self.match_token(&Token::Return(loc)) {
            return self.parse_return_statement(start);
        }

        if self.match_token(&Token::If(loc)) {
            return self.parse_if_statement(start);
        }

        if self.match_token(&Token::While(loc)) {
            return self.parse_while_statement(start);
        }

        if self.match_token(&Token::Do(loc)) {
            return self.parse_do_while_statement(start);
        }

        if self.match_token(&Token::For(loc)) {
            return self.parse_for_statement(start);
        }

        if self.match_token(&Token::Switch(loc)) {
            return self.parse_switch_statement(start);
        }

        if self.match_token(&Token::Break(loc)) {
            self.expect_token(
                &Token::Semicolon(self.current_location()),
                "Expected ';' after 'break'",
            )?;
            return Ok(ParseNode::Break {
                tokens: self.range_from(start),
            });
        }

        if self.match_token(&Token::Continue(loc)) {
            self.expect_token(
                &Token::Semicolon(self.current_location()),
                "Expected ';' after 'continue'",
            )?;
            return Ok(ParseNode::Continue {
                tokens: self.range_from(start),
            });
        }

        if self.match_token(&Token::Goto(loc)) {
            let (label, _) = self.expect_identifier()?;
            self.expect_token(
                &Token::Semicolon(self.current_location()),
                "Expected ';' after 'goto'",
            )?;
            return Ok(ParseNode::Goto {
                label,
                tokens: self.range_from(start),
            });
        }

        if self.match_token(&Token::LBrace(loc)) {
            let body = self.parse_block_statements()?;
            self.expect_token(
                &Token::RBrace(self.current_location()),
                "Expected '}' after block",
            )?;
            return Ok(ParseNode::Compound {
                body,
                tokens: self.range_from(start),
            });
        }

        if self.match_token(&Token::Semicolon(loc)) {
            return Ok(ParseNode::Empty {
                tokens: self.range_from(start),
            });
        }

        // Check for label: identifier followed by colon
        if matches!(self.peek(), Token::Ident(..)) && self.check_ahead(1, &Token::Colon(loc)) {
            let (name, _) = self.expect_identifier()?;
            self.advance();
            return Ok(ParseNode::Label {
                name,
                tokens: self.range_from(start),
            });
        }

        if self.is_declaration_start() {
            return self.parse_declaration();
        }

        // Otherwise, it's an expression statement
        let expr = self.parse_expression()?;
        self.expect_token(
            &Token::Semicolon(self.current_location()),
            "Expected ';' after expression",
        )?;
        Ok(ParseNode::ExpressionStatement {
            expr: Box::new(expr),
            tokens: self.range_from(start),
        })
    }

    /// Parse return statement
    fn parse_return_statement(&mut self, start: TokenIndex) -> Result<ParseNode, ParseError> {
        let expr = if self.check(&Token::Semicolon(self.current_location())) {
            None
        } else {
            Some(Box::new(self.parse_expression()?))
        };

        self.expect_token(
            &Token::Semicolon(self.current_location()),
            "Expected ';' after return",
        )?;

        Ok(ParseNode::Return {
            expr,
            tokens: self.range_from(start),
        })
    }

    /// Parse `( expression )` after a control keyword
    fn parse_condition(&mut self, keyword: &str) -> Result<Box<ParseNode>, ParseError> {
        self.expect_token(
            &Token::LParen(self.current_location()),
            &format!("Expected '(' after '{}'", keyword),
        )?;
        let condition = Box::new(self.parse_expression()?);
        self.expect_token(
            &Token::RParen(self.current_location()),
            &format!("Expected ')' after {} condition", keyword),
        )?;
        Ok(condition)
    }

    /// Parse if statement
    fn parse_if_statement(&mut self, start: TokenIndex) -> Result<ParseNode, ParseError> {
        let condition = self.parse_condition("if")?;
        let then_branch = Box::new(self.parse_statement()?);

        let else_branch = if self.match_token(&Token::Else(self.current_location())) {
            Some(Box::new(self.parse_statement()?))
        } else {
            None
        };

        Ok(ParseNode::If {
            condition,
            then_branch,
            else_branch,
            tokens: self.range_from(start),
        })
    }

    /// Parse while statement
    fn parse_while_statement(&mut self, start: TokenIndex) -> Result<ParseNode, ParseError> {
        let condition = self.parse_condition("while")?;
        let body = Box::new(self.parse_statement()?);

        Ok(ParseNode::While {
            condition,
            body,
            tokens: self.range_from(start),
        })
    }

    /// Parse do-while statement
    fn parse_do_while_statement(&mut self, start: TokenIndex) -> Result<ParseNode, ParseError> {
        let body = Box::new(self.parse_statement()?);

        self.expect_token(
            &Token::While(self.current_location()),
            "Expected 'while' after do body",
        )?;
        let condition = self.parse_condition("do-while")?;
        self.expect_token(
            &Token::Semicolon(self.current_location()),
            "Expected ';' after do-while",
        )?;

        Ok(ParseNode::DoWhile {
            body,
            condition,
            tokens: self.range_from(start),
        })
    }

    /// Parse for statement
    fn parse_for_statement(&mut self, start: TokenIndex) -> Result<ParseNode, ParseError> {
        self.expect_token(
            &Token::LParen(self.current_location()),
            "Expected '(' after 'for'",
        )?;

        // Init (optional): a declaration or an expression statement, both own their ';'
        let init = if self.check(&Token::Semicolon(self.current_location())) {
            self.advance();
            None
        } else if self.is_declaration_start() {
            Some(Box::new(self.parse_declaration()?))
        } else {
            let init_start = self.position;
            let expr = self.parse_expression()?;
            self.expect_token(
                &Token::Semicolon(self.current_location()),
                "Expected ';' after for init",
            )?;
            Some(Box::new(ParseNode::ExpressionStatement {
                expr: Box::new(expr),
                tokens: self.range_from(init_start),
            }))
        };

        // Condition (optional)
        let condition = if self.check(&Token::Semicolon(self.current_location())) {
            None
        } else {
            Some(Box::new(self.parse_expression()?))
        };
        self.expect_token(
            &Token::Semicolon(self.current_location()),
            "Expected ';' after for condition",
        )?;

        // Increment (optional)
        let increment = if self.check(&Token::RParen(self.current_location())) {
            None
        } else {
            Some(Box::new(self.parse_expression()?))
        };

        self.expect_token(
            &Token::RParen(self.current_location()),
            "Expected ')' after for clauses",
        )?;

        let body = Box::new(self.parse_statement()?);

        Ok(ParseNode::For {
            init,
            condition,
            increment,
            body,
            tokens: self.range_from(start),
        })
    }

    /// Parse switch statement
    fn parse_switch_statement(&mut self, start: TokenIndex) -> Result<ParseNode, ParseError> {
        let expr = self.parse_condition("switch")?;
        self.expect_token(
            &Token::LBrace(self.current_location()),
            "Expected '{' before switch body",
        )?;

        let mut cases = Vec::new();

        while !self.check(&Token::RBrace(self.current_location())) && !self.is_at_end() {
            let case_start = self.position;
            if self.match_token(&Token::Case(self.current_location())) {
                let value = self.parse_ternary()?;
                self.expect_token(
                    &Token::Colon(self.current_location()),
                    "Expected ':' after case value",
                )?;
                let statements = self.parse_case_body()?;
                cases.push(CaseNode::Case {
                    value: Box::new(value),
                    statements,
                    tokens: self.range_from(case_start),
                });
            } else if self.match_token(&Token::Default(self.current_location())) {
                self.expect_token(
                    &Token::Colon(self.current_location()),
                    "Expected ':' after 'default'",
                )?;
                let statements = self.parse_case_body()?;
                cases.push(CaseNode::Default {
                    statements,
                    tokens: self.range_from(case_start),
                });
            } else {
                return Err(self.error("Expected 'case' or 'default' in switch body"));
            }
        }

        self.expect_token(
            &Token::RBrace(self.current_location()),
            "Expected '}' after switch body",
        )?;

        Ok(ParseNode::Switch {
            expr,
            cases,
            tokens: self.range_from(start),
        })
    }

    fn parse_case_body(&mut self) -> Result<Vec<ParseNode>, ParseError> {
        let mut statements = Vec::new();
        while !self.check(&Token::Case(self.current_location()))
            && !self.check(&Token::Default(self.current_location()))
            && !self.check(&Token::RBrace(self.current_location()))
            && !self.is_at_end()
        {
            statements.push(self.parse_statement()?);
        }
        Ok(statements)
    }
}

#[cfg(test)]
mod tests {
    use crate::parser::cst::ParseNode;
    use crate::parser::parse::parse;

    fn body_of(source: &str) -> Vec<ParseNode> {
        let program = parse(source).unwrap();
        match program.nodes.into_iter().last() {
            Some(ParseNode::FunctionDef { body, .. }) => body,
            _ => panic!("Expected function definition"),
        }
    }

    #[test]
    fn test_if_else_without_braces() {
        let body = body_of("void f(int a) { if (a) a = 1; else a = 2; }");
        match &body[0] {
            ParseNode::If {
                then_branch,
                else_branch,
                ..
            } => {
                assert!(matches!(then_branch.as_ref(), ParseNode::ExpressionStatement { .. }));
                assert!(else_branch.is_some());
            }
            _ => panic!("Expected if statement"),
        }
    }

    #[test]
    fn test_labels_and_goto() {
        let body = body_of("void f() { again: goto again; }");
        assert!(matches!(&body[0], ParseNode::Label { name, .. } if name == "again"));
        assert!(matches!(&body[1], ParseNode::Goto { label, .. } if label == "again"));
    }

    #[test]
    fn test_for_with_declaration() {
        let body = body_of("void f() { for (int i = 0; i < 4; i++) ; }");
        let ParseNode::For { init, body, .. } = &body[0] else {
            panic!("Expected for statement");
        };
        assert!(matches!(init.as_deref(), Some(ParseNode::Declaration { .. })));
        assert!(matches!(body.as_ref(), ParseNode::Empty { .. }));
    }

    #[test]
    fn test_switch_cases() {
        let body = body_of("void f(int x) { switch (x) { case 1: x = 2; break; default: break; } }");
        let ParseNode::Switch { cases, .. } = &body[0] else {
            panic!("Expected switch statement");
        };
        assert_eq!(cases.len(), 2);
    }

    #[test]
    fn test_typedef_pointer_declaration() {
        let body = body_of("void f() { spi_plugin_config* pc = 0; pc->x = 1; }");
        assert!(matches!(&body[0], ParseNode::Declaration { .. }));
        assert!(matches!(&body[1], ParseNode::ExpressionStatement { .. }));
    }
}
