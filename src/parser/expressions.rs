//! Expression parsing implementation
//!
//! This module handles parsing of C expressions using one method per
//! precedence level and recursive descent for other expression forms.
//!
//! # Supported Expressions
//!
//! - Literals: numbers, characters, strings (kept verbatim)
//! - Identifiers
//! - Binary operators: arithmetic, comparison, logical, bitwise
//! - Unary operators: `-`, `+`, `!`, `~`, `&`, `*`, `++`, `--`
//! - Postfix: `[]`, `.`, `->`, `()`, `++`, `--`
//! - Ternary `? :`, assignment, compound assignment and the comma operator
//! - Type casts: `(type)expr`
//! - `sizeof` operator
//!
//! Every node's token range spans from its first to its last token, so the
//! exact source text of any subexpression can be recovered.

use crate::parser::cst::*;
use crate::parser::lexer::Token;
use crate::parser::parse::{ParseError, Parser};

fn binary(op: BinOp, left: ParseNode, right: ParseNode) -> ParseNode {
    let tokens = TokenRange::new(left.tokens().start, right.tokens().stop);
    ParseNode::BinaryOp {
        op,
        left: Box::new(left),
        right: Box::new(right),
        tokens,
    }
}

impl Parser {
    /// Parse expression (top-level entry point, includes the comma operator)
    pub(crate) fn parse_expression(&mut self) -> Result<ParseNode, ParseError> {
        let mut expr = self.parse_assignment()?;

        while self.match_token(&Token::Comma(self.current_location())) {
            let right = self.parse_assignment()?;
            let tokens = TokenRange::new(expr.tokens().start, right.tokens().stop);
            expr = ParseNode::Comma {
                left: Box::new(expr),
                right: Box::new(right),
                tokens,
            };
        }

        Ok(expr)
    }

    /// Parse assignment or ternary (right-associative)
    pub(crate) fn parse_assignment(&mut self) -> Result<ParseNode, ParseError> {
        let expr = self.parse_ternary()?;

        let loc = self.current_location();
        if self.match_token(&Token::Eq(loc)) {
            let rhs = self.parse_assignment()?;
            let tokens = TokenRange::new(expr.tokens().start, rhs.tokens().stop);
            return Ok(ParseNode::Assignment {
                lhs: Box::new(expr),
                rhs: Box::new(rhs),
                tokens,
            });
        }

        // Compound assignments
        let compound_op = match self.peek() {
            Token::PlusEq(_) => Some(BinOp::Add),
            Token::MinusEq(_) => Some(BinOp::Sub),
            Token::StarEq(_) => Some(BinOp::Mul),
            Token::SlashEq(_) => Some(BinOp::Div),
            Token::PercentEq(_) => Some(BinOp::Mod),
            Token::AmpEq(_) => Some(BinOp::BitAnd),
            Token::PipeEq(_) => Some(BinOp::BitOr),
            Token::CaretEq(_) => Some(BinOp::BitXor),
            Token::LtLtEq(_) => Some(BinOp::BitShl),
            Token::GtGtEq(_) => Some(BinOp::BitShr),
            _ => None,
        };

        if let Some(op) = compound_op {
            self.advance();
            let rhs = self.parse_assignment()?;
            let tokens = TokenRange::new(expr.tokens().start, rhs.tokens().stop);
            return Ok(ParseNode::CompoundAssignment {
                lhs: Box::new(expr),
                op,
                rhs: Box::new(rhs),
                tokens,
            });
        }

        Ok(expr)
    }

    /// Parse ternary: condition ? true_expr : false_expr
    pub(crate) fn parse_ternary(&mut self) -> Result<ParseNode, ParseError> {
        let expr = self.parse_logical_or()?;

        if self.match_token(&Token::Question(self.current_location())) {
            let true_expr = Box::new(self.parse_expression()?);
            self.expect_token(
                &Token::Colon(self.current_location()),
                "Expected ':' in ternary expression",
            )?;
            let false_expr = Box::new(self.parse_ternary()?);
            let tokens = TokenRange::new(expr.tokens().start, false_expr.tokens().stop);

            return Ok(ParseNode::TernaryOp {
                condition: Box::new(expr),
                true_expr,
                false_expr,
                tokens,
            });
        }

        Ok(expr)
    }

    /// Parse logical OR (||)
    fn parse_logical_or(&mut self) -> Result<ParseNode, ParseError> {
        let mut left = self.parse_logical_and()?;

        while self.match_token(&Token::OrOr(self.current_location())) {
            let right = self.parse_logical_and()?;
            left = binary(BinOp::Or, left, right);
        }

        Ok(left)
    }

    /// Parse logical AND (&&)
    fn parse_logical_and(&mut self) -> Result<ParseNode, ParseError> {
        let mut left = self.parse_bitwise_or()?;

        while self.match_token(&Token::AndAnd(self.current_location())) {
            let right = self.parse_bitwise_or()?;
            left = binary(BinOp::And, left, right);
        }

        Ok(left)
    }

    /// Parse bitwise OR (|)
    fn parse_bitwise_or(&mut self) -> Result<ParseNode, ParseError> {
        let mut left = self.parse_bitwise_xor()?;

        while self.match_token(&Token::Pipe(self.current_location())) {
            let right = self.parse_bitwise_xor()?;
            left = binary(BinOp::BitOr, left, right);
        }

        Ok(left)
    }

    /// Parse bitwise XOR (^)
    fn parse_bitwise_xor(&mut self) -> Result<ParseNode, ParseError> {
        let mut left = self.parse_bitwise_and()?;

        while self.match_token(&Token::Caret(self.current_location())) {
            let right = self.parse_bitwise_and()?;
            left = binary(BinOp::BitXor, left, right);
        }

        Ok(left)
    }

    /// Parse bitwise AND (&)
    fn parse_bitwise_and(&mut self) -> Result<ParseNode, ParseError> {
        let mut left = self.parse_equality()?;

        while self.match_token(&Token::Amp(self.current_location())) {
            let right = self.parse_equality()?;
            left = binary(BinOp::BitAnd, left, right);
        }

        Ok(left)
    }

    /// Parse equality (== !=)
    fn parse_equality(&mut self) -> Result<ParseNode, ParseError> {
        let mut left = self.parse_relational()?;

        loop {
            let loc = self.current_location();
            let op = if self.match_token(&Token::EqEq(loc)) {
                BinOp::Eq
            } else if self.match_token(&Token::NotEq(loc)) {
                BinOp::Ne
            } else {
                break;
            };

            let right = self.parse_relational()?;
            left = binary(op, left, right);
        }

        Ok(left)
    }

    /// Parse relational (< <= > >=)
    fn parse_relational(&mut self) -> Result<ParseNode, ParseError> {
        let mut left = self.parse_shift()?;

        loop {
            let loc = self.current_location();
            let op = if self.match_token(&Token::Lt(loc)) {
                BinOp::Lt
            } else if self.match_token(&Token::Le(loc)) {
                BinOp::Le
            } else if self.match_token(&Token::Gt(loc)) {
                BinOp::Gt
            } else if self.match_token(&Token::Ge(loc)) {
                BinOp::Ge
            } else {
                break;
            };

            let right = self.parse_shift()?;
            left = binary(op, left, right);
        }

        Ok(left)
    }

    /// Parse bitwise shift (<< >>)
    fn parse_shift(&mut self) -> Result<ParseNode, ParseError> {
        let mut left = self.parse_additive()?;

        loop {
            let loc = self.current_location();
            let op = if self.match_token(&Token::LtLt(loc)) {
                BinOp::BitShl
            } else if self.match_token(&Token::GtGt(loc)) {
                BinOp::BitShr
            } else {
                break;
            };

            let right = self.parse_additive()?;
            left = binary(op, left, right);
        }

        Ok(left)
    }

    /// Parse additive (+ -)
    fn parse_additive(&mut self) -> Result<ParseNode, ParseError> {
        let mut left = self.parse_multiplicative()?;

        loop {
            let loc = self.current_location();
            let op = if self.match_token(&Token::Plus(loc)) {
                BinOp::Add
            } else if self.match_token(&Token::Minus(loc)) {
                BinOp::Sub
            } else {
                break;
            };

            let right = self.parse_multiplicative()?;
            left = binary(op, left, right);
        }

        Ok(left)
    }

    /// Parse multiplicative (* / %)
    fn parse_multiplicative(&mut self) -> Result<ParseNode, ParseError> {
        let mut left = self.parse_cast()?;

        loop {
            let loc = self.current_location();
            let op = if self.match_token(&Token::Star(loc)) {
                BinOp::Mul
            } else if self.match_token(&Token::Slash(loc)) {
                BinOp::Div
            } else if self.match_token(&Token::Percent(loc)) {
                BinOp::Mod
            } else {
                break;
            };

            let right = self.parse_cast()?;
            left = binary(op, left, right);
        }

        Ok(left)
    }

    /// Parse cast: (type)expr
    fn parse_cast(&mut self) -> Result<ParseNode, ParseError> {
        if self.check(&Token::LParen(self.current_location())) && self.is_type_name_at(1) {
            let start = self.position;
            self.advance(); // consume '('
            let type_tokens = self.parse_type_name()?;
            self.expect_token(
                &Token::RParen(self.current_location()),
                "Expected ')' after cast type",
            )?;
            let expr = Box::new(self.parse_cast()?);

            return Ok(ParseNode::Cast {
                type_tokens,
                expr,
                tokens: self.range_from(start),
            });
        }

        self.parse_unary()
    }

    /// Parse unary (! ~ - + & * ++ -- sizeof)
    fn parse_unary(&mut self) -> Result<ParseNode, ParseError> {
        let start = self.position;

        let prefix = match self.peek() {
            Token::Bang(_) => Some(UnOp::Not),
            Token::Tilde(_) => Some(UnOp::BitNot),
            Token::Minus(_) => Some(UnOp::Neg),
            Token::Plus(_) => Some(UnOp::Plus),
            Token::Amp(_) => Some(UnOp::AddrOf),
            Token::Star(_) => Some(UnOp::Deref),
            Token::PlusPlus(_) => Some(UnOp::PreInc),
            Token::MinusMinus(_) => Some(UnOp::PreDec),
            _ => None,
        };

        if let Some(op) = prefix {
            self.advance();
            let operand = Box::new(self.parse_cast()?);
            return Ok(ParseNode::UnaryOp {
                op,
                operand,
                tokens: self.range_from(start),
            });
        }

        if self.match_token(&Token::Sizeof(self.current_location())) {
            if self.check(&Token::LParen(self.current_location())) && self.is_type_name_at(1) {
                self.advance();
                let type_tokens = self.parse_type_name()?;
                self.expect_token(
                    &Token::RParen(self.current_location()),
                    "Expected ')' after sizeof type",
                )?;
                return Ok(ParseNode::SizeofType {
                    type_tokens,
                    tokens: self.range_from(start),
                });
            }

            let expr = Box::new(self.parse_unary()?);
            return Ok(ParseNode::SizeofExpr {
                expr,
                tokens: self.range_from(start),
            });
        }

        self.parse_postfix()
    }

    /// Parse postfix (++ -- [] . -> ())
    fn parse_postfix(&mut self) -> Result<ParseNode, ParseError> {
        let start = self.position;
        let mut expr = self.parse_primary()?;

        loop {
            let loc = self.current_location();

            if self.match_token(&Token::PlusPlus(loc)) {
                expr = ParseNode::UnaryOp {
                    op: UnOp::PostInc,
                    operand: Box::new(expr),
                    tokens: self.range_from(start),
                };
            } else if self.match_token(&Token::MinusMinus(loc)) {
                expr = ParseNode::UnaryOp {
                    op: UnOp::PostDec,
                    operand: Box::new(expr),
                    tokens: self.range_from(start),
                };
            } else if self.match_token(&Token::LBracket(loc)) {
                let index = Box::new(self.parse_expression()?);
                self.expect_token(
                    &Token::RBracket(self.current_location()),
                    "Expected ']' after array index",
                )?;
                expr = ParseNode::ArrayAccess {
                    array: Box::new(expr),
                    index,
                    tokens: self.range_from(start),
                };
            } else if self.match_token(&Token::Dot(loc)) {
                let (member, _) = self.expect_identifier()?;
                expr = ParseNode::MemberAccess {
                    object: Box::new(expr),
                    member,
                    tokens: self.range_from(start),
                };
            } else if self.match_token(&Token::Arrow(loc)) {
                let (member, _) = self.expect_identifier()?;
                expr = ParseNode::PointerMemberAccess {
                    object: Box::new(expr),
                    member,
                    tokens: self.range_from(start),
                };
            } else if self.match_token(&Token::LParen(loc)) {
                let args = self.parse_argument_list()?;
                self.expect_token(
                    &Token::RParen(self.current_location()),
                    "Expected ')' after function arguments",
                )?;
                expr = ParseNode::FunctionCall {
                    callee: Box::new(expr),
                    args,
                    tokens: self.range_from(start),
                };
            } else {
                break;
            }
        }

        Ok(expr)
    }

    /// Parse argument list: (expr, expr, ...)
    fn parse_argument_list(&mut self) -> Result<Vec<ParseNode>, ParseError> {
        let mut args = Vec::new();

        if self.check(&Token::RParen(self.current_location())) {
            return Ok(args);
        }

        loop {
            args.push(self.parse_assignment()?);

            if !self.match_token(&Token::Comma(self.current_location())) {
                break;
            }
        }

        Ok(args)
    }

    /// Parse primary (literals, identifiers, parenthesized expressions)
    fn parse_primary(&mut self) -> Result<ParseNode, ParseError> {
        let start = self.position;

        match self.peek().clone() {
            Token::Number(text, _) | Token::CharLiteral(text, _) => {
                self.advance();
                Ok(ParseNode::Literal {
                    text,
                    tokens: TokenRange::single(start),
                })
            }
            Token::StringLiteral(text, _) => {
                // Adjacent string literals are one literal
                let mut text = text;
                self.advance();
                while let Token::StringLiteral(next, _) = self.peek() {
                    text.push(' ');
                    text.push_str(next);
                    self.advance();
                }
                Ok(ParseNode::Literal {
                    text,
                    tokens: self.range_from(start),
                })
            }
            Token::Ident(name, _) => {
                self.advance();
                Ok(ParseNode::Identifier {
                    name,
                    tokens: TokenRange::single(start),
                })
            }
            Token::LParen(_) => {
                self.advance();
                let expr = Box::new(self.parse_expression()?);
                self.expect_token(
                    &Token::RParen(self.current_location()),
                    "Expected ')' after expression",
                )?;
                Ok(ParseNode::Paren {
                    expr,
                    tokens: self.range_from(start),
                })
            }
            other => Err(self.error(format!("Unexpected token: {}", other))),
        }
    }
}
