//! Lexer (tokenizer) for C source code
//!
//! Converts raw source text into a flat [`Token`] stream consumed by the parser.
//! Preprocessor directives are skipped rather than parsed. Every token records
//! its byte offset and byte length so the emitter can splice edits into the
//! untouched original text.

use super::cst::SourceLocation;
use thiserror::Error;

/// All token variants produced by the lexer.
///
/// Every variant carries a [`SourceLocation`] so that parse errors and edits
/// can address the token without a separate token→location table.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    // Literals (raw source text; the compiler never evaluates them)
    Number(String, SourceLocation),
    CharLiteral(String, SourceLocation),
    StringLiteral(String, SourceLocation),

    // Identifiers
    Ident(String, SourceLocation),

    // Type keywords
    Int(SourceLocation),
    Char(SourceLocation),
    Void(SourceLocation),
    Short(SourceLocation),
    Long(SourceLocation),
    Signed(SourceLocation),
    Unsigned(SourceLocation),
    Float(SourceLocation),
    Double(SourceLocation),
    Struct(SourceLocation),
    Union(SourceLocation),
    Enum(SourceLocation),

    // Qualifiers and storage classes
    Const(SourceLocation),
    Volatile(SourceLocation),
    Static(SourceLocation),
    Extern(SourceLocation),
    Register(SourceLocation),
    Typedef(SourceLocation),

    // Statement keywords
    If(SourceLocation),
    Else(SourceLocation),
    While(SourceLocation),
    Do(SourceLocation),
    For(SourceLocation),
    Switch(SourceLocation),
    Case(SourceLocation),
    Default(SourceLocation),
    Break(SourceLocation),
    Continue(SourceLocation),
    Return(SourceLocation),
    Goto(SourceLocation),
    Sizeof(SourceLocation),

    // Arithmetic
    Plus(SourceLocation),    // +
    Minus(SourceLocation),   // -
    Star(SourceLocation),    // *
    Slash(SourceLocation),   // /
    Percent(SourceLocation), // %

    // Comparison
    EqEq(SourceLocation),  // ==
    NotEq(SourceLocation), // !=
    Lt(SourceLocation),    // <
    Le(SourceLocation),    // <=
    Gt(SourceLocation),    // >
    Ge(SourceLocation),    // >=

    // Logical
    AndAnd(SourceLocation), // &&
    OrOr(SourceLocation),   // ||
    Bang(SourceLocation),   // !

    // Bitwise
    Amp(SourceLocation),   // &
    Pipe(SourceLocation),  // |
    Caret(SourceLocation), // ^
    Tilde(SourceLocation), // ~
    LtLt(SourceLocation),  // <<
    GtGt(SourceLocation),  // >>

    // Assignment
    Eq(SourceLocation),        // =
    PlusEq(SourceLocation),    // +=
    MinusEq(SourceLocation),   // -=
    StarEq(SourceLocation),    // *=
    SlashEq(SourceLocation),   // /=
    PercentEq(SourceLocation), // %=
    AmpEq(SourceLocation),     // &=
    PipeEq(SourceLocation),    // |=
    CaretEq(SourceLocation),   // ^=
    LtLtEq(SourceLocation),    // <<=
    GtGtEq(SourceLocation),    // >>=

    // Increment/Decrement
    PlusPlus(SourceLocation),   // ++
    MinusMinus(SourceLocation), // --

    // Member access
    Dot(SourceLocation),   // .
    Arrow(SourceLocation), // ->

    // Ternary
    Question(SourceLocation), // ?
    Colon(SourceLocation),    // :

    // Punctuation
    LParen(SourceLocation),    // (
    RParen(SourceLocation),    // )
    LBrace(SourceLocation),    // {
    RBrace(SourceLocation),    // }
    LBracket(SourceLocation),  // [
    RBracket(SourceLocation),  // ]
    Semicolon(SourceLocation), // ;
    Comma(SourceLocation),     // ,
    Ellipsis(SourceLocation),  // ...

    // End of file
    Eof(SourceLocation),
}

impl Token {
    /// Returns the source location where this token appears.
    pub fn location(&self) -> SourceLocation {
        match self {
            Token::Number(_, loc)
            | Token::CharLiteral(_, loc)
            | Token::StringLiteral(_, loc)
            | Token::Ident(_, loc)
            | Token::Int(loc)
            | Token::Char(loc)
            | Token::Void(loc)
            | Token::Short(loc)
            | Token::Long(loc)
            | Token::Signed(loc)
            | Token::Unsigned(loc)
            | Token::Float(loc)
            | Token::Double(loc)
            | Token::Struct(loc)
            | Token::Union(loc)
            | Token::Enum(loc)
            | Token::Const(loc)
            | Token::Volatile(loc)
            | Token::Static(loc)
            | Token::Extern(loc)
            | Token::Register(loc)
            | Token::Typedef(loc)
            | Token::If(loc)
            | Token::Else(loc)
            | Token::While(loc)
            | Token::Do(loc)
            | Token::For(loc)
            | Token::Switch(loc)
            | Token::Case(loc)
            | Token::Default(loc)
            | Token::Break(loc)
            | Token::Continue(loc)
            | Token::Return(loc)
            | Token::Goto(loc)
            | Token::Sizeof(loc)
            | Token::Plus(loc)
            | Token::Minus(loc)
            | Token::Star(loc)
            | Token::Slash(loc)
            | Token::Percent(loc)
            | Token::EqEq(loc)
            | Token::NotEq(loc)
            | Token::Lt(loc)
            | Token::Le(loc)
            | Token::Gt(loc)
            | Token::Ge(loc)
            | Token::AndAnd(loc)
            | Token::OrOr(loc)
            | Token::Bang(loc)
            | Token::Amp(loc)
            | Token::Pipe(loc)
            | Token::Caret(loc)
            | Token::Tilde(loc)
            | Token::LtLt(loc)
            | Token::GtGt(loc)
            | Token::Eq(loc)
            | Token::PlusEq(loc)
            | Token::MinusEq(loc)
            | Token::StarEq(loc)
            | Token::SlashEq(loc)
            | Token::PercentEq(loc)
            | Token::AmpEq(loc)
            | Token::PipeEq(loc)
            | Token::CaretEq(loc)
            | Token::LtLtEq(loc)
            | Token::GtGtEq(loc)
            | Token::PlusPlus(loc)
            | Token::MinusMinus(loc)
            | Token::Dot(loc)
            | Token::Arrow(loc)
            | Token::Question(loc)
            | Token::Colon(loc)
            | Token::LParen(loc)
            | Token::RParen(loc)
            | Token::LBrace(loc)
            | Token::RBrace(loc)
            | Token::LBracket(loc)
            | Token::RBracket(loc)
            | Token::Semicolon(loc)
            | Token::Comma(loc)
            | Token::Ellipsis(loc)
            | Token::Eof(loc) => *loc,
        }
    }

    /// True for keywords that can only start a declaration.
    pub fn is_type_keyword(&self) -> bool {
        matches!(
            self,
            Token::Int(_)
                | Token::Char(_)
                | Token::Void(_)
                | Token::Short(_)
                | Token::Long(_)
                | Token::Signed(_)
                | Token::Unsigned(_)
                | Token::Float(_)
                | Token::Double(_)
                | Token::Struct(_)
                | Token::Union(_)
                | Token::Enum(_)
                | Token::Const(_)
                | Token::Volatile(_)
                | Token::Static(_)
                | Token::Extern(_)
                | Token::Register(_)
                | Token::Typedef(_)
        )
    }
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Token::Number(n, _) => write!(f, "number {}", n),
            Token::CharLiteral(c, _) => write!(f, "char literal {}", c),
            Token::StringLiteral(s, _) => write!(f, "string literal {}", s),
            Token::Ident(s, _) => write!(f, "identifier '{}'", s),
            Token::Eof(_) => write!(f, "end of file"),
            other => write!(f, "'{}'", other.spelling()),
        }
    }
}

impl Token {
    /// Fixed spelling of keyword and punctuation tokens.
    fn spelling(&self) -> &'static str {
        match self {
            Token::Int(_) => "int",
            Token::Char(_) => "char",
            Token::Void(_) => "void",
            Token::Short(_) => "short",
            Token::Long(_) => "long",
            Token::Signed(_) => "signed",
            Token::Unsigned(_) => "unsigned",
            Token::Float(_) => "float",
            Token::Double(_) => "double",
            Token::Struct(_) => "struct",
            Token::Union(_) => "union",
            Token::Enum(_) => "enum",
            Token::Const(_) => "const",
            Token::Volatile(_) => "volatile",
            Token::Static(_) => "static",
            Token::Extern(_) => "extern",
            Token::Register(_) => "register",
            Token::Typedef(_) => "typedef",
            Token::If(_) => "if",
            Token::Else(_) => "else",
            Token::While(_) => "while",
            Token::Do(_) => "do",
            Token::For(_) => "for",
            Token::Switch(_) => "switch",
            Token::Case(_) => "case",
            Token::Default(_) => "default",
            Token::Break(_) => "break",
            Token::Continue(_) => "continue",
            Token::Return(_) => "return",
            Token::Goto(_) => "goto",
            Token::Sizeof(_) => "sizeof",
            Token::Plus(_) => "+",
            Token::Minus(_) => "-",
            Token::Star(_) => "*",
            Token::Slash(_) => "/",
            Token::Percent(_) => "%",
            Token::EqEq(_) => "==",
            Token::NotEq(_) => "!=",
            Token::Lt(_) => "<",
            Token::Le(_) => "<=",
            Token::Gt(_) => ">",
            Token::Ge(_) => ">=",
            Token::AndAnd(_) => "&&",
            Token::OrOr(_) => "||",
            Token::Bang(_) => "!",
            Token::Amp(_) => "&",
            Token::Pipe(_) => "|",
            Token::Caret(_) => "^",
            Token::Tilde(_) => "~",
            Token::LtLt(_) => "<<",
            Token::GtGt(_) => ">>",
            Token::Eq(_) => "=",
            Token::PlusEq(_) => "+=",
            Token::MinusEq(_) => "-=",
            Token::StarEq(_) => "*=",
            Token::SlashEq(_) => "/=",
            Token::PercentEq(_) => "%=",
            Token::AmpEq(_) => "&=",
            Token::PipeEq(_) => "|=",
            Token::CaretEq(_) => "^=",
            Token::LtLtEq(_) => "<<=",
            Token::GtGtEq(_) => ">>=",
            Token::PlusPlus(_) => "++",
            Token::MinusMinus(_) => "--",
            Token::Dot(_) => ".",
            Token::Arrow(_) => "->",
            Token::Question(_) => "?",
            Token::Colon(_) => ":",
            Token::LParen(_) => "(",
            Token::RParen(_) => ")",
            Token::LBrace(_) => "{",
            Token::RBrace(_) => "}",
            Token::LBracket(_) => "[",
            Token::RBracket(_) => "]",
            Token::Semicolon(_) => ";",
            Token::Comma(_) => ",",
            Token::Ellipsis(_) => "...",
            Token::Number(..)
            | Token::CharLiteral(..)
            | Token::StringLiteral(..)
            | Token::Ident(..)
            | Token::Eof(_) => "",
        }
    }
}

/// Lexer error type
#[derive(Debug, Clone, Error)]
#[error("Lexer error at line {}, column {}: {message}", .location.line, .location.column)]
pub struct LexError {
    pub message: String,
    pub location: SourceLocation,
}

/// Lexer for C source code
pub struct Lexer {
    input: Vec<char>,
    position: usize,
    offset: usize,
    line: usize,
    column: usize,
}

impl Lexer {
    /// Create a new lexer for the given source string.
    pub fn new(input: &str) -> Self {
        Self {
            input: input.chars().collect(),
            position: 0,
            offset: 0,
            line: 1,
            column: 1,
        }
    }

    /// Tokenize the entire input
    pub fn tokenize(&mut self) -> Result<Vec<Token>, LexError> {
        let mut tokens = Vec::new();
        let mut line_start = true;

        loop {
            let line_before = self.line;
            self.skip_whitespace_and_comments()?;
            if self.line != line_before || tokens.is_empty() {
                line_start = true;
            }

            if self.is_at_end() {
                tokens.push(Token::Eof(self.current_location()));
                break;
            }

            if line_start && self.peek() == Some('#') {
                self.skip_preprocessor_directive();
                continue;
            }

            tokens.push(self.next_token()?);
            line_start = false;
        }

        Ok(tokens)
    }

    /// Get next token
    fn next_token(&mut self) -> Result<Token, LexError> {
        let start = self.current_location();
        let ch = self.advance().ok_or_else(|| LexError {
            message: "Unexpected end of file".to_string(),
            location: start,
        })?;

        let token: fn(SourceLocation) -> Token = match ch {
            '"' => return self.quoted_literal('"', start),
            '\'' => return self.quoted_literal('\'', start),
            '0'..='9' => return Ok(self.number_literal(ch, start)),
            '.' if self.peek().is_some_and(|c| c.is_ascii_digit()) => {
                return Ok(self.number_literal(ch, start))
            }
            'a'..='z' | 'A'..='Z' | '_' => return Ok(self.identifier_or_keyword(ch, start)),

            '+' => {
                if self.eat('+') {
                    Token::PlusPlus
                } else if self.eat('=') {
                    Token::PlusEq
                } else {
                    Token::Plus
                }
            }
            '-' => {
                if self.eat('-') {
                    Token::MinusMinus
                } else if self.eat('=') {
                    Token::MinusEq
                } else if self.eat('>') {
                    Token::Arrow
                } else {
                    Token::Minus
                }
            }
            '*' => {
                if self.eat('=') {
                    Token::StarEq
                } else {
                    Token::Star
                }
            }
            '/' => {
                if self.eat('=') {
                    Token::SlashEq
                } else {
                    Token::Slash
                }
            }
            '%' => {
                if self.eat('=') {
                    Token::PercentEq
                } else {
                    Token::Percent
                }
            }
            '=' => {
                if self.eat('=') {
                    Token::EqEq
                } else {
                    Token::Eq
                }
            }
            '!' => {
                if self.eat('=') {
                    Token::NotEq
                } else {
                    Token::Bang
                }
            }
            '<' => {
                if self.eat('=') {
                    Token::Le
                } else if self.eat('<') {
                    if self.eat('=') {
                        Token::LtLtEq
                    } else {
                        Token::LtLt
                    }
                } else {
                    Token::Lt
                }
            }
            '>' => {
                if self.eat('=') {
                    Token::Ge
                } else if self.eat('>') {
                    if self.eat('=') {
                        Token::GtGtEq
                    } else {
                        Token::GtGt
                    }
                } else {
                    Token::Gt
                }
            }
            '&' => {
                if self.eat('&') {
                    Token::AndAnd
                } else if self.eat('=') {
                    Token::AmpEq
                } else {
                    Token::Amp
                }
            }
            '|' => {
                if self.eat('|') {
                    Token::OrOr
                } else if self.eat('=') {
                    Token::PipeEq
                } else {
                    Token::Pipe
                }
            }
            '^' => {
                if self.eat('=') {
                    Token::CaretEq
                } else {
                    Token::Caret
                }
            }
            '.' => {
                if self.peek() == Some('.') && self.peek_ahead(1) == Some('.') {
                    self.advance();
                    self.advance();
                    Token::Ellipsis
                } else {
                    Token::Dot
                }
            }
            '~' => Token::Tilde,
            '?' => Token::Question,
            ':' => Token::Colon,
            '(' => Token::LParen,
            ')' => Token::RParen,
            '{' => Token::LBrace,
            '}' => Token::RBrace,
            '[' => Token::LBracket,
            ']' => Token::RBracket,
            ';' => Token::Semicolon,
            ',' => Token::Comma,

            _ => {
                return Err(LexError {
                    message: format!("Unexpected character: '{}'", ch),
                    location: start,
                })
            }
        };

        Ok(token(self.finish(start)))
    }

    /// Character or string literal, kept verbatim including quotes
    fn quoted_literal(&mut self, quote: char, start: SourceLocation) -> Result<Token, LexError> {
        let mut text = String::new();
        text.push(quote);

        while let Some(ch) = self.advance() {
            text.push(ch);
            if ch == '\\' {
                let escaped = self.advance().ok_or_else(|| LexError {
                    message: "Unexpected end of file in literal".to_string(),
                    location: self.current_location(),
                })?;
                text.push(escaped);
                continue;
            }
            if ch == '\n' {
                break;
            }
            if ch == quote {
                let location = self.finish(start);
                return Ok(if quote == '"' {
                    Token::StringLiteral(text, location)
                } else {
                    Token::CharLiteral(text, location)
                });
            }
        }

        Err(LexError {
            message: if quote == '"' {
                "Unterminated string literal".to_string()
            } else {
                "Unterminated character literal".to_string()
            },
            location: start,
        })
    }

    /// Numeric literal: decimal, hex, octal, simple floats, with suffixes
    fn number_literal(&mut self, first: char, start: SourceLocation) -> Token {
        let mut text = String::new();
        text.push(first);

        while let Some(ch) = self.peek() {
            let exponent_sign = (ch == '+' || ch == '-')
                && matches!(text.chars().last(), Some('e') | Some('E'))
                && !text.starts_with("0x")
                && !text.starts_with("0X");
            if ch.is_ascii_alphanumeric() || ch == '.' || exponent_sign {
                text.push(ch);
                self.advance();
            } else {
                break;
            }
        }

        Token::Number(text, self.finish(start))
    }

    /// Parse identifier or keyword
    fn identifier_or_keyword(&mut self, first_char: char, start: SourceLocation) -> Token {
        let mut ident = String::new();
        ident.push(first_char);

        while let Some(ch) = self.peek() {
            if ch.is_ascii_alphanumeric() || ch == '_' {
                ident.push(ch);
                self.advance();
            } else {
                break;
            }
        }

        let loc = self.finish(start);
        match ident.as_str() {
            "int" => Token::Int(loc),
            "char" => Token::Char(loc),
            "void" => Token::Void(loc),
            "short" => Token::Short(loc),
            "long" => Token::Long(loc),
            "signed" => Token::Signed(loc),
            "unsigned" => Token::Unsigned(loc),
            "float" => Token::Float(loc),
            "double" => Token::Double(loc),
            "struct" => Token::Struct(loc),
            "union" => Token::Union(loc),
            "enum" => Token::Enum(loc),
            "const" => Token::Const(loc),
            "volatile" => Token::Volatile(loc),
            "static" => Token::Static(loc),
            "extern" => Token::Extern(loc),
            "register" => Token::Register(loc),
            "typedef" => Token::Typedef(loc),
            "if" => Token::If(loc),
            "else" => Token::Else(loc),
            "while" => Token::While(loc),
            "do" => Token::Do(loc),
            "for" => Token::For(loc),
            "switch" => Token::Switch(loc),
            "case" => Token::Case(loc),
            "default" => Token::Default(loc),
            "break" => Token::Break(loc),
            "continue" => Token::Continue(loc),
            "return" => Token::Return(loc),
            "goto" => Token::Goto(loc),
            "sizeof" => Token::Sizeof(loc),
            _ => Token::Ident(ident, loc),
        }
    }

    /// Skip whitespace and comments
    fn skip_whitespace_and_comments(&mut self) -> Result<(), LexError> {
        loop {
            match self.peek() {
                Some(' ') | Some('\t') | Some('\r') | Some('\n') | Some('\x0c') => {
                    self.advance();
                }
                Some('\\') if self.peek_ahead(1) == Some('\n') => {
                    self.advance();
                    self.advance();
                }
                Some('/') => {
                    if self.peek_ahead(1) == Some('/') {
                        self.skip_line_comment();
                    } else if self.peek_ahead(1) == Some('*') {
                        self.skip_block_comment()?;
                    } else {
                        break;
                    }
                }
                _ => break,
            }
        }
        Ok(())
    }

    /// Skip single-line comment (// ...)
    fn skip_line_comment(&mut self) {
        while let Some(ch) = self.peek() {
            if ch == '\n' {
                break;
            }
            self.advance();
        }
    }

    /// Skip multi-line comment (/* ... */)
    fn skip_block_comment(&mut self) -> Result<(), LexError> {
        let start_loc = self.current_location();
        self.advance(); // skip '/'
        self.advance(); // skip '*'

        while !self.is_at_end() {
            if self.peek() == Some('*') && self.peek_ahead(1) == Some('/') {
                self.advance();
                self.advance();
                return Ok(());
            }
            self.advance();
        }

        Err(LexError {
            message: "Unterminated block comment".to_string(),
            location: start_loc,
        })
    }

    /// Skip a preprocessor directive, honouring backslash line continuations
    fn skip_preprocessor_directive(&mut self) {
        while let Some(ch) = self.peek() {
            if ch == '\\' && self.peek_ahead(1) == Some('\n') {
                self.advance();
                self.advance();
                continue;
            }
            if ch == '\n' {
                break;
            }
            self.advance();
        }
    }

    fn eat(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn peek(&self) -> Option<char> {
        self.input.get(self.position).copied()
    }

    fn peek_ahead(&self, n: usize) -> Option<char> {
        self.input.get(self.position + n).copied()
    }

    fn advance(&mut self) -> Option<char> {
        let ch = *self.input.get(self.position)?;
        self.position += 1;
        self.offset += ch.len_utf8();

        if ch == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }

        Some(ch)
    }

    fn is_at_end(&self) -> bool {
        self.position >= self.input.len()
    }

    fn current_location(&self) -> SourceLocation {
        SourceLocation::new(self.line, self.column, self.offset, 0)
    }

    /// Close a token that started at `start`, recording its byte length
    fn finish(&self, start: SourceLocation) -> SourceLocation {
        SourceLocation::new(start.line, start.column, start.offset, self.offset - start.offset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_tokens() {
        let mut lexer = Lexer::new("int main() { return 0; }");
        let tokens = lexer.tokenize().unwrap();

        assert!(matches!(tokens[0], Token::Int(_)));
        assert!(matches!(tokens[1], Token::Ident(ref s, _) if s == "main"));
        assert!(matches!(tokens[2], Token::LParen(_)));
        assert!(matches!(tokens[3], Token::RParen(_)));
        assert!(matches!(tokens[4], Token::LBrace(_)));
        assert!(matches!(tokens[5], Token::Return(_)));
        assert!(matches!(tokens[6], Token::Number(ref n, _) if n == "0"));
        assert!(matches!(tokens[7], Token::Semicolon(_)));
        assert!(matches!(tokens[8], Token::RBrace(_)));
        assert!(matches!(tokens[9], Token::Eof(_)));
    }

    #[test]
    fn test_byte_offsets() {
        let source = "  uint8_t x = 0x1F;";
        let tokens = Lexer::new(source).tokenize().unwrap();

        let loc = tokens[0].location();
        assert_eq!(&source[loc.offset..loc.end()], "uint8_t");
        let loc = tokens[3].location();
        assert_eq!(&source[loc.offset..loc.end()], "0x1F");
        assert_eq!(loc.column, 15);
    }

    #[test]
    fn test_operators() {
        let tokens = Lexer::new("++ -- += <<= >>= -> ... &= ==").tokenize().unwrap();

        assert!(matches!(tokens[0], Token::PlusPlus(_)));
        assert!(matches!(tokens[1], Token::MinusMinus(_)));
        assert!(matches!(tokens[2], Token::PlusEq(_)));
        assert!(matches!(tokens[3], Token::LtLtEq(_)));
        assert!(matches!(tokens[4], Token::GtGtEq(_)));
        assert!(matches!(tokens[5], Token::Arrow(_)));
        assert!(matches!(tokens[6], Token::Ellipsis(_)));
        assert!(matches!(tokens[7], Token::AmpEq(_)));
        assert!(matches!(tokens[8], Token::EqEq(_)));
    }

    #[test]
    fn test_comments_and_directives() {
        let source = "#include \"papi.h\"\n#define X \\\n 1\nint x; // c\n/* b\n */ int y;";
        let tokens = Lexer::new(source).tokenize().unwrap();

        assert!(matches!(tokens[0], Token::Int(_)));
        assert!(matches!(tokens[1], Token::Ident(ref s, _) if s == "x"));
        assert!(matches!(tokens[2], Token::Semicolon(_)));
        assert!(matches!(tokens[3], Token::Int(_)));
        assert!(matches!(tokens[4], Token::Ident(ref s, _) if s == "y"));
        assert_eq!(tokens[3].location().line, 6);
    }

    #[test]
    fn test_literals_are_verbatim() {
        let tokens = Lexer::new(r#"f("a\"b", '\n', 1.5e-3f);"#).tokenize().unwrap();

        assert!(matches!(tokens[2], Token::StringLiteral(ref s, _) if s == r#""a\"b""#));
        assert!(matches!(tokens[4], Token::CharLiteral(ref s, _) if s == r"'\n'"));
        assert!(matches!(tokens[6], Token::Number(ref s, _) if s == "1.5e-3f"));
    }

    #[test]
    fn test_unterminated_comment_is_error() {
        let err = Lexer::new("int x; /* never closed").tokenize().unwrap_err();
        assert_eq!(err.location.line, 1);
        assert!(err.message.contains("Unterminated"));
    }
}
