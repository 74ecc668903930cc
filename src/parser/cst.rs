// Concrete parse tree produced by the parser and consumed by lowering

use super::lexer::Token;

/// Index of a token in [`Program::tokens`]
pub type TokenIndex = usize;

/// Where a token sits in the original text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct SourceLocation {
    pub line: usize,
    pub column: usize,
    /// Byte offset of the first byte
    pub offset: usize,
    /// Length in bytes
    pub len: usize,
}

impl SourceLocation {
    pub fn new(line: usize, column: usize, offset: usize, len: usize) -> Self {
        Self {
            line,
            column,
            offset,
            len,
        }
    }

    /// Byte offset one past the last byte
    pub fn end(&self) -> usize {
        self.offset + self.len
    }
}

/// Inclusive range of token indices covered by a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct TokenRange {
    pub start: TokenIndex,
    pub stop: TokenIndex,
}

impl TokenRange {
    pub fn new(start: TokenIndex, stop: TokenIndex) -> Self {
        Self { start, stop }
    }

    pub fn single(index: TokenIndex) -> Self {
        Self {
            start: index,
            stop: index,
        }
    }

    pub fn contains(&self, index: TokenIndex) -> bool {
        self.start <= index && index <= self.stop
    }
}

/// Binary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    // Arithmetic
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    // Comparison
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    // Logical
    And,
    Or,
    // Bitwise
    BitAnd,
    BitOr,
    BitXor,
    BitShl,
    BitShr,
}

/// Unary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnOp {
    Neg,     // -x
    Plus,    // +x
    Not,     // !x
    BitNot,  // ~x
    PreInc,  // ++x
    PreDec,  // --x
    PostInc, // x++
    PostDec, // x--
    Deref,   // *x
    AddrOf,  // &x
}

impl UnOp {
    /// Operators that write their operand
    pub fn is_mutation(&self) -> bool {
        matches!(self, UnOp::PreInc | UnOp::PreDec | UnOp::PostInc | UnOp::PostDec)
    }
}

/// Function parameter. `name` is absent only in unnamed prototype parameters.
#[derive(Debug, Clone)]
pub struct Param {
    pub name: Option<String>,
    pub name_token: Option<TokenIndex>,
    pub tokens: TokenRange,
}

/// One declarator of a declaration: `*name[4] = init`
#[derive(Debug, Clone)]
pub struct Declarator {
    pub name: String,
    pub name_token: TokenIndex,
    /// Pointer stars, name and array suffixes; excludes the initializer
    pub tokens: TokenRange,
    pub init: Option<Box<ParseNode>>,
}

/// Switch case
#[derive(Debug, Clone)]
pub enum CaseNode {
    Case {
        value: Box<ParseNode>,
        statements: Vec<ParseNode>,
        tokens: TokenRange,
    },
    Default {
        statements: Vec<ParseNode>,
        tokens: TokenRange,
    },
}

/// Parse tree nodes for top-level items, statements and expressions
#[derive(Debug, Clone)]
pub enum ParseNode {
    // Top-level items
    FunctionDef {
        name: String,
        name_token: TokenIndex,
        params: Vec<Param>,
        /// From '(' to ')' inclusive
        param_list: TokenRange,
        body: Vec<ParseNode>,
        /// From '{' to '}' inclusive
        body_tokens: TokenRange,
        tokens: TokenRange,
    },
    /// Prototypes, typedefs, struct definitions, globals: passed through untouched
    Opaque {
        tokens: TokenRange,
    },

    // Statements
    Declaration {
        /// Storage class, qualifiers and type specifiers
        specifiers: TokenRange,
        is_static: bool,
        declarators: Vec<Declarator>,
        tokens: TokenRange,
    },
    Compound {
        body: Vec<ParseNode>,
        tokens: TokenRange,
    },
    ExpressionStatement {
        expr: Box<ParseNode>,
        tokens: TokenRange,
    },
    Empty {
        tokens: TokenRange,
    },
    Return {
        expr: Option<Box<ParseNode>>,
        tokens: TokenRange,
    },
    If {
        condition: Box<ParseNode>,
        then_branch: Box<ParseNode>,
        else_branch: Option<Box<ParseNode>>,
        tokens: TokenRange,
    },
    While {
        condition: Box<ParseNode>,
        body: Box<ParseNode>,
        tokens: TokenRange,
    },
    DoWhile {
        body: Box<ParseNode>,
        condition: Box<ParseNode>,
        tokens: TokenRange,
    },
    For {
        init: Option<Box<ParseNode>>,
        condition: Option<Box<ParseNode>>,
        increment: Option<Box<ParseNode>>,
        body: Box<ParseNode>,
        tokens: TokenRange,
    },
    Switch {
        expr: Box<ParseNode>,
        cases: Vec<CaseNode>,
        tokens: TokenRange,
    },
    Break {
        tokens: TokenRange,
    },
    Continue {
        tokens: TokenRange,
    },
    Goto {
        label: String,
        tokens: TokenRange,
    },
    Label {
        name: String,
        tokens: TokenRange,
    },

    // Expressions
    Literal {
        text: String,
        tokens: TokenRange,
    },
    Identifier {
        name: String,
        tokens: TokenRange,
    },
    Paren {
        expr: Box<ParseNode>,
        tokens: TokenRange,
    },
    BinaryOp {
        op: BinOp,
        left: Box<ParseNode>,
        right: Box<ParseNode>,
        tokens: TokenRange,
    },
    UnaryOp {
        op: UnOp,
        operand: Box<ParseNode>,
        tokens: TokenRange,
    },
    Assignment {
        lhs: Box<ParseNode>,
        rhs: Box<ParseNode>,
        tokens: TokenRange,
    },
    CompoundAssignment {
        lhs: Box<ParseNode>,
        op: BinOp,
        rhs: Box<ParseNode>,
        tokens: TokenRange,
    },
    TernaryOp {
        condition: Box<ParseNode>,
        true_expr: Box<ParseNode>,
        false_expr: Box<ParseNode>,
        tokens: TokenRange,
    },
    Comma {
        left: Box<ParseNode>,
        right: Box<ParseNode>,
        tokens: TokenRange,
    },
    FunctionCall {
        callee: Box<ParseNode>,
        args: Vec<ParseNode>,
        tokens: TokenRange,
    },
    ArrayAccess {
        array: Box<ParseNode>,
        index: Box<ParseNode>,
        tokens: TokenRange,
    },
    MemberAccess {
        object: Box<ParseNode>,
        member: String,
        tokens: TokenRange,
    },
    PointerMemberAccess {
        object: Box<ParseNode>,
        member: String,
        tokens: TokenRange,
    },
    Cast {
        type_tokens: TokenRange,
        expr: Box<ParseNode>,
        tokens: TokenRange,
    },
    SizeofType {
        type_tokens: TokenRange,
        tokens: TokenRange,
    },
    SizeofExpr {
        expr: Box<ParseNode>,
        tokens: TokenRange,
    },
    /// Brace initializer `{ ... }`; contents are not interpreted
    InitList {
        tokens: TokenRange,
    },
}

impl ParseNode {
    /// Tokens covered by this node
    pub fn tokens(&self) -> TokenRange {
        match self {
            ParseNode::FunctionDef { tokens, .. }
            | ParseNode::Opaque { tokens }
            | ParseNode::Declaration { tokens, .. }
            | ParseNode::Compound { tokens, .. }
            | ParseNode::ExpressionStatement { tokens, .. }
            | ParseNode::Empty { tokens }
            | ParseNode::Return { tokens, .. }
            | ParseNode::If { tokens, .. }
            | ParseNode::While { tokens, .. }
            | ParseNode::DoWhile { tokens, .. }
            | ParseNode::For { tokens, .. }
            | ParseNode::Switch { tokens, .. }
            | ParseNode::Break { tokens }
            | ParseNode::Continue { tokens }
            | ParseNode::Goto { tokens, .. }
            | ParseNode::Label { tokens, .. }
            | ParseNode::Literal { tokens, .. }
            | ParseNode::Identifier { tokens, .. }
            | ParseNode::Paren { tokens, .. }
            | ParseNode::BinaryOp { tokens, .. }
            | ParseNode::UnaryOp { tokens, .. }
            | ParseNode::Assignment { tokens, .. }
            | ParseNode::CompoundAssignment { tokens, .. }
            | ParseNode::TernaryOp { tokens, .. }
            | ParseNode::Comma { tokens, .. }
            | ParseNode::FunctionCall { tokens, .. }
            | ParseNode::ArrayAccess { tokens, .. }
            | ParseNode::MemberAccess { tokens, .. }
            | ParseNode::PointerMemberAccess { tokens, .. }
            | ParseNode::Cast { tokens, .. }
            | ParseNode::SizeofType { tokens, .. }
            | ParseNode::SizeofExpr { tokens, .. }
            | ParseNode::InitList { tokens } => *tokens,
        }
    }
}

/// Parsed translation unit together with the token stream it indexes
#[derive(Debug, Clone, Default)]
pub struct Program {
    pub nodes: Vec<ParseNode>, // FunctionDef and Opaque items in source order
    pub tokens: Vec<Token>,
}

impl Program {
    /// Location of a single token
    pub fn location(&self, index: TokenIndex) -> SourceLocation {
        self.tokens[index].location()
    }

    /// Byte range spanned by a token range
    pub fn byte_range(&self, range: TokenRange) -> std::ops::Range<usize> {
        self.location(range.start).offset..self.location(range.stop).end()
    }

    /// Spelling of a token in the text it was lexed from
    pub fn text<'s>(&self, source: &'s str, index: TokenIndex) -> &'s str {
        let location = self.location(index);
        &source[location.offset..location.end()]
    }

    /// Iterator over the function definitions in source order
    pub fn functions(&self) -> impl Iterator<Item = &ParseNode> {
        self.nodes
            .iter()
            .filter(|node| matches!(node, ParseNode::FunctionDef { .. }))
    }
}
