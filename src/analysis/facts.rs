//! Fact structures extracted from a single AST traversal.
//!
//! Facts are the language-agnostic currency of the pipeline: each front
//! end walks its parse tree exactly once and emits one `Fact` per
//! structural element the detectors care about. Facts are immutable after
//! extraction; all detectors read the same `FactSet`.

use std::fmt;
use std::path::Path;

/// Source location span with byte offsets and line/column positions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Span {
    /// Start byte offset (0-indexed).
    pub start_byte: usize,
    /// End byte offset (0-indexed, exclusive).
    pub end_byte: usize,
    /// Start line (1-indexed).
    pub start_line: usize,
    /// Start column (1-indexed).
    pub start_col: usize,
    /// End line (1-indexed).
    pub end_line: usize,
    /// End column (1-indexed).
    pub end_col: usize,
}

impl Span {
    /// Create a span from a tree-sitter node.
    pub fn from_node(node: tree_sitter::Node) -> Self {
        let start = node.start_position();
        let end = node.end_position();
        Self {
            start_byte: node.start_byte(),
            end_byte: node.end_byte(),
            start_line: start.row + 1, // tree-sitter is 0-indexed
            start_col: start.column + 1,
            end_line: end.row + 1,
            end_col: end.column + 1,
        }
    }

    /// Whether two spans touch the same line range.
    pub fn lines_overlap(&self, other: &Span) -> bool {
        self.start_line <= other.end_line && other.start_line <= self.end_line
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.start_line, self.start_col)
    }
}

/// A literal value observed in source.
#[derive(Debug, Clone, PartialEq)]
pub enum LiteralValue {
    Int(i64),
    Float(f64),
    Str(String),
}

impl LiteralValue {
    /// Stable grouping key; distinguishes `1` from `"1"`.
    pub fn key(&self) -> String {
        match self {
            LiteralValue::Int(i) => format!("i:{}", i),
            LiteralValue::Float(x) => format!("f:{}", x),
            LiteralValue::Str(s) => format!("s:{}", s),
        }
    }
}

impl fmt::Display for LiteralValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LiteralValue::Int(i) => write!(f, "{}", i),
            LiteralValue::Float(x) => write!(f, "{}", x),
            LiteralValue::Str(s) => write!(f, "{:?}", s),
        }
    }
}

/// Syntactic context a literal appears in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LiteralContext {
    /// Operand of a comparison or condition.
    Comparison,
    /// Right-hand side of an assignment to a non-constant name.
    Assignment,
    /// Argument at a call site.
    Argument,
    /// Part of a return expression or other computation.
    Expression,
    /// Bound to a named constant (const item, UPPER_CASE assignment).
    ConstBinding,
}

/// Role a method plays in a class lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleRole {
    Setup,
    Teardown,
    Regular,
}

/// Kind-specific payload of an observed structural element.
#[derive(Debug, Clone)]
pub enum FactKind {
    /// A literal occurrence with the context it was used in.
    Literal {
        value: LiteralValue,
        context: LiteralContext,
        /// Idiomatic values (0, 1, -1, ...) are tagged, not dropped;
        /// detectors decide whether to suppress them.
        low_signal: bool,
        /// Surrounding line mentions credential-like identifiers.
        security_hint: bool,
    },
    /// A function or method signature.
    FunctionSig {
        name: String,
        /// Enclosing class, impl type, or method receiver.
        class_name: Option<String>,
        /// Positional parameters, excluding self/cls/this receivers.
        positional_params: usize,
        param_names: Vec<String>,
        /// All parameters are keyword-only (callers cannot couple on order).
        keyword_only: bool,
        /// Parameters carry type annotations, where the language makes
        /// annotations optional.
        annotated: bool,
    },
    /// A call site.
    CallSite {
        callee: String,
        positional_args: usize,
        keyword_args: usize,
    },
    /// A class-like declaration with its member count and size.
    ClassDecl {
        name: String,
        method_count: usize,
        line_span: usize,
    },
    /// A loop construct.
    Loop,
    /// An await point inside an async function.
    AwaitPoint { has_timeout: bool },
    /// A sleep/delay call.
    SleepCall { callee: String },
    /// Thread or task spawn.
    ThreadSpawn { callee: String },
    /// Lock, mutex, semaphore, or channel usage.
    SyncPrimitive { callee: String },
    /// Assignment to a name; `in_function` is None at module scope.
    GlobalAssign {
        name: String,
        in_function: Option<String>,
    },
    /// A single identifier occurrence.
    NameUse { name: String },
    /// Normalized operation sequence of a function body, identifiers and
    /// literal values stripped, for structural duplication detection.
    BodyShape { function: String, ops: Vec<String> },
    /// A method participating in a class lifecycle protocol.
    LifecycleMethod {
        class_name: String,
        method: String,
        role: LifecycleRole,
    },
    /// Mutable state shared wider than a single call (mutable default
    /// argument, mutable class attribute, static mut, package-level var).
    MutableSharedState { scope: String, name: String },
}

/// A single observed structural element.
#[derive(Debug, Clone)]
pub struct Fact {
    pub kind: FactKind,
    pub span: Span,
}

/// All facts extracted from one file.
#[derive(Debug, Clone)]
pub struct FactSet {
    /// File path as reported in violations.
    pub path: String,
    /// Language identifier ("python", "rust", ...).
    pub language: String,
    pub facts: Vec<Fact>,
    /// Constructs the extractor saw but could not classify into facts,
    /// plus any stray error nodes (surfaced in run metadata).
    pub unhandled_nodes: usize,
}

impl FactSet {
    pub fn new(path: &Path, language: &str) -> Self {
        Self {
            path: path.display().to_string(),
            language: language.to_string(),
            facts: Vec::new(),
            unhandled_nodes: 0,
        }
    }

    pub fn push(&mut self, kind: FactKind, span: Span) {
        self.facts.push(Fact { kind, span });
    }

    /// All function/method signatures.
    pub fn signatures(&self) -> impl Iterator<Item = &Fact> {
        self.facts
            .iter()
            .filter(|f| matches!(f.kind, FactKind::FunctionSig { .. }))
    }

    /// All class declarations.
    pub fn classes(&self) -> impl Iterator<Item = &Fact> {
        self.facts
            .iter()
            .filter(|f| matches!(f.kind, FactKind::ClassDecl { .. }))
    }
}

/// Idiomatic values that rarely signal a magic-literal problem.
///
/// Tagged rather than dropped so the meaning detector stays in charge of
/// suppression. The set covers common array bounds, round percentages,
/// HTTP status codes, and well-known ports.
pub fn is_low_signal(value: &LiteralValue) -> bool {
    match value {
        LiteralValue::Int(i) => matches!(
            *i,
            -1 | 0
                | 1
                | 2
                | 10
                | 24
                | 60
                | 100
                | 1000
                | 200
                | 201
                | 204
                | 400
                | 401
                | 403
                | 404
                | 500
                | 80
                | 443
                | 8080
                | 3000
        ),
        LiteralValue::Float(x) => *x == 0.0 || *x == 0.5 || *x == 1.0,
        LiteralValue::Str(s) => s.len() <= 1,
    }
}
