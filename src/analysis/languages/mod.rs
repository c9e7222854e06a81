//! Language-specific front end implementations.

mod ecma;
mod go;
mod javascript;
mod python;
mod rust_lang;
mod typescript;

pub use go::GoFrontend;
pub use javascript::JavaScriptFrontend;
pub use python::PythonFrontend;
pub use rust_lang::RustFrontend;
pub use typescript::TypeScriptFrontend;

use lazy_static::lazy_static;
use once_cell::sync::OnceCell;
use regex::Regex;

use super::facts::{LifecycleRole, LiteralValue};
use super::LanguageFrontend;

/// Static storage for the Go front end.
static GO_FRONTEND: OnceCell<GoFrontend> = OnceCell::new();

/// Static storage for the JavaScript front end.
static JAVASCRIPT_FRONTEND: OnceCell<JavaScriptFrontend> = OnceCell::new();

/// Static storage for the Python front end.
static PYTHON_FRONTEND: OnceCell<PythonFrontend> = OnceCell::new();

/// Static storage for the Rust front end.
static RUST_FRONTEND: OnceCell<RustFrontend> = OnceCell::new();

/// Static storage for the TypeScript front end.
static TYPESCRIPT_FRONTEND: OnceCell<TypeScriptFrontend> = OnceCell::new();

/// Get a front end for the given file extension.
///
/// Returns None if no front end handles the extension.
pub fn frontend_for_extension(ext: &str) -> Option<&'static dyn LanguageFrontend> {
    match ext {
        "go" => Some(GO_FRONTEND.get_or_init(GoFrontend::new) as &'static dyn LanguageFrontend),
        "js" | "jsx" | "mjs" => Some(
            JAVASCRIPT_FRONTEND.get_or_init(JavaScriptFrontend::new)
                as &'static dyn LanguageFrontend,
        ),
        "py" => {
            Some(PYTHON_FRONTEND.get_or_init(PythonFrontend::new) as &'static dyn LanguageFrontend)
        }
        "rs" => Some(RUST_FRONTEND.get_or_init(RustFrontend::new) as &'static dyn LanguageFrontend),
        "ts" | "tsx" | "mts" => Some(
            TYPESCRIPT_FRONTEND.get_or_init(TypeScriptFrontend::new)
                as &'static dyn LanguageFrontend,
        ),
        _ => None,
    }
}

/// All file extensions with a registered front end.
pub fn supported_extensions() -> &'static [&'static str] {
    &["go", "js", "jsx", "mjs", "py", "rs", "ts", "tsx", "mts"]
}

lazy_static! {
    /// Credential-ish identifiers near a literal escalate its severity.
    pub(crate) static ref SECURITY_RE: Regex =
        Regex::new(r"(?i)\b(password|passwd|secret|api_?key|token|auth|crypt)").unwrap();
}

/// Method names that imply a class lifecycle ordering.
pub(crate) fn lifecycle_role(name: &str) -> Option<LifecycleRole> {
    match name {
        "__init__" | "__enter__" | "setup" | "set_up" | "initialize" | "init" | "connect"
        | "start" | "open" => Some(LifecycleRole::Setup),
        "__exit__" | "__del__" | "cleanup" | "teardown" | "tear_down" | "disconnect" | "stop"
        | "close" | "shutdown" | "dispose" => Some(LifecycleRole::Teardown),
        _ if !name.starts_with('_') => Some(LifecycleRole::Regular),
        _ => None,
    }
}

/// SCREAMING_SNAKE names mark an intentional constant binding.
pub(crate) fn is_const_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_')
        && name.chars().any(|c| c.is_ascii_uppercase())
}

/// Strip surrounding quotes from a string literal's source text.
pub(crate) fn strip_quotes(text: &str) -> String {
    let t = text
        .trim_start_matches(|c| c == 'r' || c == 'b' || c == 'f' || c == 'u' || c == 'R');
    for q in ["\"\"\"", "'''", "\"", "'", "`"] {
        if t.len() >= 2 * q.len() && t.starts_with(q) && t.ends_with(q) {
            return t[q.len()..t.len() - q.len()].to_string();
        }
    }
    t.to_string()
}

/// Parse a numeric literal's source text into a value.
///
/// Handles underscore separators and hex/octal/binary prefixes; anything
/// unparseable is ignored by the caller.
pub(crate) fn parse_number(text: &str) -> Option<LiteralValue> {
    const SUFFIXES: &[&str] = &[
        "usize", "isize", "u128", "i128", "u64", "i64", "u32", "i32", "u16", "i16", "u8", "i8",
        "f64", "f32", "n",
    ];
    let cleaned: String = text.chars().filter(|c| *c != '_').collect();
    let mut lower = cleaned.to_lowercase();
    for suffix in SUFFIXES {
        if let Some(stripped) = lower.strip_suffix(suffix) {
            if !stripped.is_empty() && stripped.ends_with(|c: char| c.is_ascii_digit() || c == '.')
            {
                lower = stripped.to_string();
                break;
            }
        }
    }
    if let Some(hex) = lower.strip_prefix("0x") {
        return i64::from_str_radix(hex, 16).ok().map(LiteralValue::Int);
    }
    if let Some(oct) = lower.strip_prefix("0o") {
        return i64::from_str_radix(oct, 8).ok().map(LiteralValue::Int);
    }
    if let Some(bin) = lower.strip_prefix("0b") {
        return i64::from_str_radix(bin, 2).ok().map(LiteralValue::Int);
    }
    if let Ok(i) = lower.parse::<i64>() {
        return Some(LiteralValue::Int(i));
    }
    lower.parse::<f64>().ok().map(LiteralValue::Float)
}

/// Binary operators that make a literal operand comparison-coupled.
pub(crate) fn is_comparison_op(op: &str) -> bool {
    matches!(op, "==" | "!=" | "<" | ">" | "<=" | ">=" | "===" | "!==")
}
