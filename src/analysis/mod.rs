//! Parsing and fact extraction.
//!
//! Each supported language has a front end that parses a file with
//! tree-sitter and distills the parse tree, in a single traversal, into a
//! flat [`FactSet`]. Detectors downstream only ever see facts, never trees.

pub mod facts;
pub mod languages;
mod traits;

pub use facts::{Fact, FactKind, FactSet, LiteralContext, LiteralValue, Span};
pub use languages::{frontend_for_extension, supported_extensions};
pub use traits::{LanguageFrontend, ParsedFile};
