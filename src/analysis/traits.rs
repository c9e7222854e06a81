//! Core trait for language front ends.

use std::path::{Path, PathBuf};

use super::FactSet;

/// Holds a parsed tree-sitter tree and associated metadata.
///
/// Kept separate from `FactSet` so the tree can be dropped as soon as
/// extraction finishes; only the facts survive into detection.
pub struct ParsedFile {
    /// The tree-sitter parse tree.
    pub tree: tree_sitter::Tree,
    /// The original source code (kept for node text extraction).
    pub source: Vec<u8>,
    /// The file path (for error reporting).
    pub path: PathBuf,
}

impl ParsedFile {
    /// Get text for a tree-sitter node.
    pub fn node_text(&self, node: tree_sitter::Node) -> &str {
        node.utf8_text(&self.source).unwrap_or("")
    }

    /// Raw text of the line a node starts on, for context sniffing.
    pub fn line_text(&self, node: tree_sitter::Node) -> &str {
        let row = node.start_position().row;
        let src = std::str::from_utf8(&self.source).unwrap_or("");
        src.lines().nth(row).unwrap_or("")
    }

    /// Whether the parse produced any ERROR nodes.
    ///
    /// Files that fail this check are treated as unparseable and skipped;
    /// detectors never see a partially built tree.
    pub fn has_errors(&self) -> bool {
        self.tree.root_node().has_error()
    }

    /// Location of the first ERROR node, if any.
    pub fn first_error(&self) -> Option<(usize, usize)> {
        fn find(node: tree_sitter::Node) -> Option<tree_sitter::Node> {
            if node.is_error() || node.is_missing() {
                return Some(node);
            }
            let mut cursor = node.walk();
            for child in node.children(&mut cursor) {
                if let Some(e) = find(child) {
                    return Some(e);
                }
            }
            None
        }
        find(self.tree.root_node()).map(|n| {
            let pos = n.start_position();
            (pos.row + 1, pos.column + 1)
        })
    }
}

/// Language-specific front end.
///
/// Each supported language implements this trait: `parse` turns bytes into
/// a tree, `extract_facts` walks the tree once and produces the flat fact
/// set every detector consumes. This is the only point in the pipeline
/// where language dispatch occurs.
///
/// # Thread Safety
///
/// tree_sitter::Parser is not Sync, so implementations create a parser per
/// call rather than caching one.
pub trait LanguageFrontend: Send + Sync {
    /// Returns the language identifier (e.g., "python", "rust").
    fn language_id(&self) -> &'static str;

    /// Returns file extensions this front end handles (without dot).
    fn file_extensions(&self) -> &'static [&'static str];

    /// Parse a source file into a tree-sitter tree.
    ///
    /// Returns an error only if the parser itself fails; syntactic errors
    /// surface as ERROR nodes checked via `ParsedFile::has_errors`.
    fn parse(&self, path: &Path, source: &[u8]) -> anyhow::Result<ParsedFile>;

    /// Extract all facts from a parsed file in a single traversal.
    fn extract_facts(&self, parsed: &ParsedFile) -> anyhow::Result<FactSet>;

    /// Check if this front end handles the given file extension.
    fn handles_extension(&self, ext: &str) -> bool {
        self.file_extensions().contains(&ext)
    }
}
