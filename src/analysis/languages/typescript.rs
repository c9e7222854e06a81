//! TypeScript front end, delegating to the shared ECMAScript walker.

use std::path::Path;

use anyhow::{bail, Context, Result};
use tree_sitter::{Language, Parser};

use crate::analysis::facts::FactSet;
use crate::analysis::{LanguageFrontend, ParsedFile};

use super::ecma::EcmaExtractor;

pub struct TypeScriptFrontend {
    language: Language,
}

impl TypeScriptFrontend {
    pub fn new() -> Self {
        Self {
            language: tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into(),
        }
    }
}

impl Default for TypeScriptFrontend {
    fn default() -> Self {
        Self::new()
    }
}

impl LanguageFrontend for TypeScriptFrontend {
    fn language_id(&self) -> &'static str {
        "typescript"
    }

    fn file_extensions(&self) -> &'static [&'static str] {
        &["ts", "tsx", "mts"]
    }

    fn parse(&self, path: &Path, source: &[u8]) -> Result<ParsedFile> {
        let mut parser = Parser::new();
        parser
            .set_language(&self.language)
            .context("failed to load typescript grammar")?;
        let Some(tree) = parser.parse(source, None) else {
            bail!("parser returned no tree for {}", path.display());
        };
        Ok(ParsedFile {
            tree,
            source: source.to_vec(),
            path: path.to_path_buf(),
        })
    }

    fn extract_facts(&self, parsed: &ParsedFile) -> Result<FactSet> {
        let mut extractor = EcmaExtractor::new(parsed, self.language_id(), true);
        extractor.visit(parsed.tree.root_node());
        Ok(extractor.facts)
    }
}
