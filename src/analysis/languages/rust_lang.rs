//! Rust front end.

use std::path::Path;

use anyhow::{bail, Context, Result};
use tree_sitter::{Language, Node, Parser};

use crate::analysis::facts::{FactKind, FactSet, LiteralContext, LiteralValue, Span};
use crate::analysis::{LanguageFrontend, ParsedFile};

use super::{is_comparison_op, lifecycle_role, parse_number, strip_quotes, SECURITY_RE};

pub struct RustFrontend {
    language: Language,
}

impl RustFrontend {
    pub fn new() -> Self {
        Self {
            language: tree_sitter_rust::LANGUAGE.into(),
        }
    }
}

impl Default for RustFrontend {
    fn default() -> Self {
        Self::new()
    }
}

impl LanguageFrontend for RustFrontend {
    fn language_id(&self) -> &'static str {
        "rust"
    }

    fn file_extensions(&self) -> &'static [&'static str] {
        &["rs"]
    }

    fn parse(&self, path: &Path, source: &[u8]) -> Result<ParsedFile> {
        let mut parser = Parser::new();
        parser
            .set_language(&self.language)
            .context("failed to load rust grammar")?;
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
        let mut extractor = Extractor {
            parsed,
            facts: FactSet::new(&parsed.path, self.language_id()),
            impl_stack: Vec::new(),
            fn_stack: Vec::new(),
            shape_stack: Vec::new(),
        };
        extractor.visit(parsed.tree.root_node());
        Ok(extractor.facts)
    }
}

struct Extractor<'a> {
    parsed: &'a ParsedFile,
    facts: FactSet,
    impl_stack: Vec<String>,
    fn_stack: Vec<String>,
    shape_stack: Vec<Vec<String>>,
}

impl<'a> Extractor<'a> {
    fn text(&self, node: Node) -> String {
        self.parsed.node_text(node).to_string()
    }

    fn push(&mut self, kind: FactKind, node: Node) {
        self.facts.push(kind, Span::from_node(node));
    }

    fn push_op(&mut self, op: &str) {
        if let Some(shape) = self.shape_stack.last_mut() {
            shape.push(op.to_string());
        }
    }

    fn visit(&mut self, node: Node) {
        if node.is_error() || node.is_missing() {
            self.facts.unhandled_nodes += 1;
        }
        match node.kind() {
            "function_item" => {
                self.enter_function(node);
                return;
            }
            "impl_item" => {
                self.enter_impl(node);
                return;
            }
            "integer_literal" | "float_literal" => {
                if let Some(value) = parse_number(&self.text(node)) {
                    self.record_literal(node, value);
                }
            }
            "string_literal" | "raw_string_literal" => {
                let value = LiteralValue::Str(strip_quotes(&self.text(node)));
                self.record_literal(node, value);
            }
            "call_expression" => self.record_call(node),
            "await_expression" => {
                let has_timeout = self.text(node).contains("timeout");
                self.push(FactKind::AwaitPoint { has_timeout }, node);
                self.push_op("await");
            }
            "for_expression" | "while_expression" | "loop_expression" => {
                self.push(FactKind::Loop, node);
                self.push_op("loop");
            }
            "if_expression" => self.push_op("if"),
            "match_expression" => self.push_op("match"),
            "return_expression" => self.push_op("ret"),
            "binary_expression" => {
                let op = node
                    .child_by_field_name("operator")
                    .map(|o| self.text(o))
                    .unwrap_or_default();
                if is_comparison_op(&op) {
                    self.push_op("cmp");
                } else {
                    self.push_op("bin");
                }
            }
            "let_declaration" | "assignment_expression" => self.push_op("asgn"),
            "static_item" => {
                let name = node
                    .child_by_field_name("name")
                    .map(|n| self.text(n))
                    .unwrap_or_default();
                // `static mut` is process-wide mutable state.
                let mut cursor = node.walk();
                let is_mut = node
                    .children(&mut cursor)
                    .any(|c| c.kind() == "mutable_specifier");
                if is_mut {
                    self.push(
                        FactKind::MutableSharedState {
                            scope: "static".to_string(),
                            name: name.clone(),
                        },
                        node,
                    );
                }
                self.push(
                    FactKind::GlobalAssign {
                        name,
                        in_function: None,
                    },
                    node,
                );
            }
            "identifier" => {
                let name = self.text(node);
                self.push(FactKind::NameUse { name }, node);
            }
            // Recognized but not classified into facts: closures have no
            // standalone signature here, and macro bodies are opaque.
            "closure_expression" | "macro_invocation" | "async_block" => {
                self.facts.unhandled_nodes += 1
            }
            _ => {}
        }
        let mut cursor = node.walk();
        let children: Vec<Node> = node.children(&mut cursor).collect();
        for child in children {
            self.visit(child);
        }
    }

    fn enter_function(&mut self, node: Node) {
        let name = node
            .child_by_field_name("name")
            .map(|n| self.text(n))
            .unwrap_or_default();
        let class_name = self.impl_stack.last().cloned();

        let mut positional = 0usize;
        let mut param_names = Vec::new();
        if let Some(params) = node.child_by_field_name("parameters") {
            let mut cursor = params.walk();
            for param in params.named_children(&mut cursor) {
                match param.kind() {
                    "parameter" => {
                        positional += 1;
                        if let Some(pattern) = param.child_by_field_name("pattern") {
                            param_names.push(self.text(pattern));
                        }
                    }
                    "self_parameter" => {}
                    _ => {}
                }
            }
        }
        self.push(
            FactKind::FunctionSig {
                name: name.clone(),
                class_name: class_name.clone(),
                positional_params: positional,
                param_names,
                keyword_only: false,
                annotated: true,
            },
            node,
        );

        if let Some(class_name) = class_name {
            if let Some(role) = lifecycle_role(&name) {
                self.push(
                    FactKind::LifecycleMethod {
                        class_name,
                        method: name.clone(),
                        role,
                    },
                    node,
                );
            }
        }

        self.fn_stack.push(name.clone());
        self.shape_stack.push(Vec::new());
        if let Some(body) = node.child_by_field_name("body") {
            let mut cursor = body.walk();
            let children: Vec<Node> = body.children(&mut cursor).collect();
            for child in children {
                self.visit(child);
            }
        }
        let ops = self.shape_stack.pop().unwrap_or_default();
        self.fn_stack.pop();
        let function = match self.impl_stack.last() {
            Some(t) => format!("{t}::{name}"),
            None => name,
        };
        self.push(FactKind::BodyShape { function, ops }, node);
    }

    fn enter_impl(&mut self, node: Node) {
        let type_name = node
            .child_by_field_name("type")
            .map(|n| self.text(n))
            .unwrap_or_default();
        let span = Span::from_node(node);

        let mut method_count = 0usize;
        if let Some(body) = node.child_by_field_name("body") {
            let mut cursor = body.walk();
            method_count = body
                .named_children(&mut cursor)
                .filter(|c| c.kind() == "function_item")
                .count();
        }
        // Impl blocks for the same type are merged downstream by name.
        self.push(
            FactKind::ClassDecl {
                name: type_name.clone(),
                method_count,
                line_span: span.end_line.saturating_sub(span.start_line) + 1,
            },
            node,
        );

        self.impl_stack.push(type_name);
        if let Some(body) = node.child_by_field_name("body") {
            let mut cursor = body.walk();
            let children: Vec<Node> = body.children(&mut cursor).collect();
            for child in children {
                self.visit(child);
            }
        }
        self.impl_stack.pop();
    }

    fn record_literal(&mut self, node: Node, value: LiteralValue) {
        let context = self.literal_context(node);
        let low_signal = crate::analysis::facts::is_low_signal(&value);
        let security_hint = SECURITY_RE.is_match(&self.parsed.line_text(node));
        self.push(
            FactKind::Literal {
                value,
                context,
                low_signal,
                security_hint,
            },
            node,
        );
    }

    fn literal_context(&self, node: Node) -> LiteralContext {
        let Some(parent) = node.parent() else {
            return LiteralContext::Expression;
        };
        match parent.kind() {
            "binary_expression" => {
                let op = parent
                    .child_by_field_name("operator")
                    .map(|o| self.text(o))
                    .unwrap_or_default();
                if is_comparison_op(&op) {
                    LiteralContext::Comparison
                } else {
                    LiteralContext::Expression
                }
            }
            "const_item" | "static_item" => LiteralContext::ConstBinding,
            "let_declaration" | "assignment_expression" => LiteralContext::Assignment,
            "arguments" => LiteralContext::Argument,
            "unary_expression" | "parenthesized_expression" => self.literal_context(parent),
            _ => LiteralContext::Expression,
        }
    }

    fn record_call(&mut self, node: Node) {
        self.push_op("call");
        let Some(function) = node.child_by_field_name("function") else {
            return;
        };
        let callee = self.text(function);

        let mut positional_args = 0usize;
        if let Some(args) = node.child_by_field_name("arguments") {
            let mut cursor = args.walk();
            positional_args = args.named_children(&mut cursor).count();
        }
        self.push(
            FactKind::CallSite {
                callee: callee.clone(),
                positional_args,
                keyword_args: 0,
            },
            node,
        );

        if callee.ends_with("::sleep") || callee.ends_with(".sleep") || callee == "sleep" {
            self.push(FactKind::SleepCall { callee }, node);
        } else if callee.ends_with("::spawn") || callee == "spawn" {
            self.push(FactKind::ThreadSpawn { callee }, node);
        } else if callee.contains("Mutex")
            || callee.contains("RwLock")
            || callee.contains("Semaphore")
            || callee.contains("channel")
            || callee.contains("Barrier")
        {
            self.push(FactKind::SyncPrimitive { callee }, node);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn extract(source: &str) -> FactSet {
        let frontend = RustFrontend::new();
        let parsed = frontend
            .parse(&PathBuf::from("test.rs"), source.as_bytes())
            .unwrap();
        frontend.extract_facts(&parsed).unwrap()
    }

    #[test]
    fn test_const_item_context() {
        let facts = extract("const MAX_RETRIES: u32 = 5;\n");
        let context = facts
            .facts
            .iter()
            .find_map(|f| match &f.kind {
                FactKind::Literal { context, .. } => Some(context.clone()),
                _ => None,
            })
            .unwrap();
        assert_eq!(context, LiteralContext::ConstBinding);
    }

    #[test]
    fn test_impl_methods_counted() {
        let source = "struct S;\nimpl S {\n    fn a(&self) {}\n    fn b(&self) {}\n}\n";
        let facts = extract(source);
        let class = facts.classes().next().unwrap();
        match &class.kind {
            FactKind::ClassDecl {
                name, method_count, ..
            } => {
                assert_eq!(name, "S");
                assert_eq!(*method_count, 2);
            }
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_self_not_a_positional_param() {
        let source = "struct S;\nimpl S {\n    fn m(&self, a: u32, b: u32) {}\n}\n";
        let facts = extract(source);
        let sig = facts.signatures().next().unwrap();
        match &sig.kind {
            FactKind::FunctionSig {
                positional_params, ..
            } => assert_eq!(*positional_params, 2),
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_thread_spawn_and_sleep() {
        let source = "fn main() {\n    std::thread::spawn(|| {});\n    std::thread::sleep(std::time::Duration::from_secs(1));\n}\n";
        let facts = extract(source);
        assert!(facts
            .facts
            .iter()
            .any(|f| matches!(&f.kind, FactKind::ThreadSpawn { .. })));
        assert!(facts
            .facts
            .iter()
            .any(|f| matches!(&f.kind, FactKind::SleepCall { .. })));
    }

    #[test]
    fn test_static_mut_is_shared_state() {
        let facts = extract("static mut COUNTER: u32 = 0;\n");
        assert!(facts.facts.iter().any(|f| matches!(
            &f.kind,
            FactKind::MutableSharedState { name, .. } if name == "COUNTER"
        )));
        assert!(facts.facts.iter().any(|f| matches!(
            &f.kind,
            FactKind::GlobalAssign { name, in_function: None } if name == "COUNTER"
        )));
    }

    #[test]
    fn test_closure_counts_unclassified() {
        let facts = extract("fn main() {\n    let add = |x: u32| x + 1;\n    let _ = add(2);\n}\n");
        assert!(facts.unhandled_nodes > 0);
    }
}
