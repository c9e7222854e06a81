//! Go front end.

use std::path::Path;

use anyhow::{bail, Context, Result};
use tree_sitter::{Language, Node, Parser};

use crate::analysis::facts::{FactKind, FactSet, LiteralContext, LiteralValue, Span};
use crate::analysis::{LanguageFrontend, ParsedFile};

use super::{is_comparison_op, lifecycle_role, parse_number, strip_quotes, SECURITY_RE};

pub struct GoFrontend {
    language: Language,
}

impl GoFrontend {
    pub fn new() -> Self {
        Self {
            language: tree_sitter_go::LANGUAGE.into(),
        }
    }
}

impl Default for GoFrontend {
    fn default() -> Self {
        Self::new()
    }
}

impl LanguageFrontend for GoFrontend {
    fn language_id(&self) -> &'static str {
        "go"
    }

    fn file_extensions(&self) -> &'static [&'static str] {
        &["go"]
    }

    fn parse(&self, path: &Path, source: &[u8]) -> Result<ParsedFile> {
        let mut parser = Parser::new();
        parser
            .set_language(&self.language)
            .context("failed to load go grammar")?;
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
            "function_declaration" => {
                self.enter_function(node, None);
                return;
            }
            "method_declaration" => {
                let receiver = self.receiver_type(node);
                self.enter_function(node, receiver);
                return;
            }
            "int_literal" | "float_literal" => {
                if let Some(value) = parse_number(&self.text(node)) {
                    self.record_literal(node, value);
                }
            }
            "interpreted_string_literal" | "raw_string_literal" => {
                let value = LiteralValue::Str(strip_quotes(&self.text(node)));
                self.record_literal(node, value);
            }
            "call_expression" => self.record_call(node),
            "go_statement" => {
                let callee = node
                    .named_child(0)
                    .map(|c| self.text(c))
                    .unwrap_or_default();
                self.push(FactKind::ThreadSpawn { callee }, node);
                self.push_op("go");
            }
            "send_statement" => {
                self.push(
                    FactKind::SyncPrimitive {
                        callee: "chan send".to_string(),
                    },
                    node,
                );
            }
            "for_statement" => {
                self.push(FactKind::Loop, node);
                self.push_op("loop");
            }
            "if_statement" => self.push_op("if"),
            "expression_switch_statement" | "type_switch_statement" => self.push_op("switch"),
            "return_statement" => self.push_op("ret"),
            "defer_statement" => self.push_op("defer"),
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
            "assignment_statement" => {
                self.push_op("asgn");
                self.record_assignment(node);
            }
            // := always binds a new local, never a package var.
            "short_var_declaration" => self.push_op("asgn"),
            "var_declaration" => self.record_var_declaration(node),
            "identifier" => {
                let name = self.text(node);
                self.push(FactKind::NameUse { name }, node);
            }
            // Recognized but not classified into facts.
            "select_statement" | "labeled_statement" | "goto_statement" => {
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

    fn receiver_type(&self, node: Node) -> Option<String> {
        let receiver = node.child_by_field_name("receiver")?;
        let mut cursor = receiver.walk();
        let decl = receiver
            .named_children(&mut cursor)
            .find(|c| c.kind() == "parameter_declaration")?;
        let ty = decl.child_by_field_name("type")?;
        Some(self.text(ty).trim_start_matches('*').to_string())
    }

    fn enter_function(&mut self, node: Node, class_name: Option<String>) {
        let name = node
            .child_by_field_name("name")
            .map(|n| self.text(n))
            .unwrap_or_default();

        let mut positional = 0usize;
        let mut param_names = Vec::new();
        if let Some(params) = node.child_by_field_name("parameters") {
            let mut cursor = params.walk();
            for decl in params.named_children(&mut cursor) {
                if decl.kind() != "parameter_declaration"
                    && decl.kind() != "variadic_parameter_declaration"
                {
                    continue;
                }
                // A parameter declaration can bind several names to one type.
                let mut dc = decl.walk();
                let names: Vec<String> = decl
                    .children_by_field_name("name", &mut dc)
                    .map(|n| self.text(n))
                    .collect();
                if names.is_empty() {
                    positional += 1;
                } else {
                    positional += names.len();
                    param_names.extend(names);
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

        if let Some(class_name) = class_name.clone() {
            let lowered = name.to_lowercase();
            if let Some(role) = lifecycle_role(&lowered) {
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
        let function = match class_name {
            Some(recv) => format!("{recv}.{name}"),
            None => name,
        };
        self.push(FactKind::BodyShape { function, ops }, node);
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
            "const_spec" => LiteralContext::ConstBinding,
            "var_spec" | "assignment_statement" | "short_var_declaration" => {
                LiteralContext::Assignment
            }
            "argument_list" => LiteralContext::Argument,
            // expression_list wraps const/var/return values; look through it.
            "expression_list" | "unary_expression" | "parenthesized_expression" => {
                self.literal_context(parent)
            }
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

        if callee == "time.Sleep" || callee.ends_with(".Sleep") {
            self.push(FactKind::SleepCall { callee }, node);
        } else if callee.ends_with(".Lock")
            || callee.ends_with(".Unlock")
            || callee.ends_with(".RLock")
            || callee.ends_with(".RUnlock")
            || callee.ends_with(".Wait")
            || callee.ends_with(".Add")
            || callee.ends_with(".Done")
        {
            self.push(FactKind::SyncPrimitive { callee }, node);
        }
    }

    fn record_assignment(&mut self, node: Node) {
        let Some(function) = self.fn_stack.last().cloned() else {
            return;
        };
        let Some(left) = node.child_by_field_name("left") else {
            return;
        };
        let mut cursor = left.walk();
        let names: Vec<String> = left
            .named_children(&mut cursor)
            .filter(|c| c.kind() == "identifier")
            .map(|c| self.text(c))
            .collect();
        for name in names {
            self.push(
                FactKind::GlobalAssign {
                    name,
                    in_function: Some(function.clone()),
                },
                node,
            );
        }
    }

    fn record_var_declaration(&mut self, node: Node) {
        // Only package-level vars are rebindable globals.
        if !self.fn_stack.is_empty() {
            return;
        }
        let mut cursor = node.walk();
        let specs: Vec<Node> = node
            .named_children(&mut cursor)
            .filter(|c| c.kind() == "var_spec")
            .collect();
        for spec in specs {
            let mut sc = spec.walk();
            let names: Vec<String> = spec
                .children_by_field_name("name", &mut sc)
                .map(|n| self.text(n))
                .collect();
            for name in names {
                self.push(
                    FactKind::GlobalAssign {
                        name,
                        in_function: None,
                    },
                    spec,
                );
            }
        }
    }
}
