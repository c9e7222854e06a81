//! Shared fact extraction for the ECMAScript family.
//!
//! TypeScript and JavaScript parse trees share almost all node kinds, so
//! both front ends delegate to this walker and differ only in grammar and
//! annotation handling.

use tree_sitter::Node;

use crate::analysis::facts::{FactKind, FactSet, LiteralContext, LiteralValue, Span};
use crate::analysis::ParsedFile;

use super::{is_comparison_op, is_const_name, lifecycle_role, parse_number, strip_quotes, SECURITY_RE};

pub(crate) struct EcmaExtractor<'a> {
    parsed: &'a ParsedFile,
    pub facts: FactSet,
    /// TypeScript tracks parameter type annotations; JavaScript has none.
    typed: bool,
    class_stack: Vec<String>,
    fn_stack: Vec<String>,
    shape_stack: Vec<Vec<String>>,
}

impl<'a> EcmaExtractor<'a> {
    pub fn new(parsed: &'a ParsedFile, language_id: &str, typed: bool) -> Self {
        Self {
            parsed,
            facts: FactSet::new(&parsed.path, language_id),
            typed,
            class_stack: Vec::new(),
            fn_stack: Vec::new(),
            shape_stack: Vec::new(),
        }
    }

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

    pub fn visit(&mut self, node: Node) {
        if node.is_error() || node.is_missing() {
            self.facts.unhandled_nodes += 1;
        }
        match node.kind() {
            "function_declaration" | "function_expression" | "method_definition"
            | "generator_function_declaration" | "arrow_function" => {
                self.enter_function(node);
                return;
            }
            "class_declaration" => {
                self.enter_class(node);
                return;
            }
            "number" => {
                if let Some(value) = parse_number(&self.text(node)) {
                    self.record_literal(node, value);
                }
            }
            "string" => {
                let value = LiteralValue::Str(strip_quotes(&self.text(node)));
                self.record_literal(node, value);
            }
            "call_expression" | "new_expression" => self.record_call(node),
            "await_expression" => {
                let text = self.text(node);
                let has_timeout = text.contains("timeout") || text.contains("race");
                self.push(FactKind::AwaitPoint { has_timeout }, node);
                self.push_op("await");
            }
            "for_statement" | "for_in_statement" | "while_statement" | "do_statement" => {
                self.push(FactKind::Loop, node);
                self.push_op("loop");
            }
            "if_statement" => self.push_op("if"),
            "switch_statement" => self.push_op("switch"),
            "try_statement" => self.push_op("try"),
            "throw_statement" => self.push_op("throw"),
            "return_statement" => self.push_op("ret"),
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
            "assignment_expression" | "augmented_assignment_expression" => {
                self.push_op("asgn");
                self.record_assignment(node);
            }
            "lexical_declaration" | "variable_declaration" => self.record_declaration(node),
            "identifier" => {
                let name = self.text(node);
                self.push(FactKind::NameUse { name }, node);
            }
            // Recognized but not classified into facts.
            "ternary_expression" | "yield_expression" | "labeled_statement"
            | "with_statement" => self.facts.unhandled_nodes += 1,
            _ => {}
        }
        let mut cursor = node.walk();
        let children: Vec<Node> = node.children(&mut cursor).collect();
        for child in children {
            self.visit(child);
        }
    }

    /// Arrow functions and function expressions carry no name of their own;
    /// take it from the binding they are assigned to.
    fn binding_name(&self, node: Node) -> Option<String> {
        let parent = node.parent()?;
        match parent.kind() {
            "variable_declarator" => parent.child_by_field_name("name").map(|n| self.text(n)),
            "assignment_expression" => parent.child_by_field_name("left").map(|n| self.text(n)),
            "pair" => parent.child_by_field_name("key").map(|n| self.text(n)),
            "field_definition" | "public_field_definition" => {
                parent.child_by_field_name("property").map(|n| self.text(n))
            }
            _ => None,
        }
    }

    fn enter_function(&mut self, node: Node) {
        let name = node
            .child_by_field_name("name")
            .map(|n| self.text(n))
            .or_else(|| self.binding_name(node))
            .unwrap_or_default();
        let in_class = node.kind() == "method_definition";
        let class_name = if in_class {
            self.class_stack.last().cloned()
        } else {
            None
        };

        let mut positional = 0usize;
        let mut param_names = Vec::new();
        let mut all_annotated = true;
        if let Some(params) = node.child_by_field_name("parameters") {
            let mut cursor = params.walk();
            for param in params.named_children(&mut cursor) {
                match param.kind() {
                    "identifier" => {
                        positional += 1;
                        param_names.push(self.text(param));
                        all_annotated = false;
                    }
                    "required_parameter" | "optional_parameter" => {
                        positional += 1;
                        if let Some(pattern) = param.child_by_field_name("pattern") {
                            param_names.push(self.text(pattern));
                        }
                        let mut pc = param.walk();
                        if !param.children(&mut pc).any(|c| c.kind() == "type_annotation") {
                            all_annotated = false;
                        }
                    }
                    "assignment_pattern" => {
                        positional += 1;
                        if let Some(left) = param.child_by_field_name("left") {
                            param_names.push(self.text(left));
                        }
                        all_annotated = false;
                    }
                    "rest_pattern" => {}
                    _ => {}
                }
            }
        } else if let Some(param) = node.child_by_field_name("parameter") {
            // x => ... shorthand; a lone identifier cannot carry a type.
            if param.kind() == "identifier" {
                positional = 1;
                param_names.push(self.text(param));
                all_annotated = false;
            }
        }
        self.push(
            FactKind::FunctionSig {
                name: name.clone(),
                class_name: class_name.clone(),
                positional_params: positional,
                param_names,
                keyword_only: false,
                annotated: !self.typed || all_annotated || positional == 0,
            },
            node,
        );

        if let Some(class_name) = class_name {
            let role_name = if name == "constructor" { "init" } else { &name };
            if let Some(role) = lifecycle_role(role_name) {
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
        let function = match self.class_stack.last() {
            Some(class) if in_class => format!("{class}.{name}"),
            _ => name,
        };
        self.push(FactKind::BodyShape { function, ops }, node);
    }

    fn enter_class(&mut self, node: Node) {
        let name = node
            .child_by_field_name("name")
            .map(|n| self.text(n))
            .unwrap_or_default();
        let span = Span::from_node(node);

        let mut method_count = 0usize;
        if let Some(body) = node.child_by_field_name("body") {
            let mut cursor = body.walk();
            for member in body.named_children(&mut cursor) {
                match member.kind() {
                    "method_definition" => method_count += 1,
                    // Class fields initialised to arrays or objects are
                    // shared mutable state on the prototype chain.
                    "field_definition" | "public_field_definition" => {
                        let value_kind = member
                            .child_by_field_name("value")
                            .map(|v| v.kind())
                            .unwrap_or("");
                        if matches!(value_kind, "array" | "object") {
                            let field = member
                                .child_by_field_name("property")
                                .map(|p| self.text(p))
                                .unwrap_or_default();
                            self.push(
                                FactKind::MutableSharedState {
                                    scope: name.clone(),
                                    name: field,
                                },
                                member,
                            );
                        }
                    }
                    _ => {}
                }
            }
        }
        self.push(
            FactKind::ClassDecl {
                name: name.clone(),
                method_count,
                line_span: span.end_line.saturating_sub(span.start_line) + 1,
            },
            node,
        );

        self.class_stack.push(name);
        if let Some(body) = node.child_by_field_name("body") {
            let mut cursor = body.walk();
            let children: Vec<Node> = body.children(&mut cursor).collect();
            for child in children {
                self.visit(child);
            }
        }
        self.class_stack.pop();
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
            "variable_declarator" => {
                let const_name = parent
                    .child_by_field_name("name")
                    .filter(|n| n.kind() == "identifier")
                    .map(|n| is_const_name(&self.text(n)))
                    .unwrap_or(false);
                if const_name {
                    LiteralContext::ConstBinding
                } else {
                    LiteralContext::Assignment
                }
            }
            "assignment_expression" | "augmented_assignment_expression" => {
                LiteralContext::Assignment
            }
            "arguments" => LiteralContext::Argument,
            "unary_expression" | "parenthesized_expression" => self.literal_context(parent),
            _ => LiteralContext::Expression,
        }
    }

    fn record_call(&mut self, node: Node) {
        self.push_op("call");
        let callee_node = node
            .child_by_field_name("function")
            .or_else(|| node.child_by_field_name("constructor"));
        let Some(function) = callee_node else {
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

        if callee == "setTimeout" || callee == "setInterval" || callee.ends_with(".sleep") {
            self.push(FactKind::SleepCall { callee }, node);
        } else if callee == "Worker" || callee.ends_with(".Worker") {
            self.push(FactKind::ThreadSpawn { callee }, node);
        } else if callee.starts_with("Atomics") || callee.contains("Mutex") {
            self.push(FactKind::SyncPrimitive { callee }, node);
        }
    }

    fn record_assignment(&mut self, node: Node) {
        let Some(left) = node.child_by_field_name("left") else {
            return;
        };
        if left.kind() != "identifier" {
            return;
        }
        if let Some(function) = self.fn_stack.last().cloned() {
            self.push(
                FactKind::GlobalAssign {
                    name: self.text(left),
                    in_function: Some(function),
                },
                node,
            );
        }
    }

    fn record_declaration(&mut self, node: Node) {
        // Module-level let/var bindings are rebindable globals.
        if !self.fn_stack.is_empty() || !self.class_stack.is_empty() {
            return;
        }
        let keyword = self
            .text(node)
            .split_whitespace()
            .next()
            .unwrap_or("")
            .to_string();
        if keyword == "const" {
            return;
        }
        let mut cursor = node.walk();
        let declarators: Vec<Node> = node
            .named_children(&mut cursor)
            .filter(|c| c.kind() == "variable_declarator")
            .collect();
        for declarator in declarators {
            if let Some(name) = declarator
                .child_by_field_name("name")
                .filter(|n| n.kind() == "identifier")
            {
                self.push(
                    FactKind::GlobalAssign {
                        name: self.text(name),
                        in_function: None,
                    },
                    declarator,
                );
            }
        }
    }
}
