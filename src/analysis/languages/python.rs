//! Python front end.
//!
//! Walks the tree-sitter parse tree once, recording literals with their
//! syntactic context, function signatures, class shapes, lifecycle methods,
//! timing-sensitive calls and global rebinding sites.

use std::path::Path;

use anyhow::{bail, Context, Result};
use tree_sitter::{Language, Node, Parser};

use crate::analysis::facts::{FactKind, FactSet, LiteralContext, LiteralValue, Span};
use crate::analysis::{LanguageFrontend, ParsedFile};

use super::{is_const_name, lifecycle_role, parse_number, strip_quotes, SECURITY_RE};

pub struct PythonFrontend {
    language: Language,
}

impl PythonFrontend {
    pub fn new() -> Self {
        Self {
            language: tree_sitter_python::LANGUAGE.into(),
        }
    }
}

impl Default for PythonFrontend {
    fn default() -> Self {
        Self::new()
    }
}

impl LanguageFrontend for PythonFrontend {
    fn language_id(&self) -> &'static str {
        "python"
    }

    fn file_extensions(&self) -> &'static [&'static str] {
        &["py"]
    }

    fn parse(&self, path: &Path, source: &[u8]) -> Result<ParsedFile> {
        let mut parser = Parser::new();
        parser
            .set_language(&self.language)
            .context("failed to load python grammar")?;
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
            class_stack: Vec::new(),
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
    class_stack: Vec<String>,
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
            "function_definition" => {
                self.enter_function(node);
                return;
            }
            "class_definition" => {
                self.enter_class(node);
                return;
            }
            "lambda" => {
                self.enter_lambda(node);
                return;
            }
            "integer" | "float" => self.record_number(node),
            "string" => self.record_string(node),
            "call" => self.record_call(node),
            "await" => {
                let text = self.text(node);
                let has_timeout = text.contains("wait_for") || text.contains("timeout");
                self.push(FactKind::AwaitPoint { has_timeout }, node);
                self.push_op("await");
            }
            "for_statement" | "while_statement" => {
                self.push(FactKind::Loop, node);
                self.push_op("loop");
            }
            "if_statement" => self.push_op("if"),
            "try_statement" => self.push_op("try"),
            "raise_statement" => self.push_op("raise"),
            "with_statement" => self.push_op("with"),
            "return_statement" => self.push_op("ret"),
            "comparison_operator" => self.push_op("cmp"),
            "binary_operator" => self.push_op("bin"),
            "boolean_operator" => self.push_op("bool"),
            "assignment" | "augmented_assignment" => {
                self.push_op("asgn");
                self.record_assignment(node);
            }
            "global_statement" => {
                let in_function = self.fn_stack.last().cloned();
                let mut cursor = node.walk();
                let names: Vec<String> = node
                    .named_children(&mut cursor)
                    .filter(|c| c.kind() == "identifier")
                    .map(|c| self.text(c))
                    .collect();
                for name in names {
                    self.push(
                        FactKind::GlobalAssign {
                            name,
                            in_function: in_function.clone(),
                        },
                        node,
                    );
                }
            }
            "identifier" => {
                let name = self.text(node);
                self.push(FactKind::NameUse { name }, node);
            }
            // Constructs the walker recognizes but does not classify into
            // facts; surfaced through the diagnostic counter.
            "match_statement" | "conditional_expression" | "list_comprehension"
            | "set_comprehension" | "dictionary_comprehension" | "generator_expression"
            | "yield" => self.facts.unhandled_nodes += 1,
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
        let class_name = self.class_stack.last().cloned();

        if let Some(params) = node.child_by_field_name("parameters") {
            self.record_signature(node, params, &name, class_name.clone());
        }

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
        self.push(
            FactKind::BodyShape {
                function: qualified(&self.class_stack, &name),
                ops,
            },
            node,
        );
    }

    /// A lambda bound to a name is a function like any other; anonymous
    /// ones keep a placeholder so their body shapes still pair up.
    fn enter_lambda(&mut self, node: Node) {
        let name = node
            .parent()
            .filter(|p| p.kind() == "assignment")
            .and_then(|p| p.child_by_field_name("left"))
            .filter(|l| l.kind() == "identifier")
            .map(|l| self.text(l))
            .unwrap_or_else(|| "lambda".to_string());

        let mut positional = 0usize;
        let mut param_names = Vec::new();
        if let Some(params) = node.child_by_field_name("parameters") {
            let mut cursor = params.walk();
            let children: Vec<Node> = params.named_children(&mut cursor).collect();
            for param in children {
                match param.kind() {
                    "identifier" => {
                        positional += 1;
                        param_names.push(self.text(param));
                    }
                    "default_parameter" => {
                        positional += 1;
                        if let Some(n) = param.child_by_field_name("name") {
                            param_names.push(self.text(n));
                        }
                    }
                    _ => {}
                }
            }
        }
        self.push(
            FactKind::FunctionSig {
                name: name.clone(),
                class_name: None,
                positional_params: positional,
                param_names,
                keyword_only: false,
                // Lambda parameters cannot carry annotations.
                annotated: true,
            },
            node,
        );

        self.fn_stack.push(name.clone());
        self.shape_stack.push(Vec::new());
        if let Some(body) = node.child_by_field_name("body") {
            self.visit(body);
        }
        let ops = self.shape_stack.pop().unwrap_or_default();
        self.fn_stack.pop();
        self.push(
            FactKind::BodyShape {
                function: qualified(&self.class_stack, &name),
                ops,
            },
            node,
        );
    }

    fn record_signature(
        &mut self,
        fn_node: Node,
        params: Node,
        name: &str,
        class_name: Option<String>,
    ) {
        let mut positional = 0usize;
        let mut param_names = Vec::new();
        let mut keyword_only = false;
        let mut all_annotated = true;
        let mut saw_separator = false;

        let mut cursor = params.walk();
        let children: Vec<Node> = params.named_children(&mut cursor).collect();
        for param in children {
            match param.kind() {
                "identifier" => {
                    let pname = self.text(param);
                    if pname == "self" || pname == "cls" {
                        continue;
                    }
                    if !saw_separator {
                        positional += 1;
                        all_annotated = false;
                    }
                    param_names.push(pname);
                }
                "typed_parameter" => {
                    let pname = param
                        .named_child(0)
                        .map(|n| self.text(n))
                        .unwrap_or_default();
                    if !saw_separator {
                        positional += 1;
                    }
                    param_names.push(pname);
                }
                "default_parameter" | "typed_default_parameter" => {
                    let pname = param
                        .child_by_field_name("name")
                        .map(|n| self.text(n))
                        .unwrap_or_default();
                    if param.kind() == "default_parameter" {
                        all_annotated = false;
                    }
                    if !saw_separator {
                        positional += 1;
                    }
                    // Mutable default values alias one object across calls.
                    if let Some(value) = param.child_by_field_name("value") {
                        if matches!(value.kind(), "list" | "dictionary" | "set") {
                            self.push(
                                FactKind::MutableSharedState {
                                    scope: name.to_string(),
                                    name: pname.clone(),
                                },
                                param,
                            );
                        }
                    }
                    param_names.push(pname);
                }
                "list_splat_pattern" | "keyword_separator" => {
                    saw_separator = true;
                    if positional == 0 {
                        keyword_only = true;
                    }
                }
                "dictionary_splat_pattern" | "positional_separator" => {}
                _ => {}
            }
        }

        // Private helpers are exempt from annotation findings.
        let public = !name.starts_with('_');
        self.push(
            FactKind::FunctionSig {
                name: name.to_string(),
                class_name,
                positional_params: positional,
                param_names,
                keyword_only,
                annotated: all_annotated || !public,
            },
            fn_node,
        );
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
            for stmt in body.named_children(&mut cursor) {
                match stmt.kind() {
                    "function_definition" => method_count += 1,
                    "decorated_definition" => {
                        if stmt
                            .child_by_field_name("definition")
                            .map(|d| d.kind() == "function_definition")
                            .unwrap_or(false)
                        {
                            method_count += 1;
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

    fn record_number(&mut self, node: Node) {
        let Some(value) = parse_number(&self.text(node)) else {
            return;
        };
        self.record_literal(node, value);
    }

    fn record_string(&mut self, node: Node) {
        // Docstrings and f-strings are not magic values.
        if node
            .parent()
            .map(|p| p.kind() == "expression_statement")
            .unwrap_or(false)
        {
            return;
        }
        let mut cursor = node.walk();
        if node
            .named_children(&mut cursor)
            .any(|c| c.kind() == "interpolation")
        {
            return;
        }
        let value = LiteralValue::Str(strip_quotes(&self.text(node)));
        self.record_literal(node, value);
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
            "comparison_operator" => LiteralContext::Comparison,
            "assignment" | "augmented_assignment" => {
                let target_is_const = parent
                    .child_by_field_name("left")
                    .filter(|l| l.kind() == "identifier")
                    .map(|l| is_const_name(&self.text(l)))
                    .unwrap_or(false);
                if target_is_const {
                    LiteralContext::ConstBinding
                } else {
                    LiteralContext::Assignment
                }
            }
            "argument_list" | "keyword_argument" => LiteralContext::Argument,
            "default_parameter" | "typed_default_parameter" => LiteralContext::Assignment,
            "unary_operator" | "parenthesized_expression" => self.literal_context(parent),
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
        let mut keyword_args = 0usize;
        if let Some(args) = node.child_by_field_name("arguments") {
            let mut cursor = args.walk();
            for arg in args.named_children(&mut cursor) {
                if arg.kind() == "keyword_argument" {
                    keyword_args += 1;
                } else {
                    positional_args += 1;
                }
            }
        }
        self.push(
            FactKind::CallSite {
                callee: callee.clone(),
                positional_args,
                keyword_args,
            },
            node,
        );

        if callee == "sleep" || callee.ends_with(".sleep") {
            self.push(FactKind::SleepCall { callee }, node);
        } else if callee.contains("Thread")
            || callee.contains("Process")
            || callee.ends_with("create_task")
            || callee.ends_with("ensure_future")
        {
            self.push(FactKind::ThreadSpawn { callee }, node);
        } else if callee.contains("Lock")
            || callee.contains("Semaphore")
            || callee.contains("Condition")
            || callee.contains("Barrier")
            || callee.ends_with("Queue")
            || callee.ends_with("Event")
        {
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
        let name = self.text(left);
        if self.fn_stack.is_empty() && self.class_stack.is_empty() {
            self.push(
                FactKind::GlobalAssign {
                    name: name.clone(),
                    in_function: None,
                },
                node,
            );
        }
        // Class attributes initialised to mutable containers are shared
        // across every instance.
        if self.fn_stack.is_empty() {
            if let Some(class_name) = self.class_stack.last().cloned() {
                let value_kind = node
                    .child_by_field_name("right")
                    .map(|r| r.kind())
                    .unwrap_or("");
                if matches!(value_kind, "list" | "dictionary" | "set") {
                    self.push(
                        FactKind::MutableSharedState {
                            scope: class_name,
                            name,
                        },
                        node,
                    );
                }
            }
        }
    }
}

fn qualified(class_stack: &[String], name: &str) -> String {
    match class_stack.last() {
        Some(class) => format!("{class}.{name}"),
        None => name.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn extract(source: &str) -> FactSet {
        let frontend = PythonFrontend::new();
        let parsed = frontend
            .parse(&PathBuf::from("test.py"), source.as_bytes())
            .unwrap();
        frontend.extract_facts(&parsed).unwrap()
    }

    #[test]
    fn test_magic_float_in_expression() {
        let facts = extract("def area(r):\n    return r * r * 3.14159\n");
        let literal = facts
            .facts
            .iter()
            .find_map(|f| match &f.kind {
                FactKind::Literal {
                    value: LiteralValue::Float(v),
                    low_signal,
                    ..
                } => Some((*v, *low_signal, f.span.start_line)),
                _ => None,
            })
            .unwrap();
        assert_eq!(literal, (3.14159, false, 2));
    }

    #[test]
    fn test_const_binding_context() {
        let facts = extract("TIMEOUT_SECONDS = 30\n");
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
    fn test_signature_counts_positional() {
        let facts = extract("def f(a, b, c, *, d, e):\n    pass\n");
        let sig = facts.signatures().next().unwrap();
        match &sig.kind {
            FactKind::FunctionSig {
                positional_params,
                param_names,
                ..
            } => {
                assert_eq!(*positional_params, 3);
                assert_eq!(param_names.len(), 5);
            }
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_method_skips_self() {
        let facts = extract("class C:\n    def m(self, a, b):\n        pass\n");
        let sig = facts.signatures().next().unwrap();
        match &sig.kind {
            FactKind::FunctionSig {
                positional_params,
                class_name,
                ..
            } => {
                assert_eq!(*positional_params, 2);
                assert_eq!(class_name.as_deref(), Some("C"));
            }
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_class_method_count() {
        let source = "class Big:\n    def a(self): pass\n    def b(self): pass\n    def c(self): pass\n";
        let facts = extract(source);
        let class = facts.classes().next().unwrap();
        match &class.kind {
            FactKind::ClassDecl { method_count, .. } => assert_eq!(*method_count, 3),
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_sleep_and_global() {
        let source = "import time\n\ncounter = 0\n\ndef tick():\n    global counter\n    counter = counter + 1\n    time.sleep(5)\n";
        let facts = extract(source);
        assert!(facts
            .facts
            .iter()
            .any(|f| matches!(&f.kind, FactKind::SleepCall { callee } if callee == "time.sleep")));
        assert!(facts.facts.iter().any(|f| matches!(
            &f.kind,
            FactKind::GlobalAssign { name, in_function: Some(func) }
                if name == "counter" && func == "tick"
        )));
        assert!(facts.facts.iter().any(|f| matches!(
            &f.kind,
            FactKind::GlobalAssign { name, in_function: None } if name == "counter"
        )));
    }

    #[test]
    fn test_lambda_named_from_binding() {
        let facts = extract("scale = lambda a, b, c, d, e, f: a * b\n");
        let sig = facts.signatures().next().unwrap();
        match &sig.kind {
            FactKind::FunctionSig {
                name,
                positional_params,
                annotated,
                ..
            } => {
                assert_eq!(name, "scale");
                assert_eq!(*positional_params, 6);
                assert!(annotated);
            }
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_match_statement_counts_unclassified() {
        let facts = extract("def pick(x):\n    match x:\n        case 1:\n            return 1\n");
        assert!(facts.unhandled_nodes > 0);
    }

    #[test]
    fn test_docstring_not_a_literal() {
        let facts = extract("def f():\n    \"\"\"Docs here.\"\"\"\n    return 1\n");
        assert!(!facts.facts.iter().any(|f| matches!(
            &f.kind,
            FactKind::Literal { value: LiteralValue::Str(_), .. }
        )));
    }

    #[test]
    fn test_mutable_default_argument() {
        let facts = extract("def f(items=[]):\n    items.append(1)\n");
        assert!(facts.facts.iter().any(|f| matches!(
            &f.kind,
            FactKind::MutableSharedState { scope, name } if scope == "f" && name == "items"
        )));
    }

    #[test]
    fn test_lifecycle_methods() {
        let source = "class Conn:\n    def __init__(self): pass\n    def close(self): pass\n    def query(self): pass\n";
        let facts = extract(source);
        let roles: Vec<_> = facts
            .facts
            .iter()
            .filter_map(|f| match &f.kind {
                FactKind::LifecycleMethod { role, .. } => Some(role.clone()),
                _ => None,
            })
            .collect();
        assert!(roles.contains(&crate::analysis::facts::LifecycleRole::Setup));
        assert!(roles.contains(&crate::analysis::facts::LifecycleRole::Teardown));
        assert!(roles.contains(&crate::analysis::facts::LifecycleRole::Regular));
    }

    #[test]
    fn test_body_shape_recorded() {
        let facts = extract("def f(x):\n    if x > 0:\n        return x\n    return 0\n");
        let shape = facts
            .facts
            .iter()
            .find_map(|f| match &f.kind {
                FactKind::BodyShape { function, ops } if function == "f" => Some(ops.clone()),
                _ => None,
            })
            .unwrap();
        assert!(shape.contains(&"if".to_string()));
        assert!(shape.contains(&"ret".to_string()));
    }
}
