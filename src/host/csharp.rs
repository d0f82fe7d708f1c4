use crate::host::types::{TypeDecl, TypeTable};
use crate::model::{
    Accessibility, Annotation, AttributeList, DeclKind, Declaration, Location, Span, TypeKind,
};
use crate::syntax::{ArgList, CallSite, Expr, Invocation, MemberAccess, RootExpr, Unit};
use anyhow::{Result, anyhow};
use std::collections::HashMap;
use std::ops::Range;
use std::sync::Arc;
use tree_sitter::{Node, Parser, Tree};

pub struct CSharpParser {
    parser: Parser,
}

impl CSharpParser {
    pub fn new() -> Result<Self> {
        let mut parser = Parser::new();
        let language = tree_sitter_c_sharp::LANGUAGE;
        parser.set_language(&language.into())?;
        Ok(Self { parser })
    }

    pub fn parse(&mut self, rel_path: &str, source: String) -> Result<ParsedFile> {
        let tree = self
            .parser
            .parse(&source, None)
            .ok_or_else(|| anyhow!("parse {rel_path}"))?;
        if tree.root_node().has_error() {
            tracing::debug!(path = rel_path, "source has syntax errors");
        }
        Ok(ParsedFile {
            rel_path: rel_path.to_string(),
            source,
            tree,
        })
    }
}

pub struct ParsedFile {
    pub rel_path: String,
    pub source: String,
    pub tree: Tree,
}

/// Byte ranges of one declaration's editable parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeclSyntax {
    /// Attribute lists and modifiers, up to the declared type.
    pub head: Range<usize>,
    /// Parallel to the declaration's `attribute_lists`.
    pub attribute_lists: Vec<Range<usize>>,
    pub modifiers: Vec<Range<usize>>,
    pub ty: Range<usize>,
    /// Leading whitespace of the declaration's first line.
    pub indent: String,
    /// Attribute lists sit on their own lines.
    pub multiline: bool,
}

#[derive(Debug, Clone)]
pub struct LoweredFile {
    pub unit: Unit,
    /// Parallel to `unit.declarations()`.
    pub decl_syntax: Vec<DeclSyntax>,
}

#[derive(Clone, Default)]
struct Context {
    namespace_stack: Vec<String>,
    type_stack: Vec<String>,
}

impl Context {
    fn namespace(&self) -> Option<String> {
        if self.namespace_stack.is_empty() {
            None
        } else {
            Some(self.namespace_stack.join("."))
        }
    }

    /// Namespace for a type nested in the current scope.
    fn container(&self) -> Option<String> {
        let mut parts = self.namespace_stack.clone();
        parts.extend(self.type_stack.iter().cloned());
        if parts.is_empty() {
            None
        } else {
            Some(parts.join("."))
        }
    }
}

/// Type declarations of one file, for the workspace type table.
pub fn collect_types(file: &ParsedFile) -> Vec<TypeDecl> {
    let mut out = Vec::new();
    let root = file.tree.root_node();
    let ctx = root_context(root, &file.source);
    walk_types(root, &ctx, &file.source, &mut out);
    out
}

fn walk_types(node: Node<'_>, ctx: &Context, source: &str, out: &mut Vec<TypeDecl>) {
    match node.kind() {
        "namespace_declaration" => {
            let next = enter_namespace(node, ctx, source);
            if let Some(body) = node.child_by_field_name("body") {
                walk_children(body, |child| walk_types(child, &next, source, out));
            }
            return;
        }
        kind => {
            if let Some(type_kind) = type_kind_for(node, kind, source) {
                let Some(name) = node
                    .child_by_field_name("name")
                    .map(|n| node_text(n, source))
                    .filter(|name| !name.is_empty())
                else {
                    return;
                };
                out.push(TypeDecl {
                    name: name.clone(),
                    namespace: ctx.container(),
                    kind: type_kind,
                    bases: base_types(node, source),
                });
                let mut next = ctx.clone();
                next.type_stack.push(name);
                if let Some(body) = node.child_by_field_name("body") {
                    walk_children(body, |child| walk_types(child, &next, source, out));
                }
                return;
            }
        }
    }
    walk_children(node, |child| walk_types(child, ctx, source, out));
}

fn type_kind_for(node: Node<'_>, kind: &str, source: &str) -> Option<TypeKind> {
    match kind {
        "class_declaration" => Some(TypeKind::Class),
        "interface_declaration" => Some(TypeKind::Interface),
        "struct_declaration" | "record_struct_declaration" => Some(TypeKind::Struct),
        "record_declaration" => {
            let header = source
                .get(node.start_byte()..node.end_byte())
                .unwrap_or("")
                .split('{')
                .next()
                .unwrap_or("");
            if header.split_whitespace().any(|word| word == "struct") {
                Some(TypeKind::Struct)
            } else {
                Some(TypeKind::Class)
            }
        }
        "enum_declaration" => Some(TypeKind::Other),
        _ => None,
    }
}

/// Lowers a parsed file into an analysis unit.
pub fn lower(file: &ParsedFile, types: &TypeTable) -> LoweredFile {
    let root = file.tree.root_node();
    let ctx = root_context(root, &file.source);
    let mut lowering = Lowering {
        source: &file.source,
        types,
        aliases: collect_aliases(root, &file.source),
        unit: Unit::new(Some(&file.rel_path)),
        decl_syntax: Vec::new(),
    };
    lowering.walk(root, &ctx);
    LoweredFile {
        unit: lowering.unit,
        decl_syntax: lowering.decl_syntax,
    }
}

struct Lowering<'a> {
    source: &'a str,
    types: &'a TypeTable,
    aliases: HashMap<String, String>,
    unit: Unit,
    decl_syntax: Vec<DeclSyntax>,
}

impl Lowering<'_> {
    fn walk(&mut self, node: Node<'_>, ctx: &Context) {
        match node.kind() {
            "namespace_declaration" => {
                let next = enter_namespace(node, ctx, self.source);
                if let Some(body) = node.child_by_field_name("body") {
                    let mut cursor = body.walk();
                    for child in body.named_children(&mut cursor) {
                        self.walk(child, &next);
                    }
                }
                return;
            }
            "class_declaration" | "struct_declaration" | "record_declaration"
            | "record_struct_declaration" | "interface_declaration" => {
                let mut next = ctx.clone();
                if let Some(name) = node.child_by_field_name("name") {
                    next.type_stack.push(node_text(name, self.source));
                }
                let mut cursor = node.walk();
                for child in node.named_children(&mut cursor) {
                    self.walk(child, &next);
                }
                return;
            }
            "field_declaration" => self.handle_field(node, ctx),
            "property_declaration" => self.handle_property(node, ctx),
            "invocation_expression" => self.handle_invocation(node),
            _ => {}
        }
        let mut cursor = node.walk();
        for child in node.named_children(&mut cursor) {
            self.walk(child, ctx);
        }
    }

    fn handle_field(&mut self, node: Node<'_>, ctx: &Context) {
        let mut cursor = node.walk();
        let Some(variables) = node
            .named_children(&mut cursor)
            .find(|child| child.kind() == "variable_declaration")
        else {
            return;
        };
        let Some(type_node) = variables.child_by_field_name("type") else {
            return;
        };
        let mut cursor = variables.walk();
        let declarators: Vec<Node<'_>> = variables
            .named_children(&mut cursor)
            .filter(|child| child.kind() == "variable_declarator")
            .collect();
        for declarator in declarators {
            let name_node = declarator
                .child_by_field_name("name")
                .or_else(|| first_child_of_kind(declarator, "identifier"));
            let Some(name_node) = name_node else {
                continue;
            };
            self.push_declaration(node, type_node, name_node, DeclKind::Field, ctx);
        }
    }

    fn handle_property(&mut self, node: Node<'_>, ctx: &Context) {
        let (Some(type_node), Some(name_node)) = (
            node.child_by_field_name("type"),
            node.child_by_field_name("name"),
        ) else {
            return;
        };
        self.push_declaration(node, type_node, name_node, DeclKind::Property, ctx);
    }

    fn push_declaration(
        &mut self,
        node: Node<'_>,
        type_node: Node<'_>,
        name_node: Node<'_>,
        kind: DeclKind,
        ctx: &Context,
    ) {
        let name = node_text(name_node, self.source);
        if name.is_empty() {
            return;
        }
        let type_syntax = node_text(type_node, self.source);
        let modifiers = modifiers(node, self.source);
        let resolved = self
            .types
            .resolve(&self.unalias(&type_syntax), ctx.namespace().as_deref());
        let (attribute_lists, list_ranges): (Vec<_>, Vec<_>) =
            self.attribute_lists(node).into_iter().unzip();
        let decl = Declaration {
            kind,
            name,
            type_syntax,
            resolved,
            accessibility: modifiers.accessibility,
            is_static: modifiers.is_static,
            is_readonly: modifiers.is_readonly,
            other_modifiers: modifiers.others,
            attribute_lists,
            location: Location::new(Some(self.unit_path()), span(name_node)),
        };
        let head = node.start_byte()..type_node.start_byte();
        let multiline = self
            .source
            .get(head.clone())
            .is_some_and(|text| text.trim_end().contains('\n'));
        let mut cursor = node.walk();
        let modifier_ranges = node
            .children(&mut cursor)
            .filter(|child| child.kind() == "modifier")
            .map(|child| child.start_byte()..child.end_byte())
            .collect();
        self.decl_syntax.push(DeclSyntax {
            head,
            attribute_lists: list_ranges,
            modifiers: modifier_ranges,
            ty: type_node.start_byte()..type_node.end_byte(),
            indent: line_indent(self.source, node.start_byte()).to_string(),
            multiline,
        });
        self.unit.push_declaration(decl);
    }

    fn unit_path(&self) -> &str {
        self.unit.path.as_deref().unwrap_or("")
    }

    fn unalias(&self, type_syntax: &str) -> String {
        let trimmed = type_syntax.trim_end_matches('?');
        match self.aliases.get(trimmed) {
            Some(target) => target.clone(),
            None => type_syntax.to_string(),
        }
    }

    fn attribute_lists(&self, node: Node<'_>) -> Vec<(AttributeList, Range<usize>)> {
        let mut out = Vec::new();
        let mut cursor = node.walk();
        for child in node.named_children(&mut cursor) {
            if child.kind() != "attribute_list" {
                continue;
            }
            let mut list = AttributeList::default();
            let mut list_cursor = child.walk();
            for item in child.named_children(&mut list_cursor) {
                match item.kind() {
                    "attribute_target_specifier" => {
                        let target = node_text(item, self.source);
                        let target = target.trim_end_matches(':').trim();
                        if !target.is_empty() {
                            list.target = Some(target.to_string());
                        }
                    }
                    "attribute" => {
                        if let Some(annotation) = self.annotation(item) {
                            list.annotations.push(annotation);
                        }
                    }
                    _ => {}
                }
            }
            if !list.annotations.is_empty() {
                out.push((list, child.start_byte()..child.end_byte()));
            }
        }
        out
    }

    fn annotation(&self, attr: Node<'_>) -> Option<Annotation> {
        let name_node = attr.child_by_field_name("name")?;
        let raw = node_text(name_node, self.source);
        if raw.is_empty() {
            return None;
        }
        let written = raw.strip_prefix("global::").unwrap_or(&raw).replace("::", ".");
        let simple = written.rsplit('.').next().unwrap_or(&written).to_string();
        let qualified = if written.contains('.') {
            Some(written.clone())
        } else {
            self.aliases.get(&written).cloned()
        };
        Some(Annotation {
            name: simple,
            qualified,
            syntax: node_text(attr, self.source),
        })
    }

    fn handle_invocation(&mut self, node: Node<'_>) {
        let Some(function) = node.child_by_field_name("function") else {
            return;
        };
        if function.kind() != "member_access_expression" {
            return;
        }
        let Some(name_node) = function.child_by_field_name("name") else {
            return;
        };
        let expr = lower_expr(node, self.source);
        let name_location = Location::new(Some(self.unit_path()), span(name_node));
        self.unit.push_call(CallSite {
            expr,
            name_location,
        });
    }
}

/// Lowers an expression into the chain tree, keeping each node's byte range.
pub fn lower_expr(node: Node<'_>, source: &str) -> Expr {
    let origin = Some(node.start_byte()..node.end_byte());
    match node.kind() {
        "invocation_expression" => {
            let function = node.child_by_field_name("function");
            let arguments = node.child_by_field_name("arguments");
            if let (Some(function), Some(arguments)) = (function, arguments) {
                return Expr::Invoke(Arc::new(Invocation {
                    callee: lower_expr(function, source),
                    args: ArgList::from_raw(raw_text(arguments, source)),
                    origin,
                }));
            }
        }
        "member_access_expression" => {
            let expression = node.child_by_field_name("expression");
            let name = node.child_by_field_name("name");
            if let (Some(expression), Some(name)) = (expression, name) {
                return Expr::Member(Arc::new(MemberAccess {
                    receiver: lower_expr(expression, source),
                    name: node_text(name, source),
                    origin,
                }));
            }
        }
        _ => {}
    }
    Expr::Root(Arc::new(RootExpr {
        text: raw_text(node, source).to_string(),
        origin,
    }))
}

struct Modifiers {
    accessibility: Accessibility,
    is_static: bool,
    is_readonly: bool,
    others: Vec<String>,
}

fn modifiers(node: Node<'_>, source: &str) -> Modifiers {
    let mut access = Vec::new();
    let mut out = Modifiers {
        accessibility: Accessibility::Private,
        is_static: false,
        is_readonly: false,
        others: Vec::new(),
    };
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        if child.kind() != "modifier" {
            continue;
        }
        let text = node_text(child, source);
        match text.as_str() {
            "public" | "private" | "protected" | "internal" => access.push(text),
            "static" => out.is_static = true,
            "readonly" => out.is_readonly = true,
            "" => {}
            _ => out.others.push(text),
        }
    }
    let has = |keyword: &str| access.iter().any(|value| value == keyword);
    out.accessibility = if has("protected") && has("internal") {
        Accessibility::ProtectedInternal
    } else if has("private") && has("protected") {
        Accessibility::PrivateProtected
    } else if has("public") {
        Accessibility::Public
    } else if has("protected") {
        Accessibility::Protected
    } else if has("internal") {
        Accessibility::Internal
    } else {
        Accessibility::Private
    };
    out
}

fn root_context(root: Node<'_>, source: &str) -> Context {
    let mut ctx = Context::default();
    let mut cursor = root.walk();
    for child in root.named_children(&mut cursor) {
        if child.kind() == "file_scoped_namespace_declaration" {
            if let Some(name) = namespace_name(child, source) {
                ctx.namespace_stack = namespace_parts(&name);
            }
            break;
        }
    }
    ctx
}

fn enter_namespace(node: Node<'_>, ctx: &Context, source: &str) -> Context {
    let mut next = ctx.clone();
    if let Some(name) = namespace_name(node, source) {
        next.namespace_stack.extend(namespace_parts(&name));
    }
    next
}

/// `using Alias = Some.Type;` directives anywhere in the file.
fn collect_aliases(root: Node<'_>, source: &str) -> HashMap<String, String> {
    let mut out = HashMap::new();
    collect_aliases_inner(root, source, &mut out);
    out
}

fn collect_aliases_inner(node: Node<'_>, source: &str, out: &mut HashMap<String, String>) {
    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        match child.kind() {
            "using_directive" => {
                if let Some((alias, target)) = using_alias(child, source) {
                    out.insert(alias, target);
                }
            }
            "namespace_declaration" | "file_scoped_namespace_declaration" | "declaration_list" => {
                collect_aliases_inner(child, source, out);
            }
            _ => {}
        }
    }
}

fn using_alias(node: Node<'_>, source: &str) -> Option<(String, String)> {
    let mut cursor = node.walk();
    let children: Vec<Node<'_>> = node.children(&mut cursor).collect();
    let equals = children.iter().position(|child| child.kind() == "=")?;
    let alias = children[..equals]
        .iter()
        .rev()
        .find(|child| child.is_named())
        .map(|child| node_text(*child, source))?;
    let target = children[equals + 1..]
        .iter()
        .find(|child| child.is_named())
        .map(|child| node_text(*child, source))?;
    let target = target.strip_prefix("global::").unwrap_or(&target).replace("::", ".");
    if alias.is_empty() || target.is_empty() {
        return None;
    }
    Some((alias, target))
}

fn base_types(node: Node<'_>, source: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        if child.kind() != "base_list" {
            continue;
        }
        let mut list_cursor = child.walk();
        for base in child.named_children(&mut list_cursor) {
            match base.kind() {
                "argument_list" => {}
                "primary_constructor_base_type" => {
                    let type_node = base.child_by_field_name("type").unwrap_or(base);
                    let name = node_text(type_node, source);
                    if !name.is_empty() {
                        out.push(name);
                    }
                }
                _ => {
                    let name = node_text(base, source);
                    if !name.is_empty() {
                        out.push(name);
                    }
                }
            }
        }
    }
    out
}

fn walk_children<'a>(node: Node<'a>, mut f: impl FnMut(Node<'a>)) {
    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        f(child);
    }
}

fn first_child_of_kind<'a>(node: Node<'a>, kind: &str) -> Option<Node<'a>> {
    let mut cursor = node.walk();
    let found = node
        .named_children(&mut cursor)
        .find(|child| child.kind() == kind);
    found
}

fn namespace_name(node: Node<'_>, source: &str) -> Option<String> {
    node.child_by_field_name("name")
        .map(|n| node_text(n, source))
        .filter(|value| !value.is_empty())
}

fn namespace_parts(name: &str) -> Vec<String> {
    let normalized = name.replace("::", ".");
    normalized
        .split('.')
        .filter(|part| !part.trim().is_empty())
        .map(|part| part.trim().to_string())
        .collect()
}

fn line_indent(source: &str, byte: usize) -> &str {
    let line_start = source[..byte.min(source.len())]
        .rfind('\n')
        .map(|index| index + 1)
        .unwrap_or(0);
    let prefix = source.get(line_start..byte).unwrap_or("");
    if prefix.chars().all(|ch| ch == ' ' || ch == '\t') {
        prefix
    } else {
        ""
    }
}

pub fn span(node: Node<'_>) -> Span {
    let start = node.start_position();
    let end = node.end_position();
    Span {
        start_line: start.row as i64 + 1,
        start_col: start.column as i64 + 1,
        end_line: end.row as i64 + 1,
        end_col: end.column as i64 + 1,
        start_byte: node.start_byte() as i64,
        end_byte: node.end_byte() as i64,
    }
}

fn raw_text<'s>(node: Node<'_>, source: &'s str) -> &'s str {
    source.get(node.start_byte()..node.end_byte()).unwrap_or("")
}

pub fn node_text(node: Node<'_>, source: &str) -> String {
    raw_text(node, source).trim().to_string()
}
