use serde::Serialize;

/// 1-based line/column span plus the byte range it covers.
#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Span {
    pub start_line: i64,
    pub start_col: i64,
    pub end_line: i64,
    pub end_col: i64,
    pub start_byte: i64,
    pub end_byte: i64,
}

impl Span {
    pub fn contains_line(&self, line: i64) -> bool {
        self.start_line <= line && line <= self.end_line
    }
}

#[derive(Debug, Serialize, Clone, PartialEq, Eq, Hash, Default)]
pub struct Location {
    pub path: Option<String>,
    #[serde(flatten)]
    pub span: Span,
}

impl Location {
    pub fn new(path: Option<&str>, span: Span) -> Self {
        Self {
            path: path.map(|value| value.to_string()),
            span,
        }
    }
}

#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Error => "error",
        }
    }

    /// SARIF `level` value.
    pub fn sarif_level(&self) -> &'static str {
        match self {
            Severity::Info => "note",
            Severity::Warning => "warning",
            Severity::Error => "error",
        }
    }
}

#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum TypeKind {
    Interface,
    Class,
    Struct,
    Other,
}

#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum Accessibility {
    Public,
    #[default]
    Private,
    Protected,
    Internal,
    ProtectedInternal,
    PrivateProtected,
}

impl Accessibility {
    pub fn keyword(&self) -> &'static str {
        match self {
            Accessibility::Public => "public",
            Accessibility::Private => "private",
            Accessibility::Protected => "protected",
            Accessibility::Internal => "internal",
            Accessibility::ProtectedInternal => "protected internal",
            Accessibility::PrivateProtected => "private protected",
        }
    }
}

/// A type reference as seen after host resolution.
#[derive(Debug, Serialize, Clone, PartialEq, Eq, Hash)]
pub struct TypeName {
    pub name: String,
    /// Namespace-qualified name, when the host knows the namespace.
    pub qualified: Option<String>,
}

impl TypeName {
    pub fn new(name: &str, qualified: Option<&str>) -> Self {
        Self {
            name: name.to_string(),
            qualified: qualified.map(|value| value.to_string()),
        }
    }

    /// Key used to tell two references to the same type apart from look-alikes.
    pub fn identity(&self) -> &str {
        self.qualified.as_deref().unwrap_or(&self.name)
    }

    /// Type syntax that binds regardless of the `using` directives in scope.
    pub fn fully_qualified_syntax(&self) -> String {
        match self.qualified.as_deref() {
            Some(qualified) if qualified.contains('.') => format!("global::{qualified}"),
            Some(qualified) => qualified.to_string(),
            None => self.name.clone(),
        }
    }
}

#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
pub struct ResolvedType {
    pub name: TypeName,
    pub kind: TypeKind,
    /// Every interface the type implements, directly or through bases.
    pub interfaces: Vec<TypeName>,
}

#[derive(Debug, Serialize, Clone, PartialEq, Eq, Hash)]
pub struct Annotation {
    /// Last segment of the name as written, e.g. `InjectService`.
    pub name: String,
    /// Fully-qualified attribute class name when resolvable.
    pub qualified: Option<String>,
    /// Original attribute text, arguments included.
    pub syntax: String,
}

impl Annotation {
    pub fn new(name: &str, qualified: Option<&str>, syntax: &str) -> Self {
        Self {
            name: name.to_string(),
            qualified: qualified.map(|value| value.to_string()),
            syntax: syntax.to_string(),
        }
    }

    pub fn simple(name: &str) -> Self {
        Self::new(name, None, name)
    }
}

/// One bracketed `[A, B]` group.
#[derive(Debug, Serialize, Clone, PartialEq, Eq, Hash, Default)]
pub struct AttributeList {
    pub target: Option<String>,
    pub annotations: Vec<Annotation>,
}

impl AttributeList {
    pub fn of(annotations: Vec<Annotation>) -> Self {
        Self {
            target: None,
            annotations,
        }
    }

    pub fn render(&self) -> String {
        let body = self
            .annotations
            .iter()
            .map(|annotation| annotation.syntax.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        match self.target.as_deref() {
            Some(target) => format!("[{target}: {body}]"),
            None => format!("[{body}]"),
        }
    }
}

#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum DeclKind {
    Field,
    Property,
}

#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
pub struct Declaration {
    pub kind: DeclKind,
    pub name: String,
    /// Declared type exactly as written.
    pub type_syntax: String,
    /// `None` when the host could not resolve the declared type.
    pub resolved: Option<ResolvedType>,
    pub accessibility: Accessibility,
    pub is_static: bool,
    pub is_readonly: bool,
    /// Modifiers other than accessibility/static/readonly, in source order.
    pub other_modifiers: Vec<String>,
    pub attribute_lists: Vec<AttributeList>,
    pub location: Location,
}

impl Declaration {
    pub fn annotations(&self) -> impl Iterator<Item = &Annotation> {
        self.attribute_lists
            .iter()
            .flat_map(|list| list.annotations.iter())
    }

    pub fn type_kind(&self) -> Option<TypeKind> {
        self.resolved.as_ref().map(|resolved| resolved.kind)
    }

    /// Modifier keywords in canonical order.
    pub fn modifier_keywords(&self) -> Vec<String> {
        let mut out = vec![self.accessibility.keyword().to_string()];
        if self.is_static {
            out.push("static".to_string());
        }
        if self.is_readonly {
            out.push("readonly".to_string());
        }
        out.extend(self.other_modifiers.iter().cloned());
        out
    }
}
