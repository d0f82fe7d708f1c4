//! Project-wide type table used to resolve declared types.

use crate::model::{ResolvedType, TypeKind, TypeName};
use std::collections::{HashMap, HashSet};

const PREDEFINED: &[&str] = &[
    "bool", "byte", "sbyte", "char", "decimal", "double", "float", "int", "uint", "nint", "nuint",
    "long", "ulong", "short", "ushort", "object", "string", "dynamic", "void",
];

/// Framework classes whose names follow the interface naming pattern.
const NOT_INTERFACES: &[&str] = &[
    "IOException",
    "IPAddress",
    "IPEndPoint",
    "IPHostEntry",
    "IPInterfaceProperties",
    "IPGlobalProperties",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeDecl {
    pub name: String,
    pub namespace: Option<String>,
    pub kind: TypeKind,
    /// Base list entries as written.
    pub bases: Vec<String>,
}

impl TypeDecl {
    pub fn qualname(&self) -> String {
        match self.namespace.as_deref() {
            Some(ns) if !ns.is_empty() => format!("{ns}.{}", self.name),
            _ => self.name.clone(),
        }
    }

    fn type_name(&self, written: &str) -> TypeName {
        let display = simple_with_args(written);
        let qualified = match self.namespace.as_deref() {
            Some(ns) if !ns.is_empty() => format!("{ns}.{display}"),
            _ => display.clone(),
        };
        TypeName {
            name: display,
            qualified: Some(qualified),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct TypeTable {
    by_name: HashMap<String, Vec<TypeDecl>>,
}

impl TypeTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, decl: TypeDecl) {
        let entry = self.by_name.entry(decl.name.clone()).or_default();
        if !entry.contains(&decl) {
            entry.push(decl);
        }
    }

    pub fn extend(&mut self, decls: impl IntoIterator<Item = TypeDecl>) {
        for decl in decls {
            self.insert(decl);
        }
    }

    pub fn len(&self) -> usize {
        self.by_name.values().map(|decls| decls.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }

    /// Finds a declaration for `written`, preferring an exact namespace
    /// match, then `context_ns`, then any declaration of that name.
    pub fn lookup(&self, written: &str, context_ns: Option<&str>) -> Option<&TypeDecl> {
        let cleaned = strip_global(written);
        let base = strip_type_args(cleaned);
        let (qualifier, simple) = match base.rsplit_once('.') {
            Some((qualifier, simple)) => (Some(qualifier), simple),
            None => (None, base),
        };
        let candidates = self.by_name.get(simple)?;
        if let Some(qualifier) = qualifier {
            if let Some(hit) = candidates
                .iter()
                .find(|decl| decl.namespace.as_deref() == Some(qualifier))
            {
                return Some(hit);
            }
        }
        if let Some(ns) = context_ns {
            if let Some(hit) = candidates
                .iter()
                .find(|decl| decl.namespace.as_deref() == Some(ns))
            {
                return Some(hit);
            }
        }
        candidates.first()
    }

    pub fn resolve(&self, type_syntax: &str, context_ns: Option<&str>) -> Option<ResolvedType> {
        let written = type_syntax.trim().trim_end_matches('?').trim();
        if written.is_empty() || written == "var" {
            return None;
        }
        if is_structural(written) || PREDEFINED.contains(&written) {
            return Some(ResolvedType {
                name: TypeName::new(written, None),
                kind: TypeKind::Other,
                interfaces: Vec::new(),
            });
        }
        if let Some(decl) = self.lookup(written, context_ns) {
            let interfaces = if decl.kind == TypeKind::Interface {
                Vec::new()
            } else {
                self.interfaces_of(decl)
            };
            return Some(ResolvedType {
                name: decl.type_name(written),
                kind: decl.kind,
                interfaces,
            });
        }
        let display = simple_with_args(written);
        let kind = if looks_like_interface(&display) {
            TypeKind::Interface
        } else {
            TypeKind::Class
        };
        Some(ResolvedType {
            name: TypeName::new(&display, None),
            kind,
            interfaces: Vec::new(),
        })
    }

    /// All interfaces reachable through base lists, first-seen order.
    pub fn interfaces_of(&self, decl: &TypeDecl) -> Vec<TypeName> {
        let mut out = Vec::new();
        let mut seen = HashSet::new();
        let mut visited = HashSet::new();
        visited.insert(decl.qualname());
        self.collect_interfaces(decl, &mut out, &mut seen, &mut visited);
        out
    }

    fn collect_interfaces(
        &self,
        decl: &TypeDecl,
        out: &mut Vec<TypeName>,
        seen: &mut HashSet<String>,
        visited: &mut HashSet<String>,
    ) {
        for base in &decl.bases {
            match self.lookup(base, decl.namespace.as_deref()) {
                Some(found) => {
                    if found.kind == TypeKind::Interface {
                        let name = found.type_name(base);
                        if seen.insert(name.identity().to_string()) {
                            out.push(name);
                        }
                    }
                    if visited.insert(found.qualname()) {
                        self.collect_interfaces(found, out, seen, visited);
                    }
                }
                None => {
                    let display = simple_with_args(base);
                    if looks_like_interface(&display) && seen.insert(display.clone()) {
                        out.push(TypeName::new(&display, None));
                    }
                }
            }
        }
    }
}

/// .NET convention: `IFoo`, `IEnumerable<T>`.
pub fn looks_like_interface(name: &str) -> bool {
    let simple = strip_type_args(strip_global(name));
    let simple = simple.rsplit('.').next().unwrap_or(simple);
    if NOT_INTERFACES.contains(&simple) {
        return false;
    }
    let mut chars = simple.chars();
    matches!(
        (chars.next(), chars.next()),
        (Some('I'), Some(second)) if second.is_ascii_uppercase()
    )
}

fn is_structural(written: &str) -> bool {
    written.ends_with(']') || written.starts_with('(') || written.ends_with('*')
}

fn strip_global(name: &str) -> &str {
    let name = name.trim();
    name.strip_prefix("global::").unwrap_or(name)
}

fn strip_type_args(name: &str) -> &str {
    name.split('<').next().unwrap_or(name).trim()
}

/// `System.Collections.Generic.IList<int>` -> `IList<int>`
fn simple_with_args(written: &str) -> String {
    let cleaned = strip_global(written);
    let base = strip_type_args(cleaned);
    let args = &cleaned[cleaned.find('<').unwrap_or(cleaned.len())..];
    let simple = base.rsplit('.').next().unwrap_or(base);
    format!("{simple}{args}")
}
