//! Persistent expression and unit trees.
//!
//! Every node sits behind an `Arc`. Rewrites rebuild only the spine from the
//! edited node up to the root and share everything else with the old tree,
//! so a host can find the edited parts by pointer identity.

use crate::model::{Declaration, Location};
use serde::Serialize;
use std::fmt;
use std::ops::Range;
use std::sync::Arc;

/// Argument list text, parentheses included, kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ArgList {
    raw: Arc<str>,
}

impl ArgList {
    pub fn from_raw(raw: &str) -> Self {
        Self { raw: raw.into() }
    }

    pub fn empty() -> Self {
        Self::from_raw("()")
    }

    pub fn single(expr: &str) -> Self {
        Self::from_raw(&format!("({expr})"))
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn is_empty(&self) -> bool {
        let inner = self
            .raw
            .trim()
            .strip_prefix('(')
            .and_then(|rest| rest.strip_suffix(')'))
            .unwrap_or(&self.raw);
        inner.trim().is_empty()
    }
}

impl fmt::Display for ArgList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Any expression the chain machinery does not look into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RootExpr {
    pub text: String,
    pub origin: Option<Range<usize>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberAccess {
    pub receiver: Expr,
    /// Member name as written, type arguments included.
    pub name: String,
    pub origin: Option<Range<usize>>,
}

impl MemberAccess {
    pub fn identifier(&self) -> &str {
        identifier(&self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub callee: Expr,
    pub args: ArgList,
    pub origin: Option<Range<usize>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
    Root(Arc<RootExpr>),
    Member(Arc<MemberAccess>),
    Invoke(Arc<Invocation>),
}

/// One step from a node toward the chain root.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Step {
    /// Invocation -> its callee.
    Callee,
    /// Member access -> its receiver.
    Receiver,
}

impl Expr {
    pub fn name(text: &str) -> Self {
        Expr::Root(Arc::new(RootExpr {
            text: text.to_string(),
            origin: None,
        }))
    }

    pub fn member(receiver: Expr, name: &str) -> Self {
        Expr::Member(Arc::new(MemberAccess {
            receiver,
            name: name.to_string(),
            origin: None,
        }))
    }

    pub fn invoke(callee: Expr, args: ArgList) -> Self {
        Expr::Invoke(Arc::new(Invocation {
            callee,
            args,
            origin: None,
        }))
    }

    /// `self.name(args)`
    pub fn call(self, name: &str, args: ArgList) -> Self {
        Expr::invoke(Expr::member(self, name), args)
    }

    pub fn as_root(&self) -> Option<&RootExpr> {
        match self {
            Expr::Root(root) => Some(root),
            _ => None,
        }
    }

    pub fn as_member(&self) -> Option<&MemberAccess> {
        match self {
            Expr::Member(member) => Some(member),
            _ => None,
        }
    }

    pub fn as_invocation(&self) -> Option<&Invocation> {
        match self {
            Expr::Invoke(invocation) => Some(invocation),
            _ => None,
        }
    }

    /// An invocation whose callee is a named member access: one chain link.
    pub fn member_call(&self) -> Option<(&Invocation, &MemberAccess)> {
        let invocation = self.as_invocation()?;
        let member = invocation.callee.as_member()?;
        Some((invocation, member))
    }

    pub fn origin(&self) -> Option<Range<usize>> {
        match self {
            Expr::Root(root) => root.origin.clone(),
            Expr::Member(member) => member.origin.clone(),
            Expr::Invoke(invocation) => invocation.origin.clone(),
        }
    }

    pub fn ptr_eq(&self, other: &Expr) -> bool {
        match (self, other) {
            (Expr::Root(a), Expr::Root(b)) => Arc::ptr_eq(a, b),
            (Expr::Member(a), Expr::Member(b)) => Arc::ptr_eq(a, b),
            (Expr::Invoke(a), Expr::Invoke(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }

    /// Returns a new root with the node at `path` replaced. Nodes along the
    /// path are rebuilt without an origin; everything else is shared.
    pub fn replace_at(&self, path: &[Step], replacement: Expr) -> Option<Expr> {
        let Some((step, rest)) = path.split_first() else {
            return Some(replacement);
        };
        match (self, step) {
            (Expr::Invoke(invocation), Step::Callee) => {
                let callee = invocation.callee.replace_at(rest, replacement)?;
                Some(Expr::Invoke(Arc::new(Invocation {
                    callee,
                    args: invocation.args.clone(),
                    origin: None,
                })))
            }
            (Expr::Member(member), Step::Receiver) => {
                let receiver = member.receiver.replace_at(rest, replacement)?;
                Some(Expr::Member(Arc::new(MemberAccess {
                    receiver,
                    name: member.name.clone(),
                    origin: None,
                })))
            }
            _ => None,
        }
    }

    /// Renders the tree, taking untouched subtrees from `source` verbatim.
    pub fn render_with_source(&self, source: &str) -> String {
        let mut out = String::new();
        self.render_into(Some(source), &mut out);
        out
    }

    fn render_into(&self, source: Option<&str>, out: &mut String) {
        if let (Some(source), Some(range)) = (source, self.origin()) {
            if let Some(text) = source.get(range) {
                out.push_str(text);
                return;
            }
        }
        match self {
            Expr::Root(root) => out.push_str(&root.text),
            Expr::Member(member) => {
                member.receiver.render_into(source, out);
                out.push('.');
                out.push_str(&member.name);
            }
            Expr::Invoke(invocation) => {
                invocation.callee.render_into(source, out);
                out.push_str(invocation.args.as_str());
            }
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = String::new();
        self.render_into(None, &mut out);
        f.write_str(&out)
    }
}

/// Strips type arguments: `Foo<T>` -> `Foo`.
pub fn identifier(name: &str) -> &str {
    name.split('<').next().unwrap_or(name).trim()
}

/// An invocation the host offers for call-chain rules.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallSite {
    pub expr: Expr,
    /// Location of the terminal member name, where diagnostics point.
    pub name_location: Location,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "kind", content = "index", rename_all = "lowercase")]
pub enum NodeRef {
    Declaration(usize),
    Call(usize),
}

/// Snapshot of one analyzed source unit.
#[derive(Debug, Clone, Default)]
pub struct Unit {
    pub path: Option<String>,
    declarations: Vec<Arc<Declaration>>,
    calls: Vec<Arc<CallSite>>,
}

impl Unit {
    pub fn new(path: Option<&str>) -> Self {
        Self {
            path: path.map(|value| value.to_string()),
            ..Default::default()
        }
    }

    pub fn push_declaration(&mut self, decl: Declaration) -> NodeRef {
        self.declarations.push(Arc::new(decl));
        NodeRef::Declaration(self.declarations.len() - 1)
    }

    pub fn push_call(&mut self, site: CallSite) -> NodeRef {
        self.calls.push(Arc::new(site));
        NodeRef::Call(self.calls.len() - 1)
    }

    pub fn declarations(&self) -> &[Arc<Declaration>] {
        &self.declarations
    }

    pub fn calls(&self) -> &[Arc<CallSite>] {
        &self.calls
    }

    pub fn declaration(&self, index: usize) -> Option<&Declaration> {
        self.declarations.get(index).map(|decl| decl.as_ref())
    }

    pub fn call(&self, index: usize) -> Option<&CallSite> {
        self.calls.get(index).map(|site| site.as_ref())
    }

    pub fn with_declaration(&self, index: usize, decl: Declaration) -> Option<Unit> {
        if index >= self.declarations.len() {
            return None;
        }
        let mut next = self.clone();
        next.declarations[index] = Arc::new(decl);
        Some(next)
    }

    pub fn with_call(&self, index: usize, site: CallSite) -> Option<Unit> {
        if index >= self.calls.len() {
            return None;
        }
        let mut next = self.clone();
        next.calls[index] = Arc::new(site);
        Some(next)
    }

    /// Nodes of `self` that are not shared with `base`.
    pub fn changed_since(&self, base: &Unit) -> Vec<NodeRef> {
        let mut out = Vec::new();
        for (index, decl) in self.declarations.iter().enumerate() {
            let shared = base
                .declarations
                .get(index)
                .is_some_and(|old| Arc::ptr_eq(old, decl));
            if !shared {
                out.push(NodeRef::Declaration(index));
            }
        }
        for (index, site) in self.calls.iter().enumerate() {
            let shared = base
                .calls
                .get(index)
                .is_some_and(|old| Arc::ptr_eq(old, site));
            if !shared {
                out.push(NodeRef::Call(index));
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain() -> Expr {
        Expr::name("loc")
            .call("InjectServicesAsync", ArgList::single("this"))
            .call("ExecuteAsync", ArgList::empty())
    }

    #[test]
    fn renders_chain() {
        assert_eq!(
            chain().to_string(),
            "loc.InjectServicesAsync(this).ExecuteAsync()"
        );
    }

    #[test]
    fn replace_at_shares_untouched_nodes() {
        let old = chain();
        let path = [Step::Callee, Step::Receiver];
        let new = old.replace_at(&path, Expr::name("other")).unwrap();
        assert_eq!(new.to_string(), "other.ExecuteAsync()");
        let old_args = &old.as_invocation().unwrap().args;
        let new_args = &new.as_invocation().unwrap().args;
        assert_eq!(old_args, new_args);
        // original is unchanged
        assert_eq!(old.to_string(), "loc.InjectServicesAsync(this).ExecuteAsync()");
    }

    #[test]
    fn replace_at_rejects_wrong_shape() {
        let old = Expr::name("loc");
        assert!(old.replace_at(&[Step::Callee], Expr::name("x")).is_none());
    }

    #[test]
    fn render_with_source_keeps_original_text() {
        let source = "a  .Foo( 1 )";
        let receiver = Expr::Root(Arc::new(RootExpr {
            text: "a".to_string(),
            origin: Some(0..1),
        }));
        let inner = Expr::Invoke(Arc::new(Invocation {
            callee: Expr::Member(Arc::new(MemberAccess {
                receiver,
                name: "Foo".to_string(),
                origin: Some(0..6),
            })),
            args: ArgList::from_raw("( 1 )"),
            origin: Some(0..12),
        }));
        let outer = inner.call("Bar", ArgList::empty());
        assert_eq!(outer.render_with_source(source), "a  .Foo( 1 ).Bar()");
    }

    #[test]
    fn unit_tracks_changed_nodes() {
        let mut unit = Unit::new(Some("a.cs"));
        unit.push_call(CallSite {
            expr: chain(),
            name_location: Location::default(),
        });
        unit.push_call(CallSite {
            expr: chain(),
            name_location: Location::default(),
        });
        let site = CallSite {
            expr: Expr::name("x"),
            name_location: Location::default(),
        };
        let next = unit.with_call(1, site).unwrap();
        assert_eq!(next.changed_since(&unit), vec![NodeRef::Call(1)]);
        assert!(unit.with_call(5, next.call(0).unwrap().clone()).is_none());
    }

    #[test]
    fn identifier_drops_type_arguments() {
        assert_eq!(identifier("Resolve<IFoo>"), "Resolve");
        assert_eq!(identifier("Plain"), "Plain");
    }
}
