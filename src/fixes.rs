//! Quick fixes.
//!
//! A [`Fix`] pairs a title and an equivalence key with a [`Rewrite`]: a pure
//! description of a tree edit. Applying it never touches the input unit; it
//! returns a new one that shares every node it did not change, or `None`
//! when the target no longer has the shape the fix expects.

use crate::chain;
use crate::config::Vocabulary;
use crate::diagnostics::Diagnostic;
use crate::markers::annotation_matches;
use crate::model::{Accessibility, AttributeList, Declaration, ResolvedType, TypeKind, TypeName};
use crate::rules::RuleId;
use crate::syntax::{ArgList, CallSite, NodeRef, Unit};
use serde::Serialize;
use std::collections::HashSet;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Fix {
    pub title: String,
    pub equivalence_key: String,
    #[serde(skip)]
    pub rewrite: Rewrite,
}

impl Fix {
    pub fn apply(&self, unit: &Unit) -> Option<Unit> {
        self.rewrite.apply(unit)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rewrite {
    /// Re-type a declaration as one of its interfaces.
    ChangeType { target: usize, interface: TypeName },
    /// Modifiers become exactly `private`; serialization markers go away.
    NormalizeModifiers {
        target: usize,
        serialize_marker: String,
    },
    /// `recv.Execute()` -> `recv.Call(args).Execute()`
    InsertCall {
        target: usize,
        name: String,
        args: ArgList,
    },
    /// `recv.Execute()` -> `recv.Safe(args)`
    RenameTerminal {
        target: usize,
        name: String,
        args: ArgList,
    },
    /// `recv.Call(args)....Execute()` -> `recv.....Safe(args)`
    HoistArguments {
        target: usize,
        link: String,
        name: String,
    },
}

impl Rewrite {
    pub fn target(&self) -> NodeRef {
        match self {
            Rewrite::ChangeType { target, .. } | Rewrite::NormalizeModifiers { target, .. } => {
                NodeRef::Declaration(*target)
            }
            Rewrite::InsertCall { target, .. }
            | Rewrite::RenameTerminal { target, .. }
            | Rewrite::HoistArguments { target, .. } => NodeRef::Call(*target),
        }
    }

    pub fn apply(&self, unit: &Unit) -> Option<Unit> {
        match self {
            Rewrite::ChangeType { target, interface } => {
                let decl = unit.declaration(*target)?;
                unit.with_declaration(*target, retype(decl, interface))
            }
            Rewrite::NormalizeModifiers {
                target,
                serialize_marker,
            } => {
                let decl = unit.declaration(*target)?;
                unit.with_declaration(*target, normalize_modifiers(decl, serialize_marker))
            }
            Rewrite::InsertCall { target, name, args } => {
                let site = unit.call(*target)?;
                let expr = chain::insert_before_terminal(&site.expr, name, args.clone())?;
                unit.with_call(*target, replace_expr(site, expr))
            }
            Rewrite::RenameTerminal { target, name, args } => {
                let site = unit.call(*target)?;
                let expr = chain::rename_terminal(&site.expr, name, args.clone())?;
                unit.with_call(*target, replace_expr(site, expr))
            }
            Rewrite::HoistArguments { target, link, name } => {
                let site = unit.call(*target)?;
                let (rewired, captured) = chain::remove_link(&site.expr, link)?;
                let expr = chain::rename_terminal(&rewired, name, captured)?;
                unit.with_call(*target, replace_expr(site, expr))
            }
        }
    }
}

fn replace_expr(site: &CallSite, expr: crate::syntax::Expr) -> CallSite {
    CallSite {
        expr,
        name_location: site.name_location.clone(),
    }
}

fn retype(decl: &Declaration, interface: &TypeName) -> Declaration {
    Declaration {
        type_syntax: interface.fully_qualified_syntax(),
        resolved: Some(ResolvedType {
            name: interface.clone(),
            kind: TypeKind::Interface,
            interfaces: Vec::new(),
        }),
        ..decl.clone()
    }
}

fn normalize_modifiers(decl: &Declaration, serialize_marker: &str) -> Declaration {
    let attribute_lists = decl
        .attribute_lists
        .iter()
        .filter_map(|list| {
            let kept: Vec<_> = list
                .annotations
                .iter()
                .filter(|annotation| !annotation_matches(annotation, serialize_marker))
                .cloned()
                .collect();
            if kept.is_empty() {
                return None;
            }
            Some(AttributeList {
                target: list.target.clone(),
                annotations: kept,
            })
        })
        .collect();
    Declaration {
        accessibility: Accessibility::Private,
        is_static: false,
        is_readonly: false,
        other_modifiers: Vec::new(),
        attribute_lists,
        ..decl.clone()
    }
}

/// Candidate fixes for `diagnostic`, in the order they should be offered.
/// Context is re-derived from `unit`; a stale origin yields no fixes.
pub fn fixes_for(diagnostic: &Diagnostic, unit: &Unit, vocab: &Vocabulary) -> Vec<Fix> {
    match (diagnostic.rule, diagnostic.origin) {
        (RuleId::InterfaceType, NodeRef::Declaration(index)) => unit
            .declaration(index)
            .map(|decl| widen_type(index, decl))
            .unwrap_or_default(),
        (RuleId::Visibility, NodeRef::Declaration(index)) if unit.declaration(index).is_some() => {
            vec![Fix {
                title: format!(
                    "Make field private, instance, mutable, and remove [{}]",
                    vocab.serialize_marker
                ),
                equivalence_key: "SK002_Fix".to_string(),
                rewrite: Rewrite::NormalizeModifiers {
                    target: index,
                    serialize_marker: vocab.serialize_marker.clone(),
                },
            }]
        }
        (RuleId::MissingCancellation, NodeRef::Call(index)) => {
            let Some(site) = unit.call(index) else {
                return Vec::new();
            };
            if site.expr.member_call().is_none() {
                return Vec::new();
            }
            let token = ArgList::single(&vocab.token_expr);
            vec![
                Fix {
                    title: format!("Add '.{}({})'", vocab.cancel_call, vocab.token_expr),
                    equivalence_key: "SK004_AddWithCancellation".to_string(),
                    rewrite: Rewrite::InsertCall {
                        target: index,
                        name: vocab.cancel_call.clone(),
                        args: token.clone(),
                    },
                },
                Fix {
                    title: format!("Use '.{}({})'", vocab.safe_execute, vocab.token_expr),
                    equivalence_key: "SK004_UseExecuteWithCancellationAsync".to_string(),
                    rewrite: Rewrite::RenameTerminal {
                        target: index,
                        name: vocab.safe_execute.clone(),
                        args: token,
                    },
                },
            ]
        }
        (RuleId::PreferSafeExecute, NodeRef::Call(index)) => {
            let Some(site) = unit.call(index) else {
                return Vec::new();
            };
            let Some((_, member)) = site.expr.member_call() else {
                return Vec::new();
            };
            if chain::Chain::flatten(&member.receiver)
                .find(&vocab.cancel_call)
                .is_none()
            {
                return Vec::new();
            }
            vec![Fix {
                title: format!(
                    "Use '.{}(...)' and remove '.{}(...)'",
                    vocab.safe_execute, vocab.cancel_call
                ),
                equivalence_key: "SK010_UseWrapper".to_string(),
                rewrite: Rewrite::HoistArguments {
                    target: index,
                    link: vocab.cancel_call.clone(),
                    name: vocab.safe_execute.clone(),
                },
            }]
        }
        _ => Vec::new(),
    }
}

fn widen_type(index: usize, decl: &Declaration) -> Vec<Fix> {
    let Some(resolved) = decl.resolved.as_ref() else {
        return Vec::new();
    };
    if resolved.kind == TypeKind::Interface {
        return Vec::new();
    }
    let mut seen = HashSet::new();
    resolved
        .interfaces
        .iter()
        .filter(|iface| seen.insert(iface.identity().to_string()))
        .map(|iface| Fix {
            title: format!("Change type to interface '{}'", iface.name),
            equivalence_key: format!("SK001_ChangeType_{}", iface.name),
            rewrite: Rewrite::ChangeType {
                target: index,
                interface: iface.clone(),
            },
        })
        .collect()
}
