use crate::cancel::Cancellable;
use crate::config::Vocabulary;
use crate::diagnostics::{self, Diagnostic};
use crate::error::AnalysisError;
use crate::markers::{MarkerKind, MarkerSet};
use crate::model::{Declaration, Severity};
use crate::syntax::{CallSite, NodeRef, Unit};
use serde::Serialize;

pub mod cancellation;
pub mod interface_type;
pub mod visibility;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum RuleId {
    #[serde(rename = "SK001")]
    InterfaceType,
    #[serde(rename = "SK002")]
    Visibility,
    #[serde(rename = "SK004")]
    MissingCancellation,
    #[serde(rename = "SK010")]
    PreferSafeExecute,
}

impl RuleId {
    pub const ALL: [RuleId; 4] = [
        RuleId::InterfaceType,
        RuleId::Visibility,
        RuleId::MissingCancellation,
        RuleId::PreferSafeExecute,
    ];

    pub fn code(&self) -> &'static str {
        self.descriptor().id
    }

    pub fn from_code(code: &str) -> Option<RuleId> {
        let code = code.trim();
        RuleId::ALL
            .into_iter()
            .find(|rule| rule.code().eq_ignore_ascii_case(code))
    }

    pub fn descriptor(&self) -> &'static Descriptor {
        match self {
            RuleId::InterfaceType => &DESCRIPTORS[0],
            RuleId::Visibility => &DESCRIPTORS[1],
            RuleId::MissingCancellation => &DESCRIPTORS[2],
            RuleId::PreferSafeExecute => &DESCRIPTORS[3],
        }
    }
}

/// Static metadata of one rule. Message formats use `{0}`, `{1}`, ... slots.
#[derive(Debug, Serialize)]
pub struct Descriptor {
    pub id: &'static str,
    pub title: &'static str,
    pub message_format: &'static str,
    pub category: &'static str,
    pub severity: Severity,
    pub description: Option<&'static str>,
    pub enabled_by_default: bool,
}

impl Descriptor {
    pub fn format(&self, args: &[&str]) -> String {
        let mut out = self.message_format.to_string();
        for (index, arg) in args.iter().enumerate() {
            out = out.replace(&format!("{{{index}}}"), arg);
        }
        out
    }
}

pub static DESCRIPTORS: [Descriptor; 4] = [
    Descriptor {
        id: "SK001",
        title: "Injected member should be an interface",
        message_format: "Member '{0}' with [{1}] should be an interface type",
        category: "ServiceKit.Usage",
        severity: Severity::Warning,
        description: Some(
            "ServiceKit recommends injecting interfaces to keep services loosely coupled and AOT-friendly.",
        ),
        enabled_by_default: true,
    },
    Descriptor {
        id: "SK002",
        title: "Injected field should be private, non-static, non-readonly, and not [SerializeField]",
        message_format: "Field '{0}' with [{1}] should be private, instance, mutable, and not [{2}]",
        category: "ServiceKit.Usage",
        severity: Severity::Warning,
        description: Some(
            "ServiceKit injects into instance fields; keep them private (avoid inspector), non-static, non-readonly, and do not mark with [SerializeField].",
        ),
        enabled_by_default: true,
    },
    Descriptor {
        id: "SK004",
        title: "Injection chain should specify a destroy cancellation token",
        message_format: "Call '.{0}({2})' or use '.{1}({2})'",
        category: "ServiceKit.Async",
        severity: Severity::Warning,
        description: None,
        enabled_by_default: true,
    },
    Descriptor {
        id: "SK010",
        title: "Prefer ExecuteWithCancellationAsync(...)",
        message_format: "Prefer '.{0}(token)' over '.{1}(token).{2}()'",
        category: "ServiceKit.Async",
        severity: Severity::Info,
        description: Some("Use the convenience wrapper for consistent injection cancellation."),
        enabled_by_default: true,
    },
];

/// Runs the declaration rules on one declaration.
pub fn check_declaration(
    decl: &Declaration,
    origin: NodeRef,
    vocab: &Vocabulary,
) -> Vec<Diagnostic> {
    let markers = MarkerSet::resolve(decl, vocab);
    if !markers.contains(MarkerKind::Inject) {
        return Vec::new();
    }
    let mut out = Vec::new();
    if interface_type::violates(decl) {
        out.push(diagnostics::report(
            RuleId::InterfaceType,
            &[decl.name.as_str(), vocab.inject_marker.as_str()],
            decl.location.clone(),
            origin,
        ));
    }
    if visibility::violates(decl, &markers) {
        out.push(diagnostics::report(
            RuleId::Visibility,
            &[
                decl.name.as_str(),
                vocab.inject_marker.as_str(),
                vocab.serialize_marker.as_str(),
            ],
            decl.location.clone(),
            origin,
        ));
    }
    out
}

/// Runs the call-chain rules on one invocation.
pub fn check_call(site: &CallSite, origin: NodeRef, vocab: &Vocabulary) -> Option<Diagnostic> {
    let rule = cancellation::classify(&site.expr, vocab)?;
    let args: [&str; 3] = match rule {
        RuleId::MissingCancellation => [
            vocab.cancel_call.as_str(),
            vocab.safe_execute.as_str(),
            vocab.token_expr.as_str(),
        ],
        _ => [
            vocab.safe_execute.as_str(),
            vocab.cancel_call.as_str(),
            vocab.unsafe_execute.as_str(),
        ],
    };
    Some(diagnostics::report(
        rule,
        &args,
        site.name_location.clone(),
        origin,
    ))
}

/// Analyzes every node of `unit`, checking `cancel` before each one.
pub fn analyze_unit<C>(
    unit: &Unit,
    vocab: &Vocabulary,
    cancel: &C,
) -> Result<Vec<Diagnostic>, AnalysisError>
where
    C: Cancellable + ?Sized,
{
    let cancelled = || AnalysisError::Cancelled {
        path: unit.path.clone().unwrap_or_default(),
    };
    let mut out = Vec::new();
    for (index, decl) in unit.declarations().iter().enumerate() {
        if cancel.is_cancelled() {
            return Err(cancelled());
        }
        out.extend(check_declaration(decl, NodeRef::Declaration(index), vocab));
    }
    for (index, site) in unit.calls().iter().enumerate() {
        if cancel.is_cancelled() {
            return Err(cancelled());
        }
        out.extend(check_call(site, NodeRef::Call(index), vocab));
    }
    for diagnostic in &mut out {
        if diagnostic.location.path.is_none() {
            diagnostic.location.path = unit.path.clone();
        }
    }
    Ok(out)
}
