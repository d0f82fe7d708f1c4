use crate::model::{Location, Severity};
use crate::rules::{DESCRIPTORS, RuleId};
use crate::syntax::NodeRef;
use blake3::Hasher;
use serde::Serialize;
use serde_json::{Value, json};
use std::collections::HashSet;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub rule: RuleId,
    pub severity: Severity,
    pub message: String,
    pub location: Location,
    /// Node the diagnostic was raised on, handed back for fix construction.
    pub origin: NodeRef,
}

impl Diagnostic {
    pub fn fingerprint(&self) -> String {
        let mut hasher = Hasher::new();
        push_opt_str(&mut hasher, self.location.path.as_deref());
        push_i64(&mut hasher, self.location.span.start_line);
        push_i64(&mut hasher, self.location.span.start_col);
        push_i64(&mut hasher, self.location.span.end_line);
        push_i64(&mut hasher, self.location.span.end_col);
        push_str(&mut hasher, self.rule.code());
        push_str(&mut hasher, &self.message);
        hasher.finalize().to_hex().to_string()
    }

    pub fn record(&self) -> DiagnosticRecord {
        let span = &self.location.span;
        DiagnosticRecord {
            rule_id: self.rule.code().to_string(),
            severity: self.severity.as_str().to_string(),
            message: self.message.clone(),
            path: self.location.path.clone(),
            line: span.start_line,
            column: span.start_col,
            end_line: span.end_line,
            end_column: span.end_col,
            fingerprint: self.fingerprint(),
        }
    }
}

/// Flat, serializable view used for JSON output.
#[derive(Debug, Clone, Serialize)]
pub struct DiagnosticRecord {
    pub rule_id: String,
    pub severity: String,
    pub message: String,
    pub path: Option<String>,
    pub line: i64,
    pub column: i64,
    pub end_line: i64,
    pub end_column: i64,
    pub fingerprint: String,
}

/// Builds a diagnostic with the rule's default severity and rendered message.
pub fn report(rule: RuleId, args: &[&str], location: Location, origin: NodeRef) -> Diagnostic {
    let descriptor = rule.descriptor();
    Diagnostic {
        rule,
        severity: descriptor.severity,
        message: descriptor.format(args),
        location,
        origin,
    }
}

/// Drops repeated reports of the same site, keeping first occurrences.
pub fn dedup(diagnostics: Vec<Diagnostic>) -> Vec<Diagnostic> {
    let mut seen = HashSet::new();
    diagnostics
        .into_iter()
        .filter(|diagnostic| seen.insert(diagnostic.fingerprint()))
        .collect()
}

pub fn sort(diagnostics: &mut [Diagnostic]) {
    diagnostics.sort_by(|a, b| {
        a.location
            .path
            .cmp(&b.location.path)
            .then(a.location.span.start_byte.cmp(&b.location.span.start_byte))
            .then(a.rule.cmp(&b.rule))
    });
}

/// SARIF 2.1.0 log with a single run.
pub fn to_sarif(diagnostics: &[Diagnostic]) -> Value {
    let rules: Vec<Value> = DESCRIPTORS
        .iter()
        .map(|descriptor| {
            let mut rule = json!({
                "id": descriptor.id,
                "name": descriptor.title,
                "shortDescription": { "text": descriptor.title },
                "defaultConfiguration": { "level": descriptor.severity.sarif_level() },
                "properties": { "category": descriptor.category },
            });
            if let Some(description) = descriptor.description {
                rule["fullDescription"] = json!({ "text": description });
            }
            rule
        })
        .collect();
    let results: Vec<Value> = diagnostics.iter().map(sarif_result).collect();
    json!({
        "$schema": "https://json.schemastore.org/sarif-2.1.0.json",
        "version": "2.1.0",
        "runs": [
            {
                "tool": {
                    "driver": {
                        "name": "sklint",
                        "version": env!("CARGO_PKG_VERSION"),
                        "rules": rules,
                    }
                },
                "results": results,
            }
        ]
    })
}

fn sarif_result(diagnostic: &Diagnostic) -> Value {
    let span = &diagnostic.location.span;
    let rule_index = DESCRIPTORS
        .iter()
        .position(|descriptor| descriptor.id == diagnostic.rule.code())
        .unwrap_or_default();
    json!({
        "ruleId": diagnostic.rule.code(),
        "ruleIndex": rule_index,
        "level": diagnostic.severity.sarif_level(),
        "message": { "text": diagnostic.message },
        "locations": [
            {
                "physicalLocation": {
                    "artifactLocation": { "uri": diagnostic.location.path.as_deref().unwrap_or("") },
                    "region": {
                        "startLine": span.start_line,
                        "startColumn": span.start_col,
                        "endLine": span.end_line,
                        "endColumn": span.end_col,
                    }
                }
            }
        ],
        "partialFingerprints": { "sklint/v1": diagnostic.fingerprint() },
    })
}

fn push_opt_str(hasher: &mut Hasher, value: Option<&str>) {
    match value {
        Some(value) => push_str(hasher, value),
        None => push_str(hasher, "-"),
    }
}

fn push_i64(hasher: &mut Hasher, value: i64) {
    push_str(hasher, &value.to_string());
}

fn push_str(hasher: &mut Hasher, value: &str) {
    hasher.update(value.as_bytes());
    hasher.update(b"\n");
}
