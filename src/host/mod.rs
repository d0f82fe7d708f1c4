//! C# host: loads a repository, lowers it into analysis units and writes
//! fixes back as text edits.

pub mod csharp;
pub mod edit;
pub mod scan;
pub mod types;

use crate::cancel::{Cancellable, NeverCancel};
use crate::config::Vocabulary;
use crate::diagnostics::{self, Diagnostic};
use crate::error::AnalysisError;
use crate::fixes::{self, Fix};
use crate::rules::{self, RuleId};
use crate::util;
use anyhow::{Context, Result, anyhow};
use csharp::{CSharpParser, LoweredFile, ParsedFile};
use rayon::prelude::*;
use scan::ScanOptions;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use types::TypeTable;

pub struct SourceFile {
    /// Set for files loaded from disk.
    pub abs_path: Option<PathBuf>,
    /// Hash of the text as loaded, used to detect concurrent edits on write.
    pub loaded_hash: String,
    pub parsed: ParsedFile,
    pub lowered: LoweredFile,
    dirty: bool,
}

impl SourceFile {
    pub fn rel_path(&self) -> &str {
        &self.parsed.rel_path
    }

    pub fn source(&self) -> &str {
        &self.parsed.source
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct FileReport {
    pub path: String,
    pub diagnostics: Vec<Diagnostic>,
}

#[derive(Debug, Clone, Default)]
pub struct FixOptions {
    /// Only fix these rules; empty means all.
    pub rules: Vec<RuleId>,
    /// Equivalence keys to pick, in priority order.
    pub prefer: Vec<String>,
    pub max_passes: usize,
}

#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct FixSummary {
    pub passes: usize,
    pub applied: usize,
    pub skipped_edits: usize,
    pub files_changed: Vec<String>,
    pub remaining: usize,
}

/// Fixes offered for one diagnostic.
#[derive(Debug, Clone, Serialize)]
pub struct FixOffer {
    pub diagnostic: Diagnostic,
    pub fixes: Vec<Fix>,
}

pub struct Workspace {
    root: Option<PathBuf>,
    files: Vec<SourceFile>,
    types: TypeTable,
}

impl Workspace {
    pub fn load(root: &Path, options: ScanOptions) -> Result<Self> {
        let scanned = scan::scan_repo_with_options(root, options)?;
        let loaded: Vec<(PathBuf, String, String, String)> = scanned
            .into_iter()
            .filter_map(|file| match util::read_to_string(&file.abs_path) {
                Ok(source) => Some((file.abs_path, file.rel_path, file.hash, source)),
                Err(err) => {
                    tracing::warn!(path = %file.rel_path, error = %err, "skipping unreadable file");
                    None
                }
            })
            .collect();
        let parsed = parse_all(
            loaded
                .into_iter()
                .map(|(abs, rel, hash, source)| (Some(abs), rel, hash, source))
                .collect(),
        )?;
        let workspace = Self::build(Some(root.to_path_buf()), parsed);
        tracing::info!(
            files = workspace.files.len(),
            types = workspace.types.len(),
            "loaded workspace"
        );
        Ok(workspace)
    }

    /// In-memory workspace from `(path, source)` pairs.
    pub fn from_sources(sources: Vec<(String, String)>) -> Result<Self> {
        let parsed = parse_all(
            sources
                .into_iter()
                .map(|(rel, source)| {
                    let hash = scan::hash_bytes(source.as_bytes());
                    (None, rel, hash, source)
                })
                .collect(),
        )?;
        Ok(Self::build(None, parsed))
    }

    fn build(root: Option<PathBuf>, parsed: Vec<(Option<PathBuf>, String, ParsedFile)>) -> Self {
        let types = type_table(parsed.iter().map(|(_, _, file)| file));
        let files = parsed
            .into_par_iter()
            .map(|(abs_path, loaded_hash, parsed)| {
                let lowered = csharp::lower(&parsed, &types);
                SourceFile {
                    abs_path,
                    loaded_hash,
                    parsed,
                    lowered,
                    dirty: false,
                }
            })
            .collect();
        Self { root, files, types }
    }

    pub fn root(&self) -> Option<&Path> {
        self.root.as_deref()
    }

    pub fn files(&self) -> &[SourceFile] {
        &self.files
    }

    pub fn file(&self, rel_path: &str) -> Option<&SourceFile> {
        let wanted = util::normalize_path(Path::new(rel_path));
        self.files.iter().find(|file| file.rel_path() == wanted)
    }

    pub fn source(&self, rel_path: &str) -> Option<&str> {
        self.file(rel_path).map(|file| file.source())
    }

    pub fn types(&self) -> &TypeTable {
        &self.types
    }

    /// Runs every rule on every file. Files are analyzed in parallel.
    pub fn analyze<C>(
        &self,
        vocab: &Vocabulary,
        cancel: &C,
    ) -> Result<Vec<FileReport>, AnalysisError>
    where
        C: Cancellable + Sync + ?Sized,
    {
        self.files
            .par_iter()
            .map(|file| {
                let mut found = rules::analyze_unit(&file.lowered.unit, vocab, cancel)?;
                diagnostics::sort(&mut found);
                Ok(FileReport {
                    path: file.rel_path().to_string(),
                    diagnostics: diagnostics::dedup(found),
                })
            })
            .collect()
    }

    /// Diagnostics on `line` of `rel_path` together with their fixes.
    pub fn fixes_at(&self, rel_path: &str, line: i64, vocab: &Vocabulary) -> Result<Vec<FixOffer>> {
        let file = self
            .file(rel_path)
            .ok_or_else(|| anyhow!("no C# file {rel_path} in workspace"))?;
        let unit = &file.lowered.unit;
        let found = rules::analyze_unit(unit, vocab, &NeverCancel)?;
        Ok(found
            .into_iter()
            .filter(|diagnostic| diagnostic.location.span.contains_line(line))
            .map(|diagnostic| {
                let fixes = fixes::fixes_for(&diagnostic, unit, vocab);
                FixOffer { diagnostic, fixes }
            })
            .collect())
    }

    /// Applies fixes to every file until nothing changes or the pass limit
    /// is reached. Sources are updated in memory; see [`Workspace::write`].
    pub fn fix_all<C>(
        &mut self,
        vocab: &Vocabulary,
        options: &FixOptions,
        cancel: &C,
    ) -> Result<FixSummary>
    where
        C: Cancellable + Sync + ?Sized,
    {
        let mut summary = FixSummary::default();
        let max_passes = options.max_passes.max(1);
        while summary.passes < max_passes {
            if cancel.is_cancelled() {
                return Err(AnalysisError::Cancelled {
                    path: self
                        .root
                        .as_deref()
                        .map(util::normalize_path)
                        .unwrap_or_default(),
                }
                .into());
            }
            summary.passes += 1;
            let results: Vec<Option<FileFix>> = self
                .files
                .par_iter()
                .map(|file| fix_file(file, vocab, options, cancel))
                .collect::<Result<_, AnalysisError>>()?;
            let mut changed = Vec::new();
            for (index, result) in results.into_iter().enumerate() {
                let Some(result) = result else {
                    continue;
                };
                summary.applied += result.applied;
                summary.skipped_edits += result.skipped;
                changed.push((index, result.text));
            }
            tracing::debug!(pass = summary.passes, files = changed.len(), "fix pass");
            if changed.is_empty() {
                break;
            }
            self.replace_sources(changed)?;
        }
        summary.files_changed = self
            .files
            .iter()
            .filter(|file| file.dirty)
            .map(|file| file.rel_path().to_string())
            .collect();
        summary.remaining = self
            .analyze(vocab, cancel)?
            .iter()
            .flat_map(|report| report.diagnostics.iter())
            .filter(|diagnostic| options.rules.is_empty() || options.rules.contains(&diagnostic.rule))
            .count();
        tracing::info!(
            passes = summary.passes,
            applied = summary.applied,
            files = summary.files_changed.len(),
            remaining = summary.remaining,
            "fix run finished"
        );
        Ok(summary)
    }

    /// Re-parses changed files, then rebuilds the type table and every unit.
    fn replace_sources(&mut self, changed: Vec<(usize, String)>) -> Result<()> {
        let mut parser = CSharpParser::new()?;
        for (index, text) in changed {
            let Some(file) = self.files.get_mut(index) else {
                continue;
            };
            file.parsed = parser.parse(&file.parsed.rel_path, text)?;
            file.dirty = true;
        }
        self.types = type_table(self.files.iter().map(|file| &file.parsed));
        let types = &self.types;
        self.files.par_iter_mut().for_each(|file| {
            file.lowered = csharp::lower(&file.parsed, types);
        });
        Ok(())
    }

    /// Writes changed files back to disk. A file modified on disk since it
    /// was loaded is left alone.
    pub fn write(&mut self) -> Result<Vec<String>> {
        let mut written = Vec::new();
        for file in self.files.iter_mut().filter(|file| file.dirty) {
            let Some(path) = file.abs_path.as_deref() else {
                continue;
            };
            let on_disk = scan::hash_file(path).with_context(|| format!("hash {}", path.display()))?;
            if on_disk != file.loaded_hash {
                tracing::warn!(path = %file.parsed.rel_path, "file changed on disk, not writing");
                continue;
            }
            fs::write(path, &file.parsed.source)
                .with_context(|| format!("write {}", path.display()))?;
            file.loaded_hash = scan::hash_bytes(file.parsed.source.as_bytes());
            file.dirty = false;
            written.push(file.parsed.rel_path.clone());
        }
        Ok(written)
    }
}

fn parse_all(
    inputs: Vec<(Option<PathBuf>, String, String, String)>,
) -> Result<Vec<(Option<PathBuf>, String, ParsedFile)>> {
    inputs
        .into_par_iter()
        .map_init(CSharpParser::new, |parser, (abs, rel, hash, source)| {
            let parser = parser.as_mut().map_err(|err| anyhow!("init parser: {err}"))?;
            let rel = util::normalize_path(Path::new(&rel));
            let parsed = parser.parse(&rel, source)?;
            Ok((abs, hash, parsed))
        })
        .collect()
}

fn type_table<'a>(files: impl Iterator<Item = &'a ParsedFile>) -> TypeTable {
    let mut table = TypeTable::new();
    for file in files {
        table.extend(csharp::collect_types(file));
    }
    table
}

struct FileFix {
    text: String,
    applied: usize,
    skipped: usize,
}

fn fix_file<C>(
    file: &SourceFile,
    vocab: &Vocabulary,
    options: &FixOptions,
    cancel: &C,
) -> Result<Option<FileFix>, AnalysisError>
where
    C: Cancellable + ?Sized,
{
    let base = &file.lowered.unit;
    let found = rules::analyze_unit(base, vocab, cancel)?;
    let mut unit = base.clone();
    let mut applied = 0;
    for diagnostic in diagnostics::dedup(found) {
        if !options.rules.is_empty() && !options.rules.contains(&diagnostic.rule) {
            continue;
        }
        if cancel.is_cancelled() {
            return Err(AnalysisError::Cancelled {
                path: file.rel_path().to_string(),
            });
        }
        let offered = fixes::fixes_for(&diagnostic, &unit, vocab);
        let Some(fix) = choose_fix(&offered, diagnostic.rule, &options.prefer) else {
            tracing::debug!(
                rule = diagnostic.rule.code(),
                path = %file.rel_path(),
                offered = offered.len(),
                "no fix chosen"
            );
            continue;
        };
        match fix.apply(&unit) {
            Some(next) => {
                unit = next;
                applied += 1;
            }
            None => tracing::debug!(key = %fix.equivalence_key, "fix declined"),
        }
    }
    if applied == 0 {
        return Ok(None);
    }
    let edits = edit::edits_for(&file.lowered, &unit, file.source());
    let (text, skipped) = edit::apply_edits(file.source(), edits);
    if !skipped.is_empty() {
        tracing::debug!(path = %file.rel_path(), skipped = skipped.len(), "overlapping edits deferred");
    }
    if text == file.source() {
        return Ok(None);
    }
    Ok(Some(FileFix {
        text,
        applied,
        skipped: skipped.len(),
    }))
}

/// The fix batch mode applies for one diagnostic: a preferred key first,
/// otherwise the only fix, or the first fix of rules whose fixes are not
/// a matter of taste.
pub fn choose_fix<'a>(offered: &'a [Fix], rule: RuleId, prefer: &[String]) -> Option<&'a Fix> {
    for key in prefer {
        if let Some(fix) = offered.iter().find(|fix| &fix.equivalence_key == key) {
            return Some(fix);
        }
    }
    match rule {
        _ if offered.len() == 1 => offered.first(),
        RuleId::Visibility | RuleId::MissingCancellation | RuleId::PreferSafeExecute => {
            offered.first()
        }
        RuleId::InterfaceType => None,
    }
}
