//! Turns a rewritten unit back into text edits on the original source.

use crate::host::csharp::{DeclSyntax, LoweredFile};
use crate::model::{AttributeList, Declaration};
use crate::syntax::{NodeRef, Unit};
use std::ops::Range;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextEdit {
    pub range: Range<usize>,
    pub replacement: String,
}

/// Edits for every node of `updated` that is no longer shared with the
/// unit `file` was lowered into.
pub fn edits_for(file: &LoweredFile, updated: &Unit, source: &str) -> Vec<TextEdit> {
    let mut out = Vec::new();
    for node in updated.changed_since(&file.unit) {
        match node {
            NodeRef::Declaration(index) => {
                let (Some(old), Some(new), Some(syntax)) = (
                    file.unit.declaration(index),
                    updated.declaration(index),
                    file.decl_syntax.get(index),
                ) else {
                    continue;
                };
                out.extend(declaration_edits(old, new, syntax, source));
            }
            NodeRef::Call(index) => {
                let (Some(old), Some(new)) = (file.unit.call(index), updated.call(index)) else {
                    continue;
                };
                let Some(range) = old.expr.origin() else {
                    continue;
                };
                let replacement = new.expr.render_with_source(source);
                if source.get(range.clone()) != Some(replacement.as_str()) {
                    out.push(TextEdit { range, replacement });
                }
            }
        }
    }
    out
}

fn declaration_edits(
    old: &Declaration,
    new: &Declaration,
    syntax: &DeclSyntax,
    source: &str,
) -> Vec<TextEdit> {
    let mut out = Vec::new();
    let lists_changed = old.attribute_lists != new.attribute_lists;
    let modifiers_changed = old.modifier_keywords() != new.modifier_keywords();
    if lists_changed || modifiers_changed {
        match head_edits(old, new, syntax, source) {
            Some(edits) => out.extend(edits),
            None => out.push(TextEdit {
                range: syntax.head.clone(),
                replacement: render_head(new, syntax),
            }),
        }
    }
    if old.type_syntax != new.type_syntax {
        out.push(TextEdit {
            range: syntax.ty.clone(),
            replacement: new.type_syntax.clone(),
        });
    }
    out
}

/// Token-level edits inside the head, so comments and directives between
/// attribute lists and modifiers survive. `None` when the new attribute
/// lists are not a pruned copy of the old ones.
fn head_edits(
    old: &Declaration,
    new: &Declaration,
    syntax: &DeclSyntax,
    source: &str,
) -> Option<Vec<TextEdit>> {
    if syntax.attribute_lists.len() != old.attribute_lists.len() {
        return None;
    }
    let mut out = Vec::new();
    let pairs = pair_lists(&old.attribute_lists, &new.attribute_lists)?;
    for ((range, before), kept) in syntax
        .attribute_lists
        .iter()
        .zip(&old.attribute_lists)
        .zip(pairs)
    {
        match kept.and_then(|index| new.attribute_lists.get(index)) {
            Some(after) if after == before => {}
            Some(after) => out.push(TextEdit {
                range: range.clone(),
                replacement: after.render(),
            }),
            None => out.push(TextEdit {
                range: with_trailing_space(source, range.clone()),
                replacement: String::new(),
            }),
        }
    }
    if old.modifier_keywords() != new.modifier_keywords() {
        let keywords = new.modifier_keywords().join(" ");
        match syntax.modifiers.split_first() {
            None => out.push(TextEdit {
                range: syntax.ty.start..syntax.ty.start,
                replacement: format!("{keywords} "),
            }),
            Some((first, rest)) => {
                out.push(TextEdit {
                    range: first.clone(),
                    replacement: keywords,
                });
                for range in rest {
                    out.push(TextEdit {
                        range: with_trailing_space(source, range.clone()),
                        replacement: String::new(),
                    });
                }
            }
        }
    }
    Some(out)
}

/// Maps each old list to the new list it was pruned into, if any.
fn pair_lists(old: &[AttributeList], new: &[AttributeList]) -> Option<Vec<Option<usize>>> {
    let mut next = 0;
    let mut out = Vec::with_capacity(old.len());
    for list in old {
        match new.get(next) {
            Some(kept) if is_pruned_from(kept, list) => {
                out.push(Some(next));
                next += 1;
            }
            _ => out.push(None),
        }
    }
    (next == new.len()).then_some(out)
}

fn is_pruned_from(kept: &AttributeList, list: &AttributeList) -> bool {
    let mut rest = list.annotations.iter();
    kept.target == list.target
        && kept
            .annotations
            .iter()
            .all(|annotation| rest.any(|candidate| candidate == annotation))
}

fn with_trailing_space(source: &str, range: Range<usize>) -> Range<usize> {
    let rest = source.get(range.end..).unwrap_or("");
    let space = rest.len() - rest.trim_start().len();
    range.start..range.end + space
}

fn render_head(decl: &Declaration, syntax: &DeclSyntax) -> String {
    let separator = if syntax.multiline {
        format!("\n{}", syntax.indent)
    } else {
        " ".to_string()
    };
    let mut out = String::new();
    for list in &decl.attribute_lists {
        out.push_str(&list.render());
        out.push_str(&separator);
    }
    for keyword in decl.modifier_keywords() {
        out.push_str(&keyword);
        out.push(' ');
    }
    out
}

/// Applies non-overlapping edits, outermost first. Returns the new text and
/// the edits that were skipped because they overlap an accepted one.
pub fn apply_edits(source: &str, mut edits: Vec<TextEdit>) -> (String, Vec<TextEdit>) {
    // Insertions go before a replacement starting at the same byte.
    edits.sort_by(|a, b| {
        a.range
            .start
            .cmp(&b.range.start)
            .then(b.range.is_empty().cmp(&a.range.is_empty()))
            .then(b.range.end.cmp(&a.range.end))
    });
    let mut accepted: Vec<TextEdit> = Vec::new();
    let mut skipped = Vec::new();
    for edit in edits {
        if edit.range.end > source.len() || edit.range.start > edit.range.end {
            skipped.push(edit);
            continue;
        }
        match accepted.last() {
            Some(last) if *last == edit => {}
            Some(last) if overlaps(&last.range, &edit.range) => skipped.push(edit),
            _ => accepted.push(edit),
        }
    }
    let mut out = source.to_string();
    for edit in accepted.iter().rev() {
        out.replace_range(edit.range.clone(), &edit.replacement);
    }
    (out, skipped)
}

fn overlaps(a: &Range<usize>, b: &Range<usize>) -> bool {
    a.start < b.end && b.start < a.end
}

#[cfg(test)]
mod tests {
    use super::*;

    fn edit(range: Range<usize>, text: &str) -> TextEdit {
        TextEdit {
            range,
            replacement: text.to_string(),
        }
    }

    #[test]
    fn applies_in_reverse_order() {
        let (out, skipped) = apply_edits("abc def ghi", vec![edit(0..3, "X"), edit(8..11, "YY")]);
        assert_eq!(out, "X def YY");
        assert!(skipped.is_empty());
    }

    #[test]
    fn outer_edit_wins_over_nested() {
        let (out, skipped) =
            apply_edits("a.B().C()", vec![edit(0..5, "inner"), edit(0..9, "outer")]);
        assert_eq!(out, "outer");
        assert_eq!(skipped, vec![edit(0..5, "inner")]);
    }

    #[test]
    fn identical_edits_collapse() {
        let (out, skipped) = apply_edits("public int a, b;", vec![edit(0..7, ""), edit(0..7, "")]);
        assert_eq!(out, "int a, b;");
        assert!(skipped.is_empty());
    }

    #[test]
    fn insertion_lands_before_replacement_at_same_byte() {
        let (out, skipped) =
            apply_edits("int a;", vec![edit(0..3, "ILogger"), edit(0..0, "private ")]);
        assert_eq!(out, "private ILogger a;");
        assert!(skipped.is_empty());
    }

    #[test]
    fn out_of_range_is_skipped() {
        let (out, skipped) = apply_edits("abc", vec![edit(2..9, "x")]);
        assert_eq!(out, "abc");
        assert_eq!(skipped.len(), 1);
    }
}
