//! Marker attribute lookup.
//!
//! Annotation names are matched as strings in exactly one place,
//! [`has_marker`]; everything downstream works on [`MarkerSet`].

use crate::config::Vocabulary;
use crate::model::{Annotation, Declaration};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MarkerKind {
    Inject,
    Serialize,
}

impl MarkerKind {
    pub const ALL: [MarkerKind; 2] = [MarkerKind::Inject, MarkerKind::Serialize];

    pub fn name<'a>(&self, vocab: &'a Vocabulary) -> &'a str {
        match self {
            MarkerKind::Inject => &vocab.inject_marker,
            MarkerKind::Serialize => &vocab.serialize_marker,
        }
    }
}

/// Markers observed on one declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MarkerSet {
    inject: bool,
    serialize: bool,
}

impl MarkerSet {
    pub fn resolve(decl: &Declaration, vocab: &Vocabulary) -> Self {
        let mut set = MarkerSet::default();
        for kind in MarkerKind::ALL {
            if has_marker(decl, kind.name(vocab)) {
                set.insert(kind);
            }
        }
        set
    }

    pub fn contains(&self, kind: MarkerKind) -> bool {
        match kind {
            MarkerKind::Inject => self.inject,
            MarkerKind::Serialize => self.serialize,
        }
    }

    fn insert(&mut self, kind: MarkerKind) {
        match kind {
            MarkerKind::Inject => self.inject = true,
            MarkerKind::Serialize => self.serialize = true,
        }
    }
}

pub fn has_marker(decl: &Declaration, marker_name: &str) -> bool {
    decl.annotations()
        .any(|annotation| annotation_matches(annotation, marker_name))
}

/// Simple-name equality, or a qualified name ending in `.marker`.
/// A trailing `Attribute` suffix is ignored on both sides.
pub fn annotation_matches(annotation: &Annotation, marker_name: &str) -> bool {
    let marker = strip_attribute_suffix(marker_name);
    if marker.is_empty() {
        return false;
    }
    if strip_attribute_suffix(&annotation.name) == marker {
        return true;
    }
    let Some(qualified) = annotation.qualified.as_deref() else {
        return false;
    };
    let qualified = strip_attribute_suffix(qualified);
    qualified
        .strip_suffix(marker)
        .is_some_and(|prefix| prefix.ends_with('.'))
}

pub fn strip_attribute_suffix(name: &str) -> &str {
    name.strip_suffix("Attribute")
        .filter(|stem| !stem.is_empty())
        .unwrap_or(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AttributeList, DeclKind, Location};

    fn decl_with(annotations: Vec<Annotation>) -> Declaration {
        Declaration {
            kind: DeclKind::Field,
            name: "svc".to_string(),
            type_syntax: "IService".to_string(),
            resolved: None,
            accessibility: Default::default(),
            is_static: false,
            is_readonly: false,
            other_modifiers: Vec::new(),
            attribute_lists: vec![AttributeList::of(annotations)],
            location: Location::default(),
        }
    }

    #[test]
    fn matches_simple_name_with_or_without_suffix() {
        let vocab = Vocabulary::default();
        let short = decl_with(vec![Annotation::simple("InjectService")]);
        let long = decl_with(vec![Annotation::simple("InjectServiceAttribute")]);
        assert!(MarkerSet::resolve(&short, &vocab).contains(MarkerKind::Inject));
        assert!(MarkerSet::resolve(&long, &vocab).contains(MarkerKind::Inject));
    }

    #[test]
    fn matches_alias_through_qualified_name() {
        let aliased = decl_with(vec![Annotation::new(
            "Inject",
            Some("ServiceKit.Attributes.InjectServiceAttribute"),
            "Inject",
        )]);
        assert!(has_marker(&aliased, "InjectService"));
        assert!(has_marker(&aliased, "InjectServiceAttribute"));
    }

    #[test]
    fn rejects_partial_suffix_matches() {
        let other = decl_with(vec![Annotation::new(
            "NotInjectService",
            Some("Acme.NotInjectServiceAttribute"),
            "NotInjectService",
        )]);
        assert!(!has_marker(&other, "InjectService"));
        assert!(!has_marker(&other, ""));
    }

    #[test]
    fn unresolved_annotation_matches_only_by_name() {
        let unresolved = decl_with(vec![Annotation::simple("Something")]);
        assert_eq!(MarkerSet::resolve(&unresolved, &Vocabulary::default()), MarkerSet::default());
    }
}
