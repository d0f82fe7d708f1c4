//! SK001: injected members should be typed as interfaces.

use crate::model::{Declaration, TypeKind};

/// Unresolved types never fire.
pub fn violates(decl: &Declaration) -> bool {
    matches!(decl.type_kind(), Some(kind) if kind != TypeKind::Interface)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{DeclKind, Location, ResolvedType, TypeName};

    fn decl(resolved: Option<ResolvedType>) -> Declaration {
        Declaration {
            kind: DeclKind::Property,
            name: "Logger".to_string(),
            type_syntax: "Logger".to_string(),
            resolved,
            accessibility: Default::default(),
            is_static: false,
            is_readonly: false,
            other_modifiers: Vec::new(),
            attribute_lists: Vec::new(),
            location: Location::default(),
        }
    }

    fn resolved(kind: TypeKind) -> Option<ResolvedType> {
        Some(ResolvedType {
            name: TypeName::new("Logger", None),
            kind,
            interfaces: Vec::new(),
        })
    }

    #[test]
    fn interface_passes() {
        assert!(!violates(&decl(resolved(TypeKind::Interface))));
    }

    #[test]
    fn class_struct_and_other_fail() {
        assert!(violates(&decl(resolved(TypeKind::Class))));
        assert!(violates(&decl(resolved(TypeKind::Struct))));
        assert!(violates(&decl(resolved(TypeKind::Other))));
    }

    #[test]
    fn unresolved_is_silent() {
        assert!(!violates(&decl(None)));
    }
}
