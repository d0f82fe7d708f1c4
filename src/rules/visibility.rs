//! SK002: injected fields should be private, instance and mutable, and must
//! not be exposed to serialization.
//!
//! All four conditions collapse into a single diagnostic; the fix always
//! re-applies the whole policy.

use crate::markers::{MarkerKind, MarkerSet};
use crate::model::{Accessibility, DeclKind, Declaration};

pub fn violates(decl: &Declaration, markers: &MarkerSet) -> bool {
    if decl.kind != DeclKind::Field {
        return false;
    }
    let serialized = markers.contains(MarkerKind::Serialize);
    let exposed = decl.accessibility != Accessibility::Private;
    serialized || exposed || decl.is_static || decl.is_readonly
}
