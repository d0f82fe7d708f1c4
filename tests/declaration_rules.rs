use proptest::prelude::*;
use sklint::cancel::NeverCancel;
use sklint::config::Vocabulary;
use sklint::fixes::fixes_for;
use sklint::model::{
    Accessibility, Annotation, AttributeList, DeclKind, Declaration, Location, ResolvedType,
    TypeKind, TypeName,
};
use sklint::rules::{RuleId, analyze_unit};
use sklint::syntax::Unit;

fn resolved(kind: TypeKind) -> Option<ResolvedType> {
    Some(ResolvedType {
        name: TypeName::new("IService", Some("Game.IService")),
        kind,
        interfaces: Vec::new(),
    })
}

fn field(accessibility: Accessibility, is_static: bool, is_readonly: bool, serialize: bool) -> Declaration {
    let mut annotations = vec![Annotation::simple("InjectService")];
    if serialize {
        annotations.push(Annotation::simple("SerializeField"));
    }
    Declaration {
        kind: DeclKind::Field,
        name: "_service".to_string(),
        type_syntax: "IService".to_string(),
        resolved: resolved(TypeKind::Interface),
        accessibility,
        is_static,
        is_readonly,
        other_modifiers: Vec::new(),
        attribute_lists: vec![AttributeList::of(annotations)],
        location: Location::default(),
    }
}

fn unit_of(decl: Declaration) -> Unit {
    let mut unit = Unit::new(Some("Player.cs"));
    unit.push_declaration(decl);
    unit
}

fn rules_in(unit: &Unit) -> Vec<RuleId> {
    analyze_unit(unit, &Vocabulary::default(), &NeverCancel)
        .unwrap()
        .into_iter()
        .map(|diagnostic| diagnostic.rule)
        .collect()
}

fn accessibility() -> impl Strategy<Value = Accessibility> {
    prop_oneof![
        Just(Accessibility::Public),
        Just(Accessibility::Private),
        Just(Accessibility::Protected),
        Just(Accessibility::Internal),
        Just(Accessibility::ProtectedInternal),
        Just(Accessibility::PrivateProtected),
    ]
}

proptest! {
    #[test]
    fn visibility_fires_iff_a_condition_holds(
        access in accessibility(),
        is_static in any::<bool>(),
        is_readonly in any::<bool>(),
        serialize in any::<bool>(),
    ) {
        let unit = unit_of(field(access, is_static, is_readonly, serialize));
        let expected = serialize || access != Accessibility::Private || is_static || is_readonly;
        let found = rules_in(&unit);
        prop_assert_eq!(found.contains(&RuleId::Visibility), expected);
        prop_assert!(found.iter().filter(|rule| **rule == RuleId::Visibility).count() <= 1);
    }

    #[test]
    fn visibility_fix_is_final(
        access in accessibility(),
        is_static in any::<bool>(),
        is_readonly in any::<bool>(),
        serialize in any::<bool>(),
    ) {
        prop_assume!(serialize || access != Accessibility::Private || is_static || is_readonly);
        let unit = unit_of(field(access, is_static, is_readonly, serialize));
        let found = analyze_unit(&unit, &Vocabulary::default(), &NeverCancel).unwrap();
        let diagnostic = found.iter().find(|d| d.rule == RuleId::Visibility).unwrap();
        let fixes = fixes_for(diagnostic, &unit, &Vocabulary::default());
        prop_assert_eq!(fixes.len(), 1);
        prop_assert_eq!(fixes[0].equivalence_key.as_str(), "SK002_Fix");
        let fixed = fixes[0].apply(&unit).unwrap();
        prop_assert!(!rules_in(&fixed).contains(&RuleId::Visibility));
        let decl = fixed.declaration(0).unwrap();
        prop_assert_eq!(decl.modifier_keywords(), vec!["private".to_string()]);
    }
}

#[test]
fn interface_rule_fires_once_for_concrete_types() {
    for kind in [TypeKind::Class, TypeKind::Struct, TypeKind::Other] {
        let mut decl = field(Accessibility::Private, false, false, false);
        decl.resolved = resolved(kind);
        assert_eq!(rules_in(&unit_of(decl)), vec![RuleId::InterfaceType]);
    }
    let decl = field(Accessibility::Private, false, false, false);
    assert!(rules_in(&unit_of(decl)).is_empty());
}

#[test]
fn unresolved_type_does_not_fire() {
    let mut decl = field(Accessibility::Private, false, false, false);
    decl.resolved = None;
    assert!(rules_in(&unit_of(decl)).is_empty());
}

#[test]
fn unmarked_declarations_are_ignored() {
    let mut decl = field(Accessibility::Public, true, true, true);
    decl.resolved = resolved(TypeKind::Class);
    decl.attribute_lists = vec![AttributeList::of(vec![Annotation::simple("SerializeField")])];
    assert!(rules_in(&unit_of(decl)).is_empty());
}

#[test]
fn properties_only_get_the_interface_rule() {
    let mut decl = field(Accessibility::Public, true, false, false);
    decl.kind = DeclKind::Property;
    decl.resolved = resolved(TypeKind::Class);
    assert_eq!(rules_in(&unit_of(decl)), vec![RuleId::InterfaceType]);
}

#[test]
fn qualified_and_suffixed_markers_match() {
    let mut decl = field(Accessibility::Private, false, false, false);
    decl.resolved = resolved(TypeKind::Class);
    decl.attribute_lists = vec![AttributeList::of(vec![Annotation::new(
        "Inj",
        Some("ServiceKit.InjectServiceAttribute"),
        "Inj",
    )])];
    assert_eq!(rules_in(&unit_of(decl)), vec![RuleId::InterfaceType]);
}

#[test]
fn visibility_message_names_every_requirement() {
    let unit = unit_of(field(Accessibility::Public, false, false, false));
    let found = analyze_unit(&unit, &Vocabulary::default(), &NeverCancel).unwrap();
    assert_eq!(
        found[0].message,
        "Field '_service' with [InjectService] should be private, instance, mutable, and not [SerializeField]"
    );
    assert_eq!(found[0].location.path.as_deref(), Some("Player.cs"));
}
