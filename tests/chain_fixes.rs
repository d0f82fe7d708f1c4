use proptest::collection::vec;
use proptest::prelude::*;
use sklint::cancel::NeverCancel;
use sklint::config::Vocabulary;
use sklint::fixes::{Fix, fixes_for};
use sklint::model::Location;
use sklint::rules::{RuleId, analyze_unit};
use sklint::syntax::{ArgList, CallSite, Expr, Unit};

fn vocab() -> Vocabulary {
    Vocabulary::default().with_token_expr("token")
}

fn unit_with(expr: Expr) -> Unit {
    let mut unit = Unit::new(Some("Player.cs"));
    unit.push_call(CallSite {
        expr,
        name_location: Location::default(),
    });
    unit
}

fn inject() -> Expr {
    Expr::name("loc").call("InjectServicesAsync", ArgList::single("this"))
}

fn single_fixes(unit: &Unit) -> (RuleId, Vec<Fix>) {
    let found = analyze_unit(unit, &vocab(), &NeverCancel).unwrap();
    assert_eq!(found.len(), 1, "expected one diagnostic, got {found:?}");
    (found[0].rule, fixes_for(&found[0], unit, &vocab()))
}

fn rendered(unit: &Unit) -> String {
    unit.call(0).unwrap().expr.to_string()
}

#[test]
fn missing_cancellation_offers_insert_and_collapse() {
    let unit = unit_with(inject().call("ExecuteAsync", ArgList::empty()));
    let (rule, fixes) = single_fixes(&unit);
    assert_eq!(rule, RuleId::MissingCancellation);
    let keys: Vec<_> = fixes.iter().map(|fix| fix.equivalence_key.as_str()).collect();
    assert_eq!(
        keys,
        vec![
            "SK004_AddWithCancellation",
            "SK004_UseExecuteWithCancellationAsync"
        ]
    );
    assert_eq!(fixes[0].title, "Add '.WithCancellation(token)'");
    assert_eq!(fixes[1].title, "Use '.ExecuteWithCancellationAsync(token)'");

    let inserted = fixes[0].apply(&unit).unwrap();
    assert_eq!(
        rendered(&inserted),
        "loc.InjectServicesAsync(this).WithCancellation(token).ExecuteAsync()"
    );
    let collapsed = fixes[1].apply(&unit).unwrap();
    assert_eq!(
        rendered(&collapsed),
        "loc.InjectServicesAsync(this).ExecuteWithCancellationAsync(token)"
    );
    assert!(analyze_unit(&collapsed, &vocab(), &NeverCancel).unwrap().is_empty());

    // the source unit is untouched
    assert_eq!(
        rendered(&unit),
        "loc.InjectServicesAsync(this).ExecuteAsync()"
    );
}

#[test]
fn insert_leaves_no_missing_cancellation() {
    let unit = unit_with(inject().call("ExecuteAsync", ArgList::empty()));
    let (_, fixes) = single_fixes(&unit);
    let inserted = fixes[0].apply(&unit).unwrap();
    let after = analyze_unit(&inserted, &vocab(), &NeverCancel).unwrap();
    assert!(
        after
            .iter()
            .all(|diagnostic| diagnostic.rule != RuleId::MissingCancellation)
    );
}

#[test]
fn wrapper_fix_hoists_token() {
    let unit = unit_with(
        inject()
            .call("WithCancellation", ArgList::single("token"))
            .call("ExecuteAsync", ArgList::empty()),
    );
    let (rule, fixes) = single_fixes(&unit);
    assert_eq!(rule, RuleId::PreferSafeExecute);
    assert_eq!(fixes.len(), 1);
    assert_eq!(fixes[0].equivalence_key, "SK010_UseWrapper");
    let fixed = fixes[0].apply(&unit).unwrap();
    assert_eq!(
        rendered(&fixed),
        "loc.InjectServicesAsync(this).ExecuteWithCancellationAsync(token)"
    );
    assert!(analyze_unit(&fixed, &vocab(), &NeverCancel).unwrap().is_empty());
}

#[test]
fn wrapper_fix_keeps_other_links_and_original_arguments() {
    let unit = unit_with(
        inject()
            .call("WithCancellation", ArgList::from_raw("(cts.Token)"))
            .call("WithTimeout", ArgList::single("5"))
            .call("ExecuteAsync", ArgList::empty()),
    );
    let (_, fixes) = single_fixes(&unit);
    let fixed = fixes[0].apply(&unit).unwrap();
    assert_eq!(
        rendered(&fixed),
        "loc.InjectServicesAsync(this).WithTimeout(5).ExecuteWithCancellationAsync(cts.Token)"
    );
}

#[test]
fn fix_declines_when_target_changed_shape() {
    let unit = unit_with(inject().call("ExecuteAsync", ArgList::empty()));
    let (_, fixes) = single_fixes(&unit);
    let mut reshaped = Unit::new(Some("Player.cs"));
    reshaped.push_call(CallSite {
        expr: Expr::name("nothing"),
        name_location: Location::default(),
    });
    assert!(fixes[0].apply(&reshaped).is_none());
    assert!(fixes[1].apply(&reshaped).is_none());
}

#[test]
fn only_the_changed_site_is_rebuilt() {
    let mut unit = unit_with(inject().call("ExecuteAsync", ArgList::empty()));
    unit.push_call(CallSite {
        expr: Expr::name("other").call("Run", ArgList::empty()),
        name_location: Location::default(),
    });
    let found = analyze_unit(&unit, &vocab(), &NeverCancel).unwrap();
    assert_eq!(found.len(), 1);
    let fixes = fixes_for(&found[0], &unit, &vocab());
    let fixed = fixes[1].apply(&unit).unwrap();
    assert_eq!(
        fixed.changed_since(&unit),
        vec![sklint::syntax::NodeRef::Call(0)]
    );
}

proptest! {
    #[test]
    fn both_fixes_clear_the_site(extra in vec("[A-Z][a-z]{2,8}", 0..4)) {
        let mut receiver = inject();
        for name in &extra {
            receiver = receiver.call(name, ArgList::empty());
        }
        let unit = unit_with(receiver.call("ExecuteAsync", ArgList::empty()));
        let (rule, fixes) = single_fixes(&unit);
        prop_assert_eq!(rule, RuleId::MissingCancellation);
        for fix in &fixes {
            let fixed = fix.apply(&unit).unwrap();
            let after = analyze_unit(&fixed, &vocab(), &NeverCancel).unwrap();
            prop_assert!(after.iter().all(|d| d.rule != RuleId::MissingCancellation));
        }
    }
}
