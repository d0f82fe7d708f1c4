use proptest::collection::vec;
use proptest::prelude::*;
use sklint::chain::{ChainRoles, walk};
use sklint::config::Vocabulary;
use sklint::rules::{RuleId, cancellation};
use sklint::syntax::{ArgList, Expr};

fn unrelated_link() -> impl Strategy<Value = String> {
    "[A-Z][a-z]{2,10}"
}

fn with_links(mut expr: Expr, names: &[String]) -> Expr {
    for name in names {
        expr = expr.call(name, ArgList::empty());
    }
    expr
}

fn build(before: &[String], middle: &[String], after: &[String], cancel: bool) -> Expr {
    let mut expr = with_links(Expr::name("loc"), before);
    expr = expr.call("InjectServicesAsync", ArgList::single("this"));
    expr = with_links(expr, middle);
    if cancel {
        expr = expr.call("WithCancellation", ArgList::single("token"));
    }
    with_links(expr, after)
}

proptest! {
    #[test]
    fn roles_ignore_unrelated_links(
        before in vec(unrelated_link(), 0..4),
        middle in vec(unrelated_link(), 0..4),
        after in vec(unrelated_link(), 0..4),
        cancel in any::<bool>(),
    ) {
        let receiver = build(&before, &middle, &after, cancel);
        let roles = walk(&receiver, &Vocabulary::default());
        prop_assert_eq!(
            roles,
            ChainRoles {
                started_with_marker: true,
                saw_cancellation: cancel,
            }
        );
    }

    #[test]
    fn cancellation_rules_are_exclusive(
        middle in vec(unrelated_link(), 0..6),
        cancel in any::<bool>(),
    ) {
        let terminal = build(&[], &middle, &[], cancel).call("ExecuteAsync", ArgList::empty());
        let rule = cancellation::classify(&terminal, &Vocabulary::default());
        let expected = if cancel {
            RuleId::PreferSafeExecute
        } else {
            RuleId::MissingCancellation
        };
        prop_assert_eq!(rule, Some(expected));
    }

    #[test]
    fn chains_without_start_never_fire(links in vec(unrelated_link(), 0..6)) {
        let terminal = with_links(Expr::name("client"), &links)
            .call("WithCancellation", ArgList::single("token"))
            .call("ExecuteAsync", ArgList::empty());
        prop_assert_eq!(cancellation::classify(&terminal, &Vocabulary::default()), None);
    }
}

#[test]
fn safe_terminal_never_fires() {
    let terminal = Expr::name("loc")
        .call("InjectServicesAsync", ArgList::single("this"))
        .call("ExecuteWithCancellationAsync", ArgList::single("token"));
    assert_eq!(cancellation::classify(&terminal, &Vocabulary::default()), None);
}

#[test]
fn custom_vocabulary_is_honored() {
    let vocab = Vocabulary {
        start_call: "Resolve".to_string(),
        unsafe_execute: "Run".to_string(),
        ..Vocabulary::default()
    };
    let terminal = Expr::name("loc")
        .call("Resolve", ArgList::single("this"))
        .call("Run", ArgList::empty());
    assert_eq!(
        cancellation::classify(&terminal, &vocab),
        Some(RuleId::MissingCancellation)
    );
    let default_terminal = Expr::name("loc")
        .call("InjectServicesAsync", ArgList::single("this"))
        .call("ExecuteAsync", ArgList::empty());
    assert_eq!(cancellation::classify(&default_terminal, &vocab), None);
}
