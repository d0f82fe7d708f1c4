//! SK004 / SK010: cancellation on injection chains.
//!
//! Both rules look at the same `ExecuteAsync` terminal call and test
//! complementary outcomes of one walk, so at most one of them fires per site.

use crate::chain::{self, ChainRoles};
use crate::config::Vocabulary;
use crate::rules::RuleId;
use crate::syntax::Expr;

pub fn classify(terminal: &Expr, vocab: &Vocabulary) -> Option<RuleId> {
    let (_, member) = terminal.member_call()?;
    if member.identifier() != vocab.unsafe_execute {
        return None;
    }
    match chain::walk(&member.receiver, vocab) {
        ChainRoles {
            started_with_marker: false,
            ..
        } => None,
        ChainRoles {
            saw_cancellation: false,
            ..
        } => Some(RuleId::MissingCancellation),
        ChainRoles {
            saw_cancellation: true,
            ..
        } => Some(RuleId::PreferSafeExecute),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::ArgList;

    fn inject() -> Expr {
        Expr::name("_loc").call("InjectServicesAsync", ArgList::single("this"))
    }

    #[test]
    fn missing_cancellation() {
        let terminal = inject().call("ExecuteAsync", ArgList::empty());
        assert_eq!(
            classify(&terminal, &Vocabulary::default()),
            Some(RuleId::MissingCancellation)
        );
    }

    #[test]
    fn redundant_pattern() {
        let terminal = inject()
            .call("WithCancellation", ArgList::single("ct"))
            .call("ExecuteAsync", ArgList::empty());
        assert_eq!(
            classify(&terminal, &Vocabulary::default()),
            Some(RuleId::PreferSafeExecute)
        );
    }

    #[test]
    fn safe_terminal_is_quiet() {
        let terminal = inject().call("ExecuteWithCancellationAsync", ArgList::single("ct"));
        assert_eq!(classify(&terminal, &Vocabulary::default()), None);
    }

    #[test]
    fn unrelated_execute_is_quiet() {
        let terminal = Expr::name("command").call("ExecuteAsync", ArgList::empty());
        assert_eq!(classify(&terminal, &Vocabulary::default()), None);
    }

    #[test]
    fn custom_vocabulary() {
        let vocab = Vocabulary {
            start_call: "Resolve".to_string(),
            unsafe_execute: "Run".to_string(),
            ..Vocabulary::default()
        };
        let terminal = Expr::name("c")
            .call("Resolve", ArgList::empty())
            .call("Run", ArgList::empty());
        assert_eq!(classify(&terminal, &vocab), Some(RuleId::MissingCancellation));
    }
}
