//! Call-chain walker.
//!
//! A chain such as `loc.InjectServicesAsync(this).WithCancellation(t).ExecuteAsync()`
//! is a singly linked list of invocations read from the outside in. The
//! terminal call's receiver is flattened once into [`ChainLink`] records in
//! terminal-to-root order: index 0 is the link right before the terminal
//! call, the last index is the link closest to the root.
//!
//! Rules only care about which roles are *present* in a chain, never about
//! their order.

use crate::config::Vocabulary;
use crate::syntax::{ArgList, Expr, Invocation, MemberAccess, Step, identifier};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LinkRole {
    Start,
    Cancellation,
    Terminal,
    Other,
}

impl LinkRole {
    pub fn classify(name: &str, vocab: &Vocabulary) -> LinkRole {
        let name = identifier(name);
        if name == vocab.start_call {
            LinkRole::Start
        } else if name == vocab.cancel_call {
            LinkRole::Cancellation
        } else if name == vocab.unsafe_execute || name == vocab.safe_execute {
            LinkRole::Terminal
        } else {
            LinkRole::Other
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ChainLink<'a> {
    pub invocation: &'a Invocation,
    pub member: &'a MemberAccess,
    /// Distance from the terminal call's receiver.
    pub depth: usize,
}

impl<'a> ChainLink<'a> {
    pub fn name(&self) -> &'a str {
        self.member.identifier()
    }

    pub fn args(&self) -> &'a ArgList {
        &self.invocation.args
    }

    /// Path to this link from the receiver the chain was flattened from.
    pub fn path(&self) -> Vec<Step> {
        link_path(self.depth)
    }
}

fn link_path(depth: usize) -> Vec<Step> {
    let mut path = Vec::with_capacity(depth * 2);
    for _ in 0..depth {
        path.push(Step::Callee);
        path.push(Step::Receiver);
    }
    path
}

#[derive(Debug, Clone)]
pub struct Chain<'a> {
    links: Vec<ChainLink<'a>>,
    root: &'a Expr,
}

impl<'a> Chain<'a> {
    /// Follows member-call receivers until something that is not an
    /// invocation of a member access. Every step moves strictly inward, so
    /// this visits each link once.
    pub fn flatten(receiver: &'a Expr) -> Self {
        let mut links = Vec::new();
        let mut cursor = receiver;
        while let Some((invocation, member)) = cursor.member_call() {
            links.push(ChainLink {
                invocation,
                member,
                depth: links.len(),
            });
            cursor = &member.receiver;
        }
        Chain {
            links,
            root: cursor,
        }
    }

    pub fn links(&self) -> &[ChainLink<'a>] {
        &self.links
    }

    pub fn root(&self) -> &'a Expr {
        self.root
    }

    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    /// First link named `name`, searching from the terminal inward.
    pub fn find(&self, name: &str) -> Option<&ChainLink<'a>> {
        self.links.iter().find(|link| link.name() == name)
    }

    pub fn roles(&self, vocab: &Vocabulary) -> ChainRoles {
        let mut roles = ChainRoles::default();
        for link in &self.links {
            match LinkRole::classify(link.name(), vocab) {
                LinkRole::Start => roles.started_with_marker = true,
                LinkRole::Cancellation => roles.saw_cancellation = true,
                LinkRole::Terminal | LinkRole::Other => {}
            }
        }
        if !roles.started_with_marker && root_is_bare_start(self.root, vocab) {
            roles.started_with_marker = true;
        }
        roles
    }
}

/// `InjectServicesAsync(this)` called without a receiver.
fn root_is_bare_start(root: &Expr, vocab: &Vocabulary) -> bool {
    root.as_invocation()
        .and_then(|invocation| invocation.callee.as_root())
        .is_some_and(|callee| identifier(&callee.text) == vocab.start_call)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ChainRoles {
    pub started_with_marker: bool,
    pub saw_cancellation: bool,
}

/// Walks the receiver of a terminal call.
pub fn walk(receiver: &Expr, vocab: &Vocabulary) -> ChainRoles {
    Chain::flatten(receiver).roles(vocab)
}

/// `recv.Terminal(a)` -> `recv.Name(args).Terminal(a)`
pub fn insert_before_terminal(terminal: &Expr, name: &str, args: ArgList) -> Option<Expr> {
    let (_, member) = terminal.member_call()?;
    let spliced = member.receiver.clone().call(name, args);
    terminal.replace_at(&[Step::Callee, Step::Receiver], spliced)
}

/// `recv.Terminal(a)` -> `recv.Name(args)`; the receiver is shared.
pub fn rename_terminal(terminal: &Expr, name: &str, args: ArgList) -> Option<Expr> {
    let (_, member) = terminal.member_call()?;
    Some(Expr::invoke(Expr::member(member.receiver.clone(), name), args))
}

/// Unlinks the first link named `name` below the terminal call and returns
/// the new terminal together with the removed link's argument list.
pub fn remove_link(terminal: &Expr, name: &str) -> Option<(Expr, ArgList)> {
    let (_, member) = terminal.member_call()?;
    let chain = Chain::flatten(&member.receiver);
    let link = chain.find(name)?;
    let captured = link.args().clone();
    let mut path = vec![Step::Callee, Step::Receiver];
    path.extend(link.path());
    let rewired = terminal.replace_at(&path, link.member.receiver.clone())?;
    Some((rewired, captured))
}
