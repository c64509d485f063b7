// src/exchange/terminal.rs
//! Terminal-state vocabulary, looked up per role instead of branched on
//! agent identity.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Which side of an exchange this agent plays. The two sides of the same
/// exchange kind finish in different state labels (one side acks and
/// deletes, the other finalizes).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExchangeRole {
    Issuer,
    Holder,
    Verifier,
    Prover,
    PingSender,
    PingTarget,
}

static TERMINAL_TABLE: Lazy<HashMap<ExchangeRole, HashSet<&'static str>>> = Lazy::new(|| {
    use ExchangeRole::*;
    let mut table: HashMap<ExchangeRole, HashSet<&'static str>> = HashMap::new();
    table.insert(Issuer, ["credential_acked", "deleted"].into_iter().collect());
    table.insert(Holder, ["done", "credential_acked"].into_iter().collect());
    table.insert(Verifier, ["done", "presentation_acked"].into_iter().collect());
    table.insert(Prover, ["done", "presentation_acked"].into_iter().collect());
    table.insert(PingSender, ["response_received"].into_iter().collect());
    table.insert(PingTarget, ["received"].into_iter().collect());
    table
});

/// Total predicate over state labels for one role: any label not in the
/// role's terminal set counts as pending, including labels this crate has
/// never seen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TerminalStates {
    role: ExchangeRole,
}

impl TerminalStates {
    pub fn for_role(role: ExchangeRole) -> Self {
        Self { role }
    }

    pub fn role(&self) -> ExchangeRole {
        self.role
    }

    pub fn is_terminal(&self, state: &str) -> bool {
        TERMINAL_TABLE
            .get(&self.role)
            .map(|labels| labels.contains(state))
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn holder_and_issuer_differ_on_deleted() {
        let issuer = TerminalStates::for_role(ExchangeRole::Issuer);
        let holder = TerminalStates::for_role(ExchangeRole::Holder);
        assert!(issuer.is_terminal("deleted"));
        assert!(!holder.is_terminal("deleted"));
        assert!(issuer.is_terminal("credential_acked"));
        assert!(holder.is_terminal("credential_acked"));
    }

    #[test]
    fn unrecognized_labels_are_pending() {
        for role in [
            ExchangeRole::Issuer,
            ExchangeRole::Holder,
            ExchangeRole::Verifier,
            ExchangeRole::Prover,
            ExchangeRole::PingSender,
            ExchangeRole::PingTarget,
        ] {
            let terminal = TerminalStates::for_role(role);
            assert!(!terminal.is_terminal("some-future-state"));
            assert!(!terminal.is_terminal(""));
        }
    }

    #[test]
    fn ping_roles_use_ping_vocabulary() {
        let sender = TerminalStates::for_role(ExchangeRole::PingSender);
        let target = TerminalStates::for_role(ExchangeRole::PingTarget);
        assert!(sender.is_terminal("response_received"));
        assert!(!sender.is_terminal("received"));
        assert!(target.is_terminal("received"));
        assert_eq!(sender.role(), ExchangeRole::PingSender);
    }
}
