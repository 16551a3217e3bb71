use core::str::FromStr;

use serde::{Deserialize, Serialize};

use stockpost_core::{AccountId, DomainError, TenantId};

/// High-level account kind (determines normal balance side).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountKind {
    Asset,
    Liability,
    Equity,
    Revenue,
    Expense,
}

impl AccountKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountKind::Asset => "asset",
            AccountKind::Liability => "liability",
            AccountKind::Equity => "equity",
            AccountKind::Revenue => "revenue",
            AccountKind::Expense => "expense",
        }
    }
}

impl FromStr for AccountKind {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "asset" => Ok(AccountKind::Asset),
            "liability" => Ok(AccountKind::Liability),
            "equity" => Ok(AccountKind::Equity),
            "revenue" => Ok(AccountKind::Revenue),
            "expense" => Ok(AccountKind::Expense),
            other => Err(DomainError::validation(format!("unknown account kind '{other}'"))),
        }
    }
}

/// Chart-of-accounts entry, keyed by `(tenant_id, code)`.
///
/// Provisioned by a separate seeding process; the posting path only reads it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    pub tenant_id: TenantId,
    pub code: String, // e.g. "152"
    pub name: String, // e.g. "Raw materials"
    pub kind: AccountKind,
    pub parent_id: Option<AccountId>,
}

impl Account {
    pub fn new(
        tenant_id: TenantId,
        code: impl Into<String>,
        name: impl Into<String>,
        kind: AccountKind,
    ) -> Self {
        Self {
            id: AccountId::new(),
            tenant_id,
            code: code.into(),
            name: name.into(),
            kind,
            parent_id: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_round_trips_through_text() {
        for kind in [
            AccountKind::Asset,
            AccountKind::Liability,
            AccountKind::Equity,
            AccountKind::Revenue,
            AccountKind::Expense,
        ] {
            assert_eq!(kind.as_str().parse::<AccountKind>().unwrap(), kind);
        }
        assert!("ASSET".parse::<AccountKind>().is_ok());
        assert!("income".parse::<AccountKind>().is_err());
    }
}
