//! Roles and capabilities

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Account role within the platform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    /// Platform administrator, no access to company stock
    Admin,
    /// Company manager, holds every stock capability
    Manager,
    /// Company member, holds only the capabilities granted to them
    User,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "ADMIN",
            Role::Manager => "MANAGER",
            Role::User => "USER",
        }
    }
}

/// A single permission a user can hold inside their company
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    AccessDashboard,
    AddStock,
    RemoveStock,
    SeeCost,
    SeeProfit,
}

impl Capability {
    pub const ALL: [Capability; 5] = [
        Capability::AccessDashboard,
        Capability::AddStock,
        Capability::RemoveStock,
        Capability::SeeCost,
        Capability::SeeProfit,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Capability::AccessDashboard => "access_dashboard",
            Capability::AddStock => "add_stock",
            Capability::RemoveStock => "remove_stock",
            Capability::SeeCost => "see_cost",
            Capability::SeeProfit => "see_profit",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown capability name
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown capability: {0}")]
pub struct UnknownCapability(pub String);

impl FromStr for Capability {
    type Err = UnknownCapability;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Capability::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| UnknownCapability(s.to_string()))
    }
}

/// Fixed-schema set of capabilities held by an actor
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CapabilitySet(BTreeSet<Capability>);

impl CapabilitySet {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn all() -> Self {
        Capability::ALL.into_iter().collect()
    }

    /// Capabilities in effect for a role, given the ones granted explicitly.
    /// Managers hold everything; admins hold nothing inside a company.
    pub fn effective(role: Role, granted: CapabilitySet) -> Self {
        match role {
            Role::Manager => Self::all(),
            Role::User => granted,
            Role::Admin => Self::empty(),
        }
    }

    /// Parse capability names, rejecting unknown ones
    pub fn parse<I, S>(names: I) -> Result<Self, UnknownCapability>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        names
            .into_iter()
            .map(|n| n.as_ref().parse::<Capability>())
            .collect()
    }

    pub fn contains(&self, capability: Capability) -> bool {
        self.0.contains(&capability)
    }
}

impl FromIterator<Capability> for CapabilitySet {
    fn from_iter<T: IntoIterator<Item = Capability>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manager_holds_everything() {
        let caps = CapabilitySet::effective(Role::Manager, CapabilitySet::empty());
        for c in Capability::ALL {
            assert!(caps.contains(c));
        }
    }

    #[test]
    fn test_admin_holds_nothing() {
        let caps = CapabilitySet::effective(Role::Admin, CapabilitySet::all());
        assert_eq!(caps, CapabilitySet::empty());
    }

    #[test]
    fn test_user_keeps_granted() {
        let granted: CapabilitySet = [Capability::AddStock].into_iter().collect();
        let caps = CapabilitySet::effective(Role::User, granted);
        assert!(caps.contains(Capability::AddStock));
        assert!(!caps.contains(Capability::RemoveStock));
    }

    #[test]
    fn test_parse_rejects_unknown() {
        let parsed = CapabilitySet::parse(["add_stock", "see_cost"]).unwrap();
        assert!(parsed.contains(Capability::SeeCost));

        let err = CapabilitySet::parse(["add_stock", "launch_rockets"]).unwrap_err();
        assert_eq!(err, UnknownCapability("launch_rockets".to_string()));
    }
}
