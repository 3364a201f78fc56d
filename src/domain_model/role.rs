use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The fixed authorization levels. Wire names carry the `ROLE_` prefix.
#[derive(
    Debug, Clone, Copy, Ord, PartialOrd, Eq, PartialEq, Hash, Serialize, Deserialize,
)]
pub enum RoleKind {
    #[serde(rename = "ROLE_USER")]
    User,
    #[serde(rename = "ROLE_ADMIN")]
    Admin,
}

impl RoleKind {
    pub const ALL: [RoleKind; 2] = [RoleKind::User, RoleKind::Admin];

    pub fn name(&self) -> &'static str {
        match self {
            RoleKind::User => "ROLE_USER",
            RoleKind::Admin => "ROLE_ADMIN",
        }
    }
}

impl fmt::Display for RoleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, thiserror::Error)]
#[error("unknown role name: {0}")]
pub struct UnknownRole(pub String);

impl FromStr for RoleKind {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RoleKind::ALL
            .into_iter()
            .find(|kind| kind.name() == s)
            .ok_or_else(|| UnknownRole(s.to_string()))
    }
}

#[derive(
    Debug, Clone, Copy, Ord, PartialOrd, Eq, PartialEq, Hash, Serialize, Deserialize, sqlx::Type,
)]
#[sqlx(transparent)]
pub struct RoleId(pub i64);

#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub struct Role {
    pub role_id: RoleId,
    pub kind: RoleKind,
}

/// Roles held by a user. Never empty, at most one entry per kind.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct RoleSet(Vec<Role>);

impl RoleSet {
    pub fn single(role: Role) -> Self {
        RoleSet(vec![role])
    }

    /// Returns `None` when `roles` is empty. Later duplicates of a kind are dropped.
    pub fn from_roles(roles: impl IntoIterator<Item = Role>) -> Option<Self> {
        let mut set: Vec<Role> = Vec::new();
        for role in roles {
            if !set.iter().any(|r| r.kind == role.kind) {
                set.push(role);
            }
        }
        if set.is_empty() { None } else { Some(RoleSet(set)) }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Role> {
        self.0.iter()
    }

    pub fn contains(&self, kind: RoleKind) -> bool {
        self.0.iter().any(|r| r.kind == kind)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Never true for a set built through `single` or `from_roles`.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Role names, sorted so responses are deterministic.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.0.iter().map(|r| r.kind.name().to_string()).collect();
        names.sort();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn role(id: i64, kind: RoleKind) -> Role {
        Role {
            role_id: RoleId(id),
            kind,
        }
    }

    #[test]
    fn role_names_round_trip_through_from_str() {
        for kind in RoleKind::ALL {
            assert_eq!(kind.name().parse::<RoleKind>().unwrap(), kind);
        }
        assert!("ADMIN".parse::<RoleKind>().is_err());
        assert!("role_admin".parse::<RoleKind>().is_err());
    }

    #[test]
    fn role_kind_serializes_to_prefixed_name() {
        let json = serde_json::to_string(&RoleKind::Admin).unwrap();
        assert_eq!(json, "\"ROLE_ADMIN\"");
    }

    #[test]
    fn empty_role_set_is_rejected() {
        assert!(RoleSet::from_roles(Vec::new()).is_none());
    }

    #[test]
    fn role_set_keeps_one_entry_per_kind() {
        let set = RoleSet::from_roles([
            role(2, RoleKind::Admin),
            role(1, RoleKind::User),
            role(7, RoleKind::Admin),
        ])
        .unwrap();

        assert_eq!(set.len(), 2);
        assert!(!set.is_empty());
        assert!(set.contains(RoleKind::User));
        assert!(set.contains(RoleKind::Admin));
        assert_eq!(set.names(), vec!["ROLE_ADMIN", "ROLE_USER"]);
    }
}
