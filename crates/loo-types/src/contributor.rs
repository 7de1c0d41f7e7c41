use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Permission required to submit reports.
pub const REPORT_PERMISSION: &str = "report:loo";

/// Identity of a submitting user as supplied by the identity provider.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contributor {
    pub name: String,
    #[serde(default)]
    pub permissions: BTreeSet<String>,
    #[serde(default)]
    pub admin: bool,
}

impl Contributor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            permissions: BTreeSet::new(),
            admin: false,
        }
    }

    /// A contributor allowed to submit reports.
    pub fn reporter(name: impl Into<String>) -> Self {
        Self::new(name).with_permission(REPORT_PERMISSION)
    }

    pub fn with_permission(mut self, permission: impl Into<String>) -> Self {
        self.permissions.insert(permission.into());
        self
    }

    pub fn with_admin(mut self, admin: bool) -> Self {
        self.admin = admin;
        self
    }

    pub fn has_permission(&self, permission: &str) -> bool {
        self.permissions.contains(permission)
    }
}
