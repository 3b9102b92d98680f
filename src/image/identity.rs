//! Unprivileged runtime identity

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

/// The user/group pair that owns every file in the runtime image and under
/// which the supervised process executes. Never privileged: uid 0 or gid 0
/// is rejected at construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuntimeIdentity {
    pub user: String,
    pub uid: u32,
    pub gid: u32,
}

impl RuntimeIdentity {
    pub fn new(user: impl Into<String>, uid: u32, gid: u32) -> Result<Self> {
        let user = user.into();
        if uid == 0 || gid == 0 {
            bail!("runtime identity {}:{}:{} is privileged", user, uid, gid);
        }
        if user.is_empty() {
            bail!("runtime identity needs a user name");
        }
        Ok(Self { user, uid, gid })
    }
}

impl std::fmt::Display for RuntimeIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}({}:{})", self.user, self.uid, self.gid)
    }
}
