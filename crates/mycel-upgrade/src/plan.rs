//! Upgrade plans, version maps and structural store deltas

use crate::error::{UpgradeError, UpgradeResult};
use mycel_primitives::BlockHeight;
use mycel_storage::{namespace, KvStore};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Module id to consensus version
pub type VersionMap = BTreeMap<String, u64>;

/// A scheduled upgrade: which one, and at what height
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plan {
    /// Upgrade name; selects the registered descriptor
    pub name: String,
    /// Height at which the upgrade runs
    pub height: BlockHeight,
    /// Free-form metadata (binary download links, etc.)
    #[serde(default)]
    pub info: String,
}

impl Plan {
    /// Create a plan
    pub fn new(name: impl Into<String>, height: BlockHeight) -> Self {
        Self {
            name: name.into(),
            height,
            info: String::new(),
        }
    }

    /// Attach info
    pub fn with_info(mut self, info: impl Into<String>) -> Self {
        self.info = info.into();
        self
    }

    /// Non-empty name and positive height
    pub fn validate(&self) -> UpgradeResult<()> {
        if self.name.trim().is_empty() {
            return Err(UpgradeError::InvalidPlan("name cannot be empty".to_string()));
        }
        if self.height <= 0 {
            return Err(UpgradeError::InvalidPlan(
                "height must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }

    /// Plan is due at `height`
    pub fn should_execute(&self, height: BlockHeight) -> bool {
        self.height > 0 && height >= self.height
    }
}

/// Namespace moved to a new id
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreRename {
    /// Current id
    pub old_key: String,
    /// New id
    pub new_key: String,
}

/// Structural delta applied to module namespaces at an upgrade boundary
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreUpgrades {
    /// Namespaces to create
    #[serde(default)]
    pub added: Vec<String>,
    /// Namespaces to move
    #[serde(default)]
    pub renamed: Vec<StoreRename>,
    /// Namespaces to remove with all their state
    #[serde(default)]
    pub deleted: Vec<String>,
}

impl StoreUpgrades {
    /// Delta that only creates `modules`
    pub fn adding<I, S>(modules: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            added: modules.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }

    /// Delta that only removes `modules`
    pub fn deleting<I, S>(modules: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            deleted: modules.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }

    /// No structural change
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.renamed.is_empty() && self.deleted.is_empty()
    }

    /// Apply the delta to `store`: deletions, then renames, then additions.
    pub fn apply(&self, store: &dyn KvStore) -> UpgradeResult<()> {
        for module in &self.deleted {
            let removed = namespace::delete(store, module)?;
            tracing::info!(module = %module, keys = removed, "store namespace deleted");
        }
        for rename in &self.renamed {
            let moved = namespace::rename(store, &rename.old_key, &rename.new_key)?;
            tracing::info!(
                from = %rename.old_key,
                to = %rename.new_key,
                keys = moved,
                "store namespace renamed"
            );
        }
        for module in &self.added {
            namespace::create(store, module)?;
            tracing::info!(module = %module, "store namespace added");
        }
        Ok(())
    }

    /// Module ids present after the delta, given those present before
    pub fn surviving<'a, I>(&self, before: I) -> Vec<String>
    where
        I: IntoIterator<Item = &'a String>,
    {
        let mut out: Vec<String> = before
            .into_iter()
            .filter(|m| !self.deleted.contains(m))
            .map(|m| {
                self.renamed
                    .iter()
                    .find(|r| &r.old_key == m)
                    .map(|r| r.new_key.clone())
                    .unwrap_or_else(|| m.clone())
            })
            .collect();
        for added in &self.added {
            if !out.contains(added) {
                out.push(added.clone());
            }
        }
        out
    }
}
