//! Per-invocation parameters.
//!
//! One immutable value carries every caller-supplied option through a
//! reconciliation call; nothing is read from ambient state. Defaults:
//! cluster `ceph`, state `present`, containerized execution against a
//! pinned image.

use std::path::PathBuf;

use crate::caps::CapabilitySet;
use crate::error::{KeyError, KeyResult};
use crate::reconcile::DesiredState;

pub const DEFAULT_CLUSTER: &str = "ceph";
pub const DEFAULT_CONTAINER_IMAGE: &str = "quay.io/ceph/ceph:v17";

/// Entity identity within a cluster namespace. Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyIdentity {
    pub cluster: String,
    /// Entity name, typically `<type>.<id>` (e.g. `client.admin`).
    pub name: String,
}

impl KeyIdentity {
    pub fn new(cluster: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            cluster: cluster.into(),
            name: name.into(),
        }
    }

    /// Keyring filename for this identity: `<cluster>.<name>.keyring`.
    pub fn keyring_filename(&self) -> String {
        format!("{}.{}.keyring", self.cluster, self.name)
    }
}

/// Parameters for one key reconciliation call.
#[derive(Debug, Clone)]
pub struct KeyParams {
    pub cluster: String,
    pub name: String,
    pub state: DesiredState,
    pub secret: Option<String>,
    pub caps: CapabilitySet,
    /// Destination directory for the keyring file. Required for `present`
    /// and `absent`.
    pub dest: Option<PathBuf>,
    pub owner: Option<String>,
    pub group: Option<String>,
    /// Octal permission string, e.g. `"0600"`.
    pub mode: Option<String>,
    pub containerized: bool,
    pub container_image: String,
}

impl KeyParams {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            cluster: DEFAULT_CLUSTER.to_string(),
            name: name.into(),
            state: DesiredState::Present,
            secret: None,
            caps: CapabilitySet::new(),
            dest: None,
            owner: None,
            group: None,
            mode: None,
            containerized: true,
            container_image: DEFAULT_CONTAINER_IMAGE.to_string(),
        }
    }

    pub fn identity(&self) -> KeyIdentity {
        KeyIdentity::new(&self.cluster, &self.name)
    }

    /// Image to wrap the create command with, or `None` for direct host
    /// execution.
    pub fn effective_image(&self) -> Option<&str> {
        if self.containerized {
            Some(self.container_image.as_str())
        } else {
            None
        }
    }

    /// Reject malformed input before any subprocess or filesystem mutation.
    pub fn validate(&self) -> KeyResult<()> {
        if self.name.trim().is_empty() {
            return Err(KeyError::Validation("name must not be empty".to_string()));
        }
        if self.cluster.trim().is_empty() {
            return Err(KeyError::Validation(
                "cluster must not be empty".to_string(),
            ));
        }
        match self.state {
            DesiredState::Present | DesiredState::Absent => {
                if self.dest.is_none() {
                    return Err(KeyError::Validation(format!(
                        "dest is required for state {}",
                        self.state
                    )));
                }
            }
            DesiredState::GenerateSecret => {}
        }
        if let Some(mode) = &self.mode {
            if u32::from_str_radix(mode, 8).is_err() {
                return Err(KeyError::Validation(format!(
                    "mode must be an octal string, got {:?}",
                    mode
                )));
            }
        }
        Ok(())
    }
}

/// Parameters for the read-only key-info query.
#[derive(Debug, Clone)]
pub struct InfoParams {
    pub name: String,
    pub cluster: String,
    pub user: Option<String>,
    /// Path to previously materialized key material.
    pub user_key: Option<PathBuf>,
    pub output_format: String,
    pub state: String,
    pub containerized: bool,
    pub container_image: Option<String>,
}

impl InfoParams {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            cluster: DEFAULT_CLUSTER.to_string(),
            user: None,
            user_key: None,
            output_format: "json".to_string(),
            state: "info".to_string(),
            containerized: true,
            container_image: None,
        }
    }
}
