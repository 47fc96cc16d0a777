//! Reading back existing keyring files.
//!
//! ceph-authtool writes an INI-like format:
//!
//! ```text
//! [client.admin]
//!     key = AQBSdFhfAAAAABAA3TwOW6A17v5sSyRTuNgi/Q==
//!     caps mon = "allow *"
//!     caps osd = "allow *"
//! ```
//!
//! The reconciler parses this to decide whether a requested (secret, caps)
//! pair is already materialized, so an unchanged request skips the external
//! tool entirely.

use std::fs;
use std::path::Path;

use crate::caps::CapabilitySet;

/// One entity section of a keyring file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyringEntry {
    pub name: String,
    pub key: Option<String>,
    pub caps: CapabilitySet,
}

impl KeyringEntry {
    /// Whether this entry already satisfies a requested secret and
    /// capability set. Caps compare in order, matching the deterministic
    /// order the create command would have written them in.
    pub fn matches(&self, secret: &str, caps: &CapabilitySet) -> bool {
        self.key.as_deref() == Some(secret) && &self.caps == caps
    }
}

fn section_header(line: &str) -> Option<&str> {
    let line = line.trim();
    line.strip_prefix('[')?.strip_suffix(']')
}

fn key_value(line: &str) -> Option<(&str, &str)> {
    let (lhs, rhs) = line.split_once('=')?;
    Some((lhs.trim(), rhs.trim().trim_matches('"')))
}

/// Parse the named entity section out of keyring file contents. Returns
/// `None` when the section is absent; unknown lines are skipped.
pub fn parse_entry(contents: &str, name: &str) -> Option<KeyringEntry> {
    let mut in_section = false;
    let mut key = None;
    let mut caps = CapabilitySet::new();
    let mut found = false;

    for line in contents.lines() {
        if let Some(header) = section_header(line) {
            if in_section {
                break;
            }
            in_section = header == name;
            found |= in_section;
            continue;
        }
        if !in_section {
            continue;
        }
        if let Some((lhs, rhs)) = key_value(line) {
            if lhs == "key" {
                key = Some(rhs.to_string());
            } else if let Some(scope) = lhs.strip_prefix("caps ") {
                caps.insert(scope.trim(), rhs);
            }
        }
    }

    if found {
        Some(KeyringEntry {
            name: name.to_string(),
            key,
            caps,
        })
    } else {
        None
    }
}

/// Load and parse the named entry from a keyring file on disk. An absent
/// or unreadable file reads as "no entry".
pub fn load_entry(path: &Path, name: &str) -> Option<KeyringEntry> {
    let contents = fs::read_to_string(path).ok()?;
    parse_entry(&contents, name)
}
