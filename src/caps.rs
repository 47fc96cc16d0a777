//! Capability sets and their command-line encoding.
//!
//! A capability pairs a daemon scope (`mon`, `osd`, `mds`, `mgr`) with a
//! grant string such as `"allow *"`. Insertion order is semantically
//! meaningful: it fixes the argument order of the generated command, which
//! in turn makes invocations reproducible and comparable byte-for-byte in
//! tests.

/// One scope → grant pair. Grant strings are passed through verbatim;
/// the external tool is the authority on their syntax.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Capability {
    pub scope: String,
    pub grant: String,
}

/// Ordered collection of capabilities. Scopes are unique within one set;
/// inserting an existing scope replaces its grant in place, keeping the
/// original position.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CapabilitySet {
    entries: Vec<Capability>,
}

impl CapabilitySet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, scope: impl Into<String>, grant: impl Into<String>) {
        let scope = scope.into();
        let grant = grant.into();
        if let Some(existing) = self.entries.iter_mut().find(|c| c.scope == scope) {
            existing.grant = grant;
        } else {
            self.entries.push(Capability { scope, grant });
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Capability> {
        self.entries.iter()
    }

    /// Parse `scope=grant` pairs as supplied on the command line,
    /// preserving order.
    pub fn parse_pairs(pairs: &[String]) -> Result<Self, String> {
        let mut set = Self::new();
        for pair in pairs {
            match pair.split_once('=') {
                Some((scope, grant)) if !scope.trim().is_empty() => {
                    set.insert(scope.trim(), grant.trim());
                }
                _ => return Err(format!("expected scope=grant, got {:?}", pair)),
            }
        }
        Ok(set)
    }
}

impl FromIterator<(String, String)> for CapabilitySet {
    fn from_iter<T: IntoIterator<Item = (String, String)>>(iter: T) -> Self {
        let mut set = Self::new();
        for (scope, grant) in iter {
            set.insert(scope, grant);
        }
        set
    }
}

/// Which consumer the encoding targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncodeStyle {
    /// `ceph-authtool` style: `--cap <scope> <grant>` triplets.
    ToolFlags,
    /// Bare `<scope> <grant>` pairs for non-authtool consumers.
    PlainArgs,
}

/// Flatten a capability set into command-line tokens in insertion order.
/// An empty set yields an empty vector.
pub fn encode(style: EncodeStyle, caps: &CapabilitySet) -> Vec<String> {
    let mut args = Vec::new();
    for cap in caps.iter() {
        if style == EncodeStyle::ToolFlags {
            args.push("--cap".to_string());
        }
        args.push(cap.scope.clone());
        args.push(cap.grant.clone());
    }
    args
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_caps() -> CapabilitySet {
        let mut caps = CapabilitySet::new();
        caps.insert("mon", "allow *");
        caps.insert("osd", "allow rwx");
        caps
    }

    #[test]
    fn test_tool_flags_encoding_preserves_order() {
        let args = encode(EncodeStyle::ToolFlags, &sample_caps());
        assert_eq!(
            args,
            vec!["--cap", "mon", "allow *", "--cap", "osd", "allow rwx"]
        );
    }

    #[test]
    fn test_plain_args_encoding() {
        let args = encode(EncodeStyle::PlainArgs, &sample_caps());
        assert_eq!(args, vec!["mon", "allow *", "osd", "allow rwx"]);
    }

    #[test]
    fn test_empty_set_encodes_to_nothing() {
        let caps = CapabilitySet::new();
        assert!(encode(EncodeStyle::ToolFlags, &caps).is_empty());
        assert!(encode(EncodeStyle::PlainArgs, &caps).is_empty());
    }

    #[test]
    fn test_insert_replaces_in_place() {
        let mut caps = sample_caps();
        caps.insert("mon", "allow rw");
        let args = encode(EncodeStyle::PlainArgs, &caps);
        assert_eq!(args, vec!["mon", "allow rw", "osd", "allow rwx"]);
    }

    #[test]
    fn test_grant_strings_pass_through_verbatim() {
        let mut caps = CapabilitySet::new();
        caps.insert("mds", "allow rw path=/shared, allow r path=/");
        let args = encode(EncodeStyle::ToolFlags, &caps);
        assert_eq!(args[2], "allow rw path=/shared, allow r path=/");
    }

    #[test]
    fn test_parse_pairs() {
        let pairs = vec!["mon=allow *".to_string(), "osd=allow rwx".to_string()];
        let caps = CapabilitySet::parse_pairs(&pairs).unwrap();
        assert_eq!(caps.len(), 2);
        assert_eq!(
            encode(EncodeStyle::PlainArgs, &caps),
            vec!["mon", "allow *", "osd", "allow rwx"]
        );
    }

    #[test]
    fn test_parse_pairs_rejects_missing_separator() {
        let pairs = vec!["mon allow *".to_string()];
        assert!(CapabilitySet::parse_pairs(&pairs).is_err());
    }
}
