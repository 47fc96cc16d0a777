//! Desired-state reconciliation for keyrings.
//!
//! One call inspects the world, runs at most one external command, and
//! packages the outcome. `present` is idempotent: when the requested secret
//! and caps already match the materialized keyring, no command runs and the
//! result reports unchanged. Creation writes through a temporary sibling
//! file renamed over the destination, so a crash mid-write never leaves a
//! corrupt keyring behind.

use std::fmt;
use std::fs;
use std::path::Path;

use serde::Serialize;
use thiserror::Error;

use crate::command;
use crate::config::KeyParams;
use crate::error::KeyError;
use crate::fileattr;
use crate::invoke::{Invocation, Invoker};
use crate::keyring;
use crate::secret;

/// Target state for one reconciliation call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DesiredState {
    #[default]
    Present,
    Absent,
    GenerateSecret,
}

impl DesiredState {
    /// Parse a state string from CLI/user input.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "present" => Some(Self::Present),
            "absent" => Some(Self::Absent),
            "generate_secret" => Some(Self::GenerateSecret),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Present => "present",
            Self::Absent => "absent",
            Self::GenerateSecret => "generate_secret",
        }
    }
}

impl fmt::Display for DesiredState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of one reconciliation (or info query) call, serialized as the
/// JSON result object handed back to the caller.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ReconciliationResult {
    pub changed: bool,
    pub rc: i32,
    pub stdout: String,
    pub stderr: String,
    pub cmd: Option<Invocation>,
}

#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error(transparent)]
    Key(#[from] KeyError),

    /// The external command ran and exited non-zero. Carries the complete
    /// result payload so callers can log cmd, rc, stdout, and stderr.
    #[error("failed to create key (rc {})", .result.rc)]
    CommandFailed { result: ReconciliationResult },
}

pub type ReconcileResult<T> = Result<T, ReconcileError>;

/// Drives the state machine against a caller-supplied invoker.
pub struct Reconciler<'a> {
    invoker: &'a dyn Invoker,
}

impl<'a> Reconciler<'a> {
    pub fn new(invoker: &'a dyn Invoker) -> Self {
        Self { invoker }
    }

    /// Reconcile the key described by `params` to its desired state.
    /// Validation failures surface before any subprocess or filesystem
    /// mutation; nothing is retried.
    pub fn reconcile(&self, params: &KeyParams) -> ReconcileResult<ReconciliationResult> {
        params.validate()?;

        match params.state {
            DesiredState::GenerateSecret => self.generate_secret(),
            DesiredState::Present => self.ensure_present(params),
            DesiredState::Absent => self.ensure_absent(params),
        }
    }

    fn generate_secret(&self) -> ReconcileResult<ReconciliationResult> {
        let secret = secret::generate(self.invoker)?;
        Ok(ReconciliationResult {
            changed: true,
            stdout: secret,
            ..Default::default()
        })
    }

    fn ensure_present(&self, params: &KeyParams) -> ReconcileResult<ReconciliationResult> {
        let Some(dest_dir) = params.dest.as_deref() else {
            return Err(KeyError::Validation("dest is required for state present".to_string()).into());
        };
        let identity = params.identity();
        let destination = command::keyring_path(dest_dir, &identity);

        if let Some(secret) = params.secret.as_deref() {
            if let Some(entry) = keyring::load_entry(&destination, &identity.name) {
                if entry.matches(secret, &params.caps) {
                    tracing::info!(
                        keyring = %destination.display(),
                        name = %identity.name,
                        "keyring already matches requested key, skipping"
                    );
                    return Ok(ReconciliationResult::default());
                }
            }
        }

        // The tool writes a sibling temp file which is renamed over the
        // destination on success.
        let tmp_destination = destination.with_extension("keyring.tmp");
        let invocation = command::build(
            &identity,
            params.secret.as_deref(),
            Some(&params.caps),
            &tmp_destination,
            params.effective_image(),
        )?;

        let output = match self.invoker.run(&invocation) {
            Ok(output) => output,
            Err(e) => {
                let _ = fs::remove_file(&tmp_destination);
                return Err(e.into());
            }
        };

        if output.rc != 0 {
            let _ = fs::remove_file(&tmp_destination);
            let result = ReconciliationResult {
                changed: false,
                rc: output.rc,
                stdout: output.stdout,
                stderr: output.stderr,
                cmd: Some(invocation),
            };
            tracing::warn!(rc = result.rc, stderr = %result.stderr, "create-keyring command failed");
            return Err(ReconcileError::CommandFailed { result });
        }

        self.finalize_keyring(params, &tmp_destination, &destination)?;

        tracing::info!(keyring = %destination.display(), name = %identity.name, "keyring created");

        Ok(ReconciliationResult {
            changed: true,
            rc: output.rc,
            stdout: output.stdout,
            stderr: output.stderr,
            cmd: Some(invocation),
        })
    }

    fn finalize_keyring(
        &self,
        params: &KeyParams,
        tmp_destination: &Path,
        destination: &Path,
    ) -> Result<(), KeyError> {
        fs::rename(tmp_destination, destination).map_err(|source| KeyError::Filesystem {
            path: tmp_destination.to_path_buf(),
            source,
        })?;

        fileattr::apply(
            destination,
            params.owner.as_deref(),
            params.group.as_deref(),
            params.mode.as_deref(),
        )
    }

    fn ensure_absent(&self, params: &KeyParams) -> ReconcileResult<ReconciliationResult> {
        let Some(dest_dir) = params.dest.as_deref() else {
            return Err(KeyError::Validation("dest is required for state absent".to_string()).into());
        };
        let destination = command::keyring_path(dest_dir, &params.identity());

        if !destination.exists() {
            return Ok(ReconciliationResult::default());
        }

        fs::remove_file(&destination).map_err(|source| KeyError::Filesystem {
            path: destination.clone(),
            source,
        })?;

        tracing::info!(keyring = %destination.display(), "keyring removed");

        Ok(ReconciliationResult {
            changed: true,
            ..Default::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::invoke::mock::MockInvoker;
    use crate::invoke::{CommandOutput, Invocation};
    use std::cell::RefCell;
    use std::path::PathBuf;

    /// Test double that behaves like ceph-authtool's create-keyring mode:
    /// it writes a keyring file at the `--create-keyring` path built from
    /// the `--name`, `--add-key`, and `--cap` arguments.
    #[derive(Default)]
    struct FakeAuthtool {
        calls: RefCell<Vec<Invocation>>,
    }

    impl FakeAuthtool {
        fn call_count(&self) -> usize {
            self.calls.borrow().len()
        }
    }

    impl Invoker for FakeAuthtool {
        fn run(&self, invocation: &Invocation) -> Result<CommandOutput, KeyError> {
            self.calls.borrow_mut().push(invocation.clone());

            let args = &invocation.args;
            let flag_value = |flag: &str| {
                args.iter()
                    .position(|a| a == flag)
                    .and_then(|i| args.get(i + 1))
                    .cloned()
            };

            let dest = PathBuf::from(flag_value("--create-keyring").expect("dest flag"));
            let name = flag_value("--name").unwrap_or_default();

            let mut contents = format!("[{}]\n", name);
            if let Some(key) = flag_value("--add-key") {
                contents.push_str(&format!("\tkey = {}\n", key));
            }
            let mut i = 0;
            while let Some(pos) = args[i..].iter().position(|a| a == "--cap") {
                let at = i + pos;
                contents.push_str(&format!(
                    "\tcaps {} = \"{}\"\n",
                    args[at + 1],
                    args[at + 2]
                ));
                i = at + 3;
            }
            std::fs::write(&dest, contents).map_err(|source| KeyError::Filesystem {
                path: dest,
                source,
            })?;

            Ok(CommandOutput::default())
        }
    }

    fn present_params(dest: &Path) -> KeyParams {
        let mut params = KeyParams::new("client.admin");
        params.dest = Some(dest.to_path_buf());
        params.containerized = false;
        params.secret = Some("AQCxyz==".to_string());
        params.caps.insert("mon", "allow *");
        params.caps.insert("osd", "allow *");
        params
    }

    #[test]
    fn test_generate_secret_never_touches_filesystem() {
        let mock = MockInvoker::new();
        mock.push_output(0, "AQCsecret==\n", "");

        let mut params = KeyParams::new("client.admin");
        params.state = DesiredState::GenerateSecret;

        let result = Reconciler::new(&mock).reconcile(&params).unwrap();
        assert!(result.changed);
        assert_eq!(result.stdout, "AQCsecret==");
        assert!(result.cmd.is_none());
        assert_eq!(result.rc, 0);
    }

    #[test]
    fn test_present_creates_keyring_and_reports_changed() {
        let dir = tempfile::tempdir().unwrap();
        let fake = FakeAuthtool::default();
        let params = present_params(dir.path());

        let result = Reconciler::new(&fake).reconcile(&params).unwrap();
        assert!(result.changed);
        assert_eq!(result.rc, 0);
        assert!(result.cmd.is_some());

        let destination = dir.path().join("ceph.client.admin.keyring");
        assert!(destination.exists());
        // No temp residue after the atomic rename.
        assert!(!dir.path().join("ceph.client.admin.keyring.tmp").exists());

        let entry = keyring::load_entry(&destination, "client.admin").unwrap();
        assert!(entry.matches("AQCxyz==", &params.caps));
    }

    #[test]
    fn test_present_is_idempotent_on_second_call() {
        let dir = tempfile::tempdir().unwrap();
        let fake = FakeAuthtool::default();
        let params = present_params(dir.path());
        let reconciler = Reconciler::new(&fake);

        let first = reconciler.reconcile(&params).unwrap();
        assert!(first.changed);
        assert_eq!(fake.call_count(), 1);

        let second = reconciler.reconcile(&params).unwrap();
        assert!(!second.changed);
        assert!(second.cmd.is_none());
        // Matching state skips the external command entirely.
        assert_eq!(fake.call_count(), 1);
    }

    #[test]
    fn test_present_reruns_when_secret_differs() {
        let dir = tempfile::tempdir().unwrap();
        let fake = FakeAuthtool::default();
        let mut params = present_params(dir.path());
        let reconciler = Reconciler::new(&fake);

        reconciler.reconcile(&params).unwrap();
        params.secret = Some("AQCrotated==".to_string());
        let result = reconciler.reconcile(&params).unwrap();
        assert!(result.changed);
        assert_eq!(fake.call_count(), 2);
    }

    #[test]
    fn test_present_without_secret_always_runs() {
        let dir = tempfile::tempdir().unwrap();
        let fake = FakeAuthtool::default();
        let mut params = present_params(dir.path());
        params.secret = None;
        let reconciler = Reconciler::new(&fake);

        assert!(reconciler.reconcile(&params).unwrap().changed);
        assert!(reconciler.reconcile(&params).unwrap().changed);
        assert_eq!(fake.call_count(), 2);
    }

    #[test]
    fn test_present_failure_carries_full_payload() {
        let dir = tempfile::tempdir().unwrap();
        let mock = MockInvoker::new();
        mock.push_output(1, "", "error opening keyring");

        let params = present_params(dir.path());
        let err = Reconciler::new(&mock).reconcile(&params).unwrap_err();
        match err {
            ReconcileError::CommandFailed { result } => {
                assert_eq!(result.rc, 1);
                assert_eq!(result.stderr, "error opening keyring");
                assert!(result.cmd.is_some());
                assert!(!result.changed);
            }
            other => panic!("expected CommandFailed, got {other:?}"),
        }
        // Failed runs leave no keyring or temp file behind.
        assert!(!dir.path().join("ceph.client.admin.keyring").exists());
        assert!(!dir.path().join("ceph.client.admin.keyring.tmp").exists());
    }

    #[test]
    fn test_missing_dest_fails_validation_before_any_call() {
        let mock = MockInvoker::new();
        let mut params = KeyParams::new("client.admin");
        params.state = DesiredState::Present;

        let err = Reconciler::new(&mock).reconcile(&params).unwrap_err();
        assert!(matches!(err, ReconcileError::Key(KeyError::Validation(_))));
        assert_eq!(mock.call_count(), 0);
    }

    #[test]
    fn test_absent_removes_existing_keyring() {
        let dir = tempfile::tempdir().unwrap();
        let destination = dir.path().join("ceph.client.admin.keyring");
        std::fs::write(&destination, "[client.admin]\n").unwrap();

        let mock = MockInvoker::new();
        let mut params = present_params(dir.path());
        params.state = DesiredState::Absent;

        let result = Reconciler::new(&mock).reconcile(&params).unwrap();
        assert!(result.changed);
        assert!(!destination.exists());
        // Removal is a pure filesystem operation.
        assert_eq!(mock.call_count(), 0);
    }

    #[test]
    fn test_absent_is_idempotent_when_already_missing() {
        let dir = tempfile::tempdir().unwrap();
        let mock = MockInvoker::new();
        let mut params = present_params(dir.path());
        params.state = DesiredState::Absent;

        let result = Reconciler::new(&mock).reconcile(&params).unwrap();
        assert!(!result.changed);
        assert_eq!(result.rc, 0);
    }

    #[test]
    fn test_state_parse_round_trip() {
        for state in [
            DesiredState::Present,
            DesiredState::Absent,
            DesiredState::GenerateSecret,
        ] {
            assert_eq!(DesiredState::parse(state.as_str()), Some(state));
        }
        assert_eq!(DesiredState::parse("latest"), None);
    }
}
