//! ceph-authtool command assembly.
//!
//! Builds the full argument vector for creating a keyring, optionally
//! wrapped in a `docker run` prefix. Argument order is deterministic and
//! fully determined by the inputs, so tests compare invocations literally.

use std::fs;
use std::path::{Path, PathBuf};

use crate::caps::{self, CapabilitySet, EncodeStyle};
use crate::config::KeyIdentity;
use crate::error::{KeyError, KeyResult};
use crate::invoke::Invocation;

pub const AUTHTOOL: &str = "ceph-authtool";
pub const CONTAINER_RUNTIME: &str = "docker";

/// Host directories shared with the container, read-write. These are
/// compile-time constants: caller input never reaches the mount list, so a
/// containerized invocation can touch nothing outside configuration,
/// persistent state, and logs.
const CONTAINER_BINDS: [&str; 3] = [
    "/etc/ceph:/etc/ceph:z",
    "/var/lib/ceph/:/var/lib/ceph/:z",
    "/var/log/ceph/:/var/log/ceph/:z",
];

/// Full path of the keyring file for `identity` under `dest_dir`.
pub fn keyring_path(dest_dir: &Path, identity: &KeyIdentity) -> PathBuf {
    dest_dir.join(identity.keyring_filename())
}

/// Create the destination's parent directory if missing. Idempotent; the
/// only side effect on the failure path is a possibly pre-existing
/// directory.
pub fn ensure_parent_dir(destination: &Path) -> KeyResult<()> {
    if let Some(parent) = destination.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|source| KeyError::Filesystem {
                path: parent.to_path_buf(),
                source,
            })?;
        }
    }
    Ok(())
}

/// Assemble the create-keyring invocation.
///
/// With a container image the tool runs under `docker run --rm --net=host`
/// with the fixed bind mounts and the entrypoint overridden to
/// ceph-authtool; the trailing arguments are identical to the direct-host
/// case. Fixed argument order: `--create-keyring <dest>`, then `--name`,
/// then `--add-key`, then the capability flags.
pub fn build(
    identity: &KeyIdentity,
    secret: Option<&str>,
    capabilities: Option<&CapabilitySet>,
    destination: &Path,
    container_image: Option<&str>,
) -> KeyResult<Invocation> {
    ensure_parent_dir(destination)?;

    let (program, mut args) = match container_image {
        Some(image) => {
            let mut args = vec![
                "run".to_string(),
                "--rm".to_string(),
                "--net=host".to_string(),
            ];
            for bind in CONTAINER_BINDS {
                args.push("-v".to_string());
                args.push(bind.to_string());
            }
            args.push(format!("--entrypoint={}", AUTHTOOL));
            args.push(image.to_string());
            (CONTAINER_RUNTIME.to_string(), args)
        }
        None => (AUTHTOOL.to_string(), Vec::new()),
    };

    args.push("--create-keyring".to_string());
    args.push(destination.to_string_lossy().to_string());

    if !identity.name.is_empty() {
        args.push("--name".to_string());
        args.push(identity.name.clone());
    }
    if let Some(secret) = secret {
        args.push("--add-key".to_string());
        args.push(secret.to_string());
    }
    if let Some(caps) = capabilities {
        if !caps.is_empty() {
            args.extend(caps::encode(EncodeStyle::ToolFlags, caps));
        }
    }

    tracing::debug!(?args, program = %program, "built create-keyring command");

    Ok(Invocation {
        program,
        args,
        containerized: container_image.is_some(),
        container_image: container_image.map(|s| s.to_string()),
    })
}
