//! Ownership and permission application for created keyrings.
//!
//! Owner and group accept either a name (resolved via getpwnam/getgrnam)
//! or a numeric id; mode is an octal string. Applied after the keyring is
//! renamed into place.

use std::ffi::CString;
use std::fs;
use std::io;
use std::os::unix::ffi::OsStrExt;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;

use crate::error::{KeyError, KeyResult};

fn fs_err(path: &Path, source: io::Error) -> KeyError {
    KeyError::Filesystem {
        path: path.to_path_buf(),
        source,
    }
}

fn resolve_uid(owner: &str) -> io::Result<libc::uid_t> {
    if let Ok(uid) = owner.parse() {
        return Ok(uid);
    }
    let c_name = CString::new(owner)
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "owner contains NUL"))?;
    let pw = unsafe { libc::getpwnam(c_name.as_ptr()) };
    if pw.is_null() {
        return Err(io::Error::new(
            io::ErrorKind::NotFound,
            format!("unknown user {:?}", owner),
        ));
    }
    Ok(unsafe { (*pw).pw_uid })
}

fn resolve_gid(group: &str) -> io::Result<libc::gid_t> {
    if let Ok(gid) = group.parse() {
        return Ok(gid);
    }
    let c_name = CString::new(group)
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "group contains NUL"))?;
    let gr = unsafe { libc::getgrnam(c_name.as_ptr()) };
    if gr.is_null() {
        return Err(io::Error::new(
            io::ErrorKind::NotFound,
            format!("unknown group {:?}", group),
        ));
    }
    Ok(unsafe { (*gr).gr_gid })
}

/// Apply any of owner, group, and mode to `path`. `None` fields are left
/// untouched; passing all `None` is a no-op.
pub fn apply(
    path: &Path,
    owner: Option<&str>,
    group: Option<&str>,
    mode: Option<&str>,
) -> KeyResult<()> {
    if let Some(mode) = mode {
        let bits = u32::from_str_radix(mode, 8).map_err(|_| {
            KeyError::Validation(format!("mode must be an octal string, got {:?}", mode))
        })?;
        fs::set_permissions(path, fs::Permissions::from_mode(bits))
            .map_err(|e| fs_err(path, e))?;
    }

    if owner.is_none() && group.is_none() {
        return Ok(());
    }

    // -1 leaves the corresponding id unchanged.
    let uid = match owner {
        Some(owner) => resolve_uid(owner).map_err(|e| fs_err(path, e))?,
        None => !0,
    };
    let gid = match group {
        Some(group) => resolve_gid(group).map_err(|e| fs_err(path, e))?,
        None => !0,
    };

    let c_path = CString::new(path.as_os_str().as_bytes())
        .map_err(|_| KeyError::Validation("path contains NUL".to_string()))?;
    let rc = unsafe { libc::chown(c_path.as_ptr(), uid, gid) };
    if rc != 0 {
        return Err(fs_err(path, io::Error::last_os_error()));
    }

    Ok(())
}
