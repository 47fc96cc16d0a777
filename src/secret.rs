//! Secret generation through the external key tool.

use crate::command::AUTHTOOL;
use crate::error::{KeyError, KeyResult};
use crate::invoke::{Invocation, Invoker};

/// Ask ceph-authtool for a fresh random key and return it with trailing
/// whitespace stripped. The secret is opaque; no format validation is
/// done here. Generation always runs on the host, never containerized.
pub fn generate(invoker: &dyn Invoker) -> KeyResult<String> {
    let invocation = Invocation::new(AUTHTOOL, vec!["--gen-print-key".to_string()]);
    let output = invoker.run(&invocation)?;

    if output.rc != 0 {
        return Err(KeyError::ExternalTool(format!(
            "{} --gen-print-key exited with rc {}: {}",
            AUTHTOOL,
            output.rc,
            output.stderr.trim()
        )));
    }

    Ok(output.stdout.trim_end().to_string())
}
