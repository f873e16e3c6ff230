use loadmon_common::types::Host;
use std::process::Command;

/// Errors from the probe step, per host and non-fatal to the batch.
#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
    /// The probe did not return a usable answer (spawn failure, non-zero
    /// exit, or non-UTF-8 output).
    #[error("connection to '{host}' failed: {reason}")]
    Connection { host: String, reason: String },

    /// The probe answered, but the output did not match the expected
    /// status-line pattern (e.g. a host under a different load-reporting
    /// convention).
    #[error("unexpected status output from '{host}': {output:?}")]
    Parse { host: String, output: String },
}

/// Executes a remote status probe against one host.
///
/// Only the input/output contract matters here: given a host, return the
/// raw status line or a [`ProbeError`]. Transport is an implementation
/// detail, which keeps the batch logic testable without a network.
pub trait Probe: Send + Sync {
    fn probe(&self, host: &Host) -> Result<String, ProbeError>;
}

/// Probes a host by running `ssh <user>@<address> uptime`.
///
/// Relies on ambient ssh configuration (keys, known_hosts); no
/// authentication handling of its own.
pub struct SshProbe {
    user: String,
}

impl SshProbe {
    pub fn new(user: impl Into<String>) -> Self {
        Self { user: user.into() }
    }
}

impl Probe for SshProbe {
    fn probe(&self, host: &Host) -> Result<String, ProbeError> {
        let target = format!("{}@{}", self.user, host.address);
        let output = Command::new("ssh")
            .arg("-o")
            .arg("BatchMode=yes")
            .arg(&target)
            .arg("uptime")
            .output()
            .map_err(|e| ProbeError::Connection {
                host: host.alias.clone(),
                reason: e.to_string(),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ProbeError::Connection {
                host: host.alias.clone(),
                reason: format!("ssh exited with {}: {}", output.status, stderr.trim()),
            });
        }

        String::from_utf8(output.stdout)
            .map(|s| s.trim().to_string())
            .map_err(|_| ProbeError::Connection {
                host: host.alias.clone(),
                reason: "non-UTF-8 probe output".to_string(),
            })
    }
}
