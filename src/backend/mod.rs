//! Execution backends.
//!
//! A backend runs one fixture under one execution config and reports what it
//! observed. Backends never return errors for per-fixture failures: launch
//! problems, timeouts and crashes are all encoded in the [`ExecutionResult`].

mod cancel;
mod process;

pub use cancel::{CancelToken, Deadline};
pub use process::{DEFAULT_MAX_OUTPUT_BYTES, ProcessBackend, crash_signature, exception_class};

use crate::error::{HarnessError, Result};
use crate::model::{ExecutionConfig, ExecutionResult, FixtureDescriptor};

/// Capability shared by every backend variant.
pub trait ExecutionBackend: Send + Sync {
    /// Backend kind as named by the `backend` config option.
    fn kind(&self) -> &'static str;

    /// Check that `config` carries everything this backend needs.
    ///
    /// # Errors
    ///
    /// Returns a configuration error naming the missing option.
    fn validate(&self, config: &ExecutionConfig) -> Result<()>;

    /// Run `fixture` under `config`, honouring the fixture timeout and `cancel`.
    fn run(
        &self,
        fixture: &FixtureDescriptor,
        config: &ExecutionConfig,
        cancel: &CancelToken,
    ) -> ExecutionResult;
}

/// Backend kinds built into the harness.
pub const BUILTIN_BACKENDS: &[&str] = &[ProcessBackend::KIND];

/// Resolve and validate the backend for `config`.
///
/// # Errors
///
/// Returns `UnknownBackend` for an unrecognised kind, or a configuration
/// error when the config fails the backend's validation.
pub fn backend_for(
    config: &ExecutionConfig,
    max_output_bytes: usize,
) -> Result<Box<dyn ExecutionBackend>> {
    let backend: Box<dyn ExecutionBackend> = match config.backend() {
        ProcessBackend::KIND => Box::new(ProcessBackend::new(max_output_bytes)),
        other => {
            return Err(HarnessError::UnknownBackend {
                config: config.name.clone(),
                backend: other.to_string(),
            });
        }
    };
    backend.validate(config)?;
    Ok(backend)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn process_is_default_backend() {
        let config = ExecutionConfig::new("baseline").with_option("command", "true");
        let backend = backend_for(&config, 1024).unwrap();
        assert_eq!(backend.kind(), "process");
    }

    #[test]
    fn unknown_backend_rejected() {
        let config = ExecutionConfig::new("jit")
            .with_option("command", "true")
            .with_option("backend", "wasm");
        let err = backend_for(&config, 1024).err().unwrap();
        assert!(matches!(err, HarnessError::UnknownBackend { ref backend, .. } if backend == "wasm"));
    }

    #[test]
    fn process_requires_command() {
        let config = ExecutionConfig::new("baseline");
        let err = backend_for(&config, 1024).err().unwrap();
        assert!(err.to_string().contains("command"));
    }
}
