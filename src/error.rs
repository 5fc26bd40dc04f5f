//! Error taxonomy for the simulation host.
//!
//! Every variant is fatal for the run: this is a batch numerical
//! program, not a service, and none of these conditions are recovered
//! locally. Each variant carries enough context (which file, which
//! symbol, which size) to diagnose from the console alone.

use std::path::PathBuf;

/// Fatal simulation-host errors.
#[derive(Debug)]
pub enum SimError {
    /// No compute-capable GPU adapter was found.
    DeviceUnavailable,
    /// Device creation failed after an adapter was selected.
    DeviceCreation {
        /// Error text reported by the runtime.
        message: String,
    },
    /// Kernel source file could not be read.
    SourceRead {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying I/O error text.
        message: String,
    },
    /// Kernel source failed to compile.
    Compile {
        /// Diagnostic text surfaced verbatim from the shader compiler.
        message: String,
    },
    /// The requested kernel entry point does not exist in the library.
    EntryPointNotFound {
        /// Entry point that was requested.
        name: String,
    },
    /// Compute pipeline construction failed.
    PipelineBuild {
        /// Error text reported by the runtime.
        message: String,
    },
    /// A requested buffer exceeds what the device can allocate or bind.
    Allocation {
        /// Requested size in bytes.
        requested: u64,
        /// Device maximum in bytes.
        max: u64,
    },
    /// Reading results back from the device failed.
    Readback {
        /// Error text from the buffer-mapping machinery.
        message: String,
    },
}

impl std::fmt::Display for SimError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SimError::DeviceUnavailable => {
                write!(f, "No compute-capable GPU adapter found")
            }
            SimError::DeviceCreation { message } => {
                write!(f, "GPU device creation failed: {}", message)
            }
            SimError::SourceRead { path, message } => {
                write!(f, "Could not read kernel source {}: {}", path.display(), message)
            }
            SimError::Compile { message } => {
                write!(f, "Kernel compilation failed: {}", message)
            }
            SimError::EntryPointNotFound { name } => {
                write!(f, "Kernel entry point '{}' not found", name)
            }
            SimError::PipelineBuild { message } => {
                write!(f, "Compute pipeline build failed: {}", message)
            }
            SimError::Allocation { requested, max } => {
                write!(
                    f,
                    "Buffer allocation of {} bytes exceeds device maximum of {} bytes",
                    requested, max
                )
            }
            SimError::Readback { message } => {
                write!(f, "Device readback failed: {}", message)
            }
        }
    }
}

impl std::error::Error for SimError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_carries_context() {
        let e = SimError::Allocation {
            requested: 4096,
            max: 1024,
        };
        let msg = e.to_string();
        assert!(msg.contains("4096"));
        assert!(msg.contains("1024"));

        let e = SimError::EntryPointNotFound {
            name: "plasma_kernel".into(),
        };
        assert!(e.to_string().contains("plasma_kernel"));

        let e = SimError::SourceRead {
            path: PathBuf::from("shaders/plasma.wgsl"),
            message: "No such file".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("plasma.wgsl"));
        assert!(msg.contains("No such file"));
    }
}
