//! Error types for probes and the probe registry

use std::fmt;

/// Result type alias for probe operations
pub type ProbeResult<T> = Result<T, ProbeError>;

/// Result type alias for registry operations
pub type RegistryResult<T> = Result<T, RegistryError>;

/// Errors produced by a single probe
#[derive(Debug)]
pub enum ProbeError {
    /// The configuration is incomplete or out of bounds. Raised before any I/O.
    Validation(String),

    /// Per-execution state could not be prepared (bad URL, client setup, ...)
    Initialization(anyhow::Error),

    /// One check attempt failed
    Execution(anyhow::Error),
}

impl ProbeError {
    pub fn validation(msg: impl Into<String>) -> Self {
        ProbeError::Validation(msg.into())
    }
}

impl fmt::Display for ProbeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProbeError::Validation(msg) => write!(f, "{msg}"),
            ProbeError::Initialization(err) => write!(f, "{err:#}"),
            ProbeError::Execution(err) => write!(f, "{err:#}"),
        }
    }
}

impl std::error::Error for ProbeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ProbeError::Validation(_) => None,
            ProbeError::Initialization(err) | ProbeError::Execution(err) => Some(&**err),
        }
    }
}

/// Errors returned by the registry to its callers
#[derive(Debug)]
pub enum RegistryError {
    /// The probe itself rejected the request (validation, initialization or a one-off execution)
    Probe { name: String, error: ProbeError },

    /// A periodic probe with this name is already registered
    Duplicate(String),

    /// No periodic probe with this name is registered
    NotFound(String),
}

impl RegistryError {
    pub fn probe(name: impl Into<String>, error: ProbeError) -> Self {
        RegistryError::Probe {
            name: name.into(),
            error,
        }
    }

    /// True when the failure was caused by the caller's configuration
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            RegistryError::Probe {
                error: ProbeError::Validation(_),
                ..
            }
        )
    }
}

impl fmt::Display for RegistryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegistryError::Probe { name, error } => match error {
                ProbeError::Validation(_) => {
                    write!(f, "invalid configuration for probe {name}: {error}")
                }
                ProbeError::Initialization(_) => {
                    write!(f, "failed to initialize probe {name}: {error}")
                }
                ProbeError::Execution(_) => write!(f, "execution of probe {name} failed: {error}"),
            },
            RegistryError::Duplicate(name) => write!(f, "probe {name} already exists"),
            RegistryError::NotFound(name) => write!(f, "probe {name} not found"),
        }
    }
}

impl std::error::Error for RegistryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RegistryError::Probe { error, .. } => Some(error),
            _ => None,
        }
    }
}
