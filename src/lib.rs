//! Health-monitoring daemon core
//!
//! Probes (DNS, TCP, HTTP) are either executed once on request or admitted
//! to the [`registry::Registry`], which runs each of them on its own
//! [`scheduler`] until removed.

pub mod api;
pub mod config;
pub mod error;
pub mod probes;
pub mod registry;
pub mod scheduler;
pub mod util;

pub use error::{ProbeError, ProbeResult, RegistryError, RegistryResult};
pub use probes::{Probe, ProbeConfig, ProbeSource, ProbeSummary};
pub use registry::Registry;
