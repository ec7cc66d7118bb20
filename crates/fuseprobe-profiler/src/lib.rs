//! Profiling for fuseprobe test cases.
//!
//! A [`Profiler`] measures one model artifact. The [`ProfilingCoordinator`]
//! walks every test case and attaches latencies to the models that do not
//! have one yet, strictly one call at a time. Backends are created by name
//! through the [`BackendRegistry`].

pub mod command;
pub mod coordinator;
pub mod mock;
pub mod profiler;
pub mod registry;
pub mod simulated;

pub use command::{parse_latency_output, CommandProfiler, CommandRunner};
pub use coordinator::{ProfileProgress, ProfileReport, ProfilingCoordinator, RuleProfileStatus};
pub use mock::ScriptedProfiler;
pub use profiler::{ProfileSample, Profiler};
pub use registry::{BackendFactory, BackendRegistry};
pub use simulated::SimulatedProfiler;
