// Windlass execution engine
//
// Drives capability bodies as resumable tasks: start runs a body up to
// its first interaction boundary (or completion), resume re-enters it
// with user input, and a per-task progress channel streams notifications
// to a subscriber while the body runs.
//
// Key design decisions:
// - Suspension is cooperative: bodies park on a resume channel inside
//   WorkflowContext::request_input, never preempted
// - The task table owns suspended computations exclusively; entries move
//   out while driving, so teardown happens exactly once
// - Capability roots are declarative TOML manifests; reloading a root
//   replaces only that root's registry entries

pub mod capabilities;
pub mod discovery;
pub mod progress;
pub mod scheduler;

pub use discovery::{discover, reload_root, CapabilityRoot, DiscoveryConfig};
pub use progress::{ProgressChannels, ProgressStream};
pub use scheduler::{Collaborators, TaskScheduler};
