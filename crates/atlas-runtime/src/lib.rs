//! atlas-runtime: sessions, scheduling and server fan-out for dbatlas
//!
//! A [`SessionManager`] owns open connections. The [`DependencyScheduler`]
//! runs analyzers on a session in dependency order, delegating whole-server
//! runs to the [`ServerFanoutOrchestrator`].

pub mod error;
pub mod fanout;
pub mod pipeline;
pub mod progress;
pub mod scheduler;
pub mod session;

pub use error::{RuntimeError, RuntimeResult};
pub use fanout::{ServerDiscovery, ServerFanoutOrchestrator};
pub use pipeline::Pipeline;
pub use progress::{ChannelSink, FnSink, NoopSink, ProgressEvent, ProgressSink, StepStatus};
pub use scheduler::{DependencyScheduler, RunRequest};
pub use session::{Session, SessionInfo, SessionManager};
pub use tokio_util::sync::CancellationToken;
