//! Recording session orchestration.
//!
//! Wraps the pure state machine from `stride-core` in a single-writer driver
//! task with typed input and output channels, and adds:
//! - Lifecycle scheduling: background and foreground handling
//! - Completion: saving, continuing or discarding a finished recording
//! - Configuration: user preferences from file and environment

pub mod clock;
pub mod completion;
pub mod config;
mod error;
pub mod scheduler;
pub mod session;

pub use clock::{Clock, ManualClock, SystemClock};
pub use completion::{CompletionOutcome, SessionCompletionHandler, SnapshotSink};
pub use config::SessionConfig;
pub use error::{CompletionError, ConfigError, SessionError};
pub use scheduler::{AppLifecycle, Scheduler};
pub use session::{
    RecordingSession, SessionHandle, SessionInput, SessionOutputs, WeakSessionHandle,
};
