// trackside: prepares recorded F1 sessions for replay
//
// The binary drives these modules from the command line; integration tests
// and benches reach them through this crate root.

pub mod assembler;
pub mod config;
pub mod errors;
pub mod layout;
pub mod pipeline;
pub mod session;
pub mod signal;
pub mod timing;
pub mod writer;

// Re-export commonly used types
pub use assembler::{AssemblyOptions, TelemetryBundle};
pub use errors::TracksideError;
pub use layout::{LayoutDecision, TrackLayout, select_layout};
pub use pipeline::{Pipeline, PreparedSession, SessionInfo};
pub use session::{Session, SessionId, SessionSource, SessionType};
pub use signal::has_activation;
