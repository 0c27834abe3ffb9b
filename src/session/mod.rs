//! Per-player sessions: lifecycle, liveness and the tick tasks that drive them.

pub mod clock;
pub mod handle;
pub mod id;
pub mod runtime;
pub mod sampler;
pub mod table;

pub use clock::{Clock, ManualClock, TokioClock};
pub use handle::{Frame, Session, SessionSummary};
pub use id::SessionId;
pub use runtime::SessionRuntime;
pub use table::SessionError;
