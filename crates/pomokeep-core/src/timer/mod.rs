mod chime;
mod engine;
mod service;
mod session;
mod snapshot;

pub use chime::{BackgroundChime, Chime, ChimeError, SilentChime};
pub use engine::{LifecycleEvent, ParkedSession, TickToken, TimerEngine, TimerView};
pub use service::TimerService;
pub use session::{ceil_secs, floor_secs, SessionType, TimerSession, TimerStatus};
pub use snapshot::PersistedTimerSnapshot;
