pub mod config;
pub mod error;
pub mod progress;
pub mod scroll;
pub mod wake_lock;

pub use config::{AppConfig, DisplayConfig, KeymapConfig, ScrollConfig};
pub use error::{Error, Result, WakeLockError};
pub use progress::{ProgressSaver, ProgressStore, ReadingProgress};
pub use scroll::{EngineEvent, EnginePhase, EngineSettings, ScrollEngine, ScrollState, Viewport};
pub use wake_lock::{WakeLockController, WakeLockMode};
