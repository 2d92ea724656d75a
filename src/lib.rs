// Input event engine for the FCut front-end
pub mod bridge;
pub mod config;
pub mod events;
pub mod logging;
pub mod platform;
pub mod service;
pub mod testing;

pub use service::{EventService, ListenerHandle, PointerSnapshot};

/// Version of the input engine
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Re-export of common types for convenience
pub mod prelude {
    pub use crate::config::EngineConfig;
    pub use crate::events::{
        callback, Callback, DragCallbacks, DragInfo, DragOptions, DragState, ElementId, EventKind,
        InputEvent, ListenerConfig, ListenerId, ListenerOptions, Modifier, ModifierState,
        NativeEvent, Target, WindowEvent,
    };
    pub use crate::platform::InputHost;
    pub use crate::service::{EventService, ListenerHandle};
}

/// Errors surfaced by the crate's fallible entry points
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Config error: {0}")]
    Config(String),

    #[error("Bridge error: {0}")]
    Bridge(String),

    #[error("Logging error: {0}")]
    Logging(String),

    #[error("Registration error: {0}")]
    Registration(String),
}
