mod events;
mod state;

pub use events::{EventPayload, EventRecord};
pub use state::{
    new_session_id, AgentMessage, CloudProvider, DetailLevel, Diagram, OutputFormat, Preferences,
    SessionState, SessionStatus, StagePatch,
};
