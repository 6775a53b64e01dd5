// src/lib.rs
//
// Library entry point.

pub mod config;
pub mod crossing;
pub mod dot;
pub mod event;
pub mod feedback;
pub mod rotation;
pub mod scale;
pub mod scratch;
pub mod state;
pub mod transport;
pub mod trigger;

mod bridge;
mod engine;
mod parameter;
mod scheduler;

// Re-export key types for Rust consumers
pub use bridge::{BridgeError, EngineHandle, SessionHandle, create_bridge};
pub use config::EngineConfig;
pub use dot::{Color, Dot, DotSet, MAX_DOTS};
pub use engine::{Engine, PREVIEW_GATE_MS, PREVIEW_VELOCITY};
pub use event::{MIDI_CHANNEL, MidiEvent, MidiMessage};
pub use feedback::{FeedbackSink, FeedbackWindow, TriggeredDotInfo};
pub use parameter::{Params, SPEED_PRESETS, next_speed_preset};
pub use scale::{ScaleEngine, ScaleType};
pub use scheduler::{ActiveNote, NoteScheduler};
pub use scratch::GrabOutcome;
pub use state::{Command, EngineReadback, ParamId, PersistedState, Session, StateError};
pub use transport::Transport;
