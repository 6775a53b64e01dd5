// src/state/mod.rs
//
// Declarative state layer for UI interaction.
//
// This module contains structures that represent the *desired* state
// of the engine. The UI edits these freely, and the bridge forwards
// every edit to the real-time engine as a Command.
//
// Key principles:
// - Session state can be saved and restored as a binary blob
// - Mutations happen through Commands
// - The engine never directly accesses these structures

mod command;
mod param_info;
mod persist;
mod session;

pub use command::*;
pub use param_info::*;
pub use persist::*;
pub use session::*;
