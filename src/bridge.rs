//! Thread-safe bridge between UI and the sequencer engine.
//!
//! This module provides the communication layer that allows the UI thread
//! to safely interact with the real-time engine.
//!
//! # Architecture
//!
//! - **UI thread** owns [`SessionHandle`] with the local [`Session`] mirror
//! - **Audio thread** owns [`EngineHandle`] with the [`Engine`]
//! - Edits travel as [`Command`]s over a bounded channel; trigger feedback
//!   comes back over a second bounded channel; scalar state is read back
//!   through atomics
//!
//! Neither side ever blocks on the other. A full command queue is reported
//! to the caller and the mirror is left untouched, so mirror and engine
//! cannot drift apart. Restore payloads travel back to the UI thread after
//! use and are freed there.
//!
//! # Usage
//!
//! ```ignore
//! let (mut ui, mut audio) = create_bridge(Session::new(), &EngineConfig::default());
//!
//! // UI thread: edit
//! ui.add_dot(Dot::new(45.0, 3, Color::ORANGE))?;
//!
//! // Audio thread: once per block
//! audio.process_block(&transport, frames, &mut midi_out);
//! ```

use std::sync::{
    Arc,
    atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering},
};

use crossbeam_channel::{Receiver, Sender, TrySendError};
use thiserror::Error;

use crate::config::EngineConfig;
use crate::dot::{Dot, MAX_DOTS};
use crate::engine::Engine;
use crate::event::MidiEvent;
use crate::feedback::{FeedbackWindow, TriggeredDotInfo};
use crate::parameter::next_speed_preset;
use crate::scale::ScaleType;
use crate::scratch::{GrabOutcome, Point, ScratchController, grab_outcome};
use crate::state::{Command, EngineReadback, ParamId, PersistedState, Session};
use crate::transport::Transport;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum BridgeError {
    #[error("engine command queue is full")]
    QueueFull,

    #[error("engine has shut down")]
    Disconnected,

    #[error("platter already holds the maximum number of dots")]
    DotLimit,
}

impl<T> From<TrySendError<T>> for BridgeError {
    fn from(err: TrySendError<T>) -> Self {
        match err {
            TrySendError::Full(_) => BridgeError::QueueFull,
            TrySendError::Disconnected(_) => BridgeError::Disconnected,
        }
    }
}

/// Handle for the UI thread to communicate with the engine.
///
/// All methods are safe to call from the main thread and never block.
pub struct SessionHandle {
    /// The current session state (owned by UI thread).
    session: Session,

    /// Channel to send commands to the engine.
    command_tx: Sender<Command>,

    /// Trigger feedback from the engine.
    feedback_rx: Receiver<TriggeredDotInfo>,

    /// Applied restore payloads, dropped here instead of on the audio thread.
    retired_rx: Receiver<Box<PersistedState>>,

    /// Recent triggers, pruned to the feedback window.
    recent: FeedbackWindow,

    scratch: ScratchController,

    /// Shared readback state (updated by engine, read by UI).
    readback: Arc<SharedReadback>,
}

/// Handle for the audio thread containing the engine and communication channels.
pub struct EngineHandle {
    /// The sequencer engine (owned by audio thread).
    engine: Engine,

    /// Channel to receive commands from UI.
    command_rx: Receiver<Command>,

    /// Trigger feedback to the UI.
    feedback_tx: Sender<TriggeredDotInfo>,

    retired_tx: Sender<Box<PersistedState>>,

    /// Shared readback state (written by engine).
    readback: Arc<SharedReadback>,
}

/// Lock-free shared state for engine -> UI readback.
///
/// Floats are stored as their bit patterns (no AtomicF64 in std).
struct SharedReadback {
    rotation_bits: AtomicU64,
    speed_multiplier_bits: AtomicU64,
    scratch_velocity_bits: AtomicU64,
    sample_rate_bits: AtomicU64,
    sample_position: AtomicU64,
    dropped_note_offs: AtomicU64,
    beat_count: AtomicU32,
    motor_running: AtomicBool,
    being_scratched: AtomicBool,
}

impl SharedReadback {
    fn new(engine: &Engine) -> Self {
        let rotation = engine.rotation();
        Self {
            rotation_bits: AtomicU64::new(rotation.rotation.to_bits()),
            speed_multiplier_bits: AtomicU64::new(rotation.speed_multiplier.to_bits()),
            scratch_velocity_bits: AtomicU64::new(rotation.scratch_velocity.to_bits()),
            sample_rate_bits: AtomicU64::new(0.0_f64.to_bits()),
            sample_position: AtomicU64::new(engine.sample_position()),
            dropped_note_offs: AtomicU64::new(engine.dropped_note_offs()),
            beat_count: AtomicU32::new(engine.beat_count()),
            motor_running: AtomicBool::new(rotation.motor_running),
            being_scratched: AtomicBool::new(rotation.being_scratched),
        }
    }

    fn load(&self) -> EngineReadback {
        let f = |bits: &AtomicU64| f64::from_bits(bits.load(Ordering::Relaxed));
        EngineReadback {
            rotation: f(&self.rotation_bits),
            speed_multiplier: f(&self.speed_multiplier_bits),
            scratch_velocity: f(&self.scratch_velocity_bits),
            sample_position: self.sample_position.load(Ordering::Relaxed),
            sample_rate: f(&self.sample_rate_bits),
            motor_running: self.motor_running.load(Ordering::Relaxed),
            being_scratched: self.being_scratched.load(Ordering::Relaxed),
            beat_count: self.beat_count.load(Ordering::Relaxed),
            dropped_note_offs: self.dropped_note_offs.load(Ordering::Relaxed),
        }
    }
}

/// Create a linked pair of handles for UI and engine communication.
///
/// The engine starts from `session`, which becomes the UI's mirror.
pub fn create_bridge(session: Session, config: &EngineConfig) -> (SessionHandle, EngineHandle) {
    let (command_tx, command_rx) = crossbeam_channel::bounded(config.command_capacity.max(1));
    let (feedback_tx, feedback_rx) = crossbeam_channel::bounded(config.feedback_capacity.max(1));
    // Each retired payload was a queued command first.
    let (retired_tx, retired_rx) = crossbeam_channel::bounded(config.command_capacity.max(1) + 1);

    let engine = Engine::from_session(&session, config);
    let readback = Arc::new(SharedReadback::new(&engine));

    log::info!(
        "bridge created: {} dots, {} command slots",
        session.dots.len(),
        config.command_capacity
    );

    let session_handle = SessionHandle {
        session,
        command_tx,
        feedback_rx,
        retired_rx,
        recent: FeedbackWindow::new(),
        scratch: ScratchController::default(),
        readback: Arc::clone(&readback),
    };

    let engine_handle = EngineHandle {
        engine,
        command_rx,
        feedback_tx,
        retired_tx,
        readback,
    };

    (session_handle, engine_handle)
}

// ═══════════════════════════════════════════════════════════════════
// SessionHandle - UI Thread API
// ═══════════════════════════════════════════════════════════════════

impl SessionHandle {
    /// Get a reference to the current session.
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Send a command to the engine.
    ///
    /// The local mirror is updated only once the engine has the command.
    pub fn send(&mut self, cmd: Command) -> Result<(), BridgeError> {
        self.free_retired();

        let result = self.command_tx.try_send(cmd.clone());
        match result {
            Ok(()) => {
                self.session.apply(&cmd);
                Ok(())
            }
            Err(err) => {
                let err = BridgeError::from(err);
                log::warn!("dropping {cmd:?}: {err}");
                Err(err)
            }
        }
    }

    fn free_retired(&mut self) {
        self.retired_rx.try_iter().for_each(drop);
    }

    /// Get the current engine readback state.
    pub fn readback(&self) -> EngineReadback {
        self.readback.load()
    }

    /// Crossings from the last second, oldest first.
    ///
    /// Drains pending feedback from the engine and prunes against the
    /// engine clock.
    pub fn recent_triggers(&mut self) -> impl Iterator<Item = &TriggeredDotInfo> {
        for info in self.feedback_rx.try_iter() {
            self.recent.push(info);
        }
        self.recent.prune(self.readback().now_ms());
        self.recent.iter()
    }

    // ───────────────────────────────────────────────────────────────
    // Dots
    // ───────────────────────────────────────────────────────────────

    /// Add a dot. Returns its index.
    pub fn add_dot(&mut self, dot: Dot) -> Result<usize, BridgeError> {
        if self.session.dots.len() >= MAX_DOTS {
            return Err(BridgeError::DotLimit);
        }
        self.send(Command::AddDot { dot })?;
        Ok(self.session.dots.len() - 1)
    }

    pub fn remove_dot(&mut self, index: usize) -> Result<(), BridgeError> {
        self.send(Command::RemoveDot { index })
    }

    pub fn move_dot(&mut self, index: usize, angle: f32, ring: i32) -> Result<(), BridgeError> {
        self.send(Command::MoveDot { index, angle, ring })
    }

    pub fn set_dot_active(&mut self, index: usize, active: bool) -> Result<(), BridgeError> {
        self.send(Command::SetDotActive { index, active })
    }

    pub fn clear_dots(&mut self) -> Result<(), BridgeError> {
        self.send(Command::ClearDots)
    }

    // ───────────────────────────────────────────────────────────────
    // Parameters
    // ───────────────────────────────────────────────────────────────

    pub fn set_param(&mut self, param: ParamId, value: f32) -> Result<(), BridgeError> {
        self.send(Command::SetParam { param, value })
    }

    /// Step to the next speed preset. Returns the new speed.
    pub fn cycle_speed(&mut self) -> Result<f32, BridgeError> {
        let speed = next_speed_preset(self.session.params.speed());
        self.set_param(ParamId::Speed, speed)?;
        Ok(speed)
    }

    pub fn set_scale(&mut self, scale: ScaleType) -> Result<(), BridgeError> {
        self.send(Command::SetScale { scale })
    }

    pub fn set_root_note(&mut self, root: i32) -> Result<(), BridgeError> {
        self.send(Command::SetRootNote { root })
    }

    pub fn set_octave_shift(&mut self, shift: i32) -> Result<(), BridgeError> {
        self.send(Command::SetOctaveShift { shift })
    }

    pub fn set_reverse(&mut self, reverse: bool) -> Result<(), BridgeError> {
        self.send(Command::SetReverse { reverse })
    }

    pub fn set_motor_running(&mut self, running: bool) -> Result<(), BridgeError> {
        self.send(Command::SetMotorRunning { running })
    }

    /// Start playback.
    pub fn play(&mut self) -> Result<(), BridgeError> {
        self.send(Command::SetPlaying { playing: true })
    }

    /// Stop playback.
    pub fn stop(&mut self) -> Result<(), BridgeError> {
        self.send(Command::SetPlaying { playing: false })
    }

    /// Audition a ring's note.
    pub fn preview_note(&mut self, ring: i32) -> Result<(), BridgeError> {
        self.send(Command::PreviewNote { ring })
    }

    // ───────────────────────────────────────────────────────────────
    // Platter
    // ───────────────────────────────────────────────────────────────

    /// Press on the platter edge at `position`, `center` being the
    /// platter centre. `time` is in seconds.
    pub fn grab_platter(
        &mut self,
        position: Point,
        center: Point,
        time: f64,
    ) -> Result<GrabOutcome, BridgeError> {
        let readback = self.readback();
        let outcome = grab_outcome(
            self.session.params.motor_running,
            readback.speed_multiplier,
            readback.scratch_velocity,
        );

        match outcome {
            GrabOutcome::Brake => self.send(Command::Brake)?,
            GrabOutcome::Scratch => {
                self.send(Command::BeginScratch)?;
                self.scratch.set_center(center);
                self.scratch.begin(position, time);
            }
            GrabOutcome::Ignored => {}
        }
        Ok(outcome)
    }

    /// Drag during a scratch. Does nothing when no scratch is active.
    pub fn drag_platter(&mut self, position: Point, time: f64) -> Result<(), BridgeError> {
        match self.scratch.drag(position, time) {
            Some(motion) => self.send(Command::Scratch {
                delta_degrees: motion.delta_degrees,
                velocity: motion.velocity,
            }),
            None => Ok(()),
        }
    }

    /// Let go of the platter; it keeps its momentum.
    pub fn release_platter(&mut self) -> Result<(), BridgeError> {
        if self.scratch.release() {
            self.send(Command::ReleaseScratch)
        } else {
            Ok(())
        }
    }

    // ───────────────────────────────────────────────────────────────
    // Save / load
    // ───────────────────────────────────────────────────────────────

    pub fn save_state(&self) -> Vec<u8> {
        self.session.to_persisted().to_bytes()
    }

    /// Restore a saved blob. Missing or unreadable fields take defaults.
    pub fn load_state(&mut self, bytes: &[u8]) -> Result<(), BridgeError> {
        let state = PersistedState::from_bytes(bytes);
        log::info!("loading state with {} dots", state.dots.len());
        self.send(Command::Restore {
            state: Box::new(state),
        })
    }
}

// ═══════════════════════════════════════════════════════════════════
// EngineHandle - Audio Thread API
// ═══════════════════════════════════════════════════════════════════

impl EngineHandle {
    /// Apply all pending commands from the UI.
    ///
    /// Called at the start of each block.
    pub fn process_commands(&mut self) {
        while let Ok(cmd) = self.command_rx.try_recv() {
            if let Some(spent) = self.engine.apply_command(cmd) {
                // Only if the UI has stopped collecting does the payload
                // get freed here.
                let _ = self.retired_tx.try_send(spent);
            }
        }
    }

    /// Drain commands, run one block and publish readback.
    ///
    /// Call this once per audio block from the audio callback.
    pub fn process_block(&mut self, transport: &Transport, frames: usize, out: &mut Vec<MidiEvent>) {
        self.process_commands();
        self.engine
            .process_block(transport, frames, out, &mut self.feedback_tx);
        self.sync_readback(transport);
    }

    /// Get a reference to the engine.
    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    /// Publish UI-visible state. Called at the end of each block.
    pub fn sync_readback(&self, transport: &Transport) {
        let rotation = self.engine.rotation();
        let readback = &self.readback;

        readback
            .rotation_bits
            .store(rotation.rotation.to_bits(), Ordering::Relaxed);
        readback
            .speed_multiplier_bits
            .store(rotation.speed_multiplier.to_bits(), Ordering::Relaxed);
        readback
            .scratch_velocity_bits
            .store(rotation.scratch_velocity.to_bits(), Ordering::Relaxed);
        readback
            .sample_rate_bits
            .store(transport.sample_rate.to_bits(), Ordering::Relaxed);
        readback
            .sample_position
            .store(self.engine.sample_position(), Ordering::Relaxed);
        readback
            .dropped_note_offs
            .store(self.engine.dropped_note_offs(), Ordering::Relaxed);
        readback
            .beat_count
            .store(self.engine.beat_count(), Ordering::Relaxed);
        readback
            .motor_running
            .store(rotation.motor_running, Ordering::Relaxed);
        readback
            .being_scratched
            .store(rotation.being_scratched, Ordering::Relaxed);
    }
}
