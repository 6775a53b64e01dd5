// src/engine.rs

use crate::config::EngineConfig;
use crate::crossing::{Crossing, CrossingDetector, Segments};
use crate::dot::{DotSet, MAX_DOTS};
use crate::event::{MIDI_CHANNEL, MidiEvent};
use crate::feedback::{FeedbackSink, TriggeredDotInfo};
use crate::parameter::Params;
use crate::rotation::{ClockInput, RotationClock, RotationState};
use crate::scale::ScaleEngine;
use crate::scheduler::NoteScheduler;
use crate::state::{Command, PersistedState, Session};
use crate::transport::Transport;
use crate::trigger::{BlockTiming, TriggerOutcome, TriggerPipeline};

/// Velocity of auditioned notes.
pub const PREVIEW_VELOCITY: u8 = 100;

/// Gate of auditioned notes (ms).
pub const PREVIEW_GATE_MS: f64 = 100.0;

/// Preview requests held between blocks; extras are dropped.
const MAX_PREVIEWS: usize = 32;

/// Real-time sequencer engine.
///
/// This struct runs exclusively on the audio thread.
/// All edits arrive as [`Command`]s applied between blocks.
/// Every buffer is sized up front: dot edits stop at `MAX_DOTS`, so
/// neither `apply_command` nor `process_block` allocates.
pub struct Engine {
    params: Params,
    scale: ScaleEngine,
    dots: DotSet,

    clock: RotationClock,
    detector: CrossingDetector,
    triggers: TriggerPipeline,
    notes: NoteScheduler,

    /// Samples processed since start
    sample_pos: u64,

    /// Rings queued for audition at the next block start
    previews: Vec<i32>,

    /// Per-segment crossing scratch, at most one entry per dot
    crossings: Vec<Crossing>,

    max_block_size: usize,
}

impl Engine {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            params: Params::default(),
            scale: ScaleEngine::default(),
            dots: DotSet::with_capacity(MAX_DOTS),
            clock: RotationClock::default(),
            detector: CrossingDetector::default(),
            triggers: TriggerPipeline::new(config.seed),
            notes: NoteScheduler::new(config.max_pending_notes),
            sample_pos: 0,
            previews: Vec::with_capacity(MAX_PREVIEWS),
            crossings: Vec::with_capacity(MAX_DOTS),
            max_block_size: config.max_block_size.max(1),
        }
    }

    /// Engine initialised from a session's dots, parameters and scale.
    pub fn from_session(session: &Session, config: &EngineConfig) -> Self {
        let mut engine = Self::new(config);
        engine.params = session.params.clone();
        engine.scale = session.scale.clone();
        engine.dots.replace_all(&session.dots);
        // A platter whose motor is off starts at rest.
        let motor_running = session.params.motor_running;
        engine.clock = RotationClock::new(RotationState {
            motor_running,
            speed_multiplier: if motor_running { 1.0 } else { 0.0 },
            ..RotationState::default()
        });
        engine
    }

    // -------------------------------
    // MARK: Commands
    // -------------------------------

    /// Apply one UI edit. Called between blocks.
    ///
    /// A restore hands its payload back once applied so the caller can free
    /// it away from the audio thread.
    pub fn apply_command(&mut self, cmd: Command) -> Option<Box<PersistedState>> {
        match cmd {
            Command::AddDot { dot } => {
                self.dots.add(dot);
            }
            Command::RemoveDot { index } => {
                self.dots.remove(index);
            }
            Command::MoveDot { index, angle, ring } => {
                self.dots.move_dot(index, angle, ring);
            }
            Command::SetDotActive { index, active } => {
                self.dots.set_active(index, active);
            }
            Command::ClearDots => self.dots.clear(),

            Command::SetParam { param, value } => self.params.set(param, value),
            Command::SetScale { scale } => self.scale.set_scale(scale),
            Command::SetRootNote { root } => self.scale.set_root(root),
            Command::SetOctaveShift { shift } => self.scale.set_octave_shift(shift),
            Command::SetReverse { reverse } => self.params.reverse = reverse,
            Command::SetMotorRunning { running } => {
                self.params.motor_running = running;
                self.clock.set_motor_running(running);
            }
            Command::SetPlaying { playing } => self.params.playing = playing,

            Command::Brake => self.clock.brake(),
            Command::BeginScratch => self.clock.begin_scratch(),
            Command::Scratch {
                delta_degrees,
                velocity,
            } => self.clock.scratch(delta_degrees, velocity),
            Command::ReleaseScratch => self.clock.release_scratch(),

            Command::PreviewNote { ring } => {
                if self.previews.len() < MAX_PREVIEWS {
                    self.previews.push(ring);
                }
            }

            Command::Restore { state } => {
                state.apply_settings(&mut self.params, &mut self.scale);
                self.dots.replace_all(&state.dots);
                return Some(state);
            }
        }
        None
    }

    // -------------------------------
    // MARK: Processing
    // -------------------------------

    /// Run one block.
    ///
    /// `out` is cleared and filled with this block's MIDI, sorted by
    /// offset with note-offs ahead of note-ons at the same offset.
    /// Blocks longer than the configured maximum are processed in chunks.
    pub fn process_block<F: FeedbackSink>(
        &mut self,
        transport: &Transport,
        frames: usize,
        out: &mut Vec<MidiEvent>,
        feedback: &mut F,
    ) {
        out.clear();

        let mut done = 0;
        while done < frames {
            let chunk = (frames - done).min(self.max_block_size);
            let first = out.len();
            self.process_chunk(transport, chunk, out, feedback);
            for event in &mut out[first..] {
                event.offset += done;
            }
            done += chunk;
        }

        out.sort_unstable_by_key(MidiEvent::sort_key);
    }

    fn process_chunk<F: FeedbackSink>(
        &mut self,
        transport: &Transport,
        frames: usize,
        out: &mut Vec<MidiEvent>,
        feedback: &mut F,
    ) {
        let block_start = self.sample_pos;

        // Note-offs due in this block, from earlier blocks.
        self.notes.flush_due(block_start, frames, out);

        // Auditioned notes fire at the block start.
        let preview_gate = transport.ms_to_samples(PREVIEW_GATE_MS);
        for ring in self.previews.drain(..) {
            let note = self.scale.ring_to_note(ring);
            self.notes.schedule(
                block_start,
                frames,
                0,
                MIDI_CHANNEL,
                note,
                PREVIEW_VELOCITY,
                preview_gate,
                out,
            );
        }

        let bpm = transport.resolve_bpm(self.params.tempo() as f64);
        let step = self.clock.advance(&ClockInput {
            frames,
            sample_rate: transport.sample_rate,
            bpm,
            speed: self.params.speed() as f64,
            reverse: self.params.reverse,
            should_play: transport.resolve_playing(self.params.playing),
        });

        let timing = BlockTiming {
            frames,
            sixteenth_samples: transport.sixteenth_samples(bpm),
        };
        let gate_time_ms = self.params.gate_time_ms();
        let gate_samples = transport.ms_to_samples(gate_time_ms as f64);

        let segments = Segments::of(&step);
        for segment in segments.iter() {
            if segment.starts_sweep {
                self.dots.reset_sweep();
            }

            self.crossings.clear();
            self.detector
                .detect(&segment, step.delta, &self.dots, frames, &mut self.crossings);

            for crossing in &self.crossings {
                let Some(dot) = self.dots.get(crossing.dot_index) else {
                    continue;
                };
                let note = self.scale.ring_to_note(dot.ring);

                // Fired or skipped, the dot is done for this sweep.
                self.dots.mark_fired(crossing.dot_index);

                match self.triggers.evaluate(crossing, note, &self.params, &timing) {
                    TriggerOutcome::Fire(trigger) => {
                        self.notes.schedule(
                            block_start,
                            frames,
                            trigger.offset,
                            MIDI_CHANNEL,
                            trigger.note,
                            trigger.velocity,
                            gate_samples,
                            out,
                        );
                        feedback.push(TriggeredDotInfo {
                            dot_index: crossing.dot_index,
                            timestamp_ms: transport
                                .samples_to_ms(block_start + trigger.offset as u64),
                            velocity: trigger.velocity,
                            gate_time_ms,
                            was_triggered: true,
                            beat_count: trigger.beat_count,
                        });
                    }
                    TriggerOutcome::Skip { beat_count } => {
                        feedback.push(TriggeredDotInfo {
                            dot_index: crossing.dot_index,
                            timestamp_ms: transport
                                .samples_to_ms(block_start + crossing.offset as u64),
                            velocity: 0,
                            gate_time_ms: 0.0,
                            was_triggered: false,
                            beat_count,
                        });
                    }
                }
            }
        }

        self.sample_pos += frames as u64;
    }

    // -------------------------------
    // MARK: State access
    // -------------------------------

    #[inline]
    pub fn params(&self) -> &Params {
        &self.params
    }

    #[inline]
    pub fn scale(&self) -> &ScaleEngine {
        &self.scale
    }

    #[inline]
    pub fn dots(&self) -> &DotSet {
        &self.dots
    }

    #[inline]
    pub fn rotation(&self) -> &RotationState {
        self.clock.state()
    }

    #[inline]
    pub fn sample_position(&self) -> u64 {
        self.sample_pos
    }

    #[inline]
    pub fn beat_count(&self) -> u32 {
        self.triggers.beat_count()
    }

    #[inline]
    pub fn pending_notes(&self) -> usize {
        self.notes.pending().len()
    }

    #[inline]
    pub fn dropped_note_offs(&self) -> u64 {
        self.notes.dropped_note_offs()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dot::{Color, Dot};
    use crate::event::MidiMessage;
    use crate::state::ParamId;

    const SR: f64 = 48_000.0;

    fn playing() -> Transport {
        Transport::with_host(SR, 120.0, true)
    }

    fn engine_with(dots: &[(f32, i32)]) -> Engine {
        engine_with_config(dots, EngineConfig::default())
    }

    fn engine_with_config(dots: &[(f32, i32)], config: EngineConfig) -> Engine {
        let mut session = Session::empty();
        for &(angle, ring) in dots {
            session.dots.push(Dot::new(angle, ring, Color::ORANGE));
        }
        Engine::from_session(&session, &config.with_seed(1))
    }

    fn note_ons(events: &[MidiEvent]) -> usize {
        events.iter().filter(|e| e.message.is_note_on()).count()
    }

    #[test]
    fn test_stopped_engine_is_silent() {
        let mut engine = engine_with(&[(1.0, 0)]);
        let mut out = Vec::new();
        let mut feedback: Vec<TriggeredDotInfo> = Vec::new();
        for _ in 0..100 {
            engine.process_block(&Transport::standalone(SR), 512, &mut out, &mut feedback);
            assert!(out.is_empty());
        }
        assert!(feedback.is_empty());
        assert_eq!(engine.rotation().rotation, 0.0);
        assert_eq!(engine.sample_position(), 51_200);
    }

    #[test]
    fn test_crossing_emits_note_on_with_feedback() {
        // 90 deg/s at 120 BPM: a 4800-frame block turns 9 deg
        let config = EngineConfig {
            max_block_size: 4_800,
            ..EngineConfig::default()
        };
        let mut engine = engine_with_config(&[(4.5, 0)], config);
        let mut out = Vec::new();
        let mut feedback: Vec<TriggeredDotInfo> = Vec::new();

        engine.process_block(&playing(), 4_800, &mut out, &mut feedback);
        assert_eq!(
            out,
            vec![MidiEvent {
                offset: 2_400,
                message: MidiMessage::NoteOn {
                    channel: 1,
                    note: 48,
                    velocity: 100
                }
            }]
        );

        assert_eq!(feedback.len(), 1);
        assert!(feedback[0].was_triggered);
        assert_eq!(feedback[0].beat_count, 1);
        assert_eq!(feedback[0].timestamp_ms, 50.0);
        assert_eq!(engine.pending_notes(), 1);
    }

    #[test]
    fn test_tolerance_fires_just_before_block_end() {
        // First 512-frame block turns 0.96 deg; 1.2 is inside the 0.5 deg margin.
        let mut engine = engine_with(&[(1.2, 0)]);
        let mut out = Vec::new();
        engine.process_block(&playing(), 512, &mut out, &mut ());
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].offset, 511);
    }

    #[test]
    fn test_dot_fires_once_per_sweep() {
        let mut engine = engine_with(&[(10.0, 0)]);
        let mut out = Vec::new();
        let mut feedback: Vec<TriggeredDotInfo> = Vec::new();

        // 48k samples = 90 deg; wiggle back and forth over the dot by hand
        engine.apply_command(Command::SetPlaying { playing: false });
        engine.apply_command(Command::SetMotorRunning { running: false });
        engine.apply_command(Command::Brake);
        engine.apply_command(Command::BeginScratch);
        let mut fired = 0;
        for delta in [15.0, -10.0, 10.0, -10.0] {
            engine.apply_command(Command::Scratch {
                delta_degrees: delta,
                velocity: 0.0,
            });
            engine.process_block(&Transport::standalone(SR), 512, &mut out, &mut feedback);
            fired += note_ons(&out);
        }
        assert_eq!(fired, 1);
    }

    #[test]
    fn test_reverse_wrap_resets_sweep() {
        let mut engine = engine_with(&[(350.0, 1)]);
        engine.apply_command(Command::SetReverse { reverse: true });
        let mut out = Vec::new();
        let mut feedback: Vec<TriggeredDotInfo> = Vec::new();

        // 8 s of reverse play = two full turns backwards
        let mut fired = 0;
        for _ in 0..750 {
            engine.process_block(&playing(), 512, &mut out, &mut feedback);
            fired += note_ons(&out);
        }
        assert_eq!(fired, 2);
    }

    #[test]
    fn test_zero_probability_reports_without_firing() {
        let mut engine = engine_with(&[(1.0, 0), (2.0, 1)]);
        engine.apply_command(Command::SetParam {
            param: ParamId::Probability,
            value: 0.0,
        });
        let mut out = Vec::new();
        let mut feedback: Vec<TriggeredDotInfo> = Vec::new();
        for _ in 0..10 {
            engine.process_block(&playing(), 512, &mut out, &mut feedback);
            assert!(out.is_empty());
        }
        assert_eq!(feedback.len(), 2);
        assert!(feedback.iter().all(|f| !f.was_triggered && f.velocity == 0));
        assert_eq!(engine.beat_count(), 0);
    }

    #[test]
    fn test_preview_note_at_block_start() {
        let mut engine = engine_with(&[]);
        engine.apply_command(Command::PreviewNote { ring: 1 });
        let mut out = Vec::new();
        engine.process_block(&Transport::standalone(SR), 512, &mut out, &mut ());
        assert_eq!(
            out,
            vec![MidiEvent {
                offset: 0,
                message: MidiMessage::NoteOn {
                    channel: 1,
                    note: 50,
                    velocity: PREVIEW_VELOCITY
                }
            }]
        );

        // 100 ms = 4800 samples -> block 9 at offset 192
        let mut offs = Vec::new();
        for _ in 0..9 {
            engine.process_block(&Transport::standalone(SR), 512, &mut out, &mut ());
            offs.extend(out.iter().copied());
        }
        assert_eq!(
            offs,
            vec![MidiEvent {
                offset: 4_800 - 9 * 512,
                message: MidiMessage::NoteOff { channel: 1, note: 50 }
            }]
        );
    }

    #[test]
    fn test_long_block_is_chunked() {
        let config = EngineConfig {
            max_block_size: 4_800,
            ..EngineConfig::default()
        };
        let mut engine = engine_with_config(&[(4.5, 0), (13.5, 1)], config);
        let mut out = Vec::new();

        // Two 9 deg chunks. The first note's 4800-sample gate ends exactly
        // where the second note starts.
        engine.process_block(&playing(), 9_600, &mut out, &mut ());
        let events: Vec<_> = out.iter().map(|e| (e.offset, e.message.is_note_on())).collect();
        assert_eq!(events, vec![(2_400, true), (7_200, false), (7_200, true)]);
        assert_eq!(engine.sample_position(), 9_600);
    }

    #[test]
    fn test_restore_replaces_dots_and_params() {
        let mut engine = engine_with(&[(1.0, 0)]);
        let state = PersistedState {
            velocity: 64,
            dots: vec![Dot::new(45.0, 3, Color::ORANGE), Dot::new(46.0, 3, Color::ORANGE)],
            ..PersistedState::default()
        };
        let spent = engine.apply_command(Command::Restore {
            state: Box::new(state),
        });
        assert_eq!(engine.dots().len(), 2);
        assert_eq!(engine.params().velocity(), 64);
        // The payload comes back to be freed by the caller.
        assert_eq!(spent.map(|s| s.dots.len()), Some(2));
        assert!(engine.apply_command(Command::ClearDots).is_none());
    }

    #[test]
    fn test_dot_edits_stay_within_capacity() {
        let mut engine = engine_with(&[]);
        let crossings = engine.crossings.as_ptr();

        // Every dot sits in the first block's path.
        for _ in 0..200 {
            engine.apply_command(Command::AddDot {
                dot: Dot::new(0.5, 0, Color::ORANGE),
            });
        }
        assert_eq!(engine.dots().len(), MAX_DOTS);

        let mut out = Vec::new();
        let mut feedback: Vec<TriggeredDotInfo> = Vec::new();
        engine.process_block(&playing(), 512, &mut out, &mut feedback);
        assert_eq!(feedback.len(), MAX_DOTS);
        assert_eq!(engine.crossings.as_ptr(), crossings);
        assert!(engine.crossings.capacity() >= MAX_DOTS);

        let state = PersistedState {
            dots: vec![Dot::new(90.0, 1, Color::ORANGE); 300],
            ..PersistedState::default()
        };
        engine.apply_command(Command::Restore {
            state: Box::new(state),
        });
        assert_eq!(engine.dots().len(), MAX_DOTS);
    }

    #[test]
    fn test_motor_off_session_starts_at_rest() {
        let mut session = Session::empty();
        session.dots.push(Dot::new(20.0, 0, Color::ORANGE));
        session.params.motor_running = false;
        let mut engine = Engine::from_session(&session, &EngineConfig::default());
        assert_eq!(engine.rotation().speed_multiplier, 0.0);

        let mut out = Vec::new();
        for _ in 0..300 {
            engine.process_block(&Transport::standalone(SR), 512, &mut out, &mut ());
            assert!(out.is_empty());
        }
        assert_eq!(engine.rotation().rotation, 0.0);
    }
}
