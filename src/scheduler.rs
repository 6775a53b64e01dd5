// src/scheduler.rs

use crate::event::{MidiEvent, MidiMessage};

/// A sounding note waiting for its note-off.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActiveNote {
    pub note: u8,
    pub channel: u8,

    /// Absolute sample position of the note-off.
    pub off_sample: u64,
}

/// Emits note-ons and tracks their note-offs across blocks.
///
/// Note-offs are keyed by absolute sample position so a gate can span any
/// number of blocks. A note-off whose position has already passed when its
/// block is processed is dropped, never sent late.
///
/// This struct is real-time safe: the pending set is allocated once and
/// never grows past `capacity`.
#[derive(Debug, Clone)]
pub struct NoteScheduler {
    pending: Vec<ActiveNote>,
    capacity: usize,

    /// Note-offs discarded because their time had passed.
    dropped: u64,
}

impl NoteScheduler {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            pending: Vec::with_capacity(capacity),
            capacity,
            dropped: 0,
        }
    }

    #[inline]
    pub fn pending(&self) -> &[ActiveNote] {
        &self.pending
    }

    #[inline]
    pub fn dropped_note_offs(&self) -> u64 {
        self.dropped
    }

    /// Emit every pending note-off that falls inside
    /// `[block_start, block_start + frames)`.
    ///
    /// Later note-offs are kept; earlier ones are discarded.
    pub fn flush_due(&mut self, block_start: u64, frames: usize, out: &mut Vec<MidiEvent>) {
        let block_end = block_start + frames as u64;
        let mut dropped = 0;

        self.pending.retain(|active| {
            if active.off_sample >= block_end {
                return true;
            }
            if active.off_sample >= block_start {
                out.push(MidiEvent {
                    offset: (active.off_sample - block_start) as usize,
                    message: MidiMessage::NoteOff {
                        channel: active.channel,
                        note: active.note,
                    },
                });
            } else {
                dropped += 1;
            }
            false
        });

        self.dropped += dropped;
    }

    /// Emit a note-on at `offset` and schedule its note-off `gate_samples`
    /// later.
    ///
    /// A note-off landing inside the current block is emitted right away.
    /// When the pending set is full, the note-off due soonest is released
    /// early at `offset` to make room.
    #[allow(clippy::too_many_arguments)]
    pub fn schedule(
        &mut self,
        block_start: u64,
        frames: usize,
        offset: usize,
        channel: u8,
        note: u8,
        velocity: u8,
        gate_samples: u64,
        out: &mut Vec<MidiEvent>,
    ) {
        let block_end = block_start + frames as u64;
        let on_sample = block_start + offset as u64;
        // A zero-length gate would sort its note-off ahead of the note-on.
        let off_sample = on_sample + gate_samples.max(1);

        out.push(MidiEvent {
            offset,
            message: MidiMessage::NoteOn {
                channel,
                note,
                velocity,
            },
        });

        if off_sample < block_end {
            out.push(MidiEvent {
                offset: (off_sample - block_start) as usize,
                message: MidiMessage::NoteOff { channel, note },
            });
            return;
        }

        if self.pending.len() >= self.capacity {
            self.release_soonest(offset, out);
        }

        self.pending.push(ActiveNote {
            note,
            channel,
            off_sample,
        });
    }

    fn release_soonest(&mut self, offset: usize, out: &mut Vec<MidiEvent>) {
        let soonest = self
            .pending
            .iter()
            .enumerate()
            .min_by_key(|(_, active)| active.off_sample)
            .map(|(index, _)| index);

        if let Some(index) = soonest {
            let active = self.pending.swap_remove(index);
            out.push(MidiEvent {
                offset,
                message: MidiMessage::NoteOff {
                    channel: active.channel,
                    note: active.note,
                },
            });
        }
    }
}
