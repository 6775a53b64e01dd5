// src/event.rs

/// All sequencer output goes to MIDI channel 1.
pub const MIDI_CHANNEL: u8 = 1;

/// ===============================
/// Engine-side MIDI messages
/// ===============================

/// A channel-voice message emitted by the engine.
///
/// Channels are 1-based, as shown to users.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MidiMessage {
    NoteOn { channel: u8, note: u8, velocity: u8 },

    NoteOff { channel: u8, note: u8 },
}

impl MidiMessage {
    #[inline]
    pub fn note(&self) -> u8 {
        match self {
            MidiMessage::NoteOn { note, .. } | MidiMessage::NoteOff { note, .. } => *note,
        }
    }

    #[inline]
    pub fn is_note_on(&self) -> bool {
        matches!(self, MidiMessage::NoteOn { .. })
    }

    /// Raw 3-byte encoding. Note-offs are sent as 0x8n with velocity 0.
    pub fn to_bytes(&self) -> [u8; 3] {
        match *self {
            MidiMessage::NoteOn {
                channel,
                note,
                velocity,
            } => [0x90 | status_channel(channel), note & 0x7f, velocity & 0x7f],
            MidiMessage::NoteOff { channel, note } => {
                [0x80 | status_channel(channel), note & 0x7f, 0]
            }
        }
    }
}

#[inline]
fn status_channel(channel: u8) -> u8 {
    channel.clamp(1, 16) - 1
}

/// ===============================
/// Sample-accurate block events
/// ===============================

/// A MIDI message placed at a sample offset within the current block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MidiEvent {
    /// Offset from the block start, `< block_frames`.
    pub offset: usize,

    pub message: MidiMessage,
}

impl MidiEvent {
    /// Ordering key for a block: by offset, note-offs before note-ons.
    #[inline]
    pub(crate) fn sort_key(&self) -> (usize, u8) {
        (self.offset, self.message.is_note_on() as u8)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_bytes() {
        let on = MidiMessage::NoteOn {
            channel: 1,
            note: 60,
            velocity: 100,
        };
        assert_eq!(on.to_bytes(), [0x90, 60, 100]);

        let off = MidiMessage::NoteOff {
            channel: 16,
            note: 61,
        };
        assert_eq!(off.to_bytes(), [0x8f, 61, 0]);
    }

    #[test]
    fn test_note_off_sorts_first_at_same_offset() {
        let on = MidiEvent {
            offset: 0,
            message: MidiMessage::NoteOn {
                channel: 1,
                note: 60,
                velocity: 100,
            },
        };
        let off = MidiEvent {
            offset: 0,
            message: MidiMessage::NoteOff { channel: 1, note: 60 },
        };
        let mut events = [on, off];
        events.sort_unstable_by_key(MidiEvent::sort_key);
        assert_eq!(events[0], off);
    }
}
