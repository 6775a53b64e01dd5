// src/main.rs
//
// Offline run of the starter pattern: renders a few seconds and prints the
// MIDI stream.

use turntable::{EngineConfig, MidiMessage, Session, Transport, create_bridge};

fn main() {
    env_logger::init();

    let sample_rate = 48_000.0;
    let block_frames = 512;
    let seconds: f64 = std::env::args()
        .nth(1)
        .and_then(|arg| arg.parse().ok())
        .unwrap_or(8.0);

    // --------------------------------
    // Bridge (UI side + audio side)
    // --------------------------------

    let config = EngineConfig::default().with_seed(0x7ab1e);
    let (mut ui, mut audio) = create_bridge(Session::new(), &config);

    if let Err(err) = ui.play() {
        log::error!("could not start playback: {err}");
        return;
    }

    // --------------------------------
    // Run
    // --------------------------------

    let transport = Transport::standalone(sample_rate);
    let total_blocks = (seconds * sample_rate / block_frames as f64).ceil() as u64;
    let mut out = Vec::with_capacity(64);

    println!("Rendering {seconds} s of the starter pattern...");

    for block in 0..total_blocks {
        audio.process_block(&transport, block_frames, &mut out);

        let block_start = block * block_frames as u64;
        for event in &out {
            let sample = block_start + event.offset as u64;
            let [status, data1, data2] = event.message.to_bytes();
            let kind = match event.message {
                MidiMessage::NoteOn { .. } => "on ",
                MidiMessage::NoteOff { .. } => "off",
            };
            println!(
                "{:>9.3} s  {kind}  {:02x} {:02x} {:02x}",
                sample as f64 / sample_rate,
                status,
                data1,
                data2
            );
        }
    }

    let readback = ui.readback();
    log::info!(
        "done: {} triggers, rotation {:.2} deg, {} dropped note-offs",
        readback.beat_count,
        readback.rotation,
        readback.dropped_note_offs
    );
    println!("Render completed.");
}
