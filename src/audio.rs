//! Tone cue outputs.

use crate::feedback::{Pitch, ToneSink};
use std::time::Duration;
use tracing::info;

/// Writes each cue to the log instead of sounding it.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogToneSink;

impl ToneSink for LogToneSink {
    fn play(&mut self, pitch: &Pitch, duration: Duration) {
        info!(
            note = pitch.note,
            hz = pitch.hz,
            duration_ms = duration.as_millis() as u64,
            "Tone"
        );
    }
}

#[cfg(feature = "midi")]
pub use midi::MidiToneSink;

#[cfg(feature = "midi")]
mod midi {
    use super::*;
    use crate::error::AppError;
    use midir::{MidiOutput, MidiOutputConnection};
    use std::sync::mpsc::{self, Sender};
    use std::thread::{self, JoinHandle};
    use tracing::{debug, warn};

    const CHANNEL: u8 = 0;
    const VELOCITY: u8 = 100;

    enum ToneCommand {
        Note { key: u8, duration: Duration },
        Quit,
    }

    /// Sends note-on/note-off pairs to a MIDI output port. Notes are played
    /// on a worker thread so `play` never blocks the frame loop.
    pub struct MidiToneSink {
        tx: Sender<ToneCommand>,
        worker: Option<JoinHandle<()>>,
    }

    impl MidiToneSink {
        /// Connects to the first port whose name contains `port_hint`, or to
        /// the first port when no hint is given.
        pub fn open(port_hint: Option<&str>) -> Result<Self, AppError> {
            let hint = port_hint.map(str::to_lowercase);
            let (ready_tx, ready_rx) = mpsc::channel();
            let (tx, rx) = mpsc::channel();

            // The connection is opened on the worker so it never crosses threads.
            let worker = thread::spawn(move || match connect(hint.as_deref()) {
                Ok(conn) => {
                    let _ = ready_tx.send(Ok(()));
                    note_loop(conn, rx);
                }
                Err(e) => {
                    let _ = ready_tx.send(Err(e));
                }
            });

            match ready_rx.recv() {
                Ok(Ok(())) => Ok(Self {
                    tx,
                    worker: Some(worker),
                }),
                Ok(Err(e)) => Err(e),
                Err(_) => Err(AppError::Audio("MIDI worker exited during startup".to_string())),
            }
        }
    }

    fn connect(hint: Option<&str>) -> Result<MidiOutputConnection, AppError> {
        let output = MidiOutput::new("handtone").map_err(|e| AppError::Audio(e.to_string()))?;
        let ports = output.ports();
        let port = match hint {
            Some(hint) => ports.iter().find(|p| {
                output
                    .port_name(p)
                    .map(|name| name.to_lowercase().contains(hint))
                    .unwrap_or(false)
            }),
            None => ports.first(),
        }
        .ok_or_else(|| AppError::Audio("no matching MIDI output port".to_string()))?;

        let name = output.port_name(port).unwrap_or_else(|_| "unknown".to_string());
        let conn = output
            .connect(port, "handtone-tones")
            .map_err(|e| AppError::Audio(e.to_string()))?;
        info!(port = %name, "MIDI output connected");
        Ok(conn)
    }

    fn note_loop(mut conn: MidiOutputConnection, rx: mpsc::Receiver<ToneCommand>) {
        while let Ok(command) = rx.recv() {
            match command {
                ToneCommand::Note { key, duration } => {
                    if let Err(e) = conn.send(&[0x90 | CHANNEL, key, VELOCITY]) {
                        warn!(error = %e, "MIDI note-on failed");
                        continue;
                    }
                    thread::sleep(duration);
                    let _ = conn.send(&[0x80 | CHANNEL, key, 0]);
                }
                ToneCommand::Quit => break,
            }
        }
        debug!("MIDI worker stopped");
    }

    impl ToneSink for MidiToneSink {
        fn play(&mut self, pitch: &Pitch, duration: Duration) {
            let command = ToneCommand::Note {
                key: pitch.midi,
                duration,
            };
            if self.tx.send(command).is_err() {
                warn!(note = pitch.note, "MIDI worker is gone, tone dropped");
            }
        }
    }

    impl Drop for MidiToneSink {
        fn drop(&mut self) {
            let _ = self.tx.send(ToneCommand::Quit);
            if let Some(worker) = self.worker.take() {
                let _ = worker.join();
            }
        }
    }
}

/// Picks the tone output for this build: MIDI when compiled in and a port
/// can be opened, otherwise the log.
pub fn default_sink(port_hint: Option<&str>) -> Box<dyn ToneSink> {
    #[cfg(feature = "midi")]
    {
        match MidiToneSink::open(port_hint) {
            Ok(sink) => return Box::new(sink),
            Err(e) => tracing::warn!(error = %e, "MIDI unavailable, logging tones instead"),
        }
    }
    #[cfg(not(feature = "midi"))]
    let _ = port_hint;
    Box::new(LogToneSink)
}
