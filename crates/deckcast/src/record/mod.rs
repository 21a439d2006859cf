pub mod backend;
pub mod resample;
pub mod system;

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use crossbeam_channel::Receiver;

use backend::{
    AudioTrack, CameraFeed, CaptureBackend, CaptureError, DisplayCapture, RecordingSink,
    pick_encoding,
};
use resample::resample_linear;

/// All tracks are brought to this rate before mixing and encoding.
pub const MIX_RATE: u32 = 48_000;

pub const ARTIFACT_PREFIX: &str = "deckcast";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordingStatus {
    Idle,
    Recording,
    Paused,
}

struct Writer {
    stop: Arc<AtomicBool>,
    paused: Arc<AtomicBool>,
    join: JoinHandle<Result<Option<PathBuf>, CaptureError>>,
}

/// Coordinates acquisition of up to three media resources and multiplexes
/// them into one recorded artifact. Independent of slide navigation; the
/// webcam overlay toggle never touches recording state.
pub struct RecordingManager {
    backend: Box<dyn CaptureBackend>,
    output_dir: PathBuf,
    status: RecordingStatus,
    started_at: Option<Instant>,
    mic: Option<AudioTrack>,
    display: Option<DisplayCapture>,
    webcam: Option<CameraFeed>,
    writer: Option<Writer>,
}

impl RecordingManager {
    pub fn new(backend: Box<dyn CaptureBackend>, output_dir: PathBuf) -> Self {
        Self {
            backend,
            output_dir,
            status: RecordingStatus::Idle,
            started_at: None,
            mic: None,
            display: None,
            webcam: None,
            writer: None,
        }
    }

    pub fn status(&self) -> RecordingStatus {
        self.status
    }

    pub fn started_at(&self) -> Option<Instant> {
        self.started_at
    }

    /// Start a recording. The microphone is requested first so its
    /// permission prompt leads; its failure is non-fatal. Display capture
    /// failure aborts the start and releases anything already acquired.
    pub fn start(&mut self, now: Instant) -> Result<(), CaptureError> {
        if self.status != RecordingStatus::Idle {
            return Ok(());
        }

        let mic = match self.backend.open_microphone() {
            Ok(track) => Some(track),
            Err(err) => {
                tracing::warn!(%err, "microphone unavailable, recording without it");
                None
            }
        };

        let display = match self.backend.open_display() {
            Ok(display) => display,
            Err(err) => {
                tracing::error!(%err, "display capture failed, recording not started");
                drop(mic);
                return Err(err);
            }
        };

        let encoding = pick_encoding(self.backend.as_ref());
        let path = self.output_dir.join(artifact_name(encoding, chrono::Local::now()));
        let sink = match self.backend.open_sink(encoding, &path, MIX_RATE) {
            Ok(sink) => sink,
            Err(err) => {
                tracing::error!(%err, "could not open recording sink");
                drop(display);
                drop(mic);
                return Err(err);
            }
        };

        let mut sources = Vec::new();
        if let Some(track) = &mic {
            tracing::debug!(track = track.label, rate = track.sample_rate, "capturing");
            sources.push(MixSource::new(track));
        }
        if let Some(track) = display.audio.as_ref() {
            tracing::debug!(track = track.label, rate = track.sample_rate, "capturing");
            sources.push(MixSource::new(track));
        }

        let stop = Arc::new(AtomicBool::new(false));
        let paused = Arc::new(AtomicBool::new(false));
        let join = {
            let stop = stop.clone();
            let paused = paused.clone();
            std::thread::spawn(move || writer_loop(sink, sources, stop, paused))
        };

        self.mic = mic;
        self.display = Some(display);
        self.writer = Some(Writer { stop, paused, join });
        self.status = RecordingStatus::Recording;
        self.started_at = Some(now);
        tracing::info!(encoding = ?encoding, "recording started");
        Ok(())
    }

    /// The one finalize routine: flush the sink, then release every acquired
    /// resource. Entered from the explicit stop and from the platform's own
    /// end-of-capture signal alike. Stopping while Idle is a no-op.
    pub fn stop(&mut self) -> Option<PathBuf> {
        if self.status == RecordingStatus::Idle {
            return None;
        }
        self.status = RecordingStatus::Idle;
        self.started_at = None;

        let artifact = match self.writer.take() {
            Some(writer) => {
                writer.stop.store(true, Ordering::Relaxed);
                match writer.join.join() {
                    Ok(Ok(path)) => path,
                    Ok(Err(err)) => {
                        tracing::error!(%err, "recording finalize failed");
                        None
                    }
                    Err(_) => {
                        tracing::error!("recording writer panicked");
                        None
                    }
                }
            }
            None => None,
        };

        // Hardware is released only after the sink has been finalized.
        self.display = None;
        self.mic = None;

        match &artifact {
            Some(path) => tracing::info!(path = %path.display(), "recording saved"),
            None => tracing::info!("recording stopped with no data, no artifact written"),
        }
        artifact
    }

    pub fn pause(&mut self) {
        if self.status == RecordingStatus::Recording {
            if let Some(writer) = &self.writer {
                writer.paused.store(true, Ordering::Relaxed);
            }
            self.status = RecordingStatus::Paused;
            tracing::info!("recording paused");
        }
    }

    pub fn resume(&mut self) {
        if self.status == RecordingStatus::Paused {
            if let Some(writer) = &self.writer {
                writer.paused.store(false, Ordering::Relaxed);
            }
            self.status = RecordingStatus::Recording;
            tracing::info!("recording resumed");
        }
    }

    pub fn toggle_pause(&mut self) {
        match self.status {
            RecordingStatus::Recording => self.pause(),
            RecordingStatus::Paused => self.resume(),
            RecordingStatus::Idle => {}
        }
    }

    pub fn toggle(&mut self, now: Instant) -> Option<PathBuf> {
        if self.status == RecordingStatus::Idle {
            if let Err(err) = self.start(now) {
                tracing::warn!(%err, "recording did not start");
            }
            None
        } else {
            self.stop()
        }
    }

    /// The platform ended the display capture on its own ("stop sharing").
    /// Routes through the same stop path as an explicit stop.
    pub fn poll_external_stop(&mut self) -> Option<PathBuf> {
        let ended = self
            .display
            .as_ref()
            .is_some_and(|d| d.ended.try_recv().is_ok());
        if ended && self.status != RecordingStatus::Idle {
            tracing::info!("display capture ended externally, stopping recording");
            self.stop()
        } else {
            None
        }
    }

    pub fn webcam_active(&self) -> bool {
        self.webcam.is_some()
    }

    /// Toggle the webcam overlay. Acquiring or releasing the camera never
    /// touches the recording session's own state. Returns the new overlay
    /// state; camera denial leaves the toggle inactive.
    pub fn toggle_webcam(&mut self) -> Result<bool, CaptureError> {
        if self.webcam.take().is_some() {
            tracing::info!("webcam overlay off");
            return Ok(false);
        }
        match self.backend.open_camera() {
            Ok(feed) => {
                tracing::info!(camera = %feed.label, "webcam overlay on");
                self.webcam = Some(feed);
                Ok(true)
            }
            Err(err) => {
                tracing::warn!(%err, "webcam unavailable");
                Err(err)
            }
        }
    }
}

impl Drop for RecordingManager {
    fn drop(&mut self) {
        self.stop();
    }
}

fn artifact_name(encoding: backend::Encoding, at: chrono::DateTime<chrono::Local>) -> String {
    format!(
        "{ARTIFACT_PREFIX}-{}.{}",
        at.format("%Y%m%d-%H%M%S"),
        encoding.extension()
    )
}

struct MixSource {
    rx: Receiver<Vec<f32>>,
    rate: u32,
    queue: Vec<f32>,
}

impl MixSource {
    fn new(track: &AudioTrack) -> Self {
        Self {
            rx: track.frames.clone(),
            rate: track.sample_rate,
            queue: Vec::new(),
        }
    }
}

/// Drain capture channels, mix, and write until stopped, then flush the
/// tail and finalize the sink. Runs on its own thread; it owns the sink and
/// nothing else.
fn writer_loop(
    mut sink: Box<dyn RecordingSink>,
    mut sources: Vec<MixSource>,
    stop: Arc<AtomicBool>,
    paused: Arc<AtomicBool>,
) -> Result<Option<PathBuf>, CaptureError> {
    loop {
        let drained = drain_sources(&mut sources, &paused);
        if let Err(err) = write_ready(&mut sink, &mut sources) {
            tracing::error!(%err, "recording write failed");
            break;
        }
        if stop.load(Ordering::Relaxed) {
            break;
        }
        if !drained {
            std::thread::sleep(Duration::from_millis(5));
        }
    }

    // Catch frames that arrived during shutdown, then flush whatever one
    // source has beyond the mixed overlap.
    drain_sources(&mut sources, &paused);
    write_ready(&mut sink, &mut sources)?;
    for source in &mut sources {
        if !source.queue.is_empty() {
            let tail = std::mem::take(&mut source.queue);
            sink.write(&tail)?;
        }
    }
    tracing::debug!(frames = sink.frames_written(), "finalizing recording");
    sink.finalize()
}

fn drain_sources(sources: &mut [MixSource], paused: &AtomicBool) -> bool {
    let mut drained = false;
    for source in sources.iter_mut() {
        while let Ok(chunk) = source.rx.try_recv() {
            drained = true;
            if paused.load(Ordering::Relaxed) {
                continue;
            }
            source
                .queue
                .extend(resample_linear(&chunk, source.rate, MIX_RATE));
        }
    }
    drained
}

/// Write what is ready: the summed overlap when two tracks are live, the
/// whole queue when only one is.
fn write_ready(
    sink: &mut Box<dyn RecordingSink>,
    sources: &mut [MixSource],
) -> Result<(), CaptureError> {
    match sources {
        [] => Ok(()),
        [only] => {
            if only.queue.is_empty() {
                return Ok(());
            }
            let chunk = std::mem::take(&mut only.queue);
            sink.write(&chunk)
        }
        [a, b] => {
            let n = a.queue.len().min(b.queue.len());
            if n == 0 {
                return Ok(());
            }
            let mixed: Vec<f32> = a.queue[..n]
                .iter()
                .zip(&b.queue[..n])
                .map(|(x, y)| (x + y).clamp(-1.0, 1.0))
                .collect();
            a.queue.drain(..n);
            b.queue.drain(..n);
            sink.write(&mixed)
        }
        _ => Ok(()),
    }
}
