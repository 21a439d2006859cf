use std::any::Any;
use std::path::{Path, PathBuf};

use crossbeam_channel::Receiver;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("permission denied for {0}")]
    PermissionDenied(&'static str),

    #[error("device unavailable: {0}")]
    DeviceUnavailable(String),

    #[error("audio stream error: {0}")]
    Stream(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("encoder error: {0}")]
    Encoder(String),
}

/// Sink formats in fixed preference order; the last entry is the
/// unconditional fallback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    WavFloat32,
    WavInt24,
    WavInt16,
}

impl Encoding {
    pub const PREFERENCE: [Encoding; 3] =
        [Encoding::WavFloat32, Encoding::WavInt24, Encoding::WavInt16];

    pub fn extension(self) -> &'static str {
        "wav"
    }
}

/// Probe the backend for the first supported encoding. Never assumes a
/// specific format is available; falls back to the last preference entry.
pub fn pick_encoding(backend: &dyn CaptureBackend) -> Encoding {
    Encoding::PREFERENCE
        .iter()
        .copied()
        .find(|e| backend.supports(*e))
        .unwrap_or(Encoding::WavInt16)
}

/// A live mono audio capture. Frames arrive on `frames` from the device
/// callback thread; dropping the track releases the device.
pub struct AudioTrack {
    pub label: &'static str,
    pub sample_rate: u32,
    pub frames: Receiver<Vec<f32>>,
    _guard: Box<dyn Any>,
}

impl AudioTrack {
    pub fn new(
        label: &'static str,
        sample_rate: u32,
        frames: Receiver<Vec<f32>>,
        guard: Box<dyn Any>,
    ) -> Self {
        Self {
            label,
            sample_rate,
            frames,
            _guard: guard,
        }
    }
}

/// The display-capture grant: its system-audio track (when the platform
/// exposes one) and the end-of-stream signal raised by the platform's own
/// "stop sharing" affordance.
pub struct DisplayCapture {
    pub audio: Option<AudioTrack>,
    pub ended: Receiver<()>,
}

/// A webcam grant. Dropping it releases the camera.
pub struct CameraFeed {
    pub label: String,
    _guard: Box<dyn Any>,
}

impl CameraFeed {
    #[allow(dead_code)]
    pub fn new(label: String, guard: Box<dyn Any>) -> Self {
        Self {
            label,
            _guard: guard,
        }
    }
}

/// Where mixed samples go. `finalize` flushes buffered data and returns the
/// artifact path, or None when nothing was ever written (no artifact is
/// produced for an empty recording).
pub trait RecordingSink: Send {
    fn write(&mut self, samples: &[f32]) -> Result<(), CaptureError>;
    fn frames_written(&self) -> u64;
    fn finalize(self: Box<Self>) -> Result<Option<PathBuf>, CaptureError>;
}

/// Platform seam for media acquisition. The production implementation lives
/// in `record::system`; tests inject a scripted fake.
pub trait CaptureBackend {
    fn open_microphone(&self) -> Result<AudioTrack, CaptureError>;
    fn open_display(&self) -> Result<DisplayCapture, CaptureError>;
    fn open_camera(&self) -> Result<CameraFeed, CaptureError>;
    fn supports(&self, encoding: Encoding) -> bool;
    fn open_sink(
        &self,
        encoding: Encoding,
        path: &Path,
        sample_rate: u32,
    ) -> Result<Box<dyn RecordingSink>, CaptureError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Probe(Vec<Encoding>);

    impl CaptureBackend for Probe {
        fn open_microphone(&self) -> Result<AudioTrack, CaptureError> {
            Err(CaptureError::PermissionDenied("microphone"))
        }
        fn open_display(&self) -> Result<DisplayCapture, CaptureError> {
            Err(CaptureError::PermissionDenied("display"))
        }
        fn open_camera(&self) -> Result<CameraFeed, CaptureError> {
            Err(CaptureError::PermissionDenied("camera"))
        }
        fn supports(&self, encoding: Encoding) -> bool {
            self.0.contains(&encoding)
        }
        fn open_sink(
            &self,
            _encoding: Encoding,
            _path: &Path,
            _sample_rate: u32,
        ) -> Result<Box<dyn RecordingSink>, CaptureError> {
            Err(CaptureError::Encoder("probe only".into()))
        }
    }

    #[test]
    fn test_probe_picks_first_supported() {
        let backend = Probe(vec![Encoding::WavInt24, Encoding::WavInt16]);
        assert_eq!(pick_encoding(&backend), Encoding::WavInt24);
    }

    #[test]
    fn test_probe_prefers_float() {
        let backend = Probe(Encoding::PREFERENCE.to_vec());
        assert_eq!(pick_encoding(&backend), Encoding::WavFloat32);
    }

    #[test]
    fn test_probe_unconditional_fallback() {
        let backend = Probe(vec![]);
        assert_eq!(pick_encoding(&backend), Encoding::WavInt16);
    }
}
