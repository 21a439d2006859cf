use std::any::Any;
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleFormat, StreamConfig};
use crossbeam_channel::{Sender, bounded};

use super::backend::{
    AudioTrack, CameraFeed, CaptureBackend, CaptureError, DisplayCapture, Encoding, RecordingSink,
};

/// Input device names that indicate a system-audio loopback of what the
/// display is playing.
const LOOPBACK_MARKERS: [&str; 5] = ["monitor", "loopback", "stereo mix", "blackhole", "soundflower"];

/// CPAL/hound-backed capture. Display capture acquires the system loopback
/// device; its end-of-stream doubles as the platform "stop sharing" signal.
pub struct SystemBackend {
    preferred_microphone: Option<String>,
}

impl SystemBackend {
    pub fn new(preferred_microphone: Option<String>) -> Self {
        Self {
            preferred_microphone,
        }
    }
}

impl CaptureBackend for SystemBackend {
    fn open_microphone(&self) -> Result<AudioTrack, CaptureError> {
        let host = cpal::default_host();
        let device = match &self.preferred_microphone {
            Some(name) => host
                .input_devices()
                .map_err(|e| CaptureError::DeviceUnavailable(e.to_string()))?
                .find(|d| d.name().map(|n| &n == name).unwrap_or(false))
                .ok_or_else(|| {
                    CaptureError::DeviceUnavailable(format!("input device '{name}' not found"))
                })?,
            None => host.default_input_device().ok_or_else(|| {
                CaptureError::DeviceUnavailable("no default input device".to_string())
            })?,
        };
        open_input_stream(device, "microphone", None)
    }

    fn open_display(&self) -> Result<DisplayCapture, CaptureError> {
        let host = cpal::default_host();
        let device = host
            .input_devices()
            .map_err(|e| CaptureError::DeviceUnavailable(e.to_string()))?
            .find(|d| {
                d.name()
                    .map(|n| {
                        let lower = n.to_lowercase();
                        LOOPBACK_MARKERS.iter().any(|m| lower.contains(m))
                    })
                    .unwrap_or(false)
            })
            .ok_or_else(|| {
                CaptureError::DeviceUnavailable(
                    "no system-audio loopback device found".to_string(),
                )
            })?;

        let (ended_tx, ended_rx) = bounded(1);
        let track = open_input_stream(device, "system audio", Some(ended_tx))?;
        Ok(DisplayCapture {
            audio: Some(track),
            ended: ended_rx,
        })
    }

    fn open_camera(&self) -> Result<CameraFeed, CaptureError> {
        Err(CaptureError::DeviceUnavailable(
            "no webcam capture device available on this platform".to_string(),
        ))
    }

    fn supports(&self, _encoding: Encoding) -> bool {
        // hound writes all three WAV variants.
        true
    }

    fn open_sink(
        &self,
        encoding: Encoding,
        path: &Path,
        sample_rate: u32,
    ) -> Result<Box<dyn RecordingSink>, CaptureError> {
        Ok(Box::new(WavSink::create(encoding, path, sample_rate)?))
    }
}

struct StreamGuard(#[allow(dead_code)] cpal::Stream);

/// Build a mono f32 capture stream on the device's native format, pushing
/// frames to a channel from the callback thread.
fn open_input_stream(
    device: cpal::Device,
    label: &'static str,
    ended: Option<Sender<()>>,
) -> Result<AudioTrack, CaptureError> {
    let default_config = device
        .default_input_config()
        .map_err(|e| CaptureError::DeviceUnavailable(e.to_string()))?;
    let format = default_config.sample_format();
    let config: StreamConfig = default_config.into();
    let sample_rate = config.sample_rate.0;
    let channels = usize::from(config.channels.max(1));

    tracing::debug!(
        label,
        ?format,
        sample_rate,
        channels,
        "opening capture stream"
    );

    let (tx, rx) = bounded::<Vec<f32>>(64);
    let err_fn = move |err: cpal::StreamError| {
        tracing::warn!(label, %err, "capture stream error");
        if let Some(ended) = &ended {
            let _ = ended.try_send(());
        }
    };

    let stream = match format {
        SampleFormat::F32 => {
            let tx = tx.clone();
            device.build_input_stream(
                &config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    let _ = tx.try_send(downmix(data, channels, |s| s));
                },
                err_fn,
                None,
            )
        }
        SampleFormat::I16 => {
            let tx = tx.clone();
            device.build_input_stream(
                &config,
                move |data: &[i16], _: &cpal::InputCallbackInfo| {
                    let _ = tx.try_send(downmix(data, channels, |s| f32::from(s) / 32_768.0));
                },
                err_fn,
                None,
            )
        }
        SampleFormat::U16 => {
            let tx = tx.clone();
            device.build_input_stream(
                &config,
                move |data: &[u16], _: &cpal::InputCallbackInfo| {
                    let _ = tx.try_send(downmix(data, channels, |s| {
                        (f32::from(s) - 32_768.0) / 32_768.0
                    }));
                },
                err_fn,
                None,
            )
        }
        other => {
            return Err(CaptureError::Stream(format!(
                "unsupported sample format: {other:?}"
            )));
        }
    }
    .map_err(|e| classify_error(e, label))?;

    stream.play().map_err(|e| classify_error(e, label))?;

    Ok(AudioTrack::new(
        label,
        sample_rate,
        rx,
        Box::new(StreamGuard(stream)) as Box<dyn Any>,
    ))
}

/// Platforms surface capture-permission refusals as backend stream errors;
/// keep them distinguishable from plain device failures.
fn classify_error(err: impl std::fmt::Display, resource: &'static str) -> CaptureError {
    let text = err.to_string();
    let lower = text.to_lowercase();
    if lower.contains("permission") || lower.contains("denied") || lower.contains("authorized") {
        CaptureError::PermissionDenied(resource)
    } else {
        CaptureError::Stream(text)
    }
}

/// Average interleaved channels down to mono.
fn downmix<T: Copy>(data: &[T], channels: usize, convert: impl Fn(T) -> f32) -> Vec<f32> {
    let mut out = Vec::with_capacity(data.len() / channels.max(1));
    for frame in data.chunks(channels.max(1)) {
        let sum: f32 = frame.iter().map(|&s| convert(s)).sum();
        out.push(sum / frame.len() as f32);
    }
    out
}

struct WavSink {
    writer: Option<hound::WavWriter<BufWriter<File>>>,
    encoding: Encoding,
    path: PathBuf,
    frames: u64,
}

impl WavSink {
    fn create(encoding: Encoding, path: &Path, sample_rate: u32) -> Result<Self, CaptureError> {
        let (bits_per_sample, sample_format) = match encoding {
            Encoding::WavFloat32 => (32, hound::SampleFormat::Float),
            Encoding::WavInt24 => (24, hound::SampleFormat::Int),
            Encoding::WavInt16 => (16, hound::SampleFormat::Int),
        };
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate,
            bits_per_sample,
            sample_format,
        };
        let writer = hound::WavWriter::create(path, spec)
            .map_err(|e| CaptureError::Encoder(e.to_string()))?;
        Ok(Self {
            writer: Some(writer),
            encoding,
            path: path.to_path_buf(),
            frames: 0,
        })
    }
}

impl RecordingSink for WavSink {
    fn write(&mut self, samples: &[f32]) -> Result<(), CaptureError> {
        let Some(writer) = self.writer.as_mut() else {
            return Ok(());
        };
        for &sample in samples {
            let clamped = sample.clamp(-1.0, 1.0);
            let result = match self.encoding {
                Encoding::WavFloat32 => writer.write_sample(clamped),
                Encoding::WavInt24 => writer.write_sample((clamped * 8_388_607.0) as i32),
                Encoding::WavInt16 => writer.write_sample((clamped * 32_767.0) as i16),
            };
            result.map_err(|e| CaptureError::Encoder(e.to_string()))?;
        }
        self.frames += samples.len() as u64;
        Ok(())
    }

    fn frames_written(&self) -> u64 {
        self.frames
    }

    fn finalize(mut self: Box<Self>) -> Result<Option<PathBuf>, CaptureError> {
        if let Some(writer) = self.writer.take() {
            writer
                .finalize()
                .map_err(|e| CaptureError::Encoder(e.to_string()))?;
        }
        if self.frames == 0 {
            // An empty recording leaves no artifact behind.
            let _ = std::fs::remove_file(&self.path);
            Ok(None)
        } else {
            Ok(Some(self.path))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wav_sink_writes_and_finalizes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("take.wav");
        let mut sink: Box<dyn RecordingSink> =
            Box::new(WavSink::create(Encoding::WavFloat32, &path, 48_000).unwrap());
        sink.write(&[0.0, 0.5, -0.5]).unwrap();
        assert_eq!(sink.frames_written(), 3);
        let artifact = sink.finalize().unwrap();
        assert_eq!(artifact, Some(path.clone()));
        let reader = hound::WavReader::open(&path).unwrap();
        assert_eq!(reader.spec().sample_rate, 48_000);
        assert_eq!(reader.len(), 3);
    }

    #[test]
    fn test_empty_sink_leaves_no_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.wav");
        let sink: Box<dyn RecordingSink> =
            Box::new(WavSink::create(Encoding::WavInt16, &path, 48_000).unwrap());
        assert_eq!(sink.finalize().unwrap(), None);
        assert!(!path.exists());
    }

    #[test]
    fn test_int24_samples_are_clamped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clip.wav");
        let mut sink: Box<dyn RecordingSink> =
            Box::new(WavSink::create(Encoding::WavInt24, &path, 48_000).unwrap());
        sink.write(&[2.0, -2.0]).unwrap();
        assert!(sink.finalize().unwrap().is_some());
        let mut reader = hound::WavReader::open(&path).unwrap();
        let samples: Vec<i32> = reader.samples::<i32>().map(|s| s.unwrap()).collect();
        assert_eq!(samples, vec![8_388_607, -8_388_607]);
    }

    #[test]
    fn test_downmix_stereo_average() {
        let out = downmix(&[1.0f32, 0.0, 0.5, 0.5], 2, |s| s);
        assert_eq!(out, vec![0.5, 0.5]);
    }

    #[test]
    fn test_permission_errors_are_classified() {
        let err = classify_error("Access denied by the user", "microphone");
        assert!(matches!(err, CaptureError::PermissionDenied("microphone")));
        let err = classify_error("device disconnected", "microphone");
        assert!(matches!(err, CaptureError::Stream(_)));
    }
}
