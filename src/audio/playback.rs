//! Speech playback to system speakers via cpal.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use cpal::StreamConfig;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use tokio::sync::oneshot;
use tracing::{debug, error, info};

use super::decode::{DecodedAudio, decode_speech};
use crate::config::VoiceConfig;
use crate::gateway::SpeechAudio;
use crate::voice::{
    AudioOutput, DeviceLease, DeviceSlot, OutputBackend, PlaybackError, PlaybackHandle,
    playback_slot,
};

const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Opens the configured cpal output device on demand.
pub struct CpalBackend {
    output_device: Option<String>,
    default_rate: u32,
    slot: DeviceSlot,
}

impl CpalBackend {
    pub fn new(config: &VoiceConfig) -> Self {
        Self {
            output_device: config.output_device.clone(),
            default_rate: config.playback_sample_rate,
            slot: playback_slot(),
        }
    }

    fn select_device(&self) -> Result<cpal::Device, PlaybackError> {
        let host = cpal::default_host();
        if let Some(ref name) = self.output_device {
            host.output_devices()
                .map_err(|e| PlaybackError::Device(format!("cannot enumerate devices: {e}")))?
                .find(|d| {
                    d.description()
                        .ok()
                        .map(|desc| desc.name() == name)
                        .unwrap_or(false)
                })
                .ok_or_else(|| PlaybackError::Device(format!("output device '{name}' not found")))
        } else {
            host.default_output_device()
                .ok_or_else(|| PlaybackError::Device("no default output device".into()))
        }
    }
}

impl OutputBackend for CpalBackend {
    type Output = CpalOutput;

    fn open(&mut self) -> Result<CpalOutput, PlaybackError> {
        let lease = self.slot.try_acquire().ok_or(PlaybackError::DeviceBusy)?;
        let device = self.select_device()?;
        let device_name = device
            .description()
            .map(|d| d.name().to_owned())
            .unwrap_or_else(|_| "<unknown>".into());
        info!("using output device: {device_name}");

        Ok(CpalOutput {
            device,
            default_rate: self.default_rate,
            closed: Arc::new(AtomicBool::new(false)),
            lease: Some(lease),
        })
    }
}

/// An open output device. Holds the playback slot until closed.
pub struct CpalOutput {
    device: cpal::Device,
    default_rate: u32,
    closed: Arc<AtomicBool>,
    lease: Option<DeviceLease>,
}

#[async_trait]
impl AudioOutput for CpalOutput {
    async fn play(&mut self, audio: &SpeechAudio) -> Result<PlaybackHandle, PlaybackError> {
        if self.lease.is_none() {
            return Err(PlaybackError::Start("output is closed".into()));
        }
        let decoded = decode_speech(audio, self.default_rate)?;
        debug!(
            "playing {:.2}s of audio at {}Hz",
            decoded.duration_secs(),
            decoded.sample_rate
        );

        let (started_tx, started_rx) = oneshot::channel();
        let (ended_tx, ended_rx) = oneshot::channel();
        let device = self.device.clone();
        let closed = Arc::clone(&self.closed);

        // cpal streams are not Send; build and drive the stream on one thread.
        tokio::task::spawn_blocking(move || {
            play_blocking(&device, decoded, &closed, started_tx);
            let _ = ended_tx.send(());
        });

        match started_rx.await {
            Ok(Ok(())) => Ok(PlaybackHandle::new(ended_rx)),
            Ok(Err(e)) => Err(e),
            Err(_) => Err(PlaybackError::Start("playback thread exited".into())),
        }
    }

    fn close(&mut self) {
        self.closed.store(true, Ordering::Release);
        self.lease = None;
    }
}

impl Drop for CpalOutput {
    fn drop(&mut self) {
        self.close();
    }
}

fn play_blocking(
    device: &cpal::Device,
    audio: DecodedAudio,
    closed: &AtomicBool,
    started: oneshot::Sender<Result<(), PlaybackError>>,
) {
    let stream_config = StreamConfig {
        channels: 1,
        sample_rate: audio.sample_rate,
        buffer_size: cpal::BufferSize::Default,
    };

    let buffer = Arc::new(Mutex::new(PlaybackBuffer {
        samples: audio.samples,
        position: 0,
        finished: false,
    }));
    let buffer_clone = Arc::clone(&buffer);

    let stream = device.build_output_stream(
        &stream_config,
        move |data: &mut [f32], _info: &cpal::OutputCallbackInfo| {
            let mut buf = match buffer_clone.lock() {
                Ok(b) => b,
                Err(_) => return,
            };

            for sample in data.iter_mut() {
                if buf.position < buf.samples.len() {
                    *sample = buf.samples[buf.position];
                    buf.position += 1;
                } else {
                    *sample = 0.0;
                    buf.finished = true;
                }
            }
        },
        move |err| {
            error!("audio output stream error: {err}");
        },
        None,
    );
    let stream = match stream {
        Ok(stream) => stream,
        Err(e) => {
            let _ = started.send(Err(PlaybackError::Start(format!(
                "failed to build output stream: {e}"
            ))));
            return;
        }
    };
    if let Err(e) = stream.play() {
        let _ = started.send(Err(PlaybackError::Start(format!(
            "failed to start output stream: {e}"
        ))));
        return;
    }
    let _ = started.send(Ok(()));

    loop {
        std::thread::sleep(POLL_INTERVAL);
        if closed.load(Ordering::Acquire) {
            debug!("output closed during playback");
            break;
        }
        match buffer.lock() {
            Ok(buf) if buf.finished => break,
            Ok(_) => {}
            Err(_) => {
                error!("playback buffer lock poisoned");
                break;
            }
        }
    }
    drop(stream);
}

/// Output device names, for the `output_device` setting.
///
/// # Errors
///
/// Returns an error if devices cannot be enumerated.
pub fn list_output_devices() -> Result<Vec<String>, PlaybackError> {
    let host = cpal::default_host();
    let devices = host
        .output_devices()
        .map_err(|e| PlaybackError::Device(format!("cannot enumerate devices: {e}")))?;

    Ok(devices
        .filter_map(|device| device.description().ok().map(|d| d.name().to_owned()))
        .collect())
}

/// Progress through the samples being played.
struct PlaybackBuffer {
    samples: Vec<f32>,
    position: usize,
    finished: bool,
}
