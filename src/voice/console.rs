//! Line-based recognizer: each typed line is one utterance.
//!
//! Stands in for a speech engine on terminals. An empty line reads as no
//! speech, end of input as a device failure.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Lines, Stdin};
use tokio::sync::{Mutex, mpsc};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::device::{
    CaptureError, CaptureEvent, CaptureSession, DeviceSlot, RecognitionRequest, SpeechRecognizer,
    capture_slot,
};

/// Default time to wait for a line before reporting no speech.
pub const DEFAULT_LISTEN_TIMEOUT: Duration = Duration::from_secs(30);

pub struct ConsoleRecognizer<R> {
    lines: Arc<Mutex<Lines<R>>>,
    slot: DeviceSlot,
    listen_timeout: Duration,
}

impl ConsoleRecognizer<BufReader<Stdin>> {
    /// Read utterances from standard input, holding the process capture slot.
    pub fn stdin() -> Self {
        Self::new(
            BufReader::new(tokio::io::stdin()),
            capture_slot(),
            DEFAULT_LISTEN_TIMEOUT,
        )
    }
}

impl<R> ConsoleRecognizer<R>
where
    R: AsyncBufRead + Unpin + Send + 'static,
{
    pub fn new(reader: R, slot: DeviceSlot, listen_timeout: Duration) -> Self {
        Self {
            lines: Arc::new(Mutex::new(reader.lines())),
            slot,
            listen_timeout,
        }
    }
}

async fn read_utterance<R>(lines: &Mutex<Lines<R>>, listen_timeout: Duration) -> CaptureEvent
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = lines.lock().await;
    match tokio::time::timeout(listen_timeout, lines.next_line()).await {
        Err(_) => CaptureEvent::Failed(CaptureError::NoSpeech),
        Ok(Ok(Some(line))) if line.trim().is_empty() => {
            CaptureEvent::Failed(CaptureError::NoSpeech)
        }
        Ok(Ok(Some(line))) => CaptureEvent::Final(line.trim().to_owned()),
        Ok(Ok(None)) => CaptureEvent::Failed(CaptureError::Device("input closed".into())),
        Ok(Err(e)) => CaptureEvent::Failed(CaptureError::Device(e.to_string())),
    }
}

#[async_trait]
impl<R> SpeechRecognizer for ConsoleRecognizer<R>
where
    R: AsyncBufRead + Unpin + Send + 'static,
{
    async fn start(&mut self, request: &RecognitionRequest) -> Result<CaptureSession, CaptureError> {
        let lease = self.slot.try_acquire().ok_or(CaptureError::DeviceBusy)?;
        debug!(locale = %request.locale, "console capture started");

        let (tx, rx) = mpsc::channel(1);
        let cancel = CancellationToken::new();
        let lines = Arc::clone(&self.lines);
        let listen_timeout = self.listen_timeout;
        let token = cancel.clone();

        tokio::spawn(async move {
            tokio::select! {
                () = token.cancelled() => debug!("console capture cancelled"),
                event = read_utterance(&lines, listen_timeout) => {
                    let _ = tx.send(event).await;
                }
            }
        });

        Ok(CaptureSession::new(rx, cancel, Some(lease)))
    }
}
