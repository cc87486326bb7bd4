//! Decode synthesized speech into mono `f32` samples.
//!
//! The gateway returns either raw 16-bit little-endian PCM (`audio/L16;...;rate=N`)
//! or a RIFF/WAV container.

use std::io::Cursor;

use crate::gateway::SpeechAudio;
use crate::voice::PlaybackError;

/// Mono samples ready for the output stream.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedAudio {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

impl DecodedAudio {
    /// Playback length in seconds.
    #[must_use]
    pub fn duration_secs(&self) -> f32 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f32 / self.sample_rate as f32
    }
}

/// Sample rate from a MIME parameter such as `audio/L16;codec=pcm;rate=24000`.
fn mime_rate(mime: &str) -> Option<u32> {
    mime.split(';')
        .filter_map(|param| param.trim().split_once('='))
        .find(|(key, _)| key.trim().eq_ignore_ascii_case("rate"))
        .and_then(|(_, value)| value.trim().parse().ok())
}

/// Decode `audio`, using `default_rate` when raw PCM carries no rate.
///
/// # Errors
///
/// Returns [`PlaybackError::Decode`] for empty, truncated, or malformed audio.
pub fn decode_speech(audio: &SpeechAudio, default_rate: u32) -> Result<DecodedAudio, PlaybackError> {
    let bytes = &audio.bytes;
    if bytes.is_empty() {
        return Err(PlaybackError::Decode("empty audio buffer".into()));
    }
    if bytes.starts_with(b"RIFF") {
        return decode_wav(bytes);
    }
    if bytes.len() % 2 != 0 {
        return Err(PlaybackError::Decode(format!(
            "PCM buffer has odd length {}",
            bytes.len()
        )));
    }

    let sample_rate = audio
        .mime_type
        .as_deref()
        .and_then(mime_rate)
        .unwrap_or(default_rate);
    let samples = bytes
        .chunks_exact(2)
        .map(|pair| f32::from(i16::from_le_bytes([pair[0], pair[1]])) / 32768.0)
        .collect();

    Ok(DecodedAudio {
        samples,
        sample_rate,
    })
}

fn decode_wav(bytes: &[u8]) -> Result<DecodedAudio, PlaybackError> {
    let mut reader = hound::WavReader::new(Cursor::new(bytes))
        .map_err(|e| PlaybackError::Decode(format!("invalid WAV: {e}")))?;
    let spec = reader.spec();

    let interleaved: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Int => {
            let max = (1i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| {
                    s.map(|v| v as f32 / max)
                        .map_err(|e| PlaybackError::Decode(format!("WAV read error: {e}")))
                })
                .collect::<Result<_, _>>()?
        }
        hound::SampleFormat::Float => reader
            .samples::<f32>()
            .map(|s| s.map_err(|e| PlaybackError::Decode(format!("WAV read error: {e}"))))
            .collect::<Result<_, _>>()?,
    };

    let channels = usize::from(spec.channels.max(1));
    let samples = if channels == 1 {
        interleaved
    } else {
        interleaved
            .chunks(channels)
            .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
            .collect()
    };

    Ok(DecodedAudio {
        samples,
        sample_rate: spec.sample_rate,
    })
}
