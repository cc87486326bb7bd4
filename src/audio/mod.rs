//! Speech audio decoding and playback via cpal.

pub mod decode;
pub mod playback;

pub use decode::{DecodedAudio, decode_speech};
pub use playback::{CpalBackend, CpalOutput, list_output_devices};
