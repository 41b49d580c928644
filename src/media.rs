//! Data URIs and audio containers
//!
//! Audio travels through the flows as `data:<mime>;base64,<payload>` strings.
//! Speech synthesis returns headerless 16-bit PCM, which is wrapped in a WAV
//! container before it is handed back to callers.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

pub const DEFAULT_PCM_SAMPLE_RATE: u32 = 24_000;

/// A decoded `data:` URI
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataUri {
    pub mime_type: String,
    pub data: Vec<u8>,
}

impl DataUri {
    /// Parse a base64 data URI. The error is a short human-readable reason.
    pub fn parse(uri: &str) -> Result<Self, String> {
        let rest = uri
            .strip_prefix("data:")
            .ok_or_else(|| "missing 'data:' prefix".to_string())?;
        let (header, payload) = rest
            .split_once(',')
            .ok_or_else(|| "missing ',' separator".to_string())?;
        let mime_type = header
            .strip_suffix(";base64")
            .ok_or_else(|| "payload is not base64-encoded".to_string())?;
        if mime_type.is_empty() {
            return Err("missing media type".to_string());
        }
        let data = STANDARD
            .decode(payload.trim())
            .map_err(|e| format!("invalid base64 payload: {}", e))?;

        Ok(Self {
            mime_type: mime_type.to_string(),
            data,
        })
    }

    pub fn new<S: Into<String>>(mime_type: S, data: Vec<u8>) -> Self {
        Self {
            mime_type: mime_type.into(),
            data,
        }
    }

    pub fn base64_payload(&self) -> String {
        STANDARD.encode(&self.data)
    }

    pub fn to_uri(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.base64_payload())
    }
}

/// Read the `rate=` parameter of a PCM mime type such as
/// `audio/L16;codec=pcm;rate=24000`
pub fn sample_rate_from_mime(mime_type: &str) -> u32 {
    mime_type
        .split(';')
        .filter_map(|param| param.trim().strip_prefix("rate="))
        .find_map(|rate| rate.parse().ok())
        .unwrap_or(DEFAULT_PCM_SAMPLE_RATE)
}

/// Wrap little-endian 16-bit PCM in a RIFF/WAVE container
pub fn pcm_to_wav(pcm: &[u8], sample_rate: u32, channels: u16) -> Vec<u8> {
    const BITS_PER_SAMPLE: u16 = 16;

    let block_align = channels * BITS_PER_SAMPLE / 8;
    let byte_rate = sample_rate * u32::from(block_align);
    let data_len = pcm.len() as u32;

    let mut wav = Vec::with_capacity(44 + pcm.len());
    wav.extend_from_slice(b"RIFF");
    wav.extend_from_slice(&(36 + data_len).to_le_bytes());
    wav.extend_from_slice(b"WAVE");

    wav.extend_from_slice(b"fmt ");
    wav.extend_from_slice(&16u32.to_le_bytes());
    wav.extend_from_slice(&1u16.to_le_bytes()); // PCM
    wav.extend_from_slice(&channels.to_le_bytes());
    wav.extend_from_slice(&sample_rate.to_le_bytes());
    wav.extend_from_slice(&byte_rate.to_le_bytes());
    wav.extend_from_slice(&block_align.to_le_bytes());
    wav.extend_from_slice(&BITS_PER_SAMPLE.to_le_bytes());

    wav.extend_from_slice(b"data");
    wav.extend_from_slice(&data_len.to_le_bytes());
    wav.extend_from_slice(pcm);
    wav
}
