use serde::{Deserialize, Serialize};

use super::error::StreamError;

/// Output bit rates the codec is negotiated at, in kbit/s.
///
/// Any other value is rejected, not clamped.
pub const SUPPORTED_BIT_RATES: [u32; 6] = [64, 96, 128, 160, 192, 320];

/// Negotiation parameters for a streaming encoder.
///
/// Fixed before the codec instance is prepared and immutable afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncoderConfig {
    pub channels: u16,
    pub sample_rate: u32,
    pub bit_rate_kbps: u32,
}

impl EncoderConfig {
    pub fn new(channels: u16, sample_rate: u32, bit_rate_kbps: u32) -> Result<Self, StreamError> {
        if !SUPPORTED_BIT_RATES.contains(&bit_rate_kbps) {
            return Err(StreamError::InvalidFormat(format!(
                "unsupported output bit rate: {} kbps (supported: {:?})",
                bit_rate_kbps, SUPPORTED_BIT_RATES
            )));
        }
        if !(1..=2).contains(&channels) {
            return Err(StreamError::InvalidFormat(format!(
                "unsupported channel count: {}",
                channels
            )));
        }
        if sample_rate == 0 {
            return Err(StreamError::InvalidFormat(
                "sample rate must be positive".into(),
            ));
        }
        Ok(Self {
            channels,
            sample_rate,
            bit_rate_kbps,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_every_supported_bit_rate() {
        for rate in SUPPORTED_BIT_RATES {
            assert!(EncoderConfig::new(2, 44100, rate).is_ok());
        }
    }

    #[test]
    fn rejects_unsupported_bit_rates() {
        for rate in [0, 100, 112, 256, 321] {
            let err = EncoderConfig::new(2, 44100, rate).unwrap_err();
            assert!(matches!(err, StreamError::InvalidFormat(_)));
        }
    }

    #[test]
    fn rejects_bad_channel_counts() {
        assert!(EncoderConfig::new(0, 44100, 128).is_err());
        assert!(EncoderConfig::new(3, 44100, 128).is_err());
    }
}
