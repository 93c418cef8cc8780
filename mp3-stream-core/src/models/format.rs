use serde::{Deserialize, Serialize};

use super::error::StreamError;

/// Sample encoding of a capture format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SampleEncoding {
    #[serde(rename = "PCM")]
    Pcm,
    #[serde(rename = "Float")]
    IeeeFloat,
}

/// Immutable description of a capture sample layout.
///
/// Only three combinations are accepted: 8-bit PCM, 16-bit PCM, and 32-bit
/// IEEE float. Everything else is rejected at construction, including 32-bit
/// integer PCM.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioFormat {
    pub encoding: SampleEncoding,
    pub bits_per_sample: u16,
    pub channels: u16,
    pub sample_rate: u32,
}

impl AudioFormat {
    pub fn new(
        encoding: SampleEncoding,
        bits_per_sample: u16,
        channels: u16,
        sample_rate: u32,
    ) -> Result<Self, StreamError> {
        let format = Self {
            encoding,
            bits_per_sample,
            channels,
            sample_rate,
        };
        format.validate()?;
        Ok(format)
    }

    /// Check the format against the legal capture combinations.
    pub fn validate(&self) -> Result<(), StreamError> {
        let legal = matches!(
            (self.encoding, self.bits_per_sample),
            (SampleEncoding::Pcm, 8) | (SampleEncoding::Pcm, 16) | (SampleEncoding::IeeeFloat, 32)
        );
        if !legal {
            return Err(StreamError::InvalidFormat(format!(
                "unsupported encoding/bit-depth combination: {:?}/{}",
                self.encoding, self.bits_per_sample
            )));
        }
        if self.channels == 0 {
            return Err(StreamError::InvalidFormat(
                "channel count must be at least 1".into(),
            ));
        }
        if self.sample_rate == 0 {
            return Err(StreamError::InvalidFormat(
                "sample rate must be positive".into(),
            ));
        }
        Ok(())
    }

    pub fn bytes_per_sample(&self) -> u16 {
        self.bits_per_sample / 8
    }

    /// Bytes per frame: one sample for every channel.
    pub fn block_align(&self) -> u16 {
        self.channels * self.bytes_per_sample()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_the_three_legal_combinations() {
        for (encoding, bits) in [
            (SampleEncoding::Pcm, 8),
            (SampleEncoding::Pcm, 16),
            (SampleEncoding::IeeeFloat, 32),
        ] {
            assert!(AudioFormat::new(encoding, bits, 2, 44100).is_ok());
        }
    }

    #[test]
    fn rejects_every_other_combination() {
        for (encoding, bits) in [
            (SampleEncoding::Pcm, 24),
            (SampleEncoding::Pcm, 32),
            (SampleEncoding::IeeeFloat, 8),
            (SampleEncoding::IeeeFloat, 16),
            (SampleEncoding::IeeeFloat, 64),
        ] {
            let err = AudioFormat::new(encoding, bits, 2, 44100).unwrap_err();
            assert!(matches!(err, StreamError::InvalidFormat(_)));
        }
    }

    #[test]
    fn rejects_zero_channels_and_zero_rate() {
        assert!(matches!(
            AudioFormat::new(SampleEncoding::Pcm, 16, 0, 44100),
            Err(StreamError::InvalidFormat(_))
        ));
        assert!(matches!(
            AudioFormat::new(SampleEncoding::Pcm, 16, 1, 0),
            Err(StreamError::InvalidFormat(_))
        ));
    }

    #[test]
    fn block_align_is_channels_times_sample_width() {
        let format = AudioFormat::new(SampleEncoding::Pcm, 16, 2, 48000).unwrap();
        assert_eq!(format.bytes_per_sample(), 2);
        assert_eq!(format.block_align(), 4);

        let mono = AudioFormat::new(SampleEncoding::IeeeFloat, 32, 1, 48000).unwrap();
        assert_eq!(mono.block_align(), 4);
    }

    #[test]
    fn wire_shape_field_names() {
        let format = AudioFormat::new(SampleEncoding::Pcm, 16, 1, 44100).unwrap();
        let json = serde_json::to_value(&format).unwrap();
        assert_eq!(json["encoding"], "PCM");
        assert_eq!(json["bitsPerSample"], 16);
        assert_eq!(json["channels"], 1);
        assert_eq!(json["sampleRate"], 44100);

        let float = AudioFormat::new(SampleEncoding::IeeeFloat, 32, 2, 48000).unwrap();
        let json = serde_json::to_value(&float).unwrap();
        assert_eq!(json["encoding"], "Float");
    }
}
