use std::path::Path;

use serde::Serialize;

use crate::encoder::ffi;
use crate::models::config::EncoderConfig;
use crate::models::error::StreamError;
use crate::processing::scratch::ScratchBuffer;

/// Bytes per source sample: interleaved little-endian 16-bit PCM.
const BYTES_PER_SAMPLE: usize = 2;

/// Vendor-documented worst-case slack for one encode call, in bytes.
const WORST_CASE_SLACK: usize = 7200;

/// Derived description of the compressed output stream.
///
/// Downstream muxing needs the frame size and encoder delay; the encoder
/// itself never writes any container header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Mp3StreamFormat {
    pub sample_rate: u32,
    pub channels: u16,
    pub bit_rate_kbps: u32,
    /// Samples per MP3 frame as negotiated by the codec.
    pub frame_size: u32,
    /// Priming samples the codec inserts before the first real output.
    pub encoder_delay: u32,
}

/// Seam between the encoder state machine and a bound codec instance.
///
/// The production implementation is [`LameBinding`] over the dynamically
/// loaded library; tests inject scripted mocks. Implementations release
/// their native instance exactly once, in `Drop`.
///
/// [`LameBinding`]: crate::encoder::ffi::LameBinding
pub trait CodecBinding: Send {
    fn stream_format(&self) -> Mp3StreamFormat;

    /// Encode interleaved 16-bit samples into `destination`, returning the
    /// number of compressed bytes written.
    fn encode_interleaved(
        &mut self,
        samples: &[i16],
        destination: &mut [u8],
    ) -> Result<usize, StreamError>;

    /// Finalize internal codec state and emit trailing bytes.
    fn flush(&mut self, destination: &mut [u8]) -> Result<usize, StreamError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EncoderState {
    Prepared,
    Encoding,
    Finished,
}

/// Streaming MP3 encoder over a dynamically bound codec.
///
/// Converts raw PCM chunks to compressed bytes through a caller-sized output
/// buffer, many small calls at a time, without buffering the stream. Calls
/// are not reentrant: `&mut self` enforces the one-in-flight-call-per-
/// instance discipline at compile time, so no internal lock is taken.
pub struct StreamingEncoder {
    binding: Box<dyn CodecBinding>,
    format: Mp3StreamFormat,
    state: EncoderState,
    sample_scratch: Vec<i16>,
}

impl std::fmt::Debug for StreamingEncoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamingEncoder")
            .field("format", &self.format)
            .field("state", &self.state)
            .field("sample_scratch", &self.sample_scratch)
            .finish_non_exhaustive()
    }
}

impl StreamingEncoder {
    /// Explicitly bind a codec library. Process-wide and idempotent by
    /// resolved library name; a second load of the same name is a no-op.
    pub fn load_library(path: impl AsRef<Path>) -> Result<(), StreamError> {
        ffi::load(path.as_ref()).map(|_| ())
    }

    /// Construct and prepare an encoder.
    ///
    /// The output bit rate is validated against the supported set before
    /// any native binding happens; an unsupported rate fails with
    /// [`StreamError::InvalidFormat`] without touching the library. If no
    /// library was explicitly loaded, the platform/bitness default name is
    /// resolved relative to the working directory and loaded now.
    pub fn new(channels: u16, sample_rate: u32, bit_rate_kbps: u32) -> Result<Self, StreamError> {
        let config = EncoderConfig::new(channels, sample_rate, bit_rate_kbps)?;
        let library = ffi::active_or_default()?;
        let binding = ffi::LameBinding::new(library, &config)?;
        Ok(Self::with_binding(Box::new(binding)))
    }

    /// Wrap an already-prepared codec binding. The seam for tests and for
    /// codecs bound by other means.
    pub fn with_binding(binding: Box<dyn CodecBinding>) -> Self {
        let format = binding.stream_format();
        Self {
            binding,
            format,
            state: EncoderState::Prepared,
            sample_scratch: Vec::new(),
        }
    }

    /// The negotiated output stream description.
    pub fn stream_format(&self) -> Mp3StreamFormat {
        self.format
    }

    /// The output is a raw elementary stream; no container header is ever
    /// required or written.
    pub fn requires_container_header(&self) -> bool {
        false
    }

    /// Worst-case compressed size of one encode call over
    /// `source_byte_count` input bytes: `ceil(1.25 * samples) + 7200` with
    /// `samples = source_byte_count / 2`.
    pub fn required_capacity(source_byte_count: usize) -> usize {
        (source_byte_count * 5).div_ceil(8) + WORST_CASE_SLACK
    }

    /// Grow `buffer` to hold the worst-case output of one encode call over
    /// `source_byte_count` input bytes. No-op if already large enough;
    /// otherwise doubling growth, contents not preserved.
    pub fn ensure_buffer_capacity(buffer: &mut ScratchBuffer, source_byte_count: usize) {
        buffer.ensure_capacity(Self::required_capacity(source_byte_count));
    }

    /// Encode one chunk of interleaved little-endian 16-bit PCM into
    /// `destination`, returning the compressed byte count (possibly zero
    /// while the codec accumulates a frame).
    ///
    /// `source` is consumed whole; slice it for offsets. Its length must be
    /// a multiple of 2; the byte count is converted to a sample count by
    /// dividing by 2 before delegating to the codec.
    pub fn encode(&mut self, source: &[u8], destination: &mut [u8]) -> Result<usize, StreamError> {
        if self.state == EncoderState::Finished {
            return Err(StreamError::Usage("encode called after flush".into()));
        }
        if source.len() % BYTES_PER_SAMPLE != 0 {
            return Err(StreamError::Usage(format!(
                "source length {} is not a multiple of the 2-byte sample size",
                source.len()
            )));
        }

        self.sample_scratch.clear();
        self.sample_scratch.extend(
            source
                .chunks_exact(BYTES_PER_SAMPLE)
                .map(|pair| i16::from_le_bytes([pair[0], pair[1]])),
        );

        let written = self
            .binding
            .encode_interleaved(&self.sample_scratch, destination)?;
        self.state = EncoderState::Encoding;
        Ok(written)
    }

    /// Emit trailing bytes and finish the stream. Further `encode` or
    /// `flush` calls are usage errors.
    pub fn flush(&mut self, destination: &mut [u8]) -> Result<usize, StreamError> {
        if self.state == EncoderState::Finished {
            return Err(StreamError::Usage("stream already flushed".into()));
        }
        let written = self.binding.flush(destination)?;
        self.state = EncoderState::Finished;
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::Arc;

    struct MockCodec {
        format: Mp3StreamFormat,
        /// Samples handed to the codec across all calls, in call order.
        seen: Arc<Mutex<Vec<Vec<i16>>>>,
        bytes_per_call: usize,
        flush_bytes: usize,
    }

    impl MockCodec {
        fn new() -> Self {
            Self {
                format: Mp3StreamFormat {
                    sample_rate: 44100,
                    channels: 2,
                    bit_rate_kbps: 160,
                    frame_size: 1152,
                    encoder_delay: 576,
                },
                seen: Arc::new(Mutex::new(Vec::new())),
                bytes_per_call: 417,
                flush_bytes: 32,
            }
        }
    }

    impl CodecBinding for MockCodec {
        fn stream_format(&self) -> Mp3StreamFormat {
            self.format
        }

        fn encode_interleaved(
            &mut self,
            samples: &[i16],
            destination: &mut [u8],
        ) -> Result<usize, StreamError> {
            self.seen.lock().push(samples.to_vec());
            let written = self.bytes_per_call.min(destination.len());
            destination[..written].fill(0x11);
            Ok(written)
        }

        fn flush(&mut self, destination: &mut [u8]) -> Result<usize, StreamError> {
            let written = self.flush_bytes.min(destination.len());
            destination[..written].fill(0x22);
            Ok(written)
        }
    }

    #[test]
    fn three_chunks_then_flush() {
        let mut encoder = StreamingEncoder::with_binding(Box::new(MockCodec::new()));

        let mut destination = ScratchBuffer::new();
        StreamingEncoder::ensure_buffer_capacity(&mut destination, 4096);
        let capacity = destination.capacity();
        assert!(capacity >= StreamingEncoder::required_capacity(4096));

        let chunk = vec![0u8; 4096];
        let mut total = 0;
        for _ in 0..3 {
            let written = encoder.encode(&chunk, destination.as_mut_slice()).unwrap();
            assert!(written <= capacity);
            total += written;
        }
        total += encoder.flush(destination.as_mut_slice()).unwrap();
        assert!(total > 0);
    }

    #[test]
    fn byte_count_becomes_sample_count() {
        let mock = MockCodec::new();
        let seen = Arc::clone(&mock.seen);
        let mut encoder = StreamingEncoder::with_binding(Box::new(mock));

        let mut destination = vec![0u8; 16384];
        encoder.encode(&[0u8; 4096], &mut destination).unwrap();
        encoder.encode(&[0u8; 6], &mut destination).unwrap();

        let counts: Vec<usize> = seen.lock().iter().map(|call| call.len()).collect();
        assert_eq!(counts, vec![2048, 3]);
    }

    #[test]
    fn samples_are_decoded_little_endian() {
        let mock = MockCodec::new();
        let seen = Arc::clone(&mock.seen);
        let mut encoder = StreamingEncoder::with_binding(Box::new(mock));

        let mut destination = vec![0u8; 512];
        // 0x0102 and -2, little-endian byte order.
        encoder
            .encode(&[0x02, 0x01, 0xFE, 0xFF], &mut destination)
            .unwrap();

        assert_eq!(seen.lock().as_slice(), &[vec![0x0102i16, -2]]);
    }

    #[test]
    fn odd_source_length_is_a_usage_error() {
        let mut encoder = StreamingEncoder::with_binding(Box::new(MockCodec::new()));
        let mut destination = vec![0u8; 512];
        let err = encoder.encode(&[0u8; 3], &mut destination).unwrap_err();
        assert!(matches!(err, StreamError::Usage(_)));
    }

    #[test]
    fn encode_after_flush_is_a_usage_error() {
        let mut encoder = StreamingEncoder::with_binding(Box::new(MockCodec::new()));
        let mut destination = vec![0u8; 16384];

        encoder.encode(&[0u8; 512], &mut destination).unwrap();
        encoder.flush(&mut destination).unwrap();

        let err = encoder.encode(&[0u8; 512], &mut destination).unwrap_err();
        assert!(matches!(err, StreamError::Usage(_)));
        let err = encoder.flush(&mut destination).unwrap_err();
        assert!(matches!(err, StreamError::Usage(_)));
    }

    #[test]
    fn unsupported_bit_rate_fails_before_any_binding() {
        // 100 kbps is not in the supported set; the error must be the
        // format rejection, not a library-load failure.
        let err = StreamingEncoder::new(2, 44100, 100).unwrap_err();
        assert!(matches!(err, StreamError::InvalidFormat(_)));
    }

    #[test]
    fn required_capacity_formula() {
        assert_eq!(StreamingEncoder::required_capacity(0), 7200);
        // 4096 bytes -> 2048 samples -> ceil(2560) + 7200
        assert_eq!(StreamingEncoder::required_capacity(4096), 9760);
        // Non-multiple-of-8 byte counts round up.
        assert_eq!(StreamingEncoder::required_capacity(2), 7202);
        assert_eq!(StreamingEncoder::required_capacity(3), 7202);
    }

    #[test]
    fn required_capacity_is_monotone() {
        let mut last = 0;
        for n in 0..2048 {
            let required = StreamingEncoder::required_capacity(n);
            assert!(required >= last);
            last = required;
        }
    }

    #[test]
    fn ensure_buffer_capacity_never_shrinks() {
        let mut buffer = ScratchBuffer::new();
        StreamingEncoder::ensure_buffer_capacity(&mut buffer, 100_000);
        let grown = buffer.capacity();

        StreamingEncoder::ensure_buffer_capacity(&mut buffer, 16);
        assert_eq!(buffer.capacity(), grown);
    }

    #[test]
    fn no_container_header() {
        let encoder = StreamingEncoder::with_binding(Box::new(MockCodec::new()));
        assert!(!encoder.requires_container_header());
    }

    #[test]
    fn stream_format_comes_from_the_binding() {
        let encoder = StreamingEncoder::with_binding(Box::new(MockCodec::new()));
        let format = encoder.stream_format();
        assert_eq!(format.frame_size, 1152);
        assert_eq!(format.encoder_delay, 576);
        assert_eq!(format.bit_rate_kbps, 160);
    }
}
