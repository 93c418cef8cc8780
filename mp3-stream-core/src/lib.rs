//! # mp3-stream-core
//!
//! Platform-agnostic live-audio streaming core.
//!
//! Pulls fixed-format raw frames from a capture device, re-publishes them
//! as delegate events, and compresses them on the fly into a raw MP3
//! elementary stream through a dynamically bound codec. No container, no
//! whole-session buffering. Platform backends (Windows WASAPI) implement
//! the `CaptureDevice`/`AcquisitionClient` traits and plug into the generic
//! `CaptureSession`.
//!
//! ## Architecture
//!
//! ```text
//! mp3-stream-core (this crate)
//! ├── traits/       ← AcquisitionClient, CaptureDevice, CaptureDelegate
//! ├── models/       ← StreamError, AudioFormat, EncoderConfig, DeviceSelector
//! ├── processing/   ← ScratchBuffer (growable reusable byte region)
//! ├── session/      ← CaptureSession (generic capture orchestrator)
//! └── encoder/      ← StreamingEncoder + dynamic LAME binding
//! ```
//!
//! Data flow: device → acquisition client → `CaptureSession` (copies each
//! packet into its reused scratch buffer) → `on_data_available` → the
//! consumer feeds `StreamingEncoder::encode` → compressed bytes. Session
//! and encoder are independent; the surrounding application wires them
//! together.

pub mod encoder;
pub mod models;
pub mod processing;
pub mod session;
pub mod traits;

// Re-export key types at crate root for convenience.
pub use encoder::stream::{CodecBinding, Mp3StreamFormat, StreamingEncoder};
pub use models::config::{EncoderConfig, SUPPORTED_BIT_RATES};
pub use models::device::DeviceSelector;
pub use models::error::StreamError;
pub use models::format::{AudioFormat, SampleEncoding};
pub use processing::scratch::ScratchBuffer;
pub use session::capture::CaptureSession;
pub use traits::acquisition::{AcquisitionClient, PacketFlags, RawPacket};
pub use traits::capture_delegate::CaptureDelegate;
pub use traits::capture_device::CaptureDevice;
