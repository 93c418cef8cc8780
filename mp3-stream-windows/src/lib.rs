//! # mp3-stream-windows
//!
//! Windows WASAPI backend for mp3-stream.
//!
//! Provides:
//! - `WasapiCaptureDevice` — capture endpoint handle implementing `CaptureDevice`
//! - `WasapiAcquisitionClient` — packet acquisition over `IAudioCaptureClient`
//!
//! ## Platform Requirements
//! - Windows 10+ with a shared-mode WASAPI capture endpoint
//! - Visual Studio Build Tools + Windows SDK for linking
//!
//! ## Usage
//! ```ignore
//! use mp3_stream_core::{AudioFormat, CaptureSession, DeviceSelector, SampleEncoding};
//! use mp3_stream_windows::WasapiCaptureDevice;
//!
//! let device = WasapiCaptureDevice::new(DeviceSelector::Default);
//! let format = AudioFormat::new(SampleEncoding::Pcm, 16, 1, 44100)?;
//! let mut session = CaptureSession::new(device, format, delegate)?;
//! session.start()?;
//! ```

#[cfg(target_os = "windows")]
pub mod acquisition;
#[cfg(target_os = "windows")]
pub mod wasapi_device;

#[cfg(target_os = "windows")]
pub use acquisition::WasapiAcquisitionClient;
#[cfg(target_os = "windows")]
pub use wasapi_device::WasapiCaptureDevice;
