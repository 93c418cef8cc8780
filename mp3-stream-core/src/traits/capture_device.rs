use crate::models::error::StreamError;
use crate::models::format::AudioFormat;
use crate::traits::acquisition::AcquisitionClient;

/// Platform seam over a native capture device handle.
///
/// Implemented by `WasapiCaptureDevice` (Windows) and by scripted mocks in
/// tests. [`CaptureSession`] owns the implementation exclusively and
/// guarantees [`free`] runs exactly once on every exit path.
///
/// [`CaptureSession`]: crate::session::capture::CaptureSession
/// [`free`]: CaptureDevice::free
pub trait CaptureDevice: Send {
    type Client: AcquisitionClient + 'static;

    /// Open the device for recording with the given format and select it as
    /// the current endpoint, leaving it paused.
    fn initialize(&mut self, format: &AudioFormat) -> Result<(), StreamError>;

    /// Begin delivering packets to the acquisition client.
    fn start(&mut self) -> Result<(), StreamError>;

    /// Pause packet delivery without releasing the device.
    fn stop(&mut self) -> Result<(), StreamError>;

    /// The acquisition client for the initialized device. Called once per
    /// [`start`]; the client moves onto the capture thread.
    ///
    /// [`start`]: CaptureDevice::start
    fn acquisition_client(&mut self) -> Result<Self::Client, StreamError>;

    /// Release the native handle and all device resources.
    fn free(&mut self) -> Result<(), StreamError>;
}
