use crate::models::error::StreamError;

/// Event delegate for capture session notifications.
///
/// Both methods are out-calls from the capture thread, a thread the session
/// spawns but whose pacing belongs to the audio subsystem. Handlers execute
/// synchronously and must not block: there is no internal queue, so a slow
/// handler causes frames to be dropped upstream.
pub trait CaptureDelegate: Send + Sync {
    /// Called once per delivered packet, in arrival order.
    ///
    /// `data` is the session's reused scratch buffer; its contents are
    /// undefined after this call returns, so consumers must copy out before
    /// returning.
    fn on_data_available(&self, data: &[u8]);

    /// Called exactly once per session lifetime, when the underlying device
    /// resource is freed: via [`CaptureSession::dispose`] (`error` is
    /// `None`) or external device loss (`error` carries the native failure).
    ///
    /// [`CaptureSession::dispose`]: crate::session::capture::CaptureSession::dispose
    fn on_recording_stopped(&self, error: Option<&StreamError>);
}
