use crate::models::error::StreamError;

/// Status flags attached to a delivered capture buffer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PacketFlags {
    /// The buffer contains silence; its bytes should be treated as zero.
    pub silent: bool,
    /// The device reported a glitch before this buffer.
    pub discontinuity: bool,
    /// The device timestamp for this buffer is unreliable.
    pub timestamp_error: bool,
}

/// One capture buffer as delivered by the device.
///
/// The view is valid only until the matching [`AcquisitionClient::release_buffer`]
/// call; it must be copied out before release.
#[derive(Debug)]
pub struct RawPacket<'a> {
    pub bytes: &'a [u8],
    pub frames: u32,
    pub flags: PacketFlags,
}

/// Low-level packet acquisition protocol over a capture client.
///
/// Callers must poll in a tight loop: while [`pending_frame_count`] is
/// non-zero, acquire, process, release. Never call [`acquire_buffer`]
/// speculatively when the pending count is zero. Every successful acquire
/// must be paired with exactly one release carrying the acquired frame count
/// before the next acquire; partial consumption is not supported.
///
/// The client does not own the device itself; the session does.
///
/// [`pending_frame_count`]: AcquisitionClient::pending_frame_count
/// [`acquire_buffer`]: AcquisitionClient::acquire_buffer
pub trait AcquisitionClient: Send {
    /// Frames currently queued by the device. Zero means no packet is ready.
    fn pending_frame_count(&mut self) -> Result<u32, StreamError>;

    /// Acquire the next packet. Fails with [`StreamError::NativeCall`] if the
    /// underlying device call fails, or [`StreamError::Usage`] if a packet is
    /// already held.
    fn acquire_buffer(&mut self) -> Result<RawPacket<'_>, StreamError>;

    /// Release the held packet. `frames_consumed` must equal the frame count
    /// returned by the matching acquire. Releasing without a held packet, or
    /// twice, is a [`StreamError::Usage`] error.
    fn release_buffer(&mut self, frames_consumed: u32) -> Result<(), StreamError>;
}
