//! Packet acquisition over `IAudioCaptureClient`.

use windows::Win32::Media::Audio::*;

use mp3_stream_core::models::error::StreamError;
use mp3_stream_core::traits::acquisition::{AcquisitionClient, PacketFlags, RawPacket};

/// Acquisition client over a shared-mode WASAPI capture stream.
///
/// Implements the poll/acquire/release protocol on top of
/// `GetNextPacketSize`/`GetBuffer`/`ReleaseBuffer`, tracking the held
/// packet so pairing violations surface as usage errors instead of
/// undefined WASAPI behavior.
pub struct WasapiAcquisitionClient {
    client: IAudioCaptureClient,
    block_align: usize,
    held_frames: Option<u32>,
}

// SAFETY: the capture client is used exclusively from the session's single
// capture thread; the interface was created in the multithreaded apartment.
unsafe impl Send for WasapiAcquisitionClient {}

impl WasapiAcquisitionClient {
    pub(crate) fn new(client: IAudioCaptureClient, block_align: usize) -> Self {
        Self {
            client,
            block_align,
            held_frames: None,
        }
    }
}

fn packet_flags(raw: u32) -> PacketFlags {
    PacketFlags {
        silent: raw & AUDCLNT_BUFFERFLAGS_SILENT.0 as u32 != 0,
        discontinuity: raw & AUDCLNT_BUFFERFLAGS_DATA_DISCONTINUITY.0 as u32 != 0,
        timestamp_error: raw & AUDCLNT_BUFFERFLAGS_TIMESTAMP_ERROR.0 as u32 != 0,
    }
}

impl AcquisitionClient for WasapiAcquisitionClient {
    fn pending_frame_count(&mut self) -> Result<u32, StreamError> {
        let mut packet_length: u32 = 0;
        unsafe {
            self.client
                .GetNextPacketSize(&mut packet_length)
                .map_err(|e| StreamError::NativeCall {
                    call: "IAudioCaptureClient::GetNextPacketSize",
                    status: e.code().0,
                })?;
        }
        Ok(packet_length)
    }

    fn acquire_buffer(&mut self) -> Result<RawPacket<'_>, StreamError> {
        if self.held_frames.is_some() {
            return Err(StreamError::Usage(
                "acquire while a packet is already held".into(),
            ));
        }

        let mut buffer_ptr: *mut u8 = std::ptr::null_mut();
        let mut frames: u32 = 0;
        let mut raw_flags: u32 = 0;
        unsafe {
            self.client
                .GetBuffer(&mut buffer_ptr, &mut frames, &mut raw_flags, None, None)
                .map_err(|e| StreamError::NativeCall {
                    call: "IAudioCaptureClient::GetBuffer",
                    status: e.code().0,
                })?;
        }

        // The device view stays valid until the matching ReleaseBuffer.
        let bytes: &[u8] = if buffer_ptr.is_null() || frames == 0 {
            &[]
        } else {
            unsafe { std::slice::from_raw_parts(buffer_ptr, frames as usize * self.block_align) }
        };

        self.held_frames = Some(frames);
        Ok(RawPacket {
            bytes,
            frames,
            flags: packet_flags(raw_flags),
        })
    }

    fn release_buffer(&mut self, frames_consumed: u32) -> Result<(), StreamError> {
        let held = self
            .held_frames
            .take()
            .ok_or_else(|| StreamError::Usage("release without a matching acquire".into()))?;
        if held != frames_consumed {
            self.held_frames = Some(held);
            return Err(StreamError::Usage(format!(
                "released {} frames but {} were acquired",
                frames_consumed, held
            )));
        }
        unsafe {
            self.client
                .ReleaseBuffer(frames_consumed)
                .map_err(|e| StreamError::NativeCall {
                    call: "IAudioCaptureClient::ReleaseBuffer",
                    status: e.code().0,
                })
        }
    }
}
