//! WASAPI capture endpoint handle.
//!
//! Opens a capture endpoint in shared mode with the exact format the
//! session negotiated and hands out an acquisition client over
//! `IAudioCaptureClient`.

use windows::core::PCWSTR;
use windows::Win32::Media::Audio::*;
use windows::Win32::System::Com::*;

use mp3_stream_core::models::device::DeviceSelector;
use mp3_stream_core::models::error::StreamError;
use mp3_stream_core::models::format::{AudioFormat, SampleEncoding};
use mp3_stream_core::traits::capture_device::CaptureDevice;

use crate::acquisition::WasapiAcquisitionClient;

/// WAVEFORMATEX format tags for the supported encodings.
const TAG_PCM: u16 = 1;
const TAG_IEEE_FLOAT: u16 = 3;

/// Shared-mode buffer duration in 100-nanosecond units (100ms).
const BUFFER_DURATION: i64 = 1_000_000;

/// WASAPI capture endpoint, default or by MMDevice id.
///
/// The endpoint is resolved and the audio client initialized in
/// [`CaptureDevice::initialize`]; `free` drops every COM reference exactly
/// once. Start/stop map to `IAudioClient::Start`/`Stop`.
pub struct WasapiCaptureDevice {
    selector: DeviceSelector,
    audio_client: Option<IAudioClient>,
    block_align: u16,
    _com_guard: Option<CoUninitializeGuard>,
}

// SAFETY: COM objects are created under COINIT_MULTITHREADED and every
// interface is used from one thread at a time: the audio client from the
// session's control thread, the capture client from the capture thread.
unsafe impl Send for WasapiCaptureDevice {}

impl WasapiCaptureDevice {
    pub fn new(selector: DeviceSelector) -> Self {
        Self {
            selector,
            audio_client: None,
            block_align: 0,
            _com_guard: None,
        }
    }

    fn resolve_endpoint(&self) -> Result<IMMDevice, StreamError> {
        unsafe {
            let enumerator: IMMDeviceEnumerator =
                CoCreateInstance(&MMDeviceEnumerator, None, CLSCTX_ALL).map_err(|e| {
                    StreamError::Initialization(format!("failed to create device enumerator: {}", e))
                })?;

            match &self.selector {
                DeviceSelector::Default => enumerator
                    .GetDefaultAudioEndpoint(eCapture, eConsole)
                    .map_err(|e| {
                        StreamError::Initialization(format!("no default capture endpoint: {}", e))
                    }),
                DeviceSelector::Id(id) => {
                    let wide_id: Vec<u16> = id.encode_utf16().chain(std::iter::once(0)).collect();
                    enumerator.GetDevice(PCWSTR(wide_id.as_ptr())).map_err(|e| {
                        StreamError::Initialization(format!("capture endpoint {} not found: {}", id, e))
                    })
                }
            }
        }
    }
}

/// Build the shared-mode wave format for one of the three legal capture
/// formats.
fn wave_format(format: &AudioFormat) -> WAVEFORMATEX {
    let tag = match format.encoding {
        SampleEncoding::Pcm => TAG_PCM,
        SampleEncoding::IeeeFloat => TAG_IEEE_FLOAT,
    };
    let block_align = format.block_align();
    WAVEFORMATEX {
        wFormatTag: tag,
        nChannels: format.channels,
        nSamplesPerSec: format.sample_rate,
        nAvgBytesPerSec: format.sample_rate * block_align as u32,
        nBlockAlign: block_align,
        wBitsPerSample: format.bits_per_sample,
        cbSize: 0,
    }
}

impl CaptureDevice for WasapiCaptureDevice {
    type Client = WasapiAcquisitionClient;

    fn initialize(&mut self, format: &AudioFormat) -> Result<(), StreamError> {
        unsafe {
            CoInitializeEx(None, COINIT_MULTITHREADED)
                .ok()
                .map_err(|e| StreamError::Initialization(format!("CoInitializeEx failed: {}", e)))?;
            self._com_guard = Some(CoUninitializeGuard);

            let endpoint = self.resolve_endpoint()?;
            let audio_client: IAudioClient = endpoint.Activate(CLSCTX_ALL, None).map_err(|e| {
                StreamError::Initialization(format!("IAudioClient activation failed: {}", e))
            })?;

            let wf = wave_format(format);
            audio_client
                .Initialize(
                    AUDCLNT_SHAREMODE_SHARED,
                    AUDCLNT_STREAMFLAGS_NOPERSIST,
                    BUFFER_DURATION,
                    0,
                    &wf,
                    None,
                )
                .map_err(|e| {
                    StreamError::Initialization(format!("IAudioClient::Initialize failed: {}", e))
                })?;

            self.block_align = format.block_align();
            self.audio_client = Some(audio_client);
        }
        log::info!(
            "initialized WASAPI capture endpoint ({:?}, {} Hz, {} ch)",
            format.encoding,
            format.sample_rate,
            format.channels
        );
        Ok(())
    }

    fn start(&mut self) -> Result<(), StreamError> {
        let client = self.audio_client.as_ref().ok_or_else(|| {
            StreamError::Usage("start called before the device was initialized".into())
        })?;
        unsafe {
            client.Start().map_err(|e| StreamError::NativeCall {
                call: "IAudioClient::Start",
                status: e.code().0,
            })
        }
    }

    fn stop(&mut self) -> Result<(), StreamError> {
        let client = self.audio_client.as_ref().ok_or_else(|| {
            StreamError::Usage("stop called before the device was initialized".into())
        })?;
        unsafe {
            client.Stop().map_err(|e| StreamError::NativeCall {
                call: "IAudioClient::Stop",
                status: e.code().0,
            })
        }
    }

    fn acquisition_client(&mut self) -> Result<Self::Client, StreamError> {
        let client = self.audio_client.as_ref().ok_or_else(|| {
            StreamError::Usage("acquisition client requested before initialization".into())
        })?;
        let capture_client: IAudioCaptureClient = unsafe {
            client.GetService().map_err(|e| StreamError::NativeCall {
                call: "IAudioClient::GetService",
                status: e.code().0,
            })?
        };
        Ok(WasapiAcquisitionClient::new(
            capture_client,
            self.block_align as usize,
        ))
    }

    fn free(&mut self) -> Result<(), StreamError> {
        // Dropping the COM references releases the endpoint.
        self.audio_client = None;
        Ok(())
    }
}

/// RAII guard to call CoUninitialize when dropped.
struct CoUninitializeGuard;

impl Drop for CoUninitializeGuard {
    fn drop(&mut self) {
        unsafe {
            CoUninitialize();
        }
    }
}
