use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use parking_lot::Mutex;

use crate::models::error::StreamError;
use crate::models::format::AudioFormat;
use crate::processing::scratch::ScratchBuffer;
use crate::traits::acquisition::AcquisitionClient;
use crate::traits::capture_delegate::CaptureDelegate;
use crate::traits::capture_device::CaptureDevice;

/// Pacing of the acquisition poll when no packets are pending.
const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Live binding to a capture device.
///
/// Owns the device handle exclusively and re-publishes every delivered
/// packet and the terminal stopped condition as [`CaptureDelegate`] events.
/// The format is validated at construction and fixed for the session
/// lifetime; the native handle is freed exactly once, on [`dispose`] or on
/// drop.
///
/// There is no internal queue between the device and the delegate: a packet
/// is copied into the session's reused scratch buffer, released back to the
/// device, and handed to the delegate on the capture thread. A handler that
/// blocks causes the device to drop frames upstream.
///
/// [`dispose`]: CaptureSession::dispose
pub struct CaptureSession<D: CaptureDevice> {
    device: D,
    format: AudioFormat,
    delegate: Arc<dyn CaptureDelegate>,
    running: Arc<AtomicBool>,
    stopped_fired: Arc<AtomicBool>,
    capture_handle: Mutex<Option<thread::JoinHandle<()>>>,
    disposed: bool,
}

impl<D: CaptureDevice> std::fmt::Debug for CaptureSession<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CaptureSession")
            .field("format", &self.format)
            .field("running", &self.running)
            .field("stopped_fired", &self.stopped_fired)
            .field("disposed", &self.disposed)
            .finish_non_exhaustive()
    }
}

impl<D: CaptureDevice> CaptureSession<D> {
    /// Validate `format`, open `device` for recording with it, and select it
    /// as the current endpoint, paused pending an explicit [`start`].
    ///
    /// Fails with [`StreamError::InvalidFormat`] for anything but the three
    /// legal capture formats; device open failures propagate synchronously
    /// and no event ever fires for a session that failed to construct.
    ///
    /// [`start`]: CaptureSession::start
    pub fn new(
        mut device: D,
        format: AudioFormat,
        delegate: Arc<dyn CaptureDelegate>,
    ) -> Result<Self, StreamError> {
        format.validate()?;
        device.initialize(&format)?;
        Ok(Self {
            device,
            format,
            delegate,
            running: Arc::new(AtomicBool::new(false)),
            stopped_fired: Arc::new(AtomicBool::new(false)),
            capture_handle: Mutex::new(None),
            disposed: false,
        })
    }

    pub fn format(&self) -> &AudioFormat {
        &self.format
    }

    /// Begin delivering packets. Idempotent if already started.
    pub fn start(&mut self) -> Result<(), StreamError> {
        self.ensure_live()?;
        if self.running.load(Ordering::SeqCst) {
            return Ok(());
        }

        self.device.start()?;
        let client = self.device.acquisition_client()?;

        self.running.store(true, Ordering::SeqCst);
        let running = Arc::clone(&self.running);
        let stopped = Arc::clone(&self.stopped_fired);
        let delegate = Arc::clone(&self.delegate);

        let handle = thread::Builder::new()
            .name("audio-capture".into())
            .spawn(move || {
                capture_loop(running, client, delegate, stopped);
            })
            .map_err(|e| {
                StreamError::Initialization(format!("failed to spawn capture thread: {}", e))
            })?;

        *self.capture_handle.lock() = Some(handle);
        Ok(())
    }

    /// Pause delivery. The device stays open and the session can be started
    /// again.
    pub fn stop(&mut self) -> Result<(), StreamError> {
        self.ensure_live()?;
        if !self.running.swap(false, Ordering::SeqCst) {
            return Ok(());
        }
        if let Some(handle) = self.capture_handle.lock().take() {
            let _ = handle.join();
        }
        self.device.stop()
    }

    /// Release the native handle and all device resources, then fire
    /// `on_recording_stopped(None)` unless the stopped notification already
    /// fired (external device loss).
    ///
    /// A second call is a [`StreamError::Usage`] error, not a silent no-op.
    pub fn dispose(&mut self) -> Result<(), StreamError> {
        if self.disposed {
            return Err(StreamError::Usage("session already disposed".into()));
        }
        self.disposed = true;

        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.capture_handle.lock().take() {
            let _ = handle.join();
        }
        let _ = self.device.stop();
        self.device.free()?;

        fire_stopped(&self.stopped_fired, self.delegate.as_ref(), None);
        Ok(())
    }

    fn ensure_live(&self) -> Result<(), StreamError> {
        if self.disposed {
            return Err(StreamError::Usage("session already disposed".into()));
        }
        Ok(())
    }
}

impl<D: CaptureDevice> Drop for CaptureSession<D> {
    fn drop(&mut self) {
        if self.disposed {
            return;
        }
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.capture_handle.lock().take() {
            let _ = handle.join();
        }
        let _ = self.device.stop();
        if let Err(e) = self.device.free() {
            log::error!("failed to free capture device: {}", e);
        }
        fire_stopped(&self.stopped_fired, self.delegate.as_ref(), None);
    }
}

/// Fire the stopped notification at most once per session lifetime.
fn fire_stopped(fired: &AtomicBool, delegate: &dyn CaptureDelegate, error: Option<&StreamError>) {
    if !fired.swap(true, Ordering::SeqCst) {
        delegate.on_recording_stopped(error);
    }
}

/// Capture loop running on the session's capture thread.
///
/// Drains the acquisition client whenever the device reports pending
/// frames: acquire, copy into the scratch buffer, release, publish. Any
/// native failure ends the loop and fires the stopped notification with the
/// error, since the subsystem has torn the stream down underneath us.
fn capture_loop<C: AcquisitionClient>(
    running: Arc<AtomicBool>,
    mut client: C,
    delegate: Arc<dyn CaptureDelegate>,
    stopped: Arc<AtomicBool>,
) {
    let mut scratch = ScratchBuffer::new();

    while running.load(Ordering::SeqCst) {
        thread::sleep(POLL_INTERVAL);

        loop {
            let pending = match client.pending_frame_count() {
                Ok(n) => n,
                Err(e) => return fail(&running, &stopped, delegate.as_ref(), e),
            };
            if pending == 0 {
                break;
            }

            let (len, frames) = match client.acquire_buffer() {
                Ok(packet) => {
                    let len = packet.bytes.len();
                    scratch.ensure_capacity(len);
                    if packet.flags.silent {
                        scratch.fill_zero(len);
                    } else {
                        scratch.as_mut_slice()[..len].copy_from_slice(packet.bytes);
                    }
                    (len, packet.frames)
                }
                Err(e) => return fail(&running, &stopped, delegate.as_ref(), e),
            };

            if let Err(e) = client.release_buffer(frames) {
                return fail(&running, &stopped, delegate.as_ref(), e);
            }

            delegate.on_data_available(&scratch.as_slice()[..len]);
        }
    }
}

fn fail(running: &AtomicBool, stopped: &AtomicBool, delegate: &dyn CaptureDelegate, error: StreamError) {
    log::error!("capture stream lost: {}", error);
    running.store(false, Ordering::SeqCst);
    fire_stopped(stopped, delegate, Some(&error));
}
