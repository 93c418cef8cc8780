//! Dynamic binding to the LAME codec library.
//!
//! The library is resolved and its entry points bound once per distinct
//! resolved name, cached in a process-wide registry. Each encoder instance
//! then owns one codec handle created from the shared binding table.

use std::collections::HashMap;
use std::ffi::{c_int, c_void, OsString};
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

use libloading::Library;
use parking_lot::Mutex;

use crate::encoder::stream::{CodecBinding, Mp3StreamFormat};
use crate::models::config::EncoderConfig;
use crate::models::error::StreamError;

/// Opaque `lame_t` handle.
type LameHandle = *mut c_void;

/// MPEG mode constants from lame.h.
const MODE_JOINT_STEREO: c_int = 1;
const MODE_MONO: c_int = 3;

/// Bound entry points of one loaded codec library.
///
/// Function pointers are dereferenced out of the `libloading` symbols at
/// load time, so the `Library` only needs to stay alive, not be re-queried.
#[derive(Debug)]
pub struct LameLibrary {
    _lib: Library,
    init: unsafe extern "C" fn() -> LameHandle,
    set_in_samplerate: unsafe extern "C" fn(LameHandle, c_int) -> c_int,
    set_num_channels: unsafe extern "C" fn(LameHandle, c_int) -> c_int,
    set_brate: unsafe extern "C" fn(LameHandle, c_int) -> c_int,
    set_mode: unsafe extern "C" fn(LameHandle, c_int) -> c_int,
    init_params: unsafe extern "C" fn(LameHandle) -> c_int,
    get_framesize: unsafe extern "C" fn(LameHandle) -> c_int,
    get_encoder_delay: unsafe extern "C" fn(LameHandle) -> c_int,
    encode_buffer:
        unsafe extern "C" fn(LameHandle, *const i16, *const i16, c_int, *mut u8, c_int) -> c_int,
    encode_buffer_interleaved:
        unsafe extern "C" fn(LameHandle, *const i16, c_int, *mut u8, c_int) -> c_int,
    encode_flush: unsafe extern "C" fn(LameHandle, *mut u8, c_int) -> c_int,
    close: unsafe extern "C" fn(LameHandle) -> c_int,
}

// SAFETY: the library handle and raw function pointers carry no thread-local
// state; per-handle state lives in LameBinding, which is single-owner.
unsafe impl Send for LameLibrary {}
unsafe impl Sync for LameLibrary {}

fn missing(symbol: &'static str, err: libloading::Error) -> StreamError {
    StreamError::LibraryLoad(format!("missing symbol {}: {}", symbol, err))
}

impl LameLibrary {
    fn open(path: &Path) -> Result<Self, StreamError> {
        unsafe {
            let lib = Library::new(path)
                .map_err(|e| StreamError::LibraryLoad(format!("{}: {}", path.display(), e)))?;

            let init = *lib
                .get::<unsafe extern "C" fn() -> LameHandle>(b"lame_init\0")
                .map_err(|e| missing("lame_init", e))?;
            let set_in_samplerate = *lib
                .get::<unsafe extern "C" fn(LameHandle, c_int) -> c_int>(b"lame_set_in_samplerate\0")
                .map_err(|e| missing("lame_set_in_samplerate", e))?;
            let set_num_channels = *lib
                .get::<unsafe extern "C" fn(LameHandle, c_int) -> c_int>(b"lame_set_num_channels\0")
                .map_err(|e| missing("lame_set_num_channels", e))?;
            let set_brate = *lib
                .get::<unsafe extern "C" fn(LameHandle, c_int) -> c_int>(b"lame_set_brate\0")
                .map_err(|e| missing("lame_set_brate", e))?;
            let set_mode = *lib
                .get::<unsafe extern "C" fn(LameHandle, c_int) -> c_int>(b"lame_set_mode\0")
                .map_err(|e| missing("lame_set_mode", e))?;
            let init_params = *lib
                .get::<unsafe extern "C" fn(LameHandle) -> c_int>(b"lame_init_params\0")
                .map_err(|e| missing("lame_init_params", e))?;
            let get_framesize = *lib
                .get::<unsafe extern "C" fn(LameHandle) -> c_int>(b"lame_get_framesize\0")
                .map_err(|e| missing("lame_get_framesize", e))?;
            let get_encoder_delay = *lib
                .get::<unsafe extern "C" fn(LameHandle) -> c_int>(b"lame_get_encoder_delay\0")
                .map_err(|e| missing("lame_get_encoder_delay", e))?;
            let encode_buffer = *lib
                .get::<unsafe extern "C" fn(
                    LameHandle,
                    *const i16,
                    *const i16,
                    c_int,
                    *mut u8,
                    c_int,
                ) -> c_int>(b"lame_encode_buffer\0")
                .map_err(|e| missing("lame_encode_buffer", e))?;
            let encode_buffer_interleaved = *lib
                .get::<unsafe extern "C" fn(LameHandle, *const i16, c_int, *mut u8, c_int) -> c_int>(
                    b"lame_encode_buffer_interleaved\0",
                )
                .map_err(|e| missing("lame_encode_buffer_interleaved", e))?;
            let encode_flush = *lib
                .get::<unsafe extern "C" fn(LameHandle, *mut u8, c_int) -> c_int>(
                    b"lame_encode_flush\0",
                )
                .map_err(|e| missing("lame_encode_flush", e))?;
            let close = *lib
                .get::<unsafe extern "C" fn(LameHandle) -> c_int>(b"lame_close\0")
                .map_err(|e| missing("lame_close", e))?;

            Ok(Self {
                _lib: lib,
                init,
                set_in_samplerate,
                set_num_channels,
                set_brate,
                set_mode,
                init_params,
                get_framesize,
                get_encoder_delay,
                encode_buffer,
                encode_buffer_interleaved,
                encode_flush,
                close,
            })
        }
    }
}

static REGISTRY: OnceLock<Mutex<HashMap<OsString, Arc<LameLibrary>>>> = OnceLock::new();

/// The library new encoders bind against: the first successful load wins.
static ACTIVE: OnceLock<Arc<LameLibrary>> = OnceLock::new();

fn registry() -> &'static Mutex<HashMap<OsString, Arc<LameLibrary>>> {
    REGISTRY.get_or_init(|| Mutex::new(HashMap::new()))
}

/// Load and bind a codec library, idempotently per resolved file name.
///
/// A library whose name is already in the registry is not reloaded; the
/// cached binding table is returned.
pub fn load(path: &Path) -> Result<Arc<LameLibrary>, StreamError> {
    let key: OsString = path
        .file_name()
        .map(ToOwned::to_owned)
        .unwrap_or_else(|| path.as_os_str().to_owned());

    let mut registry = registry().lock();
    if let Some(library) = registry.get(&key) {
        return Ok(Arc::clone(library));
    }

    let library = Arc::new(LameLibrary::open(path)?);
    log::info!("bound codec library {}", path.display());
    registry.insert(key, Arc::clone(&library));
    let _ = ACTIVE.set(Arc::clone(&library));
    Ok(library)
}

/// The explicitly loaded library if there is one, otherwise the default
/// library for this platform and process bitness, resolved relative to the
/// working directory.
pub fn active_or_default() -> Result<Arc<LameLibrary>, StreamError> {
    if let Some(library) = ACTIVE.get() {
        return Ok(Arc::clone(library));
    }
    load(&default_library_path())
}

/// `<baseName><32|64><platform-extension>` per process pointer width.
pub fn default_library_path() -> PathBuf {
    let bits = if cfg!(target_pointer_width = "64") {
        "64"
    } else {
        "32"
    };
    let name = if cfg!(target_os = "windows") {
        format!("lame_enc{}.dll", bits)
    } else if cfg!(target_os = "macos") {
        format!("libmp3lame{}.dylib", bits)
    } else {
        format!("libmp3lame{}.so", bits)
    };
    PathBuf::from(name)
}

fn check(status: c_int, call: &'static str) -> Result<c_int, StreamError> {
    if status < 0 {
        return Err(StreamError::NativeCall { call, status });
    }
    Ok(status)
}

/// One bound codec instance.
///
/// Owns a `lame_t` handle created from the shared library binding; the
/// handle is closed exactly once, in `Drop`, on every exit path including
/// negotiation failure.
pub struct LameBinding {
    library: Arc<LameLibrary>,
    handle: LameHandle,
    format: Mp3StreamFormat,
}

// SAFETY: the handle is confined to its single-owner binding; the encoder
// state machine serializes all calls through &mut self.
unsafe impl Send for LameBinding {}

impl LameBinding {
    /// Create a codec instance and negotiate `config` with it.
    pub fn new(library: Arc<LameLibrary>, config: &EncoderConfig) -> Result<Self, StreamError> {
        let handle = unsafe { (library.init)() };
        if handle.is_null() {
            return Err(StreamError::NativeCall {
                call: "lame_init",
                status: 0,
            });
        }

        let mut binding = Self {
            library,
            handle,
            format: Mp3StreamFormat {
                sample_rate: config.sample_rate,
                channels: config.channels,
                bit_rate_kbps: config.bit_rate_kbps,
                frame_size: 0,
                encoder_delay: 0,
            },
        };
        binding.negotiate(config)?;
        Ok(binding)
    }

    fn negotiate(&mut self, config: &EncoderConfig) -> Result<(), StreamError> {
        let lib = &self.library;
        let mode = if config.channels == 1 {
            MODE_MONO
        } else {
            MODE_JOINT_STEREO
        };
        unsafe {
            check(
                (lib.set_in_samplerate)(self.handle, config.sample_rate as c_int),
                "lame_set_in_samplerate",
            )?;
            check(
                (lib.set_num_channels)(self.handle, config.channels as c_int),
                "lame_set_num_channels",
            )?;
            check(
                (lib.set_brate)(self.handle, config.bit_rate_kbps as c_int),
                "lame_set_brate",
            )?;
            check((lib.set_mode)(self.handle, mode), "lame_set_mode")?;
            check((lib.init_params)(self.handle), "lame_init_params")?;

            self.format.frame_size = check((lib.get_framesize)(self.handle), "lame_get_framesize")? as u32;
            self.format.encoder_delay =
                check((lib.get_encoder_delay)(self.handle), "lame_get_encoder_delay")? as u32;
        }
        Ok(())
    }
}

impl CodecBinding for LameBinding {
    fn stream_format(&self) -> Mp3StreamFormat {
        self.format
    }

    fn encode_interleaved(
        &mut self,
        samples: &[i16],
        destination: &mut [u8],
    ) -> Result<usize, StreamError> {
        let frames = samples.len() / self.format.channels as usize;
        let written = unsafe {
            if self.format.channels == 1 {
                check(
                    (self.library.encode_buffer)(
                        self.handle,
                        samples.as_ptr(),
                        std::ptr::null(),
                        frames as c_int,
                        destination.as_mut_ptr(),
                        destination.len() as c_int,
                    ),
                    "lame_encode_buffer",
                )?
            } else {
                check(
                    (self.library.encode_buffer_interleaved)(
                        self.handle,
                        samples.as_ptr(),
                        frames as c_int,
                        destination.as_mut_ptr(),
                        destination.len() as c_int,
                    ),
                    "lame_encode_buffer_interleaved",
                )?
            }
        };
        Ok(written as usize)
    }

    fn flush(&mut self, destination: &mut [u8]) -> Result<usize, StreamError> {
        let written = unsafe {
            check(
                (self.library.encode_flush)(
                    self.handle,
                    destination.as_mut_ptr(),
                    destination.len() as c_int,
                ),
                "lame_encode_flush",
            )?
        };
        Ok(written as usize)
    }
}

impl Drop for LameBinding {
    fn drop(&mut self) {
        unsafe {
            (self.library.close)(self.handle);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_name_encodes_bitness_and_platform() {
        let name = default_library_path();
        let name = name.to_string_lossy();

        #[cfg(target_pointer_width = "64")]
        assert!(name.contains("64"));
        #[cfg(target_pointer_width = "32")]
        assert!(name.contains("32"));

        #[cfg(target_os = "windows")]
        assert!(name.ends_with(".dll"));
        #[cfg(target_os = "linux")]
        assert!(name.ends_with(".so"));
        #[cfg(target_os = "macos")]
        assert!(name.ends_with(".dylib"));
    }

    #[test]
    fn missing_library_reports_load_error() {
        let err = load(Path::new("no-such-codec-library.so")).unwrap_err();
        assert!(matches!(err, StreamError::LibraryLoad(_)));
    }
}
