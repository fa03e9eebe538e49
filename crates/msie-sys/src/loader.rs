//! Dynamic library loading for system script engines
//!
//! Opens `jscript9.dll` / `chakra.dll` (or any library exporting the JsRt
//! surface) and resolves typed entry points from it.

use std::ffi::{c_void, CString};
use std::path::Path;

use thiserror::Error;

/// Errors that can occur while binding a native engine library
#[derive(Debug, Error)]
pub enum LoadError {
    /// Library file not found or refused to load
    #[error("Cannot load engine library {path}: {reason}")]
    NotFound {
        /// Path that was attempted
        path: String,
        /// Loader diagnostic
        reason: String,
    },

    /// Entry point missing from the library
    #[error("Entry point {symbol} not exported by {library}")]
    SymbolNotFound {
        /// Symbol name that was not found
        symbol: String,
        /// Library path
        library: String,
    },

    /// Symbol or path contains an interior NUL
    #[error("Invalid name: {0}")]
    InvalidName(String),

    /// Path is not valid UTF-8
    #[error("Invalid UTF-8 in path: {0}")]
    InvalidPath(String),

    /// The requested hosting protocol has no native binding on this platform
    #[error("{0} is not available on this platform")]
    Unsupported(String),
}

/// Cross-platform dynamic library handle
pub struct Library {
    handle: *mut c_void,
    path: String,
}

impl Library {
    /// Load a dynamic library from the given path.
    ///
    /// Uses `dlopen(RTLD_NOW | RTLD_LOCAL)` on unix and `LoadLibraryW` on
    /// Windows. A bare file name goes through the platform search order.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, LoadError> {
        let path_ref = path.as_ref();
        let path_str = path_ref
            .to_str()
            .ok_or_else(|| LoadError::InvalidPath(format!("{:?}", path_ref)))?;
        if path_str.contains('\0') {
            return Err(LoadError::InvalidName(path_str.replace('\0', "\\0")));
        }

        let handle = platform::open(path_str)?;
        log::debug!(target: "msie::loader", "loaded {}", path_str);

        Ok(Library {
            handle,
            path: path_str.to_string(),
        })
    }

    /// Resolve an exported function.
    ///
    /// # Safety
    ///
    /// `T` must be a function pointer type matching the export's real
    /// signature and calling convention, and it must not be called after the
    /// library is dropped.
    pub unsafe fn get<T: Copy>(&self, symbol: &str) -> Result<T, LoadError> {
        debug_assert_eq!(std::mem::size_of::<T>(), std::mem::size_of::<*mut c_void>());
        let c_name = CString::new(symbol).map_err(|e| LoadError::InvalidName(e.to_string()))?;
        let address = platform::symbol(self.handle, &c_name);
        if address.is_null() {
            return Err(LoadError::SymbolNotFound {
                symbol: symbol.to_string(),
                library: self.path.clone(),
            });
        }
        Ok(std::mem::transmute_copy(&address))
    }

    /// Path this library was loaded from
    pub fn path(&self) -> &str {
        &self.path
    }
}

impl Drop for Library {
    fn drop(&mut self) {
        platform::close(self.handle);
    }
}

// Module handles may be used and released from any thread.
unsafe impl Send for Library {}
unsafe impl Sync for Library {}

// ============================================================================
// Unix Implementation (Linux, macOS, BSD)
// ============================================================================

#[cfg(unix)]
mod platform {
    use super::LoadError;
    use std::ffi::{c_void, CStr, CString};

    pub(super) fn open(path: &str) -> Result<*mut c_void, LoadError> {
        let c_path = CString::new(path).map_err(|e| LoadError::InvalidName(e.to_string()))?;

        let handle = unsafe { libc::dlopen(c_path.as_ptr(), libc::RTLD_NOW | libc::RTLD_LOCAL) };
        if handle.is_null() {
            return Err(LoadError::NotFound {
                path: path.to_string(),
                reason: last_error(),
            });
        }
        Ok(handle)
    }

    pub(super) fn symbol(handle: *mut c_void, name: &CStr) -> *mut c_void {
        unsafe {
            libc::dlerror();
            libc::dlsym(handle, name.as_ptr())
        }
    }

    pub(super) fn close(handle: *mut c_void) {
        unsafe {
            libc::dlclose(handle);
        }
    }

    fn last_error() -> String {
        unsafe {
            let err_ptr = libc::dlerror();
            if err_ptr.is_null() {
                "unknown error".to_string()
            } else {
                CStr::from_ptr(err_ptr).to_string_lossy().into_owned()
            }
        }
    }
}

// ============================================================================
// Windows Implementation
// ============================================================================

#[cfg(windows)]
mod platform {
    use super::LoadError;
    use std::ffi::{c_void, CStr, OsStr};
    use std::os::windows::ffi::OsStrExt;

    extern "system" {
        fn LoadLibraryW(filename: *const u16) -> *mut c_void;
        fn GetProcAddress(module: *mut c_void, procname: *const i8) -> *mut c_void;
        fn FreeLibrary(module: *mut c_void) -> i32;
        fn GetLastError() -> u32;
    }

    pub(super) fn open(path: &str) -> Result<*mut c_void, LoadError> {
        let wide: Vec<u16> = OsStr::new(path)
            .encode_wide()
            .chain(std::iter::once(0))
            .collect();

        let handle = unsafe { LoadLibraryW(wide.as_ptr()) };
        if handle.is_null() {
            let error = unsafe { GetLastError() };
            return Err(LoadError::NotFound {
                path: path.to_string(),
                reason: format!("error code {}", error),
            });
        }
        Ok(handle)
    }

    pub(super) fn symbol(handle: *mut c_void, name: &CStr) -> *mut c_void {
        unsafe { GetProcAddress(handle, name.as_ptr().cast()) }
    }

    pub(super) fn close(handle: *mut c_void) {
        unsafe {
            FreeLibrary(handle);
        }
    }
}
