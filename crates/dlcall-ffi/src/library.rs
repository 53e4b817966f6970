//! Native library loading and function lookup.

use libloading::{Library, Symbol};
use log::debug;
use std::ffi::CString;
use std::path::Path;

use crate::error::{FfiError, Result};

/// A loaded native library.
///
/// The library stays mapped for as long as this value lives; every
/// [`Symbol`] handed out borrows from it.
pub struct NativeLibrary {
    library: Library,
    /// Path the library was opened from (for diagnostics)
    path: String,
}

impl NativeLibrary {
    /// Load a native library from a path.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        debug!("loading native library {}", path.display());

        // SAFETY: loading runs the library's initialisers; the caller chose
        // the library and accepts whatever they do.
        let library = unsafe { Library::new(path) }.map_err(|source| FfiError::Load {
            path: path.display().to_string(),
            source,
        })?;

        Ok(Self {
            library,
            path: path.display().to_string(),
        })
    }

    /// Load a library by base name (e.g. `"dlcall_demo"`), first from the
    /// current directory and then through the system search path.
    pub fn load_by_name(name: &str) -> Result<Self> {
        let lib_name = Self::platform_lib_name(name);

        let local = Path::new(".").join(&lib_name);
        if local.exists() {
            return Self::load(local);
        }

        debug!("searching system paths for {lib_name}");
        let library = unsafe { Library::new(&lib_name) }.map_err(|source| FfiError::Load {
            path: lib_name.clone(),
            source,
        })?;

        Ok(Self {
            library,
            path: lib_name,
        })
    }

    /// Get the platform-specific library filename.
    pub fn platform_lib_name(name: &str) -> String {
        #[cfg(target_os = "windows")]
        {
            format!("{name}.dll")
        }
        #[cfg(target_os = "macos")]
        {
            format!("lib{name}.dylib")
        }
        #[cfg(not(any(target_os = "windows", target_os = "macos")))]
        {
            format!("lib{name}.so")
        }
    }

    /// Get a function pointer from the library.
    ///
    /// # Safety
    ///
    /// The type `F` must match the actual signature of the exported symbol.
    pub unsafe fn get_function<F>(&self, name: &str) -> Result<Symbol<'_, F>> {
        let c_name =
            CString::new(name).map_err(|_| FfiError::InvalidSymbolName(name.to_string()))?;

        debug!("resolving symbol '{}' in {}", name, self.path);
        self.library
            .get(c_name.as_bytes_with_nul())
            .map_err(|source| FfiError::SymbolNotFound {
                name: name.to_string(),
                path: self.path.clone(),
                source,
            })
    }

    /// Whether the library exports `name`.
    pub fn has_symbol(&self, name: &str) -> bool {
        // A raw pointer type never gets called, so any exported symbol fits.
        unsafe { self.get_function::<*const ()>(name) }.is_ok()
    }

    pub fn path(&self) -> &str {
        &self.path
    }
}

impl std::fmt::Debug for NativeLibrary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NativeLibrary")
            .field("path", &self.path)
            .finish()
    }
}
