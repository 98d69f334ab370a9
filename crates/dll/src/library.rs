use crate::error::DllError;
use std::path::{Path, PathBuf};

/// Platform file name of a module library for the current build profile.
pub fn library_file_name(name: &str) -> String {
    library_file_name_for(name, cfg!(debug_assertions))
}

/// Platform file name of a module library. Debug builds carry a `-d` suffix.
pub fn library_file_name_for(name: &str, debug: bool) -> String {
    let suffix = if debug { "-d" } else { "" };
    if cfg!(target_os = "windows") {
        format!("{name}{suffix}.dll")
    } else if cfg!(target_os = "macos") {
        format!("lib{name}{suffix}.dylib")
    } else {
        format!("lib{name}{suffix}.so")
    }
}

fn symbol_name(symbol: &[u8]) -> String {
    String::from_utf8_lossy(symbol.strip_suffix(b"\0").unwrap_or(symbol)).into_owned()
}

/// One shared library loaded into the process.
///
/// The library stays mapped until [`close`](Self::close) or drop. Symbols
/// copied out of it must not be called afterwards.
#[derive(Debug)]
pub struct DynamicLibrary {
    path: PathBuf,
    library: Option<libloading::Library>,
}

impl DynamicLibrary {
    /// Load the library at `path`. A path with a directory component must
    /// exist; bare file names go through the system search path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, DllError> {
        let path = path.as_ref();
        let has_dir = path.parent().is_some_and(|p| !p.as_os_str().is_empty());
        if has_dir && !path.exists() {
            return Err(DllError::LibraryNotFound(path.to_path_buf()));
        }

        // SAFETY: loading runs the library's initializers. Module libraries
        // are trusted to be built for this host.
        let library = unsafe { libloading::Library::new(path) }.map_err(|e| DllError::Load {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        tracing::debug!("opened {}", path.display());
        Ok(Self {
            path: path.to_path_buf(),
            library: Some(library),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_open(&self) -> bool {
        self.library.is_some()
    }

    /// Resolve `symbol` (NUL-terminated) as a value of type `T`, typically a
    /// function pointer.
    ///
    /// # Safety
    /// `T` must match the exported symbol's real type, and the returned value
    /// must not be used after this library is closed.
    pub unsafe fn load<T: Copy>(&self, symbol: &[u8]) -> Result<T, DllError> {
        let Some(library) = &self.library else {
            return Err(DllError::SymbolNotFound {
                symbol: symbol_name(symbol),
                message: format!("{} is closed", self.path.display()),
            });
        };
        // SAFETY: upheld by the caller.
        let resolved = unsafe { library.get::<T>(symbol) }.map_err(|e| DllError::SymbolNotFound {
            symbol: symbol_name(symbol),
            message: e.to_string(),
        })?;
        Ok(*resolved)
    }

    /// Unload the library. Closing twice is a no-op.
    pub fn close(&mut self) -> Result<(), DllError> {
        let Some(library) = self.library.take() else {
            return Ok(());
        };
        tracing::debug!("closing {}", self.path.display());
        library.close().map_err(|e| DllError::Close(e.to_string()))
    }
}

impl Drop for DynamicLibrary {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            tracing::warn!("{e}");
        }
    }
}
