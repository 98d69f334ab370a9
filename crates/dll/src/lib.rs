//! Loading scene modules from shared libraries.
//!
//! # Invariants
//! - Each library and each module is constructed at most once per name.
//! - A module instance keeps its library loaded; the library can only be
//!   closed after every instance built from it is destroyed.
//! - Module objects are destroyed by their library's own destructor.

mod cache;
mod error;
mod library;
mod loader;

pub use cache::ResourceCache;
pub use error::DllError;
pub use library::{DynamicLibrary, library_file_name, library_file_name_for};
pub use loader::{ModuleInstance, ModuleLibrary, ModuleRef, PluginLoader};
