use scenehost_api::Category;
use std::path::PathBuf;

/// Failures of loading, resolving or unloading a module library.
#[derive(Debug, thiserror::Error)]
pub enum DllError {
    #[error("library not found: {}", .0.display())]
    LibraryNotFound(PathBuf),

    #[error("failed to load {}: {message}", .path.display())]
    Load { path: PathBuf, message: String },

    #[error("symbol `{symbol}` not found: {message}")]
    SymbolNotFound { symbol: String, message: String },

    #[error("failed to close library: {0}")]
    Close(String),

    #[error("module `{name}` is a {found} module, expected {expected}")]
    CategoryMismatch {
        name: String,
        expected: Category,
        found: Category,
    },

    #[error("module `{name}` reports the {category} category but provides no {category} hooks")]
    MissingCapability { name: String, category: Category },

    #[error("constructor of module `{0}` returned null")]
    NullModule(String),
}
