//! The contract between the host and dynamically loaded modules.
//!
//! A module library exports two C symbols, `module_ctor` and `module_dtor`
//! (see [`declare_module!`]). The constructor returns an opaque pointer the
//! host must hand back to the destructor of the same library, never free
//! itself. An optional `module_init` receives the host's logging
//! dispatcher before construction.

mod abi;
mod module;

pub use abi::{
    MODULE_CTOR_SYMBOL, MODULE_DTOR_SYMBOL, MODULE_INIT_SYMBOL, ModuleCtor, ModuleDtor, ModuleInit,
    RawModule, install_dispatch,
};
pub use module::{Category, Module, Scene, SceneContext};
