use crate::module::Module;
use std::ffi::c_void;

/// Exported constructor symbol, NUL-terminated for symbol lookup.
pub const MODULE_CTOR_SYMBOL: &[u8] = b"module_ctor\0";
/// Exported destructor symbol, NUL-terminated for symbol lookup.
pub const MODULE_DTOR_SYMBOL: &[u8] = b"module_dtor\0";
/// Exported logging hook, NUL-terminated for symbol lookup.
pub const MODULE_INIT_SYMBOL: &[u8] = b"module_init\0";

/// Builds a module and returns it as an opaque pointer to a [`RawModule`].
pub type ModuleCtor = unsafe extern "C" fn() -> *mut c_void;
/// Destroys a pointer previously returned by the matching [`ModuleCtor`].
pub type ModuleDtor = unsafe extern "C" fn(*mut c_void);
/// Receives a pointer to the host's [`tracing::Dispatch`], valid for the
/// duration of the call. Called before the constructor.
pub type ModuleInit = unsafe extern "C" fn(*const c_void);

/// Make the host's dispatcher the global default of this library's copy of
/// `tracing`. Without it, events logged inside a module go nowhere.
///
/// # Safety
/// `dispatch` must be null or point to a live `tracing::Dispatch` built
/// against the same `tracing` version as this crate.
pub unsafe fn install_dispatch(dispatch: *const c_void) {
    if dispatch.is_null() {
        return;
    }
    // SAFETY: upheld by the caller.
    let dispatch = unsafe { &*dispatch.cast::<tracing::Dispatch>() };
    // Fails only when a default is already set, e.g. a statically linked
    // module sharing the host's copy.
    if tracing::dispatcher::set_global_default(dispatch.clone()).is_err() {
        tracing::trace!("module logging already has a global dispatcher");
    }
}

/// The object behind the opaque module pointer.
///
/// `Box<dyn Module>` is a fat pointer, so it is boxed once more to obtain a
/// thin one that fits through a C signature. Host and module must be built
/// by the same compiler against the same version of this crate.
pub struct RawModule {
    module: Box<dyn Module>,
}

impl RawModule {
    pub fn new(module: Box<dyn Module>) -> Self {
        Self { module }
    }

    pub fn into_raw(self) -> *mut c_void {
        Box::into_raw(Box::new(self)).cast()
    }

    /// Reclaim ownership of a pointer produced by [`into_raw`](Self::into_raw).
    ///
    /// # Safety
    /// `ptr` must come from `into_raw` in the same library and must not have
    /// been reclaimed already.
    pub unsafe fn from_raw(ptr: *mut c_void) -> Box<Self> {
        // SAFETY: upheld by the caller.
        unsafe { Box::from_raw(ptr.cast()) }
    }

    /// Borrow the module behind an opaque pointer.
    ///
    /// # Safety
    /// `ptr` must come from `into_raw`, still be live, and not be aliased
    /// mutably for the returned lifetime.
    pub unsafe fn module_mut<'a>(ptr: *mut c_void) -> &'a mut dyn Module {
        // SAFETY: upheld by the caller.
        let raw = unsafe { &mut *ptr.cast::<RawModule>() };
        raw.module.as_mut()
    }
}

/// Export `module_ctor` / `module_dtor` for a module type.
///
/// ```ignore
/// scenehost_api::declare_module!(ExampleModule::default());
/// ```
#[macro_export]
macro_rules! declare_module {
    ($ctor:expr) => {
        #[unsafe(no_mangle)]
        pub extern "C" fn module_ctor() -> *mut ::std::ffi::c_void {
            let module: ::std::boxed::Box<dyn $crate::Module> = ::std::boxed::Box::new($ctor);
            $crate::RawModule::new(module).into_raw()
        }

        /// # Safety
        /// `dispatch` must be null or point to the host's live dispatcher.
        #[unsafe(no_mangle)]
        pub unsafe extern "C" fn module_init(dispatch: *const ::std::ffi::c_void) {
            // SAFETY: forwarded from the caller.
            unsafe { $crate::install_dispatch(dispatch) }
        }

        /// # Safety
        /// `module` must come from `module_ctor` of this library.
        #[unsafe(no_mangle)]
        pub unsafe extern "C" fn module_dtor(module: *mut ::std::ffi::c_void) {
            if !module.is_null() {
                // SAFETY: the loader hands back exactly what module_ctor returned.
                drop(unsafe { $crate::RawModule::from_raw(module) });
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::module::Category;
    use std::sync::atomic::{AtomicUsize, Ordering};

    static DROPS: AtomicUsize = AtomicUsize::new(0);

    struct Counted;

    impl Module for Counted {
        fn name(&self) -> &str {
            "counted"
        }

        fn category(&self) -> Category {
            Category::Scene
        }
    }

    impl Drop for Counted {
        fn drop(&mut self) {
            DROPS.fetch_add(1, Ordering::SeqCst);
        }
    }

    crate::declare_module!(Counted);

    #[test]
    fn symbols_are_nul_terminated() {
        assert_eq!(MODULE_CTOR_SYMBOL.last(), Some(&0));
        assert_eq!(MODULE_DTOR_SYMBOL.last(), Some(&0));
        assert_eq!(MODULE_INIT_SYMBOL.last(), Some(&0));
        assert_eq!(&MODULE_CTOR_SYMBOL[..MODULE_CTOR_SYMBOL.len() - 1], b"module_ctor");
    }

    #[test]
    fn exported_pair_round_trips() {
        let ctor: ModuleCtor = module_ctor;
        let dtor: ModuleDtor = module_dtor;

        let ptr = unsafe { ctor() };
        assert!(!ptr.is_null());
        let module = unsafe { RawModule::module_mut(ptr) };
        assert_eq!(module.name(), "counted");
        assert!(module.as_scene_mut().is_none());

        let before = DROPS.load(Ordering::SeqCst);
        unsafe { dtor(ptr) };
        assert_eq!(DROPS.load(Ordering::SeqCst), before + 1);

        unsafe { dtor(std::ptr::null_mut()) };
        assert_eq!(DROPS.load(Ordering::SeqCst), before + 1);
    }

    #[test]
    fn init_installs_the_given_dispatcher() {
        let init: ModuleInit = module_init;
        unsafe { init(std::ptr::null()) };

        let dispatch = tracing::Dispatch::new(tracing::subscriber::NoSubscriber::default());
        unsafe { init(std::ptr::from_ref(&dispatch).cast()) };
        assert!(tracing::dispatcher::get_default(|current| {
            current.is::<tracing::subscriber::NoSubscriber>()
        }));
    }
}
