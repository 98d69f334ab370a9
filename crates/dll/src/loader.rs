use crate::cache::ResourceCache;
use crate::error::DllError;
use crate::library::{DynamicLibrary, library_file_name};
use scenehost_api::{
    Category, MODULE_CTOR_SYMBOL, MODULE_DTOR_SYMBOL, MODULE_INIT_SYMBOL, Module, ModuleCtor,
    ModuleDtor, ModuleInit, RawModule, Scene,
};
use std::cell::RefCell;
use std::ffi::c_void;
use std::path::{Path, PathBuf};
use std::ptr::NonNull;
use std::rc::Rc;

/// A loaded library that exports the module constructor/destructor pair.
pub trait ModuleLibrary {
    fn constructor(&self) -> Result<ModuleCtor, DllError>;
    fn destructor(&self) -> Result<ModuleDtor, DllError>;

    /// The optional logging hook. Libraries without one log nothing of their
    /// own unless they share the host's `tracing`.
    fn initializer(&self) -> Option<ModuleInit> {
        None
    }
}

impl ModuleLibrary for DynamicLibrary {
    fn constructor(&self) -> Result<ModuleCtor, DllError> {
        // SAFETY: module libraries export `module_ctor` with this signature.
        unsafe { self.load::<ModuleCtor>(MODULE_CTOR_SYMBOL) }
    }

    fn destructor(&self) -> Result<ModuleDtor, DllError> {
        // SAFETY: module libraries export `module_dtor` with this signature.
        unsafe { self.load::<ModuleDtor>(MODULE_DTOR_SYMBOL) }
    }

    fn initializer(&self) -> Option<ModuleInit> {
        // SAFETY: `declare_module!` exports `module_init` with this signature.
        unsafe { self.load::<ModuleInit>(MODULE_INIT_SYMBOL) }.ok()
    }
}

/// A module object built by a library's constructor.
///
/// Holds a reference to its library, so the code behind the module's
/// vtable and destructor stays mapped until the instance is gone. Dropping
/// the instance runs the library's destructor first and only then releases
/// the library reference.
pub struct ModuleInstance<L: ModuleLibrary = DynamicLibrary> {
    name: String,
    raw: NonNull<c_void>,
    dtor: ModuleDtor,
    _library: Rc<L>,
}

impl<L: ModuleLibrary> ModuleInstance<L> {
    fn construct(name: &str, library: Rc<L>) -> Result<Self, DllError> {
        let ctor = library.constructor()?;
        let dtor = library.destructor()?;
        if let Some(init) = library.initializer() {
            tracing::dispatcher::get_default(|dispatch| {
                // SAFETY: `dispatch` outlives the call and the hook only
                // clones it.
                unsafe { init(std::ptr::from_ref(dispatch).cast()) }
            });
        }
        // SAFETY: the symbol was resolved from a live library with the
        // module constructor signature.
        let raw = unsafe { ctor() };
        let raw = NonNull::new(raw).ok_or_else(|| DllError::NullModule(name.to_string()))?;
        Ok(Self {
            name: name.to_string(),
            raw,
            dtor,
            _library: library,
        })
    }

    /// The logical name the module was loaded under.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn module(&mut self) -> &mut dyn Module {
        // SAFETY: `raw` came from the constructor and is destroyed only in
        // Drop; `&mut self` guarantees exclusive access.
        unsafe { RawModule::module_mut(self.raw.as_ptr()) }
    }

    pub fn category(&mut self) -> Category {
        self.module().category()
    }

    /// The scene capability of the module, if it has one.
    pub fn scene(&mut self) -> Option<&mut dyn Scene> {
        self.module().as_scene_mut()
    }
}

impl<L: ModuleLibrary> Drop for ModuleInstance<L> {
    fn drop(&mut self) {
        tracing::debug!("destroying module `{}`", self.name);
        // SAFETY: `raw` is the constructor's result, handed back exactly once
        // to the destructor of the same, still loaded, library.
        unsafe { (self.dtor)(self.raw.as_ptr()) };
    }
}

impl<L: ModuleLibrary> std::fmt::Debug for ModuleInstance<L> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModuleInstance")
            .field("name", &self.name)
            .field("raw", &self.raw)
            .finish_non_exhaustive()
    }
}

/// Shared handle to a loaded module.
pub type ModuleRef<L = DynamicLibrary> = Rc<RefCell<ModuleInstance<L>>>;

type Opener<L> = Box<dyn Fn(&Path) -> Result<L, DllError>>;

/// Loads modules by logical name from a directory, at most once each.
pub struct PluginLoader<L: ModuleLibrary = DynamicLibrary> {
    search_dir: PathBuf,
    opener: Opener<L>,
    libraries: ResourceCache<String, L>,
    modules: ResourceCache<String, RefCell<ModuleInstance<L>>>,
}

impl PluginLoader<DynamicLibrary> {
    pub fn new(search_dir: impl Into<PathBuf>) -> Self {
        Self::with_opener(search_dir, |path| DynamicLibrary::open(path))
    }
}

impl<L: ModuleLibrary> PluginLoader<L> {
    /// Use `opener` instead of the OS loader to turn a library path into a
    /// library.
    pub fn with_opener(
        search_dir: impl Into<PathBuf>,
        opener: impl Fn(&Path) -> Result<L, DllError> + 'static,
    ) -> Self {
        Self {
            search_dir: search_dir.into(),
            opener: Box::new(opener),
            libraries: ResourceCache::new(),
            modules: ResourceCache::new(),
        }
    }

    pub fn search_dir(&self) -> &Path {
        &self.search_dir
    }

    /// Where the library for module `name` is expected.
    pub fn library_path(&self, name: &str) -> PathBuf {
        self.search_dir.join(library_file_name(name))
    }

    /// Load (or fetch the already loaded) module `name`.
    pub fn load_module(&mut self, name: &str) -> Result<ModuleRef<L>, DllError> {
        let path = self.library_path(name);
        let opener = &self.opener;
        let library = self.libraries.load(name.to_string(), || {
            tracing::info!("loading module library {}", path.display());
            opener(&path)
        })?;

        self.modules.load(name.to_string(), || {
            let instance = ModuleInstance::construct(name, library)?;
            tracing::info!("module `{name}` constructed");
            Ok(RefCell::new(instance))
        })
    }

    /// Load module `name` and require the scene category along with its
    /// hooks. A module lacking either is unloaded again.
    pub fn load_scene(&mut self, name: &str) -> Result<ModuleRef<L>, DllError> {
        let module = self.load_module(name)?;
        let (category, has_scene) = {
            let mut instance = module.borrow_mut();
            (instance.category(), instance.scene().is_some())
        };
        let error = if category != Category::Scene {
            DllError::CategoryMismatch {
                name: name.to_string(),
                expected: Category::Scene,
                found: category,
            }
        } else if !has_scene {
            DllError::MissingCapability {
                name: name.to_string(),
                category,
            }
        } else {
            return Ok(module);
        };
        drop(module);
        self.unload(name);
        Err(error)
    }

    pub fn is_loaded(&self, name: &str) -> bool {
        self.modules.contains(&name.to_string())
    }

    /// Names of the modules currently cached.
    pub fn loaded(&self) -> impl Iterator<Item = &str> + '_ {
        self.modules.keys().map(String::as_str)
    }

    /// Forget module `name` and its library. Handles still held elsewhere
    /// keep both alive until they are dropped.
    pub fn unload(&mut self, name: &str) -> bool {
        let key = name.to_string();
        let module = self.modules.discard(&key);
        let library = self.libraries.discard(&key);
        if module.is_some() || library.is_some() {
            tracing::info!("module `{name}` unloaded");
        }
        module.is_some()
    }

    /// Unload every module.
    pub fn unload_all(&mut self) {
        self.modules.clear();
        self.libraries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scenehost_api::SceneContext;
    use scenehost_render::RenderError;
    use std::cell::Cell;
    use std::time::Duration;
    use tracing::subscriber::NoSubscriber;

    thread_local! {
        static OPENED: Cell<usize> = const { Cell::new(0) };
        static CONSTRUCTED: Cell<usize> = const { Cell::new(0) };
        static DESTROYED: Cell<usize> = const { Cell::new(0) };
        static LIBRARIES_DROPPED: Cell<usize> = const { Cell::new(0) };
        static LIVE_LIBRARIES: Cell<usize> = const { Cell::new(0) };
        static DESTROYED_AFTER_CLOSE: Cell<bool> = const { Cell::new(false) };
        static INITIALIZED_FIRST: Cell<usize> = const { Cell::new(0) };
    }

    fn bump(counter: &'static std::thread::LocalKey<Cell<usize>>) {
        counter.with(|c| c.set(c.get() + 1));
    }

    fn read(counter: &'static std::thread::LocalKey<Cell<usize>>) -> usize {
        counter.with(Cell::get)
    }

    struct TestScene;

    impl Scene for TestScene {
        fn on_create(&mut self, _ctx: &mut SceneContext<'_>) -> Result<(), RenderError> {
            Ok(())
        }

        fn on_update(
            &mut self,
            _ctx: &mut SceneContext<'_>,
            _elapsed: Duration,
        ) -> Result<(), RenderError> {
            Ok(())
        }

        fn on_destroy(&mut self, _ctx: &mut SceneContext<'_>) {}
    }

    impl Module for TestScene {
        fn name(&self) -> &str {
            "test-scene"
        }

        fn category(&self) -> Category {
            Category::Scene
        }

        fn as_scene_mut(&mut self) -> Option<&mut dyn Scene> {
            Some(self)
        }
    }

    struct Inert;

    impl Module for Inert {
        fn name(&self) -> &str {
            "inert"
        }

        fn category(&self) -> Category {
            Category::Scene
        }
    }

    extern "C" fn scene_ctor() -> *mut c_void {
        bump(&CONSTRUCTED);
        RawModule::new(Box::new(TestScene)).into_raw()
    }

    extern "C" fn inert_ctor() -> *mut c_void {
        bump(&CONSTRUCTED);
        RawModule::new(Box::new(Inert)).into_raw()
    }

    extern "C" fn null_ctor() -> *mut c_void {
        std::ptr::null_mut()
    }

    unsafe extern "C" fn test_dtor(module: *mut c_void) {
        bump(&DESTROYED);
        if read(&LIVE_LIBRARIES) == 0 {
            DESTROYED_AFTER_CLOSE.with(|c| c.set(true));
        }
        drop(unsafe { RawModule::from_raw(module) });
    }

    unsafe extern "C" fn test_init(dispatch: *const c_void) {
        let dispatch = unsafe { &*dispatch.cast::<tracing::Dispatch>() };
        if dispatch.is::<NoSubscriber>() && read(&CONSTRUCTED) == 0 {
            bump(&INITIALIZED_FIRST);
        }
    }

    /// In-process stand-in for a shared library.
    struct FakeLibrary {
        ctor: Option<ModuleCtor>,
        init: Option<ModuleInit>,
    }

    impl ModuleLibrary for FakeLibrary {
        fn constructor(&self) -> Result<ModuleCtor, DllError> {
            self.ctor.ok_or_else(|| DllError::SymbolNotFound {
                symbol: "module_ctor".into(),
                message: "undefined symbol".into(),
            })
        }

        fn destructor(&self) -> Result<ModuleDtor, DllError> {
            Ok(test_dtor)
        }

        fn initializer(&self) -> Option<ModuleInit> {
            self.init
        }
    }

    impl Drop for FakeLibrary {
        fn drop(&mut self) {
            bump(&LIBRARIES_DROPPED);
            LIVE_LIBRARIES.with(|c| c.set(c.get() - 1));
        }
    }

    fn loader_with(ctor: Option<ModuleCtor>) -> PluginLoader<FakeLibrary> {
        PluginLoader::with_opener("/modules", move |_path| {
            bump(&OPENED);
            bump(&LIVE_LIBRARIES);
            Ok(FakeLibrary { ctor, init: None })
        })
    }

    #[test]
    fn load_then_drop_destroys_once_and_warm_cache_skips_ctor() {
        let mut loader = loader_with(Some(scene_ctor));

        let first = loader.load_module("example").unwrap();
        assert_eq!(first.borrow().name(), "example");
        assert_eq!(first.borrow_mut().module().name(), "test-scene");
        let second = loader.load_module("example").unwrap();
        assert!(Rc::ptr_eq(&first, &second));
        assert_eq!(read(&OPENED), 1);
        assert_eq!(read(&CONSTRUCTED), 1);

        drop(first);
        drop(second);
        assert_eq!(read(&DESTROYED), 0, "cache still holds the module");

        assert!(loader.unload("example"));
        assert_eq!(read(&DESTROYED), 1);
        assert_eq!(read(&LIBRARIES_DROPPED), 1);
        assert!(!DESTROYED_AFTER_CLOSE.with(Cell::get));
    }

    #[test]
    fn module_keeps_its_library_alive_after_unload() {
        let mut loader = loader_with(Some(scene_ctor));
        let held = loader.load_module("example").unwrap();

        loader.unload("example");
        assert_eq!(read(&LIBRARIES_DROPPED), 0);
        assert!(held.borrow_mut().scene().is_some());

        drop(held);
        assert_eq!(read(&DESTROYED), 1);
        assert_eq!(read(&LIBRARIES_DROPPED), 1);
        assert!(!DESTROYED_AFTER_CLOSE.with(Cell::get));
    }

    #[test]
    fn dropping_the_loader_destroys_modules_before_libraries() {
        let loader_modules = {
            let mut loader = loader_with(Some(scene_ctor));
            loader.load_module("a").unwrap();
            loader.load_module("b").unwrap();
            loader.loaded().map(str::to_string).collect::<Vec<_>>()
        };
        assert_eq!(loader_modules, vec!["a", "b"]);
        assert_eq!(read(&DESTROYED), 2);
        assert_eq!(read(&LIBRARIES_DROPPED), 2);
        assert!(!DESTROYED_AFTER_CLOSE.with(Cell::get));
    }

    #[test]
    fn missing_symbol_is_reported_and_not_cached() {
        let mut loader = loader_with(None);
        let err = loader.load_module("broken").unwrap_err();
        assert!(matches!(err, DllError::SymbolNotFound { ref symbol, .. } if symbol == "module_ctor"));
        assert!(!loader.is_loaded("broken"));
        assert_eq!(read(&CONSTRUCTED), 0);
    }

    #[test]
    fn null_module_is_an_error() {
        let mut loader = loader_with(Some(null_ctor));
        assert!(matches!(
            loader.load_module("null"),
            Err(DllError::NullModule(name)) if name == "null"
        ));
    }

    #[test]
    fn scene_category_without_hooks_is_missing_capability() {
        let mut loader = loader_with(Some(inert_ctor));
        let err = loader.load_scene("inert").unwrap_err();
        assert!(matches!(
            err,
            DllError::MissingCapability {
                ref name,
                category: Category::Scene,
            } if name == "inert"
        ));
        assert!(err.to_string().contains("no scene hooks"));
        assert!(!loader.is_loaded("inert"));
        assert_eq!(read(&DESTROYED), 1);
    }

    #[test]
    fn init_hook_gets_the_host_dispatcher_before_construction() {
        let mut loader: PluginLoader<FakeLibrary> = PluginLoader::with_opener("/modules", |_| {
            bump(&LIVE_LIBRARIES);
            Ok(FakeLibrary {
                ctor: Some(scene_ctor),
                init: Some(test_init),
            })
        });
        let module = tracing::subscriber::with_default(NoSubscriber::default(), || {
            loader.load_scene("example")
        })
        .unwrap();
        assert_eq!(read(&INITIALIZED_FIRST), 1);
        assert_eq!(read(&CONSTRUCTED), 1);

        drop(module);
        loader.load_scene("example").unwrap();
        assert_eq!(read(&INITIALIZED_FIRST), 1, "cached module is not initialized again");
    }

    #[test]
    fn library_open_failure_propagates() {
        let mut loader: PluginLoader<FakeLibrary> =
            PluginLoader::with_opener("/nowhere", |path| {
                Err(DllError::LibraryNotFound(path.to_path_buf()))
            });
        match loader.load_module("ghost") {
            Err(DllError::LibraryNotFound(path)) => {
                assert_eq!(path, Path::new("/nowhere").join(library_file_name("ghost")));
            }
            other => panic!("expected LibraryNotFound, got {other:?}"),
        }
        assert_eq!(loader.loaded().count(), 0);
    }

    #[test]
    fn real_loader_reports_missing_library() {
        let mut loader = PluginLoader::new("/definitely/not/a/module/dir");
        assert!(matches!(
            loader.load_scene("example"),
            Err(DllError::LibraryNotFound(_))
        ));
    }
}
