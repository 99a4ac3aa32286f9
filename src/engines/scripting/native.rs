//! Scripting with native Rust types
//!
//! A "module" is a named set of script types registered up front; loading the
//! module by name makes its types instantiable. Useful for gameplay code
//! written in Rust and for driving scenes in tests and demos.

use rustc_hash::FxHashMap;

use super::{
    ExecutionContextHandle, ExecutionContextTag, ModuleHandle, ModuleTag, ScriptError,
    ScriptObjectHandle, ScriptObjectTag, ScriptValue, ScriptingEngine,
};
use crate::handles::HandleVector;

/// A script object implemented in Rust.
pub trait NativeScript {
    /// Handle a method call. Unknown methods should return `Ok(ScriptValue::Void)`.
    fn call(&mut self, method: &str, params: &[ScriptValue]) -> Result<ScriptValue, ScriptError>;
}

type Factory = Box<dyn Fn() -> Box<dyn NativeScript>>;

struct LoadedModule {
    name: String,
}

/// [`ScriptingEngine`] whose modules are registries of [`NativeScript`] types.
#[derive(Default)]
pub struct NativeScriptingEngine {
    /// module name -> type name -> factory
    registry: FxHashMap<String, FxHashMap<String, Factory>>,
    modules: HandleVector<LoadedModule, ModuleTag>,
    module_names: FxHashMap<String, ModuleHandle>,
    contexts: HandleVector<(), ExecutionContextTag>,
    objects: HandleVector<Box<dyn NativeScript>, ScriptObjectTag>,
}

impl NativeScriptingEngine {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `type_name` available in `module` once that module is loaded.
    pub fn register_type<S, F>(&mut self, module: &str, type_name: &str, factory: F)
    where
        S: NativeScript + 'static,
        F: Fn() -> S + 'static,
    {
        self.registry
            .entry(module.to_owned())
            .or_default()
            .insert(
                type_name.to_owned(),
                Box::new(move || Box::new(factory()) as Box<dyn NativeScript>),
            );
    }

    /// Number of live script objects.
    #[must_use]
    pub fn object_count(&self) -> usize {
        self.objects.len()
    }
}

impl ScriptingEngine for NativeScriptingEngine {
    fn create_module(&mut self, name: &str, _sources: &[String]) -> Result<ModuleHandle, ScriptError> {
        if !self.registry.contains_key(name) {
            return Err(ScriptError::ModuleNotFound(name.to_owned()));
        }
        if let Some(previous) = self.module_names.remove(name) {
            self.modules.destroy(previous);
        }

        let handle = self.modules.create(LoadedModule {
            name: name.to_owned(),
        });
        self.module_names.insert(name.to_owned(), handle);
        log::debug!("loaded native script module '{name}'");
        Ok(handle)
    }

    fn destroy_module(&mut self, module: ModuleHandle) {
        if let Some(loaded) = self.modules.destroy(module) {
            self.module_names.remove(&loaded.name);
        }
    }

    fn module(&self, name: &str) -> Option<ModuleHandle> {
        self.module_names.get(name).copied()
    }

    fn create_execution_context(&mut self) -> ExecutionContextHandle {
        self.contexts.create(())
    }

    fn destroy_execution_context(&mut self, context: ExecutionContextHandle) {
        self.contexts.destroy(context);
    }

    fn create_uninitialized_script_object(
        &mut self,
        module: ModuleHandle,
        type_name: &str,
    ) -> Result<ScriptObjectHandle, ScriptError> {
        let loaded = self
            .modules
            .get(module)
            .ok_or_else(|| ScriptError::ModuleNotFound(format!("{module:?}")))?;
        let factory = self
            .registry
            .get(&loaded.name)
            .and_then(|types| types.get(type_name))
            .ok_or_else(|| ScriptError::TypeNotFound {
                module: loaded.name.clone(),
                type_name: type_name.to_owned(),
            })?;

        let object = factory();
        Ok(self.objects.create(object))
    }

    fn execute(
        &mut self,
        _context: ExecutionContextHandle,
        object: ScriptObjectHandle,
        method: &str,
        params: &[ScriptValue],
    ) -> Result<ScriptValue, ScriptError> {
        self.objects
            .get_mut(object)
            .ok_or(ScriptError::InvalidObject(object))?
            .call(method, params)
    }

    fn release_script_object(&mut self, object: ScriptObjectHandle) {
        self.objects.destroy(object);
    }
}
