//! Script objects of a scene and its entities

use hecs::Entity;

use super::{Scene, SceneError};
use crate::ecs::ScriptObjectComponent;
use crate::engines::Shared;
use crate::engines::scripting::{
    INITIALIZE, ScriptError, ScriptObjectHandle, ScriptValue, ScriptingEngine,
};

/// A script object released when dropped.
pub struct OwnedScriptObject {
    handle: ScriptObjectHandle,
    scripting: Shared<dyn ScriptingEngine>,
}

impl OwnedScriptObject {
    #[must_use]
    pub fn new(handle: ScriptObjectHandle, scripting: Shared<dyn ScriptingEngine>) -> Self {
        Self { handle, scripting }
    }

    #[must_use]
    pub fn handle(&self) -> ScriptObjectHandle {
        self.handle
    }
}

impl Drop for OwnedScriptObject {
    fn drop(&mut self) {
        if !self.handle.valid() {
            return;
        }
        match self.scripting.try_borrow_mut() {
            Ok(mut scripting) => scripting.release_script_object(self.handle.take()),
            Err(_) => log::error!("script object {:?} leaked: scripting engine busy", self.handle),
        }
    }
}

impl Scene {
    fn create_script_object(
        &mut self,
        module: &str,
        type_name: &str,
    ) -> Result<ScriptObjectHandle, SceneError> {
        let mut scripting = self.engines.scripting.borrow_mut();
        let module_handle = scripting
            .module(module)
            .ok_or_else(|| ScriptError::ModuleNotFound(module.to_owned()))?;
        Ok(scripting.create_uninitialized_script_object(module_handle, type_name)?)
    }

    /// Create a `module::type_name` script object for `entity`, call its
    /// `method` with the entity, and store it in a [`ScriptObjectComponent`].
    pub(super) fn bind_script(
        &mut self,
        entity: Entity,
        module: &str,
        type_name: &str,
        method: &str,
    ) -> Result<(), SceneError> {
        let handle = self.create_script_object(module, type_name)?;
        let result = self.engines.scripting.borrow_mut().execute(
            self.execution_context,
            handle,
            method,
            &[ScriptValue::Entity(entity)],
        );
        if let Err(error) = result {
            self.engines.scripting.borrow_mut().release_script_object(handle);
            return Err(error.into());
        }

        self.assign(
            entity,
            ScriptObjectComponent {
                module: module.to_owned(),
                type_name: type_name.to_owned(),
                script_object_handle: handle,
            },
        );
        log::debug!("{entity:?}: attached script {module}::{type_name}");
        Ok(())
    }

    /// Attach a new `module::type_name` script object to `entity` and call
    /// its `initialize(Entity)`. A script already attached is released.
    ///
    /// # Errors
    ///
    /// Returns an error if the module or type does not exist or
    /// `initialize` fails; nothing is attached then.
    pub fn attach_script(&mut self, entity: Entity, module: &str, type_name: &str) -> Result<(), SceneError> {
        self.bind_script(entity, module, type_name, INITIALIZE)
    }

    /// Script object of the scene itself, driven by `preTick`/`postTick`.
    ///
    /// # Errors
    ///
    /// Returns an error if the module or type does not exist.
    pub fn attach_scene_script(&mut self, module: &str, type_name: &str) -> Result<(), SceneError> {
        let handle = self.create_script_object(module, type_name)?;
        self.script_object = Some(OwnedScriptObject::new(
            handle,
            self.engines.scripting.clone(),
        ));
        log::info!("scene '{}' scripted by {module}::{type_name}", self.config.name);
        Ok(())
    }

    #[must_use]
    pub fn scene_script(&self) -> Option<ScriptObjectHandle> {
        self.script_object.as_ref().map(OwnedScriptObject::handle)
    }

    /// Call `method` on the scene script object, if there is one.
    pub(super) fn call_scene_script(&mut self, method: &str, delta: f32) -> Result<(), SceneError> {
        let Some(object) = self.scene_script() else {
            return Ok(());
        };
        self.engines.scripting.borrow_mut().execute(
            self.execution_context,
            object,
            method,
            &[ScriptValue::Float(delta)],
        )?;
        Ok(())
    }

    /// Call `method` on every entity script object.
    pub(super) fn call_entity_scripts(&mut self, method: &str, delta: f32) -> Result<(), SceneError> {
        let objects: Vec<ScriptObjectHandle> = self
            .ecs
            .query::<&ScriptObjectComponent>()
            .iter()
            .map(|(_, script)| script.script_object_handle)
            .filter(|h| h.valid())
            .collect();

        let mut scripting = self.engines.scripting.borrow_mut();
        for object in objects {
            scripting.execute(
                self.execution_context,
                object,
                method,
                &[ScriptValue::Float(delta)],
            )?;
        }
        Ok(())
    }
}
