//! Scene serialization
//!
//! A saved scene stores components as they are, handles included, plus the
//! name of every asset handle it mentions. Loading resolves those names
//! against the current [`ResourceRegistry`] and normalizes every component,
//! see [`HandleRemap`].

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use hecs::Entity;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use super::normalize::{HandleRemap, Normalize};
use super::{Scene, SceneComponent, SceneError};
use crate::assets::{ResourceKind, ResourceRegistry, ResourceTag};
use crate::ecs::{
    AnimationComponent, DirtyFlags, EcsComponent, GhostObjectComponent, GraphicsComponent,
    GraphicsTerrainComponent, OrientationComponent, PathfindingAgentComponent,
    PathfindingCrowdComponent, PointLightComponent, PositionComponent, PropertiesComponent,
    RigidBodyObjectComponent, ScriptObjectComponent, SkeletonComponent,
};
use crate::engines::scripting::DESERIALIZE;
use crate::handles::Handle;

/// Version written by [`Scene::serialize`].
pub const FORMAT_VERSION: u32 = 1;

/// Saved handle id to asset name, per asset kind.
pub type ResourceNames = BTreeMap<ResourceKind, BTreeMap<u64, String>>;

/// Script type to recreate on load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerializedScript {
    pub module: String,
    pub type_name: String,
}

/// One saved entity
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SerializedEntity {
    /// Entity id at save time; only meaningful inside the saved scene
    pub id: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<PositionComponent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub orientation: Option<OrientationComponent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub graphics: Option<GraphicsComponent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub point_light: Option<PointLightComponent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub terrain: Option<GraphicsTerrainComponent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rigid_body: Option<RigidBodyObjectComponent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ghost_object: Option<GhostObjectComponent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub crowd: Option<PathfindingCrowdComponent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent: Option<PathfindingAgentComponent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub animation: Option<AnimationComponent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skeleton: Option<SkeletonComponent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub properties: Option<PropertiesComponent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent: Option<u64>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub script: Option<SerializedScript>,
}

/// Serializable scene
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SerializedScene {
    pub name: String,
    pub version: u32,
    pub entities: Vec<SerializedEntity>,
    pub resources: ResourceNames,
}

impl SerializedScene {
    /// Number of entities in the scene
    #[must_use]
    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    /// Encode as pretty RON.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding fails.
    pub fn to_ron_string(&self) -> Result<String, SceneError> {
        ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
            .map_err(|e| SceneError::Serialize(e.to_string()))
    }

    /// # Errors
    ///
    /// Returns an error if the text is not a valid scene.
    pub fn from_ron_str(text: &str) -> Result<Self, SceneError> {
        ron::from_str(text).map_err(|e| SceneError::Deserialize(e.to_string()))
    }

    /// Encode as pretty JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding fails.
    pub fn to_json_string(&self) -> Result<String, SceneError> {
        serde_json::to_string_pretty(self).map_err(|e| SceneError::Serialize(e.to_string()))
    }

    /// # Errors
    ///
    /// Returns an error if the text is not a valid scene.
    pub fn from_json_str(text: &str) -> Result<Self, SceneError> {
        serde_json::from_str(text).map_err(|e| SceneError::Deserialize(e.to_string()))
    }

    /// Save to a RON file
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or file writing fails.
    pub fn save_ron(&self, path: impl AsRef<Path>) -> Result<(), SceneError> {
        let ron_string = self.to_ron_string()?;
        fs::write(path, ron_string).map_err(|e| SceneError::Io(e.to_string()))?;
        Ok(())
    }

    /// Load from a RON file
    ///
    /// # Errors
    ///
    /// Returns an error if file reading or deserialization fails.
    pub fn load_ron(path: impl AsRef<Path>) -> Result<Self, SceneError> {
        let content = fs::read_to_string(path).map_err(|e| SceneError::Io(e.to_string()))?;
        Self::from_ron_str(&content)
    }

    /// Save to a JSON file
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or file writing fails.
    pub fn save_json(&self, path: impl AsRef<Path>) -> Result<(), SceneError> {
        let json_string = self.to_json_string()?;
        fs::write(path, json_string).map_err(|e| SceneError::Io(e.to_string()))?;
        Ok(())
    }

    /// Load from a JSON file
    ///
    /// # Errors
    ///
    /// Returns an error if file reading or deserialization fails.
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, SceneError> {
        let content = fs::read_to_string(path).map_err(|e| SceneError::Io(e.to_string()))?;
        Self::from_json_str(&content)
    }
}

/// Collects the names of the asset handles a scene mentions.
struct NameTable<'a> {
    registry: &'a ResourceRegistry,
    names: ResourceNames,
}

impl NameTable<'_> {
    fn record<T: ResourceTag>(&mut self, handle: Handle<T>) -> Result<(), SceneError> {
        if !handle.valid() {
            return Ok(());
        }
        let name = self
            .registry
            .name(handle)
            .ok_or(SceneError::UnnamedResource {
                kind: T::KIND,
                id: handle.id(),
            })?;
        self.names
            .entry(T::KIND)
            .or_default()
            .insert(handle.id(), name.to_owned());
        Ok(())
    }

    fn record_entity(&mut self, entity: &SerializedEntity) -> Result<(), SceneError> {
        if let Some(graphics) = &entity.graphics {
            self.record(graphics.mesh_handle)?;
            self.record(graphics.texture_handle)?;
        }
        if let Some(terrain) = &entity.terrain {
            self.record(terrain.terrain_handle)?;
        }
        if let Some(body) = &entity.rigid_body {
            self.record(body.collision_shape_handle)?;
        }
        if let Some(ghost) = &entity.ghost_object {
            self.record(ghost.collision_shape_handle)?;
        }
        if let Some(crowd) = &entity.crowd {
            self.record(crowd.navigation_mesh_handle)?;
        }
        if let Some(animation) = &entity.animation {
            self.record(animation.animation_handle)?;
        }
        if let Some(skeleton) = &entity.skeleton {
            self.record(skeleton.skeleton_handle)?;
        }
        Ok(())
    }
}

fn entity_id(entity: Entity) -> u64 {
    entity.to_bits().get()
}

fn lookup(entities: &FxHashMap<u64, Entity>, id: u64) -> Result<Entity, SceneError> {
    entities.get(&id).copied().ok_or(SceneError::UnknownEntity(id))
}

impl Scene {
    /// Snapshot every entity.
    ///
    /// # Errors
    ///
    /// Returns [`SceneError::UnnamedResource`] if a component holds an asset
    /// handle the registry has no name for.
    pub fn serialize(&self) -> Result<SerializedScene, SceneError> {
        let registry = self.engines.resources.borrow();
        let mut names = NameTable {
            registry: &registry,
            names: ResourceNames::new(),
        };

        let mut entities = Vec::new();
        for entity in self.ecs.entities() {
            let record = SerializedEntity {
                id: entity_id(entity),
                position: self.get(entity),
                orientation: self.get(entity),
                graphics: self.get(entity),
                point_light: self.get(entity),
                terrain: self.get(entity),
                rigid_body: self.get(entity),
                ghost_object: self.get(entity),
                crowd: self.get(entity),
                agent: self.get(entity),
                animation: self.get(entity),
                skeleton: self.get(entity),
                properties: self.get(entity),
                parent: self.parent(entity).map(entity_id),
                children: self.children(entity).into_iter().map(entity_id).collect(),
                script: self
                    .get::<ScriptObjectComponent>(entity)
                    .map(|script| SerializedScript {
                        module: script.module,
                        type_name: script.type_name,
                    }),
            };
            names.record_entity(&record)?;
            entities.push(record);
        }
        entities.sort_by_key(|entity| entity.id);

        Ok(SerializedScene {
            name: self.config.name.clone(),
            version: FORMAT_VERSION,
            entities,
            resources: names.names,
        })
    }

    /// Replace the scene's contents with a saved scene.
    ///
    /// Asset handles are remapped by name, script objects are recreated and
    /// get `deserialize(Entity)` called, and crowds are recreated at once.
    /// Every other engine resource is recreated by the next tick.
    ///
    /// # Errors
    ///
    /// Errors found before any entity is replaced (format version, unknown
    /// asset names, duplicate or dangling entity ids) leave the scene as it
    /// was. A failure after that leaves the scene empty.
    pub fn deserialize(&mut self, data: &SerializedScene) -> Result<(), SceneError> {
        let result = self.check(data).and_then(|remap| {
            let loaded = self.load(data, remap);
            if loaded.is_err() {
                self.clear();
            }
            loaded
        });
        if let Err(error) = &result {
            log::error!("failed to load scene '{}': {error}", data.name);
        }
        result
    }

    /// Everything that can be verified without touching the scene.
    fn check(&self, data: &SerializedScene) -> Result<HandleRemap, SceneError> {
        if data.version != FORMAT_VERSION {
            return Err(SceneError::UnsupportedVersion(data.version));
        }
        let remap = HandleRemap::from_names(&data.resources, &self.engines.resources.borrow())?;

        let mut ids = FxHashMap::default();
        for record in &data.entities {
            if ids.insert(record.id, ()).is_some() {
                return Err(SceneError::Deserialize(format!(
                    "entity {:#x} saved twice",
                    record.id
                )));
            }
        }
        for record in &data.entities {
            for &id in record.parent.iter().chain(&record.children) {
                if !ids.contains_key(&id) {
                    return Err(SceneError::UnknownEntity(id));
                }
            }
        }
        Ok(remap)
    }

    fn load(&mut self, data: &SerializedScene, mut remap: HandleRemap) -> Result<(), SceneError> {
        self.clear();
        self.config.name.clone_from(&data.name);

        let mut entities = FxHashMap::default();
        for record in &data.entities {
            entities.insert(record.id, self.create_entity());
        }

        // Agents name their crowd by handle, so crowds exist before agents
        // are normalized.
        for record in &data.entities {
            let Some(crowd) = &record.crowd else {
                continue;
            };
            let entity = lookup(&entities, record.id)?;
            let old = crowd.crowd_handle;
            self.insert_normalized(entity, Some(crowd), &remap)?;
            PathfindingCrowdComponent::bind(entity, self);
            if let Some(new) = self.get::<PathfindingCrowdComponent>(entity)
                && old.valid()
            {
                remap.insert_crowd(old, new.crowd_handle);
            }
        }

        for record in &data.entities {
            let entity = lookup(&entities, record.id)?;
            self.insert_normalized(entity, record.position.as_ref(), &remap)?;
            self.insert_normalized(entity, record.orientation.as_ref(), &remap)?;
            self.insert_normalized(entity, record.graphics.as_ref(), &remap)?;
            self.insert_normalized(entity, record.point_light.as_ref(), &remap)?;
            self.insert_normalized(entity, record.terrain.as_ref(), &remap)?;
            self.insert_normalized(entity, record.rigid_body.as_ref(), &remap)?;
            self.insert_normalized(entity, record.ghost_object.as_ref(), &remap)?;
            self.insert_normalized(entity, record.agent.as_ref(), &remap)?;
            self.insert_normalized(entity, record.animation.as_ref(), &remap)?;
            self.insert_normalized(entity, record.skeleton.as_ref(), &remap)?;
            self.insert_normalized(entity, record.properties.as_ref(), &remap)?;
        }

        for record in &data.entities {
            let entity = lookup(&entities, record.id)?;
            if let Some(parent) = record.parent {
                self.set_parent(entity, lookup(&entities, parent)?)?;
            }
            for &child in &record.children {
                self.set_parent(lookup(&entities, child)?, entity)?;
            }
        }

        for record in &data.entities {
            if let Some(script) = &record.script {
                let entity = lookup(&entities, record.id)?;
                self.bind_script(entity, &script.module, &script.type_name, DESERIALIZE)?;
            }
        }

        for &entity in entities.values() {
            self.raise_dirty(entity, DirtyFlags::SOURCE_SCRIPT | DirtyFlags::ALL);
        }
        log::info!(
            "loaded scene '{}' with {} entities",
            data.name,
            data.entities.len()
        );
        Ok(())
    }

    /// Raw write of a normalized copy of `component`.
    fn insert_normalized<C>(
        &mut self,
        entity: Entity,
        component: Option<&C>,
        remap: &HandleRemap,
    ) -> Result<(), SceneError>
    where
        C: EcsComponent + Normalize + Clone,
    {
        if let Some(component) = component {
            let mut component = component.clone();
            component.normalize(remap)?;
            self.ecs.insert(entity, component)?;
        }
        Ok(())
    }
}
