// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 stacflow contributors

//! Module registry
//!
//! Maps module names from workflow documents to concrete constructors.
//! The built-in registry covers the shipped modules; embedders can
//! register their own constructors under new names.

use std::collections::HashMap;

use super::{Module, ModuleConfig, ModuleRole};
use crate::errors::{StacflowError, StacflowResult};

/// Constructor signature: build a module instance from its (possibly
/// matrix-merged) config mapping.
pub type ModuleConstructor = fn(&ModuleConfig) -> StacflowResult<Module>;

/// Name → constructor map for pipeline modules
///
/// Each entry declares its role up front so workflow validation can check
/// the pipeline shape before any module is instantiated.
pub struct ModuleRegistry {
    constructors: HashMap<String, (ModuleRole, ModuleConstructor)>,
}

impl ModuleRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self { constructors: HashMap::new() }
    }

    /// Registry with all built-in modules registered
    pub fn builtin() -> Self {
        use ModuleRole::{Sink, Source, Transform};

        let mut registry = Self::new();
        registry.register("StaticSourceModule", Source, super::StaticSourceModule::construct);
        registry.register("SeedModule", Source, super::SeedModule::construct);
        registry.register("IngestModule", Source, super::IngestModule::construct);
        registry.register("TransformModule", Transform, super::TransformModule::construct);
        registry.register("ScaffoldModule", Transform, super::ScaffoldModule::construct);
        registry.register("ExtensionModule", Transform, super::ExtensionModule::construct);
        registry.register("UpdateModule", Transform, super::UpdateModule::construct);
        registry.register("ValidateModule", Transform, super::ValidateModule::construct);
        registry.register("OutputModule", Sink, super::OutputModule::construct);
        registry
    }

    /// Register a constructor under a module name
    pub fn register(&mut self, name: &str, role: ModuleRole, constructor: ModuleConstructor) {
        self.constructors.insert(name.to_string(), (role, constructor));
    }

    /// Whether a module name resolves in this registry
    pub fn contains(&self, name: &str) -> bool {
        self.constructors.contains_key(name)
    }

    /// Declared role of a module name, if registered
    pub fn role_of(&self, name: &str) -> Option<ModuleRole> {
        self.constructors.get(name).map(|(role, _)| *role)
    }

    /// Registered module names, sorted
    pub fn module_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.constructors.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Instantiate a module by name with the given config
    pub fn instantiate(&self, name: &str, config: &ModuleConfig) -> StacflowResult<Module> {
        let (_, constructor) = self
            .constructors
            .get(name)
            .ok_or_else(|| StacflowError::UnknownModule { module: name.to_string() })?;
        constructor(config)
    }
}

impl Default for ModuleRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}
