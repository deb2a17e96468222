//! Shader module loading and caching.

use log::{debug, info};
use std::{collections::HashMap, sync::Arc};
use thiserror::Error;
use wgpu::{ShaderModuleDescriptor, ShaderSource};

/// WGSL for body surfaces, overlays, trails and the backdrop.
pub const SCENE_SHADER_SOURCE: &str = include_str!("scene.wgsl");

/// WGSL for instanced star sprites.
pub const STARS_SHADER_SOURCE: &str = include_str!("stars.wgsl");

/// Error types for shader lookup.
#[derive(Debug, Error)]
pub enum ShaderError {
    #[error("shader '{name}' not found in library")]
    NotLoaded { name: String },
}

/// Registry of compiled shader modules keyed by name.
pub struct ShaderLibrary {
    modules: HashMap<String, Arc<wgpu::ShaderModule>>,
}

impl ShaderLibrary {
    pub fn new() -> Self {
        Self {
            modules: HashMap::new(),
        }
    }

    /// Library with the scene and star shaders already compiled.
    pub fn with_builtin(device: &wgpu::Device) -> Self {
        let mut library = Self::new();
        library.load_from_source(device, "scene", SCENE_SHADER_SOURCE);
        library.load_from_source(device, "stars", STARS_SHADER_SOURCE);
        library
    }

    /// Compile a shader from a WGSL source string, replacing any module of the same name.
    pub fn load_from_source(
        &mut self,
        device: &wgpu::Device,
        name: &str,
        source: &str,
    ) -> Arc<wgpu::ShaderModule> {
        debug!("Loading shader '{}' from source", name);

        let module = Arc::new(device.create_shader_module(ShaderModuleDescriptor {
            label: Some(name),
            source: ShaderSource::Wgsl(source.into()),
        }));

        if self
            .modules
            .insert(name.to_string(), Arc::clone(&module))
            .is_some()
        {
            info!("Replaced shader '{}'", name);
        } else {
            info!("Loaded shader '{}'", name);
        }
        module
    }

    pub fn get(&self, name: &str) -> Result<Arc<wgpu::ShaderModule>, ShaderError> {
        self.modules
            .get(name)
            .cloned()
            .ok_or_else(|| ShaderError::NotLoaded {
                name: name.to_string(),
            })
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }
}

impl Default for ShaderLibrary {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::texture::create_test_device_queue;

    #[test]
    fn test_shader_library_starts_empty() {
        let library = ShaderLibrary::new();
        assert!(library.is_empty());
        assert!(matches!(
            library.get("scene"),
            Err(ShaderError::NotLoaded { .. })
        ));
    }

    #[test]
    fn test_builtin_shaders_compile() {
        let Some((device, _queue)) = create_test_device_queue() else {
            return;
        };
        let library = ShaderLibrary::with_builtin(&device);
        assert_eq!(library.len(), 2);
        assert!(library.get("scene").is_ok());
        assert!(library.get("stars").is_ok());
    }

    #[test]
    fn test_cache_returns_same_module_for_same_name() {
        let Some((device, _queue)) = create_test_device_queue() else {
            return;
        };
        let library = ShaderLibrary::with_builtin(&device);
        let a = library.get("stars").unwrap();
        let b = library.get("stars").unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_sources_declare_expected_entry_points() {
        for entry in ["fn vs_main", "fn vs_sky", "fn fs_surface", "fn fs_additive", "fn fs_flat"] {
            assert!(SCENE_SHADER_SOURCE.contains(entry), "missing {entry}");
        }
        for entry in ["fn vs_star", "fn fs_star"] {
            assert!(STARS_SHADER_SOURCE.contains(entry), "missing {entry}");
        }
    }
}
