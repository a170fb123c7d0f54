// Dialect Registry
//
// Maps source binding names to their rendering configuration and renders
// commands for a named source. Rendering is deterministic, so rendered text
// may be cached per (binding, command).

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::error::{FederationError, Result};
use crate::models::{Command, ExecutionContext};
use crate::services::dialect::DialectConfig;
use crate::services::renderer::{RenderedCommand, SqlRenderer};

type RenderCache = Arc<RwLock<HashMap<(String, String), RenderedCommand>>>;

/// Per-source dialect configurations sharing one renderer
pub struct DialectRegistry {
    renderer: SqlRenderer,
    sources: HashMap<String, Arc<DialectConfig>>,
    /// Optional render cache ((binding, serialized command) -> rendered)
    cache: Option<RenderCache>,
}

impl DialectRegistry {
    pub fn new(renderer: SqlRenderer) -> Self {
        Self {
            renderer,
            sources: HashMap::new(),
            cache: None,
        }
    }

    /// Create a registry that caches rendered commands
    pub fn with_cache(renderer: SqlRenderer) -> Self {
        let mut registry = Self::new(renderer);
        registry.cache = Some(Arc::new(RwLock::new(HashMap::new())));
        registry
    }

    /// Register (or replace) the dialect of a source binding
    pub fn register(&mut self, binding: impl Into<String>, config: DialectConfig) {
        let binding = binding.into();
        tracing::info!("Registered source '{}' ({})", binding, config.dialect_name());
        self.sources.insert(binding, Arc::new(config));
    }

    pub fn dialect(&self, binding: &str) -> Option<Arc<DialectConfig>> {
        self.sources.get(binding).cloned()
    }

    /// Registered binding names, sorted
    pub fn bindings(&self) -> Vec<&str> {
        let mut bindings: Vec<&str> = self.sources.keys().map(String::as_str).collect();
        bindings.sort_unstable();
        bindings
    }

    pub fn renderer(&self) -> &SqlRenderer {
        &self.renderer
    }

    /// Render `command` for the source bound as `binding`
    pub async fn render(
        &self,
        binding: &str,
        command: &Command,
        context: Option<&ExecutionContext>,
    ) -> Result<RenderedCommand> {
        let config = self.sources.get(binding).ok_or_else(|| {
            FederationError::Metadata(format!("No dialect registered for source '{}'", binding))
        })?;

        // trace comments vary per request and are never cached
        let cacheable = !(config.trace_comments && context.is_some());
        let cache = self.cache.as_ref().filter(|_| cacheable);

        let Some(cache) = cache else {
            return self.renderer.render(command, config, context);
        };

        let cache_key = (binding.to_string(), serde_json::to_string(command)?);
        {
            let cache_read = cache.read().await;
            if let Some(cached) = cache_read.get(&cache_key) {
                tracing::debug!("Cache hit for render on source '{}'", binding);
                return Ok(cached.clone());
            }
        }

        let rendered = self.renderer.render(command, config, context)?;

        let mut cache_write = cache.write().await;
        cache_write.insert(cache_key, rendered.clone());
        tracing::debug!("Cached render result for source '{}'", binding);

        Ok(rendered)
    }

    /// Clear the render cache
    pub async fn clear_cache(&self) {
        if let Some(cache) = &self.cache {
            let mut cache_write = cache.write().await;
            cache_write.clear();
            tracing::info!("Render cache cleared");
        }
    }

    /// Number of cached renders, if caching is enabled
    pub async fn cache_size(&self) -> Option<usize> {
        match &self.cache {
            Some(cache) => Some(cache.read().await.len()),
            None => None,
        }
    }
}

impl Default for DialectRegistry {
    fn default() -> Self {
        Self::new(SqlRenderer::default())
    }
}
