// Multi-source model catalog
//
// Resolves virtual model names to their multi-source configuration and
// identifies pseudo column references. Stands in for the metadata layer.

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{FederationError, Result};
use crate::models::{ColumnRef, MultiSourceModel};

pub trait MultiSourceCatalog: Send + Sync {
    /// Multi-source configuration of `model_name`, or `None` when the model
    /// is backed by a single source
    fn resolve_multi_source_model(&self, model_name: &str) -> Result<Option<Arc<MultiSourceModel>>>;

    /// Whether `column` is the pseudo column of `model`
    fn is_pseudo_column(&self, model: &MultiSourceModel, column: &ColumnRef) -> Result<bool> {
        Ok(column.name.eq_ignore_ascii_case(&model.pseudo_column))
    }
}

/// Catalog built from configuration; immutable once loaded
#[derive(Debug, Clone, Default)]
pub struct StaticCatalog {
    models: HashMap<String, Arc<MultiSourceModel>>,
}

impl StaticCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, model: MultiSourceModel) -> Result<()> {
        for (idx, source) in model.sources.iter().enumerate() {
            if model.sources[..idx].contains(source) {
                return Err(FederationError::Config(format!(
                    "Model '{}' binds source '{}' more than once",
                    model.name, source
                )));
            }
        }
        if self.models.contains_key(&model.name) {
            return Err(FederationError::Config(format!(
                "Model '{}' is configured more than once",
                model.name
            )));
        }

        tracing::info!(
            "Registered multi-source model '{}' with sources {:?}",
            model.name,
            model.sources
        );
        self.models.insert(model.name.clone(), Arc::new(model));
        Ok(())
    }

    pub fn with_model(mut self, model: MultiSourceModel) -> Result<Self> {
        self.register(model)?;
        Ok(self)
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}

impl MultiSourceCatalog for StaticCatalog {
    fn resolve_multi_source_model(&self, model_name: &str) -> Result<Option<Arc<MultiSourceModel>>> {
        Ok(self.models.get(model_name).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DataType;

    fn accounts() -> MultiSourceModel {
        MultiSourceModel::new("Accounts", vec!["east".to_string(), "west".to_string()])
    }

    #[test]
    fn test_resolve() {
        let catalog = StaticCatalog::new().with_model(accounts()).unwrap();
        assert_eq!(catalog.len(), 1);

        let model = catalog.resolve_multi_source_model("Accounts").unwrap().unwrap();
        assert_eq!(model.sources, vec!["east", "west"]);
        assert!(catalog.resolve_multi_source_model("Orders").unwrap().is_none());
    }

    #[test]
    fn test_pseudo_column_match_ignores_case() {
        let catalog = StaticCatalog::new();
        let model = accounts();
        let pseudo = ColumnRef::new(Some("a"), "source_name", DataType::String);
        let other = ColumnRef::new(Some("a"), "name", DataType::String);
        assert!(catalog.is_pseudo_column(&model, &pseudo).unwrap());
        assert!(!catalog.is_pseudo_column(&model, &other).unwrap());
    }

    #[test]
    fn test_duplicate_configuration_rejected() {
        let mut catalog = StaticCatalog::new();
        catalog.register(accounts()).unwrap();
        assert!(catalog.register(accounts()).is_err());

        let repeated = MultiSourceModel::new("Orders", vec!["east".to_string(), "east".to_string()]);
        let err = catalog.register(repeated).unwrap_err();
        assert_eq!(err.code(), "CONFIG_ERROR");
    }
}
