use std::sync::Arc;

use crate::{assets::AssetLayout, config::AppConfig, store::CatalogStore};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub catalog: CatalogStore,
    pub assets: AssetLayout,
}

impl AppState {
    pub fn new(config: AppConfig) -> Self {
        let catalog = CatalogStore::new(config.catalog_path());
        let assets = AssetLayout::new(config.asset_root());
        Self {
            config: Arc::new(config),
            catalog,
            assets,
        }
    }
}
