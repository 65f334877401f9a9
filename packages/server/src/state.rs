use std::sync::Arc;

use crate::config::AppConfig;
use crate::service::FeedbackService;
use crate::streaming::AssetStreamer;

#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub feedback: Arc<dyn FeedbackService>,
    pub assets: Arc<AssetStreamer>,
}

impl AppState {
    pub fn new(config: AppConfig, feedback: Arc<dyn FeedbackService>) -> Self {
        let assets = Arc::new(AssetStreamer::new(
            feedback.clone(),
            config.storage.max_asset_size,
        ));
        Self {
            config,
            feedback,
            assets,
        }
    }
}
