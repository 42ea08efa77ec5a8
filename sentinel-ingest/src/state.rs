//! Shared application state, injected into every axum handler via
//! `Router<Arc<AppState>>` and a single `.with_state()` call.

use std::sync::Arc;

use sentinel_types::ThresholdConfig;

use crate::config::IngestConfig;
use crate::hub::BroadcastHub;
use crate::processor::EventProcessor;
use crate::pubsub::PubSubBridge;
use crate::store::Store;

pub struct AppState {
    pub store: Store,
    pub hub: Arc<BroadcastHub>,
    pub pubsub: PubSubBridge,
    pub processor: EventProcessor,
    pub bot_secret: String,
    pub thresholds: ThresholdConfig,
}

impl AppState {
    pub async fn new(config: &IngestConfig) -> Result<Arc<Self>, sqlx::Error> {
        let store = Store::connect(&config.database_url).await?;
        let hub = BroadcastHub::new(config.broadcast_capacity);
        let pubsub = PubSubBridge::new(config.broadcast_capacity);
        let processor = EventProcessor::new(store.clone(), hub.clone(), pubsub.clone());

        Ok(Arc::new(Self {
            store,
            hub,
            pubsub,
            processor,
            bot_secret: config.bot_secret.clone(),
            thresholds: config.thresholds,
        }))
    }
}
