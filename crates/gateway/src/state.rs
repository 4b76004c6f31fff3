use crate::metrics::Metrics;
use inference::ModelHost;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub host: Arc<ModelHost>,
    pub metrics: Metrics,
}

impl AppState {
    pub fn new(host: Arc<ModelHost>) -> Self {
        Self {
            host,
            metrics: Metrics::default(),
        }
    }
}
