use std::sync::Arc;

use helpdesk_core::{ClassificationService, Config, SanitizedConfig, StatsAggregator, TicketStore};

/// Shared application state.
pub struct AppState {
    config: Config,
    ticket_store: Arc<dyn TicketStore>,
    stats: StatsAggregator,
    classifier: Arc<ClassificationService>,
}

impl AppState {
    pub fn new(
        config: Config,
        ticket_store: Arc<dyn TicketStore>,
        classifier: Arc<ClassificationService>,
    ) -> Self {
        let stats = StatsAggregator::new(Arc::clone(&ticket_store));
        Self {
            config,
            ticket_store,
            stats,
            classifier,
        }
    }

    pub fn ticket_store(&self) -> &dyn TicketStore {
        self.ticket_store.as_ref()
    }

    pub fn stats(&self) -> &StatsAggregator {
        &self.stats
    }

    pub fn classifier(&self) -> &ClassificationService {
        self.classifier.as_ref()
    }

    pub fn sanitized_config(&self) -> SanitizedConfig {
        SanitizedConfig::from(&self.config)
    }
}
