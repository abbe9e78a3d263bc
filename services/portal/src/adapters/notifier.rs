//! services/portal/src/adapters/notifier.rs

use apex_access_core::ports::Notifier;
use async_trait::async_trait;
use tracing::warn;

/// Surfaces gate notices through the log, tagged with the tab they concern.
#[derive(Clone, Debug)]
pub struct LogNotifier {
    tab_id: String,
}

impl LogNotifier {
    pub fn for_tab(tab_id: &str) -> Self {
        Self {
            tab_id: tab_id.to_string(),
        }
    }
}

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, message: &str) {
        warn!(tab = %self.tab_id, "{}", message);
    }
}
