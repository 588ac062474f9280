use std::sync::Arc;

use sqlx::SqlitePool;

use crate::badges::external::ExternalBadgeClient;
use crate::config::Config;
use crate::label::{FontLoader, LabelSettings};
use crate::printer::LabelSink;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub external: ExternalBadgeClient,
    pub config: Config,
    /// Stock, margins and font search used to build every label request.
    pub label_settings: Arc<LabelSettings>,
    pub font_loader: Arc<dyn FontLoader>,
    pub printer: Arc<dyn LabelSink>,
}

#[cfg(test)]
pub mod test_support {
    use std::sync::Mutex;
    use std::time::Duration;

    use async_trait::async_trait;

    use super::*;
    use crate::db::memory_pool;
    use crate::label::{default_label_settings, FsFontLoader};
    use crate::printer::{PrintJob, PrinterError};

    /// Sink that keeps every job it is sent.
    #[derive(Default)]
    pub struct RecordingSink {
        pub jobs: Mutex<Vec<PrintJob>>,
    }

    #[async_trait]
    impl LabelSink for RecordingSink {
        async fn send(&self, job: &PrintJob) -> Result<(), PrinterError> {
            self.jobs.lock().unwrap().push(job.clone());
            Ok(())
        }

        fn describe(&self) -> String {
            "recording".to_string()
        }
    }

    /// State over an in-memory database, an unreachable upstream, and a loader that
    /// only ever yields the built-in font.
    pub async fn test_state(printer: Arc<dyn LabelSink>) -> AppState {
        let config = Config::from_lookup(|key| match key {
            "EXTERNAL_API_URL" => Some("http://127.0.0.1:9/api/getbadges".to_string()),
            "EXTERNAL_API_TIMEOUT_SECS" => Some("1".to_string()),
            "LABEL_FONTS" => Some("no-such-font.ttf".to_string()),
            _ => None,
        })
        .unwrap();
        let external =
            ExternalBadgeClient::new(config.external_api_url.clone(), Duration::from_secs(1))
                .unwrap();
        let label_settings = Arc::new(default_label_settings(
            &config.label_stock,
            config.font_candidates.clone(),
        ));

        AppState {
            db: memory_pool().await,
            external,
            config,
            label_settings,
            font_loader: Arc::new(FsFontLoader::new(Vec::new())),
            printer,
        }
    }
}
