//! Application state shared across handlers.

use std::sync::Arc;

use crate::config::RelayConfig;
use crate::services::auth::AuthTranslator;
use crate::services::documents::{DocumentRenderer, PdfRenderer};
use crate::services::email::{MailError, Mailer, ResendMailer};
use crate::services::upstream::UpstreamClient;
use crate::store::{RecordStore, RestStore, StoreError};

/// Error building application state.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("failed to build upstream client: {0}")]
    Upstream(#[from] reqwest::Error),
    #[error("failed to build record store client: {0}")]
    Store(#[from] StoreError),
    #[error("failed to build mailer: {0}")]
    Mail(#[from] MailError),
}

/// Application state shared across all handlers.
///
/// Cheaply cloneable via `Arc`. The record store, mailer and document
/// renderer sit behind traits so tests can substitute them.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: RelayConfig,
    upstream: UpstreamClient,
    auth: AuthTranslator,
    store: Arc<dyn RecordStore>,
    mailer: Arc<dyn Mailer>,
    renderer: Arc<dyn DocumentRenderer>,
}

impl AppState {
    /// Create application state with the production collaborators.
    ///
    /// # Errors
    ///
    /// Returns an error if any HTTP client fails to build.
    pub fn new(config: RelayConfig) -> Result<Self, StateError> {
        let store = Arc::new(RestStore::new(&config.store)?);
        let mailer = Arc::new(ResendMailer::new(&config.email)?);
        Self::from_parts(config, store, mailer, Arc::new(PdfRenderer))
    }

    /// Create application state with explicit collaborators.
    ///
    /// # Errors
    ///
    /// Returns an error if the upstream client fails to build.
    pub fn from_parts(
        config: RelayConfig,
        store: Arc<dyn RecordStore>,
        mailer: Arc<dyn Mailer>,
        renderer: Arc<dyn DocumentRenderer>,
    ) -> Result<Self, StateError> {
        let upstream = UpstreamClient::new(&config.upstream)?;
        let auth = AuthTranslator::new(config.upstream.origin());

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                upstream,
                auth,
                store,
                mailer,
                renderer,
            }),
        })
    }

    /// Get a reference to the relay configuration.
    #[must_use]
    pub fn config(&self) -> &RelayConfig {
        &self.inner.config
    }

    /// Get a reference to the upstream commerce API client.
    #[must_use]
    pub fn upstream(&self) -> &UpstreamClient {
        &self.inner.upstream
    }

    /// Get a reference to the outbound auth translator.
    #[must_use]
    pub fn auth(&self) -> &AuthTranslator {
        &self.inner.auth
    }

    /// Get a reference to the record store.
    #[must_use]
    pub fn store(&self) -> &dyn RecordStore {
        self.inner.store.as_ref()
    }

    /// Get a reference to the mailer.
    #[must_use]
    pub fn mailer(&self) -> &dyn Mailer {
        self.inner.mailer.as_ref()
    }

    /// Get a reference to the document renderer.
    #[must_use]
    pub fn renderer(&self) -> &dyn DocumentRenderer {
        self.inner.renderer.as_ref()
    }
}
