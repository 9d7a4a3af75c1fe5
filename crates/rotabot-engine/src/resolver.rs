//! Duty resolver — orchestrates the store and the rotation engine.
//!
//! Read history, decide, persist the new assignment when the rotation
//! advanced, return the resolved identity. The read-decide-write
//! section is serialized per rota with an async mutex so two
//! concurrent callers racing on the same expired window cannot both
//! append a record.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::Mutex;

use rotabot_core::error::{Result, RotaBotError};
use rotabot_core::traits::HistoryStore;
use rotabot_core::types::HistoryRecord;

use crate::engine::decide;
use crate::registry::RotaRegistry;

/// Async callback resolving a display name to a platform user id.
/// Injected so the resolver stays decoupled from the chat gateway.
pub type IdentityFn =
    Arc<dyn Fn(String) -> Pin<Box<dyn Future<Output = Result<String>> + Send>> + Send + Sync>;

/// The outcome of a resolve call.
#[derive(Debug, Clone)]
pub struct Resolution {
    pub rota_id: String,
    /// Participant display name currently on duty.
    pub assignee: String,
    /// Platform user id, when identity resolution was requested and
    /// succeeded. `None` means degrade to the display name.
    pub user_id: Option<String>,
    /// Whether this call advanced the rotation (and wrote a record).
    pub transitioned: bool,
}

impl Resolution {
    /// A mention string for chat delivery: `<@UID>` when the identity
    /// resolved, the bare display name otherwise.
    pub fn mention(&self) -> String {
        match &self.user_id {
            Some(id) => format!("<@{id}>"),
            None => self.assignee.clone(),
        }
    }
}

/// Resolves the current duty-holder for any configured rota.
pub struct DutyResolver {
    registry: RotaRegistry,
    store: Arc<dyn HistoryStore>,
    identity: Option<IdentityFn>,
    /// One lock per rota id, built at construction. Serializes the
    /// read-decide-write section; unrelated rotas proceed in parallel.
    locks: HashMap<String, Mutex<()>>,
}

impl DutyResolver {
    pub fn new(registry: RotaRegistry, store: Arc<dyn HistoryStore>) -> Self {
        let locks = registry
            .all()
            .iter()
            .map(|r| (r.id.clone(), Mutex::new(())))
            .collect();
        Self {
            registry,
            store,
            identity: None,
            locks,
        }
    }

    /// Install the identity-resolution callback.
    pub fn set_identity_resolver<F, Fut>(&mut self, f: F)
    where
        F: Fn(String) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<String>> + Send + 'static,
    {
        self.identity = Some(Arc::new(move |name| Box::pin(f(name))));
    }

    /// Resolve the current duty-holder by display name only.
    pub async fn resolve(&self, rota_id: &str) -> Result<Resolution> {
        self.resolve_inner(rota_id, false).await
    }

    /// Resolve and additionally map the assignee to a platform user
    /// id. Identity failures degrade to the display name — a reminder
    /// without a proper mention still beats no reminder.
    pub async fn resolve_identified(&self, rota_id: &str) -> Result<Resolution> {
        self.resolve_inner(rota_id, true).await
    }

    async fn resolve_inner(&self, rota_id: &str, want_identity: bool) -> Result<Resolution> {
        let rota = self.registry.get(rota_id)?;

        // Known rota ids always have a lock; guard anyway.
        let lock = self
            .locks
            .get(rota_id)
            .ok_or_else(|| RotaBotError::RotaNotFound(rota_id.to_string()))?;

        let decision = {
            let _guard = lock.lock().await;

            let history = self.store.scan_all().await?;
            let decision = decide(rota, &history, Utc::now())?;

            if decision.transitioned {
                // new_end_time is always set on a transition
                let end_time = decision.new_end_time.unwrap_or_else(Utc::now);
                let record = HistoryRecord::new(rota_id, &decision.assignee, end_time);
                tracing::info!(
                    "rota {rota_id}: duty passes to {} until {end_time}",
                    decision.assignee
                );
                self.store.put(record).await?;
            }

            decision
        };

        let user_id = if want_identity {
            self.lookup_identity(&decision.assignee).await
        } else {
            None
        };

        Ok(Resolution {
            rota_id: rota_id.to_string(),
            assignee: decision.assignee,
            user_id,
            transitioned: decision.transitioned,
        })
    }

    async fn lookup_identity(&self, display_name: &str) -> Option<String> {
        let resolver = self.identity.as_ref()?;
        match resolver(display_name.to_string()).await {
            Ok(id) if id != "unknown" && !id.is_empty() => Some(id),
            Ok(_) => {
                tracing::warn!("no platform identity for '{display_name}', using display name");
                None
            }
            Err(e) => {
                tracing::warn!("identity resolution failed for '{display_name}': {e}");
                None
            }
        }
    }
}
