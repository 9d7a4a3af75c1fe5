//! Trigger dispatcher — one recurring trigger per rota.
//!
//! Registration parses each rota's schedule expression up front; a
//! malformed expression disables that rota's alerting (reported once)
//! without touching the others. The firing loop ticks on a tokio
//! interval, and every due firing runs as its own task so a slow
//! store or gateway call cannot stall unrelated rotas or the inbound
//! message path.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use rotabot_core::error::RotaBotError;
use rotabot_core::traits::ChatGateway;
use rotabot_core::types::Rota;
use rotabot_engine::DutyResolver;

use crate::schedule::Schedule;

/// An armed trigger for one rota.
#[derive(Debug, Clone)]
struct Trigger {
    rota_id: String,
    schedule: Schedule,
    message: String,
    next_run: DateTime<Utc>,
}

/// A due firing, handed to the delivery task.
#[derive(Debug, Clone, PartialEq)]
pub struct Firing {
    pub rota_id: String,
    pub message: String,
}

pub struct TriggerDispatcher {
    triggers: Vec<Trigger>,
    resolver: Arc<DutyResolver>,
    gateway: Arc<dyn ChatGateway>,
    /// Resolved channel id reminders are delivered to.
    channel_id: String,
}

impl TriggerDispatcher {
    pub fn new(
        resolver: Arc<DutyResolver>,
        gateway: Arc<dyn ChatGateway>,
        channel_id: String,
    ) -> Self {
        Self {
            triggers: Vec::new(),
            resolver,
            gateway,
            channel_id,
        }
    }

    /// Register a trigger for one rota. A malformed schedule leaves
    /// the rota permanently unregistered (until restart).
    pub fn register(&mut self, rota: &Rota) -> Result<(), RotaBotError> {
        let schedule = Schedule::parse(&rota.alert.expression).map_err(|reason| {
            RotaBotError::ScheduleRegistrationFailed {
                rota_id: rota.id.clone(),
                reason,
            }
        })?;
        let next_run = schedule.next_run(Utc::now()).ok_or_else(|| {
            RotaBotError::ScheduleRegistrationFailed {
                rota_id: rota.id.clone(),
                reason: "schedule never fires".into(),
            }
        })?;

        tracing::info!(
            "⏰ trigger armed for rota {} ('{}'), first firing {next_run}",
            rota.id,
            rota.alert.expression
        );
        self.triggers.push(Trigger {
            rota_id: rota.id.clone(),
            schedule,
            message: rota.alert.message.clone(),
            next_run,
        });
        Ok(())
    }

    /// Register every rota, fail-open: registration failures are
    /// reported to the operators' channel and returned, while the
    /// remaining rotas' triggers stay active.
    pub async fn register_all(&mut self, rotas: &[Rota]) -> Vec<RotaBotError> {
        let mut failures = Vec::new();
        for rota in rotas {
            if let Err(e) = self.register(rota) {
                tracing::warn!("{e}");
                if let Err(send_err) = self
                    .gateway
                    .send_message(&self.channel_id, &format!("Failed to set monitor: {e}"))
                    .await
                {
                    tracing::warn!("could not report registration failure: {send_err}");
                }
                failures.push(e);
            }
        }
        failures
    }

    pub fn trigger_count(&self) -> usize {
        self.triggers.len()
    }

    /// Collect due firings and re-arm their triggers. Pure bookkeeping
    /// so the firing policy is unit-testable without a clock.
    pub fn tick(&mut self, now: DateTime<Utc>) -> Vec<Firing> {
        let mut due = Vec::new();
        for trigger in self.triggers.iter_mut() {
            if trigger.next_run > now {
                continue;
            }
            due.push(Firing {
                rota_id: trigger.rota_id.clone(),
                message: trigger.message.clone(),
            });
            // Re-arm from `now`, not from next_run: if the process was
            // asleep through several slots we fire once, not N times.
            match trigger.schedule.next_run(now) {
                Some(next) => trigger.next_run = next,
                None => {
                    tracing::warn!("trigger for rota {} could not re-arm", trigger.rota_id);
                    trigger.next_run = now + chrono::Duration::days(3650);
                }
            }
        }
        due
    }

    /// Resolve the duty-holder and deliver one reminder. Failures are
    /// logged and absorbed — a store fault costs this firing only.
    async fn fire(
        resolver: Arc<DutyResolver>,
        gateway: Arc<dyn ChatGateway>,
        channel_id: String,
        firing: Firing,
    ) {
        tracing::info!("🔔 reminder firing for rota {}", firing.rota_id);
        let resolution = match resolver.resolve_identified(&firing.rota_id).await {
            Ok(r) => r,
            Err(e) => {
                tracing::error!("reminder for rota {} skipped: {e}", firing.rota_id);
                return;
            }
        };

        let text = format!("{} {}", resolution.mention(), firing.message);
        if let Err(e) = gateway.send_message(&channel_id, &text).await {
            tracing::error!("reminder delivery for rota {} failed: {e}", firing.rota_id);
        }
    }
}

/// Run the dispatcher loop. Each due firing is spawned independently;
/// the dispatcher lock is held only for the tick bookkeeping.
pub async fn spawn_dispatcher(dispatcher: Arc<Mutex<TriggerDispatcher>>, tick_interval_secs: u64) {
    tracing::info!("⏰ trigger dispatcher started (tick every {tick_interval_secs}s)");
    let mut interval =
        tokio::time::interval(std::time::Duration::from_secs(tick_interval_secs.max(1)));
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        interval.tick().await;

        let (due, resolver, gateway, channel_id) = {
            let mut d = dispatcher.lock().await;
            (
                d.tick(Utc::now()),
                d.resolver.clone(),
                d.gateway.clone(),
                d.channel_id.clone(),
            )
        };

        for firing in due {
            tokio::spawn(TriggerDispatcher::fire(
                resolver.clone(),
                gateway.clone(),
                channel_id.clone(),
                firing,
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use futures::stream::Stream;
    use rotabot_core::error::Result;
    use rotabot_core::types::{AlertSchedule, InboundMessage};
    use rotabot_engine::RotaRegistry;
    use rotabot_store::memory::InMemoryHistoryStore;
    use std::sync::Mutex as StdMutex;

    /// Gateway fake recording every send.
    #[derive(Default)]
    struct RecordingGateway {
        sent: StdMutex<Vec<(String, String)>>,
    }

    #[async_trait]
    impl ChatGateway for RecordingGateway {
        async fn send_message(&self, channel: &str, text: &str) -> Result<()> {
            self.sent
                .lock()
                .unwrap()
                .push((channel.to_string(), text.to_string()));
            Ok(())
        }
        async fn user_id_by_name(&self, _name: &str) -> Result<String> {
            Ok("unknown".into())
        }
        async fn channel_id_by_name(&self, _name: &str) -> Result<String> {
            Ok("unknown".into())
        }
        async fn listen(&self) -> Result<Box<dyn Stream<Item = InboundMessage> + Send + Unpin>> {
            Ok(Box::new(futures::stream::pending()))
        }
    }

    fn rota(id: &str, expression: &str) -> Rota {
        Rota {
            id: id.into(),
            name: id.into(),
            duty_duration: "PT1H".into(),
            participants: vec!["sc".into(), "jo".into()],
            alert: AlertSchedule {
                expression: expression.into(),
                message: format!("You are {id} today"),
            },
        }
    }

    fn dispatcher_with(rotas: Vec<Rota>) -> (TriggerDispatcher, Arc<RecordingGateway>) {
        let store = Arc::new(InMemoryHistoryStore::new());
        let resolver = Arc::new(DutyResolver::new(RotaRegistry::new(rotas), store));
        let gateway = Arc::new(RecordingGateway::default());
        (
            TriggerDispatcher::new(resolver, gateway.clone(), "C123".into()),
            gateway,
        )
    }

    #[tokio::test]
    async fn test_register_valid_schedules() {
        let rotas = vec![rota("RC", "@every 10s"), rota("BH", "0 9 * * *")];
        let (mut d, _) = dispatcher_with(rotas.clone());
        let failures = d.register_all(&rotas).await;
        assert!(failures.is_empty());
        assert_eq!(d.trigger_count(), 2);
    }

    #[tokio::test]
    async fn test_malformed_schedule_fails_open() {
        let rotas = vec![rota("RC", "not a schedule"), rota("BH", "@every 15s")];
        let (mut d, gateway) = dispatcher_with(rotas.clone());
        let failures = d.register_all(&rotas).await;

        // RC is reported and skipped; BH stays armed.
        assert_eq!(failures.len(), 1);
        assert!(matches!(
            failures[0],
            RotaBotError::ScheduleRegistrationFailed { ref rota_id, .. } if rota_id == "RC"
        ));
        assert_eq!(d.trigger_count(), 1);

        let sent = gateway.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].1.contains("Failed to set monitor"));
    }

    #[tokio::test]
    async fn test_tick_fires_due_and_rearms() {
        let rotas = vec![rota("RC", "@every 10s")];
        let (mut d, _) = dispatcher_with(rotas.clone());
        d.register_all(&rotas).await;

        let now = Utc::now();
        // Not due yet
        assert!(d.tick(now).is_empty());

        // Jump past the firing instant
        let later = now + chrono::Duration::seconds(11);
        let due = d.tick(later);
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].rota_id, "RC");

        // Re-armed: immediately ticking again fires nothing
        assert!(d.tick(later).is_empty());
        // ...but another 10s later it fires again
        assert_eq!(d.tick(later + chrono::Duration::seconds(10)).len(), 1);
    }

    #[tokio::test]
    async fn test_missed_slots_collapse_to_one_firing() {
        let rotas = vec![rota("RC", "@every 10s")];
        let (mut d, _) = dispatcher_with(rotas.clone());
        d.register_all(&rotas).await;

        // Sleep through six slots; only one firing comes out.
        let much_later = Utc::now() + chrono::Duration::seconds(61);
        assert_eq!(d.tick(much_later).len(), 1);
        assert!(d.tick(much_later).is_empty());
    }

    #[tokio::test]
    async fn test_fire_delivers_reminder() {
        let rotas = vec![rota("RC", "@every 10s")];
        let store = Arc::new(InMemoryHistoryStore::new());
        let resolver = Arc::new(DutyResolver::new(RotaRegistry::new(rotas), store));
        let gateway = Arc::new(RecordingGateway::default());

        TriggerDispatcher::fire(
            resolver,
            gateway.clone(),
            "C123".into(),
            Firing {
                rota_id: "RC".into(),
                message: "You are RC today".into(),
            },
        )
        .await;

        let sent = gateway.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, "C123");
        // No identity resolver is installed, so the bare display name
        // is used as the mention.
        assert_eq!(sent[0].1, "sc You are RC today");
    }

    #[tokio::test]
    async fn test_fire_absorbs_store_fault() {
        use rotabot_store::memory::Fault;

        let rotas = vec![rota("RC", "@every 10s")];
        let store = Arc::new(InMemoryHistoryStore::new());
        store.inject_fault(Fault::Unavailable).await;
        let resolver = Arc::new(DutyResolver::new(RotaRegistry::new(rotas), store));
        let gateway = Arc::new(RecordingGateway::default());

        // Must not panic; nothing is delivered.
        TriggerDispatcher::fire(
            resolver,
            gateway.clone(),
            "C123".into(),
            Firing {
                rota_id: "RC".into(),
                message: "msg".into(),
            },
        )
        .await;
        assert!(gateway.sent.lock().unwrap().is_empty());
    }
}
