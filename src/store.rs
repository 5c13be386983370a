use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::RwLock;

use crate::error::RaffleError;
use crate::state::{EventPatch, EventRecord, RafflePhase, SignupFilter, SignupPatch, SignupRecord};

/// Narrow interface over the persisted event/signup records.
///
/// Single-record writes are assumed atomic and reads see prior writes from
/// the same process. The orchestrator is the only writer of raffle phase.
pub trait RaffleStore: Send + Sync {
    fn find_event(&self, id: &str) -> Result<Option<EventRecord>, RaffleError>;

    fn update_event(&self, id: &str, patch: EventPatch) -> Result<(), RaffleError>;

    fn find_signups(
        &self,
        quota_id: &str,
        filter: SignupFilter,
    ) -> Result<Vec<SignupRecord>, RaffleError>;

    fn update_signup(&self, id: &str, patch: SignupPatch) -> Result<(), RaffleError>;

    /// Events whose raffle is enabled, still NOT_STARTED, and whose start
    /// time falls inside `[window_start, window_end)`.
    fn find_due_events(
        &self,
        window_start: DateTime<Utc>,
        window_end: DateTime<Utc>,
    ) -> Result<Vec<EventRecord>, RaffleError>;
}

#[derive(Default)]
struct StoreInner {
    events: HashMap<String, EventRecord>,
    signups: HashMap<String, SignupRecord>,
}

/// In-memory store used by tests and local composition. State lives behind
/// a lock; checkpointing into durable storage is the host's concern.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<StoreInner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_event(&self, event: EventRecord) {
        let mut inner = self.inner.write().expect("store lock poisoned");
        inner.events.insert(event.id.clone(), event);
    }

    pub fn insert_signup(&self, signup: SignupRecord) {
        let mut inner = self.inner.write().expect("store lock poisoned");
        inner.signups.insert(signup.id.clone(), signup);
    }

    pub fn signup(&self, id: &str) -> Option<SignupRecord> {
        let inner = self.inner.read().expect("store lock poisoned");
        inner.signups.get(id).cloned()
    }
}

fn lock_err<T>(_: T) -> RaffleError {
    RaffleError::Store("store lock poisoned".into())
}

impl RaffleStore for MemoryStore {
    fn find_event(&self, id: &str) -> Result<Option<EventRecord>, RaffleError> {
        let inner = self.inner.read().map_err(lock_err)?;
        Ok(inner.events.get(id).cloned())
    }

    fn update_event(&self, id: &str, patch: EventPatch) -> Result<(), RaffleError> {
        let mut inner = self.inner.write().map_err(lock_err)?;
        let event = inner
            .events
            .get_mut(id)
            .ok_or_else(|| RaffleError::EventNotFound(id.to_string()))?;
        if let Some(status) = patch.raffle_status {
            event.raffle_status = status;
        }
        Ok(())
    }

    fn find_signups(
        &self,
        quota_id: &str,
        filter: SignupFilter,
    ) -> Result<Vec<SignupRecord>, RaffleError> {
        let inner = self.inner.read().map_err(lock_err)?;
        let mut matches: Vec<SignupRecord> = inner
            .signups
            .values()
            .filter(|s| s.quota_id == quota_id)
            .filter(|s| match filter {
                SignupFilter::All => true,
                SignupFilter::WithIntent => s.registration_intent.is_some(),
            })
            .cloned()
            .collect();
        // Map iteration order is arbitrary; return a stable listing
        matches.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(matches)
    }

    fn update_signup(&self, id: &str, patch: SignupPatch) -> Result<(), RaffleError> {
        let mut inner = self.inner.write().map_err(lock_err)?;
        let signup = inner
            .signups
            .get_mut(id)
            .ok_or_else(|| RaffleError::Store(format!("signup `{id}` not found")))?;
        if let Some(status) = patch.status {
            signup.status = status;
        }
        if let Some(confirmed_at) = patch.confirmed_at {
            signup.confirmed_at = Some(confirmed_at);
        }
        Ok(())
    }

    fn find_due_events(
        &self,
        window_start: DateTime<Utc>,
        window_end: DateTime<Utc>,
    ) -> Result<Vec<EventRecord>, RaffleError> {
        let inner = self.inner.read().map_err(lock_err)?;
        let mut due: Vec<EventRecord> = inner
            .events
            .values()
            .filter(|e| e.raffle_enabled && e.raffle_status == RafflePhase::NotStarted)
            .filter(|e| match e.raffle_start_time {
                Some(start) => start >= window_start && start < window_end,
                None => false,
            })
            .cloned()
            .collect();
        due.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(due)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::SignupStatus;
    use chrono::Duration;

    fn event(id: &str, start_offset_s: i64, enabled: bool, phase: RafflePhase) -> EventRecord {
        let now = Utc::now();
        EventRecord {
            id: id.into(),
            name: format!("Event {id}"),
            raffle_enabled: enabled,
            raffle_start_time: Some(now + Duration::seconds(start_offset_s)),
            raffle_end_time: Some(now + Duration::seconds(start_offset_s + 60)),
            raffle_status: phase,
            quota_id: format!("quota-{id}"),
            quota_capacity: Some(10),
        }
    }

    #[test]
    fn due_query_filters_window_flag_and_phase() {
        let store = MemoryStore::new();
        store.insert_event(event("in-window", 10, true, RafflePhase::NotStarted));
        store.insert_event(event("past-window", 120, true, RafflePhase::NotStarted));
        store.insert_event(event("disabled", 10, false, RafflePhase::NotStarted));
        store.insert_event(event("started", 10, true, RafflePhase::RegistrationOpen));

        let now = Utc::now();
        let due = store
            .find_due_events(now, now + Duration::seconds(60))
            .unwrap();
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].id, "in-window");
    }

    #[test]
    fn patches_only_touch_named_fields() {
        let store = MemoryStore::new();
        store.insert_event(event("e1", 0, true, RafflePhase::NotStarted));
        store.insert_signup(SignupRecord {
            id: "s1".into(),
            quota_id: "quota-e1".into(),
            email: "a@example.com".into(),
            display_name: "A".into(),
            status: SignupStatus::Pending,
            registration_intent: Some(Utc::now()),
            confirmed_at: None,
            edit_url: "https://example.com/s1".into(),
        });

        store
            .update_event(
                "e1",
                EventPatch {
                    raffle_status: Some(RafflePhase::Simulating),
                },
            )
            .unwrap();
        let e = store.find_event("e1").unwrap().unwrap();
        assert_eq!(e.raffle_status, RafflePhase::Simulating);
        assert!(e.raffle_enabled);

        store
            .update_signup(
                "s1",
                SignupPatch {
                    status: Some(SignupStatus::Confirmed),
                    confirmed_at: None,
                },
            )
            .unwrap();
        let s = store.signup("s1").unwrap();
        assert_eq!(s.status, SignupStatus::Confirmed);
        assert!(s.confirmed_at.is_none());
        assert_eq!(s.email, "a@example.com");
    }

    #[test]
    fn intent_filter_excludes_undeclared_signups() {
        let store = MemoryStore::new();
        for (id, intent) in [("s1", Some(Utc::now())), ("s2", None)] {
            store.insert_signup(SignupRecord {
                id: id.into(),
                quota_id: "q".into(),
                email: format!("{id}@example.com"),
                display_name: id.to_uppercase(),
                status: SignupStatus::Pending,
                registration_intent: intent,
                confirmed_at: None,
                edit_url: format!("https://example.com/{id}"),
            });
        }
        let all = store.find_signups("q", SignupFilter::All).unwrap();
        assert_eq!(all.len(), 2);
        let with_intent = store.find_signups("q", SignupFilter::WithIntent).unwrap();
        assert_eq!(with_intent.len(), 1);
        assert_eq!(with_intent[0].id, "s1");
    }
}
