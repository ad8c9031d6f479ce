//! Process-wide table of live matches

use dashmap::DashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use uuid::Uuid;

use crate::messaging::Messenger;
use crate::store::MatchStore;
use crate::ws::protocol::InputMsg;

use super::input::InputRejected;
use super::r#match::{EndReason, GameMatch, MatchHandle};
use super::settings::GameSettings;
use super::snapshot::StateView;
use super::Participants;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("match {0} not found")]
    NotFound(i64),

    #[error("match {0} already exists")]
    DuplicateMatch(i64),

    #[error("participant {0} is already in a match")]
    ParticipantBusy(Uuid),

    #[error("a remote match needs two distinct participants")]
    InvalidParticipants,

    #[error("remote match ids must be positive, got {0}")]
    InvalidMatchId(i64),

    #[error("input rejected: {0}")]
    InputRejected(#[from] InputRejected),
}

/// Live matches keyed by id. Created once at startup and handed to
/// whatever creates or tears down matches.
pub struct MatchRegistry {
    matches: DashMap<i64, MatchHandle>,
    /// Identity -> match it is bound to
    participant_matches: DashMap<Uuid, i64>,
    next_local_id: AtomicI64,
    settings: Arc<GameSettings>,
    messenger: Arc<dyn Messenger>,
    store: Arc<dyn MatchStore>,
}

impl MatchRegistry {
    pub fn new(
        settings: GameSettings,
        messenger: Arc<dyn Messenger>,
        store: Arc<dyn MatchStore>,
    ) -> Self {
        Self {
            matches: DashMap::new(),
            participant_matches: DashMap::new(),
            next_local_id: AtomicI64::new(-1),
            settings: Arc::new(settings),
            messenger,
            store,
        }
    }

    pub fn settings(&self) -> &GameSettings {
        &self.settings
    }

    /// Create a remote match under an externally assigned id
    pub fn create_remote_match(
        self: &Arc<Self>,
        match_id: i64,
        left: Uuid,
        right: Uuid,
    ) -> Result<MatchHandle, RegistryError> {
        if match_id <= 0 {
            return Err(RegistryError::InvalidMatchId(match_id));
        }
        if left == right {
            return Err(RegistryError::InvalidParticipants);
        }
        self.launch(match_id, Participants::Remote { left, right })
    }

    /// Create a local match owned by `player`. Local ids are negative and
    /// never reach the persistence service.
    pub fn create_local_match(self: &Arc<Self>, player: Uuid) -> Result<MatchHandle, RegistryError> {
        let match_id = self.next_local_id.fetch_sub(1, Ordering::Relaxed);
        self.launch(match_id, Participants::Local(player))
    }

    fn launch(
        self: &Arc<Self>,
        match_id: i64,
        participants: Participants,
    ) -> Result<MatchHandle, RegistryError> {
        let identities = participants.identities();

        // Claim the id and the participants before anything is spawned.
        match self.matches.entry(match_id) {
            dashmap::mapref::entry::Entry::Occupied(_) => {
                return Err(RegistryError::DuplicateMatch(match_id));
            }
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                let mut claimed = Vec::with_capacity(identities.len());
                for identity in &identities {
                    match self.participant_matches.entry(*identity) {
                        dashmap::mapref::entry::Entry::Occupied(_) => {
                            for id in claimed {
                                self.participant_matches.remove(&id);
                            }
                            return Err(RegistryError::ParticipantBusy(*identity));
                        }
                        dashmap::mapref::entry::Entry::Vacant(free) => {
                            free.insert(match_id);
                            claimed.push(*identity);
                        }
                    }
                }

                let (game_match, handle) = GameMatch::new(
                    match_id,
                    participants,
                    Arc::clone(&self.settings),
                    rand::random::<u64>(),
                    Arc::clone(&self.messenger),
                    Arc::clone(&self.store),
                );
                slot.insert(handle.clone());

                let registry = Arc::clone(self);
                tokio::spawn(async move {
                    game_match.run().await;
                    registry.release(match_id);
                });

                info!(match_id, mode = %participants.mode(), "Match registered");
                Ok(handle)
            }
        }
    }

    /// Drop a finished match and free its participants
    fn release(&self, match_id: i64) {
        if let Some((_, handle)) = self.matches.remove(&match_id) {
            for identity in handle.participants.identities() {
                self.participant_matches
                    .remove_if(&identity, |_, bound| *bound == match_id);
            }
            info!(match_id, "Match removed from registry");
        }
    }

    pub fn get(&self, match_id: i64) -> Option<MatchHandle> {
        self.matches.get(&match_id).map(|m| m.value().clone())
    }

    pub fn match_of(&self, identity: Uuid) -> Option<i64> {
        self.participant_matches.get(&identity).map(|m| *m)
    }

    pub fn active_matches(&self) -> usize {
        self.matches.len()
    }

    /// Route an input that did not arrive over a participant socket
    pub fn submit_input(&self, match_id: i64, msg: &InputMsg) -> Result<(), RegistryError> {
        let handle = self.get(match_id).ok_or(RegistryError::NotFound(match_id))?;
        handle.submit_input(None, msg)?;
        Ok(())
    }

    pub fn state(&self, match_id: i64) -> Result<StateView, RegistryError> {
        self.get(match_id)
            .map(|h| h.state())
            .ok_or(RegistryError::NotFound(match_id))
    }

    /// Force a match to end with `reason`
    pub fn terminate(&self, match_id: i64, reason: EndReason) -> Result<(), RegistryError> {
        let handle = self.get(match_id).ok_or(RegistryError::NotFound(match_id))?;
        if !handle.terminate(reason) {
            warn!(match_id, "Match did not accept terminate");
        }
        Ok(())
    }

    /// End every live match and wait up to `grace` for them to unwind
    pub async fn shutdown(&self, grace: Duration) {
        let live: Vec<MatchHandle> = self.matches.iter().map(|m| m.value().clone()).collect();
        if live.is_empty() {
            return;
        }

        info!(count = live.len(), "Ending live matches");
        for handle in &live {
            handle.terminate(EndReason::Shutdown);
        }

        let deadline = tokio::time::Instant::now() + grace;
        while !self.matches.is_empty() && tokio::time::Instant::now() < deadline {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        if !self.matches.is_empty() {
            warn!(remaining = self.matches.len(), "Matches still live after shutdown grace");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::MatchStatus;
    use crate::messaging::ConnectionHub;
    use crate::store::{InMemoryMatchStore, StoreCall};

    fn registry_with_store() -> (Arc<MatchRegistry>, Arc<ConnectionHub>, Arc<InMemoryMatchStore>) {
        let hub = Arc::new(ConnectionHub::new());
        let store = Arc::new(InMemoryMatchStore::new());
        let registry = Arc::new(MatchRegistry::new(
            GameSettings::default(),
            hub.clone(),
            store.clone(),
        ));
        (registry, hub, store)
    }

    fn registry() -> (Arc<MatchRegistry>, Arc<ConnectionHub>) {
        let (registry, hub, _) = registry_with_store();
        (registry, hub)
    }

    fn end_reasons(store: &InMemoryMatchStore, match_id: i64) -> Vec<EndReason> {
        store
            .calls_for(match_id)
            .into_iter()
            .filter_map(|call| match call {
                StoreCall::End { reason, .. } => Some(reason),
                _ => None,
            })
            .collect()
    }

    #[tokio::test(start_paused = true)]
    async fn rejects_invalid_and_duplicate_matches() {
        let (registry, _) = registry();
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());

        assert_eq!(
            registry.create_remote_match(0, a, b).err(),
            Some(RegistryError::InvalidMatchId(0))
        );
        assert_eq!(
            registry.create_remote_match(5, a, a).err(),
            Some(RegistryError::InvalidParticipants)
        );

        registry.create_remote_match(5, a, b).unwrap();
        assert_eq!(
            registry
                .create_remote_match(5, Uuid::new_v4(), Uuid::new_v4())
                .err(),
            Some(RegistryError::DuplicateMatch(5))
        );
        assert_eq!(
            registry.create_remote_match(6, b, Uuid::new_v4()).err(),
            Some(RegistryError::ParticipantBusy(b))
        );
        assert_eq!(registry.active_matches(), 1);
        assert_eq!(registry.match_of(a), Some(5));
    }

    #[tokio::test(start_paused = true)]
    async fn local_matches_get_distinct_negative_ids() {
        let (registry, _) = registry();

        let first = registry.create_local_match(Uuid::new_v4()).unwrap();
        let second = registry.create_local_match(Uuid::new_v4()).unwrap();

        assert!(first.id < 0 && second.id < 0);
        assert_ne!(first.id, second.id);
    }

    #[tokio::test(start_paused = true)]
    async fn terminated_match_is_removed() {
        let (registry, hub, store) = registry_with_store();
        let owner = Uuid::new_v4();
        let (_, _inbox) = hub.connect(owner);

        let handle = registry.create_local_match(owner).unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(handle.status(), MatchStatus::Ongoing);

        registry.terminate(handle.id, EndReason::Cancelled).unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert_eq!(handle.status(), MatchStatus::Ended);
        assert_eq!(end_reasons(&store, handle.id), vec![EndReason::Cancelled]);
        assert!(registry.get(handle.id).is_none());
        assert_eq!(registry.match_of(owner), None);
        assert_eq!(
            registry.state(handle.id).err(),
            Some(RegistryError::NotFound(handle.id))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_ends_every_match() {
        let (registry, _, store) = registry_with_store();
        registry
            .create_remote_match(1, Uuid::new_v4(), Uuid::new_v4())
            .unwrap();
        let local = registry.create_local_match(Uuid::new_v4()).unwrap();

        registry.shutdown(Duration::from_secs(1)).await;
        tokio::time::sleep(Duration::from_millis(10)).await;

        assert_eq!(registry.active_matches(), 0);
        assert_eq!(end_reasons(&store, 1), vec![EndReason::Shutdown]);
        assert_eq!(end_reasons(&store, local.id), vec![EndReason::Shutdown]);
    }

    #[tokio::test(start_paused = true)]
    async fn terminating_unknown_match_is_not_found() {
        let (registry, _) = registry();
        assert_eq!(
            registry.terminate(77, EndReason::Cancelled).err(),
            Some(RegistryError::NotFound(77))
        );
    }
}
