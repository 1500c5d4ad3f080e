//! The credential store engine.
//!
//! `CredentialStore` owns the authoritative set of entries and is the only
//! caller of `PersistenceLog::commit`.  Every mutation runs under the write
//! lock from validation to commit, so mutations are totally ordered and a
//! reader sees either the state before a mutation or after it.  A failed
//! commit rolls the in-memory set back before the lock is released.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Duration, Utc};
use zeroize::Zeroizing;

use super::entry::{CredentialEntry, EntryFields, MaskedView};
use super::ids::IdGenerator;
use super::log::PersistenceLog;
use crate::errors::{KeycraftError, LogError, Result};

/// Loaded state. Absent until `load` succeeds.
struct State {
    entries: BTreeMap<String, CredentialEntry>,
    ids: IdGenerator,
    clock: Clock,
}

/// Hands out strictly increasing timestamps, even if the wall clock
/// stalls or steps backwards.
struct Clock {
    last: Option<DateTime<Utc>>,
}

impl Clock {
    fn tick(&mut self) -> DateTime<Utc> {
        let now = Utc::now();
        let next = match self.last {
            Some(last) if now <= last => last + Duration::microseconds(1),
            _ => now,
        };
        self.last = Some(next);
        next
    }
}

pub struct CredentialStore {
    log: PersistenceLog,
    state: RwLock<Option<State>>,
}

impl CredentialStore {
    /// Wrap a persistence log. Nothing is read until `load`.
    pub fn new(log: PersistenceLog) -> Self {
        Self {
            log,
            state: RwLock::new(None),
        }
    }

    /// Build a store and load it in one step.
    pub fn open(log: PersistenceLog) -> Result<Self> {
        let store = Self::new(log);
        store.load()?;
        Ok(store)
    }

    /// (Re)load the authoritative set from the committed snapshot.
    ///
    /// On failure the previous state, if any, is kept.
    pub fn load(&self) -> Result<()> {
        let mut guard = self.write();
        let loaded = self.log.load()?;

        let last_stamp = loaded.iter().map(|e| e.updated_at).max();
        let ids = IdGenerator::seeded(loaded.iter().map(|e| e.id.as_str()));

        let mut entries = BTreeMap::new();
        for entry in loaded {
            let id = entry.id.clone();
            if entries.insert(id.clone(), entry).is_some() {
                return Err(LogError::CorruptState(format!("duplicate entry id '{id}'")).into());
            }
        }

        tracing::info!(count = entries.len(), path = %self.log.path().display(), "credential store loaded");
        *guard = Some(State {
            entries,
            ids,
            clock: Clock { last: last_stamp },
        });
        Ok(())
    }

    /// Masked views of every entry, oldest first.
    pub fn list(&self) -> Result<Vec<MaskedView>> {
        let guard = self.read();
        let state = guard.as_ref().ok_or(KeycraftError::Unavailable)?;

        let mut entries: Vec<&CredentialEntry> = state.entries.values().collect();
        entries.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(entries.into_iter().map(CredentialEntry::masked).collect())
    }

    /// Masked view of a single entry.
    pub fn get(&self, id: &str) -> Result<MaskedView> {
        let guard = self.read();
        let state = guard.as_ref().ok_or(KeycraftError::Unavailable)?;
        state
            .entries
            .get(id)
            .map(CredentialEntry::masked)
            .ok_or_else(|| KeycraftError::not_found(id))
    }

    pub fn add(&self, fields: EntryFields) -> Result<MaskedView> {
        let mut guard = self.write();
        let state = guard.as_mut().ok_or(KeycraftError::Unavailable)?;

        let fields = fields.validate()?;

        let mut id = state.ids.next_id().to_string();
        while state.entries.contains_key(&id) {
            id = state.ids.next_id().to_string();
        }
        let now = state.clock.tick();
        let entry = CredentialEntry::create(id.clone(), fields, now);
        let view = entry.masked();

        state.entries.insert(id.clone(), entry);
        if let Err(e) = self.log.commit(state.entries.values()) {
            state.entries.remove(&id);
            tracing::warn!(error = %e, "add rolled back");
            return Err(e.into());
        }

        tracing::info!(entry_id = %id, vendor = %view.vendor, "entry added");
        Ok(view)
    }

    pub fn update(&self, id: &str, fields: EntryFields) -> Result<MaskedView> {
        let mut guard = self.write();
        let state = guard.as_mut().ok_or(KeycraftError::Unavailable)?;

        if !state.entries.contains_key(id) {
            return Err(KeycraftError::not_found(id));
        }
        let fields = fields.validate()?;
        let now = state.clock.tick();

        let entry = state
            .entries
            .get_mut(id)
            .ok_or_else(|| KeycraftError::not_found(id))?;
        let previous = entry.clone();
        entry.apply(fields, now);
        let view = entry.masked();

        if let Err(e) = self.log.commit(state.entries.values()) {
            state.entries.insert(id.to_string(), previous);
            tracing::warn!(entry_id = %id, error = %e, "update rolled back");
            return Err(e.into());
        }

        tracing::info!(entry_id = %id, "entry updated");
        Ok(view)
    }

    pub fn delete(&self, id: &str) -> Result<()> {
        let mut guard = self.write();
        let state = guard.as_mut().ok_or(KeycraftError::Unavailable)?;

        let removed = state
            .entries
            .remove(id)
            .ok_or_else(|| KeycraftError::not_found(id))?;

        if let Err(e) = self.log.commit(state.entries.values()) {
            state.entries.insert(id.to_string(), removed);
            tracing::warn!(entry_id = %id, error = %e, "delete rolled back");
            return Err(e.into());
        }

        tracing::info!(entry_id = %id, "entry deleted");
        Ok(())
    }

    /// The raw secret of one entry. Never part of `list`.
    pub fn reveal(&self, id: &str) -> Result<Zeroizing<String>> {
        let guard = self.read();
        let state = guard.as_ref().ok_or(KeycraftError::Unavailable)?;
        let entry = state
            .entries
            .get(id)
            .ok_or_else(|| KeycraftError::not_found(id))?;

        tracing::info!(entry_id = %id, "secret revealed");
        Ok(Zeroizing::new(entry.secret_value().to_string()))
    }

    pub fn is_loaded(&self) -> bool {
        self.read().is_some()
    }

    pub fn len(&self) -> Result<usize> {
        let guard = self.read();
        let state = guard.as_ref().ok_or(KeycraftError::Unavailable)?;
        Ok(state.entries.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        self.len().map(|n| n == 0)
    }

    pub fn path(&self) -> &Path {
        self.log.path()
    }

    // Nothing between a mutation and its commit-or-rollback panics, so a
    // poisoned lock still guards committed state.
    fn read(&self) -> RwLockReadGuard<'_, Option<State>> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Option<State>> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}
