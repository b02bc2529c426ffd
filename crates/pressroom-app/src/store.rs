// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::Result;
use std::collections::BTreeMap;

use crate::Revision;
use crate::fetch::Page;
use crate::patch::{Fields, Snapshot, apply_fields, restore_fields};
use crate::query::page_count;
use crate::resource::Resource;

/// Local change that has not yet been seen in a fetched page.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingPatch {
    pub fields: Fields,
    pub snapshot: Snapshot,
    pub applied_at: Revision,
}

/// The page currently on screen plus the optimistic edits layered over it.
#[derive(Debug, Clone)]
pub struct CollectionStore<R: Resource> {
    page: Option<Page<R>>,
    revision: Option<Revision>,
    pending: BTreeMap<R::Id, PendingPatch>,
}

impl<R: Resource> Default for CollectionStore<R> {
    fn default() -> Self {
        Self {
            page: None,
            revision: None,
            pending: BTreeMap::new(),
        }
    }
}

impl<R: Resource> CollectionStore<R> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs a fetched page, replaying patches newer than it.
    pub fn replace(&mut self, mut page: Page<R>, revision: Revision) {
        let mut pending = BTreeMap::new();
        for (id, patch) in &self.pending {
            if patch.applied_at <= revision {
                tracing::trace!(id = %id, applied_at = %patch.applied_at, "patch settled by fetch");
                continue;
            }
            let Some(item) = page.items_mut().iter_mut().find(|item| item.id() == id) else {
                pending.insert(id.clone(), patch.clone());
                continue;
            };
            match apply_fields(&*item, &patch.fields) {
                Ok((patched, snapshot)) => {
                    *item = patched;
                    pending.insert(
                        id.clone(),
                        PendingPatch {
                            fields: patch.fields.clone(),
                            snapshot,
                            applied_at: patch.applied_at,
                        },
                    );
                }
                Err(error) => {
                    tracing::warn!(id = %id, error = %error, "dropping patch that no longer applies");
                }
            }
        }

        self.page = Some(page);
        self.revision = Some(revision);
        self.pending = pending;
    }

    /// Returns false when `id` is not on the current page.
    pub fn apply_optimistic(&mut self, id: &R::Id, fields: &Fields, revision: Revision) -> Result<bool> {
        let Some(page) = self.page.as_ref() else {
            return Ok(false);
        };
        let Some(index) = page.items().iter().position(|item| item.id() == id) else {
            return Ok(false);
        };

        let (patched, snapshot) = apply_fields(&page.items()[index], fields)?;
        let patch = match self.pending.get(id) {
            Some(existing) => {
                let mut merged = existing.clone();
                merged.fields.merge(fields);
                for (key, before) in snapshot {
                    merged.snapshot.entry(key).or_insert(before);
                }
                merged.applied_at = merged.applied_at.max(revision);
                merged
            }
            None => PendingPatch {
                fields: fields.clone(),
                snapshot,
                applied_at: revision,
            },
        };

        let mut next = page.clone();
        next.items_mut()[index] = patched;
        self.page = Some(next);
        self.pending.insert(id.clone(), patch);
        Ok(true)
    }

    /// Undoes the pending patch for `id` if it is still the one stamped `revision`.
    pub fn rollback(&mut self, id: &R::Id, revision: Revision) -> Result<bool> {
        let Some(patch) = self.pending.get(id) else {
            return Ok(false);
        };
        if patch.applied_at != revision {
            tracing::debug!(
                id = %id,
                pending = %patch.applied_at,
                requested = %revision,
                "rollback superseded by newer patch"
            );
            return Ok(false);
        }

        if let Some(page) = self.page.as_ref()
            && let Some(index) = page.items().iter().position(|item| item.id() == id)
        {
            let restored = restore_fields(&page.items()[index], &patch.snapshot)?;
            let mut next = page.clone();
            next.items_mut()[index] = restored;
            self.page = Some(next);
        }
        self.pending.remove(id);
        Ok(true)
    }

    pub fn items(&self) -> &[R] {
        self.page.as_ref().map(Page::items).unwrap_or_default()
    }

    pub fn get(&self, id: &R::Id) -> Option<&R> {
        self.items().iter().find(|item| item.id() == id)
    }

    pub fn total_count(&self) -> u64 {
        self.page.as_ref().map_or(0, Page::total_count)
    }

    pub fn effective_limit(&self) -> Option<u32> {
        self.page.as_ref().map(Page::effective_limit)
    }

    pub fn page_count(&self) -> u64 {
        self.page
            .as_ref()
            .map_or(0, |page| page_count(page.total_count(), page.effective_limit()))
    }

    pub const fn revision(&self) -> Option<Revision> {
        self.revision
    }

    pub const fn has_loaded(&self) -> bool {
        self.page.is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.items().is_empty()
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn pending(&self, id: &R::Id) -> Option<&PendingPatch> {
        self.pending.get(id)
    }
}
