// ABOUTME: Holder of the live session replica and the archive of finished sessions
// ABOUTME: Every update replaces the Arc so readers never observe a partial session
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use std::collections::VecDeque;
use std::sync::Arc;

use tandem_core::models::{MetricSnapshot, WorkoutSession};
use tokio::sync::RwLock;
use uuid::Uuid;

const ARCHIVE_CAPACITY: usize = 16;

#[derive(Default)]
struct Slots {
    current: Option<Arc<WorkoutSession>>,
    archive: VecDeque<Arc<WorkoutSession>>,
}

/// Live session plus recently finished ones
#[derive(Default)]
pub struct SessionStore {
    slots: RwLock<Slots>,
}

impl SessionStore {
    /// Empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The live session
    pub async fn current(&self) -> Option<Arc<WorkoutSession>> {
        self.slots.read().await.current.clone()
    }

    /// The live session if it has id `id`
    pub async fn current_matching(&self, id: Uuid) -> Option<Arc<WorkoutSession>> {
        self.current().await.filter(|session| session.id == id)
    }

    /// A live or archived session by id
    pub async fn find(&self, id: Uuid) -> Option<Arc<WorkoutSession>> {
        let slots = self.slots.read().await;
        slots
            .current
            .iter()
            .chain(slots.archive.iter())
            .find(|session| session.id == id)
            .cloned()
    }

    /// An archived session by id
    pub async fn archived(&self, id: Uuid) -> Option<Arc<WorkoutSession>> {
        self.slots
            .read()
            .await
            .archive
            .iter()
            .find(|session| session.id == id)
            .cloned()
    }

    /// Install `session` as the live one, or archive it directly when finished
    pub async fn install(&self, session: WorkoutSession) -> Arc<WorkoutSession> {
        let session = Arc::new(session);
        let mut slots = self.slots.write().await;
        if session.is_finished() {
            Self::push_archive(&mut slots, Arc::clone(&session));
        } else {
            slots.current = Some(Arc::clone(&session));
        }
        session
    }

    /// Replace the live session `id` with the value produced by `update`
    ///
    /// Returns the previous and next values. A finished result moves to the
    /// archive and leaves no live session.
    pub async fn update<F>(
        &self,
        id: Uuid,
        update: F,
    ) -> Option<(Arc<WorkoutSession>, Arc<WorkoutSession>)>
    where
        F: FnOnce(&WorkoutSession) -> Option<WorkoutSession>,
    {
        let mut slots = self.slots.write().await;
        let previous = slots.current.clone().filter(|session| session.id == id)?;
        let next = Arc::new(update(&previous)?);
        if next.is_finished() {
            slots.current = None;
            Self::push_archive(&mut slots, Arc::clone(&next));
        } else {
            slots.current = Some(Arc::clone(&next));
        }
        Some((previous, next))
    }

    /// Replace the live session's snapshot with the value produced by `merge`
    pub async fn update_snapshot<F>(&self, id: Uuid, merge: F) -> Option<Arc<MetricSnapshot>>
    where
        F: FnOnce(&MetricSnapshot) -> MetricSnapshot,
    {
        let (_, next) = self
            .update(id, |session| {
                Some(session.with_snapshot(Arc::new(merge(&session.snapshot))))
            })
            .await?;
        Some(Arc::clone(&next.snapshot))
    }

    fn push_archive(slots: &mut Slots, session: Arc<WorkoutSession>) {
        slots.archive.retain(|archived| archived.id != session.id);
        if slots.archive.len() >= ARCHIVE_CAPACITY {
            slots.archive.pop_front();
        }
        slots.archive.push_back(session);
    }
}
