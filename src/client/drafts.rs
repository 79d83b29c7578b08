use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use super::SessionActions;

/// One unsaved answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Draft {
    pub question_id: String,
    pub response_text: Option<String>,
    pub selected_option_id: Option<String>,
}

impl Draft {
    pub fn text(question_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self { question_id: question_id.into(), response_text: Some(text.into()), selected_option_id: None }
    }

    pub fn choice(question_id: impl Into<String>, option_id: impl Into<String>) -> Self {
        Self {
            question_id: question_id.into(),
            response_text: None,
            selected_option_id: Some(option_id.into()),
        }
    }
}

#[derive(Debug)]
struct Entry {
    draft: Draft,
    revision: u64,
    saved_revision: Option<u64>,
}

impl Entry {
    fn is_dirty(&self) -> bool {
        self.saved_revision != Some(self.revision)
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FlushReport {
    pub saved: usize,
    pub failed: usize,
}

/// Per-question answers waiting to be saved.
///
/// Edits bump a revision; a save only clears the dirty flag if no newer edit landed while the
/// request was in flight. Failed saves stay dirty and are retried by the next flush.
#[derive(Debug, Default)]
pub struct DraftBuffer {
    entries: Mutex<HashMap<String, Entry>>,
}

impl DraftBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds the buffer with answers the server already has, marked clean.
    pub fn restore(drafts: impl IntoIterator<Item = Draft>) -> Self {
        let entries = drafts
            .into_iter()
            .map(|draft| {
                (draft.question_id.clone(), Entry { draft, revision: 0, saved_revision: Some(0) })
            })
            .collect();
        Self { entries: Mutex::new(entries) }
    }

    pub fn edit(&self, draft: Draft) {
        let mut entries = self.lock();
        match entries.get_mut(&draft.question_id) {
            Some(entry) => {
                entry.draft = draft;
                entry.revision += 1;
            }
            None => {
                entries.insert(
                    draft.question_id.clone(),
                    Entry { draft, revision: 1, saved_revision: None },
                );
            }
        }
    }

    pub fn get(&self, question_id: &str) -> Option<Draft> {
        self.lock().get(question_id).map(|entry| entry.draft.clone())
    }

    pub fn is_dirty(&self, question_id: &str) -> bool {
        self.lock().get(question_id).is_some_and(Entry::is_dirty)
    }

    pub fn pending(&self) -> usize {
        self.lock().values().filter(|entry| entry.is_dirty()).count()
    }

    /// Saves every dirty draft.
    pub async fn flush<A>(&self, actions: &A) -> FlushReport
    where
        A: SessionActions + ?Sized,
    {
        let dirty: Vec<(Draft, u64)> = self
            .lock()
            .values()
            .filter(|entry| entry.is_dirty())
            .map(|entry| (entry.draft.clone(), entry.revision))
            .collect();

        let mut report = FlushReport::default();
        for (draft, revision) in dirty {
            if self.save_one(actions, &draft, revision).await {
                report.saved += 1;
            } else {
                report.failed += 1;
            }
        }
        report
    }

    /// Saves one question right away, as on navigation. Returns false if the save failed.
    pub async fn flush_question<A>(&self, actions: &A, question_id: &str) -> bool
    where
        A: SessionActions + ?Sized,
    {
        let pending = self
            .lock()
            .get(question_id)
            .filter(|entry| entry.is_dirty())
            .map(|entry| (entry.draft.clone(), entry.revision));

        match pending {
            Some((draft, revision)) => self.save_one(actions, &draft, revision).await,
            None => true,
        }
    }

    async fn save_one<A>(&self, actions: &A, draft: &Draft, revision: u64) -> bool
    where
        A: SessionActions + ?Sized,
    {
        match actions.save(draft).await {
            Ok(()) => {
                if let Some(entry) = self.lock().get_mut(&draft.question_id) {
                    if entry.saved_revision.map_or(true, |saved| saved < revision) {
                        entry.saved_revision = Some(revision);
                    }
                }
                true
            }
            Err(err) => {
                tracing::warn!(question_id = %draft.question_id, error = %err, "Autosave failed");
                false
            }
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Entry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
