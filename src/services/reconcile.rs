//! Three-way diff of a submitted child list against the rows already stored.
//!
//! Submitted entries whose id matches a stored row become updates, entries
//! with no id (or an id that is not stored) become inserts, and stored ids
//! that do not appear in the submission are deleted. Entries keep their
//! submission order so callers can derive positions from it.

use std::collections::HashSet;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reconciled<T> {
    Update(Uuid, T),
    Insert(T),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcilePlan<T> {
    pub entries: Vec<Reconciled<T>>,
    pub deletes: Vec<Uuid>,
}

impl<T> ReconcilePlan<T> {
    pub fn update_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| matches!(e, Reconciled::Update(..)))
            .count()
    }

    pub fn insert_count(&self) -> usize {
        self.entries.len() - self.update_count()
    }
}

/// A stored id is matched at most once; a repeated id in the submission is
/// treated as a new row.
pub fn reconcile<T, I>(existing: &[Uuid], submitted: I) -> ReconcilePlan<T>
where
    I: IntoIterator<Item = (Option<Uuid>, T)>,
{
    let known: HashSet<Uuid> = existing.iter().copied().collect();
    let mut matched: HashSet<Uuid> = HashSet::new();

    let entries = submitted
        .into_iter()
        .map(|(id, item)| match id {
            Some(id) if known.contains(&id) && matched.insert(id) => Reconciled::Update(id, item),
            _ => Reconciled::Insert(item),
        })
        .collect();

    let deletes = existing
        .iter()
        .copied()
        .filter(|id| !matched.contains(id))
        .collect();

    ReconcilePlan { entries, deletes }
}
