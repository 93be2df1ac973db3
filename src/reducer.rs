//! Optimistic list state (pure, no I/O).
//!
//! The UI applies a mutation locally the moment the user acts, then settles
//! it against the server: confirm keeps it, fail rolls back just that
//! operation, reconcile replaces everything with server truth. The visible
//! list is always `reduce` replayed over the confirmed base plus the pending
//! journal, so rollback is recomputation, not inverse patching.

/// Rows in an optimistic list need a stable identity to update/delete by.
pub trait HasId {
    fn id(&self) -> &str;
}

impl HasId for crate::db::DbItem {
    fn id(&self) -> &str {
        &self.id
    }
}

/// One list mutation, keyed by action type.
#[derive(Debug, Clone)]
pub enum ListAction<T> {
    Add(T),
    Update(T),
    Delete(String),
    Set(Vec<T>),
}

/// Apply one action to a snapshot, returning the next snapshot.
///
/// Update of a missing id and delete of a missing id are no-ops: the
/// server may have already settled the row out from under a stale action.
pub fn reduce<T: Clone + HasId>(state: &[T], action: &ListAction<T>) -> Vec<T> {
    match action {
        ListAction::Add(entry) => {
            let mut next = state.to_vec();
            next.push(entry.clone());
            next
        }
        ListAction::Update(entry) => state
            .iter()
            .map(|existing| {
                if existing.id() == entry.id() {
                    entry.clone()
                } else {
                    existing.clone()
                }
            })
            .collect(),
        ListAction::Delete(id) => state
            .iter()
            .filter(|existing| existing.id() != id)
            .cloned()
            .collect(),
        ListAction::Set(entries) => entries.clone(),
    }
}

/// Confirmed base + pending journal.
#[derive(Debug)]
pub struct OptimisticList<T> {
    confirmed: Vec<T>,
    pending: Vec<(u64, ListAction<T>)>,
    next_seq: u64,
}

impl<T: Clone + HasId> OptimisticList<T> {
    pub fn new(confirmed: Vec<T>) -> Self {
        Self {
            confirmed,
            pending: Vec::new(),
            next_seq: 0,
        }
    }

    /// Apply an action optimistically. Returns a ticket to settle it with.
    pub fn apply(&mut self, action: ListAction<T>) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.pending.push((seq, action));
        seq
    }

    /// The server accepted the operation: fold it into the confirmed base.
    pub fn confirm(&mut self, seq: u64) {
        if let Some(pos) = self.pending.iter().position(|(s, _)| *s == seq) {
            let (_, action) = self.pending.remove(pos);
            self.confirmed = reduce(&self.confirmed, &action);
        }
    }

    /// The server rejected the operation: drop it from the journal. Later
    /// pending operations stay queued and the view recomputes without it.
    pub fn fail(&mut self, seq: u64) {
        self.pending.retain(|(s, _)| *s != seq);
    }

    /// Replace everything with server truth, discarding the journal. The
    /// recovery path when settle results arrive out of order or get lost.
    pub fn reconcile(&mut self, server_state: Vec<T>) {
        self.confirmed = server_state;
        self.pending.clear();
    }

    /// What the UI renders: confirmed base with the journal replayed on top.
    pub fn view(&self) -> Vec<T> {
        self.pending
            .iter()
            .fold(self.confirmed.clone(), |state, (_, action)| {
                reduce(&state, action)
            })
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }
}
