use thiserror::Error;

/// One entry of the queue together with the id assigned at enqueue time.
/// Read-only view returned by `entry_list`; the id works for both point
/// lookups and removal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueRecord<E> {
    pub id: u64,
    pub entry: E,
}

/// A mutation of the queue, expressed as a state-machine operation so it can
/// be replayed from the log on any replica.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueueOp<E> {
    Enqueue { id: u64, val: E },
    Remove { id: u64 },
    Clear,
}

/// Inverse of an applied operation. Undoing restores the exact pre-apply
/// state, including the position of a removed entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UndoRecord<E> {
    /// The operation did not change anything.
    None,
    /// Undo an enqueue by dropping the entry again.
    RemoveId(u64),
    /// Undo a removal by reinserting the entry at its original position.
    Reinsert { index: usize, id: u64, val: E },
    /// Undo a clear by restoring the full ordered contents.
    Restore(Vec<(u64, E)>),
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum QueueError {
    /// Ids are drawn from a 64-bit space; a replayed operation must never
    /// collide with a live entry.
    #[error("queue id collision: {0:#018x}")]
    DuplicateId(u64),
}
