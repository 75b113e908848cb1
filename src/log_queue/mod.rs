//! Persisted Log Queue Module
//!
//! A logical FIFO queue backed by state-machine replication. Entries map to
//! unique generated ids and are consumed via `entry_list`, which returns them
//! in the order their enqueues materialized on the log. There is no dequeue;
//! consumers `remove` entries by id from anywhere in the queue.
//!
//! ## Design
//! Every mutation is an explicit state-machine operation (`QueueOp`) applied
//! to the in-memory `LogQueue`. Applying an operation yields an `UndoRecord`
//! that restores the exact prior state, entry order included, which is what
//! the replication substrate needs to roll back aborted transactions. The
//! substrate itself (log placement, conflict resolution) lives outside this
//! module.
//!
//! ## Submodules
//! - **`types`**: operations, records and errors.
//! - **`queue`**: the insertion-ordered queue state and the apply/undo machinery.

pub mod queue;
pub mod types;

#[cfg(test)]
mod tests;
