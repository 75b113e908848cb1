use linked_hash_map::LinkedHashMap;

use super::types::{QueueError, QueueOp, QueueRecord, UndoRecord};

/// Insertion-ordered queue state.
///
/// Entries live in a linked map keyed by their generated id, so consumption
/// order is the order the enqueues materialized while removal by id stays
/// cheap. Entries cannot be modified in place, only removed.
pub struct LogQueue<E> {
    main_map: LinkedHashMap<u64, E>,
}

impl<E: Clone> LogQueue<E> {
    pub fn new() -> Self {
        LogQueue {
            main_map: LinkedHashMap::new(),
        }
    }

    pub fn size(&self) -> usize {
        self.main_map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.main_map.is_empty()
    }

    pub fn contains_key(&self, id: u64) -> bool {
        self.main_map.contains_key(&id)
    }

    pub fn get(&self, id: u64) -> Option<&E> {
        self.main_map.get(&id)
    }

    /// Appends an entry and returns its generated id.
    ///
    /// Ids are random 64-bit values; a collision with a live entry is detected
    /// on insert and a fresh id is drawn. Ordering across concurrent enqueues
    /// is decided by the log, not by this method.
    pub fn enqueue(&mut self, entry: E) -> u64 {
        loop {
            let id = rand::random::<u64>();
            match self.apply(QueueOp::Enqueue { id, val: entry.clone() }) {
                Ok(_) => return id,
                Err(QueueError::DuplicateId(_)) => {
                    tracing::debug!("Queue id collision on {:#018x}, retrying", id);
                }
            }
        }
    }

    /// Removes the entry with the given id, from anywhere in the queue.
    pub fn remove(&mut self, id: u64) -> Option<E> {
        self.main_map.remove(&id)
    }

    pub fn clear(&mut self) {
        self.main_map.clear();
    }

    /// Returns up to `max_entries` records from the head of the queue in the
    /// order their enqueues materialized. `-1` returns everything.
    pub fn entry_list(&self, max_entries: i64) -> Vec<QueueRecord<E>> {
        let limit = if max_entries < 0 {
            self.main_map.len()
        } else {
            (max_entries as usize).min(self.main_map.len())
        };

        self.main_map
            .iter()
            .take(limit)
            .map(|(id, entry)| QueueRecord {
                id: *id,
                entry: entry.clone(),
            })
            .collect()
    }

    /// Applies one state-machine operation, returning the record that undoes it.
    pub fn apply(&mut self, op: QueueOp<E>) -> Result<UndoRecord<E>, QueueError> {
        match op {
            QueueOp::Enqueue { id, val } => {
                if self.main_map.contains_key(&id) {
                    return Err(QueueError::DuplicateId(id));
                }
                self.main_map.insert(id, val);
                Ok(UndoRecord::RemoveId(id))
            }
            QueueOp::Remove { id } => {
                let Some(index) = self.main_map.keys().position(|key| *key == id) else {
                    return Ok(UndoRecord::None);
                };
                let val = self
                    .main_map
                    .remove(&id)
                    .expect("entry present at located index");
                Ok(UndoRecord::Reinsert { index, id, val })
            }
            QueueOp::Clear => {
                let snapshot: Vec<(u64, E)> = self
                    .main_map
                    .iter()
                    .map(|(id, entry)| (*id, entry.clone()))
                    .collect();
                self.main_map.clear();
                Ok(UndoRecord::Restore(snapshot))
            }
        }
    }

    /// Rolls back one applied operation.
    pub fn undo(&mut self, undo: UndoRecord<E>) {
        match undo {
            UndoRecord::None => {}
            UndoRecord::RemoveId(id) => {
                self.main_map.remove(&id);
            }
            UndoRecord::Reinsert { index, id, val } => {
                // The linked map has no positional insert; rebuild the tail
                // after the restored entry.
                let mut tail: Vec<(u64, E)> = Vec::with_capacity(self.main_map.len() - index);
                while self.main_map.len() > index {
                    let (tail_id, tail_val) = self
                        .main_map
                        .pop_back()
                        .expect("map longer than split index");
                    tail.push((tail_id, tail_val));
                }
                self.main_map.insert(id, val);
                for (tail_id, tail_val) in tail.into_iter().rev() {
                    self.main_map.insert(tail_id, tail_val);
                }
            }
            UndoRecord::Restore(snapshot) => {
                self.main_map.clear();
                for (id, entry) in snapshot {
                    self.main_map.insert(id, entry);
                }
            }
        }
    }
}

impl<E: Clone> Default for LogQueue<E> {
    fn default() -> Self {
        LogQueue::new()
    }
}
