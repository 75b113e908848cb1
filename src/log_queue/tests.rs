//! Log Queue Tests
//!
//! Validates FIFO materialization order, removal from the middle, and the
//! apply/undo machinery the replication substrate depends on.

#[cfg(test)]
mod tests {
    use crate::log_queue::queue::LogQueue;
    use crate::log_queue::types::{QueueError, QueueOp, UndoRecord};

    fn entries(queue: &LogQueue<String>) -> Vec<String> {
        queue
            .entry_list(-1)
            .into_iter()
            .map(|record| record.entry)
            .collect()
    }

    // ============================================================
    // BASIC QUEUE ORDER
    // ============================================================

    #[test]
    fn test_basic_queue_order() {
        let mut queue = LogQueue::new();

        let id_c = queue.enqueue("c".to_string());
        let id_b = queue.enqueue("b".to_string());
        let id_a = queue.enqueue("a".to_string());

        let records = queue.entry_list(-1);
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].id, id_c);
        assert_eq!(records[1].id, id_b);
        assert_eq!(records[2].id, id_a);
        assert_eq!(entries(&queue), vec!["c", "b", "a"]);

        // Remove the middle entry
        queue.remove(id_b);
        assert_eq!(entries(&queue), vec!["c", "a"]);
    }

    #[test]
    fn test_entry_list_respects_limit() {
        let mut queue = LogQueue::new();
        for value in ["one", "two", "three"] {
            queue.enqueue(value.to_string());
        }

        assert_eq!(queue.entry_list(2).len(), 2);
        assert_eq!(queue.entry_list(0).len(), 0);
        assert_eq!(queue.entry_list(-1).len(), 3, "-1 returns everything");
        assert_eq!(queue.entry_list(10).len(), 3);
    }

    #[test]
    fn test_point_lookups() {
        let mut queue = LogQueue::new();
        let id = queue.enqueue(41i32);

        assert!(queue.contains_key(id));
        assert_eq!(queue.get(id), Some(&41));
        assert_eq!(queue.size(), 1);
        assert!(!queue.is_empty());

        assert_eq!(queue.remove(id), Some(41));
        assert!(queue.is_empty());
        assert_eq!(queue.remove(id), None, "second removal is a no-op");
    }

    #[test]
    fn test_enqueue_ids_are_unique() {
        let mut queue = LogQueue::new();
        let mut ids = std::collections::HashSet::new();

        for i in 0..1000 {
            assert!(ids.insert(queue.enqueue(i)), "enqueue must never reuse a live id");
        }
        assert_eq!(queue.size(), 1000);
    }

    // ============================================================
    // APPLY / UNDO
    // ============================================================

    #[test]
    fn test_apply_rejects_duplicate_id() {
        let mut queue = LogQueue::new();
        queue
            .apply(QueueOp::Enqueue { id: 7, val: "x".to_string() })
            .unwrap();

        let result = queue.apply(QueueOp::Enqueue { id: 7, val: "y".to_string() });
        assert_eq!(result, Err(QueueError::DuplicateId(7)));
        assert_eq!(queue.get(7), Some(&"x".to_string()), "loser must not overwrite");
    }

    #[test]
    fn test_undo_enqueue() {
        let mut queue = LogQueue::new();
        let undo = queue
            .apply(QueueOp::Enqueue { id: 1, val: "x".to_string() })
            .unwrap();
        assert_eq!(undo, UndoRecord::RemoveId(1));

        queue.undo(undo);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_undo_remove_restores_position() {
        let mut queue = LogQueue::new();
        for (id, value) in [(1u64, "c"), (2, "b"), (3, "a")] {
            queue
                .apply(QueueOp::Enqueue { id, val: value.to_string() })
                .unwrap();
        }

        let undo = queue.apply(QueueOp::Remove { id: 2 }).unwrap();
        assert_eq!(entries(&queue), vec!["c", "a"]);

        queue.undo(undo);
        assert_eq!(
            entries(&queue),
            vec!["c", "b", "a"],
            "undoing a removal must restore the original order"
        );
    }

    #[test]
    fn test_remove_missing_id_is_undoable_noop() {
        let mut queue: LogQueue<String> = LogQueue::new();
        queue
            .apply(QueueOp::Enqueue { id: 1, val: "x".to_string() })
            .unwrap();

        let undo = queue.apply(QueueOp::Remove { id: 99 }).unwrap();
        assert_eq!(undo, UndoRecord::None);

        queue.undo(undo);
        assert_eq!(queue.size(), 1);
    }

    #[test]
    fn test_undo_clear_restores_everything() {
        let mut queue = LogQueue::new();
        for (id, value) in [(1u64, "c"), (2, "b"), (3, "a")] {
            queue
                .apply(QueueOp::Enqueue { id, val: value.to_string() })
                .unwrap();
        }

        let undo = queue.apply(QueueOp::Clear).unwrap();
        assert!(queue.is_empty());

        queue.undo(undo);
        assert_eq!(entries(&queue), vec!["c", "b", "a"]);
    }
}
