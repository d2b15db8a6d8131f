//! Per-room serialization of read-modify-write sequences.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use killroom_protocol::RoomId;
use tokio::sync::OwnedMutexGuard;

type LockTable = HashMap<RoomId, Arc<tokio::sync::Mutex<()>>>;

/// One async mutex per room id, created on first use.
///
/// Holding a room's guard while reading the room, mutating the copy, and
/// writing it back makes that sequence atomic with respect to every other
/// caller going through the same table. Different rooms never contend.
///
/// An entry lives only while someone holds or waits for it: releasing
/// the last guard removes it, whether or not the room exists.
#[derive(Debug, Default)]
pub(crate) struct RoomLocks {
    table: Arc<Mutex<LockTable>>,
}

impl RoomLocks {
    /// Waits for exclusive access to `room_id`.
    pub(crate) async fn lock(&self, room_id: RoomId) -> RoomGuard {
        let lock = {
            let mut table = self.table.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(table.entry(room_id).or_default())
        };
        // Built before waiting so a cancelled waiter still prunes on drop.
        let mut guard = RoomGuard {
            guard: None,
            room_id,
            table: Arc::clone(&self.table),
        };
        let acquire = lock.lock_owned();
        guard.guard = Some(acquire.await);
        guard
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.table
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

/// Exclusive access to one room. Dropping it releases the room.
#[derive(Debug)]
pub(crate) struct RoomGuard {
    guard: Option<OwnedMutexGuard<()>>,
    room_id: RoomId,
    table: Arc<Mutex<LockTable>>,
}

impl Drop for RoomGuard {
    fn drop(&mut self) {
        // Release first so the guard's own reference is gone.
        self.guard.take();
        let mut table = self.table.lock().unwrap_or_else(PoisonError::into_inner);
        // Waiters hold a clone of the mutex; only the table's is left when idle.
        if table
            .get(&self.room_id)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            table.remove(&self.room_id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn rid(raw: u32) -> RoomId {
        RoomId::try_from(raw).unwrap()
    }

    #[tokio::test]
    async fn test_same_room_is_exclusive() {
        let locks = Arc::new(RoomLocks::default());
        let guard = locks.lock(rid(1)).await;

        let waiter = {
            let locks = Arc::clone(&locks);
            tokio::spawn(async move {
                let _g = locks.lock(rid(1)).await;
            })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        drop(guard);
        waiter.await.unwrap();
    }

    #[tokio::test]
    async fn test_different_rooms_do_not_contend() {
        let locks = RoomLocks::default();
        let _a = locks.lock(rid(1)).await;
        let _b = locks.lock(rid(2)).await;
        assert_eq!(locks.len(), 2);
    }

    #[tokio::test]
    async fn test_release_removes_idle_entry() {
        let locks = RoomLocks::default();
        let guard = locks.lock(rid(3)).await;
        assert_eq!(locks.len(), 1);
        drop(guard);
        assert_eq!(locks.len(), 0);
    }

    #[tokio::test]
    async fn test_release_keeps_entry_with_waiters() {
        let locks = Arc::new(RoomLocks::default());
        let guard = locks.lock(rid(4)).await;

        let (acquired_tx, acquired_rx) = tokio::sync::oneshot::channel();
        let (release_tx, release_rx) = tokio::sync::oneshot::channel::<()>();
        let waiter = {
            let locks = Arc::clone(&locks);
            tokio::spawn(async move {
                let _g = locks.lock(rid(4)).await;
                let _ = acquired_tx.send(());
                let _ = release_rx.await;
            })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;

        drop(guard);
        acquired_rx.await.unwrap();
        assert_eq!(locks.len(), 1);

        release_tx.send(()).unwrap();
        waiter.await.unwrap();
        assert_eq!(locks.len(), 0);
    }

    #[tokio::test]
    async fn test_cancelled_waiter_leaves_nothing_behind() {
        let locks = Arc::new(RoomLocks::default());
        let guard = locks.lock(rid(5)).await;

        let waiter = {
            let locks = Arc::clone(&locks);
            tokio::spawn(async move {
                let _g = locks.lock(rid(5)).await;
            })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;

        // The holder leaves first, then the waiter gives up before running.
        drop(guard);
        waiter.abort();
        let _ = waiter.await;
        assert_eq!(locks.len(), 0);
    }

    #[tokio::test]
    async fn test_many_rooms_leave_nothing_behind() {
        let locks = RoomLocks::default();
        for raw in 1..=500 {
            let _g = locks.lock(rid(raw)).await;
        }
        assert_eq!(locks.len(), 0);
    }
}
