//! Per-table schema edit serialization
//!
//! A table is either `Idle` or has exactly one schema edit in flight.
//! A second edit waits on a condition variable until the first releases
//! its guard or the wait budget runs out.

use std::collections::HashSet;
use std::sync::{Condvar, Mutex};
use std::time::{Duration, Instant};

use crate::errors::{TableError, TableResult};
use crate::ids::TableId;

/// Schema edit state of one table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditState {
    Idle,
    SchemaEditInFlight,
}

/// Tables with a schema edit in flight
#[derive(Debug, Default)]
pub struct EditLocks {
    in_flight: Mutex<HashSet<TableId>>,
    released: Condvar,
}

impl EditLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits at most `timeout` for the table to become idle, then marks it
    /// busy until the returned guard is dropped.
    pub fn acquire(&self, table: TableId, timeout: Duration) -> TableResult<EditGuard<'_>> {
        let started = Instant::now();
        let mut in_flight = self.in_flight.lock().map_err(|_| TableError::poisoned())?;

        while in_flight.contains(&table) {
            let remaining = timeout.saturating_sub(started.elapsed());
            if remaining.is_zero() {
                return Err(TableError::SchemaEditConflict(table.to_string()));
            }
            let (guard, _) = self
                .released
                .wait_timeout(in_flight, remaining)
                .map_err(|_| TableError::poisoned())?;
            in_flight = guard;
        }

        in_flight.insert(table);
        Ok(EditGuard { locks: self, table })
    }

    pub fn state(&self, table: TableId) -> EditState {
        match self.in_flight.lock() {
            Ok(in_flight) if in_flight.contains(&table) => EditState::SchemaEditInFlight,
            _ => EditState::Idle,
        }
    }

    fn release(&self, table: TableId) {
        // A poisoned set still has to let waiters through.
        let mut in_flight = match self.in_flight.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        in_flight.remove(&table);
        drop(in_flight);
        self.released.notify_all();
    }
}

/// Marks a table busy for the guard's lifetime
#[derive(Debug)]
pub struct EditGuard<'a> {
    locks: &'a EditLocks,
    table: TableId,
}

impl EditGuard<'_> {
    pub fn table(&self) -> TableId {
        self.table
    }
}

impl Drop for EditGuard<'_> {
    fn drop(&mut self) {
        self.locks.release(self.table);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use uuid::Uuid;

    fn table() -> TableId {
        TableId(Uuid::new_v4())
    }

    #[test]
    fn test_guard_marks_table_busy() {
        let locks = EditLocks::new();
        let t = table();

        assert_eq!(locks.state(t), EditState::Idle);
        let guard = locks.acquire(t, Duration::ZERO).unwrap();
        assert_eq!(guard.table(), t);
        assert_eq!(locks.state(t), EditState::SchemaEditInFlight);
        drop(guard);
        assert_eq!(locks.state(t), EditState::Idle);
    }

    #[test]
    fn test_zero_timeout_conflicts_immediately() {
        let locks = EditLocks::new();
        let t = table();
        let _guard = locks.acquire(t, Duration::ZERO).unwrap();

        assert!(matches!(
            locks.acquire(t, Duration::ZERO),
            Err(TableError::SchemaEditConflict(_))
        ));
    }

    #[test]
    fn test_other_tables_are_independent() {
        let locks = EditLocks::new();
        let _a = locks.acquire(table(), Duration::ZERO).unwrap();
        assert!(locks.acquire(table(), Duration::ZERO).is_ok());
    }

    #[test]
    fn test_waiter_proceeds_after_release() {
        let locks = Arc::new(EditLocks::new());
        let t = table();
        let guard = locks.acquire(t, Duration::ZERO).unwrap();

        let waiter = {
            let locks = Arc::clone(&locks);
            thread::spawn(move || locks.acquire(t, Duration::from_secs(5)).map(|_| ()))
        };

        thread::sleep(Duration::from_millis(20));
        drop(guard);
        assert!(waiter.join().unwrap().is_ok());
    }

    #[test]
    fn test_bounded_wait_times_out() {
        let locks = EditLocks::new();
        let t = table();
        let _guard = locks.acquire(t, Duration::ZERO).unwrap();

        let started = Instant::now();
        let result = locks.acquire(t, Duration::from_millis(30));
        assert!(matches!(result, Err(TableError::SchemaEditConflict(_))));
        assert!(started.elapsed() >= Duration::from_millis(30));
    }
}
