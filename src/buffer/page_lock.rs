use std::collections::HashSet;

use crate::common::{Permission, TransactionId};

/// Reader/writer lock state for one page, held until commit or abort.
///
/// Acquisition never waits: a request either succeeds immediately or is
/// refused.
#[derive(Debug, Default)]
pub struct PageLockState {
    readers: HashSet<TransactionId>,
    writer: Option<TransactionId>,
    /// Set once the entry has been dropped from the lock table; a retired
    /// entry must be looked up again before use
    retired: bool,
}

impl PageLockState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tries to grant `perm` to `tid`. Returns false if another transaction
    /// holds a conflicting lock.
    pub fn try_acquire(&mut self, tid: TransactionId, perm: Permission) -> bool {
        match perm {
            Permission::Read => match self.writer {
                Some(writer) if writer != tid => false,
                _ => {
                    self.readers.insert(tid);
                    true
                }
            },
            Permission::Write => match self.writer {
                Some(writer) => writer == tid,
                None => {
                    let sole_reader = self.readers.len() == 1 && self.readers.contains(&tid);
                    if self.readers.is_empty() || sole_reader {
                        self.writer = Some(tid);
                        true
                    } else {
                        false
                    }
                }
            },
        }
    }

    /// Drops every lock `tid` holds on this page.
    pub fn release(&mut self, tid: TransactionId) {
        self.readers.remove(&tid);
        if self.writer == Some(tid) {
            self.writer = None;
        }
    }

    pub fn is_free(&self) -> bool {
        self.readers.is_empty() && self.writer.is_none()
    }

    /// True if `tid` holds at least `perm`.
    pub fn holds(&self, tid: TransactionId, perm: Permission) -> bool {
        match perm {
            Permission::Read => self.writer == Some(tid) || self.readers.contains(&tid),
            Permission::Write => self.writer == Some(tid),
        }
    }

    pub fn is_retired(&self) -> bool {
        self.retired
    }

    pub fn retire(&mut self) {
        self.retired = true;
    }
}
