// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Advisory single-thread ownership check.

use std::thread::{self, ThreadId};

/// Remembers the thread that created it and warns when used from another one.
///
/// This is instrumentation, not synchronization: a violation is logged and
/// the operation still runs.
#[derive(Clone, Debug)]
pub(crate) struct ThreadOwner {
    owner: ThreadId,
}

impl ThreadOwner {
    pub(crate) fn current() -> Self {
        Self {
            owner: thread::current().id(),
        }
    }

    /// Returns whether the calling thread is the owner, logging a warning if not.
    pub(crate) fn check(&self, operation: &str) -> bool {
        let current = thread::current().id();
        if current == self.owner {
            return true;
        }
        log::warn!(
            "scene {operation} on thread {current:?}, but the scene is owned by {:?}",
            self.owner
        );
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn owner_thread_passes() {
        let owner = ThreadOwner::current();
        assert!(owner.check("mutation"), "creating thread owns the scene");
    }

    #[test]
    fn other_thread_is_flagged() {
        let owner = ThreadOwner::current();
        let ok = thread::spawn(move || owner.check("repaint"))
            .join()
            .expect("check thread panicked");
        assert!(!ok, "foreign thread must be reported");
    }
}
