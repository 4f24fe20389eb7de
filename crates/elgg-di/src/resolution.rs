//! Tracking of services under construction
//!
//! Each thread keeps its own stack of names being resolved. A name that shows
//! up twice on the same stack means a factory depends on itself, directly or
//! through other services.

use std::collections::HashMap;
use std::thread::{self, ThreadId};

use parking_lot::Mutex;
use tracing::warn;

use crate::{DIError, DIResult};

#[derive(Default)]
pub(crate) struct ResolutionTracker {
    in_progress: Mutex<HashMap<ThreadId, Vec<String>>>,
}

impl ResolutionTracker {
    /// Mark `name` as under construction on the current thread.
    ///
    /// The mark is removed when the returned guard is dropped, whether the
    /// factory succeeded, failed or panicked.
    pub(crate) fn enter(&self, name: &str) -> DIResult<ResolutionGuard<'_>> {
        let thread = thread::current().id();
        let mut in_progress = self.in_progress.lock();
        let stack = in_progress.entry(thread).or_default();

        if let Some(start) = stack.iter().position(|entry| entry == name) {
            let mut chain: Vec<&str> = stack[start..].iter().map(String::as_str).collect();
            chain.push(name);
            let chain = chain.join(" -> ");
            warn!("Cyclic dependency while resolving '{}': {}", name, chain);
            return Err(DIError::CyclicDependency { chain });
        }

        stack.push(name.to_string());
        Ok(ResolutionGuard {
            tracker: self,
            thread,
        })
    }

    #[cfg(test)]
    fn depth(&self) -> usize {
        self.in_progress
            .lock()
            .get(&thread::current().id())
            .map(Vec::len)
            .unwrap_or(0)
    }
}

pub(crate) struct ResolutionGuard<'a> {
    tracker: &'a ResolutionTracker,
    thread: ThreadId,
}

impl Drop for ResolutionGuard<'_> {
    fn drop(&mut self) {
        let mut in_progress = self.tracker.in_progress.lock();
        if let Some(stack) = in_progress.get_mut(&self.thread) {
            stack.pop();
            if stack.is_empty() {
                in_progress.remove(&self.thread);
            }
        }
    }
}
