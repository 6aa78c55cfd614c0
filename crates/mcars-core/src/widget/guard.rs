//! Single-flight guard for the send affordance.

use std::sync::atomic::{AtomicBool, Ordering};

use crate::view::ConversationView;

/// Scoped ownership of the busy flag.
///
/// Acquiring disables the send affordance; dropping clears the flag and
/// re-enables it, whichever way the request ended.
pub(crate) struct BusyGuard<'a, V: ConversationView> {
    flag: &'a AtomicBool,
    view: &'a V,
}

impl<'a, V: ConversationView> BusyGuard<'a, V> {
    /// Take the flag, or `None` if a request is already in flight.
    pub(crate) fn acquire(flag: &'a AtomicBool, view: &'a V) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()?;
        view.set_send_enabled(false);
        Some(Self { flag, view })
    }
}

impl<V: ConversationView> Drop for BusyGuard<'_, V> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
        self.view.set_send_enabled(true);
    }
}
