//! Single-threaded edit scheduling: debounced recomputation and the
//! re-entrancy guard.
//!
//! All mutations happen synchronously inside one event handler, so there is
//! no concurrent-writer hazard; what must be controlled is (a) expensive
//! derived recomputation piling up behind every slider tick, and (b) the
//! write path re-entering itself when applying a value triggers another
//! "update keyframe from current value" write. (a) is handled by a settle
//! delay timer with plain clear-and-reschedule invalidation; (b) by an
//! explicit two-state machine instead of an ambient boolean flag.

use bitflags::bitflags;
use std::time::{Duration, Instant};

bitflags! {
    /// Work kinds coalesced while edits keep arriving. Redraws settle within
    /// tens of milliseconds; footprint analysis waits for the edit burst to
    /// end entirely.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct PendingWork: u32 {
        const NONE     = 0b0000_0000;
        /// Repaint of timeline / curve visualisations.
        const REDRAW   = 0b0000_0001;
        /// Footprint, hull and PCA recomputation over the posed model.
        const ANALYSIS = 0b0000_0010;
    }
}

/// Coalesces bursts of requests into one firing after a settle delay. Every
/// `poke` within the window cancels and reschedules the pending deadline, so
/// interactive dragging never fires per tick. The host event loop supplies
/// the clock; the debouncer never spawns timers of its own.
#[derive(Debug)]
pub struct Debouncer {
    settle: Duration,
    deadline: Option<Instant>,
    pending: PendingWork,
}

impl Debouncer {
    pub fn new(settle: Duration) -> Self {
        Self {
            settle,
            deadline: None,
            pending: PendingWork::NONE,
        }
    }

    /// Request `work`, restarting the settle window.
    pub fn poke(&mut self, work: PendingWork, now: Instant) {
        self.pending |= work;
        self.deadline = Some(now + self.settle);
    }

    /// Returns the accumulated work once the settle delay has elapsed,
    /// clearing the pending state. Returns `None` while the window is still
    /// open or nothing was requested.
    pub fn fire(&mut self, now: Instant) -> Option<PendingWork> {
        let deadline = self.deadline?;
        if now < deadline {
            return None;
        }
        self.deadline = None;
        let work = self.pending;
        self.pending = PendingWork::NONE;
        Some(work)
    }

    /// Drop anything scheduled (pose reset, trajectory reload).
    pub fn cancel(&mut self) {
        self.deadline = None;
        self.pending = PendingWork::NONE;
    }

    pub fn is_scheduled(&self) -> bool {
        self.deadline.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EditState {
    Idle,
    Applying,
}

/// Guard against mutual recursion between "apply value" and "update keyframe
/// from current value". The write path runs inside a scope; any attempt to
/// open a second scope while one is active is refused, so derived
/// recomputation triggered mid-write cannot write again.
#[derive(Debug)]
pub struct EditGuard {
    state: EditState,
}

impl EditGuard {
    pub fn new() -> Self {
        Self { state: EditState::Idle }
    }

    /// Enter the applying state. `None` means a write is already in flight
    /// and the caller must skip its write-back.
    pub fn enter(&mut self) -> Option<EditScope<'_>> {
        match self.state {
            EditState::Applying => None,
            EditState::Idle => {
                self.state = EditState::Applying;
                Some(EditScope { guard: self })
            }
        }
    }

    pub fn is_applying(&self) -> bool {
        self.state == EditState::Applying
    }
}

impl Default for EditGuard {
    fn default() -> Self {
        Self::new()
    }
}

/// RAII scope returned by [`EditGuard::enter`]; leaving it returns the guard
/// to idle even on early returns.
pub struct EditScope<'a> {
    guard: &'a mut EditGuard,
}

impl Drop for EditScope<'_> {
    fn drop(&mut self) {
        self.guard.state = EditState::Idle;
    }
}
