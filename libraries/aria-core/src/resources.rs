//! Media locator release bookkeeping
//!
//! Songs point at their bytes through an opaque locator owned by whoever created
//! it. Once a locator is no longer referenced by any playlist it must be handed
//! back exactly once, but never while the media element is still reading from it.

use std::collections::{BTreeSet, HashSet};

/// Hands a locator back to whoever created it
pub trait ResourceReleaser {
    /// Release the resource behind `locator`
    ///
    /// Called at most once per locator.
    fn release(&mut self, locator: &str);
}

/// What happened to a release request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleaseOutcome {
    /// The releaser was called
    Released,

    /// The locator is loaded in the media element; released when it switches away
    Deferred,

    /// Another playlist entry still uses the locator
    StillReferenced,

    /// The locator was released earlier
    AlreadyReleased,
}

/// Release-at-most-once ledger
#[derive(Debug, Default)]
pub struct ResourceLedger {
    released: HashSet<String>,
    deferred: BTreeSet<String>,
    in_flight: Option<String>,
}

impl ResourceLedger {
    /// Create an empty ledger
    pub fn new() -> Self {
        Self::default()
    }

    /// Locator currently assigned to the media element
    pub fn in_flight(&self) -> Option<&str> {
        self.in_flight.as_deref()
    }

    /// Whether a locator has already been released
    pub fn is_released(&self, locator: &str) -> bool {
        self.released.contains(locator)
    }

    /// Whether a locator is waiting for the media element to let go of it
    pub fn is_deferred(&self, locator: &str) -> bool {
        self.deferred.contains(locator)
    }

    /// Ask for a locator to be released
    pub fn request_release(
        &mut self,
        locator: &str,
        still_referenced: bool,
        releaser: &mut dyn ResourceReleaser,
    ) -> ReleaseOutcome {
        if self.released.contains(locator) {
            return ReleaseOutcome::AlreadyReleased;
        }

        if still_referenced {
            return ReleaseOutcome::StillReferenced;
        }

        if self.in_flight.as_deref() == Some(locator) {
            tracing::debug!("Deferring release of in-flight locator {}", locator);
            self.deferred.insert(locator.to_string());
            return ReleaseOutcome::Deferred;
        }

        self.release_now(locator, releaser);
        ReleaseOutcome::Released
    }

    /// Record the locator the media element now reads from
    ///
    /// A deferred locator is released once the element moves off it, unless it
    /// has been referenced again in the meantime. Returns how many were released.
    pub fn set_in_flight(
        &mut self,
        locator: Option<&str>,
        is_referenced: impl Fn(&str) -> bool,
        releaser: &mut dyn ResourceReleaser,
    ) -> usize {
        self.in_flight = locator.map(str::to_string);
        self.flush_deferred(is_referenced, releaser)
    }

    /// Release every deferred locator and every locator in `remaining`
    ///
    /// Used at session end. Returns how many were released.
    pub fn release_all<'a>(
        &mut self,
        remaining: impl IntoIterator<Item = &'a str>,
        releaser: &mut dyn ResourceReleaser,
    ) -> usize {
        self.in_flight = None;

        let mut pending: BTreeSet<String> = std::mem::take(&mut self.deferred);
        pending.extend(remaining.into_iter().map(str::to_string));

        let mut count = 0;
        for locator in pending {
            if !self.released.contains(&locator) {
                self.release_now(&locator, releaser);
                count += 1;
            }
        }
        count
    }

    fn flush_deferred(
        &mut self,
        is_referenced: impl Fn(&str) -> bool,
        releaser: &mut dyn ResourceReleaser,
    ) -> usize {
        let ready: Vec<String> = self
            .deferred
            .iter()
            .filter(|l| self.in_flight.as_deref() != Some(l.as_str()))
            .cloned()
            .collect();

        let mut count = 0;
        for locator in ready {
            self.deferred.remove(&locator);
            if is_referenced(&locator) {
                continue;
            }
            self.release_now(&locator, releaser);
            count += 1;
        }
        count
    }

    fn release_now(&mut self, locator: &str, releaser: &mut dyn ResourceReleaser) {
        tracing::debug!("Releasing media locator {}", locator);
        releaser.release(locator);
        self.released.insert(locator.to_string());
    }
}
