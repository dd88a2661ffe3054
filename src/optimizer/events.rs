//! Reporting of remapped methods.
//!
//! The optimizer calls a [`MethodListener`] once for every method whose
//! slots it changed. [`RemapLog`] is a ready-made listener that records one
//! [`RemapEvent`] per method and can be shared between threads.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use slotopt::{code::MethodAssembler, optimizer::{RemapLog, VariableOptimizer}};
//!
//! let log = Arc::new(RemapLog::new());
//! let optimizer = VariableOptimizer::new().with_listener(log.clone());
//!
//! // Two temporaries with disjoint lifetimes.
//! let mut asm = MethodAssembler::new_static("f", "()V");
//! asm.iconst(1)?.istore(0)?.iload(0)?.pop()?
//!     .iconst(2)?.istore(1)?.iload(1)?.pop()?
//!     .return_void()?;
//! let mut body = asm.finish()?;
//!
//! assert!(optimizer.optimize(&mut body)?);
//! assert_eq!(log.len(), 1);
//! assert_eq!(log.slots_saved(), 1);
//! # Ok::<(), slotopt::Error>(())
//! ```

use std::fmt;

use crate::{code::MethodBody, optimizer::VariableMap};

/// Receives every method whose local slots were remapped.
///
/// Listeners are shared by all threads of a batch run, so they must be
/// `Send + Sync`. Closures taking `(&MethodBody, &VariableMap)` implement
/// this trait.
pub trait MethodListener: Send + Sync {
    /// Called after `map` has been applied to `body`.
    ///
    /// `map` covers the frame the method had before remapping.
    fn method_remapped(&self, body: &MethodBody, map: &VariableMap);
}

impl<F> MethodListener for F
where
    F: Fn(&MethodBody, &VariableMap) + Send + Sync,
{
    fn method_remapped(&self, body: &MethodBody, map: &VariableMap) {
        self(body, map);
    }
}

/// A single remapped method.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemapEvent {
    /// Method name and descriptor, e.g. `run(I)V`.
    pub method: String,
    /// `max_locals` before remapping.
    pub slots_before: u16,
    /// `max_locals` after remapping.
    pub slots_after: u16,
    /// Number of slots that moved.
    pub remapped: usize,
}

impl RemapEvent {
    /// Number of frame slots saved.
    #[must_use]
    pub fn slots_saved(&self) -> usize {
        usize::from(self.slots_before.saturating_sub(self.slots_after))
    }
}

impl fmt::Display for RemapEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} slot(s) remapped, max_locals {} -> {}",
            self.method, self.remapped, self.slots_before, self.slots_after
        )
    }
}

/// Lock-free collection of [`RemapEvent`]s.
///
/// Appending only needs a shared reference, so one log can be passed to an
/// optimizer running on many threads.
pub struct RemapLog {
    events: boxcar::Vec<RemapEvent>,
}

impl Default for RemapLog {
    fn default() -> Self {
        Self {
            events: boxcar::Vec::new(),
        }
    }
}

impl Clone for RemapLog {
    fn clone(&self) -> Self {
        self.iter().cloned().collect()
    }
}

impl fmt::Debug for RemapLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

impl RemapLog {
    /// Creates an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if no method has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.count() == 0
    }

    /// Returns the number of recorded methods.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.count()
    }

    /// Records an event.
    pub fn record(&self, event: RemapEvent) {
        self.events.push(event);
    }

    /// Iterates over the recorded events, in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &RemapEvent> {
        self.events.iter().map(|(_, event)| event)
    }

    /// Total number of frame slots saved over all recorded methods.
    #[must_use]
    pub fn slots_saved(&self) -> usize {
        self.iter().map(RemapEvent::slots_saved).sum()
    }

    /// Total number of slots moved over all recorded methods.
    #[must_use]
    pub fn slots_remapped(&self) -> usize {
        self.iter().map(|event| event.remapped).sum()
    }

    /// Generates a human-readable summary.
    #[must_use]
    pub fn summary(&self) -> String {
        if self.is_empty() {
            return "no methods remapped".to_string();
        }
        format!(
            "{} method(s) remapped, {} slot(s) moved, {} slot(s) saved",
            self.len(),
            self.slots_remapped(),
            self.slots_saved()
        )
    }
}

impl MethodListener for RemapLog {
    fn method_remapped(&self, body: &MethodBody, map: &VariableMap) {
        self.record(RemapEvent {
            method: format!("{}{}", body.name, body.descriptor),
            slots_before: u16::try_from(map.len()).unwrap_or(u16::MAX),
            slots_after: body.max_locals,
            remapped: map.remapped_count(),
        });
    }
}

impl FromIterator<RemapEvent> for RemapLog {
    fn from_iter<T: IntoIterator<Item = RemapEvent>>(iter: T) -> Self {
        let log = Self::new();
        for event in iter {
            log.record(event);
        }
        log
    }
}

/// Outcome of optimizing a batch of methods.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OptimizationSummary {
    /// Methods visited.
    pub methods: usize,
    /// Methods whose slots were remapped.
    pub changed: usize,
    /// Frame slots saved over all methods.
    pub slots_saved: usize,
}

impl OptimizationSummary {
    /// Combines two summaries.
    #[must_use]
    pub const fn merge(self, other: Self) -> Self {
        Self {
            methods: self.methods + other.methods,
            changed: self.changed + other.changed,
            slots_saved: self.slots_saved + other.slots_saved,
        }
    }
}

impl fmt::Display for OptimizationSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{} methods changed, {} slot(s) saved",
            self.changed, self.methods, self.slots_saved
        )
    }
}
