//! Iterator adapters for automatic progress reporting.
//!
//! [`BarIteratorExt`] attaches a [`Bar`] to any iterator: every yielded item
//! advances the bar by one. With [`track_with`](BarIteratorExt::track_with)
//! the message is derived from each item.
//!
//! # Example
//!
//! ```ignore
//! use progress_relay::{BarIteratorExt, BarManager};
//!
//! let bar = manager.create(files.len() as u64, "hash");
//! for file in files.iter().track_with(bar, |f| f.display().to_string()) {
//!     // ...
//! }
//! ```

use tracing::trace;

use crate::Bar;

/// An iterator adapter that advances a [`Bar`] once per item.
///
/// Once a report fails because the manager has closed, reporting stops but
/// iteration continues.
pub struct BarIter<I, F> {
    iter: I,
    bar: Bar,
    label: F,
    reporting: bool,
}

impl<I, F> BarIter<I, F> {
    /// Creates a new `BarIter`.
    ///
    /// Note: This is usually constructed via [`BarIteratorExt`] methods.
    pub const fn new(iter: I, bar: Bar, label: F) -> Self {
        Self {
            iter,
            bar,
            label,
            reporting: true,
        }
    }

    /// Returns the bar being advanced.
    pub const fn bar(&self) -> &Bar {
        &self.bar
    }

    /// Consumes the adapter and returns its bar.
    pub fn into_bar(self) -> Bar {
        self.bar
    }
}

impl<I, F> Iterator for BarIter<I, F>
where
    I: Iterator,
    F: FnMut(&I::Item) -> String,
{
    type Item = I::Item;

    fn next(&mut self) -> Option<Self::Item> {
        let item = self.iter.next()?;

        if self.reporting {
            let message = (self.label)(&item);
            if let Err(err) = self.bar.advance(1, &message) {
                trace!(bar = self.bar.name(), error = %err, "stopped reporting iteration");
                self.reporting = false;
            }
        }

        Some(item)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.iter.size_hint()
    }
}

/// Label function used by [`BarIteratorExt::track`]: every item gets an empty
/// message.
pub type NoLabel<T> = fn(&T) -> String;

/// Extension trait to attach a [`Bar`] to any iterator.
pub trait BarIteratorExt: Iterator + Sized {
    /// Advances `bar` by one per item with an empty message.
    fn track(self, bar: Bar) -> BarIter<Self, NoLabel<Self::Item>>;

    /// Advances `bar` by one per item, using `label` to build each message.
    fn track_with<F>(self, bar: Bar, label: F) -> BarIter<Self, F>
    where
        F: FnMut(&Self::Item) -> String;
}

impl<I: Iterator> BarIteratorExt for I {
    fn track(self, bar: Bar) -> BarIter<Self, NoLabel<Self::Item>> {
        let label: NoLabel<Self::Item> = |_| String::new();
        BarIter::new(self, bar, label)
    }

    fn track_with<F>(self, bar: Bar, label: F) -> BarIter<Self, F>
    where
        F: FnMut(&Self::Item) -> String,
    {
        BarIter::new(self, bar, label)
    }
}
