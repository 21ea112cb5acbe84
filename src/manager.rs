//! Aggregation of many managed bars into one redrawn view.
//!
//! The [`BarManager`] is the central coordinator for "Multi-Bar" output. Each
//! bar it creates holds a sender for a shared bounded channel; the manager's
//! [`show_and_wait`](BarManager::show_and_wait) loop is the only receiver.
//!
//! # Synchronization Strategy
//!
//! Workers and the manager share nothing but the channel. Bars send owned
//! [`BarSnapshot`]s; the latest snapshot per bar and the display order live
//! on the stack of the aggregation loop and are never visible to workers.
//!
//! * **Workers:** Block on `advance` only while the channel is full.
//! * **Manager:** Blocks until a report arrives or the watchdog expires. Each
//!   report redraws every known bar and restarts the watchdog.
//!
//! There is no per-bar timeout. A bar that stops reporting while others keep
//! going stays visibly stuck until the others finish and the watchdog fires.

use std::{collections::HashMap, time::Duration};

use compact_str::CompactString;
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, bounded};
use tracing::{debug, warn};
use web_time::Instant;

use crate::{
    builder::{BarManagerBuilder, ManagerConfig, RenderStyle},
    progress::{Bar, BarSnapshot, BarStatus},
    render::{block_lines, display_name, gauge},
    terminal::Terminal,
};

const SUMMARY_HEADER: &str = "Process not finished: ";

/// Coordinates a fixed set of managed bars and draws them together.
///
/// A manager is used once: create its bars with [`create`](Self::create),
/// hand them to workers, then call [`show_and_wait`](Self::show_and_wait).
/// Workers must not report after that call returns; their reports fail with
/// [`ProgressError::Disconnected`](crate::ProgressError::Disconnected).
pub struct BarManager {
    config: ManagerConfig,
    bar_count: usize,
    registered: Vec<CompactString>,
    sender: Sender<BarSnapshot>,
    receiver: Receiver<BarSnapshot>,
    terminal: Box<dyn Terminal>,
}

impl std::fmt::Debug for BarManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BarManager")
            .field("config", &self.config)
            .field("bar_count", &self.bar_count)
            .field("queued", &self.receiver.len())
            .finish_non_exhaustive()
    }
}

impl BarManager {
    /// Creates a manager drawing to stdout with the given watchdog timeout.
    #[must_use]
    pub fn new(timeout: Duration) -> Self {
        Self::builder(timeout).build()
    }

    /// Starts a [`BarManagerBuilder`] with the given watchdog timeout.
    #[must_use]
    pub fn builder(timeout: Duration) -> BarManagerBuilder {
        BarManagerBuilder::new(timeout)
    }

    pub(crate) fn from_parts(config: ManagerConfig, terminal: Box<dyn Terminal>) -> Self {
        let (sender, receiver) = bounded(config.capacity);
        Self {
            config,
            bar_count: 0,
            registered: Vec::new(),
            sender,
            receiver,
            terminal,
        }
    }

    /// Creates a bar that reports to this manager.
    ///
    /// Names are the aggregation key: two bars with the same name share one
    /// row, and the manager will then never see every bar finish.
    ///
    /// # Parameters
    ///
    /// * `length`: The total amount of work.
    /// * `name`: The display name and key for the bar.
    #[must_use]
    pub fn create(&mut self, length: impl Into<u64>, name: impl Into<CompactString>) -> Bar {
        let name = name.into();
        self.bar_count += 1;
        if !self.registered.contains(&name) {
            self.registered.push(name.clone());
        }
        debug!(bar = %name, count = self.bar_count, "registered progress bar");
        Bar::managed(length.into(), name, self.config.style, self.sender.clone())
    }

    /// Returns the number of bars created so far.
    #[must_use]
    pub const fn bar_count(&self) -> usize {
        self.bar_count
    }

    /// Returns the manager's configuration.
    #[must_use]
    pub const fn config(&self) -> &ManagerConfig {
        &self.config
    }

    /// Runs the aggregation loop until every bar has left
    /// [`InProgress`](BarStatus::InProgress) or no report arrives within the
    /// timeout, then closes the channel.
    ///
    /// The loop also ends early once every bar handle has been dropped, since
    /// no further report can arrive.
    ///
    /// Returns the names of bars that did not complete normally: errored and
    /// force-stopped bars and bars still in progress when the loop ended, in
    /// display order, followed by bars that never reported at all. When the
    /// list is not empty it is also printed below the bars.
    pub fn show_and_wait(self) -> Vec<CompactString> {
        let Self {
            config,
            bar_count,
            registered,
            sender,
            receiver,
            mut terminal,
        } = self;
        // Only bars keep the channel open from here on.
        drop(sender);

        let started = Instant::now();
        let mut board = Board::new(config.style);

        let outcome = loop {
            match receiver.recv_timeout(config.timeout) {
                Ok(snapshot) => {
                    board.record(snapshot);
                    draw(terminal.print_multiline(&board.lines()));
                    if board.settled() == bar_count {
                        break Outcome::Completed;
                    }
                    draw(terminal.move_cursor_back());
                }
                Err(RecvTimeoutError::Timeout) => {
                    warn!(timeout = ?config.timeout, "no progress reported before timeout");
                    draw(terminal.stop());
                    break Outcome::TimedOut;
                }
                Err(RecvTimeoutError::Disconnected) => {
                    debug!("every progress bar was dropped");
                    draw(terminal.stop());
                    break Outcome::Abandoned;
                }
            }
        };

        let mut unfinished = board.unfinished();
        unfinished.extend(registered.into_iter().filter(|name| !board.has_seen(name)));
        drop(receiver);

        if !unfinished.is_empty() {
            warn!(bars = ?unfinished, "progress bars did not finish");
            let mut lines = vec![SUMMARY_HEADER.to_owned()];
            lines.extend(unfinished.iter().map(|name| format!("  {name}")));
            draw(terminal.print_multiline(&lines));
        }

        debug!(
            ?outcome,
            elapsed = ?started.elapsed(),
            unfinished = unfinished.len(),
            "progress aggregation ended"
        );
        unfinished
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Outcome {
    Completed,
    TimedOut,
    Abandoned,
}

fn draw(result: std::io::Result<()>) {
    if let Err(err) = result {
        warn!(error = %err, "failed to draw progress bars");
    }
}

/// Loop-owned table of the latest snapshot per bar, in first-seen order.
#[derive(Debug)]
struct Board {
    style: RenderStyle,
    latest: HashMap<CompactString, BarSnapshot>,
    order: Vec<CompactString>,
}

impl Board {
    fn new(style: RenderStyle) -> Self {
        Self {
            style,
            latest: HashMap::new(),
            order: Vec::new(),
        }
    }

    fn record(&mut self, snapshot: BarSnapshot) {
        let name = CompactString::from(snapshot.name());
        if !self.latest.contains_key(&name) {
            debug!(bar = %name, row = self.order.len(), "first report from progress bar");
            self.order.push(name.clone());
        }
        self.latest.insert(name, snapshot);
    }

    fn has_seen(&self, name: &str) -> bool {
        self.latest.contains_key(name)
    }

    fn rows(&self) -> impl Iterator<Item = &BarSnapshot> {
        self.order.iter().filter_map(|name| self.latest.get(name))
    }

    fn lines(&self) -> Vec<String> {
        self.rows()
            .flat_map(|bar| {
                block_lines(
                    &display_name(bar.name()),
                    bar.message(),
                    gauge(bar.current(), bar.max(), self.style.gauge_width),
                )
            })
            .collect()
    }

    /// Number of rows no longer in progress.
    fn settled(&self) -> usize {
        self.rows().filter(|bar| bar.status().is_terminal()).count()
    }

    fn unfinished(&self) -> Vec<CompactString> {
        self.rows()
            .filter(|bar| bar.status() != BarStatus::Completed)
            .map(|bar| bar.name().into())
            .collect()
    }
}
