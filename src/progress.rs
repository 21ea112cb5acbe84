//! The per-bar state machine.
//!
//! A [`Bar`] is owned by the worker that advances it. It runs in one of two
//! modes:
//!
//! * **Single:** the bar draws itself on every update, either on one line or
//!   as a two-line block (see [`Layout`]).
//! * **Managed:** the bar was created by a [`BarManager`](crate::BarManager)
//!   and never draws. Every update sends an owned [`BarSnapshot`] to the
//!   manager, which redraws all of its bars together.
//!
//! # Status
//!
//! A bar starts [`InProgress`](BarStatus::InProgress) and ends in one of
//! [`Completed`](BarStatus::Completed) (position reached the total exactly),
//! [`Errored`](BarStatus::Errored) (position went past the total) or
//! [`ForceStopped`](BarStatus::ForceStopped) (aborted by its owner). Errored
//! and force-stopped bars ignore further advances. A completed bar still
//! accepts advances so a final message can be shown; advancing it past its
//! total marks it errored.

use std::{io, thread};

use compact_str::CompactString;
use crossbeam_channel::{Sender, TrySendError};
use tracing::{debug, warn};

use crate::{
    builder::RenderStyle,
    error::ProgressError,
    render::{block_lines, gauge, normalize_message},
    terminal::{ConsoleTerminal, Terminal},
};

/// Lifecycle state of a [`Bar`].
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum BarStatus {
    /// Work remains.
    #[default]
    InProgress,
    /// The position reached the total exactly.
    Completed,
    /// The position went past the total.
    Errored,
    /// The owner aborted the bar.
    ForceStopped,
}

impl BarStatus {
    /// Whether the bar has left [`InProgress`](Self::InProgress).
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        match self {
            Self::InProgress => false,
            Self::Completed | Self::Errored | Self::ForceStopped => true,
        }
    }

    /// Whether advances are still applied in this state.
    #[must_use]
    pub const fn accepts_advance(self) -> bool {
        match self {
            Self::InProgress | Self::Completed => true,
            Self::Errored | Self::ForceStopped => false,
        }
    }
}

/// How a single-mode bar is drawn.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum Layout {
    /// ` name [####    ] 50% message`, rewritten in place on one line.
    #[default]
    SingleLine,
    /// `  name : message` above `    [####    ] 50%`, redrawn as a block.
    MultiLine,
}

/// An owned copy of a [`Bar`]'s state at the moment it was taken.
///
/// This is what travels from workers to the manager; it shares nothing with
/// the bar it came from.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BarSnapshot {
    name: CompactString,
    current: u64,
    max: u64,
    status: BarStatus,
    message: CompactString,
    error: Option<ProgressError>,
}

impl BarSnapshot {
    /// Returns the bar's name, which is also its aggregation key.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the position.
    #[must_use]
    pub const fn current(&self) -> u64 {
        self.current
    }

    /// Returns the total.
    #[must_use]
    pub const fn max(&self) -> u64 {
        self.max
    }

    /// Returns the status.
    #[must_use]
    pub const fn status(&self) -> BarStatus {
        self.status
    }

    /// Returns the width-fixed message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns the recorded error, if any.
    #[must_use]
    pub const fn error(&self) -> Option<&ProgressError> {
        self.error.as_ref()
    }

    /// Whether the bar completed normally.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.status == BarStatus::Completed
    }
}

enum Output {
    Single {
        layout: Layout,
        terminal: Box<dyn Terminal>,
    },
    Managed(Sender<BarSnapshot>),
}

/// A single tracked unit of work.
pub struct Bar {
    state: BarSnapshot,
    style: RenderStyle,
    output: Output,
}

impl std::fmt::Debug for Bar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bar")
            .field("state", &self.state)
            .field("managed", &self.is_managed())
            .finish_non_exhaustive()
    }
}

impl Bar {
    fn new(max: u64, name: CompactString, style: RenderStyle, output: Output) -> Self {
        Self {
            state: BarSnapshot {
                name,
                current: 0,
                max,
                status: BarStatus::InProgress,
                message: normalize_message("", style.message_width).into(),
                error: None,
            },
            style,
            output,
        }
    }

    /// Creates a standalone bar that draws itself to stdout.
    ///
    /// # Parameters
    ///
    /// * `length`: The total amount of work.
    /// * `name`: A label for the task.
    /// * `layout`: Whether to draw on one line or as a two-line block.
    #[must_use]
    pub fn single(length: impl Into<u64>, name: impl Into<CompactString>, layout: Layout) -> Self {
        Self::single_with_terminal(length, name, layout, ConsoleTerminal::stdout())
    }

    /// Creates a standalone bar that draws itself to `terminal`.
    #[must_use]
    pub fn single_with_terminal(
        length: impl Into<u64>,
        name: impl Into<CompactString>,
        layout: Layout,
        terminal: impl Terminal + 'static,
    ) -> Self {
        let output = Output::Single {
            layout,
            terminal: Box::new(terminal),
        };
        Self::new(length.into(), name.into(), RenderStyle::default(), output)
    }

    pub(crate) fn managed(
        length: u64,
        name: CompactString,
        style: RenderStyle,
        sender: Sender<BarSnapshot>,
    ) -> Self {
        Self::new(length, name, style, Output::Managed(sender))
    }

    /// Replaces the column widths used for this bar.
    #[must_use]
    pub fn with_style(mut self, style: RenderStyle) -> Self {
        self.style = style;
        self.state.message = normalize_message(&self.state.message, style.message_width).into();
        self
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    /// Returns the bar's name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.state.name
    }

    /// Returns the position.
    #[must_use]
    pub const fn current(&self) -> u64 {
        self.state.current
    }

    /// Returns the total.
    #[must_use]
    pub const fn max(&self) -> u64 {
        self.state.max
    }

    /// Returns the status.
    #[must_use]
    pub const fn status(&self) -> BarStatus {
        self.state.status
    }

    /// Returns the width-fixed message from the last advance.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.state.message
    }

    /// Returns the recorded error, if any.
    #[must_use]
    pub const fn error(&self) -> Option<&ProgressError> {
        self.state.error.as_ref()
    }

    /// Whether the bar completed normally. Errored and force-stopped bars are
    /// terminal but not finished.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.state.is_finished()
    }

    /// Whether the bar reports to a manager instead of drawing itself.
    #[must_use]
    pub const fn is_managed(&self) -> bool {
        matches!(self.output, Output::Managed(_))
    }

    /// Returns an owned copy of the current state.
    #[must_use]
    pub fn snapshot(&self) -> BarSnapshot {
        self.state.clone()
    }

    // ========================================================================
    // Updates
    // ========================================================================

    /// Adds `delta` to the position and replaces the message.
    ///
    /// Ignored once the bar is errored or force-stopped. Reaching the total
    /// marks the bar completed; passing it records
    /// [`ProgressError::OutOfRange`] and marks it errored.
    ///
    /// A managed bar then sends a snapshot to its manager, blocking while the
    /// manager's channel is full. A single bar draws itself.
    ///
    /// # Errors
    ///
    /// Returns [`ProgressError::Disconnected`] if the manager has already
    /// stopped listening. The bar's own state is updated regardless.
    pub fn advance(&mut self, delta: u64, message: &str) -> Result<(), ProgressError> {
        if !self.state.status.accepts_advance() {
            return Ok(());
        }

        self.state.message = normalize_message(message, self.style.message_width).into();

        let (current, overflowed) = self.state.current.overflowing_add(delta);
        self.state.current = if overflowed { u64::MAX } else { current };

        if overflowed || self.state.current > self.state.max {
            self.state.error = Some(ProgressError::OutOfRange {
                current: self.state.current,
                max: self.state.max,
            });
            self.state.status = BarStatus::Errored;
        } else if self.state.current == self.state.max {
            self.state.status = BarStatus::Completed;
        }

        match &mut self.output {
            Output::Single { layout, terminal } => {
                draw_single(&self.state, self.style, *layout, terminal.as_mut());
                Ok(())
            }
            Output::Managed(sender) => sender
                .send(self.state.clone())
                .map_err(|_| ProgressError::Disconnected),
        }
    }

    /// Aborts the bar without a cause.
    ///
    /// See [`force_stop_with_error`](Self::force_stop_with_error).
    pub fn force_stop(&mut self) {
        self.stop_with(None);
    }

    /// Aborts the bar and records `reason` as a
    /// [`ProgressError::ForceStopped`].
    ///
    /// Only an in-progress bar can be stopped. A managed bar hands its final
    /// snapshot to the manager without blocking the caller: if the channel is
    /// full, a detached thread finishes the send.
    pub fn force_stop_with_error(&mut self, reason: impl Into<CompactString>) {
        self.stop_with(Some(ProgressError::ForceStopped {
            reason: reason.into(),
        }));
    }

    fn stop_with(&mut self, error: Option<ProgressError>) {
        if self.state.status != BarStatus::InProgress {
            return;
        }

        self.state.status = BarStatus::ForceStopped;
        if error.is_some() {
            self.state.error = error;
        }

        match &mut self.output {
            Output::Single { layout, terminal } => {
                draw_single(&self.state, self.style, *layout, terminal.as_mut());
            }
            Output::Managed(sender) => match sender.try_send(self.state.clone()) {
                Ok(()) => {}
                Err(TrySendError::Full(snapshot)) => {
                    let sender = sender.clone();
                    thread::spawn(move || {
                        if sender.send(snapshot).is_err() {
                            debug!("manager closed before force-stop report was delivered");
                        }
                    });
                }
                Err(TrySendError::Disconnected(_)) => {
                    debug!(bar = %self.state.name, "force-stop after manager closed");
                }
            },
        }
    }

    /// Draws the bar in its single-mode layout. Managed bars are drawn by
    /// their manager, so this does nothing for them.
    ///
    /// # Errors
    ///
    /// Returns any I/O error raised by the terminal.
    pub fn show(&mut self) -> io::Result<()> {
        match &mut self.output {
            Output::Single { layout, terminal } => {
                render_single(&self.state, self.style, *layout, terminal.as_mut())
            }
            Output::Managed(_) => Ok(()),
        }
    }
}

fn draw_single(
    state: &BarSnapshot,
    style: RenderStyle,
    layout: Layout,
    terminal: &mut dyn Terminal,
) {
    if let Err(err) = render_single(state, style, layout, terminal) {
        warn!(bar = %state.name, error = %err, "failed to draw progress bar");
    }
}

fn render_single(
    state: &BarSnapshot,
    style: RenderStyle,
    layout: Layout,
    terminal: &mut dyn Terminal,
) -> io::Result<()> {
    let gauge = gauge(state.current, state.max, style.gauge_width);
    let done = state.status.is_terminal();

    match layout {
        Layout::SingleLine => {
            let line = format!(" {} {} {}", state.name, gauge, state.message);
            terminal.overwrite_line(&line, done)
        }
        Layout::MultiLine => {
            terminal.print_multiline(&block_lines(&state.name, &state.message, gauge))?;
            if done {
                Ok(())
            } else {
                terminal.move_cursor_back()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use crossbeam_channel::bounded;

    use super::{Bar, BarStatus, Layout};
    use crate::{MemoryTerminal, ProgressError, builder::RenderStyle};

    fn single(max: u64) -> (Bar, MemoryTerminal) {
        let screen = MemoryTerminal::new();
        let bar = Bar::single_with_terminal(max, "job", Layout::SingleLine, screen.clone());
        (bar, screen)
    }

    /// Basic Lifecycle
    /// Advances summing to the total complete the bar.
    #[test]
    fn test_basic_lifecycle() {
        let (mut bar, _screen) = single(10);

        assert_eq!(bar.status(), BarStatus::InProgress);
        assert_eq!(bar.current(), 0);
        assert!(!bar.is_finished());

        for step in [3, 3, 4] {
            bar.advance(step, "working").unwrap();
        }

        assert_eq!(bar.current(), 10);
        assert_eq!(bar.status(), BarStatus::Completed);
        assert!(bar.is_finished());
        assert!(bar.error().is_none());
    }

    /// Overshoot
    /// The first advance past the total errors the bar, later ones are ignored.
    #[test]
    fn test_overshoot() {
        let (mut bar, _screen) = single(5);

        bar.advance(4, "a").unwrap();
        bar.advance(2, "b").unwrap();

        assert_eq!(bar.status(), BarStatus::Errored);
        assert_eq!(bar.current(), 6);
        assert_eq!(
            bar.error(),
            Some(&ProgressError::OutOfRange { current: 6, max: 5 })
        );
        assert!(!bar.is_finished());

        let message = bar.message().to_owned();
        bar.advance(1, "ignored").unwrap();
        assert_eq!(bar.current(), 6);
        assert_eq!(bar.status(), BarStatus::Errored);
        assert_eq!(bar.message(), message);
    }

    /// Arithmetic Overflow
    /// Wrapping past u64::MAX is treated as an overshoot.
    #[test]
    fn test_overflow() {
        let (mut bar, _screen) = single(u64::MAX);

        bar.advance(u64::MAX - 1, "").unwrap();
        bar.advance(5, "").unwrap();

        assert_eq!(bar.status(), BarStatus::Errored);
        assert_eq!(bar.current(), u64::MAX);
    }

    /// Completed Bars
    /// A completed bar takes a trailing message but errors if pushed further.
    #[test]
    fn test_advance_after_completion() {
        let (mut bar, _screen) = single(2);

        bar.advance(2, "done").unwrap();
        bar.advance(0, "final note").unwrap();
        assert_eq!(bar.status(), BarStatus::Completed);
        assert!(bar.message().starts_with("final note"));

        bar.advance(1, "too far").unwrap();
        assert_eq!(bar.status(), BarStatus::Errored);
    }

    /// Force Stop
    /// Stopping is terminal, records the cause, and blocks further advances.
    #[test]
    fn test_force_stop() {
        let (mut bar, _screen) = single(10);

        bar.advance(3, "").unwrap();
        bar.force_stop_with_error("disk full");

        assert_eq!(bar.status(), BarStatus::ForceStopped);
        assert_eq!(
            bar.error(),
            Some(&ProgressError::ForceStopped {
                reason: "disk full".into()
            })
        );

        bar.advance(7, "").unwrap();
        assert_eq!(bar.current(), 3);
        assert_eq!(bar.status(), BarStatus::ForceStopped);
        assert!(!bar.is_finished());

        // Terminal states never change.
        bar.force_stop();
        assert!(bar.error().is_some());
    }

    /// Stop After Error
    /// An errored bar keeps its overshoot status when stopped.
    #[test]
    fn test_force_stop_after_error() {
        let (mut bar, _screen) = single(1);

        bar.advance(2, "").unwrap();
        bar.force_stop();

        assert_eq!(bar.status(), BarStatus::Errored);
    }

    /// Message Geometry
    /// Stored messages are flattened and fixed to the configured width.
    #[test]
    fn test_message_geometry() {
        let (mut bar, _screen) = single(10);
        assert_eq!(bar.message(), " ".repeat(40));

        bar.advance(1, "a\r\nb\nc").unwrap();
        assert_eq!(bar.message(), format!("a b c{}", " ".repeat(35)));

        let long = "x".repeat(50) + "tail";
        bar.advance(1, &long).unwrap();
        assert_eq!(bar.message().chars().count(), 40);
        assert!(bar.message().ends_with("tail"));

        let bar = bar.with_style(RenderStyle {
            gauge_width: 10,
            message_width: 4,
        });
        assert_eq!(bar.message(), "tail");
    }

    /// Single-Line Rendering
    /// The line is rewritten in place and ended once the bar is done.
    #[test]
    fn test_single_line_render() {
        let (mut bar, screen) = single(4);

        bar.advance(1, "first").unwrap();
        assert_eq!(screen.lines().len(), 1);
        assert!(screen.lines()[0].starts_with(" job ["));
        assert!(screen.lines()[0].contains("] 25% first"));
        assert_eq!(screen.cursor(), 0);

        bar.advance(3, "last").unwrap();
        assert_eq!(screen.lines().len(), 1);
        assert!(screen.lines()[0].contains("] 100% last"));
        assert_eq!(screen.cursor(), 1);
    }

    /// Multi-Line Rendering
    /// The block is redrawn over itself until the bar is done.
    #[test]
    fn test_multi_line_render() {
        let screen = MemoryTerminal::new();
        let mut bar =
            Bar::single_with_terminal(2u64, "download", Layout::MultiLine, screen.clone());

        bar.advance(1, "half").unwrap();
        assert_eq!(screen.lines().len(), 2);
        assert!(screen.lines()[0].starts_with("  download : half"));
        assert!(screen.lines()[1].starts_with("    ["));
        assert_eq!(screen.cursor(), 0);

        bar.advance(1, "all").unwrap();
        assert_eq!(screen.lines().len(), 2);
        assert!(screen.lines()[1].ends_with("] 100%"));
        assert_eq!(screen.cursor(), 2);
    }

    /// Managed Reports
    /// Every advance sends an independent snapshot, in order.
    #[test]
    fn test_managed_reports() {
        let (tx, rx) = bounded(8);
        let mut bar = Bar::managed(3, "net".into(), RenderStyle::default(), tx);
        assert!(bar.is_managed());

        bar.advance(1, "one").unwrap();
        bar.advance(2, "two").unwrap();

        let first = rx.recv().unwrap();
        let second = rx.recv().unwrap();
        assert_eq!(first.current(), 1);
        assert_eq!(first.status(), BarStatus::InProgress);
        assert!(first.message().starts_with("one"));
        assert_eq!(second.current(), 3);
        assert!(second.is_finished());
        assert_eq!(bar.snapshot(), second);
    }

    /// Closed Manager
    /// Reporting after the receiver is gone returns an error but keeps state.
    #[test]
    fn test_managed_disconnected() {
        let (tx, rx) = bounded(1);
        let mut bar = Bar::managed(3, "late".into(), RenderStyle::default(), tx);
        drop(rx);

        assert_eq!(bar.advance(1, ""), Err(ProgressError::Disconnected));
        assert_eq!(bar.current(), 1);
    }

    /// Non-Blocking Stop
    /// Force-stopping on a full channel returns at once and still delivers.
    #[test]
    fn test_force_stop_full_channel() {
        let (tx, rx) = bounded(1);
        let mut bar = Bar::managed(10, "slow".into(), RenderStyle::default(), tx);

        bar.advance(1, "fills the channel").unwrap();
        bar.force_stop();

        let handle = thread::spawn(move || {
            let first = rx.recv().unwrap();
            let second = rx.recv().unwrap();
            (first, second)
        });
        let (first, second) = handle.join().unwrap();

        assert_eq!(first.status(), BarStatus::InProgress);
        assert_eq!(second.status(), BarStatus::ForceStopped);
    }

    /// Explicit Show
    /// Redrawing on demand follows the layout and skips managed bars.
    #[test]
    fn test_show_layouts() {
        let screen = MemoryTerminal::new();
        let mut block = Bar::single_with_terminal(2u64, "x", Layout::MultiLine, screen.clone());

        block.show().unwrap();
        let lines = screen.lines();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("  x : "));
        assert!(lines[1].ends_with("] 00%"));
        assert_eq!(screen.cursor(), 0);

        let (mut line, screen) = single(1);
        line.advance(1, "done").unwrap();
        assert_eq!(screen.cursor(), 1);
        line.show().unwrap();
        let lines = screen.lines();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], lines[1]);
        assert_eq!(screen.cursor(), 2);

        let (tx, rx) = bounded(1);
        let mut managed = Bar::managed(3, "quiet".into(), RenderStyle::default(), tx);
        assert!(managed.show().is_ok());
        assert!(rx.try_recv().is_err());
    }

    /// Stop After Completion
    /// A completed bar stays completed and sends nothing more when stopped.
    #[test]
    fn test_force_stop_after_completion() {
        let (mut bar, screen) = single(2);
        bar.advance(2, "done").unwrap();
        let drawn = screen.lines();

        bar.force_stop_with_error("too late");
        assert_eq!(bar.status(), BarStatus::Completed);
        assert!(bar.is_finished());
        assert!(bar.error().is_none());
        assert_eq!(screen.lines(), drawn);

        let (tx, rx) = bounded(4);
        let mut managed = Bar::managed(2, "net".into(), RenderStyle::default(), tx);
        managed.advance(2, "done").unwrap();
        managed.force_stop();

        assert_eq!(managed.status(), BarStatus::Completed);
        assert!(managed.is_finished());
        let sent: Vec<_> = rx.try_iter().collect();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].is_finished());
    }
}
