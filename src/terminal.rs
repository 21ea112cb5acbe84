//! Terminal backends used to draw bars.
//!
//! The [`Terminal`] trait is the only seam between the aggregation logic and
//! the screen. [`ConsoleTerminal`] draws to stdout through [`console::Term`];
//! [`MemoryTerminal`] keeps a virtual screen in memory for headless hosts and
//! for inspecting output in tests.

use std::{io, sync::Arc};

use console::Term;
use parking_lot::Mutex;

/// Cursor-level drawing operations required by bars and the manager.
pub trait Terminal: Send {
    /// Prints `lines` starting at the cursor, replacing whatever was there.
    fn print_multiline(&mut self, lines: &[String]) -> io::Result<()>;

    /// Moves the cursor back to the first line of the last printed block so
    /// the next [`print_multiline`](Self::print_multiline) overwrites it.
    fn move_cursor_back(&mut self) -> io::Result<()>;

    /// Rewrites the current line in place, ending it when `end_line` is set.
    fn overwrite_line(&mut self, line: &str, end_line: bool) -> io::Result<()>;

    /// Leaves redraw mode: the cursor is placed below anything drawn so far.
    fn stop(&mut self) -> io::Result<()>;
}

/// A [`Terminal`] writing ANSI cursor movements to stdout.
#[derive(Debug)]
pub struct ConsoleTerminal {
    term: Term,
    block_height: usize,
    rewound: bool,
}

impl ConsoleTerminal {
    /// Creates a terminal bound to stdout.
    #[must_use]
    pub fn stdout() -> Self {
        Self::new(Term::stdout())
    }

    /// Wraps an existing [`Term`] handle.
    #[must_use]
    pub const fn new(term: Term) -> Self {
        Self {
            term,
            block_height: 0,
            rewound: false,
        }
    }
}

impl Default for ConsoleTerminal {
    fn default() -> Self {
        Self::stdout()
    }
}

impl Terminal for ConsoleTerminal {
    fn print_multiline(&mut self, lines: &[String]) -> io::Result<()> {
        for line in lines {
            self.term.clear_line()?;
            self.term.write_line(line)?;
        }
        self.block_height = lines.len();
        self.rewound = false;
        self.term.flush()
    }

    fn move_cursor_back(&mut self) -> io::Result<()> {
        self.term.move_cursor_up(self.block_height)?;
        self.rewound = self.block_height > 0;
        self.term.flush()
    }

    fn overwrite_line(&mut self, line: &str, end_line: bool) -> io::Result<()> {
        self.term.write_str("\r")?;
        self.term.write_str(line)?;
        if end_line {
            self.term.write_line("")?;
        }
        self.term.flush()
    }

    fn stop(&mut self) -> io::Result<()> {
        if self.rewound {
            self.term.move_cursor_down(self.block_height)?;
            self.rewound = false;
        }
        self.term.flush()
    }
}

#[derive(Debug, Default)]
struct Screen {
    rows: Vec<String>,
    cursor: usize,
    block_height: usize,
    stopped: bool,
}

impl Screen {
    fn put(&mut self, line: &str) {
        if self.cursor < self.rows.len() {
            line.clone_into(&mut self.rows[self.cursor]);
        } else {
            self.rows.push(line.to_owned());
        }
    }
}

/// An in-memory [`Terminal`] that models rows and a cursor.
///
/// Clones share the same screen, so a host can hand one clone to a manager
/// and read the rendered rows from another.
#[derive(Clone, Debug, Default)]
pub struct MemoryTerminal {
    screen: Arc<Mutex<Screen>>,
}

impl MemoryTerminal {
    /// Creates an empty screen.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of every row currently on the screen.
    #[must_use]
    pub fn lines(&self) -> Vec<String> {
        self.screen.lock().rows.clone()
    }

    /// Returns the row index the cursor is on.
    #[must_use]
    pub fn cursor(&self) -> usize {
        self.screen.lock().cursor
    }

    /// Whether [`Terminal::stop`] has been called.
    #[must_use]
    pub fn is_stopped(&self) -> bool {
        self.screen.lock().stopped
    }
}

impl Terminal for MemoryTerminal {
    fn print_multiline(&mut self, lines: &[String]) -> io::Result<()> {
        let mut screen = self.screen.lock();
        for line in lines {
            screen.put(line);
            screen.cursor += 1;
        }
        screen.block_height = lines.len();
        Ok(())
    }

    fn move_cursor_back(&mut self) -> io::Result<()> {
        let mut screen = self.screen.lock();
        screen.cursor = screen.cursor.saturating_sub(screen.block_height);
        Ok(())
    }

    fn overwrite_line(&mut self, line: &str, end_line: bool) -> io::Result<()> {
        let mut screen = self.screen.lock();
        screen.put(line);
        if end_line {
            screen.cursor += 1;
        }
        Ok(())
    }

    fn stop(&mut self) -> io::Result<()> {
        let mut screen = self.screen.lock();
        screen.cursor = screen.rows.len();
        screen.stopped = true;
        Ok(())
    }
}
