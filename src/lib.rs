//! # `progress_relay`
//!
//! Live multi-bar progress output for concurrent workers.
//!
//! Each worker owns a [`Bar`] and advances it whenever it likes. Bars created
//! by a [`BarManager`] send owned snapshots over a bounded channel; the
//! manager's single loop redraws every bar on each report, restarts a
//! watchdog, and returns the names of bars that did not finish normally once
//! all bars are done or the watchdog expires.
//!
//! * **Message passing only**: workers never touch the rendered view.
//! * **Stall detection**: if no bar reports within the timeout, the manager
//!   gives up and lists what was left unfinished.
//! * **Stable geometry**: every message is fixed to one width so redraws
//!   overwrite cleanly.
//!
//! ## Modules
//!
//! * [`builder`]: Configuration and fluent construction of a [`BarManager`].
//! * [`error`]: The [`ProgressError`] type.
//! * [`io`]: [`std::io::Read`] and [`std::io::Write`] wrappers that advance a bar.
//! * [`iter`]: Extension trait that advances a bar per iterator item.
//! * [`manager`]: The aggregation loop.
//! * [`progress`]: The per-bar state machine and snapshots.
//! * [`render`]: Pure gauge and message formatting.
//! * [`terminal`]: The drawing seam and its stdout and in-memory backends.
//!
//! ## Example
//!
//! ```no_run
//! use std::{thread, time::Duration};
//!
//! use progress_relay::BarManager;
//!
//! let mut manager = BarManager::new(Duration::from_secs(5));
//! let workers: Vec<_> = (0..3)
//!     .map(|i| {
//!         let mut bar = manager.create(10u64, format!("job-{i}"));
//!         thread::spawn(move || {
//!             for step in 0..10 {
//!                 let _ = bar.advance(1, &format!("step {step}"));
//!             }
//!         })
//!     })
//!     .collect();
//!
//! let unfinished = manager.show_and_wait();
//! for worker in workers {
//!     worker.join().unwrap();
//! }
//! assert!(unfinished.is_empty());
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod builder;
pub mod error;
pub mod io;
pub mod iter;
pub mod manager;
pub mod progress;
pub mod render;
pub mod terminal;

pub use builder::{BarManagerBuilder, ManagerConfig, RenderStyle};
pub use error::ProgressError;
pub use iter::{BarIter, BarIteratorExt};
pub use manager::BarManager;
pub use progress::{Bar, BarSnapshot, BarStatus, Layout};
pub use terminal::{ConsoleTerminal, MemoryTerminal, Terminal};
