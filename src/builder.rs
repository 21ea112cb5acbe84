//! Configuration and fluent construction of a [`BarManager`].
//!
//! [`BarManager::new`] covers the common case. The [`BarManagerBuilder`]
//! exists for hosts that need a different channel capacity, different
//! column widths, or a terminal other than stdout (for example a
//! [`MemoryTerminal`](crate::MemoryTerminal) when running headless).

use std::time::Duration;

use crate::{
    manager::BarManager,
    terminal::{ConsoleTerminal, Terminal},
};

/// Column widths used when drawing bars.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RenderStyle {
    /// Number of cells between the gauge brackets.
    pub gauge_width: usize,
    /// Fixed character width every message is padded or truncated to.
    pub message_width: usize,
}

impl RenderStyle {
    /// Width used for both the gauge and messages unless overridden.
    pub const DEFAULT_WIDTH: usize = 40;
}

impl Default for RenderStyle {
    fn default() -> Self {
        Self {
            gauge_width: Self::DEFAULT_WIDTH,
            message_width: Self::DEFAULT_WIDTH,
        }
    }
}

/// Settings fixed for the lifetime of one [`BarManager`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ManagerConfig {
    /// How long the aggregation loop waits for a report before giving up.
    pub timeout: Duration,
    /// Capacity of the shared report channel. Reporters block while it is full.
    pub capacity: usize,
    /// Column widths for every bar created by the manager.
    pub style: RenderStyle,
}

impl ManagerConfig {
    /// Default channel capacity.
    pub const DEFAULT_CAPACITY: usize = 100;

    /// Creates a configuration with the given watchdog timeout and defaults
    /// for everything else.
    #[must_use]
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            capacity: Self::DEFAULT_CAPACITY,
            style: RenderStyle::default(),
        }
    }
}

/// A builder for [`BarManager`] instances.
pub struct BarManagerBuilder {
    config: ManagerConfig,
    terminal: Option<Box<dyn Terminal>>,
}

impl BarManagerBuilder {
    /// Starts a builder with the given watchdog timeout.
    #[must_use]
    pub fn new(timeout: Duration) -> Self {
        Self::from_config(ManagerConfig::new(timeout))
    }

    /// Starts a builder from a complete configuration.
    #[must_use]
    pub fn from_config(config: ManagerConfig) -> Self {
        Self {
            config,
            terminal: None,
        }
    }

    /// Sets the report channel capacity.
    ///
    /// A capacity of zero makes every report a rendezvous with the manager.
    #[must_use]
    pub const fn capacity(mut self, capacity: usize) -> Self {
        self.config.capacity = capacity;
        self
    }

    /// Sets both column widths at once.
    #[must_use]
    pub const fn style(mut self, style: RenderStyle) -> Self {
        self.config.style = style;
        self
    }

    /// Sets the number of cells inside the gauge brackets.
    #[must_use]
    pub const fn gauge_width(mut self, width: usize) -> Self {
        self.config.style.gauge_width = width;
        self
    }

    /// Sets the fixed message width.
    #[must_use]
    pub const fn message_width(mut self, width: usize) -> Self {
        self.config.style.message_width = width;
        self
    }

    /// Draws to `terminal` instead of stdout.
    #[must_use]
    pub fn terminal(mut self, terminal: impl Terminal + 'static) -> Self {
        self.terminal = Some(Box::new(terminal));
        self
    }

    /// Consumes the builder and returns the manager.
    #[must_use]
    pub fn build(self) -> BarManager {
        let terminal = self
            .terminal
            .unwrap_or_else(|| Box::new(ConsoleTerminal::stdout()));
        BarManager::from_parts(self.config, terminal)
    }
}
