//! Dwell-based hover tooltips over grid cells.
//!
//! Time is passed in as a [`Duration`] since an arbitrary origin (the page's
//! `performance.now()` in the browser) so the tracker itself never reads a clock.

use std::time::Duration;

use shared::CellId;

/// Tooltips open this far right of and below the pointer.
pub const TOOLTIP_OFFSET_PX: f64 = 12.0;

// Browser timers and `performance.now()` disagree by a few milliseconds.
const TIMER_SLACK: Duration = Duration::from_millis(20);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DwellTicket {
    generation: u64,
    pub cell: CellId,
    pub delay: Duration,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HoverChange {
    /// A new dwell timer to start; any earlier timer is void.
    pub schedule: Option<DwellTicket>,
    pub hide_tooltip: bool,
}

/// Tooltip to show for a cell, in container pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tooltip {
    pub cell: CellId,
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone)]
pub struct HoverTracker {
    dwell: Duration,
    generation: u64,
    current: Option<CellId>,
    entered_at: Duration,
    position: (f64, f64),
    shown: bool,
}

impl HoverTracker {
    pub fn new(dwell: Duration) -> Self {
        Self {
            dwell,
            generation: 0,
            current: None,
            entered_at: Duration::ZERO,
            position: (0.0, 0.0),
            shown: false,
        }
    }

    pub fn current(&self) -> Option<CellId> {
        self.current
    }

    pub fn is_shown(&self) -> bool {
        self.shown
    }

    /// Moving inside the same cell only updates the anchor. Entering another
    /// cell restarts the dwell and hides whatever tooltip was open.
    pub fn pointer_moved(&mut self, cell: CellId, x: f64, y: f64, now: Duration) -> HoverChange {
        self.position = (x, y);
        if self.current == Some(cell) {
            return HoverChange::default();
        }

        let hide_tooltip = self.shown;
        self.generation += 1;
        self.current = Some(cell);
        self.entered_at = now;
        self.shown = false;
        HoverChange {
            schedule: Some(DwellTicket {
                generation: self.generation,
                cell,
                delay: self.dwell,
            }),
            hide_tooltip,
        }
    }

    /// Returns a tooltip only for the live ticket, once, after the full dwell.
    pub fn fire(&mut self, ticket: DwellTicket, now: Duration) -> Option<Tooltip> {
        if ticket.generation != self.generation || self.shown || self.current != Some(ticket.cell) {
            return None;
        }
        if now.saturating_sub(self.entered_at) + TIMER_SLACK < self.dwell {
            return None;
        }
        self.shown = true;
        let (x, y) = self.position;
        Some(Tooltip {
            cell: ticket.cell,
            x: x + TOOLTIP_OFFSET_PX,
            y: y + TOOLTIP_OFFSET_PX,
        })
    }

    /// Pointer left the grid. Returns whether a tooltip has to be hidden.
    pub fn cancel(&mut self) -> bool {
        let was_shown = self.shown;
        self.generation += 1;
        self.current = None;
        self.shown = false;
        was_shown
    }
}
