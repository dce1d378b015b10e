//! Cumulative per-phase analytics timings.

use std::time::Duration;

use serde::Serialize;

/// Analytics phase measured by [`PhaseTimings`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Node block.
    Node,
    /// First parent block.
    FirstParent,
    /// Second parent block.
    SecondParent,
    /// URL block.
    Url,
    /// Ascendant walk.
    Ascendant,
    /// Descendant count.
    Descendant,
    /// Katz solve.
    Katz,
}

/// Time spent in each phase, summed over every assembled record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct PhaseTimings {
    /// Node block.
    pub node_properties: Duration,
    /// First parent block.
    pub first_parent_properties: Duration,
    /// Second parent block.
    pub second_parent_properties: Duration,
    /// URL block.
    pub url_properties: Duration,
    /// Ascendant walk.
    pub ascendant_properties: Duration,
    /// Descendant count.
    pub descendant_properties: Duration,
    /// Katz solve.
    pub katz_properties: Duration,
}

impl PhaseTimings {
    /// Add `elapsed` to `phase`.
    pub fn record(&mut self, phase: Phase, elapsed: Duration) {
        let slot = match phase {
            Phase::Node => &mut self.node_properties,
            Phase::FirstParent => &mut self.first_parent_properties,
            Phase::SecondParent => &mut self.second_parent_properties,
            Phase::Url => &mut self.url_properties,
            Phase::Ascendant => &mut self.ascendant_properties,
            Phase::Descendant => &mut self.descendant_properties,
            Phase::Katz => &mut self.katz_properties,
        };
        *slot += elapsed;
    }

    /// Sum over all phases.
    pub fn total(&self) -> Duration {
        self.node_properties
            + self.first_parent_properties
            + self.second_parent_properties
            + self.url_properties
            + self.ascendant_properties
            + self.descendant_properties
            + self.katz_properties
    }
}
