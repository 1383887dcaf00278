//! Configuration surface of the Reeb graph sweep.

use serde::{Deserialize, Serialize};

/// Direction in which local propagations sweep the scalar field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SweepDirection {
    /// Grow from minima towards maxima.
    #[default]
    Ascending,
    /// Grow from maxima towards minima.
    Descending,
}

impl SweepDirection {
    /// The opposite direction.
    pub fn reversed(self) -> Self {
        match self {
            SweepDirection::Ascending => SweepDirection::Descending,
            SweepDirection::Descending => SweepDirection::Ascending,
        }
    }
}

/// Parameters of a Reeb graph build.
///
/// `debug_level` only changes diagnostic output:
/// - `0`: silent
/// - `1`: setup and timing summaries (`info`)
/// - `2`: one line per critical point (`debug`)
/// - `3`: parking and merging at saddles (`trace`)
/// - `4`: forest dumps (`trace`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FtrConfig {
    /// Worker threads; `0` uses the rayon default.
    pub threads: usize,
    /// Diagnostic verbosity.
    pub debug_level: u8,
    /// Sweep direction of the propagations.
    pub direction: SweepDirection,
    /// Record regular vertices on the arc they belong to.
    pub segmentation: bool,
}

impl Default for FtrConfig {
    fn default() -> Self {
        Self {
            threads: 0,
            debug_level: 0,
            direction: SweepDirection::Ascending,
            segmentation: true,
        }
    }
}

impl FtrConfig {
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads;
        self
    }

    pub fn with_debug_level(mut self, level: u8) -> Self {
        self.debug_level = level;
        self
    }

    pub fn with_direction(mut self, direction: SweepDirection) -> Self {
        self.direction = direction;
        self
    }

    pub fn with_segmentation(mut self, segmentation: bool) -> Self {
        self.segmentation = segmentation;
        self
    }

    #[inline]
    pub(crate) fn verbose(&self, level: u8) -> bool {
        self.debug_level >= level
    }
}
