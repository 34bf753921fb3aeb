//! Second hatching layer perpendicular to the first

use tracing::debug;

use crosshatch_config::HatchingConfig;

use crate::field::DirectionField;
use crate::tracer::HatchingSession;
use crate::types::{HatchLine, HatchingError};

impl HatchingSession {
    /// Trace the next pass on the field rotated by 90 degrees
    ///
    /// The grid is shared with earlier passes; lines of the finished pass
    /// seed the new pass with their directions turned a quarter, then the
    /// coarse scan fills what propagation missed. Returns the number of
    /// lines committed in the new pass.
    pub fn cross_hatch(&mut self) -> Result<usize, HatchingError> {
        let seeds = self.begin_next_pass();
        debug!(
            "cross_hatch: pass {} seeded from {} lines",
            self.pass(),
            seeds.len()
        );
        let propagated = self.propagate(seeds)?;
        Ok(propagated + self.trace()?)
    }
}

/// Trace one pass, plus a perpendicular pass when `cross` is set
///
/// On error the session is dropped; use [`HatchingSession`] directly to
/// inspect the lines committed before a failure.
pub fn hatch(
    field: DirectionField,
    config: HatchingConfig,
    cross: bool,
) -> Result<Vec<HatchLine>, HatchingError> {
    let mut session = HatchingSession::new(field, config)?;
    session.trace()?;
    if cross {
        session.cross_hatch()?;
    }
    Ok(session.into_lines())
}
