//! Evenly-spaced streamline tracing
//!
//! A [`HatchingSession`] grows lines over a [`DirectionField`]:
//! 1. Seeds come from a coarse scan of the raster, rejected when a
//!    committed point lies within the separation distance
//! 2. Each seed grows forward and backward with a two-stage midpoint step
//!    of one separation distance
//! 3. A tentative point ends its branch when it is too close to committed
//!    points or to non-adjacent points of its own line
//! 4. Kept lines are committed to the grid and propagate new seeds one
//!    separation distance to either side, breadth first
//!
//! The session keeps every committed line even when tracing fails, so the
//! result of an aborted run stays inspectable.

use std::collections::VecDeque;

use glam::Vec2;
use tracing::{debug, trace};

use crosshatch_config::HatchingConfig;

use crate::field::DirectionField;
use crate::grid::{GridPoint, SpatialGrid};
use crate::types::{HatchLine, HatchingError, PixelMask};

/// Refined points closer than this to the previous point are dropped
const MIN_REFINED_STEP: f32 = 1.0;

/// Outcome of one integration step
enum Step {
    /// Regular point, keep growing
    Continue(Vec2, Vec2),
    /// Last valid point before the field ends
    Last(Vec2, Vec2),
    Stop,
}

/// Points grown from a seed in one direction, seed excluded
#[derive(Default)]
struct Branch {
    points: Vec<Vec2>,
    directions: Vec<Vec2>,
}

/// Tracing state for one direction field
pub struct HatchingSession {
    field: DirectionField,
    config: HatchingConfig,
    mask: PixelMask,
    separation: f32,
    test_distance: f32,
    grid: SpatialGrid,
    lines: Vec<HatchLine>,
    pass: u32,
}

impl HatchingSession {
    pub fn new(field: DirectionField, config: HatchingConfig) -> Result<Self, HatchingError> {
        config.validate()?;
        let separation = config.separation_px(field.width());
        let test_distance = config.test_px(field.width());
        let grid = SpatialGrid::new(field.width(), field.height(), separation);
        debug!(
            "HatchingSession: {}x{} field, {} layers, separation {} px, test {} px",
            field.width(),
            field.height(),
            field.layer_count(),
            separation,
            test_distance
        );

        Ok(Self {
            mask: PixelMask {
                mask_level: config.mask_level,
                background_blue: config.background_blue,
            },
            field,
            config,
            separation,
            test_distance,
            grid,
            lines: Vec::new(),
            pass: 0,
        })
    }

    pub fn field(&self) -> &DirectionField {
        &self.field
    }

    pub fn config(&self) -> &HatchingConfig {
        &self.config
    }

    /// Distance between neighboring lines in pixels
    pub fn separation(&self) -> f32 {
        self.separation
    }

    /// Minimum distance between points of different lines in pixels
    pub fn test_distance(&self) -> f32 {
        self.test_distance
    }

    pub fn pass(&self) -> u32 {
        self.pass
    }

    pub fn grid(&self) -> &SpatialGrid {
        &self.grid
    }

    pub fn lines(&self) -> &[HatchLine] {
        &self.lines
    }

    pub fn into_lines(self) -> Vec<HatchLine> {
        self.lines
    }

    /// Trace the current pass until no seed is left
    ///
    /// Scans the raster on a `seed_grid_step` lattice; every accepted seed
    /// propagates its neighbors before the scan continues. Returns the
    /// number of lines committed.
    pub fn trace(&mut self) -> Result<usize, HatchingError> {
        let step = self.config.seed_grid_step as usize;
        let mut committed = 0;
        for x in (0..self.field.width()).step_by(step) {
            for y in (0..self.field.height()).step_by(step) {
                if let Some(index) = self.try_seed(Vec2::new(x as f32, y as f32))? {
                    committed += 1 + self.propagate(VecDeque::from([index]))?;
                }
            }
        }
        debug!(
            "HatchingSession::trace: pass {} committed {} lines ({} total)",
            self.pass,
            committed,
            self.lines.len()
        );
        Ok(committed)
    }

    /// Start a line at `seed` following the 0 degree layer
    ///
    /// Returns the index of the committed line, or `None` when the seed is
    /// unpaintable, too close to committed points, or the line is too short.
    pub fn try_seed(&mut self, seed: Vec2) -> Result<Option<usize>, HatchingError> {
        if !self.field.is_valid(seed, &self.mask) {
            return Ok(None);
        }
        let Some(direction) = self.field.primary(seed) else {
            return Ok(None);
        };
        if self.conflicts(seed, direction, self.separation) {
            trace!("try_seed: {} is within separation of a committed line", seed);
            return Ok(None);
        }
        let line = self.trace_line(seed, direction);
        self.keep(line)
    }

    /// Seed neighbors of queued lines, breadth first
    ///
    /// Lines of earlier passes seed perpendicular to their own direction.
    /// Returns the number of lines committed.
    pub fn propagate(&mut self, mut queue: VecDeque<usize>) -> Result<usize, HatchingError> {
        let mut committed = 0;
        while let Some(index) = queue.pop_front() {
            let Some(source) = self.lines.get(index) else {
                continue;
            };
            let turned = source.pass != self.pass;
            let samples: Vec<(Vec2, Vec2)> = source
                .points
                .iter()
                .copied()
                .zip(source.directions.iter().copied())
                .collect();

            for side in [1.0, -1.0] {
                for &(point, direction) in &samples {
                    let reference = if turned { direction.perp() } else { direction };
                    let candidate = point + reference.perp() * (side * self.separation);
                    if !self.field.is_valid(candidate, &self.mask) {
                        continue;
                    }
                    let Some(seed_direction) =
                        self.field
                            .resolve_direction(candidate, reference, self.config.seed_tolerance)
                    else {
                        continue;
                    };
                    if self.conflicts(candidate, seed_direction, self.test_distance) {
                        continue;
                    }
                    let line = self.trace_line(candidate, seed_direction);
                    if let Some(new) = self.keep(line)? {
                        queue.push_back(new);
                        committed += 1;
                    }
                }
            }
        }
        Ok(committed)
    }

    /// Begin the next pass on the field rotated by 90 degrees
    ///
    /// Returns the lines of the finished pass, ready to be propagated.
    pub(crate) fn begin_next_pass(&mut self) -> VecDeque<usize> {
        let finished = self.pass;
        self.pass += 1;
        self.field.quarter_turn();
        (0..self.lines.len())
            .filter(|&i| self.lines[i].pass == finished)
            .collect()
    }

    /// Grow both branches from a seed without committing
    fn trace_line(&self, seed: Vec2, direction: Vec2) -> HatchLine {
        let forward = self.grow(seed, direction, &[]);
        let backward = self.grow(seed, -direction, &forward.points);

        let count = backward.points.len() + 1 + forward.points.len();
        let mut points = Vec::with_capacity(count);
        let mut directions = Vec::with_capacity(count);
        points.extend(backward.points.iter().rev());
        directions.extend(backward.directions.iter().rev().map(|d| -*d));
        points.push(seed);
        directions.push(direction);
        points.extend(forward.points);
        directions.extend(forward.directions);

        HatchLine {
            points,
            directions,
            pass: self.pass,
        }
    }

    /// Grow one branch; `other` holds the opposite branch's points
    fn grow(&self, seed: Vec2, direction: Vec2, other: &[Vec2]) -> Branch {
        let mut branch = Branch::default();
        let mut tail = seed;
        let mut heading = direction;

        for _ in 0..self.config.max_steps_per_branch {
            let (point, next_heading, last) = match self.advance(tail, heading) {
                Step::Continue(p, d) => (p, d, false),
                Step::Last(p, d) => (p, d, true),
                Step::Stop => break,
            };

            // Every earlier point of the line except the tail
            let own = std::iter::once(seed)
                .chain(branch.points.iter().copied())
                .take(branch.points.len());
            let too_close = own
                .chain(other.iter().copied())
                .any(|q| q.distance_squared(point) < self.test_distance * self.test_distance);
            if too_close || self.conflicts(point, next_heading, self.test_distance) {
                trace!("grow: stopped at {} next to an existing point", point);
                break;
            }

            branch.points.push(point);
            branch.directions.push(next_heading);
            if last {
                break;
            }
            tail = point;
            heading = next_heading;
        }
        branch
    }

    /// Midpoint step of one separation distance
    fn advance(&self, from: Vec2, heading: Vec2) -> Step {
        let tolerance = self.config.continue_tolerance;
        let h = self.separation;

        let half = from + heading * (0.5 * h);
        if !self.field.is_valid(half, &self.mask) {
            return self.refine(from, half, heading);
        }
        let Some(half_direction) = self.field.resolve_direction(half, heading, tolerance) else {
            return Step::Stop;
        };

        let full = from + half_direction * h;
        if !self.field.is_valid(full, &self.mask) {
            return self.refine(from, full, half_direction);
        }
        let Some(full_direction) = self.field.resolve_direction(full, half_direction, tolerance)
        else {
            return Step::Stop;
        };

        let Some(average) = (half_direction + full_direction).try_normalize() else {
            return Step::Stop;
        };
        let next = from + average * h;
        if !self.field.is_valid(next, &self.mask) {
            return self.refine(from, next, average);
        }
        match self.field.resolve_direction(next, average, tolerance) {
            Some(direction) => Step::Continue(next, direction),
            None => Step::Stop,
        }
    }

    /// Bisect `from..invalid` for the last valid point
    fn refine(&self, from: Vec2, invalid: Vec2, heading: Vec2) -> Step {
        let mut valid = from;
        let mut invalid = invalid;
        for _ in 0..self.config.refine_iterations {
            let mid = (valid + invalid) * 0.5;
            if self.field.is_valid(mid, &self.mask) {
                valid = mid;
            } else {
                invalid = mid;
            }
        }
        if valid.distance(from) < MIN_REFINED_STEP {
            return Step::Stop;
        }
        let direction = self
            .field
            .resolve_direction(valid, heading, self.config.continue_tolerance)
            .unwrap_or(heading);
        Step::Last(valid, direction)
    }

    fn conflicts(&self, position: Vec2, direction: Vec2, radius: f32) -> bool {
        self.grid
            .conflicts(position, direction, self.pass, radius, self.config.crossing_cos)
    }

    /// Commit a traced line if it is long enough
    fn keep(&mut self, line: HatchLine) -> Result<Option<usize>, HatchingError> {
        if line.len() < self.config.min_line_points {
            trace!("keep: discarded line with {} points", line.len());
            return Ok(None);
        }
        self.commit(line).map(Some)
    }

    fn commit(&mut self, line: HatchLine) -> Result<usize, HatchingError> {
        if self.lines.len() >= self.config.max_lines {
            return Err(HatchingError::LineLimitExceeded {
                limit: self.config.max_lines,
            });
        }
        for (&position, &direction) in line.points.iter().zip(&line.directions) {
            self.grid.insert(GridPoint {
                position,
                direction,
                pass: line.pass,
            });
        }
        self.lines.push(line);
        Ok(self.lines.len() - 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{BACKGROUND_PIXEL, direction_pixel};
    use crate::raster::DirectionRaster;

    fn uniform_field(width: u32, height: u32, direction: Vec2) -> DirectionField {
        DirectionField::single(
            DirectionRaster::from_fn(width, height, |_, _| direction_pixel(direction)).unwrap(),
        )
    }

    /// 10 px separation and 5 px test distance on a 200 px wide raster
    fn config() -> HatchingConfig {
        HatchingConfig {
            d_separation: 0.05,
            ..HatchingConfig::default()
        }
    }

    #[test]
    fn test_first_step_from_seed() {
        let mut session = HatchingSession::new(uniform_field(200, 100, Vec2::X), config()).unwrap();
        assert_eq!(session.separation(), 10.0);
        assert_eq!(session.test_distance(), 5.0);

        let index = session.try_seed(Vec2::new(50.0, 50.0)).unwrap().unwrap();
        let line = &session.lines()[index];
        let seed = line
            .points
            .iter()
            .position(|p| *p == Vec2::new(50.0, 50.0))
            .unwrap();
        let next = line.points[seed + 1];
        assert!(next.distance(Vec2::new(60.0, 50.0)) < 1e-3, "next point {next}");
        assert!(line.directions.iter().all(|d| d.distance(Vec2::X) < 1e-6));

        // Both branches run to the raster edges
        assert!(line.points[0].x < 10.0);
        assert!(line.points[line.len() - 1].x > 190.0);
    }

    #[test]
    fn test_close_seed_is_rejected() {
        let mut session = HatchingSession::new(uniform_field(200, 100, Vec2::X), config()).unwrap();
        session.try_seed(Vec2::new(50.0, 50.0)).unwrap().unwrap();
        assert_eq!(session.try_seed(Vec2::new(52.0, 50.0)).unwrap(), None);
        assert_eq!(session.lines().len(), 1);
    }

    #[test]
    fn test_background_seed_is_ignored() {
        let raster = DirectionRaster::from_fn(100, 100, |x, _| {
            if x < 50 { BACKGROUND_PIXEL } else { direction_pixel(Vec2::Y) }
        })
        .unwrap();
        let mut session = HatchingSession::new(DirectionField::single(raster), config()).unwrap();
        assert_eq!(session.try_seed(Vec2::new(20.0, 20.0)).unwrap(), None);
        assert!(session.try_seed(Vec2::new(70.0, 20.0)).unwrap().is_some());
    }

    #[test]
    fn test_branch_stops_at_mask_edge() {
        let raster = DirectionRaster::from_fn(200, 60, |x, _| {
            if x < 133 { direction_pixel(Vec2::X) } else { BACKGROUND_PIXEL }
        })
        .unwrap();
        let mut session = HatchingSession::new(DirectionField::single(raster), config()).unwrap();
        let index = session.try_seed(Vec2::new(100.0, 30.0)).unwrap().unwrap();
        let line = &session.lines()[index];
        let end = line.points[line.len() - 1];
        // Refined onto the last paintable pixel column
        assert!(end.x > 131.0 && end.x < 133.0, "end {end}");
    }

    #[test]
    fn test_separation_holds_on_circular_field() {
        let center = Vec2::new(100.0, 100.0);
        let raster = DirectionRaster::from_fn(200, 200, |x, y| {
            let offset = Vec2::new(x as f32 + 0.5, y as f32 + 0.5) - center;
            if offset.length() < 8.0 {
                BACKGROUND_PIXEL
            } else {
                direction_pixel(offset.perp().normalize())
            }
        })
        .unwrap();
        let mut session = HatchingSession::new(DirectionField::single(raster), config()).unwrap();
        let committed = session.trace().unwrap();
        assert!(committed > 3, "only {committed} lines");

        let d_test = session.test_distance() - 1e-3;
        let lines = session.lines();
        for (a, line) in lines.iter().enumerate() {
            assert!(line.len() >= 3);
            for (i, p) in line.points.iter().enumerate() {
                for q in line.points.iter().skip(i + 2) {
                    assert!(p.distance(*q) >= d_test, "line {a} folds onto itself at {p}");
                }
                for other in &lines[a + 1..] {
                    for q in &other.points {
                        assert!(p.distance(*q) >= d_test, "{p} and {q} are too close");
                    }
                }
            }
        }
    }

    #[test]
    fn test_line_limit_keeps_committed_lines() {
        let mut session = HatchingSession::new(
            uniform_field(200, 200, Vec2::X),
            HatchingConfig {
                max_lines: 3,
                ..config()
            },
        )
        .unwrap();
        let err = session.trace().unwrap_err();
        assert!(matches!(err, HatchingError::LineLimitExceeded { limit: 3 }));
        assert_eq!(session.lines().len(), 3);
        assert_eq!(session.grid().len(), session.lines().iter().map(HatchLine::len).sum::<usize>());
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let result = HatchingSession::new(
            uniform_field(10, 10, Vec2::X),
            HatchingConfig {
                seed_grid_step: 0,
                ..HatchingConfig::default()
            },
        );
        assert!(matches!(result, Err(HatchingError::InvalidConfig(_))));

        // Floors of zero would round the separation down to no movement
        let result = HatchingSession::new(
            uniform_field(100, 100, Vec2::X),
            HatchingConfig {
                d_separation: 0.001,
                min_separation_px: 0.0,
                min_test_px: 0.0,
                ..HatchingConfig::default()
            },
        );
        assert!(matches!(result, Err(HatchingError::InvalidConfig(_))));
    }
}
