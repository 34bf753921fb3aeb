//! Uniform spatial grid for separation queries

use glam::Vec2;

/// A committed line point
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridPoint {
    pub position: Vec2,
    pub direction: Vec2,
    pub pass: u32,
}

/// Fixed-size 2D array of growable cells with side `cell_size`
#[derive(Debug, Clone)]
pub struct SpatialGrid {
    cell_size: f32,
    cells_x: usize,
    cells_y: usize,
    cells: Vec<Vec<GridPoint>>,
    len: usize,
}

impl SpatialGrid {
    /// Grid covering a `width` x `height` raster
    pub fn new(width: u32, height: u32, cell_size: f32) -> Self {
        let cell_size = cell_size.max(1.0);
        let cells_x = (width as f32 / cell_size) as usize + 1;
        let cells_y = (height as f32 / cell_size) as usize + 1;
        Self {
            cell_size,
            cells_x,
            cells_y,
            cells: vec![Vec::new(); cells_x * cells_y],
            len: 0,
        }
    }

    #[inline]
    pub fn cell_size(&self) -> f32 {
        self.cell_size
    }

    #[inline]
    pub fn cells_x(&self) -> usize {
        self.cells_x
    }

    #[inline]
    pub fn cells_y(&self) -> usize {
        self.cells_y
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Cell containing a position, clamped to the grid
    #[inline]
    fn cell_of(&self, position: Vec2) -> (usize, usize) {
        let x = (position.x / self.cell_size).max(0.0) as usize;
        let y = (position.y / self.cell_size).max(0.0) as usize;
        (x.min(self.cells_x - 1), y.min(self.cells_y - 1))
    }

    pub fn insert(&mut self, point: GridPoint) {
        let (x, y) = self.cell_of(point.position);
        self.cells[y * self.cells_x + x].push(point);
        self.len += 1;
    }

    /// Points strictly closer than `radius` to `position`
    pub fn within(&self, position: Vec2, radius: f32) -> impl Iterator<Item = &GridPoint> + '_ {
        let reach = (radius / self.cell_size).ceil() as usize;
        let (cx, cy) = self.cell_of(position);
        let x_range = cx.saturating_sub(reach)..=(cx + reach).min(self.cells_x - 1);
        let y_range = cy.saturating_sub(reach)..=(cy + reach).min(self.cells_y - 1);
        let radius_sq = radius * radius;

        y_range
            .flat_map(move |y| x_range.clone().map(move |x| y * self.cells_x + x))
            .flat_map(move |index| self.cells[index].iter())
            .filter(move |p| p.position.distance_squared(position) < radius_sq)
    }

    /// True if a point at `position` would be too close to a committed one
    ///
    /// Points of the same pass always conflict. Points of other passes
    /// conflict only when their direction is within the crossing angle,
    /// `|cos| >= crossing_cos`, so perpendicular hatching layers can cross.
    pub fn conflicts(
        &self,
        position: Vec2,
        direction: Vec2,
        pass: u32,
        radius: f32,
        crossing_cos: f32,
    ) -> bool {
        self.within(position, radius)
            .any(|p| p.pass == pass || p.direction.dot(direction).abs() >= crossing_cos)
    }

    pub fn clear(&mut self) {
        self.cells.iter_mut().for_each(Vec::clear);
        self.len = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(x: f32, y: f32, direction: Vec2, pass: u32) -> GridPoint {
        GridPoint {
            position: Vec2::new(x, y),
            direction,
            pass,
        }
    }

    #[test]
    fn test_grid_dimensions() {
        let grid = SpatialGrid::new(1000, 500, 10.0);
        assert_eq!(grid.cells_x(), 101);
        assert_eq!(grid.cells_y(), 51);
        assert!(grid.is_empty());
    }

    #[test]
    fn test_within_crosses_cells() {
        let mut grid = SpatialGrid::new(100, 100, 10.0);
        grid.insert(point(19.0, 19.0, Vec2::X, 0));
        grid.insert(point(35.0, 20.0, Vec2::X, 0));
        assert_eq!(grid.len(), 2);

        // (21, 21) sits in the next cell over
        assert_eq!(grid.within(Vec2::new(21.0, 21.0), 5.0).count(), 1);
        assert_eq!(grid.within(Vec2::new(21.0, 21.0), 15.0).count(), 2);
        // Distance exactly equal to the radius does not count
        assert_eq!(grid.within(Vec2::new(30.0, 20.0), 5.0).count(), 0);
    }

    #[test]
    fn test_conflicts_are_direction_aware() {
        let mut grid = SpatialGrid::new(100, 100, 10.0);
        grid.insert(point(50.0, 50.0, Vec2::X, 0));
        let near = Vec2::new(52.0, 50.0);

        assert!(grid.conflicts(near, Vec2::Y, 0, 5.0, 0.5), "same pass");
        assert!(!grid.conflicts(near, Vec2::Y, 1, 5.0, 0.5), "crossing layer");
        assert!(grid.conflicts(near, Vec2::NEG_X, 1, 5.0, 0.5), "parallel layer");
        assert!(!grid.conflicts(Vec2::new(60.0, 50.0), Vec2::X, 0, 5.0, 0.5));

        grid.clear();
        assert!(!grid.conflicts(near, Vec2::X, 0, 5.0, 0.5));
    }
}
