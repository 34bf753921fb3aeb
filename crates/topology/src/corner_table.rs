//! Corner table: for each triangle corner, the corner facing it across
//! the edge it does not touch.

use std::collections::HashMap;

/// Next corner in the same triangle
#[inline]
pub fn next(corner: usize) -> usize {
    3 * (corner / 3) + (corner + 1) % 3
}

/// Previous corner in the same triangle
#[inline]
pub fn prev(corner: usize) -> usize {
    3 * (corner / 3) + (corner + 2) % 3
}

/// Triangle that owns a corner
#[inline]
pub fn triangle_of(corner: usize) -> usize {
    corner / 3
}

/// State of an edge while pairing corners
#[derive(Clone, Copy)]
enum EdgeSlot {
    Open(usize),
    Paired,
}

/// Opposite-corner lookup built once per index buffer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CornerTable {
    opposite: Vec<Option<u32>>,
    /// Corners left unpaired because their edge already had two corners
    non_manifold: usize,
}

impl CornerTable {
    /// Pair corners whose far edges have the same unordered vertex pair
    ///
    /// Edges shared by more than two corners keep the first pairing found;
    /// the remaining corners stay unmatched and are counted.
    pub fn build(indices: &[u32]) -> Self {
        let corner_count = indices.len() - indices.len() % 3;
        let mut opposite = vec![None; corner_count];
        let mut edges: HashMap<(u32, u32), EdgeSlot> = HashMap::with_capacity(corner_count);
        let mut non_manifold = 0usize;

        for corner in 0..corner_count {
            let a = indices[next(corner)];
            let b = indices[prev(corner)];
            let key = if a < b { (a, b) } else { (b, a) };

            match edges.get(&key).copied() {
                None => {
                    edges.insert(key, EdgeSlot::Open(corner));
                }
                Some(EdgeSlot::Open(other)) => {
                    opposite[corner] = Some(other as u32);
                    opposite[other] = Some(corner as u32);
                    edges.insert(key, EdgeSlot::Paired);
                }
                Some(EdgeSlot::Paired) => {
                    non_manifold += 1;
                }
            }
        }

        if non_manifold > 0 {
            tracing::warn!(
                "CornerTable::build: {} corners left unmatched on non-manifold edges",
                non_manifold
            );
        }

        let table = Self {
            opposite,
            non_manifold,
        };
        tracing::debug!(
            "CornerTable::build: {} corners, {} on boundary edges",
            corner_count,
            table.boundary_count()
        );
        table
    }

    /// Corner across the far edge of `corner`, or `None` on a boundary
    #[inline]
    pub fn opposite(&self, corner: usize) -> Option<usize> {
        self.opposite.get(corner).copied().flatten().map(|c| c as usize)
    }

    #[inline]
    pub fn is_boundary(&self, corner: usize) -> bool {
        self.opposite(corner).is_none()
    }

    pub fn len(&self) -> usize {
        self.opposite.len()
    }

    pub fn is_empty(&self) -> bool {
        self.opposite.is_empty()
    }

    /// Corners without an opposite, non-manifold leftovers included
    pub fn boundary_count(&self) -> usize {
        self.opposite.iter().filter(|o| o.is_none()).count()
    }

    /// Corners dropped from pairing on edges with more than two corners
    pub fn non_manifold_count(&self) -> usize {
        self.non_manifold
    }

    pub fn as_slice(&self) -> &[Option<u32>] {
        &self.opposite
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_next_prev_stay_in_triangle() {
        assert_eq!(next(0), 1);
        assert_eq!(next(2), 0);
        assert_eq!(prev(0), 2);
        assert_eq!(next(5), 3);
        assert_eq!(prev(4), 3);
        for c in 0..9 {
            assert_eq!(triangle_of(next(c)), triangle_of(c));
            assert_eq!(next(prev(c)), c);
        }
    }

    #[test]
    fn test_two_triangles_share_one_edge() {
        // Corner 0 (vertex 0) faces edge 1-2, corner 5 (vertex 3) faces 2-1
        let table = CornerTable::build(&[0, 1, 2, 2, 1, 3]);

        assert_eq!(table.len(), 6);
        assert_eq!(table.opposite(0), Some(5));
        assert_eq!(table.opposite(5), Some(0));
        for c in [1, 2, 3, 4] {
            assert!(table.is_boundary(c), "corner {c} should be on the boundary");
        }
        assert_eq!(table.boundary_count(), 4);
        assert_eq!(table.non_manifold_count(), 0);
    }

    #[test]
    fn test_non_manifold_edge_keeps_first_pair() {
        // Three triangles hinge on edge 0-1
        let table = CornerTable::build(&[0, 1, 2, 1, 0, 3, 0, 1, 4]);

        assert_eq!(table.opposite(2), Some(5));
        assert_eq!(table.opposite(5), Some(2));
        assert!(table.is_boundary(8), "third corner on the edge stays unmatched");
        assert_eq!(table.non_manifold_count(), 1);
    }

    #[test]
    fn test_out_of_range_corner_is_boundary() {
        let table = CornerTable::build(&[0, 1, 2]);
        assert_eq!(table.opposite(99), None);
    }
}
