//! Consistency checks for corner tables.

use crate::corner_table::{CornerTable, next, prev};
use crate::mesh::TriangleMesh;

impl CornerTable {
    /// Check that the table is symmetric and that paired corners face the
    /// same edge of `mesh`
    pub fn validate(&self, mesh: &TriangleMesh) -> Result<(), String> {
        if self.len() != mesh.corner_count() {
            return Err(format!(
                "Table has {} corners, mesh has {}",
                self.len(),
                mesh.corner_count()
            ));
        }

        let far_edge = |corner: usize| {
            let a = mesh.corner_vertex(next(corner));
            let b = mesh.corner_vertex(prev(corner));
            if a < b { (a, b) } else { (b, a) }
        };

        for corner in 0..self.len() {
            let Some(other) = self.opposite(corner) else {
                continue;
            };
            if other == corner {
                return Err(format!("Corner {corner} is its own opposite"));
            }
            if self.opposite(other) != Some(corner) {
                return Err(format!(
                    "Corner {corner} -> {other} is not mirrored (got {:?})",
                    self.opposite(other)
                ));
            }
            if far_edge(corner) != far_edge(other) {
                return Err(format!(
                    "Corners {corner} and {other} face different edges {:?} / {:?}",
                    far_edge(corner),
                    far_edge(other)
                ));
            }
        }
        Ok(())
    }
}
