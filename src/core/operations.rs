//! Per-insertion outcomes and aggregate statistics.

/// Result of inserting one point into the triangulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertionOutcome {
    /// The point was inserted; its cavity was re-triangulated.
    Inserted {
        /// Triangles whose circum-shape contained the point.
        triangles_removed: usize,
        /// Triangles created to fill the cavity.
        triangles_created: usize,
    },
    /// No circum-shape strictly contains the point, which happens when it
    /// coincides with an already inserted vertex. The point is left out.
    SkippedDuplicate,
}

/// Counters accumulated over one triangulation run.
///
/// # Examples
///
/// ```rust
/// use orthtree_delaunay::core::operations::{InsertionOutcome, InsertionStatistics};
///
/// let mut stats = InsertionStatistics::default();
/// stats.record(InsertionOutcome::Inserted {
///     triangles_removed: 1,
///     triangles_created: 3,
/// });
/// stats.record(InsertionOutcome::SkippedDuplicate);
/// assert_eq!(stats.points_inserted, 1);
/// assert_eq!(stats.points_skipped, 1);
/// assert_eq!(stats.net_triangles(), 2);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InsertionStatistics {
    /// Points inserted into the triangulation.
    pub points_inserted: usize,
    /// Points skipped as duplicates.
    pub points_skipped: usize,
    /// Triangles created, including the scaffold's seed triangles.
    pub triangles_created: usize,
    /// Triangles removed by cavity carving.
    pub triangles_removed: usize,
    /// Largest conflict set met by a single insertion.
    pub max_cavity_size: usize,
}

impl InsertionStatistics {
    /// Adds one insertion outcome.
    pub const fn record(&mut self, outcome: InsertionOutcome) {
        match outcome {
            InsertionOutcome::Inserted {
                triangles_removed,
                triangles_created,
            } => {
                self.points_inserted += 1;
                self.triangles_removed += triangles_removed;
                self.triangles_created += triangles_created;
                if triangles_removed > self.max_cavity_size {
                    self.max_cavity_size = triangles_removed;
                }
            }
            InsertionOutcome::SkippedDuplicate => self.points_skipped += 1,
        }
    }

    /// Triangles alive at the end of the run.
    #[must_use]
    pub const fn net_triangles(&self) -> usize {
        self.triangles_created.saturating_sub(self.triangles_removed)
    }

    /// Returns `true` if any point was skipped.
    #[must_use]
    pub const fn any_skipped(&self) -> bool {
        self.points_skipped > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_statistics_track_largest_cavity() {
        let mut stats = InsertionStatistics::default();
        for removed in [1, 4, 2] {
            stats.record(InsertionOutcome::Inserted {
                triangles_removed: removed,
                triangles_created: removed + 2,
            });
        }
        assert_eq!(stats.max_cavity_size, 4);
        assert_eq!(stats.triangles_removed, 7);
        assert_eq!(stats.triangles_created, 13);
        assert!(!stats.any_skipped());
    }
}
