use indexmap::IndexMap;

use crate::dao::models::PlayerRow;

/// Rows received since the last display frame, latest version per row id.
#[derive(Debug, Default)]
pub struct FrameCoalescer {
    rows: IndexMap<i64, PlayerRow>,
}

impl FrameCoalescer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep `row`, replacing an earlier version of the same id.
    ///
    /// Returns `true` when this is the first row of the frame.
    pub fn push(&mut self, row: PlayerRow) -> bool {
        let first = self.rows.is_empty();
        self.rows.insert(row.id, row);
        first
    }

    /// Keep a snapshot `row` unless a live change for the same id is already
    /// buffered, since the snapshot may have been fetched before that change.
    ///
    /// Returns `true` when this is the first row of the frame.
    pub fn push_snapshot(&mut self, row: PlayerRow) -> bool {
        if self.rows.contains_key(&row.id) {
            return false;
        }
        self.push(row)
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Take the rows of this frame in first-arrival order.
    pub fn drain(&mut self) -> Vec<PlayerRow> {
        self.rows.drain(..).map(|(_, row)| row).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(id: i64, life_points: i64) -> PlayerRow {
        PlayerRow {
            life_points: Some(life_points),
            ..PlayerRow::new(id)
        }
    }

    #[test]
    fn keeps_latest_row_per_id() {
        let mut coalescer = FrameCoalescer::new();
        assert!(coalescer.push(row(1, 8000)));
        assert!(!coalescer.push(row(2, 8000)));
        assert!(!coalescer.push(row(1, 7000)));
        assert!(!coalescer.push(row(1, 6500)));

        let rows = coalescer.drain();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].id, 1);
        assert_eq!(rows[0].life_points, Some(6500));
        assert!(coalescer.is_empty());
    }

    #[test]
    fn snapshot_never_replaces_a_buffered_change() {
        let mut coalescer = FrameCoalescer::new();
        assert!(coalescer.push(row(1, 6000)));
        assert!(!coalescer.push_snapshot(row(1, 8000)));
        assert!(!coalescer.push_snapshot(row(2, 7000)));

        let rows = coalescer.drain();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].life_points, Some(6000));
        assert_eq!(rows[1].life_points, Some(7000));
    }

    #[test]
    fn change_replaces_a_buffered_snapshot() {
        let mut coalescer = FrameCoalescer::new();
        assert!(coalescer.push_snapshot(row(1, 8000)));
        coalescer.push(row(1, 6000));
        assert_eq!(coalescer.drain()[0].life_points, Some(6000));
    }
}
