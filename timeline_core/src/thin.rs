use std::collections::HashSet;

use crate::table::{EventTable, TIME_COLUMN};
use crate::value::{Cell, CellKey};

/// Configuration for the optional position-stream reduction passes.
/// Same-instant dedup is not represented here because it always runs.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThinningOptions {
    pub ignore_same_location_updates: bool,
    /// Minimum seconds between surviving updates per entity; 0 disables.
    pub min_update_interval: u32,
}

/// Apply the three reduction passes to the position table, in their fixed
/// order, then fill the damage-state detail columns.
pub fn thin_locations(table: &mut EventTable, options: &ThinningOptions) {
    let before = table.len();
    dedup_same_instant(table);
    if options.ignore_same_location_updates {
        dedup_same_location(table);
    }
    if options.min_update_interval > 0 {
        thin_min_interval(table, options.min_update_interval);
    }
    tracing::info!(
        target: "timeline::thin",
        rows_before = before,
        rows_after = table.len(),
        same_location = options.ignore_same_location_updates,
        min_interval = options.min_update_interval,
        "location updates thinned"
    );
    fill_damage_state(table);
}

/// Keep only the first row per (entity, normalized time). Removes the
/// duplicates created when sub-second clock values truncate to the same
/// whole second.
pub fn dedup_same_instant(table: &mut EventTable) {
    retain_first_by(table, &["id", TIME_COLUMN]);
}

/// Keep only the first row per (entity, x, y).
pub fn dedup_same_location(table: &mut EventTable) {
    retain_first_by(table, &["id", "x", "y"]);
}

/// Keep only the first row per (entity, time bucket), where the bucket is
/// the row time rounded to the nearest multiple of `interval`.
pub fn thin_min_interval(table: &mut EventTable, interval: u32) {
    let interval = f64::from(interval);
    let mut seen: HashSet<(String, u64)> = HashSet::new();
    let mut keep = Vec::with_capacity(table.len());
    for row in 0..table.len() {
        let id = table
            .cell(row, "id")
            .map(Cell::render)
            .unwrap_or_default();
        let time = table
            .cell(row, TIME_COLUMN)
            .and_then(Cell::as_num)
            .unwrap_or(0.0);
        let bucket = (time / interval).round() * interval;
        keep.push(seen.insert((id, bucket.to_bits())));
    }
    table.retain_rows(&keep);
}

/// Fill missing fire/flood cells with the explicit absence marker so every
/// row carries a determinate value for detail encoding.
pub fn fill_damage_state(table: &mut EventTable) {
    for column in ["fire_detail", "flood_detail"] {
        fill_missing(table, column);
    }
}

fn fill_missing(table: &mut EventTable, column: &str) {
    if table.col_index(column).is_none() {
        return;
    }
    for row in 0..table.len() {
        let missing = table
            .cell(row, column)
            .map(Cell::is_missing)
            .unwrap_or(false);
        if missing {
            table.set_cell(
                row,
                column,
                Cell::Text(crate::value::ABSENT_MARKER.to_string()),
            );
        }
    }
}

fn retain_first_by(table: &mut EventTable, columns: &[&str]) {
    let mut seen: HashSet<Vec<CellKey>> = HashSet::new();
    let mut keep = Vec::with_capacity(table.len());
    for row in 0..table.len() {
        let key: Vec<CellKey> = columns
            .iter()
            .map(|col| {
                table
                    .cell(row, col)
                    .map(Cell::key)
                    .unwrap_or(CellKey::Missing)
            })
            .collect();
        keep.push(seen.insert(key));
    }
    table.retain_rows(&keep);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::EventTable;

    fn move_table(rows: &[(&str, f64, f64, f64)]) -> EventTable {
        let mut table = EventTable::empty("move_table", &["id", "x", "y", TIME_COLUMN]);
        for (id, x, y, time) in rows {
            table.push_row(vec![
                Cell::Text(id.to_string()),
                Cell::Num(*x),
                Cell::Num(*y),
                Cell::Num(*time),
            ]);
        }
        table
    }

    #[test]
    fn same_instant_keeps_first_in_original_order() {
        let mut table = move_table(&[
            ("U1", 1.0, 1.0, 0.0),
            ("U1", 2.0, 2.0, 0.0),
            ("U1", 3.0, 3.0, 1.0),
            ("U2", 4.0, 4.0, 0.0),
        ]);
        dedup_same_instant(&mut table);
        assert_eq!(table.len(), 3);
        // The first (U1, 0.0) row survives.
        assert_eq!(table.cell(0, "x"), Some(&Cell::Num(1.0)));
    }

    #[test]
    fn same_instant_dedup_is_idempotent() {
        let mut table = move_table(&[
            ("U1", 1.0, 1.0, 0.0),
            ("U1", 2.0, 2.0, 0.0),
            ("U1", 3.0, 3.0, 1.0),
        ]);
        dedup_same_instant(&mut table);
        let after_first = table.len();
        dedup_same_instant(&mut table);
        assert_eq!(table.len(), after_first);
    }

    #[test]
    fn same_location_dedup_is_per_entity() {
        let mut table = move_table(&[
            ("U1", 1.0, 1.0, 0.0),
            ("U1", 1.0, 1.0, 5.0),
            ("U2", 1.0, 1.0, 0.0),
        ]);
        dedup_same_location(&mut table);
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn min_interval_buckets_are_spaced() {
        let mut table = move_table(&[
            ("U1", 1.0, 1.0, 0.0),
            ("U1", 2.0, 2.0, 4.0),
            ("U1", 3.0, 3.0, 11.0),
            ("U1", 4.0, 4.0, 19.0),
        ]);
        thin_min_interval(&mut table, 10);
        // Buckets: 0, 0, 10, 20 -> rows 0, 2, 3 survive.
        assert_eq!(table.len(), 3);
        assert_eq!(table.cell(1, TIME_COLUMN), Some(&Cell::Num(11.0)));
    }

    #[test]
    fn fill_damage_state_replaces_missing_only() {
        let mut table = EventTable::empty("move_table", &["id", "fire_detail", "flood_detail"]);
        table.push_row(vec![
            Cell::Text("U1".to_string()),
            Cell::Missing,
            Cell::Text("1".to_string()),
        ]);
        fill_damage_state(&mut table);
        assert_eq!(
            table.cell(0, "fire_detail"),
            Some(&Cell::Text("None".to_string()))
        );
        assert_eq!(
            table.cell(0, "flood_detail"),
            Some(&Cell::Text("1".to_string()))
        );
    }
}
