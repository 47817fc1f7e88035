use crate::entity::{DetailRecord, EntityStore};
use crate::table::EventTable;
use crate::value::Cell;

/// Declarative descriptor driving extraction of one event category from
/// one source table. Category-specific behavior lives entirely in this
/// data; the extraction routine itself is generic.
#[derive(Debug, Clone)]
pub struct EventMap {
    /// Table name, for logging only.
    pub name: &'static str,
    /// Column whose rendered value identifies the owning entity.
    pub mask_column: &'static str,
    /// Ordered (source column, target timeline) pairs.
    pub series: Vec<(&'static str, &'static str)>,
    /// Keys of the encoded detail record, in output order.
    pub detail_keys: Vec<&'static str>,
    /// Source columns supplying the detail values, parallel to
    /// `detail_keys`.
    pub detail_columns: Vec<&'static str>,
    /// Target detail list on the entity.
    pub detail_list: &'static str,
}

/// Run one event map over the final entity set: for every entity, append
/// its slice of each declared timeline plus the row-aligned encoded detail
/// records. Empty slices are logged no-ops.
pub fn apply_event_map(store: &mut EntityStore, table: &EventTable, map: &EventMap) {
    debug_assert_eq!(map.detail_keys.len(), map.detail_columns.len());
    tracing::info!(
        target: "timeline::event_map",
        table = map.name,
        mask = map.mask_column,
        series = ?map.series,
        detail_keys = ?map.detail_keys,
        "loading event data into entities"
    );

    // One grouping pass over the table, then near-constant lookup per
    // entity.
    let groups = table.group_index(map.mask_column);

    for uid in store.uids() {
        let rows = match groups.get(&uid) {
            Some(rows) => rows.as_slice(),
            None => &[],
        };

        for (source, target) in &map.series {
            let values: Vec<Cell> = rows
                .iter()
                .filter_map(|row| table.cell(*row, source))
                .cloned()
                .collect();
            if values.is_empty() {
                tracing::debug!(
                    target: "timeline::event_map",
                    table = map.name,
                    uid = %uid,
                    "no data for {target}"
                );
                continue;
            }
            if let Some(entity) = store.get_mut(&uid) {
                entity.append_series(target, values);
            }
        }

        let records = encode_details(table, rows, &map.detail_keys, &map.detail_columns);
        if records.is_empty() {
            tracing::debug!(
                target: "timeline::event_map",
                table = map.name,
                uid = %uid,
                "no data for {}", map.detail_list
            );
            continue;
        }
        if let Some(entity) = store.get_mut(&uid) {
            entity.append_details(map.detail_list, records);
        }
    }
}

/// Encode one detail record per masked row, keys taken positionally from
/// `keys`. Missing cells render as the absence marker.
fn encode_details(
    table: &EventTable,
    rows: &[usize],
    keys: &[&'static str],
    columns: &[&'static str],
) -> Vec<DetailRecord> {
    rows.iter()
        .map(|row| {
            let mut record = DetailRecord::new();
            for (key, column) in keys.iter().zip(columns) {
                let value = table
                    .cell(*row, column)
                    .map(Cell::render)
                    .unwrap_or_else(|| Cell::Missing.render());
                record.push(*key, value);
            }
            record
        })
        .collect()
}
