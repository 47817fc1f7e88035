use crate::entity::{Entity, EntityStore};
use crate::table::EventTable;
use crate::util::unique_in_order;
use crate::value::Cell;

/// Component count given to every freshly registered entity.
pub const DEFAULT_INIT_COMPS: u32 = 1;
/// Combat value per component for freshly registered entities.
pub const DEFAULT_CBT_PER_COMP: f64 = 1.0;

/// Build the initial entity set from the unit reference table. Skipped
/// entirely when the store already holds precomputed entities.
///
/// The table is expected to carry `id`, `name`, `type`, `side` and
/// `commander` columns. For each distinct id (first-appearance order) the
/// first value of each attribute wins; disagreements are logged and
/// otherwise ignored.
pub fn build_entities(store: &mut EntityStore, units: &EventTable) {
    if !store.is_empty() {
        tracing::info!(
            target: "timeline::registry",
            entities = store.len(),
            "precomputed entities supplied, skipping registry construction"
        );
        return;
    }

    let uids = units.distinct_rendered("id");
    tracing::info!(
        target: "timeline::registry",
        count = uids.len(),
        "unique ids found in unit reference table"
    );

    let groups = units.group_index("id");
    for uid in uids {
        let rows = groups.get(&uid).map(Vec::as_slice).unwrap_or(&[]);
        let mut entity = Entity::new(uid.clone());
        entity.name = resolve_attribute(units, rows, "name", &uid);
        entity.unit_type = resolve_attribute(units, rows, "type", &uid);
        entity.affiliation = resolve_attribute(units, rows, "side", &uid);
        entity.commander = resolve_attribute(units, rows, "commander", &uid);
        entity.init_comps = DEFAULT_INIT_COMPS;
        entity.cbt_per_comp = DEFAULT_CBT_PER_COMP;
        tracing::debug!(
            target: "timeline::registry",
            uid = %uid,
            "entity registered from unit reference table"
        );
        store.insert(entity);
    }
}

/// First value of `column` across the entity's rows, with a data-quality
/// warning when the rows disagree.
fn resolve_attribute(units: &EventTable, rows: &[usize], column: &str, uid: &str) -> String {
    let values: Vec<String> = rows
        .iter()
        .filter_map(|row| units.cell(*row, column))
        .map(Cell::render)
        .collect();
    let distinct = unique_in_order(values.clone());
    if distinct.len() > 1 {
        tracing::warn!(
            target: "timeline::registry",
            uid = %uid,
            attribute = column,
            values = ?distinct,
            chosen = %distinct[0],
            "multiple values for entity attribute, first used"
        );
    }
    values.into_iter().next().unwrap_or_default()
}
