use crate::entity::EntityStore;
use crate::table::EventTable;
use crate::util::unique_in_order;

/// Suffix appended to the type tag of an entity identified as a weapon.
pub const WEAPON_TYPE_SUFFIX: &str = "-WPN";

/// Cross-reference kill and fire events against the registry and decide,
/// per weapon identifier, whether to fold the entity into a weapon-tagged
/// unit, remove it, or leave it alone.
///
/// Must run after registry construction and before the event-map pass,
/// since timeline population iterates the final entity set.
pub fn classify_weapons(
    store: &mut EntityStore,
    kills: &EventTable,
    shots: &EventTable,
    shots_available: bool,
    weapons_as_entities: bool,
) {
    tracing::info!(
        target: "timeline::classify",
        weapons_as_entities,
        "identifying weapon entity uids"
    );

    let mut weapon_uids = kills.distinct_rendered("wpn_id");
    if shots_available {
        weapon_uids.extend(shots.distinct_rendered("wpn_id"));
    } else {
        tracing::warn!(
            target: "timeline::classify",
            "weapon fired file not present, identification of weapon entities may not be complete"
        );
    }
    let weapon_uids = unique_in_order(weapon_uids);

    for uid in weapon_uids {
        if !store.contains(&uid) {
            tracing::debug!(
                target: "timeline::classify",
                uid = %uid,
                "uid identified as weapon but has no registry entry"
            );
            continue;
        }
        if weapons_as_entities {
            let entity = store
                .get_mut(&uid)
                .expect("registry membership checked above");
            entity.init_comps = 0;
            entity.cbt_per_comp = 0.0;
            if !entity.unit_type.ends_with(WEAPON_TYPE_SUFFIX) {
                entity.unit_type.push_str(WEAPON_TYPE_SUFFIX);
            }
            tracing::debug!(
                target: "timeline::classify",
                uid = %uid,
                "weapon entity retained with zeroed combat capability"
            );
        } else {
            store.remove(&uid);
            tracing::debug!(
                target: "timeline::classify",
                uid = %uid,
                "weapon entity removed from registry"
            );
        }
    }
}
