//! Core engine for assembling per-entity timelines from combat-simulation
//! event logs.
//!
//! A run loads a set of delimited event files into column-renamed tables,
//! normalises their clock strings against a zero-hour reference, thins the
//! position stream, builds and reclassifies the entity registry, then
//! drives one generic extraction routine over a small set of declarative
//! event maps. The populated [`EntityStore`] satisfies the invariant that
//! every timeline and its paired detail list are index-aligned, and is
//! handed to the caller for export.

pub mod classify;
pub mod config;
pub mod entity;
pub mod event_map;
pub mod processor;
pub mod registry;
pub mod table;
pub mod thin;
pub mod timeval;
pub mod util;
pub mod value;

pub use classify::{classify_weapons, WEAPON_TYPE_SUFFIX};
pub use config::{load_batch_config, parse_config_bool, ConfigError, RunConfig};
pub use entity::{DetailRecord, Entity, EntityStore, FinaliseError};
pub use event_map::{apply_event_map, EventMap};
pub use processor::{process_run, report_line, RunOutcome, NO_SECONDARY_ENTITY};
pub use registry::build_entities;
pub use table::{EventTable, TableError, TableSpec};
pub use thin::{thin_locations, ThinningOptions};
pub use timeval::{clock_offset, truncate_subseconds, TimeParseError, TimeUnit};
pub use value::Cell;
