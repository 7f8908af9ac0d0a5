//! Static ship configuration: rooms, edges, special rooms, spawn pool.
//!
//! The map is data, not code: a deployment can
//! supply its own tables, and [`ShipConfig::standard`] ships the default
//! 14-room layout.

use std::collections::BTreeMap;

use airlock_types::SabotageKind;
use serde::{Deserialize, Serialize};

/// Declarative description of the ship, loaded from config tables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShipConfig {
    /// All room names. Order defines the dense [`airlock_types::RoomId`] space.
    pub rooms: Vec<String>,
    /// Symmetric walking connections.
    pub walk_edges: Vec<(String, String)>,
    /// Symmetric vent connections (impostor-only traversal).
    pub vent_edges: Vec<(String, String)>,
    /// Room housing the emergency button.
    pub button_room: String,
    /// Room housing the security monitor.
    pub monitor_room: String,
    /// Room a player must stand in to repair each sabotage.
    pub fix_rooms: BTreeMap<SabotageKind, String>,
    /// Spawn pool drawn from at initialization. Repeated names allow
    /// multiple guaranteed spawns in the same room.
    pub spawn_pool: Vec<String>,
}

impl ShipConfig {
    /// The default 14-room layout.
    ///
    /// Walking connections follow the ship corridors; the vent network forms
    /// three clusters (engine triangle, Electrical/Security/Medbay triangle,
    /// Navigation wing) plus the Admin-Cafeteria shortcut.
    pub fn standard() -> Self {
        let owned = |names: &[(&str, &str)]| -> Vec<(String, String)> {
            names
                .iter()
                .map(|(a, b)| ((*a).to_owned(), (*b).to_owned()))
                .collect()
        };

        let rooms = [
            "Cafeteria",
            "Weapons",
            "Navigation",
            "O2",
            "Shields",
            "Communications",
            "Storage",
            "Admin",
            "Electrical",
            "Lower Engine",
            "Security",
            "Reactor",
            "Upper Engine",
            "Medbay",
        ]
        .iter()
        .map(|r| (*r).to_owned())
        .collect();

        let walk_edges = owned(&[
            ("Cafeteria", "Weapons"),
            ("Cafeteria", "Admin"),
            ("Cafeteria", "Upper Engine"),
            ("Cafeteria", "Medbay"),
            ("Weapons", "Navigation"),
            ("Weapons", "O2"),
            ("Navigation", "Shields"),
            ("O2", "Shields"),
            ("O2", "Admin"),
            ("Shields", "Communications"),
            ("Shields", "Storage"),
            ("Communications", "Storage"),
            ("Storage", "Admin"),
            ("Storage", "Electrical"),
            ("Storage", "Lower Engine"),
            ("Admin", "Electrical"),
            ("Electrical", "Lower Engine"),
            ("Lower Engine", "Security"),
            ("Lower Engine", "Reactor"),
            ("Lower Engine", "Upper Engine"),
            ("Security", "Reactor"),
            ("Security", "Upper Engine"),
            ("Reactor", "Upper Engine"),
            ("Upper Engine", "Medbay"),
        ]);

        let vent_edges = owned(&[
            ("Reactor", "Lower Engine"),
            ("Reactor", "Upper Engine"),
            ("Lower Engine", "Upper Engine"),
            ("Electrical", "Security"),
            ("Electrical", "Medbay"),
            ("Security", "Medbay"),
            ("Navigation", "Shields"),
            ("Navigation", "Weapons"),
            ("Admin", "Cafeteria"),
        ]);

        let mut fix_rooms = BTreeMap::new();
        fix_rooms.insert(SabotageKind::Oxygen, String::from("O2"));
        fix_rooms.insert(SabotageKind::Reactor, String::from("Reactor"));
        fix_rooms.insert(SabotageKind::Lights, String::from("Electrical"));
        fix_rooms.insert(SabotageKind::Comms, String::from("Communications"));

        // 2 guaranteed central spawns, the rest scattered so an impostor may
        // find an isolated victim on the first tick.
        let spawn_pool = [
            "Cafeteria",
            "Cafeteria",
            "Admin",
            "Weapons",
            "Medbay",
            "Electrical",
            "Navigation",
            "Reactor",
            "Security",
            "Upper Engine",
            "Shields",
        ]
        .iter()
        .map(|r| (*r).to_owned())
        .collect();

        Self {
            rooms,
            walk_edges,
            vent_edges,
            button_room: String::from("Cafeteria"),
            monitor_room: String::from("Security"),
            fix_rooms,
            spawn_pool,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_config_has_fourteen_rooms() {
        let config = ShipConfig::standard();
        assert_eq!(config.rooms.len(), 14);
    }

    #[test]
    fn every_edge_endpoint_is_a_room() {
        let config = ShipConfig::standard();
        for (a, b) in config.walk_edges.iter().chain(config.vent_edges.iter()) {
            assert!(config.rooms.contains(a), "missing room {a}");
            assert!(config.rooms.contains(b), "missing room {b}");
        }
    }

    #[test]
    fn fix_rooms_cover_all_sabotage_kinds() {
        let config = ShipConfig::standard();
        for kind in SabotageKind::ALL {
            assert!(config.fix_rooms.contains_key(&kind), "missing fix room for {kind}");
        }
    }

    #[test]
    fn config_roundtrips_through_json() {
        let config = ShipConfig::standard();
        let json = serde_json::to_string(&config).ok();
        assert!(json.is_some());
        let back: Option<ShipConfig> =
            json.as_deref().and_then(|j| serde_json::from_str(j).ok());
        assert_eq!(back, Some(config));
    }
}
