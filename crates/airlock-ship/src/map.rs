//! The ship graph: rooms as nodes, walk and vent edges, spatial queries.
//!
//! Two symmetric graphs share one node set: `walk` edges carry normal
//! movement, `vent` edges carry impostor-only teleports. The map is immutable
//! after construction; per-tick room occupancy lives in the separate
//! [`Occupancy`] index, which the engine rebuilds at the snapshot stage.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use airlock_types::{AdjacencyLine, MapBrief, PlayerId, RoomId, SabotageKind};
use tracing::debug;

use crate::config::ShipConfig;
use crate::error::ShipError;

/// The immutable ship graph.
#[derive(Debug, Clone)]
pub struct ShipMap {
    /// Room names indexed by `RoomId`.
    names: Vec<String>,
    /// Reverse lookup from name to id.
    index: BTreeMap<String, RoomId>,
    /// Walking adjacency.
    walk: BTreeMap<RoomId, BTreeSet<RoomId>>,
    /// Vent adjacency.
    vent: BTreeMap<RoomId, BTreeSet<RoomId>>,
    /// Room with the emergency button.
    button_room: RoomId,
    /// Room with the security monitor.
    monitor_room: RoomId,
    /// Fix room per sabotage kind.
    fix_rooms: BTreeMap<SabotageKind, RoomId>,
    /// Spawn pool resolved to room ids (may repeat).
    spawn_pool: Vec<RoomId>,
}

impl ShipMap {
    /// Build a ship map from declarative config tables.
    ///
    /// # Errors
    ///
    /// Returns [`ShipError::DuplicateRoom`] for repeated room names and
    /// [`ShipError::UnknownRoom`] for edges or special rooms referencing a
    /// name not in the room list.
    pub fn from_config(config: &ShipConfig) -> Result<Self, ShipError> {
        let mut names = Vec::with_capacity(config.rooms.len());
        let mut index = BTreeMap::new();
        for name in &config.rooms {
            let id = RoomId(u16::try_from(names.len()).unwrap_or(u16::MAX));
            if index.insert(name.clone(), id).is_some() {
                return Err(ShipError::DuplicateRoom(name.clone()));
            }
            names.push(name.clone());
        }

        let resolve = |name: &str| -> Result<RoomId, ShipError> {
            index
                .get(name)
                .copied()
                .ok_or_else(|| ShipError::UnknownRoom(name.to_owned()))
        };

        let mut walk: BTreeMap<RoomId, BTreeSet<RoomId>> = BTreeMap::new();
        let mut vent: BTreeMap<RoomId, BTreeSet<RoomId>> = BTreeMap::new();
        for id in index.values() {
            walk.entry(*id).or_default();
            vent.entry(*id).or_default();
        }
        for (a, b) in &config.walk_edges {
            let (a, b) = (resolve(a)?, resolve(b)?);
            walk.entry(a).or_default().insert(b);
            walk.entry(b).or_default().insert(a);
        }
        for (a, b) in &config.vent_edges {
            let (a, b) = (resolve(a)?, resolve(b)?);
            vent.entry(a).or_default().insert(b);
            vent.entry(b).or_default().insert(a);
        }

        let button_room = resolve(&config.button_room)?;
        let monitor_room = resolve(&config.monitor_room)?;

        let mut fix_rooms = BTreeMap::new();
        for (kind, room) in &config.fix_rooms {
            fix_rooms.insert(*kind, resolve(room)?);
        }

        let mut spawn_pool = Vec::with_capacity(config.spawn_pool.len());
        for room in &config.spawn_pool {
            spawn_pool.push(resolve(room)?);
        }

        debug!(
            rooms = names.len(),
            walk_edges = config.walk_edges.len(),
            vent_edges = config.vent_edges.len(),
            "ship map built"
        );
        Ok(Self {
            names,
            index,
            walk,
            vent,
            button_room,
            monitor_room,
            fix_rooms,
            spawn_pool,
        })
    }

    /// Build the default 14-room ship.
    pub fn standard() -> Result<Self, ShipError> {
        Self::from_config(&ShipConfig::standard())
    }

    /// Number of rooms.
    pub const fn room_count(&self) -> usize {
        self.names.len()
    }

    /// All room ids in index order.
    pub fn room_ids(&self) -> impl Iterator<Item = RoomId> + '_ {
        (0..self.names.len()).map(|i| RoomId(u16::try_from(i).unwrap_or(u16::MAX)))
    }

    /// Resolve a room name to its id.
    pub fn room_id(&self, name: &str) -> Option<RoomId> {
        self.index.get(name).copied()
    }

    /// Resolve a room id to its name. Unknown ids render as `"?"`.
    pub fn room_name(&self, id: RoomId) -> &str {
        self.names
            .get(usize::from(id.into_inner()))
            .map_or("?", String::as_str)
    }

    /// Rooms reachable by walking from `room`.
    pub fn walk_neighbors(&self, room: RoomId) -> BTreeSet<RoomId> {
        self.walk.get(&room).cloned().unwrap_or_default()
    }

    /// Rooms reachable by venting from `room`.
    pub fn vent_neighbors(&self, room: RoomId) -> BTreeSet<RoomId> {
        self.vent.get(&room).cloned().unwrap_or_default()
    }

    /// Whether two rooms share a walking edge.
    pub fn is_walk_adjacent(&self, a: RoomId, b: RoomId) -> bool {
        self.walk.get(&a).is_some_and(|set| set.contains(&b))
    }

    /// Whether two rooms share a vent edge.
    pub fn is_vent_adjacent(&self, a: RoomId, b: RoomId) -> bool {
        self.vent.get(&a).is_some_and(|set| set.contains(&b))
    }

    /// The emergency-button room.
    pub const fn button_room(&self) -> RoomId {
        self.button_room
    }

    /// The security-monitor room.
    pub const fn monitor_room(&self) -> RoomId {
        self.monitor_room
    }

    /// Fix room for a sabotage kind.
    ///
    /// # Errors
    ///
    /// Returns [`ShipError::MissingFixRoom`] if the config omitted the kind.
    pub fn fix_room(&self, kind: SabotageKind) -> Result<RoomId, ShipError> {
        self.fix_rooms
            .get(&kind)
            .copied()
            .ok_or(ShipError::MissingFixRoom(kind))
    }

    /// The configured spawn pool (room ids, may repeat).
    pub fn spawn_pool(&self) -> &[RoomId] {
        &self.spawn_pool
    }

    /// Render the walk/vent adjacency as prompt-facing lines.
    pub fn brief(&self) -> MapBrief {
        let render = |graph: &BTreeMap<RoomId, BTreeSet<RoomId>>| -> Vec<AdjacencyLine> {
            graph
                .iter()
                .filter(|(_, neighbors)| !neighbors.is_empty())
                .map(|(room, neighbors)| AdjacencyLine {
                    room: self.room_name(*room).to_owned(),
                    connects: neighbors.iter().map(|n| self.room_name(*n).to_owned()).collect(),
                })
                .collect()
        };
        MapBrief {
            walk: render(&self.walk),
            vent: render(&self.vent),
        }
    }
}

/// All-pairs walking distances, precomputed once at startup.
///
/// The map is static and small, so a BFS per source room is cheap and the
/// crisis dispatcher can do O(1) distance lookups every tick.
#[derive(Debug, Clone)]
pub struct DistanceTable {
    /// `dist[from][to]`, `None` when unreachable.
    dist: BTreeMap<RoomId, BTreeMap<RoomId, u32>>,
}

impl DistanceTable {
    /// Run BFS from every room over the walk graph.
    pub fn compute(map: &ShipMap) -> Self {
        let mut dist = BTreeMap::new();
        for source in map.room_ids() {
            dist.insert(source, bfs_distances(map, source));
        }
        Self { dist }
    }

    /// Walking distance in rooms, or `None` if unreachable.
    pub fn distance(&self, from: RoomId, to: RoomId) -> Option<u32> {
        self.dist.get(&from).and_then(|row| row.get(&to)).copied()
    }
}

/// Single-source BFS over walk edges.
fn bfs_distances(map: &ShipMap, source: RoomId) -> BTreeMap<RoomId, u32> {
    let mut distances = BTreeMap::new();
    let mut queue = VecDeque::new();
    distances.insert(source, 0_u32);
    queue.push_back(source);
    while let Some(room) = queue.pop_front() {
        let here = distances.get(&room).copied().unwrap_or(0);
        for next in map.walk_neighbors(room) {
            if !distances.contains_key(&next) {
                distances.insert(next, here.saturating_add(1));
                queue.push_back(next);
            }
        }
    }
    distances
}

/// Shortest walking path between two rooms, endpoints inclusive.
///
/// Returns an empty vector when no path exists. Used for the per-task "Path:"
/// hints in prompts.
pub fn shortest_path(map: &ShipMap, from: RoomId, to: RoomId) -> Vec<RoomId> {
    if from == to {
        return vec![from];
    }
    let mut parent: BTreeMap<RoomId, RoomId> = BTreeMap::new();
    let mut queue = VecDeque::new();
    parent.insert(from, from);
    queue.push_back(from);
    while let Some(room) = queue.pop_front() {
        if room == to {
            break;
        }
        for next in map.walk_neighbors(room) {
            if !parent.contains_key(&next) {
                parent.insert(next, room);
                queue.push_back(next);
            }
        }
    }
    if !parent.contains_key(&to) {
        return Vec::new();
    }
    let mut path = vec![to];
    let mut cursor = to;
    while cursor != from {
        let Some(&prev) = parent.get(&cursor) else {
            return Vec::new();
        };
        path.push(prev);
        cursor = prev;
    }
    path.reverse();
    path
}

/// Per-tick room occupancy index, rebuilt by the engine at the snapshot
/// stage so observations see the post-movement world.
#[derive(Debug, Clone, Default)]
pub struct Occupancy {
    /// Players per room.
    by_room: BTreeMap<RoomId, Vec<PlayerId>>,
}

impl Occupancy {
    /// Rebuild the index from `(player, room)` pairs.
    pub fn rebuild(positions: impl Iterator<Item = (PlayerId, RoomId)>) -> Self {
        let mut by_room: BTreeMap<RoomId, Vec<PlayerId>> = BTreeMap::new();
        for (player, room) in positions {
            by_room.entry(room).or_default().push(player);
        }
        Self { by_room }
    }

    /// Players currently in a room.
    pub fn players_in(&self, room: RoomId) -> &[PlayerId] {
        self.by_room.get(&room).map_or(&[], Vec::as_slice)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn standard_map() -> ShipMap {
        ShipMap::standard().unwrap()
    }

    #[test]
    fn room_lookup_roundtrip() {
        let map = standard_map();
        let id = map.room_id("Electrical").unwrap();
        assert_eq!(map.room_name(id), "Electrical");
    }

    #[test]
    fn walk_edges_are_symmetric() {
        let map = standard_map();
        for room in map.room_ids() {
            for neighbor in map.walk_neighbors(room) {
                assert!(
                    map.is_walk_adjacent(neighbor, room),
                    "walk edge {room}->{neighbor} not symmetric"
                );
            }
        }
    }

    #[test]
    fn vent_edges_are_symmetric() {
        let map = standard_map();
        for room in map.room_ids() {
            for neighbor in map.vent_neighbors(room) {
                assert!(map.is_vent_adjacent(neighbor, room));
            }
        }
    }

    #[test]
    fn cafeteria_walk_neighbors() {
        let map = standard_map();
        let cafeteria = map.room_id("Cafeteria").unwrap();
        let names: Vec<String> = map
            .walk_neighbors(cafeteria)
            .into_iter()
            .map(|id| map.room_name(id).to_owned())
            .collect();
        assert_eq!(names.len(), 4);
        assert!(names.iter().any(|n| n == "Admin"));
        assert!(names.iter().any(|n| n == "Medbay"));
    }

    #[test]
    fn vents_do_not_leak_into_walk_graph() {
        let map = standard_map();
        let electrical = map.room_id("Electrical").unwrap();
        let medbay = map.room_id("Medbay").unwrap();
        assert!(map.is_vent_adjacent(electrical, medbay));
        assert!(!map.is_walk_adjacent(electrical, medbay));
    }

    #[test]
    fn distance_table_matches_known_distances() {
        let map = standard_map();
        let table = DistanceTable::compute(&map);
        let cafeteria = map.room_id("Cafeteria").unwrap();
        let admin = map.room_id("Admin").unwrap();
        let electrical = map.room_id("Electrical").unwrap();
        assert_eq!(table.distance(cafeteria, cafeteria), Some(0));
        assert_eq!(table.distance(cafeteria, admin), Some(1));
        assert_eq!(table.distance(cafeteria, electrical), Some(2));
    }

    #[test]
    fn shortest_path_endpoints_inclusive() {
        let map = standard_map();
        let cafeteria = map.room_id("Cafeteria").unwrap();
        let electrical = map.room_id("Electrical").unwrap();
        let path = shortest_path(&map, cafeteria, electrical);
        assert_eq!(path.first(), Some(&cafeteria));
        assert_eq!(path.last(), Some(&electrical));
        assert_eq!(path.len(), 3);
        // Every hop must be a real walking edge.
        for pair in path.windows(2) {
            if let [a, b] = pair {
                assert!(map.is_walk_adjacent(*a, *b));
            }
        }
    }

    #[test]
    fn shortest_path_same_room() {
        let map = standard_map();
        let cafeteria = map.room_id("Cafeteria").unwrap();
        assert_eq!(shortest_path(&map, cafeteria, cafeteria), vec![cafeteria]);
    }

    #[test]
    fn occupancy_groups_players() {
        let map = standard_map();
        let cafeteria = map.room_id("Cafeteria").unwrap();
        let admin = map.room_id("Admin").unwrap();
        let occupancy = Occupancy::rebuild(
            [
                (PlayerId(0), cafeteria),
                (PlayerId(1), admin),
                (PlayerId(2), cafeteria),
            ]
            .into_iter(),
        );
        assert_eq!(occupancy.players_in(cafeteria), &[PlayerId(0), PlayerId(2)]);
        assert_eq!(occupancy.players_in(admin), &[PlayerId(1)]);
        let shields = map.room_id("Shields").unwrap();
        assert!(occupancy.players_in(shields).is_empty());
    }

    #[test]
    fn brief_contains_every_connected_room() {
        let map = standard_map();
        let brief = map.brief();
        assert_eq!(brief.walk.len(), 14);
        // Only vented rooms appear in the vent brief.
        assert!(brief.vent.iter().any(|line| line.room == "Reactor"));
        assert!(!brief.vent.iter().any(|line| line.room == "Storage"));
    }

    #[test]
    fn duplicate_room_rejected() {
        let mut config = ShipConfig::standard();
        config.rooms.push(String::from("Cafeteria"));
        assert!(matches!(
            ShipMap::from_config(&config),
            Err(ShipError::DuplicateRoom(_))
        ));
    }

    #[test]
    fn unknown_edge_endpoint_rejected() {
        let mut config = ShipConfig::standard();
        config.walk_edges.push((String::from("Cafeteria"), String::from("Bridge")));
        assert!(matches!(
            ShipMap::from_config(&config),
            Err(ShipError::UnknownRoom(_))
        ));
    }
}
