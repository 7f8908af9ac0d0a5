//! The mutable simulation state threaded through the tick cycle.

use std::collections::BTreeMap;

use airlock_agents::{LegalityCtx, Player};
use airlock_ship::{DistanceTable, Occupancy, ShipMap};
use airlock_types::{
    DeadBody, GameConfig, Phase, PlayerId, Role, SabotageKind, VoteChoice, Winner,
};

/// All mutable game state plus the immutable map and configuration.
///
/// The controller owns exactly one of these; every resolution stage mutates
/// it serially on the main task. Observations are routed into the players'
/// memory only through the router module.
#[derive(Debug)]
pub struct GameState {
    /// Game configuration.
    pub config: GameConfig,
    /// The immutable ship graph.
    pub map: ShipMap,
    /// Precomputed all-pairs walking distances.
    pub distances: DistanceTable,
    /// Post-movement room occupancy (rebuilt at the snapshot stage).
    pub occupancy: Occupancy,
    /// All players.
    pub players: BTreeMap<PlayerId, Player>,
    /// Fixed decision order (roster order).
    pub turn_order: Vec<PlayerId>,
    /// Current tick.
    pub timestep: u64,
    /// Current phase.
    pub phase: Phase,
    /// Discussion rounds left in the active meeting.
    pub discussion_rounds_left: u32,
    /// Ballots cast this voting sub-phase, by voter.
    pub vote_choices: BTreeMap<PlayerId, VoteChoice>,
    /// Bodies on the floor.
    pub dead_bodies: Vec<DeadBody>,
    /// Active sabotages with remaining ticks.
    pub active_sabotages: BTreeMap<SabotageKind, u32>,
    /// Remaining sabotage cooldown.
    pub sabotage_cooldown: u32,
    /// Emergency buttons spent.
    pub button_uses: u32,
    /// Who triggered the active meeting.
    pub meeting_caller: Option<PlayerId>,
    /// Last rendered action per player, for the security monitor.
    pub camera_record: BTreeMap<PlayerId, String>,
    /// Terminal outcome, once decided.
    pub winner: Option<Winner>,
}

impl GameState {
    /// Number of living players of a role.
    pub fn living_count(&self, role: Role) -> u32 {
        let count = self
            .players
            .values()
            .filter(|p| p.alive && p.role == role)
            .count();
        u32::try_from(count).unwrap_or(u32::MAX)
    }

    /// Ids of living players in turn order.
    pub fn living_players(&self) -> Vec<PlayerId> {
        self.turn_order
            .iter()
            .copied()
            .filter(|id| self.players.get(id).is_some_and(|p| p.alive))
            .collect()
    }

    /// Crew task progress as `(completed, total)` over crewmate-assigned
    /// tasks. Ghost crewmates keep counting: their task work still feeds the
    /// bar. Impostor fake tasks never count.
    pub fn task_progress(&self) -> (usize, usize) {
        let mut completed = 0_usize;
        let mut total = 0_usize;
        for player in self.players.values() {
            if player.role != Role::Crewmate {
                continue;
            }
            for task in &player.tasks {
                total = total.saturating_add(1);
                if task.is_complete() {
                    completed = completed.saturating_add(1);
                }
            }
        }
        (completed, total)
    }

    /// Task-bar percentage, 0-100.
    pub fn task_bar_pct(&self) -> u8 {
        let (completed, total) = self.task_progress();
        if total == 0 {
            return 0;
        }
        let pct = completed.saturating_mul(100).checked_div(total).unwrap_or(0);
        u8::try_from(pct).unwrap_or(100)
    }

    /// Whether every crewmate task is finished.
    pub fn all_tasks_complete(&self) -> bool {
        let (completed, total) = self.task_progress();
        total > 0 && completed == total
    }

    /// Rebuild the occupancy index from current player positions.
    ///
    /// All players are indexed (ghosts included); readers filter on
    /// aliveness where line of sight matters.
    pub fn rebuild_occupancy(&mut self) {
        self.occupancy = Occupancy::rebuild(self.players.values().map(|p| (p.id, p.room)));
    }

    /// Living players co-located with `room`, excluding `except`.
    pub fn living_in_room(&self, room: airlock_types::RoomId, except: Option<PlayerId>) -> Vec<PlayerId> {
        self.occupancy
            .players_in(room)
            .iter()
            .copied()
            .filter(|id| Some(*id) != except)
            .filter(|id| self.players.get(id).is_some_and(|p| p.alive))
            .collect()
    }

    /// Whether an unreported body lies in `room`.
    pub fn unreported_body_in(&self, room: airlock_types::RoomId) -> bool {
        self.dead_bodies
            .iter()
            .any(|b| b.room == room && !b.reported)
    }

    /// The active critical sabotage, if any.
    pub fn critical_sabotage(&self) -> Option<SabotageKind> {
        [SabotageKind::Oxygen, SabotageKind::Reactor]
            .into_iter()
            .find(|kind| self.active_sabotages.contains_key(kind))
    }

    /// Borrow a legality context over the current state.
    pub fn legality_ctx(&self, voting: bool) -> LegalityCtx<'_> {
        LegalityCtx {
            phase: self.phase,
            voting,
            map: &self.map,
            occupancy: &self.occupancy,
            roster: &self.players,
            bodies: &self.dead_bodies,
            active_sabotages: &self.active_sabotages,
            sabotage_cooldown: self.sabotage_cooldown,
            button_uses: self.button_uses,
            config: &self.config,
        }
    }

    /// Evaluate the end conditions, in precedence order.
    ///
    /// 1. Impostors at parity or better -- impostor win
    /// 2. No impostors left -- crewmate win
    /// 3. Task bar full -- crewmate win
    /// 4. Tick limit reached -- impostor win
    pub fn check_game_over(&self) -> Option<Winner> {
        let impostors = self.living_count(Role::Impostor);
        let crewmates = self.living_count(Role::Crewmate);
        if impostors >= crewmates && impostors > 0 {
            return Some(Winner::ImpostorParity);
        }
        if impostors == 0 {
            return Some(Winner::CrewmateVote);
        }
        if self.all_tasks_complete() {
            return Some(Winner::CrewmateTasks);
        }
        if self.timestep >= self.config.max_timesteps {
            return Some(Winner::ImpostorTimeout);
        }
        None
    }
}
