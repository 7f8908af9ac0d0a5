//! `can_execute` predicates: the concrete legal actions for one player.

use std::collections::BTreeMap;

use airlock_types::{
    Action, ActionKind, DeadBody, GameConfig, Phase, PlayerId, Role, SabotageKind, VoteChoice,
};
use airlock_ship::{Occupancy, ShipMap};
use tracing::debug;

use crate::memory::commitment_lock_threshold;
use crate::player::Player;

/// Read-only world view the legality predicates run against.
pub struct LegalityCtx<'a> {
    /// Current phase.
    pub phase: Phase,
    /// Whether the meeting has entered the voting sub-phase.
    pub voting: bool,
    /// The ship graph.
    pub map: &'a ShipMap,
    /// Post-snapshot room occupancy.
    pub occupancy: &'a Occupancy,
    /// All players, self included.
    pub roster: &'a BTreeMap<PlayerId, Player>,
    /// Unreported and reported bodies.
    pub bodies: &'a [DeadBody],
    /// Active sabotages with remaining ticks.
    pub active_sabotages: &'a BTreeMap<SabotageKind, u32>,
    /// Remaining sabotage cooldown.
    pub sabotage_cooldown: u32,
    /// Emergency buttons already spent.
    pub button_uses: u32,
    /// Game configuration.
    pub config: &'a GameConfig,
}

impl LegalityCtx<'_> {
    /// Whether a critical sabotage (OXYGEN or REACTOR) is active.
    pub fn critical_sabotage(&self) -> Option<SabotageKind> {
        [SabotageKind::Oxygen, SabotageKind::Reactor]
            .into_iter()
            .find(|kind| self.active_sabotages.contains_key(kind))
    }

    /// Whether an unreported body lies in `room`.
    fn unreported_body_in(&self, room: airlock_types::RoomId) -> bool {
        self.bodies.iter().any(|b| b.room == room && !b.reported)
    }
}

/// Compute the full legal action set for one player.
///
/// Applies, after per-variant collection:
///
/// - the **critical-sabotage lock**: crewmates lose COMPLETE TASK while
///   OXYGEN or REACTOR is active (they must fix or move toward the fix room)
/// - the **task-commitment lock**: MOVE is removed when an in-progress task
///   is in the current room, or when a pending local task exists and the
///   commitment scalar is at the lock threshold. Overridden by an unreported
///   body in the room (forced report) or an active critical sabotage.
pub fn legal_actions(ctx: &LegalityCtx<'_>, player: &Player) -> Vec<Action> {
    let mut actions = Vec::new();
    actions.extend(move_actions(ctx, player));
    actions.extend(meeting_trigger_actions(ctx, player));
    actions.extend(vote_actions(ctx, player));
    actions.extend(speak_actions(ctx, player));
    actions.extend(monitor_actions(ctx, player));
    actions.extend(fix_sabotage_actions(ctx, player));
    actions.extend(complete_task_actions(ctx, player));
    actions.extend(sabotage_actions(ctx, player));
    actions.extend(vent_actions(ctx, player));
    actions.extend(kill_actions(ctx, player));
    actions.extend(fake_task_actions(ctx, player));

    let critical = ctx.critical_sabotage().is_some();

    if critical && player.role != Role::Impostor && ctx.phase == Phase::Task {
        actions.retain(|a| a.kind() != ActionKind::CompleteTask);
    }

    if ctx.phase == Phase::Task && player.alive {
        let in_progress_here = player.has_local_in_progress_task(player.room);
        let pending_here = player.has_local_pending_task(player.room);
        let committed = player.memory.task_commitment >= commitment_lock_threshold();
        let should_lock = in_progress_here || (pending_here && committed);
        if should_lock && !ctx.unreported_body_in(player.room) && !critical {
            debug!(player = %player.name, "task-commitment lock: removing MOVE");
            actions.retain(|a| a.kind() != ActionKind::Move);
        }
    }

    actions
}

/// MOVE instances. Ghosts no-clip to any room; the living walk to adjacent
/// rooms. Movement only exists in the task phase.
fn move_actions(ctx: &LegalityCtx<'_>, player: &Player) -> Vec<Action> {
    if ctx.phase != Phase::Task {
        return Vec::new();
    }
    if player.alive {
        ctx.map
            .walk_neighbors(player.room)
            .into_iter()
            .map(|to| Action::Move { to })
            .collect()
    } else {
        ctx.map
            .room_ids()
            .filter(|room| *room != player.room)
            .map(|to| Action::Move { to })
            .collect()
    }
}

/// CALL MEETING / REPORT DEAD BODY instances.
///
/// The emergency button requires button budget plus either one completed
/// task or a witnessed crime; body reports are always legal when standing on
/// an unreported body.
fn meeting_trigger_actions(ctx: &LegalityCtx<'_>, player: &Player) -> Vec<Action> {
    if !player.alive || ctx.phase != Phase::Task {
        return Vec::new();
    }
    let mut actions = Vec::new();
    if player.room == ctx.map.button_room() && ctx.button_uses < ctx.config.max_num_buttons {
        let has_completed_task = player.completed_task_count() > 0;
        if has_completed_task || player.has_witnessed_crime() {
            actions.push(Action::CallMeeting);
        }
    }
    if ctx.unreported_body_in(player.room) {
        actions.push(Action::ReportBody);
    }
    actions
}

/// VOTE instances: every other living player, plus SKIP.
fn vote_actions(ctx: &LegalityCtx<'_>, player: &Player) -> Vec<Action> {
    if !player.alive || ctx.phase != Phase::Meeting || !ctx.voting {
        return Vec::new();
    }
    let mut actions: Vec<Action> = ctx
        .roster
        .values()
        .filter(|other| other.alive && other.id != player.id)
        .map(|other| Action::Vote {
            choice: VoteChoice::Player(other.id),
        })
        .collect();
    actions.push(Action::Vote {
        choice: VoteChoice::Skip,
    });
    actions
}

/// SPEAK instance, during discussion rounds only.
fn speak_actions(ctx: &LegalityCtx<'_>, player: &Player) -> Vec<Action> {
    if !player.alive || ctx.phase != Phase::Meeting || ctx.voting {
        return Vec::new();
    }
    vec![Action::Speak {
        message: String::from("..."),
    }]
}

/// VIEW MONITOR instances, from the security room only.
fn monitor_actions(ctx: &LegalityCtx<'_>, player: &Player) -> Vec<Action> {
    if !player.alive || ctx.phase != Phase::Task || player.room != ctx.map.monitor_room() {
        return Vec::new();
    }
    ctx.map
        .room_ids()
        .filter(|room| *room != player.room)
        .map(|room| Action::ViewMonitor { room })
        .collect()
}

/// FIX SABOTAGE instances: any active sabotage whose fix room is here.
fn fix_sabotage_actions(ctx: &LegalityCtx<'_>, player: &Player) -> Vec<Action> {
    if !player.alive || ctx.phase != Phase::Task {
        return Vec::new();
    }
    ctx.active_sabotages
        .keys()
        .filter(|kind| {
            ctx.map
                .fix_room(**kind)
                .is_ok_and(|room| room == player.room)
        })
        .map(|kind| Action::FixSabotage { kind: *kind })
        .collect()
}

/// COMPLETE TASK instances: incomplete own tasks bound to the current room.
/// Ghosts may complete tasks too (their work still feeds the crew task bar).
fn complete_task_actions(ctx: &LegalityCtx<'_>, player: &Player) -> Vec<Action> {
    if ctx.phase != Phase::Task || player.role == Role::Impostor {
        return Vec::new();
    }
    player
        .tasks
        .iter()
        .filter(|t| !t.is_complete() && t.room == player.room)
        .map(|t| Action::CompleteTask { task: t.id })
        .collect()
}

/// SABOTAGE instances: impostors off cooldown, one per kind.
fn sabotage_actions(ctx: &LegalityCtx<'_>, player: &Player) -> Vec<Action> {
    if !player.alive
        || player.role != Role::Impostor
        || ctx.phase != Phase::Task
        || ctx.sabotage_cooldown > 0
    {
        return Vec::new();
    }
    SabotageKind::ALL
        .into_iter()
        .filter(|kind| !ctx.active_sabotages.contains_key(kind))
        .map(|kind| Action::Sabotage { kind })
        .collect()
}

/// VENT instances: impostors only, along vent edges.
fn vent_actions(ctx: &LegalityCtx<'_>, player: &Player) -> Vec<Action> {
    if !player.alive || player.role != Role::Impostor || ctx.phase != Phase::Task {
        return Vec::new();
    }
    ctx.map
        .vent_neighbors(player.room)
        .into_iter()
        .map(|to| Action::Vent { to })
        .collect()
}

/// KILL instances: off cooldown, co-located living opposite-role targets.
fn kill_actions(ctx: &LegalityCtx<'_>, player: &Player) -> Vec<Action> {
    if !player.alive
        || player.role != Role::Impostor
        || ctx.phase != Phase::Task
        || player.kill_cooldown > 0
    {
        return Vec::new();
    }
    ctx.occupancy
        .players_in(player.room)
        .iter()
        .filter_map(|id| ctx.roster.get(id))
        .filter(|other| other.alive && other.role == player.role.opposite())
        .map(|other| Action::Kill { victim: other.id })
        .collect()
}

/// COMPLETE FAKE TASK instances: impostor cover work on local incomplete
/// tasks. Visual tasks are forbidden -- an impostor cannot produce the
/// visible animation, so faking one would expose them.
fn fake_task_actions(ctx: &LegalityCtx<'_>, player: &Player) -> Vec<Action> {
    if !player.alive || player.role != Role::Impostor || ctx.phase != Phase::Task {
        return Vec::new();
    }
    player
        .tasks
        .iter()
        .filter(|t| !t.is_complete() && t.room == player.room && !t.is_visual)
        .map(|t| Action::CompleteFakeTask { task: t.id })
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use airlock_types::{Task, TaskId, TaskKind};
    use airlock_ship::ShipMap;
    use rust_decimal::Decimal;

    use super::*;

    struct World {
        map: ShipMap,
        roster: BTreeMap<PlayerId, Player>,
        bodies: Vec<DeadBody>,
        sabotages: BTreeMap<SabotageKind, u32>,
        config: GameConfig,
    }

    impl World {
        fn new() -> Self {
            Self {
                map: ShipMap::standard().unwrap(),
                roster: BTreeMap::new(),
                bodies: Vec::new(),
                sabotages: BTreeMap::new(),
                config: GameConfig::default(),
            }
        }

        fn add_player(&mut self, index: u32, role: Role, room: &str) -> PlayerId {
            let id = PlayerId(index);
            let room = self.map.room_id(room).unwrap();
            self.roster.insert(id, Player::new(id, index, "red", role, room));
            id
        }

        fn actions(&self, id: PlayerId, phase: Phase, voting: bool) -> Vec<Action> {
            let occupancy = Occupancy::rebuild(
                self.roster
                    .values()
                    .map(|p| (p.id, p.room)),
            );
            let ctx = LegalityCtx {
                phase,
                voting,
                map: &self.map,
                occupancy: &occupancy,
                roster: &self.roster,
                bodies: &self.bodies,
                active_sabotages: &self.sabotages,
                sabotage_cooldown: 0,
                button_uses: 0,
                config: &self.config,
            };
            let player = self.roster.get(&id).unwrap();
            legal_actions(&ctx, player)
        }
    }

    fn give_task(world: &mut World, id: PlayerId, room: &str, remaining: u32, visual: bool) {
        let room = world.map.room_id(room).unwrap();
        if let Some(player) = world.roster.get_mut(&id) {
            let task_id = TaskId(u32::try_from(player.tasks.len()).unwrap_or(0));
            player.tasks.push(Task {
                id: task_id,
                name: String::from("Fix Wiring"),
                room,
                kind: TaskKind::Common,
                max_duration: 2,
                remaining,
                is_visual: visual,
                assigned_to: id,
            });
        }
    }

    #[test]
    fn living_player_moves_to_adjacent_rooms_only() {
        let mut world = World::new();
        let id = world.add_player(0, Role::Crewmate, "Cafeteria");
        let actions = world.actions(id, Phase::Task, false);
        let moves: Vec<&Action> = actions.iter().filter(|a| a.kind() == ActionKind::Move).collect();
        assert_eq!(moves.len(), 4);
    }

    #[test]
    fn ghost_moves_anywhere() {
        let mut world = World::new();
        let id = world.add_player(0, Role::Crewmate, "Cafeteria");
        if let Some(p) = world.roster.get_mut(&id) {
            p.mark_dead(1, airlock_types::DeathCause::Killed).unwrap();
        }
        let actions = world.actions(id, Phase::Task, false);
        let moves = actions.iter().filter(|a| a.kind() == ActionKind::Move).count();
        assert_eq!(moves, 13);
    }

    #[test]
    fn kill_requires_colocated_living_crewmate_and_no_cooldown() {
        let mut world = World::new();
        let impostor = world.add_player(0, Role::Impostor, "Electrical");
        let _victim = world.add_player(1, Role::Crewmate, "Electrical");
        let _far = world.add_player(2, Role::Crewmate, "Cafeteria");

        let actions = world.actions(impostor, Phase::Task, false);
        let kills: Vec<&Action> = actions.iter().filter(|a| a.kind() == ActionKind::Kill).collect();
        assert_eq!(kills.len(), 1);

        if let Some(p) = world.roster.get_mut(&impostor) {
            p.kill_cooldown = 2;
        }
        let actions = world.actions(impostor, Phase::Task, false);
        assert!(actions.iter().all(|a| a.kind() != ActionKind::Kill));
    }

    #[test]
    fn crewmate_never_gets_impostor_actions() {
        let mut world = World::new();
        let id = world.add_player(0, Role::Crewmate, "Electrical");
        let _other = world.add_player(1, Role::Impostor, "Electrical");
        let actions = world.actions(id, Phase::Task, false);
        for action in &actions {
            assert!(!matches!(
                action.kind(),
                ActionKind::Kill | ActionKind::Vent | ActionKind::Sabotage | ActionKind::CompleteFakeTask
            ));
        }
    }

    #[test]
    fn fake_task_excludes_visual_tasks() {
        let mut world = World::new();
        let impostor = world.add_player(0, Role::Impostor, "Medbay");
        give_task(&mut world, impostor, "Medbay", 2, true);
        give_task(&mut world, impostor, "Medbay", 2, false);
        let actions = world.actions(impostor, Phase::Task, false);
        let fakes: Vec<&Action> = actions
            .iter()
            .filter(|a| a.kind() == ActionKind::CompleteFakeTask)
            .collect();
        assert_eq!(fakes.len(), 1);
    }

    #[test]
    fn button_locked_until_task_or_witness() {
        let mut world = World::new();
        let id = world.add_player(0, Role::Crewmate, "Cafeteria");
        let actions = world.actions(id, Phase::Task, false);
        assert!(actions.iter().all(|a| a.kind() != ActionKind::CallMeeting));

        give_task(&mut world, id, "Cafeteria", 0, false);
        let actions = world.actions(id, Phase::Task, false);
        assert!(actions.iter().any(|a| a.kind() == ActionKind::CallMeeting));
    }

    #[test]
    fn body_report_always_available_in_room() {
        let mut world = World::new();
        let id = world.add_player(0, Role::Crewmate, "Admin");
        let admin = world.map.room_id("Admin").unwrap();
        world.bodies.push(DeadBody {
            player: PlayerId(9),
            room: admin,
            reported: false,
        });
        let actions = world.actions(id, Phase::Task, false);
        assert!(actions.iter().any(|a| a.kind() == ActionKind::ReportBody));
    }

    #[test]
    fn commitment_lock_removes_move() {
        let mut world = World::new();
        let id = world.add_player(0, Role::Crewmate, "Electrical");
        give_task(&mut world, id, "Electrical", 1, false); // in progress
        let actions = world.actions(id, Phase::Task, false);
        assert!(actions.iter().all(|a| a.kind() != ActionKind::Move));
        assert!(actions.iter().any(|a| a.kind() == ActionKind::CompleteTask));
    }

    #[test]
    fn commitment_lock_secondary_threshold() {
        let mut world = World::new();
        let id = world.add_player(0, Role::Crewmate, "Electrical");
        give_task(&mut world, id, "Electrical", 2, false); // pending
        if let Some(p) = world.roster.get_mut(&id) {
            p.memory.task_commitment = Decimal::new(8, 1);
        }
        let actions = world.actions(id, Phase::Task, false);
        assert!(actions.iter().all(|a| a.kind() != ActionKind::Move));
    }

    #[test]
    fn commitment_lock_overridden_by_body() {
        let mut world = World::new();
        let id = world.add_player(0, Role::Crewmate, "Electrical");
        give_task(&mut world, id, "Electrical", 1, false);
        let electrical = world.map.room_id("Electrical").unwrap();
        world.bodies.push(DeadBody {
            player: PlayerId(9),
            room: electrical,
            reported: false,
        });
        let actions = world.actions(id, Phase::Task, false);
        assert!(actions.iter().any(|a| a.kind() == ActionKind::Move));
    }

    #[test]
    fn critical_sabotage_locks_crewmate_tasks_but_not_impostor_fakes() {
        let mut world = World::new();
        let crew = world.add_player(0, Role::Crewmate, "Electrical");
        let imp = world.add_player(1, Role::Impostor, "Electrical");
        give_task(&mut world, crew, "Electrical", 2, false);
        give_task(&mut world, imp, "Electrical", 2, false);
        world.sabotages.insert(SabotageKind::Oxygen, 4);

        let crew_actions = world.actions(crew, Phase::Task, false);
        assert!(crew_actions.iter().all(|a| a.kind() != ActionKind::CompleteTask));
        // The lock also restores MOVE (crisis overrides commitment).
        assert!(crew_actions.iter().any(|a| a.kind() == ActionKind::Move));

        let imp_actions = world.actions(imp, Phase::Task, false);
        assert!(imp_actions.iter().any(|a| a.kind() == ActionKind::CompleteFakeTask));
    }

    #[test]
    fn fix_requires_the_designated_room() {
        let mut world = World::new();
        let near = world.add_player(0, Role::Crewmate, "O2");
        let far = world.add_player(1, Role::Crewmate, "Cafeteria");
        world.sabotages.insert(SabotageKind::Oxygen, 4);

        let near_actions = world.actions(near, Phase::Task, false);
        assert!(near_actions.iter().any(|a| a.kind() == ActionKind::FixSabotage));
        let far_actions = world.actions(far, Phase::Task, false);
        assert!(far_actions.iter().all(|a| a.kind() != ActionKind::FixSabotage));
    }

    #[test]
    fn meeting_discussion_allows_speak_only_for_living() {
        let mut world = World::new();
        let id = world.add_player(0, Role::Crewmate, "Cafeteria");
        let actions = world.actions(id, Phase::Meeting, false);
        assert_eq!(actions.len(), 1);
        assert_eq!(actions.first().map(Action::kind), Some(ActionKind::Speak));

        if let Some(p) = world.roster.get_mut(&id) {
            p.mark_dead(1, airlock_types::DeathCause::Ejected).unwrap();
        }
        let actions = world.actions(id, Phase::Meeting, false);
        assert!(actions.is_empty());
    }

    #[test]
    fn voting_offers_living_targets_and_skip() {
        let mut world = World::new();
        let voter = world.add_player(0, Role::Crewmate, "Cafeteria");
        let _a = world.add_player(1, Role::Crewmate, "Cafeteria");
        let dead = world.add_player(2, Role::Crewmate, "Cafeteria");
        if let Some(p) = world.roster.get_mut(&dead) {
            p.mark_dead(1, airlock_types::DeathCause::Killed).unwrap();
        }
        let actions = world.actions(voter, Phase::Meeting, true);
        let votes: Vec<&Action> = actions.iter().filter(|a| a.kind() == ActionKind::Vote).collect();
        // One living target plus SKIP; the dead player and self are excluded.
        assert_eq!(votes.len(), 2);
        assert!(votes.iter().any(|a| matches!(
            a,
            Action::Vote { choice: VoteChoice::Skip }
        )));
    }

    #[test]
    fn monitor_only_in_security() {
        let mut world = World::new();
        let id = world.add_player(0, Role::Crewmate, "Security");
        let actions = world.actions(id, Phase::Task, false);
        assert!(actions.iter().any(|a| a.kind() == ActionKind::ViewMonitor));

        let elsewhere = world.add_player(1, Role::Crewmate, "Cafeteria");
        let actions = world.actions(elsewhere, Phase::Task, false);
        assert!(actions.iter().all(|a| a.kind() != ActionKind::ViewMonitor));
    }

    #[test]
    fn first_legal_action_in_task_phase_is_move() {
        let mut world = World::new();
        let id = world.add_player(0, Role::Crewmate, "Cafeteria");
        let actions = world.actions(id, Phase::Task, false);
        assert_eq!(actions.first().map(Action::kind), Some(ActionKind::Move));
    }
}
