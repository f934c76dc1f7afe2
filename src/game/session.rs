// Game session state machine
//
// Owns the tower, the debris and the autopilot, and drives them one frame at a
// time: Attract -> Playing -> Ended -> Playing ...

use crate::engine::physics::{PhysicsBackend, PhysicsError};

use super::autopilot::Autopilot;
use super::config::{AttractMissPolicy, GameConfig};
use super::error::GameError;
use super::geometry::{Axis, Cut, CutResult};
use super::overhang::{Overhang, OverhangSet};
use super::score::ScoreStore;
use super::stack::{Layer, LayerStack, SEEDED_LAYERS};

/// Where the session is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SessionPhase {
    /// Autopilot stacks forever, nothing is scored
    #[default]
    Attract,
    /// Player-triggered drops, scored
    Playing,
    /// Terminal until an explicit restart
    Ended,
}

impl SessionPhase {
    /// Whether a layer is sliding in this phase
    pub fn is_running(&self) -> bool {
        matches!(self, Self::Attract | Self::Playing)
    }
}

/// Things the presentation layer may want to react to
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GameEvent {
    SessionStarted,
    /// A drop landed; `score` is the running score (0 in attract mode)
    LayerPlaced { score: u32, perfect: bool },
    OverhangSpawned { width: f32, depth: f32 },
    /// The moving layer fell off the tower
    LayerMissed,
    SessionEnded { score: u32, new_best: bool },
    /// The session died on a physics or logic fault
    SessionAborted,
    /// Attract mode rebuilt its tower after a miss
    AttractReset,
}

/// Per-frame data for the presentation layer
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SessionSnapshot {
    pub phase: SessionPhase,
    pub score: u32,
    pub best_score: u32,
    /// Height of the top face of the tower
    pub stack_height: f32,
    /// Height the camera should ease towards
    pub camera_follow_target: f32,
}

/// One game of stacking, from attract mode through any number of restarts
pub struct GameSession<P: PhysicsBackend> {
    config: GameConfig,
    physics: P,
    stack: LayerStack,
    overhangs: OverhangSet,
    autopilot: Autopilot,
    store: Box<dyn ScoreStore>,
    phase: SessionPhase,
    score: u32,
    best_score: u32,
    /// Autopilot also drives while Playing
    assist: bool,
    /// Bodies in the backend that this session doesn't own
    body_baseline: usize,
    events: Vec<GameEvent>,
}

impl<P: PhysicsBackend> GameSession<P> {
    /// Build a session in attract mode with a freshly seeded tower
    pub fn new(
        config: GameConfig,
        mut physics: P,
        mut store: Box<dyn ScoreStore>,
    ) -> Result<Self, GameError> {
        config.validate()?;
        physics.set_gravity(config.gravity);

        let best_score = store.load_best().unwrap_or_else(|err| {
            log::warn!("Could not read best score, starting from 0: {}", err);
            0
        });
        let body_baseline = physics.body_count();

        let mut session = Self {
            stack: LayerStack::new(config.box_height),
            overhangs: OverhangSet::new(&config),
            autopilot: Autopilot::new(
                config.seed,
                config.robot_max_error,
                config.autopilot_anchor,
            ),
            config,
            physics,
            store,
            phase: SessionPhase::Attract,
            score: 0,
            best_score,
            assist: false,
            body_baseline,
            events: Vec::new(),
        };
        session.seed_tower()?;

        log::info!("Session ready in attract mode (best score {})", best_score);
        Ok(session)
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn best_score(&self) -> u32 {
        self.best_score
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn physics(&self) -> &P {
        &self.physics
    }

    #[cfg(test)]
    pub(crate) fn physics_mut(&mut self) -> &mut P {
        &mut self.physics
    }

    /// Settled and sliding layers, foundation first
    pub fn layers(&self) -> &[Layer] {
        self.stack.layers()
    }

    pub fn overhangs(&self) -> impl Iterator<Item = &Overhang> {
        self.overhangs.iter()
    }

    pub fn overhang_count(&self) -> usize {
        self.overhangs.len()
    }

    /// Current autopilot placement error
    pub fn autopilot_precision(&self) -> f32 {
        self.autopilot.precision()
    }

    pub fn is_assisted(&self) -> bool {
        self.assist
    }

    /// Let the autopilot drop layers during play
    pub fn set_assist(&mut self, assist: bool) {
        if self.assist != assist {
            log::info!("Assisted play {}", if assist { "on" } else { "off" });
            self.assist = assist;
        }
    }

    /// Take every event produced since the last call
    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let settled = self.stack.len().saturating_sub(SEEDED_LAYERS) as f32;
        SessionSnapshot {
            phase: self.phase,
            score: self.score,
            best_score: self.best_score,
            stack_height: self.stack.height(),
            camera_follow_target: self.config.box_height * settled + self.config.camera_offset,
        }
    }

    /// Raise the durable best score; lower values are ignored.
    ///
    /// Returns whether the stored value changed.
    pub fn set_best_score(&mut self, value: u32) -> Result<bool, GameError> {
        if value <= self.best_score {
            return Ok(false);
        }
        self.best_score = value;
        self.store.save_best(value)?;
        Ok(true)
    }

    /// Drive one frame
    pub fn on_frame(&mut self, dt: f32) -> Result<SessionSnapshot, GameError> {
        match self.tick(dt) {
            Ok(()) => Ok(self.snapshot()),
            Err(err) => Err(self.abort(err)),
        }
    }

    /// The single input: starts play from attract mode, drops the layer while
    /// playing, does nothing once the session has ended
    pub fn trigger(&mut self) -> Result<(), GameError> {
        let result = match self.phase {
            SessionPhase::Attract => self.start_session(),
            SessionPhase::Playing => self.drop_layer(),
            SessionPhase::Ended => {
                log::debug!("Trigger ignored, session has ended");
                Ok(())
            }
        };
        result.map_err(|err| self.abort(err))
    }

    /// Throw the whole tower away and start a new scored session
    pub fn restart(&mut self) -> Result<(), GameError> {
        self.start_session().map_err(|err| self.abort(err))
    }

    fn tick(&mut self, dt: f32) -> Result<(), GameError> {
        if !dt.is_finite() || dt < 0.0 {
            return Err(PhysicsError::InvalidTimestep(dt).into());
        }

        if self.phase.is_running() {
            self.drive_top_layer(dt)?;
        }

        self.physics.step(dt)?;
        self.overhangs.sync_from_physics(&self.physics)?;

        let pruned = self.overhangs.prune(&mut self.physics, dt)?;
        if pruned.despawned + pruned.frozen > 0 {
            log::debug!(
                "Retired overhangs: {} despawned, {} frozen",
                pruned.despawned,
                pruned.frozen
            );
        }
        Ok(())
    }

    fn drive_top_layer(&mut self, dt: f32) -> Result<(), GameError> {
        let autopiloted = self.phase == SessionPhase::Attract || self.assist;
        if autopiloted {
            let decision = self
                .autopilot
                .decide(self.stack.top()?, self.stack.second_from_top()?)?;
            if !decision.should_advance {
                return self.drop_layer();
            }
        }

        let coordinate = self
            .stack
            .advance_top(&mut self.physics, self.config.layer_speed * dt)?;
        if coordinate.abs() > self.config.runaway_bound {
            log::info!("Layer slid past {:.2} without a drop", coordinate);
            self.miss()?;
        }
        Ok(())
    }

    fn drop_layer(&mut self) -> Result<(), GameError> {
        match self.stack.compute_top_cut()? {
            CutResult::Cut(cut) => self.place(&cut),
            CutResult::Miss => self.miss(),
        }
    }

    fn place(&mut self, cut: &Cut) -> Result<(), GameError> {
        let before = self.stack.top()?.clone();
        let axis = before
            .direction()
            .ok_or_else(|| GameError::invariant("dropped a layer that was not sliding"))?;

        let placed = self.stack.apply_cut(&mut self.physics, cut)?.clone();

        if cut.is_perfect() {
            log::debug!("Perfect placement at layer {}", self.stack.len() - 1);
        } else {
            let mut center = before.position;
            *axis.component_mut(&mut center) += cut.overhang.shift;
            let (width, depth) = match axis {
                Axis::X => (cut.overhang.size, before.depth),
                Axis::Z => (before.width, cut.overhang.size),
            };
            self.overhangs
                .add(&mut self.physics, center.x, center.z, width, depth, center.y)?;
            self.events
                .push(GameEvent::OverhangSpawned { width, depth });
        }

        if self.phase == SessionPhase::Playing {
            self.score += 1;
        }
        self.events.push(GameEvent::LayerPlaced {
            score: self.score,
            perfect: cut.is_perfect(),
        });

        let next_axis = axis.flipped();
        let mut next = placed.position;
        *next_axis.component_mut(&mut next) = -self.config.spawn_offset;
        self.stack.push(
            &mut self.physics,
            next.x,
            next.z,
            placed.width,
            placed.depth,
            Some(next_axis),
        )?;

        self.autopilot.reroll();
        Ok(())
    }

    fn miss(&mut self) -> Result<(), GameError> {
        let layer = self.stack.pop_top()?;
        let axis = layer.travel_axis().unwrap_or(Axis::X);
        self.overhangs.adopt(&mut self.physics, layer)?;
        self.events.push(GameEvent::LayerMissed);

        match self.phase {
            SessionPhase::Playing => {
                self.end_session();
                Ok(())
            }
            SessionPhase::Attract => match self.config.attract_miss {
                AttractMissPolicy::Restart => {
                    log::info!("Autopilot missed, rebuilding attract tower");
                    self.reset_world()?;
                    self.autopilot.reroll();
                    self.events.push(GameEvent::AttractReset);
                    Ok(())
                }
                AttractMissPolicy::Continue => self.respawn_mover(axis),
            },
            SessionPhase::Ended => Ok(()),
        }
    }

    /// Put a fresh sliding layer back on the stack after a miss
    fn respawn_mover(&mut self, axis: Axis) -> Result<(), GameError> {
        let top = self
            .stack
            .layers()
            .last()
            .cloned()
            .ok_or_else(|| GameError::invariant("miss emptied the stack"))?;

        let mut next = top.position;
        *axis.component_mut(&mut next) = -self.config.spawn_offset;
        self.stack
            .push(&mut self.physics, next.x, next.z, top.width, top.depth, Some(axis))?;
        self.autopilot.reroll();
        Ok(())
    }

    /// Raise and persist the best score if this session beat it
    fn record_best(&mut self) -> bool {
        if self.score <= self.best_score {
            return false;
        }
        self.best_score = self.score;
        if let Err(err) = self.store.save_best(self.score) {
            log::warn!("Failed to persist best score {}: {}", self.score, err);
        }
        true
    }

    fn end_session(&mut self) {
        self.phase = SessionPhase::Ended;
        let new_best = self.record_best();

        log::info!(
            "Session ended with score {} (best {}{})",
            self.score,
            self.best_score,
            if new_best { ", new record" } else { "" }
        );
        self.events.push(GameEvent::SessionEnded {
            score: self.score,
            new_best,
        });
    }

    fn start_session(&mut self) -> Result<(), GameError> {
        self.reset_world()?;
        self.score = 0;
        self.phase = SessionPhase::Playing;
        self.autopilot.reroll();
        self.events.push(GameEvent::SessionStarted);
        log::info!("Session started");
        Ok(())
    }

    /// Drain every body this session owns, then seed a new tower
    fn reset_world(&mut self) -> Result<(), GameError> {
        if let Err(err) = self.stack.clear(&mut self.physics) {
            log::warn!("Layer cleanup incomplete: {}", err);
        }
        if let Err(err) = self.overhangs.clear(&mut self.physics) {
            log::warn!("Overhang cleanup incomplete: {}", err);
        }

        let live = self.physics.body_count();
        if live != self.body_baseline {
            return Err(GameError::invariant(format!(
                "{} physics bodies leaked across reset",
                live as isize - self.body_baseline as isize
            )));
        }

        self.seed_tower()
    }

    fn seed_tower(&mut self) -> Result<(), GameError> {
        let size = self.config.box_size;
        self.stack
            .push(&mut self.physics, 0.0, 0.0, size, size, None)?;
        self.stack.push(
            &mut self.physics,
            -self.config.spawn_offset,
            0.0,
            size,
            size,
            Some(Axis::X),
        )?;
        Ok(())
    }

    fn abort(&mut self, err: GameError) -> GameError {
        log::error!("Session aborted: {}", err);
        if self.phase == SessionPhase::Playing && self.record_best() {
            log::info!("Kept best score {} from the aborted session", self.best_score);
        }
        self.phase = SessionPhase::Ended;
        self.events.push(GameEvent::SessionAborted);
        err
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::physics::{BodyHandle, BodyPose, PhysicsWorld};
    use crate::game::config::OverhangPolicy;
    use crate::game::score::{MemoryStore, PersistenceError};
    use approx::assert_relative_eq;
    use glam::Vec3;
    use std::cell::Cell;
    use std::rc::Rc;

    /// Store whose value the test can still see after handing it over
    struct SharedStore(Rc<Cell<u32>>);

    impl ScoreStore for SharedStore {
        fn load_best(&mut self) -> Result<u32, PersistenceError> {
            Ok(self.0.get())
        }

        fn save_best(&mut self, best: u32) -> Result<(), PersistenceError> {
            self.0.set(best);
            Ok(())
        }
    }

    /// Real world that can be told to fail its next steps
    struct FlakyPhysics {
        inner: PhysicsWorld,
        fail_steps: bool,
    }

    impl PhysicsBackend for FlakyPhysics {
        fn create_body(
            &mut self,
            position: Vec3,
            half_extents: Vec3,
            mass: f32,
        ) -> Result<BodyHandle, PhysicsError> {
            self.inner.create_body(position, half_extents, mass)
        }

        fn set_gravity(&mut self, gravity: f32) {
            self.inner.set_gravity(gravity)
        }

        fn step(&mut self, dt: f32) -> Result<(), PhysicsError> {
            if self.fail_steps {
                return Err(PhysicsError::Backend("solver diverged".into()));
            }
            self.inner.step(dt)
        }

        fn read_body(&self, handle: BodyHandle) -> Result<BodyPose, PhysicsError> {
            self.inner.read_body(handle)
        }

        fn set_body_translation(
            &mut self,
            handle: BodyHandle,
            position: Vec3,
        ) -> Result<(), PhysicsError> {
            self.inner.set_body_translation(handle, position)
        }

        fn replace_shape(
            &mut self,
            handle: BodyHandle,
            half_extents: Vec3,
        ) -> Result<(), PhysicsError> {
            self.inner.replace_shape(handle, half_extents)
        }

        fn make_dynamic(&mut self, handle: BodyHandle, mass: f32) -> Result<(), PhysicsError> {
            self.inner.make_dynamic(handle, mass)
        }

        fn remove_body(&mut self, handle: BodyHandle) -> Result<(), PhysicsError> {
            self.inner.remove_body(handle)
        }

        fn body_count(&self) -> usize {
            self.inner.body_count()
        }
    }

    /// 8 units/s * 0.25 s: exact two-unit slides
    const COARSE_DT: f32 = 0.25;
    const DT: f32 = 1.0 / 60.0;

    fn session() -> GameSession<PhysicsWorld> {
        session_with(GameConfig::default())
    }

    fn session_with(config: GameConfig) -> GameSession<PhysicsWorld> {
        GameSession::new(config, PhysicsWorld::new(), Box::new(MemoryStore::new())).unwrap()
    }

    fn playing() -> GameSession<PhysicsWorld> {
        let mut session = session();
        session.trigger().unwrap();
        assert_eq!(session.phase(), SessionPhase::Playing);
        session
    }

    /// Slide the fresh layer from -10 to exactly 0 and drop it
    fn perfect_drop<P: PhysicsBackend>(session: &mut GameSession<P>) {
        for _ in 0..5 {
            session.on_frame(COARSE_DT).unwrap();
        }
        session.trigger().unwrap();
    }

    fn run_until_ended<P: PhysicsBackend>(session: &mut GameSession<P>) {
        for _ in 0..20 {
            session.on_frame(COARSE_DT).unwrap();
            if session.phase() == SessionPhase::Ended {
                return;
            }
        }
        panic!("session never ended");
    }

    #[test]
    fn test_new_session_is_seeded_attract() {
        let session = session();

        assert_eq!(session.phase(), SessionPhase::Attract);
        assert_eq!(session.layers().len(), SEEDED_LAYERS);
        assert_eq!(session.layers()[0].direction(), None);
        assert_eq!(session.layers()[1].direction(), Some(Axis::X));
        assert_eq!(session.layers()[1].position, Vec3::new(-10.0, 1.0, 0.0));
        assert_eq!(session.physics().body_count(), 2);
    }

    #[test]
    fn test_first_trigger_starts_playing() {
        let mut session = session();
        session.trigger().unwrap();

        assert_eq!(session.phase(), SessionPhase::Playing);
        assert_eq!(session.score(), 0);
        assert_eq!(session.layers().len(), SEEDED_LAYERS);
        assert_eq!(session.drain_events(), vec![GameEvent::SessionStarted]);
    }

    #[test]
    fn test_score_counts_successful_cuts() {
        let mut session = playing();

        for expected in 1..=5 {
            perfect_drop(&mut session);
            assert_eq!(session.score(), expected);
            assert_eq!(session.layers().len(), expected as usize + SEEDED_LAYERS);
        }
        assert_eq!(session.overhang_count(), 0);
    }

    #[test]
    fn test_layers_alternate_axes() {
        let mut session = playing();
        perfect_drop(&mut session);
        perfect_drop(&mut session);

        let axes: Vec<_> = session.layers().iter().map(Layer::travel_axis).collect();
        assert_eq!(axes, vec![None, Some(Axis::X), Some(Axis::Z), Some(Axis::X)]);

        let top = session.layers().last().unwrap();
        assert_eq!(top.position, Vec3::new(-10.0, 3.0, 0.0));
    }

    #[test]
    fn test_partial_drop_spawns_overhang() {
        let mut session = playing();
        session.drain_events();

        for _ in 0..5 {
            session.on_frame(COARSE_DT).unwrap();
        }
        session.on_frame(0.125).unwrap(); // one more unit, layer at x = 1
        session.trigger().unwrap();

        let placed = &session.layers()[1];
        assert_relative_eq!(placed.width, 2.0);
        assert_relative_eq!(placed.depth, 3.0);
        assert_relative_eq!(placed.position.x, 0.5);

        let overhang = session.overhangs().next().unwrap();
        assert_relative_eq!(overhang.width, 1.0);
        assert_relative_eq!(overhang.depth, 3.0);
        assert_relative_eq!(overhang.position.x, 2.0);

        let next = session.layers().last().unwrap();
        assert_eq!(next.direction(), Some(Axis::Z));
        assert_relative_eq!(next.position.x, 0.5);
        assert_relative_eq!(next.width, 2.0);

        assert_eq!(
            session.drain_events(),
            vec![
                GameEvent::OverhangSpawned {
                    width: 1.0,
                    depth: 3.0
                },
                GameEvent::LayerPlaced {
                    score: 1,
                    perfect: false
                },
            ]
        );
    }

    #[test]
    fn test_early_trigger_misses() {
        let mut session = playing();
        session.trigger().unwrap();

        assert_eq!(session.phase(), SessionPhase::Ended);
        assert_eq!(session.layers().len(), SEEDED_LAYERS - 1);
        assert_eq!(session.overhang_count(), 1);
        // The missed layer's body moved over, nothing was recreated
        assert_eq!(session.physics().body_count(), 2);
    }

    #[test]
    fn test_runaway_layer_ends_session() {
        let mut session = playing();
        perfect_drop(&mut session);
        session.drain_events();

        run_until_ended(&mut session);

        assert_eq!(session.score(), 1);
        assert_eq!(session.layers().len(), 2);
        let events = session.drain_events();
        assert!(events.contains(&GameEvent::LayerMissed));
        assert!(events.contains(&GameEvent::SessionEnded {
            score: 1,
            new_best: true
        }));
    }

    #[test]
    fn test_trigger_ignored_after_end() {
        let mut session = playing();
        run_until_ended(&mut session);

        session.trigger().unwrap();
        assert_eq!(session.phase(), SessionPhase::Ended);
    }

    #[test]
    fn test_restart_drains_everything() {
        let mut session = playing();
        perfect_drop(&mut session);
        for _ in 0..5 {
            session.on_frame(COARSE_DT).unwrap();
        }
        session.on_frame(0.125).unwrap();
        session.trigger().unwrap();
        run_until_ended(&mut session);
        assert!(session.overhang_count() > 0);

        session.restart().unwrap();

        assert_eq!(session.phase(), SessionPhase::Playing);
        assert_eq!(session.score(), 0);
        assert_eq!(session.layers().len(), SEEDED_LAYERS);
        assert_eq!(session.overhang_count(), 0);
        assert_eq!(session.physics().body_count(), SEEDED_LAYERS);
    }

    #[test]
    fn test_best_score_is_monotonic_and_durable() {
        let stored = Rc::new(Cell::new(0));
        let mut session = GameSession::new(
            GameConfig::default(),
            PhysicsWorld::new(),
            Box::new(SharedStore(stored.clone())),
        )
        .unwrap();

        session.trigger().unwrap();
        for _ in 0..3 {
            perfect_drop(&mut session);
        }
        run_until_ended(&mut session);
        assert_eq!(session.best_score(), 3);
        assert_eq!(stored.get(), 3);

        session.restart().unwrap();
        perfect_drop(&mut session);
        run_until_ended(&mut session);
        assert_eq!(session.best_score(), 3);
        assert_eq!(stored.get(), 3);

        assert!(!session.set_best_score(2).unwrap());
        assert!(session.set_best_score(9).unwrap());
        assert_eq!(stored.get(), 9);

        let reopened = GameSession::new(
            GameConfig::default(),
            PhysicsWorld::new(),
            Box::new(SharedStore(stored)),
        )
        .unwrap();
        assert_eq!(reopened.best_score(), 9);
    }

    #[test]
    fn test_attract_stacks_without_scoring() {
        let mut session = session();

        for _ in 0..600 {
            session.on_frame(DT).unwrap();
        }

        assert_eq!(session.phase(), SessionPhase::Attract);
        assert_eq!(session.score(), 0);
        let placed = session
            .drain_events()
            .into_iter()
            .filter(|e| matches!(e, GameEvent::LayerPlaced { score: 0, .. }))
            .count();
        assert!(placed >= 3);
    }

    #[test]
    fn test_attract_restarts_after_miss() {
        let mut session = session_with(GameConfig {
            robot_max_error: 20.0,
            ..GameConfig::default()
        });

        let mut reset = false;
        for _ in 0..3000 {
            session.on_frame(DT).unwrap();
            if session.drain_events().contains(&GameEvent::AttractReset) {
                reset = true;
                break;
            }
        }

        assert!(reset);
        assert_eq!(session.phase(), SessionPhase::Attract);
        assert_eq!(session.layers().len(), SEEDED_LAYERS);
        assert_eq!(session.overhang_count(), 0);
    }

    #[test]
    fn test_attract_continue_keeps_tower() {
        let mut session = session_with(GameConfig {
            robot_max_error: 20.0,
            attract_miss: AttractMissPolicy::Continue,
            ..GameConfig::default()
        });

        let mut missed = false;
        for _ in 0..3000 {
            session.on_frame(DT).unwrap();
            let events = session.drain_events();
            assert!(!events.contains(&GameEvent::AttractReset));
            if events.contains(&GameEvent::LayerMissed) {
                missed = true;
                break;
            }
        }

        assert!(missed);
        assert_eq!(session.phase(), SessionPhase::Attract);
        assert!(session.layers().len() >= SEEDED_LAYERS);
        assert!(session.layers().last().unwrap().direction().is_some());
    }

    #[test]
    fn test_assisted_play_scores() {
        let mut session = playing();
        session.set_assist(true);

        for _ in 0..600 {
            session.on_frame(DT).unwrap();
            if session.phase() == SessionPhase::Ended {
                break;
            }
        }

        assert!(session.score() >= 1);
    }

    #[test]
    fn test_overhangs_are_eventually_pruned() {
        let mut session = playing();
        for _ in 0..5 {
            session.on_frame(COARSE_DT).unwrap();
        }
        session.on_frame(0.125).unwrap();
        session.trigger().unwrap();
        run_until_ended(&mut session);
        assert!(session.overhang_count() > 0);

        for _ in 0..600 {
            session.on_frame(DT).unwrap();
        }
        assert_eq!(session.overhang_count(), 0);
    }

    #[test]
    fn test_freeze_policy_stops_simulating() {
        let mut session = session_with(GameConfig {
            overhang_policy: OverhangPolicy::Freeze,
            ..GameConfig::default()
        });
        session.trigger().unwrap();
        session.trigger().unwrap(); // immediate miss
        assert_eq!(session.overhang_count(), 1);

        for _ in 0..600 {
            session.on_frame(DT).unwrap();
        }
        assert_eq!(session.overhang_count(), 1);
        assert!(session.overhangs().all(Overhang::is_frozen));
        assert_eq!(session.physics().body_count(), 1);
    }

    #[test]
    fn test_camera_target_follows_stack() {
        let mut session = playing();
        let start = session.snapshot();
        assert_relative_eq!(start.camera_follow_target, 4.0);
        assert_relative_eq!(start.stack_height, 2.0);

        perfect_drop(&mut session);
        let snapshot = session.on_frame(0.0).unwrap();
        assert_relative_eq!(snapshot.camera_follow_target, 5.0);
        assert_relative_eq!(snapshot.stack_height, 3.0);
    }

    #[test]
    fn test_invalid_dt_aborts_session() {
        let mut session = playing();
        let err = session.on_frame(f32::NAN).unwrap_err();

        assert!(err.is_physics());
        assert_eq!(session.phase(), SessionPhase::Ended);
    }

    #[test]
    fn test_physics_failure_aborts_and_restart_recovers() {
        let physics = FlakyPhysics {
            inner: PhysicsWorld::new(),
            fail_steps: false,
        };
        let mut session =
            GameSession::new(GameConfig::default(), physics, Box::new(MemoryStore::new()))
                .unwrap();
        session.trigger().unwrap();
        perfect_drop(&mut session);

        session.physics_mut().fail_steps = true;
        let err = session.on_frame(DT).unwrap_err();
        assert!(matches!(err, GameError::Physics(PhysicsError::Backend(_))));
        assert_eq!(session.phase(), SessionPhase::Ended);
        assert!(session.drain_events().contains(&GameEvent::SessionAborted));

        session.physics_mut().fail_steps = false;
        session.restart().unwrap();
        assert_eq!(session.phase(), SessionPhase::Playing);
        assert_eq!(session.layers().len(), SEEDED_LAYERS);
        assert!(session.on_frame(DT).is_ok());
    }

    #[test]
    fn test_aborted_session_keeps_best_score() {
        let stored = Rc::new(Cell::new(0));
        let physics = FlakyPhysics {
            inner: PhysicsWorld::new(),
            fail_steps: false,
        };
        let mut session = GameSession::new(
            GameConfig::default(),
            physics,
            Box::new(SharedStore(stored.clone())),
        )
        .unwrap();
        session.trigger().unwrap();
        for _ in 0..3 {
            perfect_drop(&mut session);
        }

        session.physics_mut().fail_steps = true;
        assert!(session.on_frame(DT).is_err());

        assert_eq!(session.phase(), SessionPhase::Ended);
        assert_eq!(session.score(), 3);
        assert_eq!(session.best_score(), 3);
        assert_eq!(stored.get(), 3);
    }

    #[test]
    fn test_restart_mid_play_drains_everything() {
        let mut session = playing();
        perfect_drop(&mut session);
        for _ in 0..5 {
            session.on_frame(COARSE_DT).unwrap();
        }
        session.on_frame(0.125).unwrap();
        session.trigger().unwrap();
        session.on_frame(COARSE_DT).unwrap();
        session.on_frame(COARSE_DT).unwrap();

        assert_eq!(session.phase(), SessionPhase::Playing);
        assert!(session.overhang_count() > 0);
        assert_eq!(session.layers().len(), SEEDED_LAYERS + 2);

        session.restart().unwrap();

        assert_eq!(session.phase(), SessionPhase::Playing);
        assert_eq!(session.score(), 0);
        assert_eq!(session.layers().len(), SEEDED_LAYERS);
        assert_eq!(session.overhang_count(), 0);
        assert_eq!(session.physics().body_count(), SEEDED_LAYERS);
    }

    #[test]
    fn test_session_applies_configured_gravity() {
        let session = session_with(GameConfig {
            gravity: 3.0,
            ..GameConfig::default()
        });
        assert_eq!(session.physics().gravity(), Vec3::new(0.0, -3.0, 0.0));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = GameConfig {
            box_size: -1.0,
            ..GameConfig::default()
        };
        let result = GameSession::new(config, PhysicsWorld::new(), Box::new(MemoryStore::new()));
        assert!(matches!(result, Err(GameError::Config(_))));
    }
}
