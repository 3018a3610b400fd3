//! End-to-end scheduler scenarios.

use std::cell::RefCell;
use std::rc::Rc;

use sprite_actions::builder::{delay_until, move_until, parallel, repeat, sequence};
use sprite_actions::error::Operation;
use sprite_actions::{
    Action, ActionError, ActionState, BoundaryBehavior, Bounds, EngineConfig, EventKind,
    MoveUntil, RecordingSink, Scheduler, SchedulerError, Sprite, SpriteArena, StopReason,
    TargetStore, Vec2, after_frames, infinite, until,
};

type Log = Rc<RefCell<Vec<String>>>;

fn log_stop(log: &Log, label: &'static str) -> impl FnOnce(StopReason) + 'static {
    let log = Rc::clone(log);
    move |reason| log.borrow_mut().push(format!("{label}:{reason}"))
}

/// An action whose update always fails.
struct Broken {
    state: ActionState,
    stop_reason: Option<StopReason>,
}

impl Broken {
    fn new() -> Self {
        Self {
            state: ActionState::Pending,
            stop_reason: None,
        }
    }
}

impl Action for Broken {
    fn name(&self) -> &'static str {
        "broken"
    }

    fn state(&self) -> ActionState {
        self.state
    }

    fn elapsed(&self) -> f32 {
        0.0
    }

    fn stop_reason(&self) -> Option<StopReason> {
        self.stop_reason
    }

    fn start(&mut self) -> Result<(), ActionError> {
        self.state = ActionState::Running;
        Ok(())
    }

    fn update(&mut self, _targets: &mut dyn TargetStore, _dt: f32) -> Result<(), ActionError> {
        Err(ActionError::InvalidState {
            action: "broken",
            operation: Operation::Update,
            state: ActionState::Done,
        })
    }

    fn pause(&mut self) -> Result<(), ActionError> {
        Ok(())
    }

    fn resume(&mut self) -> Result<(), ActionError> {
        Ok(())
    }

    fn stop_with(&mut self, reason: StopReason) {
        if !self.state.is_terminal() {
            self.state = reason.terminal_state();
            self.stop_reason = Some(reason);
        }
    }
}

#[test]
fn move_until_reaches_threshold_on_fifth_tick() {
    let mut sprites = SpriteArena::new();
    let ship = sprites.insert(Sprite::default());
    let mut scheduler = Scheduler::new();
    let id = scheduler
        .schedule(
            MoveUntil::new(ship, Vec2::new(2.0, 0.0), until(|s| s.position.x >= 10.0)).boxed(),
        )
        .unwrap();

    for _ in 0..4 {
        let report = scheduler.tick(&mut sprites, 1.0);
        assert!(report.finished.is_empty());
    }
    let report = scheduler.tick(&mut sprites, 1.0);

    assert_eq!(report.frame, 5);
    assert_eq!(report.finished, vec![(id, StopReason::Completed)]);
    assert_eq!(sprites[ship].position, Vec2::new(10.0, 0.0));
}

#[test]
fn single_writer_per_target_and_tag() {
    let mut sprites = SpriteArena::new();
    let ship = sprites.insert(Sprite::default());
    let mut scheduler = Scheduler::new();

    for step in 0..5 {
        let velocity = Vec2::new(step as f32, 0.0);
        scheduler
            .bind(ship, "move", move_until(ship, velocity, infinite()))
            .unwrap();
        scheduler
            .bind(ship, None::<&str>, delay_until(infinite()))
            .unwrap();
        assert_eq!(scheduler.len(), 2);
    }

    scheduler.tick(&mut sprites, 1.0);
    assert_eq!(sprites[ship].position.x, 4.0);
    assert!(scheduler.query(ship, "move"));
    assert!(scheduler.query(ship, None::<&str>));
    assert!(!scheduler.query(ship, "fire"));
}

#[test]
fn replaced_occupant_stops_before_new_action_starts() {
    let log = Log::default();
    let mut sprites = SpriteArena::new();
    let ship = sprites.insert(Sprite::default());
    let mut scheduler = Scheduler::new();

    let old = MoveUntil::new(ship, Vec2::X, infinite()).on_stop(log_stop(&log, "old"));
    scheduler.bind(ship, "move", old.boxed()).unwrap();

    let observer = Rc::clone(&log);
    let new = sequence(vec![
        sprite_actions::CallbackUntil::new(
            move || observer.borrow_mut().push("new:first_update".into()),
            after_frames(1),
        )
        .boxed(),
    ]);
    scheduler.bind(ship, "move", new).unwrap();
    assert_eq!(*log.borrow(), vec!["old:replaced".to_string()]);

    scheduler.tick(&mut sprites, 1.0);
    assert_eq!(
        *log.borrow(),
        vec!["old:replaced".to_string(), "new:first_update".to_string()]
    );
}

#[test]
fn repeated_stops_fire_on_stop_once() {
    let log = Log::default();
    let mut sprites = SpriteArena::new();
    let ship = sprites.insert(Sprite::default());
    let mut action = MoveUntil::new(ship, Vec2::X, infinite()).on_stop(log_stop(&log, "move"));
    action.start().unwrap();
    action.update(&mut sprites, 1.0).unwrap();

    for _ in 0..4 {
        action.stop();
    }

    assert_eq!(action.state(), ActionState::Cancelled);
    assert_eq!(*log.borrow(), vec!["move:cancelled".to_string()]);
}

#[test]
fn stop_after_done_keeps_done() {
    let log = Log::default();
    let mut sprites = SpriteArena::new();
    let mut action = sprite_actions::DelayUntil::new(after_frames(1)).on_stop(log_stop(&log, "wait"));
    action.start().unwrap();
    action.update(&mut sprites, 1.0).unwrap();
    action.stop();

    assert_eq!(action.state(), ActionState::Done);
    assert_eq!(*log.borrow(), vec!["wait:completed".to_string()]);
}

#[test]
fn pause_discards_frame_time_in_scheduler() {
    let mut sprites = SpriteArena::new();
    let ship = sprites.insert(Sprite::default());
    let mut scheduler = Scheduler::new();
    let id = scheduler
        .schedule(move_until(ship, Vec2::new(1.0, 0.0), infinite()))
        .unwrap();

    scheduler.tick(&mut sprites, 1.0);
    scheduler.pause(id).unwrap();
    for _ in 0..10 {
        scheduler.tick(&mut sprites, 1.0);
    }
    assert_eq!(scheduler.state(id), Some(ActionState::Paused));
    scheduler.resume(id).unwrap();
    scheduler.tick(&mut sprites, 1.0);

    assert_eq!(sprites[ship].position.x, 2.0);
}

#[test]
fn pause_all_and_resume_all() {
    let mut sprites = SpriteArena::new();
    let a = sprites.insert(Sprite::default());
    let b = sprites.insert(Sprite::default());
    let mut scheduler = Scheduler::new();
    scheduler.schedule(move_until(a, Vec2::X, infinite())).unwrap();
    scheduler.schedule(move_until(b, Vec2::Y, infinite())).unwrap();

    scheduler.pause_all().unwrap();
    scheduler.tick(&mut sprites, 1.0);
    scheduler.resume_all().unwrap();
    scheduler.tick(&mut sprites, 1.0);

    assert_eq!(sprites[a].position, Vec2::new(1.0, 0.0));
    assert_eq!(sprites[b].position, Vec2::new(0.0, 1.0));
}

#[test]
fn parallel_finishes_with_slowest_child() {
    let mut sprites = SpriteArena::new();
    let mut scheduler = Scheduler::new();
    let id = scheduler
        .schedule(parallel(vec![
            delay_until(after_frames(2)),
            delay_until(after_frames(4)),
            delay_until(after_frames(1)),
        ]))
        .unwrap();

    for _ in 0..3 {
        assert!(scheduler.tick(&mut sprites, 1.0).finished.is_empty());
    }
    let report = scheduler.tick(&mut sprites, 1.0);
    assert_eq!(report.finished, vec![(id, StopReason::Completed)]);
}

#[test]
fn repeat_with_count_below_three_starts_child_three_times() {
    let starts = Rc::new(RefCell::new(0));
    let counter = Rc::clone(&starts);
    let mut sprites = SpriteArena::new();
    let mut scheduler = Scheduler::new();
    scheduler
        .schedule(repeat(
            move || {
                *counter.borrow_mut() += 1;
                delay_until(after_frames(1))
            },
            |count| count < 3,
        ))
        .unwrap();

    for _ in 0..10 {
        scheduler.tick(&mut sprites, 1.0);
    }
    assert_eq!(*starts.borrow(), 3);
    assert!(scheduler.is_empty());
}

#[test]
fn vanished_target_cancels_only_its_action() {
    let log = Log::default();
    let mut sprites = SpriteArena::new();
    let doomed = sprites.insert(Sprite::default());
    let survivor = sprites.insert(Sprite::default());
    let mut scheduler = Scheduler::new();
    let doomed_id = scheduler
        .schedule(
            MoveUntil::new(doomed, Vec2::X, infinite())
                .on_stop(log_stop(&log, "doomed"))
                .boxed(),
        )
        .unwrap();
    scheduler.schedule(move_until(survivor, Vec2::X, infinite())).unwrap();

    sprites.remove(doomed);
    let report = scheduler.tick(&mut sprites, 1.0);

    assert!(report.is_clean());
    assert_eq!(report.finished, vec![(doomed_id, StopReason::TargetGone)]);
    assert_eq!(*log.borrow(), vec!["doomed:target_gone".to_string()]);
    assert_eq!(sprites[survivor].position.x, 1.0);
    assert_eq!(scheduler.len(), 1);
}

#[test]
fn faulting_action_is_isolated() {
    let mut sprites = SpriteArena::new();
    let ship = sprites.insert(Sprite::default());
    let mut scheduler = Scheduler::new();
    let broken = scheduler.schedule(Box::new(Broken::new())).unwrap();
    scheduler.schedule(move_until(ship, Vec2::X, infinite())).unwrap();

    let report = scheduler.tick(&mut sprites, 1.0);

    assert_eq!(report.faults.len(), 1);
    assert_eq!(report.faults[0].action, broken);
    assert!(matches!(report.faults[0].error, SchedulerError::Action(_)));
    assert_eq!(report.finished, vec![(broken, StopReason::Faulted)]);
    assert_eq!(sprites[ship].position.x, 1.0);
}

#[test]
fn faulting_action_survives_when_cancel_on_fault_is_off() {
    let mut sprites = SpriteArena::new();
    let config = EngineConfig {
        cancel_on_fault: false,
        ..EngineConfig::default()
    };
    let mut scheduler = Scheduler::with_config(config);
    let broken = scheduler.schedule(Box::new(Broken::new())).unwrap();

    scheduler.tick(&mut sprites, 1.0);
    let report = scheduler.tick(&mut sprites, 1.0);

    assert_eq!(report.faults.len(), 1);
    assert_eq!(scheduler.state(broken), Some(ActionState::Running));
}

#[test]
fn on_stop_can_chain_through_commands() {
    let mut sprites = SpriteArena::new();
    let ship = sprites.insert(Sprite::default());
    let mut scheduler = Scheduler::new();
    let commands = scheduler.commands();

    let first = MoveUntil::new(ship, Vec2::X, after_frames(2)).on_stop(move |reason| {
        if reason == StopReason::Completed {
            commands.bind(ship, "move", move_until(ship, Vec2::Y, infinite()));
        }
    });
    scheduler.bind(ship, "move", first.boxed()).unwrap();

    scheduler.tick(&mut sprites, 1.0);
    let report = scheduler.tick(&mut sprites, 1.0);

    assert_eq!(report.finished.len(), 1);
    assert!(scheduler.query(ship, "move"));
    assert_eq!(scheduler.len(), 1);

    scheduler.tick(&mut sprites, 1.0);
    assert_eq!(sprites[ship].position, Vec2::new(2.0, 1.0));
}

#[test]
fn stop_for_target_reaches_into_composites() {
    let log = Log::default();
    let mut sprites = SpriteArena::new();
    let gate = sprites.insert(Sprite::default());
    let other = sprites.insert(Sprite::default());
    let mut scheduler = Scheduler::new();

    let wave = sequence(vec![
        delay_until(after_frames(1)),
        MoveUntil::new(gate, Vec2::X, infinite())
            .on_stop(log_stop(&log, "gate"))
            .boxed(),
    ]);
    scheduler.schedule(wave).unwrap();
    scheduler.schedule(move_until(other, Vec2::X, infinite())).unwrap();

    scheduler.stop_for_target(gate);

    assert_eq!(scheduler.len(), 1);
    assert_eq!(*log.borrow(), vec!["gate:cancelled".to_string()]);
}

#[test]
fn unbind_and_stop_all() {
    let mut sprites = SpriteArena::new();
    let ship = sprites.insert(Sprite::default());
    let mut scheduler = Scheduler::new();
    scheduler.bind(ship, "move", move_until(ship, Vec2::X, infinite())).unwrap();
    scheduler.schedule(delay_until(infinite())).unwrap();

    scheduler.unbind(ship, "move");
    scheduler.unbind(ship, "move");
    assert!(!scheduler.query(ship, "move"));
    assert_eq!(scheduler.len(), 1);

    scheduler.stop_all();
    assert!(scheduler.is_empty());
}

#[test]
fn bounce_inside_scheduler_keeps_sprite_in_bounds() {
    let mut sprites = SpriteArena::new();
    let bar = sprites.insert(Sprite::at(5.0, 5.0));
    let mut scheduler = Scheduler::new();
    let bounds = Bounds::new(0.0, 0.0, 10.0, 10.0);
    scheduler
        .schedule(
            MoveUntil::new(bar, Vec2::new(3.0, -4.0), infinite())
                .with_bounds(bounds, BoundaryBehavior::Bounce)
                .boxed(),
        )
        .unwrap();

    for _ in 0..50 {
        scheduler.tick(&mut sprites, 1.0);
        let position = sprites[bar].position;
        assert!((0.0..=10.0).contains(&position.x), "x out of bounds: {position}");
        assert!((0.0..=10.0).contains(&position.y), "y out of bounds: {position}");
    }
}

#[test]
fn debug_events_follow_lifecycle() {
    let mut sprites = SpriteArena::new();
    let sink = RecordingSink::new();
    let mut scheduler = Scheduler::new().with_sink(sink.clone());
    scheduler.schedule(delay_until(after_frames(1))).unwrap();
    scheduler.tick(&mut sprites, 1.0);
    assert!(sink.events().is_empty());

    scheduler.set_debug(true);
    let id = scheduler.schedule(delay_until(after_frames(1))).unwrap();
    scheduler.tick(&mut sprites, 1.0);

    assert_eq!(
        sink.kinds_for(id),
        vec![
            EventKind::Created,
            EventKind::Started,
            EventKind::Stopped(StopReason::Completed),
        ]
    );
}

#[test]
fn dropping_scheduler_cancels_active_actions() {
    let log = Log::default();
    {
        let mut scheduler = Scheduler::new();
        scheduler
            .schedule(
                sprite_actions::DelayUntil::new(infinite())
                    .on_stop(log_stop(&log, "wait"))
                    .boxed(),
            )
            .unwrap();
    }
    assert_eq!(*log.borrow(), vec!["wait:cancelled".to_string()]);
}
