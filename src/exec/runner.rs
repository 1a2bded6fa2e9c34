//! Bounded execution of mutated worlds.
//!
//! Each world runs its entities on its own execution unit (thread). The
//! attempt blocks until every unit reports or the wall budget elapses;
//! on timeout the units are cancelled cooperatively and abandoned, never
//! killed. Worlds owned by abandoned units are lost and reported as
//! empty seats.

use crate::config::types::RunLimits;
use crate::world::{CancelToken, World};
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::thread;
use std::time::Instant;

/// Report from one execution unit, tagged with its world index.
struct UnitReport {
    index: usize,
    world: Box<dyn World>,
    fault: Option<String>,
}

/// Aggregate result of the run step.
pub struct RunReport {
    /// Worlds returned by their units, index-aligned. `None` marks a
    /// seat whose unit was abandoned on timeout.
    pub seats: Vec<Option<Box<dyn World>>>,
    /// Runtime faults by world index, learner-visible text included.
    pub faults: Vec<(usize, String)>,
    pub timed_out: bool,
    pub wall_time_ms: u64,
}

/// Run every world's entities concurrently under the wall budget.
///
/// Worlds are moved into their units and handed back through a channel;
/// a unit that outlives the budget keeps its world, and the caller
/// reseats that index from the Initial snapshot.
pub fn run_worlds(worlds: Vec<Box<dyn World>>, limits: &RunLimits) -> RunReport {
    let unit_count = worlds.len();
    let started = Instant::now();
    let cancel = CancelToken::new();
    let (report_tx, report_rx) = bounded::<UnitReport>(unit_count.max(1));

    for (index, mut world) in worlds.into_iter().enumerate() {
        let tx = report_tx.clone();
        let token = cancel.clone();
        thread::spawn(move || {
            let fault = run_unit(world.as_mut(), &token);
            // Receiver may already be gone if the attempt was abandoned.
            let _ = tx.send(UnitReport { index, world, fault });
        });
    }
    drop(report_tx);

    let mut seats: Vec<Option<Box<dyn World>>> = Vec::new();
    seats.resize_with(unit_count, || None);
    let mut faults = Vec::new();
    let mut reported = 0usize;

    let deadline = started + limits.wall_time;
    let timed_out = loop {
        if reported == unit_count {
            break false;
        }
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            break true;
        }
        match report_rx.recv_timeout(remaining) {
            Ok(report) => {
                absorb(&mut seats, &mut faults, report);
                reported += 1;
            }
            Err(RecvTimeoutError::Timeout) => break true,
            Err(RecvTimeoutError::Disconnected) => break false,
        }
    };

    if timed_out {
        cancel.cancel();
        log::warn!(
            "run exceeded its {}ms wall budget with {} of {unit_count} units still live",
            limits.wall_time.as_millis(),
            unit_count - reported
        );
        // Units racing the deadline may still report within the grace
        // window; everything after that is abandoned.
        let scooped = drain_grace(&report_rx, limits, &mut seats, &mut faults);
        if scooped > 0 {
            log::info!("{scooped} late unit(s) reported within the grace window");
        }
    }

    // Reports arrive in completion order; diagnostics are read in world
    // order.
    faults.sort_by_key(|(index, _)| *index);

    RunReport {
        seats,
        faults,
        timed_out,
        wall_time_ms: started.elapsed().as_millis() as u64,
    }
}

fn drain_grace(
    report_rx: &Receiver<UnitReport>,
    limits: &RunLimits,
    seats: &mut [Option<Box<dyn World>>],
    faults: &mut Vec<(usize, String)>,
) -> usize {
    let grace_deadline = Instant::now() + limits.grace;
    let mut scooped = 0;
    loop {
        let remaining = grace_deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return scooped;
        }
        match report_rx.recv_timeout(remaining) {
            Ok(report) => {
                absorb(seats, faults, report);
                scooped += 1;
            }
            Err(_) => return scooped,
        }
    }
}

fn absorb(
    seats: &mut [Option<Box<dyn World>>],
    faults: &mut Vec<(usize, String)>,
    report: UnitReport,
) {
    if let Some(message) = report.fault {
        faults.push((report.index, message));
    }
    seats[report.index] = Some(report.world);
}

/// Execute one world's entities in sequence. Stops at the first fault,
/// panic, or cancellation; entities are taken out so they can mutate the
/// world while running, and reattached before the world is returned.
fn run_unit(world: &mut dyn World, cancel: &CancelToken) -> Option<String> {
    let mut entities = world.take_entities();
    let mut fault = None;
    for entity in entities.iter_mut() {
        if cancel.is_cancelled() {
            break;
        }
        let outcome = catch_unwind(AssertUnwindSafe(|| entity.run(world, cancel)));
        match outcome {
            Ok(Ok(())) => {}
            Ok(Err(message)) => {
                fault = Some(message);
                break;
            }
            Err(panic) => {
                // World state after a panic is never graded.
                fault = Some(panic_text(panic.as_ref()));
                break;
            }
        }
    }
    world.set_entities(entities);
    fault
}

fn panic_text(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(text) = panic.downcast_ref::<&str>() {
        (*text).to_string()
    } else if let Some(text) = panic.downcast_ref::<String>() {
        text.clone()
    } else {
        "entity panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::fixtures::{
        CounterWorld, FaultEntity, PanicEntity, SpinEntity, StepEntity, StuckEntity,
    };
    use crate::world::Entity;
    use std::time::Duration;

    fn world_with(name: &str, entities: Vec<Box<dyn Entity>>) -> Box<dyn World> {
        let mut world: Box<dyn World> = Box::new(CounterWorld::new(name, 0));
        world.set_entities(entities);
        world
    }

    fn tight_limits() -> RunLimits {
        RunLimits {
            wall_time: Duration::from_millis(200),
            grace: Duration::from_millis(50),
        }
    }

    #[test]
    fn entities_mutate_their_own_world() {
        let worlds = vec![
            world_with("w0", vec![Box::new(StepEntity::adding(3)) as Box<dyn Entity>]),
            world_with(
                "w1",
                vec![
                    Box::new(StepEntity::adding(2)) as Box<dyn Entity>,
                    Box::new(StepEntity::adding(5)) as Box<dyn Entity>,
                ],
            ),
        ];
        let report = run_worlds(worlds, &RunLimits::default());

        assert!(!report.timed_out);
        assert!(report.faults.is_empty());
        let w0 = report.seats[0].as_ref().unwrap();
        let w1 = report.seats[1].as_ref().unwrap();
        assert_eq!(CounterWorld::value_of(w0.as_ref()), 3);
        assert_eq!(CounterWorld::value_of(w1.as_ref()), 7);
        assert_eq!(w1.entity_count(), 2);
    }

    #[test]
    fn faulting_entity_stops_its_unit_and_reports() {
        let worlds = vec![world_with(
            "w0",
            vec![
                Box::new(StepEntity::adding(1)) as Box<dyn Entity>,
                Box::new(FaultEntity::new("division by zero")) as Box<dyn Entity>,
                Box::new(StepEntity::adding(100)) as Box<dyn Entity>,
            ],
        )];
        let report = run_worlds(worlds, &RunLimits::default());

        assert!(!report.timed_out);
        assert_eq!(report.faults.len(), 1);
        assert_eq!(report.faults[0].0, 0);
        assert!(report.faults[0].1.contains("division by zero"));
        // The entity after the fault never ran.
        let world = report.seats[0].as_ref().unwrap();
        assert_eq!(CounterWorld::value_of(world.as_ref()), 1);
    }

    #[test]
    fn faults_are_reported_in_world_index_order() {
        // w0 faults late and w1 immediately, so the reports arrive in the
        // opposite order.
        let worlds = vec![
            world_with(
                "w0",
                vec![Box::new(FaultEntity::after(
                    "boom in w0",
                    Duration::from_millis(150),
                )) as Box<dyn Entity>],
            ),
            world_with(
                "w1",
                vec![Box::new(FaultEntity::new("boom in w1")) as Box<dyn Entity>],
            ),
        ];
        let report = run_worlds(worlds, &RunLimits::default());

        assert!(!report.timed_out);
        assert_eq!(report.faults.len(), 2);
        assert_eq!(report.faults[0].0, 0);
        assert!(report.faults[0].1.contains("boom in w0"));
        assert_eq!(report.faults[1].0, 1);
        assert!(report.faults[1].1.contains("boom in w1"));
    }

    #[test]
    fn panicking_entity_is_contained() {
        let worlds = vec![
            world_with("w0", vec![Box::new(PanicEntity) as Box<dyn Entity>]),
            world_with("w1", vec![Box::new(StepEntity::adding(4)) as Box<dyn Entity>]),
        ];
        let report = run_worlds(worlds, &RunLimits::default());

        assert!(!report.timed_out);
        assert_eq!(report.faults.len(), 1);
        assert_eq!(report.faults[0].0, 0);
        // The sibling unit is unaffected.
        let w1 = report.seats[1].as_ref().unwrap();
        assert_eq!(CounterWorld::value_of(w1.as_ref()), 4);
    }

    #[test]
    fn stuck_entity_times_out_within_budget() {
        let worlds = vec![world_with("w0", vec![Box::new(StuckEntity) as Box<dyn Entity>])];
        let started = Instant::now();
        let report = run_worlds(worlds, &tight_limits());
        let elapsed = started.elapsed();

        assert!(report.timed_out);
        assert!(report.seats[0].is_none());
        // Bounded: budget plus grace plus scheduling slack, not the
        // entity's own (infinite) runtime.
        assert!(elapsed < Duration::from_secs(5));
    }

    #[test]
    fn cancelled_units_may_report_within_grace() {
        // SpinEntity honors the cancel token, so its unit returns the
        // world just after the deadline, inside the grace window.
        let worlds = vec![world_with("w0", vec![Box::new(SpinEntity) as Box<dyn Entity>])];
        let report = run_worlds(
            worlds,
            &RunLimits {
                wall_time: Duration::from_millis(100),
                grace: Duration::from_secs(2),
            },
        );

        assert!(report.timed_out);
        assert!(report.seats[0].is_some());
    }

    #[test]
    fn finished_units_keep_their_seats_on_timeout() {
        let worlds = vec![
            world_with("w0", vec![Box::new(StepEntity::adding(9)) as Box<dyn Entity>]),
            world_with("w1", vec![Box::new(StuckEntity) as Box<dyn Entity>]),
        ];
        let report = run_worlds(worlds, &tight_limits());

        assert!(report.timed_out);
        let w0 = report.seats[0].as_ref().unwrap();
        assert_eq!(CounterWorld::value_of(w0.as_ref()), 9);
        assert!(report.seats[1].is_none());
    }

    #[test]
    fn empty_world_list_finishes_immediately() {
        let report = run_worlds(Vec::new(), &tight_limits());
        assert!(!report.timed_out);
        assert!(report.seats.is_empty());
        assert!(report.faults.is_empty());
    }
}
