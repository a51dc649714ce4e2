//! ControllerService over real frames against the simulated ring.
//!
//! Every query and motor command is encoded, decoded by the mock ring,
//! answered from the plant and decoded again by the master, so these tests
//! cover client, codec, ring and controller together.

use std::cell::RefCell;
use std::rc::Rc;

use rand::SeedableRng;
use rand::rngs::StdRng;

use lullaby::adapters::time::ManualClock;
use lullaby::app::events::AppEvent;
use lullaby::app::service::ControllerService;
use lullaby::bus::client::SensorQueryClient;
use lullaby::bus::codec::NodeId;
use lullaby::bus::ring::RingNode;
use lullaby::config::SystemConfig;
use lullaby::control::grid::GridCell;
use lullaby::safety::PanicCause;
use lullaby::sim::SimConfig;
use lullaby::sim::plant::Plant;

use crate::mock_hw::{
    RANDOM_VALUE, RecordingSink, SimulatedRing, diagonal_levels, gentle_plant, linear_table, overloaded_plant,
};

fn master(ring: SimulatedRing) -> ControllerService<SimulatedRing, ManualClock> {
    let config = SystemConfig::default();
    let node = RingNode::new(NodeId::Master, ring, ManualClock::new(), &config.bus);
    let client = SensorQueryClient::new(node, config.bus.query_timeout());
    ControllerService::new(client, &config)
}

fn cell(amp: u8, freq: u8) -> GridCell {
    GridCell::new(amp, freq).unwrap()
}

fn motor_log(service: &ControllerService<SimulatedRing, ManualClock>) -> Vec<GridCell> {
    service.client().node().transport().motor_log.clone()
}

/// Let one feedback delay of plant history build up before the first read.
fn warm_up(plant: &Rc<RefCell<Plant>>) {
    plant.borrow_mut().advance(SimConfig::default().tau);
}

#[test]
fn boot_finds_every_peripheral() {
    let mut service = master(SimulatedRing::new(gentle_plant()));
    let mut sink = RecordingSink::new();

    let report = service.boot(&mut sink);

    assert!(report.all_alive());
    assert_eq!(sink.events[0], AppEvent::Started { node: NodeId::Master });
    for node in NodeId::PERIPHERALS {
        assert!(sink.events.contains(&AppEvent::NodeStatus { node, alive: true }));
    }
}

#[test]
fn boot_reports_a_silent_node() {
    let ring = SimulatedRing::new(gentle_plant()).muting(NodeId::Crying);
    let mut service = master(ring);
    let mut sink = RecordingSink::new();

    let report = service.boot(&mut sink);

    assert!(report.heartbeat);
    assert!(!report.crying);
    assert!(report.motor);
    assert!(sink.events.contains(&AppEvent::NodeStatus {
        node: NodeId::Crying,
        alive: false
    }));
}

#[test]
fn comm_check_queries_sensors_and_moves_motor() {
    let mut service = master(SimulatedRing::new(gentle_plant()));
    let mut sink = RecordingSink::new();

    let report = service.comm_check(&mut StdRng::seed_from_u64(9), &mut sink);

    assert!(report.passed());
    assert_eq!(report.heartbeat, Some(RANDOM_VALUE));
    assert_eq!(report.crying, Some(RANDOM_VALUE));
    assert_eq!(motor_log(&service), vec![report.motor.unwrap()]);
    assert_eq!(sink.events.last(), Some(&AppEvent::CommCheck(report)));
}

#[test]
fn controller_walks_plant_to_rest_over_the_bus() {
    let plant = gentle_plant();
    warm_up(&plant);
    let mut service = master(SimulatedRing::new(Rc::clone(&plant)));
    let mut sink = RecordingSink::new();

    for _ in 0..SimConfig::default().max_steps {
        let report = service.cycle(&mut sink);
        assert!(report.readings.is_some());
        plant.borrow_mut().advance(report.dwell.as_secs_f64());
        let p = plant.borrow();
        if p.cell() == GridCell::SAFEST && p.level() == 1 {
            break;
        }
    }

    assert_eq!(
        motor_log(&service),
        vec![
            cell(4, 3),
            cell(4, 2),
            cell(4, 1),
            cell(4, 0),
            cell(3, 0),
            cell(2, 0),
            cell(1, 0),
            GridCell::SAFEST,
        ]
    );
    assert_eq!(service.cycles(), 8);
    assert_eq!(service.stale_cycles(), 0);
    assert!(!service.search().is_panicked());
    assert!(!plant.borrow().panicked());
    assert_eq!(sink.count(|e| matches!(e, AppEvent::Commanded { .. })), 8);
    assert_eq!(sink.count(|e| matches!(e, AppEvent::Status(_))), 8);
}

#[test]
fn silent_heartbeat_node_leaves_crying_in_charge() {
    let plant = gentle_plant();
    warm_up(&plant);
    let mut service = master(SimulatedRing::new(plant).muting(NodeId::Heartbeat));
    let mut sink = RecordingSink::new();

    let report = service.cycle(&mut sink);

    // No heart rate has ever arrived, so the controller sees 0 bpm.
    assert!(report.stale_heartbeat);
    assert!(!report.stale_crying);
    assert_eq!(report.readings, Some((0, 100)));
    assert!(report.decision.is_some());
    assert_eq!(report.dwell, SystemConfig::default().cadence.crying_dwell());
    assert_eq!(service.stale_cycles(), 1);
    assert!(sink.events.contains(&AppEvent::ReadingStale {
        node: NodeId::Heartbeat
    }));
    assert_eq!(motor_log(&service), vec![cell(4, 3)]);
}

#[test]
fn silent_crying_node_does_not_mask_a_heart_rate_panic() {
    // Sopt[9] = 99 reads as 238 bpm.
    let plant = Rc::new(RefCell::new(Plant::from_levels(
        linear_table(11.0),
        diagonal_levels(),
        &SimConfig::default(),
    )));
    warm_up(&plant);
    let mut service = master(SimulatedRing::new(Rc::clone(&plant)).muting(NodeId::Crying));
    let mut sink = RecordingSink::new();

    for _ in 0..3 {
        let report = service.cycle(&mut sink);
        assert!(report.stale_crying);
        assert_eq!(report.readings.map(|(bpm, _)| bpm), Some(238));
        plant.borrow_mut().advance(report.dwell.as_secs_f64());
    }

    assert!(service.search().is_panicked());
    assert_eq!(motor_log(&service), vec![GridCell::SAFEST; 3]);
    assert_eq!(sink.count(|e| matches!(e, AppEvent::PanicEntered(_))), 1);
    assert!(sink.events.contains(&AppEvent::PanicEntered(PanicCause::VeryHighHeartRate {
        bpm: 238
    })));
    assert_eq!(service.stale_cycles(), 3);
}

#[test]
fn overload_latches_panic_and_holds_safest() {
    let plant = overloaded_plant();
    warm_up(&plant);
    let mut service = master(SimulatedRing::new(Rc::clone(&plant)));
    let mut sink = RecordingSink::new();

    for _ in 0..3 {
        let report = service.cycle(&mut sink);
        plant.borrow_mut().advance(report.dwell.as_secs_f64());
    }

    assert!(service.search().is_panicked());
    assert_eq!(motor_log(&service), vec![GridCell::SAFEST; 3]);
    assert_eq!(
        sink.count(|e| matches!(e, AppEvent::PanicEntered(_))),
        1,
        "panic is announced once"
    );
    assert!(sink.events.contains(&AppEvent::PanicEntered(PanicCause::CryingOverload {
        bpm: 222,
        cry: 100
    })));
}
