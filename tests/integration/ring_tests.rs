//! Four-node ring over in-process channels.
//!
//! The relay tests step each node by hand on one thread. The threaded test
//! runs every peripheral on its own thread against the wall clock, with
//! timeouts generous enough for a loaded CI host.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

use rand::SeedableRng;
use rand::rngs::StdRng;

use lullaby::adapters::channel::{self, ChannelTransport};
use lullaby::adapters::hardware::BenchHardware;
use lullaby::adapters::time::MonotonicClock;
use lullaby::app::peripheral::{PeripheralNode, Role};
use lullaby::app::service::ControllerService;
use lullaby::bus::client::SensorQueryClient;
use lullaby::bus::codec::NodeId;
use lullaby::bus::ring::{Received, RingNode};
use lullaby::config::{BusConfig, SystemConfig};
use lullaby::control::grid::GridCell;

use crate::mock_hw::RecordingSink;

fn relaxed_bus() -> BusConfig {
    BusConfig {
        byte_timeout_ms: 200,
        query_timeout_ms: 1000,
        ..BusConfig::default()
    }
}

fn nodes() -> Vec<RingNode<ChannelTransport, MonotonicClock>> {
    let bus = relaxed_bus();
    channel::ring(NodeId::ALL.len())
        .into_iter()
        .zip(NodeId::ALL)
        .map(|(link, id)| RingNode::new(id, link, MonotonicClock::new(), &bus))
        .collect()
}

#[test]
fn frame_for_motor_is_relayed_by_both_sensor_nodes() {
    let mut ring = nodes();
    ring[0].send(NodeId::Motor, NodeId::Master, b"M\x02\x03").unwrap();

    assert_eq!(
        ring[1].receive().unwrap(),
        Received::Forwarded {
            dst: NodeId::Motor.addr(),
            len: 3
        }
    );
    assert!(matches!(ring[2].receive().unwrap(), Received::Forwarded { .. }));
    match ring[3].receive().unwrap() {
        Received::Delivered(frame) => {
            assert_eq!(frame.src, NodeId::Master);
            assert_eq!(frame.payload.as_slice(), b"M\x02\x03");
        }
        other => panic!("expected delivery, got {other:?}"),
    }
    assert_eq!(ring[1].stats().forwarded, 1);
    assert_eq!(ring[3].stats().delivered, 1);
}

#[test]
fn reply_travels_the_rest_of_the_ring_to_master() {
    let mut ring = nodes();
    // Heartbeat answers the master: 1 -> 2 -> 3 -> 0.
    ring[1].send(NodeId::Master, NodeId::Heartbeat, b"H\x78").unwrap();
    assert!(matches!(ring[2].receive().unwrap(), Received::Forwarded { .. }));
    assert!(matches!(ring[3].receive().unwrap(), Received::Forwarded { .. }));
    match ring[0].receive().unwrap() {
        Received::Delivered(frame) => {
            assert_eq!(frame.src, NodeId::Heartbeat);
            assert_eq!(frame.payload.as_slice(), b"H\x78");
        }
        other => panic!("expected delivery, got {other:?}"),
    }
}

#[test]
fn threaded_ring_serves_master() {
    let mut links = channel::ring(NodeId::ALL.len());
    let stop = Arc::new(AtomicBool::new(false));
    let config = SystemConfig {
        bus: relaxed_bus(),
        ..SystemConfig::default()
    };

    let mut handles = Vec::new();
    for role in [Role::Motor, Role::Crying, Role::Heartbeat] {
        let link = links.pop().unwrap();
        let stop = Arc::clone(&stop);
        let bus = config.bus.clone();
        handles.push(thread::spawn(move || {
            let node = RingNode::new(role.node_id(), link, MonotonicClock::new(), &bus);
            let mut peripheral = PeripheralNode::with_rng(role, node, StdRng::seed_from_u64(1));
            let mut hw = BenchHardware::new(180, 80);
            peripheral.run(&mut hw, &mut RecordingSink::new(), &stop);
            (role, hw)
        }));
    }

    let node = RingNode::new(NodeId::Master, links.pop().unwrap(), MonotonicClock::new(), &config.bus);
    let client = SensorQueryClient::new(node, config.bus.query_timeout());
    let mut service = ControllerService::new(client, &config);
    let mut sink = RecordingSink::new();

    assert!(service.boot(&mut sink).all_alive());
    let check = service.comm_check(&mut StdRng::seed_from_u64(5), &mut sink);
    assert!(check.passed());

    let first = service.cycle(&mut sink);
    assert_eq!(first.readings, Some((180, 80)));
    // Readings never change, so the second cycle sees a steady Left and
    // tries Up from the boot cell.
    let second = service.cycle(&mut sink);
    assert_eq!(second.readings, Some((180, 80)));

    // The motor handles frames in order; its pong means every earlier
    // command has been applied.
    service.client_mut().ping(NodeId::Motor).unwrap();

    stop.store(true, Ordering::Relaxed);
    let mut motor_cells = Vec::new();
    for handle in handles {
        let (role, hw) = handle.join().unwrap();
        if role == Role::Motor {
            motor_cells = hw.actuations().to_vec();
        } else {
            assert!(hw.actuations().is_empty());
        }
    }

    assert_eq!(
        motor_cells,
        vec![
            check.motor.unwrap(),
            GridCell::new(4, 3).unwrap(),
            GridCell::new(3, 4).unwrap(),
        ]
    );
    assert_eq!(service.stale_cycles(), 0);
}
