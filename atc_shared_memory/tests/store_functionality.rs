//! Integration tests exercising the shared-memory fabric with the real
//! ATC wire types, the way the subsystem processes use it.

use atc::geometry::Vec3;
use atc::wire::{
    Ack, CommandKind, CommandRecord, DisplayKind, DisplayRecord, FleetSnapshot, OperatorReply,
    OperatorRequest, OperatorRequestKind, UserCommandKind,
};
use atc_shared_memory::{
    CommandRing, MailboxClient, MailboxServer, ShmError, SlotReader, SlotWriter,
};
use std::time::Duration;

fn unique(name: &str) -> String {
    format!("{name}_{}", std::process::id())
}

#[test]
fn fleet_snapshot_publication() {
    let name = unique("it_fleet");
    let mut writer = SlotWriter::<FleetSnapshot>::create(&name).unwrap();
    let mut reader = SlotReader::<FleetSnapshot>::attach(&name).unwrap();

    // Zero-filled slot reads as an empty snapshot before the first publish.
    assert_eq!(reader.read().unwrap().len(), 0);

    let mut snapshot = FleetSnapshot::empty();
    snapshot.push(
        1,
        Vec3::new(10_000.0, 20_000.0, 5_000.0),
        Vec3::new(100.0, 50.0, 0.0),
        1000,
    );
    snapshot.push(
        2,
        Vec3::new(30_000.0, 40_000.0, 7_000.0),
        Vec3::new(-50.0, 100.0, 0.0),
        1000,
    );
    writer.publish(&snapshot);

    let read_back = reader.read().unwrap();
    assert_eq!(read_back.len(), 2);
    for i in 0..read_back.len() {
        assert_eq!(
            read_back.positions[i].plane_id,
            read_back.velocities[i].plane_id
        );
    }
    let (p, v) = read_back.find(2).unwrap();
    assert_eq!(p.position(), Vec3::new(30_000.0, 40_000.0, 7_000.0));
    assert_eq!(v.velocity(), Vec3::new(-50.0, 100.0, 0.0));
}

#[test]
fn snapshot_readers_see_monotone_fleet() {
    let name = unique("it_mono");
    let mut writer = SlotWriter::<FleetSnapshot>::create(&name).unwrap();

    let reader_thread = {
        let name = name.clone();
        std::thread::spawn(move || {
            let mut reader = SlotReader::<FleetSnapshot>::attach(&name).unwrap();
            let mut last_ts = 0i64;
            for _ in 0..500 {
                let snap = reader.read().unwrap();
                if snap.len() > 0 {
                    // Writer stamps all entries with the same, growing
                    // timestamp; coherence would break on a torn read.
                    let ts = snap.positions[0].timestamp;
                    for i in 0..snap.len() {
                        assert_eq!(snap.positions[i].timestamp, ts);
                        assert_eq!(snap.velocities[i].timestamp, ts);
                    }
                    assert!(ts >= last_ts, "older snapshot observed after newer");
                    last_ts = ts;
                }
            }
        })
    };

    for tick in 1..=500i64 {
        let mut snapshot = FleetSnapshot::empty();
        for id in 0..6 {
            snapshot.push(
                id,
                Vec3::new(1000.0 * tick as f64, 0.0, 5000.0),
                Vec3::new(100.0, 0.0, 0.0),
                tick,
            );
        }
        writer.publish(&snapshot);
    }
    reader_thread.join().unwrap();
}

#[test]
fn command_bus_between_threads() {
    let name = unique("it_bus");
    let ring = std::sync::Arc::new(CommandRing::create(&name).unwrap());

    // Producer side fills the ring to capacity; the tenth push must be
    // refused without blocking.
    for i in 0..9 {
        ring.enqueue(&CommandRecord::new(
            i,
            CommandKind::SetVelocity,
            Vec3::new(0.0, 100.0, 0.0),
            i as i64,
        ))
        .unwrap();
    }
    assert!(matches!(
        ring.enqueue(&CommandRecord::new(
            9,
            CommandKind::SetVelocity,
            Vec3::ZERO,
            9
        )),
        Err(ShmError::QueueFull)
    ));

    // Consumer drains in FIFO order through a second attach, as the
    // relay process would.
    let consumer = {
        let name = name.clone();
        std::thread::spawn(move || {
            let ring = CommandRing::attach(&name).unwrap();
            let mut drained = Vec::new();
            while let Some(cmd) = ring.dequeue() {
                drained.push(cmd.plane_id);
            }
            drained
        })
    };
    let drained = consumer.join().unwrap();
    assert_eq!(drained, (0..9).collect::<Vec<_>>());
}

#[test]
fn operator_mailbox_protocol() {
    let name = unique("it_opmbx");
    let mut server = MailboxServer::<OperatorRequest, OperatorReply>::create(&name).unwrap();
    let mut client = MailboxClient::<OperatorRequest, OperatorReply>::attach(&name).unwrap();

    // Server mimics the operator console: one pending command, then
    // NONE, then an alert acknowledgement.
    let server_thread = std::thread::spawn(move || {
        let mut pending = vec![OperatorReply::set_velocity(1, Vec3::new(0.0, 100.0, 0.0))];
        let mut alerts: Vec<OperatorRequest> = Vec::new();
        let mut served = 0;
        while served < 3 {
            if let Some(request) = server.try_receive() {
                match request.request_kind() {
                    Some(OperatorRequestKind::GetUserCommand) => {
                        let reply = pending.pop().unwrap_or_else(OperatorReply::none);
                        server.reply(&reply);
                    }
                    Some(OperatorRequestKind::Alert) => {
                        alerts.push(request);
                        server.reply(&OperatorReply::none());
                    }
                    None => server.reply(&OperatorReply::none()),
                }
                served += 1;
            } else {
                std::thread::sleep(Duration::from_millis(1));
            }
        }
        alerts
    });

    let first = client.call(&OperatorRequest::get_user_command()).unwrap();
    assert_eq!(first.user_command_kind(), Some(UserCommandKind::SetVelocity));
    assert_eq!(first.plane_id, 1);
    assert_eq!(first.velocity, [0.0, 100.0, 0.0]);

    let second = client.call(&OperatorRequest::get_user_command()).unwrap();
    assert_eq!(second.user_command_kind(), Some(UserCommandKind::None));

    let ack = client.call(&OperatorRequest::alert(1, 2, 42.0)).unwrap();
    assert_eq!(ack.user_command_kind(), Some(UserCommandKind::None));

    let alerts = server_thread.join().unwrap();
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].plane1, 1);
    assert_eq!(alerts[0].plane2, 2);
    assert_eq!(alerts[0].seconds_to_closest, 42.0);
}

#[test]
fn display_mailbox_carries_full_records() {
    let name = unique("it_dispmbx");
    let mut server = MailboxServer::<DisplayRecord, Ack>::create(&name).unwrap();
    let mut client = MailboxClient::<DisplayRecord, Ack>::attach(&name).unwrap();

    let mut snapshot = FleetSnapshot::empty();
    snapshot.push(3, Vec3::new(12_000.0, 8_000.0, 9_000.0), Vec3::new(5.0, 6.0, 7.0), 0);

    let server_thread = std::thread::spawn(move || {
        loop {
            if let Some(record) = server.try_receive() {
                server.reply(&Ack::ok());
                return record;
            }
            std::thread::sleep(Duration::from_millis(1));
        }
    });

    let record = DisplayRecord::from_snapshot(DisplayKind::Grid, &snapshot);
    let ack = client.call(&record).unwrap();
    assert_eq!(ack.status, 1);

    let received = server_thread.join().unwrap();
    assert_eq!(received.display_kind(), Some(DisplayKind::Grid));
    assert_eq!(received.len(), 1);
    assert_eq!(received.ids[0], 3);
    assert_eq!(received.positions[0], [12_000.0, 8_000.0, 9_000.0]);
}
