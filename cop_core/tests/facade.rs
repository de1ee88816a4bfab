use cop_core::mocks::ReadOnlyConnector;
use cop_core::{
    ConnectionState, ConsoleError, ControlFacade, Frame, LiveView, Updates, ViewCfg, WeightReading,
    WorkerCfg, WorkerState,
};
use cop_serial::{SIM_PORT, SimulatedConnector};
use rstest::rstest;
use std::time::{Duration, Instant};

const PROMPT: &str = "Enter the weight in lbs:";

fn cfg() -> WorkerCfg {
    WorkerCfg {
        read_timeout: Duration::from_millis(20),
        calibration_prompt: PROMPT.to_string(),
    }
}

fn wait_state<C>(f: &ControlFacade<C>, want: ConnectionState) -> bool
where
    C: cop_traits::Connector + Send + Sync + 'static,
{
    let deadline = Instant::now() + Duration::from_secs(2);
    while Instant::now() < deadline {
        if f.state() == want {
            return true;
        }
        std::thread::sleep(Duration::from_millis(2));
    }
    false
}

/// Drain until `done` holds for the accumulated updates or two seconds pass.
fn drain_until<C>(f: &ControlFacade<C>, done: impl Fn(&Updates) -> bool) -> Updates
where
    C: cop_traits::Connector + Send + Sync + 'static,
{
    let mut acc = Updates::default();
    let deadline = Instant::now() + Duration::from_secs(2);
    while Instant::now() < deadline {
        let u = f.drain_updates();
        acc.logs.extend(u.logs);
        acc.frames.extend(u.frames);
        if done(&acc) {
            break;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    acc
}

fn messages(u: &Updates) -> Vec<&str> {
    u.logs.iter().map(|e| e.message.as_str()).collect()
}

#[test]
fn scripted_session_end_to_end() {
    let conn = SimulatedConnector::scripted(["1.00,2.00,3.00,4.00", "(0.500, -0.250)", "garbage"]);
    let mut facade = ControlFacade::new(conn, cfg());
    facade.connect(SIM_PORT);

    let updates = drain_until(&facade, |u| u.frames.len() == 3);
    assert_eq!(
        updates.frames,
        vec![
            Frame::Weights(WeightReading {
                a: 1.0,
                b: 2.0,
                c: 3.0,
                d: 4.0
            }),
            Frame::Cop { x: 0.5, y: -0.25 },
            Frame::Unrecognized {
                raw: "garbage".to_string()
            },
        ]
    );
    assert_eq!(facade.state(), ConnectionState::Connected);

    let mut view = LiveView::new(ViewCfg::default());
    view.apply(updates);
    assert_eq!(
        view.latest_weights().map(|w| w.as_array()),
        Some([1.0, 2.0, 3.0, 4.0])
    );
    assert_eq!(view.latest_cop(), Some((0.5, -0.25)));
    assert_eq!(view.history().snapshot(), vec![(0.5, -0.25)]);
    assert!(view.log_lines().any(|l| l == "Received: garbage"));

    facade.shutdown();
    assert_eq!(facade.state(), ConnectionState::Disconnected);
}

#[test]
fn calibration_replies_exactly_once() {
    let conn = SimulatedConnector::scripted(Vec::<String>::new());
    let mut facade = ControlFacade::new(conn, cfg());
    facade.connect(SIM_PORT);
    assert!(wait_state(&facade, ConnectionState::Connected));

    facade.start_calibration("5").unwrap();
    assert!(facade.calibration_pending());
    facade.connector().push_line("Place weight. Enter the weight in lbs:");
    facade.connector().push_line("Enter the weight in lbs:");

    let updates = drain_until(&facade, |u| u.frames.len() == 2);
    assert!(!facade.calibration_pending());
    assert_eq!(
        facade.connector().written(),
        vec![b"k".to_vec(), b"5\n".to_vec()]
    );
    let msgs = messages(&updates);
    assert!(msgs.contains(&"Sent: k"));
    assert!(msgs.contains(&"Sent calibration weight: 5"));
    assert_eq!(
        msgs.iter().filter(|m| m.starts_with("Sent") && m.ends_with('5')).count(),
        1,
        "one log entry per calibration reply: {msgs:?}"
    );
    // Prompt lines still reach the presentation layer.
    assert!(
        updates
            .frames
            .iter()
            .all(|f| matches!(f, Frame::Unrecognized { .. }))
    );
}

#[test]
fn synthetic_plate_completes_calibration() {
    let conn = SimulatedConnector::synthetic();
    let mut facade = ControlFacade::new(conn, cfg());
    facade.connect(SIM_PORT);
    assert!(wait_state(&facade, ConnectionState::Connected));

    facade.start_calibration(" 10.5 ").unwrap();
    let updates = drain_until(&facade, |u| {
        u.frames
            .iter()
            .any(|f| matches!(f, Frame::Unrecognized { raw } if raw.contains("Calibration complete")))
    });
    assert!(
        updates
            .frames
            .iter()
            .any(|f| matches!(f, Frame::Unrecognized { raw } if raw == "Calibration complete for 10.5 lbs."))
    );
    assert_eq!(
        facade.connector().written(),
        vec![b"k".to_vec(), b"10.5\n".to_vec()]
    );
}

#[rstest]
#[case("stream_cop")]
#[case("tare")]
fn send_while_disconnected_logs_and_writes_nothing(#[case] name: &str) {
    let conn = SimulatedConnector::scripted(Vec::<String>::new());
    let facade = ControlFacade::new(conn, cfg());

    assert_eq!(facade.send_command(name), Err(ConsoleError::NotConnected));
    assert_eq!(
        facade.start_calibration("5"),
        Err(ConsoleError::NotConnected)
    );
    assert!(facade.connector().written().is_empty());
    assert_eq!(
        messages(&facade.drain_updates()),
        vec!["Not connected.", "Not connected."]
    );
}

#[rstest]
#[case("stream_weights", b"r")]
#[case("stream_cop", b"c")]
#[case("stop", b"s")]
#[case("tare", b"z")]
fn named_commands_write_one_byte(#[case] name: &str, #[case] byte: &[u8]) {
    let conn = SimulatedConnector::scripted(Vec::<String>::new());
    let mut facade = ControlFacade::new(conn, cfg());
    facade.connect(SIM_PORT);
    assert!(wait_state(&facade, ConnectionState::Connected));

    facade.send_command(name).unwrap();
    assert_eq!(facade.connector().written(), vec![byte.to_vec()]);
}

#[test]
fn unknown_command_and_bad_weight_are_rejected() {
    let conn = SimulatedConnector::scripted(Vec::<String>::new());
    let mut facade = ControlFacade::new(conn, cfg());
    facade.connect(SIM_PORT);
    assert!(wait_state(&facade, ConnectionState::Connected));
    facade.drain_updates();

    assert!(matches!(
        facade.send_command("launch"),
        Err(ConsoleError::UnknownCommand(_))
    ));
    assert!(matches!(
        facade.start_calibration("heavy"),
        Err(ConsoleError::InvalidCommandInput(_))
    ));
    assert!(!facade.calibration_pending());
    assert!(facade.connector().written().is_empty());
    assert_eq!(
        messages(&facade.drain_updates()),
        vec![
            "Unknown command: launch",
            "Error: Invalid calibration weight. Please enter a number."
        ]
    );
}

#[test]
fn failed_connect_faults_then_retry_succeeds() {
    let mut facade = ControlFacade::new(SimulatedConnector::scripted(Vec::<String>::new()), cfg());
    facade.connect("/dev/ttyUSB7");
    assert!(wait_state(&facade, ConnectionState::Faulted));
    let msgs = drain_until(&facade, |u| !u.logs.is_empty());
    assert!(messages(&msgs)[0].starts_with("Error: Failed to connect to /dev/ttyUSB7."));

    facade.connect(SIM_PORT);
    assert!(wait_state(&facade, ConnectionState::Connected));
    assert_eq!(facade.port(), Some(SIM_PORT));
}

#[test]
fn second_connect_is_a_noop() {
    let mut facade = ControlFacade::new(SimulatedConnector::scripted(Vec::<String>::new()), cfg());
    facade.connect(SIM_PORT);
    assert!(wait_state(&facade, ConnectionState::Connected));
    facade.connect(SIM_PORT);

    assert_eq!(facade.connector().open_count(), 1);
    let updates = drain_until(&facade, |u| u.logs.len() >= 2);
    assert!(messages(&updates).contains(&"Already connected to sim0."));
}

#[test]
fn empty_port_asks_for_selection() {
    let mut facade = ControlFacade::new(SimulatedConnector::scripted(Vec::<String>::new()), cfg());
    facade.connect("  ");
    assert_eq!(facade.state(), ConnectionState::Disconnected);
    assert_eq!(
        messages(&facade.drain_updates()),
        vec!["Please select a port first."]
    );
}

#[test]
fn disconnect_releases_and_allows_reconnect() {
    let mut facade = ControlFacade::new(SimulatedConnector::scripted(Vec::<String>::new()), cfg());
    facade.disconnect();
    assert_eq!(facade.state(), ConnectionState::Disconnected);

    facade.connect(SIM_PORT);
    assert!(wait_state(&facade, ConnectionState::Connected));
    facade.disconnect();
    assert_eq!(facade.state(), ConnectionState::Disconnected);
    let deadline = Instant::now() + Duration::from_secs(2);
    while facade.worker_state() != Some(WorkerState::Stopped) && Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(2));
    }
    let updates = drain_until(&facade, |u| {
        u.logs.iter().any(|e| e.message == "Serial connection closed.")
    });
    assert!(messages(&updates).contains(&"Serial connection closed."));

    facade.connect(SIM_PORT);
    assert!(wait_state(&facade, ConnectionState::Connected));
    assert_eq!(facade.connector().open_count(), 2);
}

#[test]
fn reconnect_is_refused_until_previous_worker_stops() {
    let slow = WorkerCfg {
        read_timeout: Duration::from_millis(300),
        ..cfg()
    };
    let mut facade = ControlFacade::new(SimulatedConnector::scripted(Vec::<String>::new()), slow);
    facade.connect(SIM_PORT);
    assert!(wait_state(&facade, ConnectionState::Connected));

    // The reader is parked in a 300 ms read, so the stop is still pending.
    facade.disconnect();
    facade.connect(SIM_PORT);
    assert_eq!(facade.worker_state(), Some(WorkerState::Stopping));
    assert_eq!(facade.connector().open_count(), 1);
    let updates = drain_until(&facade, |u| {
        u.logs.iter().any(|e| e.message.contains("still closing"))
    });
    assert!(
        messages(&updates)
            .contains(&"Connection to sim0 is still closing; try again shortly.")
    );

    let deadline = Instant::now() + Duration::from_secs(2);
    while facade.worker_state() != Some(WorkerState::Stopped) && Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(5));
    }
    facade.connect(SIM_PORT);
    assert!(wait_state(&facade, ConnectionState::Connected));
    assert_eq!(facade.connector().open_count(), 2);
}

#[test]
fn port_enumeration() {
    let facade = ControlFacade::new(
        SimulatedConnector::scripted(Vec::<String>::new()).with_ports(["sim0", "sim1"]),
        cfg(),
    );
    assert_eq!(facade.list_available_ports(), vec!["sim0", "sim1"]);

    let broken = ControlFacade::new(ReadOnlyConnector, cfg());
    assert!(broken.list_available_ports().is_empty());
    assert_eq!(broken.drain_updates().logs.len(), 1);
}
