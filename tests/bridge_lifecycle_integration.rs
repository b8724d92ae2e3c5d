//! Integration tests for the read loop lifecycle
//!
//! These tests drive a bridge over a mock link:
//! - Framed gateway output reaching the right channels
//! - Node discovery from `acking` and `nodeok`
//! - Shutdown and link loss

mod common;

use common::builders::LineScriptBuilder;
use common::mock_helpers::create_memory_bridge;
use lightmon::controller::{MonitorController, NO_RESPONSE};
use lightmon::LinkState;
use std::thread;
use std::time::Duration;

#[test]
fn test_bridge_spawn_and_shutdown() {
    let mock = create_memory_bridge();
    let handle = mock.handle.clone();
    let join = mock.bridge.spawn().unwrap();

    thread::sleep(Duration::from_millis(50));
    handle.shutdown();

    let state = join.join().expect("read loop should exit cleanly");
    assert_eq!(state, LinkState::Stopped);
    assert!(!handle.is_running());
}

#[test]
fn test_framed_output_is_routed() {
    let mock = create_memory_bridge();
    let handle = mock.handle.clone();
    let join = mock.bridge.spawn().unwrap();

    LineScriptBuilder::new()
        .with_prompt()
        .colored()
        .status("1", "120")
        .result("2", "pass")
        .logged("PASS", 1_700_000_000, "2")
        .line("booting mesh")
        .raw(&[0xc3, 0x28, b'\r'])
        .play(&mock.feed);

    assert!(common::wait_until(Duration::from_secs(2), || handle.stats().lines_read == 5));
    handle.shutdown();
    join.join().unwrap();

    assert_eq!(handle.status_updates()["1"], "120");
    assert_eq!(handle.result_updates()["2"], "pass");
    assert_eq!(handle.events.log.drain(), vec!["PASS 1700000000 2"]);

    let stats = handle.stats();
    assert_eq!(stats.status_events, 1);
    assert_eq!(stats.result_events, 1);
    assert_eq!(stats.log_events, 1);
    assert_eq!(stats.unclassified_lines, 1);
    assert_eq!(stats.undecodable_lines, 1);
}

#[test]
fn test_acking_registers_once_and_reports_twice() {
    let mock = create_memory_bridge();

    LineScriptBuilder::new()
        .acking("42", "waiting")
        .acking("42", "done")
        .play(&mock.feed);
    mock.feed.close();

    mock.bridge.run();

    assert_eq!(mock.handle.events.result.drain(), vec!["acking 42 waiting", "acking 42 done"]);
    assert_eq!(mock.handle.registry.all(), vec!["42"]);
    assert_eq!(mock.handle.stats().nodes_registered, 1);
}

#[test]
fn test_nodeok_registers_without_result() {
    let mock = create_memory_bridge();

    LineScriptBuilder::new()
        .nodeok("7")
        .nodeok("8")
        .nodeok("7")
        .play(&mock.feed);
    mock.feed.close();

    mock.bridge.run();

    assert!(mock.handle.events.result.is_empty());
    assert_eq!(mock.handle.registry.all(), vec!["7", "8"]);
}

#[test]
fn test_link_failure_stops_loop() {
    let mock = create_memory_bridge();
    mock.feed.line("status 1 on");
    mock.feed.fail("device unplugged");
    mock.feed.line("status 1 off");

    assert_eq!(mock.bridge.run(), LinkState::Stopped);
    assert!(!mock.handle.is_running());
    assert_eq!(mock.handle.status_updates()["1"], "on");
}

#[test]
fn test_controller_over_running_bridge() {
    let mock = create_memory_bridge();
    let handle = mock.handle.clone();
    let join = mock.bridge.spawn().unwrap();

    mock.feed.line("nodeok 3 ok");
    mock.feed.line("nodeok 1 ok");
    assert!(common::wait_until(Duration::from_secs(2), || handle.registry.len() == 2));

    let controller = MonitorController::new(handle.writer.clone(), handle.registry.clone(), Duration::ZERO);
    let pending = controller.start_test_at(30, 1_700_000_000).unwrap();
    assert_eq!(pending.len(), 2);
    assert!(pending.values().all(|v| v == NO_RESPONSE));

    controller.sync_nodes().unwrap();
    handle.shutdown();
    join.join().unwrap();

    assert_eq!(
        mock.sink.lines(),
        vec![
            "",
            "monitor start 30 1700000000",
            "",
            "monitor reset_nodes",
            "monitor add_first_node 3",
            "monitor add_node 1",
        ]
    );
}
