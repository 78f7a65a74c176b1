//! Behavioral tests for the device session actor.
//!
//! Every test drives the actor through a scripted mock link: the test plays
//! the device side (reading what the actor wrote, pushing response lines and
//! events) while callers go through the public [`SessionHandle`]. Timeout
//! and reconnect tests run under a paused clock so deadlines fire instantly.

use std::time::Duration;

use tokio::time;

use whorl_bridge::session::{DeviceSession, SessionConfig};
use whorl_core::{Error, SensorSlot};
use whorl_protocol::template::encode_hex;
use whorl_transport::{MockConnector, MockLink, MockLinkHandle};

fn slot(n: u8) -> SensorSlot {
    SensorSlot::new(n).unwrap()
}

/// Spawn an actor over a single scripted link.
fn session_over_one_link() -> (
    whorl_bridge::SessionHandle,
    tokio::sync::mpsc::Receiver<whorl_protocol::SensorEvent>,
    MockLinkHandle,
) {
    let connector = MockConnector::new();
    let (link, device) = MockLink::new();
    connector.push_link(link);
    let (session, handle, events) = DeviceSession::new(connector, SessionConfig::default());
    tokio::spawn(session.run());
    (handle, events, device)
}

#[tokio::test]
async fn concurrent_callers_each_get_their_own_response() {
    let (handle, _events, mut device) = session_over_one_link();

    let callers: Vec<_> = (1..=5u8)
        .map(|n| {
            let handle = handle.clone();
            tokio::spawn(async move { (n, handle.enroll(slot(n)).await) })
        })
        .collect();

    // The actor serializes the exchanges; answer each command with a JSON
    // body echoing the slot it named.
    for _ in 0..5 {
        let written = device.next_written().await.unwrap();
        let n: u8 = written.strip_prefix("ENROLL:").unwrap().parse().unwrap();
        device
            .push_line(format!(r#"{{"status":"enroll_ok","sensor_id":{n}}}"#))
            .await
            .unwrap();
    }

    for caller in callers {
        let (n, outcome) = caller.await.unwrap();
        let response = outcome.unwrap();
        assert_eq!(
            response.as_json().unwrap()["sensor_id"],
            i64::from(n),
            "caller for slot {n} got someone else's response"
        );
    }
}

#[tokio::test(start_paused = true)]
async fn unanswered_command_times_out_instead_of_hanging() {
    let (handle, _events, _device) = session_over_one_link();

    let err = handle.delete(slot(4)).await.unwrap_err();
    assert!(matches!(err, Error::Timeout { duration_ms: 5000 }));
}

#[tokio::test(start_paused = true)]
async fn second_command_waits_until_first_resolves() {
    let (handle, _events, mut device) = session_over_one_link();

    let first = {
        let handle = handle.clone();
        tokio::spawn(async move { handle.enroll(slot(1)).await })
    };
    assert_eq!(device.next_written().await.as_deref(), Some("ENROLL:1"));

    let second = {
        let handle = handle.clone();
        tokio::spawn(async move { handle.enroll(slot(2)).await })
    };
    // Let the second caller reach the mailbox, then verify its command has
    // not hit the wire while the first is still outstanding.
    time::sleep(Duration::from_millis(1)).await;
    let probe = time::timeout(Duration::from_millis(1), device.next_written()).await;
    assert!(probe.is_err(), "second command written while gate was held");

    device
        .push_line(r#"{"status":"enroll_ok","sensor_id":1}"#)
        .await
        .unwrap();
    let response = first.await.unwrap().unwrap();
    assert_eq!(response.as_json().unwrap()["sensor_id"], 1);

    assert_eq!(device.next_written().await.as_deref(), Some("ENROLL:2"));
    device
        .push_line(r#"{"status":"enroll_ok","sensor_id":2}"#)
        .await
        .unwrap();
    let response = second.await.unwrap().unwrap();
    assert_eq!(response.as_json().unwrap()["sensor_id"], 2);
}

#[tokio::test]
async fn event_during_exchange_reaches_forwarder_not_caller() {
    let (handle, mut events, mut device) = session_over_one_link();

    let caller = {
        let handle = handle.clone();
        tokio::spawn(async move { handle.enroll(slot(9)).await })
    };
    assert_eq!(device.next_written().await.as_deref(), Some("ENROLL:9"));

    // A scan completes while the enroll is outstanding; the "event" key
    // routes it to the event stream, not the waiting caller.
    device
        .push_line(r#"{"event":"match_found","sensor_id":12,"confidence":88}"#)
        .await
        .unwrap();
    device
        .push_line(r#"{"status":"enroll_ok","sensor_id":9}"#)
        .await
        .unwrap();

    let response = caller.await.unwrap().unwrap();
    assert_eq!(response.status(), Some("enroll_ok"));

    let event = events.recv().await.unwrap();
    assert!(event.is_match());
}

#[tokio::test(start_paused = true)]
async fn late_response_is_discarded_while_idle() {
    let (handle, mut events, mut device) = session_over_one_link();

    // First command times out unanswered.
    let err = handle.delete(slot(1)).await.unwrap_err();
    assert!(matches!(err, Error::Timeout { .. }));

    // The stale response shows up afterwards, followed by an event that
    // acts as a sync point: once the event is out, the stale line has been
    // classified (and dropped) by the idle actor.
    device
        .push_line(r#"{"status":"delete_ok","sensor_id":1}"#)
        .await
        .unwrap();
    device.push_line(r#"{"event":"match_failed"}"#).await.unwrap();
    let event = events.recv().await.unwrap();
    assert!(!event.is_match());

    // A fresh command gets its own response, not the stale one.
    let responder = tokio::spawn(async move {
        assert_eq!(device.next_written().await.as_deref(), Some("DELETE:2"));
        device
            .push_line(r#"{"status":"delete_ok","sensor_id":2}"#)
            .await
            .unwrap();
        device
    });
    let response = handle.delete(slot(2)).await.unwrap();
    assert_eq!(response.as_json().unwrap()["sensor_id"], 2);
    responder.await.unwrap();
}

#[tokio::test]
async fn reconnect_restores_service_on_a_fresh_link() {
    let connector = MockConnector::new();
    let (link1, mut device1) = MockLink::new();
    let (link2, mut device2) = MockLink::new();
    connector.push_link(link1);
    connector.push_link(link2);
    let probe = connector.clone();

    let (session, handle, _events) = DeviceSession::new(connector, SessionConfig::default());
    tokio::spawn(session.run());

    let caller = {
        let handle = handle.clone();
        tokio::spawn(async move { handle.enroll(slot(1)).await })
    };
    assert_eq!(device1.next_written().await.as_deref(), Some("ENROLL:1"));
    device1
        .push_line(r#"{"status":"enroll_ok","sensor_id":1}"#)
        .await
        .unwrap();
    caller.await.unwrap().unwrap();
    assert!(handle.is_connected());

    // Kill the first link and wait for the actor to notice.
    device1.disconnect();
    while handle.is_connected() {
        tokio::task::yield_now().await;
    }

    // The next command is served over the second link; nothing is wedged.
    let caller = {
        let handle = handle.clone();
        tokio::spawn(async move { handle.enroll(slot(2)).await })
    };
    assert_eq!(device2.next_written().await.as_deref(), Some("ENROLL:2"));
    device2
        .push_line(r#"{"status":"enroll_ok","sensor_id":2}"#)
        .await
        .unwrap();
    let response = caller.await.unwrap().unwrap();
    assert_eq!(response.as_json().unwrap()["sensor_id"], 2);
    assert_eq!(probe.attempts(), 2);
}

#[tokio::test(start_paused = true)]
async fn commands_fail_fast_while_device_is_down() {
    let connector = MockConnector::new();
    let late = connector.clone();
    let (session, handle, _events) = DeviceSession::new(connector, SessionConfig::default());
    tokio::spawn(session.run());

    // No link available: the op is rejected from the reconnect loop rather
    // than queued until a device appears.
    let err = handle.scan_and_compare().await.unwrap_err();
    assert!(matches!(err, Error::DeviceDisconnected));

    // A device shows up; after the retry delay the actor connects and
    // serves commands again.
    let (link, mut device) = MockLink::new();
    late.push_link(link);
    time::sleep(Duration::from_millis(2100)).await;
    assert!(handle.is_connected());

    let responder = tokio::spawn(async move {
        assert_eq!(device.next_written().await.as_deref(), Some("DELETE_ALL"));
        device
            .push_line(r#"{"status":"library_cleared"}"#)
            .await
            .unwrap();
        device
    });
    let response = handle.delete_all().await.unwrap();
    assert_eq!(response.status(), Some("library_cleared"));
    responder.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn upload_writes_framed_chunks_in_order() {
    let (handle, _events, mut device) = session_over_one_link();

    let template = vec![0xAB; 700];
    let expected_hex = encode_hex(&template);

    let caller = {
        let handle = handle.clone();
        let template = template.clone();
        tokio::spawn(async move { handle.upload_template(slot(9), template).await })
    };

    assert_eq!(device.next_written().await.as_deref(), Some("SET_MODEL:9"));
    let mut streamed = String::new();
    loop {
        let line = device.next_written().await.unwrap();
        if line == "HEX_END" {
            break;
        }
        let chunk = line.strip_prefix("HEX:").unwrap();
        assert!(chunk.len() <= 512);
        streamed.push_str(chunk);
    }
    assert_eq!(streamed, expected_hex);
    caller.await.unwrap().unwrap();
}

#[tokio::test(start_paused = true)]
async fn batch_staging_uses_batch_framing() {
    let (handle, _events, mut device) = session_over_one_link();

    let caller = {
        let handle = handle.clone();
        tokio::spawn(async move { handle.stage_batch_template(slot(2), vec![0x01, 0x02]).await })
    };

    assert_eq!(
        device.next_written().await.as_deref(),
        Some("TEMPLATE_SLOT:2")
    );
    assert_eq!(
        device.next_written().await.as_deref(),
        Some("TEMPLATE_DATA:0102")
    );
    assert_eq!(device.next_written().await.as_deref(), Some("TEMPLATE_END"));
    caller.await.unwrap().unwrap();
}

#[tokio::test]
async fn extraction_tolerates_events_mid_transfer() {
    let (handle, mut events, mut device) = session_over_one_link();

    let caller = {
        let handle = handle.clone();
        tokio::spawn(async move { handle.extract_template(slot(5)).await })
    };

    assert_eq!(device.next_written().await.as_deref(), Some("GET_MODEL:5"));
    device
        .push_lines([
            r#"{"status":"start_export","sensor_id":5}"#,
            "TEMPLATE_HEX:00FF",
            r#"{"event":"match_found","sensor_id":3,"confidence":50}"#,
            "TEMPLATE_HEX:10A0",
            r#"{"status":"export_done"}"#,
        ])
        .await
        .unwrap();

    let bytes = caller.await.unwrap().unwrap();
    assert_eq!(bytes, vec![0x00, 0xFF, 0x10, 0xA0]);
    assert!(events.recv().await.unwrap().is_match());
}

#[tokio::test]
async fn aborted_extraction_fails_without_wedging_the_gate() {
    let (handle, _events, mut device) = session_over_one_link();

    let caller = {
        let handle = handle.clone();
        tokio::spawn(async move { handle.extract_template(slot(5)).await })
    };
    assert_eq!(device.next_written().await.as_deref(), Some("GET_MODEL:5"));
    device
        .push_lines([
            r#"{"status":"start_export","sensor_id":5}"#,
            r#"{"status":"export_error"}"#,
        ])
        .await
        .unwrap();
    let err = caller.await.unwrap().unwrap_err();
    assert!(matches!(err, Error::TransferFailed(_)));

    // The actor is back in service for the next exchange.
    let responder = tokio::spawn(async move {
        assert_eq!(device.next_written().await.as_deref(), Some("DELETE:5"));
        device
            .push_line(r#"{"status":"delete_ok","sensor_id":5}"#)
            .await
            .unwrap();
        device
    });
    let response = handle.delete(slot(5)).await.unwrap();
    assert_eq!(response.status(), Some("delete_ok"));
    responder.await.unwrap();
}

#[tokio::test]
async fn actor_stops_when_every_handle_is_dropped() {
    let connector = MockConnector::new();
    let (link, device) = MockLink::new();
    connector.push_link(link);
    let (session, handle, events) = DeviceSession::new(connector, SessionConfig::default());
    let actor = tokio::spawn(session.run());

    drop(handle);
    drop(events);
    drop(device);

    time::timeout(Duration::from_secs(1), actor)
        .await
        .expect("actor kept running with no handles")
        .unwrap();
}
