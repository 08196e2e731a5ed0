//! End-to-end session scenarios driven over real wire frames.
//!
//! These tests feed the session machine with events decoded from literal
//! JSON frames, exercising the codec and the state machine together the way
//! the driver does in production — just without sockets.

use std::time::Instant;

use parlor_client::{
    ConnectForm, Phase, RoomChoice, ServerEvent, Session, SessionAction, SessionEvent,
};
use parlor_proto::ClientFrame;

fn submit(session: &mut Session, name: &str, choice: RoomChoice, room_data: &str) {
    let _ = session.handle(SessionEvent::SubmitConnect {
        form: ConnectForm {
            display_name: name.to_string(),
            choice,
            room_data: room_data.to_string(),
        },
    });
}

fn deliver(session: &mut Session, frame: &str) -> Vec<SessionAction> {
    session.handle(SessionEvent::FrameReceived(ServerEvent::decode(frame)))
}

fn outbound_frames(actions: &[SessionAction]) -> Vec<ClientFrame> {
    actions
        .iter()
        .filter_map(|action| match action {
            SessionAction::SendFrame(frame) => Some(frame.clone()),
            _ => None,
        })
        .collect()
}

#[test]
fn create_room_happy_path() {
    let mut session = Session::default();

    submit(&mut session, "Alice", RoomChoice::Create, "3");
    assert_eq!(session.phase(), Phase::Connecting);

    let actions = session.handle(SessionEvent::TransportOpen { now: Instant::now() });
    let frames = outbound_frames(&actions);
    assert_eq!(frames.len(), 1);
    assert!(matches!(
        &frames[0],
        ClientFrame::Init { display_name, choice: RoomChoice::Create, room_data, .. }
            if display_name == "Alice" && room_data == "3"
    ));

    let _ = deliver(
        &mut session,
        r#"{"type":"response","event":"joined","payload":{"roomID":"42"}}"#,
    );

    assert_eq!(session.phase(), Phase::Joined);
    assert_eq!(session.room_id(), Some("42"));
    assert_eq!(session.notice(), None);
}

#[test]
fn chat_lines_are_trimmed_and_blank_sends_nothing() {
    let mut session = Session::default();
    submit(&mut session, "Alice", RoomChoice::Create, "3");
    let _ = session.handle(SessionEvent::TransportOpen { now: Instant::now() });
    let _ =
        deliver(&mut session, r#"{"type":"response","event":"joined","payload":{"roomID":1}}"#);

    let actions = session.handle(SessionEvent::SendChat { text: "  hello  ".to_string() });
    assert_eq!(outbound_frames(&actions), [ClientFrame::Chat { text: "hello".to_string() }]);

    let actions = session.handle(SessionEvent::SendChat { text: "   ".to_string() });
    assert!(outbound_frames(&actions).is_empty());
}

#[test]
fn duplicate_identity_rejection_resets_everything() {
    let mut session = Session::default();
    submit(&mut session, "Alice", RoomChoice::Join, "12345");
    let _ = session.handle(SessionEvent::TransportOpen { now: Instant::now() });
    assert_eq!(session.phase(), Phase::AwaitingJoin);

    let actions = deliver(&mut session, r#"{"type":"error","message":"duplicate-uuid"}"#);

    assert_eq!(session.phase(), Phase::Idle);
    assert_eq!(session.notice(), Some("duplicate session detected"));
    assert!(actions.contains(&SessionAction::CloseTransport));
    assert!(session.log().is_empty());
}

#[test]
fn history_replay_then_live_traffic_keeps_order() {
    let mut session = Session::default();
    submit(&mut session, "Alice", RoomChoice::Join, "42");
    let _ = session.handle(SessionEvent::TransportOpen { now: Instant::now() });
    let _ =
        deliver(&mut session, r#"{"type":"response","event":"joined","payload":{"roomID":42}}"#);

    // Replay arrives one frame per line, as the server sends it.
    let _ = deliver(
        &mut session,
        r#"{"type":"response","event":"history","payload":{"from":"Bob","text":"first"}}"#,
    );
    let _ = deliver(
        &mut session,
        r#"{"type":"response","event":"history","payload":{"from":"Carol","text":"second"}}"#,
    );
    let _ = deliver(
        &mut session,
        r#"{"type":"response","event":"message","payload":{"from":"Bob","text":"third"}}"#,
    );

    let texts: Vec<String> = session.log().iter().map(|line| line.text.clone()).collect();
    assert_eq!(texts, ["first", "second", "third"]);

    let _ = deliver(
        &mut session,
        r#"{"type":"response","event":"occupancy","payload":{"current":3,"max":5}}"#,
    );
    let occupancy = session.occupancy().unwrap();
    assert_eq!((occupancy.current, occupancy.max), (3, 5));
    // Occupancy replaced in place, not appended.
    assert_eq!(session.log().len(), 3);
}

#[test]
fn legacy_server_encoding_works_end_to_end() {
    let mut session = Session::default();
    submit(&mut session, "Alice", RoomChoice::Join, "7");
    let _ = session.handle(SessionEvent::TransportOpen { now: Instant::now() });

    let _ = deliver(&mut session, r#"{"from":"system","text":"joined-room 7"}"#);
    assert_eq!(session.phase(), Phase::Joined);
    assert_eq!(session.room_id(), Some("7"));

    let _ = deliver(&mut session, r#"{"from":"Bob","text":"welcome"}"#);
    let _ = deliver(&mut session, r#"{"from":"system","text":"Bob left the room"}"#);

    let snapshot = session.log().snapshot();
    assert_eq!(snapshot.len(), 2);
    assert_eq!(snapshot[0].sender, "Bob");
    assert_eq!(snapshot[1].sender, "system");
}

#[test]
fn corrupt_frame_does_not_tear_down_the_session() {
    let mut session = Session::default();
    submit(&mut session, "Alice", RoomChoice::Join, "7");
    let _ = session.handle(SessionEvent::TransportOpen { now: Instant::now() });
    let _ =
        deliver(&mut session, r#"{"type":"response","event":"joined","payload":{"roomID":7}}"#);

    let _ = deliver(&mut session, "}}} not json {{{");
    let _ = deliver(&mut session, r#"{"type":"mystery"}"#);

    assert_eq!(session.phase(), Phase::Joined);

    // The channel is still healthy.
    let _ = deliver(
        &mut session,
        r#"{"type":"response","event":"message","payload":{"from":"Bob","text":"still here"}}"#,
    );
    assert_eq!(session.log().len(), 1);
}

#[test]
fn disconnect_then_reconnect_uses_fresh_identity() {
    let mut session = Session::default();
    submit(&mut session, "Alice", RoomChoice::Join, "7");
    let _ = session.handle(SessionEvent::TransportOpen { now: Instant::now() });
    let first_id = session.session_id().cloned().unwrap();
    let _ =
        deliver(&mut session, r#"{"type":"response","event":"joined","payload":{"roomID":7}}"#);

    let _ = session.handle(SessionEvent::TransportClosed { error: true });
    assert_eq!(session.phase(), Phase::Idle);
    assert_eq!(session.notice(), Some("disconnected from server"));
    assert_eq!(session.session_id(), None);

    // Reconnects are explicit user actions with a new identity.
    submit(&mut session, "Alice", RoomChoice::Join, "7");
    let second_id = session.session_id().cloned().unwrap();
    assert_ne!(first_id, second_id);
}
