//! Room switcher tests against the simulated meeting SDK

use relayroom::*;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::Instant;
use tokio_test::{assert_err, assert_ok};

fn switcher_with(provider: &SimulatedProvider, config: RoomConfig) -> RoomSwitcher {
    let mut switcher = RoomSwitcher::new(Arc::new(provider.clone()), config);
    switcher
        .bind_rooms(RoomId::from("room-x"), RoomId::from("room-y"))
        .unwrap();
    switcher
}

fn switcher(provider: &SimulatedProvider) -> RoomSwitcher {
    switcher_with(provider, RoomConfig::default())
}

/// Read one HTTP/1.1 request, headers and `content-length` body
async fn read_request(stream: &mut TcpStream) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    loop {
        let n = stream.read(&mut chunk).await.unwrap();
        assert!(n > 0, "client closed mid-request");
        buf.extend_from_slice(&chunk[..n]);

        let text = String::from_utf8_lossy(&buf).to_lowercase();
        if let Some(header_end) = text.find("\r\n\r\n") {
            let content_length = text
                .lines()
                .find_map(|line| line.strip_prefix("content-length:"))
                .map(|v| v.trim().parse::<usize>().unwrap())
                .unwrap_or(0);
            if buf.len() >= header_end + 4 + content_length {
                return text;
            }
        }
    }
}

/// Fake rooms API answering one create request per id, in order
async fn start_rooms_api(room_ids: &'static [&'static str]) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        for room_id in room_ids {
            let (mut stream, _) = listener.accept().await.unwrap();
            let request = read_request(&mut stream).await;
            assert!(request.starts_with("post /v2/rooms"));

            let body = format!(r#"{{"roomId":"{}","disabled":false}}"#, room_id);
            let response = format!(
                "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                body.len(),
                body
            );
            stream.write_all(response.as_bytes()).await.unwrap();
            stream.shutdown().await.ok();
        }
    });

    addr
}

fn rooms_client(addr: SocketAddr) -> RoomsClient {
    let config = ProvisionConfig::new("test-token")
        .with_api_base(format!("http://{}", addr))
        .with_request_timeout(Duration::from_secs(5));
    RoomsClient::new(&config).unwrap()
}

async fn join_current(switcher: &mut RoomSwitcher) {
    let session = switcher.session_mut().unwrap();
    assert_ok!(session.join().await);
}

#[tokio::test(start_paused = true)]
async fn test_bind_opens_room_a_without_joining() {
    let provider = SimulatedProvider::new();
    let switcher = switcher(&provider);

    assert_eq!(switcher.current_slot(), RoomSlot::A);
    assert_eq!(switcher.current_room(), Some(&RoomId::from("room-x")));
    assert_eq!(switcher.other_room(), Some(&RoomId::from("room-y")));
    assert_eq!(switcher.phase(), SwitchPhase::Idle);
    assert_eq!(
        switcher.session().unwrap().state(),
        SessionState::NotJoined
    );
    assert_eq!(provider.opened_rooms(), vec![RoomId::from("room-x")]);
}

#[tokio::test(start_paused = true)]
async fn test_switch_binds_other_room_after_settle_delay() {
    let provider = SimulatedProvider::new();
    let mut switcher = switcher(&provider);
    join_current(&mut switcher).await;

    let started = Instant::now();
    let to = switcher.switch_room().await.unwrap();
    assert!(started.elapsed() >= Duration::from_millis(800));

    assert_eq!(to, RoomId::from("room-y"));
    assert_eq!(switcher.current_slot(), RoomSlot::B);
    assert_eq!(switcher.current_room(), Some(&RoomId::from("room-y")));
    assert_eq!(switcher.other_room(), Some(&RoomId::from("room-x")));
    assert_eq!(switcher.phase(), SwitchPhase::Settled);

    // Old handle left and dropped, exactly one handle alive
    let probes = provider.probes();
    assert_eq!(probes.len(), 2);
    assert_eq!(probes[0].calls(SimCommand::Leave), 1);
    assert!(probes[0].is_released());
    assert!(!probes[1].is_released());
    assert_eq!(provider.live_handles(), 1);

    // The new room is bound but not joined
    let session = switcher.session().unwrap();
    assert_eq!(session.room_id().as_str(), "room-y");
    assert_eq!(session.state(), SessionState::NotJoined);
    assert_eq!(probes[1].calls(SimCommand::Join), 0);
}

#[tokio::test(start_paused = true)]
async fn test_switch_back_and_forth() {
    let provider = SimulatedProvider::new();
    let mut switcher = switcher(&provider);

    assert_eq!(switcher.switch_room().await.unwrap().as_str(), "room-y");
    assert_eq!(switcher.switch_room().await.unwrap().as_str(), "room-x");
    assert_eq!(
        provider.opened_rooms(),
        vec![
            RoomId::from("room-x"),
            RoomId::from("room-y"),
            RoomId::from("room-x")
        ]
    );
    assert_eq!(provider.live_handles(), 1);

    // Never joined, so nothing to leave
    assert!(provider
        .probes()
        .iter()
        .all(|p| p.calls(SimCommand::Leave) == 0));
}

#[tokio::test(start_paused = true)]
async fn test_switch_stops_relay_before_leaving() {
    let provider = SimulatedProvider::new();
    let mut switcher = switcher(&provider);
    join_current(&mut switcher).await;

    let output = switcher.start_relay().await.unwrap();
    assert_eq!(output.url, "rtmp://localhost:1935/live/room-y");
    assert_eq!(output.stream_key, "room-y");

    assert_ok!(switcher.switch_room().await);
    let probes = provider.probes();
    let first = &probes[0];
    assert_eq!(first.calls(SimCommand::StopLivestream), 1);
    assert_eq!(first.calls(SimCommand::Leave), 1);
    assert!(first.livestream().is_none());
    assert!(!switcher.session().unwrap().is_relay_active());

    // Relay from the new room points back at the first one
    join_current(&mut switcher).await;
    let output = switcher.start_relay().await.unwrap();
    assert_eq!(output.stream_key, "room-x");
}

#[tokio::test(start_paused = true)]
async fn test_switch_continues_when_leave_fails() {
    let provider = SimulatedProvider::new();
    provider.fail_on(SimCommand::Leave);
    let mut switcher = switcher(&provider);
    join_current(&mut switcher).await;

    assert_eq!(switcher.switch_room().await.unwrap().as_str(), "room-y");
    assert_eq!(provider.live_handles(), 1);
    assert_eq!(switcher.phase(), SwitchPhase::Settled);
}

#[tokio::test(start_paused = true)]
async fn test_acknowledged_settle_returns_on_left_callback() {
    let provider = SimulatedProvider::new();
    let config = RoomConfig {
        settle_policy: SettlePolicy::Acknowledged {
            timeout: Duration::from_secs(5),
        },
        ..RoomConfig::default()
    };
    let mut switcher = switcher_with(&provider, config);
    join_current(&mut switcher).await;

    let started = Instant::now();
    assert_ok!(switcher.switch_room().await);
    assert!(started.elapsed() < Duration::from_millis(800));
    assert_eq!(provider.live_handles(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_acknowledged_settle_gives_up_after_timeout() {
    let provider = SimulatedProvider::without_acknowledgements();
    let config = RoomConfig {
        settle_policy: SettlePolicy::Acknowledged {
            timeout: Duration::from_secs(2),
        },
        ..RoomConfig::default()
    };
    let mut switcher = switcher_with(&provider, config);
    join_current(&mut switcher).await;
    assert_eq!(
        switcher.session().unwrap().state(),
        SessionState::Joining
    );

    let started = Instant::now();
    assert_ok!(switcher.switch_room().await);
    assert!(started.elapsed() >= Duration::from_secs(2));
    assert_eq!(switcher.current_room(), Some(&RoomId::from("room-y")));
}

#[tokio::test(start_paused = true)]
async fn test_leave_all_discards_rooms() {
    let provider = SimulatedProvider::new();
    let mut switcher = switcher(&provider);
    join_current(&mut switcher).await;
    assert_ok!(switcher.start_relay().await);

    assert_ok!(switcher.leave_all().await);
    assert!(switcher.rooms().is_none());
    assert!(switcher.session().is_none());
    assert!(switcher.current_room().is_none());
    assert_eq!(switcher.phase(), SwitchPhase::Idle);
    assert_eq!(provider.live_handles(), 0);

    let probes = provider.probes();
    let probe = &probes[0];
    assert_eq!(probe.calls(SimCommand::StopLivestream), 1);
    assert_eq!(probe.calls(SimCommand::Leave), 1);

    assert!(matches!(
        switcher.switch_room().await,
        Err(RelayRoomError::NoActiveSession)
    ));
    assert!(matches!(
        switcher.start_relay().await,
        Err(RelayRoomError::NoActiveSession)
    ));
}

#[tokio::test(start_paused = true)]
async fn test_leave_all_reports_leave_failure_after_teardown() {
    let provider = SimulatedProvider::new();
    provider.fail_on(SimCommand::Leave);
    let mut switcher = switcher(&provider);
    join_current(&mut switcher).await;

    assert_err!(switcher.leave_all().await);
    assert!(switcher.rooms().is_none());
    assert_eq!(provider.live_handles(), 0);

    // Rooms can be bound again afterwards
    assert_ok!(switcher.bind_rooms(RoomId::from("room-p"), RoomId::from("room-q")));
}

#[tokio::test]
async fn test_binding_twice_is_rejected() {
    let provider = SimulatedProvider::new();
    let mut switcher = switcher(&provider);

    let err = switcher
        .bind_rooms(RoomId::from("a"), RoomId::from("b"))
        .unwrap_err();
    assert!(matches!(err, RelayRoomError::InvalidState { .. }));
    assert_eq!(provider.probes().len(), 1);
}

#[tokio::test]
async fn test_entered_room_ids_skip_provisioning() {
    let provider = SimulatedProvider::new();
    let mut switcher = RoomSwitcher::new(Arc::new(provider.clone()), RoomConfig::default());

    // Unroutable base; any request would fail
    let client = RoomsClient::new(
        &ProvisionConfig::new("test-token").with_api_base("http://127.0.0.1:9"),
    )
    .unwrap();

    let rooms = switcher
        .enter_rooms(&client, Some(" room-p "), Some("room-q"))
        .await
        .unwrap();
    assert_eq!(rooms.a.as_str(), "room-p");
    assert_eq!(rooms.b.as_str(), "room-q");
    assert_eq!(provider.opened_rooms(), vec![RoomId::from("room-p")]);
}

#[tokio::test(start_paused = true)]
async fn test_events_follow_switches() {
    let provider = SimulatedProvider::new();
    let mut switcher = switcher(&provider);
    let mut events = switcher.events();

    join_current(&mut switcher).await;
    assert_ok!(switcher.switch_room().await);
    join_current(&mut switcher).await;
    assert_ok!(switcher.leave_all().await);

    let events = events.drain();
    let joined: Vec<_> = events
        .iter()
        .filter_map(|e| match e {
            SessionEvent::StateChanged {
                room_id,
                state: SessionState::Joined,
            } => Some(room_id.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(joined, vec!["room-x", "room-y"]);

    let phases: Vec<_> = events
        .iter()
        .filter_map(|e| match e {
            SessionEvent::PhaseChanged { phase } => Some(*phase),
            _ => None,
        })
        .collect();
    assert_eq!(
        phases,
        vec![SwitchPhase::Switching, SwitchPhase::Settled, SwitchPhase::Idle]
    );

    assert!(events.contains(&SessionEvent::RoomSwitched {
        from: RoomId::from("room-x"),
        to: RoomId::from("room-y"),
    }));
    assert_eq!(events.last(), Some(&SessionEvent::RoomsCleared));
}

#[tokio::test]
async fn test_provision_creates_both_rooms_and_relays_to_b() {
    let addr = start_rooms_api(&["created-a", "created-b"]).await;
    let client = rooms_client(addr);
    let provider = SimulatedProvider::new();
    let mut switcher = RoomSwitcher::new(Arc::new(provider.clone()), RoomConfig::default());

    let rooms = switcher.provision(&client).await.unwrap().clone();
    assert_eq!(rooms.a.as_str(), "created-a");
    assert_eq!(rooms.b.as_str(), "created-b");
    assert_eq!(switcher.current_room(), Some(&RoomId::from("created-a")));
    assert_eq!(provider.opened_rooms(), vec![RoomId::from("created-a")]);

    join_current(&mut switcher).await;
    let output = switcher.start_relay().await.unwrap();
    assert_eq!(output.url, "rtmp://localhost:1935/live/created-b");
    assert_eq!(output.stream_key, "created-b");
}

#[tokio::test]
async fn test_enter_rooms_creates_only_missing_id() {
    let addr = start_rooms_api(&["created-b"]).await;
    let client = rooms_client(addr);
    let provider = SimulatedProvider::new();
    let mut switcher = RoomSwitcher::new(Arc::new(provider.clone()), RoomConfig::default());

    let rooms = switcher
        .enter_rooms(&client, Some("typed-a"), Some("  "))
        .await
        .unwrap();
    assert_eq!(rooms.a.as_str(), "typed-a");
    assert_eq!(rooms.b.as_str(), "created-b");
    assert_eq!(switcher.other_room(), Some(&RoomId::from("created-b")));
}

#[tokio::test]
async fn test_failed_provisioning_binds_nothing() {
    let provider = SimulatedProvider::new();
    let mut switcher = RoomSwitcher::new(Arc::new(provider.clone()), RoomConfig::default());

    // Nothing listens here
    let addr = {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap()
    };

    assert_err!(switcher.provision(&rooms_client(addr)).await);
    assert!(switcher.rooms().is_none());
    assert!(switcher.session().is_none());
    assert!(provider.probes().is_empty());
}
