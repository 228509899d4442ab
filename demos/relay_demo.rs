//! Two-room relay demo
//!
//! Walks the full flow against the simulated meeting SDK: bind two rooms,
//! join, toggle media, relay into the other room, switch rooms and leave.
//!
//! Rooms are created through the REST API when `RELAYROOM_AUTH_TOKEN` (or
//! `RELAYROOM_API_KEY` and `RELAYROOM_API_SECRET`) is set. Otherwise two
//! placeholder room ids are used.

use anyhow::Context;
use relayroom::{
    DebugLogger, EventFilter, EventHandler, GlobalConfig, RelayRoom, RoomId, SessionEvent,
    SimulatedProvider,
};
use std::sync::Arc;
use std::time::Duration;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    DebugLogger::init_logging(false)?;

    println!("🚀 relayroom two-room relay demo");
    println!("================================");

    let config = match GlobalConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            println!("⚠️  {} - using placeholder rooms", e);
            GlobalConfig::default()
        }
    };
    let provisioned = config.credential.is_some();
    let relayroom = RelayRoom::init_with(config)?;

    let provider = SimulatedProvider::new();
    let mut switcher = relayroom.switcher(Arc::new(provider.clone()));

    let filter = EventFilter::all();
    let _handler = EventHandler::spawn(switcher.events(), move |event| {
        if !filter.should_include(&event) {
            return;
        }
        match event {
            SessionEvent::Notice { room_id, message } => println!("   🔔 [{}] {}", room_id, message),
            SessionEvent::StateChanged { room_id, state } => println!("   🔄 [{}] {}", room_id, state),
            SessionEvent::RoomSwitched { from, to } => println!("   🔀 {} -> {}", from, to),
            other => println!("   📡 {}", other.event_type()),
        }
    });

    // ============================================================================
    // Step 1: Rooms
    // ============================================================================
    println!("\n📋 Step 1: Rooms");
    let rooms = if provisioned {
        let client = relayroom.rooms_client()?;
        switcher
            .provision(&client)
            .await
            .context("creating rooms")?
            .clone()
    } else {
        switcher
            .bind_rooms(RoomId::from("demo-room-a"), RoomId::from("demo-room-b"))?
            .clone()
    };
    println!("✅ Room A: {}  Room B: {}", rooms.a, rooms.b);

    // ============================================================================
    // Step 2: Join and toggle media
    // ============================================================================
    println!("\n📋 Step 2: Join and toggle media");
    {
        let session = switcher
            .session_mut()
            .context("no session bound after binding rooms")?;
        session.join().await?;
        session.wait_until_joined(Duration::from_secs(5)).await?;
        println!("✅ Joined {}", session.room_id());

        let first = session.toggle_mic().await?;
        let second = session.toggle_mic().await?;
        println!(
            "🎤 Mic toggled: first={} second={} (second ignored while in flight)",
            first, second
        );
        println!("🎤 Mic now {}", if session.local_mic_on() { "ON" } else { "OFF" });

        for view in session.views() {
            println!("   👤 {}", view);
        }
    }

    // ============================================================================
    // Step 3: Relay into the other room
    // ============================================================================
    println!("\n📋 Step 3: Relay");
    let output = switcher.start_relay().await?;
    println!("📡 Relaying to {} (key {})", output.url, output.stream_key);
    if let Some(session) = switcher.session() {
        println!("📊 {}", session.snapshot().summary());
    }

    // ============================================================================
    // Step 4: Switch rooms
    // ============================================================================
    println!("\n📋 Step 4: Switch rooms");
    let now_in = switcher.switch_room().await?;
    println!(
        "✅ Now bound to {} ({} live handle(s))",
        now_in,
        provider.live_handles()
    );
    if let Some(session) = switcher.session_mut() {
        session.join().await?;
        println!("📊 {}", session.snapshot().summary());
    }

    // ============================================================================
    // Step 5: Leave
    // ============================================================================
    println!("\n📋 Step 5: Leave all rooms");
    switcher.leave_all().await?;
    println!("✅ Rooms cleared ({} live handle(s))", provider.live_handles());

    // Let the handler print the remaining events
    tokio::time::sleep(Duration::from_millis(50)).await;
    println!("\n🎉 Demo complete");
    Ok(())
}
