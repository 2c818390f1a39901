mod common;

use std::time::Duration;

use common::{GUILD, Harness, STUDY};
use pomora_back::{
    config::{AppConfig, TimerConfig},
    services::{participant_tracker, report_scheduler::ReportScheduler},
    state::room::{Phase, RoomKey},
};
use tokio::time::sleep;

const KEY: RoomKey = RoomKey {
    guild_id: GUILD,
    channel_id: STUDY,
};
const ALICE: u64 = 1;

#[tokio::test(start_paused = true)]
async fn timer_driver_flips_and_credits_without_manual_ticks() {
    let harness = Harness::default().await;
    participant_tracker::on_join(&harness.state, ALICE, GUILD, STUDY).await;

    assert!(harness.engine.start());
    assert!(!harness.engine.start());
    assert!(harness.engine.is_running());

    sleep(Duration::from_millis(1_500_500)).await;

    let room = harness.state.rooms().get(KEY).unwrap();
    assert_eq!(room.phase, Phase::Break);
    assert_eq!(room.remaining_secs, 300);
    assert_eq!(harness.store.stats(GUILD, ALICE).unwrap().total_time, 25);
    assert_eq!(harness.store.session_logs().len(), 1);

    harness.engine.stop().await;
    assert!(!harness.engine.is_running());

    sleep(Duration::from_secs(120)).await;
    assert_eq!(harness.state.rooms().get(KEY).unwrap().remaining_secs, 300);
}

#[tokio::test(start_paused = true)]
async fn coarse_tick_interval_keeps_wall_clock_pace() {
    let harness = Harness::new(AppConfig {
        timer: TimerConfig {
            tick_interval_ms: 5_000,
            ..TimerConfig::default()
        },
        ..AppConfig::default()
    })
    .await;
    participant_tracker::on_join(&harness.state, ALICE, GUILD, STUDY).await;
    assert!(harness.engine.start());

    sleep(Duration::from_millis(600_500)).await;
    assert_eq!(harness.state.rooms().get(KEY).unwrap().remaining_secs, 900);

    sleep(Duration::from_secs(900)).await;
    let room = harness.state.rooms().get(KEY).unwrap();
    assert_eq!(room.phase, Phase::Break);
    assert_eq!(room.remaining_secs, 300);
    assert_eq!(harness.store.stats(GUILD, ALICE).unwrap().total_time, 25);

    harness.engine.stop().await;
}

#[tokio::test(start_paused = true)]
async fn report_driver_publishes_presence_each_minute_until_stopped() {
    let harness = Harness::default().await;
    participant_tracker::on_join(&harness.state, ALICE, GUILD, STUDY).await;

    let scheduler = ReportScheduler::new(harness.state.clone());
    assert!(scheduler.start());
    assert!(!scheduler.start());

    sleep(Duration::from_secs(150)).await;
    let presences = harness.sink.presences();
    assert_eq!(presences.len(), 2);
    assert_eq!(presences[0].participants, 1);
    assert_eq!(presences[0].text, "1 People Working");

    scheduler.stop().await;
    sleep(Duration::from_secs(300)).await;
    assert_eq!(harness.sink.presences().len(), 2);
}
