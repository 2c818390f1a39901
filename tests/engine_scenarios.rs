mod common;

use std::sync::Arc;

use common::{GUILD, Harness, REPORTS, STUDY, YieldingConfigStore};
use pomora_back::{
    config::{AppConfig, LongBreakConfig, ReportConfig, ResetPolicy, TimerConfig},
    dao::{
        models::{SessionKind, Timeframe},
        session_store::SessionStore,
    },
    dto::{
        commands::SettingsRequest,
        gateway::{MembershipOutcome, VoiceStateUpdate},
        sse::{MessageMode, VoiceAlertKind},
    },
    error::ServiceError,
    services::{
        command_service, participant_tracker,
        report_scheduler::{ReportScheduler, ResetOutcome},
        reporting::ReportDelivery,
        timer_engine::CreditOutcome,
    },
    state::room::{Phase, RoomKey},
};
use time::macros::datetime;

const KEY: RoomKey = RoomKey {
    guild_id: GUILD,
    channel_id: STUDY,
};
const ALICE: u64 = 1;
const BOB: u64 = 2;

fn short_timer(focus_minutes: u32, break_minutes: u32) -> AppConfig {
    AppConfig {
        timer: TimerConfig {
            focus_minutes,
            break_minutes,
            ..TimerConfig::default()
        },
        ..AppConfig::default()
    }
}

#[tokio::test]
async fn first_join_creates_focus_room_with_default_duration() {
    let harness = Harness::default().await;

    let outcomes = participant_tracker::on_join(&harness.state, ALICE, GUILD, STUDY).await;
    assert_eq!(outcomes, vec![MembershipOutcome::RoomCreated]);

    let room = harness.state.rooms().get(KEY).unwrap();
    assert_eq!(room.phase, Phase::Focus);
    assert_eq!(room.remaining_secs, 1500);
    assert_eq!(room.duration_secs, 1500);
    assert_eq!(room.round_number, 1);
    assert!(room.confirmed.is_empty());

    let statuses = harness.sink.statuses();
    assert_eq!(statuses.len(), 1);
    assert_eq!(statuses[0].mode, MessageMode::New);
}

#[tokio::test]
async fn joins_outside_the_study_channel_are_ignored() {
    let harness = Harness::default().await;

    let outcomes = participant_tracker::on_join(&harness.state, ALICE, GUILD, STUDY + 1).await;
    assert_eq!(outcomes, vec![MembershipOutcome::Ignored]);
    let outcomes = participant_tracker::on_join(&harness.state, ALICE, GUILD + 1, STUDY).await;
    assert_eq!(outcomes, vec![MembershipOutcome::Ignored]);
    assert!(harness.state.rooms().is_empty());
}

#[tokio::test]
async fn duplicate_join_is_idempotent() {
    let harness = Harness::default().await;

    participant_tracker::on_join(&harness.state, ALICE, GUILD, STUDY).await;
    let outcomes = participant_tracker::on_join(&harness.state, ALICE, GUILD, STUDY).await;

    assert_eq!(outcomes, vec![MembershipOutcome::AlreadyPresent]);
    assert_eq!(harness.state.rooms().len(), 1);
    assert_eq!(harness.state.rooms().get(KEY).unwrap().participants, vec![ALICE]);
}

#[tokio::test]
async fn room_exists_only_while_occupied() {
    let harness = Harness::default().await;

    participant_tracker::on_join(&harness.state, ALICE, GUILD, STUDY).await;
    let outcome = participant_tracker::on_leave(&harness.state, ALICE, GUILD, STUDY).await;
    assert_eq!(outcome, MembershipOutcome::RoomRemoved);
    assert!(!harness.state.rooms().contains(KEY));
    assert_eq!(harness.sink.closed().len(), 1);

    // Leave for an unknown user is a silent no-op.
    let outcome = participant_tracker::on_leave(&harness.state, BOB, GUILD, STUDY).await;
    assert_eq!(outcome, MembershipOutcome::NotTracked);

    // Join and leave between two ticks.
    participant_tracker::on_join(&harness.state, BOB, GUILD, STUDY).await;
    participant_tracker::on_leave(&harness.state, BOB, GUILD, STUDY).await;
    let boundaries = harness.run_ticks(1).await;
    assert!(boundaries.is_empty());
    assert!(harness.state.rooms().is_empty());
}

#[tokio::test]
async fn full_focus_phase_credits_every_participant_once() {
    let harness = Harness::default().await;
    participant_tracker::on_join(&harness.state, ALICE, GUILD, STUDY).await;

    let boundaries = harness.run_ticks(1499).await;
    assert!(boundaries.is_empty());
    let room = harness.state.rooms().get(KEY).unwrap();
    assert_eq!(room.phase, Phase::Focus);
    assert_eq!(room.remaining_secs, 1);

    let boundaries = harness.run_ticks(1).await;
    assert_eq!(boundaries.len(), 1);
    assert_eq!(
        boundaries[0].credit,
        CreditOutcome::Attempted {
            minutes: 25,
            credited: vec![ALICE],
            failed: vec![],
        }
    );
    assert_eq!(boundaries[0].voice_alert, Some(true));

    let room = harness.state.rooms().get(KEY).unwrap();
    assert_eq!(room.phase, Phase::Break);
    assert_eq!(room.remaining_secs, 300);
    assert_eq!(room.round_number, 2);

    let logs = harness.store.session_logs();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].user_id, ALICE);
    assert_eq!(logs[0].guild_id, Some(GUILD));
    assert_eq!(logs[0].duration, 25);
    assert_eq!(logs[0].session_type, SessionKind::Focus);

    let stats = harness.store.stats(GUILD, ALICE).unwrap();
    assert_eq!(
        (stats.daily_time, stats.weekly_time, stats.monthly_time, stats.total_time),
        (25, 25, 25, 25)
    );

    let alerts = harness.sink.voice_alerts();
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].kind, VoiceAlertKind::BreakStart);

    // The boundary always posts a new status card.
    let last = harness.sink.statuses().pop().unwrap();
    assert_eq!(last.mode, MessageMode::New);
    assert_eq!(last.status.phase, Phase::Break);
}

#[tokio::test]
async fn break_end_credits_nothing_and_returns_to_focus() {
    let harness = Harness::new(short_timer(1, 1)).await;
    participant_tracker::on_join(&harness.state, ALICE, GUILD, STUDY).await;

    harness.run_ticks(60).await;
    let boundaries = harness.run_ticks(60).await;

    assert_eq!(boundaries.len(), 1);
    assert_eq!(boundaries[0].boundary.ended, Phase::Break);
    assert_eq!(boundaries[0].credit, CreditOutcome::NotApplicable);
    assert_eq!(harness.store.session_logs().len(), 1);

    let room = harness.state.rooms().get(KEY).unwrap();
    assert_eq!(room.phase, Phase::Focus);
    assert_eq!(room.round_number, 2);
    assert_eq!(
        harness.sink.voice_alerts().last().unwrap().kind,
        VoiceAlertKind::FocusStart
    );
}

#[tokio::test]
async fn leaving_before_boundary_excludes_only_that_user() {
    let harness = Harness::default().await;
    participant_tracker::on_join(&harness.state, ALICE, GUILD, STUDY).await;
    participant_tracker::on_join(&harness.state, BOB, GUILD, STUDY).await;

    harness.run_ticks(1490).await;
    participant_tracker::on_leave(&harness.state, ALICE, GUILD, STUDY).await;
    let boundaries = harness.run_ticks(10).await;

    assert_eq!(boundaries.len(), 1);
    assert_eq!(
        boundaries[0].credit,
        CreditOutcome::Attempted {
            minutes: 25,
            credited: vec![BOB],
            failed: vec![],
        }
    );
    assert!(harness.store.stats(GUILD, ALICE).is_none());
    assert_eq!(harness.store.stats(GUILD, BOB).unwrap().total_time, 25);
}

#[tokio::test]
async fn store_failure_is_reported_without_stalling_the_clock() {
    let harness = Harness::new(short_timer(1, 1)).await;
    participant_tracker::on_join(&harness.state, ALICE, GUILD, STUDY).await;
    harness.store.set_failing(true);

    let boundaries = harness.run_ticks(60).await;

    assert_eq!(
        boundaries[0].credit,
        CreditOutcome::Attempted {
            minutes: 1,
            credited: vec![],
            failed: vec![ALICE],
        }
    );
    assert_eq!(harness.state.rooms().get(KEY).unwrap().phase, Phase::Break);
}

#[tokio::test]
async fn degraded_store_skips_credit() {
    let harness = Harness::new(short_timer(1, 1)).await;
    participant_tracker::on_join(&harness.state, ALICE, GUILD, STUDY).await;
    harness.state.update_degraded(true);

    let boundaries = harness.run_ticks(60).await;

    assert_eq!(boundaries[0].credit, CreditOutcome::StoreUnavailable);
    assert!(harness.store.session_logs().is_empty());
}

#[tokio::test]
async fn settings_clamp_remaining_time_and_keep_round() {
    let harness = Harness::default().await;
    participant_tracker::on_join(&harness.state, ALICE, GUILD, STUDY).await;
    participant_tracker::confirm_presence(&harness.state, ALICE)
        .await
        .unwrap();
    harness.run_ticks(10).await;

    let response = command_service::update_settings(
        &harness.state,
        SettingsRequest {
            user_id: ALICE,
            focus_minutes: 1,
            break_minutes: 2,
            sound_enabled: None,
            voice_enabled: Some(false),
        },
    )
    .await
    .unwrap();

    assert_eq!(response.status.remaining_secs, 60);
    assert_eq!(response.status.duration_secs, 60);
    assert_eq!(response.status.round_number, 1);
    assert_eq!(response.status.confirmed_count, 1);
    assert!(!response.status.voice_alerts_enabled);

    // Lengthening keeps the remaining time.
    let response = command_service::update_settings(
        &harness.state,
        SettingsRequest {
            user_id: ALICE,
            focus_minutes: 50,
            break_minutes: 2,
            sound_enabled: None,
            voice_enabled: None,
        },
    )
    .await
    .unwrap();
    assert_eq!(response.status.remaining_secs, 60);
    assert_eq!(response.status.duration_secs, 3000);

    let boundaries = harness.run_ticks(60).await;
    assert_eq!(boundaries.len(), 1);
    assert_eq!(boundaries[0].boundary.next_duration_secs, 120);
    assert_eq!(boundaries[0].voice_alert, None);
}

#[tokio::test]
async fn remaining_time_stays_within_duration() {
    let harness = Harness::new(short_timer(1, 1)).await;
    participant_tracker::on_join(&harness.state, ALICE, GUILD, STUDY).await;

    for _ in 0..200 {
        harness.run_ticks(1).await;
        let room = harness.state.rooms().get(KEY).unwrap();
        assert!(room.remaining_secs <= room.duration_secs);
        assert!(room.remaining_secs > 0);
    }
}

#[tokio::test]
async fn last_leave_mid_phase_ends_the_session() {
    let harness = Harness::default().await;
    participant_tracker::on_join(&harness.state, ALICE, GUILD, STUDY).await;
    harness.run_ticks(30).await;

    participant_tracker::on_leave(&harness.state, ALICE, GUILD, STUDY).await;

    assert!(harness.state.rooms().is_empty());
    assert!(matches!(
        command_service::status(&harness.state, ALICE),
        Err(ServiceError::NotInSession)
    ));
    let err = command_service::update_settings(
        &harness.state,
        SettingsRequest {
            user_id: ALICE,
            focus_minutes: 10,
            break_minutes: 5,
            sound_enabled: None,
            voice_enabled: None,
        },
    )
    .await
    .unwrap_err();
    assert_eq!(err.to_string(), "You are not in an active study session.");
    assert!(harness.store.session_logs().is_empty());
}

#[tokio::test]
async fn voice_move_leaves_then_joins() {
    let harness = Harness::default().await;
    participant_tracker::on_join(&harness.state, ALICE, GUILD, STUDY).await;

    let outcomes = participant_tracker::on_voice_state(
        &harness.state,
        VoiceStateUpdate {
            user_id: ALICE,
            guild_id: GUILD,
            old_channel_id: Some(STUDY),
            new_channel_id: Some(STUDY + 5),
            is_bot: false,
        },
    )
    .await;
    assert_eq!(
        outcomes,
        vec![MembershipOutcome::RoomRemoved, MembershipOutcome::Ignored]
    );

    let outcomes = participant_tracker::on_voice_state(
        &harness.state,
        VoiceStateUpdate {
            user_id: ALICE,
            guild_id: GUILD,
            old_channel_id: Some(STUDY + 5),
            new_channel_id: Some(STUDY + 5),
            is_bot: false,
        },
    )
    .await;
    assert_eq!(outcomes, vec![MembershipOutcome::Ignored]);
}

#[tokio::test]
async fn long_break_follows_configured_round() {
    let config = AppConfig {
        timer: TimerConfig {
            focus_minutes: 1,
            break_minutes: 1,
            long_break: Some(LongBreakConfig {
                minutes: 3,
                every_rounds: 2,
            }),
            ..TimerConfig::default()
        },
        ..AppConfig::default()
    };
    let harness = Harness::new(config).await;
    participant_tracker::on_join(&harness.state, ALICE, GUILD, STUDY).await;

    let boundaries = harness.run_ticks(60 * 3).await;
    let phases: Vec<Phase> = boundaries.iter().map(|outcome| outcome.boundary.next).collect();
    assert_eq!(phases, vec![Phase::Break, Phase::Focus, Phase::LongBreak]);
    assert_eq!(harness.state.rooms().get(KEY).unwrap().remaining_secs, 180);
}

#[tokio::test]
async fn scheduled_report_fires_once_per_bucket_then_resets() {
    let harness = Harness::default().await;
    harness.store.increment_aggregate(GUILD, ALICE, 40).await.unwrap();
    harness.store.increment_aggregate(GUILD, BOB, 15).await.unwrap();
    let scheduler = ReportScheduler::new(harness.state.clone());

    // 2026-10-14 is a Wednesday: only the daily trigger is due.
    let first = scheduler.check(datetime!(2026-10-14 21:00:00 UTC)).await;
    let second = scheduler.check(datetime!(2026-10-14 21:00:40 UTC)).await;
    let third = scheduler.check(datetime!(2026-10-14 21:00:59 UTC)).await;

    assert_eq!(first.len(), 1);
    assert!(second.is_empty());
    assert!(third.is_empty());

    let outcome = &first[0];
    assert_eq!(outcome.timeframe, Timeframe::Daily);
    assert_eq!(
        outcome.guilds,
        vec![(GUILD, ReportDelivery::Delivered { channel_id: REPORTS })]
    );
    assert_eq!(outcome.reset, ResetOutcome::Reset { rows: 2 });

    let reports = harness.sink.reports();
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].title, "Daily Leaderboard");
    let ranked: Vec<(u64, u64)> = reports[0]
        .entries
        .iter()
        .map(|line| (line.user_id, line.minutes))
        .collect();
    assert_eq!(ranked, vec![(ALICE, 40), (BOB, 15)]);

    let stats = harness.store.stats(GUILD, ALICE).unwrap();
    assert_eq!(stats.daily_time, 0);
    assert_eq!(stats.weekly_time, 40);
    assert_eq!(stats.total_time, 40);

    // Next day fires again.
    let next_day = scheduler.check(datetime!(2026-10-15 21:00 UTC)).await;
    assert_eq!(next_day.len(), 1);
    assert_eq!(next_day[0].guilds, vec![(GUILD, ReportDelivery::NoData)]);
}

#[tokio::test]
async fn undelivered_report_keeps_counters_under_skip_policy() {
    let config = AppConfig {
        reports: ReportConfig {
            reset_policy: ResetPolicy::SkipOnTotalFailure,
            ..ReportConfig::default()
        },
        ..AppConfig::default()
    };
    let harness = Harness::new(config).await;
    harness.store.increment_aggregate(GUILD, ALICE, 40).await.unwrap();
    harness.sink.reject_reports(true);
    let scheduler = ReportScheduler::new(harness.state.clone());

    // 2026-10-16 is a Friday.
    let outcomes = scheduler.check(datetime!(2026-10-16 21:00 UTC)).await;

    assert_eq!(outcomes.len(), 2);
    for outcome in &outcomes {
        assert_eq!(outcome.reset, ResetOutcome::Skipped);
        assert_eq!(
            outcome.guilds,
            vec![(GUILD, ReportDelivery::NotDelivered { channel_id: REPORTS })]
        );
    }
    let stats = harness.store.stats(GUILD, ALICE).unwrap();
    assert_eq!((stats.daily_time, stats.weekly_time), (40, 40));
}

#[tokio::test]
async fn undelivered_report_still_resets_under_default_policy() {
    let harness = Harness::default().await;
    harness.store.increment_aggregate(GUILD, ALICE, 40).await.unwrap();
    harness.sink.reject_reports(true);
    let scheduler = ReportScheduler::new(harness.state.clone());

    let outcomes = scheduler.check(datetime!(2026-10-14 21:00 UTC)).await;

    assert_eq!(outcomes[0].reset, ResetOutcome::Reset { rows: 1 });
    assert_eq!(harness.store.stats(GUILD, ALICE).unwrap().daily_time, 0);
}

#[tokio::test]
async fn manual_leaderboard_renders_no_data_and_never_resets() {
    let harness = Harness::default().await;

    let response = command_service::leaderboard(
        &harness.state,
        pomora_back::dto::commands::LeaderboardRequest {
            guild_id: GUILD,
            channel_id: 999,
            timeframe: None,
        },
    )
    .await
    .unwrap();
    assert!(response.delivered);
    assert!(response.report.no_data);
    assert_eq!(response.report.timeframe, Timeframe::Weekly);
    assert_eq!(response.report.channel_id, 999);

    harness.store.increment_aggregate(GUILD, ALICE, 30).await.unwrap();
    let response = command_service::leaderboard(
        &harness.state,
        pomora_back::dto::commands::LeaderboardRequest {
            guild_id: GUILD,
            channel_id: 999,
            timeframe: Some(Timeframe::Daily),
        },
    )
    .await
    .unwrap();
    assert!(!response.report.no_data);
    assert_eq!(harness.store.stats(GUILD, ALICE).unwrap().daily_time, 30);
}

#[tokio::test]
async fn leave_arriving_during_join_lookup_still_empties_the_room() {
    let harness = Harness::default().await;
    harness
        .state
        .install_session_store(Arc::new(YieldingConfigStore::new(harness.store.clone(), 5)))
        .await;

    let (joined, left) = tokio::join!(
        participant_tracker::on_join(&harness.state, ALICE, GUILD, STUDY),
        async {
            tokio::task::yield_now().await;
            participant_tracker::on_leave(&harness.state, ALICE, GUILD, STUDY).await
        }
    );

    assert_eq!(joined, vec![MembershipOutcome::RoomCreated]);
    assert_eq!(left, MembershipOutcome::RoomRemoved);
    assert!(!harness.state.rooms().contains(KEY));
    assert!(harness.state.rooms().find_by_user(ALICE).is_none());

    harness.run_ticks(1500).await;
    assert!(harness.store.stats(GUILD, ALICE).is_none());
    assert!(harness.store.session_logs().is_empty());
}
