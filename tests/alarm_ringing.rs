// Ringing: single delivery from either path, dismissal and the safety ceilings.

mod common;

use std::{sync::atomic::Ordering, time::Duration};

use common::{advance, settle, Harness, T0};
use focus_alarm::{
    events::PlatformEvent,
    scheduler::{AlarmBackend, AlarmKey},
    services::{
        platform::{NotificationAction, NotificationId},
        DismissReason,
    },
    store::PersistedTimer,
    tasks::{dispatch, notification_action_task, CommandResult},
};
use tokio::sync::mpsc;

#[tokio::test(start_paused = true)]
async fn duplicate_start_rings_once() {
    let h = Harness::new();

    assert!(h.state.ringing.start_alarm());
    assert!(!h.state.ringing.start_alarm());

    assert_eq!(h.outputs.audio.started(), 1);
    assert_eq!(h.outputs.vibration.started(), 1);
    assert_eq!(h.outputs.wake_lock.started(), 1);
    assert_eq!(h.notifier.posted(NotificationId::Alarm), 1);
}

#[tokio::test(start_paused = true)]
async fn concurrent_starts_ring_once() {
    let h = Harness::new();

    let mut tasks = Vec::new();
    for _ in 0..8 {
        let ringing = h.state.ringing.clone();
        tasks.push(tokio::spawn(async move { ringing.start_alarm() }));
    }
    let mut winners = 0;
    for task in tasks {
        if task.await.unwrap() {
            winners += 1;
        }
    }

    assert_eq!(winners, 1);
    assert_eq!(h.outputs.audio.started(), 1);
}

#[tokio::test(start_paused = true)]
async fn wake_lock_is_bounded() {
    let h = Harness::new();
    h.state.ringing.start_alarm();
    assert_eq!(
        *h.outputs.wake_lock_timeouts.lock().unwrap(),
        vec![Duration::from_secs(600)]
    );
}

#[tokio::test(start_paused = true)]
async fn dismiss_releases_everything_and_clears_record() {
    let h = Harness::new();
    h.state.timer.start_timer(5).unwrap();
    advance(5_001).await;
    assert!(h.state.ringing.is_ringing());

    let results = dispatch(&h.state, PlatformEvent::DismissRequested);
    assert_eq!(results, vec![CommandResult::RingingStopped { stopped: true }]);

    assert!(!h.state.ringing.is_ringing());
    assert_eq!(h.outputs.audio.active(), 0);
    assert_eq!(h.outputs.vibration.active(), 0);
    assert_eq!(h.outputs.wake_lock.active(), 0);
    assert_eq!(h.notifier.cancelled(NotificationId::Alarm), 1);
    assert!(h.persisted().is_none());
    assert!(h.state.alarm_backend.pending().is_empty());

    // A second dismiss has nothing to do
    assert!(!h.state.ringing.stop_alarm(DismissReason::User));
}

#[tokio::test(start_paused = true)]
async fn dismissing_keeps_a_newly_started_countdown() {
    let h = Harness::new();
    h.state.timer.start_timer(5).unwrap();
    advance(5_001).await;
    assert!(h.state.ringing.is_ringing());

    // Next session started before the alarm was dismissed
    h.state.timer.start_timer(600).unwrap();
    assert!(h.state.ringing.stop_alarm(DismissReason::User));

    assert!(h.state.timer.is_running());
    assert_eq!(
        h.persisted().unwrap().end_time_epoch_millis,
        T0 + 5_001 + 600_000
    );
    assert!(h.state.alarm_backend.is_armed(AlarmKey::TimerFallback));

    advance(600_001).await;
    assert!(h.state.ringing.is_ringing());
    assert_eq!(h.outputs.audio.started(), 2);
}

#[tokio::test(start_paused = true)]
async fn auto_dismiss_keeps_a_newly_started_countdown() {
    let h = Harness::new();
    h.state.timer.start_timer(5).unwrap();
    advance(5_001).await;
    h.state.timer.start_timer(1_800).unwrap();

    advance(600_000).await;
    assert!(!h.state.ringing.is_ringing());
    assert!(h.state.timer.is_running());
    assert!(h.persisted().is_some());
    assert!(h.state.alarm_backend.is_armed(AlarmKey::TimerFallback));
}

#[tokio::test(start_paused = true)]
async fn notification_buttons_drive_the_pipeline() {
    let h = Harness::new();
    let (actions_tx, actions_rx) = mpsc::unbounded_channel();
    tokio::spawn(notification_action_task(h.state.clone(), actions_rx));

    h.state.timer.start_timer(60).unwrap();
    actions_tx.send(NotificationAction::StopTimer).unwrap();
    settle().await;
    assert!(!h.state.timer.is_running());
    assert!(h.persisted().is_none());

    h.state.ringing.start_alarm();
    actions_tx.send(NotificationAction::DismissAlarm).unwrap();
    settle().await;
    assert!(!h.state.ringing.is_ringing());
    assert_eq!(h.outputs.audio.active(), 0);
    assert_eq!(h.state.last_action.lock().unwrap().as_deref(), Some("notification-dismiss"));
}

#[tokio::test(start_paused = true)]
async fn alarm_can_ring_again_after_dismissal() {
    let h = Harness::new();
    assert!(h.state.ringing.start_alarm());
    assert!(h.state.ringing.stop_alarm(DismissReason::User));
    assert!(h.state.ringing.start_alarm());
    assert_eq!(h.outputs.audio.started(), 2);
    assert_eq!(h.outputs.audio.active(), 1);
}

#[tokio::test(start_paused = true)]
async fn undismissed_alarm_stops_itself() {
    // An elapsed record left over for the auto-dismiss to clean up
    let record = PersistedTimer::starting_at(T0 - 60_000, 30_000);
    let h = Harness::builder().persisted(record).build();
    let mut ringing = h.state.ringing.subscribe();

    h.state.ringing.start_alarm();
    ringing.changed().await.unwrap();
    assert!(*ringing.borrow());

    advance(599_000).await;
    assert!(h.state.ringing.is_ringing());

    advance(1_001).await;
    assert!(!h.state.ringing.is_ringing());
    assert!(!*ringing.borrow_and_update());
    assert_eq!(h.outputs.audio.active(), 0);
    assert_eq!(h.outputs.wake_lock.active(), 0);
    assert!(h.persisted().is_none());
}

#[tokio::test(start_paused = true)]
async fn early_dismissal_is_not_undone_by_stale_auto_dismiss() {
    let h = Harness::new();
    h.state.ringing.start_alarm();
    advance(60_000).await;
    h.state.ringing.stop_alarm(DismissReason::User);

    // A new alarm five minutes later must get its own full ten minutes
    advance(300_000).await;
    h.state.ringing.start_alarm();
    advance(400_000).await;
    assert!(h.state.ringing.is_ringing());

    advance(200_001).await;
    assert!(!h.state.ringing.is_ringing());
}

#[tokio::test(start_paused = true)]
async fn missing_sound_still_notifies_and_vibrates() {
    let h = Harness::new();
    h.outputs.audio.fail.store(true, Ordering::SeqCst);

    assert!(h.state.ringing.start_alarm());
    assert!(h.state.ringing.is_ringing());
    assert_eq!(h.notifier.posted(NotificationId::Alarm), 1);
    assert_eq!(h.outputs.vibration.started(), 1);
    assert_eq!(h.outputs.audio.started(), 0);

    assert!(h.state.ringing.stop_alarm(DismissReason::User));
    assert_eq!(h.outputs.vibration.active(), 0);
}

#[tokio::test(start_paused = true)]
async fn rings_without_wake_lock() {
    let h = Harness::new();
    h.outputs.wake_lock.fail.store(true, Ordering::SeqCst);
    assert!(h.state.ringing.start_alarm());
    assert_eq!(h.outputs.audio.started(), 1);
}

#[tokio::test(start_paused = true)]
async fn fallback_alarm_rings_when_countdown_is_gone() {
    // The process that ran the countdown died; only the fallback remains
    let record = PersistedTimer::starting_at(T0, 5_000);
    let h = Harness::builder().persisted(record).build();
    h.state
        .alarm_backend
        .set_exact_and_allow_while_idle(AlarmKey::TimerFallback, T0 + 5_000)
        .unwrap();

    advance(4_999).await;
    assert!(!h.state.ringing.is_ringing());
    advance(2).await;
    assert!(h.state.ringing.is_ringing());
    assert_eq!(h.outputs.audio.started(), 1);

    h.state.ringing.stop_alarm(DismissReason::User);
    assert!(h.persisted().is_none());
}

#[tokio::test(start_paused = true)]
async fn fallback_and_countdown_together_ring_once() {
    let h = Harness::new();
    h.state.timer.start_timer(30).unwrap();

    // Fire the fallback path by hand just before the countdown finishes
    advance(29_999).await;
    let results = dispatch(
        &h.state,
        PlatformEvent::AlarmFired {
            key: AlarmKey::TimerFallback,
        },
    );
    assert_eq!(results, vec![CommandResult::Ringing { started: true }]);

    advance(2).await;
    settle().await;
    assert!(h.state.ringing.is_ringing());
    assert_eq!(h.outputs.audio.started(), 1);
    assert!(!h.state.timer.is_running());
}
