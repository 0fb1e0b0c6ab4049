//! Parent clock changes interleaved with commits.
//!
//! A parent PLL change must land at a frame boundary and must never race a
//! commit programming the pixel divider; the next commit after a change
//! re-derives the divider even without a modeset.
#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

mod common;

use common::{commit, framebuffer, qvga, with_vblank, Rig};
use embassy_futures::join::join;
use embassy_time::{Duration, Timer};
use lcdc::{ClockSyncPhase, CommitRequest, DestRect, PixelFormat, PlaneState, SocModel};
use platform::mocks::{ClockEvent, MockClock, MockPanel};
use platform::{BusConfig, BusFormat, RateChangeEvent};

fn slow_clock_rig() -> Rig {
    Rig::with_clock(
        BusConfig::dpi(BusFormat::Rgb565_1x16),
        MockClock::new(1_000_000, 50_000_000).with_ack_latency(Duration::from_millis(2)),
    )
}

#[tokio::test]
async fn parent_change_serializes_with_commit_flush() {
    let rig = slow_clock_rig();
    let engine = rig.engine(SocModel::Jz4760);
    let front = framebuffer(&engine, 0, 320, 240, PixelFormat::Rgb565);
    let back = framebuffer(&engine, 1, 320, 240, PixelFormat::Rgb565);
    let screen = DestRect::full_screen(&qvga());

    commit(
        &engine,
        &rig.regs,
        &CommitRequest::enable(qvga()).with_primary(PlaneState::new(front, screen)),
    )
    .await
    .unwrap();
    assert_eq!(engine.clock_sync_phase(), ClockSyncPhase::Idle);

    let flip = CommitRequest::keep_mode().with_primary(PlaneState::new(back, screen));
    let (parent, flipped) = with_vblank(
        &engine,
        &rig.regs,
        join(engine.request_clock_rate_change(600_000_000), async {
            // The parent change already holds the clock and waits for blanking.
            assert_eq!(engine.clock_sync_phase(), ClockSyncPhase::WaitingForBlank);
            engine.commit(&flip).await
        }),
    )
    .await;
    parent.unwrap();
    let flipped = flipped.unwrap();
    assert!(!flipped.modeset);

    assert_eq!(
        rig.clock.events().as_slice(),
        &[
            ClockEvent::SetRate(7_200_000),
            ClockEvent::SetParentRate(600_000_000),
            ClockEvent::SetRate(7_200_000),
        ]
    );
    assert_eq!(engine.clock_sync_phase(), ClockSyncPhase::Idle);
}

#[tokio::test]
async fn parent_change_waits_for_a_modeset_to_settle() {
    let mut rig = slow_clock_rig();
    rig.panel = MockPanel::new(BusConfig::dpi(BusFormat::Rgb565_1x16))
        .with_power_up(Duration::from_millis(10));
    let engine = rig.engine(SocModel::Jz4760);
    let fb = framebuffer(&engine, 0, 320, 240, PixelFormat::Rgb565);
    let req = CommitRequest::enable(qvga())
        .with_primary(PlaneState::new(fb, DestRect::full_screen(&qvga())));

    // The request lands while the divider is being programmed, well before
    // the panel has powered up.
    let ((settled, parent_at_settle), parent) = with_vblank(
        &engine,
        &rig.regs,
        join(
            async {
                let settled = engine.commit(&req).await;
                (settled, rig.clock.parent_rate())
            },
            async {
                Timer::after(Duration::from_millis(1)).await;
                engine.request_clock_rate_change(600_000_000).await
            },
        ),
    )
    .await;
    assert!(settled.unwrap().modeset);
    parent.unwrap();

    assert_eq!(
        parent_at_settle, 0,
        "parent changed before the commit settled"
    );
    assert_eq!(rig.clock.parent_rate(), 600_000_000);
    assert_eq!(
        rig.clock.events().as_slice(),
        &[
            ClockEvent::SetRate(7_200_000),
            ClockEvent::SetParentRate(600_000_000),
        ]
    );
    assert_eq!(engine.clock_sync_phase(), ClockSyncPhase::Idle);
}

#[tokio::test]
async fn notifier_holds_the_clock_until_post_change() {
    let rig = slow_clock_rig();
    let engine = rig.engine(SocModel::Jz4760);
    let fb = framebuffer(&engine, 0, 320, 240, PixelFormat::Rgb565);
    let screen = DestRect::full_screen(&qvga());
    commit(
        &engine,
        &rig.regs,
        &CommitRequest::enable(qvga()).with_primary(PlaneState::new(fb, screen)),
    )
    .await
    .unwrap();

    let mut held = None;
    with_vblank(
        &engine,
        &rig.regs,
        engine.on_rate_change(
            RateChangeEvent::PreRateChange {
                new_hz: 432_000_000,
            },
            &mut held,
        ),
    )
    .await;
    assert!(held.is_some());
    assert_eq!(engine.clock_sync_phase(), ClockSyncPhase::WaitingForBlank);

    engine
        .on_rate_change(
            RateChangeEvent::PostRateChange {
                new_hz: 432_000_000,
            },
            &mut held,
        )
        .await;
    assert!(held.is_none());
    assert_eq!(engine.clock_sync_phase(), ClockSyncPhase::Idle);

    // The divider was left stale: the next plain flip reprograms it.
    commit(
        &engine,
        &rig.regs,
        &CommitRequest::keep_mode().with_primary(PlaneState::new(fb, screen)),
    )
    .await
    .unwrap();
    assert_eq!(
        rig.clock.events().as_slice(),
        &[
            ClockEvent::SetRate(7_200_000),
            ClockEvent::SetRate(7_200_000)
        ]
    );

    // Without a pending change the flip leaves the clock alone.
    commit(
        &engine,
        &rig.regs,
        &CommitRequest::keep_mode().with_primary(PlaneState::new(fb, screen)),
    )
    .await
    .unwrap();
    assert_eq!(rig.clock.events().len(), 2);
}

#[tokio::test]
async fn aborted_change_releases_the_clock() {
    let rig = slow_clock_rig();
    let engine = rig.engine(SocModel::Jz4740);

    // Display off: nothing to wait for.
    let mut held = None;
    engine
        .on_rate_change(
            RateChangeEvent::PreRateChange {
                new_hz: 384_000_000,
            },
            &mut held,
        )
        .await;
    assert_eq!(engine.clock_sync_phase(), ClockSyncPhase::WaitingForBlank);

    engine
        .on_rate_change(RateChangeEvent::AbortRateChange, &mut held)
        .await;
    assert!(held.is_none());
    assert_eq!(engine.clock_sync_phase(), ClockSyncPhase::Idle);

    // A stray post-change without a pre-change is harmless.
    engine
        .on_rate_change(
            RateChangeEvent::PostRateChange {
                new_hz: 384_000_000,
            },
            &mut held,
        )
        .await;
    assert_eq!(engine.clock_sync_phase(), ClockSyncPhase::Idle);
}

#[tokio::test]
async fn rate_change_with_display_off_applies_immediately() {
    let rig = slow_clock_rig();
    let engine = rig.engine(SocModel::Jz4740);
    engine.request_clock_rate_change(480_000_000).await.unwrap();
    assert_eq!(rig.clock.parent_rate(), 480_000_000);
    assert_eq!(
        rig.clock.events().as_slice(),
        &[ClockEvent::SetParentRate(480_000_000)]
    );
}
