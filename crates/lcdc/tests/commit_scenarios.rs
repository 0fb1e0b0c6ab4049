//! End-to-end commit scenarios against mocked hardware.
//!
//! Each test drives `propose` / `await_settled` the way a display stack
//! would and then inspects the descriptor chains the controller would
//! fetch and the registers it would see.
#![allow(
    clippy::unwrap_used,
    clippy::indexing_slicing,
    clippy::arithmetic_side_effects
)]

mod common;

use common::{chain, commit, framebuffer, qvga, with_vblank, Rig, FB_BASE};
use lcdc::descriptor::{self, PALETTE_ENTRIES};
use lcdc::regs;
use lcdc::{
    CommitError, CommitRequest, DescriptorMemory, DestRect, Error, FramebufferError, LutEntry,
    PixelFormat, PlaneRole, PlaneState, SocModel, SourceRect, ValidationError,
};
use platform::mocks::MockClock;
use platform::{BusConfig, BusFormat, ConnectorKind, PixelClock};

fn full(fb: lcdc::Framebuffer) -> PlaneState {
    PlaneState::new(fb, DestRect::full_screen(&qvga()))
}

#[tokio::test]
async fn qvga_rgb565_scans_out_in_one_transfer() {
    let rig = Rig::rgb565();
    let engine = rig.engine(SocModel::Jz4740);
    let fb = framebuffer(&engine, 0, 320, 240, PixelFormat::Rgb565);

    let handle = engine
        .propose(&CommitRequest::enable(qvga()).with_primary(full(fb)))
        .unwrap();
    assert!(handle.mode_changed());
    assert!(!handle.no_vblank());

    let settled = with_vblank(&engine, &rig.regs, engine.await_settled(handle))
        .await
        .unwrap();
    assert!(settled.modeset);
    assert!(settled.configuration.active);

    let nodes = chain(&engine, PlaneRole::Primary).await;
    assert_eq!(nodes.len(), 1);
    let (head_addr, head) = nodes[0];
    assert_eq!(head.words(), 320 * 240 * 2 / 4);
    assert_eq!(head.words(), 38_400);
    assert!(head.ends_frame());
    assert_eq!(head.addr, FB_BASE);
    assert_eq!(head.next, head_addr.get(), "head must loop on itself");

    assert_eq!(rig.regs.peek(regs::REG_DA0), head_addr.get());
    assert_eq!(rig.regs.peek(regs::REG_VAT), (400 << 16) | 300);
    assert_eq!(rig.regs.peek(regs::REG_DAH), (60 << 16) | 380);
    assert_eq!(rig.regs.peek(regs::REG_DAV), (40 << 16) | 280);
    assert_eq!(rig.regs.peek(regs::REG_HSYNC), 20);
    assert_eq!(rig.regs.peek(regs::REG_VSYNC), 20);

    let ctrl = rig.regs.peek(regs::REG_CTRL);
    assert_ne!(ctrl & regs::CTRL_ENABLE, 0);
    assert_ne!(ctrl & regs::CTRL_EOF_IRQ, 0);
    assert_ne!(ctrl & regs::CTRL_OFUP, 0);
    assert_eq!(ctrl & regs::CTRL_BPP_MASK, regs::CTRL_BPP_15_16);

    assert!(rig.panel.is_enabled());
    assert_eq!(rig.clock.rate(), 7_200_000);
}

#[tokio::test]
async fn twice_the_source_height_is_doublescanned() {
    let rig = Rig::rgb565();
    let engine = rig.engine(SocModel::Jz4725b);
    let fb = framebuffer(&engine, 0, 320, 240, PixelFormat::Rgb565);

    let req = CommitRequest::enable(qvga())
        .with_primary(PlaneState::new(fb, DestRect::new(0, 0, 320, 480)));
    let handle = engine.propose(&req).unwrap();
    assert!(handle.private_state().doublescan_in_use);
    with_vblank(&engine, &rig.regs, engine.await_settled(handle))
        .await
        .unwrap();

    let nodes = chain(&engine, PlaneRole::Primary).await;
    assert_eq!(nodes.len(), 480);

    // Every source line is fetched twice, one line per descriptor.
    for (i, (_, node)) in nodes.iter().enumerate() {
        assert_eq!(node.addr, FB_BASE + (i as u32 / 2) * 640, "node {i}");
        assert_eq!(node.words(), 160);
    }
    let (_, last) = nodes[479];
    assert!(last.ends_frame());
    assert!(nodes[..479].iter().all(|(_, n)| !n.ends_frame()));
    assert_eq!(last.next, nodes[0].0.get());

    assert_eq!(rig.regs.peek(regs::REG_SIZE0), 320 | (480 << 16));
}

#[tokio::test]
async fn output_height_neither_equal_nor_double_is_rejected() {
    let rig = Rig::rgb565();
    let engine = rig.engine(SocModel::Jz4725b);
    let fb = framebuffer(&engine, 0, 320, 240, PixelFormat::Rgb565);
    rig.regs.clear_log();

    let req = CommitRequest::enable(qvga())
        .with_primary(PlaneState::new(fb, DestRect::new(0, 0, 320, 300)));
    assert_eq!(
        engine.propose(&req).unwrap_err(),
        ValidationError::HeightMismatch {
            plane: PlaneRole::Primary,
            src: 240,
            dst: 300
        }
    );
    assert_eq!(
        rig.regs.write_count(),
        0,
        "validation must not touch hardware"
    );
    assert!(!engine.settled().active);
}

#[tokio::test]
async fn overlay_past_the_right_edge_is_rejected() {
    let rig = Rig::rgb565();
    let engine = rig.engine(SocModel::Jz4725b);
    let primary = framebuffer(&engine, 0, 320, 240, PixelFormat::Rgb565);
    let osd = framebuffer(&engine, 1, 320, 240, PixelFormat::Rgb565);
    rig.regs.clear_log();

    let req = CommitRequest::enable(qvga())
        .with_primary(PlaneState::new(primary, DestRect::full_screen(&qvga())))
        .with_overlay(PlaneState::new(osd, DestRect::new(400, 0, 320, 240)));
    assert_eq!(
        engine.propose(&req).unwrap_err(),
        ValidationError::PositionOutOfRange {
            plane: PlaneRole::Overlay
        }
    );
    assert_eq!(rig.regs.write_count(), 0);
}

#[tokio::test]
async fn no_planes_synthesizes_completion() {
    let rig = Rig::rgb565();
    let engine = rig.engine(SocModel::Jz4740);

    let handle = engine
        .propose(&CommitRequest::enable(qvga()).with_event())
        .unwrap();
    assert!(handle.no_vblank());

    // No interrupt source is running: this must not wait for a frame.
    let settled = engine.await_settled(handle).await.unwrap();
    assert!(settled.no_vblank);
    let event = settled.event.unwrap();
    assert!(event.synthesized);
    assert_eq!(event.sequence, 0);
}

#[tokio::test]
async fn buffer_swap_reprograms_only_the_chain() {
    let rig = Rig::rgb565();
    let engine = rig.engine(SocModel::Jz4760);
    let front = framebuffer(&engine, 0, 320, 240, PixelFormat::Rgb565);
    let back = framebuffer(&engine, 1, 320, 240, PixelFormat::Rgb565);

    commit(
        &engine,
        &rig.regs,
        &CommitRequest::enable(qvga()).with_primary(full(front)),
    )
    .await
    .unwrap();
    rig.regs.clear_log();

    let req = CommitRequest::keep_mode()
        .with_primary(full(back))
        .with_event();
    let handle = engine.propose(&req).unwrap();
    assert!(!handle.mode_changed());

    let settled = with_vblank(&engine, &rig.regs, engine.await_settled(handle))
        .await
        .unwrap();
    let event = settled.event.unwrap();
    assert!(!event.synthesized);
    assert!(event.sequence > 0);

    let nodes = chain(&engine, PlaneRole::Primary).await;
    assert_eq!(nodes[0].1.addr, FB_BASE + 0x0010_0000);

    assert!(rig.regs.writes_to(regs::REG_DA0).is_empty());
    assert!(rig.regs.writes_to(regs::REG_VAT).is_empty());
    assert!(rig
        .regs
        .writes_to(regs::REG_CTRL)
        .iter()
        .all(|v| v & regs::CTRL_DISABLE == 0));
    assert_eq!(rig.panel.enable_count(), 1);
    assert_eq!(rig.panel.disable_count(), 0);
}

#[tokio::test]
async fn recommitting_the_settled_configuration_changes_nothing() {
    let rig = Rig::rgb565();
    let engine = rig.engine(SocModel::Jz4760);
    let fb = framebuffer(&engine, 0, 320, 240, PixelFormat::Xrgb8888);
    let req = CommitRequest::enable(qvga())
        .with_primary(PlaneState::new(fb, DestRect::new(0, 0, 320, 480)));
    commit(&engine, &rig.regs, &req).await.unwrap();

    let before = engine.settled();
    let control = engine.with_descriptors(|m| m.control().clone()).await;
    let lines = engine.with_descriptors(|m| m.slots()[..480].to_vec()).await;

    let again = commit(&engine, &rig.regs, &before.to_request())
        .await
        .unwrap();
    assert!(!again.modeset);
    assert_eq!(engine.settled(), before);
    assert_eq!(
        engine.with_descriptors(|m| m.control().clone()).await,
        control
    );
    assert_eq!(
        engine.with_descriptors(|m| m.slots()[..480].to_vec()).await,
        lines
    );
}

#[tokio::test]
async fn overlay_is_positioned_through_the_osd() {
    let rig = Rig::rgb565();
    let engine = rig.engine(SocModel::Jz4760);
    let base = framebuffer(&engine, 0, 320, 240, PixelFormat::Rgb565);
    let osd = framebuffer(&engine, 1, 128, 64, PixelFormat::Rgb565);

    let req = CommitRequest::enable(qvga())
        .with_primary(full(base))
        .with_overlay(PlaneState::new(osd, DestRect::new(16, 32, 128, 64)));
    commit(&engine, &rig.regs, &req).await.unwrap();

    let osdc = rig.regs.peek(regs::REG_OSDC);
    assert_eq!(
        osdc & (regs::OSDC_OSDEN | regs::OSDC_F0EN | regs::OSDC_F1EN),
        regs::OSDC_OSDEN | regs::OSDC_F0EN | regs::OSDC_F1EN
    );
    assert_eq!(rig.regs.peek(regs::REG_XYP1), 16 | (32 << 16));
    assert_eq!(rig.regs.peek(regs::REG_SIZE1), 128 | (64 << 16));
    assert_eq!(
        rig.regs.peek(regs::REG_OSDCTRL) & regs::OSDCTRL_BPP_MASK,
        regs::OSDCTRL_BPP_15_16
    );

    let overlay = chain(&engine, PlaneRole::Overlay).await;
    assert_eq!(overlay.len(), 1);
    assert_eq!(overlay[0].1.addr, FB_BASE + 0x0010_0000);
    assert_eq!(overlay[0].1.words(), 128 * 64 * 2 / 4);
    assert_eq!(rig.regs.peek(regs::REG_DA1), overlay[0].0.get());

    // Turning the overlay off clears its enable bit.
    commit(
        &engine,
        &rig.regs,
        &CommitRequest::keep_mode().with_primary(full(base)),
    )
    .await
    .unwrap();
    assert_eq!(rig.regs.peek(regs::REG_OSDC) & regs::OSDC_F1EN, 0);
}

#[tokio::test]
async fn cropped_source_starts_inside_the_framebuffer() {
    let rig = Rig::rgb565();
    let engine = rig.engine(SocModel::Jz4760);
    let fb = framebuffer(&engine, 0, 640, 480, PixelFormat::Rgb565);

    let plane = PlaneState::new(fb, DestRect::full_screen(&qvga()))
        .with_source(SourceRect::pixels(8, 4, 320, 240));
    commit(
        &engine,
        &rig.regs,
        &CommitRequest::enable(qvga()).with_primary(plane),
    )
    .await
    .unwrap();

    let nodes = chain(&engine, PlaneRole::Primary).await;
    assert_eq!(nodes[0].1.addr, FB_BASE + 4 * 1280 + 8 * 2);
}

#[tokio::test]
async fn overlay_and_alternate_source_share_a_channel() {
    let rig = Rig::rgb565();
    let engine = rig.engine(SocModel::Jz4760);
    let osd = framebuffer(&engine, 0, 64, 64, PixelFormat::Rgb565);
    let req = CommitRequest::enable(qvga())
        .with_overlay(PlaneState::new(osd, DestRect::new(0, 0, 64, 64)))
        .with_alternate_source(true);
    assert_eq!(
        engine.propose(&req).unwrap_err(),
        ValidationError::OverlayConflict
    );

    let single = Rig::rgb565();
    let engine = single.engine(SocModel::Jz4740);
    let req = CommitRequest::enable(qvga()).with_alternate_source(true);
    assert_eq!(
        engine.propose(&req).unwrap_err(),
        ValidationError::OverlayUnavailable
    );
}

#[tokio::test]
async fn alternate_source_routes_channel_one_to_the_ipu() {
    let rig = Rig::rgb565();
    let engine = rig.engine(SocModel::Jz4760);
    let settled = commit(
        &engine,
        &rig.regs,
        &CommitRequest::enable(qvga()).with_alternate_source(true),
    )
    .await
    .unwrap();
    assert!(!settled.no_vblank);
    assert_ne!(rig.regs.peek(regs::REG_OSDCTRL) & regs::OSDCTRL_IPU, 0);

    commit(&engine, &rig.regs, &CommitRequest::keep_mode())
        .await
        .unwrap();
    assert_eq!(rig.regs.peek(regs::REG_OSDCTRL) & regs::OSDCTRL_IPU, 0);
}

#[tokio::test]
async fn indexed_primary_loads_the_palette_first() {
    let rig = Rig::rgb565();
    let engine = rig.engine(SocModel::Jz4725b);
    let fb = framebuffer(&engine, 0, 320, 240, PixelFormat::C8);

    let mut lut = [LutEntry::default(); PALETTE_ENTRIES];
    lut[1] = LutEntry::from_rgb8(0xFF, 0, 0);
    lut[2] = LutEntry::from_rgb8(0, 0xFF, 0);
    let req = CommitRequest::enable(qvga())
        .with_primary(full(fb))
        .with_palette(&lut);
    commit(&engine, &rig.regs, &req).await.unwrap();

    let nodes = chain(&engine, PlaneRole::Primary).await;
    assert_eq!(nodes.len(), 2);
    assert!(nodes[0].1.loads_palette());
    assert_eq!(nodes[0].1.words(), 128);
    assert_eq!(nodes[1].1.addr, FB_BASE);
    assert_eq!(nodes[1].1.words(), 320 * 240 / 4);
    assert_eq!(
        nodes[1].1.next,
        nodes[0].0.get(),
        "frame must reload the palette"
    );
    assert_eq!(rig.regs.peek(regs::REG_DA0), nodes[0].0.get());
    assert_eq!(
        rig.regs.peek(regs::REG_CTRL) & regs::CTRL_BPP_MASK,
        regs::CTRL_BPP_8
    );

    let palette = engine.with_descriptors(|m| m.control().palette).await;
    assert_eq!(palette[0], 0);
    assert_eq!(palette[1], 0xF800);
    assert_eq!(palette[2], 0x07E0);

    let short = [LutEntry::default(); 16];
    let req = CommitRequest::keep_mode()
        .with_primary(full(fb))
        .with_palette(&short);
    assert_eq!(
        engine.propose(&req).unwrap_err(),
        ValidationError::PaletteSize { len: 16 }
    );
}

#[tokio::test]
async fn older_proposal_is_superseded_by_a_settled_one() {
    let rig = Rig::rgb565();
    let engine = rig.engine(SocModel::Jz4740);
    let a = framebuffer(&engine, 0, 320, 240, PixelFormat::Rgb565);
    let b = framebuffer(&engine, 1, 320, 240, PixelFormat::Rgb565);

    let first = engine
        .propose(&CommitRequest::enable(qvga()).with_primary(full(a)))
        .unwrap();
    let second = engine
        .propose(&CommitRequest::enable(qvga()).with_primary(full(b)))
        .unwrap();

    with_vblank(&engine, &rig.regs, engine.await_settled(first))
        .await
        .unwrap();
    assert_eq!(
        engine.await_settled(second).await.unwrap_err(),
        CommitError::Superseded
    );
    assert_eq!(engine.committed_plane(PlaneRole::Primary).fb, Some(a));
}

#[tokio::test]
async fn framebuffer_lifecycle_follows_scan_out() {
    let rig = Rig::rgb565();
    let engine = rig.engine(SocModel::Jz4740);
    let a = framebuffer(&engine, 0, 320, 240, PixelFormat::Rgb565);
    let b = framebuffer(&engine, 1, 320, 240, PixelFormat::Rgb565);

    commit(
        &engine,
        &rig.regs,
        &CommitRequest::enable(qvga()).with_primary(full(a)),
    )
    .await
    .unwrap();
    assert_eq!(engine.destroy_framebuffer(&a), Err(FramebufferError::InUse));

    // Destroying a buffer out from under a pending commit voids the commit.
    let pending = engine
        .propose(&CommitRequest::keep_mode().with_primary(full(b)))
        .unwrap();
    engine.destroy_framebuffer(&b).unwrap();
    assert_eq!(
        engine.await_settled(pending).await.unwrap_err(),
        CommitError::Superseded
    );
    assert_eq!(
        engine
            .propose(&CommitRequest::keep_mode().with_primary(full(b)))
            .unwrap_err(),
        ValidationError::UnknownFramebuffer {
            plane: PlaneRole::Primary
        }
    );
    assert_eq!(
        engine.destroy_framebuffer(&b),
        Err(FramebufferError::Unknown)
    );

    commit(&engine, &rig.regs, &CommitRequest::disable())
        .await
        .unwrap();
    engine.destroy_framebuffer(&a).unwrap();
}

#[tokio::test]
async fn descriptor_memory_bounds_framebuffer_count() {
    let rig = Rig::rgb565();
    let engine = rig.engine(SocModel::Jz4760);
    // Each 720-line buffer reserves 1440 line descriptors.
    let first = engine.create_framebuffer(lcdc::FramebufferDesc::packed(
        platform::DeviceAddr(FB_BASE),
        1280,
        720,
        PixelFormat::Rgb565,
    ));
    assert!(first.is_ok());
    let second = engine.create_framebuffer(lcdc::FramebufferDesc::packed(
        platform::DeviceAddr(FB_BASE + 0x0040_0000),
        1280,
        720,
        PixelFormat::Rgb565,
    ));
    assert!(matches!(second, Err(FramebufferError::Exhausted(_))));

    engine.destroy_framebuffer(&first.unwrap()).unwrap();
    let third = engine.create_framebuffer(lcdc::FramebufferDesc::packed(
        platform::DeviceAddr(FB_BASE + 0x0040_0000),
        1280,
        720,
        PixelFormat::Rgb565,
    ));
    assert!(third.is_ok());
}

#[tokio::test]
async fn disabling_stops_scan_out_and_masks_the_interrupt() {
    let rig = Rig::rgb565();
    let engine = rig.engine(SocModel::Jz4740);
    let fb = framebuffer(&engine, 0, 320, 240, PixelFormat::Rgb565);
    commit(
        &engine,
        &rig.regs,
        &CommitRequest::enable(qvga()).with_primary(full(fb)),
    )
    .await
    .unwrap();

    let settled = commit(&engine, &rig.regs, &CommitRequest::disable().with_event())
        .await
        .unwrap();
    assert!(settled.modeset);
    assert!(settled.event.unwrap().synthesized);
    assert!(!engine.settled().active);

    let ctrl = rig.regs.peek(regs::REG_CTRL);
    assert_ne!(ctrl & regs::CTRL_DISABLE, 0);
    assert_eq!(ctrl & regs::CTRL_EOF_IRQ, 0);
    assert!(!rig.panel.is_enabled());

    // Mode survives for a later keep_mode re-enable.
    assert_eq!(engine.settled().mode, Some(qvga()));
    let req = CommitRequest::keep_mode().with_primary(full(fb));
    commit(&engine, &rig.regs, &req).await.unwrap();
    assert!(rig.panel.is_enabled());
}

#[tokio::test]
async fn interrupt_without_end_of_frame_is_ignored() {
    let rig = Rig::rgb565();
    let engine = rig.engine(SocModel::Jz4740);
    assert!(!engine.handle_irq());
    assert_eq!(engine.frame_sequence(), 0);

    rig.regs.poke(regs::REG_STATE, regs::STATE_EOF_IRQ);
    assert!(engine.handle_irq());
    assert_eq!(engine.frame_sequence(), 1);
    assert_eq!(rig.regs.peek(regs::REG_STATE) & regs::STATE_EOF_IRQ, 0);
}

#[tokio::test]
async fn sharp_panel_gets_control_signal_timings() {
    let bus = BusConfig {
        connector: ConnectorKind::SharpTft,
        ..BusConfig::dpi(BusFormat::Rgb565_1x16)
    };
    let rig = Rig::new(bus);
    let engine = rig.engine(SocModel::Jz4740);
    let fb = framebuffer(&engine, 0, 320, 240, PixelFormat::Rgb565);
    commit(
        &engine,
        &rig.regs,
        &CommitRequest::enable(qvga()).with_primary(full(fb)),
    )
    .await
    .unwrap();

    assert_eq!(rig.regs.peek(regs::REG_PS), (380 << 16) | 381);
    assert_eq!(rig.regs.peek(regs::REG_CLS), (380 << 16) | 381);
    assert_eq!(rig.regs.peek(regs::REG_SPL), (20 << 16) | 21);
    assert_eq!(rig.regs.peek(regs::REG_REV), 400 << 16);
    assert_ne!(
        rig.regs.peek(regs::REG_CFG) & regs::CFG_MODE_SPECIAL_TFT_1,
        0
    );
}

#[tokio::test]
async fn three_phase_bus_triples_the_pixel_clock() {
    let rig = Rig::new(BusConfig::dpi(BusFormat::Rgb888_3x8_Delta));
    let engine = rig.engine(SocModel::Jz4740);
    let fb = framebuffer(&engine, 0, 320, 240, PixelFormat::Rgb565);
    commit(
        &engine,
        &rig.regs,
        &CommitRequest::enable(qvga()).with_primary(full(fb)),
    )
    .await
    .unwrap();

    assert_eq!(rig.clock.rate(), 21_600_000);
    assert_eq!(
        rig.regs.peek(regs::REG_RGBC),
        regs::RGBC_EVEN_GBR | regs::RGBC_ODD_RGB
    );
    // htotal 400 -> 400 * 3 - 640
    assert_eq!(rig.regs.peek(regs::REG_VAT) >> 16, 560);
}

#[tokio::test]
async fn unreachable_pixel_clock_is_rejected() {
    let rig = Rig::with_clock(
        BusConfig::dpi(BusFormat::Rgb565_1x16),
        MockClock::new(1_000_000, 5_000_000),
    );
    let engine = rig.engine(SocModel::Jz4740);
    let err = engine
        .commit(&CommitRequest::enable(qvga()))
        .await
        .unwrap_err();
    assert_eq!(
        err,
        Error::Validation(ValidationError::ClockUnachievable { khz: 7_200 })
    );
}

#[tokio::test]
async fn chain_walk_starts_at_programmed_address() {
    let rig = Rig::rgb565();
    let engine = rig.engine(SocModel::Jz4740);
    // Before any commit, each head loops on itself with no payload.
    let nodes = chain(&engine, PlaneRole::Primary).await;
    assert_eq!(nodes.len(), 1);
    assert_eq!(nodes[0].0, common::DESC_BASE);
    assert_eq!(nodes[0].1.words(), 0);
    let pal = engine
        .with_descriptors(|m| descriptor::palette_desc_addr(m))
        .await;
    assert_eq!(pal.get(), common::DESC_BASE.get() + 32);
}
