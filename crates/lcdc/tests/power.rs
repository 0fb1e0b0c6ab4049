//! System sleep: suspend turns the display off, resume puts back exactly
//! what was on screen.
#![allow(clippy::unwrap_used)]

mod common;

use common::{framebuffer, qvga, with_vblank, Rig};
use lcdc::regs;
use lcdc::{
    CommitRequest, DestRect, Error, PixelFormat, PlaneRole, PlaneState, SocModel, ValidationError,
};

#[tokio::test]
async fn suspend_then_resume_restores_the_settled_configuration() {
    let rig = Rig::rgb565();
    let engine = rig.engine(SocModel::Jz4770);
    let primary = framebuffer(&engine, 0, 320, 240, PixelFormat::Rgb565);
    let overlay = framebuffer(&engine, 1, 64, 64, PixelFormat::Xrgb8888);

    let req = CommitRequest::enable(qvga())
        .with_primary(PlaneState::new(primary, DestRect::full_screen(&qvga())))
        .with_overlay(PlaneState::new(overlay, DestRect::new(16, 16, 64, 64)));
    common::commit(&engine, &rig.regs, &req).await.unwrap();
    let before = engine.settled();

    with_vblank(&engine, &rig.regs, engine.suspend())
        .await
        .unwrap();
    assert!(!engine.settled().active);
    assert!(!rig.panel.is_enabled());
    assert_ne!(rig.regs.peek(regs::REG_STATE) & regs::STATE_DISABLED, 0);

    with_vblank(&engine, &rig.regs, engine.resume())
        .await
        .unwrap();
    assert_eq!(engine.settled(), before);
    assert!(rig.panel.is_enabled());
    assert_eq!(rig.panel.enable_count(), 2);
    assert_eq!(
        rig.regs.peek(regs::REG_CTRL) & regs::CTRL_ENABLE,
        regs::CTRL_ENABLE
    );

    // Nothing left to restore.
    let writes = rig.regs.write_count();
    engine.resume().await.unwrap();
    assert_eq!(rig.regs.write_count(), writes);
}

#[tokio::test]
async fn suspending_twice_keeps_the_first_saved_configuration() {
    let rig = Rig::rgb565();
    let engine = rig.engine(SocModel::Jz4760);
    let fb = framebuffer(&engine, 0, 320, 240, PixelFormat::Rgb565);

    let req = CommitRequest::enable(qvga())
        .with_primary(PlaneState::new(fb, DestRect::full_screen(&qvga())));
    common::commit(&engine, &rig.regs, &req).await.unwrap();
    let before = engine.settled();

    with_vblank(&engine, &rig.regs, engine.suspend())
        .await
        .unwrap();
    with_vblank(&engine, &rig.regs, engine.suspend())
        .await
        .unwrap();
    assert!(!engine.settled().active);

    with_vblank(&engine, &rig.regs, engine.resume())
        .await
        .unwrap();
    assert_eq!(engine.settled(), before);
    assert!(rig.panel.is_enabled());
}

#[tokio::test]
async fn resume_refuses_a_framebuffer_destroyed_while_asleep() {
    let rig = Rig::rgb565();
    let engine = rig.engine(SocModel::Jz4740);
    let fb = framebuffer(&engine, 0, 320, 240, PixelFormat::Rgb565);

    let req = CommitRequest::enable(qvga())
        .with_primary(PlaneState::new(fb, DestRect::full_screen(&qvga())));
    common::commit(&engine, &rig.regs, &req).await.unwrap();

    with_vblank(&engine, &rig.regs, engine.suspend())
        .await
        .unwrap();
    engine.destroy_framebuffer(&fb).unwrap();

    let err = with_vblank(&engine, &rig.regs, engine.resume())
        .await
        .unwrap_err();
    assert_eq!(
        err,
        Error::Validation(ValidationError::UnknownFramebuffer {
            plane: PlaneRole::Primary
        })
    );
    assert!(!engine.settled().active);
    assert!(!rig.panel.is_enabled());
}

#[tokio::test]
async fn suspending_an_idle_engine_is_harmless() {
    let rig = Rig::rgb565();
    let engine = rig.engine(SocModel::Jz4725b);

    engine.suspend().await.unwrap();
    engine.resume().await.unwrap();
    assert!(!engine.settled().active);
    assert!(engine.settled().mode.is_none());
    assert_eq!(rig.panel.enable_count(), 0);
}
