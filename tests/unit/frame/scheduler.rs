use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

use super::*;
use crate::foundation::core::{Mat4, Rgba, Vec3};
use crate::frame::host::{FixedStepClock, ManualHost};
use crate::render::cpu::{CpuRenderer, CpuRendererOpts};
use crate::scene::graph::{Node, ObjectId, SceneGraph};
use crate::scene::material::Material;
use crate::scene::mesh::Mesh;
use crate::temporal::compositor::{HISTORY_LABEL, MOTION_LABEL};

const STEP: Duration = Duration::from_millis(10);

fn stage() -> (Stage<SceneGraph>, ObjectId) {
    let mut scene = SceneGraph::new(Rgba::new(0.0, 0.0, 0.0, 1.0));
    let id = scene
        .add(Node::drawable(
            Arc::new(Mesh::cube(1.0)),
            Material::flat(Rgba::ONE),
            Mat4::IDENTITY,
        ))
        .unwrap();
    let camera =
        Camera::perspective(Vec3::new(0.0, 0.0, 3.0), Vec3::ZERO, 60.0, 1.0, 0.1, 50.0).unwrap();
    (Stage::new(scene, camera), id)
}

fn scheduler_with(mode: AaMode, opts: CpuRendererOpts) -> FrameScheduler<SceneGraph> {
    let config = PipelineConfig {
        width: 8,
        height: 8,
        mode,
        taa: crate::config::TaaConfig {
            jitter_period: 4,
            ..Default::default()
        },
        ..PipelineConfig::default()
    };
    let renderer = CpuRenderer::new(
        ContextDesc {
            extent: config.extent().unwrap(),
            samples: 1,
        },
        opts,
    )
    .unwrap();
    FrameScheduler::new(
        config,
        Box::new(renderer),
        stage().0,
        Box::new(FixedStepClock::new(STEP)),
    )
    .unwrap()
}

fn scheduler(mode: AaMode) -> FrameScheduler<SceneGraph> {
    scheduler_with(mode, CpuRendererOpts::default())
}

type Log = Rc<RefCell<Vec<&'static str>>>;

fn log_pre(s: &mut FrameScheduler<SceneGraph>, log: &Log, name: &'static str) -> HookHandle {
    let log = Rc::clone(log);
    s.on_pre_render(move |_, _| {
        log.borrow_mut().push(name);
        Ok(())
    })
}

#[test]
fn start_is_idempotent_and_tick_requires_running() {
    let mut s = scheduler(AaMode::None);
    let mut host = ManualHost::new();
    assert!(s.tick(&mut host).unwrap().is_none());

    s.start(&mut host);
    s.start(&mut host);
    assert_eq!(host.requests(), 1);
    assert!(s.is_running());

    let reports = host.drive(&mut s, 3).unwrap();
    assert_eq!(reports.len(), 3);
    assert_eq!(s.frame(), FrameIndex(3));

    s.stop();
    assert!(s.tick(&mut host).unwrap().is_none());
}

#[test]
fn delta_is_zero_first_then_clock_step() {
    let mut s = scheduler(AaMode::None);
    let mut host = ManualHost::new();
    s.start(&mut host);
    let reports = host.drive(&mut s, 3).unwrap();
    let deltas: Vec<_> = reports.iter().map(|r| r.delta).collect();
    assert_eq!(deltas, vec![Duration::ZERO, STEP, STEP]);
    assert_eq!(reports[1].frame, FrameIndex(1));
}

#[test]
fn hooks_run_newest_first_around_the_render() {
    let mut s = scheduler(AaMode::None);
    let log: Log = Rc::default();
    log_pre(&mut s, &log, "pre-a");
    log_pre(&mut s, &log, "pre-b");
    for name in ["post-a", "post-b"] {
        let log = Rc::clone(&log);
        s.on_post_render(move |_| {
            log.borrow_mut().push(name);
            Ok(())
        });
    }

    let mut host = ManualHost::new();
    s.start(&mut host);
    host.drive(&mut s, 1).unwrap();
    assert_eq!(*log.borrow(), vec!["pre-b", "pre-a", "post-b", "post-a"]);
}

#[test]
fn pre_hooks_can_mutate_the_stage() {
    let mut s = scheduler(AaMode::None);
    s.on_pre_render(|stage: &mut Stage<SceneGraph>, dt| {
        let x = dt.as_secs_f32();
        stage
            .scene
            .set_local(ObjectId(0), Mat4::from_translation(Vec3::new(x, 0.0, 0.0)))
    });
    let mut host = ManualHost::new();
    s.start(&mut host);
    host.drive(&mut s, 2).unwrap();
    let world = s.stage().scene.world_transform(ObjectId(0)).unwrap();
    assert_eq!(world, Mat4::from_translation(Vec3::new(STEP.as_secs_f32(), 0.0, 0.0)));
}

#[test]
fn failing_hook_is_reported_and_the_frame_still_renders() {
    let mut s = scheduler(AaMode::None);
    let log: Log = Rc::default();
    log_pre(&mut s, &log, "older");
    s.on_pre_render(|_, _| Err(AfterimageError::hook("bad input")));
    log_pre(&mut s, &log, "newer");

    let mut host = ManualHost::new();
    s.start(&mut host);
    let reports = host.drive(&mut s, 2).unwrap();
    assert_eq!(reports.len(), 2);
    assert_eq!(*log.borrow(), vec!["newer", "newer"]);

    let d = &reports[0].diagnostics;
    assert_eq!(d.len(), 1);
    assert_eq!(d[0].kind, DiagnosticKind::PreRenderHook);
    assert_eq!(d[0].frame, Some(FrameIndex(0)));
    assert!(d[0].message.contains("bad input"));
    assert_eq!(s.pre_render_hooks(), 3);
    assert_eq!(s.take_diagnostics().len(), 2);
    assert!(s.take_diagnostics().is_empty());
    assert_eq!(s.renderer().stats().scene_renders, 2);
}

#[test]
fn hook_can_cancel_a_later_hook_during_iteration() {
    let mut s = scheduler(AaMode::None);
    let log: Log = Rc::default();
    let target = log_pre(&mut s, &log, "target");
    let t = target.clone();
    s.on_pre_render(move |_, _| {
        t.cancel();
        Ok(())
    });

    let mut host = ManualHost::new();
    s.start(&mut host);
    host.drive(&mut s, 2).unwrap();
    assert!(log.borrow().is_empty());
    assert!(!target.is_active());
    assert_eq!(s.pre_render_hooks(), 1);
}

#[test]
fn unknown_mode_name_is_a_diagnostic() {
    let mut s = scheduler(AaMode::None);
    s.set_mode_by_name("fxaa").unwrap();
    assert_eq!(s.mode(), AaMode::None);
    let d = s.take_diagnostics();
    assert_eq!(d.len(), 1);
    assert_eq!(d[0].kind, DiagnosticKind::UnknownMode);

    s.set_mode_by_name("taa").unwrap();
    assert_eq!(s.mode(), AaMode::Temporal);
}

#[test]
fn context_is_rebuilt_only_around_msaa() {
    let mut s = scheduler(AaMode::None);
    s.set_mode(AaMode::Temporal).unwrap();
    s.set_mode(AaMode::Supersampled).unwrap();
    s.set_mode(AaMode::Supersampled).unwrap();
    assert_eq!(s.renderer().stats().context_rebuilds, 0);

    s.set_mode(AaMode::Msaa).unwrap();
    assert_eq!(s.renderer().context().samples, 4);
    s.set_mode(AaMode::None).unwrap();
    assert_eq!(s.renderer().context().samples, 1);

    let stats = s.renderer().stats();
    assert_eq!(stats.context_rebuilds, 2);
    assert_eq!(stats.leaked_on_rebuild, 0);
    assert_eq!(stats.live_targets, 0);
}

#[test]
fn mode_churn_allocates_one_history_and_motion_per_activation() {
    let mut s = scheduler(AaMode::None);
    let mut host = ManualHost::new();
    s.start(&mut host);
    for _ in 0..2 {
        s.set_mode(AaMode::Temporal).unwrap();
        host.drive(&mut s, 2).unwrap();
        s.set_mode(AaMode::None).unwrap();
        host.drive(&mut s, 1).unwrap();
    }
    let stats = s.renderer().stats();
    assert_eq!(stats.created(HISTORY_LABEL), 2);
    assert_eq!(stats.released(HISTORY_LABEL), 2);
    assert_eq!(stats.created(MOTION_LABEL), 2);
    assert_eq!(stats.released(MOTION_LABEL), 2);
    assert_eq!(stats.live_targets, 0);
}

#[test]
fn failed_activation_falls_back_to_none() {
    let mut s = scheduler_with(
        AaMode::None,
        CpuRendererOpts {
            max_live_targets: Some(2),
            ..CpuRendererOpts::default()
        },
    );
    let err = s.set_mode(AaMode::Temporal).unwrap_err();
    assert!(matches!(err, AfterimageError::Resource(_)));
    assert_eq!(s.mode(), AaMode::None);
    assert_eq!(s.renderer().stats().live_targets, 0);

    let mut host = ManualHost::new();
    s.start(&mut host);
    assert_eq!(host.drive(&mut s, 1).unwrap()[0].mode, AaMode::None);
}

#[test]
fn resize_is_applied_at_the_next_iteration() {
    let mut s = scheduler(AaMode::Temporal);
    let mut host = ManualHost::new();
    s.start(&mut host);
    host.drive(&mut s, 1).unwrap();

    let bigger = Extent::new(12, 6).unwrap();
    s.resize(bigger);
    assert_eq!(s.renderer().output_extent(), Extent::new(8, 8).unwrap());

    host.drive(&mut s, 1).unwrap();
    assert_eq!(s.renderer().output_extent(), bigger);
    assert_eq!(s.config().width, 12);
    let stats = s.renderer().stats();
    assert_eq!(stats.created(HISTORY_LABEL), 2);
    assert_eq!(stats.live_targets, 4);
}

#[test]
fn dispose_releases_resources_and_hooks() {
    let mut s = scheduler(AaMode::Temporal);
    let log: Log = Rc::default();
    let h = log_pre(&mut s, &log, "x");
    assert_eq!(s.renderer().stats().live_targets, 4);

    s.dispose().unwrap();
    assert_eq!(s.renderer().stats().live_targets, 0);
    assert!(!h.is_active());
    h.cancel();
    assert_eq!(s.pre_render_hooks(), 0);
    assert!(!s.is_running());
    s.dispose().unwrap();
}
