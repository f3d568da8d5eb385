use std::sync::Arc;

use super::*;
use crate::foundation::core::Vec3;
use crate::render::blit::{Blitter, Bindings};
use crate::scene::graph::{Node, SceneGraph};
use crate::scene::material::Material;
use crate::scene::mesh::Mesh;

fn extent(w: u32, h: u32) -> Extent {
    Extent::new(w, h).unwrap()
}

fn renderer(w: u32, h: u32, samples: u32) -> CpuRenderer {
    CpuRenderer::new(
        ContextDesc {
            extent: extent(w, h),
            samples,
        },
        CpuRendererOpts::default(),
    )
    .unwrap()
}

fn desc(label: &'static str, w: u32, h: u32, format: PixelFormat) -> TargetDesc {
    TargetDesc {
        label,
        extent: extent(w, h),
        format,
    }
}

fn camera() -> Camera {
    Camera::perspective(Vec3::new(0.0, 0.0, 3.0), Vec3::ZERO, 60.0, 1.0, 0.1, 100.0).unwrap()
}

fn quad_scene(color: Rgba, background: Rgba) -> SceneGraph {
    let mut scene = SceneGraph::new(background);
    scene
        .add(Node::drawable(
            Arc::new(Mesh::quad(1.0, 1.0)),
            Material::flat(color),
            Mat4::IDENTITY,
        ))
        .unwrap();
    scene
}

struct Constant(Rgba);

impl FullscreenProgram for Constant {
    fn label(&self) -> &'static str {
        "constant"
    }

    fn shade(&self, _: &PassInputs<'_>, _: UVec2, _: Vec2) -> Rgba {
        self.0
    }
}

struct Reads(TargetId);

impl FullscreenProgram for Reads {
    fn label(&self) -> &'static str {
        "reads"
    }

    fn bindings(&self) -> Bindings {
        Bindings::from_slice(&[self.0])
    }

    fn shade(&self, inputs: &PassInputs<'_>, pixel: UVec2, _: Vec2) -> Rgba {
        inputs.source().texel(i64::from(pixel.x), i64::from(pixel.y))
            + inputs
                .bound(self.0)
                .map(|b| b.texel(i64::from(pixel.x), i64::from(pixel.y)))
                .unwrap_or(Rgba::ZERO)
    }
}

#[test]
fn create_and_release_are_counted_per_label() {
    let mut r = renderer(4, 4, 1);
    let a = r.create_target(desc("history", 4, 4, PixelFormat::Rgba16Float)).unwrap();
    let b = r.create_target(desc("motion", 4, 4, PixelFormat::Rgba32Float)).unwrap();
    assert_ne!(a, b);

    let s = r.stats();
    assert_eq!(s.live_targets, 2);
    assert_eq!(s.live_bytes, 16 * 8 + 16 * 16);
    assert_eq!(s.created("history"), 1);
    assert_eq!(s.created("motion"), 1);

    r.release_target(a).unwrap();
    let s = r.stats();
    assert_eq!(s.live_targets, 1);
    assert_eq!(s.released("history"), 1);
    assert_eq!(s.released("motion"), 0);
    assert!(r.target_desc(a).is_none());
    assert!(r.release_target(a).is_err());
}

#[test]
fn budgets_reject_allocations() {
    let mut r = CpuRenderer::new(
        ContextDesc {
            extent: extent(2, 2),
            samples: 1,
        },
        CpuRendererOpts {
            max_live_targets: Some(1),
            ..CpuRendererOpts::default()
        },
    )
    .unwrap();
    r.create_target(desc("a", 2, 2, PixelFormat::Rgba8Unorm)).unwrap();
    let err = r
        .create_target(desc("b", 2, 2, PixelFormat::Rgba8Unorm))
        .unwrap_err();
    assert!(matches!(err, AfterimageError::Resource(_)));

    r.set_opts(CpuRendererOpts {
        max_live_bytes: Some(100),
        ..CpuRendererOpts::default()
    });
    assert!(r.create_target(desc("big", 8, 8, PixelFormat::Rgba32Float)).is_err());
}

#[test]
fn unsupported_sample_count_is_rejected() {
    let err = CpuRenderer::new(
        ContextDesc {
            extent: extent(2, 2),
            samples: 3,
        },
        CpuRendererOpts::default(),
    )
    .err()
    .unwrap();
    assert!(matches!(err, AfterimageError::Resource(_)));

    let mut r = renderer(2, 2, 1);
    assert!(
        r.rebuild_context(ContextDesc {
            extent: extent(2, 2),
            samples: 5,
        })
        .is_err()
    );
    assert_eq!(r.context().samples, 1);
}

#[test]
fn render_clears_to_background_and_draws_geometry() {
    let mut r = renderer(16, 16, 1);
    let t = r.create_target(desc("color", 16, 16, PixelFormat::Rgba32Float)).unwrap();
    let red = Rgba::new(1.0, 0.0, 0.0, 1.0);
    let bg = Rgba::new(0.0, 0.0, 0.25, 1.0);
    let scene = quad_scene(red, bg);

    r.render(&scene, &camera(), RenderTarget::Offscreen(t), Shading::Materials)
        .unwrap();
    let img = r.read_pixels(RenderTarget::Offscreen(t)).unwrap();
    assert_eq!(img.texel(8, 8), red);
    assert_eq!(img.texel(0, 0), bg);
    assert_eq!(r.stats().scene_renders, 1);
}

#[test]
fn override_without_program_skips_object() {
    struct Nothing;
    impl crate::render::backend::ShadingOverride for Nothing {
        fn program_for(
            &self,
            _: crate::scene::graph::ObjectId,
        ) -> Option<&dyn SurfaceProgram> {
            None
        }
    }

    let mut r = renderer(8, 8, 1);
    let t = r.create_target(desc("color", 8, 8, PixelFormat::Rgba32Float)).unwrap();
    let scene = quad_scene(Rgba::ONE, Rgba::ZERO);
    r.render(
        &scene,
        &camera(),
        RenderTarget::Offscreen(t),
        Shading::Override(&Nothing),
    )
    .unwrap();
    let img = r.read_pixels(RenderTarget::Offscreen(t)).unwrap();
    assert!(img.texels().iter().all(|&c| c == Rgba::ZERO));
}

#[test]
fn msaa_display_resolves_partial_coverage() {
    let mut r = renderer(32, 32, 4);
    let scene = quad_scene(Rgba::ONE, Rgba::new(0.0, 0.0, 0.0, 1.0));
    r.render(&scene, &camera(), RenderTarget::Display, Shading::Materials)
        .unwrap();
    let img = r.read_pixels(RenderTarget::Display).unwrap();
    let partial = img
        .texels()
        .iter()
        .filter(|c| c.x > 0.01 && c.x < 0.99)
        .count();
    assert!(partial > 0, "expected edge pixels with fractional coverage");
}

#[test]
fn copy_moves_texels_between_targets() {
    let mut r = renderer(4, 4, 1);
    let a = r.create_target(desc("a", 4, 4, PixelFormat::Rgba32Float)).unwrap();
    let b = r.create_target(desc("b", 4, 4, PixelFormat::Rgba32Float)).unwrap();
    let c = Rgba::new(0.25, 0.5, 0.75, 1.0);

    let fill = Constant(c);
    Blitter::copy(&mut r, b, RenderTarget::Offscreen(a), Some(&fill)).unwrap();
    Blitter::copy(&mut r, a, RenderTarget::Offscreen(b), None).unwrap();
    let img = r.read_pixels(RenderTarget::Offscreen(b)).unwrap();
    assert!(img.texels().iter().all(|&t| t == c));
    assert_eq!(r.stats().fullscreen_passes, 2);
}

#[test]
fn copy_to_display_is_quantized_to_unorm8() {
    let mut r = renderer(2, 2, 4);
    let a = r.create_target(desc("a", 2, 2, PixelFormat::Rgba32Float)).unwrap();
    let b = r.create_target(desc("b", 2, 2, PixelFormat::Rgba32Float)).unwrap();
    Blitter::copy(&mut r, b, RenderTarget::Offscreen(a), Some(&Constant(Rgba::splat(2.0))))
        .unwrap();
    Blitter::copy(&mut r, a, RenderTarget::Display, None).unwrap();
    let img = r.read_pixels(RenderTarget::Display).unwrap();
    assert!(img.texels().iter().all(|&t| t == Rgba::ONE));
}

#[test]
fn pass_reading_its_destination_is_rejected() {
    let mut r = renderer(2, 2, 1);
    let a = r.create_target(desc("a", 2, 2, PixelFormat::Rgba32Float)).unwrap();
    let b = r.create_target(desc("b", 2, 2, PixelFormat::Rgba32Float)).unwrap();

    let err = Blitter::copy(&mut r, a, RenderTarget::Offscreen(a), None).unwrap_err();
    assert!(matches!(err, AfterimageError::Render(_)));

    let err = Blitter::copy(&mut r, a, RenderTarget::Offscreen(b), Some(&Reads(b))).unwrap_err();
    assert!(matches!(err, AfterimageError::Render(_)));

    // The destination survives a rejected pass.
    assert!(r.target_desc(b).is_some());
}

#[test]
fn bound_inputs_are_visible_to_programs() {
    let mut r = renderer(2, 2, 1);
    let a = r.create_target(desc("a", 2, 2, PixelFormat::Rgba32Float)).unwrap();
    let b = r.create_target(desc("b", 2, 2, PixelFormat::Rgba32Float)).unwrap();
    let out = r.create_target(desc("out", 2, 2, PixelFormat::Rgba32Float)).unwrap();
    Blitter::copy(&mut r, b, RenderTarget::Offscreen(a), Some(&Constant(Rgba::splat(0.25))))
        .unwrap();
    Blitter::copy(&mut r, a, RenderTarget::Offscreen(b), Some(&Constant(Rgba::splat(0.5))))
        .unwrap();
    Blitter::copy(&mut r, a, RenderTarget::Offscreen(out), Some(&Reads(b))).unwrap();
    let img = r.read_pixels(RenderTarget::Offscreen(out)).unwrap();
    assert!(img.texels().iter().all(|&t| t == Rgba::splat(0.75)));
}

#[test]
fn serial_and_parallel_passes_agree() {
    let run = |parallel: bool| {
        let mut r = CpuRenderer::new(
            ContextDesc {
                extent: extent(9, 7),
                samples: 1,
            },
            CpuRendererOpts {
                parallel,
                ..CpuRendererOpts::default()
            },
        )
        .unwrap();
        let src = r.create_target(desc("src", 9, 7, PixelFormat::Rgba32Float)).unwrap();
        let dst = r.create_target(desc("dst", 9, 7, PixelFormat::Rgba32Float)).unwrap();
        let scene = quad_scene(Rgba::new(0.2, 0.9, 0.4, 1.0), Rgba::ZERO);
        r.render(&scene, &camera(), RenderTarget::Offscreen(src), Shading::Materials)
            .unwrap();
        Blitter::copy(&mut r, src, RenderTarget::Offscreen(dst), None).unwrap();
        r.read_pixels(RenderTarget::Offscreen(dst)).unwrap()
    };
    assert_eq!(run(true), run(false));
}

#[test]
fn rebuild_drops_live_targets_and_counts_them() {
    let mut r = renderer(4, 4, 1);
    let a = r.create_target(desc("a", 4, 4, PixelFormat::Rgba8Unorm)).unwrap();
    r.rebuild_context(ContextDesc {
        extent: extent(4, 4),
        samples: 4,
    })
    .unwrap();
    let s = r.stats();
    assert_eq!(s.leaked_on_rebuild, 1);
    assert_eq!(s.live_targets, 0);
    assert_eq!(s.context_rebuilds, 1);
    assert!(r.target_desc(a).is_none());
    assert_eq!(r.context().samples, 4);
}

#[test]
fn resize_output_keeps_sample_count() {
    let mut r = renderer(4, 4, 2);
    r.resize_output(extent(8, 3)).unwrap();
    assert_eq!(r.output_extent(), extent(8, 3));
    assert_eq!(r.context().samples, 2);
    assert_eq!(
        r.read_pixels(RenderTarget::Display).unwrap().texels().len(),
        24
    );
}

#[test]
fn mesh_indexing_past_its_positions_is_a_render_error() {
    let mut scene = SceneGraph::new(Rgba::ZERO);
    let id = scene
        .add(Node::drawable(
            Arc::new(Mesh::quad(1.0, 1.0)),
            Material::flat(Rgba::ONE),
            Mat4::IDENTITY,
        ))
        .unwrap();
    scene.node_mut(id).unwrap().mesh = Some(Arc::new(Mesh {
        positions: vec![Vec3::ZERO],
        triangles: vec![[0, 1, 2]],
    }));

    let mut r = renderer(8, 8, 1);
    let err = r
        .render(&scene, &camera(), RenderTarget::Display, Shading::Materials)
        .unwrap_err();
    assert!(matches!(err, AfterimageError::Render(_)));
    assert!(err.to_string().contains("indexes past"));

    let t = r.create_target(desc("t", 8, 8, PixelFormat::Rgba8Unorm)).unwrap();
    let err = r
        .render(&scene, &camera(), RenderTarget::Offscreen(t), Shading::Materials)
        .unwrap_err();
    assert!(matches!(err, AfterimageError::Render(_)));
    assert_eq!(r.stats().scene_renders, 0);
}
