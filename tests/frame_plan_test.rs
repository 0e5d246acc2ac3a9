mod common;

use std::cell::Cell;

use cgmath::{Deg, Matrix4, SquareMatrix, Vector3};
use common::test_utils::assert_matrix_eq;
use instant::{Duration, Instant};
use voxel_canvas::{
    BlockCoord, BlockKind, Bounds, Renderer, SceneCommand,
    camera::{Camera, Projection},
    config::RendererConfig,
    data_structures::{
        scene::SceneStore,
        shape::{Material, Mesh},
    },
    render::{compose, overlay_transform},
    renderer::{FrameClock, Phase, RequestRedraw, backing_size, schedule_then_draw},
};
use winit::dpi::{LogicalSize, PhysicalSize};

fn camera_and_projection() -> (Camera, Projection) {
    (
        Camera::new(0.0, 2.0, -5.0, 0.0, -10.0),
        Projection::new(800, 600, Deg(45.0), 0.1, 1000.0),
    )
}

#[test]
fn single_stone_block_is_one_identity_draw() {
    let (camera, projection) = camera_and_projection();
    let mut scene = SceneStore::new();
    scene.add_block_id(0, 0, 0, 1);

    let plan = compose(&camera, &projection, &scene, |_| true, false);

    assert_eq!(plan.draws.len(), 1);
    let draw = &plan.draws[0];
    assert_eq!(draw.coord, BlockCoord::new(0, 0, 0));
    assert_eq!(draw.mesh, Mesh::Cube);
    assert_eq!(draw.index_count, 36);
    assert_eq!(draw.material, Material::Textured(BlockKind::Stone));
    assert!(draw.instance.textured());
    assert_matrix_eq(draw.world(), Matrix4::identity());
    assert!(plan.overlay.is_none());
}

#[test]
fn world_matrix_translates_to_the_coordinate() {
    let (camera, projection) = camera_and_projection();
    let mut scene = SceneStore::new();
    scene.add_block_id(3, -2, 9, 3);

    let plan = compose(&camera, &projection, &scene, |_| true, false);
    assert_matrix_eq(
        plan.draws[0].world(),
        Matrix4::from_translation(Vector3::new(3.0, -2.0, 9.0)),
    );
}

#[test]
fn placeholder_textures_draw_untextured() {
    let (camera, projection) = camera_and_projection();
    let mut scene = SceneStore::new();
    scene.add_block_id(0, 0, 0, 1);
    scene.add_block_id(1, 0, 0, 2);
    scene.add_block_id(2, 0, 0, 9);

    let plan = compose(
        &camera,
        &projection,
        &scene,
        |kind| kind == BlockKind::Grass,
        false,
    );
    let textured: Vec<bool> = plan.draws.iter().map(|d| d.instance.textured()).collect();
    assert_eq!(textured, vec![false, true, false]);
    assert_eq!(plan.draws[2].material, Material::Untextured);
}

#[test]
fn draws_are_sorted_and_the_overlay_comes_last() {
    let (camera, projection) = camera_and_projection();
    let mut scene = SceneStore::new();
    for (x, y, z) in [(5, 0, 0), (-1, 3, 2), (0, 0, 0), (-1, 3, 1), (2, -7, 4)] {
        scene.add_block_id(x, y, z, 1);
    }

    let plan = compose(&camera, &projection, &scene, |_| false, true);
    let coords: Vec<BlockCoord> = plan.draws.iter().map(|d| d.coord).collect();
    let mut sorted = coords.clone();
    sorted.sort();
    assert_eq!(coords, sorted);

    let overlay = plan.overlay.as_ref().unwrap();
    assert_eq!(overlay.mesh, Mesh::Crosshair);
    assert_eq!(overlay.index_count, 12);

    let instances = plan.instances();
    assert_eq!(instances.len(), 6);
    assert_eq!(instances[5], overlay.instance);
    assert!(!instances[5].textured());
}

#[test]
fn crosshair_is_squeezed_to_the_aspect_ratio() {
    let (camera, projection) = camera_and_projection();
    let plan = compose(&camera, &projection, &SceneStore::new(), |_| false, true);
    let world: Matrix4<f32> = plan.overlay.unwrap().instance.world.into();
    assert_matrix_eq(world, overlay_transform(800.0 / 600.0));
    assert!((world.x.x - 0.75).abs() < 1e-6);
    assert_eq!(world.y.y, 1.0);

    let square = Projection::new(512, 512, Deg(45.0), 0.1, 1000.0);
    let plan = compose(&camera, &square, &SceneStore::new(), |_| false, true);
    let world: Matrix4<f32> = plan.overlay.unwrap().instance.world.into();
    assert_matrix_eq(world, Matrix4::identity());
}

#[derive(Default)]
struct CountingWindow {
    requests: Cell<u32>,
}

impl RequestRedraw for CountingWindow {
    fn request_redraw(&self) {
        self.requests.set(self.requests.get() + 1);
    }
}

#[test]
fn next_frame_is_requested_even_when_drawing_fails() {
    let window = CountingWindow::default();
    for error in [
        wgpu::SurfaceError::Lost,
        wgpu::SurfaceError::Outdated,
        wgpu::SurfaceError::Timeout,
    ] {
        let result = schedule_then_draw(&window, || Err(error.clone()));
        assert_eq!(result, Err(error));
    }
    assert_eq!(window.requests.get(), 3);

    let drawn = Cell::new(false);
    schedule_then_draw::<wgpu::SurfaceError>(&window, || {
        // The request is already out when drawing starts.
        assert_eq!(window.requests.get(), 4);
        drawn.set(true);
        Ok(())
    })
    .unwrap();
    assert!(drawn.get());
}

#[test]
fn plans_of_equal_scenes_are_equal() {
    let (camera, projection) = camera_and_projection();
    let mut a = SceneStore::new();
    let mut b = SceneStore::new();
    let coords = [(1, 1, 1), (0, 4, 2), (-3, 0, 0), (7, 7, 7)];
    for &(x, y, z) in &coords {
        a.add_block_id(x, y, z, 2);
    }
    for &(x, y, z) in coords.iter().rev() {
        b.add_block_id(x, y, z, 2);
    }

    assert_eq!(
        compose(&camera, &projection, &a, |_| true, true),
        compose(&camera, &projection, &b, |_| true, true)
    );
}

#[test]
fn uniform_is_projection_times_view() {
    let (camera, projection) = camera_and_projection();
    let plan = compose(&camera, &projection, &SceneStore::new(), |_| true, true);
    assert!(plan.draws.is_empty());
    assert_matrix_eq(
        plan.camera_uniform().view_proj.into(),
        projection.calc_matrix() * camera.calc_matrix(),
    );
}

#[test]
fn commands_are_accepted_before_the_gpu_exists() {
    let mut renderer = Renderer::new(RendererConfig::default());
    assert_eq!(renderer.phase(), Phase::Uninitialized);

    renderer.apply(SceneCommand::AddBlock {
        coord: BlockCoord::new(0, 0, 0),
        id: 1,
    });
    renderer.apply(SceneCommand::AddBlock {
        coord: BlockCoord::new(0, 1, 0),
        id: 2,
    });
    renderer.apply(SceneCommand::RemoveBlock(BlockCoord::new(0, 1, 0)));
    renderer.apply(SceneCommand::UpdateCamera {
        x: 1.0,
        y: 2.0,
        z: 3.0,
        yaw: 90.0,
        pitch: 0.0,
    });
    assert_eq!(renderer.scene().len(), 1);
    assert_eq!(renderer.camera().position(), cgmath::Point3::new(1.0, 2.0, 3.0));

    // Nothing is drawn and nothing fails before the GPU is attached.
    assert!(renderer.render().is_ok());
    renderer.begin_init();
    assert_eq!(renderer.phase(), Phase::Initializing);
    assert!(renderer.render().is_ok());

    let plan = renderer.plan();
    assert_eq!(plan.draws.len(), 1);
    assert!(!plan.draws[0].instance.textured());
    assert!(plan.overlay.is_some());

    renderer.apply(SceneCommand::RemoveBlocksInArea(Bounds::new(
        1, -1, 1, -1, 1, -1,
    )));
    assert!(renderer.scene().is_empty());
}

#[test]
fn initial_pose_comes_from_the_config() {
    let renderer = Renderer::new(RendererConfig::default());
    let camera = renderer.camera();
    assert_eq!(camera.position(), cgmath::Point3::new(0.0, 101.62, 0.0));
    assert_eq!(camera.pitch(), 0.0);
    assert!(renderer.gpu().is_none());
}

#[test]
fn resize_ignores_a_collapsed_canvas() {
    let mut renderer = Renderer::new(RendererConfig::default());
    renderer.resize(PhysicalSize::new(1600, 900));
    let aspect = renderer.projection().aspect();
    assert!((aspect - 16.0 / 9.0).abs() < 1e-5);

    renderer.resize(PhysicalSize::new(0, 900));
    assert_eq!(renderer.projection().aspect(), aspect);
}

#[test]
fn backing_size_follows_the_scale_factor() {
    assert_eq!(
        backing_size(LogicalSize::new(800.0, 600.0), 2.0),
        PhysicalSize::new(1600, 1200)
    );
    assert_eq!(
        backing_size(LogicalSize::new(333.3, 100.2), 1.5),
        PhysicalSize::new(500, 150)
    );
    assert_eq!(
        backing_size(LogicalSize::new(0.0, 0.2), 1.0),
        PhysicalSize::new(1, 1)
    );
}

#[test]
fn frame_clock_measures_between_ticks() {
    let mut clock = FrameClock::default();
    let start = Instant::now();
    assert_eq!(clock.tick(start), Duration::ZERO);
    assert_eq!(clock.tick(start + Duration::from_millis(16)), Duration::from_millis(16));
    assert_eq!(clock.delta(), Duration::from_millis(16));
}
