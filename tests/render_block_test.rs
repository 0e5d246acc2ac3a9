#[cfg(feature = "integration-tests")]
mod headless {
    use std::time::Duration;

    use cgmath::Deg;
    use image::{Rgba, RgbaImage};
    use voxel_canvas::{
        BlockKind,
        camera::{Camera, Projection},
        data_structures::{
            geometry::{CROSSHAIR_INDICES, CROSSHAIR_VERTICES, CUBE_INDICES, CUBE_VERTICES, Vertex},
            instance::InstanceRaw,
            scene::SceneStore,
            texture::{SlotState, Texture, TextureSet, texture_layout},
        },
        gpu::{
            GpuError, PipelineTargets, Program, ProgramSource, ShaderInterface, ShaderStage,
            VertexArray, create_static_index_buffer, create_static_vertex_buffer,
        },
        pipelines::block::{CameraResources, mk_block_program, mk_overlay_program},
        render::{self, FrameResources},
    };

    const SIZE: u32 = 64;
    const FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8UnormSrgb;

    struct Headless {
        device: wgpu::Device,
        queue: wgpu::Queue,
    }

    async fn headless() -> Headless {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .expect("no adapter for headless rendering");
        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("test device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::downlevel_defaults()
                    .using_resolution(adapter.limits()),
                experimental_features: wgpu::ExperimentalFeatures::disabled(),
                memory_hints: Default::default(),
                trace: wgpu::Trace::Off,
            })
            .await
            .expect("no device for headless rendering");
        Headless { device, queue }
    }

    fn vertex_array(device: &wgpu::Device, label: &str, v: &[Vertex], i: &[u16]) -> VertexArray {
        VertexArray::new(
            label,
            create_static_vertex_buffer(device, label, v).unwrap(),
            create_static_index_buffer(device, label, i).unwrap(),
            wgpu::IndexFormat::Uint16,
            i.len() as u32,
            Vertex::STRIDE,
            &Vertex::ATTRIBUTES,
        )
        .unwrap()
    }

    /// Draws `scene` from in front of the block at the origin and reads the
    /// frame back.
    async fn render_scene(
        gpu: &Headless,
        scene: &SceneStore,
        textures: &TextureSet,
        crosshair: bool,
        size: u32,
    ) -> RgbaImage {
        let device = &gpu.device;
        let mut camera_res = CameraResources::new(device);
        let block = mk_block_program(device, FORMAT, textures.layout(), &camera_res.bind_group_layout)
            .await
            .unwrap();
        let overlay = mk_overlay_program(device, FORMAT).await.unwrap();
        let cube = vertex_array(device, "cube", &CUBE_VERTICES, &CUBE_INDICES);
        let cross = vertex_array(device, "crosshair", &CROSSHAIR_VERTICES, &CROSSHAIR_INDICES);

        let camera = Camera::new(0.5, 0.5, -3.0, 0.0, 0.0);
        let projection = Projection::new(size, size, Deg(45.0), 0.1, 100.0);
        let plan = render::compose(
            &camera,
            &projection,
            scene,
            |kind| textures.get(kind).1,
            crosshair,
        );
        camera_res.upload(&gpu.queue, plan.camera_uniform());

        let records = plan.instances();
        let instances = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("test instances"),
            size: InstanceRaw::STRIDE * records.len().max(1) as wgpu::BufferAddress,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        gpu.queue
            .write_buffer(&instances, 0, bytemuck::cast_slice(&records));

        let extent = wgpu::Extent3d {
            width: size,
            height: size,
            depth_or_array_layers: 1,
        };
        let target = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("test target"),
            size: extent,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });
        let view = target.create_view(&wgpu::TextureViewDescriptor::default());
        let depth = Texture::create_depth_texture(device, [size, size], "test depth");

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("test encoder"),
        });
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("test pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &depth.view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                occlusion_query_set: None,
                timestamp_writes: None,
                multiview_mask: None,
            });
            render::encode(
                &mut pass,
                &plan,
                &FrameResources {
                    block: &block,
                    overlay: &overlay,
                    cube: &cube,
                    crosshair: &cross,
                    camera: &camera_res.bind_group,
                    textures,
                    instances: &instances,
                },
            );
        }

        // Every size used here keeps rows a multiple of the 256 byte alignment.
        let bytes_per_row = size * 4;
        let output = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("test readback"),
            size: (bytes_per_row * size) as wgpu::BufferAddress,
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });
        encoder.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                aspect: wgpu::TextureAspect::All,
                texture: &target,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
            },
            wgpu::TexelCopyBufferInfo {
                buffer: &output,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(bytes_per_row),
                    rows_per_image: Some(size),
                },
            },
            extent,
        );
        gpu.queue.submit(std::iter::once(encoder.finish()));

        let slice = output.slice(..);
        let (tx, rx) = futures_intrusive::channel::shared::oneshot_channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            tx.send(result).unwrap();
        });
        device
            .poll(wgpu::PollType::Wait {
                submission_index: None,
                timeout: Some(Duration::from_secs(3)),
            })
            .unwrap();
        rx.receive().await.unwrap().unwrap();
        let data = slice.get_mapped_range().to_vec();
        RgbaImage::from_raw(size, size, data).unwrap()
    }

    fn textures(gpu: &Headless) -> TextureSet {
        TextureSet::new(&gpu.device, &gpu.queue, texture_layout(&gpu.device))
    }

    const BLACK: Rgba<u8> = Rgba([0, 0, 0, 255]);

    #[test]
    fn single_block_covers_the_centre_only() {
        futures::executor::block_on(async {
            let gpu = headless().await;
            let textures = textures(&gpu);
            let mut scene = SceneStore::new();
            scene.add_block_id(0, 0, 0, 1);

            let img = render_scene(&gpu, &scene, &textures, false, SIZE).await;
            let centre = *img.get_pixel(SIZE / 2, SIZE / 2);
            assert_ne!(centre, BLACK);
            // Untextured faces are grey.
            assert_eq!(centre[0], centre[1]);
            assert_eq!(centre[1], centre[2]);
            assert_eq!(*img.get_pixel(0, 0), BLACK);
            assert_eq!(*img.get_pixel(SIZE - 1, SIZE - 1), BLACK);
        });
    }

    #[test]
    fn empty_scene_is_only_the_clear_colour() {
        futures::executor::block_on(async {
            let gpu = headless().await;
            let textures = textures(&gpu);
            let img = render_scene(&gpu, &SceneStore::new(), &textures, false, SIZE).await;
            assert!(img.pixels().all(|p| *p == BLACK));
        });
    }

    #[test]
    fn loaded_texture_tints_the_block() {
        futures::executor::block_on(async {
            let gpu = headless().await;
            let mut textures = textures(&gpu);
            let red = RgbaImage::from_pixel(16, 16, Rgba([255, 0, 0, 255]));
            assert!(!textures.install(&gpu.device, &gpu.queue, BlockKind::Stone, &red));

            let mut scene = SceneStore::new();
            scene.add_block_id(0, 0, 0, 1);
            let img = render_scene(&gpu, &scene, &textures, false, SIZE).await;
            let centre = img.get_pixel(SIZE / 2, SIZE / 2);
            assert!(centre[0] > 0);
            assert_eq!(centre[1], 0);
            assert_eq!(centre[2], 0);
        });
    }

    #[test]
    fn textured_and_plain_blocks_share_a_frame() {
        futures::executor::block_on(async {
            let gpu = headless().await;
            let mut textures = textures(&gpu);
            let red = RgbaImage::from_pixel(16, 16, Rgba([255, 0, 0, 255]));
            textures.install(&gpu.device, &gpu.queue, BlockKind::Stone, &red);

            // The unknown id sorts first, so the stone draws from instance 1.
            let mut scene = SceneStore::new();
            scene.add_block_id(0, 0, 0, 1);
            scene.add_block_id(-1, 0, 0, 99);
            let img = render_scene(&gpu, &scene, &textures, false, SIZE).await;

            let centre = *img.get_pixel(SIZE / 2, SIZE / 2);
            assert!(centre[0] > 0);
            assert_eq!((centre[1], centre[2]), (0, 0));

            let row: Vec<Rgba<u8>> = (0..SIZE).map(|x| *img.get_pixel(x, SIZE / 2)).collect();
            let columns = |keep: &dyn Fn(&Rgba<u8>) -> bool| -> Vec<usize> {
                (0..row.len()).filter(|&x| keep(&row[x])).collect()
            };
            let red = columns(&|p| p[0] > 0 && p[1] == 0 && p[2] == 0);
            let grey = columns(&|p| *p != BLACK && p[0] == p[1] && p[1] == p[2]);
            assert!(!red.is_empty() && !grey.is_empty(), "{row:?}");
            assert!(row.iter().any(|p| *p == BLACK));

            // Side by side, never interleaved.
            let (red_min, red_max) = (red[0], red[red.len() - 1]);
            let (grey_min, grey_max) = (grey[0], grey[grey.len() - 1]);
            assert!(red_max < grey_min || grey_max < red_min, "{row:?}");
        });
    }

    #[test]
    fn oversized_texture_keeps_the_placeholder() {
        futures::executor::block_on(async {
            let gpu = headless().await;
            let mut textures = textures(&gpu);
            let max = gpu.device.limits().max_texture_dimension_2d;
            let wide = RgbaImage::from_pixel(max + 1, 1, Rgba([255, 0, 0, 255]));

            assert!(!textures.install(&gpu.device, &gpu.queue, BlockKind::Stone, &wide));
            assert!(!textures.get(BlockKind::Stone).1);
            assert_eq!(textures.tracker().state(BlockKind::Stone), SlotState::Failed);

            let mut scene = SceneStore::new();
            scene.add_block_id(0, 0, 0, 1);
            let img = render_scene(&gpu, &scene, &textures, false, SIZE).await;
            let centre = img.get_pixel(SIZE / 2, SIZE / 2);
            assert_eq!(centre[0], centre[1]);
            assert_eq!(centre[1], centre[2]);
        });
    }

    #[test]
    fn crosshair_draws_over_an_empty_scene() {
        futures::executor::block_on(async {
            let gpu = headless().await;
            let textures = textures(&gpu);
            // The bars are only a few pixels wide, so render large enough
            // for them to cover the centre pixel.
            let size = 512;
            let img = render_scene(&gpu, &SceneStore::new(), &textures, true, size).await;
            assert_eq!(*img.get_pixel(size / 2, size / 2), Rgba([255, 255, 255, 255]));
            assert_eq!(*img.get_pixel(0, 0), BLACK);
        });
    }

    #[test]
    fn broken_shader_reports_a_compile_error() {
        futures::executor::block_on(async {
            let gpu = headless().await;
            let layout = gpu
                .device
                .create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                    label: None,
                    bind_group_layouts: &[],
                    immediate_size: 0,
                });
            let result = Program::link(
                &gpu.device,
                ProgramSource {
                    label: "broken",
                    vertex: "@vertex fn vs_main( -> @builtin(position) vec4<f32> {",
                    fragment: include_str!("../src/pipelines/overlay.frag.wgsl"),
                    interface: ShaderInterface::new(),
                },
                PipelineTargets {
                    layout: &layout,
                    color_format: FORMAT,
                    depth: None,
                    vertex_layouts: &[],
                },
            )
            .await;
            match result {
                Err(GpuError::Compile { label, stage, log }) => {
                    assert_eq!(label, "broken");
                    assert_eq!(stage, ShaderStage::Vertex);
                    assert!(!log.is_empty());
                }
                other => panic!("expected a compile error, got {other:?}"),
            }
        });
    }

    #[test]
    fn missing_vertex_buffers_report_a_link_error() {
        futures::executor::block_on(async {
            let gpu = headless().await;
            let layout = gpu
                .device
                .create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                    label: None,
                    bind_group_layouts: &[],
                    immediate_size: 0,
                });
            // Both stages compile; the pipeline lacks the inputs they read.
            let result = Program::link(
                &gpu.device,
                ProgramSource {
                    label: "unfed",
                    vertex: include_str!("../src/pipelines/overlay.vert.wgsl"),
                    fragment: include_str!("../src/pipelines/overlay.frag.wgsl"),
                    interface: ShaderInterface::new(),
                },
                PipelineTargets {
                    layout: &layout,
                    color_format: FORMAT,
                    depth: None,
                    vertex_layouts: &[],
                },
            )
            .await;
            match result {
                Err(GpuError::Link { label, log }) => {
                    assert_eq!(label, "unfed");
                    assert!(!log.is_empty());
                }
                other => panic!("expected a link error, got {other:?}"),
            }
        });
    }

    #[test]
    fn empty_data_is_refused() {
        futures::executor::block_on(async {
            let gpu = headless().await;
            let empty: [Vertex; 0] = [];
            assert!(matches!(
                create_static_vertex_buffer(&gpu.device, "empty", &empty),
                Err(GpuError::EmptyBuffer("vertex"))
            ));
            assert!(matches!(
                create_static_index_buffer::<u16>(&gpu.device, "empty", &[]),
                Err(GpuError::EmptyBuffer("index"))
            ));
        });
    }
}
