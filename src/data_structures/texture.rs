//! GPU textures, the placeholder bound before real images arrive, and the
//! per-kind texture slots blocks are drawn with.

use image::RgbaImage;

use crate::data_structures::block::BlockKind;

/// A GPU texture with a view and optional sampler.
#[derive(Clone, Debug)]
pub struct Texture {
    #[allow(unused)]
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub sampler: Option<wgpu::Sampler>,
}

impl Texture {
    pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

    /// Depth attachment of `size` pixels. Zero dimensions are bumped to one.
    pub fn create_depth_texture(device: &wgpu::Device, size: [u32; 2], label: &str) -> Self {
        let size = wgpu::Extent3d {
            width: size[0].max(1),
            height: size[1].max(1),
            depth_or_array_layers: 1,
        };
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: Self::DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        Self {
            texture,
            view,
            sampler: None,
        }
    }

    /// A 1×1 opaque white texture, bound to every slot until its image loads.
    pub fn placeholder(device: &wgpu::Device, queue: &wgpu::Queue) -> Self {
        let image = RgbaImage::from_pixel(1, 1, image::Rgba([255, 255, 255, 255]));
        Self::from_image(device, queue, &image, Some("placeholder texture"))
    }

    /// Uploads decoded pixels. Sampling is always nearest-neighbour; see
    /// [`address_mode_for`] for wrapping.
    pub fn from_image(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        img: &RgbaImage,
        label: Option<&str>,
    ) -> Self {
        let (width, height) = img.dimensions();
        let size = wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        };
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label,
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8UnormSrgb,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                aspect: wgpu::TextureAspect::All,
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
            },
            img.as_raw(),
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(4 * width),
                rows_per_image: Some(height),
            },
            size,
        );

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let address_mode = address_mode_for(width, height);
        let sampler = Some(device.create_sampler(&wgpu::SamplerDescriptor {
            label,
            address_mode_u: address_mode,
            address_mode_v: address_mode,
            address_mode_w: address_mode,
            mag_filter: wgpu::FilterMode::Nearest,
            min_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        }));

        Self {
            texture,
            view,
            sampler,
        }
    }
}

/// Repeat for power-of-two images, clamp-to-edge as soon as either side is
/// not a power of two.
pub fn address_mode_for(width: u32, height: u32) -> wgpu::AddressMode {
    if width.is_power_of_two() && height.is_power_of_two() {
        wgpu::AddressMode::Repeat
    } else {
        wgpu::AddressMode::ClampToEdge
    }
}

/// Rejects images wgpu cannot hold: a zero side, or a side over the
/// device's `max_texture_dimension_2d`.
pub fn check_dimensions(width: u32, height: u32, max_side: u32) -> Result<(), String> {
    if width == 0 || height == 0 {
        return Err(format!("{width}x{height} has an empty side"));
    }
    if width > max_side || height > max_side {
        return Err(format!("{width}x{height} exceeds the {max_side} pixel limit"));
    }
    Ok(())
}

pub fn texture_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        entries: &[
            wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Texture {
                    multisampled: false,
                    view_dimension: wgpu::TextureViewDimension::D2,
                    sample_type: wgpu::TextureSampleType::Float { filterable: true },
                },
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: 1,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                count: None,
            },
        ],
        label: Some("block texture_bind_group_layout"),
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotState {
    Pending,
    Loaded,
    Failed,
}

/// Load state of every [`BlockKind`] texture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadTracker {
    states: [SlotState; BlockKind::ALL.len()],
    announced: bool,
}

impl Default for LoadTracker {
    fn default() -> Self {
        Self {
            states: [SlotState::Pending; BlockKind::ALL.len()],
            announced: false,
        }
    }
}

impl LoadTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self, kind: BlockKind) -> SlotState {
        self.states[kind.slot()]
    }

    /// Records the outcome for `kind`. Returns `true` exactly once: on the
    /// call that leaves no slot pending.
    pub fn settle(&mut self, kind: BlockKind, loaded: bool) -> bool {
        self.states[kind.slot()] = if loaded {
            SlotState::Loaded
        } else {
            SlotState::Failed
        };
        if !self.announced && self.all_settled() {
            self.announced = true;
            return true;
        }
        false
    }

    pub fn all_settled(&self) -> bool {
        self.states.iter().all(|s| *s != SlotState::Pending)
    }
}

/// What a draw binds for one block kind.
#[derive(Debug)]
struct Slot {
    bind_group: wgpu::BindGroup,
    loaded: bool,
    #[allow(unused)]
    texture: Texture,
}

/// One bind group per [`BlockKind`], placeholder-backed until the image
/// arrives.
#[derive(Debug)]
pub struct TextureSet {
    layout: wgpu::BindGroupLayout,
    placeholder: wgpu::BindGroup,
    slots: Vec<Slot>,
    tracker: LoadTracker,
}

impl TextureSet {
    pub fn new(device: &wgpu::Device, queue: &wgpu::Queue, layout: wgpu::BindGroupLayout) -> Self {
        let placeholder_texture = Texture::placeholder(device, queue);
        let placeholder = bind(device, &layout, &placeholder_texture, "placeholder");
        let slots = BlockKind::ALL
            .iter()
            .map(|kind| Slot {
                bind_group: bind(device, &layout, &placeholder_texture, kind.texture_name()),
                loaded: false,
                texture: placeholder_texture.clone(),
            })
            .collect();
        Self {
            layout,
            placeholder,
            slots,
            tracker: LoadTracker::new(),
        }
    }

    pub fn layout(&self) -> &wgpu::BindGroupLayout {
        &self.layout
    }

    pub fn placeholder(&self) -> &wgpu::BindGroup {
        &self.placeholder
    }

    /// Bind group for `kind` and whether a real image is behind it.
    pub fn get(&self, kind: BlockKind) -> (&wgpu::BindGroup, bool) {
        let slot = &self.slots[kind.slot()];
        (&slot.bind_group, slot.loaded)
    }

    /// Swaps the decoded image in. An image the device cannot hold is
    /// logged and settles as failed, keeping the placeholder. Returns `true`
    /// when this was the last slot to settle.
    pub fn install(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        kind: BlockKind,
        image: &RgbaImage,
    ) -> bool {
        let (width, height) = image.dimensions();
        let max_side = device.limits().max_texture_dimension_2d;
        if let Err(reason) = check_dimensions(width, height, max_side) {
            log::error!("texture {} rejected: {reason}", kind.texture_name());
            return self.fail(kind);
        }
        let texture = Texture::from_image(device, queue, image, Some(kind.texture_name()));
        let bind_group = bind(device, &self.layout, &texture, kind.texture_name());
        self.slots[kind.slot()] = Slot {
            bind_group,
            loaded: true,
            texture,
        };
        self.tracker.settle(kind, true)
    }

    /// Keeps the placeholder for `kind`. Returns `true` when this was the
    /// last slot to settle.
    pub fn fail(&mut self, kind: BlockKind) -> bool {
        self.tracker.settle(kind, false)
    }

    pub fn tracker(&self) -> &LoadTracker {
        &self.tracker
    }
}

fn bind(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    texture: &Texture,
    label: &str,
) -> wgpu::BindGroup {
    let fallback;
    let sampler = match &texture.sampler {
        Some(sampler) => sampler,
        None => {
            fallback = device.create_sampler(&wgpu::SamplerDescriptor::default());
            &fallback
        }
    };
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::TextureView(&texture.view),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::Sampler(sampler),
            },
        ],
        label: Some(label),
    })
}
