//! GPU resource helpers.
//!
//! Thin constructors over an injected [`wgpu::Device`] that turn raw arrays
//! and shader text into buffers, linked programs and vertex-array layouts.
//! Failures never come back as half-built handles: every helper returns a
//! [`GpuError`] carrying whatever diagnostic the driver or validator gave us.

use std::fmt;

use thiserror::Error;
use wgpu::util::DeviceExt;

use crate::pipelines::basic::mk_render_pipeline;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

impl fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Vertex => f.write_str("vertex"),
            Self::Fragment => f.write_str("fragment"),
        }
    }
}

#[derive(Debug, Error)]
pub enum GpuError {
    #[error("no rendering context could be acquired (tried {tried})")]
    NoContext { tried: String },
    #[error("refusing to allocate an empty {0} buffer")]
    EmptyBuffer(&'static str),
    #[error("{stage} shader `{label}` failed to compile: {log}")]
    Compile {
        label: String,
        stage: ShaderStage,
        log: String,
    },
    #[error("program `{label}` failed to link: {log}")]
    Link { label: String, log: String },
    #[error("vertex array `{label}` is invalid: {reason}")]
    VertexArray { label: String, reason: String },
    #[error("`{0}` does not resolve to a valid location")]
    Unresolved(String),
}

/// Pushes a validation scope; the guard pops it on `pop` or when dropped.
fn validation_scope(device: &wgpu::Device) -> wgpu::ErrorScopeGuard {
    device.push_error_scope(wgpu::ErrorFilter::Validation)
}

/// Uploads `data` into a vertex buffer that is never written again.
pub fn create_static_vertex_buffer<T: bytemuck::Pod>(
    device: &wgpu::Device,
    label: &str,
    data: &[T],
) -> Result<wgpu::Buffer, GpuError> {
    create_static_buffer(device, label, data, wgpu::BufferUsages::VERTEX, "vertex")
}

/// Uploads `data` into an index buffer that is never written again.
pub fn create_static_index_buffer<T: bytemuck::Pod>(
    device: &wgpu::Device,
    label: &str,
    data: &[T],
) -> Result<wgpu::Buffer, GpuError> {
    create_static_buffer(device, label, data, wgpu::BufferUsages::INDEX, "index")
}

fn create_static_buffer<T: bytemuck::Pod>(
    device: &wgpu::Device,
    label: &str,
    data: &[T],
    usage: wgpu::BufferUsages,
    kind: &'static str,
) -> Result<wgpu::Buffer, GpuError> {
    if data.is_empty() {
        log::error!("Failed to allocate {kind} buffer `{label}`: no data");
        return Err(GpuError::EmptyBuffer(kind));
    }
    Ok(device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some(label),
        contents: bytemuck::cast_slice(data),
        usage,
    }))
}

/// Scalar type of one vertex attribute component.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComponentType {
    F32,
    U8,
    U16,
    U32,
    I32,
}

/// One attribute of an interleaved vertex buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttributeDescriptor {
    /// Name the shader interface knows the attribute by.
    pub name: &'static str,
    pub location: u32,
    pub components: u32,
    pub kind: ComponentType,
    pub normalized: bool,
    /// Byte offset inside one vertex.
    pub offset: wgpu::BufferAddress,
}

impl AttributeDescriptor {
    pub const fn float(name: &'static str, location: u32, components: u32, offset: u64) -> Self {
        Self {
            name,
            location,
            components,
            kind: ComponentType::F32,
            normalized: false,
            offset,
        }
    }

    pub fn format(&self) -> Result<wgpu::VertexFormat, String> {
        use ComponentType::*;
        use wgpu::VertexFormat as F;
        let format = match (self.kind, self.normalized, self.components) {
            (F32, false, 1) => F::Float32,
            (F32, false, 2) => F::Float32x2,
            (F32, false, 3) => F::Float32x3,
            (F32, false, 4) => F::Float32x4,
            (U8, false, 2) => F::Uint8x2,
            (U8, false, 4) => F::Uint8x4,
            (U8, true, 2) => F::Unorm8x2,
            (U8, true, 4) => F::Unorm8x4,
            (U16, false, 2) => F::Uint16x2,
            (U16, false, 4) => F::Uint16x4,
            (U16, true, 2) => F::Unorm16x2,
            (U16, true, 4) => F::Unorm16x4,
            (U32, false, 1) => F::Uint32,
            (U32, false, 2) => F::Uint32x2,
            (U32, false, 3) => F::Uint32x3,
            (U32, false, 4) => F::Uint32x4,
            (I32, false, 1) => F::Sint32,
            (I32, false, 2) => F::Sint32x2,
            (I32, false, 3) => F::Sint32x3,
            (I32, false, 4) => F::Sint32x4,
            (kind, normalized, n) => {
                return Err(format!(
                    "`{}`: {n} x {kind:?} (normalized: {normalized}) has no vertex format",
                    self.name
                ));
            }
        };
        Ok(format)
    }
}

/// Validated layout of one vertex buffer slot.
#[derive(Debug, Clone, PartialEq)]
pub struct VertexLayout {
    stride: wgpu::BufferAddress,
    step_mode: wgpu::VertexStepMode,
    attributes: Vec<wgpu::VertexAttribute>,
}

impl VertexLayout {
    /// Checks every descriptor against `stride` and against each other.
    ///
    /// Rejected: an empty list, formats wgpu cannot express, attributes
    /// reaching past the stride, and two attributes sharing a location.
    pub fn new(
        stride: wgpu::BufferAddress,
        step_mode: wgpu::VertexStepMode,
        descriptors: &[AttributeDescriptor],
    ) -> Result<Self, String> {
        if descriptors.is_empty() {
            return Err("no attributes".to_string());
        }
        let mut attributes: Vec<wgpu::VertexAttribute> = Vec::with_capacity(descriptors.len());
        for d in descriptors {
            let format = d.format()?;
            if d.offset + format.size() > stride {
                return Err(format!(
                    "`{}` spans bytes {}..{} but the stride is {stride}",
                    d.name,
                    d.offset,
                    d.offset + format.size()
                ));
            }
            if attributes.iter().any(|a| a.shader_location == d.location) {
                return Err(format!("location {} is bound twice", d.location));
            }
            attributes.push(wgpu::VertexAttribute {
                format,
                offset: d.offset,
                shader_location: d.location,
            });
        }
        Ok(Self {
            stride,
            step_mode,
            attributes,
        })
    }

    pub fn stride(&self) -> wgpu::BufferAddress {
        self.stride
    }

    pub fn attributes(&self) -> &[wgpu::VertexAttribute] {
        &self.attributes
    }

    pub fn desc(&self) -> wgpu::VertexBufferLayout<'_> {
        wgpu::VertexBufferLayout {
            array_stride: self.stride,
            step_mode: self.step_mode,
            attributes: &self.attributes,
        }
    }
}

/// An interleaved vertex buffer, its index buffer and their layout: the
/// pieces a draw call needs for one piece of geometry.
#[derive(Debug)]
pub struct VertexArray {
    vertex: wgpu::Buffer,
    index: wgpu::Buffer,
    index_format: wgpu::IndexFormat,
    index_count: u32,
    layout: VertexLayout,
}

impl VertexArray {
    pub fn new(
        label: &str,
        vertex: wgpu::Buffer,
        index: wgpu::Buffer,
        index_format: wgpu::IndexFormat,
        index_count: u32,
        stride: wgpu::BufferAddress,
        descriptors: &[AttributeDescriptor],
    ) -> Result<Self, GpuError> {
        let invalid = |reason: String| GpuError::VertexArray {
            label: label.to_string(),
            reason,
        };
        if index_count == 0 {
            return Err(invalid("index count is zero".to_string()));
        }
        let layout =
            VertexLayout::new(stride, wgpu::VertexStepMode::Vertex, descriptors).map_err(invalid)?;
        Ok(Self {
            vertex,
            index,
            index_format,
            index_count,
            layout,
        })
    }

    pub fn index_count(&self) -> u32 {
        self.index_count
    }

    pub fn layout(&self) -> &VertexLayout {
        &self.layout
    }

    /// Binds vertex slot 0 and the index buffer for the rest of `pass`.
    pub fn bind(&self, pass: &mut wgpu::RenderPass<'_>) {
        pass.set_vertex_buffer(0, self.vertex.slice(..));
        pass.set_index_buffer(self.index.slice(..), self.index_format);
    }
}

/// Names a program exposes, mapped to attribute locations and uniform
/// bind-group slots.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShaderInterface {
    attributes: Vec<(String, u32)>,
    uniforms: Vec<(String, u32)>,
}

impl ShaderInterface {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads the interface out of the WGSL itself: every `@location` input
    /// of the vertex entry point, and every bound global of either stage.
    pub fn reflect(label: &str, vertex: &str, fragment: &str) -> Result<Self, GpuError> {
        let vertex_module = parse(label, ShaderStage::Vertex, vertex)?;
        let fragment_module = parse(label, ShaderStage::Fragment, fragment)?;

        let mut interface = Self::new();
        let entry = vertex_module
            .entry_points
            .iter()
            .find(|e| e.stage == naga::ShaderStage::Vertex)
            .ok_or_else(|| GpuError::Compile {
                label: label.to_string(),
                stage: ShaderStage::Vertex,
                log: "no @vertex entry point".to_string(),
            })?;
        for argument in &entry.function.arguments {
            match (&argument.binding, &vertex_module.types[argument.ty].inner) {
                (Some(naga::Binding::Location { location, .. }), _) => {
                    if let Some(name) = &argument.name {
                        interface = interface.attribute(name.as_str(), *location);
                    }
                }
                (None, naga::TypeInner::Struct { members, .. }) => {
                    for member in members {
                        if let (Some(name), Some(naga::Binding::Location { location, .. })) =
                            (&member.name, &member.binding)
                        {
                            interface = interface.attribute(name.as_str(), *location);
                        }
                    }
                }
                _ => {}
            }
        }

        for module in [&vertex_module, &fragment_module] {
            for (_, global) in module.global_variables.iter() {
                if let (Some(name), Some(binding)) = (&global.name, &global.binding) {
                    if interface.uniform_group(name).is_err() {
                        interface = interface.uniform(name.as_str(), binding.group);
                    }
                }
            }
        }
        Ok(interface)
    }

    pub fn attribute(mut self, name: impl Into<String>, location: u32) -> Self {
        self.attributes.push((name.into(), location));
        self
    }

    pub fn uniform(mut self, name: impl Into<String>, group: u32) -> Self {
        self.uniforms.push((name.into(), group));
        self
    }

    pub fn attribute_location(&self, name: &str) -> Result<u32, GpuError> {
        lookup(&self.attributes, name)
    }

    pub fn uniform_group(&self, name: &str) -> Result<u32, GpuError> {
        lookup(&self.uniforms, name)
    }

    /// Resolves every descriptor by name. A name that is missing, or that
    /// resolves to a different location than the descriptor claims, fails.
    pub fn resolve(&self, descriptors: &[AttributeDescriptor]) -> Result<(), GpuError> {
        for d in descriptors {
            if self.attribute_location(d.name)? != d.location {
                return Err(GpuError::Unresolved(d.name.to_string()));
            }
        }
        Ok(())
    }
}

fn lookup(table: &[(String, u32)], name: &str) -> Result<u32, GpuError> {
    table
        .iter()
        .find(|(n, _)| n == name)
        .map(|(_, slot)| *slot)
        .ok_or_else(|| GpuError::Unresolved(name.to_string()))
}

fn parse(label: &str, stage: ShaderStage, source: &str) -> Result<naga::Module, GpuError> {
    naga::front::wgsl::parse_str(source).map_err(|e| {
        let log = e.emit_to_string(source);
        log::error!("Failed to parse {stage} shader `{label}`: {log}");
        GpuError::Compile {
            label: label.to_string(),
            stage,
            log,
        }
    })
}

/// Vertex and fragment WGSL plus the interface the pair promises.
pub struct ProgramSource<'a> {
    pub label: &'a str,
    pub vertex: &'a str,
    pub fragment: &'a str,
    pub interface: ShaderInterface,
}

/// Fixed-function state the linked pipeline is built against.
pub struct PipelineTargets<'a> {
    pub layout: &'a wgpu::PipelineLayout,
    pub color_format: wgpu::TextureFormat,
    pub depth: Option<wgpu::DepthStencilState>,
    pub vertex_layouts: &'a [wgpu::VertexBufferLayout<'a>],
}

/// A compiled and linked shader program.
#[derive(Debug)]
pub struct Program {
    pipeline: wgpu::RenderPipeline,
    interface: ShaderInterface,
}

impl Program {
    /// Compiles both stages, then links them into a render pipeline.
    ///
    /// The first failing step wins and its diagnostic is returned; a later
    /// step is never attempted with a broken earlier one.
    pub async fn link(
        device: &wgpu::Device,
        source: ProgramSource<'_>,
        targets: PipelineTargets<'_>,
    ) -> Result<Self, GpuError> {
        let vertex = compile(device, source.label, ShaderStage::Vertex, source.vertex).await?;
        let fragment = compile(device, source.label, ShaderStage::Fragment, source.fragment).await?;

        let scope = validation_scope(device);
        let pipeline = mk_render_pipeline(
            device,
            source.label,
            targets.layout,
            targets.color_format,
            targets.depth,
            targets.vertex_layouts,
            &vertex,
            &fragment,
        );
        if let Some(log) = scope.pop().await.map(|error| error.to_string()) {
            log::error!("Failed to link GPU program `{}`: {log}", source.label);
            return Err(GpuError::Link {
                label: source.label.to_string(),
                log,
            });
        }

        Ok(Self {
            pipeline,
            interface: source.interface,
        })
    }

    pub fn pipeline(&self) -> &wgpu::RenderPipeline {
        &self.pipeline
    }

    pub fn interface(&self) -> &ShaderInterface {
        &self.interface
    }

    pub fn attribute_location(&self, name: &str) -> Result<u32, GpuError> {
        self.interface.attribute_location(name)
    }

    pub fn uniform_group(&self, name: &str) -> Result<u32, GpuError> {
        self.interface.uniform_group(name)
    }
}

async fn compile(
    device: &wgpu::Device,
    label: &str,
    stage: ShaderStage,
    source: &str,
) -> Result<wgpu::ShaderModule, GpuError> {
    let scope = validation_scope(device);
    let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(&format!("{label} ({stage})")),
        source: wgpu::ShaderSource::Wgsl(source.into()),
    });
    match scope.pop().await.map(|error| error.to_string()) {
        Some(log) => {
            log::error!("Failed to compile {stage} shader `{label}`: {log}");
            Err(GpuError::Compile {
                label: label.to_string(),
                stage,
                log,
            })
        }
        None => Ok(module),
    }
}
