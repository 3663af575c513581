use crate::{rendering::uniforms::UniformValue, MapError, Result};
use std::{
    any::Any,
    fmt,
    sync::{Arc, Mutex, MutexGuard},
};

pub type BufferId = u32;
pub type ProgramId = u32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GraphicsBackend {
    /// Records commands without touching a GPU
    Headless,
    Wgpu,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferKind {
    Vertex,
    Index,
    /// Offscreen color target used for feature picking
    HitDetection,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveKind {
    Points,
    Lines,
    Triangles,
}

/// Shader program source; a single WGSL module with `vs_main` and `fs_main`
#[derive(Debug, Clone, PartialEq)]
pub struct ProgramSource {
    pub label: String,
    pub source: String,
    /// Uniform names in slot order
    pub uniforms: Vec<String>,
}

/// A single draw issued by a style renderer
#[derive(Debug, Clone, PartialEq)]
pub struct DrawCall {
    pub program: ProgramId,
    pub buffer: BufferId,
    pub primitive: PrimitiveKind,
    pub vertex_count: u32,
    pub uniforms: Vec<(String, UniformValue)>,
}

impl DrawCall {
    pub fn uniform(&self, name: &str) -> Option<UniformValue> {
        self.uniforms
            .iter()
            .find(|(uniform, _)| uniform == name)
            .map(|(_, value)| *value)
    }
}

/// Commands that were issued to a recording context
#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand {
    BeginFrame { width: u32, height: u32 },
    Draw(DrawCall),
}

/// GPU abstraction used by layer renderers
pub trait GraphicsContext: Send {
    fn backend(&self) -> GraphicsBackend;

    /// Called once per frame before any layer renders
    fn begin_frame(&mut self, width: u32, height: u32) -> Result<()>;

    fn create_buffer(&mut self, kind: BufferKind, data: &[u8]) -> Result<BufferId>;
    fn update_buffer(&mut self, buffer: BufferId, data: &[u8]) -> Result<()>;
    fn delete_buffer(&mut self, buffer: BufferId);

    fn create_program(&mut self, source: &ProgramSource) -> Result<ProgramId>;
    fn delete_program(&mut self, program: ProgramId);

    fn draw(&mut self, call: DrawCall) -> Result<()>;

    fn live_buffers(&self) -> usize;
    fn live_programs(&self) -> usize;

    fn as_any(&self) -> &dyn Any;
}

/// Shared handle to the map's graphics context
#[derive(Clone)]
pub struct ContextHandle(Arc<Mutex<Box<dyn GraphicsContext>>>);

impl ContextHandle {
    pub fn new(context: impl GraphicsContext + 'static) -> Self {
        Self(Arc::new(Mutex::new(Box::new(context))))
    }

    pub fn headless() -> Self {
        Self::new(HeadlessContext::new())
    }

    pub fn lock(&self) -> MutexGuard<'_, Box<dyn GraphicsContext>> {
        self.0.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn with<R>(&self, f: impl FnOnce(&mut dyn GraphicsContext) -> R) -> R {
        let mut guard = self.lock();
        f(&mut **guard)
    }

    pub fn backend(&self) -> GraphicsBackend {
        self.lock().backend()
    }

    pub fn live_buffers(&self) -> usize {
        self.lock().live_buffers()
    }

    pub fn live_programs(&self) -> usize {
        self.lock().live_programs()
    }

    /// Runs `f` against the headless context, `None` for other backends
    pub fn with_headless<R>(&self, f: impl FnOnce(&HeadlessContext) -> R) -> Option<R> {
        let guard = self.lock();
        guard.as_any().downcast_ref::<HeadlessContext>().map(f)
    }

    pub fn ptr_eq(&self, other: &ContextHandle) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Default for ContextHandle {
    fn default() -> Self {
        Self::headless()
    }
}

impl fmt::Debug for ContextHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ContextHandle").field(&self.backend()).finish()
    }
}

/// Recording context; keeps the command log of the current frame
#[derive(Debug, Default)]
pub struct HeadlessContext {
    next_id: u32,
    buffers: Vec<(BufferId, BufferKind, usize)>,
    programs: Vec<(ProgramId, ProgramSource)>,
    commands: Vec<DrawCommand>,
    frames: u64,
}

impl HeadlessContext {
    pub fn new() -> Self {
        Self::default()
    }

    fn allocate_id(&mut self) -> u32 {
        self.next_id += 1;
        self.next_id
    }

    pub fn commands(&self) -> &[DrawCommand] {
        &self.commands
    }

    pub fn draw_calls(&self) -> impl Iterator<Item = &DrawCall> {
        self.commands.iter().filter_map(|command| match command {
            DrawCommand::Draw(call) => Some(call),
            _ => None,
        })
    }

    pub fn frame_count(&self) -> u64 {
        self.frames
    }

    pub fn buffers_of_kind(&self, kind: BufferKind) -> usize {
        self.buffers.iter().filter(|(_, k, _)| *k == kind).count()
    }

    pub fn program_source(&self, program: ProgramId) -> Option<&ProgramSource> {
        self.programs
            .iter()
            .find(|(id, _)| *id == program)
            .map(|(_, source)| source)
    }
}

impl GraphicsContext for HeadlessContext {
    fn backend(&self) -> GraphicsBackend {
        GraphicsBackend::Headless
    }

    fn begin_frame(&mut self, width: u32, height: u32) -> Result<()> {
        self.frames += 1;
        self.commands.clear();
        self.commands.push(DrawCommand::BeginFrame { width, height });
        Ok(())
    }

    fn create_buffer(&mut self, kind: BufferKind, data: &[u8]) -> Result<BufferId> {
        let id = self.allocate_id();
        self.buffers.push((id, kind, data.len()));
        Ok(id)
    }

    fn update_buffer(&mut self, buffer: BufferId, data: &[u8]) -> Result<()> {
        let entry = self
            .buffers
            .iter_mut()
            .find(|(id, _, _)| *id == buffer)
            .ok_or_else(|| MapError::Context(format!("unknown buffer {buffer}")))?;
        entry.2 = data.len();
        Ok(())
    }

    fn delete_buffer(&mut self, buffer: BufferId) {
        self.buffers.retain(|(id, _, _)| *id != buffer);
    }

    fn create_program(&mut self, source: &ProgramSource) -> Result<ProgramId> {
        if source.source.is_empty() {
            return Err(MapError::Context(format!("program '{}' has no source", source.label)).into());
        }
        let id = self.allocate_id();
        self.programs.push((id, source.clone()));
        Ok(id)
    }

    fn delete_program(&mut self, program: ProgramId) {
        self.programs.retain(|(id, _)| *id != program);
    }

    fn draw(&mut self, call: DrawCall) -> Result<()> {
        if !self.buffers.iter().any(|(id, _, _)| *id == call.buffer) {
            return Err(MapError::Context(format!("draw with deleted buffer {}", call.buffer)).into());
        }
        if !self.programs.iter().any(|(id, _)| *id == call.program) {
            return Err(
                MapError::Context(format!("draw with deleted program {}", call.program)).into(),
            );
        }
        self.commands.push(DrawCommand::Draw(call));
        Ok(())
    }

    fn live_buffers(&self) -> usize {
        self.buffers.len()
    }

    fn live_programs(&self) -> usize {
        self.programs.len()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
