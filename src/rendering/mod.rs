pub mod context;
pub mod event;
pub mod style_renderer;
pub mod uniforms;
pub mod vector;
#[cfg(feature = "render")]
pub mod wgpu_context;

// Re-export main types
pub use context::{ContextHandle, GraphicsBackend, GraphicsContext, HeadlessContext};
pub use event::{get_render_pixel, RenderEvent, RenderEventType};
pub use style_renderer::StyleRenderer;
pub use uniforms::{UniformAccessor, UniformValue, ValueType};
pub use vector::WebGLVectorLayerRenderer;
#[cfg(feature = "render")]
pub use wgpu_context::WgpuContext;
