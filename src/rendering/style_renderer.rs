use crate::{
    constants::{
        COLOR_UNIFORM, PIXEL_RATIO_UNIFORM, PROJECTION_UNIFORM, UNIFORM_SLOTS,
        VIEWPORT_SIZE_UNIFORM,
    },
    core::{frame::FrameState, transform::Transform},
    rendering::{
        context::{BufferId, BufferKind, DrawCall, GraphicsContext, PrimitiveKind, ProgramId, ProgramSource},
        uniforms::{variable_accessor, variable_uniform_name, UniformAccessor, UniformValue, ValueType},
    },
    source::vector::{Feature, VectorSource},
    style::{
        color::{color_from_slice, parse_color},
        rule::StyleRuleDescriptor,
        value::StyleValue,
        variables::SharedVariables,
    },
    Result,
};
use geo_types::{Coord, Geometry, LineString};

const VECTOR_SHADER: &str = include_str!("shaders/vector.wgsl");

/// Property that colors each primitive kind, in lookup order
fn color_properties(primitive: PrimitiveKind) -> &'static [&'static str] {
    match primitive {
        PrimitiveKind::Points => &["circle-fill-color", "circle-stroke-color"],
        PrimitiveKind::Lines => &["stroke-color"],
        PrimitiveKind::Triangles => &["fill-color"],
    }
}

#[derive(Debug)]
struct GeometryBuffer {
    primitive: PrimitiveKind,
    buffer: BufferId,
    vertex_count: u32,
}

/// Draws the features of a source with one style rule.
///
/// Uniforms are bound late: each `u_var_<name>` accessor reads the layer's
/// variable table when called, so the renderer survives variable updates.
pub struct StyleRenderer {
    descriptor: StyleRuleDescriptor,
    variables: SharedVariables,
    uniforms: Vec<(String, UniformAccessor)>,
    primitives: Vec<PrimitiveKind>,
    program: Option<ProgramId>,
    buffers: Vec<GeometryBuffer>,
    /// Source the buffers were built from, with its revision at upload time
    uploaded: Option<(VectorSource, u64)>,
}

impl StyleRenderer {
    pub fn new(descriptor: StyleRuleDescriptor, variables: SharedVariables) -> Self {
        let uniforms = descriptor
            .variable_references()
            .into_iter()
            .map(|reference| {
                let hint = if reference.direct {
                    ValueType::for_property(&reference.property)
                } else {
                    None
                };
                (
                    variable_uniform_name(&reference.name),
                    variable_accessor(variables.clone(), reference.name, hint),
                )
            })
            .collect();

        let style = &descriptor.style;
        let primitives = [
            ("circle-", PrimitiveKind::Points),
            ("stroke-", PrimitiveKind::Lines),
            ("fill-", PrimitiveKind::Triangles),
        ]
        .into_iter()
        .filter(|(prefix, _)| style.has_prefix(prefix))
        .map(|(_, primitive)| primitive)
        .collect();

        Self {
            descriptor,
            variables,
            uniforms,
            primitives,
            program: None,
            buffers: Vec::new(),
            uploaded: None,
        }
    }

    pub fn descriptor(&self) -> &StyleRuleDescriptor {
        &self.descriptor
    }

    /// Accessor of the named uniform, e.g. `u_var_fillColor`
    pub fn uniform(&self, name: &str) -> Option<UniformAccessor> {
        self.uniforms
            .iter()
            .find(|(uniform, _)| uniform == name)
            .map(|(_, accessor)| accessor.clone())
    }

    pub fn uniform_names(&self) -> impl Iterator<Item = &str> {
        self.uniforms.iter().map(|(name, _)| name.as_str())
    }

    /// Primitive kinds this rule draws, derived from its property prefixes
    pub fn primitives(&self) -> &[PrimitiveKind] {
        &self.primitives
    }

    pub fn program_source(&self) -> ProgramSource {
        let mut uniforms = vec![
            COLOR_UNIFORM.to_string(),
            PIXEL_RATIO_UNIFORM.to_string(),
            VIEWPORT_SIZE_UNIFORM.to_string(),
        ];
        uniforms.extend(self.uniforms.iter().map(|(name, _)| name.clone()));
        if uniforms.len() > UNIFORM_SLOTS {
            log::warn!(
                "style rule uses {} uniforms, only {UNIFORM_SLOTS} fit the vector shader",
                uniforms.len()
            );
            uniforms.truncate(UNIFORM_SLOTS);
        }

        ProgramSource {
            label: "vector-style".to_string(),
            source: VECTOR_SHADER.to_string(),
            uniforms,
        }
    }

    /// Rule color for a primitive kind as `[r, g, b, a]`
    pub fn color(&self, primitive: PrimitiveKind) -> [f32; 4] {
        let value = color_properties(primitive)
            .iter()
            .find_map(|property| self.descriptor.style.get(property));

        let color = match value {
            Some(StyleValue::Literal(serde_json::Value::String(s))) => parse_color(s).ok(),
            Some(StyleValue::Literal(serde_json::Value::Array(items))) => {
                let numbers: Option<Vec<f64>> = items.iter().map(|v| v.as_f64()).collect();
                numbers.and_then(|n| color_from_slice(&n))
            }
            Some(StyleValue::Variable(name)) => {
                let accessor = variable_accessor(self.variables.clone(), name.clone(), Some(ValueType::Color));
                return accessor().to_vec4();
            }
            _ => None,
        };

        color.unwrap_or([0.0, 0.0, 0.0, 1.0]).map(|c| c as f32)
    }

    /// Uploads geometry when the source changed, then issues one draw per primitive kind
    pub fn render(
        &mut self,
        ctx: &mut dyn GraphicsContext,
        frame_state: &FrameState,
        source: &VectorSource,
        max_vertices: usize,
    ) -> Result<usize> {
        if self.primitives.is_empty() {
            return Ok(0);
        }

        let program = match self.program {
            Some(program) => program,
            None => {
                let program = ctx.create_program(&self.program_source())?;
                self.program = Some(program);
                program
            }
        };

        let revision = source.revision();
        let current = matches!(
            &self.uploaded,
            Some((uploaded, uploaded_revision))
                if uploaded.ptr_eq(source) && *uploaded_revision == revision
        );
        if !current {
            self.upload(ctx, source, max_vertices)?;
            self.uploaded = Some((source.clone(), revision));
        }

        let frame_uniforms = [
            (
                PROJECTION_UNIFORM.to_string(),
                projection_matrix(&frame_state.projection_transform()),
            ),
            (
                PIXEL_RATIO_UNIFORM.to_string(),
                UniformValue::Float(frame_state.pixel_ratio as f32),
            ),
            (
                VIEWPORT_SIZE_UNIFORM.to_string(),
                UniformValue::Vec2([frame_state.size[0] as f32, frame_state.size[1] as f32]),
            ),
        ];

        let mut draws = 0;
        for geometry in &self.buffers {
            if geometry.vertex_count == 0 {
                continue;
            }

            let mut uniforms = Vec::with_capacity(frame_uniforms.len() + self.uniforms.len() + 1);
            uniforms.push((
                COLOR_UNIFORM.to_string(),
                UniformValue::Vec4(self.color(geometry.primitive)),
            ));
            uniforms.extend(frame_uniforms.iter().cloned());
            uniforms.extend(
                self.uniforms
                    .iter()
                    .map(|(name, accessor)| (name.clone(), accessor())),
            );

            ctx.draw(DrawCall {
                program,
                buffer: geometry.buffer,
                primitive: geometry.primitive,
                vertex_count: geometry.vertex_count,
                uniforms,
            })?;
            draws += 1;
        }

        Ok(draws)
    }

    fn upload(
        &mut self,
        ctx: &mut dyn GraphicsContext,
        source: &VectorSource,
        max_vertices: usize,
    ) -> Result<()> {
        for primitive in self.primitives.clone() {
            let mut vertices = source.with_features(|features| collect_vertices(features, primitive));
            if vertices.len() / 2 > max_vertices {
                log::warn!(
                    "{primitive:?} buffer truncated to {max_vertices} of {} vertices",
                    vertices.len() / 2
                );
                vertices.truncate(max_vertices * 2);
            }

            let data = vertex_bytes(&vertices);
            let vertex_count = (vertices.len() / 2) as u32;

            match self.buffers.iter_mut().find(|b| b.primitive == primitive) {
                Some(existing) => {
                    ctx.update_buffer(existing.buffer, &data)?;
                    existing.vertex_count = vertex_count;
                }
                None => {
                    let buffer = ctx.create_buffer(BufferKind::Vertex, &data)?;
                    self.buffers.push(GeometryBuffer {
                        primitive,
                        buffer,
                        vertex_count,
                    });
                }
            }
        }

        log::trace!(
            "uploaded {} vertex buffers at source revision {}",
            self.buffers.len(),
            source.revision()
        );
        Ok(())
    }

    /// Releases the program and every geometry buffer
    pub fn dispose(&mut self, ctx: &mut dyn GraphicsContext) {
        for geometry in self.buffers.drain(..) {
            ctx.delete_buffer(geometry.buffer);
        }
        if let Some(program) = self.program.take() {
            ctx.delete_program(program);
        }
        self.uploaded = None;
    }
}

impl std::fmt::Debug for StyleRenderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StyleRenderer")
            .field("descriptor", &self.descriptor)
            .field("uniforms", &self.uniform_names().collect::<Vec<_>>())
            .field("primitives", &self.primitives)
            .finish()
    }
}

/// Column-major 4x4 matrix for a 2D affine transform
fn projection_matrix(transform: &Transform) -> UniformValue {
    let [a, b, c, d, e, f] = transform.0.map(|v| v as f32);
    UniformValue::Mat4([
        a, b, 0.0, 0.0, //
        c, d, 0.0, 0.0, //
        0.0, 0.0, 1.0, 0.0, //
        e, f, 0.0, 1.0,
    ])
}

fn vertex_bytes(vertices: &[f32]) -> Vec<u8> {
    vertices.iter().flat_map(|v| v.to_le_bytes()).collect()
}

/// Flattened `[x, y]` vertices of every feature for one primitive kind
fn collect_vertices(features: &[Feature], primitive: PrimitiveKind) -> Vec<f32> {
    let mut out = Vec::new();
    for feature in features {
        push_geometry(&feature.geometry, primitive, &mut out);
    }
    out
}

fn push_coord(out: &mut Vec<f32>, c: Coord<f64>) {
    out.push(c.x as f32);
    out.push(c.y as f32);
}

fn push_segments(out: &mut Vec<f32>, line: &LineString<f64>) {
    for segment in line.0.windows(2) {
        push_coord(out, segment[0]);
        push_coord(out, segment[1]);
    }
}

/// Fan over the exterior ring; holes are not cut out
fn push_fan(out: &mut Vec<f32>, ring: &LineString<f64>) {
    let coords = &ring.0;
    let closed = coords.len() > 1 && coords.first() == coords.last();
    let count = if closed { coords.len() - 1 } else { coords.len() };
    if count < 3 {
        return;
    }
    for i in 1..count - 1 {
        push_coord(out, coords[0]);
        push_coord(out, coords[i]);
        push_coord(out, coords[i + 1]);
    }
}

fn push_geometry(geometry: &Geometry<f64>, primitive: PrimitiveKind, out: &mut Vec<f32>) {
    match (geometry, primitive) {
        (Geometry::Point(point), PrimitiveKind::Points) => push_coord(out, point.0),
        (Geometry::MultiPoint(points), PrimitiveKind::Points) => {
            points.0.iter().for_each(|p| push_coord(out, p.0))
        }
        (Geometry::LineString(line), PrimitiveKind::Lines) => push_segments(out, line),
        (Geometry::MultiLineString(lines), PrimitiveKind::Lines) => {
            lines.0.iter().for_each(|line| push_segments(out, line))
        }
        (Geometry::Polygon(polygon), PrimitiveKind::Lines) => {
            push_segments(out, polygon.exterior());
            polygon.interiors().iter().for_each(|ring| push_segments(out, ring));
        }
        (Geometry::Polygon(polygon), PrimitiveKind::Triangles) => push_fan(out, polygon.exterior()),
        (Geometry::MultiPolygon(polygons), _) => {
            for polygon in &polygons.0 {
                push_geometry(&Geometry::Polygon(polygon.clone()), primitive, out);
            }
        }
        (Geometry::GeometryCollection(collection), _) => {
            for geometry in &collection.0 {
                push_geometry(geometry, primitive, out);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        core::{geo::Size, view::{View, ViewOptions}},
        rendering::context::HeadlessContext,
        style::{rule::StyleRule, variables::StyleVariables},
    };
    use geo_types::{point, polygon};
    use serde_json::json;

    fn frame_state() -> FrameState {
        FrameState::new(1, &View::new(ViewOptions::default()), Size::new(100.0, 100.0), 1.0)
    }

    fn renderer(style: serde_json::Value, variables: &SharedVariables) -> StyleRenderer {
        let rule = StyleRule::try_from(style).unwrap();
        StyleRenderer::new(StyleRuleDescriptor::new(rule), variables.clone())
    }

    #[test]
    fn test_uniforms_from_variable_references() {
        let variables = SharedVariables::new(StyleVariables::new().with("fillColor", "yellow"));
        let renderer = renderer(
            json!({ "circle-radius": ["var", "radius"], "circle-fill-color": ["var", "fillColor"] }),
            &variables,
        );

        let names: Vec<&str> = renderer.uniform_names().collect();
        assert_eq!(names, vec!["u_var_radius", "u_var_fillColor"]);
        assert_eq!(
            renderer.uniform("u_var_fillColor").unwrap()(),
            UniformValue::Vec4([255.0, 255.0, 0.0, 1.0])
        );
        assert_eq!(renderer.uniform("u_var_radius").unwrap()(), UniformValue::Float(0.0));
        assert!(renderer.uniform("u_var_missing").is_none());
        assert_eq!(renderer.primitives(), &[PrimitiveKind::Points]);
    }

    #[test]
    fn test_render_uploads_once_per_revision() {
        let variables = SharedVariables::default();
        let mut renderer = renderer(json!({ "fill-color": "red", "stroke-color": "blue" }), &variables);
        let source = VectorSource::new();
        source.add_feature(Feature::new(polygon![
            (x: 0.0, y: 0.0), (x: 10.0, y: 0.0), (x: 10.0, y: 10.0), (x: 0.0, y: 10.0)
        ]));

        let mut ctx = HeadlessContext::new();
        let frame_state = frame_state();
        assert_eq!(renderer.render(&mut ctx, &frame_state, &source, 1024).unwrap(), 2);
        assert_eq!(ctx.live_buffers(), 2);
        assert_eq!(ctx.live_programs(), 1);

        let fill = ctx
            .draw_calls()
            .find(|call| call.primitive == PrimitiveKind::Triangles)
            .unwrap();
        assert_eq!(fill.vertex_count, 6);
        assert_eq!(fill.uniform(COLOR_UNIFORM), Some(UniformValue::Vec4([255.0, 0.0, 0.0, 1.0])));

        renderer.render(&mut ctx, &frame_state, &source, 1024).unwrap();
        assert_eq!(ctx.live_buffers(), 2);

        renderer.dispose(&mut ctx);
        assert_eq!(ctx.live_buffers(), 0);
        assert_eq!(ctx.live_programs(), 0);
    }

    #[test]
    fn test_swapped_source_with_same_revision_is_uploaded() {
        let variables = SharedVariables::default();
        let mut renderer = renderer(json!({ "circle-fill-color": "red" }), &variables);
        let first = VectorSource::from_features([Feature::new(point!(x: 0.0, y: 0.0))]);
        let second = VectorSource::from_features([
            Feature::new(point!(x: 1.0, y: 1.0)),
            Feature::new(point!(x: 2.0, y: 2.0)),
        ]);
        assert_eq!(first.revision(), second.revision());

        let mut ctx = HeadlessContext::new();
        renderer.render(&mut ctx, &frame_state(), &first, 16).unwrap();
        ctx.begin_frame(100, 100).unwrap();
        renderer.render(&mut ctx, &frame_state(), &second, 16).unwrap();

        let counts: Vec<u32> = ctx.draw_calls().map(|call| call.vertex_count).collect();
        assert_eq!(counts, vec![2]);
        assert_eq!(ctx.live_buffers(), 1);
    }

    #[test]
    fn test_render_reads_current_variables() {
        let variables = SharedVariables::new(StyleVariables::new().with("fillColor", "red"));
        let mut renderer = renderer(json!({ "circle-fill-color": ["var", "fillColor"] }), &variables);
        let source = VectorSource::from_features([Feature::new(point!(x: 1.0, y: 1.0))]);
        let mut ctx = HeadlessContext::new();

        renderer.render(&mut ctx, &frame_state(), &source, 16).unwrap();
        variables.merge(StyleVariables::new().with("fillColor", "yellow"));
        ctx.begin_frame(100, 100).unwrap();
        renderer.render(&mut ctx, &frame_state(), &source, 16).unwrap();

        let call = ctx.draw_calls().next().unwrap();
        assert_eq!(
            call.uniform("u_var_fillColor"),
            Some(UniformValue::Vec4([255.0, 255.0, 0.0, 1.0]))
        );
        assert_eq!(call.uniform(COLOR_UNIFORM), call.uniform("u_var_fillColor"));
        assert_eq!(ctx.live_programs(), 1);
    }

    #[test]
    fn test_rule_without_drawable_properties() {
        let variables = SharedVariables::default();
        let mut renderer = renderer(json!({ "z-index": 3 }), &variables);
        let source = VectorSource::from_features([Feature::new(point!(x: 0.0, y: 0.0))]);
        let mut ctx = HeadlessContext::new();
        assert_eq!(renderer.render(&mut ctx, &frame_state(), &source, 16).unwrap(), 0);
        assert_eq!(ctx.live_programs(), 0);
    }

    #[test]
    fn test_fan_skips_degenerate_rings() {
        let mut out = Vec::new();
        push_fan(&mut out, &LineString::from(vec![(0.0, 0.0), (1.0, 1.0), (0.0, 0.0)]));
        assert!(out.is_empty());
    }
}
