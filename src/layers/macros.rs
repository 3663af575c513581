//! Macros to reduce boilerplate in layer implementations
//!
//! Layers keep their identity and display state in a
//! [`LayerProperties`](crate::layers::base::LayerProperties) value; these
//! macros generate the matching `LayerTrait` methods.

/// Implements the identity and display-state methods of `LayerTrait`
///
/// This generates implementations for:
/// - id(), name(), layer_type()
/// - z_index(), set_z_index()
/// - opacity(), set_opacity()
/// - is_visible(), set_visible()
/// - as_any()
///
/// Usage:
/// ```ignore
/// impl LayerTrait for MyLayer {
///     impl_layer_trait!(inner.properties);
///     // render_frame, dispose, revision, options
/// }
/// ```
#[macro_export]
macro_rules! impl_layer_trait {
    ($($properties:ident).+) => {
        fn id(&self) -> &str {
            &self.$($properties).+.id
        }

        fn name(&self) -> &str {
            &self.$($properties).+.name
        }

        fn layer_type(&self) -> $crate::layers::base::LayerType {
            self.$($properties).+.layer_type
        }

        fn z_index(&self) -> i32 {
            self.$($properties).+.state().z_index
        }

        fn set_z_index(&self, z_index: i32) {
            self.$($properties).+.update(|state| state.z_index = z_index);
        }

        fn opacity(&self) -> f32 {
            self.$($properties).+.state().opacity
        }

        fn set_opacity(&self, opacity: f32) {
            self.$($properties).+.update(|state| state.opacity = opacity.clamp(0.0, 1.0));
        }

        fn is_visible(&self) -> bool {
            self.$($properties).+.state().visible
        }

        fn set_visible(&self, visible: bool) {
            self.$($properties).+.update(|state| state.visible = visible);
        }

        fn as_any(&self) -> &dyn std::any::Any {
            self
        }
    };
}

/// Serializes the identity and display state as the layer's options
///
/// An optional method name adds layer-specific entries; the method must
/// return a `serde_json::Map<String, serde_json::Value>`.
#[macro_export]
macro_rules! impl_default_options_serialization {
    ($($properties:ident).+ $(, $extra:ident)?) => {
        fn options(&self) -> serde_json::Value {
            let properties = &self.$($properties).+;
            let state = properties.state().clone();
            #[allow(unused_mut)]
            let mut options = serde_json::json!({
                "id": properties.id,
                "name": properties.name,
                "layer_type": properties.layer_type.to_string(),
                "z_index": state.z_index,
                "opacity": state.opacity,
                "visible": state.visible,
            });
            $(
                if let Some(object) = options.as_object_mut() {
                    object.extend(self.$extra());
                }
            )?
            options
        }
    };
}
