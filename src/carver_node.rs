use crossbeam::channel::Receiver;
use godot::classes::{
    Camera3D, Engine, INode3D, Image, Input, Node, Node3D, PhysicsDirectSpaceState3D,
    PhysicsRayQueryParameters3D, Texture2D, Viewport,
};
use godot::global::{Key, MouseButton};
use godot::prelude::*;

use crate::brush_sampler::SourceBrush;
use crate::config::{AxisLimits, BrushLimits, ModifierConfig};
use crate::coordinate_frame::WorldPoint;
use crate::debug_log::{close_debug_log, debug_log, init_debug_log};
use crate::host::{
    DecorationQuery, PickHit, PickQuery, PickTarget, RecordingSink, TickInput, UiOcclusion,
    DECAL_TAG,
};
use crate::session::{ModifierSession, SessionEvent};

/// Height vertical probes start from, and the length of pointer rays.
const PROBE_HEIGHT: f32 = 100.0;
const RAY_LENGTH: f32 = 1000.0;

/// Turns raw key and button state into per-tick edges.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct InputEdges {
    pointer_down: bool,
    cancel_down: bool,
    toggle_down: bool,
}

impl InputEdges {
    /// Feed this frame's raw state. Press, cancel and toggle fire only on
    /// the frame their key goes down; `pointer_held` follows the button.
    pub fn update(
        &mut self,
        pointer_down: bool,
        cancel_down: bool,
        toggle_down: bool,
    ) -> TickInput {
        let input = TickInput {
            cancel: cancel_down && !self.cancel_down,
            pointer_pressed: pointer_down && !self.pointer_down,
            pointer_held: pointer_down,
            toggle_rotation: toggle_down && !self.toggle_down,
        };
        self.pointer_down = pointer_down;
        self.cancel_down = cancel_down;
        self.toggle_down = toggle_down;
        input
    }
}

/// Host queries answered with physics ray casts from the active camera.
struct GodotHost {
    camera: Gd<Camera3D>,
    space: Gd<PhysicsDirectSpaceState3D>,
    viewport: Gd<Viewport>,
    pick_mask: u32,
}

impl GodotHost {
    fn cast(&self, from: Vector3, to: Vector3, mask: u32) -> Option<PickHit> {
        let mut query = PhysicsRayQueryParameters3D::create(from, to)?;
        query.set_collision_mask(mask);
        query.set_collide_with_areas(true);
        query.set_collide_with_bodies(true);

        let result = self.space.clone().intersect_ray(&query);
        if result.is_empty() {
            return None;
        }

        let position = result.get("position")?.try_to::<Vector3>().ok()?;
        let point = WorldPoint::new(position.x, position.y, position.z);
        let decorated = result
            .get("collider")
            .and_then(|collider| collider.try_to::<Gd<Node>>().ok())
            .is_some_and(|node| node.is_in_group(DECAL_TAG));

        Some(if decorated {
            PickHit::tagged(point, DECAL_TAG)
        } else {
            PickHit::new(point)
        })
    }
}

impl PickQuery for GodotHost {
    fn pick(&self, target: PickTarget) -> Option<PickHit> {
        match target {
            PickTarget::Pointer => {
                let screen_pos = self.viewport.get_mouse_position();
                let origin = self.camera.project_ray_origin(screen_pos);
                let direction = self.camera.project_ray_normal(screen_pos);
                self.cast(origin, origin + direction * RAY_LENGTH, self.pick_mask)
            }
            PickTarget::Vertical { x, z } => self.cast(
                Vector3::new(x, PROBE_HEIGHT, z),
                Vector3::new(x, PROBE_HEIGHT - RAY_LENGTH, z),
                self.pick_mask,
            ),
        }
    }
}

impl DecorationQuery for GodotHost {
    fn is_decorated(&self, x: i32, z: i32) -> bool {
        // Decorations may sit on any layer.
        self.cast(
            Vector3::new(x as f32, PROBE_HEIGHT, z as f32),
            Vector3::new(x as f32, PROBE_HEIGHT - RAY_LENGTH, z as f32),
            u32::MAX,
        )
        .is_some_and(|hit| hit.has_tag(DECAL_TAG))
    }
}

impl UiOcclusion for GodotHost {
    fn is_over_ui(&self) -> bool {
        self.viewport.gui_get_hovered_control().is_some()
    }
}

/// Runtime terrain carver. Owns the height field and drives the region and
/// brush tools from mouse and keyboard input.
#[derive(GodotClass)]
#[class(base=Node3D, init, tool)]
pub struct PixyTerrainCarver {
    base: Base<Node3D>,

    /// Samples along x, world height of a full sample, samples along z
    #[export]
    #[init(val = Vector3i::new(128, 32, 128))]
    terrain_scale: Vector3i,

    #[export]
    #[init(val = 0.0)]
    base_height: f32,

    #[export]
    #[init(val = 2)]
    min_region_scale: i32,

    #[export]
    #[init(val = 10)]
    default_region_scale: i32,

    #[export]
    #[init(val = Vector2i::new(2, 64))]
    brush_width_limits: Vector2i,

    #[export]
    #[init(val = Vector2i::new(2, 64))]
    brush_height_limits: Vector2i,

    #[export]
    #[init(val = 10)]
    default_brush_width: i32,

    #[export]
    #[init(val = 10)]
    default_brush_height: i32,

    /// World height region carves and full-alpha brush texels raise to
    #[export]
    #[init(val = 2.0)]
    height_scale: f32,

    /// Alpha images used as brushes. Empty means built-in radial and solid.
    #[export]
    brush_sources: Array<Gd<Texture2D>>,

    /// Brush stamped per tile when regions mix in a brush
    #[export]
    #[init(val = 1)]
    tile_brush_index: i32,

    #[export]
    #[init(val = 2)]
    tile_size: i32,

    /// Layers the pointer and tile probes can hit
    #[export(flags_3d_physics)]
    #[init(val = u32::MAX)]
    pick_collision_mask: u32,

    /// Write carve_debug.log next to the executable
    #[export]
    #[init(val = false)]
    debug_logging: bool,

    #[init(val = None)]
    session: Option<ModifierSession>,
    #[init(val = None)]
    events: Option<Receiver<SessionEvent>>,
    edges: InputEdges,
}

#[godot_api]
impl INode3D for PixyTerrainCarver {
    fn ready(&mut self) {
        if Engine::singleton().is_editor_hint() {
            return;
        }
        if self.debug_logging {
            init_debug_log();
        }
        self.build_session();
    }

    fn process(&mut self, _delta: f64) {
        if self.session.is_none() {
            return;
        }

        let input = Input::singleton();
        let tick = self.edges.update(
            input.is_mouse_button_pressed(MouseButton::LEFT),
            input.is_key_pressed(Key::ESCAPE),
            input.is_key_pressed(Key::R),
        );

        let Some(host) = self.host() else {
            return;
        };
        let mut sink = RecordingSink::new();
        let outcome = match self.session.as_mut() {
            Some(session) => session.tick(&tick, &host, &mut sink),
            None => return,
        };
        match outcome.error {
            Some(err) if err.is_recoverable() => godot_warn!("PixyTerrainCarver: {}", err),
            Some(err) => godot_error!("PixyTerrainCarver: {}", err),
            None => {}
        }

        self.flush_writes(sink);
        self.flush_events();
    }

    fn exit_tree(&mut self) {
        if self.debug_logging {
            close_debug_log();
        }
    }
}

#[godot_api]
impl PixyTerrainCarver {
    #[signal]
    fn heights_written(origin: Vector2i, size: Vector2i, values: PackedFloat32Array);

    #[signal]
    fn mode_changed(label: GString);

    #[signal]
    fn region_scale_changed(x: i32, z: i32);

    #[signal]
    fn brush_size_changed(width: i32, height: i32);

    #[signal]
    fn brush_index_changed(index: i32);

    #[signal]
    fn mix_brush_changed(enabled: bool);

    #[func]
    fn start_region_carve(&mut self) -> bool {
        let started = self
            .session
            .as_mut()
            .is_some_and(|session| session.start_region_carve());
        self.flush_events();
        started
    }

    #[func]
    fn start_brush_paint(&mut self) -> bool {
        let started = self
            .session
            .as_mut()
            .is_some_and(|session| session.start_brush_paint());
        self.flush_events();
        started
    }

    #[func]
    fn set_region_scale(&mut self, x: i32, z: i32) {
        if let Some(session) = self.session.as_mut() {
            session.set_region_scale_x(x);
            session.set_region_scale_z(z);
        }
        self.flush_events();
    }

    #[func]
    fn set_brush_size(&mut self, width: i32, height: i32) {
        if let Some(session) = self.session.as_mut() {
            session.set_brush_width(width);
            session.set_brush_height(height);
        }
        self.flush_events();
    }

    #[func]
    fn set_brush_index(&mut self, index: i32) {
        if let Some(session) = self.session.as_mut() {
            session.set_brush_index(index.max(0) as usize);
        }
        self.flush_events();
    }

    #[func]
    fn set_mix_brush(&mut self, enabled: bool) {
        if let Some(session) = self.session.as_mut() {
            session.set_mix_brush(enabled);
        }
        self.flush_events();
    }

    /// Flatten the terrain back to `base_height`. Refused while a tool runs.
    #[func]
    fn reinitialize(&mut self) -> bool {
        let Some(session) = self.session.as_mut() else {
            return false;
        };
        if !session.reinitialize_terrain() {
            godot_warn!(
                "PixyTerrainCarver: cannot reinitialize while {} is active",
                session.mode_label()
            );
            return false;
        }

        let field = session.height_field();
        let (width, depth) = (field.width(), field.depth());
        let values = PackedFloat32Array::from(field.samples());
        self.base_mut().emit_signal(
            "heights_written",
            &[
                Vector2i::ZERO.to_variant(),
                Vector2i::new(width, depth).to_variant(),
                values.to_variant(),
            ],
        );
        true
    }

    /// Height at a sample in world units, or 0 outside the field.
    #[func]
    fn get_height(&self, x: i32, z: i32) -> f32 {
        let Some(session) = self.session.as_ref() else {
            return 0.0;
        };
        session.height_field().sample_world(x, z).unwrap_or(0.0)
    }

    #[func]
    fn get_mode_label(&self) -> GString {
        self.session
            .as_ref()
            .map_or("None", |session| session.mode_label())
            .into()
    }
}

impl PixyTerrainCarver {
    fn config(&self, brush_source_count: usize) -> ModifierConfig {
        ModifierConfig {
            terrain_scale: (
                self.terrain_scale.x,
                self.terrain_scale.y,
                self.terrain_scale.z,
            ),
            base_height: self.base_height,
            min_region_scale: self.min_region_scale,
            default_region_scale: self.default_region_scale,
            brush_limits: BrushLimits {
                width: AxisLimits::new(self.brush_width_limits.x, self.brush_width_limits.y),
                height: AxisLimits::new(self.brush_height_limits.x, self.brush_height_limits.y),
            },
            default_brush_width: self.default_brush_width,
            default_brush_height: self.default_brush_height,
            height_scale: self.height_scale,
            brush_source_count,
            tile_brush_index: self.tile_brush_index.max(0) as usize,
            tile_size: self.tile_size,
        }
    }

    fn build_session(&mut self) {
        let sources: Vec<SourceBrush> = self
            .brush_sources
            .iter_shared()
            .filter_map(|texture| {
                let source = source_from_texture(&texture);
                if source.is_none() {
                    godot_warn!("PixyTerrainCarver: skipping unreadable brush {}", texture);
                }
                source
            })
            .collect();

        let source_count = if sources.is_empty() {
            ModifierConfig::default().brush_source_count
        } else {
            sources.len()
        };
        match ModifierSession::new(self.config(source_count), sources) {
            Ok((session, events)) => {
                godot_print!(
                    "PixyTerrainCarver ready: {}x{} field, {} brushes",
                    session.height_field().width(),
                    session.height_field().depth(),
                    session.source_count()
                );
                self.session = Some(session);
                self.events = Some(events);
            }
            Err(err) => {
                godot_error!("PixyTerrainCarver: {}", err);
                debug_log(&format!("session not created: {}", err));
            }
        }
    }

    fn host(&self) -> Option<GodotHost> {
        let viewport = self.base().get_viewport()?;
        let camera = viewport.get_camera_3d()?;
        let space = camera.get_world_3d()?.get_direct_space_state()?;
        Some(GodotHost {
            camera,
            space,
            viewport,
            pick_mask: self.pick_collision_mask,
        })
    }

    fn flush_writes(&mut self, mut sink: RecordingSink) {
        for write in sink.drain() {
            let origin = Vector2i::new(write.origin_x, write.origin_z);
            let size = Vector2i::new(write.width as i32, write.depth as i32);
            let values = PackedFloat32Array::from(write.values.as_slice());
            self.base_mut().emit_signal(
                "heights_written",
                &[origin.to_variant(), size.to_variant(), values.to_variant()],
            );
        }
    }

    fn flush_events(&mut self) {
        let Some(events) = self.events.as_ref() else {
            return;
        };
        let pending: Vec<SessionEvent> = events.try_iter().collect();

        for event in pending {
            let (signal, args) = match event {
                SessionEvent::ModeChanged(label) => {
                    ("mode_changed", vec![GString::from(label.as_str()).to_variant()])
                }
                SessionEvent::RegionScaleChanged { x, z } => {
                    ("region_scale_changed", vec![x.to_variant(), z.to_variant()])
                }
                SessionEvent::BrushSizeChanged { width, height } => (
                    "brush_size_changed",
                    vec![width.to_variant(), height.to_variant()],
                ),
                SessionEvent::BrushIndexChanged(index) => {
                    ("brush_index_changed", vec![(index as i32).to_variant()])
                }
                SessionEvent::MixBrushChanged(enabled) => {
                    ("mix_brush_changed", vec![enabled.to_variant()])
                }
            };
            self.base_mut().emit_signal(signal, &args);
        }
    }
}

/// Read a texture's alpha channel into a brush source.
fn source_from_texture(texture: &Gd<Texture2D>) -> Option<SourceBrush> {
    let mut image: Gd<Image> = texture.get_image()?;
    if image.is_compressed() {
        image.decompress();
    }

    let (width, height) = (image.get_width(), image.get_height());
    let mut alpha = Vec::with_capacity((width * height).max(0) as usize);
    for row in 0..height {
        for col in 0..width {
            alpha.push(image.get_pixel(col, row).a);
        }
    }
    SourceBrush::new(width as usize, height as usize, alpha).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_press_fires_once() {
        let mut edges = InputEdges::default();
        let first = edges.update(true, false, false);
        assert!(first.pointer_pressed);
        assert!(first.pointer_held);

        let second = edges.update(true, false, false);
        assert!(!second.pointer_pressed);
        assert!(second.pointer_held);

        let released = edges.update(false, false, false);
        assert_eq!(released, TickInput::idle());
    }

    #[test]
    fn test_held_keys_do_not_repeat() {
        let mut edges = InputEdges::default();
        assert!(edges.update(false, true, true).cancel);
        let held = edges.update(false, true, true);
        assert!(!held.cancel);
        assert!(!held.toggle_rotation);

        edges.update(false, false, false);
        assert!(edges.update(false, false, true).toggle_rotation);
    }
}
