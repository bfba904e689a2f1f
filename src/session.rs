//! Modifier session: the single owner of the height field and the active
//! tool.
//!
//! The host calls [`ModifierSession::tick`] once per frame with the input it
//! classified. At most one tool runs at a time; a cancel on any tick returns
//! the session to [`ActiveMode::None`] without touching the field. Changes
//! the presentation layer should echo are sent as [`SessionEvent`]s.

use crossbeam::channel::{unbounded, Receiver, Sender};

use crate::brush_painter;
use crate::brush_sampler::{resample, resample_unclamped, ResampledBrush, SourceBrush};
use crate::config::ModifierConfig;
use crate::coordinate_frame::{CellXZ, GridAnchor};
use crate::debug_log::debug_log;
use crate::error::{CarveError, CarveResult};
use crate::height_field::HeightField;
use crate::host::{PickTarget, TerrainHost, TerrainSink, TickInput};
use crate::region_painter::{self, RegionPaintReport};
use crate::region_selector::{RegionCommit, RegionSelector};

/// Which tool currently owns the pointer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum ActiveMode {
    #[default]
    None,
    RegionCarve,
    BrushPaint,
}

impl ActiveMode {
    pub fn label(self) -> &'static str {
        match self {
            ActiveMode::None => "None",
            ActiveMode::RegionCarve => "Region Carve",
            ActiveMode::BrushPaint => "Brush Paint",
        }
    }

    pub fn is_active(self) -> bool {
        self != ActiveMode::None
    }
}

/// Notifications for the presentation layer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SessionEvent {
    ModeChanged(String),
    RegionScaleChanged { x: i32, z: i32 },
    BrushSizeChanged { width: i32, height: i32 },
    BrushIndexChanged(usize),
    MixBrushChanged(bool),
}

/// What happened during one tick.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TickOutcome {
    pub cancelled: bool,
    /// Selection committed this tick, if any.
    pub commit: Option<RegionCommit>,
    pub region: Option<RegionPaintReport>,
    pub brush_stamped: bool,
    /// Paint error that aborted this tick's edit. The session keeps going.
    pub error: Option<CarveError>,
}

pub struct ModifierSession {
    config: ModifierConfig,
    field: HeightField,
    sources: Vec<SourceBrush>,
    selector: RegionSelector,
    mode: ActiveMode,
    brush_size: (i32, i32),
    brush_index: usize,
    brush: ResampledBrush,
    tile_brush: ResampledBrush,
    mix_brush: bool,
    brush_cursor: Option<CellXZ>,
    events: Sender<SessionEvent>,
}

impl ModifierSession {
    /// Build a session over a fresh field at the configured base height.
    ///
    /// `sources` must hold exactly `brush_source_count` brushes. With no
    /// `sources`, that many built-in brushes are generated, alternating
    /// radial and solid.
    pub fn new(
        config: ModifierConfig,
        sources: Vec<SourceBrush>,
    ) -> CarveResult<(Self, Receiver<SessionEvent>)> {
        config.validate()?;

        let sources = if sources.is_empty() {
            default_sources(config.brush_source_count)
        } else if sources.len() != config.brush_source_count {
            return Err(CarveError::config(format!(
                "{} brush sources supplied, {} configured",
                sources.len(),
                config.brush_source_count
            )));
        } else {
            sources
        };
        let field = HeightField::new(
            config.width(),
            config.depth(),
            config.height_scale_y(),
            config.base_height,
        )?;

        let brush_size = config
            .brush_limits
            .clamp(config.default_brush_width, config.default_brush_height);
        let brush = resample(&sources[0], brush_size.0, brush_size.1, &config.brush_limits);
        let tile_index = config.tile_brush_index.min(sources.len() - 1);
        let tile_size = config.tile_size as usize;
        let tile_brush = resample_unclamped(&sources[tile_index], tile_size, tile_size);

        let selector = RegionSelector::new(config.min_region_scale, config.default_region_scale);
        let (events, receiver) = unbounded();

        debug_log(&format!(
            "session: {}x{} field, {} brush sources",
            config.width(),
            config.depth(),
            sources.len()
        ));

        Ok((
            Self {
                config,
                field,
                sources,
                selector,
                mode: ActiveMode::None,
                brush_size,
                brush_index: 0,
                brush,
                tile_brush,
                mix_brush: false,
                brush_cursor: None,
                events,
            },
            receiver,
        ))
    }

    // ===== Mode control =====

    /// Start region selection. Returns false when another tool is active.
    pub fn start_region_carve(&mut self) -> bool {
        self.start(ActiveMode::RegionCarve)
    }

    /// Start brush painting. Returns false when another tool is active.
    pub fn start_brush_paint(&mut self) -> bool {
        self.start(ActiveMode::BrushPaint)
    }

    fn start(&mut self, mode: ActiveMode) -> bool {
        if self.mode.is_active() {
            debug_log(&format!(
                "start {} ignored, {} is active",
                mode.label(),
                self.mode.label()
            ));
            return false;
        }
        if mode == ActiveMode::BrushPaint {
            self.refresh_brush();
        }
        self.set_mode(mode);
        true
    }

    fn set_mode(&mut self, mode: ActiveMode) {
        self.mode = mode;
        self.emit(SessionEvent::ModeChanged(mode.label().to_string()));
    }

    /// Advance the active tool by one frame.
    pub fn tick<H: TerrainHost + ?Sized>(
        &mut self,
        input: &TickInput,
        host: &H,
        sink: &mut dyn TerrainSink,
    ) -> TickOutcome {
        if input.cancel {
            let was_active = self.mode.is_active();
            self.selector.cancel();
            self.brush_cursor = None;
            if was_active {
                self.set_mode(ActiveMode::None);
            }
            return TickOutcome {
                cancelled: was_active,
                ..Default::default()
            };
        }

        match self.mode {
            ActiveMode::None => TickOutcome::default(),
            ActiveMode::RegionCarve => self.tick_region(input, host, sink),
            ActiveMode::BrushPaint => self.tick_brush(input, host, sink),
        }
    }

    fn tick_region<H: TerrainHost + ?Sized>(
        &mut self,
        input: &TickInput,
        host: &H,
        sink: &mut dyn TerrainSink,
    ) -> TickOutcome {
        let pick = host.pick(PickTarget::Pointer).map(|hit| hit.point);
        let Some(commit) = self.selector.tick(input, pick, host.is_over_ui()) else {
            return TickOutcome::default();
        };

        let tile = self.mix_brush.then_some(&self.tile_brush);
        let result = region_painter::paint_region(
            &commit,
            tile,
            self.config.height_scale,
            &mut self.field,
            host,
            sink,
        );

        let mut outcome = TickOutcome {
            commit: Some(commit),
            ..Default::default()
        };
        match result {
            Ok(report) => {
                debug_log(&format!("region {:?} painted: {:?}", commit.scale, report));
                outcome.region = Some(report);
            }
            Err(err) => {
                debug_log(&format!("region {:?} rejected: {}", commit.scale, err));
                outcome.error = Some(err);
            }
        }
        outcome
    }

    fn tick_brush<H: TerrainHost + ?Sized>(
        &mut self,
        input: &TickInput,
        host: &H,
        sink: &mut dyn TerrainSink,
    ) -> TickOutcome {
        let cell = host
            .pick(PickTarget::Pointer)
            .map(|hit| CellXZ::nearest(hit.point.x, hit.point.z));
        if cell.is_some() {
            self.brush_cursor = cell;
        }

        let mut outcome = TickOutcome::default();
        if !input.pointer_pressed || host.is_over_ui() {
            return outcome;
        }
        let Some(cell) = cell else {
            return outcome;
        };

        match brush_painter::paint(
            cell,
            &self.brush,
            self.config.height_scale,
            &mut self.field,
            sink,
        ) {
            Ok(()) => outcome.brush_stamped = true,
            Err(err) => {
                debug_log(&format!("brush at {:?} rejected: {}", cell, err));
                outcome.error = Some(err);
            }
        }
        outcome
    }

    // ===== Settings =====

    /// Set the region half extent along x. Returns the stored value.
    pub fn set_region_scale_x(&mut self, value: i32) -> i32 {
        let stored = self.selector.set_scale_limit_x(value);
        self.emit_region_scale();
        stored
    }

    pub fn set_region_scale_z(&mut self, value: i32) -> i32 {
        let stored = self.selector.set_scale_limit_z(value);
        self.emit_region_scale();
        stored
    }

    pub fn set_brush_width(&mut self, value: i32) -> i32 {
        self.brush_size.0 = self.config.brush_limits.width.clamp(value);
        self.refresh_brush();
        self.emit_brush_size();
        self.brush_size.0
    }

    pub fn set_brush_height(&mut self, value: i32) -> i32 {
        self.brush_size.1 = self.config.brush_limits.height.clamp(value);
        self.refresh_brush();
        self.emit_brush_size();
        self.brush_size.1
    }

    /// Select a source brush, clamped to the available sources.
    pub fn set_brush_index(&mut self, index: usize) -> usize {
        self.brush_index = index.min(self.sources.len() - 1);
        self.refresh_brush();
        self.emit(SessionEvent::BrushIndexChanged(self.brush_index));
        self.brush_index
    }

    /// Cover committed regions with tiles of the tile brush instead of a
    /// flat raise.
    pub fn set_mix_brush(&mut self, enabled: bool) {
        self.mix_brush = enabled;
        self.emit(SessionEvent::MixBrushChanged(enabled));
    }

    /// Reset every sample to the configured base height. Refused while a
    /// tool is active.
    pub fn reinitialize_terrain(&mut self) -> bool {
        if self.mode.is_active() {
            return false;
        }
        self.field.reinitialize(self.config.base_height);
        debug_log("terrain reinitialized");
        true
    }

    fn refresh_brush(&mut self) {
        self.brush = resample(
            &self.sources[self.brush_index],
            self.brush_size.0,
            self.brush_size.1,
            &self.config.brush_limits,
        );
    }

    fn emit_region_scale(&self) {
        let (x, z) = self.selector.scale_limit();
        self.emit(SessionEvent::RegionScaleChanged { x, z });
    }

    fn emit_brush_size(&self) {
        let (width, height) = self.brush_size;
        self.emit(SessionEvent::BrushSizeChanged { width, height });
    }

    fn emit(&self, event: SessionEvent) {
        // Nobody listening is fine.
        let _ = self.events.send(event);
    }

    // ===== Getters =====

    pub fn active_mode(&self) -> ActiveMode {
        self.mode
    }

    pub fn mode_label(&self) -> &'static str {
        self.mode.label()
    }

    pub fn config(&self) -> &ModifierConfig {
        &self.config
    }

    pub fn height_field(&self) -> &HeightField {
        &self.field
    }

    pub fn brush(&self) -> &ResampledBrush {
        &self.brush
    }

    pub fn brush_size(&self) -> (i32, i32) {
        self.brush_size
    }

    pub fn brush_index(&self) -> usize {
        self.brush_index
    }

    pub fn source_count(&self) -> usize {
        self.sources.len()
    }

    pub fn mix_brush(&self) -> bool {
        self.mix_brush
    }

    pub fn selector(&self) -> &RegionSelector {
        &self.selector
    }

    /// Where the region preview sits while no selection is growing.
    pub fn preview_anchor(&self) -> Option<GridAnchor> {
        self.selector.preview_anchor()
    }

    /// Cell under the pointer during brush painting.
    pub fn brush_cursor(&self) -> Option<CellXZ> {
        self.brush_cursor
    }
}

fn default_sources(count: usize) -> Vec<SourceBrush> {
    (0..count)
        .map(|i| {
            if i % 2 == 0 {
                SourceBrush::radial(64)
            } else {
                SourceBrush::solid(16)
            }
        })
        .collect()
}
