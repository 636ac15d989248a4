//! Reference point control and automatic continent switching.

use std::fmt;

use tracing::{debug, info, warn};

use crate::continent::ContinentRegistry;
use crate::coord::{clamp_to_world, WorldPoint};
use crate::error::MapError;
use crate::streaming::StreamingManager;

/// What a [`ViewController::step`] did.
#[derive(Debug)]
pub enum ViewStep {
    /// The point is inside the active continent's bounds.
    Unchanged,
    /// The point left the bounds but still resolves to the active continent.
    SameContinent,
    /// The point is outside every known continent; nothing was loaded.
    OutsideKnownContinents,
    /// Another continent was loaded.
    Switched { from: Option<String>, to: String },
    /// Loading the resolved continent failed.
    SwitchFailed { name: String, error: MapError },
}

impl ViewStep {
    pub fn is_switch(&self) -> bool {
        matches!(self, ViewStep::Switched { .. })
    }
}

impl fmt::Display for ViewStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ViewStep::Unchanged => write!(f, "unchanged"),
            ViewStep::SameContinent => write!(f, "same continent"),
            ViewStep::OutsideKnownContinents => write!(f, "outside known continents"),
            ViewStep::Switched { from: Some(from), to } => write!(f, "switched {} -> {}", from, to),
            ViewStep::Switched { from: None, to } => write!(f, "switched to {}", to),
            ViewStep::SwitchFailed { name, error } => write!(f, "switch to {} failed: {}", name, error),
        }
    }
}

/// Holds the reference point the renderer streams and renders around.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewController {
    point: WorldPoint,
}

impl ViewController {
    /// Controller at `point`, clamped to the world extent.
    pub fn new(point: WorldPoint) -> Self {
        Self {
            point: clamp_to_world(point),
        }
    }

    pub fn point(&self) -> WorldPoint {
        self.point
    }

    /// Jump to `(x, y)`, keeping the height.
    pub fn move_to(&mut self, x: f64, y: f64) {
        self.point = clamp_to_world(WorldPoint::new(x, y, self.point.z));
    }

    /// Move by a ground offset.
    pub fn nudge(&mut self, dx: f64, dy: f64) {
        self.move_to(self.point.x + dx, self.point.y + dy);
    }

    pub fn set_height(&mut self, z: f64) {
        self.point.z = z;
    }

    /// Jump to `center`, e.g. the centre of the active continent.
    pub fn reset_to(&mut self, center: WorldPoint) {
        self.move_to(center.x, center.y);
    }

    /// Load the continent under the reference point if it changed.
    ///
    /// The active continent's bounds are grown by `padding` before the
    /// containment test. Leaving them only triggers a switch when the point
    /// resolves to a continent with a different name, so points between the
    /// world sheet rectangle and the tile bounds do not reload the active
    /// continent.
    pub fn step(
        &self,
        registry: &ContinentRegistry,
        manager: &mut StreamingManager,
        padding: f64,
    ) -> ViewStep {
        let point = self.point;
        let active_name = manager.active_continent().map(|active| {
            (
                active.name.clone(),
                active
                    .bounds
                    .padded(padding)
                    .contains_exclusive(point.x, point.y),
            )
        });
        if let Some((_, true)) = active_name {
            return ViewStep::Unchanged;
        }
        let from = active_name.map(|(name, _)| name);

        let location = match registry.resolve_or_err(&point) {
            Ok(location) => location,
            Err(e) => {
                debug!(error = %e, "no continent under view");
                return ViewStep::OutsideKnownContinents;
            }
        };
        let name = location.continent_name.clone();
        if from
            .as_deref()
            .is_some_and(|active| active.eq_ignore_ascii_case(&name))
        {
            return ViewStep::SameContinent;
        }

        info!(from = ?from, to = %name, point = %point, "Continent changed");
        match registry
            .lookup(&name)
            .and_then(|descriptor| manager.load_continent(descriptor))
        {
            Ok(()) => ViewStep::Switched { from, to: name },
            Err(error) => {
                warn!(continent = %name, error = %error, "Continent switch failed");
                ViewStep::SwitchFailed { name, error }
            }
        }
    }
}

impl Default for ViewController {
    fn default() -> Self {
        Self::new(WorldPoint::default())
    }
}
