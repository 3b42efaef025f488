//! Provides [`ZoomLimits`], the policy that keeps a viewport's zoom inside the bounds reported by
//! the platform.

use std::{fmt, sync::Arc};

use bevy_log::prelude::*;
use bevy_reflect::Reflect;

/// Platform facts the controller depends on but does not own.
///
/// Mobile platforms typically allow a smaller zoom range and want a weaker fling than a desktop
/// with a precise mouse.
pub trait PlatformCapabilities: Send + Sync {
    /// The smallest zoom factor the viewport may reach.
    fn minimum_zoom(&self) -> f64;
    /// The largest zoom factor the viewport may reach.
    fn maximum_zoom(&self) -> f64;
    /// Multiplier applied to inertial panning after a drag is released.
    fn touch_pan_strength(&self) -> f64;
}

/// A [`PlatformCapabilities`] implementation with fixed values.
#[derive(Debug, Clone, Copy, PartialEq, Reflect)]
pub struct StaticCapabilities {
    /// See [`PlatformCapabilities::minimum_zoom`].
    pub min_zoom: f64,
    /// See [`PlatformCapabilities::maximum_zoom`].
    pub max_zoom: f64,
    /// See [`PlatformCapabilities::touch_pan_strength`].
    pub touch_pan_strength: f64,
}

impl Default for StaticCapabilities {
    fn default() -> Self {
        Self {
            min_zoom: 0.1,
            max_zoom: 10.0,
            touch_pan_strength: 0.4,
        }
    }
}

impl PlatformCapabilities for StaticCapabilities {
    fn minimum_zoom(&self) -> f64 {
        self.min_zoom
    }

    fn maximum_zoom(&self) -> f64 {
        self.max_zoom
    }

    fn touch_pan_strength(&self) -> f64 {
        self.touch_pan_strength
    }
}

/// Bounds the zoom of a viewport, using limits supplied by a [`PlatformCapabilities`] provider.
///
/// The limits are read every time they are applied, so a provider may change them at runtime
/// (for example when the window moves to a display with a different pixel density).
#[derive(Clone)]
pub struct ZoomLimits {
    platform: Arc<dyn PlatformCapabilities>,
    /// Debug override. When true, [`ZoomLimits::clamp`] returns its input unchanged.
    pub disabled: bool,
}

impl Default for ZoomLimits {
    fn default() -> Self {
        Self::new(StaticCapabilities::default())
    }
}

impl fmt::Debug for ZoomLimits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ZoomLimits")
            .field("min", &self.platform.minimum_zoom())
            .field("max", &self.platform.maximum_zoom())
            .field("disabled", &self.disabled)
            .finish()
    }
}

impl ZoomLimits {
    /// Create zoom limits backed by the given platform provider.
    pub fn new(platform: impl PlatformCapabilities + 'static) -> Self {
        Self {
            platform: Arc::new(platform),
            disabled: false,
        }
    }

    /// Create zoom limits from an already shared platform provider.
    pub fn from_shared(platform: Arc<dyn PlatformCapabilities>) -> Self {
        Self {
            platform,
            disabled: false,
        }
    }

    /// The platform provider backing these limits.
    pub fn platform(&self) -> &dyn PlatformCapabilities {
        self.platform.as_ref()
    }

    /// The current `(min, max)` zoom bounds, or `None` if the provider reports bounds that cannot
    /// be used for clamping.
    pub fn bounds(&self) -> Option<(f64, f64)> {
        let (min, max) = (self.platform.minimum_zoom(), self.platform.maximum_zoom());
        let valid = min.is_finite() && max.is_finite() && min > 0.0 && min <= max;
        if !valid {
            warn_once!("Ignoring invalid zoom limits: min {min}, max {max}");
            return None;
        }
        Some((min, max))
    }

    /// Clamp `zoom` into the current bounds. A no-op while [`ZoomLimits::disabled`] is set or the
    /// provider reports unusable bounds.
    pub fn clamp(&self, zoom: f64) -> f64 {
        if self.disabled {
            return zoom;
        }
        match self.bounds() {
            Some((min, max)) => zoom.clamp(min, max),
            None => zoom,
        }
    }

    /// Is `zoom` inside the current bounds? Always true while the limits are disabled.
    pub fn contains(&self, zoom: f64) -> bool {
        if self.disabled {
            return true;
        }
        self.bounds()
            .map(|(min, max)| (min..=max).contains(&zoom))
            .unwrap_or(true)
    }

    /// See [`PlatformCapabilities::touch_pan_strength`]. Non-finite strengths are treated as zero.
    pub fn touch_pan_strength(&self) -> f64 {
        let strength = self.platform.touch_pan_strength();
        if strength.is_finite() {
            strength
        } else {
            warn_once!("Ignoring non-finite touch pan strength {strength}");
            0.0
        }
    }
}
