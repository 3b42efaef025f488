//! Provides [`Gesture`], the user-driven motion currently holding authority over a viewport.

use bevy_math::DVec2;
use bevy_reflect::Reflect;

/// What the user is currently doing to the camera. Dragging and pinching are mutually exclusive by
/// construction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Reflect)]
pub enum Gesture {
    /// No pointer is moving the camera.
    #[default]
    Idle,
    /// A single pointer is dragging the view.
    Dragging {
        /// The last screen position of the pointer, used to compute the next delta.
        last_position: DVec2,
        /// Simulated time in milliseconds of the last sample that actually moved the view.
        last_moved_at: f64,
    },
    /// Two touch points are pinching.
    Pinching {
        /// The last screen positions of both touch points.
        last_positions: [DVec2; 2],
        /// Simulated time in milliseconds of the last sample in which either finger moved.
        last_moved_at: f64,
    },
}

impl Gesture {
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }

    pub fn is_dragging(&self) -> bool {
        matches!(self, Self::Dragging { .. })
    }

    pub fn is_pinching(&self) -> bool {
        matches!(self, Self::Pinching { .. })
    }

    /// Simulated time of the last sample that moved the view, while the user holds the camera.
    pub fn last_moved_at(&self) -> Option<f64> {
        match self {
            Self::Idle => None,
            Self::Dragging { last_moved_at, .. } | Self::Pinching { last_moved_at, .. } => {
                Some(*last_moved_at)
            }
        }
    }

    /// Is the user holding the camera, either dragging or pinching?
    pub fn is_user_controlled(&self) -> bool {
        !self.is_idle()
    }
}

/// Notification that the user interacted with the viewport, for consumers that e.g. dismiss
/// tooltips when the view moves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Reflect)]
pub enum UserInteraction {
    /// The view was moved by a drag, pinch or wheel.
    Move,
    /// A drag or pinch ended.
    Release,
}
