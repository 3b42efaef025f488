//! Screen space and world space conversions for a 2D viewport.
//!
//! Screen space has its origin in the top left corner of the render surface, in logical pixels,
//! with y pointing down. World space uses the same orientation; one world unit covers one pixel at
//! a zoom of `1.0`.

use bevy_math::DVec2;
use bevy_reflect::Reflect;

/// Shake offsets are expressed in screen pixels before zoom; this scales them to a visible amount.
pub const SHAKE_OFFSET_SCALE: f64 = 10.0;

/// An axis aligned rectangle in world space.
#[derive(Debug, Clone, Copy, PartialEq, Reflect)]
pub struct WorldRect {
    /// Top left corner.
    pub min: DVec2,
    /// Bottom right corner.
    pub max: DVec2,
}

impl WorldRect {
    /// Create a rectangle from two corners, in any order.
    pub fn from_corners(a: DVec2, b: DVec2) -> Self {
        Self {
            min: a.min(b),
            max: a.max(b),
        }
    }

    /// Create a rectangle from its center and full size.
    pub fn from_center_size(center: DVec2, size: DVec2) -> Self {
        Self::from_corners(center - size / 2.0, center + size / 2.0)
    }

    pub fn width(&self) -> f64 {
        self.max.x - self.min.x
    }

    pub fn height(&self) -> f64 {
        self.max.y - self.min.y
    }

    pub fn size(&self) -> DVec2 {
        self.max - self.min
    }

    pub fn center(&self) -> DVec2 {
        (self.min + self.max) / 2.0
    }

    /// Inclusive point containment.
    pub fn contains(&self, point: DVec2) -> bool {
        point.cmpge(self.min).all() && point.cmple(self.max).all()
    }

    /// Do the two rectangles overlap? Touching edges count as overlapping.
    pub fn intersects(&self, other: &WorldRect) -> bool {
        self.min.cmple(other.max).all() && other.min.cmple(self.max).all()
    }

    /// Clamp a point into this rectangle.
    pub fn clamp_point(&self, point: DVec2) -> DVec2 {
        point.max(self.min).min(self.max)
    }

    /// Round outward to whole world units: floor on the minimum, ceil on the maximum.
    pub fn round_outward(&self) -> Self {
        Self {
            min: self.min.floor(),
            max: self.max.ceil(),
        }
    }
}

/// The transform a renderer applies before drawing world space content: scale first, then
/// translate, in screen pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderTransform {
    pub scale: f64,
    pub translation: DVec2,
}

impl RenderTransform {
    /// Map a world point to the screen using this transform.
    pub fn apply(&self, world: DVec2) -> DVec2 {
        world * self.scale + self.translation
    }
}

/// The state needed to map between screen and world space. Cheap to copy; obtained from
/// [`Viewport::view`](super::component::Viewport::view).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct View {
    pub zoom: f64,
    pub center: DVec2,
    /// Size of the render surface in logical pixels.
    pub surface: DVec2,
    /// Current shake offset, see [`SHAKE_OFFSET_SCALE`].
    pub shake: DVec2,
}

impl View {
    pub fn screen_to_world(&self, screen: DVec2) -> DVec2 {
        (screen - self.surface / 2.0) / self.zoom + self.center
    }

    pub fn world_to_screen(&self, world: DVec2) -> DVec2 {
        (world - self.center) * self.zoom + self.surface / 2.0
    }

    /// Size of the visible area in world units.
    pub fn world_size(&self) -> DVec2 {
        self.surface / self.zoom
    }

    /// World position of the top left corner of the screen, including shake.
    pub fn top_left(&self) -> DVec2 {
        self.center - self.world_size() / 2.0 + self.shake * SHAKE_OFFSET_SCALE / self.zoom
    }

    /// The exact visible world area, including shake.
    pub fn world_rect(&self) -> WorldRect {
        let top_left = self.top_left();
        WorldRect {
            min: top_left,
            max: top_left + self.world_size(),
        }
    }

    /// The visible world area rounded outward so that culling against it never misses a partially
    /// visible object.
    pub fn visible_rect(&self) -> WorldRect {
        self.world_rect().round_outward()
    }

    pub fn render_transform(&self) -> RenderTransform {
        RenderTransform {
            scale: self.zoom,
            translation: -self.zoom * self.top_left(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn view() -> View {
        View {
            zoom: 2.0,
            center: DVec2::new(10.0, -4.0),
            surface: DVec2::new(800.0, 600.0),
            shake: DVec2::ZERO,
        }
    }

    #[test]
    fn screen_center_maps_to_world_center() {
        let view = view();
        assert_eq!(view.screen_to_world(DVec2::new(400.0, 300.0)), view.center);
        assert_eq!(view.world_to_screen(view.center), DVec2::new(400.0, 300.0));
    }

    #[test]
    fn conversions_are_inverse() {
        let view = view();
        for p in [
            DVec2::ZERO,
            DVec2::new(123.25, 7.5),
            DVec2::new(-3000.0, 9000.125),
        ] {
            let back = view.world_to_screen(view.screen_to_world(p));
            assert!((back - p).length() < 1e-9, "{p} -> {back}");
        }
    }

    #[test]
    fn render_transform_agrees_with_world_to_screen() {
        let view = view();
        let world = DVec2::new(42.0, 17.0);
        let a = view.render_transform().apply(world);
        let b = view.world_to_screen(world);
        assert!((a - b).length() < 1e-9);
    }

    #[test]
    fn visible_rect_rounds_outward() {
        let view = View {
            zoom: 3.0,
            center: DVec2::new(0.4, 0.4),
            surface: DVec2::new(100.0, 100.0),
            shake: DVec2::ZERO,
        };
        let exact = view.world_rect();
        let rect = view.visible_rect();
        assert!(rect.min.x <= exact.min.x && rect.min.y <= exact.min.y);
        assert!(rect.max.x >= exact.max.x && rect.max.y >= exact.max.y);
        assert_eq!(rect.min, rect.min.floor());
        assert_eq!(rect.max, rect.max.ceil());
    }

    #[test]
    fn shake_offsets_visible_rect() {
        let mut view = view();
        let still = view.world_rect();
        view.shake = DVec2::new(1.0, 0.0);
        let shaken = view.world_rect();
        assert!((shaken.min.x - still.min.x - SHAKE_OFFSET_SCALE / view.zoom).abs() < 1e-9);
        assert_eq!(shaken.min.y, still.min.y);
        assert_eq!(shaken.size(), still.size());
    }

    #[test]
    fn rect_queries() {
        let rect = WorldRect::from_corners(DVec2::new(5.0, 5.0), DVec2::new(-5.0, -5.0));
        assert_eq!(rect.min, DVec2::new(-5.0, -5.0));
        assert!(rect.contains(DVec2::new(5.0, 0.0)));
        assert!(!rect.contains(DVec2::new(5.1, 0.0)));
        let other = WorldRect::from_center_size(DVec2::new(9.0, 0.0), DVec2::splat(8.0));
        assert!(rect.intersects(&other));
        assert_eq!(rect.clamp_point(DVec2::new(20.0, -20.0)), DVec2::new(5.0, -5.0));
    }
}
