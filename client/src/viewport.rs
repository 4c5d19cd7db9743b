use pukpuk_shared::BoundingRegion;

/// Pan/zoom transform from lon/lat to canvas pixels.
///
/// World space is plain equirectangular degrees with latitude flipped so
/// north is up: `world = (lon, -lat)`. At Indonesia's latitudes the
/// distortion is negligible.
#[derive(Debug, Clone, PartialEq)]
pub struct Viewport {
    pub offset_x: f64,
    pub offset_y: f64,
    /// Pixels per degree.
    pub scale: f64,
}

const MIN_SCALE: f64 = 2.0;
const MAX_SCALE: f64 = 20_000.0;
const ZOOM_SENSITIVITY: f64 = 0.001;
const FIT_PADDING: f64 = 0.05;

impl Default for Viewport {
    fn default() -> Self {
        // Roughly the archipelago on a 1200px wide canvas.
        Self {
            offset_x: -2_300.0,
            offset_y: 300.0,
            scale: 24.0,
        }
    }
}

impl Viewport {
    pub fn lonlat_to_screen(&self, lon: f64, lat: f64) -> (f64, f64) {
        (
            lon * self.scale + self.offset_x,
            -lat * self.scale + self.offset_y,
        )
    }

    pub fn screen_to_lonlat(&self, sx: f64, sy: f64) -> (f64, f64) {
        (
            (sx - self.offset_x) / self.scale,
            -(sy - self.offset_y) / self.scale,
        )
    }

    /// Zoom toward a focus point (screen coordinates).
    pub fn zoom_at(&mut self, delta: f64, screen_x: f64, screen_y: f64) {
        let factor = (-delta * ZOOM_SENSITIVITY).exp();
        let new_scale = (self.scale * factor).clamp(MIN_SCALE, MAX_SCALE);
        let ratio = new_scale / self.scale;

        self.offset_x = screen_x - (screen_x - self.offset_x) * ratio;
        self.offset_y = screen_y - (screen_y - self.offset_y) * ratio;
        self.scale = new_scale;
    }

    pub fn pan(&mut self, dx: f64, dy: f64) {
        self.offset_x += dx;
        self.offset_y += dy;
    }

    /// Center `bounds` in the canvas with a small margin.
    ///
    /// Degenerate bounds (a single point or zero-sized canvas) leave the
    /// viewport untouched.
    pub fn fit_region(&mut self, bounds: &BoundingRegion, canvas_w: f64, canvas_h: f64) {
        let world_w = bounds.width();
        let world_h = bounds.height();
        if world_w <= 0.0 || world_h <= 0.0 || canvas_w <= 0.0 || canvas_h <= 0.0 {
            return;
        }

        let scale_x = canvas_w / (world_w * (1.0 + FIT_PADDING * 2.0));
        let scale_y = canvas_h / (world_h * (1.0 + FIT_PADDING * 2.0));
        self.scale = scale_x.min(scale_y).clamp(MIN_SCALE, MAX_SCALE);

        let (center_lon, center_lat) = bounds.center();
        self.offset_x = canvas_w / 2.0 - center_lon * self.scale;
        self.offset_y = canvas_h / 2.0 + center_lat * self.scale;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    fn java() -> BoundingRegion {
        BoundingRegion {
            min_lon: 105.0,
            min_lat: -8.8,
            max_lon: 114.6,
            max_lat: -5.8,
        }
    }

    #[test]
    fn north_is_up() {
        let vp = Viewport {
            offset_x: 0.0,
            offset_y: 0.0,
            scale: 10.0,
        };
        let (_, north_y) = vp.lonlat_to_screen(110.0, 2.0);
        let (_, south_y) = vp.lonlat_to_screen(110.0, -7.0);
        assert!(north_y < south_y);
    }

    #[test]
    fn screen_and_lonlat_are_inverse() {
        let vp = Viewport {
            offset_x: -1234.5,
            offset_y: 88.0,
            scale: 317.0,
        };
        let (sx, sy) = vp.lonlat_to_screen(110.37, -7.72);
        let (lon, lat) = vp.screen_to_lonlat(sx, sy);
        assert!(approx(lon, 110.37));
        assert!(approx(lat, -7.72));
    }

    #[test]
    fn fit_region_centers_bounds() {
        let mut vp = Viewport::default();
        vp.fit_region(&java(), 1000.0, 600.0);
        let (lon, lat) = java().center();
        let (sx, sy) = vp.lonlat_to_screen(lon, lat);
        assert!(approx(sx, 500.0));
        assert!(approx(sy, 300.0));

        // Both corners land inside the canvas.
        let (left, top) = vp.lonlat_to_screen(105.0, -5.8);
        let (right, bottom) = vp.lonlat_to_screen(114.6, -8.8);
        assert!(left >= 0.0 && right <= 1000.0);
        assert!(top >= 0.0 && bottom <= 600.0);
    }

    #[test]
    fn fit_region_ignores_degenerate_bounds() {
        let mut vp = Viewport::default();
        let before = vp.clone();
        vp.fit_region(
            &BoundingRegion {
                min_lon: 110.0,
                min_lat: -7.0,
                max_lon: 110.0,
                max_lat: -7.0,
            },
            800.0,
            600.0,
        );
        assert_eq!(vp, before);
        vp.fit_region(&java(), 0.0, 600.0);
        assert_eq!(vp, before);
    }

    #[test]
    fn zoom_keeps_focus_point_fixed() {
        let mut vp = Viewport::default();
        let focus = (420.0, 310.0);
        let before = vp.screen_to_lonlat(focus.0, focus.1);
        vp.zoom_at(-240.0, focus.0, focus.1);
        let after = vp.screen_to_lonlat(focus.0, focus.1);
        assert!(vp.scale > Viewport::default().scale);
        assert!(approx(before.0, after.0));
        assert!(approx(before.1, after.1));
    }

    #[test]
    fn zoom_is_clamped() {
        let mut vp = Viewport::default();
        for _ in 0..200 {
            vp.zoom_at(5_000.0, 0.0, 0.0);
        }
        assert!(approx(vp.scale, MIN_SCALE));
    }
}
