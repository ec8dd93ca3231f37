/// A detection candidate: an axis-aligned rectangle in frame pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Region {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Region {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// `width * height`, widened so large rectangles cannot overflow.
    pub fn area(&self) -> i64 {
        self.width as i64 * self.height as i64
    }

    pub fn right(&self) -> i32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> i32 {
        self.y + self.height
    }

    pub fn is_empty(&self) -> bool {
        self.width <= 0 || self.height <= 0
    }

    /// Intersection with the `[0, width) x [0, height)` frame rectangle.
    pub fn clamp_to(&self, width: u32, height: u32) -> Option<Region> {
        let x1 = self.x.max(0);
        let y1 = self.y.max(0);
        let x2 = self.right().min(width as i32);
        let y2 = self.bottom().min(height as i32);
        if x2 <= x1 || y2 <= y1 {
            return None;
        }
        Some(Region::new(x1, y1, x2 - x1, y2 - y1))
    }

    /// True when `self` fits inside `other` grown by `(dx, dy)` on every side.
    pub fn is_inside(&self, other: &Region, dx: i32, dy: i32) -> bool {
        self.x >= other.x - dx
            && self.y >= other.y - dy
            && self.right() <= other.right() + dx
            && self.bottom() <= other.bottom() + dy
    }
}
