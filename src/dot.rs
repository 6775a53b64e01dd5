// src/dot.rs
//
// Trigger points on the platter.

/// Most dots a platter holds. The engine's buffers are sized for this many
/// up front; further adds are refused.
pub const MAX_DOTS: usize = 128;

/// Opaque ARGB color tag carried for the display layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color(pub u32);

impl Color {
    pub const ORANGE: Color = Color(0xffff_6b35);

    #[inline]
    pub fn argb(self) -> u32 {
        self.0
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::ORANGE
    }
}

/// Wrap an angle in degrees into `[0, 360)`.
#[inline]
pub fn wrap_degrees(angle: f64) -> f64 {
    let wrapped = angle.rem_euclid(360.0);
    // rem_euclid rounds tiny negative inputs up to exactly 360.0
    if wrapped >= 360.0 { 0.0 } else { wrapped }
}

#[inline]
fn wrap_dot_angle(angle: f32) -> f32 {
    let wrapped = wrap_degrees(angle as f64) as f32;
    if wrapped >= 360.0 { 0.0 } else { wrapped }
}

/// A trigger point at an angle on a ring.
#[derive(Debug, Clone, PartialEq)]
pub struct Dot {
    /// Position on the platter in degrees, `[0, 360)`.
    pub angle: f32,

    /// Ring index; resolved to a note through the scale.
    pub ring: i32,

    pub color: Color,

    pub active: bool,

    /// Already handled during the current sweep.
    fired: bool,
}

impl Dot {
    pub fn new(angle: f32, ring: i32, color: Color) -> Self {
        Self {
            angle: wrap_dot_angle(angle),
            ring,
            color,
            active: true,
            fired: false,
        }
    }

    /// Move the dot, wrapping the angle into `[0, 360)`.
    #[inline]
    pub fn set_angle(&mut self, angle: f32) {
        self.angle = wrap_dot_angle(angle);
    }

    /// Whether this dot already fired (or was skipped) in the current sweep.
    #[inline]
    pub fn fired_this_sweep(&self) -> bool {
        self.fired
    }
}

/// Ordered dot sequence owned by the engine.
///
/// Indices are stable between edits and shared with the UI mirror. Each
/// dot carries its own sweep flag, so add/remove/clear never needs a
/// parallel container to be resized.
///
/// The set never grows past the capacity it was created with, so edits
/// made on the audio thread do not allocate.
#[derive(Debug, Clone)]
pub struct DotSet {
    dots: Vec<Dot>,
    capacity: usize,
}

impl Default for DotSet {
    fn default() -> Self {
        Self::with_capacity(MAX_DOTS)
    }
}

impl DotSet {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            dots: Vec::with_capacity(capacity),
            capacity,
        }
    }

    /// Most dots this set will hold.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.dots.len() >= self.capacity
    }

    /// Append a dot and return its index, or `None` when the set is full.
    pub fn add(&mut self, dot: Dot) -> Option<usize> {
        if self.is_full() {
            return None;
        }
        self.dots.push(dot);
        Some(self.dots.len() - 1)
    }

    /// Remove the dot at `index`. Out-of-range indices are ignored.
    pub fn remove(&mut self, index: usize) -> Option<Dot> {
        (index < self.dots.len()).then(|| self.dots.remove(index))
    }

    pub fn clear(&mut self) {
        self.dots.clear();
    }

    /// Replace the whole sequence, keeping the existing allocation. Dots
    /// beyond the capacity are left out.
    pub fn replace_all(&mut self, dots: &[Dot]) {
        self.dots.clear();
        self.dots.extend(dots.iter().take(self.capacity).cloned());
        self.reset_sweep();
    }

    /// Move a dot in place (drag). The sweep flag is kept.
    pub fn move_dot(&mut self, index: usize, angle: f32, ring: i32) -> bool {
        match self.dots.get_mut(index) {
            Some(dot) => {
                dot.set_angle(angle);
                dot.ring = ring;
                true
            }
            None => false,
        }
    }

    pub fn set_active(&mut self, index: usize, active: bool) -> bool {
        match self.dots.get_mut(index) {
            Some(dot) => {
                dot.active = active;
                true
            }
            None => false,
        }
    }

    /// Start a fresh sweep: every dot may trigger again.
    pub fn reset_sweep(&mut self) {
        for dot in &mut self.dots {
            dot.fired = false;
        }
    }

    #[inline]
    pub fn mark_fired(&mut self, index: usize) {
        if let Some(dot) = self.dots.get_mut(index) {
            dot.fired = true;
        }
    }

    #[inline]
    pub fn get(&self, index: usize) -> Option<&Dot> {
        self.dots.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Dot> {
        self.dots.iter()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.dots.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.dots.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrap_degrees() {
        assert_eq!(wrap_degrees(0.0), 0.0);
        assert_eq!(wrap_degrees(360.0), 0.0);
        assert_eq!(wrap_degrees(370.0), 10.0);
        assert_eq!(wrap_degrees(-10.0), 350.0);
        assert_eq!(wrap_degrees(-1e-18), 0.0);
        assert!(wrap_degrees(-1e-9) < 360.0);
    }

    #[test]
    fn test_add_remove_keeps_flags_with_dots() {
        let mut dots = DotSet::default();
        dots.add(Dot::new(0.0, 0, Color::ORANGE));
        dots.add(Dot::new(90.0, 1, Color::ORANGE));
        dots.add(Dot::new(180.0, 2, Color::ORANGE));

        dots.mark_fired(2);
        assert!(dots.remove(0).is_some());

        assert_eq!(dots.len(), 2);
        assert!(!dots.get(0).unwrap().fired_this_sweep());
        assert!(dots.get(1).unwrap().fired_this_sweep());
        assert_eq!(dots.get(1).unwrap().angle, 180.0);

        assert!(dots.remove(5).is_none());
    }

    #[test]
    fn test_reset_sweep_clears_every_flag() {
        let mut dots = DotSet::default();
        for i in 0..4 {
            dots.add(Dot::new(i as f32 * 90.0, i, Color::ORANGE));
            dots.mark_fired(i as usize);
        }
        dots.reset_sweep();
        assert!(dots.iter().all(|d| !d.fired_this_sweep()));
    }

    #[test]
    fn test_move_normalizes_angle() {
        let mut dots = DotSet::default();
        dots.add(Dot::new(10.0, 0, Color::ORANGE));
        assert!(dots.move_dot(0, -30.0, 3));
        assert_eq!(dots.get(0).unwrap().angle, 330.0);
        assert_eq!(dots.get(0).unwrap().ring, 3);
        assert!(!dots.move_dot(1, 0.0, 0));
    }

    #[test]
    fn test_capacity_is_a_hard_limit() {
        let mut dots = DotSet::with_capacity(4);
        let buffer = dots.dots.as_ptr();
        for i in 0..10 {
            let added = dots.add(Dot::new(i as f32, 0, Color::ORANGE));
            assert_eq!(added, (i < 4).then_some(i));
        }
        assert_eq!(dots.len(), 4);
        assert!(dots.is_full());

        let many: Vec<_> = (0..9).map(|i| Dot::new(i as f32 * 10.0, 1, Color::ORANGE)).collect();
        dots.replace_all(&many);
        assert_eq!(dots.len(), 4);
        assert_eq!(dots.get(3).unwrap().angle, 30.0);
        assert_eq!(dots.dots.as_ptr(), buffer);
    }
}
