use crate::magnifier::geometry::{Point, ScreenMetrics};

const VK_LEFT: u32 = 0x25;
const VK_UP: u32 = 0x26;
const VK_RIGHT: u32 = 0x27;
const VK_DOWN: u32 = 0x28;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Left,
    Right,
    Up,
    Down,
}

impl Direction {
    pub fn from_virtual_key(vk_code: u32) -> Option<Self> {
        match vk_code {
            VK_LEFT => Some(Self::Left),
            VK_RIGHT => Some(Self::Right),
            VK_UP => Some(Self::Up),
            VK_DOWN => Some(Self::Down),
            _ => None,
        }
    }

    /// Offset change for one press of `step` pixels.
    pub fn delta(self, step: i32) -> Point {
        match self {
            Self::Left => Point::new(-step, 0),
            Self::Right => Point::new(step, 0),
            Self::Up => Point::new(0, -step),
            Self::Down => Point::new(0, step),
        }
    }
}

/// Everything the viewport reacts to, in the order it was observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewportEvent {
    PointerDown(Point),
    PointerUp,
    /// Signed wheel delta, positive away from the user.
    Wheel(i16),
    KeyDown(Direction),
    PointerMove(Point),
    TimerTick,
    ScreenChanged(ScreenMetrics),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arrow_keys_map_to_directions() {
        assert_eq!(Direction::from_virtual_key(0x25), Some(Direction::Left));
        assert_eq!(Direction::from_virtual_key(0x26), Some(Direction::Up));
        assert_eq!(Direction::from_virtual_key(0x27), Some(Direction::Right));
        assert_eq!(Direction::from_virtual_key(0x28), Some(Direction::Down));
        assert_eq!(Direction::from_virtual_key(0x41), None);
    }

    #[test]
    fn up_and_left_are_negative() {
        assert_eq!(Direction::Left.delta(5), Point::new(-5, 0));
        assert_eq!(Direction::Up.delta(5), Point::new(0, -5));
        assert_eq!(Direction::Down.delta(5), Point::new(0, 5));
    }
}
