use std::ops::{BitAnd, BitAndAssign, BitOr, BitOrAssign, Not};

/// Set of pending changes that require a new frame.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Event(u32);

impl Event {
    pub const NONE: Self = Self(0);

    // External changes
    pub const RESIZE: Self = Self(1 << 0);
    pub const POINTS_CHANGE: Self = Self(1 << 1);
    pub const PROPERTIES_CHANGE: Self = Self(1 << 2);
    pub const ANNOTATIONS_CHANGE: Self = Self(1 << 3);
    pub const REDRAW: Self = Self(1 << 4);

    // Property changes
    pub const ENCODING_CHANGE: Self = Self(1 << 8);
    pub const CONNECTION_STYLE_CHANGE: Self = Self(1 << 9);
    pub const CONNECTIONS_TOGGLE: Self = Self(1 << 10);
    pub const SELECTION_TYPE_CHANGE: Self = Self(1 << 11);
    pub const CAMERA_CONFIG_CHANGE: Self = Self(1 << 12);
    pub const SCALE_CHANGE: Self = Self(1 << 13);
    pub const ANNOTATION_STYLE_CHANGE: Self = Self(1 << 14);

    // Internal changes
    pub const SELECTION_CHANGE: Self = Self(1 << 16);
    pub const HOVER_CHANGE: Self = Self(1 << 17);
    pub const FILTER_CHANGE: Self = Self(1 << 18);
    pub const CONNECTIONS_CHANGE: Self = Self(1 << 19);
    pub const OUTLINE_CHANGE: Self = Self(1 << 20);
    pub const VIEW_CHANGE: Self = Self(1 << 21);
    pub const POINTER_CHANGE: Self = Self(1 << 22);

    pub fn is_empty(&self) -> bool {
        *self == Self::NONE
    }

    pub fn has_events(&self) -> bool {
        *self != Self::NONE
    }

    pub fn clear(&mut self) -> Self {
        std::mem::take(self)
    }

    pub fn signal(&mut self, event: Self) {
        *self |= event;
    }

    pub fn signaled(&self, event: Self) -> bool {
        (*self & event).has_events()
    }

    pub fn signaled_any(&self, events: &[Self]) -> bool {
        events.iter().any(|&e| self.signaled(e))
    }
}

impl BitAnd for Event {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self::Output {
        Self(self.0 & rhs.0)
    }
}

impl BitAndAssign for Event {
    fn bitand_assign(&mut self, rhs: Self) {
        self.0 &= rhs.0;
    }
}

impl BitOr for Event {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self::Output {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for Event {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl Not for Event {
    type Output = Self;

    fn not(self) -> Self::Output {
        Self(!self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signal_and_clear() {
        let mut events = Event::NONE;
        assert!(events.is_empty());

        events.signal(Event::HOVER_CHANGE);
        events.signal(Event::VIEW_CHANGE);
        assert!(events.signaled(Event::HOVER_CHANGE));
        assert!(!events.signaled(Event::FILTER_CHANGE));
        assert!(events.signaled_any(&[Event::FILTER_CHANGE, Event::VIEW_CHANGE]));

        let taken = events.clear();
        assert!(events.is_empty());
        assert_eq!(taken, Event::HOVER_CHANGE | Event::VIEW_CHANGE);
        assert_eq!(taken & !Event::VIEW_CHANGE, Event::HOVER_CHANGE);
    }
}
