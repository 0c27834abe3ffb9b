//! Axis-aligned bounding boxes with edge-triggered contact notification.
//!
//! A [`Collider`] latches whether it is currently overlapping and only reports
//! (and notifies its hooks) when that latch flips.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Hook invoked with the collider's name on a contact transition
pub type ContactHook = Arc<dyn Fn(&str) + Send + Sync>;

/// Axis-aligned rectangle in world units
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    #[inline]
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self { x, y, width, height }
    }

    #[inline]
    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    #[inline]
    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    /// Half-open overlap test on both axes (touching edges do not overlap)
    #[inline]
    pub fn intersects(&self, other: &Rect) -> bool {
        self.x < other.right()
            && self.right() > other.x
            && self.y < other.bottom()
            && self.bottom() > other.y
    }
}

/// Change of the overlap latch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Entered,
    Left,
}

/// Result of a single overlap test
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Contact {
    /// Whether the rectangles overlap right now
    pub overlapping: bool,
    /// Set only when this test flipped the latch
    pub transition: Option<Transition>,
}

impl Contact {
    pub fn entered(&self) -> bool {
        self.transition == Some(Transition::Entered)
    }

    pub fn left(&self) -> bool {
        self.transition == Some(Transition::Left)
    }
}

/// Named bounding box with an overlap latch
#[derive(Clone)]
pub struct Collider {
    pub bounds: Rect,
    name: String,
    colliding: bool,
    on_enter: Option<ContactHook>,
    on_leave: Option<ContactHook>,
}

impl Collider {
    pub fn new(name: impl Into<String>, bounds: Rect) -> Self {
        Self {
            bounds,
            name: name.into(),
            colliding: false,
            on_enter: None,
            on_leave: None,
        }
    }

    pub fn with_on_enter(mut self, hook: ContactHook) -> Self {
        self.on_enter = Some(hook);
        self
    }

    pub fn with_on_leave(mut self, hook: ContactHook) -> Self {
        self.on_leave = Some(hook);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the last test reported an overlap
    pub fn is_colliding(&self) -> bool {
        self.colliding
    }

    #[inline]
    pub fn set_position(&mut self, x: f32, y: f32) {
        self.bounds.x = x;
        self.bounds.y = y;
    }

    /// Test against another collider, updating the latch.
    ///
    /// Hooks fire at most once per transition; repeated calls in the same
    /// state report no transition.
    pub fn overlaps(&mut self, other: &Collider) -> Contact {
        let overlapping = self.bounds.intersects(&other.bounds);

        let transition = match (self.colliding, overlapping) {
            (false, true) => {
                if let Some(hook) = &self.on_enter {
                    hook(&self.name);
                }
                Some(Transition::Entered)
            }
            (true, false) => {
                if let Some(hook) = &self.on_leave {
                    hook(&self.name);
                }
                Some(Transition::Left)
            }
            _ => None,
        };

        self.colliding = overlapping;
        Contact {
            overlapping,
            transition,
        }
    }
}

impl fmt::Debug for Collider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Collider")
            .field("name", &self.name)
            .field("bounds", &self.bounds)
            .field("colliding", &self.colliding)
            .field("on_enter", &self.on_enter.is_some())
            .field("on_leave", &self.on_leave.is_some())
            .finish()
    }
}
