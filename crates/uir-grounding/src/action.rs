//! Grounded UI action vocabulary
//!
//! Nine action kinds. Coordinates are integer screen pixels once a
//! [`GroundedAction`] leaves the translator.

use crate::error::TranslateError;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Screen point in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Point {
    /// Horizontal offset from the left edge
    pub x: u32,
    /// Vertical offset from the top edge
    pub y: u32,
}

impl Point {
    /// Create a point
    #[inline]
    #[must_use]
    pub const fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }
}

impl std::fmt::Display for Point {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Scroll direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScrollDirection {
    /// Towards the top
    Up,
    /// Towards the bottom
    Down,
    /// Towards the left edge
    Left,
    /// Towards the right edge
    Right,
}

impl ScrollDirection {
    /// Lowercase name
    #[inline]
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Up => "up",
            Self::Down => "down",
            Self::Left => "left",
            Self::Right => "right",
        }
    }
}

impl FromStr for ScrollDirection {
    type Err = TranslateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "up" => Ok(Self::Up),
            "down" => Ok(Self::Down),
            "left" => Ok(Self::Left),
            "right" => Ok(Self::Right),
            other => Err(TranslateError::UnknownDirection(other.to_string())),
        }
    }
}

/// Payload-free action discriminant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    /// Left click
    Click,
    /// Left double click
    DoubleClick,
    /// Right click
    RightClick,
    /// Press, move, release
    Drag,
    /// Key combination
    Hotkey,
    /// Text entry
    Type,
    /// Wheel scroll
    Scroll,
    /// Pause for the UI to settle
    Wait,
    /// Sentinel: nothing left to do
    Finished,
}

impl ActionKind {
    /// Snake-case name
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Click => "click",
            Self::DoubleClick => "double_click",
            Self::RightClick => "right_click",
            Self::Drag => "drag",
            Self::Hotkey => "hotkey",
            Self::Type => "type",
            Self::Scroll => "scroll",
            Self::Wait => "wait",
            Self::Finished => "finished",
        }
    }
}

impl std::fmt::Display for ActionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A concrete UI action with its payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum UiAction {
    /// Left click at a point
    Click {
        /// Target
        point: Point,
    },
    /// Double click at a point
    DoubleClick {
        /// Target
        point: Point,
    },
    /// Right click at a point
    RightClick {
        /// Target
        point: Point,
    },
    /// Drag between two points
    Drag {
        /// Press position
        start: Point,
        /// Release position
        end: Point,
    },
    /// Press up to three keys together
    Hotkey {
        /// Lowercase key names
        keys: Vec<String>,
    },
    /// Type text at the focused element
    Type {
        /// Text to enter
        content: String,
    },
    /// Scroll at a point
    Scroll {
        /// Pointer position
        point: Point,
        /// Direction
        direction: ScrollDirection,
    },
    /// Do nothing for a while
    Wait,
    /// Stop the loop
    Finished {
        /// Closing remark from the model
        content: String,
    },
}

impl UiAction {
    /// Discriminant
    #[must_use]
    pub fn kind(&self) -> ActionKind {
        match self {
            Self::Click { .. } => ActionKind::Click,
            Self::DoubleClick { .. } => ActionKind::DoubleClick,
            Self::RightClick { .. } => ActionKind::RightClick,
            Self::Drag { .. } => ActionKind::Drag,
            Self::Hotkey { .. } => ActionKind::Hotkey,
            Self::Type { .. } => ActionKind::Type,
            Self::Scroll { .. } => ActionKind::Scroll,
            Self::Wait => ActionKind::Wait,
            Self::Finished { .. } => ActionKind::Finished,
        }
    }

    /// Whether this is the `finished` sentinel
    #[inline]
    #[must_use]
    pub fn is_sentinel(&self) -> bool {
        matches!(self, Self::Finished { .. })
    }

    /// Whether the action is expected to alter the screen unless told otherwise
    #[inline]
    #[must_use]
    pub fn changes_ui_by_default(&self) -> bool {
        !matches!(self, Self::Wait | Self::Finished { .. })
    }
}

impl std::fmt::Display for UiAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Click { point } | Self::DoubleClick { point } | Self::RightClick { point } => {
                write!(f, "{} {point}", self.kind())
            }
            Self::Drag { start, end } => write!(f, "drag {start} -> {end}"),
            Self::Hotkey { keys } => write!(f, "hotkey {}", keys.join("+")),
            Self::Type { content } => write!(f, "type {content:?}"),
            Self::Scroll { point, direction } => {
                write!(f, "scroll {} at {point}", direction.as_str())
            }
            Self::Wait => f.write_str("wait"),
            Self::Finished { content } => write!(f, "finished {content:?}"),
        }
    }
}

/// Action produced by the translator, ready for dispatch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroundedAction {
    /// What to do
    pub action: UiAction,
    /// Whether the screen should look different afterwards
    pub expect_change: bool,
    /// Model reasoning that preceded the action, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thought: Option<String>,
}

impl GroundedAction {
    /// Wrap an action with its default change expectation
    #[must_use]
    pub fn new(action: UiAction) -> Self {
        let expect_change = action.changes_ui_by_default();
        Self {
            action,
            expect_change,
            thought: None,
        }
    }

    /// With model reasoning
    #[inline]
    #[must_use]
    pub fn with_thought(mut self, thought: impl Into<String>) -> Self {
        self.thought = Some(thought.into());
        self
    }

    /// Override the change expectation. `wait` and `finished` never expect a change.
    #[inline]
    #[must_use]
    pub fn with_expect_change(mut self, expect_change: bool) -> Self {
        self.expect_change = expect_change && self.action.changes_ui_by_default();
        self
    }

    /// Discriminant
    #[inline]
    #[must_use]
    pub fn kind(&self) -> ActionKind {
        self.action.kind()
    }

    /// Whether this is the `finished` sentinel
    #[inline]
    #[must_use]
    pub fn is_sentinel(&self) -> bool {
        self.action.is_sentinel()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_expectations() {
        assert!(GroundedAction::new(UiAction::Click { point: Point::new(1, 2) }).expect_change);
        assert!(!GroundedAction::new(UiAction::Wait).expect_change);
        assert!(!GroundedAction::new(UiAction::Wait).with_expect_change(true).expect_change);
        assert!(
            !GroundedAction::new(UiAction::Type { content: "x".into() })
                .with_expect_change(false)
                .expect_change
        );
    }

    #[test]
    fn direction_parsing() {
        assert_eq!("Down".parse::<ScrollDirection>(), Ok(ScrollDirection::Down));
        assert!(matches!(
            "sideways".parse::<ScrollDirection>(),
            Err(TranslateError::UnknownDirection(_))
        ));
    }

    #[test]
    fn display_is_readable() {
        let action = UiAction::Hotkey { keys: vec!["ctrl".into(), "c".into()] };
        assert_eq!(action.to_string(), "hotkey ctrl+c");
        assert_eq!(UiAction::Wait.kind().as_str(), "wait");
    }
}
