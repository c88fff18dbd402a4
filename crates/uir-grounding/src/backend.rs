//! GUI automation backend and the fixed dispatch table
//!
//! Actions are never rendered to code and evaluated. Each [`UiAction`]
//! variant maps to exactly one backend primitive.

use crate::action::{Point, ScrollDirection, UiAction};
use crate::error::BackendError;
use std::time::Duration;

/// Mouse button
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MouseButton {
    /// Primary button
    Left,
    /// Secondary button
    Right,
}

/// Low-level input injection against the live desktop
#[async_trait::async_trait]
pub trait GuiBackend: Send + Sync {
    /// Click `clicks` times with `button` at `at`
    async fn click(&self, at: Point, button: MouseButton, clicks: u8) -> Result<(), BackendError>;

    /// Press at `from`, move to `to`, release
    async fn drag(&self, from: Point, to: Point) -> Result<(), BackendError>;

    /// Press `keys` together
    async fn hotkey(&self, keys: &[String]) -> Result<(), BackendError>;

    /// Type `text` into the focused element
    async fn type_text(&self, text: &str) -> Result<(), BackendError>;

    /// Scroll once in `direction` with the pointer at `at`
    async fn scroll(&self, at: Point, direction: ScrollDirection) -> Result<(), BackendError>;
}

/// Execute `action` through the matching backend primitive.
///
/// `wait` sleeps for `wait_for` without touching the backend; `finished`
/// is a no-op.
///
/// # Errors
/// The backend's error for the primitive.
pub async fn dispatch(
    backend: &dyn GuiBackend,
    action: &UiAction,
    wait_for: Duration,
) -> Result<(), BackendError> {
    tracing::debug!(%action, "dispatching");
    match action {
        UiAction::Click { point } => backend.click(*point, MouseButton::Left, 1).await,
        UiAction::DoubleClick { point } => backend.click(*point, MouseButton::Left, 2).await,
        UiAction::RightClick { point } => backend.click(*point, MouseButton::Right, 1).await,
        UiAction::Drag { start, end } => backend.drag(*start, *end).await,
        UiAction::Hotkey { keys } => backend.hotkey(keys).await,
        UiAction::Type { content } => backend.type_text(content).await,
        UiAction::Scroll { point, direction } => backend.scroll(*point, *direction).await,
        UiAction::Wait => {
            tokio::time::sleep(wait_for).await;
            Ok(())
        }
        UiAction::Finished { .. } => Ok(()),
    }
}
