//! Testing utilities for the UIR workspace
//!
//! Shared test doubles, fixtures and helpers:
//! - [`ScriptedOracle`]: replays canned completions
//! - [`SimulatedDesktop`]: screen source and input backend in one
//! - Response builders in the grounding dialect and planner JSON

#![allow(missing_docs)]

use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use uir_core::{Collaborators, FailureContext, RecoveryConfig};
use uir_grounding::{
    BackendError, CompletionOracle, Conversation, GuiBackend, MouseButton, OracleError, Point,
    ScrollDirection,
};
use uir_vision::{CaptureError, ScreenSource, Screenshot};

pub const SCREEN_WIDTH: u32 = 320;
pub const SCREEN_HEIGHT: u32 = 180;

/// Oracle replaying a fixed script of completions
#[derive(Debug, Default)]
pub struct ScriptedOracle {
    script: Mutex<VecDeque<Result<String, OracleError>>>,
    fallback: Option<String>,
    conversations: Mutex<Vec<Conversation>>,
}

impl ScriptedOracle {
    pub fn new<I, S>(responses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::from_results(responses.into_iter().map(|r| Ok(r.into())))
    }

    pub fn from_results(responses: impl IntoIterator<Item = Result<String, OracleError>>) -> Self {
        Self {
            script: Mutex::new(responses.into_iter().collect()),
            fallback: None,
            conversations: Mutex::new(Vec::new()),
        }
    }

    /// Answer every call with `text`
    pub fn repeating(text: impl Into<String>) -> Self {
        Self {
            fallback: Some(text.into()),
            ..Self::default()
        }
    }

    pub fn call_count(&self) -> usize {
        self.conversations.lock().len()
    }

    /// Conversations as seen at each call
    pub fn conversations(&self) -> Vec<Conversation> {
        self.conversations.lock().clone()
    }
}

#[async_trait::async_trait]
impl CompletionOracle for ScriptedOracle {
    async fn complete(&self, conversation: &Conversation) -> Result<String, OracleError> {
        self.conversations.lock().push(conversation.clone());
        if let Some(next) = self.script.lock().pop_front() {
            return next;
        }
        match &self.fallback {
            Some(text) => Ok(text.clone()),
            None => Err(OracleError::Unavailable("script exhausted".to_string())),
        }
    }
}

/// Input received by a [`SimulatedDesktop`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordedInput {
    Click {
        at: Point,
        button: MouseButton,
        clicks: u8,
    },
    Drag {
        from: Point,
        to: Point,
    },
    Hotkey(Vec<String>),
    Type(String),
    Scroll {
        at: Point,
        direction: ScrollDirection,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Behaviour {
    Responsive,
    Frozen,
    Disconnected,
}

/// Desktop double: every accepted input redraws the screen unless frozen
#[derive(Debug)]
pub struct SimulatedDesktop {
    behaviour: Behaviour,
    frame: AtomicUsize,
    captures: AtomicUsize,
    capture_fails: AtomicBool,
    inputs: Mutex<Vec<RecordedInput>>,
}

impl SimulatedDesktop {
    fn with_behaviour(behaviour: Behaviour) -> Self {
        Self {
            behaviour,
            frame: AtomicUsize::new(0),
            captures: AtomicUsize::new(0),
            capture_fails: AtomicBool::new(false),
            inputs: Mutex::new(Vec::new()),
        }
    }

    /// Screen changes after every input
    pub fn responsive() -> Self {
        Self::with_behaviour(Behaviour::Responsive)
    }

    /// Inputs are accepted but the screen never changes
    pub fn frozen() -> Self {
        Self::with_behaviour(Behaviour::Frozen)
    }

    /// Every input fails with a disconnect
    pub fn disconnected() -> Self {
        Self::with_behaviour(Behaviour::Disconnected)
    }

    /// Make subsequent captures fail
    pub fn fail_captures(&self) {
        self.capture_fails.store(true, Ordering::SeqCst);
    }

    pub fn inputs(&self) -> Vec<RecordedInput> {
        self.inputs.lock().clone()
    }

    pub fn capture_count(&self) -> usize {
        self.captures.load(Ordering::SeqCst)
    }

    pub fn frame(&self) -> usize {
        self.frame.load(Ordering::SeqCst)
    }

    fn accept(&self, input: RecordedInput) -> Result<(), BackendError> {
        if self.behaviour == Behaviour::Disconnected {
            return Err(BackendError::Disconnected("simulated desktop offline".to_string()));
        }
        self.inputs.lock().push(input);
        if self.behaviour == Behaviour::Responsive {
            self.frame.fetch_add(1, Ordering::SeqCst);
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl ScreenSource for SimulatedDesktop {
    async fn capture(&self) -> Result<Screenshot, CaptureError> {
        self.captures.fetch_add(1, Ordering::SeqCst);
        if self.capture_fails.load(Ordering::SeqCst) {
            return Err(CaptureError::Unavailable("display lost".to_string()));
        }
        Screenshot::new(frame_png(self.frame()))
    }
}

#[async_trait::async_trait]
impl GuiBackend for SimulatedDesktop {
    async fn click(&self, at: Point, button: MouseButton, clicks: u8) -> Result<(), BackendError> {
        self.accept(RecordedInput::Click { at, button, clicks })
    }

    async fn drag(&self, from: Point, to: Point) -> Result<(), BackendError> {
        self.accept(RecordedInput::Drag { from, to })
    }

    async fn hotkey(&self, keys: &[String]) -> Result<(), BackendError> {
        self.accept(RecordedInput::Hotkey(keys.to_vec()))
    }

    async fn type_text(&self, text: &str) -> Result<(), BackendError> {
        self.accept(RecordedInput::Type(text.to_string()))
    }

    async fn scroll(&self, at: Point, direction: ScrollDirection) -> Result<(), BackendError> {
        self.accept(RecordedInput::Scroll { at, direction })
    }
}

fn encode(image: &RgbImage) -> Vec<u8> {
    let mut bytes = std::io::Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(image.clone())
        .write_to(&mut bytes, ImageFormat::Png)
        .unwrap();
    bytes.into_inner()
}

/// Frame `n` of the simulated desktop; consecutive frames are inverted checkerboards
pub fn frame_png(n: usize) -> Vec<u8> {
    let shade = u8::try_from(n % 40).unwrap() * 2;
    let invert = n % 2 == 1;
    encode(&RgbImage::from_fn(SCREEN_WIDTH, SCREEN_HEIGHT, |x, y| {
        let dark = ((x / 10) + (y / 10)) % 2 == 0;
        if dark != invert {
            Rgb([20 + shade, 20, 30])
        } else {
            Rgb([235, 235 - shade, 220])
        }
    }))
}

pub fn solid_png(width: u32, height: u32, value: u8) -> Vec<u8> {
    encode(&RgbImage::from_pixel(width, height, Rgb([value, value, value])))
}

pub fn checkerboard_png(width: u32, height: u32, cell: u32) -> Vec<u8> {
    let cell = cell.max(1);
    encode(&RgbImage::from_fn(width, height, |x, y| {
        if ((x / cell) + (y / cell)) % 2 == 0 {
            Rgb([15, 15, 15])
        } else {
            Rgb([240, 240, 240])
        }
    }))
}

pub fn screenshot(bytes: Vec<u8>) -> Screenshot {
    Screenshot::new(bytes).unwrap()
}

/// Grounding-dialect click in reference coordinates
pub fn click_response(x: u32, y: u32) -> String {
    format!("Thought: click at ({x}, {y})\nAction: click(point='<point>{x} {y}</point>')")
}

pub fn finished_response(content: &str) -> String {
    format!("Thought: the step is complete\nAction: finished(content='{content}')")
}

pub fn wait_response() -> String {
    "Thought: the page is still loading\nAction: wait()".to_string()
}

/// Planner JSON for `steps`
pub fn plan_response(steps: &[&str]) -> String {
    json!({
        "reasoning": {
            "failure_analysis": "Submit button was not clickable",
            "ui_state": "Login form with empty password field",
            "recovery_approach": "Fill the form and submit again",
            "challenges": "none"
        },
        "steps": steps,
    })
    .to_string()
}

/// Login failure as raw tool arguments
pub fn login_failure_value() -> Value {
    json!({
        "task": "Log in to the portal and download the monthly report",
        "action_history": ["open browser", "navigate login"],
        "failed_activity": {"name": "click submit", "target": "Submit button"},
        "future_activities": [{"name": "download report"}],
        "variables": {"username": "robot"}
    })
}

pub fn login_failure() -> FailureContext {
    FailureContext::from_value(&login_failure_value()).unwrap()
}

/// Defaults with no settle or wait delays
pub fn fast_config() -> RecoveryConfig {
    RecoveryConfig::default().with_delays(Duration::ZERO, Duration::ZERO)
}

pub fn collaborators(
    planner: Arc<ScriptedOracle>,
    grounder: Arc<ScriptedOracle>,
    desktop: Arc<SimulatedDesktop>,
) -> Collaborators {
    Collaborators::new(planner, grounder, desktop.clone(), desktop)
}
