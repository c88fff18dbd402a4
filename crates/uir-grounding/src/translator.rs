//! Action Translator
//!
//! Parses grounding-model output of the form
//!
//! ```text
//! Thought: The submit button is greyed out, the password field is empty.
//! Action: click(point='<point>960 540</point>')
//! ```
//!
//! into a [`GroundedAction`]. Coordinates arrive in a reference space
//! (1920x1080 by default) and are rescaled to the actual screen.
//!
//! Accepted point syntaxes: `<point>x y</point>`, `(x,y)`, `[x1,y1,x2,y2]`
//! (box centre), optionally wrapped in `<|box_start|>`/`<|box_end|>`.

use crate::action::{GroundedAction, Point, ScrollDirection, UiAction};
use crate::error::TranslateError;
use once_cell::sync::Lazy;
use regex::Regex;
use uir_vision::Resolution;

static THOUGHT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)(?:Thought|Reflection):\s*(.*?)\s*(?:Action:|\z)").unwrap()
});
static ACTION_LINE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^\s*Action:").unwrap());
static CALL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"([A-Za-z_]+)\s*\(").unwrap());
static NUMBER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"-?\d+(?:\.\d+)?").unwrap());

/// Maximum keys in one hotkey
pub const MAX_HOTKEY_KEYS: usize = 3;

/// Default reference resolution of model coordinates
pub const DEFAULT_REFERENCE: Resolution = Resolution::new(1920, 1080);

/// Turns model text into typed actions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActionTranslator {
    reference: Resolution,
}

impl Default for ActionTranslator {
    fn default() -> Self {
        Self::new(DEFAULT_REFERENCE)
    }
}

impl ActionTranslator {
    /// Create a translator for the given reference space
    #[inline]
    #[must_use]
    pub fn new(reference: Resolution) -> Self {
        Self { reference }
    }

    /// Reference resolution of incoming coordinates
    #[inline]
    #[must_use]
    pub fn reference(&self) -> Resolution {
        self.reference
    }

    /// Parse `text` and rescale its coordinates to `screen`
    ///
    /// # Errors
    /// Any [`TranslateError`]; malformed or unknown actions never panic.
    pub fn translate(&self, text: &str, screen: Resolution) -> Result<GroundedAction, TranslateError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(TranslateError::Empty);
        }

        let thought = THOUGHT_RE
            .captures(text)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().trim().to_string())
            .filter(|t| !t.is_empty());

        // First marker that starts a line; quoted arguments are never scanned.
        let action_text = ACTION_LINE_RE
            .find(text)
            .map(|m| m.end())
            .or_else(|| text.find("Action:").map(|idx| idx + "Action:".len()))
            .map_or(text, |start| &text[start..])
            .trim();

        let call = CALL_RE.captures(action_text).ok_or(TranslateError::NoAction)?;
        let (name, open) = match (call.get(1), call.get(0)) {
            (Some(name), Some(whole)) => (name.as_str().to_ascii_lowercase(), whole.end()),
            _ => return Err(TranslateError::NoAction),
        };
        let args = parse_arguments(&action_text[open..])?;

        let action = self.build(&name, &args, screen)?;
        let mut grounded = GroundedAction::new(action);
        grounded.thought = thought;
        Ok(grounded)
    }

    fn build(&self, name: &str, args: &Arguments, screen: Resolution) -> Result<UiAction, TranslateError> {
        let point = |action| self.point_arg(action, args, &["point", "start_box"], screen);
        match name {
            "click" | "left_single" => Ok(UiAction::Click { point: point("click")? }),
            "left_double" | "double_click" => Ok(UiAction::DoubleClick {
                point: point("left_double")?,
            }),
            "right_single" | "right_click" => Ok(UiAction::RightClick {
                point: point("right_single")?,
            }),
            "drag" | "select" => Ok(UiAction::Drag {
                start: self.point_arg("drag", args, &["start_point", "start_box"], screen)?,
                end: self.point_arg("drag", args, &["end_point", "end_box"], screen)?,
            }),
            "hotkey" | "press" | "keydown" => {
                let raw = args
                    .get_any(&["key", "keys", "hotkey"])
                    .ok_or(TranslateError::MissingArgument {
                        action: "hotkey",
                        argument: "key",
                    })?;
                Ok(UiAction::Hotkey { keys: parse_keys(raw)? })
            }
            "type" => {
                let content = args.get("content").ok_or(TranslateError::MissingArgument {
                    action: "type",
                    argument: "content",
                })?;
                Ok(UiAction::Type {
                    content: content.to_string(),
                })
            }
            "scroll" => {
                let direction: ScrollDirection = args
                    .get("direction")
                    .ok_or(TranslateError::MissingArgument {
                        action: "scroll",
                        argument: "direction",
                    })?
                    .parse()?;
                Ok(UiAction::Scroll {
                    point: point("scroll")?,
                    direction,
                })
            }
            "wait" => Ok(UiAction::Wait),
            "finished" | "finish" | "done" => Ok(UiAction::Finished {
                content: args.get("content").unwrap_or_default().to_string(),
            }),
            other => Err(TranslateError::UnknownAction(other.to_string())),
        }
    }

    fn point_arg(
        &self,
        action: &'static str,
        args: &Arguments,
        names: &[&'static str],
        screen: Resolution,
    ) -> Result<Point, TranslateError> {
        let (name, raw) = names
            .iter()
            .find_map(|n| args.get(n).map(|v| (*n, v)))
            .ok_or(TranslateError::MissingArgument {
                action,
                argument: names[0],
            })?;
        let (x, y) = parse_reference_point(name, raw)?;
        self.rescale(x, y, screen)
    }

    fn rescale(&self, x: f64, y: f64, screen: Resolution) -> Result<Point, TranslateError> {
        let space = self.reference;
        let width = f64::from(space.width);
        let height = f64::from(space.height);
        if space.is_empty() || !(0.0..=width).contains(&x) || !(0.0..=height).contains(&y) {
            return Err(TranslateError::OutOfBounds { x, y, space });
        }
        let to_pixels = |value: f64, reference: f64, actual: u32| -> u32 {
            let max = f64::from(actual.saturating_sub(1));
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let scaled = (value * f64::from(actual) / reference).round().clamp(0.0, max) as u32;
            scaled
        };
        Ok(Point::new(
            to_pixels(x, width, screen.width),
            to_pixels(y, height, screen.height),
        ))
    }
}

/// Parsed `key='value'` pairs in call order
#[derive(Debug, Default)]
struct Arguments(Vec<(String, String)>);

impl Arguments {
    fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    fn get_any(&self, keys: &[&str]) -> Option<&str> {
        keys.iter().find_map(|k| self.get(k))
    }
}

/// Scan `key='value', ...)` up to the closing parenthesis.
fn parse_arguments(body: &str) -> Result<Arguments, TranslateError> {
    let mut args = Vec::new();
    let mut chars = body.chars().peekable();

    loop {
        while chars.peek().is_some_and(|c| c.is_whitespace() || *c == ',') {
            chars.next();
        }
        match chars.peek() {
            None => return Err(TranslateError::Unterminated),
            Some(')') => return Ok(Arguments(args)),
            Some(_) => {}
        }

        let key: String = std::iter::from_fn(|| chars.next_if(|c| c.is_alphanumeric() || *c == '_'))
            .collect();
        while chars.next_if(|c| c.is_whitespace()).is_some() {}
        if key.is_empty() || chars.next() != Some('=') {
            return Err(TranslateError::MalformedArgument {
                argument: key,
                reason: "expected key=value".to_string(),
            });
        }
        while chars.next_if(|c| c.is_whitespace()).is_some() {}

        let value = match chars.next() {
            Some(quote @ ('\'' | '"')) => read_quoted(&mut chars, quote).ok_or(TranslateError::Unterminated)?,
            Some(first) => {
                let mut raw = String::from(first);
                while let Some(c) = chars.next_if(|c| *c != ',' && *c != ')') {
                    raw.push(c);
                }
                raw.trim().to_string()
            }
            None => return Err(TranslateError::Unterminated),
        };
        args.push((key, value));
    }
}

fn read_quoted(chars: &mut std::iter::Peekable<std::str::Chars<'_>>, quote: char) -> Option<String> {
    let mut out = String::new();
    while let Some(c) = chars.next() {
        match c {
            '\\' => match chars.next()? {
                'n' => out.push('\n'),
                't' => out.push('\t'),
                other => out.push(other),
            },
            c if c == quote => return Some(out),
            c => out.push(c),
        }
    }
    None
}

fn parse_reference_point(argument: &str, raw: &str) -> Result<(f64, f64), TranslateError> {
    let malformed = |reason: &str| TranslateError::MalformedArgument {
        argument: argument.to_string(),
        reason: reason.to_string(),
    };
    let numbers = NUMBER_RE
        .find_iter(raw)
        .map(|m| m.as_str().parse::<f64>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|_| malformed("unreadable number"))?;
    match numbers.as_slice() {
        [x, y] => Ok((*x, *y)),
        [x1, y1, x2, y2] => Ok(((x1 + x2) / 2.0, (y1 + y2) / 2.0)),
        _ => Err(malformed("expected a point or a box")),
    }
}

fn parse_keys(raw: &str) -> Result<Vec<String>, TranslateError> {
    let keys: Vec<String> = raw
        .split(|c: char| c.is_whitespace() || c == '+')
        .filter(|k| !k.is_empty())
        .map(str::to_ascii_lowercase)
        .collect();
    match keys.len() {
        0 => Err(TranslateError::MalformedArgument {
            argument: "key".to_string(),
            reason: "no keys given".to_string(),
        }),
        n if n > MAX_HOTKEY_KEYS => Err(TranslateError::TooManyKeys(n)),
        _ => Ok(keys),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HD: Resolution = Resolution::new(1920, 1080);

    fn translate(text: &str) -> Result<GroundedAction, TranslateError> {
        ActionTranslator::default().translate(text, HD)
    }

    #[test]
    fn click_with_point_tag() {
        let action = translate("Thought: press it\nAction: click(point='<point>100 200</point>')").unwrap();
        assert_eq!(action.action, UiAction::Click { point: Point::new(100, 200) });
        assert_eq!(action.thought.as_deref(), Some("press it"));
        assert!(action.expect_change);
    }

    #[test]
    fn start_box_centre() {
        let action = translate("Action: left_double(start_box='[10,20,30,40]')").unwrap();
        assert_eq!(action.action, UiAction::DoubleClick { point: Point::new(20, 30) });
    }

    #[test]
    fn tuple_point_with_box_tokens() {
        let action = translate("Action: right_single(start_box='<|box_start|>(5,6)<|box_end|>')").unwrap();
        assert_eq!(action.action, UiAction::RightClick { point: Point::new(5, 6) });
    }

    #[test]
    fn rescales_to_screen() {
        let action = ActionTranslator::default()
            .translate("Action: click(point='<point>960 540</point>')", Resolution::new(1280, 720))
            .unwrap();
        assert_eq!(action.action, UiAction::Click { point: Point::new(640, 360) });
    }

    #[test]
    fn far_edge_is_clamped_to_last_pixel() {
        let action = translate("Action: click(point='<point>1920 1080</point>')").unwrap();
        assert_eq!(action.action, UiAction::Click { point: Point::new(1919, 1079) });
    }

    #[test]
    fn drag_two_points() {
        let action = translate(
            "Action: drag(start_point='<point>0 0</point>', end_point='<point>50 60</point>')",
        )
        .unwrap();
        assert_eq!(
            action.action,
            UiAction::Drag { start: Point::new(0, 0), end: Point::new(50, 60) }
        );
    }

    #[test]
    fn hotkey_keys() {
        let action = translate("Action: hotkey(key='ctrl shift T')").unwrap();
        assert_eq!(
            action.action,
            UiAction::Hotkey { keys: vec!["ctrl".into(), "shift".into(), "t".into()] }
        );
        assert_eq!(translate("Action: hotkey(key='ctrl alt shift del')"), Err(TranslateError::TooManyKeys(4)));
        let press = translate("Action: press(key='enter')").unwrap();
        assert_eq!(press.action, UiAction::Hotkey { keys: vec!["enter".into()] });
    }

    #[test]
    fn type_unescapes() {
        let action = translate(r#"Action: type(content='it\'s a \"test\"\n')"#).unwrap();
        assert_eq!(action.action, UiAction::Type { content: "it's a \"test\"\n".into() });
    }

    #[test]
    fn quoted_action_marker_is_content() {
        let action = translate("Thought: fill the note\nAction: type(content='Action: approve')").unwrap();
        assert_eq!(action.action, UiAction::Type { content: "Action: approve".into() });
        assert_eq!(action.thought.as_deref(), Some("fill the note"));

        let inline = translate("Thought: go Action: type(content='Action: x')").unwrap();
        assert_eq!(inline.action, UiAction::Type { content: "Action: x".into() });
    }

    #[test]
    fn content_may_contain_parentheses_and_commas() {
        let action = translate("Action: type(content='f(a, b)')").unwrap();
        assert_eq!(action.action, UiAction::Type { content: "f(a, b)".into() });
    }

    #[test]
    fn scroll_direction() {
        let action = translate("Action: scroll(point='<point>10 10</point>', direction='down')").unwrap();
        assert_eq!(
            action.action,
            UiAction::Scroll { point: Point::new(10, 10), direction: ScrollDirection::Down }
        );
        assert!(matches!(
            translate("Action: scroll(point='<point>10 10</point>', direction='diagonal')"),
            Err(TranslateError::UnknownDirection(_))
        ));
    }

    #[test]
    fn wait_and_finished() {
        let wait = translate("Action: wait()").unwrap();
        assert_eq!(wait.action, UiAction::Wait);
        assert!(!wait.expect_change);

        let done = translate("Thought: all good\nAction: finished(content='logged in')").unwrap();
        assert!(done.is_sentinel());
        assert_eq!(done.action, UiAction::Finished { content: "logged in".into() });
    }

    #[test]
    fn failures_are_errors() {
        assert_eq!(translate("   "), Err(TranslateError::Empty));
        assert_eq!(translate("I am not sure what to do"), Err(TranslateError::NoAction));
        assert!(matches!(translate("Action: teleport(point='1 2')"), Err(TranslateError::UnknownAction(_))));
        assert!(matches!(translate("Action: click()"), Err(TranslateError::MissingArgument { .. })));
        assert_eq!(translate("Action: click(point='<point>1 2</point>'"), Err(TranslateError::Unterminated));
        assert!(matches!(
            translate("Action: click(point='<point>2000 10</point>')"),
            Err(TranslateError::OutOfBounds { .. })
        ));
        assert!(matches!(
            translate("Action: click(point='<point>-5 10</point>')"),
            Err(TranslateError::OutOfBounds { .. })
        ));
    }
}
