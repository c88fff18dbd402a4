use proptest::prelude::*;
use serde_json::json;
use uir_grounding::{ActionTranslator, Point, UiAction};
use uir_vision::Resolution;

#[test]
fn test_actions_serialize_with_kind_tag() {
    let action = UiAction::Click {
        point: Point { x: 12, y: 34 },
    };
    assert_eq!(
        serde_json::to_value(&action).unwrap(),
        json!({"kind": "click", "point": {"x": 12, "y": 34}})
    );

    let keys: UiAction = serde_json::from_value(json!({"kind": "hotkey", "keys": ["ctrl", "s"]})).unwrap();
    assert_eq!(keys.to_string(), "hotkey ctrl+s");
}

proptest! {
    #[test]
    fn prop_translate_never_panics(text in "\\PC{0,120}") {
        let _ = ActionTranslator::default().translate(&text, Resolution::new(1280, 720));
    }

    #[test]
    fn prop_points_land_on_screen(
        x in 0u32..=1920,
        y in 0u32..=1080,
        width in 1u32..4000,
        height in 1u32..3000,
    ) {
        let text = format!("Action: click(point='<point>{x} {y}</point>')");
        let action = ActionTranslator::default()
            .translate(&text, Resolution::new(width, height))
            .unwrap();
        match action.action {
            UiAction::Click { point } => {
                prop_assert!(point.x < width);
                prop_assert!(point.y < height);
            }
            other => prop_assert!(false, "unexpected action {other:?}"),
        }
    }
}
