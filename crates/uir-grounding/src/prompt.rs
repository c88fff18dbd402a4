//! Grounding prompt text

use crate::grounding_loop::GroundingMode;
use uir_vision::Resolution;

const ACTION_SPACE: &str = "\
click(point='<point>x y</point>')
left_double(point='<point>x y</point>')
right_single(point='<point>x y</point>')
drag(start_point='<point>x1 y1</point>', end_point='<point>x2 y2</point>')
hotkey(key='ctrl c')  # lowercase, space separated, at most 3 keys
type(content='text')  # escape \\', \\\" and \\n inside content
scroll(point='<point>x y</point>', direction='down or up or right or left')
wait()
finished(content='summary')";

/// Build the opening user turn for a grounding conversation
#[must_use]
pub fn grounding_prompt(instruction: &str, mode: GroundingMode, reference: Resolution) -> String {
    let pacing = match mode {
        GroundingMode::SingleShot => {
            "Perform exactly one action that moves the instruction forward. \
             Use finished() only when nothing is left to do."
        }
        GroundingMode::Iterative => {
            "You will receive a new screenshot after every action. \
             Keep acting until the instruction is complete, then call finished()."
        }
    };
    format!(
        "You operate a desktop through a single GUI action per turn.\n\
         Reply in the format:\nThought: <short reasoning>\nAction: <one action>\n\n\
         Coordinates use a {reference} reference screen.\n\n\
         ## Action Space\n{ACTION_SPACE}\n\n\
         ## Pacing\n{pacing}\n\n\
         ## Instruction\n{instruction}\n"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mentions_instruction_and_vocabulary() {
        let prompt = grounding_prompt(
            "Click Submit",
            GroundingMode::SingleShot,
            Resolution::new(1920, 1080),
        );
        assert!(prompt.contains("Click Submit"));
        assert!(prompt.contains("finished(content="));
        assert!(prompt.contains("exactly one action"));
        assert!(prompt.contains("1920x1080"));
    }
}
