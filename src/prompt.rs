//! Alpaca-style prompt formatting.
//!
//! The model was fine-tuned on the three-part Alpaca layout, so the exact
//! section headers and spacing here are load-bearing.

/// Fixed instruction paired with every patch request.
pub const PATCH_INSTRUCTION: &str = "create a Pd patch that matches the following request.";

/// Render the instruction and task description into the Alpaca template.
///
/// Pure string substitution; any task string is accepted, including empty.
/// The response section is left blank for the model to fill in.
pub fn format_alpaca(instruction: &str, task: &str) -> String {
    format!(
        "Below is an instruction that describes a task, paired with an input that provides further context. Write a response that appropriately completes the request.\n\n\
         ### Instruction:\n{instruction}\n\n\
         ### Input:\n{task}\n\n\
         ### Response:\n"
    )
}
