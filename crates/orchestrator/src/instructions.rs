//! Fixed instruction texts sent to the model.
//!
//! These strings are part of the external contract: the provider must receive
//! them byte-for-byte, including the missing spaces between some sentences.

/// One-shot instruction prepended while collecting requirements.
pub const CLARIFYING_INSTRUCTION: &str = concat!(
    "Help the user develop a clear set of requirements.",
    "Ask for the top 3 most important details to help you develop the best prompt possible to fulfil the user's request.",
);

/// Instruction appended before the summary/persona call.
pub const SUMMARY_INSTRUCTION: &str = concat!(
    "Please summarize the key requirements provided by the user in bullet points. ",
    "Based on these requirements, suggest an appropriate persona to 'act as' to fulfill the user's request.",
    "Act as a prompt generator for ChatGPT. Use the suggested persona and summary to engineer a prompt that would yield the best and most desirable response from ChatGPT.",
    "Each prompt should involve asking ChatGPT to 'act as' the persona given",
    "The prompt should be detailed and comprehensive and should build on what was requested to generate the best possible response from ChatGPT.",
    "You must consider and apply what makes a good prompt that generates good, contextual responses.",
    "You must give a summary of the key requirements, a suggested persona, and output the prompt you want to use.",
);

const FINAL_INSTRUCTION_PREFIX: &str =
    "Based on the following summary and suggested persona, provide the final response:\n\n";

/// Instruction appended before the final-answer call.
pub fn final_instruction(summary: &str) -> String {
    format!("{FINAL_INSTRUCTION_PREFIX}{summary}")
}
