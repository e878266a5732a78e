use crate::github::ChangedFile;
use crate::review::DiffMaterial;
use crate::utils::text::truncate_chars;

const REVIEW_INSTRUCTIONS: &str = r#"Please review the following pull request changes.

Respond with:
1. **Summary**: a short summary of the changes.
2. **Risks**: potential bugs or security issues.
3. **Suggestions**: concrete improvements.
4. **Readability & performance**: notes on code readability and performance.

Format the review in GitHub-flavored Markdown, it will be posted as a pull request comment."#;

const DIFF_START_MARKER: &str = "--- DIFF START ---";
const DIFF_END_MARKER: &str = "--- DIFF END ---";

/// Instruction document sent to the completion service.
#[derive(Clone, Debug, PartialEq)]
pub struct ReviewPrompt(String);

impl ReviewPrompt {
    /// Wraps the diff material in the review instructions.
    ///
    /// Every patch fragment (or the whole raw diff) is cut to `max_patch_chars` characters, so the
    /// size of the prompt stays bounded. The output depends only on the arguments.
    pub fn build(diff: &DiffMaterial, max_patch_chars: usize) -> Self {
        let mut prompt = String::from(REVIEW_INSTRUCTIONS);
        prompt.push_str("\n\n");

        match diff {
            DiffMaterial::Files(files) if files.is_empty() => {
                prompt.push_str("_The pull request does not contain any changed files._\n");
            }
            DiffMaterial::Files(files) => {
                let sections: Vec<String> = files
                    .iter()
                    .map(|file| file_section(file, max_patch_chars))
                    .collect();
                prompt.push_str(&sections.join("\n"));
            }
            DiffMaterial::Raw(diff) => {
                prompt.push_str(DIFF_START_MARKER);
                prompt.push('\n');
                push_fragment(&mut prompt, diff, max_patch_chars);
                prompt.push_str(DIFF_END_MARKER);
                prompt.push('\n');
            }
        }
        Self(prompt)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn file_section(file: &ChangedFile, max_patch_chars: usize) -> String {
    let mut section = format!("### File: {}\n", file.filename);
    match &file.patch {
        Some(patch) => {
            section.push_str("```diff\n");
            push_fragment(&mut section, patch, max_patch_chars);
            section.push_str("```\n");
        }
        None => section.push_str("_No textual diff available for this file._\n"),
    }
    section
}

/// Appends the truncated fragment, terminated by a newline.
fn push_fragment(out: &mut String, fragment: &str, max_chars: usize) {
    let truncated = truncate_chars(fragment, max_chars);
    out.push_str(truncated);
    if !truncated.is_empty() && !truncated.ends_with('\n') {
        out.push('\n');
    }
    if truncated.len() < fragment.len() {
        out.push_str(&format!("[... truncated to {max_chars} characters ...]\n"));
    }
}
