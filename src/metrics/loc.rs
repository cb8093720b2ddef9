//! Lines-of-code counting.
//!
//! A line counts when it is neither blank nor fully covered by comment
//! trivia. Block comments are tracked across lines; a trimmed line
//! beginning with `//`, `/*` or `*` is treated as comment per the fallback
//! heuristic. Code followed by a trailing comment still counts as code.

/// Count non-blank, non-comment lines in a source text.
pub fn count_loc(text: &str) -> usize {
    let mut in_block = false;
    let mut loc = 0;
    for line in text.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        // Continuation lines of doc blocks written with a leading star.
        if !in_block && trimmed.starts_with('*') && !trimmed.starts_with("*/") {
            continue;
        }
        if line_has_code(trimmed, &mut in_block) {
            loc += 1;
        }
    }
    loc
}

/// Decide whether any code remains on the line once comment spans are
/// stripped, updating the block-comment state.
fn line_has_code(line: &str, in_block: &mut bool) -> bool {
    let mut rest = line;
    loop {
        rest = rest.trim_start();
        if rest.is_empty() {
            return false;
        }
        if *in_block {
            match rest.find("*/") {
                Some(pos) => {
                    *in_block = false;
                    rest = &rest[pos + 2..];
                }
                None => return false,
            }
            continue;
        }
        if rest.starts_with("//") {
            return false;
        }
        if rest.starts_with("/*") {
            *in_block = true;
            rest = &rest[2..];
            continue;
        }
        return true;
    }
}
