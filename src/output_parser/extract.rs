//! Shared cleanup applied to every LLM response before it is used as text.

/// Full preprocessing pipeline applied to every LLM response.
///
/// Strips `<think>` and `<thinking>` blocks, unwraps a response that is
/// entirely one fenced code block, then trims whitespace.
pub fn preprocess(text: &str) -> String {
    let stripped = strip_think_tags(text);
    let trimmed = stripped.trim();
    unwrap_code_fence(trimmed).unwrap_or(trimmed).trim().to_string()
}

/// Collect the reasoning inside complete `<think>...</think>` or
/// `<thinking>...</thinking>` blocks, joined by blank lines.
///
/// Returns `None` when the response carries no (non-empty) reasoning.
pub fn extract_thinking(text: &str) -> Option<String> {
    let mut blocks = Vec::new();
    for (open, close) in [("<think>", "</think>"), ("<thinking>", "</thinking>")] {
        let mut rest = text;
        while let Some(start) = rest.find(open) {
            let after = &rest[start + open.len()..];
            let Some(end) = after.find(close) else {
                break;
            };
            let block = after[..end].trim();
            if !block.is_empty() {
                blocks.push(block.to_string());
            }
            rest = &after[end + close.len()..];
        }
    }
    if blocks.is_empty() {
        None
    } else {
        Some(blocks.join("\n\n"))
    }
}

/// Strip all `<think>...</think>` and `<thinking>...</thinking>` blocks from text.
///
/// Handles complete blocks, incomplete blocks (no closing tag),
/// and multiple sequential blocks.
///
/// # Examples
///
/// ```
/// use story_pipeline::output_parser::strip_think_tags;
///
/// assert_eq!(strip_think_tags("<think>reasoning</think>result"), "result");
/// assert_eq!(strip_think_tags("<think>no closing tag"), "");
/// assert_eq!(strip_think_tags("<thinking>also works</thinking>done"), "done");
/// ```
pub fn strip_think_tags(text: &str) -> String {
    let result = strip_tag_variant(text, "<think>", "</think>");
    strip_tag_variant(&result, "<thinking>", "</thinking>")
}

/// Strip a specific open/close tag pair from text.
fn strip_tag_variant(text: &str, open: &str, close: &str) -> String {
    let mut result = text.to_string();
    while let Some(start) = result.find(open) {
        if let Some(end_offset) = result[start..].find(close) {
            let end = start + end_offset + close.len();
            result = format!("{}{}", &result[..start], &result[end..]);
        } else {
            // No closing tag: strip from open tag to end
            result.truncate(start);
            break;
        }
    }
    result
}

/// If `text` is exactly one fenced code block, return its body.
///
/// Text with prose around the fence is returned as `None`; only a response
/// that is nothing but the fence gets unwrapped.
///
/// ```
/// use story_pipeline::output_parser::extract::unwrap_code_fence;
///
/// assert_eq!(unwrap_code_fence("```\n#a #b\n```"), Some("#a #b"));
/// assert_eq!(unwrap_code_fence("intro\n```\nx\n```"), None);
/// ```
pub fn unwrap_code_fence(text: &str) -> Option<&str> {
    let rest = text.strip_prefix("```")?;
    let body_start = rest.find('\n')? + 1;
    let body = rest[body_start..].strip_suffix("```")?;
    if body.contains("```") {
        return None;
    }
    Some(body.trim())
}
