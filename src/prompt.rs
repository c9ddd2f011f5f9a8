use std::collections::HashMap;

/// Build a prompt string with variable substitution.
///
/// Replaces `{key}` placeholders in the template with values from `vars`.
/// The special `{input}` placeholder is replaced by the `input` parameter.
/// Placeholders with no matching variable are left as-is.
///
/// Use `{{` to insert a literal `{` and `}}` to insert a literal `}`.
///
/// The template is scanned once, left to right. Substituted text is copied
/// verbatim and never scanned again, so a value that itself looks like a
/// placeholder comes out unchanged whatever the order of `vars`.
///
/// # Example
///
/// ```
/// use std::collections::HashMap;
/// use story_pipeline::prompt::render;
///
/// let vars = HashMap::from([("genre".to_string(), "noir".to_string())]);
/// let result = render("Topic: {input}\nGenre: {genre} {{draft}}", "a heist", &vars);
/// assert_eq!(result, "Topic: a heist\nGenre: noir {draft}");
/// ```
pub fn render(template: &str, input: &str, vars: &HashMap<String, String>) -> String {
    let mut rendered = String::with_capacity(template.len() + input.len());
    let mut rest = template;

    while let Some(pos) = rest.find(&['{', '}'][..]) {
        rendered.push_str(&rest[..pos]);
        let tail = &rest[pos..];

        if tail.starts_with("{{") {
            rendered.push('{');
            rest = &tail[2..];
            continue;
        }
        if tail.starts_with("}}") {
            rendered.push('}');
            rest = &tail[2..];
            continue;
        }
        if let Some((key, len)) = placeholder_at(tail) {
            let value = if key == "input" {
                Some(input)
            } else {
                vars.get(key).map(String::as_str)
            };
            rendered.push_str(value.unwrap_or(&tail[..len]));
            rest = &tail[len..];
            continue;
        }

        // Lone brace.
        rendered.push_str(&tail[..1]);
        rest = &tail[1..];
    }
    rendered.push_str(rest);
    rendered
}

/// `{key}` at the start of `s`: the key and the placeholder's byte length.
fn placeholder_at(s: &str) -> Option<(&str, usize)> {
    let close = s.strip_prefix('{')?.find('}')?;
    let key = &s[1..1 + close];
    let valid = !key.is_empty()
        && key
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_');
    valid.then_some((key, close + 2))
}
