use std::collections::HashMap;

/// Build the outbound request body from a module's template.
///
/// `{{param}}` placeholders are substituted from the probe request's query
/// parameters; unknown parameters render as empty strings. An empty template
/// means no body at all.
pub fn render_body(template: &str, params: &HashMap<String, String>) -> Option<String> {
    if template.is_empty() {
        return None;
    }

    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        match after.find("}}") {
            Some(end) => {
                let key = after[..end].trim();
                if let Some(value) = params.get(key) {
                    out.push_str(value);
                }
                rest = &after[end + 2..];
            }
            None => {
                // Unclosed placeholder, keep the tail verbatim.
                out.push_str(&rest[start..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    Some(out)
}
