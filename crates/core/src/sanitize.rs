pub fn sanitize_basename(value: &str) -> String {
    value
        .trim()
        .chars()
        .map(|ch| if is_disallowed_char(ch) { '_' } else { ch })
        .collect()
}

pub fn normalize_basename(value: &str) -> String {
    let mut base = sanitize_basename(value);
    if !base.ends_with('_') {
        base.push('_');
    }
    base
}

fn is_disallowed_char(ch: char) -> bool {
    matches!(ch, '\\' | '/' | ':' | '*' | '?' | '"' | '<' | '>' | '|')
        || ch == '\0'
        || ch.is_control()
}
