// Quotes a value so that the shell reads it back as a single word.
//
// The value is wrapped in single quotes; embedded single quotes close the
// quoted run, emit an escaped quote and reopen it.
pub fn escape(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len() + 2);
    escaped.push('\'');
    for ch in value.chars() {
        if ch == '\'' {
            escaped.push_str("'\\''");
        } else {
            escaped.push(ch);
        }
    }
    escaped.push('\'');
    escaped
}
