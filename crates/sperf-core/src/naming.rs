//! # Name Regularization
//!
//! Property and definition names in a schema are arbitrary strings
//! (`"$schema"`, `"field-name"`, `"3d"`). Emitters need identifiers, so
//! every name exposed by the model goes through [`regularize_name`].

/// Turn an arbitrary schema name into an identifier.
///
/// - each run of characters outside `[0-9A-Za-z_]` becomes a single `_`;
/// - a leading digit gets a `_` prefix;
/// - an empty name becomes `_`.
pub fn regularize_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 1);
    let mut in_invalid_run = false;

    for c in name.chars() {
        if c.is_ascii_alphanumeric() || c == '_' {
            out.push(c);
            in_invalid_run = false;
        } else if !in_invalid_run {
            out.push('_');
            in_invalid_run = true;
        }
    }

    match out.chars().next() {
        None => "_".to_string(),
        Some(first) if first.is_ascii_digit() => format!("_{out}"),
        Some(_) => out,
    }
}
