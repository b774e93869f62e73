//! Shared script generation
//!
//! One script body serves every shard task of a job kind: a fixed
//! sequence of `read` statements, one per configuration field and in
//! the same order, followed by the tool command lines substituting the
//! read variables. Only the per-shard configuration file content
//! differs between array tasks. No comments, no conditionals, no
//! shebang; the scheduler wraps the body.

use anyhow::Result;

/// render the shared script body for one job kind
///
/// Generation never inspects shard content: command lines arrive fully
/// substituted with job-kind-level parameters and reference shard
/// values only through `$field` variables.
pub fn render_script<S: AsRef<str>>(fields: &[&str], commands: &[S]) -> Result<String> {
    validate_fields(fields)?;
    anyhow::ensure!(!commands.is_empty(), "ERROR: no command lines to render");

    let mut script = String::new();

    for field in fields {
        script.push_str("read ");
        script.push_str(field);
        script.push('\n');
    }

    for command in commands {
        script.push_str(command.as_ref());
        script.push('\n');
    }

    Ok(script)
}

/// field names become shell variables, so they must be non-empty,
/// unique, and `[a-z0-9_]` starting with a letter
pub fn validate_fields(fields: &[&str]) -> Result<()> {
    anyhow::ensure!(!fields.is_empty(), "ERROR: job kind declares no fields");

    for (i, field) in fields.iter().enumerate() {
        let mut bytes = field.bytes();
        let ok = matches!(bytes.next(), Some(b) if b.is_ascii_lowercase())
            && bytes.all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'_');
        anyhow::ensure!(ok, "ERROR: invalid field name: {:?}", field);

        anyhow::ensure!(
            !fields[..i].contains(field),
            "ERROR: duplicate field name: {:?}",
            field
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_read_lines_match_field_order() {
        let script = render_script(
            &["input", "output", "species"],
            &["/sw/tool \"$species\" \"$input\" > \"$output\""],
        )
        .unwrap();

        assert_eq!(
            script,
            "read input\nread output\nread species\n/sw/tool \"$species\" \"$input\" > \"$output\"\n"
        );
    }

    #[test]
    fn test_render_multiple_command_lines() {
        let script = render_script(
            &["input", "raw", "output"],
            &["/sw/align \"$input\" > \"$raw\"", "/sw/convert \"$raw\" > \"$output\""],
        )
        .unwrap();

        let lines: Vec<&str> = script.lines().collect();
        assert_eq!(lines.len(), 5);
        assert_eq!(lines[3], "/sw/align \"$input\" > \"$raw\"");
    }

    #[test]
    fn test_invalid_field_names_are_rejected() {
        assert!(render_script(&["Input"], &["x"]).is_err());
        assert!(render_script(&["in put"], &["x"]).is_err());
        assert!(render_script(&["1input"], &["x"]).is_err());
        assert!(render_script(&[""], &["x"]).is_err());
    }

    #[test]
    fn test_duplicate_field_names_are_rejected() {
        assert!(render_script(&["input", "input"], &["x"]).is_err());
    }

    #[test]
    fn test_empty_commands_are_rejected() {
        assert!(render_script(&["input"], &[] as &[&str]).is_err());
    }
}
