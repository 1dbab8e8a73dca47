use std::sync::OnceLock;

use regex::Regex;

/// Expand `{{ env.VAR }}` placeholders in a raw TOML string
///
/// Operates on the raw config text before deserialization, so config
/// structs use plain String/SecretString. Lines starting with `#`
/// (TOML comments) are passed through unchanged.
pub fn expand_env(input: &str) -> Result<String, String> {
    fn re() -> &'static Regex {
        static RE: OnceLock<Regex> = OnceLock::new();
        RE.get_or_init(|| Regex::new(r"\{\{\s*env\.([A-Za-z0-9_]+)\s*\}\}").expect("must be valid regex"))
    }

    let mut output = String::with_capacity(input.len());

    for (i, line) in input.lines().enumerate() {
        if i > 0 {
            output.push('\n');
        }

        // Skip expansion for comment lines
        if line.trim_start().starts_with('#') {
            output.push_str(line);
            continue;
        }

        let mut last_end = 0;
        for captures in re().captures_iter(line) {
            let overall = captures.get(0).expect("group 0 always present");
            let var_name = &captures[1];

            output.push_str(&line[last_end..overall.start()]);
            match std::env::var(var_name) {
                Ok(value) => output.push_str(&value),
                Err(_) => return Err(format!("environment variable not found: `{var_name}`")),
            }
            last_end = overall.end();
        }
        output.push_str(&line[last_end..]);
    }

    if input.ends_with('\n') {
        output.push('\n');
    }

    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_placeholders() {
        let input = "key = \"value\"";
        assert_eq!(expand_env(input).unwrap(), input);
    }

    #[test]
    fn single_env_var() {
        temp_env::with_var("KP_TEST_VAR", Some("hello"), || {
            let result = expand_env("key = \"{{ env.KP_TEST_VAR }}\"").unwrap();
            assert_eq!(result, "key = \"hello\"");
        });
    }

    #[test]
    fn multiple_env_vars_on_one_line() {
        let vars = [("KP_FOO", Some("foo")), ("KP_BAR", Some("bar"))];
        temp_env::with_vars(vars, || {
            let result = expand_env("key = \"{{ env.KP_FOO }}-{{ env.KP_BAR }}\"").unwrap();
            assert_eq!(result, "key = \"foo-bar\"");
        });
    }

    #[test]
    fn missing_env_var_errors() {
        temp_env::with_var_unset("KP_MISSING_VAR", || {
            let err = expand_env("key = \"{{ env.KP_MISSING_VAR }}\"").unwrap_err();
            assert!(err.contains("KP_MISSING_VAR"));
        });
    }

    #[test]
    fn commented_lines_skip_expansion() {
        temp_env::with_var_unset("KP_MISSING_VAR", || {
            let input = "# key = \"{{ env.KP_MISSING_VAR }}\"";
            assert_eq!(expand_env(input).unwrap(), input);
        });
    }

    #[test]
    fn trailing_newline_preserved() {
        let input = "key = \"value\"\n";
        assert_eq!(expand_env(input).unwrap(), input);
    }
}
