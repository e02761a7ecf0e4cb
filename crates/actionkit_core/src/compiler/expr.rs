//! `${name}` variable expansion shared by descriptors and icon bundles.
//!
//! # Invariants
//! - Expansion repeats until a pass performs no substitution.
//! - Unknown names are left untouched as `${name}`.
//! - `$$` escapes survive every pass and become `$` only at the end.

use log::warn;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use std::collections::HashMap;

static VARIABLE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\$\$|\$\{(\w+)\}").expect("valid variable regex"));

/// Upper bound for self-referential variable chains.
const MAX_EXPANSION_PASSES: usize = 32;

/// Name to value map used during expansion.
pub type Variables = HashMap<String, String>;

/// Expands every `${name}` in `input` against `vars`.
pub fn expand(input: &str, vars: &Variables) -> String {
    let mut current = input.to_string();
    let mut passes = 0;
    loop {
        let (next, substituted) = expand_once(&current, vars);
        current = next;
        if !substituted {
            break;
        }
        passes += 1;
        if passes >= MAX_EXPANSION_PASSES {
            warn!(
                "event=variable_expansion module=compiler status=error reason=pass_limit passes={}",
                passes
            );
            break;
        }
    }
    current.replace("$$", "$")
}

fn expand_once(input: &str, vars: &Variables) -> (String, bool) {
    let mut substituted = false;
    let output = VARIABLE_RE.replace_all(input, |caps: &Captures<'_>| {
        let Some(name) = caps.get(1) else {
            return "$$".to_string();
        };
        match vars.get(name.as_str()) {
            Some(value) => {
                substituted = true;
                value.clone()
            }
            None => caps[0].to_string(),
        }
    });
    (output.into_owned(), substituted)
}

#[cfg(test)]
mod tests {
    use super::{expand, Variables};

    fn vars(pairs: &[(&str, &str)]) -> Variables {
        pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect()
    }

    #[test]
    fn expands_path_template() {
        let vars = vars(&[("dir", "assets"), ("name", "open")]);
        assert_eq!(
            expand("${dir}/icons/${name}.png", &vars),
            "assets/icons/open.png"
        );
    }

    #[test]
    fn escaped_reference_stays_literal() {
        let vars = vars(&[("dir", "assets")]);
        assert_eq!(expand("$${dir}", &vars), "${dir}");
        assert_eq!(expand("$$${dir}", &vars), "$assets");
        assert_eq!(expand("cost: $$5", &vars), "cost: $5");
    }

    #[test]
    fn chained_variables_expand_fully() {
        let vars = vars(&[("root", "/opt/app"), ("icons", "${root}/icons")]);
        assert_eq!(expand("${icons}/a.svg", &vars), "/opt/app/icons/a.svg");
    }

    #[test]
    fn unknown_name_passes_through() {
        assert_eq!(expand("${missing}/x", &Variables::new()), "${missing}/x");
    }

    #[test]
    fn self_reference_terminates() {
        let vars = vars(&[("loop", "${loop}x")]);
        let expanded = expand("${loop}", &vars);
        assert!(expanded.starts_with("${loop}"));
        assert!(expanded.ends_with('x'));
    }
}
