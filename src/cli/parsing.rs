//! CLI parsing helpers for clap value parsers.

use crate::options::Options;

/// A single `-O key[=value]` flag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionAssignment {
    /// Option name as given.
    pub key: String,
    /// Value after `=`, if any.
    pub value: Option<String>,
}

impl OptionAssignment {
    /// Apply to `options`: a bare key or `=true` sets a flag, `=false` clears
    /// it, and any other value is appended to the key's values.
    pub fn apply(&self, options: &mut Options) {
        match self.value.as_deref() {
            None | Some("true") => {
                options.set(&self.key, true);
            }
            Some("false") => {
                options.set(&self.key, false);
            }
            Some(value) => {
                options.push(&self.key, value);
            }
        }
    }
}

pub(super) fn parse_option_assignment(s: &str) -> Result<OptionAssignment, String> {
    let (key, value) = match s.split_once('=') {
        Some((key, value)) => (key, Some(value.to_owned())),
        None => (s, None),
    };
    if key.is_empty() || !key.bytes().all(|byte| byte.is_ascii_alphanumeric() || byte == b'_') {
        return Err(format!("illegal option name '{key}'"));
    }
    Ok(OptionAssignment {
        key: key.to_owned(),
        value,
    })
}

pub(super) fn parse_major_version(s: &str) -> Result<u32, String> {
    let value: u32 = s
        .parse()
        .map_err(|_| format!("{s} is not a valid Java major version"))?;
    if value == 0 {
        Err(String::from("Java major version must be at least 1"))
    } else {
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::OptionValue;
    use rstest::rstest;

    #[rstest]
    #[case("debug", "debug", None)]
    #[case("define=A=1", "define", Some("A=1"))]
    #[case("language_out=", "language_out", Some(""))]
    fn splits_on_first_equals(#[case] raw: &str, #[case] key: &str, #[case] value: Option<&str>) {
        let parsed = parse_option_assignment(raw).expect("valid assignment");
        assert_eq!(parsed.key, key);
        assert_eq!(parsed.value.as_deref(), value);
    }

    #[test]
    fn repeated_values_accumulate_and_flags_toggle() {
        let mut options = Options::new();
        for raw in ["define=A=1", "define=B=2", "debug", "debug=false"] {
            parse_option_assignment(raw)
                .expect("valid assignment")
                .apply(&mut options);
        }
        assert_eq!(
            options.get("define"),
            Some(&OptionValue::List(vec![String::from("A=1"), String::from("B=2")]))
        );
        assert_eq!(options.get("debug"), Some(&OptionValue::Flag(false)));
    }

    #[rstest]
    #[case("0")]
    #[case("-1")]
    #[case("seventeen")]
    fn rejects_bad_major_versions(#[case] raw: &str) {
        assert!(parse_major_version(raw).is_err());
    }
}
