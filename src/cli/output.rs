use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Debug, Clone)]
pub struct OutputOptions {
    pub format: OutputFormat,
    pub pretty: bool,
    pub use_color: bool,
    pub verbose: bool,
}

impl OutputOptions {
    pub fn is_json(&self) -> bool {
        self.format == OutputFormat::Json
    }

    /// Serialize a payload honoring the pretty flag.
    pub fn to_json<T: Serialize>(&self, payload: &T) -> serde_json::Result<String> {
        if self.pretty {
            serde_json::to_string_pretty(payload)
        } else {
            serde_json::to_string(payload)
        }
    }
}

pub fn detect_color(color_flag: bool) -> bool {
    if !color_flag {
        return false;
    }
    if std::env::var("NO_COLOR").is_ok() {
        return false;
    }
    atty_stdout()
}

fn atty_stdout() -> bool {
    unsafe { libc::isatty(libc::STDOUT_FILENO) != 0 }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opts(pretty: bool) -> OutputOptions {
        OutputOptions {
            format: OutputFormat::Json,
            pretty,
            use_color: false,
            verbose: false,
        }
    }

    #[test]
    fn to_json_compact_by_default() {
        let json = opts(false).to_json(&serde_json::json!({"a": 1})).unwrap();
        assert_eq!(json, r#"{"a":1}"#);
    }

    #[test]
    fn to_json_pretty_indents() {
        let json = opts(true).to_json(&serde_json::json!({"a": 1})).unwrap();
        assert!(json.contains('\n'));
    }
}
