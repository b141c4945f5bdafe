use regex::Regex;
use std::sync::OnceLock;

const MAX_FILENAME_BYTES: usize = 255;

/// Device names Windows refuses as file stems
const RESERVED_NAMES: &[&str] = &[
    "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8",
    "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
];

fn invalid_chars() -> &'static Regex {
    static INVALID: OnceLock<Regex> = OnceLock::new();
    INVALID.get_or_init(|| Regex::new(r#"[\\/:*?"<>|\x00-\x1f\x7f]"#).expect("valid regex"))
}

/// Turn a paper title into a file stem that is valid on every platform.
///
/// Returns `None` when nothing usable is left.
#[must_use]
pub fn sanitize_title(title: &str) -> Option<String> {
    let cleaned = invalid_chars().replace_all(title, "");
    let mut name = cleaned.trim().trim_end_matches(['.', ' ']).to_string();

    if name.len() > MAX_FILENAME_BYTES {
        let mut cut = MAX_FILENAME_BYTES;
        while !name.is_char_boundary(cut) {
            cut -= 1;
        }
        name.truncate(cut);
        name = name.trim_end_matches(['.', ' ']).to_string();
    }

    if name.is_empty() {
        return None;
    }

    if RESERVED_NAMES.iter().any(|reserved| reserved.eq_ignore_ascii_case(&name)) {
        name.push('_');
    }

    Some(name)
}
