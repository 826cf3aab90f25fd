use std::fs;
use std::path::Path;

/// Load a test fixture from tests/fixtures/
pub fn load_fixture(name: &str) -> String {
    let path = Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name);
    fs::read_to_string(&path).unwrap_or_else(|e| panic!("Failed to load fixture {}: {}", name, e))
}

/// A query and the canonical text it must print as
pub struct Case {
    pub line: usize,
    pub input: String,
    pub expected: String,
}

/// Parse a case file: `input => canonical`, or a line that is already
/// canonical. Blank lines and `#` comments are skipped.
pub fn load_cases(name: &str) -> Vec<Case> {
    load_fixture(name)
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty() && !line.trim_start().starts_with('#'))
        .map(|(i, line)| {
            let (input, expected) = line.split_once(" => ").unwrap_or((line, line));
            Case {
                line: i + 1,
                input: input.trim().to_string(),
                expected: expected.trim().to_string(),
            }
        })
        .collect()
}
