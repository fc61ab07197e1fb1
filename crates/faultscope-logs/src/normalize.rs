use std::sync::LazyLock;

use regex::Regex;

static CORE_EXCEPTION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[A-Za-z0-9]+Exception").expect("core exception pattern is valid")
});

/// Trailing simple exception name of a qualified type.
///
/// `org.springframework.dao.DataAccessResourceFailureException` becomes
/// `DataAccessResourceFailureException`. Types whose name does not end in
/// `Exception` (e.g. `java.lang.OutOfMemoryError`) have no core exception.
pub fn core_exception(exception_type: &str) -> Option<&str> {
    CORE_EXCEPTION
        .find_iter(exception_type)
        .last()
        .map(|m| m.as_str())
}

/// Split a `File:line` descriptor on its last colon
pub fn split_file_line(file_line: &str) -> Option<(&str, &str)> {
    let (filename, line) = file_line.rsplit_once(':')?;
    let (filename, line) = (filename.trim(), line.trim());
    if filename.is_empty() || line.is_empty() {
        return None;
    }
    Some((filename, line))
}
