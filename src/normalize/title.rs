use std::sync::LazyLock;

use regex::Regex;

/// Genitive month names as they appear after a day number.
pub const MONTHS: [&str; 12] = [
    "января",
    "февраля",
    "марта",
    "апреля",
    "мая",
    "июня",
    "июля",
    "августа",
    "сентября",
    "октября",
    "ноября",
    "декабря",
];

const TIME: &str = r"\d{1,2}:\d{2}(?::\d{2})?";

static TRAILING_TIME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(&format!(r"\s*{TIME}\s*$")).expect("valid time pattern"));

static TRAILING_DATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"\s*\d{{1,2}}\s+(?:{})\s*$", MONTHS.join("|")))
        .expect("valid date pattern")
});

static TRAILING_DATE_TIME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"\s*\d{{1,2}}\s+(?:{})\s+{TIME}\s*$",
        MONTHS.join("|")
    ))
    .expect("valid date-time pattern")
});

/// Strips trailing `HH:MM[:SS]`, `<day> <month>` and `<day> <month> HH:MM[:SS]`
/// fragments. Repeats until nothing changes, so the result is a fixed point.
pub fn clean_title(title: &str) -> String {
    let mut current = title.trim().to_string();
    loop {
        let next = strip_once(&current);
        if next == current {
            return current;
        }
        current = next;
    }
}

fn strip_once(title: &str) -> String {
    let title = TRAILING_TIME.replace(title, "");
    let title = TRAILING_DATE.replace(title.trim(), "");
    let title = TRAILING_DATE_TIME.replace(title.trim(), "");
    title.trim().to_string()
}
