/// Rubric fragments mapped to canonical league names. Checked in order, first hit wins.
pub const LEAGUES: &[(&str, &str)] = &[
    ("Английская", "Английская Премьер-лига"),
    ("АПЛ", "Английская Премьер-лига"),
    ("Англия", "Английская Премьер-лига"),
    ("Премьер-лига", "Российская Премьер-лига"),
    ("РПЛ", "Российская Премьер-лига"),
    ("Кубок России", "Кубок России"),
    ("Ла Лига", "Ла Лига"),
    ("Испания", "Ла Лига"),
    ("Серия А", "Серия А"),
    ("Италия", "Серия А"),
    ("Бундеслига", "Бундеслига"),
    ("Германия", "Бундеслига"),
    ("Лига 1", "Лига 1"),
    ("Франция", "Лига 1"),
    ("Лига Чемпионов", "Лига Чемпионов"),
    ("ЛЧ", "Лига Чемпионов"),
    ("Лига Европы", "Лига Европы"),
    ("ЛЕ", "Лига Европы"),
];

/// Canonical league for a rubric, or the rubric itself when no fragment matches.
pub fn determine_league(rubric: &str) -> String {
    let lowered = rubric.to_lowercase();
    LEAGUES
        .iter()
        .find(|(key, _)| lowered.contains(&key.to_lowercase()))
        .map(|(_, league)| league.to_string())
        .unwrap_or_else(|| rubric.to_string())
}
