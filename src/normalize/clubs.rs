/// Canonical club names with their lowercase keyword variants, in tagging order.
///
/// Keywords are matched as plain substrings of the lowercased title, so most
/// Russian entries are stems that survive declension ("барселон" matches
/// "Барселону"). Short aliases ("Реал", "Барса") are separate entries and are
/// tagged alongside the full club name when both match.
pub const CLUBS: &[(&str, &[&str])] = &[
    // Английская Премьер-лига
    ("Манчестер Юнайтед", &["манчестер юнайтед", "manchester united"]),
    ("Ман Юнайтед", &["ман юнайтед", "man united"]),
    ("Манчестер Сити", &["манчестер сити", "manchester city"]),
    ("Ман Сити", &["ман сити", "man city"]),
    ("Ливерпуль", &["ливерпул", "liverpool"]),
    ("Челси", &["челси", "chelsea"]),
    ("Арсенал", &["арсенал", "arsenal"]),
    ("Тоттенхэм", &["тоттенхэм", "tottenham"]),
    ("Ньюкасл", &["ньюкасл", "newcastle"]),
    ("Астон Вилла", &["астон вилл", "aston villa"]),
    ("Вест Хэм", &["вест хэм", "west ham"]),
    ("Брайтон", &["брайтон", "brighton"]),
    // Ла Лига
    ("Реал Мадрид", &["реал мадрид", "реал", "real madrid"]),
    ("Реал", &["реал", "real"]),
    ("Барселона", &["барселон", "barcelona", "барса"]),
    ("Барса", &["барса", "барселон", "barca"]),
    ("Атлетико Мадрид", &["атлетико", "atletico madrid"]),
    ("Севилья", &["севиль", "sevilla"]),
    ("Валенсия", &["валенси", "valencia"]),
    ("Вильярреал", &["вильярреал", "villarreal"]),
    ("Атлетик Бильбао", &["атлетик бильбао", "athletic bilbao"]),
    ("Реал Сосьедад", &["реал сосьедад", "real sociedad"]),
    // Серия А
    ("Ювентус", &["ювентус", "juventus"]),
    ("Милан", &["милан", "milan"]),
    ("Интер", &["интер", "inter milan"]),
    ("Наполи", &["наполи", "napoli"]),
    ("Рома", &["рома", "рому", "ромы", "as roma"]),
    ("Лацио", &["лацио", "lazio"]),
    ("Аталанта", &["аталант", "atalanta"]),
    ("Фиорентина", &["фиорентин", "fiorentina"]),
    // Бундеслига
    ("Бавария", &["бавари", "bayern"]),
    ("Боруссия Дортмунд", &["боруссия дортмунд", "borussia dortmund", "дортмунд", "dortmund"]),
    ("Байер Леверкузен", &["байер", "леверкузен", "leverkusen"]),
    ("РБ Лейпциг", &["рб лейпциг", "лейпциг", "leipzig"]),
    ("Боруссия Мёнхенгладбах", &["мёнхенгладбах", "менхенгладбах", "gladbach"]),
    ("Айнтрахт Франкфурт", &["айнтрахт", "eintracht frankfurt"]),
    ("Вольфсбург", &["вольфсбург", "wolfsburg"]),
    ("Хоффенхайм", &["хоффенхайм", "hoffenheim"]),
    // Лига 1
    ("ПСЖ", &["псж", "psg", "пари сен-жермен"]),
    ("Марсель", &["марсел", "marseille"]),
    ("Лион", &["лион", "lyon"]),
    ("Монако", &["монако", "monaco"]),
    ("Лилль", &["лилль", "lille"]),
    ("Ренн", &["ренн", "rennes"]),
    ("Ницца", &["ницц", "ogc nice"]),
    // Российская Премьер-лига
    ("Зенит", &["зенит", "zenit"]),
    ("Спартак", &["спартак", "spartak"]),
    ("ЦСКА", &["цска", "cska"]),
    ("Локомотив", &["локомотив", "lokomotiv"]),
    ("Динамо", &["динамо", "dynamo"]),
    ("Краснодар", &["краснодар", "krasnodar"]),
    ("Ростов", &["ростов", "rostov"]),
    ("Крылья Советов", &["крылья советов", "крыльев советов"]),
    ("Ахмат", &["ахмат", "akhmat"]),
    ("Сочи", &["сочи", "sochi"]),
    ("Оренбург", &["оренбург", "orenburg"]),
    ("Урал", &["урал", "fc ural"]),
    ("Балтика", &["балтик", "baltika"]),
    ("Пари Нижний Новгород", &["пари нн", "нижний новгород", "нижнего новгорода"]),
];

/// Canonical names of every club with a keyword in `title`, joined with `", "`.
pub fn extract_club_tags(title: &str) -> String {
    matching_clubs(title).collect::<Vec<_>>().join(", ")
}

pub fn matching_clubs(title: &str) -> impl Iterator<Item = &'static str> {
    let title = title.to_lowercase();
    CLUBS
        .iter()
        .filter(move |(_, keywords)| keywords.iter().any(|k| title.contains(k)))
        .map(|(club, _)| *club)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tags_full_names_and_aliases_in_table_order() {
        assert_eq!(
            extract_club_tags("Реал Мадрид обыграл Барселону в Эль Класико"),
            "Реал Мадрид, Реал, Барселона, Барса"
        );
    }

    #[test]
    fn matching_ignores_case_and_script() {
        assert_eq!(extract_club_tags("ZENIT vs SPARTAK"), "Зенит, Спартак");
        assert_eq!(extract_club_tags("Гол Салаха принёс победу Ливерпулю"), "Ливерпуль");
        assert_eq!(extract_club_tags("PSG signs a striker"), "ПСЖ");
    }

    #[test]
    fn roma_matches_at_end_of_title_and_in_genitive() {
        assert_eq!(extract_club_tags("Лацио обыграл Рома"), "Рома, Лацио");
        assert_eq!(extract_club_tags("Дубль Дибалы спас Ромы сезон"), "Рома");
    }

    #[test]
    fn no_match_yields_empty_string() {
        assert_eq!(extract_club_tags("Сборная России объявила состав"), "");
        assert_eq!(extract_club_tags(""), "");
    }

    #[test]
    fn every_keyword_tags_its_club() {
        for (club, keywords) in CLUBS {
            for keyword in *keywords {
                let title = format!("Новость: {keyword} в центре внимания");
                let tags = extract_club_tags(&title);
                assert!(
                    tags.split(", ").any(|t| t == *club),
                    "keyword {keyword:?} did not tag {club:?}: {tags:?}"
                );
            }
        }
    }

    #[test]
    fn keywords_are_lowercase() {
        for (_, keywords) in CLUBS {
            for keyword in *keywords {
                assert_eq!(keyword.to_lowercase(), *keyword);
            }
        }
    }
}
