use crate::error::{AppError, Result};

/// Markup family a source renders its listings with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layout {
    Sportbox,
    Championat,
}

/// How page N of a listing is addressed. Page 1 is always `start_url`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pagination {
    /// `<start_url>?page=N`
    Query,
    /// The template with `{page}` replaced by N.
    Path(&'static str),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Source {
    pub key: &'static str,
    pub name: &'static str,
    pub base_url: &'static str,
    pub start_url: &'static str,
    pub pagination: Pagination,
    pub layout: Layout,
    /// League every item of this listing belongs to. `None` derives it from the rubric.
    pub league: Option<&'static str>,
}

impl Source {
    pub fn page_url(&self, page: u32) -> String {
        if page <= 1 {
            return self.start_url.to_string();
        }
        match self.pagination {
            Pagination::Query => format!("{}?page={page}", self.start_url),
            Pagination::Path(template) => template.replace("{page}", &page.to_string()),
        }
    }
}

const fn sportbox(key: &'static str, league: &'static str, start_url: &'static str) -> Source {
    Source {
        key,
        name: league,
        base_url: "https://news.sportbox.ru",
        start_url,
        pagination: Pagination::Query,
        layout: Layout::Sportbox,
        league: Some(league),
    }
}

pub const SOURCES: &[Source] = &[
    sportbox(
        "champions_league",
        "Лига Чемпионов",
        "https://news.sportbox.ru/Vidy_sporta/Futbol/Liga_Chempionov",
    ),
    sportbox(
        "premier_league",
        "Английская Премьер-лига",
        "https://news.sportbox.ru/Vidy_sporta/Futbol/Evropejskie_chempionaty/Angliya",
    ),
    sportbox(
        "la_liga",
        "Ла Лига",
        "https://news.sportbox.ru/Vidy_sporta/Futbol/Evropejskie_chempionaty/Ispaniya",
    ),
    sportbox(
        "serie_a",
        "Серия А",
        "https://news.sportbox.ru/Vidy_sporta/Futbol/Evropejskie_chempionaty/Italiya",
    ),
    sportbox(
        "bundesliga",
        "Бундеслига",
        "https://news.sportbox.ru/Vidy_sporta/Futbol/Evropejskie_chempionaty/Germaniya",
    ),
    sportbox(
        "ligue_1",
        "Лига 1",
        "https://news.sportbox.ru/Vidy_sporta/Futbol/Evropejskie_chempionaty/Franciya",
    ),
    sportbox(
        "europa_league",
        "Лига Европы",
        "https://news.sportbox.ru/Vidy_sporta/Futbol/europa_league",
    ),
    sportbox(
        "rpl",
        "Российская Премьер-лига",
        "https://news.sportbox.ru/Vidy_sporta/Futbol/Russia/premier_league",
    ),
    Source {
        key: "championat",
        name: "Championat: футбол",
        base_url: "https://www.championat.com",
        start_url: "https://www.championat.com/news/football/1.html",
        pagination: Pagination::Path("https://www.championat.com/news/football/{page}.html"),
        layout: Layout::Championat,
        league: None,
    },
];

pub fn find_source(key: &str) -> Result<&'static Source> {
    SOURCES
        .iter()
        .find(|s| s.key == key)
        .ok_or_else(|| AppError::UnknownSource(key.to_string()))
}
