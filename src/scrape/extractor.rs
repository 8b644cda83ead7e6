use std::collections::HashSet;

use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::error::{AppError, Result};
use crate::models::Candidate;

use super::sources::Layout;

/// Anchors considered by the last-resort scan must point below this path.
const FALLBACK_PATH_MARKER: &str = "/news/";
/// ...and carry more visible characters than this.
const FALLBACK_MIN_TEXT_CHARS: usize = 20;

/// Titles shorter than this are navigation noise in [`Extractor::strict`] mode.
pub const STRICT_MIN_TITLE_CHARS: usize = 15;

#[derive(Debug, Clone, Copy)]
enum Read {
    Text,
    Attr(&'static str),
}

struct FieldSpec {
    selectors: &'static [&'static str],
    read: Read,
}

struct LayoutSpec {
    /// Listing item patterns in priority order. The first one with any match is used.
    items: &'static [&'static str],
    title: FieldSpec,
    link: FieldSpec,
    rubric: FieldSpec,
    date: FieldSpec,
    image: FieldSpec,
    /// Page-level date heading prefixed to every item's date.
    page_date: Option<&'static str>,
}

const SPORTBOX: LayoutSpec = LayoutSpec {
    items: &[
        "#teazers ul.list li",
        ".teaser-list .teaser-item",
        ".news-list .news-item",
        ".b-news-list .b-news-item",
        ".news-item",
        ".teaser-item",
        ".b-news-teaser-item",
        ".b-news-list__item",
    ],
    title: FieldSpec {
        selectors: &[
            ".title .text",
            ".teaser-title",
            ".news-title",
            ".b-news-title",
            ".title",
            ".b-news-teaser-item__title",
        ],
        read: Read::Text,
    },
    link: FieldSpec {
        selectors: &["a[href]"],
        read: Read::Attr("href"),
    },
    rubric: FieldSpec {
        selectors: &[
            ".rubric",
            ".teaser-rubric",
            ".news-rubric",
            ".b-news-rubric",
            ".b-news-teaser-item__rubric",
        ],
        read: Read::Text,
    },
    date: FieldSpec {
        selectors: &[
            ".date",
            ".teaser-date",
            ".news-date",
            ".b-news-date",
            ".b-news-teaser-item__date",
        ],
        read: Read::Text,
    },
    image: FieldSpec {
        selectors: &["img[src]"],
        read: Read::Attr("src"),
    },
    page_date: None,
};

const CHAMPIONAT: LayoutSpec = LayoutSpec {
    items: &["div.news-items div.news-item"],
    title: FieldSpec {
        selectors: &["a.news-item__title"],
        read: Read::Text,
    },
    link: FieldSpec {
        selectors: &["a.news-item__title", "a[href]"],
        read: Read::Attr("href"),
    },
    rubric: FieldSpec {
        selectors: &["a.news-item__tag"],
        read: Read::Text,
    },
    date: FieldSpec {
        selectors: &["div.news-item__time"],
        read: Read::Text,
    },
    image: FieldSpec {
        selectors: &["img[src]"],
        read: Read::Attr("src"),
    },
    page_date: Some("div.news-items div.news-items__head"),
};

struct CompiledField {
    selectors: Vec<Selector>,
    read: Read,
}

impl CompiledField {
    fn compile(spec: &FieldSpec) -> Result<Self> {
        Ok(Self {
            selectors: compile_all(spec.selectors)?,
            read: spec.read,
        })
    }

    /// First non-empty value across the fallback selectors.
    fn first_in(&self, element: ElementRef) -> String {
        self.selectors
            .iter()
            .flat_map(|selector| element.select(selector))
            .map(|found| match self.read {
                Read::Text => text_of(found),
                Read::Attr(name) => found.value().attr(name).unwrap_or_default().trim().to_string(),
            })
            .find(|value| !value.is_empty())
            .unwrap_or_default()
    }
}

struct CompiledLayout {
    items: Vec<Selector>,
    title: CompiledField,
    link: CompiledField,
    rubric: CompiledField,
    date: CompiledField,
    image: CompiledField,
    page_date: Option<Selector>,
}

impl CompiledLayout {
    fn compile(spec: &LayoutSpec) -> Result<Self> {
        Ok(Self {
            items: compile_all(spec.items)?,
            title: CompiledField::compile(&spec.title)?,
            link: CompiledField::compile(&spec.link)?,
            rubric: CompiledField::compile(&spec.rubric)?,
            date: CompiledField::compile(&spec.date)?,
            image: CompiledField::compile(&spec.image)?,
            page_date: spec.page_date.map(compile).transpose()?,
        })
    }
}

/// One way of reading listings out of a document. `None` means "did not apply".
type Strategy<'a> = Box<dyn Fn(&Html) -> Option<Vec<Candidate>> + 'a>;

pub struct Extractor {
    sportbox: CompiledLayout,
    championat: CompiledLayout,
    anchors: Selector,
    min_title_chars: usize,
    anchor_fallback: bool,
}

impl Extractor {
    pub fn new() -> Result<Self> {
        Ok(Self {
            sportbox: CompiledLayout::compile(&SPORTBOX)?,
            championat: CompiledLayout::compile(&CHAMPIONAT)?,
            anchors: compile("a[href]")?,
            min_title_chars: 1,
            anchor_fallback: true,
        })
    }

    /// Drops candidates whose title is shorter than [`STRICT_MIN_TITLE_CHARS`].
    pub fn strict() -> Result<Self> {
        Ok(Self::new()?.with_min_title_chars(STRICT_MIN_TITLE_CHARS))
    }

    pub fn with_min_title_chars(mut self, min: usize) -> Self {
        self.min_title_chars = min.max(1);
        self
    }

    pub fn with_anchor_fallback(mut self, enabled: bool) -> Self {
        self.anchor_fallback = enabled;
        self
    }

    /// Extracts candidates from one page body.
    ///
    /// Item patterns are tried in priority order and the first pattern
    /// matching any element decides the result, even if every one of its
    /// items is later discarded. The anchor scan only runs when no pattern
    /// matched at all.
    pub fn extract(&self, html: &str, layout: Layout, base: &Url) -> Vec<Candidate> {
        let document = Html::parse_document(html);
        let layout = match layout {
            Layout::Sportbox => &self.sportbox,
            Layout::Championat => &self.championat,
        };

        self.strategies(layout, base)
            .iter()
            .find_map(|strategy| strategy(&document))
            .unwrap_or_else(|| {
                tracing::debug!("no listing pattern matched");
                Vec::new()
            })
    }

    fn strategies<'a>(&'a self, layout: &'a CompiledLayout, base: &'a Url) -> Vec<Strategy<'a>> {
        let mut strategies: Vec<Strategy<'a>> = layout
            .items
            .iter()
            .map(|selector| -> Strategy<'a> {
                Box::new(move |document: &Html| self.listing(document, selector, layout, base))
            })
            .collect();

        if self.anchor_fallback {
            strategies.push(Box::new(move |document: &Html| self.anchor_scan(document, base)));
        }
        strategies
    }

    fn listing(
        &self,
        document: &Html,
        selector: &Selector,
        layout: &CompiledLayout,
        base: &Url,
    ) -> Option<Vec<Candidate>> {
        let elements: Vec<_> = document.select(selector).collect();
        if elements.is_empty() {
            return None;
        }
        tracing::debug!(count = elements.len(), "listing pattern matched");

        let page_date = layout
            .page_date
            .as_ref()
            .and_then(|s| document.select(s).next())
            .map(text_of)
            .unwrap_or_default();

        let candidates = elements
            .into_iter()
            .map(|element| read_item(element, layout, &page_date, base))
            .filter(|c| self.keeps_title(&c.title))
            .collect();
        Some(candidates)
    }

    fn anchor_scan(&self, document: &Html, base: &Url) -> Option<Vec<Candidate>> {
        let mut seen = HashSet::new();
        let candidates: Vec<_> = document
            .select(&self.anchors)
            .filter_map(|anchor| {
                let href = anchor.value().attr("href")?;
                if !href.contains(FALLBACK_PATH_MARKER) {
                    return None;
                }
                let title = text_of(anchor);
                if title.chars().count() <= FALLBACK_MIN_TEXT_CHARS || !self.keeps_title(&title) {
                    return None;
                }
                let link = absolutize(base, href);
                seen.insert(link.clone()).then(|| Candidate {
                    title,
                    link,
                    ..Candidate::default()
                })
            })
            .collect();

        if candidates.is_empty() {
            return None;
        }
        tracing::info!(count = candidates.len(), "fell back to anchor scan");
        Some(candidates)
    }

    fn keeps_title(&self, title: &str) -> bool {
        title.chars().count() >= self.min_title_chars
    }
}

fn read_item(element: ElementRef, layout: &CompiledLayout, page_date: &str, base: &Url) -> Candidate {
    let link = layout.link.first_in(element);
    let image_url = layout.image.first_in(element);
    let time = layout.date.first_in(element);

    let date = match (page_date.is_empty(), time.is_empty()) {
        (false, false) => format!("{page_date} {time}"),
        (false, true) => page_date.to_string(),
        _ => time,
    };

    Candidate {
        title: layout.title.first_in(element),
        link: absolutize(base, &link),
        rubric: layout.rubric.first_in(element),
        date,
        image_url: absolutize(base, &image_url),
    }
}

/// Resolves `href` against the site origin; protocol-relative URLs get `https:`.
pub fn absolutize(base: &Url, href: &str) -> String {
    let href = href.trim();
    if href.is_empty() {
        return String::new();
    }
    if href.starts_with("//") {
        return format!("https:{href}");
    }
    match base.join(href) {
        Ok(url) => url.to_string(),
        Err(_) => href.to_string(),
    }
}

/// Visible text with whitespace runs collapsed to single spaces.
fn text_of(element: ElementRef) -> String {
    element
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

fn compile(pattern: &'static str) -> Result<Selector> {
    Selector::parse(pattern).map_err(|_| AppError::Selector(pattern.to_string()))
}

fn compile_all(patterns: &'static [&'static str]) -> Result<Vec<Selector>> {
    patterns.iter().copied().map(compile).collect()
}
