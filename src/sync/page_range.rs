// Page range selection: "1,3,5-8,10" -> ascending, de-duplicated page set

use std::collections::BTreeSet;

/// Highest page number a range expression can name. Matches the 16-bit page
/// index of the rendering backend.
pub const MAX_PAGE_NUMBER: u32 = u16::MAX as u32;

/// Which pages initial marks are reproduced onto, and which pages a batch
/// export includes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum PageRangeSelection {
    #[default]
    All,
    /// Ascending, de-duplicated 1-based page numbers.
    Custom(Vec<u32>),
}

impl PageRangeSelection {
    /// Parse a range expression into a custom selection.
    ///
    /// Grammar: `range := term (',' term)*`, `term := NUMBER | NUMBER '-' NUMBER`.
    /// Whitespace around tokens is ignored. Invalid tokens, page 0 and
    /// inverted ranges (`10-8`) contribute nothing; parsing never fails.
    pub fn parse(text: &str) -> Self {
        PageRangeSelection::Custom(parse_page_range(text))
    }

    /// Selection typed by a user: blank or `all` (any case) selects every
    /// page, anything else goes through [`PageRangeSelection::parse`].
    pub fn from_text(text: &str) -> Self {
        match text.trim() {
            "" => PageRangeSelection::All,
            t if t.eq_ignore_ascii_case("all") => PageRangeSelection::All,
            t => PageRangeSelection::parse(t),
        }
    }

    /// Build a custom selection from arbitrary page numbers.
    pub fn custom(pages: impl IntoIterator<Item = u32>) -> Self {
        let set: BTreeSet<u32> = pages
            .into_iter()
            .filter(|p| (1..=MAX_PAGE_NUMBER).contains(p))
            .collect();
        PageRangeSelection::Custom(set.into_iter().collect())
    }

    pub fn is_all(&self) -> bool {
        matches!(self, PageRangeSelection::All)
    }

    /// Whether marks should be reproduced onto `page`.
    ///
    /// An empty custom selection includes no page.
    pub fn includes(&self, page: u32) -> bool {
        match self {
            PageRangeSelection::All => true,
            PageRangeSelection::Custom(pages) => pages.binary_search(&page).is_ok(),
        }
    }

    /// Pages of a `page_count`-page document covered by a batch export.
    ///
    /// `All` and an empty custom selection both cover every page; pages past
    /// the end of the document are dropped.
    pub fn export_pages(&self, page_count: u32) -> Vec<u32> {
        match self {
            PageRangeSelection::Custom(pages) if !pages.is_empty() => pages
                .iter()
                .copied()
                .filter(|&p| p <= page_count)
                .collect(),
            _ => (1..=page_count).collect(),
        }
    }

    /// Whether a batch export of this selection is a "selected pages" export.
    pub fn is_subset_export(&self) -> bool {
        matches!(self, PageRangeSelection::Custom(pages) if !pages.is_empty())
    }

    /// Canonical range expression, collapsing consecutive runs (`1,3,5-8,10`).
    ///
    /// `All` serializes to `"all"`.
    pub fn to_range_text(&self) -> String {
        let pages = match self {
            PageRangeSelection::All => return "all".to_string(),
            PageRangeSelection::Custom(pages) => pages,
        };

        let mut parts: Vec<String> = Vec::new();
        let mut iter = pages.iter().copied().peekable();
        while let Some(start) = iter.next() {
            let mut end = start;
            while let Some(&next) = iter.peek() {
                if next == end + 1 {
                    end = next;
                    iter.next();
                } else {
                    break;
                }
            }
            if start == end {
                parts.push(start.to_string());
            } else {
                parts.push(format!("{start}-{end}"));
            }
        }
        parts.join(",")
    }
}

/// Parse a range expression into ascending, de-duplicated page numbers.
pub fn parse_page_range(text: &str) -> Vec<u32> {
    let mut pages = BTreeSet::new();

    for part in text.split(',') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }

        if let Some((start_str, end_str)) = part.split_once('-') {
            let (Ok(start), Ok(end)) = (
                start_str.trim().parse::<u32>(),
                end_str.trim().parse::<u32>(),
            ) else {
                continue;
            };
            if start > end {
                continue;
            }
            let start = start.max(1);
            let end = end.min(MAX_PAGE_NUMBER);
            pages.extend(start..=end);
        } else if let Ok(page) = part.parse::<u32>()
            && (1..=MAX_PAGE_NUMBER).contains(&page)
        {
            pages.insert(page);
        }
    }

    pages.into_iter().collect()
}
