//! Reading and patching rendered pages.
//!
//! [`scraper::Html`] is not `Send`, so a page is parsed once into
//! [`PageParts`] and everything after that works on strings.

use std::collections::HashMap;
use std::ops::Range;

use scraper::{ElementRef, Html, Selector};
use url::Url;

/// A stylesheet `<link>` found outside the body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeadStylesheet {
    pub href: String,
    /// The link's `rel` as written, so alternate sheets stay alternate.
    pub rel: String,
    pub media: Option<String>,
    pub title: Option<String>,
}

impl HeadStylesheet {
    fn from_element(el: &ElementRef<'_>) -> Option<Self> {
        let attrs = el.value();
        Some(Self {
            href: attrs.attr("href")?.to_string(),
            rel: attrs.attr("rel")?.trim().to_string(),
            media: attrs.attr("media").map(str::to_string),
            title: attrs.attr("title").map(str::to_string),
        })
    }
}

/// What the assembler needs from a rendered page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageParts {
    /// Base for relative references: `<base href>` if present, else the page URL.
    pub base: Url,
    /// Serialized children of `<body>`.
    pub body_html: String,
    /// Stylesheet links outside the body, in document order.
    pub head_stylesheets: Vec<HeadStylesheet>,
    /// `href`s of stylesheet links inside the body.
    pub body_stylesheets: Vec<String>,
    /// Image URLs inside the body from `src` and `srcset`, first occurrence only.
    pub images: Vec<String>,
    /// Distinct `srcset` values of `<img>` and `<source>` inside the body.
    pub srcsets: Vec<String>,
    /// Contents of `<style>` elements inside the body.
    pub inline_styles: Vec<String>,
}

/// Parse `html` rendered from `page_url`.
///
/// Returns `None` when the page has no `<body>` or the body is empty.
pub fn extract(html: &str, page_url: &Url) -> Option<PageParts> {
    let document = Html::parse_document(html);

    let body_sel = Selector::parse("body").ok()?;
    let base_sel = Selector::parse("base[href]").ok()?;
    let link_sel = Selector::parse("link[rel][href]").ok()?;
    let img_sel = Selector::parse("img[src]").ok()?;
    let srcset_sel = Selector::parse("img[srcset], source[srcset]").ok()?;
    let style_sel = Selector::parse("style").ok()?;

    let body = document.select(&body_sel).next()?;
    let body_html = body.inner_html();
    if body_html.trim().is_empty() {
        return None;
    }

    let base = document
        .select(&base_sel)
        .next()
        .and_then(|el| el.value().attr("href"))
        .and_then(|href| page_url.join(href.trim()).ok())
        .unwrap_or_else(|| page_url.clone());

    let head_stylesheets = document
        .select(&link_sel)
        .filter(|el| is_stylesheet(el) && !inside(el, &body))
        .filter_map(|el| HeadStylesheet::from_element(&el))
        .collect();

    let body_stylesheets = body
        .select(&link_sel)
        .filter(is_stylesheet)
        .filter_map(|el| el.value().attr("href"))
        .map(str::to_string)
        .collect();

    let mut images: Vec<String> = Vec::new();
    let mut srcsets: Vec<String> = Vec::new();
    let mut add_image = |src: &str| {
        if !images.iter().any(|seen| seen == src) {
            images.push(src.to_string());
        }
    };
    for src in body.select(&img_sel).filter_map(|el| el.value().attr("src")) {
        add_image(src);
    }
    for srcset in body.select(&srcset_sel).filter_map(|el| el.value().attr("srcset")) {
        for span in srcset_urls(srcset) {
            add_image(&srcset[span]);
        }
        if !srcsets.iter().any(|seen| seen == srcset) {
            srcsets.push(srcset.to_string());
        }
    }

    let inline_styles = body
        .select(&style_sel)
        .map(|el| el.text().collect::<String>())
        .filter(|css| !css.trim().is_empty())
        .collect();

    Some(PageParts {
        base,
        body_html,
        head_stylesheets,
        body_stylesheets,
        images,
        srcsets,
        inline_styles,
    })
}

fn is_stylesheet(el: &ElementRef<'_>) -> bool {
    el.value().attr("rel").is_some_and(|rel| {
        rel.split_ascii_whitespace()
            .any(|token| token.eq_ignore_ascii_case("stylesheet"))
    })
}

fn inside(el: &ElementRef<'_>, container: &ElementRef<'_>) -> bool {
    el.ancestors().any(|node| node.id() == container.id())
}

/// Point every `attr="original"` in serialized `html` at `replacement`.
pub fn replace_attribute(html: &str, attr: &str, original: &str, replacement: &str) -> String {
    // Serializers differ on whether `<` and `>` are escaped inside attributes.
    for escape_angles in [false, true] {
        let needle = format!(" {}=\"{}\"", attr, escape_attribute(original, escape_angles));
        if html.contains(&needle) {
            let with = format!(" {}=\"{}\"", attr, escape_attribute(replacement, false));
            return html.replace(&needle, &with);
        }
    }
    html.to_string()
}

/// Swap the text of the first `<style>` element whose content is `original`.
pub fn replace_style(html: &str, original: &str, replacement: &str) -> String {
    if original == replacement {
        return html.to_string();
    }

    let mut from = 0;
    while let Some(found) = html[from..].find("<style") {
        let open = from + found;
        let after_name = &html[open + "<style".len()..];
        if !after_name.starts_with(|c: char| c == '>' || c.is_ascii_whitespace()) {
            from = open + 1;
            continue;
        }
        let Some(gt) = after_name.find('>') else {
            break;
        };
        let content = open + "<style".len() + gt + 1;
        let rest = &html[content..];
        if rest.starts_with(original) && rest[original.len()..].starts_with("</style>") {
            return format!("{}{}{}", &html[..content], replacement, &rest[original.len()..]);
        }
        from = content;
    }
    html.to_string()
}

/// Byte ranges of the URLs in a `srcset` value, skipping the descriptors.
pub fn srcset_urls(srcset: &str) -> Vec<Range<usize>> {
    let bytes = srcset.as_bytes();
    let len = bytes.len();
    let mut urls = Vec::new();
    let mut i = 0;

    loop {
        while i < len && (bytes[i].is_ascii_whitespace() || bytes[i] == b',') {
            i += 1;
        }
        if i >= len {
            return urls;
        }

        let start = i;
        while i < len && !bytes[i].is_ascii_whitespace() {
            i += 1;
        }
        let mut end = i;
        while end > start && bytes[end - 1] == b',' {
            end -= 1;
        }
        if end > start {
            urls.push(start..end);
        }
        if end < i {
            // A trailing comma ends the candidate with no descriptors.
            continue;
        }

        let mut parens = 0usize;
        while i < len {
            match bytes[i] {
                b'(' => parens += 1,
                b')' => parens = parens.saturating_sub(1),
                b',' if parens == 0 => break,
                _ => {}
            }
            i += 1;
        }
    }
}

/// `srcset` with every URL found in `localized` replaced by its local path.
pub fn rewrite_srcset(srcset: &str, localized: &HashMap<String, String>) -> String {
    let mut out = String::with_capacity(srcset.len());
    let mut cursor = 0;
    for span in srcset_urls(srcset) {
        if let Some(local) = localized.get(&srcset[span.clone()]) {
            out.push_str(&srcset[cursor..span.start]);
            out.push_str(local);
            cursor = span.end;
        }
    }
    out.push_str(&srcset[cursor..]);
    out
}

/// A `<link>` element for a stylesheet hoisted out of `<head>`, pointing at `href`.
pub fn stylesheet_link(sheet: &HeadStylesheet, href: &str) -> String {
    let mut link = format!(
        "<link rel=\"{}\" href=\"{}\"",
        escape_attribute(&sheet.rel, true),
        escape_attribute(href, true)
    );
    if let Some(media) = &sheet.media {
        link.push_str(&format!(" media=\"{}\"", escape_attribute(media, true)));
    }
    if let Some(title) = &sheet.title {
        link.push_str(&format!(" title=\"{}\"", escape_attribute(title, true)));
    }
    link.push('>');
    link
}

fn escape_attribute(value: &str, escape_angles: bool) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '\u{a0}' => out.push_str("&nbsp;"),
            '<' if escape_angles => out.push_str("&lt;"),
            '>' if escape_angles => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
    out
}
