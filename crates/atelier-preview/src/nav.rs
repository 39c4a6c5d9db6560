//! Navigation bar built from the page list.

use atelier_html::{Document, ElementData, NodeId, page_display_name};

/// Marker attribute of the generated navigation bar.
pub const NAV_MARKER: &str = "data-atelier-nav";

const ACTIVE_CLASS: &str = "active";

/// Build a detached `nav` listing every page, with `active` marked.
pub fn build_nav<S: AsRef<str>>(doc: &mut Document, pages: &[S], active: &str) -> NodeId {
    let nav = doc.create_element(ElementData::new("nav").with_attr(NAV_MARKER, ""));
    for page in pages {
        let page = page.as_ref();
        let mut link = ElementData::new("a")
            .with_attr("href", page)
            .with_attr("data-page", page);
        if page == active {
            link.set_attr("class", ACTIVE_CLASS);
            link.set_attr("aria-current", "page");
        }
        let link = doc.create_text_element(link, page_display_name(page));
        doc.append(nav, link);
    }
    nav
}

/// Put a fresh navigation bar in place of the first `nav` of `body`, or at
/// the top of `body` when the page has none.
pub fn install_nav<S: AsRef<str>>(doc: &mut Document, body: NodeId, pages: &[S], active: &str) {
    let nav = build_nav(doc, pages, active);
    match doc.find_all_in(body, "nav").into_iter().next() {
        Some(existing) => {
            doc.insert_before(existing, nav);
            doc.detach(existing);
        }
        None => {
            doc.prepend(body, nav);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn active_page_is_marked() {
        let mut doc = Document::parse("<body><main>x</main></body>");
        let (_, _, body) = doc.ensure_structure();
        install_nav(&mut doc, body, &["index.html", "blog/our-team.html"], "blog/our-team.html");

        let nav = doc.find_first("nav").unwrap();
        assert_eq!(doc.children(body)[0], nav);
        assert_eq!(
            doc.outer_html(nav),
            "<nav data-atelier-nav=\"\">\
             <a href=\"index.html\" data-page=\"index.html\">Index</a>\
             <a href=\"blog/our-team.html\" data-page=\"blog/our-team.html\" class=\"active\" aria-current=\"page\">Our Team</a>\
             </nav>"
        );
    }

    #[test]
    fn existing_nav_is_replaced_in_place() {
        let mut doc = Document::parse(
            "<body><header><nav><a href='#'>Old</a></nav></header><main>x</main></body>",
        );
        let (_, _, body) = doc.ensure_structure();
        install_nav(&mut doc, body, &["index.html"], "index.html");

        let navs = doc.find_all("nav");
        assert_eq!(navs.len(), 1);
        assert!(doc.is_element(doc.parent(navs[0]).unwrap(), "header"));
        assert!(!doc.text_content(navs[0]).contains("Old"));
    }
}
