use atelier_html::{Document, Fallback, NormalizeOptions, Normalizer, normalize_page};

fn normalize(raw: &str) -> String {
    normalize_page(raw, "about.html", &NormalizeOptions::default()).expect("recoverable input")
}

/// Structural postconditions every normalized page must satisfy.
fn assert_canonical(html: &str) {
    assert!(html.starts_with("<!DOCTYPE html>"), "missing doctype: {html}");
    assert!(html.ends_with("</html>"), "missing closing tag: {html}");

    let doc = Document::parse(html);
    assert_eq!(doc.find_all("head").len(), 1);
    assert_eq!(doc.find_all("body").len(), 1);

    let body = doc.body().unwrap();
    let footers = doc.find_all("footer");
    assert_eq!(footers.len(), 1, "expected one footer: {html}");
    let last_element = doc
        .children(body)
        .into_iter()
        .filter(|id| doc.element(*id).is_some())
        .last();
    assert_eq!(last_element, Some(footers[0]));

    let head = doc.head().unwrap();
    assert!(doc.find_child(head, "style").is_some());
    assert!(
        doc.children(head)
            .iter()
            .any(|id| doc.element(*id).map(|el| el.has_attr("charset")).unwrap_or(false))
    );
}

#[test]
fn fenced_response_becomes_complete_page() {
    let raw = "Here is the page you asked for:\n```html\n<h1>About us</h1>\n<p>We sell flowers.</p>\n```\nLet me know!";
    let html = normalize(raw);
    assert_canonical(&html);
    assert!(html.contains("<title>About - My Website</title>"));
    assert!(html.contains("<h1>About us</h1>"));
    assert!(!html.contains("Let me know"));
    assert!(!html.contains("```"));
}

#[test]
fn explanatory_paragraphs_are_removed() {
    let raw = "<body><p>This code creates a landing page.</p><section><h2>Shop</h2></section><p>Explanation: the section above lists products.</p><p>Open every day.</p></body>";
    let html = normalize(raw);
    assert!(!html.contains("This code creates"));
    assert!(!html.contains("Explanation:"));
    assert!(html.contains("Open every day."));
}

#[test]
fn preamble_before_first_meaningful_tag_is_pruned() {
    let raw = "Sure thing! <b>Enjoy</b><header><nav></nav></header><main>Body</main>";
    let html = normalize(raw);
    assert!(!html.contains("Sure thing"));
    assert!(!html.contains("Enjoy"));
    assert!(html.contains("<main>Body</main>"));
}

#[test]
fn footer_is_moved_to_the_end() {
    let raw = "<body><footer><p>Contact</p></footer><main>one</main><section>two</section></body>";
    let html = normalize(raw);
    assert_canonical(&html);
    let main = html.find("<main>").unwrap();
    let section = html.find("<section>").unwrap();
    let footer = html.find("<footer>").unwrap();
    assert!(main < section && section < footer);
    assert!(html.contains("Contact"));
}

#[test]
fn duplicate_footers_are_merged() {
    let raw = "<main>x</main><footer>first</footer><div>y</div><footer>second</footer>";
    let html = normalize(raw);
    assert_canonical(&html);
    assert!(html.contains("first"));
    assert!(html.contains("second"));
}

#[test]
fn missing_footer_is_synthesized() {
    let html = normalize_page("<main>x</main>", "our-team.html", &NormalizeOptions::default())
        .unwrap();
    assert_canonical(&html);
    assert!(html.contains("\u{a9} Our Team. All rights reserved."));
}

#[test]
fn existing_title_is_replaced_and_deduplicated() {
    let raw = "<html><head><title>Untitled</title><title>Again</title></head><body><main></main></body></html>";
    let html = normalize(raw);
    assert_eq!(html.matches("<title>").count(), 1);
    assert!(html.contains("<title>About - My Website</title>"));
}

#[test]
fn existing_style_block_is_kept() {
    let raw = "<html><head><style>body { color: red; }</style></head><body><main></main></body></html>";
    let html = normalize(raw);
    assert_eq!(html.matches("<style>").count(), 1);
    assert!(html.contains("body { color: red; }"));
}

#[test]
fn malformed_markup_is_repaired() {
    let raw = "<div><p>unclosed <b>bold <i>both</b> italic</div><table><td>cell";
    let html = normalize(raw);
    assert_canonical(&html);
    assert!(html.contains("cell"));
}

#[test]
fn normalization_is_idempotent() {
    let inputs = [
        "<h1>Hello</h1>",
        "```html\n<!DOCTYPE html><html><head><title>x</title></head><body><nav><a href=\"a.html\">A</a></nav><footer>f</footer><p>after</p></body></html>\n```",
        "<p>text</p><table><tr><td>1</td></tr></table><pre>\n\n  code</pre>",
        "<div><p>unclosed <b>bold <i>both</b> italic</div><textarea>\nnote</textarea>",
        "<svg viewBox=\"0 0 10 10\"><title>icon</title><path d=\"M0 0\"/></svg><p>&nbsp;&amp;&lt;</p>",
        "<script>if (a < b && c) { go(); }</script><main class=\"map-container\" data-map=\"1\">m</main>",
        "Note: the following markup is experimental\n<section>Fleurs</section>",
    ];
    for raw in inputs {
        let once = normalize(raw);
        assert_canonical(&once);
        let twice = normalize(&once);
        assert_eq!(once, twice, "not idempotent for input {raw:?}");
    }
}

#[test]
fn attributes_keep_source_order() {
    let raw = "<main class=\"map-container\" data-map=\"1\" id=\"m\">m</main>\
        <img src=\"a.jpg\" alt=\"a\" width=\"10\" height=\"20\">";
    let once = normalize(raw);
    assert!(once.contains("<main class=\"map-container\" data-map=\"1\" id=\"m\">"), "{once}");
    assert!(once.contains("<img src=\"a.jpg\" alt=\"a\" width=\"10\" height=\"20\">"), "{once}");
    for _ in 0..3 {
        assert_eq!(normalize(&once), once);
    }
}

#[test]
fn title_stays_after_head_metas_on_reparse() {
    let once = normalize("<h1>Hello</h1>");
    let twice = normalize(&once);
    for html in [&once, &twice] {
        let charset = html.find("<meta charset").unwrap();
        let viewport = html.find("name=\"viewport\"").unwrap();
        let title = html.find("<title>").unwrap();
        assert!(charset < title && viewport < title, "{html}");
    }
    assert_eq!(once, twice);
}

#[test]
fn irrecoverable_input_falls_back() {
    let mut normalizer = Normalizer::new(NormalizeOptions::default());
    let error = normalizer.normalize("Here is nothing useful.", "shop.html");
    assert_eq!(error.fallback, Some(Fallback::ErrorPage));
    assert_canonical(&error.html);

    let good = normalizer.normalize("<main>Shop</main>", "shop.html");
    assert!(good.fallback.is_none());

    let again = normalizer.normalize("```html\n```", "shop.html");
    assert_eq!(again.fallback, Some(Fallback::LastKnownGood));
    assert_eq!(again.html, good.html);
}
