//! Fixed values synthesized into pages that lack them.

pub const DEFAULT_CHARSET: &str = "UTF-8";
pub const DEFAULT_VIEWPORT: &str = "width=device-width, initial-scale=1.0";
pub const DEFAULT_LANG: &str = "en";

/// Stylesheet injected when a page has no inline style block in its head.
pub const DEFAULT_STYLESHEET: &str = "\n* { margin: 0; padding: 0; box-sizing: border-box; }
body { font-family: 'Roboto', sans-serif; background: #ffffff; color: #333333; line-height: 1.6; }
h1, h2, h3 { font-family: 'Playfair Display', serif; color: #1e40af; margin-bottom: 20px; }
header { background: #ffffff; box-shadow: 0 2px 5px rgba(0, 0, 0, 0.1); padding: 20px; text-align: center; }
nav a { color: #1e40af; margin: 0 15px; text-decoration: none; font-weight: 600; }
nav a:hover { color: #3b82f6; }
nav a.active { border-bottom: 2px solid #1e40af; }
main { max-width: 1200px; margin: 0 auto; padding: 20px; background: #ffffff; }
button { background: #1e40af; color: #ffffff; padding: 10px 20px; border: none; border-radius: 5px; cursor: pointer; }
button:hover { background: #3b82f6; }
footer { background: #f8fafc; color: #4b5563; padding: 20px; text-align: center; }
.product-card { display: grid; gap: 20px; padding: 15px; border: 1px solid #ddd; border-radius: 8px; box-shadow: 0 2px 5px rgba(0,0,0,0.1); }
@keyframes fadeIn { 0% { opacity: 0; } 100% { opacity: 1; } }
@keyframes slideIn { 0% { transform: translateX(-100%); } 100% { transform: translateX(0); } }
.animated { animation: fadeIn 0.5s ease-in-out; }
i { margin-right: 8px; }
";

/// Phrases that open a paragraph of generator meta-commentary.
pub const COMMENTARY_MARKERS: &[&str] = &[
    "this code creates",
    "this html page is designed",
    "here is",
    "here's",
    "generated by",
    "explanation",
    "note:",
    "description:",
];

/// Tags whose first appearance marks the start of real page content.
pub const MEANINGFUL_TAGS: &[&str] = &[
    "h1", "h2", "h3", "h4", "h5", "h6", "header", "nav", "main", "section", "article", "aside",
    "div", "form", "table", "figure", "ul", "ol", "img", "picture", "video", "iframe", "canvas",
    "svg", "script", "style", "template", "noscript",
];

/// Prose-level nodes that may be pruned when they precede real content.
pub const PREAMBLE_TAGS: &[&str] = &[
    "p", "span", "a", "b", "i", "u", "em", "strong", "small", "code", "pre", "blockquote", "br",
    "hr",
];
