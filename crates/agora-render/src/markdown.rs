use pulldown_cmark::{Options, Parser, html};

/// Render markdown source to HTML.
///
/// CommonMark plus tables and strikethrough. Raw inline HTML passes through
/// unchanged; escaping untrusted input is the templating layer's job.
/// Nothing is cached, so every call re-parses the source.
pub fn markdown_to_html(source: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);

    let parser = Parser::new_ext(source, options);
    let mut out = String::with_capacity(source.len() + source.len() / 2);
    html::push_html(&mut out, parser);
    out
}
