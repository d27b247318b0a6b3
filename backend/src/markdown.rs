use pulldown_cmark::{html, Options, Parser};

/// Renders a post body to HTML for detail responses.
pub fn render_html(markdown: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_FOOTNOTES);
    options.insert(Options::ENABLE_TASKLISTS);

    let parser = Parser::new_ext(markdown, options);
    let mut out = String::with_capacity(markdown.len() * 3 / 2);
    html::push_html(&mut out, parser);
    out
}

#[cfg(test)]
mod tests {
    use super::render_html;

    #[test]
    fn renders_headings_and_emphasis() {
        let html = render_html("# Hello\n\nSome *emphasis* here.");
        assert!(html.contains("<h1>Hello</h1>"));
        assert!(html.contains("<em>emphasis</em>"));
    }

    #[test]
    fn renders_tables() {
        let html = render_html("| a | b |\n|---|---|\n| 1 | 2 |");
        assert!(html.contains("<table>"));
    }

    #[test]
    fn plain_text_passes_through_as_paragraph() {
        let html = render_html("just words");
        assert_eq!(html.trim(), "<p>just words</p>");
    }
}
