//! Markdown to HTML, applied to article bodies when they are served.

use crate::types::Article;
use pulldown_cmark::{Options, Parser, html as md_html};

/// Render CommonMark (plus tables, strikethrough and task lists) to HTML.
pub fn markdown_to_html(markdown: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TASKLISTS);

    let parser = Parser::new_ext(markdown, options);
    let mut html = String::with_capacity(markdown.len() * 3 / 2);
    md_html::push_html(&mut html, parser);
    html
}

/// Copy of `article` with its body rendered to HTML.
pub fn rendered(article: &Article) -> Article {
    Article {
        body: markdown_to_html(&article.body),
        ..article.clone()
    }
}
