//! CLI output formatting for the `check` command.
//!
//! Output is content-first: every article is shown by its positional index
//! and title, with the source path as an indented `Source:` line underneath.
//!
//! ```text
//! docs (en, it)
//!     Origin: https://github.com/acme/docs.git
//!     Root: articles/
//!     en
//!         001 Installation
//!             Source: en/install.md
//!         002 Advanced introduction
//!             Source: en/intro-advanced.md
//!             Story: The basics (previous: intro)
//!     it
//!         001 Installazione
//!             Source: it/install.md
//!     Stories
//!         basics: The basics (starts at intro)
//!
//! Indexed 1 repository, 4 articles
//! ```
//!
//! As with every stage, `format_*` is pure and returns lines; `print_*` writes
//! them to stdout.

use crate::types::{Article, Repository};

fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

fn plural(n: usize, one: &str, many: &str) -> String {
    if n == 1 {
        format!("{n} {one}")
    } else {
        format!("{n} {many}")
    }
}

/// Header line for a repository: id plus languages.
fn repo_header(repo: &Repository) -> String {
    let mut langs = repo.languages.join(", ");
    if repo.fallback_enabled {
        langs.push_str(", fallback");
    }
    format!("{} ({})", repo.id, langs)
}

fn article_lines(index: usize, article: &Article, depth: usize) -> Vec<String> {
    let pad = indent(depth);
    let title = if article.title.is_empty() {
        format!("({})", article.slug)
    } else {
        article.title.clone()
    };
    let mut lines = vec![
        format!("{pad}{} {title}", format_index(index)),
        format!("{pad}    Source: {}", article.path),
    ];

    if let Some(story) = &article.story {
        let mut links = Vec::new();
        if !article.previous.is_empty() {
            links.push(format!("previous: {}", article.previous));
        }
        if !article.next.is_empty() {
            links.push(format!("next: {}", article.next));
        }
        let name = if story.name.is_empty() { &story.id } else { &story.name };
        if links.is_empty() {
            lines.push(format!("{pad}    Story: {name}"));
        } else {
            lines.push(format!("{pad}    Story: {name} ({})", links.join(", ")));
        }
    }
    lines
}

/// Inventory of indexed repositories.
pub fn format_index_output(repos: &[Repository]) -> Vec<String> {
    let mut lines = Vec::new();

    for (i, repo) in repos.iter().enumerate() {
        if i > 0 {
            lines.push(String::new());
        }
        lines.push(repo_header(repo));
        lines.push(format!("{}Origin: {}", indent(1), repo.origin));
        lines.push(format!("{}Root: {}/", indent(1), repo.root));

        for (lang, articles) in &repo.articles_grouped {
            lines.push(format!("{}{}", indent(1), lang));
            for (pos, article) in articles.iter().enumerate() {
                lines.extend(article_lines(pos + 1, article, 2));
            }
        }

        if !repo.stories.is_empty() {
            lines.push(format!("{}Stories", indent(1)));
            for story in repo.stories.values() {
                match &story.start_slug {
                    Some(start) => lines.push(format!(
                        "{}{}: {} (starts at {start})",
                        indent(2),
                        story.id,
                        story.name
                    )),
                    None => lines.push(format!("{}{}: {}", indent(2), story.id, story.name)),
                }
            }
        }
    }

    let articles: usize = repos.iter().map(|r| r.articles.len()).sum();
    lines.push(String::new());
    lines.push(format!(
        "Indexed {}, {}",
        plural(repos.len(), "repository", "repositories"),
        plural(articles, "article", "articles")
    ));
    lines
}

pub fn print_index_output(repos: &[Repository]) {
    for line in format_index_output(repos) {
        println!("{}", line);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{article, repository};
    use crate::types::Story;

    #[test]
    fn format_index_pads() {
        assert_eq!(format_index(1), "001");
        assert_eq!(format_index(42), "042");
        assert_eq!(format_index(1000), "1000");
    }

    #[test]
    fn plural_forms() {
        assert_eq!(plural(1, "article", "articles"), "1 article");
        assert_eq!(plural(0, "article", "articles"), "0 articles");
    }

    #[test]
    fn inventory_lists_languages_and_articles() {
        let repo = repository(
            "docs",
            vec![article("en", "intro", "Introduction"), article("it", "intro", "Introduzione")],
        );
        let lines = format_index_output(&[repo]);

        assert_eq!(
            lines,
            vec![
                "docs (en, it)",
                "    Origin: /srv/docs",
                "    Root: articles/",
                "    en",
                "        001 Introduction",
                "            Source: en/intro.md",
                "    it",
                "        001 Introduzione",
                "            Source: it/intro.md",
                "",
                "Indexed 1 repository, 2 articles",
            ]
        );
    }

    #[test]
    fn untitled_article_shows_slug() {
        let repo = repository("docs", vec![article("en", "setup", "")]);
        let lines = format_index_output(&[repo]);
        assert!(lines.contains(&"        001 (setup)".to_string()));
    }

    #[test]
    fn story_and_links_are_shown() {
        let story = Story {
            id: "basics".into(),
            name: "The basics".into(),
            description: String::new(),
            start_slug: Some("intro".into()),
        };
        let mut a = article("en", "intro", "Introduction");
        a.story_id = "basics".into();
        a.story = Some(story.clone());
        a.next = "more".into();
        let mut repo = repository("docs", vec![a]);
        repo.stories.insert("basics".into(), story);

        let lines = format_index_output(&[repo]);

        assert!(lines.contains(&"            Story: The basics (next: more)".to_string()));
        assert!(lines.contains(&"    Stories".to_string()));
        assert!(lines.contains(&"        basics: The basics (starts at intro)".to_string()));
    }

    #[test]
    fn fallback_mode_is_marked() {
        let mut repo = repository("docs", vec![article("en", "a", "A")]);
        repo.fallback_enabled = true;
        assert_eq!(format_index_output(&[repo])[0], "docs (en, fallback)");
    }

    #[test]
    fn repositories_are_separated_by_blank_line() {
        let lines = format_index_output(&[
            repository("a", vec![article("en", "x", "X")]),
            repository("b", vec![article("en", "y", "Y")]),
        ]);
        let b_header = lines.iter().position(|l| l == "b (en)").unwrap();
        assert_eq!(lines[b_header - 1], "");
        assert_eq!(lines.last().unwrap(), "Indexed 2 repositories, 2 articles");
    }
}
