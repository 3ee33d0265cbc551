//! Terminal output: board headers, article tables and progress spinners.

use comfy_table::{Attribute, Cell, Color, ContentArrangement, Table};
use owo_colors::OwoColorize;
use std::io::IsTerminal;
use std::time::Duration;

use crate::engine::FeedState;
use crate::models::{Article, Board};

/// Check if stdout is a terminal.
pub fn is_terminal() -> bool {
    std::io::stdout().is_terminal()
}

/// Icon for a board's icon id.
pub fn board_icon(icon_id: &str) -> &'static str {
    match icon_id {
        "vaccine" => "💉",
        "pediatric" => "🧸",
        "general" => "🦠",
        "travel" => "✈️",
        "favorites" => "★",
        _ => "📄",
    }
}

/// Print a section header.
pub fn print_section(title: &str) {
    println!();
    println!("{}", format!("━━━ {} ━━━", title).bold().cyan());
}

/// Header line for a board.
pub fn print_board_header(board: &Board) {
    print_section(&format!("{} {}", board_icon(board.icon()), board.label));
}

/// Truncate to `max` characters, ending in "..." when cut.
pub fn truncate_with_ellipsis(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let head: String = text.chars().take(max.saturating_sub(3)).collect();
    format!("{}...", head)
}

/// Table of articles, each flagged with whether it is a favorite.
pub fn article_table(rows: &[(&Article, bool)]) -> Table {
    let mut table = Table::new();
    table.load_preset(comfy_table::presets::UTF8_FULL);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["", "PMID", "Title", "Authors", "Journal", "Date"]);

    for (article, favorite) in rows {
        let star = if *favorite {
            Cell::new("★").fg(Color::Yellow)
        } else {
            Cell::new("")
        };
        table.add_row(vec![
            star,
            Cell::new(&article.uid),
            Cell::new(truncate_with_ellipsis(&article.title, 80)).add_attribute(Attribute::Bold),
            Cell::new(article.author_line(3)),
            Cell::new(article.journal()),
            Cell::new(&article.pubdate),
        ]);
    }
    table
}

/// Status line under a board's table.
pub fn print_feed_footer(state: &FeedState) {
    if let Some(error) = state.error() {
        println!("{} {}", "✗".red().bold(), error);
        return;
    }
    if state.results().is_empty() {
        println!("{}", "No articles found".dimmed());
        return;
    }

    let more = if state.has_more() {
        format!("{} more available", state.total_ids() - state.cursor())
    } else {
        "end of results".to_string()
    };
    println!(
        "{} {} of {} ({})",
        "✓".green().bold(),
        state.results().len(),
        state.total_ids(),
        more.dimmed()
    );
}

/// Spinner shown while feeds are fetched.
pub struct Spinner {
    pb: indicatif::ProgressBar,
}

impl Spinner {
    /// Create a new spinner with the given message; hidden when `quiet`.
    pub fn new(msg: &str, quiet: bool) -> Self {
        let pb = if quiet || !is_terminal() {
            indicatif::ProgressBar::hidden()
        } else {
            indicatif::ProgressBar::new_spinner()
        };
        if let Ok(style) = indicatif::ProgressStyle::with_template("{spinner:.cyan} {msg}") {
            pb.set_style(style.tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ "));
        }
        pb.set_message(msg.to_string());
        pb.enable_steady_tick(Duration::from_millis(100));

        Self { pb }
    }

    /// Set the message.
    pub fn set_message(&self, msg: &str) {
        self.pb.set_message(msg.to_string());
    }

    /// Remove the spinner from the terminal.
    pub fn finish(&self) {
        self.pb.finish_and_clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::make_article;

    #[test]
    fn test_truncate_with_ellipsis() {
        assert_eq!(truncate_with_ellipsis("short", 10), "short");
        assert_eq!(truncate_with_ellipsis("abcdefghij", 6), "abc...");
        assert_eq!(truncate_with_ellipsis("ééééé", 4), "é...");
    }

    #[test]
    fn test_board_icon() {
        assert_eq!(board_icon("vaccine"), "💉");
        assert_eq!(board_icon("custom-1"), "📄");
    }

    #[test]
    fn test_article_table_rows() {
        let first = make_article("1");
        let second = make_article("2");
        let table = article_table(&[(&first, true), (&second, false)]);
        let rendered = table.to_string();
        assert!(rendered.contains("Article 1"));
        assert!(rendered.contains("★"));
        assert_eq!(table.row_iter().count(), 2);
    }
}
