//! Table output for query hits and store listings using comfy-table.

use comfy_table::{presets, Attribute, Cell, Color, ContentArrangement, Table};
use std::env;

use crate::domain::models::ScoredChunk;

use super::truncate;

/// Table formatter for CLI output.
pub struct TableFormatter {
    /// Whether to use colors in output
    use_colors: bool,
}

impl TableFormatter {
    pub fn new() -> Self {
        Self {
            use_colors: supports_color(),
        }
    }

    pub fn with_colors(use_colors: bool) -> Self {
        Self { use_colors }
    }

    /// Format retrieval hits, one row per surviving file.
    pub fn format_hits(&self, hits: &[ScoredChunk]) -> String {
        let mut table = self.create_base_table();

        table.set_header(vec![
            Cell::new("Score").add_attribute(Attribute::Bold),
            Cell::new("Repository").add_attribute(Attribute::Bold),
            Cell::new("File").add_attribute(Attribute::Bold),
            Cell::new("Chunk").add_attribute(Attribute::Bold),
            Cell::new("Tokens").add_attribute(Attribute::Bold),
            Cell::new("Snippet").add_attribute(Attribute::Bold),
        ]);

        for hit in hits {
            let score_text = format!("{:.3}", hit.score);
            let score_cell = if self.use_colors {
                Cell::new(&score_text).fg(score_color(hit.score))
            } else {
                Cell::new(&score_text)
            };

            let chunk_pos = format!("{}/{}", hit.record.chunk_index + 1, hit.record.total_chunks);
            let snippet = truncate(&flatten_whitespace(&hit.record.text), 48);

            table.add_row(vec![
                score_cell,
                Cell::new(truncate(&hit.record.repo_url, 32)),
                Cell::new(truncate(&hit.record.file_path, 40)),
                Cell::new(chunk_pos),
                Cell::new(hit.record.token_count.to_string()),
                Cell::new(snippet),
            ]);
        }

        table.to_string()
    }

    /// Format the per-file chunk counts from a store listing.
    pub fn format_files(&self, files: &[(String, String, usize)]) -> String {
        let mut table = self.create_base_table();

        table.set_header(vec![
            Cell::new("Repository").add_attribute(Attribute::Bold),
            Cell::new("File").add_attribute(Attribute::Bold),
            Cell::new("Chunks").add_attribute(Attribute::Bold),
        ]);

        for (repo_url, file_path, chunks) in files {
            table.add_row(vec![
                Cell::new(truncate(repo_url, 40)),
                Cell::new(truncate(file_path, 48)),
                Cell::new(chunks.to_string()),
            ]);
        }

        table.to_string()
    }

    fn create_base_table(&self) -> Table {
        let mut table = Table::new();
        table
            .load_preset(presets::UTF8_FULL)
            .set_content_arrangement(ContentArrangement::Dynamic);
        table
    }
}

impl Default for TableFormatter {
    fn default() -> Self {
        Self::new()
    }
}

/// Check if color output is supported.
fn supports_color() -> bool {
    // Respect NO_COLOR environment variable
    if env::var("NO_COLOR").is_ok() {
        return false;
    }

    if let Ok(term) = env::var("TERM") {
        if term == "dumb" {
            return false;
        }
    }

    true
}

/// Map a similarity score to a color: strong matches green, weak ones dim.
fn score_color(score: f32) -> Color {
    if score >= 0.8 {
        Color::Green
    } else if score >= 0.5 {
        Color::Cyan
    } else {
        Color::DarkGrey
    }
}

/// Collapse whitespace runs so snippets stay on one table row.
fn flatten_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    use crate::domain::models::ChunkRecord;

    fn hit(file_path: &str, score: f32, text: &str) -> ScoredChunk {
        ScoredChunk {
            id: 1,
            record: ChunkRecord {
                repo_url: "https://example.com/repo".to_string(),
                file_path: file_path.to_string(),
                chunk_index: 0,
                total_chunks: 3,
                title: file_path.to_string(),
                text: text.to_string(),
                token_count: 12,
                file_type: "rs".to_string(),
                is_code: true,
                is_implementation: true,
                embedding: vec![0.0; 4],
                metadata_json: serde_json::json!({}),
                created_at: Utc::now(),
                updated_at: Utc::now(),
            },
            score,
        }
    }

    #[test]
    fn hits_table_shows_score_and_position() {
        let formatter = TableFormatter::with_colors(false);
        let rendered = formatter.format_hits(&[hit("src/lib.rs", 0.912, "pub fn answer()")]);

        assert!(rendered.contains("0.912"));
        assert!(rendered.contains("src/lib.rs"));
        assert!(rendered.contains("1/3"));
        assert!(rendered.contains("Snippet"));
    }

    #[test]
    fn snippets_are_flattened_to_one_line() {
        let formatter = TableFormatter::with_colors(false);
        let rendered = formatter.format_hits(&[hit("a.md", 0.5, "first\nsecond\n\nthird")]);

        assert!(rendered.contains("first second third"));
    }

    #[test]
    fn files_table_lists_chunk_counts() {
        let formatter = TableFormatter::with_colors(false);
        let rows = vec![(
            "https://example.com/repo".to_string(),
            "src/main.rs".to_string(),
            7,
        )];
        let rendered = formatter.format_files(&rows);

        assert!(rendered.contains("src/main.rs"));
        assert!(rendered.contains('7'));
    }

    #[test]
    fn score_colors_grade_by_strength() {
        assert_eq!(score_color(0.95), Color::Green);
        assert_eq!(score_color(0.6), Color::Cyan);
        assert_eq!(score_color(0.1), Color::DarkGrey);
    }
}
