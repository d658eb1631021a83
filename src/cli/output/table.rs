//! Table output for research summaries using comfy-table.

use comfy_table::{presets, Attribute, Cell, Color, ContentArrangement, Table};
use std::env;

use super::truncate;
use crate::domain::models::FinalAnswer;

const DESCRIPTION_WIDTH: usize = 60;

/// Per-subtask summary of a finished research run.
pub struct SubtaskTable {
    use_colors: bool,
}

struct Row {
    index: usize,
    id: String,
    description: String,
    rounds: String,
    retries: String,
    outcome: (&'static str, Color),
}

impl SubtaskTable {
    /// Colors follow `NO_COLOR` and `TERM`.
    pub fn new() -> Self {
        Self {
            use_colors: supports_color(),
        }
    }

    /// Force colors on or off.
    pub const fn with_colors(use_colors: bool) -> Self {
        Self { use_colors }
    }

    /// One row per subtask in declaration order, resolved or not.
    pub fn render(&self, answer: &FinalAnswer) -> String {
        let mut rows: Vec<Row> = answer
            .contributing_subtask_results
            .iter()
            .map(|result| Row {
                index: result.subtask_id.index(),
                id: result.subtask_id.to_string(),
                description: result.description.clone(),
                rounds: result.search_rounds.to_string(),
                retries: result.retry_count.to_string(),
                outcome: if result.accepted {
                    ("answered", Color::Green)
                } else {
                    ("best effort", Color::Yellow)
                },
            })
            .chain(answer.unresolved_subtasks.iter().map(|unresolved| Row {
                index: unresolved.subtask_id.index(),
                id: unresolved.subtask_id.to_string(),
                description: unresolved.description.clone(),
                rounds: "-".to_string(),
                retries: "-".to_string(),
                outcome: ("unresolved", Color::Red),
            }))
            .collect();
        rows.sort_by_key(|row| row.index);

        let mut table = Table::new();
        table
            .load_preset(presets::UTF8_FULL)
            .set_content_arrangement(ContentArrangement::Dynamic)
            .set_header(
                ["ID", "Subtask", "Rounds", "Retries", "Outcome"]
                    .map(|h| Cell::new(h).add_attribute(Attribute::Bold)),
            );

        for row in rows {
            let (label, color) = row.outcome;
            let outcome = if self.use_colors {
                Cell::new(label).fg(color)
            } else {
                Cell::new(label)
            };
            table.add_row(vec![
                Cell::new(row.id),
                Cell::new(truncate(&row.description, DESCRIPTION_WIDTH)),
                Cell::new(row.rounds),
                Cell::new(row.retries),
                outcome,
            ]);
        }

        table.to_string()
    }
}

impl Default for SubtaskTable {
    fn default() -> Self {
        Self::new()
    }
}

/// Check if color output is supported
fn supports_color() -> bool {
    if env::var("NO_COLOR").is_ok() {
        return false;
    }
    !matches!(env::var("TERM").as_deref(), Ok("dumb"))
}
