//! Text rendering of the gallery grid

use crate::gallery::Gallery;

pub const TITLE: &str = "MY GALLERY APP";

/// Width of one grid cell, in characters
const CELL_WIDTH: usize = 24;

const EMPTY_MESSAGE: &str = "No photos yet. Take or upload one to get started.";

/// Fewest name characters a cell shows, however long its index
const MIN_LABEL: usize = 4;

/// Short label for a reference: its last path segment, cut to `max` chars
fn cell_label(reference: &str, max: usize) -> String {
    let name = reference
        .trim_end_matches(['/', '\\'])
        .rsplit(['/', '\\'])
        .next()
        .filter(|name| !name.is_empty())
        .unwrap_or(reference);

    if name.chars().count() > max {
        let mut label: String = name.chars().take(max - 1).collect();
        label.push('~');
        label
    } else {
        name.to_string()
    }
}

/// Render the title, the grid and the available actions
pub fn render(gallery: &Gallery, columns: usize) -> String {
    let mut out = String::new();
    out.push_str(TITLE);
    out.push('\n');
    out.push_str(&"=".repeat(TITLE.len()));
    out.push('\n');

    if gallery.is_empty() {
        out.push_str(EMPTY_MESSAGE);
        out.push('\n');
    } else {
        for row in gallery.rows(columns) {
            let line: String = row
                .iter()
                .map(|(index, reference)| {
                    let prefix = format!("[{}] ", index + 1);
                    // One column is kept free as the separator
                    let room = (CELL_WIDTH - 1)
                        .saturating_sub(prefix.len())
                        .max(MIN_LABEL);
                    let cell = format!("{}{}", prefix, cell_label(reference, room));
                    format!("{:<width$} ", cell, width = CELL_WIDTH - 1)
                })
                .collect();
            out.push_str(line.trim_end());
            out.push('\n');
        }
        out.push_str(&format!("{} photo(s)\n", gallery.len()));
    }

    out.push('\n');
    out.push_str("[t] Take Photo   [u] Upload Photo   [l] List   [q] Quit");
    out
}
