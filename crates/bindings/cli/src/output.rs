//! Text rendering for query results and index listings.

use indexmap::IndexMap;

use firms_grade::GraderResult;
use firms_store::{IndexStore, StoreResult};

/// How many ranked pieces each grader prints.
pub const RANKS_SHOWN: usize = 5;

/// Render rows under headers as a left-aligned, width-padded table.
pub fn render_table(headers: &[&str], rows: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.len()).collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate() {
            if i < widths.len() {
                widths[i] = widths[i].max(cell.len());
            }
        }
    }

    let mut out = String::new();
    let render_row = |cells: &[String]| -> String {
        cells
            .iter()
            .enumerate()
            .map(|(i, cell)| format!("{:<width$}", cell, width = widths[i]))
            .collect::<Vec<_>>()
            .join("  ")
            .trim_end()
            .to_string()
    };

    let header_cells: Vec<String> = headers.iter().map(|h| h.to_string()).collect();
    out.push_str(&render_row(&header_cells));
    out.push('\n');
    let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    out.push_str(&rule.join("  "));
    out.push('\n');
    for row in rows {
        out.push_str(&render_row(row));
        out.push('\n');
    }
    out
}

/// Render grader results, best grades first, top [`RANKS_SHOWN`] per grader.
pub fn render_grades(
    store: &impl IndexStore,
    grades: &IndexMap<String, Vec<GraderResult>>,
) -> StoreResult<String> {
    let mut rows = Vec::new();
    for (grader, results) in grades {
        let mut ordered = results.clone();
        ordered.sort_by(|a, b| {
            b.grade
                .partial_cmp(&a.grade)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        for (rank, result) in ordered.iter().take(RANKS_SHOWN).enumerate() {
            let name = store
                .piece(result.piece_id)?
                .map(|p| p.name)
                .unwrap_or_else(|| format!("piece {}", result.piece_id));
            rows.push(vec![
                grader.clone(),
                name,
                rank.to_string(),
                format!("{:.4}", result.grade),
            ]);
        }
    }
    if rows.is_empty() {
        return Ok("No matches.\n".to_string());
    }
    Ok(render_table(
        &["Grading Method", "Piece", "Rank", "Grade"],
        &rows,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use firms_store::MemoryStore;

    #[test]
    fn table_pads_columns() {
        let table = render_table(
            &["Name", "N"],
            &[
                vec!["short".into(), "1".into()],
                vec!["a much longer cell".into(), "23".into()],
            ],
        );
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[0].starts_with("Name"));
        assert!(lines[1].starts_with("----"));
        assert!(lines[2].starts_with("short "));
    }

    #[test]
    fn empty_grades_render_a_notice() {
        let store = MemoryStore::new();
        let grades: IndexMap<String, Vec<GraderResult>> =
            [("BM25".to_string(), Vec::new())].into_iter().collect();
        let text = render_grades(&store, &grades).unwrap();
        assert_eq!(text, "No matches.\n");
    }

    #[test]
    fn grades_are_sorted_and_capped() {
        let store = MemoryStore::new();
        let results: Vec<GraderResult> = (0..10)
            .map(|i| GraderResult::new(i, i as f64))
            .collect();
        let grades: IndexMap<String, Vec<GraderResult>> =
            [("BM25".to_string(), results)].into_iter().collect();
        let text = render_grades(&store, &grades).unwrap();
        // Header + rule + five ranked rows.
        assert_eq!(text.lines().count(), 2 + RANKS_SHOWN);
        // Highest grade first.
        assert!(text.lines().nth(2).unwrap().contains("9.0000"));
    }
}
