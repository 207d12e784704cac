use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

use super::{CellRange, Ledger, LedgerResult, Rows};

/// Process-local ledger with the same range semantics as the spreadsheet
///
/// Used when no spreadsheet credentials are configured, and by tests.
#[derive(Debug, Default)]
pub struct MemoryLedger {
    sheets: RwLock<HashMap<String, Rows>>,
}

fn is_blank(row: &[String]) -> bool {
    row.iter().all(|cell| cell.is_empty())
}

fn trim_trailing_blanks(row: &mut Vec<String>) {
    while row.last().is_some_and(|cell| cell.is_empty()) {
        row.pop();
    }
}

fn write_rows(grid: &mut Rows, first_row: usize, first_col: usize, rows: Rows) {
    for (offset, values) in rows.into_iter().enumerate() {
        let r = first_row + offset;
        if grid.len() <= r {
            grid.resize(r + 1, Vec::new());
        }
        let row = &mut grid[r];
        for (col_offset, value) in values.into_iter().enumerate() {
            let c = first_col + col_offset;
            if row.len() <= c {
                row.resize(c + 1, String::new());
            }
            row[c] = value;
        }
    }
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Write `rows` at `range`, logging instead of failing on a bad range
    pub async fn seed(&self, range: &str, rows: Rows) {
        if let Err(e) = self.update(range, rows).await {
            tracing::warn!("Cannot seed {}: {}", range, e);
        }
    }

    /// Every populated row of `sheet`, starting at row 1
    pub async fn snapshot(&self, sheet: &str) -> Rows {
        let sheets = self.sheets.read().await;
        let mut rows = sheets.get(sheet).cloned().unwrap_or_default();
        while rows.last().is_some_and(|row| is_blank(row)) {
            rows.pop();
        }
        rows
    }
}

#[async_trait]
impl Ledger for MemoryLedger {
    async fn read(&self, range: &str) -> LedgerResult<Rows> {
        let range = CellRange::parse(range)?;
        let sheets = self.sheets.read().await;
        let Some(grid) = sheets.get(&range.sheet) else {
            return Ok(Vec::new());
        };

        let last_row = range.end_row.unwrap_or(grid.len()).min(grid.len());
        let mut rows: Rows = (range.start_row..=last_row)
            .map(|r| {
                let row = &grid[r - 1];
                let end = (range.end_col + 1).min(row.len());
                let mut cells = if range.start_col < end {
                    row[range.start_col..end].to_vec()
                } else {
                    Vec::new()
                };
                trim_trailing_blanks(&mut cells);
                cells
            })
            .collect();

        while rows.last().is_some_and(|row| row.is_empty()) {
            rows.pop();
        }
        Ok(rows)
    }

    async fn update(&self, range: &str, rows: Rows) -> LedgerResult<()> {
        let range = CellRange::parse(range)?;
        let mut sheets = self.sheets.write().await;
        let grid = sheets.entry(range.sheet.clone()).or_default();
        write_rows(grid, range.start_row - 1, range.start_col, rows);
        Ok(())
    }

    async fn append(&self, range: &str, rows: Rows) -> LedgerResult<()> {
        let range = CellRange::parse(range)?;
        let mut sheets = self.sheets.write().await;
        let grid = sheets.entry(range.sheet.clone()).or_default();

        let after = grid
            .iter()
            .rposition(|row| !is_blank(row))
            .map(|last| last + 1)
            .unwrap_or(0)
            .max(range.start_row - 1);
        write_rows(grid, after, range.start_col, rows);
        Ok(())
    }

    async fn clear(&self, range: &str) -> LedgerResult<()> {
        let range = CellRange::parse(range)?;
        let mut sheets = self.sheets.write().await;
        let Some(grid) = sheets.get_mut(&range.sheet) else {
            return Ok(());
        };

        let last_row = range.end_row.unwrap_or(grid.len()).min(grid.len());
        for r in range.start_row..=last_row {
            let row = &mut grid[r - 1];
            let end = (range.end_col + 1).min(row.len());
            for cell in row.iter_mut().take(end).skip(range.start_col) {
                cell.clear();
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|c| c.to_string()).collect()
    }

    #[tokio::test]
    async fn test_read_respects_bounds() {
        let ledger = MemoryLedger::new();
        ledger
            .seed(
                "data!A1",
                vec![row(&["k1", "v1", "x"]), row(&["k2", "v2"]), row(&["k3", "v3"])],
            )
            .await;

        let rows = ledger.read("data!A1:B2").await.unwrap();
        assert_eq!(rows, vec![row(&["k1", "v1"]), row(&["k2", "v2"])]);

        let rows = ledger.read("data!B2:B9").await.unwrap();
        assert_eq!(rows, vec![row(&["v2"]), row(&["v3"])]);
    }

    #[tokio::test]
    async fn test_unknown_sheet_reads_empty() {
        let ledger = MemoryLedger::new();
        assert!(ledger.read("nothing!A1:B2").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_clear_then_read_is_empty() {
        let ledger = MemoryLedger::new();
        ledger
            .seed("trading_details!A2", vec![row(&["a", "b"]), row(&["c", "d"])])
            .await;
        ledger.clear("trading_details!A2:ZZ").await.unwrap();

        assert!(ledger.read("trading_details!A2:ZZ").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_append_goes_below_last_row() {
        let ledger = MemoryLedger::new();
        ledger.seed("book!A1", vec![row(&["header"]), row(&["one"])]).await;
        ledger.append("book!A1", vec![row(&["two"])]).await.unwrap();
        ledger.append("book!A1", vec![row(&["three"])]).await.unwrap();

        assert_eq!(
            ledger.snapshot("book").await,
            vec![row(&["header"]), row(&["one"]), row(&["two"]), row(&["three"])]
        );
    }

    #[tokio::test]
    async fn test_single_cell_update_extends_row() {
        let ledger = MemoryLedger::new();
        ledger.seed("book!A2", vec![row(&["x", "y"])]).await;
        ledger
            .update("book!E2", vec![row(&["97.5"])])
            .await
            .unwrap();

        assert_eq!(
            ledger.read("book!A2:ZZ").await.unwrap(),
            vec![row(&["x", "y", "", "", "97.5"])]
        );
    }

    #[tokio::test]
    async fn test_bad_range_is_rejected() {
        let ledger = MemoryLedger::new();
        assert!(ledger.update("no-sheet", vec![]).await.is_err());
    }
}
