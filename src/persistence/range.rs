use super::LedgerError;

/// A1-notation range such as `all_trading!A2:ZZ` or `data!B3`
///
/// Columns are 0-based, rows are 1-based as in the sheet itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellRange {
    pub sheet: String,
    pub start_col: usize,
    pub start_row: usize,
    pub end_col: usize,
    /// `None` when the range runs to the bottom of the sheet
    pub end_row: Option<usize>,
}

/// `A` -> 0, `Z` -> 25, `AA` -> 26
pub fn column_index(letters: &str) -> Option<usize> {
    if letters.is_empty() {
        return None;
    }
    letters.chars().try_fold(0usize, |acc, c| {
        c.is_ascii_uppercase()
            .then(|| acc * 26 + (c as usize - 'A' as usize + 1))
    })
    .map(|n| n - 1)
}

fn split_cell(cell: &str) -> Option<(usize, Option<usize>)> {
    let digits_at = cell.find(|c: char| c.is_ascii_digit()).unwrap_or(cell.len());
    let (letters, digits) = cell.split_at(digits_at);
    let col = column_index(letters)?;
    let row = if digits.is_empty() {
        None
    } else {
        Some(digits.parse::<usize>().ok().filter(|r| *r > 0)?)
    };
    Some((col, row))
}

impl CellRange {
    pub fn parse(raw: &str) -> Result<Self, LedgerError> {
        let invalid = || LedgerError::Range(raw.to_string());

        let (sheet, cells) = raw.split_once('!').ok_or_else(invalid)?;
        if sheet.is_empty() {
            return Err(invalid());
        }

        let (start, end) = match cells.split_once(':') {
            Some((start, end)) => (start, Some(end)),
            None => (cells, None),
        };

        let (start_col, start_row) = split_cell(start).ok_or_else(invalid)?;
        let start_row = start_row.ok_or_else(invalid)?;

        let (end_col, end_row) = match end {
            Some(end) => split_cell(end).ok_or_else(invalid)?,
            None => (start_col, Some(start_row)),
        };
        if end_col < start_col || end_row.is_some_and(|r| r < start_row) {
            return Err(invalid());
        }

        Ok(Self {
            sheet: sheet.to_string(),
            start_col,
            start_row,
            end_col,
            end_row,
        })
    }
}
