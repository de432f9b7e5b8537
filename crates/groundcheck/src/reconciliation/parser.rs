use std::io::Read;

/// One data row of a bulk source file. Cells are addressed by position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SheetRow {
    /// 1-based line in the source, counting the header.
    pub(crate) line: u64,
    cells: Vec<String>,
}

impl SheetRow {
    pub(crate) fn new(line: u64, cells: Vec<String>) -> Self {
        Self { line, cells }
    }

    /// Trimmed cell text; blank cells read as absent.
    pub(crate) fn cell(&self, index: usize) -> Option<&str> {
        self.cells
            .get(index)
            .map(|cell| cell.trim())
            .filter(|cell| !cell.is_empty())
    }

    pub(crate) fn is_blank(&self) -> bool {
        self.cells.iter().all(|cell| cell.trim().is_empty())
    }
}

/// Read every data row, discarding the header line. Any read failure aborts
/// before the caller has written anything.
pub(crate) fn read_rows<R: Read>(reader: R) -> Result<Vec<SheetRow>, csv::Error> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut rows = Vec::new();
    for record in csv_reader.records() {
        let record = record?;
        let line = record.position().map(|pos| pos.line()).unwrap_or_default();
        let row = SheetRow::new(line, record.iter().map(str::to_string).collect());
        if !row.is_blank() {
            rows.push(row);
        }
    }

    Ok(rows)
}
