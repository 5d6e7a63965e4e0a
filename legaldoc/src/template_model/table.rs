//! Table types
//!
//! Table, row and cell properties are kept as verbatim markup; the engine only
//! edits the blocks inside each cell.

use super::blocks::Block;

/// A table: rows of cells
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    /// Verbatim `w:tblPr` and `w:tblGrid` markup
    pub properties_xml: Option<String>,

    /// Table rows in document order
    pub rows: Vec<TableRow>,
}

/// A table row
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TableRow {
    /// Verbatim `w:trPr` markup
    pub properties_xml: Option<String>,

    /// Cells in the row
    pub cells: Vec<TableCell>,
}

/// A table cell owning its own block sequence
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TableCell {
    /// Verbatim `w:tcPr` markup
    pub properties_xml: Option<String>,

    /// Cell content
    pub blocks: Vec<Block>,
}

impl Table {
    /// Create a table without properties
    pub fn new(rows: Vec<TableRow>) -> Self {
        Self {
            properties_xml: None,
            rows,
        }
    }

    /// Iterate every cell in row-major order
    pub fn cells(&self) -> impl Iterator<Item = &TableCell> {
        self.rows.iter().flat_map(|row| row.cells.iter())
    }

    /// Mutably iterate every cell in row-major order
    pub fn cells_mut(&mut self) -> impl Iterator<Item = &mut TableCell> {
        self.rows.iter_mut().flat_map(|row| row.cells.iter_mut())
    }
}

impl TableRow {
    /// Create a row without properties
    pub fn new(cells: Vec<TableCell>) -> Self {
        Self {
            properties_xml: None,
            cells,
        }
    }
}

impl TableCell {
    /// Create a cell without properties
    pub fn new(blocks: Vec<Block>) -> Self {
        Self {
            properties_xml: None,
            blocks,
        }
    }
}
