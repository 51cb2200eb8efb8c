//! Table (list object) metadata used by structured references like `Sales[Amount]`

use crate::cell::RangeAddress;
use lazy_regex::regex_captures;

/// Which part of a table a structured reference selects
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableSpecifier {
    /// `Table[#All]`: headers, data and totals
    All,
    /// `Table[#Data]` or `Table[]`: data rows only
    Data,
    /// `Table[#Headers]`
    Headers,
    /// `Table[#Totals]`
    Totals,
    /// `Table[Column]`: data rows of one column
    Column(String),
}

/// A parsed structured reference
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableReference {
    pub table: String,
    pub specifier: TableSpecifier,
}

impl TableReference {
    /// Parse `Name[Column]`, `Name[#All]`, `Name[#Data]`, `Name[#Headers]`, `Name[#Totals]`
    /// or `Name[]`. Returns `None` for anything else.
    pub fn parse(text: &str) -> Option<Self> {
        let (_, table, inner) = regex_captures!(r"^([A-Za-z_\\][\w.]*)\[([^\[\]]*)\]$", text.trim())?;
        let specifier = match inner.trim().to_ascii_lowercase().as_str() {
            "" | "#data" => TableSpecifier::Data,
            "#all" => TableSpecifier::All,
            "#headers" => TableSpecifier::Headers,
            "#totals" => TableSpecifier::Totals,
            _ => TableSpecifier::Column(inner.trim().to_string()),
        };
        Some(Self {
            table: table.to_string(),
            specifier,
        })
    }
}

/// A table occupying a rectangular region of one worksheet
#[derive(Debug, Clone)]
pub struct Table {
    pub name: String,
    /// Full extent including the header row and, when present, the totals row
    pub range: RangeAddress,
    pub columns: Vec<String>,
    pub has_header: bool,
    pub has_totals: bool,
}

impl Table {
    /// Resolve a specifier to the cells it covers
    pub fn resolve(&self, specifier: &TableSpecifier) -> Option<RangeAddress> {
        let first_data = self.range.from_row + u32::from(self.has_header);
        let last_data = self.range.to_row - u32::from(self.has_totals);
        let span = |from_row: u32, to_row: u32, from_col: u32, to_col: u32| {
            (from_row <= to_row).then(|| {
                RangeAddress::new(
                    self.range.worksheet.clone(),
                    from_row,
                    from_col,
                    to_row,
                    to_col,
                )
            })
        };

        match specifier {
            TableSpecifier::All => Some(self.range.clone()),
            TableSpecifier::Data => span(first_data, last_data, self.range.from_col, self.range.to_col),
            TableSpecifier::Headers if self.has_header => span(
                self.range.from_row,
                self.range.from_row,
                self.range.from_col,
                self.range.to_col,
            ),
            TableSpecifier::Totals if self.has_totals => span(
                self.range.to_row,
                self.range.to_row,
                self.range.from_col,
                self.range.to_col,
            ),
            TableSpecifier::Headers | TableSpecifier::Totals => None,
            TableSpecifier::Column(name) => {
                let index = self
                    .columns
                    .iter()
                    .position(|c| c.eq_ignore_ascii_case(name))?;
                let col = self.range.from_col + index as u32;
                span(first_data, last_data, col, col)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sales() -> Table {
        Table {
            name: "Sales".into(),
            range: RangeAddress::new(Some("Sheet1".into()), 1, 1, 5, 2),
            columns: vec!["Region".into(), "Amount".into()],
            has_header: true,
            has_totals: true,
        }
    }

    #[test]
    fn test_parse_reference() {
        let r = TableReference::parse("Sales[Amount]").unwrap();
        assert_eq!(r.table, "Sales");
        assert_eq!(r.specifier, TableSpecifier::Column("Amount".into()));
        assert_eq!(
            TableReference::parse("Sales[#All]").unwrap().specifier,
            TableSpecifier::All
        );
        assert!(TableReference::parse("A1:B2").is_none());
    }

    #[test]
    fn test_resolve_column_excludes_header_and_totals() {
        let table = sales();
        let amount = table
            .resolve(&TableSpecifier::Column("amount".into()))
            .unwrap();
        assert_eq!((amount.from_row, amount.to_row), (2, 4));
        assert_eq!((amount.from_col, amount.to_col), (2, 2));
        assert_eq!(table.resolve(&TableSpecifier::All).unwrap(), table.range);
        assert!(table
            .resolve(&TableSpecifier::Column("Missing".into()))
            .is_none());
    }
}
