//! Named range definitions
//!
//! Named ranges allow users to assign meaningful names to cells or ranges of cells,
//! making formulas easier to read and maintain.
//!
//! # Example
//!
//! ```text
//! // Define a named range "TaxRate" that refers to cell B1
//! workbook.define_name("TaxRate", "Sheet1!$B$1")?;
//!
//! // Use it in a formula
//! =Price * TaxRate
//! ```

use ahash::AHashMap;

/// Scope of a named range
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum NameScope {
    /// Available throughout the workbook (global)
    Workbook,
    /// Scoped to a specific sheet (local)
    Sheet(usize),
}

/// A named range definition
///
/// Named ranges can refer to:
/// - A single cell: `Sheet1!$A$1`
/// - A range of cells: `Sheet1!$A$1:$D$10`
/// - A constant value: `0.0725`
/// - A formula expression: `=SUM(Sales)`
#[derive(Debug, Clone)]
pub struct NamedRange {
    /// The name (e.g., "SalesData"); names are case-insensitive
    pub name: String,
    /// Scope of this name (workbook-wide or sheet-specific)
    pub scope: NameScope,
    /// What the name refers to, as reference, constant or `=formula` text
    pub refers_to: String,
}

impl NamedRange {
    /// Create a new named range
    pub fn new(name: impl Into<String>, refers_to: impl Into<String>, scope: NameScope) -> Self {
        Self {
            name: name.into(),
            scope,
            refers_to: refers_to.into(),
        }
    }

    /// Check if the refers_to is a formula (starts with =)
    pub fn is_formula(&self) -> bool {
        self.refers_to.starts_with('=')
    }

    /// Get the refers_to expression without the leading = if it's a formula
    pub fn expression(&self) -> &str {
        self.refers_to.strip_prefix('=').unwrap_or(&self.refers_to)
    }
}

/// Collection of named ranges with case-insensitive lookup
#[derive(Debug, Default, Clone)]
pub struct NamedRangeCollection {
    ranges: AHashMap<(String, NameScope), NamedRange>,
}

impl NamedRangeCollection {
    /// Create a new empty collection
    pub fn new() -> Self {
        Self::default()
    }

    fn make_key(name: &str, scope: &NameScope) -> (String, NameScope) {
        (name.to_lowercase(), scope.clone())
    }

    /// Define a new named range
    ///
    /// Returns an error if a name with the same scope already exists
    pub fn define(&mut self, range: NamedRange) -> Result<(), String> {
        let key = Self::make_key(&range.name, &range.scope);
        if self.ranges.contains_key(&key) {
            return Err(format!(
                "Named range '{}' already exists in this scope",
                range.name
            ));
        }
        self.ranges.insert(key, range);
        Ok(())
    }

    /// Get a named range by name and current sheet context
    ///
    /// A sheet-scoped name for `current_sheet` shadows a workbook-scoped one.
    pub fn get(&self, name: &str, current_sheet: Option<usize>) -> Option<&NamedRange> {
        if let Some(sheet) = current_sheet {
            if let Some(range) = self.ranges.get(&Self::make_key(name, &NameScope::Sheet(sheet))) {
                return Some(range);
            }
        }
        self.ranges
            .get(&Self::make_key(name, &NameScope::Workbook))
    }

    /// Remove a named range
    pub fn remove(&mut self, name: &str, scope: &NameScope) -> Option<NamedRange> {
        self.ranges.remove(&Self::make_key(name, scope))
    }

    /// Iterate over all named ranges
    pub fn iter(&self) -> impl Iterator<Item = &NamedRange> {
        self.ranges.values()
    }

    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }
}
