//! Dispatch id assignment.
//!
//! Ids follow the sorted order of the generated identifiers, never the file
//! scan order, so a fixed set of declarations always produces the same table.

use rustc_hash::FxHashMap;
use serde::Serialize;

use rpcgen_common::{DeclError, DeclErrorKind, Method};

/// Largest number of methods a `std::uint16_t` id can address; `0xFFFF`
/// is the name lookup's not-found sentinel.
pub const MAX_METHODS: usize = u16::MAX as usize;

/// One method with its assigned id.
#[derive(Debug, Clone, Serialize)]
pub struct DispatchEntry {
    pub id: u16,
    pub identifier: String,
    pub method: Method,
}

/// All methods of a run, ordered by dispatch id.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DispatchTable {
    entries: Vec<DispatchEntry>,
}

impl DispatchTable {
    /// Assign ids `0..N` in identifier order.
    ///
    /// Two methods mapping to one identifier is an error naming both
    /// declarations; so is a table that does not fit 16-bit ids.
    pub fn assign(methods: Vec<Method>, id_prefix: &str) -> Result<DispatchTable, DeclError> {
        let mut keyed: Vec<(String, Method)> = methods
            .into_iter()
            .map(|m| (m.identifier(id_prefix), m))
            .collect();
        // Stable: among equal identifiers the first scanned stays first, and
        // is the one the duplicate error points back to.
        keyed.sort_by(|a, b| a.0.cmp(&b.0));

        let mut seen: FxHashMap<&str, usize> = FxHashMap::default();
        for (i, (identifier, method)) in keyed.iter().enumerate() {
            if let Some(&first) = seen.get(identifier.as_str()) {
                let first = &keyed[first].1;
                return Err(located(
                    method,
                    DeclErrorKind::DuplicateMethod {
                        identifier: identifier.clone(),
                        name: method.full_name.clone(),
                        first: first.location.clone(),
                    },
                ));
            }
            seen.insert(identifier, i);
        }

        if keyed.len() > MAX_METHODS {
            let count = keyed.len();
            return Err(located(
                &keyed[MAX_METHODS].1,
                DeclErrorKind::TooManyMethods { count },
            ));
        }

        let entries = keyed
            .into_iter()
            .enumerate()
            .map(|(id, (identifier, method))| DispatchEntry {
                id: id as u16,
                identifier,
                method,
            })
            .collect();
        Ok(DispatchTable { entries })
    }

    pub fn entries(&self) -> &[DispatchEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &DispatchEntry> {
        self.entries.iter()
    }
}

/// Errors found after scanning carry no line text; the location is enough
/// to re-read it for the report.
fn located(method: &Method, kind: DeclErrorKind) -> DeclError {
    DeclError::new(
        kind,
        method.location.file.clone(),
        method.location.line,
        String::new(),
        method.location.span,
    )
}
