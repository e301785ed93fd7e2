//! Search result page, the query API wire shape.

use serde::{Deserialize, Serialize};

use super::FileRecord;

/// One page of search results.
///
/// Serializes to the shape the UI collaborator consumes:
/// `{records, nextOffset: int|null, total}`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SearchPage {
    /// Records on this page, in stable rank order
    pub records: Vec<FileRecord>,

    /// Offset of the next page, or `None` on the last page
    #[serde(rename = "nextOffset")]
    pub next_offset: Option<u64>,

    /// Total matches across all pages
    pub total: u64,
}

impl SearchPage {
    /// The empty page: no matches, no next offset.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Assemble a page, computing `next_offset` from the pagination
    /// window: present only while more records remain past this page.
    pub fn assemble(records: Vec<FileRecord>, offset: u64, limit: u64, total: u64) -> Self {
        let next_offset = if total > offset + limit {
            Some(offset + limit)
        } else {
            None
        };
        Self {
            records,
            next_offset,
            total,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_next_offset_progression() {
        let page = SearchPage::assemble(Vec::new(), 0, 10, 25);
        assert_eq!(page.next_offset, Some(10));

        let page = SearchPage::assemble(Vec::new(), 20, 10, 25);
        assert_eq!(page.next_offset, None);

        let page = SearchPage::assemble(Vec::new(), 0, 10, 10);
        assert_eq!(page.next_offset, None);
    }

    #[test]
    fn test_wire_shape_field_names() {
        let json = serde_json::to_value(SearchPage::assemble(Vec::new(), 0, 10, 25)).unwrap();
        assert_eq!(json["nextOffset"], 10);
        assert_eq!(json["total"], 25);
        assert!(json["records"].is_array());

        let last = serde_json::to_value(SearchPage::assemble(Vec::new(), 20, 10, 25)).unwrap();
        assert!(last["nextOffset"].is_null());
    }
}
