//! Paginated listing results

use std::ops::Index;

use crate::resource::BlobResourceInfo;
use crate::traits::ListCursor;

/// One page of a listing plus the state needed to fetch the next one
#[derive(Debug)]
pub struct PartialCollection {
    items: Vec<BlobResourceInfo>,
    has_more: bool,
    cursor: Option<ListCursor>,
}

impl PartialCollection {
    pub(crate) fn new(
        items: Vec<BlobResourceInfo>,
        has_more: bool,
        cursor: Option<ListCursor>,
    ) -> Self {
        Self {
            items,
            has_more,
            cursor,
        }
    }

    /// Whether the backend reported further pages when this one was fetched
    pub fn has_more(&self) -> bool {
        self.has_more
    }

    /// Continuation cursor, present whenever `has_more` is true
    pub fn cursor(&self) -> Option<&ListCursor> {
        self.cursor.as_ref()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, BlobResourceInfo> {
        self.items.iter()
    }

    /// Take the page items, dropping the cursor
    pub fn into_items(self) -> Vec<BlobResourceInfo> {
        self.items
    }
}

impl Index<usize> for PartialCollection {
    type Output = BlobResourceInfo;

    fn index(&self, index: usize) -> &Self::Output {
        &self.items[index]
    }
}

impl IntoIterator for PartialCollection {
    type Item = BlobResourceInfo;
    type IntoIter = std::vec::IntoIter<BlobResourceInfo>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

impl<'a> IntoIterator for &'a PartialCollection {
    type Item = &'a BlobResourceInfo;
    type IntoIter = std::slice::Iter<'a, BlobResourceInfo>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}
