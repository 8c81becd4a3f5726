//! The attributed document store.
//!
//! A single mutable rich-text buffer: characters live in a rope, style lives
//! in a run-length list of [`TextAttributes`] that partitions the character
//! range with no gaps and no overlaps. All offsets are in characters (Unicode
//! scalar values) and every range is half-open.
//!
//! Every mutating operation validates its arguments before touching any
//! state, so a call either applies completely or fails with
//! [`Error::OutOfBounds`] and leaves the document unchanged.
//!
//! Lookups stay logarithmic in document size: run starts are indexed for
//! binary search and paragraph bounds come from the rope's line index.

use std::ops::Range;

use ropey::Rope;
use serde::{Deserialize, Serialize};

use super::TextAttributes;
use crate::error::{Error, Result};

/// A maximal character range sharing one attribute set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeRun {
    /// Covered characters
    pub range: Range<usize>,

    /// Attributes of every character in `range`
    pub attributes: TextAttributes,
}

impl AttributeRun {
    /// Number of characters in the run.
    pub fn len(&self) -> usize {
        self.range.len()
    }

    /// Check if the run covers no characters (only the empty-document run).
    pub fn is_empty(&self) -> bool {
        self.range.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Slot {
    len: usize,
    attributes: TextAttributes,
}

/// Rich-text buffer with run-length encoded attributes.
#[derive(Debug, Clone)]
pub struct AttributedDocument {
    text: Rope,
    slots: Vec<Slot>,
    /// Start offset of each slot, parallel to `slots`
    starts: Vec<usize>,
    default_attributes: TextAttributes,
    revision: u64,
}

impl AttributedDocument {
    /// Create an empty document with default attributes.
    pub fn new() -> Self {
        Self::with_default_attributes(TextAttributes::default())
    }

    /// Create an empty document whose sentinel run carries `attributes`.
    pub fn with_default_attributes(attributes: TextAttributes) -> Self {
        let attributes = attributes.clamped();
        Self {
            text: Rope::new(),
            slots: vec![Slot {
                len: 0,
                attributes: attributes.clone(),
            }],
            starts: vec![0],
            default_attributes: attributes,
            revision: 0,
        }
    }

    /// Create a document holding `text` in a single run.
    pub fn from_text(text: &str, attributes: TextAttributes) -> Self {
        let mut doc = Self::with_default_attributes(attributes.clone());
        doc.replace_content(text, attributes);
        doc
    }

    /// Create a document from consecutive `(text, attributes)` pieces.
    ///
    /// Equal neighbours coalesce; empty pieces are dropped.
    pub fn from_runs<I, S>(runs: I, default_attributes: TextAttributes) -> Self
    where
        I: IntoIterator<Item = (S, TextAttributes)>,
        S: AsRef<str>,
    {
        let mut doc = Self::with_default_attributes(default_attributes);
        let mut text = String::new();
        let mut slots = Vec::new();
        for (piece, attributes) in runs {
            let piece = piece.as_ref();
            text.push_str(piece);
            slots.push(Slot {
                len: piece.chars().count(),
                attributes: attributes.clamped(),
            });
        }
        doc.text = Rope::from_str(&text);
        doc.slots = slots;
        doc.normalize();
        doc
    }

    /// Number of characters.
    pub fn len(&self) -> usize {
        self.text.len_chars()
    }

    /// Check if the document holds no characters.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Monotonic counter bumped by every mutation.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Attributes used for the empty-document run.
    pub fn default_attributes(&self) -> &TextAttributes {
        &self.default_attributes
    }

    /// The full character sequence.
    pub fn text(&self) -> String {
        self.text.to_string()
    }

    /// Characters in `range`.
    pub fn slice(&self, range: Range<usize>) -> Result<String> {
        self.check_range(&range)?;
        Ok(self.text.slice(range).to_string())
    }

    /// Character at `offset`, if any.
    pub fn char_at(&self, offset: usize) -> Option<char> {
        if offset < self.len() {
            Some(self.text.char(offset))
        } else {
            None
        }
    }

    /// Iterate characters starting at `offset` (clamped to the end).
    pub fn chars_from(&self, offset: usize) -> ropey::iter::Chars<'_> {
        self.text.chars_at(offset.min(self.len()))
    }

    /// Number of attribute runs.
    pub fn run_count(&self) -> usize {
        self.slots.len()
    }

    /// All attribute runs in document order.
    pub fn runs(&self) -> Vec<AttributeRun> {
        self.slots
            .iter()
            .zip(&self.starts)
            .map(|(slot, &start)| AttributeRun {
                range: start..start + slot.len,
                attributes: slot.attributes.clone(),
            })
            .collect()
    }

    /// Runs overlapping `range`, clipped to it.
    pub fn runs_in(&self, range: Range<usize>) -> Result<Vec<AttributeRun>> {
        Ok(self.iter_runs(range)?.collect())
    }

    /// Lazily iterate the runs overlapping `range`, clipped to it.
    ///
    /// Only the overlapping runs are visited, so walking a line costs the
    /// same in a short document and a long one.
    pub fn iter_runs(
        &self,
        range: Range<usize>,
    ) -> Result<impl Iterator<Item = AttributeRun> + '_> {
        self.check_range(&range)?;
        let (lo, hi) = (range.start, range.end);
        let first = if range.is_empty() {
            self.slots.len()
        } else {
            self.slot_index(lo)
        };
        Ok(self.slots[first..]
            .iter()
            .zip(&self.starts[first..])
            .take_while(move |(_, start)| **start < hi)
            .map(move |(slot, &start)| AttributeRun {
                range: start.max(lo)..(start + slot.len).min(hi),
                attributes: slot.attributes.clone(),
            }))
    }

    /// The run covering `offset`.
    ///
    /// Valid offsets are `0..len`; an empty document answers offset 0 with its
    /// zero-length default run.
    pub fn attributes_at(&self, offset: usize) -> Result<AttributeRun> {
        let length = self.len();
        if length == 0 && offset == 0 {
            return Ok(AttributeRun {
                range: 0..0,
                attributes: self.slots[0].attributes.clone(),
            });
        }
        if offset >= length {
            return Err(Error::out_of_bounds(offset, length));
        }

        let index = self.slot_index(offset);
        let start = self.starts[index];
        let slot = &self.slots[index];
        Ok(AttributeRun {
            range: start..start + slot.len,
            attributes: slot.attributes.clone(),
        })
    }

    /// Replace the whole document with `new_text` in a single run.
    pub fn replace_content(&mut self, new_text: &str, attributes: TextAttributes) {
        self.text = Rope::from_str(new_text);
        self.slots = vec![Slot {
            len: self.text.len_chars(),
            attributes: attributes.clamped(),
        }];
        self.normalize();
        self.revision += 1;
    }

    /// Overwrite the attributes of every character in `range`.
    ///
    /// Adjacent runs with equal attributes coalesce. An empty range is a
    /// no-op.
    pub fn apply_attributes(&mut self, range: Range<usize>, attributes: TextAttributes) -> Result<()> {
        self.check_range(&range)?;
        if range.is_empty() {
            return Ok(());
        }

        let first = self.split_at(range.start);
        let last = self.split_at(range.end);
        self.slots.splice(
            first..last,
            [Slot {
                len: range.len(),
                attributes: attributes.clamped(),
            }],
        );
        self.normalize();
        self.revision += 1;
        Ok(())
    }

    /// Transform the attributes of each run inside `range` independently.
    ///
    /// Used for single-field control changes, which must not flatten a mixed
    /// selection into one run.
    pub fn update_attributes<F>(&mut self, range: Range<usize>, mut update: F) -> Result<()>
    where
        F: FnMut(&TextAttributes) -> TextAttributes,
    {
        self.check_range(&range)?;
        if range.is_empty() {
            return Ok(());
        }

        let first = self.split_at(range.start);
        let last = self.split_at(range.end);
        for slot in &mut self.slots[first..last] {
            slot.attributes = update(&slot.attributes).clamped();
        }
        self.normalize();
        self.revision += 1;
        Ok(())
    }

    /// Insert `text` at `offset` carrying `attributes`.
    pub fn insert(&mut self, offset: usize, text: &str, attributes: TextAttributes) -> Result<()> {
        self.replace_range(offset..offset, text, attributes)
    }

    /// Delete the characters in `range`.
    pub fn delete(&mut self, range: Range<usize>) -> Result<()> {
        let attributes = self.default_attributes.clone();
        self.replace_range(range, "", attributes)
    }

    /// Replace the characters in `range` with `text` carrying `attributes`.
    pub fn replace_range(
        &mut self,
        range: Range<usize>,
        text: &str,
        attributes: TextAttributes,
    ) -> Result<()> {
        self.check_range(&range)?;
        let inserted = text.chars().count();
        if range.is_empty() && inserted == 0 {
            return Ok(());
        }

        let first = self.split_at(range.start);
        let last = self.split_at(range.end);
        self.slots.splice(
            first..last,
            [Slot {
                len: inserted,
                attributes: attributes.clamped(),
            }],
        );

        self.text.remove(range.clone());
        self.text.insert(range.start, text);

        self.normalize();
        self.revision += 1;
        Ok(())
    }

    /// The paragraph containing `offset`, including its trailing newline.
    ///
    /// `offset` is clamped to the document length; an offset just past a
    /// final newline yields the empty trailing paragraph.
    pub fn paragraph_range(&self, offset: usize) -> Range<usize> {
        let length = self.len();
        let offset = offset.min(length);
        let lines = self.text.len_lines();

        // The rope also breaks lines at CR, VT, FF and the Unicode
        // separators; only '\n' ends a paragraph, so skip over the others.
        let mut line = self.text.char_to_line(offset);
        let mut start = self.text.line_to_char(line);
        while start > 0 && self.text.char(start - 1) != '\n' {
            line -= 1;
            start = self.text.line_to_char(line);
        }

        let mut line = self.text.char_to_line(offset) + 1;
        let mut end = length;
        while line < lines {
            let next = self.text.line_to_char(line);
            if self.text.char(next - 1) == '\n' {
                end = next;
                break;
            }
            line += 1;
        }

        start..end
    }

    /// Smallest range of whole paragraphs covering `range`.
    pub fn paragraph_bounds(&self, range: Range<usize>) -> Result<Range<usize>> {
        self.check_range(&range)?;
        let start = self.paragraph_range(range.start).start;
        let end = if range.is_empty() {
            self.paragraph_range(range.start).end
        } else {
            self.paragraph_range(range.end - 1).end
        };
        Ok(start..end)
    }

    /// Number of paragraphs (newline-separated blocks, at least one).
    pub fn paragraph_count(&self) -> usize {
        1 + self.text.chars().filter(|&c| c == '\n').count()
    }

    fn check_range(&self, range: &Range<usize>) -> Result<()> {
        let length = self.len();
        if range.start > length {
            return Err(Error::out_of_bounds(range.start, length));
        }
        if range.end > length || range.end < range.start {
            return Err(Error::out_of_bounds(range.end, length));
        }
        Ok(())
    }

    /// Index of the slot covering `offset`, which must be below `len()`.
    fn slot_index(&self, offset: usize) -> usize {
        self.starts
            .partition_point(|&start| start <= offset)
            .saturating_sub(1)
    }

    /// Ensure a run boundary at `offset`, returning the index of the slot
    /// that starts there (or `slots.len()` at the end of the document).
    fn split_at(&mut self, offset: usize) -> usize {
        if offset >= self.len() {
            return self.slots.len();
        }
        let index = self.slot_index(offset);
        let start = self.starts[index];
        if offset == start {
            return index;
        }

        let head = offset - start;
        let tail = Slot {
            len: self.slots[index].len - head,
            attributes: self.slots[index].attributes.clone(),
        };
        self.slots[index].len = head;
        self.slots.insert(index + 1, tail);
        self.starts.insert(index + 1, offset);
        index + 1
    }

    /// Drop empty slots and coalesce equal neighbours, restoring the single
    /// default run when the document is empty.
    fn normalize(&mut self) {
        let mut merged: Vec<Slot> = Vec::with_capacity(self.slots.len());
        for slot in self.slots.drain(..) {
            if slot.len == 0 {
                continue;
            }
            match merged.last_mut() {
                Some(prev) if prev.attributes == slot.attributes => prev.len += slot.len,
                _ => merged.push(slot),
            }
        }
        if merged.is_empty() {
            merged.push(Slot {
                len: 0,
                attributes: self.default_attributes.clone(),
            });
        }

        self.starts.clear();
        let mut start = 0;
        for slot in &merged {
            self.starts.push(start);
            start += slot.len;
        }
        self.slots = merged;
    }
}

impl Default for AttributedDocument {
    fn default() -> Self {
        Self::new()
    }
}
