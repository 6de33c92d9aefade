//! Editable color palette with tagged index ranges.
//!
//! The palette is an ordered, resizable color array shared by every part of
//! a model, plus a metadata overlay of tagged index ranges. All mutations
//! record their inverse into the document history.

use serde::{Deserialize, Serialize};

use crate::core::error::Error;
use crate::core::types::{Result, Vec4};
use crate::history::History;

use super::action::EditAction;
use super::data::ColorGroup;

/// 8-bit RGBA color
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba {
    /// Fully transparent black, the value of unset palette slots
    pub const TRANSPARENT: Rgba = Rgba {
        r: 0,
        g: 0,
        b: 0,
        a: 0,
    };

    /// Create a color from components
    pub fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Create a fully opaque color
    pub fn opaque(r: u8, g: u8, b: u8) -> Self {
        Self::new(r, g, b, 255)
    }

    /// Normalized RGBA vector
    pub fn to_vec4(self) -> Vec4 {
        Vec4::new(
            self.r as f32,
            self.g as f32,
            self.b as f32,
            self.a as f32,
        ) / 255.0
    }
}

/// A contiguous run of palette indices carrying a tag.
///
/// `end` is exclusive. An empty tag marks an untagged run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TagRange {
    pub start: usize,
    pub end: usize,
    pub tag: String,
}

impl TagRange {
    /// Create a tag range over `start..end`
    pub fn new(start: usize, end: usize, tag: impl Into<String>) -> Self {
        Self {
            start,
            end,
            tag: tag.into(),
        }
    }
}

/// Ordered, resizable color palette with a tagged-range overlay
pub struct Palette {
    colors: Vec<Rgba>,
    // Tagged runs only, ascending and non-overlapping. Gaps are untagged.
    ranges: Vec<TagRange>,
}

impl Palette {
    /// Create an empty palette
    pub fn new() -> Self {
        Self {
            colors: Vec::new(),
            ranges: Vec::new(),
        }
    }

    /// Number of colors
    pub fn len(&self) -> usize {
        self.colors.len()
    }

    /// Whether the palette holds no colors
    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    /// All colors in index order
    pub fn colors(&self) -> &[Rgba] {
        &self.colors
    }

    /// Color at an index. Out-of-range reads yield transparent.
    pub fn get(&self, index: usize) -> Rgba {
        self.colors.get(index).copied().unwrap_or(Rgba::TRANSPARENT)
    }

    /// Replace the color at an index, recording the single-slot inverse
    pub fn set_color(
        &mut self,
        index: usize,
        color: Rgba,
        history: &mut History<EditAction>,
    ) -> Result<()> {
        if index >= self.colors.len() {
            return Err(Error::PaletteIndex {
                index,
                len: self.colors.len(),
            });
        }
        history.record(
            "Modify palette.",
            EditAction::PaletteColor {
                index,
                color: self.colors[index],
            },
        );
        self.colors[index] = color;
        Ok(())
    }

    /// Resize the palette.
    ///
    /// Growing appends transparent entries; shrinking truncates, and the
    /// recorded inverse restores the removed tail exactly. Resizing to the
    /// current size records nothing.
    pub fn resize(&mut self, new_len: usize, history: &mut History<EditAction>) {
        use std::cmp::Ordering;

        match new_len.cmp(&self.colors.len()) {
            Ordering::Equal => {}
            Ordering::Greater => {
                history.record(
                    "Resize palette.",
                    EditAction::PaletteTruncate {
                        len: self.colors.len(),
                    },
                );
                self.colors.resize(new_len, Rgba::TRANSPARENT);
            }
            Ordering::Less => {
                let tail = self.colors.split_off(new_len);
                history.record("Resize palette.", EditAction::PaletteRestore { colors: tail });
            }
        }
    }

    /// Tag ranges materialized as a full partition of `0..len()`.
    ///
    /// Stored tagged runs are interleaved with untagged gap ranges, so the
    /// result covers the whole index domain in ascending order.
    pub fn tag_ranges(&self) -> Vec<TagRange> {
        let len = self.colors.len();
        let mut out = Vec::new();
        let mut cursor = 0;
        for range in &self.ranges {
            if range.start >= len {
                break;
            }
            if range.start > cursor {
                out.push(TagRange::new(cursor, range.start, ""));
            }
            out.push(TagRange::new(
                range.start,
                range.end.min(len),
                range.tag.clone(),
            ));
            cursor = range.end.min(len);
        }
        if cursor < len {
            out.push(TagRange::new(cursor, len, ""));
        }
        out
    }

    /// Tag covering a single index, if any
    pub fn tag_at(&self, index: usize) -> Option<&str> {
        self.ranges
            .iter()
            .find(|r| r.start <= index && index < r.end)
            .map(|r| r.tag.as_str())
    }

    /// Overwrite tags in `start..end` (end exclusive).
    ///
    /// Ranges straddling either boundary are trimmed and adjacent runs with
    /// the same tag coalesce. An empty tag erases tags over the span. The
    /// entire prior range list is recorded as one coarse undo snapshot.
    pub fn set_tag_range(
        &mut self,
        start: usize,
        end: usize,
        tag: impl Into<String>,
        history: &mut History<EditAction>,
    ) -> Result<()> {
        let len = self.colors.len();
        if start > end || end > len {
            return Err(Error::TagRange { start, end, len });
        }
        history.record(
            "Modify palette tags.",
            EditAction::PaletteTags {
                ranges: self.ranges.clone(),
            },
        );

        let mut next = Vec::with_capacity(self.ranges.len() + 1);
        for range in self.ranges.drain(..) {
            if range.end <= start || range.start >= end {
                next.push(range);
                continue;
            }
            if range.start < start {
                next.push(TagRange::new(range.start, start, range.tag.clone()));
            }
            if range.end > end {
                next.push(TagRange::new(end, range.end, range.tag));
            }
        }
        let tag = tag.into();
        if start < end && !tag.is_empty() {
            next.push(TagRange::new(start, end, tag));
        }
        next.sort_by_key(|r| r.start);

        // Coalesce adjacent runs with the same tag
        let mut merged: Vec<TagRange> = Vec::with_capacity(next.len());
        for range in next {
            if let Some(last) = merged.last_mut() {
                if last.end == range.start && last.tag == range.tag {
                    last.end = range.end;
                    continue;
                }
            }
            merged.push(range);
        }
        self.ranges = merged;
        Ok(())
    }

    /// Replace all colors and tags from ordered `(tags, colors)` groups.
    ///
    /// Load path - never recorded.
    pub fn load_groups(&mut self, groups: &[ColorGroup]) {
        self.colors.clear();
        self.ranges.clear();
        for group in groups {
            let start = self.colors.len();
            self.colors.extend_from_slice(&group.colors);
            if !group.tags.is_empty() {
                self.ranges
                    .push(TagRange::new(start, self.colors.len(), group.tags.clone()));
            }
        }
    }

    pub(crate) fn replace_color(&mut self, index: usize, color: Rgba) -> Rgba {
        std::mem::replace(&mut self.colors[index], color)
    }

    pub(crate) fn truncate_colors(&mut self, len: usize) -> Vec<Rgba> {
        self.colors.split_off(len)
    }

    pub(crate) fn extend_colors(&mut self, tail: Vec<Rgba>) -> usize {
        let old_len = self.colors.len();
        self.colors.extend(tail);
        old_len
    }

    pub(crate) fn replace_ranges(&mut self, ranges: Vec<TagRange>) -> Vec<TagRange> {
        std::mem::replace(&mut self.ranges, ranges)
    }
}

impl Default for Palette {
    fn default() -> Self {
        Self::new()
    }
}
