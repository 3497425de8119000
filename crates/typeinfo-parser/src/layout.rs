//! Record layout following the System V rules.
//!
//! Fields are placed in declaration order at the next offset aligned to
//! their type. Bit-fields are packed into storage units of their declared
//! type and move to the next unit only when they would straddle one. The
//! record's size is rounded up to its alignment.

use typeinfo_core::descriptor::Layout;

/// Layout input for one field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct FieldSlot {
    /// Layout of the declared type. A flexible array member passes a zero
    /// size with its element alignment.
    pub layout: Layout,
    pub bit_width: Option<u64>,
    /// Unnamed bit-fields do not contribute to the record's alignment.
    pub named: bool,
}

impl FieldSlot {
    pub fn new(layout: Layout) -> Self {
        Self {
            layout,
            bit_width: None,
            named: true,
        }
    }

    pub fn bit_field(layout: Layout, width: u64, named: bool) -> Self {
        Self {
            layout,
            bit_width: Some(width),
            named,
        }
    }
}

/// Result of laying out a record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RecordLayout {
    pub layout: Layout,
    /// Offset of each field in bits, in input order.
    pub offsets: Vec<u64>,
}

fn align_up(value: u64, alignment: u64) -> Option<u64> {
    if alignment <= 1 {
        Some(value)
    } else {
        value.div_ceil(alignment).checked_mul(alignment)
    }
}

fn finish(bits: u64, alignment: u64, offsets: Vec<u64>) -> Option<RecordLayout> {
    let size = align_up(bits.div_ceil(8), alignment)?;
    Some(RecordLayout {
        layout: Layout::new(size, alignment),
        offsets,
    })
}

/// Lays out the fields of a struct one after another.
///
/// Returns `None` if an offset in bits overflows `u64`.
pub(crate) fn layout_struct(fields: &[FieldSlot]) -> Option<RecordLayout> {
    let mut offset = 0u64;
    let mut alignment = 1u64;
    let mut offsets = Vec::with_capacity(fields.len());

    for field in fields {
        let unit_bits = field.layout.alignment.max(1).checked_mul(8)?;
        let size_bits = field.layout.size.checked_mul(8)?;
        match field.bit_width {
            None => {
                offset = align_up(offset, unit_bits)?;
                offsets.push(offset);
                offset = offset.checked_add(size_bits)?;
                alignment = alignment.max(field.layout.alignment);
            }
            Some(0) => {
                offset = align_up(offset, unit_bits)?;
                offsets.push(offset);
            }
            Some(width) => {
                let unit_start = offset - offset % unit_bits;
                if offset.checked_add(width)? > unit_start.checked_add(size_bits)? {
                    offset = align_up(offset, unit_bits)?;
                }
                offsets.push(offset);
                offset = offset.checked_add(width)?;
                if field.named {
                    alignment = alignment.max(field.layout.alignment);
                }
            }
        }
    }

    finish(offset, alignment, offsets)
}

/// Lays out the fields of a union, all at offset zero.
///
/// Returns `None` if a member's size in bits overflows `u64`.
pub(crate) fn layout_union(fields: &[FieldSlot]) -> Option<RecordLayout> {
    let mut bits = 0u64;
    let mut alignment = 1u64;

    for field in fields {
        let field_bits = match field.bit_width {
            Some(width) => width,
            None => field.layout.size.checked_mul(8)?,
        };
        bits = bits.max(field_bits);
        if field.named || field.bit_width.is_none() {
            alignment = alignment.max(field.layout.alignment);
        }
    }

    finish(bits, alignment, vec![0; fields.len()])
}

#[cfg(test)]
mod tests {
    use super::*;

    const CHAR: Layout = Layout::new(1, 1);
    const SHORT: Layout = Layout::new(2, 2);
    const INT: Layout = Layout::new(4, 4);
    const LONG: Layout = Layout::new(8, 8);

    #[test]
    fn test_struct_padding() {
        let result = layout_struct(&[
            FieldSlot::new(CHAR),
            FieldSlot::new(INT),
            FieldSlot::new(CHAR),
        ])
        .expect("layout fits");
        assert_eq!(result.offsets, vec![0, 32, 64]);
        assert_eq!(result.layout, Layout::new(12, 4));
    }

    #[test]
    fn test_empty_struct() {
        let result = layout_struct(&[]).expect("layout fits");
        assert_eq!(result.layout, Layout::new(0, 1));
        assert!(result.offsets.is_empty());
    }

    #[test]
    fn test_flexible_array_member() {
        let result = layout_struct(&[FieldSlot::new(INT), FieldSlot::new(Layout::new(0, 8))]).expect("layout fits");
        assert_eq!(result.offsets, vec![0, 64]);
        assert_eq!(result.layout, Layout::new(8, 8));
    }

    #[test]
    fn test_bit_fields_share_storage_unit() {
        let result = layout_struct(&[
            FieldSlot::bit_field(INT, 3, true),
            FieldSlot::bit_field(INT, 5, true),
            FieldSlot::new(CHAR),
        ])
        .expect("layout fits");
        assert_eq!(result.offsets, vec![0, 3, 8]);
        assert_eq!(result.layout, Layout::new(4, 4));
    }

    #[test]
    fn test_bit_field_does_not_straddle() {
        let result = layout_struct(&[
            FieldSlot::bit_field(SHORT, 12, true),
            FieldSlot::bit_field(SHORT, 6, true),
        ])
        .expect("layout fits");
        assert_eq!(result.offsets, vec![0, 16]);
        assert_eq!(result.layout, Layout::new(4, 2));
    }

    #[test]
    fn test_zero_width_bit_field_aligns_next() {
        let result = layout_struct(&[
            FieldSlot::bit_field(CHAR, 1, true),
            FieldSlot::bit_field(INT, 0, false),
            FieldSlot::new(CHAR),
        ])
        .expect("layout fits");
        assert_eq!(result.offsets, vec![0, 32, 32]);
        assert_eq!(result.layout, Layout::new(5, 1));
    }

    #[test]
    fn test_unnamed_bit_field_ignores_alignment() {
        let result = layout_struct(&[FieldSlot::new(CHAR), FieldSlot::bit_field(LONG, 4, false)]).expect("layout fits");
        assert_eq!(result.offsets, vec![0, 8]);
        assert_eq!(result.layout, Layout::new(2, 1));
    }

    #[test]
    fn test_oversized_field_is_rejected() {
        let huge = Layout::new(1 << 61, 1);
        assert_eq!(layout_struct(&[FieldSlot::new(huge)]), None);
        let half = FieldSlot::new(Layout::new(1 << 60, 1));
        assert_eq!(layout_struct(&[half, half]), None);
        assert_eq!(layout_union(&[FieldSlot::new(huge)]), None);

        let largest = layout_struct(&[FieldSlot::new(Layout::new((1 << 61) - 1, 1))]).expect("layout fits");
        assert_eq!(largest.layout.size, (1 << 61) - 1);
    }

    #[test]
    fn test_union() {
        let result = layout_union(&[
            FieldSlot::new(CHAR),
            FieldSlot::new(Layout::new(12, 4)),
            FieldSlot::bit_field(LONG, 3, true),
        ])
        .expect("layout fits");
        assert_eq!(result.offsets, vec![0, 0, 0]);
        assert_eq!(result.layout, Layout::new(16, 8));
    }
}
