//! The dtype table: `descr` code -> element layout and result representation.

use std::collections::BTreeMap;

use lazy_static::lazy_static;

use crate::models::{ByteOrder, DType};

/// Post-decode conversion applied to the raw element buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Converter {
    /// Expand raw float16 bit patterns to `f32`.
    Float16ToFloat32,
}

/// One row of the dtype table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DtypeEntry {
    pub code: &'static str,
    pub dtype: DType,
    pub byte_order: ByteOrder,
    pub converter: Option<Converter>,
}

impl DtypeEntry {
    pub fn width(&self) -> usize {
        self.dtype.byte_size()
    }
}

const F16: Option<Converter> = Some(Converter::Float16ToFloat32);

#[rustfmt::skip]
static ENTRIES: &[(&str, DType, ByteOrder, Option<Converter>)] = &[
    ("<u1", DType::Uint8,   ByteOrder::NotApplicable, None),
    ("|u1", DType::Uint8,   ByteOrder::NotApplicable, None),
    ("|i1", DType::Int8,    ByteOrder::NotApplicable, None),
    ("<u2", DType::Uint16,  ByteOrder::Little, None),
    ("<i2", DType::Int16,   ByteOrder::Little, None),
    ("<u4", DType::Uint32,  ByteOrder::Little, None),
    ("<i4", DType::Int32,   ByteOrder::Little, None),
    ("<u8", DType::Uint64,  ByteOrder::Little, None),
    ("<i8", DType::Int64,   ByteOrder::Little, None),
    ("<f2", DType::Float16, ByteOrder::Little, F16),
    ("<f4", DType::Float32, ByteOrder::Little, None),
    ("<f8", DType::Float64, ByteOrder::Little, None),
    (">u2", DType::Uint16,  ByteOrder::Big, None),
    (">i2", DType::Int16,   ByteOrder::Big, None),
    (">u4", DType::Uint32,  ByteOrder::Big, None),
    (">i4", DType::Int32,   ByteOrder::Big, None),
    (">u8", DType::Uint64,  ByteOrder::Big, None),
    (">i8", DType::Int64,   ByteOrder::Big, None),
    (">f2", DType::Float16, ByteOrder::Big, F16),
    (">f4", DType::Float32, ByteOrder::Big, None),
    (">f8", DType::Float64, ByteOrder::Big, None),
];

lazy_static! {
    static ref DTYPE_TABLE: BTreeMap<&'static str, DtypeEntry> = ENTRIES
        .iter()
        .map(|&(code, dtype, byte_order, converter)| {
            (code, DtypeEntry { code, dtype, byte_order, converter })
        })
        .collect();
}

/// Looks up a `descr` code.
///
/// With `convert_float16` off, float16 entries come back without their
/// converter and decode to raw `u16` bit patterns.
pub fn lookup(code: &str, convert_float16: bool) -> Option<DtypeEntry> {
    let mut entry = *DTYPE_TABLE.get(code)?;
    if !convert_float16 {
        entry.converter = None;
    }
    Some(entry)
}

/// Little-endian (or byte-order-free) code used when encoding `dtype`.
pub fn code_for(dtype: DType) -> &'static str {
    match dtype {
        DType::Uint8 => "|u1",
        DType::Int8 => "|i1",
        DType::Uint16 => "<u2",
        DType::Int16 => "<i2",
        DType::Uint32 => "<u4",
        DType::Int32 => "<i4",
        DType::Uint64 => "<u8",
        DType::Int64 => "<i8",
        DType::Float16 => "<f2",
        DType::Float32 => "<f4",
        DType::Float64 => "<f8",
    }
}

/// All registered codes, sorted.
pub fn supported_codes() -> Vec<&'static str> {
    DTYPE_TABLE.keys().copied().collect()
}
