use serde::{Deserialize, Serialize};

/// Magic prefix of the `.npy` container. Present but not validated on read.
pub const NPY_MAGIC: &[u8; 6] = b"\x93NUMPY";
/// Offset of the (single) header-length byte.
pub const HEADER_LEN_OFFSET: usize = 8;
/// Magic (6) + version (2) + header length field (2).
pub const PREAMBLE_LEN: usize = 10;
/// Payload alignment used when encoding.
pub const ALIGNMENT: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DType {
    Uint8,
    Int8,
    Uint16,
    Int16,
    Uint32,
    Int32,
    Uint64,
    Int64,
    Float16,
    Float32,
    Float64,
}

impl DType {
    pub fn name(&self) -> &'static str {
        match self {
            DType::Uint8 => "uint8",
            DType::Int8 => "int8",
            DType::Uint16 => "uint16",
            DType::Int16 => "int16",
            DType::Uint32 => "uint32",
            DType::Int32 => "int32",
            DType::Uint64 => "uint64",
            DType::Int64 => "int64",
            DType::Float16 => "float16",
            DType::Float32 => "float32",
            DType::Float64 => "float64",
        }
    }

    pub fn byte_size(&self) -> usize {
        match self {
            DType::Float64 | DType::Int64 | DType::Uint64 => 8,
            DType::Float32 | DType::Int32 | DType::Uint32 => 4,
            DType::Float16 | DType::Int16 | DType::Uint16 => 2,
            DType::Int8 | DType::Uint8 => 1,
        }
    }
}

impl std::fmt::Display for DType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Byte-order marker of a dtype code (`<`, `>` or `|`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ByteOrder {
    Little,
    Big,
    /// Single-byte types carry no byte order.
    NotApplicable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemoryOrder {
    #[default]
    RowMajor,
    /// `fortran_order: True`.
    ColumnMajor,
}

impl From<bool> for MemoryOrder {
    fn from(fortran_order: bool) -> Self {
        if fortran_order {
            MemoryOrder::ColumnMajor
        } else {
            MemoryOrder::RowMajor
        }
    }
}

/// Decoded element buffer, one variant per result representation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "values", rename_all = "lowercase")]
pub enum TensorData {
    U8(Vec<u8>),
    I8(Vec<i8>),
    U16(Vec<u16>),
    I16(Vec<i16>),
    U32(Vec<u32>),
    I32(Vec<i32>),
    U64(Vec<u64>),
    I64(Vec<i64>),
    F32(Vec<f32>),
    F64(Vec<f64>),
}

macro_rules! each_variant {
    ($data:expr, $v:ident => $body:expr) => {
        match $data {
            TensorData::U8($v) => $body,
            TensorData::I8($v) => $body,
            TensorData::U16($v) => $body,
            TensorData::I16($v) => $body,
            TensorData::U32($v) => $body,
            TensorData::I32($v) => $body,
            TensorData::U64($v) => $body,
            TensorData::I64($v) => $body,
            TensorData::F32($v) => $body,
            TensorData::F64($v) => $body,
        }
    };
}

impl TensorData {
    pub fn len(&self) -> usize {
        each_variant!(self, v => v.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Widens or narrows every element to `f32`. Lossy for 64-bit types.
    ///
    /// Raw float16 bit patterns (`U16` from a decoder with conversion
    /// disabled) are returned as integers, not reinterpreted.
    pub fn to_f32_vec(&self) -> Vec<f32> {
        each_variant!(self, v => v.iter().map(|x| *x as f32).collect())
    }

    /// Short name of the in-memory representation.
    pub fn kind(&self) -> &'static str {
        match self {
            TensorData::U8(_) => "u8",
            TensorData::I8(_) => "i8",
            TensorData::U16(_) => "u16",
            TensorData::I16(_) => "i16",
            TensorData::U32(_) => "u32",
            TensorData::I32(_) => "i32",
            TensorData::U64(_) => "u64",
            TensorData::I64(_) => "i64",
            TensorData::F32(_) => "f32",
            TensorData::F64(_) => "f64",
        }
    }
}

/// A decoded tensor, handed to the caller as-is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TensorDescriptor {
    pub dtype: DType,
    pub shape: Vec<u64>,
    pub memory_order: MemoryOrder,
    pub data: TensorData,
}

impl TensorDescriptor {
    /// Expected number of elements from the shape.
    pub fn num_elements(&self) -> u64 {
        if self.shape.is_empty() {
            // Scalar
            1
        } else {
            self.shape.iter().product()
        }
    }

    pub fn is_fortran_order(&self) -> bool {
        self.memory_order == MemoryOrder::ColumnMajor
    }

    /// Whether the decoded buffer holds exactly as many elements as the shape
    /// declares. The decoder trusts the header and never calls this itself.
    pub fn shape_matches_data(&self) -> bool {
        self.num_elements() == self.data.len() as u64
    }
}
