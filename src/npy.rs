//! NumPy `.npy` container decoding and encoding.
//!
//! Layout: a 6-byte magic, 2 version bytes, a header-length field at offset
//! 8, then the header text (a Python dict literal) and the raw payload.
//!
//! Only the low byte of the header-length field is read. Headers longer than
//! 255 bytes are therefore mis-parsed: the header text is cut short and the
//! payload offset is wrong. This is a known limitation and is kept as is; the
//! decoder logs a warning when the high byte is set, and the encoder refuses
//! to write such headers.

use byteorder::{BigEndian, ByteOrder as Endian, LittleEndian, WriteBytesExt};
use lazy_static::lazy_static;
use log::{debug, error, warn};
use regex::Regex;
use serde::Deserialize;

use crate::dtype::{self, Converter, DtypeEntry};
use crate::error::Error;
use crate::float16::{f16_slice_to_f32, f32_to_f16_bits};
use crate::models::{
    ALIGNMENT, ByteOrder, DType, HEADER_LEN_OFFSET, MemoryOrder, NPY_MAGIC, PREAMBLE_LEN,
    TensorData, TensorDescriptor,
};

lazy_static! {
    static ref CLOSING_PAREN: Regex = Regex::new(r",*\),*").expect("static regex");
}

/// Options controlling payload conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecoderOptions {
    /// Expand float16 payloads to `f32`. When off, float16 tensors keep their
    /// raw `u16` bit patterns.
    pub convert_float16: bool,
}

impl Default for DecoderOptions {
    fn default() -> Self {
        Self {
            convert_float16: true,
        }
    }
}

/// Parsed `.npy` header.
#[derive(Debug, Clone, PartialEq)]
pub struct NpyHeader {
    pub descr: String,
    pub fortran_order: bool,
    pub shape: Vec<u64>,
    /// Byte offset where the payload starts.
    pub data_offset: usize,
}

#[derive(Deserialize)]
struct HeaderLiteral {
    descr: String,
    fortran_order: bool,
    shape: Vec<u64>,
}

/// Rewrites the Python dict literal into JSON text.
///
/// `{'descr': '<f4', 'fortran_order': False, 'shape': (3,), }` becomes
/// `{"descr": "<f4", "fortran_order": false, "shape": [3] }`.
pub fn normalize_header_literal(literal: &str) -> String {
    let lowered = literal.to_lowercase().replace('\'', "\"");
    let bracketed = lowered.replacen('(', "[", 1);
    CLOSING_PAREN.replace_all(&bracketed, "]").into_owned()
}

/// Parses the preamble and header text of an `.npy` buffer.
///
/// The magic and version bytes are not validated.
pub fn parse_header(data: &[u8]) -> Result<NpyHeader, Error> {
    if data.len() < PREAMBLE_LEN {
        return Err(Error::UnexpectedEof);
    }

    let header_len = data[HEADER_LEN_OFFSET] as usize;
    if data[HEADER_LEN_OFFSET + 1] != 0 {
        warn!(
            "header length field is {} bytes but only the low byte ({}) is read; header will be truncated",
            u16::from_le_bytes([data[HEADER_LEN_OFFSET], data[HEADER_LEN_OFFSET + 1]]),
            header_len
        );
    }

    let header_end = PREAMBLE_LEN + header_len;
    let header_bytes = data
        .get(PREAMBLE_LEN..header_end)
        .ok_or(Error::UnexpectedEof)?;
    let text = String::from_utf8_lossy(header_bytes);
    let normalized = normalize_header_literal(&text);

    let value: serde_json::Value =
        serde_json::from_str(normalized.trim()).map_err(Error::HeaderJson)?;
    let literal: HeaderLiteral =
        serde_json::from_value(value).map_err(|e| Error::InvalidHeader(e.to_string()))?;

    Ok(NpyHeader {
        descr: literal.descr,
        fortran_order: literal.fortran_order,
        shape: literal.shape,
        data_offset: header_end,
    })
}

fn read_elements<E: Endian>(payload: &[u8], dtype: DType) -> TensorData {
    let n = payload.len() / dtype.byte_size();
    macro_rules! read_into {
        ($t:ty, $read:ident, $variant:ident) => {{
            let mut values = vec![<$t>::default(); n];
            E::$read(payload, &mut values);
            TensorData::$variant(values)
        }};
    }
    match dtype {
        DType::Uint8 => TensorData::U8(payload.to_vec()),
        DType::Int8 => TensorData::I8(payload.iter().map(|b| *b as i8).collect()),
        DType::Uint16 | DType::Float16 => read_into!(u16, read_u16_into, U16),
        DType::Int16 => read_into!(i16, read_i16_into, I16),
        DType::Uint32 => read_into!(u32, read_u32_into, U32),
        DType::Int32 => read_into!(i32, read_i32_into, I32),
        DType::Uint64 => read_into!(u64, read_u64_into, U64),
        DType::Int64 => read_into!(i64, read_i64_into, I64),
        DType::Float32 => read_into!(f32, read_f32_into, F32),
        DType::Float64 => read_into!(f64, read_f64_into, F64),
    }
}

fn apply_converter(data: TensorData, converter: Option<Converter>) -> TensorData {
    match (converter, data) {
        (Some(Converter::Float16ToFloat32), TensorData::U16(bits)) => {
            TensorData::F32(f16_slice_to_f32(&bits))
        }
        (_, data) => data,
    }
}

/// Reinterprets `payload` according to a dtype table entry.
pub fn decode_payload(payload: &[u8], entry: &DtypeEntry) -> Result<TensorData, Error> {
    let width = entry.width();
    if payload.len() % width != 0 {
        return Err(Error::InconsistentDataSize {
            expected_multiple_of: width,
            found: payload.len(),
        });
    }

    let raw = match entry.byte_order {
        ByteOrder::Big => read_elements::<BigEndian>(payload, entry.dtype),
        ByteOrder::Little | ByteOrder::NotApplicable => {
            read_elements::<LittleEndian>(payload, entry.dtype)
        }
    };
    Ok(apply_converter(raw, entry.converter))
}

/// Decodes `.npy` buffers into [`TensorDescriptor`]s.
#[derive(Debug, Clone, Default)]
pub struct NpyDecoder {
    options: DecoderOptions,
}

impl NpyDecoder {
    pub fn new(options: DecoderOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> DecoderOptions {
        self.options
    }

    /// Decodes a whole buffer.
    ///
    /// An unknown `descr` code yields [`Error::UnsupportedDType`] before any
    /// payload is read. The element count is not checked against the shape.
    pub fn decode(&self, buffer: &[u8]) -> Result<TensorDescriptor, Error> {
        let header = parse_header(buffer)?;

        let Some(entry) = dtype::lookup(&header.descr, self.options.convert_float16) else {
            error!("Unsupported dtype: {}", header.descr);
            return Err(Error::UnsupportedDType(header.descr));
        };

        let payload = &buffer[header.data_offset..];
        let data = decode_payload(payload, &entry)?;
        debug!(
            "decoded {} tensor, shape {:?}, {} elements",
            entry.dtype,
            header.shape,
            data.len()
        );

        Ok(TensorDescriptor {
            dtype: entry.dtype,
            shape: header.shape,
            memory_order: MemoryOrder::from(header.fortran_order),
            data,
        })
    }
}

/// Decodes a buffer with default options.
pub fn decode(buffer: &[u8]) -> Result<TensorDescriptor, Error> {
    NpyDecoder::default().decode(buffer)
}

fn shape_literal(shape: &[u64]) -> String {
    match shape {
        [single] => format!("({},)", single),
        dims => format!(
            "({})",
            dims.iter().map(|d| d.to_string()).collect::<Vec<_>>().join(", ")
        ),
    }
}

/// Builds the padded header text for a tensor.
fn header_text(descr: &str, fortran_order: bool, shape: &[u64]) -> String {
    let dict = format!(
        "{{'descr': '{}', 'fortran_order': {}, 'shape': {}, }}",
        descr,
        if fortran_order { "True" } else { "False" },
        shape_literal(shape)
    );
    // Pad with spaces so the payload starts on an ALIGNMENT boundary.
    let unpadded = PREAMBLE_LEN + dict.len() + 1;
    let pad = unpadded.div_ceil(ALIGNMENT) * ALIGNMENT - unpadded;
    format!("{}{}\n", dict, " ".repeat(pad))
}

fn encode_payload(dtype: DType, data: &TensorData) -> Result<Vec<u8>, Error> {
    let mut out = Vec::with_capacity(data.len() * dtype.byte_size());
    match (dtype, data) {
        (DType::Uint8, TensorData::U8(v)) => out.extend_from_slice(v),
        (DType::Int8, TensorData::I8(v)) => out.extend(v.iter().map(|x| *x as u8)),
        (DType::Uint16 | DType::Float16, TensorData::U16(v)) => {
            for x in v {
                out.write_u16::<LittleEndian>(*x)?;
            }
        }
        (DType::Float16, TensorData::F32(v)) => {
            for x in v {
                out.write_u16::<LittleEndian>(f32_to_f16_bits(*x))?;
            }
        }
        (DType::Int16, TensorData::I16(v)) => {
            for x in v {
                out.write_i16::<LittleEndian>(*x)?;
            }
        }
        (DType::Uint32, TensorData::U32(v)) => {
            for x in v {
                out.write_u32::<LittleEndian>(*x)?;
            }
        }
        (DType::Int32, TensorData::I32(v)) => {
            for x in v {
                out.write_i32::<LittleEndian>(*x)?;
            }
        }
        (DType::Uint64, TensorData::U64(v)) => {
            for x in v {
                out.write_u64::<LittleEndian>(*x)?;
            }
        }
        (DType::Int64, TensorData::I64(v)) => {
            for x in v {
                out.write_i64::<LittleEndian>(*x)?;
            }
        }
        (DType::Float32, TensorData::F32(v)) => {
            for x in v {
                out.write_f32::<LittleEndian>(*x)?;
            }
        }
        (DType::Float64, TensorData::F64(v)) => {
            for x in v {
                out.write_f64::<LittleEndian>(*x)?;
            }
        }
        (dtype, data) => {
            return Err(Error::DataMismatch {
                dtype,
                representation: data.kind(),
            });
        }
    }
    Ok(out)
}

/// Encodes a tensor as a version 1.0 `.npy` buffer with little-endian codes.
///
/// Float16 tensors accept either `F32` values (narrowed) or raw `U16` bits.
pub fn encode(tensor: &TensorDescriptor) -> Result<Vec<u8>, Error> {
    let header = header_text(
        dtype::code_for(tensor.dtype),
        tensor.is_fortran_order(),
        &tensor.shape,
    );
    if header.len() > u8::MAX as usize {
        return Err(Error::HeaderTooLong { len: header.len() });
    }
    let payload = encode_payload(tensor.dtype, &tensor.data)?;

    let mut out = Vec::with_capacity(PREAMBLE_LEN + header.len() + payload.len());
    out.extend_from_slice(NPY_MAGIC);
    out.push(1); // major version
    out.push(0); // minor version
    out.write_u16::<LittleEndian>(header.len() as u16)?;
    out.extend_from_slice(header.as_bytes());
    out.extend_from_slice(&payload);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn npy_with_header(dict: &str, payload: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(NPY_MAGIC);
        out.extend_from_slice(&[1, 0]);
        out.extend_from_slice(&(dict.len() as u16).to_le_bytes());
        out.extend_from_slice(dict.as_bytes());
        out.extend_from_slice(payload);
        out
    }

    #[test]
    fn test_normalize_header_literal() {
        assert_eq!(
            normalize_header_literal("{'descr': '<f4', 'fortran_order': False, 'shape': (3,), }"),
            r#"{"descr": "<f4", "fortran_order": false, "shape": [3] }"#
        );
        assert_eq!(
            normalize_header_literal("{'descr': '<i8', 'fortran_order': True, 'shape': (2, 3), }"),
            r#"{"descr": "<i8", "fortran_order": true, "shape": [2, 3] }"#
        );
        assert_eq!(
            normalize_header_literal("{'descr': '<f8', 'fortran_order': False, 'shape': (), }"),
            r#"{"descr": "<f8", "fortran_order": false, "shape": [] }"#
        );
    }

    #[test]
    fn test_parse_header() {
        let buf = npy_with_header(
            "{'descr': '<f4', 'fortran_order': False, 'shape': (3, 4), }    \n",
            &[],
        );
        let header = parse_header(&buf).unwrap();
        assert_eq!(header.descr, "<f4");
        assert!(!header.fortran_order);
        assert_eq!(header.shape, vec![3, 4]);
        assert_eq!(header.data_offset, buf.len());
    }

    #[test]
    fn test_parse_header_without_trailing_comma() {
        let buf = npy_with_header("{'descr': '|u1', 'fortran_order': True, 'shape': (5,)}", &[]);
        let header = parse_header(&buf).unwrap();
        assert_eq!(header.descr, "|u1");
        assert!(header.fortran_order);
        assert_eq!(header.shape, vec![5]);
    }

    #[test]
    fn test_magic_is_not_validated() {
        let mut buf = npy_with_header("{'descr': '|u1', 'fortran_order': False, 'shape': (2,), }", &[7, 9]);
        buf[..6].copy_from_slice(b"XXXXXX");
        let t = decode(&buf).unwrap();
        assert_eq!(t.data, TensorData::U8(vec![7, 9]));
    }

    #[test]
    fn test_short_buffers() {
        assert!(matches!(parse_header(&[0x93, b'N']), Err(Error::UnexpectedEof)));
        let mut buf = npy_with_header("{'descr': '|u1', 'fortran_order': False, 'shape': (2,), }", &[]);
        buf.truncate(20);
        assert!(matches!(parse_header(&buf), Err(Error::UnexpectedEof)));
    }

    #[test]
    fn test_header_missing_field() {
        let buf = npy_with_header("{'descr': '<f4', 'shape': (2,), }", &[0; 8]);
        match parse_header(&buf) {
            Err(Error::InvalidHeader(msg)) => assert!(msg.contains("fortran_order"), "{}", msg),
            other => panic!("expected InvalidHeader, got {:?}", other),
        }

        let buf = npy_with_header("{'descr': 4, 'fortran_order': False, 'shape': (2,), }", &[0; 8]);
        assert!(matches!(decode(&buf), Err(Error::InvalidHeader(_))));
    }

    #[test]
    fn test_unsupported_dtype() {
        let buf = npy_with_header("{'descr': '|b1', 'fortran_order': False, 'shape': (2,), }", &[1, 0]);
        match decode(&buf) {
            Err(Error::UnsupportedDType(code)) => assert_eq!(code, "|b1"),
            other => panic!("expected UnsupportedDType, got {:?}", other),
        }
    }

    #[test]
    fn test_ragged_payload() {
        let buf = npy_with_header("{'descr': '<f4', 'fortran_order': False, 'shape': (1,), }", &[0, 0, 0]);
        assert!(matches!(
            decode(&buf),
            Err(Error::InconsistentDataSize { expected_multiple_of: 4, found: 3 })
        ));
    }

    #[test]
    fn test_big_endian_payload() {
        let buf = npy_with_header(
            "{'descr': '>i4', 'fortran_order': False, 'shape': (2,), }",
            &[0, 0, 0, 1, 0xff, 0xff, 0xff, 0xfe],
        );
        assert_eq!(decode(&buf).unwrap().data, TensorData::I32(vec![1, -2]));
    }

    #[test]
    fn test_float16_conversion_toggle() {
        let payload = [0x00, 0x3c, 0x00, 0xc0];
        let buf = npy_with_header("{'descr': '<f2', 'fortran_order': False, 'shape': (2,), }", &payload);

        let converted = decode(&buf).unwrap();
        assert_eq!(converted.dtype, DType::Float16);
        assert_eq!(converted.data, TensorData::F32(vec![1.0, -2.0]));

        let raw = NpyDecoder::new(DecoderOptions { convert_float16: false })
            .decode(&buf)
            .unwrap();
        assert_eq!(raw.dtype, DType::Float16);
        assert_eq!(raw.data, TensorData::U16(vec![0x3c00, 0xc000]));
    }

    #[test]
    fn test_header_text_alignment() {
        let text = header_text("<f4", false, &[3, 4]);
        assert_eq!((PREAMBLE_LEN + text.len()) % ALIGNMENT, 0);
        assert!(text.ends_with('\n'));
    }

    #[test]
    fn test_encode_rejects_long_header() {
        let tensor = TensorDescriptor {
            dtype: DType::Uint8,
            shape: vec![1; 80],
            memory_order: MemoryOrder::RowMajor,
            data: TensorData::U8(vec![0]),
        };
        assert!(matches!(encode(&tensor), Err(Error::HeaderTooLong { .. })));
    }

    #[test]
    fn test_encode_rejects_mismatched_data() {
        let tensor = TensorDescriptor {
            dtype: DType::Int32,
            shape: vec![1],
            memory_order: MemoryOrder::RowMajor,
            data: TensorData::F32(vec![0.0]),
        };
        assert!(matches!(encode(&tensor), Err(Error::DataMismatch { .. })));
    }
}
