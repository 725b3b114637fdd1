/// Build a .npy buffer in memory: magic + version + header + raw data.
pub fn build_npy(descr: &str, shape: &[usize], data: &[u8]) -> Vec<u8> {
    build_npy_with_order(descr, false, shape, data)
}

/// Build a Fortran-order .npy buffer in memory.
pub fn build_npy_fortran(descr: &str, shape: &[usize], data: &[u8]) -> Vec<u8> {
    build_npy_with_order(descr, true, shape, data)
}

fn build_npy_with_order(descr: &str, fortran: bool, shape: &[usize], data: &[u8]) -> Vec<u8> {
    let shape_str = if shape.len() == 1 {
        format!("({},)", shape[0])
    } else {
        let parts: Vec<String> = shape.iter().map(|d| d.to_string()).collect();
        format!("({})", parts.join(", "))
    };
    let header_dict = format!(
        "{{'descr': '{}', 'fortran_order': {}, 'shape': {}, }}",
        descr,
        if fortran { "True" } else { "False" },
        shape_str
    );
    build_npy_from_dict(&header_dict, data)
}

/// Build a .npy buffer around an arbitrary header dict, padded like numpy
/// does (64-byte aligned payload, newline terminated).
pub fn build_npy_from_dict(header_dict: &str, data: &[u8]) -> Vec<u8> {
    let preamble_len = 10;
    let total = preamble_len + header_dict.len() + 1; // +1 for newline
    let pad = ((total + 63) / 64) * 64 - total;
    let padded_header = format!("{}{}\n", header_dict, " ".repeat(pad));

    let mut npy = Vec::new();
    npy.extend_from_slice(b"\x93NUMPY");
    npy.push(1); // major version
    npy.push(0); // minor version
    let header_len = padded_header.len() as u16;
    npy.extend_from_slice(&header_len.to_le_bytes());
    npy.extend_from_slice(padded_header.as_bytes());
    npy.extend_from_slice(data);
    npy
}
