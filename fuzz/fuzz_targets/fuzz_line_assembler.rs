#![no_main]
use libfuzzer_sys::fuzz_target;

use embedload::LineAssembler;

// Any chunking of the same bytes must yield the same lines.
fuzz_target!(|input: (Vec<u8>, Vec<u8>)| {
    let (data, cuts) = input;

    let mut whole = LineAssembler::new();
    let mut expected = whole.push(&data);
    expected.extend(whole.finish());

    let mut split = LineAssembler::new();
    let mut got = Vec::new();
    let mut rest: &[u8] = &data;
    for cut in cuts {
        if rest.is_empty() {
            break;
        }
        let n = (cut as usize % rest.len()) + 1;
        let (head, tail) = rest.split_at(n);
        got.extend(split.push(head));
        rest = tail;
    }
    got.extend(split.push(rest));
    got.extend(split.finish());

    assert_eq!(got, expected);
});
