/// Spreadsheet column letter for a zero-based index: A, B, ..., Z, AA, AB, ...
pub fn column_letter(index: usize) -> String {
    let mut i = index as i64;
    let mut out = Vec::new();
    while i >= 0 {
        out.insert(0, b'A' + (i % 26) as u8);
        i = i / 26 - 1;
    }
    String::from_utf8(out).expect("ASCII letters")
}
