/// Converts a 1-based column index to its letter name (1 -> A, 27 -> AA).
#[must_use]
pub fn index_to_col_name(index: usize) -> String {
    let mut col_name = String::new();
    let mut n = index;

    while n > 0 {
        let remainder = (n - 1) % 26;
        col_name.insert(0, (b'A' + remainder as u8) as char);
        n = (n - 1) / 26;
    }

    if col_name.is_empty() {
        col_name.push('A');
    }

    col_name
}

#[must_use]
pub fn col_name_to_index(name: &str) -> Option<usize> {
    if name.is_empty() {
        return None;
    }

    let mut result = 0usize;
    for c in name.chars() {
        if !c.is_ascii_alphabetic() {
            return None;
        }

        let val = (c.to_ascii_uppercase() as u8 - b'A' + 1) as usize;
        result = result.checked_mul(26)?.checked_add(val)?;
    }

    Some(result)
}

// Format cell reference (e.g., D3)
#[must_use]
pub fn cell_reference(row: usize, col: usize) -> String {
    format!("{}{}", index_to_col_name(col), row)
}

// Format range reference (e.g., D3:F7)
#[must_use]
pub fn range_reference(top: usize, left: usize, bottom: usize, right: usize) -> String {
    format!(
        "{}:{}",
        cell_reference(top, left),
        cell_reference(bottom, right)
    )
}
