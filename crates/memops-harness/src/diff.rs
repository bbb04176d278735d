//! Hex diff rendering for destination buffers.

const ROW: usize = 16;

fn hex_row(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Render the rows of `expected` and `actual` that differ, plus the row
/// containing `focus` when given.
#[must_use]
pub fn render_buffer_diff(expected: &[u8], actual: &[u8], focus: Option<usize>) -> String {
    if expected == actual && focus.is_none() {
        return String::from("[identical]");
    }

    let len = expected.len().max(actual.len());
    let mut out = String::new();
    out.push_str("--- expected\n");
    out.push_str("+++ actual\n");
    for start in (0..len).step_by(ROW) {
        let end = (start + ROW).min(len);
        let e = expected.get(start..end.min(expected.len())).unwrap_or(&[]);
        let a = actual.get(start..end.min(actual.len())).unwrap_or(&[]);
        let focused = focus.is_some_and(|f| (start..end).contains(&f));
        if e == a && !focused {
            continue;
        }
        out.push_str(&format!("@@ offset {start:#06x} @@\n"));
        if e == a {
            out.push_str(&format!(" {start:04x}: {}\n", hex_row(e)));
        } else {
            out.push_str(&format!("-{start:04x}: {}\n", hex_row(e)));
            out.push_str(&format!("+{start:04x}: {}\n", hex_row(a)));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_buffers() {
        assert_eq!(render_buffer_diff(&[1, 2, 3], &[1, 2, 3], None), "[identical]");
    }

    #[test]
    fn only_differing_rows_are_shown() {
        let expected = [0xFFu8; 64];
        let mut actual = expected;
        actual[37] = 0x5A;
        let diff = render_buffer_diff(&expected, &actual, None);
        assert!(diff.contains("@@ offset 0x0020 @@"));
        assert!(diff.contains("+0020: ff ff ff ff ff 5a"));
        assert!(!diff.contains("0x0000"));
        assert!(!diff.contains("0x0030"));
    }

    #[test]
    fn focus_row_is_shown_even_when_equal() {
        let buf = [0u8; 32];
        let diff = render_buffer_diff(&buf, &buf, Some(20));
        assert!(diff.contains(" 0010: 00"));
        assert!(!diff.contains("0x0000"));
    }
}
