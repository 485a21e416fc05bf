//! Split one log line into the shell sub-commands chained by `;`, `&&` and `||`.

/// Ordered, trimmed, non-empty sub-commands. The operators are dropped.
pub fn split_commands(line: &str) -> Vec<&str> {
    let bytes = line.as_bytes();
    let mut out = Vec::new();
    let mut start = 0;
    let mut i = 0;

    while i < bytes.len() {
        let op_len = match bytes[i] {
            b';' => 1,
            b'&' if bytes.get(i + 1) == Some(&b'&') => 2,
            b'|' if bytes.get(i + 1) == Some(&b'|') => 2,
            _ => 0,
        };

        if op_len == 0 {
            i += 1;
            continue;
        }

        // Operators are ASCII, so these are char boundaries
        push_trimmed(&mut out, &line[start..i]);
        i += op_len;
        start = i;
    }

    push_trimmed(&mut out, &line[start..]);
    out
}

fn push_trimmed<'a>(out: &mut Vec<&'a str>, segment: &'a str) {
    let segment = segment.trim();
    if !segment.is_empty() {
        out.push(segment);
    }
}
