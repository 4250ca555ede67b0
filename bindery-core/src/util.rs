pub fn separated_by<T, F>(
    out: &mut String,
    values: impl IntoIterator<Item = T>,
    mut f: F,
    separator: &str,
) where
    F: FnMut(&mut String, T),
{
    let mut len = out.len();
    for v in values {
        if out.len() > len {
            out.push_str(separator);
        }
        len = out.len();
        f(out, v);
    }
}

/// Largest char boundary not greater than `len`.
pub fn floor_char_boundary(value: &str, len: usize) -> usize {
    if len >= value.len() {
        return value.len();
    }
    let mut len = len;
    while !value.is_char_boundary(len) {
        len -= 1;
    }
    len
}

/// Position of the next `?` outside quoted sections, starting at byte `start`.
///
/// Quoted sections are delimited by `'` and use `''` as escape.
pub fn find_next_placeholder(sql: &str, start: usize) -> Option<usize> {
    let bytes = sql.as_bytes();
    let mut quoted = false;
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'\'' if quoted && bytes.get(i + 1) == Some(&b'\'') => i += 1,
            b'\'' => quoted = !quoted,
            b'?' if !quoted && i >= start => return Some(i),
            _ => {}
        }
        i += 1;
    }
    None
}

#[macro_export]
macro_rules! truncate_long {
    ($query:expr) => {{
        let query = &$query;
        let query: &str = ::std::convert::AsRef::<str>::as_ref(query);
        let len = $crate::floor_char_boundary(query, 497);
        format!(
            "{}{}",
            &query[..len].trim_end(),
            if query.len() > len { "..." } else { "" },
        )
    }};
}
