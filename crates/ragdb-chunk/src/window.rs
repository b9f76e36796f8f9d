/// Sliding windows over a character count: `[start, end)` pairs where
/// consecutive starts differ by `size - overlap` and the last window may
/// be shorter. `overlap < size` is guaranteed by config validation.
pub fn windows(len: usize, size: usize, overlap: usize) -> Vec<(usize, usize)> {
    let mut out = Vec::new();
    if len == 0 {
        return out;
    }
    let step = size - overlap;
    let mut start = 0;
    loop {
        let end = (start + size).min(len);
        out.push((start, end));
        if end >= len {
            break;
        }
        start += step;
    }
    out
}
