//! Diagnosis-code scanning for free-text queries
//!
//! A code token is one ASCII letter followed by two digits, optionally
//! followed by a `.` and one or more digits (`A09`, `A01.0`, `K35.80`).
//! Tokens must stand on word boundaries, so `XA01` and `A012` do not match.

/// Extract diagnosis codes from a query, upper-casing it first.
///
/// Codes are returned in order of first appearance, without duplicates.
pub fn extract_codes(query: &str) -> Vec<String> {
    let chars: Vec<char> = query.to_uppercase().chars().collect();
    let mut found: Vec<String> = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        match match_code_at(&chars, i) {
            Some(end) => {
                let code: String = chars[i..end].iter().collect();
                if !found.contains(&code) {
                    found.push(code);
                }
                i = end;
            }
            None => i += 1,
        }
    }

    found
}

fn is_word(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

fn is_boundary(chars: &[char], pos: usize) -> bool {
    pos >= chars.len() || !is_word(chars[pos])
}

/// Returns the end index of a code token starting at `start`
fn match_code_at(chars: &[char], start: usize) -> Option<usize> {
    if start > 0 && is_word(chars[start - 1]) {
        return None;
    }
    if !chars[start].is_ascii_uppercase() {
        return None;
    }

    let stem_end = start + 3;
    if stem_end > chars.len() || !chars[start + 1..stem_end].iter().all(char::is_ascii_digit) {
        return None;
    }

    // Prefer the decimal form when it ends on a boundary
    if chars.get(stem_end) == Some(&'.') {
        let digits = chars[stem_end + 1..]
            .iter()
            .take_while(|c| c.is_ascii_digit())
            .count();
        let decimal_end = stem_end + 1 + digits;
        if digits > 0 && is_boundary(chars, decimal_end) {
            return Some(decimal_end);
        }
    }

    is_boundary(chars, stem_end).then_some(stem_end)
}
