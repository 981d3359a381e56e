//! Code 39: 9 элементов на символ (5 полос, 4 пробела), ровно 3 из них широкие.
//!
//! 1) Ищем `*` с тихой зоной не уже половины символа.
//! 2) Читаем символы по 9 элементов до следующего `*`; ширину «узкого»
//!    определяем порогом по самим счётчикам, без эталонных модулей.
//! 3) Тихая зона справа, необязательная контрольная mod 43, Full ASCII.

use crate::core::{BarcodeFormat, BitRow, DecodeError, DecodeOptions, DecodeResult, DecodedSymbol, MetadataKey, Point};
use crate::one_d::{record_pattern, shift_counters, sum, OneDReader};

pub const ALPHABET: &[u8; 43] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ-. $/+%";

/// Биты 8..0 = элементы слева направо, 1: широкий.
pub const CHARACTER_ENCODINGS: [u32; 43] = [
    0x034, 0x121, 0x061, 0x160, 0x031, 0x130, 0x070, 0x025, 0x124, 0x064, // 0-9
    0x109, 0x049, 0x148, 0x019, 0x118, 0x058, 0x00D, 0x10C, 0x04C, 0x01C, // A-J
    0x103, 0x043, 0x142, 0x013, 0x112, 0x052, 0x007, 0x106, 0x046, 0x016, // K-T
    0x181, 0x0C1, 0x1C0, 0x091, 0x190, 0x0D0, 0x085, 0x184, 0x0C4, 0x0A8, // U-$
    0x0A2, 0x08A, 0x02A, // /-%
];

pub const ASTERISK_ENCODING: u32 = 0x094;

#[derive(Debug, Default)]
pub struct Code39Reader {
    using_check_digit: bool,
    extended_mode: bool,
    counters: [u32; 9],
    result: String,
}

impl Code39Reader {
    pub fn new(using_check_digit: bool, extended_mode: bool) -> Self {
        Self {
            using_check_digit,
            extended_mode,
            ..Default::default()
        }
    }

    pub fn from_options(opts: &DecodeOptions) -> Self {
        Self::new(opts.assume_code39_check_digit, opts.code39_extended_mode)
    }
}

impl OneDReader for Code39Reader {
    fn decode_row(&mut self, row_number: usize, row: &BitRow, _opts: &DecodeOptions) -> DecodeResult<DecodedSymbol> {
        self.result.clear();
        let start = find_asterisk_pattern(row, &mut self.counters)?;
        let mut next_start = row.next_set(start.end);
        let end = row.len();

        let mut last_start;
        loop {
            record_pattern(row, next_start, &mut self.counters)?;
            let pattern = to_narrow_wide_pattern(&self.counters).ok_or(DecodeError::NotFound)?;
            let decoded = pattern_to_char(pattern)?;
            self.result.push(decoded);
            last_start = next_start;
            next_start += sum(&self.counters);
            next_start = row.next_set(next_start);
            if decoded == '*' {
                break;
            }
        }
        self.result.pop();

        // тихая зона за `*`: не уже половины символа
        let last_pattern_size = sum(&self.counters);
        let white_after_end = next_start - last_start - last_pattern_size;
        if next_start != end && white_after_end * 2 < last_pattern_size {
            return Err(DecodeError::NotFound);
        }

        if self.using_check_digit {
            let Some(check) = self.result.pop() else {
                return Err(DecodeError::NotFound);
            };
            let total: usize = self.result.bytes().filter_map(alphabet_index).sum();
            if check as u32 != u32::from(ALPHABET[total % 43]) {
                return Err(DecodeError::ChecksumError);
            }
        }

        if self.result.is_empty() {
            // одни `*`: ложное срабатывание
            return Err(DecodeError::NotFound);
        }

        let text = if self.extended_mode {
            decode_extended(&self.result, ['+', '$', '%', '/'])?
        } else {
            self.result.clone()
        };

        let y = row_number as f32;
        let left = (start.start + start.end) as f32 / 2.0;
        let right = last_start as f32 + last_pattern_size as f32 / 2.0;
        Ok(DecodedSymbol::new(BarcodeFormat::Code39, text)
            .with_points([Point::new(left, y), Point::new(right, y)])
            .with_metadata(MetadataKey::SymbologyIdentifier, "]A0"))
    }
}

fn find_asterisk_pattern(row: &BitRow, counters: &mut [u32; 9]) -> DecodeResult<std::ops::Range<usize>> {
    let width = row.len();
    let row_offset = row.next_set(0);
    counters.fill(0);
    let mut pos = 0usize;
    let mut pattern_start = row_offset;
    let mut counting_dark = true;

    for i in row_offset..width {
        if row.get(i) == counting_dark {
            counters[pos] += 1;
            continue;
        }
        if pos == 8 {
            if to_narrow_wide_pattern(counters) == Some(ASTERISK_ENCODING) {
                let quiet_start = pattern_start.saturating_sub((i - pattern_start) / 2);
                if row.is_range(quiet_start, pattern_start, false) {
                    return Ok(pattern_start..i);
                }
            }
            pattern_start += (counters[0] + counters[1]) as usize;
            shift_counters(counters);
            pos -= 1;
        } else {
            pos += 1;
        }
        counters[pos] = 1;
        counting_dark = !counting_dark;
    }
    Err(DecodeError::NotFound)
}

/// Порог «узкий/широкий» поднимается, пока широких не станет ровно три.
/// Широкие не должны отличаться друг от друга больше чем в полтора раза от среднего.
pub fn to_narrow_wide_pattern(counters: &[u32]) -> Option<u32> {
    let n = counters.len();
    let mut max_narrow_counter = 0u32;
    for _ in 0..n {
        let min_counter = counters
            .iter()
            .copied()
            .filter(|&c| c > max_narrow_counter)
            .min()?;
        max_narrow_counter = min_counter;

        let mut wide_counters = 0;
        let mut total_wide_width = 0u32;
        let mut pattern = 0u32;
        for (i, &c) in counters.iter().enumerate() {
            if c > max_narrow_counter {
                pattern |= 1 << (n - 1 - i);
                wide_counters += 1;
                total_wide_width += c;
            }
        }
        if wide_counters == 3 {
            let too_wide = counters
                .iter()
                .filter(|&&c| c > max_narrow_counter)
                .any(|&c| c * 2 >= total_wide_width);
            return if too_wide { None } else { Some(pattern) };
        }
        if wide_counters < 3 {
            return None;
        }
    }
    None
}

fn pattern_to_char(pattern: u32) -> DecodeResult<char> {
    if pattern == ASTERISK_ENCODING {
        return Ok('*');
    }
    CHARACTER_ENCODINGS
        .iter()
        .position(|&e| e == pattern)
        .map(|i| char::from(ALPHABET[i]))
        .ok_or(DecodeError::NotFound)
}

#[inline]
fn alphabet_index(b: u8) -> Option<usize> {
    ALPHABET.iter().position(|&a| a == b)
}

/// Full ASCII: пары «сдвиг + буква». `shifts` содержит символы сдвигов в порядке
/// `[строчные, управляющие 1..26, прочие %, пунктуация /]`.
pub(crate) fn decode_extended(encoded: &str, shifts: [char; 4]) -> DecodeResult<String> {
    let [lower, ctrl, misc, punct] = shifts;
    let chars: Vec<char> = encoded.chars().collect();
    let mut out = String::with_capacity(chars.len());
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if c != lower && c != ctrl && c != misc && c != punct {
            out.push(c);
            i += 1;
            continue;
        }
        let next = *chars.get(i + 1).ok_or(DecodeError::InvalidFormat)?;
        let n = next as u32;
        let decoded = if c == lower {
            next.is_ascii_uppercase().then(|| n + 32)
        } else if c == ctrl {
            next.is_ascii_uppercase().then(|| n - 64)
        } else if c == misc {
            match next {
                'A'..='E' => Some(n - 38),
                'F'..='J' => Some(n - 11),
                'K'..='O' => Some(n + 16),
                'P'..='T' => Some(n + 43),
                'U' => Some(0),
                'V' => Some(u32::from(b'@')),
                'W' => Some(u32::from(b'`')),
                'X' | 'Y' | 'Z' => Some(127),
                _ => None,
            }
        } else {
            match next {
                'A'..='O' => Some(n - 32),
                'Z' => Some(u32::from(b':')),
                _ => None,
            }
        };
        let decoded = decoded.and_then(char::from_u32).ok_or(DecodeError::InvalidFormat)?;
        out.push(decoded);
        i += 2;
    }
    Ok(out)
}

/// Обратное к `decode_extended`: символ ASCII → один или два символа базового алфавита.
pub(crate) fn encode_extended_char(ch: char, shifts: [char; 4], native: &[u8]) -> Option<(char, Option<char>)> {
    let [lower, ctrl, misc, punct] = shifts;
    let v = u32::from(ch);
    if v > 127 {
        return None;
    }
    let b = v as u8;
    if native.contains(&b) {
        return Some((ch, None));
    }
    let pair = |s: char, n: u32| Some((s, char::from_u32(n)));
    match b {
        0 => pair(misc, u32::from(b'U')),
        1..=26 => pair(ctrl, v + 64),
        27..=31 => pair(misc, v + 38),
        33..=47 => pair(punct, v + 32),
        58 => pair(punct, u32::from(b'Z')),
        59..=63 => pair(misc, v - 11),
        64 => pair(misc, u32::from(b'V')),
        91..=95 => pair(misc, v - 16),
        96 => pair(misc, u32::from(b'W')),
        97..=122 => pair(lower, v - 32),
        123..=127 => pair(misc, v - 43),
        _ => Some((ch, None)),
    }
}

// === Синтезатор ===

/// Ширины одного символа по его 9-битной кодировке (узкий = 1, широкий = 3).
fn push_char(out: &mut Vec<u32>, encoding: u32) {
    for i in (0..9).rev() {
        out.push(if encoding >> i & 1 == 1 { 3 } else { 1 });
    }
}

/// Ширины Code 39. Текст вне базового алфавита кодируется парами Full ASCII.
pub fn encode_code39(text: &str, with_check_digit: bool) -> Option<Vec<u32>> {
    let mut body = String::with_capacity(text.len() * 2);
    if text.bytes().all(|b| alphabet_index(b).is_some()) {
        body.push_str(text);
    } else {
        for ch in text.chars() {
            let (a, b) = encode_extended_char(ch, ['+', '$', '%', '/'], &ALPHABET[..39])?;
            body.push(a);
            body.extend(b);
        }
    }
    if body.is_empty() {
        return None;
    }
    if with_check_digit {
        let total: usize = body.bytes().filter_map(alphabet_index).sum();
        body.push(char::from(ALPHABET[total % 43]));
    }

    let mut out = Vec::with_capacity((body.len() + 2) * 10);
    push_char(&mut out, ASTERISK_ENCODING);
    for b in body.bytes() {
        out.push(1);
        push_char(&mut out, CHARACTER_ENCODINGS[alphabet_index(b)?]);
    }
    out.push(1);
    push_char(&mut out, ASTERISK_ENCODING);
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::one_d::synth::render_row;

    fn decode_with(reader: &mut Code39Reader, widths: &[u32]) -> DecodeResult<DecodedSymbol> {
        reader.decode_row(0, &render_row(widths, 2, 10), &DecodeOptions::default())
    }

    #[test]
    fn narrow_wide_classifier() {
        assert_eq!(to_narrow_wide_pattern(&[2, 6, 2, 2, 6, 2, 6, 2, 2]), Some(ASTERISK_ENCODING));
        assert_eq!(to_narrow_wide_pattern(&[1, 1, 1, 3, 1, 3, 1, 3, 1]), Some(0b000101010));
        // четыре одинаково широких: не символ Code 39
        assert_eq!(to_narrow_wide_pattern(&[3, 1, 3, 1, 3, 1, 3, 1, 1]), None);
        // один широкий слишком широк относительно остальных
        assert_eq!(to_narrow_wide_pattern(&[9, 1, 3, 1, 3, 1, 1, 1, 1]), None);
    }

    #[test]
    fn plain() {
        let sym = decode_with(&mut Code39Reader::new(false, false), &encode_code39("CODE-39 $", false).unwrap()).unwrap();
        assert_eq!(sym.text, "CODE-39 $");
        assert_eq!(sym.format, BarcodeFormat::Code39);
        assert_eq!(
            sym.metadata.get(MetadataKey::SymbologyIdentifier).and_then(|v| v.as_text()),
            Some("]A0")
        );
    }

    #[test]
    fn check_digit() {
        let widths = encode_code39("CODE39", true).unwrap();
        let sym = decode_with(&mut Code39Reader::new(true, false), &widths).unwrap();
        assert_eq!(sym.text, "CODE39");
        // без флага контрольная остаётся в тексте
        let raw = decode_with(&mut Code39Reader::new(false, false), &widths).unwrap();
        assert_eq!(raw.text.len(), 7);
        // чужая контрольная
        let bad = encode_code39("CODE39X", false).unwrap();
        assert_eq!(
            decode_with(&mut Code39Reader::new(true, false), &bad),
            Err(DecodeError::ChecksumError)
        );
    }

    #[test]
    fn full_ascii() {
        let widths = encode_code39("Hello, World!", false).unwrap();
        let sym = decode_with(&mut Code39Reader::new(false, true), &widths).unwrap();
        assert_eq!(sym.text, "Hello, World!");
        let raw = decode_with(&mut Code39Reader::new(false, false), &widths).unwrap();
        assert_eq!(raw.text, "H+E+L+L+O/L W+O+R+L+D/A");
    }

    #[test]
    fn extended_errors() {
        let shifts = ['+', '$', '%', '/'];
        assert_eq!(decode_extended("AB+", shifts), Err(DecodeError::InvalidFormat));
        assert_eq!(decode_extended("+1", shifts), Err(DecodeError::InvalidFormat));
        assert_eq!(decode_extended("%U$M/Z", shifts).unwrap(), "\0\r:");
    }

    #[test]
    fn only_asterisks_is_not_a_symbol() {
        let mut widths = Vec::new();
        push_char(&mut widths, ASTERISK_ENCODING);
        widths.push(1);
        push_char(&mut widths, ASTERISK_ENCODING);
        assert_eq!(
            decode_with(&mut Code39Reader::new(false, false), &widths),
            Err(DecodeError::NotFound)
        );
    }

    #[test]
    fn blocked_leading_margin_is_not_found() {
        let mut row = render_row(&encode_code39("ABC", false).unwrap(), 2, 10);
        for x in 0..18 {
            row.set(x, true);
        }
        assert_eq!(
            Code39Reader::new(false, false).decode_row(0, &row, &DecodeOptions::default()),
            Err(DecodeError::NotFound)
        );
    }
}
