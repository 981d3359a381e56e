//! Codabar: 7 элементов на символ (4 полосы, 3 пробела), узкие/широкие.
//! Старт/стоп: одна из букв A..D. Между символами узкий пробел любой ширины.
//!
//! Строка сначала целиком превращается в ширины серий (начиная со светлой).
//! Символ распознаётся порогами «посередине между min и max» отдельно для
//! полос и для пробелов; затем весь символ проверяется ещё раз по средним
//! размерам четырёх категорий (узкие/широкие × полосы/пробелы).

use crate::core::{BarcodeFormat, BitRow, DecodeError, DecodeOptions, DecodeResult, DecodedSymbol, MetadataKey, Point};
use crate::one_d::OneDReader;

// Широкий элемент не шире 2× средней широкой (+ запас на пиксельную дискретизацию).
const MAX_ACCEPTABLE: f32 = 2.0;
const PADDING: f32 = 1.5;

pub const ALPHABET: &[u8; 20] = b"0123456789-$:/.+ABCD";

/// 7 бит на символ (бит 6 = первый элемент), 1 = широкий.
pub const CHARACTER_ENCODINGS: [u32; 20] = [
    0x003, 0x006, 0x009, 0x060, 0x012, 0x042, 0x021, 0x024, 0x030, 0x048, // 0-9
    0x00c, 0x018, 0x045, 0x051, 0x054, 0x015, 0x01A, 0x029, 0x00B, 0x00E, // -$:/.+ABCD
];

/// Меньше: почти наверняка ложное срабатывание (старт + стоп + хотя бы один).
const MIN_CHARACTER_LENGTH: usize = 3;

const STARTEND_ENCODING: [u8; 4] = [b'A', b'B', b'C', b'D'];

#[derive(Debug, Default)]
pub struct CodabarReader {
    counters: Vec<u32>,
    /// Индексы в `ALPHABET`.
    decoded: Vec<usize>,
    /// Первая светлая серия начинается с края строки.
    leading_edge: bool,
}

impl CodabarReader {
    pub fn new() -> Self {
        Self {
            counters: Vec::with_capacity(80),
            decoded: Vec::with_capacity(20),
            leading_edge: false,
        }
    }

    /// Ширины серий, начиная с первого светлого пикселя.
    fn set_counters(&mut self, row: &BitRow) -> DecodeResult<()> {
        self.counters.clear();
        let end = row.len();
        let mut i = row.next_unset(0);
        if i >= end {
            return Err(DecodeError::NotFound);
        }
        self.leading_edge = i == 0;
        let mut counting_dark = false;
        let mut count = 0u32;
        while i < end {
            if row.get(i) == counting_dark {
                count += 1;
            } else {
                self.counters.push(count);
                count = 1;
                counting_dark = !counting_dark;
            }
            i += 1;
        }
        self.counters.push(count);
        Ok(())
    }

    fn find_start_pattern(&self) -> DecodeResult<usize> {
        let mut i = 1;
        while i < self.counters.len() {
            if let Some(offset) = self.to_narrow_wide_pattern(i) {
                if STARTEND_ENCODING.contains(&ALPHABET[offset]) {
                    // светлое перед стартом: не меньше половины символа, либо оно
                    // обрезано краем строки; тёмное у края так не засчитывается
                    let pattern_size: u32 = self.counters[i..i + 7].iter().sum();
                    if (i == 1 && self.leading_edge) || self.counters[i - 1] >= pattern_size / 2 {
                        return Ok(i);
                    }
                }
            }
            i += 2;
        }
        Err(DecodeError::NotFound)
    }

    fn to_narrow_wide_pattern(&self, position: usize) -> Option<usize> {
        let end = position + 7;
        if end >= self.counters.len() {
            return None;
        }
        let c = &self.counters[position..end];
        let threshold = |offset: usize| {
            let (min, max) = c
                .iter()
                .skip(offset)
                .step_by(2)
                .fold((u32::MAX, 0u32), |(lo, hi), &v| (lo.min(v), hi.max(v)));
            (min + max) / 2
        };
        let threshold_bar = threshold(0);
        let threshold_space = threshold(1);

        let mut pattern = 0u32;
        for (i, &v) in c.iter().enumerate() {
            let t = if i & 1 == 0 { threshold_bar } else { threshold_space };
            if v > t {
                pattern |= 1 << (6 - i);
            }
        }
        CHARACTER_ENCODINGS.iter().position(|&e| e == pattern)
    }

    /// Повторная проверка: каждая полоса должна попасть в свою категорию размеров.
    fn validate_pattern(&self, start: usize) -> DecodeResult<()> {
        let mut sizes = [0u32; 4];
        let mut counts = [0u32; 4];

        let mut pos = start;
        for &offset in &self.decoded {
            let mut pattern = CHARACTER_ENCODINGS[offset];
            for j in (0..7).rev() {
                // чётные j для полос, нечётные для пробелов; категории 2 и 3 широкие
                let category = (j & 1) + (pattern & 1) as usize * 2;
                sizes[category] += self.counters[pos + j];
                counts[category] += 1;
                pattern >>= 1;
            }
            // межсимвольный пробел не учитываем
            pos += 8;
        }

        let mut mins = [0f32; 4];
        let mut maxes = [0f32; 4];
        for i in 0..2 {
            mins[i + 2] = (sizes[i] as f32 / counts[i] as f32 + sizes[i + 2] as f32 / counts[i + 2] as f32) / 2.0;
            maxes[i] = mins[i + 2];
            maxes[i + 2] = (sizes[i + 2] as f32 * MAX_ACCEPTABLE + PADDING) / counts[i + 2] as f32;
        }

        let mut pos = start;
        for &offset in &self.decoded {
            let mut pattern = CHARACTER_ENCODINGS[offset];
            for j in (0..7).rev() {
                let category = (j & 1) + (pattern & 1) as usize * 2;
                let size = self.counters[pos + j] as f32;
                if size < mins[category] || size > maxes[category] {
                    return Err(DecodeError::NotFound);
                }
                pattern >>= 1;
            }
            pos += 8;
        }
        Ok(())
    }
}

impl OneDReader for CodabarReader {
    fn decode_row(&mut self, row_number: usize, row: &BitRow, opts: &DecodeOptions) -> DecodeResult<DecodedSymbol> {
        self.set_counters(row)?;
        let start_offset = self.find_start_pattern()?;
        let mut next_start = start_offset;
        self.decoded.clear();

        loop {
            let offset = self.to_narrow_wide_pattern(next_start).ok_or(DecodeError::NotFound)?;
            self.decoded.push(offset);
            next_start += 8;
            // стоп: первая буква A..D после старта
            if self.decoded.len() > 1 && STARTEND_ENCODING.contains(&ALPHABET[offset]) {
                break;
            }
            if next_start >= self.counters.len() {
                break;
            }
        }

        // светлое после символа: не меньше половины последнего символа, если строка не кончилась
        let trailing_whitespace = self.counters[next_start - 1];
        let last_pattern_size: u32 = self.counters[next_start - 8..next_start - 1].iter().sum();
        if next_start < self.counters.len() && trailing_whitespace < last_pattern_size / 2 {
            return Err(DecodeError::NotFound);
        }

        self.validate_pattern(start_offset)?;

        let mut text: Vec<u8> = self.decoded.iter().map(|&o| ALPHABET[o]).collect();
        let (Some(first), Some(last)) = (text.first(), text.last()) else {
            return Err(DecodeError::NotFound);
        };
        if !STARTEND_ENCODING.contains(first) || !STARTEND_ENCODING.contains(last) {
            return Err(DecodeError::NotFound);
        }
        if text.len() <= MIN_CHARACTER_LENGTH {
            return Err(DecodeError::NotFound);
        }
        if !opts.return_codabar_start_end {
            text.pop();
            text.remove(0);
        }

        let left: u32 = self.counters[..start_offset].iter().sum();
        let right = left + self.counters[start_offset..next_start - 1].iter().sum::<u32>();
        let y = row_number as f32;
        let text = String::from_utf8(text).map_err(|_| DecodeError::InvalidFormat)?;
        Ok(DecodedSymbol::new(BarcodeFormat::Codabar, text)
            .with_points([Point::new(left as f32, y), Point::new(right as f32, y)])
            .with_metadata(MetadataKey::SymbologyIdentifier, "]F0"))
    }
}

// === Синтезатор ===

/// Ширины Codabar (узкий = 1, широкий = 3). Если текст не обрамлён A..D,
/// добавляются `A` и `B`.
pub fn encode_codabar(text: &str) -> Option<Vec<u32>> {
    let b = text.as_bytes();
    let framed = b.len() >= 2
        && STARTEND_ENCODING.contains(&b[0])
        && STARTEND_ENCODING.contains(&b[b.len() - 1]);
    let full: Vec<u8> = if framed {
        b.to_vec()
    } else {
        [b"A".as_slice(), b, b"B"].concat()
    };
    let mut out = Vec::with_capacity(full.len() * 8);
    for (k, ch) in full.iter().enumerate() {
        let idx = ALPHABET.iter().position(|a| a == ch)?;
        if k > 0 {
            out.push(1);
        }
        let enc = CHARACTER_ENCODINGS[idx];
        for i in (0..7).rev() {
            out.push(if enc >> i & 1 == 1 { 3 } else { 1 });
        }
    }
    Some(out)
}
