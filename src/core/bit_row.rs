// src/core/bit_row.rs
//
// Одна бинаризованная строка изображения: бит = «тёмный пиксель».
// Хранится словами по 32 бита, младший бит слова: меньший индекс.

use std::fmt;

/// Битовая строка фиксированной длины (ширина строки в пикселях).
///
/// Выход за границы: ошибка вызывающего кода, поэтому здесь `assert!`,
/// а не `Result`.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct BitRow {
    bits: Vec<u32>,
    size: usize,
}

impl BitRow {
    /// Пустая (целиком светлая) строка заданной ширины.
    pub fn new(size: usize) -> Self {
        Self {
            bits: vec![0; size.div_ceil(32)],
            size,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.size
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    #[inline]
    pub fn get(&self, i: usize) -> bool {
        assert!(i < self.size, "BitRow::get: {i} >= {}", self.size);
        (self.bits[i / 32] >> (i & 31)) & 1 != 0
    }

    #[inline]
    pub fn set(&mut self, i: usize, value: bool) {
        assert!(i < self.size, "BitRow::set: {i} >= {}", self.size);
        let mask = 1u32 << (i & 31);
        if value {
            self.bits[i / 32] |= mask;
        } else {
            self.bits[i / 32] &= !mask;
        }
    }

    /// OR 32-битного слова в позицию `i` (должна быть кратна 32).
    pub fn set_bulk(&mut self, i: usize, word: u32) {
        assert!(i % 32 == 0, "BitRow::set_bulk: {i} не кратно 32");
        assert!(i < self.size, "BitRow::set_bulk: {i} >= {}", self.size);
        self.bits[i / 32] |= word;
        self.mask_tail();
    }

    /// Выставить все биты полуинтервала [start, end).
    pub fn set_range(&mut self, start: usize, end: usize) {
        self.check_range(start, end);
        for i in start..end {
            self.bits[i / 32] |= 1 << (i & 31);
        }
    }

    /// Сбросить все биты (ширина сохраняется).
    pub fn clear(&mut self) {
        self.bits.iter_mut().for_each(|w| *w = 0);
    }

    /// true, если все биты в [start, end) равны `value`. Пустой диапазон: true.
    pub fn is_range(&self, start: usize, end: usize, value: bool) -> bool {
        self.check_range(start, end);
        if start == end {
            return true;
        }
        let last = end - 1;
        let first_word = start / 32;
        let last_word = last / 32;
        for w in first_word..=last_word {
            let first_bit = if w > first_word { 0 } else { start & 31 };
            let last_bit = if w < last_word { 31 } else { last & 31 };
            // (2 << last) - (1 << first): маска битов first..=last
            let mask = ((2u64 << last_bit) - (1u64 << first_bit)) as u32;
            let expected = if value { mask } else { 0 };
            if self.bits[w] & mask != expected {
                return false;
            }
        }
        true
    }

    /// Индекс первого тёмного бита начиная с `from`; `len()`, если таких нет.
    pub fn next_set(&self, from: usize) -> usize {
        self.scan_from(from, false)
    }

    /// Индекс первого светлого бита начиная с `from`; `len()`, если таких нет.
    pub fn next_unset(&self, from: usize) -> usize {
        self.scan_from(from, true)
    }

    fn scan_from(&self, from: usize, invert: bool) -> usize {
        if from >= self.size {
            return self.size;
        }
        let load = |w: usize| if invert { !self.bits[w] } else { self.bits[w] };
        let mut word_idx = from / 32;
        let mut word = load(word_idx) & (u32::MAX << (from & 31));
        while word == 0 {
            word_idx += 1;
            if word_idx == self.bits.len() {
                return self.size;
            }
            word = load(word_idx);
        }
        (word_idx * 32 + word.trailing_zeros() as usize).min(self.size)
    }

    /// Развернуть порядок битов на месте (для чтения перевёрнутых кодов).
    pub fn reverse(&mut self) {
        let n = self.bits.len();
        if n == 0 {
            return;
        }
        let mut out: Vec<u32> = self.bits.iter().rev().map(|w| w.reverse_bits()).collect();
        // после разворота слов данные прижаты к старшему краю: сдвигаем вниз
        let offset = n * 32 - self.size;
        if offset != 0 {
            for i in 0..n - 1 {
                out[i] = (out[i] >> offset) | (out[i + 1] << (32 - offset));
            }
            out[n - 1] >>= offset;
        }
        self.bits = out;
    }

    /// Слова-хранилище (только чтение).
    #[inline]
    pub fn words(&self) -> &[u32] {
        &self.bits
    }

    fn mask_tail(&mut self) {
        let tail = self.size & 31;
        if tail != 0 {
            if let Some(last) = self.bits.last_mut() {
                *last &= (1u32 << tail) - 1;
            }
        }
    }

    #[inline]
    fn check_range(&self, start: usize, end: usize) {
        assert!(
            start <= end && end <= self.size,
            "BitRow: неверный диапазон [{start}, {end}) при длине {}",
            self.size
        );
    }
}

impl FromIterator<bool> for BitRow {
    fn from_iter<I: IntoIterator<Item = bool>>(iter: I) -> Self {
        let values: Vec<bool> = iter.into_iter().collect();
        let mut row = BitRow::new(values.len());
        for (i, &v) in values.iter().enumerate() {
            if v {
                row.bits[i / 32] |= 1 << (i & 31);
            }
        }
        row
    }
}

/// `X` тёмный, `.` светлый; удобно в тестах.
impl fmt::Display for BitRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for i in 0..self.size {
            f.write_str(if self.get(i) { "X" } else { "." })?;
        }
        Ok(())
    }
}

impl fmt::Debug for BitRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BitRow({}: {self})", self.size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row_from(s: &str) -> BitRow {
        s.chars().map(|c| c == 'X').collect()
    }

    #[test]
    fn get_set_roundtrip_across_words() {
        let mut r = BitRow::new(70);
        for i in [0, 31, 32, 33, 63, 64, 69] {
            r.set(i, true);
            assert!(r.get(i));
        }
        r.set(32, false);
        assert!(!r.get(32));
        assert!(!r.get(1));
    }

    #[test]
    #[should_panic]
    fn out_of_range_panics() {
        let r = BitRow::new(10);
        let _ = r.get(10);
    }

    #[test]
    fn next_set_and_unset_return_len_as_sentinel() {
        let r = row_from("....XX..X.");
        assert_eq!(r.next_set(0), 4);
        assert_eq!(r.next_unset(4), 6);
        assert_eq!(r.next_set(6), 8);
        assert_eq!(r.next_set(9), 10);
        assert_eq!(r.next_set(100), 10);

        let dark: BitRow = std::iter::repeat(true).take(40).collect();
        assert_eq!(dark.next_unset(0), 40);
    }

    #[test]
    fn is_range_checks_both_values() {
        let mut r = BitRow::new(100);
        r.set_range(30, 70);
        assert!(r.is_range(30, 70, true));
        assert!(!r.is_range(29, 70, true));
        assert!(r.is_range(0, 30, false));
        assert!(!r.is_range(0, 31, false));
        assert!(r.is_range(70, 100, false));
        assert!(r.is_range(50, 50, true));
    }

    #[test]
    fn reverse_mirrors_bits() {
        let src = "X..XX.X....XXX.X.X..XXXXX....X.X..X..XX";
        let mut r = row_from(src);
        r.reverse();
        let expected: String = src.chars().rev().collect();
        assert_eq!(r.to_string(), expected);
        r.reverse();
        assert_eq!(r.to_string(), src);
    }

    #[test]
    fn reverse_exact_word_multiple() {
        let mut r = BitRow::new(64);
        r.set(0, true);
        r.set(40, true);
        r.reverse();
        assert!(r.get(63));
        assert!(r.get(23));
        assert_eq!(r.next_set(0), 23);
    }

    #[test]
    fn set_bulk_ors_word() {
        let mut r = BitRow::new(40);
        r.set(33, true);
        r.set_bulk(32, 0b1);
        assert!(r.get(32));
        assert!(r.get(33));
        r.set_bulk(0, 0xF0);
        assert!(r.is_range(4, 8, true));
        assert!(r.is_range(0, 4, false));
    }
}
