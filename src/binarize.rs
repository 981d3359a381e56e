//! Бинаризация строк яркости в `BitRow`.
//!
//! Два варианта:
//! - глобальный порог на строку (смесь среднего и середины min/max): быстро,
//!   без аллокаций, но не любит градиенты освещения;
//! - адаптивный порог по скользящему среднему: лучше на неравномерной засветке.
//!
//! `BinaryBitmap` связывает источник яркости с бинаризатором и отдаёт
//! декодерам строки по запросу.

use crate::core::{BitRow, DecodeError, DecodeResult, LumaImage, LuminanceSource};

/// Строки с меньшим перепадом яркости считаем пустыми.
const MIN_DYNAMIC_RANGE: u8 = 24;

pub trait Binarizer {
    /// Заполнить `row` (ширина = ширине источника) строкой `y`: бит = тёмный.
    /// `NotFound`: на строке нет контраста.
    fn black_row(&self, source: &dyn LuminanceSource, y: usize, row: &mut BitRow) -> DecodeResult<()>;
}

/// Простой глобальный порог: смесь среднего и середины между min/max.
#[inline]
pub fn otsu_like_threshold(row: &[u8]) -> u8 {
    let (mut min_v, mut max_v) = (u8::MAX, 0u8);
    let mut sum: u64 = 0;
    for &v in row {
        min_v = min_v.min(v);
        max_v = max_v.max(v);
        sum += u64::from(v);
    }
    let mean = (sum / row.len().max(1) as u64) as u16;
    let mid = (u16::from(min_v) + u16::from(max_v)) / 2;
    ((mean + mid) / 2) as u8
}

#[inline]
fn dynamic_range(row: &[u8]) -> u8 {
    let (min_v, max_v) = row
        .iter()
        .fold((u8::MAX, 0u8), |(lo, hi), &v| (lo.min(v), hi.max(v)));
    max_v.saturating_sub(min_v)
}

/// Глобальный порог на каждую строку.
#[derive(Clone, Copy, Debug, Default)]
pub struct GlobalThresholdBinarizer;

impl Binarizer for GlobalThresholdBinarizer {
    fn black_row(&self, source: &dyn LuminanceSource, y: usize, row: &mut BitRow) -> DecodeResult<()> {
        let lum = source.row(y);
        assert_eq!(row.len(), lum.len(), "ширина BitRow не совпадает с источником");
        row.clear();
        if dynamic_range(&lum) < MIN_DYNAMIC_RANGE {
            return Err(DecodeError::NotFound);
        }
        let t = otsu_like_threshold(&lum);
        for (x, &v) in lum.iter().enumerate() {
            if v < t {
                row.set(x, true);
            }
        }
        Ok(())
    }
}

/// Адаптивная бинаризация по скользящему среднему окна с небольшим смещением `bias`.
/// Окно по умолчанию width/32, в диапазоне [8..64].
#[derive(Clone, Copy, Debug)]
pub struct AdaptiveMeanBinarizer {
    /// Небольшой «запас» в сторону чёрного.
    pub bias: i32,
}

impl Default for AdaptiveMeanBinarizer {
    fn default() -> Self {
        Self { bias: 5 }
    }
}

impl Binarizer for AdaptiveMeanBinarizer {
    fn black_row(&self, source: &dyn LuminanceSource, y: usize, row: &mut BitRow) -> DecodeResult<()> {
        let lum = source.row(y);
        let n = lum.len();
        assert_eq!(row.len(), n, "ширина BitRow не совпадает с источником");
        row.clear();
        if n == 0 || dynamic_range(&lum) < MIN_DYNAMIC_RANGE {
            return Err(DecodeError::NotFound);
        }
        let win = (n / 32).clamp(8, 64);

        // префиксные суммы для среднего по окну
        let mut pref: Vec<u32> = Vec::with_capacity(n + 1);
        pref.push(0);
        let mut acc = 0u32;
        for &v in lum.iter() {
            acc += u32::from(v);
            pref.push(acc);
        }

        for i in 0..n {
            let left = i.saturating_sub(win);
            let right = (i + win).min(n - 1);
            let len = (right - left + 1) as u32;
            let mean = ((pref[right + 1] - pref[left]) / len) as i32;
            if i32::from(lum[i]) < mean - self.bias {
                row.set(i, true);
            }
        }
        Ok(())
    }
}

/// Источник яркости + бинаризатор.
pub struct BinaryBitmap<'a> {
    source: &'a dyn LuminanceSource,
    binarizer: &'a dyn Binarizer,
}

impl<'a> BinaryBitmap<'a> {
    #[inline]
    pub fn new(source: &'a dyn LuminanceSource, binarizer: &'a dyn Binarizer) -> Self {
        Self { source, binarizer }
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.source.width()
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.source.height()
    }

    #[inline]
    pub fn binarizer(&self) -> &'a dyn Binarizer {
        self.binarizer
    }

    #[inline]
    pub fn black_row(&self, y: usize, row: &mut BitRow) -> DecodeResult<()> {
        self.binarizer.black_row(self.source, y, row)
    }

    #[inline]
    pub fn is_rotate_supported(&self) -> bool {
        self.source.is_rotate_supported()
    }

    /// Повёрнутая копия источника; бинаризатор тот же (`BinaryBitmap::new(&rotated, bm.binarizer())`).
    #[inline]
    pub fn rotate_counter_clockwise(&self) -> Option<LumaImage> {
        self.source.rotate_counter_clockwise()
    }
}
