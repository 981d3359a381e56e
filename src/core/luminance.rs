// src/core/luminance.rs
//
// Источник яркости: ширина, высота, строка байтов 0..=255.
// Поворот/обрезка/инверсия: опциональные возможности, их сначала спрашивают.

use std::borrow::Cow;

use super::types::{GrayImage, LumaImage};

pub trait LuminanceSource {
    fn width(&self) -> usize;
    fn height(&self) -> usize;

    /// Строка `y` (0 тёмный, 255 светлый).
    fn row(&self, y: usize) -> Cow<'_, [u8]>;

    fn is_crop_supported(&self) -> bool {
        false
    }

    /// Вырезать прямоугольник; `None`, если не поддерживается или выходит за границы.
    fn crop(&self, _left: usize, _top: usize, _width: usize, _height: usize) -> Option<LumaImage> {
        None
    }

    fn is_rotate_supported(&self) -> bool {
        false
    }

    /// Повернуть на 90° против часовой стрелки.
    fn rotate_counter_clockwise(&self) -> Option<LumaImage> {
        None
    }

    fn is_invert_supported(&self) -> bool {
        false
    }

    /// Негатив (светлые коды на тёмном фоне).
    fn invert(&self) -> Option<LumaImage> {
        None
    }
}

// === Общие реализации поверх row-major буфера ===

fn crop_buf(
    data: &[u8],
    src_w: usize,
    src_h: usize,
    left: usize,
    top: usize,
    width: usize,
    height: usize,
) -> Option<LumaImage> {
    if left + width > src_w || top + height > src_h {
        return None;
    }
    let mut out = Vec::with_capacity(width * height);
    for y in top..top + height {
        let start = y * src_w + left;
        out.extend_from_slice(&data[start..start + width]);
    }
    Some(LumaImage {
        data: out,
        width,
        height,
    })
}

/// Пиксель (x, y) переезжает в (y, w - 1 - x).
fn rotate_ccw_buf(data: &[u8], w: usize, h: usize) -> LumaImage {
    let (nw, nh) = (h, w);
    let mut out = vec![0u8; w * h];
    for y in 0..h {
        for x in 0..w {
            out[(w - 1 - x) * nw + y] = data[y * w + x];
        }
    }
    LumaImage {
        data: out,
        width: nw,
        height: nh,
    }
}

fn invert_buf(data: &[u8], w: usize, h: usize) -> LumaImage {
    LumaImage {
        data: data.iter().map(|&v| 255 - v).collect(),
        width: w,
        height: h,
    }
}

impl LuminanceSource for LumaImage {
    #[inline]
    fn width(&self) -> usize {
        self.width
    }

    #[inline]
    fn height(&self) -> usize {
        self.height
    }

    #[inline]
    fn row(&self, y: usize) -> Cow<'_, [u8]> {
        Cow::Borrowed(LumaImage::row(self, y))
    }

    fn is_crop_supported(&self) -> bool {
        true
    }

    fn crop(&self, left: usize, top: usize, width: usize, height: usize) -> Option<LumaImage> {
        crop_buf(&self.data, self.width, self.height, left, top, width, height)
    }

    fn is_rotate_supported(&self) -> bool {
        true
    }

    fn rotate_counter_clockwise(&self) -> Option<LumaImage> {
        Some(rotate_ccw_buf(&self.data, self.width, self.height))
    }

    fn is_invert_supported(&self) -> bool {
        true
    }

    fn invert(&self) -> Option<LumaImage> {
        Some(invert_buf(&self.data, self.width, self.height))
    }
}

impl LuminanceSource for GrayImage<'_> {
    #[inline]
    fn width(&self) -> usize {
        self.width
    }

    #[inline]
    fn height(&self) -> usize {
        self.height
    }

    #[inline]
    fn row(&self, y: usize) -> Cow<'_, [u8]> {
        Cow::Borrowed(GrayImage::row(self, y))
    }

    fn is_crop_supported(&self) -> bool {
        true
    }

    fn crop(&self, left: usize, top: usize, width: usize, height: usize) -> Option<LumaImage> {
        crop_buf(self.data, self.width, self.height, left, top, width, height)
    }

    fn is_rotate_supported(&self) -> bool {
        true
    }

    fn rotate_counter_clockwise(&self) -> Option<LumaImage> {
        Some(rotate_ccw_buf(self.data, self.width, self.height))
    }

    fn is_invert_supported(&self) -> bool {
        true
    }

    fn invert(&self) -> Option<LumaImage> {
        Some(invert_buf(self.data, self.width, self.height))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> LumaImage {
        // 3×2:
        // 1 2 3
        // 4 5 6
        LumaImage {
            data: vec![1, 2, 3, 4, 5, 6],
            width: 3,
            height: 2,
        }
    }

    #[test]
    fn rotate_ccw_moves_right_column_to_top() {
        let r = sample().rotate_counter_clockwise().unwrap();
        assert_eq!((r.width, r.height), (2, 3));
        assert_eq!(r.row(0), &[3, 6]);
        assert_eq!(r.row(1), &[2, 5]);
        assert_eq!(r.row(2), &[1, 4]);
    }

    #[test]
    fn crop_and_invert() {
        let img = sample();
        let c = img.crop(1, 1, 2, 1).unwrap();
        assert_eq!(c.data, vec![5, 6]);
        assert!(img.crop(2, 0, 2, 1).is_none());
        assert_eq!(img.invert().unwrap().row(0), &[254, 253, 252]);
    }

    #[test]
    fn borrowed_view_matches_owned() {
        let img = sample();
        let g = img.as_gray();
        assert_eq!(LuminanceSource::row(&g, 1).as_ref(), &[4, 5, 6]);
        assert_eq!(g.rotate_counter_clockwise(), img.rotate_counter_clockwise());
    }
}
