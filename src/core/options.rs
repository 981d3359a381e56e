// src/core/options.rs
//
// Подсказки декодеру. Отсутствие значения (None/false) = поведение по умолчанию
// каждой символики.

use std::fmt;
use std::sync::Arc;

use super::types::{BarcodeFormat, Point};

/// Наблюдатель: вызывается во время декодирования, когда найдена опорная точка.
pub type ResultPointCallback = Arc<dyn Fn(Point) + Send + Sync>;

#[derive(Clone, Default)]
pub struct DecodeOptions {
    /// Тщательнее: больше строк, поворот на 90°.
    pub try_harder: bool,
    /// При `try_harder` не пробовать повёрнутое изображение.
    pub disable_rotation: bool,
    /// Ограничить набор символик; `None`: стандартный набор.
    pub possible_formats: Option<Vec<BarcodeFormat>>,
    /// Последний символ Code 39: контрольный (mod 43).
    pub assume_code39_check_digit: bool,
    /// Code 39 Full ASCII: пары `+A`, `$A`, `%A`, `/A`.
    pub code39_extended_mode: bool,
    /// Последняя цифра MSI: контрольная (Luhn).
    pub assume_msi_check_digit: bool,
    /// Разрешённые длины ITF; `None`: {6, 8, 10, 12, 14}.
    pub allowed_lengths: Option<Vec<usize>>,
    /// Разрешённые длины дополнений UPC/EAN (2, 5). Длина 0 = «без дополнения».
    pub allowed_ean_extensions: Option<Vec<usize>>,
    /// Трактовать Code 128 как GS1-128 (FNC1 → `]C1` / GS).
    pub assume_gs1: bool,
    /// Не отрезать start/stop символы Codabar.
    pub return_codabar_start_end: bool,
    /// Если ничего не найдено: повторить на негативе.
    pub also_inverted: bool,
    pub result_point_callback: Option<ResultPointCallback>,
}

impl DecodeOptions {
    /// Разрешён ли формат (без ограничения: разрешены все).
    #[inline]
    pub fn allows(&self, format: BarcodeFormat) -> bool {
        self.possible_formats
            .as_ref()
            .map_or(true, |v| v.contains(&format))
    }

    /// Копия без наблюдателя (для повторной попытки на развёрнутой строке).
    pub fn without_result_point_callback(&self) -> Self {
        Self {
            result_point_callback: None,
            ..self.clone()
        }
    }

    #[inline]
    pub(crate) fn notify(&self, x: f32, y: f32) {
        if let Some(cb) = &self.result_point_callback {
            cb(Point::new(x, y));
        }
    }
}

impl fmt::Debug for DecodeOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DecodeOptions")
            .field("try_harder", &self.try_harder)
            .field("disable_rotation", &self.disable_rotation)
            .field("possible_formats", &self.possible_formats)
            .field("assume_code39_check_digit", &self.assume_code39_check_digit)
            .field("code39_extended_mode", &self.code39_extended_mode)
            .field("assume_msi_check_digit", &self.assume_msi_check_digit)
            .field("allowed_lengths", &self.allowed_lengths)
            .field("allowed_ean_extensions", &self.allowed_ean_extensions)
            .field("assume_gs1", &self.assume_gs1)
            .field("return_codabar_start_end", &self.return_codabar_start_end)
            .field("also_inverted", &self.also_inverted)
            .field(
                "result_point_callback",
                &self.result_point_callback.as_ref().map(|_| "Fn(Point)"),
            )
            .finish()
    }
}
