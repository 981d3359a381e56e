// src/core/error.rs
//
// Ошибки распознавания. Все три варианта: ожидаемые исходы на «чужих» строках,
// поэтому тип Copy и без аллокаций.

use thiserror::Error;

/// Почему строка/изображение не распознаны.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Error)]
pub enum DecodeError {
    /// Ни один поддерживаемый шаблон не найден.
    #[error("barcode not found")]
    NotFound,
    /// Старт найден, но структура символа нарушена.
    #[error("invalid barcode format")]
    InvalidFormat,
    /// Структура в порядке, но контрольная сумма не сошлась.
    #[error("barcode checksum mismatch")]
    ChecksumError,
}

impl DecodeError {
    /// `ChecksumError`: частный случай ошибки формата.
    #[inline]
    pub fn is_format_error(self) -> bool {
        matches!(self, Self::InvalidFormat | Self::ChecksumError)
    }
}

pub type DecodeResult<T> = Result<T, DecodeError>;
