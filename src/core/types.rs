// src/core/types.rs
//
// Общие типы и утилиты, независимые от конкретных декодеров.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Простое представление градаций серого.
/// Буфер `data`: построчно, по строкам (row-major), 8 бит на пиксель.
#[derive(Clone, Copy, Debug)]
pub struct GrayImage<'a> {
    pub data: &'a [u8],
    pub width: usize,
    pub height: usize,
}

impl<'a> GrayImage<'a> {
    #[inline]
    pub fn row(&self, y: usize) -> &'a [u8] {
        let start = y * self.width;
        &self.data[start..start + self.width]
    }
}

/// LumaImage: «владельческая» картинка, удобная для пайплайна.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LumaImage {
    pub data: Vec<u8>,
    pub width: usize,
    pub height: usize,
}

impl LumaImage {
    /// Картинка из одной строки, повторённой `height` раз (синтетика для 1D).
    pub fn from_row_repeated(row: &[u8], height: usize) -> Self {
        let mut data = Vec::with_capacity(row.len() * height);
        for _ in 0..height {
            data.extend_from_slice(row);
        }
        Self {
            data,
            width: row.len(),
            height,
        }
    }

    #[inline]
    pub fn as_gray(&self) -> GrayImage<'_> {
        GrayImage {
            data: &self.data,
            width: self.width,
            height: self.height,
        }
    }

    #[inline]
    pub fn row(&self, y: usize) -> &[u8] {
        let start = y * self.width;
        &self.data[start..start + self.width]
    }

    #[inline]
    pub fn pixel(&self, x: usize, y: usize) -> u8 {
        self.data[y * self.width + x]
    }
}

/// Позволяем делать `.into()` из GrayImage в LumaImage (копия буфера).
impl<'a> From<GrayImage<'a>> for LumaImage {
    #[inline]
    fn from(g: GrayImage<'a>) -> Self {
        Self {
            data: g.data.to_vec(),
            width: g.width,
            height: g.height,
        }
    }
}

/// Точка результата в координатах исходного изображения.
/// Для 1D это обычно левая/правая граница символа на строке сканирования.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    #[inline]
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Поддерживаемые символики.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub enum BarcodeFormat {
    Codabar,
    Code39,
    Code93,
    Code128,
    Ean8,
    Ean13,
    Itf,
    Msi,
    Plessey,
    PharmaCode,
    UpcA,
    UpcE,
    /// 2- или 5-значное дополнение к UPC/EAN (само по себе не возвращается).
    UpcEanExtension,
}

impl BarcodeFormat {
    pub const ALL: [BarcodeFormat; 13] = [
        Self::Codabar,
        Self::Code39,
        Self::Code93,
        Self::Code128,
        Self::Ean8,
        Self::Ean13,
        Self::Itf,
        Self::Msi,
        Self::Plessey,
        Self::PharmaCode,
        Self::UpcA,
        Self::UpcE,
        Self::UpcEanExtension,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::Codabar => "CODABAR",
            Self::Code39 => "CODE_39",
            Self::Code93 => "CODE_93",
            Self::Code128 => "CODE_128",
            Self::Ean8 => "EAN_8",
            Self::Ean13 => "EAN_13",
            Self::Itf => "ITF",
            Self::Msi => "MSI",
            Self::Plessey => "PLESSEY",
            Self::PharmaCode => "PHARMA_CODE",
            Self::UpcA => "UPC_A",
            Self::UpcE => "UPC_E",
            Self::UpcEanExtension => "UPC_EAN_EXTENSION",
        }
    }

    /// Входит ли формат в семейство UPC/EAN.
    #[inline]
    pub fn is_upc_ean(self) -> bool {
        matches!(self, Self::Ean8 | Self::Ean13 | Self::UpcA | Self::UpcE)
    }
}

impl fmt::Display for BarcodeFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Clone, Debug, Eq, PartialEq, Error)]
#[error("unknown barcode format: {0}")]
pub struct ParseFormatError(pub String);

/// Разбор без учёта регистра; `-`/`_` и их отсутствие равнозначны (`ean13`, `EAN-13`, `EAN_13`).
impl FromStr for BarcodeFormat {
    type Err = ParseFormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let norm: String = s
            .chars()
            .filter(|c| *c != '_' && *c != '-')
            .map(|c| c.to_ascii_uppercase())
            .collect();
        Self::ALL
            .iter()
            .copied()
            .find(|f| f.name().replace('_', "") == norm)
            .ok_or_else(|| ParseFormatError(s.to_string()))
    }
}

/// Ключи метаданных результата.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub enum MetadataKey {
    /// Поворот в градусах, на который найден символ (0/90/180/270).
    Orientation,
    /// Номер выпуска из 2-значного дополнения.
    IssueNumber,
    /// Рекомендованная цена из 5-значного дополнения.
    SuggestedPrice,
    /// Страна по префиксу GS1.
    PossibleCountry,
    /// Текст найденного дополнения UPC/EAN.
    UpcEanExtension,
    /// Идентификатор символики вида `]C0`.
    SymbologyIdentifier,
    Other,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum MetadataValue {
    Int(i32),
    Text(String),
}

impl MetadataValue {
    #[inline]
    pub fn as_int(&self) -> Option<i32> {
        match self {
            Self::Int(v) => Some(*v),
            Self::Text(_) => None,
        }
    }

    #[inline]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            Self::Int(_) => None,
        }
    }
}

impl From<i32> for MetadataValue {
    fn from(v: i32) -> Self {
        Self::Int(v)
    }
}

impl From<String> for MetadataValue {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl From<&str> for MetadataValue {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl fmt::Display for MetadataValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{v}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

/// Дополнительная мета-информация о распознавании.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ResultMetadata {
    pub entries: BTreeMap<MetadataKey, MetadataValue>,
}

impl ResultMetadata {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn with(mut self, key: MetadataKey, value: impl Into<MetadataValue>) -> Self {
        self.entries.insert(key, value.into());
        self
    }

    #[inline]
    pub fn insert(&mut self, key: MetadataKey, value: impl Into<MetadataValue>) {
        self.entries.insert(key, value.into());
    }

    #[inline]
    pub fn get(&self, key: MetadataKey) -> Option<&MetadataValue> {
        self.entries.get(&key)
    }

    #[inline]
    pub fn extend(&mut self, other: &ResultMetadata) {
        for (k, v) in &other.entries {
            self.entries.insert(*k, v.clone());
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Распознанный символ.
#[derive(Clone, Debug, PartialEq)]
pub struct DecodedSymbol {
    pub format: BarcodeFormat,
    pub text: String,
    pub bytes: Option<Vec<u8>>,
    pub points: Vec<Point>,
    pub metadata: ResultMetadata,
}

impl DecodedSymbol {
    #[inline]
    pub fn new(format: BarcodeFormat, text: impl Into<String>) -> Self {
        Self {
            format,
            text: text.into(),
            bytes: None,
            points: Vec::new(),
            metadata: ResultMetadata::new(),
        }
    }

    #[inline]
    pub fn with_bytes(mut self, b: Vec<u8>) -> Self {
        self.bytes = Some(b);
        self
    }

    #[inline]
    pub fn with_points(mut self, points: impl IntoIterator<Item = Point>) -> Self {
        self.points = points.into_iter().collect();
        self
    }

    #[inline]
    pub fn with_metadata(mut self, key: MetadataKey, value: impl Into<MetadataValue>) -> Self {
        self.metadata.insert(key, value);
        self
    }

    #[inline]
    pub fn put_metadata(&mut self, key: MetadataKey, value: impl Into<MetadataValue>) {
        self.metadata.insert(key, value);
    }

    /// Угол ориентации (0, если не проставлен).
    #[inline]
    pub fn orientation(&self) -> i32 {
        self.metadata
            .get(MetadataKey::Orientation)
            .and_then(MetadataValue::as_int)
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_parses_loosely() {
        assert_eq!("ean13".parse::<BarcodeFormat>(), Ok(BarcodeFormat::Ean13));
        assert_eq!("EAN-8".parse::<BarcodeFormat>(), Ok(BarcodeFormat::Ean8));
        assert_eq!("code_128".parse::<BarcodeFormat>(), Ok(BarcodeFormat::Code128));
        assert_eq!("Pharma-Code".parse::<BarcodeFormat>(), Ok(BarcodeFormat::PharmaCode));
        assert!("qr".parse::<BarcodeFormat>().is_err());
        for f in BarcodeFormat::ALL {
            assert_eq!(f.to_string().parse::<BarcodeFormat>(), Ok(f));
        }
    }

    #[test]
    fn metadata_merge_and_orientation() {
        let mut s = DecodedSymbol::new(BarcodeFormat::Code39, "ABC")
            .with_metadata(MetadataKey::SymbologyIdentifier, "]A0");
        assert_eq!(s.orientation(), 0);
        let extra = ResultMetadata::new().with(MetadataKey::Orientation, 180);
        s.metadata.extend(&extra);
        assert_eq!(s.orientation(), 180);
        assert_eq!(
            s.metadata.get(MetadataKey::SymbologyIdentifier).and_then(MetadataValue::as_text),
            Some("]A0")
        );
    }

    #[test]
    fn repeated_row_image() {
        let img = LumaImage::from_row_repeated(&[0, 255, 0], 4);
        assert_eq!((img.width, img.height), (3, 4));
        assert_eq!(img.row(3), &[0, 255, 0]);
        assert_eq!(img.as_gray().row(1), &[0, 255, 0]);
    }
}
