// src/api.rs
//
// Верхний уровень: источник яркости → бинаризация → все разрешённые 1D декодеры.
// Pipeline дешёво клонируется; декодеры с рабочими буферами создаются на каждый
// вызов, поэтому один Pipeline можно делить между потоками. Общим остаётся только
// порядок опроса форматов: удачный формат пробуется первым и в следующем кадре.

use std::sync::{Arc, Mutex, PoisonError};

use tracing::debug;

use crate::binarize::{AdaptiveMeanBinarizer, Binarizer, BinaryBitmap, GlobalThresholdBinarizer};
use crate::core::{BarcodeFormat, DecodeOptions, DecodeResult, DecodedSymbol, LuminanceSource, Point};
use crate::one_d::{MultiFormatOneDReader, OneDReader};

/// Какой бинаризатор использовать.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum BinarizerKind {
    /// Глобальный порог на строку.
    #[default]
    Global,
    /// Скользящее среднее со смещением `bias`.
    AdaptiveMean { bias: i32 },
}

#[derive(Clone, Debug, Default)]
pub struct Pipeline {
    options: DecodeOptions,
    binarizer: BinarizerKind,
    /// Порядок опроса декодеров после последнего успеха; клоны делят его.
    reader_order: Arc<Mutex<Vec<BarcodeFormat>>>,
}

impl Pipeline {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::default()
    }

    #[inline]
    pub fn options(&self) -> &DecodeOptions {
        &self.options
    }

    #[inline]
    pub fn binarizer(&self) -> BinarizerKind {
        self.binarizer
    }

    /// Порядок, в котором следующий вызов опросит декодеры. Пусто до первого успеха.
    pub fn reader_order(&self) -> Vec<BarcodeFormat> {
        self.reader_order.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Первый найденный символ. При `also_inverted`: ещё попытка на негативе.
    pub fn decode(&self, source: &dyn LuminanceSource) -> DecodeResult<DecodedSymbol> {
        let err = match self.decode_once(source) {
            Ok(r) => return Ok(r),
            Err(e) => e,
        };
        if !self.options.also_inverted || !source.is_invert_supported() {
            return Err(err);
        }
        let Some(inverted) = source.invert() else {
            return Err(err);
        };
        debug!("retrying on inverted image");
        self.decode_once(&inverted)
    }

    fn decode_once(&self, source: &dyn LuminanceSource) -> DecodeResult<DecodedSymbol> {
        let global = GlobalThresholdBinarizer;
        let adaptive;
        let binarizer: &dyn Binarizer = match self.binarizer {
            BinarizerKind::Global => &global,
            BinarizerKind::AdaptiveMean { bias } => {
                adaptive = AdaptiveMeanBinarizer { bias };
                &adaptive
            }
        };
        let bitmap = BinaryBitmap::new(source, binarizer);
        let mut reader = MultiFormatOneDReader::new(&self.options);
        {
            let order = self.reader_order.lock().unwrap_or_else(PoisonError::into_inner);
            if !order.is_empty() {
                reader.reorder(&order);
            }
        }
        let result = reader.decode(&bitmap, &self.options)?;
        *self.reader_order.lock().unwrap_or_else(PoisonError::into_inner) = reader.order();
        Ok(result)
    }
}

/// Сборщик `Pipeline`: `Pipeline::builder().try_harder(true).formats([..]).build()`.
#[derive(Clone, Debug, Default)]
pub struct PipelineBuilder {
    options: DecodeOptions,
    binarizer: BinarizerKind,
}

impl PipelineBuilder {
    /// Начать с готовых опций.
    pub fn options(mut self, options: DecodeOptions) -> Self {
        self.options = options;
        self
    }

    pub fn binarizer(mut self, kind: BinarizerKind) -> Self {
        self.binarizer = kind;
        self
    }

    pub fn try_harder(mut self, on: bool) -> Self {
        self.options.try_harder = on;
        self
    }

    pub fn disable_rotation(mut self, on: bool) -> Self {
        self.options.disable_rotation = on;
        self
    }

    pub fn formats(mut self, formats: impl IntoIterator<Item = BarcodeFormat>) -> Self {
        self.options.possible_formats = Some(formats.into_iter().collect());
        self
    }

    pub fn assume_code39_check_digit(mut self, on: bool) -> Self {
        self.options.assume_code39_check_digit = on;
        self
    }

    pub fn code39_extended_mode(mut self, on: bool) -> Self {
        self.options.code39_extended_mode = on;
        self
    }

    pub fn assume_msi_check_digit(mut self, on: bool) -> Self {
        self.options.assume_msi_check_digit = on;
        self
    }

    pub fn allowed_lengths(mut self, lengths: impl IntoIterator<Item = usize>) -> Self {
        self.options.allowed_lengths = Some(lengths.into_iter().collect());
        self
    }

    pub fn allowed_ean_extensions(mut self, lengths: impl IntoIterator<Item = usize>) -> Self {
        self.options.allowed_ean_extensions = Some(lengths.into_iter().collect());
        self
    }

    pub fn assume_gs1(mut self, on: bool) -> Self {
        self.options.assume_gs1 = on;
        self
    }

    pub fn return_codabar_start_end(mut self, on: bool) -> Self {
        self.options.return_codabar_start_end = on;
        self
    }

    pub fn also_inverted(mut self, on: bool) -> Self {
        self.options.also_inverted = on;
        self
    }

    pub fn on_result_point(mut self, callback: impl Fn(Point) + Send + Sync + 'static) -> Self {
        self.options.result_point_callback = Some(Arc::new(callback));
        self
    }

    pub fn build(self) -> Pipeline {
        Pipeline {
            options: self.options,
            binarizer: self.binarizer,
            reader_order: Arc::default(),
        }
    }
}
