//! 按外形尺寸估算加工报价。

use crate::errors::EngineError;

/// 材料厚度系数。
const THICKNESS_FACTOR: f64 = 1.5;
/// 材料密度系数。
const DENSITY_FACTOR: f64 = 8.0;
const MM2_PER_M2: f64 = 1_000_000.0;
const MATERIAL_RATE: f64 = 35.0;
const PROCESS_MULTIPLIER: f64 = 2.5;
const BASE_FEE: f64 = 200.0;
const MARGIN_MULTIPLIER: f64 = 1.8;
const DISCOUNT_MULTIPLIER: f64 = 0.9166;

/// 任一边超过该长度时加价 10%。
const OVERSIZE_EDGE_MM: f64 = 350.0;
const OVERSIZE_MULTIPLIER: f64 = 1.10;
/// 任一边超过该长度时另加固定费用。
const LONG_EDGE_MM: f64 = 990.0;
const LONG_EDGE_SURCHARGE: f64 = 200.0;
/// 合并下单时第一件之后每件的附加费。
const EXTRA_PART_FEE: f64 = 25.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuoteRequest {
    pub width_mm: f64,
    pub height_mm: f64,
    pub parts: u32,
}

impl QuoteRequest {
    pub fn new(width_mm: f64, height_mm: f64, parts: u32) -> Result<Self, EngineError> {
        let valid = |v: f64| v.is_finite() && v > 0.0;
        if !valid(width_mm) || !valid(height_mm) {
            return Err(EngineError::InvalidQuote(format!(
                "宽高必须为正数（宽 {width_mm}，高 {height_mm}）"
            )));
        }
        if parts == 0 {
            return Err(EngineError::InvalidQuote("零件数量至少为 1".into()));
        }
        Ok(Self {
            width_mm,
            height_mm,
            parts,
        })
    }

    pub fn price(&self) -> f64 {
        let (w, h) = (self.width_mm, self.height_mm);
        let material = w * h * THICKNESS_FACTOR * DENSITY_FACTOR / MM2_PER_M2;
        let mut price = (material * MATERIAL_RATE * PROCESS_MULTIPLIER + BASE_FEE)
            * MARGIN_MULTIPLIER
            * DISCOUNT_MULTIPLIER;

        if w > OVERSIZE_EDGE_MM || h > OVERSIZE_EDGE_MM {
            price *= OVERSIZE_MULTIPLIER;
        }
        if w > LONG_EDGE_MM || h > LONG_EDGE_MM {
            price += LONG_EDGE_SURCHARGE;
        }
        if self.parts > 1 {
            price += f64::from(self.parts - 1) * EXTRA_PART_FEE;
        }
        price
    }
}
