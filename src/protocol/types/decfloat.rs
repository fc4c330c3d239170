//! IEEE 754 decimal floating point codec for DECFLOAT columns.
//!
//! DECFLOAT(16) and DECFLOAT(34) travel as decimal64 and decimal128 in the
//! densely packed decimal (DPD) encoding, big-endian:
//! - 1 sign bit
//! - 5-bit combination field with the two high exponent bits and the
//!   leading coefficient digit, or the infinity and NaN markers
//! - exponent continuation bits
//! - coefficient continuation as 10-bit declets of three digits each

use std::fmt;

use crate::error::{Error, Result};

/// Interchange format of a decimal floating point value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecimalFormat {
    /// decimal64, 16 digits.
    Decimal64,
    /// decimal128, 34 digits.
    Decimal128,
}

impl DecimalFormat {
    /// Encoded size in bytes.
    pub fn byte_len(self) -> usize {
        match self {
            DecimalFormat::Decimal64 => 8,
            DecimalFormat::Decimal128 => 16,
        }
    }

    /// Number of coefficient digits.
    pub fn precision(self) -> u32 {
        match self {
            DecimalFormat::Decimal64 => 16,
            DecimalFormat::Decimal128 => 34,
        }
    }

    fn continuation_bits(self) -> u32 {
        match self {
            DecimalFormat::Decimal64 => 8,
            DecimalFormat::Decimal128 => 12,
        }
    }

    fn declets(self) -> u32 {
        match self {
            DecimalFormat::Decimal64 => 5,
            DecimalFormat::Decimal128 => 11,
        }
    }

    fn bias(self) -> i32 {
        match self {
            DecimalFormat::Decimal64 => 398,
            DecimalFormat::Decimal128 => 6176,
        }
    }

    fn min_exponent(self) -> i32 {
        -self.bias()
    }

    fn max_exponent(self) -> i32 {
        (3 << self.continuation_bits()) - 1 - self.bias()
    }
}

/// A decimal floating point value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecFloat {
    /// `coefficient * 10^exponent`, negated when `negative`.
    Finite {
        negative: bool,
        coefficient: u128,
        exponent: i32,
    },
    Infinity {
        negative: bool,
    },
    NaN {
        signaling: bool,
    },
}

impl DecFloat {
    /// Exact value `unscaled * 10^-scale`.
    pub fn from_unscaled(unscaled: i128, scale: u32) -> Self {
        DecFloat::Finite {
            negative: unscaled < 0,
            coefficient: unscaled.unsigned_abs(),
            exponent: -(scale as i32),
        }
    }

    /// Parse plain or scientific notation, `NaN`, `sNaN` and `Infinity`
    /// (or `inf`), in any case.
    pub fn parse(text: &str) -> Result<Self> {
        let invalid = || Error::type_conversion(format!("Invalid DECFLOAT value {:?}", text));
        let trimmed = text.trim();
        let (negative, body) = match trimmed.as_bytes().first() {
            Some(b'-') => (true, &trimmed[1..]),
            Some(b'+') => (false, &trimmed[1..]),
            _ => (false, trimmed),
        };
        match body.to_ascii_lowercase().as_str() {
            "inf" | "infinity" => return Ok(DecFloat::Infinity { negative }),
            "nan" => return Ok(DecFloat::NaN { signaling: false }),
            "snan" => return Ok(DecFloat::NaN { signaling: true }),
            _ => {}
        }

        let (mantissa, exponent) = match body.find(|c: char| c == 'e' || c == 'E') {
            Some(idx) => {
                let exponent: i64 = body[idx + 1..].parse().map_err(|_| invalid())?;
                (&body[..idx], exponent)
            }
            None => (body, 0),
        };
        let (int_part, frac_part) = mantissa.split_once('.').unwrap_or((mantissa, ""));
        if int_part.is_empty() && frac_part.is_empty() {
            return Err(invalid());
        }
        let mut digits = Vec::with_capacity(int_part.len() + frac_part.len());
        for c in int_part.chars().chain(frac_part.chars()) {
            let d = c.to_digit(10).ok_or_else(invalid)? as u8;
            if !(digits.is_empty() && d == 0) {
                digits.push(d);
            }
        }
        let mut exponent = exponent - frac_part.len() as i64;

        // u128 holds 38 digits; the rest is rounded off here and again when
        // the value is fitted to a format
        const MAX_DIGITS: usize = 38;
        let mut round_up = false;
        if digits.len() > MAX_DIGITS {
            round_up = digits[MAX_DIGITS] >= 5;
            exponent += (digits.len() - MAX_DIGITS) as i64;
            digits.truncate(MAX_DIGITS);
        }
        let mut coefficient = digits.iter().fold(0u128, |acc, d| acc * 10 + *d as u128);
        if round_up {
            coefficient += 1;
        }
        let limit = (i32::MAX / 2) as i64;
        Ok(DecFloat::Finite {
            negative,
            coefficient,
            exponent: exponent.clamp(-limit, limit) as i32,
        })
    }

    /// Round to the precision and exponent range of `format`, half away
    /// from zero.
    ///
    /// Values too large for the format are a [`Error::NumericOverflow`];
    /// values below its smallest exponent round towards zero.
    pub fn fit(self, format: DecimalFormat) -> Result<Self> {
        let DecFloat::Finite {
            negative,
            coefficient,
            exponent,
        } = self
        else {
            return Ok(self);
        };
        let precision = format.precision();
        let limit = 10u128.pow(precision);
        let excess_digits = digit_count(coefficient) as i64 - precision as i64;
        let below_range = format.min_exponent() as i64 - exponent as i64;
        let drop = excess_digits.max(below_range).max(0);

        let mut coefficient = round_half_up(coefficient, drop);
        let mut exponent = exponent as i64 + drop;
        if coefficient == limit {
            coefficient /= 10;
            exponent += 1;
        }

        let max = format.max_exponent() as i64;
        if coefficient == 0 {
            exponent = exponent.clamp(format.min_exponent() as i64, max);
        }
        // trade exponent for trailing zeros while the coefficient has room
        while exponent > max && coefficient * 10 < limit {
            coefficient *= 10;
            exponent -= 1;
        }
        if exponent > max {
            return Err(Error::NumericOverflow {
                message: format!("{} out of range for {:?}", self, format),
            });
        }
        Ok(DecFloat::Finite {
            negative,
            coefficient,
            exponent: exponent as i32,
        })
    }

    /// Unscaled integer at `scale`, rounding half away from zero.
    pub fn to_unscaled(self, scale: u32) -> Result<i128> {
        let DecFloat::Finite {
            negative,
            coefficient,
            exponent,
        } = self
        else {
            return Err(Error::type_conversion(format!(
                "Cannot convert {} to an exact numeric",
                self
            )));
        };
        let overflow = || Error::NumericOverflow {
            message: format!("{} does not fit with scale {}", self, scale),
        };
        let shift = exponent as i64 + scale as i64;
        let magnitude = if coefficient == 0 {
            0
        } else if shift >= 0 {
            let factor = u32::try_from(shift)
                .ok()
                .and_then(|s| 10u128.checked_pow(s))
                .ok_or_else(overflow)?;
            coefficient.checked_mul(factor).ok_or_else(overflow)?
        } else {
            round_half_up(coefficient, -shift)
        };
        let magnitude = i128::try_from(magnitude).map_err(|_| overflow())?;
        Ok(if negative { -magnitude } else { magnitude })
    }

    /// Decode a big-endian DPD value.
    pub fn decode(format: DecimalFormat, data: &[u8]) -> Result<Self> {
        if data.len() != format.byte_len() {
            return Err(Error::protocol(format!(
                "{:?} value must be exactly {} bytes, got {}",
                format,
                format.byte_len(),
                data.len()
            )));
        }
        let mut padded = [0u8; 16];
        padded[16 - data.len()..].copy_from_slice(data);
        let bits = u128::from_be_bytes(padded);
        let total = format.byte_len() as u32 * 8;

        let negative = (bits >> (total - 1)) & 1 == 1;
        let combination = ((bits >> (total - 6)) & 0x1f) as u32;
        match combination {
            0b11110 => return Ok(DecFloat::Infinity { negative }),
            0b11111 => {
                return Ok(DecFloat::NaN {
                    signaling: (bits >> (total - 7)) & 1 == 1,
                })
            }
            _ => {}
        }
        let (exponent_high, leading) = if combination >> 3 == 0b11 {
            ((combination >> 1) & 0b11, 8 + (combination & 1))
        } else {
            (combination >> 3, combination & 0b111)
        };

        let continuation_bits = format.continuation_bits();
        let coefficient_bits = format.declets() * 10;
        let continuation = ((bits >> coefficient_bits) as u32) & ((1 << continuation_bits) - 1);
        let biased = (exponent_high << continuation_bits) | continuation;

        let mut coefficient = leading as u128;
        for i in (0..format.declets()).rev() {
            let declet = ((bits >> (10 * i)) & 0x3ff) as u16;
            coefficient = coefficient * 1000 + decode_declet(declet) as u128;
        }
        Ok(DecFloat::Finite {
            negative,
            coefficient,
            exponent: biased as i32 - format.bias(),
        })
    }

    /// Encode as big-endian DPD, rounding to the format first.
    pub fn encode(self, format: DecimalFormat) -> Result<Vec<u8>> {
        let total = format.byte_len() as u32 * 8;
        let bits = match self.fit(format)? {
            DecFloat::Infinity { negative } => {
                (negative as u128) << (total - 1) | 0b11110u128 << (total - 6)
            }
            DecFloat::NaN { signaling } => {
                0b11111u128 << (total - 6) | (signaling as u128) << (total - 7)
            }
            DecFloat::Finite {
                negative,
                coefficient,
                exponent,
            } => {
                let declets = format.declets();
                let continuation_bits = format.continuation_bits();
                let split = 10u128.pow(3 * declets);
                let leading = (coefficient / split) as u32;
                let biased = (exponent + format.bias()) as u32;
                let exponent_high = biased >> continuation_bits;
                let combination = if leading >= 8 {
                    0b11000 | (exponent_high << 1) | (leading & 1)
                } else {
                    (exponent_high << 3) | leading
                };

                let mut bits = (negative as u128) << (total - 1)
                    | (combination as u128) << (total - 6)
                    | ((biased & ((1 << continuation_bits) - 1)) as u128) << (declets * 10);
                let mut rest = coefficient % split;
                for i in 0..declets {
                    bits |= (encode_declet((rest % 1000) as u16) as u128) << (10 * i);
                    rest /= 1000;
                }
                bits
            }
        };
        Ok(bits.to_be_bytes()[16 - format.byte_len()..].to_vec())
    }
}

/// Plain notation when the exponent is at most zero and the value is not
/// tiny, scientific notation otherwise.
impl fmt::Display for DecFloat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            DecFloat::NaN { .. } => write!(f, "NaN"),
            DecFloat::Infinity { negative } => {
                write!(f, "{}Infinity", if negative { "-" } else { "" })
            }
            DecFloat::Finite {
                negative,
                coefficient,
                exponent,
            } => {
                if negative {
                    write!(f, "-")?;
                }
                let digits = coefficient.to_string();
                let adjusted = exponent as i64 + digits.len() as i64 - 1;
                if exponent <= 0 && adjusted >= -6 {
                    let scale = (-exponent) as usize;
                    if scale == 0 {
                        return write!(f, "{}", digits);
                    }
                    let padded = if digits.len() <= scale {
                        format!("{}{}", "0".repeat(scale - digits.len() + 1), digits)
                    } else {
                        digits
                    };
                    let (int_part, frac_part) = padded.split_at(padded.len() - scale);
                    write!(f, "{}.{}", int_part, frac_part)
                } else {
                    let (first, rest) = digits.split_at(1);
                    write!(f, "{}", first)?;
                    if !rest.is_empty() {
                        write!(f, ".{}", rest)?;
                    }
                    write!(f, "E{}{}", if adjusted >= 0 { "+" } else { "" }, adjusted)
                }
            }
        }
    }
}

fn digit_count(value: u128) -> u32 {
    value.checked_ilog10().map_or(0, |log| log + 1)
}

/// Drop `drop` trailing digits, rounding half up.
fn round_half_up(value: u128, drop: i64) -> u128 {
    if drop <= 0 {
        return value;
    }
    let Some(factor) = u32::try_from(drop).ok().and_then(|d| 10u128.checked_pow(d)) else {
        return 0;
    };
    let quotient = value / factor;
    let remainder = value % factor;
    if remainder >= factor - remainder {
        quotient + 1
    } else {
        quotient
    }
}

/// Three digits from a 10-bit declet.
fn decode_declet(declet: u16) -> u16 {
    let bit = |n: u16| (declet >> n) & 1;
    let high = (declet >> 7) & 0b111;
    let middle = (declet >> 4) & 0b111;
    let low = declet & 0b111;
    let (d2, d1, d0) = if bit(3) == 0 {
        (high, middle, low)
    } else {
        match (declet >> 1) & 0b11 {
            0b00 => (high, middle, 8 + bit(0)),
            0b01 => (high, 8 + bit(4), (bit(6) << 2) | (bit(5) << 1) | bit(0)),
            0b10 => (8 + bit(7), middle, (bit(9) << 2) | (bit(8) << 1) | bit(0)),
            _ => match (declet >> 5) & 0b11 {
                0b00 => (8 + bit(7), 8 + bit(4), (bit(9) << 2) | (bit(8) << 1) | bit(0)),
                0b01 => (8 + bit(7), (bit(9) << 2) | (bit(8) << 1) | bit(4), 8 + bit(0)),
                0b10 => (high, 8 + bit(4), 8 + bit(0)),
                _ => (8 + bit(7), 8 + bit(4), 8 + bit(0)),
            },
        }
    };
    d2 * 100 + d1 * 10 + d0
}

/// 10-bit declet for a value in `0..=999`.
fn encode_declet(value: u16) -> u16 {
    let (d2, d1, d0) = (value / 100, value / 10 % 10, value % 10);
    let m = d0 & 1;
    match (d2 >= 8, d1 >= 8, d0 >= 8) {
        (false, false, false) => (d2 << 7) | (d1 << 4) | d0,
        (false, false, true) => (d2 << 7) | (d1 << 4) | 0b1000 | m,
        (false, true, false) => (d2 << 7) | ((d0 >> 1) << 5) | ((d1 & 1) << 4) | 0b1010 | m,
        (true, false, false) => {
            ((d0 >> 1) << 8) | ((d2 & 1) << 7) | (d1 << 4) | 0b1100 | m
        }
        (true, true, false) => ((d0 >> 1) << 8) | ((d2 & 1) << 7) | ((d1 & 1) << 4) | 0b1110 | m,
        (true, false, true) => {
            ((d1 >> 1) << 8) | ((d2 & 1) << 7) | (0b01 << 5) | ((d1 & 1) << 4) | 0b1110 | m
        }
        (false, true, true) => (d2 << 7) | (0b10 << 5) | ((d1 & 1) << 4) | 0b1110 | m,
        (true, true, true) => ((d2 & 1) << 7) | (0b11 << 5) | ((d1 & 1) << 4) | 0b1110 | m,
    }
}
