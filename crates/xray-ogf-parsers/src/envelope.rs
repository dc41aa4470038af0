// xray-ogf-parsers/src/envelope.rs
//! Animation curves
//!
//! An [`Envelope`] is an ordered list of keyframes plus pre/post
//! extrapolation behaviours. Two on-disk layouts exist:
//!
//! ```text
//! legacy:   u32 pre, u32 post, u32 count,
//!           count × { f32 value, f32 time, u32 shape,
//!                     f32 tension, f32 continuity, f32 bias, 4 × f32 param }
//!
//! current:  u8 pre, u8 post, u16 count,
//!           count × { f32 value, f32 time, u8 shape,
//!                     [shape != Step] 7 × q16 in [-32, 32] }
//! ```

use std::f64::consts::{FRAC_PI_4, PI};

use serde::{Deserialize, Serialize};

use crate::chunk::{ChunkReader, ChunkWriter};
use crate::traits::{ParseError, ParseResult};

/// Range of quantised tangent parameters
pub const KEY_PARAM_RANGE: (f32, f32) = (-32.0, 32.0);

/// Keyframe interpolation shape
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Shape {
    Tcb,
    Hermite,
    Bezier,
    Linear,
    /// Holds the value until the next key; carries no tangent data
    Step,
    Bezier2,
    Unknown(u8),
}

impl Shape {
    pub fn from_u8(value: u8) -> Self {
        match value {
            0 => Shape::Tcb,
            1 => Shape::Hermite,
            2 => Shape::Bezier,
            3 => Shape::Linear,
            4 => Shape::Step,
            5 => Shape::Bezier2,
            other => Shape::Unknown(other),
        }
    }

    pub fn to_u8(&self) -> u8 {
        match self {
            Shape::Tcb => 0,
            Shape::Hermite => 1,
            Shape::Bezier => 2,
            Shape::Linear => 3,
            Shape::Step => 4,
            Shape::Bezier2 => 5,
            Shape::Unknown(v) => *v,
        }
    }
}

/// Extrapolation outside the keyed range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Behavior {
    Reset,
    Constant,
    Repeat,
    Oscillate,
    OffsetRepeat,
    Linear,
    Unknown(u8),
}

impl Behavior {
    pub fn from_u8(value: u8) -> Self {
        match value {
            0 => Behavior::Reset,
            1 => Behavior::Constant,
            2 => Behavior::Repeat,
            3 => Behavior::Oscillate,
            4 => Behavior::OffsetRepeat,
            5 => Behavior::Linear,
            other => Behavior::Unknown(other),
        }
    }

    pub fn to_u8(&self) -> u8 {
        match self {
            Behavior::Reset => 0,
            Behavior::Constant => 1,
            Behavior::Repeat => 2,
            Behavior::Oscillate => 3,
            Behavior::OffsetRepeat => 4,
            Behavior::Linear => 5,
            Behavior::Unknown(v) => *v,
        }
    }
}

/// What an envelope animates; only rotation curves are unwrapped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum EnvelopeKind {
    #[default]
    Translation,
    Rotation,
}

/// Single keyframe
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Key {
    pub value: f32,
    pub time: f32,
    pub shape: Shape,
    pub tension: f32,
    pub continuity: f32,
    pub bias: f32,
    pub param: [f32; 4],
}

impl Key {
    /// Step key with zeroed tangent data
    pub fn step(time: f32, value: f32) -> Self {
        Self {
            value,
            time,
            shape: Shape::Step,
            tension: 0.0,
            continuity: 0.0,
            bias: 0.0,
            param: [0.0; 4],
        }
    }

    fn read_legacy(r: &mut ChunkReader<'_>) -> ParseResult<Self> {
        let value = r.r_f32()?;
        let time = r.r_f32()?;
        let shape = Shape::from_u8(r.r_u32()? as u8);
        let tension = r.r_f32()?;
        let continuity = r.r_f32()?;
        let bias = r.r_f32()?;
        let mut param = [0.0; 4];
        for p in &mut param {
            *p = r.r_f32()?;
        }
        Ok(Self { value, time, shape, tension, continuity, bias, param })
    }

    fn read(r: &mut ChunkReader<'_>) -> ParseResult<Self> {
        let mut key = Self::step(0.0, 0.0);
        key.value = r.r_f32()?;
        key.time = r.r_f32()?;
        key.shape = Shape::from_u8(r.r_u8()?);
        if key.shape != Shape::Step {
            let (min, max) = KEY_PARAM_RANGE;
            key.tension = r.r_f32_q16(min, max)?;
            key.continuity = r.r_f32_q16(min, max)?;
            key.bias = r.r_f32_q16(min, max)?;
            for p in &mut key.param {
                *p = r.r_f32_q16(min, max)?;
            }
        }
        Ok(key)
    }

    fn write(&self, w: &mut ChunkWriter) {
        w.w_f32(self.value);
        w.w_f32(self.time);
        w.w_u8(self.shape.to_u8());
        if self.shape != Shape::Step {
            let (min, max) = KEY_PARAM_RANGE;
            w.w_f32_q16(self.tension, min, max);
            w.w_f32_q16(self.continuity, min, max);
            w.w_f32_q16(self.bias, min, max);
            for p in self.param {
                w.w_f32_q16(p, min, max);
            }
        }
    }

    fn write_legacy(&self, w: &mut ChunkWriter) {
        w.w_f32(self.value);
        w.w_f32(self.time);
        w.w_u32(u32::from(self.shape.to_u8()));
        w.w_f32(self.tension);
        w.w_f32(self.continuity);
        w.w_f32(self.bias);
        for p in self.param {
            w.w_f32(p);
        }
    }
}

/// Animation curve
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub kind: EnvelopeKind,
    pub pre: Behavior,
    pub post: Behavior,
    pub keys: Vec<Key>,
}

impl Envelope {
    pub fn new(kind: EnvelopeKind) -> Self {
        Self {
            kind,
            pre: Behavior::Constant,
            post: Behavior::Constant,
            keys: Vec::new(),
        }
    }

    pub fn insert_key(&mut self, time: f32, value: f32) {
        self.keys.push(Key::step(time, value));
    }

    /// Decode the legacy full-precision layout
    pub fn read_legacy(r: &mut ChunkReader<'_>, kind: EnvelopeKind) -> ParseResult<Self> {
        let pre = Behavior::from_u8((r.r_u32()? & 0xFF) as u8);
        let post = Behavior::from_u8((r.r_u32()? & 0xFF) as u8);
        let count = r.r_u32()? as usize;
        let mut keys = Vec::with_capacity(count.min(r.remaining() / 40));
        for _ in 0..count {
            keys.push(Key::read_legacy(r)?);
        }
        Ok(Self { kind, pre, post, keys })
    }

    /// Decode the current layout
    pub fn read(r: &mut ChunkReader<'_>, kind: EnvelopeKind) -> ParseResult<Self> {
        let pre = Behavior::from_u8(r.r_u8()?);
        let post = Behavior::from_u8(r.r_u8()?);
        let count = usize::from(r.r_u16()?);
        let mut keys = Vec::with_capacity(count);
        for _ in 0..count {
            keys.push(Key::read(r)?);
        }
        Ok(Self { kind, pre, post, keys })
    }

    /// Encode in the current layout
    pub fn write(&self, w: &mut ChunkWriter) -> ParseResult<()> {
        let count = u16::try_from(self.keys.len()).map_err(|_| {
            ParseError::InvalidStructure(format!("envelope has {} keys, at most 65535 fit", self.keys.len()))
        })?;
        w.w_u8(self.pre.to_u8());
        w.w_u8(self.post.to_u8());
        w.w_u16(count);
        for key in &self.keys {
            key.write(w);
        }
        Ok(())
    }

    /// Encode in the legacy layout
    pub fn write_legacy(&self, w: &mut ChunkWriter) {
        w.w_u32(u32::from(self.pre.to_u8()));
        w.w_u32(u32::from(self.post.to_u8()));
        w.w_u32(self.keys.len() as u32);
        for key in &self.keys {
            key.write_legacy(w);
        }
    }

    /// Sort keys by time and, for rotation curves, unwrap angle discontinuities
    pub fn rebuild(&mut self) {
        self.keys
            .sort_by(|a, b| a.time.partial_cmp(&b.time).unwrap_or(std::cmp::Ordering::Equal));

        if self.kind != EnvelopeKind::Rotation {
            return;
        }

        let mut prev = 0;
        for it in 0..self.keys.len() {
            if is_mirrored(self.keys[prev].value, self.keys[it].value) {
                self.keys[prev].value = -self.keys[prev].value;
            }
            if is_twisted(self.keys[prev].value, self.keys[it].value) {
                for key in &mut self.keys[it..] {
                    if key.value.is_sign_negative() {
                        key.value += std::f32::consts::TAU;
                    } else {
                        key.value -= std::f32::consts::TAU;
                    }
                }
            }
            prev = it;
        }
    }

    /// Sample the curve: step keys hold, all other shapes interpolate linearly
    pub fn evaluate(&self, time: f32) -> f32 {
        let Some(first) = self.keys.first() else {
            return 0.0;
        };
        if time <= first.time {
            return first.value;
        }
        for pair in self.keys.windows(2) {
            let (a, b) = (&pair[0], &pair[1]);
            if time < b.time {
                if a.shape == Shape::Step || b.time <= a.time {
                    return a.value;
                }
                let t = (time - a.time) / (b.time - a.time);
                return a.value + (b.value - a.value) * t;
            }
        }
        self.keys.last().map_or(0.0, |k| k.value)
    }

    /// Key time span
    pub fn time_range(&self) -> Option<(f32, f32)> {
        Some((self.keys.first()?.time, self.keys.last()?.time))
    }
}

fn is_mirrored(a0: f32, a1: f32) -> bool {
    ((f64::from(a0).abs() - PI).abs() <= f64::EPSILON) && a0.is_sign_negative() != a1.is_sign_negative()
}

fn is_twisted(a0: f32, a1: f32) -> bool {
    let (a0, a1) = (f64::from(a0), f64::from(a1));
    (a0 + a1).abs() < FRAC_PI_4 && PI - a0.abs() < FRAC_PI_4 && PI - a1.abs() < FRAC_PI_4
}
