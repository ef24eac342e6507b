// Numeric canonicalization for transforms, colors, angles and snap points.
// Every function here is idempotent: smoothing twice equals smoothing once.
use crate::error::{Error, Result, kind_name};
use serde_json::{Map, Number, Value};

const SCALE: f64 = 10_000.0;

fn round(f: f64) -> f64 {
    let scaled = f * SCALE;
    // too large to carry any decimals anyway
    if !scaled.is_finite() {
        return f;
    }
    // + 0.0 folds -0.0 into 0.0
    scaled.round() / SCALE + 0.0
}

fn float_value(f: f64) -> Value {
    Number::from_f64(f).map(Value::Number).unwrap_or(Value::Null)
}

/// Round every float (recursively) to four decimals; integers and
/// non-numbers pass through.
pub fn smooth(v: Value) -> Value {
    match v {
        Value::Number(n) if n.is_f64() => match n.as_f64() {
            Some(f) if f.is_finite() => float_value(round(f)),
            _ => Value::Number(n),
        },
        Value::Array(items) => Value::Array(items.into_iter().map(smooth).collect()),
        Value::Object(map) => {
            Value::Object(map.into_iter().map(|(k, v)| (k, smooth(v))).collect())
        }
        other => other,
    }
}

// Wrap before rounding; rounding first leaves float noise from `360 - x`
// that a second pass would strip.
fn wrap_degrees(f: f64) -> f64 {
    let w = round(f.rem_euclid(360.0));
    // 359.99999 rounds up to 360.0
    if w >= 360.0 { 0.0 } else { w + 0.0 }
}

/// `{x, y, z}` degrees, wrapped into `[0, 360)` and rounded.
pub fn smooth_angle(v: Value) -> Result<Value> {
    let map = match v {
        Value::Object(map) => map,
        other => {
            return Err(Error::Smoothing {
                field: "angle".into(),
                reason: format!("expected object, got {}", kind_name(&other)),
            });
        }
    };
    let mut out = Map::with_capacity(map.len());
    for (k, v) in map {
        let nv = match k.as_str() {
            "x" | "y" | "z" => {
                let f = v.as_f64().ok_or_else(|| Error::Smoothing {
                    field: k.clone(),
                    reason: format!("expected number, got {}", kind_name(&v)),
                })?;
                float_value(wrap_degrees(f))
            }
            _ => v,
        };
        out.insert(k, nv);
    }
    Ok(Value::Object(out))
}

/// List of snap points: `Position` smoothed, `Rotation` angle-smoothed.
pub fn smooth_snap_points(v: Value) -> Result<Value> {
    let points = match v {
        Value::Array(points) => points,
        other => {
            return Err(Error::Smoothing {
                field: "snap points".into(),
                reason: format!("expected array, got {}", kind_name(&other)),
            });
        }
    };
    let mut out = Vec::with_capacity(points.len());
    for (i, p) in points.into_iter().enumerate() {
        let mut p = match p {
            Value::Object(p) => p,
            other => {
                return Err(Error::Smoothing {
                    field: format!("snap point {}", i),
                    reason: format!("expected object, got {}", kind_name(&other)),
                });
            }
        };
        if let Some(pos) = p.remove("Position") {
            p.insert("Position".into(), smooth(pos));
        }
        if let Some(rot) = p.remove("Rotation") {
            p.insert("Rotation".into(), smooth_angle(rot)?);
        }
        out.push(Value::Object(p));
    }
    Ok(Value::Array(out))
}
