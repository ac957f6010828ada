use serde::{de::DeserializeOwned, de::SeqAccess, Deserialize, Deserializer, Serialize};
use std::fmt;

/// Root of an animation document.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct LottieJson {
    #[serde(default)]
    pub v: Option<String>,
    #[serde(default)]
    pub nm: Option<String>,
    pub ip: f32,
    pub op: f32,
    pub fr: f32,
    pub w: u32,
    pub h: u32,
    pub layers: Vec<Layer>,
    #[serde(default)]
    pub assets: Vec<Asset>,
    #[serde(default)]
    pub markers: Vec<Marker>,
    #[serde(default)]
    pub fonts: Option<FontList>,
    #[serde(default)]
    pub chars: Vec<GlyphData>,
}

impl LottieJson {
    pub fn from_slice(bytes: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice(bytes)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Layer {
    #[serde(default)]
    pub ty: u8, // 0 precomp, 1 solid, 2 image, 3 null, 4 shape, 5 text
    #[serde(default)]
    pub ind: Option<i32>,
    #[serde(default)]
    pub parent: Option<i32>,
    #[serde(default)]
    pub nm: Option<String>,
    #[serde(default)]
    pub ip: f32,
    #[serde(default)]
    pub op: f32,
    #[serde(default)]
    pub st: f32,
    #[serde(default = "default_one")]
    pub sr: f32,
    #[serde(default)]
    pub ks: Transform,
    #[serde(default)]
    pub tm: Option<Property<f32>>,
    #[serde(default)]
    pub hd: Option<bool>,
    #[serde(default)]
    pub tt: Option<u8>, // 1 alpha, 2 alpha inverted, 3 luma, 4 luma inverted
    #[serde(default)]
    pub tp: Option<i32>,
    #[serde(default)]
    pub td: Option<u8>,
    #[serde(default)]
    pub ef: Option<Vec<Effect>>,

    #[serde(default, rename = "refId")]
    pub ref_id: Option<String>,
    #[serde(default)]
    pub w: Option<f32>,
    #[serde(default)]
    pub h: Option<f32>,
    #[serde(default, rename = "sc")]
    pub color: Option<String>,
    #[serde(default)]
    pub sw: Option<f32>,
    #[serde(default)]
    pub sh: Option<f32>,
    #[serde(default)]
    pub shapes: Option<Vec<Shape>>,
    #[serde(default)]
    pub t: Option<TextData>,
}

fn default_one() -> f32 {
    1.0
}

/// Effect entry. Only the control values are kept; they are readable from
/// expressions through `effect(name)(param)`.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Effect {
    #[serde(default)]
    pub ty: Option<u8>,
    #[serde(default)]
    pub nm: Option<String>,
    #[serde(default)]
    pub ix: Option<u32>,
    #[serde(default, rename = "mn")]
    pub match_name: Option<String>,
    #[serde(default)]
    pub ef: Option<Vec<EffectValue>>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct EffectValue {
    #[serde(default)]
    pub ty: Option<u8>,
    #[serde(default)]
    pub nm: Option<String>,
    #[serde(default)]
    pub ix: Option<u32>,
    #[serde(default, rename = "mn")]
    pub match_name: Option<String>,
    #[serde(default, deserialize_with = "deserialize_effect_value_property")]
    pub v: Option<Property<Vec<f32>>>,
}

// Effect values come as scalars, vectors, one-element arrays or full
// animated properties. Everything numeric is normalised into Vec<f32>.
fn deserialize_effect_value_property<'de, D>(
    deserializer: D,
) -> Result<Option<Property<Vec<f32>>>, D::Error>
where
    D: Deserializer<'de>,
{
    let mut v = serde_json::Value::deserialize(deserializer)?;
    if v.is_null() {
        return Ok(None);
    }
    if let Some(k) = v.get_mut("k") {
        if let Some(n) = k.as_f64() {
            *k = serde_json::json!([n]);
        }
        if let Ok(p) = serde_json::from_value::<Property<Vec<f32>>>(v.clone()) {
            return Ok(Some(p));
        }
    }
    let statik = match v {
        serde_json::Value::Number(n) => vec![n.as_f64().unwrap_or(0.0) as f32],
        serde_json::Value::Array(items) => items
            .iter()
            .filter_map(|item| item.as_f64())
            .map(|f| f as f32)
            .collect(),
        serde_json::Value::Bool(b) => vec![if b { 1.0 } else { 0.0 }],
        _ => return Ok(None),
    };
    Ok(Some(Property {
        k: Value::Static(statik),
        ..Property::default()
    }))
}

// Shapes

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(tag = "ty")]
pub enum Shape {
    #[serde(rename = "gr")]
    Group(GroupShape),
    #[serde(rename = "rc")]
    Rect(RectShape),
    #[serde(rename = "el")]
    Ellipse(EllipseShape),
    #[serde(rename = "sh")]
    Path(PathShape),
    #[serde(rename = "sr")]
    Polystar(PolystarShape),
    #[serde(rename = "fl")]
    Fill(FillShape),
    #[serde(rename = "st")]
    Stroke(StrokeShape),
    #[serde(rename = "gf")]
    GradientFill(GradientFillShape),
    #[serde(rename = "gs")]
    GradientStroke(GradientStrokeShape),
    #[serde(rename = "tr")]
    Transform(TransformShape),
    #[serde(rename = "tm")]
    Trim(TrimShape),
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct GroupShape {
    #[serde(default)]
    pub nm: Option<String>,
    #[serde(default)]
    pub hd: Option<bool>,
    #[serde(default)]
    pub it: Vec<Shape>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RectShape {
    #[serde(default)]
    pub nm: Option<String>,
    #[serde(default)]
    pub d: Option<u8>,
    pub s: Property<Vec2>,
    pub p: Property<Vec2>,
    #[serde(default)]
    pub r: Property<f32>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct EllipseShape {
    #[serde(default)]
    pub nm: Option<String>,
    #[serde(default)]
    pub d: Option<u8>,
    pub s: Property<Vec2>,
    pub p: Property<Vec2>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct PathShape {
    #[serde(default)]
    pub nm: Option<String>,
    #[serde(default)]
    pub d: Option<u8>,
    pub ks: Property<BezierPath>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct PolystarShape {
    #[serde(default)]
    pub nm: Option<String>,
    #[serde(default)]
    pub d: Option<u8>,
    pub p: Property<Vec2>,
    pub or: Property<f32>,
    #[serde(default)]
    pub os: Property<f32>,
    #[serde(default)]
    pub r: Property<f32>,
    pub pt: Property<f32>,
    #[serde(default = "default_star")]
    pub sy: u8, // 1 star, 2 polygon
    #[serde(default)]
    pub ir: Option<Property<f32>>,
    #[serde(default)]
    pub is: Option<Property<f32>>,
}

fn default_star() -> u8 {
    1
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct FillShape {
    #[serde(default)]
    pub nm: Option<String>,
    pub c: Property<Rgba>,
    #[serde(default)]
    pub o: Property<f32>,
    #[serde(default)]
    pub r: Option<u8>, // 1 non-zero, 2 even-odd
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct StrokeShape {
    #[serde(default)]
    pub nm: Option<String>,
    pub c: Property<Rgba>,
    pub w: Property<f32>,
    #[serde(default)]
    pub o: Property<f32>,
    #[serde(default)]
    pub lc: u8,
    #[serde(default)]
    pub lj: u8,
    #[serde(default)]
    pub ml: Option<f32>,
    #[serde(default)]
    pub d: Vec<DashProperty>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct DashProperty {
    #[serde(default)]
    pub n: Option<String>, // "d" dash, "g" gap, "o" offset
    pub v: Property<f32>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct GradientFillShape {
    #[serde(default)]
    pub nm: Option<String>,
    #[serde(default)]
    pub o: Property<f32>,
    pub s: Property<Vec2>,
    pub e: Property<Vec2>,
    #[serde(default = "default_linear")]
    pub t: u8, // 1 linear, 2 radial
    pub g: GradientColors,
    #[serde(default)]
    pub h: Option<Property<f32>>,
    #[serde(default)]
    pub a: Option<Property<f32>>,
    #[serde(default)]
    pub r: Option<u8>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct GradientStrokeShape {
    #[serde(default)]
    pub nm: Option<String>,
    #[serde(default)]
    pub o: Property<f32>,
    pub w: Property<f32>,
    pub s: Property<Vec2>,
    pub e: Property<Vec2>,
    #[serde(default = "default_linear")]
    pub t: u8,
    pub g: GradientColors,
    #[serde(default)]
    pub h: Option<Property<f32>>,
    #[serde(default)]
    pub a: Option<Property<f32>>,
    #[serde(default)]
    pub lc: u8,
    #[serde(default)]
    pub lj: u8,
    #[serde(default)]
    pub ml: Option<f32>,
    #[serde(default)]
    pub d: Vec<DashProperty>,
}

fn default_linear() -> u8 {
    1
}

/// Gradient ramp as stored in the document: `p` color stops laid out as
/// `[t, r, g, b] * p`, optionally followed by `[t, a]` alpha stops.
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct GradientColors {
    pub p: u32,
    pub k: Property<Vec<f32>>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TrimShape {
    #[serde(default)]
    pub nm: Option<String>,
    #[serde(default)]
    pub s: Property<f32>,
    #[serde(default)]
    pub e: Property<f32>,
    #[serde(default)]
    pub o: Property<f32>,
    #[serde(default)]
    pub m: u8,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TransformShape {
    #[serde(flatten)]
    pub t: Transform,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct Transform {
    #[serde(default)]
    pub a: Property<Vec3DefaultZero>,
    #[serde(default)]
    pub p: PositionProperty,
    #[serde(default)]
    pub s: Property<Vec3Scale>,
    #[serde(default, alias = "rz")]
    pub r: Property<f32>,
    #[serde(default)]
    pub sk: Property<f32>,
    #[serde(default)]
    pub sa: Property<f32>,
    #[serde(default)]
    pub o: Property<f32>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(untagged)]
pub enum PositionProperty {
    Split {
        #[serde(default)]
        s: bool,
        x: Property<f32>,
        y: Property<f32>,
    },
    Unified(Property<Vec3DefaultZero>),
}

impl Default for PositionProperty {
    fn default() -> Self {
        PositionProperty::Unified(Property::default())
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Property<T> {
    #[serde(default)]
    pub a: u8,
    #[serde(default)]
    #[serde(bound(deserialize = "T: DeserializeOwned"))]
    pub k: Value<T>,
    #[serde(default)]
    pub ix: Option<u32>,
    /// Expression source, if the property is driven by a formula.
    #[serde(default)]
    pub x: Option<String>,
}

impl<T> Default for Property<T> {
    fn default() -> Self {
        Property {
            a: 0,
            k: Value::Default,
            ix: None,
            x: None,
        }
    }
}

impl<T> Property<T> {
    pub fn is_animated(&self) -> bool {
        matches!(self.k, Value::Animated(_))
    }
}

#[derive(Debug, Serialize, Clone)]
pub enum Value<T> {
    Default,
    Static(T),
    Animated(Vec<Keyframe<T>>),
}

impl<'de, T: DeserializeOwned> Deserialize<'de> for Value<T> {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let v = serde_json::Value::deserialize(deserializer)?;

        if v.is_null() {
            return Ok(Value::Default);
        }

        if let Ok(keyframes) = serde_json::from_value::<Vec<Keyframe<T>>>(v.clone()) {
            if !keyframes.is_empty() {
                return Ok(Value::Animated(keyframes));
            }
        }

        if let Ok(val) = serde_json::from_value::<T>(v.clone()) {
            return Ok(Value::Static(val));
        }

        if let Ok(vec) = serde_json::from_value::<Vec<T>>(v) {
            if let Some(first) = vec.into_iter().next() {
                return Ok(Value::Static(first));
            }
        }

        Ok(Value::Default)
    }
}

impl<T> Default for Value<T> {
    fn default() -> Self {
        Value::Default
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(bound(deserialize = "T: DeserializeOwned"))]
pub struct Keyframe<T> {
    pub t: f32,
    #[serde(default, deserialize_with = "deserialize_keyframe_value")]
    pub s: Option<T>,
    #[serde(default, deserialize_with = "deserialize_keyframe_value")]
    pub e: Option<T>,
    #[serde(default)]
    pub i: Option<BezierTangent>,
    #[serde(default)]
    pub o: Option<BezierTangent>,
    #[serde(default)]
    pub to: Option<Vec<f32>>,
    #[serde(default)]
    pub ti: Option<Vec<f32>>,
    #[serde(default)]
    pub h: Option<u8>,
}

impl<T> Keyframe<T> {
    /// A keyframe at `t` holding `s`, with no easing handles.
    pub fn new(t: f32, s: T) -> Self {
        Keyframe {
            t,
            s: Some(s),
            e: None,
            i: None,
            o: None,
            to: None,
            ti: None,
            h: None,
        }
    }

    pub fn is_hold(&self) -> bool {
        self.h == Some(1)
    }
}

fn deserialize_keyframe_value<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let v = serde_json::Value::deserialize(deserializer)?;
    if v.is_null() {
        return Ok(None);
    }

    if let Ok(val) = serde_json::from_value(v.clone()) {
        return Ok(Some(val));
    }

    if let Ok(vec) = serde_json::from_value::<Vec<T>>(v) {
        if let Some(first) = vec.into_iter().next() {
            return Ok(Some(first));
        }
    }

    Ok(None)
}

pub type Vec2 = [f32; 2];
pub type Vec3 = [f32; 3];

/// Easing handle of a keyframe, `{"x": [0.48], "y": [1]}`. Multi-dimensional
/// properties may carry one entry per component.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct BezierTangent {
    #[serde(deserialize_with = "deserialize_scalar_or_seq")]
    pub x: Vec<f32>,
    #[serde(deserialize_with = "deserialize_scalar_or_seq")]
    pub y: Vec<f32>,
}

fn deserialize_scalar_or_seq<'de, D>(deserializer: D) -> Result<Vec<f32>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(f32),
        Many(Vec<f32>),
    }
    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(v) => vec![v],
        OneOrMany::Many(v) => v,
    })
}

/// Two or three floats with z defaulting to 0.
#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
pub struct Vec3DefaultZero(pub Vec3);

impl Default for Vec3DefaultZero {
    fn default() -> Self {
        Vec3DefaultZero([0.0, 0.0, 0.0])
    }
}

impl<'de> Deserialize<'de> for Vec3DefaultZero {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer
            .deserialize_seq(PaddedSeqVisitor::<3>([0.0; 3]))
            .map(Vec3DefaultZero)
    }
}

/// Scale in percent; a missing z defaults to 100.
#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
pub struct Vec3Scale(pub Vec3);

impl Default for Vec3Scale {
    fn default() -> Self {
        Vec3Scale([100.0, 100.0, 100.0])
    }
}

impl<'de> Deserialize<'de> for Vec3Scale {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer
            .deserialize_seq(PaddedSeqVisitor::<3>([0.0, 0.0, 100.0]))
            .map(Vec3Scale)
    }
}

/// Color as 0..1 floats. Documents write both `[r, g, b]` and
/// `[r, g, b, a]`; alpha defaults to opaque.
#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
pub struct Rgba(pub [f32; 4]);

impl Default for Rgba {
    fn default() -> Self {
        Rgba([0.0, 0.0, 0.0, 1.0])
    }
}

impl<'de> Deserialize<'de> for Rgba {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer
            .deserialize_seq(PaddedSeqVisitor::<4>([0.0, 0.0, 0.0, 1.0]))
            .map(Rgba)
    }
}

struct PaddedSeqVisitor<const N: usize>([f32; N]);

impl<'de, const N: usize> serde::de::Visitor<'de> for PaddedSeqVisitor<N> {
    type Value = [f32; N];

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        write!(formatter, "a sequence of at most {} floats", N)
    }

    fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
    where
        A: SeqAccess<'de>,
    {
        let mut out = self.0;
        let mut idx = 0;
        while let Some(v) = seq.next_element::<f32>()? {
            if idx < N {
                out[idx] = v;
            }
            idx += 1;
        }
        if idx == 0 {
            return Err(serde::de::Error::invalid_length(0, &self));
        }
        Ok(out)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct BezierPath {
    #[serde(default)]
    pub c: bool,
    #[serde(default)]
    pub i: Vec<Vec2>,
    #[serde(default)]
    pub o: Vec<Vec2>,
    #[serde(default)]
    pub v: Vec<Vec2>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Asset {
    pub id: String,
    #[serde(default)]
    pub nm: Option<String>,
    #[serde(default)]
    pub layers: Option<Vec<Layer>>,
    #[serde(default)]
    pub w: Option<f32>,
    #[serde(default)]
    pub h: Option<f32>,
    #[serde(default)]
    pub u: Option<String>,
    #[serde(default)]
    pub p: Option<String>,
    #[serde(default)]
    pub e: Option<u8>, // 1 when `p` is an embedded data URI
    #[serde(default)]
    pub fr: Option<f32>,
}

impl Asset {
    pub fn is_precomp(&self) -> bool {
        self.layers.is_some()
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct Marker {
    #[serde(default)]
    pub cm: Option<String>,
    #[serde(default)]
    pub tm: Option<f32>,
    #[serde(default)]
    pub dr: Option<f32>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct FontList {
    #[serde(default)]
    pub list: Vec<FontDescriptor>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct FontDescriptor {
    #[serde(default, rename = "fName")]
    pub name: String,
    #[serde(default, rename = "fFamily")]
    pub family: String,
    #[serde(default, rename = "fStyle")]
    pub style: String,
    #[serde(default, rename = "fPath")]
    pub path: Option<String>,
    #[serde(default)]
    pub ascent: Option<f32>,
}

/// Outline of one character, embedded in the document's `chars` table.
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct GlyphData {
    #[serde(default)]
    pub ch: String,
    #[serde(default)]
    pub size: f32,
    #[serde(default)]
    pub style: String,
    #[serde(default, rename = "fFamily")]
    pub family: String,
    #[serde(default)]
    pub w: f32,
    #[serde(default)]
    pub data: Option<GlyphShapes>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct GlyphShapes {
    #[serde(default)]
    pub shapes: Vec<Shape>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TextData {
    pub d: Property<TextDocument>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct TextDocument {
    #[serde(default)]
    pub t: String,
    #[serde(default)]
    pub f: String,
    #[serde(default)]
    pub s: f32,
    #[serde(default)]
    pub j: u8, // 0 left, 1 right, 2 center
    #[serde(default)]
    pub tr: f32,
    #[serde(default)]
    pub lh: f32,
    #[serde(default)]
    pub fc: Rgba,
    #[serde(default)]
    pub sc: Option<Rgba>,
    #[serde(default)]
    pub sw: Option<f32>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn static_and_animated_values() {
        let p: Property<f32> = serde_json::from_value(json!({"a": 0, "k": 42})).unwrap();
        assert!(matches!(p.k, Value::Static(v) if v == 42.0));

        let p: Property<f32> = serde_json::from_value(json!({"a": 0, "k": [7]})).unwrap();
        assert!(matches!(p.k, Value::Static(v) if v == 7.0));

        let p: Property<f32> = serde_json::from_value(json!({
            "a": 1,
            "k": [
                {"t": 0, "s": [0], "o": {"x": [0.3], "y": [0]}, "i": {"x": [0.7], "y": [1]}},
                {"t": 10, "s": [100]}
            ]
        }))
        .unwrap();
        match p.k {
            Value::Animated(kfs) => {
                assert_eq!(kfs.len(), 2);
                assert_eq!(kfs[1].s, Some(100.0));
                assert_eq!(kfs[0].o.as_ref().unwrap().x, vec![0.3]);
            }
            other => panic!("expected keyframes, got {:?}", other),
        }
    }

    #[test]
    fn colors_default_to_opaque() {
        let c: Rgba = serde_json::from_value(json!([1, 0.5, 0])).unwrap();
        assert_eq!(c.0, [1.0, 0.5, 0.0, 1.0]);
        let s: Vec3Scale = serde_json::from_value(json!([50, 25])).unwrap();
        assert_eq!(s.0, [50.0, 25.0, 100.0]);
    }

    #[test]
    fn unknown_shapes_are_tolerated() {
        let shapes: Vec<Shape> = serde_json::from_value(json!([
            {"ty": "rp", "c": {"k": 3}},
            {"ty": "fl", "c": {"k": [1, 0, 0, 1]}, "o": {"k": 100}}
        ]))
        .unwrap();
        assert!(matches!(shapes[0], Shape::Unknown));
        assert!(matches!(shapes[1], Shape::Fill(_)));
    }

    #[test]
    fn effect_values_normalise_to_vectors() {
        let effect: Effect = serde_json::from_value(json!({
            "nm": "Controls",
            "ef": [
                {"nm": "Slider", "v": {"a": 0, "k": 12}},
                {"nm": "Point", "v": [3, 4]}
            ]
        }))
        .unwrap();
        let values = effect.ef.unwrap();
        assert!(matches!(&values[0].v.as_ref().unwrap().k, Value::Static(v) if v == &vec![12.0]));
        assert!(matches!(&values[1].v.as_ref().unwrap().k, Value::Static(v) if v == &vec![3.0, 4.0]));
    }

    #[test]
    fn split_position() {
        let t: Transform = serde_json::from_value(json!({
            "p": {"s": true, "x": {"k": 10}, "y": {"k": 20}}
        }))
        .unwrap();
        assert!(matches!(t.p, PositionProperty::Split { .. }));
    }
}
