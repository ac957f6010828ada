use lottie_data::model as data;

use crate::error::Result;
use crate::expressions::{EvalContext, Selector, Value};
use crate::property::{AnimatedProperty, PropertyFactory};

/// Effect attached to a layer. Only its control values are kept, for
/// `effect(name)(param)` lookups.
#[derive(Debug)]
pub struct EffectControl {
    name: String,
    match_name: Option<String>,
    index: Option<u32>,
    params: Vec<EffectParam>,
}

#[derive(Debug)]
pub struct EffectParam {
    name: String,
    index: Option<u32>,
    value: AnimatedProperty<Vec<f32>>,
}

impl EffectControl {
    pub fn from_model(effect: &data::Effect, factory: &PropertyFactory<'_>) -> Result<Self> {
        let params = effect
            .ef
            .iter()
            .flatten()
            .map(|p| {
                Ok(EffectParam {
                    name: p.nm.clone().unwrap_or_default(),
                    index: p.ix,
                    value: match &p.v {
                        Some(v) => factory.floats(v)?,
                        None => AnimatedProperty::constant(Vec::new()),
                    },
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            name: effect.nm.clone().unwrap_or_default(),
            match_name: effect.match_name.clone(),
            index: effect.ix,
            params,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn params(&self) -> &[EffectParam] {
        &self.params
    }

    fn matches(&self, selector: &Selector, position: usize) -> bool {
        match selector {
            Selector::Name(n) => &self.name == n || self.match_name.as_deref() == Some(n),
            Selector::Index(i) => self.index.map_or(position + 1 == *i, |ix| ix as usize == *i),
        }
    }

    pub fn param(&self, selector: &Selector) -> Option<usize> {
        self.params.iter().enumerate().position(|(pos, p)| match selector {
            Selector::Name(n) => &p.name == n,
            Selector::Index(i) => pos + 1 == *i,
        })
    }

    pub fn param_value(&self, param: usize, ctx: &EvalContext<'_>) -> Result<Value> {
        let Some(p) = self.params.get(param) else {
            return Ok(Value::Number(0.0));
        };
        let v = p.value.value(ctx)?;
        Ok(match v.as_slice() {
            [] => Value::Number(0.0),
            [x] => Value::Number(*x as f64),
            many => Value::vector(many),
        })
    }
}

impl EffectParam {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn index(&self) -> Option<u32> {
        self.index
    }
}

pub(crate) fn find_effect(effects: &[EffectControl], selector: &Selector) -> Option<usize> {
    effects
        .iter()
        .enumerate()
        .position(|(pos, e)| e.matches(selector, pos))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::expressions::testing::TestHost;
    use serde_json::json;

    #[test]
    fn params_resolve_by_name_and_position() {
        let config = EngineConfig::default();
        let effect: data::Effect = serde_json::from_value(json!({
            "nm": "Controls", "mn": "ADBE Slider Control", "ix": 1,
            "ef": [
                {"nm": "Slider", "v": {"a": 0, "k": 12}},
                {"nm": "Point", "v": {"a": 0, "k": [3, 4]}}
            ]
        }))
        .unwrap();
        let control = EffectControl::from_model(&effect, &PropertyFactory::new(&config)).unwrap();
        let effects = [control];
        assert_eq!(find_effect(&effects, &Selector::Name("Controls".into())), Some(0));
        assert_eq!(
            find_effect(&effects, &Selector::Name("ADBE Slider Control".into())),
            Some(0)
        );
        assert_eq!(find_effect(&effects, &Selector::Index(1)), Some(0));
        assert_eq!(find_effect(&effects, &Selector::Name("Blur".into())), None);

        let host = TestHost::new(&["a"]);
        let ctx = EvalContext::new(&host, 0, 0.0, 8);
        let slider = effects[0].param(&Selector::Name("Slider".into())).unwrap();
        assert_eq!(effects[0].param_value(slider, &ctx).unwrap(), Value::Number(12.0));
        let point = effects[0].param(&Selector::Index(2)).unwrap();
        assert_eq!(
            effects[0].param_value(point, &ctx).unwrap(),
            Value::Vector(vec![3.0, 4.0])
        );
    }
}
