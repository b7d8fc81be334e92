use serde_json::Value;

use crate::error::AnalysisError;
use crate::models::NutritionItem;

/// Pull the first JSON array out of a free-form model reply and coerce each
/// record into a validated `NutritionItem`.
///
/// A reply with no array at all yields an empty list (the caller treats that
/// as "no food detected"); an array that is present but not valid JSON is a
/// `MalformedResponse`. Field coercion never fails on its own: unreadable
/// numbers become 0 and alternate field names (`food`, `serving`,
/// `carbohydrates`) are read in a fixed priority order.
pub fn parse_ai_response(raw: &str) -> Result<Vec<NutritionItem>, AnalysisError> {
    let clean = strip_code_fences(raw);

    let json_str = match locate_json_array(&clean) {
        Some(s) => s,
        None => {
            log::warn!("⚠️ No JSON array found in AI response ({} chars)", raw.len());
            return Ok(Vec::new());
        }
    };

    let records: Vec<Value> = serde_json::from_str(json_str)
        .map_err(|e| AnalysisError::MalformedResponse(e.to_string()))?;

    let mut items = Vec::new();
    for record in &records {
        let record = match record.as_object() {
            Some(r) => r,
            None => continue,  // non-object entries carry no usable fields
        };

        let name = record
            .get("name")
            .or_else(|| record.get("food"))
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty());

        let calories = coerce_number(record.get("calories"));
        let protein = coerce_number(record.get("protein"));
        let carbs = coerce_number(record.get("carbs").or_else(|| record.get("carbohydrates")));
        let fat = coerce_number(record.get("fat"));

        // A usable record names the food and carries at least one non-zero macro
        if name.is_none() || (calories == 0.0 && protein == 0.0 && carbs == 0.0 && fat == 0.0) {
            log::debug!("🚫 Discarding record without name or nutrition data");
            continue;
        }

        let quantity = record
            .get("quantity")
            .or_else(|| record.get("serving"))
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or("1 serving");

        let item = NutritionItem {
            name: name.unwrap_or("Unknown Item").to_string(),
            quantity: quantity.to_string(),
            calories: round2(calories),
            protein: round2(protein),
            carbs: round2(carbs),
            fat: round2(fat),
        };

        // Sanity check: stated calories vs (protein x 4) + (carbs x 4) + (fat x 9).
        // Advisory only, the item is kept either way.
        let estimate = item.protein * 4.0 + item.carbs * 4.0 + item.fat * 9.0;
        if estimate > 0.0 && (item.calories - estimate).abs() > estimate * 0.3 {
            log::warn!(
                "⚠️ Potential inaccuracy for {}: stated {:.0} kcal vs {:.0} kcal from macros",
                item.name,
                item.calories,
                estimate
            );
        }

        items.push(item);
    }

    Ok(items)
}

fn strip_code_fences(text: &str) -> String {
    text.replace("```json", "").replace("```", "").trim().to_string()
}

/// First outermost bracketed block: first '[' through last ']'.
fn locate_json_array(text: &str) -> Option<&str> {
    let start = text.find('[')?;
    let end = text.rfind(']')?;
    if end < start {
        return None;
    }
    Some(&text[start..=end])
}

/// Tolerant numeric read: JSON numbers pass through, strings are parsed by
/// their leading numeric prefix ("150g" -> 150), everything else is 0.
/// Negative values are clamped to 0, macros are never negative.
fn coerce_number(value: Option<&Value>) -> f64 {
    let parsed = match value {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(Value::String(s)) => parse_leading_f64(s),
        _ => 0.0,
    };
    parsed.max(0.0)
}

fn parse_leading_f64(s: &str) -> f64 {
    let s = s.trim_start();
    let mut end = 0;
    let mut seen_dot = false;
    for (i, c) in s.char_indices() {
        let accept = c.is_ascii_digit()
            || (i == 0 && (c == '+' || c == '-'))
            || (c == '.' && !seen_dot);
        if !accept {
            break;
        }
        if c == '.' {
            seen_dot = true;
        }
        end = i + c.len_utf8();
    }
    s[..end].parse::<f64>().unwrap_or(0.0)
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
