use serde::{Deserialize, Serialize};
use serde_json::Value;

/// `POST /api/hit` 请求体，只校验字段是否存在，内容不落库
#[derive(Debug, Deserialize)]
pub struct HitRequest {
    pub ts: Option<Value>,
    pub route: Option<Value>,
    pub sid: Option<Value>,
}

impl HitRequest {
    /// 返回缺失、为 null、空串、0 或 false 的必填字段名
    pub fn missing_fields(&self) -> Vec<&'static str> {
        [("ts", &self.ts), ("route", &self.route), ("sid", &self.sid)]
            .into_iter()
            .filter(|(_, value)| !is_present(value))
            .map(|(name, _)| name)
            .collect()
    }
}

fn is_present(value: &Option<Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::String(s)) => !s.trim().is_empty(),
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|f| f != 0.0),
        Some(Value::Array(_)) | Some(Value::Object(_)) => true,
    }
}

#[derive(Debug, Serialize)]
pub struct ResetResponse {
    pub success: bool,
    pub message: &'static str,
}
