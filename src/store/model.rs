use std::collections::BTreeMap;

use serde::{Serialize, Serializer, ser::SerializeMap};
use sqlx::FromRow;

/// `metrics` 表中的一行
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct DailyCount {
    pub date: String,
    pub hits: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HitResult {
    pub success: bool,
    pub total_hits: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    pub total_hits: i64,
    /// 序列化时按日期倒序输出
    #[serde(serialize_with = "newest_first")]
    pub by_date: BTreeMap<String, i64>,
}

impl Stats {
    pub fn from_rows(rows: Vec<DailyCount>) -> Self {
        let total_hits = rows.iter().map(|row| row.hits).sum();
        let by_date = rows.into_iter().map(|row| (row.date, row.hits)).collect();
        Self {
            total_hits,
            by_date,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthStatus {
    pub status: &'static str,
    pub timestamp: String,
}

fn newest_first<S>(by_date: &BTreeMap<String, i64>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    let mut map = serializer.serialize_map(Some(by_date.len()))?;
    for (date, hits) in by_date.iter().rev() {
        map.serialize_entry(date, hits)?;
    }
    map.end()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_from_rows_sums_hits() {
        let stats = Stats::from_rows(vec![
            DailyCount {
                date: "2024-01-02".into(),
                hits: 4,
            },
            DailyCount {
                date: "2024-01-01".into(),
                hits: 6,
            },
        ]);
        assert_eq!(stats.total_hits, 10);
        assert_eq!(stats.by_date.get("2024-01-01"), Some(&6));
    }

    #[test]
    fn test_stats_serialize_newest_first() {
        let stats = Stats::from_rows(vec![
            DailyCount {
                date: "2024-01-01".into(),
                hits: 1,
            },
            DailyCount {
                date: "2024-01-03".into(),
                hits: 3,
            },
            DailyCount {
                date: "2024-01-02".into(),
                hits: 2,
            },
        ]);

        let json = serde_json::to_string(&stats).unwrap();
        assert_eq!(
            json,
            r#"{"totalHits":6,"byDate":{"2024-01-03":3,"2024-01-02":2,"2024-01-01":1}}"#
        );
    }
}
