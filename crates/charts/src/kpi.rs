use extract::Metric;

use crate::types::KpiCard;

pub const DEFAULT_MAX_CARDS: usize = 6;
/// Below this many cards an additional source may top the set up.
pub const MIN_CARDS: usize = 4;

/// Supplies extra KPI cards when a document reports too few metrics.
pub trait AdditionalKpiSource: Send + Sync {
    fn additional_kpis(&self, existing: &[Metric], needed: usize) -> Vec<KpiCard>;
}

/// Fills the gap with well-known KPI names marked "N/A". No lookup is
/// performed.
#[derive(Debug, Default)]
pub struct PlaceholderKpiSource;

const PLACEHOLDER_KPIS: &[(&str, &str)] = &[
    ("Revenue Growth", "Performance"),
    ("Market Share", "Market"),
    ("Customer Satisfaction", "Performance"),
    ("Operating Margin", "Financial"),
];

impl AdditionalKpiSource for PlaceholderKpiSource {
    fn additional_kpis(&self, existing: &[Metric], needed: usize) -> Vec<KpiCard> {
        PLACEHOLDER_KPIS
            .iter()
            .filter(|(name, _)| !existing.iter().any(|m| m.name.eq_ignore_ascii_case(name)))
            .take(needed)
            .map(|(name, category)| KpiCard {
                name: name.to_string(),
                value: "N/A".to_string(),
                unit: String::new(),
                trend: None,
                category: category.to_string(),
                placeholder: true,
            })
            .collect()
    }
}

pub fn card_from_metric(metric: &Metric) -> KpiCard {
    KpiCard {
        name: metric.name.clone(),
        value: metric.value.clone(),
        unit: metric.unit.clone(),
        trend: metric.trend,
        category: metric.category.clone(),
        placeholder: false,
    }
}

/// The first `max_cards` metrics as cards, topped up from `source` when
/// there are fewer than four.
pub fn build_cards(
    metrics: &[Metric],
    max_cards: usize,
    source: Option<&dyn AdditionalKpiSource>,
) -> Vec<KpiCard> {
    let mut cards: Vec<KpiCard> = metrics.iter().take(max_cards).map(card_from_metric).collect();

    if let Some(source) = source {
        let target = MIN_CARDS.min(max_cards);
        if !cards.is_empty() && cards.len() < target {
            cards.extend(source.additional_kpis(metrics, target - cards.len()));
        }
    }
    cards
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metric(name: &str) -> Metric {
        Metric {
            name: name.into(),
            value: "1".into(),
            unit: String::new(),
            trend: None,
            context: None,
            category: "Performance".into(),
        }
    }

    #[test]
    fn caps_at_max_cards() {
        let metrics: Vec<Metric> = (0..9).map(|i| metric(&format!("M{i}"))).collect();
        let cards = build_cards(&metrics, DEFAULT_MAX_CARDS, None);
        assert_eq!(cards.len(), 6);
        assert_eq!(cards[5].name, "M5");
    }

    #[test]
    fn placeholders_fill_to_four_without_duplicates() {
        let metrics = vec![metric("Market Share")];
        let cards = build_cards(&metrics, DEFAULT_MAX_CARDS, Some(&PlaceholderKpiSource));

        assert_eq!(cards.len(), MIN_CARDS);
        assert!(!cards[0].placeholder);
        assert!(cards[1..].iter().all(|c| c.placeholder && c.value == "N/A"));
        assert_eq!(cards.iter().filter(|c| c.name == "Market Share").count(), 1);
    }

    #[test]
    fn no_metrics_means_no_cards() {
        assert!(build_cards(&[], DEFAULT_MAX_CARDS, Some(&PlaceholderKpiSource)).is_empty());
    }
}
