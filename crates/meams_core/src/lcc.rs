//! crates/meams_core/src/lcc.rs
//!
//! Life-Cycle Cost analysis: a pure derivation from an equipment record and
//! its repair history into a risk classification. The caller supplies the
//! reference date, keeping the function deterministic.

use chrono::NaiveDate;
use serde::Serialize;

use crate::domain::Equipment;

/// Window, in days, within which a repair counts as "recent".
const RECENT_REPAIR_WINDOW_DAYS: i64 = 180;

/// Overall risk classification. Promotion is monotonic: once High, stays High.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

/// The result of an LCC analysis, shaped for direct JSON serialization.
#[derive(Debug, Clone, Serialize)]
pub struct LccResult {
    pub age_years: f64,
    pub useful_life_years: f64,
    pub purchase_amount: f64,
    pub n_repairs: usize,
    pub total_repair_cost: f64,
    pub average_repair_cost: f64,
    pub repair_frequency_per_year: f64,
    pub cost_ratio: f64,
    pub recent_repairs: usize,
    pub remarks: Vec<String>,
    pub risk_level: RiskLevel,
    pub recommend_replacement: bool,
}

/// Analyzes one equipment record against the classification table.
pub fn analyze(equipment: &Equipment, today: NaiveDate) -> LccResult {
    let price = equipment.purchase_amount;
    let useful_life = equipment.useful_life_years;

    let age_days = (today - equipment.purchase_date).num_days();
    let age_years = (age_days as f64 / 365.25).max(0.0);

    let n_repairs = equipment.repairs.len();
    let total_repair_cost: f64 = equipment.repairs.iter().map(|r| r.amount_used).sum();
    let average_repair_cost = if n_repairs > 0 {
        total_repair_cost / n_repairs as f64
    } else {
        0.0
    };
    let repair_frequency_per_year = if age_years > 0.0 {
        n_repairs as f64 / age_years
    } else {
        0.0
    };
    let cost_ratio = if price > 0.0 {
        total_repair_cost / price
    } else {
        0.0
    };
    let recent_repairs = equipment
        .repairs
        .iter()
        .filter(|r| (today - r.date).num_days() <= RECENT_REPAIR_WINDOW_DAYS)
        .count();

    let mut remarks = Vec::new();
    let mut risk = RiskLevel::Low;
    let mut recommend_replacement = false;

    let promote = |risk: &mut RiskLevel, to: RiskLevel| {
        if to > *risk {
            *risk = to;
        }
    };

    if price > 0.0 && total_repair_cost >= 0.5 * price {
        remarks.push("Costly Repair".to_string());
        promote(&mut risk, RiskLevel::High);
        recommend_replacement = true;
    }
    if repair_frequency_per_year > 2.0 {
        remarks.push("Frequent Repair".to_string());
        promote(&mut risk, RiskLevel::Medium);
        if repair_frequency_per_year > 3.0 {
            recommend_replacement = true;
        }
    }
    if useful_life > 0.0 && age_years >= useful_life {
        remarks.push("Beyond Useful Life".to_string());
        promote(&mut risk, RiskLevel::High);
        recommend_replacement = true;
    } else if useful_life > 0.0 && age_years >= useful_life - 1.0 {
        remarks.push("Approaching End of Life".to_string());
        promote(&mut risk, RiskLevel::Medium);
    }
    if recent_repairs >= 3 {
        remarks.push("High Recent Repair Activity".to_string());
        promote(&mut risk, RiskLevel::High);
        recommend_replacement = true;
    }

    if remarks.is_empty() {
        remarks.push("Operational - Within Parameters".to_string());
    }

    LccResult {
        age_years,
        useful_life_years: useful_life,
        purchase_amount: price,
        n_repairs,
        total_repair_cost,
        average_repair_cost,
        repair_frequency_per_year,
        cost_ratio,
        recent_repairs,
        remarks,
        risk_level: risk,
        recommend_replacement,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::RepairEntry;
    use chrono::{Duration, TimeZone, Utc};
    use uuid::Uuid;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn equipment(purchase_amount: f64, useful_life: f64, purchase_date: NaiveDate) -> Equipment {
        let now = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        Equipment {
            id: Uuid::new_v4(),
            item_code: "EQ-001".to_string(),
            name: "Infusion Pump".to_string(),
            category: "Therapy".to_string(),
            location: "Ward 3".to_string(),
            status: "In Service".to_string(),
            useful_life_years: useful_life,
            purchase_amount,
            purchase_date,
            open_report: None,
            repairs: Vec::new(),
            image: None,
            documents: Vec::new(),
            tracking_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn repair(date: NaiveDate, amount: f64) -> RepairEntry {
        RepairEntry {
            date,
            details: "bearing replacement".to_string(),
            amount_used: amount,
        }
    }

    #[test]
    fn new_equipment_is_operational() {
        let today = date(2026, 1, 1);
        let eq = equipment(100_000.0, 10.0, date(2025, 6, 1));
        let result = analyze(&eq, today);

        assert_eq!(result.risk_level, RiskLevel::Low);
        assert!(!result.recommend_replacement);
        assert_eq!(result.remarks, vec!["Operational - Within Parameters"]);
        assert_eq!(result.n_repairs, 0);
        assert_eq!(result.average_repair_cost, 0.0);
    }

    #[test]
    fn costly_repair_promotes_to_high() {
        let today = date(2026, 1, 1);
        let mut eq = equipment(100_000.0, 10.0, date(2023, 1, 1));
        eq.repairs.push(repair(date(2024, 1, 1), 50_000.0));
        let result = analyze(&eq, today);

        assert!(result.remarks.contains(&"Costly Repair".to_string()));
        assert_eq!(result.risk_level, RiskLevel::High);
        assert!(result.recommend_replacement);
    }

    #[test]
    fn costly_repair_ignored_for_zero_price() {
        let today = date(2026, 1, 1);
        let mut eq = equipment(0.0, 10.0, date(2023, 1, 1));
        eq.repairs.push(repair(date(2024, 1, 1), 50_000.0));
        let result = analyze(&eq, today);

        assert!(!result.remarks.contains(&"Costly Repair".to_string()));
        assert_eq!(result.cost_ratio, 0.0);
    }

    #[test]
    fn frequent_repair_is_medium_without_replacement() {
        let today = date(2026, 1, 1);
        // Two years old, five old repairs: 2.5/year, between 2 and 3.
        let mut eq = equipment(100_000.0, 10.0, date(2024, 1, 1));
        for _ in 0..5 {
            eq.repairs.push(repair(date(2024, 6, 1), 100.0));
        }
        let result = analyze(&eq, today);

        assert!(result.remarks.contains(&"Frequent Repair".to_string()));
        assert_eq!(result.risk_level, RiskLevel::Medium);
        assert!(!result.recommend_replacement);
    }

    #[test]
    fn very_frequent_repair_recommends_replacement() {
        let today = date(2026, 1, 1);
        // One year old, four old repairs: 4/year.
        let mut eq = equipment(100_000.0, 10.0, date(2025, 1, 1));
        for month in 1..=4 {
            eq.repairs.push(repair(date(2025, month, 1), 100.0));
        }
        let result = analyze(&eq, today);

        assert!(result.remarks.contains(&"Frequent Repair".to_string()));
        assert!(result.recommend_replacement);
    }

    #[test]
    fn beyond_useful_life_is_high() {
        let today = date(2026, 1, 1);
        let eq = equipment(100_000.0, 5.0, date(2019, 1, 1));
        let result = analyze(&eq, today);

        assert!(result.remarks.contains(&"Beyond Useful Life".to_string()));
        assert_eq!(result.risk_level, RiskLevel::High);
        assert!(result.recommend_replacement);
    }

    #[test]
    fn approaching_end_of_life_is_medium() {
        let today = date(2026, 1, 1);
        // 4.5 years old against a 5-year life.
        let eq = equipment(100_000.0, 5.0, date(2021, 7, 1));
        let result = analyze(&eq, today);

        assert!(result
            .remarks
            .contains(&"Approaching End of Life".to_string()));
        assert!(!result.remarks.contains(&"Beyond Useful Life".to_string()));
        assert_eq!(result.risk_level, RiskLevel::Medium);
        assert!(!result.recommend_replacement);
    }

    #[test]
    fn recent_repair_activity_is_high() {
        let today = date(2026, 1, 1);
        let mut eq = equipment(100_000.0, 10.0, date(2024, 1, 1));
        for i in 0..3 {
            eq.repairs
                .push(repair(today - Duration::days(30 * (i + 1)), 100.0));
        }
        let result = analyze(&eq, today);

        assert!(result
            .remarks
            .contains(&"High Recent Repair Activity".to_string()));
        assert_eq!(result.risk_level, RiskLevel::High);
        assert!(result.recommend_replacement);
    }

    #[test]
    fn repair_outside_window_is_not_recent() {
        let today = date(2026, 1, 1);
        let mut eq = equipment(100_000.0, 10.0, date(2024, 1, 1));
        eq.repairs.push(repair(today - Duration::days(181), 100.0));
        eq.repairs.push(repair(today - Duration::days(180), 100.0));
        let result = analyze(&eq, today);

        assert_eq!(result.recent_repairs, 1);
    }

    #[test]
    fn high_risk_scenario_combines_remarks() {
        // Seven-year-old equipment on a five-year life with two recent
        // repairs totalling 60% of the purchase price.
        let today = date(2026, 1, 1);
        let mut eq = equipment(100_000.0, 5.0, date(2019, 1, 1));
        eq.repairs.push(repair(today - Duration::days(30), 30_000.0));
        eq.repairs.push(repair(today - Duration::days(90), 30_000.0));
        let result = analyze(&eq, today);

        assert_eq!(result.risk_level, RiskLevel::High);
        assert!(result.recommend_replacement);
        assert!(result.remarks.contains(&"Costly Repair".to_string()));
        assert!(result.remarks.contains(&"Beyond Useful Life".to_string()));
    }

    #[test]
    fn risk_serializes_capitalized() {
        let json = serde_json::to_string(&RiskLevel::High).unwrap();
        assert_eq!(json, "\"High\"");
    }
}
