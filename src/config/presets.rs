//! Built-in domains: production wells, logistics, refining units, market
//! tickers and the field-level production totals, seeded with the
//! dashboard's demonstration data.
//!
//! Per-entity domains floor their metrics at 0 so shut-in and maintenance
//! seeds (all zeros) keep their values. The wells walk therefore spans
//! [0, 2000] psi and [0, 100]% efficiency rather than the narrower
//! operating bands of [800, 2000] and [75, 100]; producing wells start
//! well inside those bands and the walk rarely leaves them. The `field`
//! domain has no idle entities and keeps its operating bands as bounds.

use chrono::NaiveDate;
use std::collections::BTreeMap;

use super::DomainConfig;
use crate::alerts::NoiseConfig;
use crate::types::{
    Category, Condition, Criterion, EntitySeed, MaintenancePolicy, MetricDefinition,
    ScoreDefinition, ScoreTerm, SetpointRule, Severity, ThresholdRule,
};

/// Every preset, in dashboard order.
pub fn all() -> Vec<DomainConfig> {
    vec![wells(), logistics(), refining(), markets(), field()]
}

fn date(y: i32, m: u32, d: u32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(y, m, d)
}

fn metrics(defs: Vec<(&str, MetricDefinition)>) -> BTreeMap<String, MetricDefinition> {
    defs.into_iter().map(|(k, v)| (k.to_string(), v)).collect()
}

fn seed(id: u32, name: &str, category: Category, values: &[(&str, f64)]) -> EntitySeed {
    values
        .iter()
        .fold(EntitySeed::new(id, name, category), |s, (k, v)| s.with_metric(k, *v))
}

fn maintained(seed: EntitySeed, last: Option<NaiveDate>) -> EntitySeed {
    match last {
        Some(d) => seed.with_last_maintenance(d),
        None => seed,
    }
}

// ============================================================================
// Wells (production optimization)
// ============================================================================

pub fn wells() -> DomainConfig {
    DomainConfig {
        name: "wells".to_string(),
        title: "Production Optimization".to_string(),
        live_categories: vec![Category::Producing],
        search_fields: vec!["location".to_string(), "reservoir".to_string()],
        noise: NoiseConfig::default(),
        metrics: metrics(vec![
            ("oil", MetricDefinition::new(0.0, 10_000.0, 25.0, 0.0).integral().with_unit("bbl/d")),
            ("gas", MetricDefinition::new(0.0, 100.0, 0.25, 0.0).with_unit("MMscf/d")),
            ("water_cut", MetricDefinition::new(0.0, 30.0, 0.5, 0.0).with_unit("%")),
            ("pressure", MetricDefinition::new(0.0, 2_000.0, 10.0, 0.0).with_unit("psi")),
            ("efficiency", MetricDefinition::new(0.0, 100.0, 0.5, 0.0).with_unit("%")),
            ("choke", MetricDefinition::new(0.0, 64.0, 0.0, 0.0).integral().with_unit("1/64 in")),
        ]),
        maintenance: None,
        scores: vec![ScoreDefinition::new(
            "optimization",
            vec![
                ScoreTerm::rising("efficiency", 0.4, 0.0, 100.0),
                ScoreTerm::falling("water_cut", 0.3, 0.0, 30.0),
                ScoreTerm::target("pressure", 0.2, 0.0, 2_400.0, 1_200.0),
            ],
        )
        .with_alert_factor(0.1, 0.5)],
        thresholds: vec![ThresholdRule::new(
            "water_cut_high",
            "water_cut",
            Condition::Above,
            20.0,
            Severity::Medium,
            "Water cut on {entity} above {threshold}% ({value}%)",
        )],
        setpoints: vec![SetpointRule {
            metric: "choke".to_string(),
            step: 4.0,
            min: 16.0,
            max: 48.0,
            decrease_when: vec![
                Criterion::new("efficiency", Condition::Below, 85.0),
                Criterion::new("water_cut", Condition::Above, 20.0),
            ],
            increase_when: vec![Criterion::new("efficiency", Condition::Above, 90.0)],
        }],
        entities: vec![
            seed(
                1,
                "ALPHA-1",
                Category::Producing,
                &[
                    ("oil", 4200.0),
                    ("gas", 22.0),
                    ("water_cut", 15.0),
                    ("pressure", 1280.0),
                    ("choke", 28.0),
                    ("efficiency", 88.5),
                ],
            )
            .with_attribute("location", "A-12")
            .with_attribute("reservoir", "Upper Cretaceous")
            .with_attribute("artificial_lift", "ESP")
            .with_alert(Severity::Medium, "Water cut increasing"),
            seed(
                2,
                "BRAVO-3",
                Category::Producing,
                &[
                    ("oil", 3800.0),
                    ("gas", 18.0),
                    ("water_cut", 12.0),
                    ("pressure", 1150.0),
                    ("choke", 32.0),
                    ("efficiency", 91.2),
                ],
            )
            .with_attribute("location", "B-07")
            .with_attribute("reservoir", "Lower Jurassic")
            .with_attribute("artificial_lift", "Gas Lift"),
            seed(3, "CHARLIE-7", Category::ShutIn, &[])
                .with_attribute("location", "C-03")
                .with_attribute("reservoir", "Triassic")
                .with_attribute("artificial_lift", "Rod Pump"),
        ],
    }
}

// ============================================================================
// Logistics
// ============================================================================

pub fn logistics() -> DomainConfig {
    DomainConfig {
        name: "logistics".to_string(),
        title: "Logistics".to_string(),
        live_categories: vec![Category::EnRoute],
        search_fields: vec!["location".to_string()],
        noise: NoiseConfig::default(),
        metrics: metrics(vec![
            ("fuel_efficiency", MetricDefinition::new(0.0, 10.0, 0.1, 0.0).with_unit("mpg")),
            ("distance", MetricDefinition::new(0.0, 10_000.0, 25.0, 0.0).integral().with_unit("mi")),
            ("load", MetricDefinition::new(0.0, 15_000.0, 0.0, 0.0).integral().with_unit("lb")),
        ]),
        maintenance: Some(MaintenancePolicy {
            score: "delivery".to_string(),
            score_below: 80.0,
            max_days_since: 90,
            lead_days: 7,
        }),
        scores: vec![ScoreDefinition::new(
            "delivery",
            vec![
                ScoreTerm::rising("fuel_efficiency", 0.4, 0.0, 10.0),
                ScoreTerm::rising("load", 0.3, 0.0, 15_000.0),
                ScoreTerm::rising("distance", 0.1, 0.0, 1_000.0),
            ],
        )
        .with_alert_factor(0.2, 0.5)],
        thresholds: vec![ThresholdRule::new(
            "fuel_efficiency_low",
            "fuel_efficiency",
            Condition::Below,
            5.0,
            Severity::Medium,
            "Fuel efficiency on {entity} dropped below {threshold} mpg",
        )],
        setpoints: Vec::new(),
        entities: vec![
            maintained(
                seed(
                    1,
                    "Truck-001",
                    Category::EnRoute,
                    &[("load", 5000.0), ("fuel_efficiency", 6.5), ("distance", 320.0)],
                ),
                date(2025, 7, 20),
            )
            .with_attribute("type", "truck")
            .with_attribute("location", "Houston, TX")
            .with_alert(Severity::Medium, "High fuel consumption"),
            maintained(
                seed(2, "Warehouse-A", Category::Operational, &[("load", 12000.0)]),
                date(2025, 6, 15),
            )
            .with_attribute("type", "warehouse")
            .with_attribute("location", "Dallas, TX"),
            maintained(seed(3, "Truck-002", Category::Maintenance, &[]), date(2025, 8, 3))
                .with_attribute("type", "truck")
                .with_attribute("location", "Austin, TX"),
        ],
    }
}

// ============================================================================
// Refining
// ============================================================================

pub fn refining() -> DomainConfig {
    DomainConfig {
        name: "refining".to_string(),
        title: "Refining & Processing".to_string(),
        live_categories: vec![Category::Operational],
        search_fields: vec!["unit".to_string()],
        noise: NoiseConfig::default(),
        metrics: metrics(vec![
            ("throughput", MetricDefinition::new(0.0, 100_000.0, 250.0, 0.0).integral().with_unit("bbl/d")),
            ("yield", MetricDefinition::new(0.0, 100.0, 0.5, 0.0).with_unit("%")),
            ("energy", MetricDefinition::new(0.0, 2_000.0, 0.0, 0.0).with_unit("MWh")),
            ("emissions", MetricDefinition::new(0.0, 500.0, 2.5, 0.0).with_unit("tCO2")),
            ("temperature", MetricDefinition::new(0.0, 600.0, 5.0, 0.0).with_unit("C")),
            ("pressure", MetricDefinition::new(0.0, 5.0, 0.1, 0.0).with_unit("MPa")),
            ("feed_rate", MetricDefinition::new(0.0, 60_000.0, 0.0, 0.0).integral().with_unit("bbl/d")),
        ]),
        maintenance: Some(MaintenancePolicy {
            score: "health".to_string(),
            score_below: 80.0,
            max_days_since: 180,
            lead_days: 7,
        }),
        scores: vec![ScoreDefinition::new(
            "health",
            vec![
                ScoreTerm::rising("yield", 0.4, 0.0, 100.0),
                ScoreTerm::falling("emissions", 0.3, 0.0, 300.0),
                ScoreTerm::falling("energy", 0.2, 0.0, 2_000.0),
            ],
        )
        .with_alert_factor(0.1, 0.5)],
        thresholds: vec![
            ThresholdRule::new(
                "emissions_high",
                "emissions",
                Condition::Above,
                200.0,
                Severity::Medium,
                "Emissions on {entity} exceeded {threshold} tCO2",
            ),
            ThresholdRule::new(
                "yield_drop",
                "yield",
                Condition::DropExceeds,
                5.0,
                Severity::Medium,
                "Yield on {entity} dropped by more than {threshold}%",
            ),
        ],
        setpoints: Vec::new(),
        entities: vec![
            maintained(
                seed(
                    1,
                    "Crude Distillation Unit",
                    Category::Operational,
                    &[
                        ("throughput", 50000.0),
                        ("yield", 85.5),
                        ("energy", 1200.0),
                        ("emissions", 150.0),
                        ("temperature", 350.0),
                        ("pressure", 2.5),
                        ("feed_rate", 48000.0),
                    ],
                ),
                date(2025, 6, 15),
            )
            .with_attribute("unit", "CDU-1")
            .with_alert(Severity::Medium, "High emissions detected"),
            maintained(
                seed(
                    2,
                    "Fluid Catalytic Cracker",
                    Category::Operational,
                    &[
                        ("throughput", 30000.0),
                        ("yield", 90.2),
                        ("energy", 800.0),
                        ("emissions", 100.0),
                        ("temperature", 500.0),
                        ("pressure", 1.8),
                        ("feed_rate", 29000.0),
                    ],
                ),
                date(2025, 7, 10),
            )
            .with_attribute("unit", "FCC-1"),
            maintained(seed(3, "Hydrotreater", Category::Maintenance, &[]), date(2025, 8, 2))
                .with_attribute("unit", "HT-1"),
        ],
    }
}

// ============================================================================
// Markets
// ============================================================================

pub fn markets() -> DomainConfig {
    DomainConfig {
        name: "markets".to_string(),
        title: "Market Intelligence".to_string(),
        live_categories: vec![Category::Trading],
        search_fields: vec!["company".to_string(), "sector".to_string()],
        noise: NoiseConfig::default(),
        metrics: metrics(vec![
            ("price", MetricDefinition::new(0.0, 1_000.0, 1.0, 0.0).with_unit("USD")),
            ("volume", MetricDefinition::new(0.0, 1_000_000_000.0, 500_000.0, 0.0).integral()),
            ("volatility", MetricDefinition::new(0.0, 1.0, 0.01, 0.0)),
        ]),
        maintenance: None,
        scores: vec![ScoreDefinition::new(
            "performance",
            vec![
                ScoreTerm::rising("price", 0.5, 0.0, 200.0),
                ScoreTerm::falling("volatility", 0.3, 0.0, 1.0),
                ScoreTerm::rising("volume", 0.2, 0.0, 100_000_000.0),
            ],
        )],
        thresholds: vec![
            ThresholdRule::new(
                "volatility_high",
                "volatility",
                Condition::Above,
                0.5,
                Severity::Medium,
                "Volatility on {entity} above {threshold} ({value})",
            ),
            ThresholdRule::new(
                "price_swing",
                "price",
                Condition::ChangePercentExceeds,
                5.0,
                Severity::Medium,
                "Price of {entity} moved more than {threshold}% in one tick",
            ),
        ],
        setpoints: Vec::new(),
        entities: vec![
            seed(
                1,
                "AAPL",
                Category::Trading,
                &[("price", 175.25), ("volume", 65_000_000.0), ("volatility", 0.3)],
            )
            .with_attribute("company", "Apple Inc.")
            .with_attribute("sector", "Technology")
            .with_alert(Severity::Medium, "Price volatility increased"),
            seed(
                2,
                "XOM",
                Category::Trading,
                &[("price", 115.75), ("volume", 20_000_000.0), ("volatility", 0.25)],
            )
            .with_attribute("company", "Exxon Mobil Corp.")
            .with_attribute("sector", "Energy"),
            seed(
                3,
                "GLD",
                Category::Trading,
                &[("price", 185.5), ("volume", 15_000_000.0), ("volatility", 0.15)],
            )
            .with_attribute("company", "Gold ETF")
            .with_attribute("sector", "Commodities"),
        ],
    }
}

// ============================================================================
// Field (production dashboard totals)
// ============================================================================

pub fn field() -> DomainConfig {
    DomainConfig {
        name: "field".to_string(),
        title: "Production Dashboard".to_string(),
        live_categories: vec![Category::Producing],
        search_fields: Vec::new(),
        noise: NoiseConfig::default(),
        metrics: metrics(vec![
            ("oil_rate", MetricDefinition::new(0.0, 50_000.0, 100.0, 0.0).integral().with_unit("bbl/d")),
            ("gas_rate", MetricDefinition::new(0.0, 300.0, 1.0, 0.0).with_unit("MMscf/d")),
            ("water_cut", MetricDefinition::new(5.0, 30.0, 0.5, 5.0).with_unit("%")),
            ("wellhead_pressure", MetricDefinition::new(800.0, 2_000.0, 25.0, 800.0).with_unit("psi")),
            ("choke", MetricDefinition::new(0.0, 64.0, 0.0, 0.0).integral().with_unit("1/64 in")),
            ("downtime", MetricDefinition::new(0.0, 5.0, 0.1, 0.0).with_unit("%")),
            ("efficiency", MetricDefinition::new(85.0, 100.0, 0.5, 85.0).with_unit("%")),
            ("target", MetricDefinition::new(0.0, 50_000.0, 0.0, 0.0).integral().with_unit("bbl/d")),
            ("flare_rate", MetricDefinition::new(0.0, 20.0, 0.1, 0.0).with_unit("MMscf/d")),
            ("co2_emissions", MetricDefinition::new(0.0, 1_000.0, 5.0, 0.0).with_unit("t/d")),
            ("energy", MetricDefinition::new(0.0, 100_000.0, 250.0, 0.0).with_unit("kWh")),
        ]),
        maintenance: None,
        scores: vec![ScoreDefinition::new(
            "attainment",
            vec![
                ScoreTerm::rising("oil_rate", 0.4, 0.0, 26_000.0),
                ScoreTerm::rising("efficiency", 0.2, 85.0, 100.0),
                ScoreTerm::falling("downtime", 0.1, 0.0, 5.0),
                ScoreTerm::falling("co2_emissions", 0.2, 0.0, 600.0),
            ],
        )
        .with_alert_factor(0.1, 0.5)],
        thresholds: vec![
            ThresholdRule::new(
                "water_cut_high",
                "water_cut",
                Condition::Above,
                20.0,
                Severity::Medium,
                "Water cut on {entity} above {threshold}% ({value}%)",
            ),
            ThresholdRule::new(
                "co2_high",
                "co2_emissions",
                Condition::Above,
                450.0,
                Severity::High,
                "CO2 emissions on {entity} above {threshold} t/d ({value})",
            ),
        ],
        setpoints: Vec::new(),
        entities: vec![seed(
            1,
            "Field Total",
            Category::Producing,
            &[
                ("oil_rate", 24567.0),
                ("gas_rate", 125.0),
                ("water_cut", 18.5),
                ("wellhead_pressure", 1250.0),
                ("choke", 32.0),
                ("downtime", 2.3),
                ("efficiency", 92.7),
                ("target", 26000.0),
                ("flare_rate", 2.4),
                ("co2_emissions", 420.0),
                ("energy", 28500.0),
            ],
        )
        .with_alert(Severity::High, "High pressure detected at Pump Station 1")],
    }
}
