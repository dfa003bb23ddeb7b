//! The benchmarked query and its parameter cycle.

use serde::{Deserialize, Serialize};
use std::num::NonZeroU32;

use crate::error::{BenchError, BenchResult};
use crate::parser::{self, Template};

/// Revenue per category for one actor, joined across the sakila schema.
pub const ACTOR_REVENUE_SQL: &str = "\
SELECT a.first_name, a.last_name, c.name AS category,
       COUNT(r.rental_id) AS total_rentals, SUM(p.amount) AS total_revenue
FROM actor a
JOIN film_actor fa ON a.actor_id = fa.actor_id
JOIN film f ON fa.film_id = f.film_id
JOIN film_category fc ON f.film_id = fc.film_id
JOIN category c ON fc.category_id = c.category_id
JOIN inventory i ON f.film_id = i.film_id
JOIN rental r ON i.inventory_id = r.inventory_id
JOIN payment p ON r.rental_id = p.rental_id
WHERE a.actor_id = ?
GROUP BY a.actor_id, c.category_id
";

/// Single-row primary key lookup.
pub const ACTOR_LOOKUP_SQL: &str = "SELECT * FROM actor WHERE actor_id = ?";

/// Built-in queries against the sakila sample database.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum QueryPreset {
    #[default]
    ActorRevenue,
    ActorLookup,
}

impl QueryPreset {
    pub fn sql(self) -> &'static str {
        match self {
            QueryPreset::ActorRevenue => ACTOR_REVENUE_SQL,
            QueryPreset::ActorLookup => ACTOR_LOOKUP_SQL,
        }
    }
}

/// An immutable SQL template with exactly one integer placeholder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    template: Template,
}

impl Query {
    pub fn new(sql: impl AsRef<str>) -> BenchResult<Self> {
        let template = parser::parse_template(sql.as_ref())?;
        match template.placeholder_count() {
            1 => Ok(Self { template }),
            n => Err(BenchError::Config(format!(
                "Benchmark query must have exactly one placeholder, found {}",
                n
            ))),
        }
    }

    pub fn preset(preset: QueryPreset) -> BenchResult<Self> {
        Self::new(preset.sql())
    }

    pub fn sql(&self) -> &str {
        self.template.sql()
    }

    pub fn template(&self) -> &Template {
        &self.template
    }
}

/// Parameter values cycle over `1..=length` so repeated executions hit the
/// same statement with a bounded set of bindings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParameterCycle {
    length: NonZeroU32,
}

impl ParameterCycle {
    pub fn new(length: u32) -> BenchResult<Self> {
        NonZeroU32::new(length)
            .map(|length| Self { length })
            .ok_or_else(|| BenchError::Config("Parameter cycle length must be at least 1".into()))
    }

    pub fn length(&self) -> u32 {
        self.length.get()
    }

    /// The parameter bound on iteration `i`.
    pub fn value(&self, i: u32) -> i64 {
        i64::from(i % self.length.get()) + 1
    }
}
