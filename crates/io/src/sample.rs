//! Demo dataset generation: a year of synthetic sales records.
//!
//! Seeded so repeated runs produce identical files.

use chrono::{Days, NaiveDate};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use tablepilot_table::{Column, Table, Value};

const CATEGORIES: &[&str] = &["Electronics", "Clothing", "Books", "Home", "Sports"];
const GENDERS: &[&str] = &["M", "F", "Other"];
const CHANNELS: &[&str] = &["Online", "Store", "Phone"];

/// Fraction of satisfaction scores left missing, for realistic null handling.
const MISSING_RATE: f64 = 0.05;

/// Generate a sales demo table with `rows` records.
pub fn sales_table(rows: usize) -> Table {
    let mut rng = StdRng::seed_from_u64(42);
    let start = NaiveDate::from_ymd_opt(2023, 1, 1).expect("valid start date");

    let mut date = Vec::with_capacity(rows);
    let mut category = Vec::with_capacity(rows);
    let mut product = Vec::with_capacity(rows);
    let mut price = Vec::with_capacity(rows);
    let mut quantity = Vec::with_capacity(rows);
    let mut age = Vec::with_capacity(rows);
    let mut gender = Vec::with_capacity(rows);
    let mut channel = Vec::with_capacity(rows);
    let mut discount = Vec::with_capacity(rows);
    let mut satisfaction = Vec::with_capacity(rows);
    let mut revenue = Vec::with_capacity(rows);

    for i in 0..rows {
        let day = start
            .checked_add_days(Days::new(i as u64))
            .unwrap_or(start);
        date.push(Value::Text(day.format("%Y-%m-%d").to_string()));

        category.push(Value::Text(pick(&mut rng, CATEGORIES)));
        product.push(Value::Text(format!("Product_{}", i)));

        let p = round2(rng.gen_range(1.0..120.0));
        price.push(Value::Number(p));

        let q = rng.gen_range(1..12) as f64;
        quantity.push(Value::Number(q));

        age.push(Value::Number(rng.gen_range(18..75) as f64));
        gender.push(Value::Text(pick(&mut rng, GENDERS)));
        channel.push(Value::Text(pick(&mut rng, CHANNELS)));

        let d = round1(rng.gen_range(0.0..30.0));
        discount.push(Value::Number(d));

        if rng.gen_bool(MISSING_RATE) {
            satisfaction.push(Value::Null);
        } else {
            satisfaction.push(Value::Number(round1(rng.gen_range(1.0..5.0))));
        }

        revenue.push(Value::Number(round2(p * q * (1.0 - d / 100.0))));
    }

    Table::from_columns(vec![
        Column::new("date", date),
        Column::new("product_category", category),
        Column::new("product_name", product),
        Column::new("price", price),
        Column::new("quantity_sold", quantity),
        Column::new("customer_age", age),
        Column::new("customer_gender", gender),
        Column::new("sales_channel", channel),
        Column::new("discount_percentage", discount),
        Column::new("customer_satisfaction", satisfaction),
        Column::new("total_revenue", revenue),
    ])
    .expect("generated columns are rectangular")
}

fn pick(rng: &mut StdRng, options: &[&str]) -> String {
    options[rng.gen_range(0..options.len())].to_string()
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

fn round1(v: f64) -> f64 {
    (v * 10.0).round() / 10.0
}
