use crate::errors::AppResult;
use crate::models::{Lead, Opportunity};
use anyhow::Context;

const LEADS_JSON: &str = include_str!("../data/leads.json");
const OPPORTUNITIES_JSON: &str = include_str!("../data/opportunities.json");

pub fn seed_leads() -> AppResult<Vec<Lead>> {
    let leads = serde_json::from_str(LEADS_JSON).context("bundled lead seed is not valid JSON")?;
    Ok(leads)
}

pub fn seed_opportunities() -> AppResult<Vec<Opportunity>> {
    let opportunities =
        serde_json::from_str(OPPORTUNITIES_JSON).context("bundled opportunity seed is not valid JSON")?;
    Ok(opportunities)
}
