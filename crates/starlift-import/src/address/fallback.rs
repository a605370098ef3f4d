//! Local fallback checks for addresses the remote validator turns down.
//!
//! Reference data is fetched lazily and memoized per run: the country list
//! once, subdivisions per country, counties per state. Check failures are
//! returned as plain reason strings — a fallback failure is a recoverable
//! row failure, never a batch abort.

use std::collections::{HashMap, HashSet};

use starlift_client::{ApiClient, Country, Subdivision};

use crate::address::AddressRecord;

/// Lazily-fetched reference data backing the fallback checks.
#[derive(Default)]
pub struct ReferenceData {
    countries: Option<HashSet<String>>,
    subdivisions: HashMap<String, HashSet<String>>,
    counties: HashMap<String, Vec<String>>,
}

impl ReferenceData {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Verifies the address against local reference data: country code,
    /// subdivision membership, and — for US addresses where county reference
    /// data exists — county membership. An empty county list means the
    /// region has no county data and imposes no constraint.
    ///
    /// # Errors
    ///
    /// Returns the human-readable reason the address was rejected, including
    /// reference-data fetch failures, which fail only the rows that needed
    /// that data.
    pub async fn verify(
        &mut self,
        client: &ApiClient,
        address: &AddressRecord,
    ) -> Result<(), String> {
        if self.countries.is_none() {
            let fetched: Vec<Country> = client
                .get_paged("_data/countries")
                .await
                .map_err(|e| e.to_string())?;
            self.countries = Some(fetched.into_iter().map(|c| c.code).collect());
        }
        let Some(countries) = self.countries.as_ref() else {
            return Err("country reference data unavailable".to_string());
        };
        if !countries.contains(&address.country) {
            return Err(format!("{} is not a valid country.", address.country));
        }

        if !self.subdivisions.contains_key(&address.country) {
            let fetched: Vec<Subdivision> = client
                .get_paged(&format!("_data/subdivisions/{}", address.country))
                .await
                .map_err(|e| e.to_string())?;
            self.subdivisions.insert(
                address.country.clone(),
                fetched.into_iter().map(|s| s.code).collect(),
            );
        }
        let Some(known_states) = self.subdivisions.get(&address.country) else {
            return Err("subdivision reference data unavailable".to_string());
        };
        if !known_states.contains(&address.state) {
            return Err(format!(
                "{} is not a valid subdivision of {}.",
                address.state, address.country
            ));
        }

        if address.country == "US" {
            if !self.counties.contains_key(&address.state) {
                let fetched: Vec<String> = client
                    .get_paged(&format!("_data/counties/{}", address.state))
                    .await
                    .map_err(|e| e.to_string())?;
                self.counties.insert(address.state.clone(), fetched);
            }
            let Some(counties) = self.counties.get(&address.state) else {
                return Err("county reference data unavailable".to_string());
            };
            if !counties.is_empty() {
                let Some(county) = address.county.as_deref().filter(|c| !c.is_empty()) else {
                    return Err(
                        "The address failed to validate, and a county is required for addresses in the US."
                            .to_string(),
                    );
                };
                if !counties.iter().any(|c| c.eq_ignore_ascii_case(county)) {
                    return Err("The county is not a valid county for the state.".to_string());
                }
            }
        }

        Ok(())
    }
}
