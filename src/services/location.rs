//! Place of publication waterfall for 260 $a and 008/15-17

use crate::{
    error::AppResult,
    models::publisher::{LocationSource, PublisherLocation},
    repository::publishers::PublishersRepository,
    services::registry::RegistryService,
    text::publisher::{
        country_code_for_place, display_place, is_unknown_place, normalize_publisher_name,
        split_publisher_aliases, UNKNOWN_COUNTRY, UNKNOWN_PLACE,
    },
};

#[derive(Clone)]
pub struct LocationService {
    registry: RegistryService,
    publishers: PublishersRepository,
}

impl LocationService {
    pub fn new(registry: RegistryService, publishers: PublishersRepository) -> Self {
        Self { registry, publishers }
    }

    /// Resolve where a book was published; errors end up as source `ERROR`
    pub async fn locate(&self, isbn: Option<&str>, publisher_raw: &str) -> PublisherLocation {
        match self.resolve(isbn, publisher_raw).await {
            Ok(location) => location,
            Err(e) => {
                tracing::warn!(error = %e, publisher = publisher_raw, "Publisher location failed");
                PublisherLocation {
                    place_raw: UNKNOWN_PLACE.to_string(),
                    place_display: UNKNOWN_PLACE.to_string(),
                    country_code: UNKNOWN_COUNTRY.to_string(),
                    resolved_publisher: Some(publisher_raw.trim().to_string()).filter(|p| !p.is_empty()),
                    source: LocationSource::Error,
                    debug: vec![format!("error: {}", e)],
                }
            }
        }
    }

    async fn resolve(&self, isbn: Option<&str>, publisher_raw: &str) -> AppResult<PublisherLocation> {
        let mut debug = Vec::new();

        let kpipa_full = match isbn.map(str::trim).filter(|i| !i.is_empty()) {
            Some(isbn) => match self.registry.kpipa_publisher(isbn).await {
                Ok(Some(full)) => {
                    debug.push(format!("KPIPA publisher: {}", full));
                    Some(full)
                }
                Ok(None) => {
                    debug.push("KPIPA: no result".to_string());
                    None
                }
                Err(e) => {
                    debug.push(format!("KPIPA failed: {}", e));
                    None
                }
            },
            None => None,
        };

        let (rep, aliases) = split_publisher_aliases(kpipa_full.as_deref().unwrap_or(publisher_raw));
        let rep = if rep.is_empty() { publisher_raw.trim().to_string() } else { rep };
        debug.push(format!("representative: {} | aliases: {:?}", rep, aliases));

        let (place_raw, source) = match self.match_tables(&rep, &aliases, &mut debug).await? {
            Some(hit) => hit,
            None => match self.mcst_address(&rep, &mut debug).await {
                Some(address) => (address, LocationSource::Mcst),
                None => {
                    debug.push("every route failed, place unknown".to_string());
                    (UNKNOWN_PLACE.to_string(), LocationSource::Fallback)
                }
            },
        };

        let regions = self.publishers.list_regions().await?;
        let country_code = country_code_for_place(
            &place_raw,
            regions.iter().map(|r| (r.region.as_str(), r.country_code.as_str())),
        );

        Ok(PublisherLocation {
            place_display: display_place(&place_raw),
            place_raw,
            country_code,
            resolved_publisher: Some(rep).filter(|r| !r.is_empty()),
            source,
            debug,
        })
    }

    /// Registered address of a publisher, matched on the normalised name
    async fn address_of(&self, name: &str) -> AppResult<Option<String>> {
        Ok(self
            .publishers
            .find_by_normalized_name(&normalize_publisher_name(name))
            .await?
            .map(|p| p.address)
            .filter(|a| !is_unknown_place(a)))
    }

    async fn match_tables(
        &self,
        rep: &str,
        aliases: &[String],
        debug: &mut Vec<String>,
    ) -> AppResult<Option<(String, LocationSource)>> {
        if rep.is_empty() {
            debug.push("no publisher name to search".to_string());
            return Ok(None);
        }

        if let Some(address) = self.address_of(rep).await? {
            debug.push(format!("publisher table: {} → {}", rep, address));
            return Ok(Some((address, LocationSource::KpipaDb)));
        }
        for alias in aliases {
            if let Some(address) = self.address_of(alias).await? {
                debug.push(format!("publisher table by alias: {} → {}", alias, address));
                return Ok(Some((address, LocationSource::KpipaDbAlias)));
            }
        }

        if let Some(parent) = self
            .publishers
            .publisher_for_imprint(&normalize_publisher_name(rep))
            .await?
        {
            debug.push(format!("imprint {} belongs to {}", rep, parent));
            if let Some(address) = self.address_of(&parent).await? {
                return Ok(Some((address, LocationSource::ImprintKpipa)));
            }
        }

        if let Some(publisher) = self.publishers.find_by_stage2(rep).await? {
            if !is_unknown_place(&publisher.address) {
                debug.push(format!("stage 2 match: {} → {}", rep, publisher.name));
                return Ok(Some((publisher.address, LocationSource::KpipaDbStage2)));
            }
        }
        if let Some(parent) = self.publishers.publisher_for_imprint_stage2(rep).await? {
            if let Some(address) = self.address_of(&parent).await? {
                debug.push(format!("stage 2 imprint match: {} → {}", rep, parent));
                return Ok(Some((address, LocationSource::KpipaDbStage2)));
            }
        }

        debug.push(format!("no table match for {}", rep));
        Ok(None)
    }

    async fn mcst_address(&self, rep: &str, debug: &mut Vec<String>) -> Option<String> {
        if rep.is_empty() {
            return None;
        }
        match self.registry.mcst_search(rep).await {
            Ok(rows) if !rows.is_empty() => {
                debug.push(format!("MCST: {} trading registrations", rows.len()));
                rows.into_iter().next().map(|r| r.address)
            }
            Ok(_) => {
                debug.push("MCST: no result".to_string());
                None
            }
            Err(e) => {
                debug.push(format!("MCST failed: {}", e));
                None
            }
        }
    }
}
