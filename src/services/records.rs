//! ISBN to KORMARC record conversion

use std::sync::Arc;

use chrono::Local;
use tokio::{sync::Semaphore, task::JoinSet};

use crate::{
    config::CatalogingConfig,
    error::{AppError, AppResult},
    marc::{
        builders::{
            build_007, build_008, build_020, build_049, build_056, build_245, build_246, build_260,
            build_653, build_940, build_950, build_series,
        },
        fixed::{extract_year, BookText, UNKNOWN_DATE1},
        Field, Fixed008, MarcRecord,
    },
    models::{
        aladin::{AladinItem, AladinPage},
        nlk::SeojiRecord,
        record::{ConversionMeta, ConversionOutcome, ConversionResult, ConvertItem, NameCandidates},
    },
    services::{
        aladin::AladinService,
        authority::AuthorityService,
        language::{LanguageInput, LanguageService},
        llm::Assistant,
        location::LocationService,
        nlk::NlkService,
        wikidata::WikidataService,
    },
    text::{
        keywords::{forbidden_set, KeywordSource},
        people::{
            clean_author_string, people_from_aladin, primary_author, split_authors_translators, People, Role,
        },
        physical::{build_300, illustration_labels, Extent},
        reading::{needs_reading, readings_940},
        title::{clean_original_title, extract_title_statement, reading_title},
    },
};

/// Digits and X only; 10 or 13 characters
pub fn normalize_isbn(raw: &str) -> AppResult<String> {
    let isbn: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == 'X' || *c == 'x')
        .map(|c| c.to_ascii_uppercase())
        .collect();
    match isbn.len() {
        10 | 13 => Ok(isbn),
        _ => Err(AppError::Validation(format!(
            "ISBN must have 10 or 13 digits, got '{}'",
            raw.trim()
        ))),
    }
}

fn mrk_of(field: &Option<Field>) -> Option<String> {
    field.as_ref().map(Field::to_mrk)
}

/// People of the record; NLK Seoji stands in when Aladin names nobody
pub fn merge_people(item: &AladinItem, seoji: Option<&SeojiRecord>, include_illustrators: bool) -> People {
    let mut people = people_from_aladin(item, include_illustrators);
    if people.lacks_statement() {
        if let Some(seoji) = seoji {
            let (authors, translators) = split_authors_translators(&seoji.author);
            for name in authors {
                people.add(Role::Author, name);
            }
            for name in translators {
                people.add(Role::Translator, name);
            }
            people.dedup();
        }
    }
    people
}

#[derive(Clone)]
pub struct RecordService {
    aladin: AladinService,
    nlk: NlkService,
    wikidata: WikidataService,
    location: LocationService,
    authority: AuthorityService,
    language: LanguageService,
    assistant: Assistant,
    config: CatalogingConfig,
}

impl RecordService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        aladin: AladinService,
        nlk: NlkService,
        wikidata: WikidataService,
        location: LocationService,
        authority: AuthorityService,
        language: LanguageService,
        assistant: Assistant,
        config: CatalogingConfig,
    ) -> Self {
        Self {
            aladin,
            nlk,
            wikidata,
            location,
            authority,
            language,
            assistant,
            config,
        }
    }

    /// Aladin API, then the web search; nothing found is `NotFound`
    async fn fetch_item(&self, isbn: &str) -> (AppResult<AladinItem>, Vec<String>) {
        let mut debug = Vec::new();
        match self.aladin.lookup(isbn).await {
            Ok(Some(item)) => return (Ok(item), debug),
            Ok(None) => debug.push("Aladin API: no item".to_string()),
            Err(e) => debug.push(format!("Aladin API failed: {}", e)),
        }
        match self.aladin.search_by_web(isbn).await {
            Ok(Some(item)) => {
                debug.push("Aladin item taken from the web search".to_string());
                (Ok(item), debug)
            }
            Ok(None) => (
                Err(AppError::NotFound(format!("No Aladin record for ISBN {}", isbn))),
                debug,
            ),
            Err(e) => {
                debug.push(format!("Aladin web search failed: {}", e));
                (
                    Err(AppError::NotFound(format!("No Aladin record for ISBN {}", isbn))),
                    debug,
                )
            }
        }
    }

    /// Convert one ISBN into a sorted MRK record
    pub async fn convert(&self, request: &ConvertItem, use_ai_940: Option<bool>) -> AppResult<ConversionResult> {
        let isbn = normalize_isbn(&request.isbn)?;
        let use_ai_940 = use_ai_940.unwrap_or(self.config.ai_940);

        let ((item, mut debug), seoji) = tokio::join!(self.fetch_item(&isbn), self.nlk.seoji(&isbn));
        let item = item?;
        let seoji = match seoji {
            Ok(seoji) => seoji,
            Err(e) => {
                debug.push(format!("NLK Seoji failed: {}", e));
                None
            }
        };

        let page = match self.aladin.product_page(&isbn).await {
            Ok(page) => page,
            Err(e) => {
                debug.push(format!("Aladin product page failed: {}", e));
                AladinPage::default()
            }
        };

        let category = if page.category_text.trim().is_empty() {
            item.category_name.as_str()
        } else {
            page.category_text.as_str()
        };
        let original_title = if item.original_title().is_empty() {
            page.original_title.trim()
        } else {
            item.original_title()
        };

        // People and their original-script names
        let people = merge_people(&item, seoji.as_ref(), self.config.include_illustrators_as_authors);
        if self.wikidata.enabled() {
            let names: Vec<String> = people.responsible().map(|(n, _)| n.to_string()).collect();
            match self.wikidata.prewarm(&names).await {
                Ok(n) => debug.push(format!("Wikidata prewarm: {} bundles", n)),
                Err(e) => debug.push(format!("Wikidata prewarm failed: {}", e)),
            }
        }
        let persons = self.authority.resolve_people(&people).await;
        let (fields_900, name_traces) = self.authority.build_900(&persons);
        let fields_700 = self.authority.build_700(&persons, &item.name_context()).await;

        // Language
        let author = primary_author(&item);
        let decision = self
            .language
            .decide(&LanguageInput {
                title: &item.title,
                original_title,
                category,
                publisher: &item.publisher,
                author: &author,
                page_language: page.language_hint.as_deref(),
            })
            .await;
        debug.extend(decision.debug.iter().cloned());

        // Place of publication
        let location = self.location.locate(Some(&isbn), &item.publisher).await;
        debug.extend(location.debug.iter().cloned());

        // Fixed fields
        let description = item.description_text();
        let fixed = Fixed008::for_book(
            Local::now().date_naive(),
            &item.pub_date,
            &BookText {
                title: &item.title,
                category,
                description,
                toc: &item.sub_info.toc,
            },
        )?
        .with_country(&location.country_code)
        .with_language(&decision.text_language);
        let field_008 = build_008(fixed.render());

        let price_standard = item.price_standard.filter(|p| *p > 0).map(|p| p.to_string());
        let ea_add_code = seoji.as_ref().map(|s| s.ea_add_code.as_str());
        let field_020 = Field::from(build_020(&isbn, ea_add_code, price_standard.as_deref()));

        let kdc = self.assistant.kdc(&item).await;
        let field_056 = kdc
            .as_deref()
            .and_then(|k| build_056(k, &self.config.kdc_edition))
            .map(Field::from);

        // Title
        let title = extract_title_statement(&item);
        let field_245 = build_245(&title, &people.authors, &people.translators);
        let field_246 = clean_original_title(original_title).and_then(|t| build_246(&t));

        let year = extract_year(&item.pub_date);
        let year = if year == UNKNOWN_DATE1 { String::new() } else { year };
        let field_260 = build_260(&location.place_display, &item.publisher, &year);

        let extent = Extent::parse(&page.extent);
        let scanned = [page.title.as_str(), page.subtitle.as_str(), page.description.as_str(), description]
            .iter()
            .filter(|t| !t.trim().is_empty())
            .copied()
            .collect::<Vec<_>>()
            .join(" ");
        let labels = illustration_labels(&scanned);
        let field_300 = build_300(&extent, &labels);

        let volume = item.series_volume().or(title.n.as_deref());
        let series = build_series(item.series_name(), volume);

        // Subjects
        let authors_clean = clean_author_string(&item.author);
        let forbidden = forbidden_set(&item.title, &authors_clean);
        let keywords = self
            .assistant
            .keywords(
                &KeywordSource {
                    category,
                    title: &item.title,
                    authors: &authors_clean,
                    description,
                    toc: &item.sub_info.toc,
                },
                &forbidden,
            )
            .await;
        let field_653 = build_653(&keywords).map(Field::from);

        // Readings
        let title_a = reading_title(&title.a);
        let ai_readings = if use_ai_940 && needs_reading(&title_a) {
            self.assistant.readings_940(&title_a).await
        } else {
            Vec::new()
        };
        let readings = readings_940(&title_a, title.n.is_some(), &ai_readings);

        let price_950 = price_standard.clone().or_else(|| Some(page.price.clone()).filter(|p| !p.is_empty()));
        let field_950 = price_950.as_deref().and_then(build_950);

        let field_049 = build_049(&request.reg_mark, &request.reg_no, &request.copy_symbol);

        let line_008 = field_008.to_mrk();
        let line_020 = field_020.to_mrk();
        let field_041 = Field::from(decision.field_041);
        let field_546 = Field::from(decision.field_546);
        let meta = ConversionMeta {
            title_a: title.a.clone(),
            has_n: title.n.is_some(),
            count_700: fields_700.len(),
            count_900: fields_900.len(),
            count_940: readings.len(),
            candidates: NameCandidates {
                nlk_first_author: seoji
                    .as_ref()
                    .and_then(|s| split_authors_translators(&s.author).0.into_iter().next()),
                aladin_primary_author: Some(author).filter(|a| !a.is_empty()),
            },
            line_041: Some(field_041.to_mrk()),
            line_546: Some(field_546.to_mrk()),
            line_008: Some(line_008),
            line_020: Some(line_020),
            line_056: mrk_of(&field_056),
            line_653: mrk_of(&field_653),
            kdc_code: kdc,
            price_950: field_950.as_ref().and_then(|f| f.get_subfield('b')).map(str::to_string),
            publisher_raw: item.publisher.clone(),
            pub_year: year,
            place_display: location.place_display.clone(),
            country_code: location.country_code.clone(),
            publisher_resolved: location.resolved_publisher.clone(),
            location_source: Some(location.source),
            name_traces,
            debug,
        };

        let mut record = MarcRecord::new();
        record.push(build_007());
        record.push(field_008);
        record.push(field_020);
        record.push(field_041);
        record.push(field_546);
        if let Some(f) = field_049 {
            record.push(f);
        }
        if let Some(f) = field_056 {
            record.push(f);
        }
        record.push(field_245);
        if let Some(f) = field_246 {
            record.push(f);
        }
        record.push(field_260);
        record.push(field_300);
        if let Some((f490, f830)) = series {
            record.push(f490);
            record.push(f830);
        }
        if let Some(f) = field_653 {
            record.push(f);
        }
        for f in fields_700 {
            record.push(f);
        }
        for f in fields_900 {
            record.push(f);
        }
        for reading in &readings {
            record.push(build_940(reading));
        }
        if let Some(f) = field_950 {
            record.push(f);
        }
        record.sort_by_tag();

        tracing::info!(
            isbn = %isbn,
            fields = record.fields.len(),
            count_700 = meta.count_700,
            count_900 = meta.count_900,
            count_940 = meta.count_940,
            location_source = %location.source.as_str(),
            "Record converted"
        );

        Ok(ConversionResult {
            isbn,
            mrk: record.to_mrk(),
            lines: record.lines(),
            fields: record.fields,
            meta,
        })
    }

    /// Convert several ISBNs with bounded concurrency; results keep input order
    pub async fn convert_batch(&self, items: Vec<ConvertItem>, use_ai_940: Option<bool>) -> Vec<ConversionOutcome> {
        let semaphore = Arc::new(Semaphore::new(self.config.batch_concurrency.max(1)));
        let mut tasks = JoinSet::new();
        let total = items.len();

        for (index, item) in items.into_iter().enumerate() {
            let service = self.clone();
            let semaphore = semaphore.clone();
            tasks.spawn(async move {
                let result = match semaphore.acquire_owned().await {
                    Ok(_permit) => service.convert(&item, use_ai_940).await,
                    Err(e) => Err(AppError::Internal(e.to_string())),
                };
                (index, item.isbn, result)
            });
        }

        let mut slots: Vec<Option<ConversionOutcome>> = (0..total).map(|_| None).collect();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, isbn, result)) => {
                    let outcome = match result {
                        Ok(record) => ConversionOutcome {
                            isbn,
                            ok: true,
                            record: Some(record),
                            error: None,
                        },
                        Err(e) => {
                            tracing::warn!(isbn = %isbn, error = %e, "Conversion failed");
                            ConversionOutcome {
                                isbn,
                                ok: false,
                                record: None,
                                error: Some(e.to_string()),
                            }
                        }
                    };
                    slots[index] = Some(outcome);
                }
                Err(e) => tracing::error!(error = %e, "Conversion task panicked"),
            }
        }

        slots
            .into_iter()
            .enumerate()
            .map(|(index, slot)| {
                slot.unwrap_or_else(|| ConversionOutcome {
                    isbn: String::new(),
                    ok: false,
                    record: None,
                    error: Some(format!("conversion task {} did not finish", index)),
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{
        AladinConfig, HttpConfig, NlkConfig, OpenAiConfig, RegistryConfig, WikidataConfig,
    };
    use crate::models::publisher::CreatePublisher;
    use crate::repository::{cache::NameCacheRepository, publishers::PublishersRepository, test_pool};
    use crate::services::{http::HttpClient, registry::RegistryService};

    const LOOKUP: &str = r#"{"item":[{
        "title": "죄와 벌 1",
        "author": "표도르 도스토예프스키 (지은이), 김연경 (옮긴이)",
        "publisher": "민음사",
        "pubDate": "2012-11-30",
        "categoryName": "국내도서>소설/시/희곡>러시아소설",
        "description": "러시아 문학의 고전",
        "isbn13": "9788937462788",
        "priceStandard": 13000,
        "subInfo": {
            "originalTitle": "Преступление и наказание",
            "authors": [
                {"authorName": "표도르 도스토예프스키", "authorTypeName": "지은이"},
                {"authorName": "김연경", "authorTypeName": "옮긴이"}
            ]
        },
        "seriesInfo": {"seriesId": 1, "seriesName": "세계문학전집", "volume": "266"}
    }]}"#;

    const PRODUCT: &str = r#"<html><body>
        <span class="price2">정가 : 13,000원</span>
        <div class="conts_info_list1"><ul><li>492쪽</li><li>132*225mm</li></ul></div>
    </body></html>"#;

    async fn service(url: &str) -> RecordService {
        let pool = test_pool().await;
        let publishers = PublishersRepository::new(pool.clone());
        publishers
            .create_publisher(&CreatePublisher {
                name: "민음사".into(),
                address: "서울특별시 강남구 도산대로1길 62".into(),
                phone: None,
            })
            .await
            .unwrap();

        let http = HttpClient::new(&HttpConfig {
            retries: 0,
            ..HttpConfig::default()
        })
        .unwrap();
        let cache = NameCacheRepository::new(pool);
        let aladin = AladinService::new(
            http.clone(),
            AladinConfig {
                ttb_key: Some("ttb".into()),
                api_url: format!("{}/ttb/api/ItemLookUp.aspx", url),
                web_url: url.to_string(),
            },
        );
        let nlk = NlkService::new(
            http.clone(),
            cache.clone(),
            NlkConfig {
                cert_key: Some("cert".into()),
                seoji_endpoints: vec![format!("{}/seoji", url)],
                ..NlkConfig::default()
            },
        );
        let wikidata = WikidataService::new(
            http.clone(),
            cache.clone(),
            WikidataConfig {
                enabled: false,
                ..WikidataConfig::default()
            },
        );
        let registry = RegistryService::new(
            http,
            RegistryConfig {
                kpipa_url: url.to_string(),
                mcst_url: url.to_string(),
            },
        );
        let location = LocationService::new(registry, publishers);
        let assistant = Assistant::new(None, cache, OpenAiConfig::default());
        let config = CatalogingConfig {
            use_lod: false,
            ..CatalogingConfig::default()
        };
        let authority = AuthorityService::new(nlk.clone(), wikidata.clone(), assistant.clone(), config.clone());
        let language = LanguageService::new(assistant.clone());
        RecordService::new(aladin, nlk, wikidata, location, authority, language, assistant, config)
    }

    #[test]
    fn test_normalize_isbn() {
        assert_eq!(normalize_isbn("978-89-374-6278-8").unwrap(), "9788937462788");
        assert_eq!(normalize_isbn(" 89-374-6278-x ").unwrap(), "893746278X");
        assert!(matches!(normalize_isbn("12345"), Err(AppError::Validation(_))));
    }

    #[test]
    fn test_people_fall_back_to_seoji() {
        let item = AladinItem::default();
        let seoji = SeojiRecord {
            author: "한강 지음 ; 데버라 스미스 옮김".into(),
            ..Default::default()
        };
        let people = merge_people(&item, Some(&seoji), true);
        assert_eq!(people.authors, vec!["한강"]);
        assert_eq!(people.translators, vec!["데버라 스미스"]);
    }

    #[tokio::test]
    async fn test_convert_builds_sorted_record() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/ttb/api/ItemLookUp.aspx")
            .match_query(mockito::Matcher::Any)
            .with_body(LOOKUP)
            .create_async()
            .await;
        server
            .mock("GET", "/seoji")
            .match_query(mockito::Matcher::Any)
            .with_body(r#"{"docs":[{"AUTHOR":"도스토예프스키 지음 ; 김연경 옮김","EA_ADD_CODE":"04890"}]}"#)
            .create_async()
            .await;
        server
            .mock("GET", "/shop/wproduct.aspx")
            .match_query(mockito::Matcher::Any)
            .with_body(PRODUCT)
            .create_async()
            .await;

        let svc = service(&server.url()).await;
        let result = svc
            .convert(
                &ConvertItem {
                    isbn: "978-89-374-6278-8".into(),
                    reg_mark: "EM".into(),
                    reg_no: "12345".into(),
                    copy_symbol: String::new(),
                },
                Some(false),
            )
            .await
            .unwrap();

        assert_eq!(result.isbn, "9788937462788");
        let tags: Vec<&str> = result.fields.iter().map(Field::tag).collect();
        let mut sorted = tags.clone();
        sorted.sort();
        assert_eq!(tags, sorted);

        assert!(result.lines.contains(&"=020  \\\\$a9788937462788$g04890:$c13000".to_string()));
        assert!(result.lines.contains(&"=049  \\\\$IEM12345".to_string()));
        assert!(result.lines.contains(&"=490  10$a세계문학전집 ;$v266".to_string()));
        assert!(result.lines.contains(&"=830  \\0$a세계문학전집 ;$v266".to_string()));
        assert!(result.lines.contains(&"=950  0\\$b13000".to_string()));
        assert!(result.lines.iter().any(|l| l.starts_with("=260  \\\\$a서울 :$b민음사,$c2012.")));
        assert!(result.lines.iter().any(|l| l.starts_with("=041  1\\$akor$hrus")));

        assert_eq!(result.meta.country_code, "ulk");
        assert_eq!(result.meta.pub_year, "2012");
        assert_eq!(result.meta.price_950.as_deref(), Some("13000"));
        assert_eq!(result.meta.kdc_code, None);
        assert_eq!(result.meta.candidates.nlk_first_author.as_deref(), Some("도스토예프스키"));
        assert_eq!(result.mrk, result.lines.join("\n"));
    }

    #[tokio::test]
    async fn test_illustration_found_in_subtitle() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/ttb/api/ItemLookUp.aspx")
            .match_query(mockito::Matcher::Any)
            .with_body(LOOKUP)
            .create_async()
            .await;
        server
            .mock("GET", "/seoji")
            .match_query(mockito::Matcher::Any)
            .with_body(r#"{"docs":[]}"#)
            .create_async()
            .await;
        server
            .mock("GET", "/shop/wproduct.aspx")
            .match_query(mockito::Matcher::Any)
            .with_body(
                r#"<html><body>
                <span class="Ere_bo_title">죄와 벌 1</span>
                <span class="Ere_sub1_title">지도 수록</span>
                <div class="conts_info_list1"><ul><li>492쪽</li><li>132*225mm</li></ul></div>
            </body></html>"#,
            )
            .create_async()
            .await;

        let svc = service(&server.url()).await;
        let result = svc
            .convert(
                &ConvertItem {
                    isbn: "9788937462788".into(),
                    ..Default::default()
                },
                Some(false),
            )
            .await
            .unwrap();

        assert!(result.lines.contains(&"=300  \\$a492 p. :$b지도 ;$c22 cm.".to_string()));
    }

    #[tokio::test]
    async fn test_batch_keeps_order_and_reports_failures() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/ttb/api/ItemLookUp.aspx")
            .match_query(mockito::Matcher::Any)
            .with_body(r#"{"item":[]}"#)
            .create_async()
            .await;
        server
            .mock("GET", "/search/wsearchresult.aspx")
            .match_query(mockito::Matcher::Any)
            .with_body("<html><body>검색 결과가 없습니다</body></html>")
            .create_async()
            .await;
        server
            .mock("GET", "/seoji")
            .match_query(mockito::Matcher::Any)
            .with_body(r#"{"docs":[]}"#)
            .create_async()
            .await;

        let svc = service(&server.url()).await;
        let items = vec![
            ConvertItem {
                isbn: "9788937462788".into(),
                ..Default::default()
            },
            ConvertItem {
                isbn: "123".into(),
                ..Default::default()
            },
        ];
        let results = svc.convert_batch(items, None).await;
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].isbn, "9788937462788");
        assert!(!results[0].ok);
        assert!(results[0].error.as_deref().unwrap_or("").contains("Not found"));
        assert_eq!(results[1].isbn, "123");
        assert!(results[1].error.as_deref().unwrap_or("").contains("Validation"));
    }
}
