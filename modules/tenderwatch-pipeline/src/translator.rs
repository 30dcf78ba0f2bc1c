// Keyword localization for source queries.
//
// Subscribers write keywords in Czech. The NEN portal searches Czech text
// natively; TED's expert query wants English. Translation is best-effort:
// any failure falls back to the original keyword so a translation outage
// can only degrade query quality, never kill the run.

use async_trait::async_trait;
use tracing::warn;

use deepl_client::DeeplClient;
use tenderwatch_common::SourceKind;

use crate::traits::Translate;

pub struct DeeplTranslate {
    client: DeeplClient,
}

impl DeeplTranslate {
    pub fn new(api_key: &str) -> Self {
        Self {
            client: DeeplClient::new(api_key),
        }
    }

    #[cfg(test)]
    fn with_base_url(mut self, url: String) -> Self {
        self.client = DeeplClient::new("test-key").with_base_url(url);
        self
    }
}

#[async_trait]
impl Translate for DeeplTranslate {
    async fn translate(
        &self,
        text: &str,
        source_lang: &str,
        target_lang: &str,
    ) -> anyhow::Result<String> {
        Ok(self.client.translate(text, source_lang, target_lang).await?)
    }
}

pub struct KeywordLocalizer {
    translator: Option<Box<dyn Translate>>,
}

impl KeywordLocalizer {
    pub fn new(translator: Box<dyn Translate>) -> Self {
        Self {
            translator: Some(translator),
        }
    }

    /// No translation capability configured; every query stays as written.
    pub fn passthrough() -> Self {
        Self { translator: None }
    }

    /// Map keywords into the query vocabulary of `target`.
    pub async fn localize(&self, keywords: &[String], target: SourceKind) -> Vec<String> {
        match (target, &self.translator) {
            (SourceKind::Czech, _) | (SourceKind::Eu, None) => keywords.to_vec(),
            (SourceKind::Eu, Some(translator)) => {
                let mut localized = Vec::with_capacity(keywords.len());
                for keyword in keywords {
                    match translator.translate(keyword, "CS", "EN").await {
                        Ok(translated) => localized.push(translated),
                        Err(e) => {
                            warn!(keyword = keyword.as_str(), error = %e,
                                  "Translation failed, using original keyword");
                            localized.push(keyword.clone());
                        }
                    }
                }
                localized
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use std::collections::HashMap;

    struct TableTranslator {
        table: HashMap<&'static str, &'static str>,
    }

    #[async_trait]
    impl Translate for TableTranslator {
        async fn translate(&self, text: &str, _: &str, _: &str) -> anyhow::Result<String> {
            self.table
                .get(text)
                .map(|t| t.to_string())
                .ok_or_else(|| anyhow!("no translation for {text}"))
        }
    }

    fn keywords(words: &[&str]) -> Vec<String> {
        words.iter().map(|w| w.to_string()).collect()
    }

    #[tokio::test]
    async fn czech_queries_stay_native() {
        let localizer = KeywordLocalizer::new(Box::new(TableTranslator {
            table: HashMap::new(),
        }));
        let out = localizer
            .localize(&keywords(&["úklid", "stavby"]), SourceKind::Czech)
            .await;
        assert_eq!(out, keywords(&["úklid", "stavby"]));
    }

    #[tokio::test]
    async fn eu_queries_are_translated() {
        let localizer = KeywordLocalizer::new(Box::new(TableTranslator {
            table: HashMap::from([("úklid", "cleaning"), ("stavby", "construction")]),
        }));
        let out = localizer
            .localize(&keywords(&["úklid", "stavby"]), SourceKind::Eu)
            .await;
        assert_eq!(out, keywords(&["cleaning", "construction"]));
    }

    #[tokio::test]
    async fn failed_translation_falls_back_per_keyword() {
        let localizer = KeywordLocalizer::new(Box::new(TableTranslator {
            table: HashMap::from([("úklid", "cleaning")]),
        }));
        let out = localizer
            .localize(&keywords(&["úklid", "mosty"]), SourceKind::Eu)
            .await;
        assert_eq!(out, keywords(&["cleaning", "mosty"]));
    }

    #[tokio::test]
    async fn passthrough_skips_translation_entirely() {
        let localizer = KeywordLocalizer::passthrough();
        let out = localizer
            .localize(&keywords(&["úklid"]), SourceKind::Eu)
            .await;
        assert_eq!(out, keywords(&["úklid"]));
    }

    #[tokio::test]
    async fn deepl_impl_round_trip() {
        use wiremock::matchers::{method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/translate"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "translations": [{"text": "bridges"}]
            })))
            .mount(&server)
            .await;

        let translator = DeeplTranslate::new("unused").with_base_url(server.uri());
        let out = translator.translate("mosty", "CS", "EN").await.unwrap();
        assert_eq!(out, "bridges");
    }
}
