//! Loads quiz questions from a Google Sheets CSV export.
//!
//! Every failure (placeholder URL, bad URL shape, network error, non-2xx
//! status, sheet without usable rows) degrades to the built-in sample
//! questions. The reason is kept in [`QuestionOrigin`] so callers can tell
//! live data from fallback data.

use async_trait::async_trait;
use log::{error, info, warn};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::quiz::samples::sample_questions;
use crate::quiz::{Question, Topic};

static GID_PARAM: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[?&#]gid=(\d+)").expect("gid pattern is valid"));

const SHEETS_BASE: &str = "https://docs.google.com/spreadsheets/d/";

/// Columns: question, answer A, B, C, D, correct letter, optional note.
const REQUIRED_FIELDS: usize = 6;

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("HTTP {0}: failed to fetch from Google Sheets")]
    Status(u16),
    #[error("request to Google Sheets failed: {0}")]
    Transport(#[from] reqwest::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum FallbackReason {
    #[error("sheet URL is still a placeholder")]
    Placeholder,
    #[error("cannot build a CSV export URL from {0:?}")]
    InvalidUrl(String),
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error("no questions found in the sheet")]
    EmptySheet,
}

#[derive(Debug)]
pub enum QuestionOrigin {
    Sheet { url: String },
    Fallback(FallbackReason),
}

#[derive(Debug)]
pub struct Resolution {
    pub questions: Vec<Question>,
    pub origin: QuestionOrigin,
}

impl Resolution {
    pub fn is_live(&self) -> bool {
        matches!(self.origin, QuestionOrigin::Sheet { .. })
    }
}

/// Where the CSV text comes from. The bot uses [`HttpSheetSource`].
#[async_trait]
pub trait SheetSource: Send + Sync {
    async fn fetch_text(&self, url: &str) -> Result<String, FetchError>;
}

pub struct HttpSheetSource {
    client: reqwest::Client,
}

impl HttpSheetSource {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl SheetSource for HttpSheetSource {
    async fn fetch_text(&self, url: &str) -> Result<String, FetchError> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }
        Ok(response.text().await?)
    }
}

pub struct QuestionResolver<S> {
    source: S,
}

impl<S: SheetSource> QuestionResolver<S> {
    pub fn new(source: S) -> Self {
        Self { source }
    }

    /// Fetches and parses the topic's sheet from scratch on every call.
    pub async fn resolve(&self, topic: &Topic) -> Resolution {
        match self.load(topic).await {
            Ok((url, questions)) => {
                info!("Loaded {} questions for {}", questions.len(), topic.name);
                Resolution {
                    questions,
                    origin: QuestionOrigin::Sheet { url },
                }
            }
            Err(reason) => {
                match &reason {
                    FallbackReason::Placeholder => warn!(
                        "Google Sheets URL for {} is still a placeholder. Using sample data.",
                        topic.name
                    ),
                    other => error!(
                        "Error fetching questions for {}: {}. Using sample data.",
                        topic.name, other
                    ),
                }
                Resolution {
                    questions: sample_questions(&topic.id),
                    origin: QuestionOrigin::Fallback(reason),
                }
            }
        }
    }

    async fn load(&self, topic: &Topic) -> Result<(String, Vec<Question>), FallbackReason> {
        if topic.has_placeholder_url() {
            return Err(FallbackReason::Placeholder);
        }

        let gid = resolve_gid(topic.worksheet_gid.as_deref(), &topic.sheet_url);
        info!("Fetching {} questions from worksheet gid={}", topic.name, gid);

        let csv_url = csv_export_url(&topic.sheet_url, &gid)?;
        let url = with_cache_buster(&csv_url, chrono::Utc::now().timestamp_millis());

        let text = self.source.fetch_text(&url).await?;
        let questions = parse_questions(&text, &topic.id);
        if questions.is_empty() {
            return Err(FallbackReason::EmptySheet);
        }
        Ok((url, questions))
    }
}

/// Explicit GID first, then a `gid=<digits>` already in the URL, then "0".
pub fn resolve_gid(explicit: Option<&str>, url: &str) -> String {
    if let Some(gid) = explicit.map(str::trim).filter(|g| !g.is_empty()) {
        return gid.to_string();
    }
    GID_PARAM
        .captures(url)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .unwrap_or_else(|| "0".to_string())
}

/// Rewrites a sheet URL so that it downloads the given worksheet as CSV.
/// Unknown URL shapes are returned unchanged.
pub fn csv_export_url(url: &str, gid: &str) -> Result<String, FallbackReason> {
    if url.contains("/pub?") {
        let url = set_query_param(url, "gid", gid);
        let url = set_query_param(&url, "single", "true");
        return Ok(set_query_param(&url, "output", "csv"));
    }
    if url.contains("/export") {
        return Ok(set_query_param(url, "gid", gid));
    }
    if url.contains("/edit") {
        let id = spreadsheet_id(url).ok_or_else(|| FallbackReason::InvalidUrl(url.to_string()))?;
        return Ok(format!(
            "{}{}/export?format=csv&gid={}",
            SHEETS_BASE, id, gid
        ));
    }
    Ok(url.to_string())
}

pub fn with_cache_buster(url: &str, timestamp: i64) -> String {
    let separator = if url.contains('?') { '&' } else { '?' };
    format!("{}{}t={}", url, separator, timestamp)
}

fn spreadsheet_id(url: &str) -> Option<&str> {
    let (_, rest) = url.split_once("/d/")?;
    let (id, _) = rest.split_once('/')?;
    Some(id).filter(|id| !id.is_empty())
}

// Drops any fragment; it is never sent to the server.
fn set_query_param(url: &str, name: &str, value: &str) -> String {
    let base = url.split('#').next().unwrap_or(url);
    let Some((path, query)) = base.split_once('?') else {
        return format!("{}?{}={}", base, name, value);
    };

    let mut replaced = false;
    let mut params = Vec::new();
    for param in query.split('&') {
        if !replaced && param.split('=').next() == Some(name) {
            params.push(format!("{}={}", name, value));
            replaced = true;
        } else {
            params.push(param.to_string());
        }
    }
    if !replaced {
        params.push(format!("{}={}", name, value));
    }
    format!("{}?{}", path, params.join("&"))
}

/// Parses sheet rows into questions. The first record is the header. Rows
/// with fewer than six fields are skipped. Ids use the row's physical line
/// number (blank lines included), so the first data row is `<topic>-q2`.
pub fn parse_questions(csv_text: &str, topic_id: &str) -> Vec<Question> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(csv_text.as_bytes());

    let mut questions = Vec::new();
    for record in reader.records() {
        let record = match record {
            Ok(record) => record,
            Err(err) => {
                warn!("Skipping unreadable row in {} sheet: {}", topic_id, err);
                continue;
            }
        };
        if record.len() < REQUIRED_FIELDS {
            continue;
        }

        let line = record
            .position()
            .and_then(|p| csv_text.get(..p.byte() as usize))
            .map(|before| before.matches('\n').count() + 1)
            .unwrap_or_default();
        let fields: Vec<&str> = record.iter().map(strip_quotes).collect();
        let note = fields
            .get(REQUIRED_FIELDS)
            .filter(|n| !n.is_empty())
            .map(|n| n.to_string());

        questions.push(Question::new(
            format!("{}-q{}", topic_id, line),
            topic_id,
            fields[0].to_string(),
            note,
            [
                fields[1].to_string(),
                fields[2].to_string(),
                fields[3].to_string(),
                fields[4].to_string(),
            ],
            fields[5],
        ));
    }

    questions
}

fn strip_quotes(field: &str) -> &str {
    field
        .strip_prefix('"')
        .and_then(|f| f.strip_suffix('"'))
        .unwrap_or(field)
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use pretty_assertions::assert_eq;

    use super::*;
    use crate::quiz::topics::default_topics;

    struct FakeSheet {
        response: Result<String, u16>,
        requests: Mutex<Vec<String>>,
    }

    impl FakeSheet {
        fn ok(body: &str) -> Self {
            Self {
                response: Ok(body.to_string()),
                requests: Mutex::new(Vec::new()),
            }
        }

        fn status(code: u16) -> Self {
            Self {
                response: Err(code),
                requests: Mutex::new(Vec::new()),
            }
        }

        fn requests(&self) -> Vec<String> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl<'a> SheetSource for &'a FakeSheet {
        async fn fetch_text(&self, url: &str) -> Result<String, FetchError> {
            self.requests.lock().unwrap().push(url.to_string());
            self.response.clone().map_err(FetchError::Status)
        }
    }

    fn topic(id: &str, sheet_url: &str) -> Topic {
        let mut topic = default_topics()
            .into_iter()
            .find(|t| t.id == id)
            .unwrap();
        topic.sheet_url = sheet_url.to_string();
        topic
    }

    const SHEET: &str = "q,a,b,c,d,correct\nQ1,A1,B1,C1,D1,b\nQ2,A2,B2,C2,D2,A";
    const EDIT_URL: &str = "https://docs.google.com/spreadsheets/d/abc123/edit#gid=42";

    #[test]
    fn gid_prefers_explicit_then_embedded_then_zero() {
        assert_eq!(resolve_gid(Some("7"), EDIT_URL), "7");
        assert_eq!(resolve_gid(None, EDIT_URL), "42");
        assert_eq!(resolve_gid(Some(" "), EDIT_URL), "42");
        assert_eq!(
            resolve_gid(None, "https://docs.google.com/spreadsheets/d/abc123/edit"),
            "0"
        );
    }

    #[test]
    fn edit_urls_become_csv_exports() {
        for (explicit, expected_gid) in [(Some("9"), "9"), (None, "42")] {
            let gid = resolve_gid(explicit, EDIT_URL);
            assert_eq!(
                csv_export_url(EDIT_URL, &gid).unwrap(),
                format!(
                    "https://docs.google.com/spreadsheets/d/abc123/export?format=csv&gid={}",
                    expected_gid
                )
            );
        }
    }

    #[test]
    fn edit_url_without_spreadsheet_id_is_invalid() {
        let err = csv_export_url("https://example.com/edit", "0").unwrap_err();
        assert!(matches!(err, FallbackReason::InvalidUrl(_)));
    }

    #[test]
    fn export_urls_get_gid_replaced_or_added() {
        assert_eq!(
            csv_export_url(
                "https://docs.google.com/spreadsheets/d/abc/export?format=csv&gid=1",
                "5"
            )
            .unwrap(),
            "https://docs.google.com/spreadsheets/d/abc/export?format=csv&gid=5"
        );
        assert_eq!(
            csv_export_url("https://docs.google.com/spreadsheets/d/abc/export?format=csv", "5")
                .unwrap(),
            "https://docs.google.com/spreadsheets/d/abc/export?format=csv&gid=5"
        );
    }

    #[test]
    fn published_urls_force_single_sheet_csv() {
        let url = "https://docs.google.com/spreadsheets/d/e/2PACX-xyz/pub?output=html";
        assert_eq!(
            csv_export_url(url, "3").unwrap(),
            "https://docs.google.com/spreadsheets/d/e/2PACX-xyz/pub?output=csv&gid=3&single=true"
        );

        let url = "https://docs.google.com/spreadsheets/d/e/2PACX-xyz/pub?gid=1&single=true&output=csv";
        assert_eq!(
            csv_export_url(url, "3").unwrap(),
            "https://docs.google.com/spreadsheets/d/e/2PACX-xyz/pub?gid=3&single=true&output=csv"
        );
    }

    #[test]
    fn other_urls_pass_through() {
        let url = "https://example.com/questions.csv";
        assert_eq!(csv_export_url(url, "0").unwrap(), url);
    }

    #[test]
    fn cache_buster_picks_separator() {
        assert_eq!(
            with_cache_buster("https://example.com/q.csv", 1700),
            "https://example.com/q.csv?t=1700"
        );
        assert_eq!(
            with_cache_buster("https://example.com/export?format=csv", 1700),
            "https://example.com/export?format=csv&t=1700"
        );
    }

    #[test]
    fn parses_rows_after_header() {
        let questions = parse_questions(SHEET, "math");

        assert_eq!(questions.len(), 2);
        assert_eq!(questions[0].id, "math-q2");
        assert_eq!(questions[1].id, "math-q3");
        assert_eq!(questions[0].correct_answer, "B");
        assert_eq!(questions[1].correct_answer, "A");
        for question in &questions {
            let ids: Vec<_> = question.answers.iter().map(|a| a.id.as_str()).collect();
            assert_eq!(ids, ["A", "B", "C", "D"]);
            assert_eq!(question.topic, "math");
            assert_eq!(question.note, None);
        }
        assert_eq!(questions[0].answers[3].text, "D1");
    }

    #[test]
    fn short_and_blank_rows_are_dropped() {
        let text = "q,a,b,c,d,correct\nshort,row,only,four\n\nQ,A,B,C,D,c,Think twice\n";
        let questions = parse_questions(text, "space");

        assert_eq!(questions.len(), 1);
        assert_eq!(questions[0].text, "Q");
        assert_eq!(questions[0].note.as_deref(), Some("Think twice"));
        assert_eq!(questions[0].correct_answer, "C");
    }

    #[test]
    fn crlf_exports_number_rows_from_two() {
        let text = "q,a,b,c,d,correct\r\nQ1,A1,B1,C1,D1,B\r\nQ2,A2,B2,C2,D2,A\r\n";
        let ids: Vec<_> = parse_questions(text, "space")
            .into_iter()
            .map(|q| q.id)
            .collect();

        assert_eq!(ids, ["space-q2", "space-q3"]);
    }

    #[test]
    fn blank_lines_still_count_towards_row_numbers() {
        let text = "q,a,b,c,d,correct\nQ1,A1,B1,C1,D1,B\n\nQ2,A2,B2,C2,D2,A";
        let ids: Vec<_> = parse_questions(text, "math")
            .into_iter()
            .map(|q| q.id)
            .collect();

        assert_eq!(ids, ["math-q2", "math-q4"]);
    }

    #[test]
    fn quoted_fields_may_contain_commas() {
        let text = "q,a,b,c,d,correct\n\"What is 1,000 + 1?\",\"1,001\",10001,101,11,a\n";
        let questions = parse_questions(text, "math");

        assert_eq!(questions.len(), 1);
        assert_eq!(questions[0].text, "What is 1,000 + 1?");
        assert_eq!(questions[0].answers[0].text, "1,001");
        assert_eq!(questions[0].id, "math-q2");
    }

    #[test]
    fn header_only_sheet_has_no_questions() {
        assert!(parse_questions("q,a,b,c,d,correct\n", "math").is_empty());
        assert!(parse_questions("", "math").is_empty());
    }

    #[tokio::test]
    async fn placeholder_topics_never_touch_the_network() {
        let sheet = FakeSheet::ok(SHEET);
        let resolver = QuestionResolver::new(&sheet);

        let resolution = resolver
            .resolve(&topic("space", "PLACEHOLDER_SPACE_SHEET_URL"))
            .await;

        assert_eq!(resolution.questions, sample_questions("space"));
        assert!(matches!(
            resolution.origin,
            QuestionOrigin::Fallback(FallbackReason::Placeholder)
        ));
        assert!(sheet.requests().is_empty());
    }

    #[tokio::test]
    async fn live_sheet_is_fetched_with_cache_buster() {
        let sheet = FakeSheet::ok(SHEET);
        let resolver = QuestionResolver::new(&sheet);

        let resolution = resolver.resolve(&topic("math", EDIT_URL)).await;

        assert!(resolution.is_live());
        assert_eq!(resolution.questions.len(), 2);
        let requests = sheet.requests();
        assert_eq!(requests.len(), 1);
        assert!(requests[0].starts_with(
            "https://docs.google.com/spreadsheets/d/abc123/export?format=csv&gid=42&t="
        ));
    }

    #[tokio::test]
    async fn every_call_fetches_again() {
        let sheet = FakeSheet::ok(SHEET);
        let resolver = QuestionResolver::new(&sheet);
        let math = topic("math", EDIT_URL);

        resolver.resolve(&math).await;
        resolver.resolve(&math).await;

        assert_eq!(sheet.requests().len(), 2);
    }

    #[tokio::test]
    async fn error_status_falls_back_to_samples() {
        let sheet = FakeSheet::status(404);
        let resolver = QuestionResolver::new(&sheet);

        let resolution = resolver.resolve(&topic("geography", EDIT_URL)).await;

        assert_eq!(resolution.questions, sample_questions("geography"));
        assert!(matches!(
            resolution.origin,
            QuestionOrigin::Fallback(FallbackReason::Fetch(FetchError::Status(404)))
        ));
    }

    #[tokio::test]
    async fn unreachable_host_falls_back_to_samples() {
        // Grab a free port and release it so the connection is refused
        let port = std::net::TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap()
            .port();
        let resolver = QuestionResolver::new(HttpSheetSource::new(reqwest::Client::new()));

        let resolution = resolver
            .resolve(&topic("space", &format!("http://127.0.0.1:{}/questions.csv", port)))
            .await;

        assert_eq!(resolution.questions, sample_questions("space"));
        assert!(matches!(
            resolution.origin,
            QuestionOrigin::Fallback(FallbackReason::Fetch(FetchError::Transport(_)))
        ));
    }

    #[tokio::test]
    async fn empty_sheet_falls_back_to_samples() {
        let sheet = FakeSheet::ok("q,a,b,c,d,correct\nonly,three,fields\n");
        let resolver = QuestionResolver::new(&sheet);

        let resolution = resolver.resolve(&topic("math", EDIT_URL)).await;

        assert_eq!(resolution.questions, sample_questions("math"));
        assert!(matches!(
            resolution.origin,
            QuestionOrigin::Fallback(FallbackReason::EmptySheet)
        ));
    }

    #[tokio::test]
    async fn unknown_topic_falls_back_to_nothing() {
        let sheet = FakeSheet::status(500);
        let resolver = QuestionResolver::new(&sheet);
        let mut history = topic("math", EDIT_URL);
        history.id = "history".into();

        let resolution = resolver.resolve(&history).await;

        assert!(resolution.questions.is_empty());
        assert!(!resolution.is_live());
    }
}
