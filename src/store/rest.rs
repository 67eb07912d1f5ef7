//! Hosted store speaking the PostgREST dialect (`/rest/v1/{table}`).

use std::time::Duration;

use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde_json::{json, Value};

use super::{Store, Table};
use crate::error::StoreError;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

pub struct RestStore {
    base_url: String,
    client: Client,
}

impl RestStore {
    pub fn new(base_url: &str, api_key: &str) -> Result<Self, StoreError> {
        let mut headers = HeaderMap::new();
        let key = HeaderValue::from_str(api_key)
            .map_err(|err| StoreError::Config(format!("invalid API key header: {err}")))?;
        let bearer = HeaderValue::from_str(&format!("Bearer {api_key}"))
            .map_err(|err| StoreError::Config(format!("invalid API key header: {err}")))?;
        headers.insert("apikey", key);
        headers.insert(AUTHORIZATION, bearer);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let client = Client::builder()
            .default_headers(headers)
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            base_url: base_url.trim().trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn endpoint(&self, table: Table) -> String {
        format!("{}/rest/v1/{}", self.base_url, table.name())
    }

    fn by_id(&self, builder: RequestBuilder, id: &str) -> RequestBuilder {
        builder.query(&[("id", format!("eq.{id}"))])
    }
}

fn check_status(response: Response) -> Result<Response, StoreError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().unwrap_or_default();
    Err(StoreError::Status {
        status: status.as_u16(),
        body,
    })
}

impl Store for RestStore {
    fn describe(&self) -> String {
        format!("hosted store {}", self.base_url)
    }

    fn select(&self, table: Table) -> Result<Vec<Value>, StoreError> {
        log::debug!("GET {}", self.endpoint(table));
        let response = self
            .client
            .get(self.endpoint(table))
            .query(&[("select", "*")])
            .send()?;
        Ok(check_status(response)?.json::<Vec<Value>>()?)
    }

    fn insert(&mut self, table: Table, record: Value) -> Result<Value, StoreError> {
        log::debug!("POST {}", self.endpoint(table));
        let response = self
            .client
            .post(self.endpoint(table))
            .header("Prefer", "return=representation")
            .json(&json!([record]))
            .send()?;
        let mut rows = check_status(response)?.json::<Vec<Value>>()?;
        if rows.is_empty() {
            return Err(StoreError::Malformed {
                table,
                reason: "insert returned no rows".to_string(),
            });
        }
        Ok(rows.swap_remove(0))
    }

    fn update(&mut self, table: Table, id: &str, patch: Value) -> Result<(), StoreError> {
        log::debug!("PATCH {} id={id}", self.endpoint(table));
        let builder = self
            .client
            .patch(self.endpoint(table))
            .header("Prefer", "return=representation")
            .json(&patch);
        let response = self.by_id(builder, id).send()?;
        let rows = check_status(response)?.json::<Vec<Value>>()?;
        if rows.is_empty() {
            return Err(StoreError::NotFound {
                table,
                id: id.to_string(),
            });
        }
        Ok(())
    }

    fn delete(&mut self, table: Table, id: &str) -> Result<(), StoreError> {
        log::debug!("DELETE {} id={id}", self.endpoint(table));
        let builder = self.client.delete(self.endpoint(table));
        check_status(self.by_id(builder, id).send()?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    /// The blocking client must not run on the async test runtime.
    async fn with_store<T, F>(server: &MockServer, f: F) -> T
    where
        F: FnOnce(RestStore) -> T + Send + 'static,
        T: Send + 'static,
    {
        let uri = server.uri();
        tokio::task::spawn_blocking(move || f(RestStore::new(&uri, "anon-key").unwrap()))
            .await
            .unwrap()
    }

    #[test]
    fn endpoint_joins_base_and_table() {
        let store = RestStore::new("https://abc.supabase.co/ ", "anon-key").unwrap();
        assert_eq!(
            store.endpoint(Table::InvestmentTransactions),
            "https://abc.supabase.co/rest/v1/investment_transactions"
        );
        assert_eq!(store.describe(), "hosted store https://abc.supabase.co");
    }

    #[test]
    fn rejects_keys_that_cannot_be_headers() {
        assert!(RestStore::new("https://abc.supabase.co", "bad\nkey").is_err());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn select_sends_key_headers_and_reads_rows() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/schools"))
            .and(query_param("select", "*"))
            .and(header("apikey", "anon-key"))
            .and(header("authorization", "Bearer anon-key"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!([{ "id": "s-1", "name": "A" }])),
            )
            .expect(1)
            .mount(&server)
            .await;

        let rows = with_store(&server, |store| store.select(Table::Schools)).await;
        assert_eq!(rows.unwrap(), vec![json!({ "id": "s-1", "name": "A" })]);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn insert_posts_one_row_and_returns_the_stored_record() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/rest/v1/franchises"))
            .and(header("prefer", "return=representation"))
            .and(body_json(json!([{ "name": "Centro", "school_id": "s-1" }])))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!([
                { "id": "f-1", "name": "Centro", "school_id": "s-1" }
            ])))
            .expect(1)
            .mount(&server)
            .await;

        let row = with_store(&server, |mut store| {
            store.insert(
                Table::Franchises,
                json!({ "name": "Centro", "school_id": "s-1" }),
            )
        })
        .await
        .unwrap();
        assert_eq!(row["id"], "f-1");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn insert_without_returned_rows_is_malformed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/rest/v1/schools"))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!([])))
            .mount(&server)
            .await;

        let result =
            with_store(&server, |mut store| store.insert(Table::Schools, json!({ "name": "A" })))
                .await;
        assert!(matches!(
            result,
            Err(StoreError::Malformed {
                table: Table::Schools,
                ..
            })
        ));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn update_filters_by_id_and_reports_missing_rows() {
        let server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .and(path("/rest/v1/franchises"))
            .and(query_param("id", "eq.f-1"))
            .and(body_json(json!({ "name": "Novo" })))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!([{ "id": "f-1", "name": "Novo" }])),
            )
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("PATCH"))
            .and(path("/rest/v1/franchises"))
            .and(query_param("id", "eq.gone"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .expect(1)
            .mount(&server)
            .await;

        let (found, missing) = with_store(&server, |mut store| {
            let found = store.update(Table::Franchises, "f-1", json!({ "name": "Novo" }));
            let missing = store.update(Table::Franchises, "gone", json!({ "name": "Novo" }));
            (found, missing)
        })
        .await;
        assert!(found.is_ok());
        match missing {
            Err(StoreError::NotFound { table, id }) => {
                assert_eq!(table, Table::Franchises);
                assert_eq!(id, "gone");
            }
            other => panic!("expected NotFound, got {other:?}"),
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn delete_of_absent_row_succeeds() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/rest/v1/investment_transactions"))
            .and(query_param("id", "eq.t-9"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let result = with_store(&server, |mut store| {
            store.delete(Table::InvestmentTransactions, "t-9")
        })
        .await;
        assert!(result.is_ok());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn error_status_carries_the_response_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/schools"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let result = with_store(&server, |store| store.select(Table::Schools)).await;
        match result {
            Err(StoreError::Status { status, body }) => {
                assert_eq!(status, 500);
                assert_eq!(body, "boom");
            }
            other => panic!("expected Status, got {other:?}"),
        }
    }
}
