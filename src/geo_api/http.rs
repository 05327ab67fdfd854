use std::net::Ipv4Addr;
use std::time::Duration;

use reqwest::{Client, Response, Url};
use tracing::{debug, instrument};

use super::interface::GeoLookup;
use super::types::GeoLocation;
use crate::metrics::OUTGOING_REQUESTS_COUNTER;
use crate::USER_AGENT;

#[derive(Debug)]
pub struct GeoClient {
    client: Client,
    url: Url,
    apikey: String,
}

impl GeoClient {
    pub fn new(url: Url, apikey: String, timeout: Duration) -> Result<Self, anyhow::Error> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(2))
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self {
            client,
            url,
            apikey,
        })
    }
}

impl GeoLookup for GeoClient {
    #[instrument(skip(self))]
    async fn lookup(&self, ip: Ipv4Addr) -> Result<GeoLocation, anyhow::Error> {
        OUTGOING_REQUESTS_COUNTER
            .with_label_values(&["GEOIP", self.url.path()])
            .inc();

        // the api key travels in the query string, keep it out of errors
        let ip = ip.to_string();
        let resp = self
            .client
            .get(self.url.clone())
            .query(&[("apiKey", self.apikey.as_str()), ("ip", ip.as_str())])
            .send()
            .await
            .and_then(Response::error_for_status)
            .map_err(reqwest::Error::without_url)?;
        let location = resp
            .json::<GeoLocation>()
            .await
            .map_err(reqwest::Error::without_url)?;

        debug!(msg = "Resolved location", ?location);
        Ok(location)
    }
}

#[cfg(test)]
mod tests {
    use std::net::Ipv4Addr;
    use std::time::Duration;

    use mockito::{Matcher, Server};

    use super::GeoClient;
    use crate::geo_api::GeoLookup;

    fn geo_client(apikey: &str, mock: &Server) -> GeoClient {
        let url = format!("http://{}/ipgeo", mock.host_with_port());
        GeoClient::new(url.parse().unwrap(), apikey.to_string(), Duration::from_secs(1)).unwrap()
    }

    #[tokio::test]
    async fn sends_key_and_ip() {
        let mut mock = Server::new_async().await;
        let lookup = mock
            .mock("GET", "/ipgeo")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("apiKey".into(), "test_key".into()),
                Matcher::UrlEncoded("ip".into(), "8.8.8.8".into()),
            ]))
            .with_body(r#"{"city":"Mountain View","country_name":"United States"}"#)
            .with_status(200)
            .create_async()
            .await;

        let location = geo_client("test_key", &mock)
            .lookup(Ipv4Addr::new(8, 8, 8, 8))
            .await
            .expect("location");
        lookup.assert_async().await;
        assert_eq!(location.city.as_deref(), Some("Mountain View"));
        assert_eq!(location.country_name.as_deref(), Some("United States"));
    }

    #[tokio::test]
    async fn rejected_key_fails() {
        let mut mock = Server::new_async().await;
        let _lookup = mock
            .mock("GET", "/ipgeo")
            .match_query(Matcher::Any)
            .with_body(r#"{"message":"Provided API key is not valid."}"#)
            .with_status(401)
            .create_async()
            .await;

        let result = geo_client("bad", &mock)
            .lookup(Ipv4Addr::new(8, 8, 8, 8))
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn errors_do_not_leak_apikey() {
        let mut mock = Server::new_async().await;
        let _lookup = mock
            .mock("GET", "/ipgeo")
            .match_query(Matcher::Any)
            .with_status(500)
            .create_async()
            .await;

        let err = geo_client("SUPERSECRET", &mock)
            .lookup(Ipv4Addr::new(8, 8, 8, 8))
            .await
            .expect_err("server error");
        assert!(!format!("{err:?}").contains("SUPERSECRET"));
        assert!(!format!("{err:#}").contains("SUPERSECRET"));

        let unreachable = GeoClient::new(
            "http://127.0.0.1:1/ipgeo".parse().unwrap(),
            String::from("SUPERSECRET"),
            Duration::from_secs(1),
        )
        .unwrap();
        let err = unreachable
            .lookup(Ipv4Addr::new(8, 8, 8, 8))
            .await
            .expect_err("connection refused");
        assert!(!format!("{err:?}").contains("SUPERSECRET"));
    }
}
