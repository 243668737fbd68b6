/// InfluxDB v1 HTTP write client
use async_trait::async_trait;
use log::debug;
use url::Url;

use crate::error::SinkError;
use crate::sink::point::Point;

pub const INFLUX_PORT: u16 = 8086;
pub const INFLUX_DATABASE: &str = "nrf52";

/// Destination for time-series points
#[async_trait]
pub trait Sink: Send + Sync {
    async fn write_point(&self, point: &Point) -> Result<(), SinkError>;
}

pub struct InfluxSink {
    client: reqwest::Client,
    write_url: Url,
}

impl InfluxSink {
    /// Client for `host` on the fixed port and database, without credentials
    pub fn new(host: &str) -> Result<Self, SinkError> {
        Ok(InfluxSink {
            client: reqwest::Client::new(),
            write_url: write_url(host, INFLUX_PORT, INFLUX_DATABASE, "", "")?,
        })
    }
}

/// Build the `/write` endpoint URL
///
/// Empty credentials are left out of the query string entirely.
pub fn write_url(
    host: &str,
    port: u16,
    database: &str,
    username: &str,
    password: &str,
) -> Result<Url, SinkError> {
    let mut url = Url::parse(&format!("http://{}:{}/write", host.trim(), port))?;
    {
        let mut query = url.query_pairs_mut();
        query.append_pair("db", database);
        query.append_pair("precision", "ns");
        if !username.is_empty() {
            query.append_pair("u", username);
            query.append_pair("p", password);
        }
    }
    Ok(url)
}

#[async_trait]
impl Sink for InfluxSink {
    async fn write_point(&self, point: &Point) -> Result<(), SinkError> {
        let body = point.to_line_protocol();
        debug!("Writing to {}: {}", self.write_url, body);

        let response = self
            .client
            .post(self.write_url.clone())
            .body(body)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        Err(SinkError::Status {
            status: status.as_u16(),
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_write_url_without_credentials() {
        let url = write_url("influx.local", INFLUX_PORT, INFLUX_DATABASE, "", "").unwrap();
        assert_eq!(
            url.as_str(),
            "http://influx.local:8086/write?db=nrf52&precision=ns"
        );
    }

    #[test]
    fn builds_write_url_with_credentials() {
        let url = write_url("10.0.0.2", 9999, "db", "user", "p w").unwrap();
        assert_eq!(
            url.as_str(),
            "http://10.0.0.2:9999/write?db=db&precision=ns&u=user&p=p+w"
        );
    }

    #[test]
    fn rejects_unusable_host() {
        assert!(matches!(
            write_url("bad host/", INFLUX_PORT, INFLUX_DATABASE, "", ""),
            Err(SinkError::Url(_))
        ));
    }
}
