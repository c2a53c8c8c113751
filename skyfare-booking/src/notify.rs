use async_trait::async_trait;
use chrono::NaiveDateTime;
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("mail relay request failed: {0}")]
    Transport(String),

    #[error("mail relay rejected the message: status {0}")]
    Rejected(u16),
}

/// Booking details carried into the confirmation message.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingConfirmation {
    pub flight_number: String,
    pub departure_date_time: NaiveDateTime,
    pub seat_class: String,
    pub payment_amount: i64,
}

/// Synchronous confirmation contract. The reservation manager waits for the
/// result before committing; a failure here aborts the whole reservation
/// transaction.
#[async_trait]
pub trait ConfirmationSender: Send + Sync {
    async fn send_confirmation(
        &self,
        email: &str,
        details: &BookingConfirmation,
    ) -> Result<(), NotifyError>;
}

/// Sends confirmations through an HTTP mail relay. SMTP internals live
/// behind the relay; from here the contract is one POST that either
/// succeeds or fails.
pub struct HttpMailer {
    client: reqwest::Client,
    endpoint: String,
    from_address: String,
    from_name: String,
}

#[derive(Serialize)]
struct RelayMessage<'a> {
    from_address: &'a str,
    from_name: &'a str,
    to: &'a str,
    subject: &'a str,
    html_body: String,
}

impl HttpMailer {
    pub fn new(
        endpoint: String,
        from_address: String,
        from_name: String,
        timeout: Duration,
    ) -> Result<Self, NotifyError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| NotifyError::Transport(e.to_string()))?;
        Ok(Self {
            client,
            endpoint,
            from_address,
            from_name,
        })
    }

    fn render_body(details: &BookingConfirmation) -> String {
        let departure = details.departure_date_time.format("%Y-%m-%d %H:%M");
        format!(
            "<h1>Your reservation is confirmed</h1>\
             <p>Flight: {}</p>\
             <p>Departure: {}</p>\
             <p>Seat class: {}</p>\
             <p>Payment: {}</p>",
            details.flight_number, departure, details.seat_class, details.payment_amount
        )
    }
}

#[async_trait]
impl ConfirmationSender for HttpMailer {
    async fn send_confirmation(
        &self,
        email: &str,
        details: &BookingConfirmation,
    ) -> Result<(), NotifyError> {
        let message = RelayMessage {
            from_address: &self.from_address,
            from_name: &self.from_name,
            to: email,
            subject: "Your flight reservation is confirmed",
            html_body: Self::render_body(details),
        };

        let response = self
            .client
            .post(&self.endpoint)
            .json(&message)
            .send()
            .await
            .map_err(|e| {
                warn!("confirmation send failed: {}", e);
                NotifyError::Transport(e.to_string())
            })?;

        if !response.status().is_success() {
            warn!("mail relay returned {}", response.status());
            return Err(NotifyError::Rejected(response.status().as_u16()));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn confirmation() -> BookingConfirmation {
        BookingConfirmation {
            flight_number: "SF101".into(),
            departure_date_time: NaiveDate::from_ymd_opt(2025, 7, 1)
                .unwrap()
                .and_hms_opt(9, 30, 0)
                .unwrap(),
            seat_class: "economy".into(),
            payment_amount: 300_000,
        }
    }

    fn mailer(endpoint: String) -> HttpMailer {
        HttpMailer::new(
            endpoint,
            "booking@skyfare.example".into(),
            "SKYFARE".into(),
            Duration::from_secs(2),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn delivers_through_the_relay() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/send"))
            .and(body_partial_json(serde_json::json!({
                "to": "kim@example.com",
                "from_address": "booking@skyfare.example",
            })))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let mailer = mailer(format!("{}/send", server.uri()));
        let result = mailer
            .send_confirmation("kim@example.com", &confirmation())
            .await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn configured_timeout_cuts_off_a_stalled_relay() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/send"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(30)))
            .mount(&server)
            .await;

        let mailer = HttpMailer::new(
            format!("{}/send", server.uri()),
            "booking@skyfare.example".into(),
            "SKYFARE".into(),
            Duration::from_millis(200),
        )
        .unwrap();
        let result = mailer
            .send_confirmation("kim@example.com", &confirmation())
            .await;
        assert!(matches!(result, Err(NotifyError::Transport(_))));
    }

    #[tokio::test]
    async fn relay_rejection_is_a_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/send"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let mailer = mailer(format!("{}/send", server.uri()));
        let result = mailer
            .send_confirmation("kim@example.com", &confirmation())
            .await;
        assert!(matches!(result, Err(NotifyError::Rejected(500))));
    }
}
